//! Deterministic multi-round combat. All randomness flows from the caller's
//! seed; a rerun with identical inputs is bit-identical.

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::models::{FightOutcome, ResourceAmount, ResourceStock, UnitCount};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use uuid::Uuid;

const MAX_ROUNDS: u32 = 6;
const EXPLODE_FACTOR: f64 = 0.7;
const HULL_TO_PLATING: f64 = 10.0;
const MIN_MOON_DIAMETER: f64 = 3_464.0;
const MAX_MOON_DIAMETER: f64 = 8_944.0;
const MOON_DEBRIS_PER_CHANCE: f64 = 10_000_000.0;
const MAX_MOON_CHANCE: f64 = 0.2;

/// Armor actually soaking damage in a fight, derived from the catalog hull
/// value. Group builders apply this before the armour amplifier.
pub fn hull_plating(hull: f64) -> f64 {
    hull / HULL_TO_PLATING
}

/// A batch of identical units on one side. Stats arrive pre-amplified by
/// the owner's weapons/shielding/armour researches; `hull` is the plating
/// value, not the raw structural figure.
#[derive(Debug, Clone)]
pub struct UnitGroup {
    /// The fleet that brought these units; none for defenses and the
    /// defender's indigenous ships.
    pub fleet: Option<Uuid>,
    pub element: String,
    pub count: i64,
    pub hull: f64,
    pub shield: f64,
    pub weapon: f64,
    pub cargo: f64,
    pub rapid_fire: HashMap<String, i64>,
    pub is_defense: bool,
}

#[derive(Debug, Clone)]
pub struct Survivor {
    pub fleet: Option<Uuid>,
    pub element: String,
    pub count: i64,
    pub is_defense: bool,
}

#[derive(Debug, Clone)]
pub struct BattleParams {
    pub ships_to_ruins: f64,
    pub defenses_to_ruins: f64,
    pub defense_rebuild_ratio: f64,
    pub moon_chance: f64,
}

#[derive(Debug, Clone)]
pub struct FightResult {
    pub outcome: FightOutcome,
    pub rounds: u32,
    pub attacker_survivors: Vec<Survivor>,
    pub defender_survivors: Vec<Survivor>,
    pub debris: Vec<ResourceAmount>,
    pub rebuilt_defenses: Vec<UnitCount>,
    pub moon_diameter: Option<i64>,
}

impl FightResult {
    pub fn attacker_cargo_capacity(&self, catalog: &Catalog) -> f64 {
        self.attacker_survivors
            .iter()
            .filter_map(|s| catalog.ship(&s.element).map(|d| d.cargo * s.count as f64))
            .sum()
    }
}

/// One expanded unit. Group index keys back into the side's group list.
struct Unit {
    group: usize,
    hull: f64,
    shield: f64,
    destroyed: bool,
}

fn expand(groups: &[UnitGroup]) -> Vec<Unit> {
    let mut units = Vec::new();
    for (index, group) in groups.iter().enumerate() {
        for _ in 0..group.count {
            units.push(Unit {
                group: index,
                hull: group.hull,
                shield: group.shield,
                destroyed: false,
            });
        }
    }
    units
}

/// Apply one shot. Weak shots deflect, overkill bleeds into the hull, and a
/// badly damaged unit may explode outright.
fn fire(weapon: f64, initial_hull: f64, target: &mut Unit, rng: &mut StdRng) {
    if target.destroyed {
        return;
    }
    if weapon < 0.01 * target.shield {
        return;
    }
    let absorbed = target.shield - weapon;
    target.shield = absorbed.max(0.0);
    if absorbed < 0.0 {
        target.hull += absorbed;
    }
    if target.hull <= 0.0 {
        target.destroyed = true;
        return;
    }
    let explode_threshold = EXPLODE_FACTOR * initial_hull;
    if target.hull < explode_threshold {
        let explode_chance = 1.0 - EXPLODE_FACTOR * target.hull / explode_threshold;
        if (rng.random::<f32>() as f64) < explode_chance {
            target.hull = 0.0;
            target.destroyed = true;
        }
    }
}

/// Volley from every unit of one side into the other. Targets are drawn
/// uniformly; rapid fire chains extra shots until the trial fails. Nothing
/// is removed mid-round, so shots may land on wrecks.
fn volley(
    shooters: &[Unit],
    shooter_groups: &[UnitGroup],
    targets: &mut [Unit],
    target_groups: &[UnitGroup],
    rng: &mut StdRng,
) {
    if targets.is_empty() {
        return;
    }
    // units wrecked earlier in this round still fire; they only leave the
    // field when the round closes
    for shooter_index in 0..shooters.len() {
        let shooter = &shooters[shooter_index];
        let group = &shooter_groups[shooter.group];
        loop {
            let target_index = rng.random_range(0..targets.len());
            let target_element;
            {
                let target = &mut targets[target_index];
                target_element = target_groups[target.group].element.clone();
                let initial_hull = target_groups[target.group].hull;
                fire(group.weapon, initial_hull, target, rng);
            }
            let rapid_fire = group.rapid_fire.get(target_element.as_str()).copied().unwrap_or(0);
            if rapid_fire < 2 {
                break;
            }
            let refire_chance = (rapid_fire - 1) as f64 / rapid_fire as f64;
            if (rng.random::<f32>() as f64) >= refire_chance {
                break;
            }
        }
    }
}

/// Turn this round's wrecks into debris and drop them. Only dispersable
/// resources reach the field.
fn sweep(
    units: &mut Vec<Unit>,
    groups: &[UnitGroup],
    catalog: &Catalog,
    params: &BattleParams,
    debris: &mut HashMap<String, f64>,
) {
    units.retain(|unit| {
        if !unit.destroyed {
            return true;
        }
        let group = &groups[unit.group];
        let ratio = if group.is_defense {
            params.defenses_to_ruins
        } else {
            params.ships_to_ruins
        };
        if ratio > 0.0 {
            if let Some(cost) = catalog.unit_cost(&group.element) {
                for (resource, amount) in &cost.amounts {
                    let dispersable = catalog
                        .resource(resource)
                        .map(|r| r.dispersable)
                        .unwrap_or(false);
                    if dispersable {
                        *debris.entry(resource.to_string()).or_insert(0.0) += amount * ratio;
                    }
                }
            }
        }
        false
    });
}

fn survivors(units: &[Unit], groups: &[UnitGroup]) -> Vec<Survivor> {
    let mut counts: HashMap<usize, i64> = HashMap::new();
    for unit in units {
        if !unit.destroyed {
            *counts.entry(unit.group).or_insert(0) += 1;
        }
    }
    groups
        .iter()
        .enumerate()
        .filter_map(|(index, group)| {
            let count = counts.get(&index).copied().unwrap_or(0);
            (count > 0).then(|| Survivor {
                fleet: group.fleet,
                element: group.element.clone(),
                count,
                is_defense: group.is_defense,
            })
        })
        .collect()
}

/// Run a fight to completion. The outcome is reported from the defender's
/// perspective.
pub fn simulate(
    attackers: &[UnitGroup],
    defenders: &[UnitGroup],
    seed: u64,
    catalog: &Catalog,
    params: &BattleParams,
) -> Result<FightResult> {
    if attackers.iter().map(|g| g.count).sum::<i64>() <= 0 {
        return Err(Error::FleetFightSimulationFailure);
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut attacker_units = expand(attackers);
    let mut defender_units = expand(defenders);
    let mut debris: HashMap<String, f64> = HashMap::new();

    let mut rounds = 0;
    for _ in 0..MAX_ROUNDS {
        if attacker_units.is_empty() || defender_units.is_empty() {
            break;
        }
        rounds += 1;
        volley(
            &attacker_units,
            attackers,
            &mut defender_units,
            defenders,
            &mut rng,
        );
        volley(
            &defender_units,
            defenders,
            &mut attacker_units,
            attackers,
            &mut rng,
        );
        sweep(&mut attacker_units, attackers, catalog, params, &mut debris);
        sweep(&mut defender_units, defenders, catalog, params, &mut debris);
    }

    let attacker_destroyed = attacker_units.is_empty();
    let defender_destroyed = defender_units.is_empty();
    let outcome = match (attacker_destroyed, defender_destroyed) {
        (true, false) => FightOutcome::Victory,
        (false, true) => FightOutcome::Loss,
        _ => FightOutcome::Draw,
    };

    // destroyed defenses may be rebuilt from the rubble
    let mut destroyed_defenses: HashMap<String, i64> = HashMap::new();
    let defender_alive = survivors(&defender_units, defenders);
    for group in defenders.iter().filter(|g| g.is_defense) {
        let alive = defender_alive
            .iter()
            .filter(|s| s.is_defense && s.element == group.element)
            .map(|s| s.count)
            .sum::<i64>();
        let lost = group.count - alive;
        if lost > 0 {
            *destroyed_defenses.entry(group.element.clone()).or_insert(0) += lost;
        }
    }
    let mut rebuilt_defenses: Vec<UnitCount> = Vec::new();
    let mut elements: Vec<&String> = destroyed_defenses.keys().collect();
    elements.sort();
    for element in elements {
        let lost = destroyed_defenses[element];
        let mut rebuilt = 0;
        for _ in 0..lost {
            if (rng.random::<f32>() as f64) < params.defense_rebuild_ratio {
                rebuilt += 1;
            }
        }
        if rebuilt > 0 {
            rebuilt_defenses.push(UnitCount::new(element, rebuilt));
        }
    }

    let debris_total: f64 = debris.values().sum();
    let moon_diameter = if debris_total > 0.0 {
        roll_moon(debris_total, params.moon_chance, &mut rng)
    } else {
        None
    };

    let mut debris: Vec<ResourceAmount> = debris
        .into_iter()
        .map(|(resource, amount)| ResourceAmount { resource, amount })
        .collect();
    debris.sort_by(|a, b| a.resource.cmp(&b.resource));

    Ok(FightResult {
        outcome,
        rounds,
        attacker_survivors: survivors(&attacker_units, attackers),
        defender_survivors: defender_alive,
        debris,
        rebuilt_defenses,
        moon_diameter,
    })
}

/// Moon chance grows with the debris mass, capped at 20%. The same draw
/// that decides formation also sizes the moon.
fn roll_moon(debris_total: f64, moon_chance_ratio: f64, rng: &mut StdRng) -> Option<i64> {
    let chance = (debris_total * moon_chance_ratio / MOON_DEBRIS_PER_CHANCE).min(MAX_MOON_CHANCE);
    if chance <= 0.0 {
        return None;
    }
    let roll = rng.random::<f32>() as f64;
    if roll > chance {
        return None;
    }
    let diameter = MIN_MOON_DIAMETER + (MAX_MOON_DIAMETER - MIN_MOON_DIAMETER) * roll / chance;
    Some(diameter.clamp(MIN_MOON_DIAMETER, MAX_MOON_DIAMETER).round() as i64)
}

/// Pillage after a defender loss: up to `pillage_ratio` of each stock,
/// scaled down to the surviving cargo capacity.
pub fn pillage(
    stocks: &[ResourceStock],
    capacity: f64,
    pillage_ratio: f64,
    catalog: &Catalog,
) -> Vec<ResourceAmount> {
    let available: Vec<ResourceAmount> = stocks
        .iter()
        .filter(|s| {
            catalog
                .resource(&s.resource)
                .map(|r| r.movable)
                .unwrap_or(false)
        })
        .map(|s| ResourceAmount::new(&s.resource, s.amount * pillage_ratio))
        .filter(|r| r.amount > 0.0)
        .collect();
    let total: f64 = available.iter().map(|r| r.amount).sum();
    if total <= 0.0 || capacity <= 0.0 {
        return Vec::new();
    }
    let scale = (capacity / total).min(1.0);
    available
        .into_iter()
        .map(|r| ResourceAmount {
            resource: r.resource,
            amount: r.amount * scale,
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::catalog::catalog;

    fn group(element: &str, count: i64, fleet: Option<Uuid>, is_defense: bool) -> UnitGroup {
        let (hull, shield, weapon) = catalog().unit_stats(element).unwrap();
        let hull = hull_plating(hull);
        let cargo = catalog().ship(element).map(|s| s.cargo).unwrap_or(0.0);
        let rapid_fire = catalog()
            .ship(element)
            .map(|s| {
                s.rapid_fire
                    .iter()
                    .map(|(k, v)| (k.to_string(), *v))
                    .collect()
            })
            .unwrap_or_default();
        UnitGroup {
            fleet,
            element: element.to_string(),
            count,
            hull,
            shield,
            weapon,
            cargo,
            rapid_fire,
            is_defense,
        }
    }

    fn params() -> BattleParams {
        BattleParams {
            ships_to_ruins: 0.3,
            defenses_to_ruins: 0.0,
            defense_rebuild_ratio: 0.7,
            moon_chance: 1.0,
        }
    }

    #[test]
    fn test_seeded_fight_is_bit_identical() {
        let attackers = vec![group("light_fighter", 50, Some(Uuid::nil()), false)];
        let defenders = vec![
            group("rocket_launcher", 20, None, true),
            group("light_fighter", 10, None, false),
        ];
        let a = simulate(&attackers, &defenders, 42, catalog(), &params()).unwrap();
        let b = simulate(&attackers, &defenders, 42, catalog(), &params()).unwrap();
        assert_eq!(a.outcome, b.outcome);
        assert_eq!(a.rounds, b.rounds);
        assert_eq!(a.debris, b.debris);
        assert_eq!(
            a.attacker_survivors
                .iter()
                .map(|s| s.count)
                .collect::<Vec<_>>(),
            b.attacker_survivors
                .iter()
                .map(|s| s.count)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_lone_cargo_against_launchers_is_defender_victory() {
        // weapon 5 vs hull 2000: the cargo cannot break through, the
        // launchers grind it down within six rounds
        let attackers = vec![group("small_cargo", 1, Some(Uuid::nil()), false)];
        let defenders = vec![group("rocket_launcher", 2, None, true)];
        let result = simulate(&attackers, &defenders, 7, catalog(), &params()).unwrap();
        assert_eq!(result.outcome, FightOutcome::Victory);
        assert!(result.attacker_survivors.is_empty());
        // debris = ships_to_ruins * {2000 metal, 2000 crystal}
        assert_eq!(result.debris.len(), 2);
        for entry in &result.debris {
            assert_eq!(entry.amount, 0.3 * 2_000.0);
        }
    }

    #[test]
    fn test_overwhelming_attacker_wins_and_leaves_no_defender() {
        let attackers = vec![group("battleship", 30, Some(Uuid::nil()), false)];
        let defenders = vec![group("rocket_launcher", 2, None, true)];
        let result = simulate(&attackers, &defenders, 1, catalog(), &params()).unwrap();
        assert_eq!(result.outcome, FightOutcome::Loss);
        assert!(result.defender_survivors.is_empty());
        assert!(!result.attacker_survivors.is_empty());
    }

    #[test]
    fn test_empty_attacker_is_a_simulation_failure() {
        let defenders = vec![group("rocket_launcher", 2, None, true)];
        assert!(matches!(
            simulate(&[], &defenders, 1, catalog(), &params()),
            Err(Error::FleetFightSimulationFailure)
        ));
    }

    #[test]
    fn test_deuterium_never_reaches_debris() {
        // cruisers cost deuterium but only metal and crystal may disperse
        let attackers = vec![group("battleship", 40, Some(Uuid::nil()), false)];
        let defenders = vec![group("cruiser", 3, None, false)];
        let result = simulate(&attackers, &defenders, 5, catalog(), &params()).unwrap();
        assert!(result
            .debris
            .iter()
            .all(|entry| entry.resource != "deuterium"));
    }

    #[test]
    fn test_reinforcements_fight_alongside_defenses() {
        // scenario: indigenous light fighters plus a stationed cruiser
        // wing; cruisers chain rapid fire into the attacking fighters
        let reinforcement = Uuid::new_v4();
        let attackers = vec![group("light_fighter", 50, Some(Uuid::nil()), false)];
        let defenders = vec![
            group("light_fighter", 10, None, false),
            group("cruiser", 5, Some(reinforcement), false),
        ];
        let result = simulate(&attackers, &defenders, 11, catalog(), &params()).unwrap();
        assert!(result.rounds >= 1);
        // survivors stay tagged to the fleet that brought them
        for survivor in &result.defender_survivors {
            if survivor.element == "cruiser" {
                assert_eq!(survivor.fleet, Some(reinforcement));
            }
        }
    }

    #[test]
    fn test_rebuild_counts_only_defenses() {
        let attackers = vec![group("battleship", 50, Some(Uuid::nil()), false)];
        let defenders = vec![
            group("rocket_launcher", 10, None, true),
            group("light_fighter", 5, None, false),
        ];
        let result = simulate(&attackers, &defenders, 3, catalog(), &params()).unwrap();
        assert_eq!(result.outcome, FightOutcome::Loss);
        let rebuilt: i64 = result.rebuilt_defenses.iter().map(|r| r.count).sum();
        assert!(rebuilt <= 10);
        assert!(result
            .rebuilt_defenses
            .iter()
            .all(|r| r.element == "rocket_launcher"));
    }

    #[test]
    fn test_moon_roll_boundaries() {
        // debris 5M with ratio 1 caps the chance at 0.2; a tiny roll both
        // forms the moon and sizes it near the minimum
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..100 {
            if let Some(diameter) = roll_moon(5_000_000.0, 1.0, &mut rng) {
                assert!((3_464..=8_944).contains(&diameter));
            }
        }
        assert_eq!(roll_moon(0.0, 1.0, &mut StdRng::seed_from_u64(0)), None);
    }

    #[test]
    fn test_moon_diameter_formula() {
        // chance 0.2, roll 0.05 -> 3464 + 5480 * 0.25 = 4834
        let chance: f64 = 0.2;
        let roll: f64 = 0.05;
        let diameter =
            MIN_MOON_DIAMETER + (MAX_MOON_DIAMETER - MIN_MOON_DIAMETER) * roll / chance;
        assert_eq!(diameter.round() as i64, 4_834);
    }

    #[test]
    fn test_pillage_scales_to_capacity() {
        let stocks = vec![
            ResourceStock::new("metal", 10_000.0, 0.0, 100_000.0),
            ResourceStock::new("crystal", 6_000.0, 0.0, 100_000.0),
        ];
        // half of each is 8000 total, but only 4000 fits
        let loot = pillage(&stocks, 4_000.0, 0.5, catalog());
        let total: f64 = loot.iter().map(|r| r.amount).sum();
        assert!((total - 4_000.0).abs() < 1e-6);
        // proportional split: metal 2500, crystal 1500
        let metal = loot.iter().find(|r| r.resource == "metal").unwrap();
        assert!((metal.amount - 2_500.0).abs() < 1e-6);
    }

    #[test]
    fn test_pillage_unbounded_by_capacity_takes_ratio() {
        let stocks = vec![ResourceStock::new("metal", 10_000.0, 0.0, 100_000.0)];
        let loot = pillage(&stocks, 1_000_000.0, 0.5, catalog());
        assert_eq!(loot[0].amount, 5_000.0);
    }
}
