mod data;

pub use data::standard;

use crate::models::{BodyKind, Coordinates};
use lazy_static::lazy_static;
use std::collections::HashMap;

pub const RESOURCE_METAL: &str = "metal";
pub const RESOURCE_CRYSTAL: &str = "crystal";
pub const RESOURCE_DEUTERIUM: &str = "deuterium";

pub const BUILDING_ROBOTICS: &str = "robotics_factory";
pub const BUILDING_NANITE: &str = "nanite_factory";
pub const BUILDING_SHIPYARD: &str = "shipyard";
pub const BUILDING_RESEARCH_LAB: &str = "research_lab";

pub const SHIP_ESPIONAGE_PROBE: &str = "espionage_probe";
pub const SHIP_COLONY: &str = "colony_ship";

pub const OBJECTIVE_TRANSPORT: &str = "transport";
pub const OBJECTIVE_DEPLOY: &str = "deploy";
pub const OBJECTIVE_COLONIZE: &str = "colonize";
pub const OBJECTIVE_HARVEST: &str = "harvest";
pub const OBJECTIVE_SPY: &str = "spy";
pub const OBJECTIVE_ATTACK: &str = "attack";
pub const OBJECTIVE_ACS_ATTACK: &str = "acs_attack";
pub const OBJECTIVE_ACS_DEFEND: &str = "acs_defend";
pub const OBJECTIVE_EXPEDITION: &str = "expedition";

#[derive(Debug, Clone)]
pub struct ResourceDesc {
    pub key: &'static str,
    pub name: &'static str,
    pub base_storage: f64,
    /// Per-hour income every planet gets regardless of buildings.
    pub base_production: f64,
    pub starting_amount: f64,
    /// Movable resources can be loaded on fleets.
    pub movable: bool,
    /// Dispersable resources appear in debris fields.
    pub dispersable: bool,
}

/// Exponential cost progression for progress elements. The cost to reach
/// `level + 1` is `base * progression^level`.
#[derive(Debug, Clone)]
pub struct CostProgression {
    pub base: HashMap<&'static str, f64>,
    pub progression: f64,
}

impl CostProgression {
    /// Cost of the upgrade from `level` to `level + 1`, scaled by the
    /// universe cost ratio.
    pub fn upgrade_cost(&self, level: i64, cost_ratio: f64) -> HashMap<String, f64> {
        self.base
            .iter()
            .map(|(resource, base)| {
                let cost = base * self.progression.powi(level as i32) * cost_ratio;
                (resource.to_string(), cost.round())
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct FixedCost {
    pub amounts: HashMap<&'static str, f64>,
}

impl FixedCost {
    pub fn unit_cost(&self, cost_ratio: f64) -> HashMap<String, f64> {
        self.amounts
            .iter()
            .map(|(resource, base)| (resource.to_string(), base * cost_ratio))
            .collect()
    }

    pub fn amount(&self, resource: &str) -> f64 {
        self.amounts.get(resource).copied().unwrap_or(0.0)
    }
}

/// Hourly production brought by one building for one resource:
/// `base * level * progression^level * (offset + factor * temperature)`.
#[derive(Debug, Clone)]
pub struct ProductionRule {
    pub resource: &'static str,
    pub base: f64,
    pub progression: f64,
    pub temperature_offset: f64,
    pub temperature_factor: f64,
}

impl ProductionRule {
    pub fn hourly(&self, level: i64, avg_temperature: f64) -> f64 {
        if level <= 0 {
            return 0.0;
        }
        let climate = self.temperature_offset + self.temperature_factor * avg_temperature;
        self.base * level as f64 * self.progression.powi(level as i32) * climate
    }
}

/// Storage brought by one building: `base * multiplier^level`.
#[derive(Debug, Clone)]
pub struct StorageRule {
    pub resource: &'static str,
    pub base: f64,
    pub multiplier: f64,
}

impl StorageRule {
    pub fn capacity(&self, level: i64) -> f64 {
        if level <= 0 {
            return 0.0;
        }
        self.base * self.multiplier.powi(level as i32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyAllowance {
    PlanetOnly,
    MoonOnly,
    Any,
}

impl BodyAllowance {
    pub fn allows(&self, kind: BodyKind) -> bool {
        match self {
            BodyAllowance::PlanetOnly => kind == BodyKind::Planet,
            BodyAllowance::MoonOnly => kind == BodyKind::Moon,
            BodyAllowance::Any => kind == BodyKind::Planet || kind == BodyKind::Moon,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Prerequisite {
    pub element: &'static str,
    pub level: i64,
}

#[derive(Debug, Clone)]
pub struct BuildingDesc {
    pub key: &'static str,
    pub name: &'static str,
    pub cost: CostProgression,
    pub production: Vec<ProductionRule>,
    pub storage: Vec<StorageRule>,
    /// Extra fields granted per completed level, on top of the one the
    /// level itself occupies.
    pub fields_delta: i64,
    pub allowed_on: BodyAllowance,
    pub prerequisites: Vec<Prerequisite>,
}

#[derive(Debug, Clone)]
pub struct TechnologyDesc {
    pub key: &'static str,
    pub name: &'static str,
    pub cost: CostProgression,
    pub prerequisites: Vec<Prerequisite>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propulsion {
    Combustion,
    Impulse,
    Hyperspace,
}

impl Propulsion {
    pub fn technology(&self) -> &'static str {
        match self {
            Propulsion::Combustion => "combustion_drive",
            Propulsion::Impulse => "impulse_drive",
            Propulsion::Hyperspace => "hyperspace_drive",
        }
    }

    /// Relative speed gain per level of the matching drive technology.
    pub fn speed_bonus(&self) -> f64 {
        match self {
            Propulsion::Combustion => 0.1,
            Propulsion::Impulse => 0.2,
            Propulsion::Hyperspace => 0.3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShipDesc {
    pub key: &'static str,
    pub name: &'static str,
    pub cost: FixedCost,
    pub hull: f64,
    pub shield: f64,
    pub weapon: f64,
    pub cargo: f64,
    pub base_speed: f64,
    pub propulsion: Propulsion,
    /// Base fuel consumption, keyed by the resource the drive burns.
    pub fuel: HashMap<&'static str, f64>,
    /// Re-fire table: target element -> rapid fire value (>= 2 to matter).
    pub rapid_fire: HashMap<&'static str, i64>,
}

impl ShipDesc {
    /// Propulsion-adjusted speed for the owner's drive research.
    pub fn speed(&self, drive_level: i64) -> f64 {
        self.base_speed * (1.0 + self.propulsion.speed_bonus() * drive_level as f64)
    }
}

#[derive(Debug, Clone)]
pub struct DefenseDesc {
    pub key: &'static str,
    pub name: &'static str,
    pub cost: FixedCost,
    pub hull: f64,
    pub shield: f64,
    pub weapon: f64,
}

/// Per-objective target constraints live here rather than in dispatch code.
#[derive(Debug, Clone)]
pub struct ObjectiveDesc {
    pub key: &'static str,
    pub name: &'static str,
    /// Hostile objectives end in the combat or espionage resolver.
    pub hostile: bool,
    /// Directed objectives require the target to belong to another player.
    pub directed: bool,
    pub target_kinds: Vec<BodyKind>,
    /// Whether the target slot may hold no body at all.
    pub allows_empty_target: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct DistanceWeights {
    pub galaxy: f64,
    pub system: f64,
    pub position: f64,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    pub resources: Vec<ResourceDesc>,
    pub buildings: Vec<BuildingDesc>,
    pub technologies: Vec<TechnologyDesc>,
    pub ships: Vec<ShipDesc>,
    pub defenses: Vec<DefenseDesc>,
    pub objectives: Vec<ObjectiveDesc>,
    pub distance_weights: DistanceWeights,
}

impl Catalog {
    pub fn resource(&self, key: &str) -> Option<&ResourceDesc> {
        self.resources.iter().find(|r| r.key == key)
    }

    pub fn building(&self, key: &str) -> Option<&BuildingDesc> {
        self.buildings.iter().find(|b| b.key == key)
    }

    pub fn technology(&self, key: &str) -> Option<&TechnologyDesc> {
        self.technologies.iter().find(|t| t.key == key)
    }

    pub fn ship(&self, key: &str) -> Option<&ShipDesc> {
        self.ships.iter().find(|s| s.key == key)
    }

    pub fn defense(&self, key: &str) -> Option<&DefenseDesc> {
        self.defenses.iter().find(|d| d.key == key)
    }

    pub fn objective(&self, key: &str) -> Option<&ObjectiveDesc> {
        self.objectives.iter().find(|o| o.key == key)
    }

    pub fn building_by_name(&self, name: &str) -> Option<&BuildingDesc> {
        self.buildings.iter().find(|b| b.name == name)
    }

    pub fn technology_by_name(&self, name: &str) -> Option<&TechnologyDesc> {
        self.technologies.iter().find(|t| t.name == name)
    }

    pub fn ship_by_name(&self, name: &str) -> Option<&ShipDesc> {
        self.ships.iter().find(|s| s.name == name)
    }

    /// Hull and combat stats for a ship or a defense, whichever matches.
    pub fn unit_stats(&self, key: &str) -> Option<(f64, f64, f64)> {
        if let Some(ship) = self.ship(key) {
            return Some((ship.hull, ship.shield, ship.weapon));
        }
        self.defense(key).map(|d| (d.hull, d.shield, d.weapon))
    }

    /// Unit cost of a ship or defense, used for debris accounting.
    pub fn unit_cost(&self, key: &str) -> Option<&FixedCost> {
        if let Some(ship) = self.ship(key) {
            return Some(&ship.cost);
        }
        self.defense(key).map(|d| &d.cost)
    }

    /// Weighted per-axis distance between two coordinates.
    pub fn distance(&self, from: &Coordinates, to: &Coordinates) -> f64 {
        let w = self.distance_weights;
        (from.galaxy - to.galaxy).abs() as f64 * w.galaxy
            + (from.system - to.system).abs() as f64 * w.system
            + (from.position - to.position).abs() as f64 * w.position
    }
}

lazy_static! {
    static ref CATALOG: Catalog = data::standard();
}

/// The process-wide catalog, immutable after first use.
pub fn catalog() -> &'static Catalog {
    &CATALOG
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_cost_progression() {
        let metal_mine = catalog().building("metal_mine").unwrap();
        let cost = metal_mine.cost.upgrade_cost(0, 1.0);
        assert_eq!(cost["metal"], 60.0);
        assert_eq!(cost["crystal"], 15.0);
        let cost = metal_mine.cost.upgrade_cost(1, 1.0);
        assert_eq!(cost["metal"], 90.0);
        let cost = metal_mine.cost.upgrade_cost(0, 2.0);
        assert_eq!(cost["metal"], 120.0);
    }

    #[test]
    fn test_production_strictly_increases() {
        let metal_mine = catalog().building("metal_mine").unwrap();
        let rule = &metal_mine.production[0];
        let mut previous = rule.hourly(0, 20.0);
        for level in 1..10 {
            let current = rule.hourly(level, 20.0);
            assert!(current > previous);
            previous = current;
        }
    }

    #[test]
    fn test_deuterium_depends_on_temperature() {
        let synthesizer = catalog().building("deuterium_synthesizer").unwrap();
        let rule = &synthesizer.production[0];
        assert!(rule.hourly(5, -40.0) > rule.hourly(5, 40.0));
    }

    #[test]
    fn test_storage_monotonic() {
        let storage = catalog().building("metal_storage").unwrap();
        let rule = &storage.storage[0];
        assert_eq!(rule.capacity(0), 0.0);
        assert!(rule.capacity(3) > rule.capacity(2));
    }

    #[test]
    fn test_lookup_by_canonical_name() {
        assert_eq!(
            catalog().building_by_name("nanite factory").unwrap().key,
            "nanite_factory"
        );
        assert_eq!(
            catalog().technology_by_name("astrophysics").unwrap().key,
            "astrophysics"
        );
        assert!(catalog().ship_by_name("light fighter").is_some());
    }

    #[test]
    fn test_unit_stats_cover_ships_and_defenses() {
        let (hull, shield, weapon) = catalog().unit_stats("small_cargo").unwrap();
        assert_eq!((hull, shield, weapon), (4_000.0, 10.0, 5.0));
        let (hull, shield, weapon) = catalog().unit_stats("rocket_launcher").unwrap();
        assert_eq!((hull, shield, weapon), (2_000.0, 20.0, 80.0));
        assert!(catalog().unit_stats("warp_gate").is_none());
    }

    #[test]
    fn test_distance_weights() {
        let from = Coordinates::new(1, 1, 1, BodyKind::Planet);
        let to = Coordinates::new(2, 3, 5, BodyKind::Planet);
        let w = catalog().distance_weights;
        let expected = w.galaxy + 2.0 * w.system + 4.0 * w.position;
        assert_eq!(catalog().distance(&from, &to), expected);
    }

    #[test]
    fn test_objective_constraints() {
        let attack = catalog().objective(OBJECTIVE_ATTACK).unwrap();
        assert!(attack.hostile && attack.directed);
        assert!(!attack.allows_empty_target);
        let colonize = catalog().objective(OBJECTIVE_COLONIZE).unwrap();
        assert!(colonize.allows_empty_target);
        let harvest = catalog().objective(OBJECTIVE_HARVEST).unwrap();
        assert_eq!(harvest.target_kinds, vec![BodyKind::Debris]);
    }

    #[test]
    fn test_propulsion_speed() {
        let cruiser = catalog().ship("cruiser").unwrap();
        assert_eq!(cruiser.propulsion, Propulsion::Impulse);
        assert_eq!(cruiser.speed(0), cruiser.base_speed);
        assert_eq!(cruiser.speed(5), cruiser.base_speed * 2.0);
    }

    #[test]
    fn test_rapid_fire_tables() {
        let cruiser = catalog().ship("cruiser").unwrap();
        assert_eq!(cruiser.rapid_fire.get("light_fighter"), Some(&6));
        let light_fighter = catalog().ship("light_fighter").unwrap();
        assert!(light_fighter.rapid_fire.get("light_fighter").is_none());
        assert!(light_fighter.rapid_fire.get("cruiser").is_none());
    }
}
