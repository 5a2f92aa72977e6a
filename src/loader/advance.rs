//! Pure update-on-read advancement for one body: completes due actions in
//! order and accrues production between events, so later accruals always
//! use the post-completion rates.

use crate::catalog::Catalog;
use crate::models::{
    ActionFamily, Body, FixedAction, ProgressAction, ResourceStock, Universe,
};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct PendingActions {
    pub building: Option<ProgressAction>,
    pub technology: Option<ProgressAction>,
    pub fixed: Vec<FixedAction>,
}

/// How far a fixed action was consumed during the pass.
#[derive(Debug, Clone)]
pub struct FixedConsumption {
    pub id: Uuid,
    pub element: String,
    pub family: ActionFamily,
    pub units: i64,
    pub remaining: i64,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct AdvanceOutcome {
    pub building_completed: Option<ProgressAction>,
    pub technology_completed: Option<ProgressAction>,
    pub fixed_consumed: Vec<FixedConsumption>,
    pub economy_points: f64,
    pub research_points: f64,
    pub military_points: f64,
}

/// Recompute per-second production and storage capacity from the body's
/// building levels. Moons never produce.
pub fn recompute_derived(body: &mut Body, universe: &Universe, catalog: &Catalog) {
    let is_planet = matches!(body, Body::Planet(_));
    let avg_temperature = body.average_temperature();
    let buildings: Vec<(String, i64)> = body
        .buildings()
        .iter()
        .map(|(key, level)| (key.clone(), *level))
        .collect();

    for resource in &catalog.resources {
        let mut hourly = if is_planet { resource.base_production } else { 0.0 };
        let mut storage = resource.base_storage;
        for (building, level) in &buildings {
            if let Some(desc) = catalog.building(building) {
                for rule in &desc.production {
                    if rule.resource == resource.key && is_planet {
                        hourly += rule.hourly(*level, avg_temperature);
                    }
                }
                for rule in &desc.storage {
                    if rule.resource == resource.key {
                        storage += rule.capacity(*level);
                    }
                }
            }
        }
        let production = hourly / 3_600.0 * universe.production_ratio;
        match body.stock_mut(resource.key) {
            Some(stock) => {
                stock.production = production;
                stock.storage_capacity = storage;
            }
            None => {
                let mut stock = ResourceStock::new(resource.key, 0.0, production, storage);
                stock.production_factor = 1.0;
                body.resources_mut().push(stock);
            }
        }
    }
}

fn accrue_until(body: &mut Body, until: DateTime<Utc>) {
    let elapsed = (until - body.last_activity()).num_milliseconds() as f64 / 1_000.0;
    if elapsed > 0.0 {
        for stock in body.resources_mut().iter_mut() {
            stock.accrue(elapsed);
        }
    }
    body.set_last_activity(until);
}

/// Points value of one produced unit.
fn unit_points(element: &str, universe: &Universe, catalog: &Catalog) -> f64 {
    catalog
        .unit_cost(element)
        .map(|cost| {
            cost.amounts.values().sum::<f64>() * universe.cost_ratio / 1_000.0
        })
        .unwrap_or(0.0)
}

enum Event {
    Building,
    Technology,
    FixedUnit(usize),
}

/// Apply every due completion and accrue resources, stepping event by
/// event so each accrual interval uses the rates in force at its start.
/// Re-running with the same `now` is a no-op.
pub fn advance(
    body: &mut Body,
    pending: &mut PendingActions,
    universe: &Universe,
    catalog: &Catalog,
    now: DateTime<Utc>,
) -> AdvanceOutcome {
    let mut outcome = AdvanceOutcome::default();
    let mut consumed: HashMap<Uuid, FixedConsumption> = HashMap::new();

    loop {
        // earliest due event; ties resolve building < technology < fixed
        // in creation order
        let mut next: Option<(DateTime<Utc>, u8, Event)> = None;
        let mut consider = |at: DateTime<Utc>, priority: u8, event: Event| {
            let earlier = match &next {
                Some((t, p, _)) => (at, priority) < (*t, *p),
                None => true,
            };
            if at <= now && earlier {
                next = Some((at, priority, event));
            }
        };

        if let Some(action) = &pending.building {
            consider(action.completed_at, 0, Event::Building);
        }
        if let Some(action) = &pending.technology {
            consider(action.completed_at, 1, Event::Technology);
        }
        for (index, action) in pending.fixed.iter().enumerate() {
            if action.remaining > 0 {
                consider(action.unit_completion(1), 2, Event::FixedUnit(index));
            }
        }

        let (at, _, event) = match next {
            Some(found) => found,
            None => {
                if body.last_activity() < now {
                    accrue_until(body, now);
                }
                break;
            }
        };
        accrue_until(body, at.max(body.last_activity()));

        match event {
            Event::Building => {
                let action = pending.building.take().unwrap();
                let upgrading = action.desired_level > action.current_level;
                body.buildings_mut()
                    .insert(action.header.element.clone(), action.desired_level);
                if let Some(desc) = catalog.building(&action.header.element) {
                    if desc.fields_delta != 0 {
                        let delta = if upgrading { desc.fields_delta } else { -desc.fields_delta };
                        match body {
                            Body::Planet(p) => p.fields += delta,
                            Body::Moon(m) => m.fields += delta,
                        }
                    }
                }
                recompute_derived(body, universe, catalog);
                outcome.economy_points += action.points;
                outcome.building_completed = Some(action);
            }
            Event::Technology => {
                let action = pending.technology.take().unwrap();
                outcome.research_points += action.points;
                outcome.technology_completed = Some(action);
            }
            Event::FixedUnit(index) => {
                let action = &mut pending.fixed[index];
                action.remaining -= 1;
                action.started_at += Duration::milliseconds(action.unit_duration_ms);
                let element = action.header.element.clone();
                match action.family {
                    ActionFamily::Ship => {
                        *body.ships_mut().entry(element.clone()).or_insert(0) += 1;
                    }
                    ActionFamily::Defense => {
                        *body.defenses_mut().entry(element.clone()).or_insert(0) += 1;
                    }
                    _ => {}
                }
                outcome.military_points += unit_points(&element, universe, catalog);
                let entry = consumed.entry(action.header.id).or_insert(FixedConsumption {
                    id: action.header.id,
                    element,
                    family: action.family,
                    units: 0,
                    remaining: action.remaining,
                    started_at: action.started_at,
                });
                entry.units += 1;
                entry.remaining = action.remaining;
                entry.started_at = action.started_at;
            }
        }
    }

    let mut fixed_consumed: Vec<FixedConsumption> = consumed.into_values().collect();
    fixed_consumed.sort_by_key(|c| c.id);
    outcome.fixed_consumed = fixed_consumed;
    outcome
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::catalog::catalog;
    use crate::models::{ActionHeader, BodyKind, Coordinates, Planet};

    fn planet(metal: f64, crystal: f64) -> Body {
        let mut body = Body::Planet(Planet {
            id: Uuid::new_v4(),
            player: Uuid::new_v4(),
            universe: Uuid::new_v4(),
            coordinates: Coordinates::new(1, 1, 8, BodyKind::Planet),
            name: "testworld".to_string(),
            fields: 163,
            min_temperature: -10,
            max_temperature: 50,
            diameter: 12_800,
            homeworld: true,
            last_activity: Utc::now(),
            resources: vec![],
            buildings: Default::default(),
            ships: Default::default(),
            defenses: Default::default(),
        });
        let universe = Universe::with_defaults(Uuid::new_v4(), "test");
        recompute_derived(&mut body, &universe, catalog());
        if let Some(stock) = body.stock_mut("metal") {
            stock.amount = metal;
        }
        if let Some(stock) = body.stock_mut("crystal") {
            stock.amount = crystal;
        }
        body
    }

    fn building_action(body: &Body, element: &str, to_level: i64, done_at: DateTime<Utc>) -> ProgressAction {
        let desc = catalog().building(element).unwrap();
        let costs = desc.cost.upgrade_cost(to_level - 1, 1.0);
        ProgressAction {
            header: ActionHeader {
                id: Uuid::new_v4(),
                body: body.id(),
                element: element.to_string(),
                created_at: done_at - Duration::seconds(100),
            },
            family: ActionFamily::Building,
            player: body.player(),
            current_level: to_level - 1,
            desired_level: to_level,
            points: costs.values().sum::<f64>() / 1_000.0,
            costs,
            completed_at: done_at,
        }
    }

    #[test]
    fn test_mine_upgrade_completion() {
        let mut body = planet(940.0, 485.0);
        let now = body.last_activity();
        let universe = Universe::with_defaults(Uuid::new_v4(), "test");
        let production_before = body
            .resources()
            .iter()
            .find(|s| s.resource == "metal")
            .unwrap()
            .production;

        let mut pending = PendingActions {
            building: Some(building_action(&body, "metal_mine", 1, now)),
            ..Default::default()
        };
        let outcome = advance(&mut body, &mut pending, &universe, catalog(), now);

        assert_eq!(body.building_level("metal_mine"), 1);
        let completed = outcome.building_completed.unwrap();
        assert_eq!(completed.desired_level, 1);
        // {60 metal, 15 crystal} -> 0.075 points
        assert!((outcome.economy_points - 0.075).abs() < 1e-12);
        let production_after = body
            .resources()
            .iter()
            .find(|s| s.resource == "metal")
            .unwrap()
            .production;
        assert!(production_after > production_before);
    }

    #[test]
    fn test_fixed_queue_partial_consumption() {
        // shipyard 2, nanite 0: a light fighter takes 4000/7500 h = 1920 s
        let mut body = planet(100_000.0, 100_000.0);
        body.buildings_mut().insert("shipyard".to_string(), 2);
        let start = body.last_activity();
        let universe = Universe::with_defaults(Uuid::new_v4(), "test");

        let action = FixedAction {
            header: ActionHeader {
                id: Uuid::new_v4(),
                body: body.id(),
                element: "light_fighter".to_string(),
                created_at: start,
            },
            family: ActionFamily::Ship,
            amount: 10,
            remaining: 10,
            unit_duration_ms: 1_920_000,
            started_at: start,
        };
        let mut pending = PendingActions {
            fixed: vec![action],
            ..Default::default()
        };

        // 1.6 h later exactly three units fit
        let now = start + Duration::milliseconds(5_760_000);
        let outcome = advance(&mut body, &mut pending, &universe, catalog(), now);

        assert_eq!(body.ship_count("light_fighter"), 3);
        assert_eq!(outcome.fixed_consumed.len(), 1);
        let consumption = &outcome.fixed_consumed[0];
        assert_eq!(consumption.units, 3);
        assert_eq!(consumption.remaining, 7);
        assert_eq!(consumption.started_at, start + Duration::milliseconds(3 * 1_920_000));
        // 3 fighters at 4000 a piece
        assert!((outcome.military_points - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_accrual_uses_post_completion_rate() {
        let mut body = planet(0.0, 0.0);
        let start = body.last_activity();
        let universe = Universe::with_defaults(Uuid::new_v4(), "test");

        // the mine finishes halfway through a two hour window
        let mut pending = PendingActions {
            building: Some(building_action(
                &body,
                "metal_mine",
                1,
                start + Duration::hours(1),
            )),
            ..Default::default()
        };
        let now = start + Duration::hours(2);
        advance(&mut body, &mut pending, &universe, catalog(), now);

        // one hour at 30/h (base) plus one hour at 63/h (base + level 1)
        let metal = body.resource_amount("metal");
        assert!((metal - 93.0).abs() < 0.5, "metal was {}", metal);
        assert_eq!(body.last_activity(), now);
    }

    #[test]
    fn test_advance_is_idempotent() {
        let mut body = planet(500.0, 500.0);
        let start = body.last_activity();
        let universe = Universe::with_defaults(Uuid::new_v4(), "test");
        let now = start + Duration::hours(1);

        let mut pending = PendingActions::default();
        advance(&mut body, &mut pending, &universe, catalog(), now);
        let snapshot = body.resource_amount("metal");

        let outcome = advance(&mut body, &mut pending, &universe, catalog(), now);
        assert_eq!(body.resource_amount("metal"), snapshot);
        assert!(outcome.building_completed.is_none());
        assert!(outcome.fixed_consumed.is_empty());
    }

    #[test]
    fn test_accrual_clamps_to_storage() {
        let mut body = planet(9_990.0, 0.0);
        let start = body.last_activity();
        let universe = Universe::with_defaults(Uuid::new_v4(), "test");

        // base storage is 10k; a year of production cannot pass it
        let now = start + Duration::days(365);
        let mut pending = PendingActions::default();
        advance(&mut body, &mut pending, &universe, catalog(), now);
        let stock = body
            .resources()
            .iter()
            .find(|s| s.resource == "metal")
            .unwrap();
        assert_eq!(stock.amount, stock.storage_capacity);
    }

    #[test]
    fn test_future_actions_stay_pending() {
        let mut body = planet(500.0, 500.0);
        let now = body.last_activity();
        let universe = Universe::with_defaults(Uuid::new_v4(), "test");
        let mut pending = PendingActions {
            building: Some(building_action(
                &body,
                "metal_mine",
                1,
                now + Duration::hours(1),
            )),
            ..Default::default()
        };
        let outcome = advance(&mut body, &mut pending, &universe, catalog(), now);
        assert!(outcome.building_completed.is_none());
        assert!(pending.building.is_some());
        assert_eq!(body.building_level("metal_mine"), 0);
    }

    #[test]
    fn test_moon_produces_nothing() {
        let planet_body = planet(0.0, 0.0);
        let universe = Universe::with_defaults(Uuid::new_v4(), "test");
        let mut moon = Body::Moon(crate::models::Moon {
            id: Uuid::new_v4(),
            planet: planet_body.id(),
            player: planet_body.player(),
            universe: universe.id,
            coordinates: planet_body.coordinates().with_kind(BodyKind::Moon),
            name: "moon".to_string(),
            fields: 5,
            diameter: 5_000,
            last_activity: Utc::now(),
            resources: vec![],
            buildings: Default::default(),
            ships: Default::default(),
            defenses: Default::default(),
        });
        recompute_derived(&mut moon, &universe, catalog());
        let start = moon.last_activity();
        let now = start + Duration::hours(10);
        let mut pending = PendingActions::default();
        advance(&mut moon, &mut pending, &universe, catalog(), now);
        assert_eq!(moon.resource_amount("metal"), 0.0);
        assert_eq!(moon.last_activity(), now);
    }
}
