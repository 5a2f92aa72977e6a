//! Action engine: validates, costs, times and persists the three action
//! families, and computes their completion effects for the update-on-read
//! pass.

use crate::catalog::{self, Catalog, BUILDING_NANITE, BUILDING_RESEARCH_LAB, BUILDING_ROBOTICS,
    BUILDING_SHIPYARD};
use crate::db::DbClient;
use crate::error::{Error, Result};
use crate::loader;
use crate::models::{
    ActionFamily, ActionHeader, Body, FixedAction, Player, ProgressAction, Universe,
};
use crate::repo;
use crate::util::secs_to_duration;
use chrono::{DateTime, Duration, Utc};
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::AsyncConnection as _;
use std::collections::HashMap;
use tracing::*;
use uuid::Uuid;

/// Upgrade request for a building or a technology. The levels are the
/// caller's view and are verified against the actual state.
#[derive(Debug, Clone)]
pub struct ProgressRequest {
    pub body: Uuid,
    pub element: String,
    pub current_level: i64,
    pub desired_level: i64,
}

/// Request for a batch of ships or defenses.
#[derive(Debug, Clone)]
pub struct FixedRequest {
    pub body: Uuid,
    pub family: ActionFamily,
    pub element: String,
    pub amount: i64,
}

pub fn total_cost(costs: &HashMap<String, f64>) -> f64 {
    costs.values().sum()
}

/// Points credited for a completed action.
pub fn points_for(costs: &HashMap<String, f64>) -> f64 {
    total_cost(costs) / 1000.0
}

fn build_power_cost(costs: &HashMap<String, f64>) -> f64 {
    costs.get(catalog::RESOURCE_METAL).copied().unwrap_or(0.0)
        + costs.get(catalog::RESOURCE_CRYSTAL).copied().unwrap_or(0.0)
}

/// Building upgrade duration:
/// `(metal + crystal) / (2500 * (1 + robotics) * 2^nanite)` hours, divided
/// by the universe speed.
pub fn building_duration(
    costs: &HashMap<String, f64>,
    robotics_level: i64,
    nanite_level: i64,
    eco_speed: f64,
) -> Duration {
    let divisor = 2_500.0 * (1.0 + robotics_level as f64) * 2f64.powi(nanite_level as i32);
    let hours = build_power_cost(costs) / divisor;
    secs_to_duration(hours * 3_600.0 / eco_speed)
}

/// Aggregate research power: the local lab plus the `network_level` highest
/// labs on the player's other bodies.
pub fn research_power(local_lab: i64, other_labs: &[i64], network_level: i64) -> i64 {
    let mut others: Vec<i64> = other_labs.to_vec();
    others.sort_unstable_by(|a, b| b.cmp(a));
    let linked: i64 = others.iter().take(network_level as usize).sum();
    local_lab + linked
}

/// Technology research duration:
/// `(metal + crystal) / (1000 * (1 + researchPower))` hours, divided by the
/// universe speed.
pub fn technology_duration(
    costs: &HashMap<String, f64>,
    research_power: i64,
    eco_speed: f64,
) -> Duration {
    let divisor = 1_000.0 * (1.0 + research_power as f64);
    let hours = build_power_cost(costs) / divisor;
    secs_to_duration(hours * 3_600.0 / eco_speed)
}

/// Per-unit duration for ships and defenses, same shape as buildings but
/// driven by the shipyard.
pub fn unit_duration(
    costs: &HashMap<String, f64>,
    shipyard_level: i64,
    nanite_level: i64,
    eco_speed: f64,
) -> Duration {
    let divisor = 2_500.0 * (1.0 + shipyard_level as f64) * 2f64.powi(nanite_level as i32);
    let hours = build_power_cost(costs) / divisor;
    secs_to_duration(hours * 3_600.0 / eco_speed)
}

fn check_affordable(body: &Body, costs: &HashMap<String, f64>) -> Result<()> {
    for (resource, cost) in costs {
        if body.resource_amount(resource) < *cost {
            return Err(Error::InvalidAmountForAction);
        }
    }
    Ok(())
}

fn check_prerequisites(body: &Body, player: &Player, prerequisites: &[catalog::Prerequisite]) -> bool {
    prerequisites.iter().all(|p| {
        body.building_level(p.element) >= p.level || player.technology_level(p.element) >= p.level
    })
}

/// Validation for a building upgrade. Returns the action, fully costed and
/// timed, ready to persist.
pub fn validate_building_upgrade(
    request: &ProgressRequest,
    body: &Body,
    player: &Player,
    universe: &Universe,
    catalog: &Catalog,
    pending_building: &Option<ProgressAction>,
    now: DateTime<Utc>,
) -> Result<ProgressAction> {
    if request.body != body.id() {
        return Err(Error::InvalidPlanetForAction);
    }
    let desc = catalog
        .building(&request.element)
        .ok_or(Error::NonExistingElement)?;
    if !desc.allowed_on.allows(body.kind()) {
        return Err(Error::BuildingCannotBeBuilt);
    }
    if !check_prerequisites(body, player, &desc.prerequisites) {
        return Err(Error::BuildingCannotBeBuilt);
    }
    if pending_building.is_some() {
        return Err(Error::OnlyOneActionAuthorized);
    }
    let actual = body.building_level(&request.element);
    if request.current_level != actual {
        return Err(Error::LevelIncorrect);
    }
    if (request.desired_level - request.current_level).abs() != 1 || request.desired_level < 0 {
        return Err(Error::InvalidLevelForAction);
    }
    if request.desired_level > request.current_level && body.remaining_fields() < 1 {
        return Err(Error::NoFieldsLeft);
    }

    // a downgrade is priced like the upgrade it reverts
    let cost_level = request.current_level.min(request.desired_level);
    let costs = desc.cost.upgrade_cost(cost_level, universe.cost_ratio);
    check_affordable(body, &costs)?;

    let duration = building_duration(
        &costs,
        body.building_level(BUILDING_ROBOTICS),
        body.building_level(BUILDING_NANITE),
        universe.eco_speed,
    );
    Ok(ProgressAction {
        header: ActionHeader {
            id: Uuid::new_v4(),
            body: body.id(),
            element: request.element.clone(),
            created_at: now,
        },
        family: ActionFamily::Building,
        player: body.player(),
        current_level: request.current_level,
        desired_level: request.desired_level,
        points: points_for(&costs),
        costs,
        completed_at: now + duration,
    })
}

/// Validation for a technology research.
pub fn validate_technology_research(
    request: &ProgressRequest,
    body: &Body,
    player: &Player,
    other_labs: &[i64],
    universe: &Universe,
    catalog: &Catalog,
    pending_technology: &Option<ProgressAction>,
    now: DateTime<Utc>,
) -> Result<ProgressAction> {
    if request.body != body.id() {
        return Err(Error::InvalidPlanetForAction);
    }
    if body.player() != player.id {
        return Err(Error::InvalidPlayerForAction);
    }
    let desc = catalog
        .technology(&request.element)
        .ok_or(Error::NonExistingElement)?;
    if !check_prerequisites(body, player, &desc.prerequisites) {
        return Err(Error::BuildingCannotBeBuilt);
    }
    if pending_technology.is_some() {
        return Err(Error::OnlyOneActionAuthorized);
    }
    let actual = player.technology_level(&request.element);
    if request.current_level != actual {
        return Err(Error::LevelIncorrect);
    }
    if request.desired_level != request.current_level + 1 {
        return Err(Error::InvalidLevelForAction);
    }

    let costs = desc.cost.upgrade_cost(request.current_level, universe.cost_ratio);
    check_affordable(body, &costs)?;

    let power = research_power(
        body.building_level(BUILDING_RESEARCH_LAB),
        other_labs,
        player.technology_level(crate::models::TECH_RESEARCH_NETWORK),
    );
    let duration = technology_duration(&costs, power, universe.eco_speed);
    Ok(ProgressAction {
        header: ActionHeader {
            id: Uuid::new_v4(),
            body: body.id(),
            element: request.element.clone(),
            created_at: now,
        },
        family: ActionFamily::Technology,
        player: player.id,
        current_level: request.current_level,
        desired_level: request.desired_level,
        points: points_for(&costs),
        costs,
        completed_at: now + duration,
    })
}

/// Validation for a ship or defense batch. The start instant chains behind
/// the family's queue tail.
pub fn validate_fixed_batch(
    request: &FixedRequest,
    body: &Body,
    universe: &Universe,
    catalog: &Catalog,
    queue_tail: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<(FixedAction, HashMap<String, f64>)> {
    if request.body != body.id() {
        return Err(Error::InvalidPlanetForAction);
    }
    if request.amount <= 0 {
        return Err(Error::InvalidAmountForAction);
    }
    let unit_cost = match request.family {
        ActionFamily::Ship => {
            let desc = catalog.ship(&request.element).ok_or(Error::NonExistingElement)?;
            desc.cost.unit_cost(universe.cost_ratio)
        }
        ActionFamily::Defense => {
            let desc = catalog
                .defense(&request.element)
                .ok_or(Error::NonExistingElement)?;
            desc.cost.unit_cost(universe.cost_ratio)
        }
        _ => return Err(Error::InvalidElementForAction),
    };

    let costs: HashMap<String, f64> = unit_cost
        .iter()
        .map(|(resource, cost)| (resource.clone(), cost * request.amount as f64))
        .collect();
    check_affordable(body, &costs)?;

    let duration = unit_duration(
        &unit_cost,
        body.building_level(BUILDING_SHIPYARD),
        body.building_level(BUILDING_NANITE),
        universe.eco_speed,
    );
    let started_at = match queue_tail {
        Some(tail) if tail > now => tail,
        _ => now,
    };
    let action = FixedAction {
        header: ActionHeader {
            id: Uuid::new_v4(),
            body: body.id(),
            element: request.element.clone(),
            created_at: now,
        },
        family: request.family,
        amount: request.amount,
        remaining: request.amount,
        unit_duration_ms: duration.num_milliseconds(),
        started_at,
    };
    Ok((action, costs))
}

/// Queue a building upgrade on a body. Costs are debited within the same
/// transaction that registers the action.
pub async fn create_building_action(
    db: &DbClient,
    request: ProgressRequest,
    now: DateTime<Utc>,
) -> Result<ProgressAction> {
    let mut conn = db.conn().await?;
    conn.transaction::<_, Error, _>(|conn| {
        async move {
            let refreshed = loader::refresh_body_locked(conn, request.body, now).await?;
            let player = repo::players::fetch(conn, refreshed.body.player()).await?;
            let action = validate_building_upgrade(
                &request,
                &refreshed.body,
                &player,
                &refreshed.universe,
                catalog::catalog(),
                &refreshed.building_action,
                now,
            )?;
            repo::actions::create_progress(conn, &action).await?;
            info!(
                "queued building upgrade {} -> {} on {}",
                action.header.element, action.desired_level, action.header.body
            );
            Ok(action)
        }
        .scope_boxed()
    })
    .await
}

/// Queue a technology research. Research is player-global, so the player
/// row is locked alongside the financing body.
pub async fn create_technology_action(
    db: &DbClient,
    request: ProgressRequest,
    now: DateTime<Utc>,
) -> Result<ProgressAction> {
    let mut conn = db.conn().await?;
    conn.transaction::<_, Error, _>(|conn| {
        async move {
            let refreshed = loader::refresh_body_locked(conn, request.body, now).await?;
            repo::players::lock(conn, refreshed.body.player()).await?;
            let player = repo::players::fetch(conn, refreshed.body.player()).await?;
            let labs = repo::players::research_lab_levels(
                conn,
                player.id,
                BUILDING_RESEARCH_LAB,
            )
            .await?;
            let other_labs: Vec<i64> = labs
                .iter()
                .filter(|(body, _)| *body != request.body)
                .map(|(_, level)| *level)
                .collect();
            let pending = repo::actions::technology_action(conn, player.id).await?;
            let action = validate_technology_research(
                &request,
                &refreshed.body,
                &player,
                &other_labs,
                &refreshed.universe,
                catalog::catalog(),
                &pending,
                now,
            )?;
            repo::actions::create_progress(conn, &action).await?;
            info!(
                "queued research {} -> {} for {}",
                action.header.element, action.desired_level, player.id
            );
            Ok(action)
        }
        .scope_boxed()
    })
    .await
}

/// Queue a batch of ships or defenses behind the family's existing queue.
pub async fn create_fixed_action(
    db: &DbClient,
    request: FixedRequest,
    now: DateTime<Utc>,
) -> Result<FixedAction> {
    let mut conn = db.conn().await?;
    conn.transaction::<_, Error, _>(|conn| {
        async move {
            let refreshed = loader::refresh_body_locked(conn, request.body, now).await?;
            let tail = repo::actions::queue_tail(conn, request.body, request.family).await?;
            let (action, costs) = validate_fixed_batch(
                &request,
                &refreshed.body,
                &refreshed.universe,
                catalog::catalog(),
                tail,
                now,
            )?;
            repo::actions::create_fixed(conn, &action, &costs).await?;
            info!(
                "queued {} x{} on {}",
                action.header.element, action.amount, action.header.body
            );
            Ok(action)
        }
        .scope_boxed()
    })
    .await
}

#[cfg(test)]
mod test {
    use super::*;

    fn costs(metal: f64, crystal: f64) -> HashMap<String, f64> {
        let mut map = HashMap::new();
        map.insert("metal".to_string(), metal);
        map.insert("crystal".to_string(), crystal);
        map
    }

    #[test]
    fn test_building_duration() {
        // 2500 + 500 over 2500 * 3 * 2 = 0.2h
        let duration = building_duration(&costs(2_500.0, 500.0), 2, 1, 1.0);
        assert_eq!(duration, Duration::milliseconds(720_000));
        // doubled universe speed halves it
        let duration = building_duration(&costs(2_500.0, 500.0), 2, 1, 2.0);
        assert_eq!(duration, Duration::milliseconds(360_000));
    }

    #[test]
    fn test_technology_duration() {
        // 4000 / (1000 * 5) = 0.8h
        let duration = technology_duration(&costs(3_000.0, 1_000.0), 4, 1.0);
        assert_eq!(duration, Duration::milliseconds(2_880_000));
    }

    #[test]
    fn test_unit_duration_matches_shipyard_scaling() {
        // light fighter 4000 at shipyard 2, nanite 0: 4000/7500 h
        let duration = unit_duration(&costs(3_000.0, 1_000.0), 2, 0, 1.0);
        assert_eq!(duration, Duration::milliseconds(1_920_000));
    }

    #[test]
    fn test_research_power_network() {
        // no network: only the local lab counts
        assert_eq!(research_power(4, &[10, 8, 2], 0), 4);
        // network 2 links the two best remote labs
        assert_eq!(research_power(4, &[10, 8, 2], 2), 22);
        // more slots than labs
        assert_eq!(research_power(4, &[3], 5), 7);
    }

    #[test]
    fn test_points_for() {
        assert_eq!(points_for(&costs(60.0, 15.0)), 0.075);
    }

    mod validation {
        use crate::actions::*;
        use crate::error::Error;
        use crate::models::{Body, BodyKind, Coordinates, Planet, ResourceStock};
        use chrono::{Duration, Utc};

        fn body_with(metal: f64, crystal: f64, fields: i64) -> Body {
            Body::Planet(Planet {
                id: Uuid::new_v4(),
                player: Uuid::new_v4(),
                universe: Uuid::new_v4(),
                coordinates: Coordinates::new(1, 1, 8, BodyKind::Planet),
                name: "testworld".to_string(),
                fields,
                min_temperature: -10,
                max_temperature: 50,
                diameter: 12_800,
                homeworld: true,
                last_activity: Utc::now(),
                resources: vec![
                    ResourceStock::new("metal", metal, 0.0, 100_000.0),
                    ResourceStock::new("crystal", crystal, 0.0, 100_000.0),
                    ResourceStock::new("deuterium", 0.0, 0.0, 100_000.0),
                ],
                buildings: Default::default(),
                ships: Default::default(),
                defenses: Default::default(),
            })
        }

        fn player_for(body: &Body) -> Player {
            Player {
                id: body.player(),
                account: Uuid::new_v4(),
                universe: body.universe(),
                name: "tester".to_string(),
                economy_points: 0.0,
                research_points: 0.0,
                military_points: 0.0,
                fleets_count: 0,
                expeditions_count: 0,
                technologies: Default::default(),
                created_at: Utc::now(),
            }
        }

        fn request(body: &Body, element: &str, from: i64, to: i64) -> ProgressRequest {
            ProgressRequest {
                body: body.id(),
                element: element.to_string(),
                current_level: from,
                desired_level: to,
            }
        }

        #[test]
        fn test_mine_upgrade_accepted_and_costed() {
            let body = body_with(1_000.0, 500.0, 163);
            let player = player_for(&body);
            let universe = Universe::with_defaults(Uuid::new_v4(), "test");
            let now = Utc::now();
            let action = validate_building_upgrade(
                &request(&body, "metal_mine", 0, 1),
                &body,
                &player,
                &universe,
                crate::catalog::catalog(),
                &None,
                now,
            )
            .unwrap();
            assert_eq!(action.costs["metal"], 60.0);
            assert_eq!(action.costs["crystal"], 15.0);
            assert!((action.points - 0.075).abs() < 1e-12);
            assert!(action.completed_at > now);

            // the debit the routine performs leaves 940 / 485
            let mut debited = body.clone();
            for (resource, cost) in &action.costs {
                debited.debit(resource, *cost);
            }
            assert_eq!(debited.resource_amount("metal"), 940.0);
            assert_eq!(debited.resource_amount("crystal"), 485.0);
        }

        #[test]
        fn test_upgrade_with_no_fields_left() {
            let mut body = body_with(1_000.0, 500.0, 1);
            body.buildings_mut().insert("metal_mine".to_string(), 1);
            let player = player_for(&body);
            let universe = Universe::with_defaults(Uuid::new_v4(), "test");
            let result = validate_building_upgrade(
                &request(&body, "metal_mine", 1, 2),
                &body,
                &player,
                &universe,
                crate::catalog::catalog(),
                &None,
                Utc::now(),
            );
            assert!(matches!(result, Err(Error::NoFieldsLeft)));
        }

        #[test]
        fn test_upgrade_level_mismatch() {
            let body = body_with(1_000.0, 500.0, 163);
            let player = player_for(&body);
            let universe = Universe::with_defaults(Uuid::new_v4(), "test");
            let result = validate_building_upgrade(
                &request(&body, "metal_mine", 3, 4),
                &body,
                &player,
                &universe,
                crate::catalog::catalog(),
                &None,
                Utc::now(),
            );
            assert!(matches!(result, Err(Error::LevelIncorrect)));
        }

        #[test]
        fn test_only_one_building_action() {
            let body = body_with(1_000.0, 500.0, 163);
            let player = player_for(&body);
            let universe = Universe::with_defaults(Uuid::new_v4(), "test");
            let now = Utc::now();
            let pending = validate_building_upgrade(
                &request(&body, "metal_mine", 0, 1),
                &body,
                &player,
                &universe,
                crate::catalog::catalog(),
                &None,
                now,
            )
            .unwrap();
            let result = validate_building_upgrade(
                &request(&body, "crystal_mine", 0, 1),
                &body,
                &player,
                &universe,
                crate::catalog::catalog(),
                &Some(pending),
                now,
            );
            assert!(matches!(result, Err(Error::OnlyOneActionAuthorized)));
        }

        #[test]
        fn test_unaffordable_upgrade() {
            let body = body_with(10.0, 10.0, 163);
            let player = player_for(&body);
            let universe = Universe::with_defaults(Uuid::new_v4(), "test");
            let result = validate_building_upgrade(
                &request(&body, "metal_mine", 0, 1),
                &body,
                &player,
                &universe,
                crate::catalog::catalog(),
                &None,
                Utc::now(),
            );
            assert!(matches!(result, Err(Error::InvalidAmountForAction)));
        }

        #[test]
        fn test_planet_only_building_rejected_on_moon() {
            let planet = body_with(100_000.0, 100_000.0, 163);
            let moon = Body::Moon(crate::models::Moon {
                id: Uuid::new_v4(),
                planet: planet.id(),
                player: planet.player(),
                universe: planet.universe(),
                coordinates: planet.coordinates().with_kind(BodyKind::Moon),
                name: "moon".to_string(),
                fields: 10,
                diameter: 5_000,
                last_activity: Utc::now(),
                resources: vec![ResourceStock::new("metal", 10_000.0, 0.0, 100_000.0)],
                buildings: Default::default(),
                ships: Default::default(),
                defenses: Default::default(),
            });
            let player = player_for(&moon);
            let universe = Universe::with_defaults(Uuid::new_v4(), "test");
            let result = validate_building_upgrade(
                &request(&moon, "metal_mine", 0, 1),
                &moon,
                &player,
                &universe,
                crate::catalog::catalog(),
                &None,
                Utc::now(),
            );
            assert!(matches!(result, Err(Error::BuildingCannotBeBuilt)));
        }

        #[test]
        fn test_technology_research_times_with_network() {
            let mut body = body_with(100_000.0, 100_000.0, 163);
            body.buildings_mut().insert("research_lab".to_string(), 4);
            let mut player = player_for(&body);
            player
                .technologies
                .insert(crate::models::TECH_RESEARCH_NETWORK.to_string(), 1);
            let universe = Universe::with_defaults(Uuid::new_v4(), "test");
            let now = Utc::now();
            let action = validate_technology_research(
                &request(&body, "armour", 0, 1),
                &body,
                &player,
                &[6, 2],
                &universe,
                crate::catalog::catalog(),
                &None,
                now,
            )
            .unwrap();
            // 1000 metal over 1000 * (1 + 4 + 6) = 1/11 h
            let expected = technology_duration(&action.costs, 10, 1.0);
            assert_eq!(action.completed_at, now + expected);
        }

        #[test]
        fn test_fixed_batch_queues_behind_tail() {
            let mut body = body_with(100_000.0, 100_000.0, 163);
            body.buildings_mut().insert("shipyard".to_string(), 2);
            let universe = Universe::with_defaults(Uuid::new_v4(), "test");
            let now = Utc::now();
            let tail = now + Duration::hours(2);
            let (action, costs) = validate_fixed_batch(
                &FixedRequest {
                    body: body.id(),
                    family: ActionFamily::Ship,
                    element: "light_fighter".to_string(),
                    amount: 10,
                },
                &body,
                &universe,
                crate::catalog::catalog(),
                Some(tail),
                now,
            )
            .unwrap();
            assert_eq!(action.started_at, tail);
            assert_eq!(action.remaining, 10);
            assert_eq!(action.unit_duration_ms, 1_920_000);
            assert_eq!(costs["metal"], 30_000.0);
            assert_eq!(costs["crystal"], 10_000.0);
        }

        #[test]
        fn test_fixed_batch_rejects_wrong_family() {
            let body = body_with(100_000.0, 100_000.0, 163);
            let universe = Universe::with_defaults(Uuid::new_v4(), "test");
            let result = validate_fixed_batch(
                &FixedRequest {
                    body: body.id(),
                    family: ActionFamily::Ship,
                    element: "rocket_launcher".to_string(),
                    amount: 5,
                },
                &body,
                &universe,
                crate::catalog::catalog(),
                None,
                Utc::now(),
            );
            assert!(matches!(result, Err(Error::NonExistingElement)));
        }
    }
}
