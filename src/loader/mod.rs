//! Entity loaders. Reading an entity returns its state as of now: every
//! pending time-based effect (fleet events, action completions, resource
//! accrual) is applied under the entity's lock before the read returns.

pub mod advance;

pub use advance::{AdvanceOutcome, FixedConsumption, PendingActions};

use crate::catalog::{self, OBJECTIVE_ACS_DEFEND};
use crate::db::DbClient;
use crate::error::{Error, Result};
use crate::fleet;
use crate::models::{
    Account, Body, BodyKind, Coordinates, Fleet, Moon, Planet, Player, ResourceStock, Universe,
};
use crate::repo;
use chrono::{DateTime, Utc};
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::AsyncConnection as _;
use diesel_async::AsyncPgConnection;
use tracing::*;
use uuid::Uuid;

/// A body refreshed to `now`, with whatever actions are still pending.
#[derive(Debug)]
pub struct RefreshedBody {
    pub body: Body,
    pub universe: Universe,
    pub building_action: Option<crate::models::ProgressAction>,
    pub technology_action: Option<crate::models::ProgressAction>,
    pub fixed_actions: Vec<crate::models::FixedAction>,
}

/// Run the update-on-read pass for one body inside the caller's
/// transaction. The body row is locked first; fleet events apply before
/// action completions, which apply before the final accrual; everything is
/// persisted as one batch by the surrounding transaction.
pub async fn refresh_body_locked(
    conn: &mut AsyncPgConnection,
    body_id: Uuid,
    now: DateTime<Utc>,
) -> Result<RefreshedBody> {
    repo::bodies::lock(conn, body_id).await?;

    // returns first: they credit rows directly, so the body must be
    // rehydrated afterwards
    let returns = repo::fleets::returning_to(conn, body_id, now).await?;
    for fleet in &returns {
        fleet::process_return(conn, fleet).await?;
    }

    let mut body = repo::bodies::fetch(conn, body_id).await?;
    let universe = repo::universes::fetch(conn, body.universe()).await?;

    let arrivals =
        repo::fleets::arrivals_at(conn, universe.id, &body.coordinates(), now).await?;
    for arrived in &arrivals {
        if arrived.objective == OBJECTIVE_ACS_DEFEND {
            continue;
        }
        fleet::process_arrival(conn, arrived, Some(&mut body), &universe, now).await?;
    }

    let building = repo::actions::building_action(conn, body_id).await?;
    let mut technology = repo::actions::technology_action(conn, body.player()).await?;
    let technology_due = technology
        .as_ref()
        .map(|t| t.completed_at <= now)
        .unwrap_or(false);
    if technology_due {
        // research is player-global: take the player lock, then re-read so
        // a concurrent pass cannot complete the same action twice
        repo::players::lock(conn, body.player()).await?;
        technology = repo::actions::technology_action(conn, body.player()).await?;
    }
    let fixed = repo::actions::fixed_for_body(conn, body_id).await?;

    let mut pending = PendingActions {
        building,
        technology,
        fixed,
    };
    let outcome = advance::advance(
        &mut body,
        &mut pending,
        &universe,
        catalog::catalog(),
        now,
    );

    if let Some(action) = &outcome.building_completed {
        repo::bodies::set_building_level(
            conn,
            body_id,
            &action.header.element,
            action.desired_level,
        )
        .await?;
        repo::actions::delete_progress(conn, action.header.id).await?;
        repo::players::add_economy_points(conn, action.player, action.points).await?;
        debug!(
            "completed building {} -> {} on {}",
            action.header.element, action.desired_level, body_id
        );
    }
    if let Some(action) = &outcome.technology_completed {
        repo::players::set_technology(
            conn,
            action.player,
            &action.header.element,
            action.desired_level,
        )
        .await?;
        repo::actions::delete_progress(conn, action.header.id).await?;
        repo::players::add_research_points(conn, action.player, action.points).await?;
        debug!(
            "completed research {} -> {} for {}",
            action.header.element, action.desired_level, action.player
        );
    }
    for consumption in &outcome.fixed_consumed {
        repo::actions::consume_fixed(
            conn,
            consumption.id,
            consumption.remaining,
            consumption.started_at,
        )
        .await?;
    }
    if outcome.military_points > 0.0 {
        repo::players::add_military_points(conn, body.player(), outcome.military_points).await?;
    }

    repo::bodies::persist_refresh(conn, &body).await?;

    pending.fixed.retain(|f| f.remaining > 0);
    Ok(RefreshedBody {
        body,
        universe,
        building_action: pending.building,
        technology_action: pending.technology,
        fixed_actions: pending.fixed,
    })
}

/// Load a planet as of now.
pub async fn planet(db: &DbClient, id: Uuid, now: DateTime<Utc>) -> Result<Planet> {
    match body(db, id, now).await? {
        Body::Planet(planet) => Ok(planet),
        Body::Moon(_) => Err(Error::NonExistingPlanet),
    }
}

/// Load a moon as of now.
pub async fn moon(db: &DbClient, id: Uuid, now: DateTime<Utc>) -> Result<Moon> {
    match body(db, id, now).await? {
        Body::Moon(moon) => Ok(moon),
        Body::Planet(_) => Err(Error::NonExistingMoon),
    }
}

pub async fn body(db: &DbClient, id: Uuid, now: DateTime<Utc>) -> Result<Body> {
    let mut conn = db.conn().await?;
    conn.transaction::<_, Error, _>(|conn| {
        async move {
            let refreshed = refresh_body_locked(conn, id, now).await?;
            Ok(refreshed.body)
        }
        .scope_boxed()
    })
    .await
}

/// Load a player as of now: a due technology action is completed first.
pub async fn player(db: &DbClient, id: Uuid, now: DateTime<Utc>) -> Result<Player> {
    let mut conn = db.conn().await?;
    conn.transaction::<_, Error, _>(|conn| {
        async move {
            repo::players::lock(conn, id).await?;
            if let Some(action) = repo::actions::technology_action(conn, id).await? {
                if action.completed_at <= now {
                    repo::players::set_technology(
                        conn,
                        action.player,
                        &action.header.element,
                        action.desired_level,
                    )
                    .await?;
                    repo::actions::delete_progress(conn, action.header.id).await?;
                    repo::players::add_research_points(conn, action.player, action.points)
                        .await?;
                }
            }
            repo::players::fetch(conn, id).await
        }
        .scope_boxed()
    })
    .await
}

/// Load a fleet as of now, advancing it if its arrival or return is due.
/// A consumed fleet (deployed, colonized, destroyed, returned) reports as
/// missing.
pub async fn fleet(db: &DbClient, id: Uuid, now: DateTime<Utc>) -> Result<Fleet> {
    let mut conn = db.conn().await?;
    conn.transaction::<_, Error, _>(|conn| {
        async move {
            let flying = repo::fleets::fetch(conn, id).await?;
            if flying.has_returned(now) {
                let components = repo::fleets::components(conn, id).await?;
                let sources: Vec<Uuid> = components.iter().map(|c| c.source).collect();
                repo::bodies::lock_all(conn, &sources).await?;
                fleet::process_return(conn, &flying).await?;
                return Err(Error::ElementNotFound);
            }
            if flying.has_arrived(now)
                && !flying.is_returning
                && flying.objective != OBJECTIVE_ACS_DEFEND
            {
                let universe = repo::universes::fetch(conn, flying.universe).await?;
                let target = repo::bodies::fetch_by_coordinates(
                    conn,
                    universe.id,
                    &flying.target,
                )
                .await?;
                match target {
                    Some(target_body) => {
                        // the body refresh pass also advances this fleet
                        refresh_body_locked(conn, target_body.id(), now).await?;
                    }
                    None => {
                        fleet::process_arrival(conn, &flying, None, &universe, now).await?;
                    }
                }
                return repo::fleets::fetch(conn, id).await;
            }
            Ok(flying)
        }
        .scope_boxed()
    })
    .await
}

pub async fn account(db: &DbClient, id: Uuid) -> Result<Account> {
    let mut conn = db.conn().await?;
    repo::accounts::fetch(&mut conn, id).await
}

pub async fn create_account(db: &DbClient, account: &Account) -> Result<()> {
    let mut conn = db.conn().await?;
    repo::accounts::create(&mut conn, account).await
}

pub async fn update_account(db: &DbClient, account: &Account) -> Result<()> {
    let mut conn = db.conn().await?;
    repo::accounts::update(&mut conn, account).await
}

/// Register a player in a universe and provision their homeworld on the
/// first free slot.
pub async fn create_player(
    db: &DbClient,
    account: Uuid,
    universe_id: Uuid,
    name: &str,
    now: DateTime<Utc>,
) -> Result<(Player, Planet)> {
    let mut conn = db.conn().await?;
    conn.transaction::<_, Error, _>(|conn| {
        async move {
            let universe = repo::universes::fetch(conn, universe_id).await?;
            let player = Player {
                id: Uuid::new_v4(),
                account,
                universe: universe_id,
                name: name.to_string(),
                economy_points: 0.0,
                research_points: 0.0,
                military_points: 0.0,
                fleets_count: 0,
                expeditions_count: 0,
                technologies: Default::default(),
                created_at: now,
            };
            repo::players::create(conn, &player).await?;

            let slot = free_slot(conn, &universe).await?;
            let homeworld =
                provision_planet(&universe, player.id, slot, "homeworld", true, now);
            repo::bodies::create_planet(conn, &homeworld).await?;
            info!(
                "player {} joined {} at {}",
                player.name, universe.name, homeworld.coordinates
            );
            Ok((player, homeworld))
        }
        .scope_boxed()
    })
    .await
}

async fn free_slot(conn: &mut AsyncPgConnection, universe: &Universe) -> Result<Coordinates> {
    for galaxy in 1..=universe.galaxies {
        let occupied = repo::bodies::occupied_slots(conn, universe.id, galaxy).await?;
        for system in 1..=universe.systems {
            // central positions only: the climate there can sustain a start
            for position in 4..=(universe.positions - 3) {
                if !occupied.contains(&(system, position)) {
                    return Ok(Coordinates::new(galaxy, system, position, BodyKind::Planet));
                }
            }
        }
    }
    Err(Error::NonExistingUniverse)
}

/// Climate and surface bands by orbital position.
fn planet_band(position: i64) -> (i64, i64, i64, i64) {
    match position {
        1..=3 => (40, 120, 120, 10_500),
        4..=6 => (10, 70, 150, 12_200),
        7..=9 => (-10, 50, 163, 12_800),
        10..=12 => (-40, 20, 150, 13_500),
        _ => (-120, -10, 110, 14_500),
    }
}

/// Build a fresh planet model: bands by position, starting stocks from the
/// catalog, production derived from (empty) building state.
pub fn provision_planet(
    universe: &Universe,
    player: Uuid,
    coordinates: Coordinates,
    name: &str,
    homeworld: bool,
    now: DateTime<Utc>,
) -> Planet {
    let (min_temperature, max_temperature, fields, diameter) = planet_band(coordinates.position);
    let resources = catalog::catalog()
        .resources
        .iter()
        .map(|r| ResourceStock::new(r.key, r.starting_amount, 0.0, r.base_storage))
        .collect();
    let mut planet = Planet {
        id: Uuid::new_v4(),
        player,
        universe: universe.id,
        coordinates,
        name: name.to_string(),
        fields,
        min_temperature,
        max_temperature,
        diameter,
        homeworld,
        last_activity: now,
        resources,
        buildings: Default::default(),
        ships: Default::default(),
        defenses: Default::default(),
    };
    let mut body = Body::Planet(planet.clone());
    advance::recompute_derived(&mut body, universe, catalog::catalog());
    if let Body::Planet(updated) = body {
        planet = updated;
    }
    planet
}

/// Build a moon model born from combat debris.
pub fn provision_moon(
    universe: &Universe,
    planet: &Body,
    diameter: i64,
    now: DateTime<Utc>,
) -> Moon {
    let resources = catalog::catalog()
        .resources
        .iter()
        .map(|r| ResourceStock::new(r.key, 0.0, 0.0, r.base_storage))
        .collect();
    Moon {
        id: Uuid::new_v4(),
        planet: planet.id(),
        player: planet.player(),
        universe: universe.id,
        coordinates: planet.coordinates().with_kind(BodyKind::Moon),
        name: "moon".to_string(),
        fields: (diameter / 1_000).max(1),
        diameter,
        last_activity: now,
        resources,
        buildings: Default::default(),
        ships: Default::default(),
        defenses: Default::default(),
    }
}

/// Rename a planet or moon after refreshing it.
pub async fn rename_body(
    db: &DbClient,
    id: Uuid,
    name: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    let mut conn = db.conn().await?;
    conn.transaction::<_, Error, _>(|conn| {
        async move {
            let refreshed = refresh_body_locked(conn, id, now).await?;
            repo::bodies::rename(conn, &refreshed.body, name).await
        }
        .scope_boxed()
    })
    .await
}

/// Guarded planet deletion, exposed at the loader level so callers get the
/// same refresh-then-mutate semantics as every other entry point.
pub async fn delete_planet(db: &DbClient, id: Uuid, now: DateTime<Utc>) -> Result<()> {
    let mut conn = db.conn().await?;
    conn.transaction::<_, Error, _>(|conn| {
        async move {
            refresh_body_locked(conn, id, now).await?;
            repo::bodies::delete_planet(conn, id).await
        }
        .scope_boxed()
    })
    .await
}
