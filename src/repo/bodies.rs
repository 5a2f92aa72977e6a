use crate::db::{self, db_models};
use crate::error::{Error, Result};
use crate::models::{Body, BodyKind, Coordinates, Moon, Planet, ResourceStock, UnitCount};
use crate::schema::{
    bodies, body_buildings, body_defenses, body_resources, body_ships, fixed_actions,
    fleet_components, fleets, progress_actions,
};
use diesel::ExpressionMethods as _;
use diesel::OptionalExtension as _;
use diesel::QueryDsl as _;
use diesel::SelectableHelper as _;
use diesel_async::AsyncPgConnection;
use diesel_async::RunQueryDsl as _;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

/// Exclusive row lock on one body for the duration of the transaction.
pub async fn lock(conn: &mut AsyncPgConnection, id: Uuid) -> Result<()> {
    let _: Uuid = bodies::table
        .find(id)
        .select(bodies::id)
        .for_update()
        .first(conn)
        .await
        .map_err(|e| match Error::from_db(e) {
            Error::ElementNotFound => Error::NonExistingPlanet,
            other => other,
        })?;
    Ok(())
}

/// Lock several bodies in ascending id order, the canonical ordering that
/// keeps concurrent fleet advancements deadlock free.
pub async fn lock_all(conn: &mut AsyncPgConnection, ids: &[Uuid]) -> Result<()> {
    let mut ordered: Vec<Uuid> = ids.to_vec();
    ordered.sort();
    ordered.dedup();
    for id in ordered {
        lock(conn, id).await?;
    }
    Ok(())
}

fn resource_stocks(rows: Vec<db_models::BodyResource>) -> Vec<ResourceStock> {
    rows.into_iter()
        .map(|r| ResourceStock {
            resource: r.resource,
            amount: r.amount,
            production: r.production,
            storage_capacity: r.storage_capacity,
            production_factor: r.production_factor,
        })
        .collect()
}

async fn assemble(conn: &mut AsyncPgConnection, row: db_models::BodyRow) -> Result<Body> {
    let resources: Vec<db_models::BodyResource> = body_resources::table
        .filter(body_resources::body_id.eq(row.id))
        .select(db_models::BodyResource::as_select())
        .load(conn)
        .await
        .map_err(Error::from_db)?;
    let buildings: Vec<db_models::BodyBuilding> = body_buildings::table
        .filter(body_buildings::body_id.eq(row.id))
        .select(db_models::BodyBuilding::as_select())
        .load(conn)
        .await
        .map_err(Error::from_db)?;
    let ships: Vec<db_models::BodyShip> = body_ships::table
        .filter(body_ships::body_id.eq(row.id))
        .select(db_models::BodyShip::as_select())
        .load(conn)
        .await
        .map_err(Error::from_db)?;
    let defenses: Vec<db_models::BodyDefense> = body_defenses::table
        .filter(body_defenses::body_id.eq(row.id))
        .select(db_models::BodyDefense::as_select())
        .load(conn)
        .await
        .map_err(Error::from_db)?;

    let buildings: HashMap<String, i64> =
        buildings.into_iter().map(|b| (b.building, b.level)).collect();
    let ships: HashMap<String, i64> = ships.into_iter().map(|s| (s.ship, s.count)).collect();
    let defenses: HashMap<String, i64> =
        defenses.into_iter().map(|d| (d.defense, d.count)).collect();
    let resources = resource_stocks(resources);

    match row.kind.as_str() {
        "planet" => Ok(Body::Planet(Planet {
            id: row.id,
            player: row.player_id,
            universe: row.universe_id,
            coordinates: Coordinates::new(
                row.galaxy,
                row.solar_system,
                row.position,
                BodyKind::Planet,
            ),
            name: row.name,
            fields: row.fields,
            min_temperature: row.min_temperature,
            max_temperature: row.max_temperature,
            diameter: row.diameter,
            homeworld: row.homeworld,
            last_activity: row.last_activity,
            resources,
            buildings,
            ships,
            defenses,
        })),
        "moon" => Ok(Body::Moon(Moon {
            id: row.id,
            planet: row.parent_id.ok_or(Error::InconsistentPlanetFound)?,
            player: row.player_id,
            universe: row.universe_id,
            coordinates: Coordinates::new(
                row.galaxy,
                row.solar_system,
                row.position,
                BodyKind::Moon,
            ),
            name: row.name,
            fields: row.fields,
            diameter: row.diameter,
            last_activity: row.last_activity,
            resources,
            buildings,
            ships,
            defenses,
        })),
        _ => Err(Error::InconsistentPlanetFound),
    }
}

pub async fn fetch(conn: &mut AsyncPgConnection, id: Uuid) -> Result<Body> {
    let row: db_models::BodyRow = bodies::table
        .find(id)
        .select(db_models::BodyRow::as_select())
        .first(conn)
        .await
        .map_err(|e| match Error::from_db(e) {
            Error::ElementNotFound => Error::NonExistingPlanet,
            other => other,
        })?;
    assemble(conn, row).await
}

pub async fn fetch_by_coordinates(
    conn: &mut AsyncPgConnection,
    universe: Uuid,
    coordinates: &Coordinates,
) -> Result<Option<Body>> {
    let row: Option<db_models::BodyRow> = bodies::table
        .filter(bodies::universe_id.eq(universe))
        .filter(bodies::galaxy.eq(coordinates.galaxy))
        .filter(bodies::solar_system.eq(coordinates.system))
        .filter(bodies::position.eq(coordinates.position))
        .filter(bodies::kind.eq(coordinates.kind.to_string()))
        .select(db_models::BodyRow::as_select())
        .first(conn)
        .await
        .optional()
        .map_err(Error::from_db)?;
    match row {
        Some(row) => Ok(Some(assemble(conn, row).await?)),
        None => Ok(None),
    }
}

/// Occupied (system, position) pairs in one galaxy, for slot allocation.
pub async fn occupied_slots(
    conn: &mut AsyncPgConnection,
    universe: Uuid,
    galaxy: i64,
) -> Result<Vec<(i64, i64)>> {
    bodies::table
        .filter(bodies::universe_id.eq(universe))
        .filter(bodies::galaxy.eq(galaxy))
        .filter(bodies::kind.eq("planet"))
        .select((bodies::solar_system, bodies::position))
        .load(conn)
        .await
        .map_err(Error::from_db)
}

pub async fn moon_of(conn: &mut AsyncPgConnection, planet: Uuid) -> Result<Option<Uuid>> {
    let id: Option<Uuid> = bodies::table
        .filter(bodies::parent_id.eq(planet))
        .select(bodies::id)
        .first(conn)
        .await
        .optional()
        .map_err(Error::from_db)?;
    Ok(id)
}

#[derive(Debug, Serialize)]
struct ResourcePayload<'a> {
    resource: &'a str,
    amount: f64,
    production: f64,
    storage_capacity: f64,
    production_factor: f64,
}

#[derive(Debug, Serialize)]
struct CreateBodyPayload<'a> {
    id: Uuid,
    universe: Uuid,
    player: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent: Option<Uuid>,
    galaxy: i64,
    system: i64,
    position: i64,
    name: &'a str,
    fields: i64,
    diameter: i64,
    min_temperature: i64,
    max_temperature: i64,
    homeworld: bool,
    resources: Vec<ResourcePayload<'a>>,
}

pub async fn create_planet(conn: &mut AsyncPgConnection, planet: &Planet) -> Result<()> {
    let payload = CreateBodyPayload {
        id: planet.id,
        universe: planet.universe,
        player: planet.player,
        parent: None,
        galaxy: planet.coordinates.galaxy,
        system: planet.coordinates.system,
        position: planet.coordinates.position,
        name: &planet.name,
        fields: planet.fields,
        diameter: planet.diameter,
        min_temperature: planet.min_temperature,
        max_temperature: planet.max_temperature,
        homeworld: planet.homeworld,
        resources: planet
            .resources
            .iter()
            .map(|s| ResourcePayload {
                resource: &s.resource,
                amount: s.amount,
                production: s.production,
                storage_capacity: s.storage_capacity,
                production_factor: s.production_factor,
            })
            .collect(),
    };
    db::execute(conn, "create_planet", &payload)
        .await
        .map_err(|e| match e {
            Error::DuplicatedElement { constraint } if constraint.contains("coordinate") => {
                Error::DuplicatedElement { constraint }
            }
            other => other.refine_foreign_key(),
        })
}

pub async fn create_moon(conn: &mut AsyncPgConnection, moon: &Moon) -> Result<()> {
    let payload = CreateBodyPayload {
        id: moon.id,
        universe: moon.universe,
        player: moon.player,
        parent: Some(moon.planet),
        galaxy: moon.coordinates.galaxy,
        system: moon.coordinates.system,
        position: moon.coordinates.position,
        name: &moon.name,
        fields: moon.fields,
        diameter: moon.diameter,
        min_temperature: 0,
        max_temperature: 0,
        homeworld: false,
        resources: moon
            .resources
            .iter()
            .map(|s| ResourcePayload {
                resource: &s.resource,
                amount: s.amount,
                production: s.production,
                storage_capacity: s.storage_capacity,
                production_factor: s.production_factor,
            })
            .collect(),
    };
    db::execute(conn, "create_moon", &payload)
        .await
        .map_err(|e| e.refine_foreign_key())
}

#[derive(Debug, Serialize)]
struct UnitPayload<'a> {
    element: &'a str,
    count: i64,
}

#[derive(Debug, Serialize)]
struct RefreshPayload<'a> {
    id: Uuid,
    resources: Vec<ResourcePayload<'a>>,
    ships: Vec<UnitPayload<'a>>,
    defenses: Vec<UnitPayload<'a>>,
    last_activity: chrono::DateTime<chrono::Utc>,
}

/// Persist the outcome of an update-on-read pass in one routine call:
/// stocks, hangar counts, and the advanced activity instant.
pub async fn persist_refresh(conn: &mut AsyncPgConnection, body: &Body) -> Result<()> {
    let payload = RefreshPayload {
        id: body.id(),
        resources: body
            .resources()
            .iter()
            .map(|s| ResourcePayload {
                resource: &s.resource,
                amount: s.amount,
                production: s.production,
                storage_capacity: s.storage_capacity,
                production_factor: s.production_factor,
            })
            .collect(),
        ships: body
            .ships()
            .iter()
            .map(|(element, count)| UnitPayload {
                element,
                count: *count,
            })
            .collect(),
        defenses: body
            .defenses()
            .iter()
            .map(|(element, count)| UnitPayload {
                element,
                count: *count,
            })
            .collect(),
        last_activity: body.last_activity(),
    };
    db::execute(conn, "update_planet_production", &payload).await
}

pub async fn set_building_level(
    conn: &mut AsyncPgConnection,
    body: Uuid,
    building: &str,
    level: i64,
) -> Result<()> {
    diesel::insert_into(body_buildings::table)
        .values((
            body_buildings::body_id.eq(body),
            body_buildings::building.eq(building),
            body_buildings::level.eq(level),
        ))
        .on_conflict((body_buildings::body_id, body_buildings::building))
        .do_update()
        .set(body_buildings::level.eq(level))
        .execute(conn)
        .await
        .map_err(Error::from_db)?;
    Ok(())
}

pub async fn add_ships(conn: &mut AsyncPgConnection, body: Uuid, ships: &[UnitCount]) -> Result<()> {
    for unit in ships {
        diesel::insert_into(body_ships::table)
            .values((
                body_ships::body_id.eq(body),
                body_ships::ship.eq(&unit.element),
                body_ships::count.eq(unit.count),
            ))
            .on_conflict((body_ships::body_id, body_ships::ship))
            .do_update()
            .set(body_ships::count.eq(body_ships::count + unit.count))
            .execute(conn)
            .await
            .map_err(Error::from_db)?;
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct RenamePayload<'a> {
    id: Uuid,
    name: &'a str,
}

/// Rename a body through the kind-matched update routine.
pub async fn rename(conn: &mut AsyncPgConnection, body: &Body, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidName);
    }
    let script = match body.kind() {
        BodyKind::Planet => "update_planet",
        BodyKind::Moon => "update_moon",
        BodyKind::Debris => return Err(Error::InvalidUpdateData),
    };
    let payload = RenamePayload {
        id: body.id(),
        name,
    };
    db::execute(conn, script, &payload)
        .await
        .map_err(|e| match e {
            Error::Db(_) => Error::InvalidUpdateData,
            other => other,
        })
}

#[derive(Debug, Serialize)]
struct DeletePayload {
    id: Uuid,
}

/// Guarded planet deletion: keeps the homeworld, bodies with pending
/// actions or referencing fleets, and the player's last planet.
pub async fn delete_planet(conn: &mut AsyncPgConnection, id: Uuid) -> Result<()> {
    let row: db_models::BodyRow = bodies::table
        .find(id)
        .select(db_models::BodyRow::as_select())
        .first(conn)
        .await
        .map_err(|e| match Error::from_db(e) {
            Error::ElementNotFound => Error::NonExistingPlanet,
            other => other,
        })?;
    if row.kind == "moon" {
        return Err(Error::CannotDeleteMoon);
    }
    if row.homeworld {
        return Err(Error::HomeworldCannotBeDeleted);
    }

    let owned: i64 = bodies::table
        .filter(bodies::player_id.eq(row.player_id))
        .filter(bodies::kind.eq("planet"))
        .count()
        .get_result(conn)
        .await
        .map_err(Error::from_db)?;
    if owned < 2 {
        return Err(Error::InvalidPlanetForAction);
    }

    let pending_progress: i64 = progress_actions::table
        .filter(progress_actions::body_id.eq(id))
        .count()
        .get_result(conn)
        .await
        .map_err(Error::from_db)?;
    let pending_fixed: i64 = fixed_actions::table
        .filter(fixed_actions::body_id.eq(id))
        .count()
        .get_result(conn)
        .await
        .map_err(Error::from_db)?;
    if pending_progress + pending_fixed > 0 {
        return Err(Error::ActionStillInProgress);
    }

    let in_flight: i64 = fleet_components::table
        .filter(fleet_components::source_body_id.eq(id))
        .count()
        .get_result(conn)
        .await
        .map_err(Error::from_db)?;
    let targeting: i64 = fleets::table
        .filter(fleets::target_body_id.eq(id))
        .count()
        .get_result(conn)
        .await
        .map_err(Error::from_db)?;
    if in_flight > 0 || targeting > 0 {
        return Err(Error::FleetNotYetReturned);
    }

    db::execute(conn, "delete_planet", &DeletePayload { id }).await
}
