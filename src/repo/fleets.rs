use crate::db::{self, db_models};
use crate::error::{Error, Result};
use crate::models::{BodyKind, Coordinates, Fleet, FleetComponent, ResourceAmount, UnitCount};
use crate::schema::{fleet_components, fleets};
use chrono::{DateTime, Utc};
use diesel::BoolExpressionMethods as _;
use diesel::ExpressionMethods as _;
use diesel::QueryDsl as _;
use diesel::SelectableHelper as _;
use diesel_async::AsyncPgConnection;
use diesel_async::RunQueryDsl as _;
use serde::Serialize;
use std::str::FromStr as _;
use uuid::Uuid;

fn assemble_fleet(row: db_models::FleetRow) -> Result<Fleet> {
    let kind = BodyKind::from_str(&row.target_kind).map_err(|_| Error::InvalidObjective)?;
    Ok(Fleet {
        id: row.id,
        universe: row.universe_id,
        player: row.player_id,
        objective: row.objective,
        target: Coordinates::new(row.target_galaxy, row.target_system, row.target_position, kind),
        target_body: row.target_body_id,
        arrival_time: row.arrival_time,
        return_time: row.return_time,
        is_returning: row.is_returning,
        name: row.name,
        created_at: row.created_at,
    })
}

fn assemble_component(row: db_models::FleetComponentRow) -> Result<FleetComponent> {
    let source_kind = BodyKind::from_str(&row.source_kind).map_err(|_| Error::InvalidObjective)?;
    let ships: Vec<UnitCount> =
        serde_json::from_value(row.ships).map_err(|_| Error::InvalidFleetComponent)?;
    let cargo: Vec<ResourceAmount> =
        serde_json::from_value(row.cargo).map_err(|_| Error::InvalidFleetComponent)?;
    let consumption: Vec<ResourceAmount> =
        serde_json::from_value(row.consumption).map_err(|_| Error::InvalidFleetComponent)?;
    Ok(FleetComponent {
        id: row.id,
        fleet: row.fleet_id,
        player: row.player_id,
        source: row.source_body_id,
        source_kind,
        speed_ratio: row.speed_ratio,
        joined_at: row.joined_at,
        flight_duration_ms: row.flight_duration_ms,
        ships,
        cargo,
        consumption,
    })
}

pub async fn create(
    conn: &mut AsyncPgConnection,
    fleet: &Fleet,
    components: &[FleetComponent],
) -> Result<()> {
    let new_fleet = db_models::NewFleet {
        id: fleet.id,
        universe_id: fleet.universe,
        player_id: fleet.player,
        objective: fleet.objective.clone(),
        target_galaxy: fleet.target.galaxy,
        target_system: fleet.target.system,
        target_position: fleet.target.position,
        target_kind: fleet.target.kind.to_string(),
        target_body_id: fleet.target_body,
        arrival_time: fleet.arrival_time,
        return_time: fleet.return_time,
        is_returning: fleet.is_returning,
        name: fleet.name.clone(),
    };
    diesel::insert_into(fleets::table)
        .values(&new_fleet)
        .execute(conn)
        .await
        .map_err(|e| Error::from_db(e).refine_foreign_key())?;
    for component in components {
        add_component(conn, component).await?;
    }
    Ok(())
}

pub async fn add_component(
    conn: &mut AsyncPgConnection,
    component: &FleetComponent,
) -> Result<()> {
    let new_component = db_models::NewFleetComponent {
        id: component.id,
        fleet_id: component.fleet,
        player_id: component.player,
        source_body_id: component.source,
        source_kind: component.source_kind.to_string(),
        speed_ratio: component.speed_ratio,
        joined_at: component.joined_at,
        flight_duration_ms: component.flight_duration_ms,
        ships: serde_json::to_value(&component.ships).map_err(|_| Error::InvalidFleetComponent)?,
        cargo: serde_json::to_value(&component.cargo).map_err(|_| Error::InvalidFleetComponent)?,
        consumption: serde_json::to_value(&component.consumption)
            .map_err(|_| Error::InvalidFleetComponent)?,
    };
    diesel::insert_into(fleet_components::table)
        .values(&new_component)
        .execute(conn)
        .await
        .map_err(|e| match Error::from_db(e) {
            Error::DuplicatedElement { .. } => Error::DuplicatedFleetComponent,
            Error::ForeignKeyViolation { foreign_key } if foreign_key.contains("fleet") => {
                Error::InvalidFleetForComponent
            }
            other => other.refine_foreign_key(),
        })?;
    Ok(())
}

pub async fn fetch(conn: &mut AsyncPgConnection, id: Uuid) -> Result<Fleet> {
    let row: db_models::FleetRow = fleets::table
        .find(id)
        .select(db_models::FleetRow::as_select())
        .first(conn)
        .await
        .map_err(Error::from_db)?;
    assemble_fleet(row)
}

/// Row lock on a fleet, taken in ascending fleet-id order when combat
/// involves reinforcements.
pub async fn lock(conn: &mut AsyncPgConnection, id: Uuid) -> Result<()> {
    let _: Uuid = fleets::table
        .find(id)
        .select(fleets::id)
        .for_update()
        .first(conn)
        .await
        .map_err(Error::from_db)?;
    Ok(())
}

pub async fn components(conn: &mut AsyncPgConnection, fleet: Uuid) -> Result<Vec<FleetComponent>> {
    let rows: Vec<db_models::FleetComponentRow> = fleet_components::table
        .filter(fleet_components::fleet_id.eq(fleet))
        .order(fleet_components::joined_at.asc())
        .select(db_models::FleetComponentRow::as_select())
        .load(conn)
        .await
        .map_err(Error::from_db)?;
    rows.into_iter().map(assemble_component).collect()
}

/// Outbound fleets due at a slot, in arrival order with fleet id as the tie
/// break: the processing order promised to a body.
pub async fn arrivals_at(
    conn: &mut AsyncPgConnection,
    universe: Uuid,
    target: &Coordinates,
    now: DateTime<Utc>,
) -> Result<Vec<Fleet>> {
    let rows: Vec<db_models::FleetRow> = fleets::table
        .filter(fleets::universe_id.eq(universe))
        .filter(fleets::target_galaxy.eq(target.galaxy))
        .filter(fleets::target_system.eq(target.system))
        .filter(fleets::target_position.eq(target.position))
        .filter(fleets::target_kind.eq(target.kind.to_string()))
        .filter(fleets::is_returning.eq(false))
        .filter(fleets::arrival_time.le(now))
        .order((fleets::arrival_time.asc(), fleets::id.asc()))
        .select(db_models::FleetRow::as_select())
        .load(conn)
        .await
        .map_err(Error::from_db)?;
    rows.into_iter().map(assemble_fleet).collect()
}

/// Returning fleets with at least one component homed on this body.
pub async fn returning_to(
    conn: &mut AsyncPgConnection,
    source_body: Uuid,
    now: DateTime<Utc>,
) -> Result<Vec<Fleet>> {
    let rows: Vec<db_models::FleetRow> = fleets::table
        .inner_join(fleet_components::table)
        .filter(fleet_components::source_body_id.eq(source_body))
        .filter(fleets::is_returning.eq(true))
        .filter(fleets::return_time.le(now))
        .order((fleets::return_time.asc(), fleets::id.asc()))
        .select(db_models::FleetRow::as_select())
        .distinct()
        .load(conn)
        .await
        .map_err(Error::from_db)?;
    rows.into_iter().map(assemble_fleet).collect()
}

/// Stationed friendly fleets defending a slot during an attack.
pub async fn reinforcements_at(
    conn: &mut AsyncPgConnection,
    universe: Uuid,
    target: &Coordinates,
    objective: &str,
    now: DateTime<Utc>,
) -> Result<Vec<Fleet>> {
    let rows: Vec<db_models::FleetRow> = fleets::table
        .filter(fleets::universe_id.eq(universe))
        .filter(fleets::target_galaxy.eq(target.galaxy))
        .filter(fleets::target_system.eq(target.system))
        .filter(fleets::target_position.eq(target.position))
        .filter(fleets::target_kind.eq(target.kind.to_string()))
        .filter(fleets::objective.eq(objective))
        .filter(fleets::is_returning.eq(false))
        .filter(fleets::arrival_time.le(now))
        .order(fleets::id.asc())
        .select(db_models::FleetRow::as_select())
        .load(conn)
        .await
        .map_err(Error::from_db)?;
    rows.into_iter().map(assemble_fleet).collect()
}

/// Fleets with an overdue arrival or return, for the maintenance sweep.
/// Stationed defenders are excluded; they advance only when recalled or
/// drawn into a fight.
pub async fn due(conn: &mut AsyncPgConnection, now: DateTime<Utc>) -> Result<Vec<Fleet>> {
    let rows: Vec<db_models::FleetRow> = fleets::table
        .filter(fleets::objective.ne(crate::catalog::OBJECTIVE_ACS_DEFEND))
        .filter(
            fleets::arrival_time
                .le(now)
                .and(fleets::is_returning.eq(false))
                .or(fleets::return_time.le(now).and(fleets::is_returning.eq(true))),
        )
        .order((fleets::arrival_time.asc(), fleets::id.asc()))
        .select(db_models::FleetRow::as_select())
        .load(conn)
        .await
        .map_err(Error::from_db)?;
    rows.into_iter().map(assemble_fleet).collect()
}

pub async fn set_returning(conn: &mut AsyncPgConnection, id: Uuid) -> Result<()> {
    diesel::update(fleets::table.find(id))
        .set(fleets::is_returning.eq(true))
        .execute(conn)
        .await
        .map_err(Error::from_db)?;
    Ok(())
}

pub async fn update_component_manifest(
    conn: &mut AsyncPgConnection,
    id: Uuid,
    ships: &[UnitCount],
    cargo: &[ResourceAmount],
) -> Result<()> {
    diesel::update(fleet_components::table.find(id))
        .set((
            fleet_components::ships
                .eq(serde_json::to_value(ships).map_err(|_| Error::InvalidFleetComponent)?),
            fleet_components::cargo
                .eq(serde_json::to_value(cargo).map_err(|_| Error::InvalidFleetComponent)?),
        ))
        .execute(conn)
        .await
        .map_err(Error::from_db)?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct ReturnPayload {
    fleet: Uuid,
}

/// Credit every component back to its source and drop the fleet, as one
/// routine call.
pub async fn return_to_base(conn: &mut AsyncPgConnection, fleet: Uuid) -> Result<()> {
    db::execute(conn, "fleet_return_to_base", &ReturnPayload { fleet }).await
}

/// Remove a fleet consumed at its target (deployment, colonization, or a
/// wiped attacker).
pub async fn delete(conn: &mut AsyncPgConnection, id: Uuid) -> Result<()> {
    diesel::delete(fleets::table.find(id))
        .execute(conn)
        .await
        .map_err(Error::from_db)?;
    Ok(())
}
