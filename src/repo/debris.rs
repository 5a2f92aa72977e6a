use crate::db::db_models;
use crate::error::{Error, Result};
use crate::models::{Coordinates, ResourceAmount};
use crate::schema::debris_fields;
use diesel::ExpressionMethods as _;
use diesel::QueryDsl as _;
use diesel::SelectableHelper as _;
use diesel_async::AsyncPgConnection;
use diesel_async::RunQueryDsl as _;
use uuid::Uuid;

pub async fn fetch_at(
    conn: &mut AsyncPgConnection,
    universe: Uuid,
    slot: &Coordinates,
) -> Result<Vec<ResourceAmount>> {
    let rows: Vec<db_models::DebrisField> = debris_fields::table
        .filter(debris_fields::universe_id.eq(universe))
        .filter(debris_fields::galaxy.eq(slot.galaxy))
        .filter(debris_fields::solar_system.eq(slot.system))
        .filter(debris_fields::position.eq(slot.position))
        .select(db_models::DebrisField::as_select())
        .load(conn)
        .await
        .map_err(Error::from_db)?;
    Ok(rows
        .into_iter()
        .filter(|r| r.amount > 0.0)
        .map(|r| ResourceAmount {
            resource: r.resource,
            amount: r.amount,
        })
        .collect())
}

/// Add freshly dispersed resources to the field at a slot.
pub async fn credit(
    conn: &mut AsyncPgConnection,
    universe: Uuid,
    slot: &Coordinates,
    amounts: &[ResourceAmount],
) -> Result<()> {
    for entry in amounts {
        if entry.amount <= 0.0 {
            continue;
        }
        diesel::insert_into(debris_fields::table)
            .values((
                debris_fields::id.eq(Uuid::new_v4()),
                debris_fields::universe_id.eq(universe),
                debris_fields::galaxy.eq(slot.galaxy),
                debris_fields::solar_system.eq(slot.system),
                debris_fields::position.eq(slot.position),
                debris_fields::resource.eq(&entry.resource),
                debris_fields::amount.eq(entry.amount),
            ))
            .on_conflict((
                debris_fields::universe_id,
                debris_fields::galaxy,
                debris_fields::solar_system,
                debris_fields::position,
                debris_fields::resource,
            ))
            .do_update()
            .set((
                debris_fields::amount.eq(debris_fields::amount + entry.amount),
                debris_fields::updated_at.eq(chrono::Utc::now()),
            ))
            .execute(conn)
            .await
            .map_err(Error::from_db)?;
    }
    Ok(())
}

/// Remove harvested amounts; empty rows are deleted so the field vanishes
/// once drained.
pub async fn drain(
    conn: &mut AsyncPgConnection,
    universe: Uuid,
    slot: &Coordinates,
    amounts: &[ResourceAmount],
) -> Result<()> {
    for entry in amounts {
        diesel::update(
            debris_fields::table
                .filter(debris_fields::universe_id.eq(universe))
                .filter(debris_fields::galaxy.eq(slot.galaxy))
                .filter(debris_fields::solar_system.eq(slot.system))
                .filter(debris_fields::position.eq(slot.position))
                .filter(debris_fields::resource.eq(&entry.resource)),
        )
        .set(debris_fields::amount.eq(debris_fields::amount - entry.amount))
        .execute(conn)
        .await
        .map_err(Error::from_db)?;
    }
    diesel::delete(
        debris_fields::table
            .filter(debris_fields::universe_id.eq(universe))
            .filter(debris_fields::galaxy.eq(slot.galaxy))
            .filter(debris_fields::solar_system.eq(slot.system))
            .filter(debris_fields::position.eq(slot.position))
            .filter(debris_fields::amount.le(0.0)),
    )
    .execute(conn)
    .await
    .map_err(Error::from_db)?;
    Ok(())
}
