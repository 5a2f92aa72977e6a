use crate::db::db_models;
use crate::error::{Error, Result};
use crate::models::Universe;
use crate::schema::universes;
use diesel::QueryDsl as _;
use diesel::SelectableHelper as _;
use diesel_async::AsyncPgConnection;
use diesel_async::RunQueryDsl as _;
use uuid::Uuid;

fn assemble(row: db_models::Universe) -> Universe {
    Universe {
        id: row.id,
        name: row.name,
        eco_speed: row.eco_speed,
        fleet_speed: row.fleet_speed,
        fleet_acceleration: row.fleet_acceleration,
        cost_ratio: row.cost_ratio,
        production_ratio: row.production_ratio,
        ships_to_ruins: row.ships_to_ruins,
        defenses_to_ruins: row.defenses_to_ruins,
        moon_chance: row.moon_chance,
        defense_rebuild_ratio: row.defense_rebuild_ratio,
        pillage_ratio: row.pillage_ratio,
        galaxies: row.galaxies,
        systems: row.systems,
        positions: row.positions,
        created_at: row.created_at,
    }
}

pub async fn fetch(conn: &mut AsyncPgConnection, id: Uuid) -> Result<Universe> {
    let row: db_models::Universe = universes::table
        .find(id)
        .select(db_models::Universe::as_select())
        .first(conn)
        .await
        .map_err(|e| match Error::from_db(e) {
            Error::ElementNotFound => Error::NonExistingUniverse,
            other => other,
        })?;
    Ok(assemble(row))
}

pub async fn fetch_all(conn: &mut AsyncPgConnection) -> Result<Vec<Universe>> {
    let rows: Vec<db_models::Universe> = universes::table
        .select(db_models::Universe::as_select())
        .load(conn)
        .await
        .map_err(Error::from_db)?;
    Ok(rows.into_iter().map(assemble).collect())
}
