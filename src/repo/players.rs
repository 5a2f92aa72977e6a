use crate::catalog::OBJECTIVE_EXPEDITION;
use crate::db::{self, db_models};
use crate::error::{Error, Result};
use crate::models::Player;
use crate::schema::{bodies, fleets, player_technologies, players};
use diesel::ExpressionMethods as _;
use diesel::QueryDsl as _;
use diesel::SelectableHelper as _;
use diesel_async::AsyncPgConnection;
use diesel_async::RunQueryDsl as _;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
struct TechnologyPayload<'a> {
    technology: &'a str,
    level: i64,
}

#[derive(Debug, Serialize)]
struct PlayerPayload<'a> {
    id: Uuid,
    account: Uuid,
    universe: Uuid,
    name: &'a str,
    technologies: Vec<TechnologyPayload<'a>>,
}

pub async fn create(conn: &mut AsyncPgConnection, player: &Player) -> Result<()> {
    if player.name.trim().is_empty() {
        return Err(Error::InvalidName);
    }
    let payload = PlayerPayload {
        id: player.id,
        account: player.account,
        universe: player.universe,
        name: &player.name,
        technologies: player
            .technologies
            .iter()
            .map(|(technology, level)| TechnologyPayload {
                technology: technology.as_str(),
                level: *level,
            })
            .collect(),
    };
    db::execute(conn, "create_player", &payload)
        .await
        .map_err(|e| match e {
            Error::DuplicatedElement { constraint } if constraint.contains("name") => {
                Error::NameAlreadyInUse
            }
            Error::DuplicatedElement { constraint } if constraint.contains("account") => {
                Error::MultipleAccountInUniverse
            }
            other => other.refine_foreign_key(),
        })
}

/// Row-level lock on the player, taken before any research mutation since
/// technologies are player-global.
pub async fn lock(conn: &mut AsyncPgConnection, id: Uuid) -> Result<()> {
    let _: Uuid = players::table
        .find(id)
        .select(players::id)
        .for_update()
        .first(conn)
        .await
        .map_err(|e| match Error::from_db(e) {
            Error::ElementNotFound => Error::NonExistingPlayer,
            other => other,
        })?;
    Ok(())
}

pub async fn fetch(conn: &mut AsyncPgConnection, id: Uuid) -> Result<Player> {
    let row: db_models::Player = players::table
        .find(id)
        .select(db_models::Player::as_select())
        .first(conn)
        .await
        .map_err(|e| match Error::from_db(e) {
            Error::ElementNotFound => Error::NonExistingPlayer,
            other => other,
        })?;

    let technologies: Vec<db_models::PlayerTechnology> = player_technologies::table
        .filter(player_technologies::player_id.eq(id))
        .select(db_models::PlayerTechnology::as_select())
        .load(conn)
        .await
        .map_err(Error::from_db)?;

    let fleets_count: i64 = fleets::table
        .filter(fleets::player_id.eq(id))
        .count()
        .get_result(conn)
        .await
        .map_err(Error::from_db)?;
    let expeditions_count: i64 = fleets::table
        .filter(fleets::player_id.eq(id))
        .filter(fleets::objective.eq(OBJECTIVE_EXPEDITION))
        .count()
        .get_result(conn)
        .await
        .map_err(Error::from_db)?;

    Ok(Player {
        id: row.id,
        account: row.account_id,
        universe: row.universe_id,
        name: row.name,
        economy_points: row.economy_points,
        research_points: row.research_points,
        military_points: row.military_points,
        fleets_count,
        expeditions_count,
        technologies: technologies
            .into_iter()
            .map(|t| (t.technology, t.level))
            .collect(),
        created_at: row.created_at,
    })
}

pub async fn add_economy_points(
    conn: &mut AsyncPgConnection,
    id: Uuid,
    points: f64,
) -> Result<()> {
    diesel::update(players::table.find(id))
        .set(players::economy_points.eq(players::economy_points + points))
        .execute(conn)
        .await
        .map_err(Error::from_db)?;
    Ok(())
}

pub async fn add_research_points(
    conn: &mut AsyncPgConnection,
    id: Uuid,
    points: f64,
) -> Result<()> {
    diesel::update(players::table.find(id))
        .set(players::research_points.eq(players::research_points + points))
        .execute(conn)
        .await
        .map_err(Error::from_db)?;
    Ok(())
}

pub async fn add_military_points(
    conn: &mut AsyncPgConnection,
    id: Uuid,
    points: f64,
) -> Result<()> {
    diesel::update(players::table.find(id))
        .set(players::military_points.eq(players::military_points + points))
        .execute(conn)
        .await
        .map_err(Error::from_db)?;
    Ok(())
}

pub async fn set_technology(
    conn: &mut AsyncPgConnection,
    id: Uuid,
    technology: &str,
    level: i64,
) -> Result<()> {
    diesel::insert_into(player_technologies::table)
        .values((
            player_technologies::player_id.eq(id),
            player_technologies::technology.eq(technology),
            player_technologies::level.eq(level),
        ))
        .on_conflict((
            player_technologies::player_id,
            player_technologies::technology,
        ))
        .do_update()
        .set(player_technologies::level.eq(level))
        .execute(conn)
        .await
        .map_err(Error::from_db)?;
    Ok(())
}

pub async fn owned_planets_count(conn: &mut AsyncPgConnection, id: Uuid) -> Result<i64> {
    bodies::table
        .filter(bodies::player_id.eq(id))
        .filter(bodies::kind.eq("planet"))
        .count()
        .get_result(conn)
        .await
        .map_err(Error::from_db)
}

/// Research-lab levels across every body the player owns, used to aggregate
/// research power for technology timing.
pub async fn research_lab_levels(
    conn: &mut AsyncPgConnection,
    id: Uuid,
    lab: &str,
) -> Result<Vec<(Uuid, i64)>> {
    use crate::schema::body_buildings;
    let rows: Vec<(Uuid, i64)> = body_buildings::table
        .inner_join(bodies::table)
        .filter(bodies::player_id.eq(id))
        .filter(body_buildings::building.eq(lab))
        .select((body_buildings::body_id, body_buildings::level))
        .load(conn)
        .await
        .map_err(Error::from_db)?;
    Ok(rows)
}
