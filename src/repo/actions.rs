use crate::db::{self, db_models};
use crate::error::{Error, Result};
use crate::models::{ActionFamily, ActionHeader, FixedAction, ProgressAction};
use crate::schema::{fixed_actions, progress_actions};
use chrono::{DateTime, Utc};
use diesel::ExpressionMethods as _;
use diesel::OptionalExtension as _;
use diesel::QueryDsl as _;
use diesel::SelectableHelper as _;
use diesel_async::AsyncPgConnection;
use diesel_async::RunQueryDsl as _;
use serde::Serialize;
use std::collections::HashMap;
use std::str::FromStr as _;
use uuid::Uuid;

fn assemble_progress(row: db_models::ProgressActionRow) -> Result<ProgressAction> {
    let family =
        ActionFamily::from_str(&row.family).map_err(|_| Error::InvalidElementForAction)?;
    let costs: HashMap<String, f64> =
        serde_json::from_value(row.costs).map_err(|_| Error::InvalidUpdateData)?;
    Ok(ProgressAction {
        header: ActionHeader {
            id: row.id,
            body: row.body_id,
            element: row.element,
            created_at: row.created_at,
        },
        family,
        player: row.player_id,
        current_level: row.current_level,
        desired_level: row.desired_level,
        points: row.points,
        costs,
        completed_at: row.completed_at,
    })
}

fn assemble_fixed(row: db_models::FixedActionRow) -> Result<FixedAction> {
    let family =
        ActionFamily::from_str(&row.family).map_err(|_| Error::InvalidElementForAction)?;
    Ok(FixedAction {
        header: ActionHeader {
            id: row.id,
            body: row.body_id,
            element: row.element,
            created_at: row.created_at,
        },
        family,
        amount: row.amount,
        remaining: row.remaining,
        unit_duration_ms: row.unit_duration_ms,
        started_at: row.started_at,
    })
}

pub async fn building_action(
    conn: &mut AsyncPgConnection,
    body: Uuid,
) -> Result<Option<ProgressAction>> {
    let row: Option<db_models::ProgressActionRow> = progress_actions::table
        .filter(progress_actions::body_id.eq(body))
        .filter(progress_actions::family.eq(ActionFamily::Building.to_string()))
        .select(db_models::ProgressActionRow::as_select())
        .first(conn)
        .await
        .optional()
        .map_err(Error::from_db)?;
    row.map(assemble_progress).transpose()
}

pub async fn technology_action(
    conn: &mut AsyncPgConnection,
    player: Uuid,
) -> Result<Option<ProgressAction>> {
    let row: Option<db_models::ProgressActionRow> = progress_actions::table
        .filter(progress_actions::player_id.eq(player))
        .filter(progress_actions::family.eq(ActionFamily::Technology.to_string()))
        .select(db_models::ProgressActionRow::as_select())
        .first(conn)
        .await
        .optional()
        .map_err(Error::from_db)?;
    row.map(assemble_progress).transpose()
}

/// Pending fixed actions on a body, oldest first: the completion order.
pub async fn fixed_for_body(conn: &mut AsyncPgConnection, body: Uuid) -> Result<Vec<FixedAction>> {
    let rows: Vec<db_models::FixedActionRow> = fixed_actions::table
        .filter(fixed_actions::body_id.eq(body))
        .order(fixed_actions::created_at.asc())
        .select(db_models::FixedActionRow::as_select())
        .load(conn)
        .await
        .map_err(Error::from_db)?;
    rows.into_iter().map(assemble_fixed).collect()
}

/// Completion instant of the last queued fixed action of a family, if any.
/// New actions of that family start no earlier than this.
pub async fn queue_tail(
    conn: &mut AsyncPgConnection,
    body: Uuid,
    family: ActionFamily,
) -> Result<Option<DateTime<Utc>>> {
    let rows: Vec<db_models::FixedActionRow> = fixed_actions::table
        .filter(fixed_actions::body_id.eq(body))
        .filter(fixed_actions::family.eq(family.to_string()))
        .select(db_models::FixedActionRow::as_select())
        .load(conn)
        .await
        .map_err(Error::from_db)?;
    Ok(rows
        .into_iter()
        .map(|row| {
            row.started_at + chrono::Duration::milliseconds(row.unit_duration_ms * row.remaining)
        })
        .max())
}

/// Bodies carrying an overdue completion, for the maintenance sweep.
pub async fn due_bodies(conn: &mut AsyncPgConnection, now: DateTime<Utc>) -> Result<Vec<Uuid>> {
    let mut body_ids: Vec<Uuid> = progress_actions::table
        .filter(progress_actions::completed_at.le(now))
        .select(progress_actions::body_id)
        .load(conn)
        .await
        .map_err(Error::from_db)?;
    let fixed: Vec<db_models::FixedActionRow> = fixed_actions::table
        .select(db_models::FixedActionRow::as_select())
        .load(conn)
        .await
        .map_err(Error::from_db)?;
    for row in fixed {
        let next_unit = row.started_at + chrono::Duration::milliseconds(row.unit_duration_ms);
        if next_unit <= now {
            body_ids.push(row.body_id);
        }
    }
    body_ids.sort();
    body_ids.dedup();
    Ok(body_ids)
}

#[derive(Debug, Serialize)]
struct ProgressPayload<'a> {
    id: Uuid,
    body: Uuid,
    player: Uuid,
    element: &'a str,
    current_level: i64,
    desired_level: i64,
    points: f64,
    costs: &'a HashMap<String, f64>,
    completed_at: DateTime<Utc>,
}

pub async fn create_progress(conn: &mut AsyncPgConnection, action: &ProgressAction) -> Result<()> {
    let script = match action.family {
        ActionFamily::Building => "create_building_upgrade_action",
        ActionFamily::Technology => "create_technology_upgrade_action",
        _ => return Err(Error::InvalidElementForAction),
    };
    let payload = ProgressPayload {
        id: action.header.id,
        body: action.header.body,
        player: action.player,
        element: &action.header.element,
        current_level: action.current_level,
        desired_level: action.desired_level,
        points: action.points,
        costs: &action.costs,
        completed_at: action.completed_at,
    };
    db::execute(conn, script, &payload).await.map_err(|e| match e {
        Error::DuplicatedElement { .. } => Error::OnlyOneActionAuthorized,
        other => other.refine_foreign_key(),
    })
}

#[derive(Debug, Serialize)]
struct FixedPayload<'a> {
    id: Uuid,
    body: Uuid,
    family: ActionFamily,
    element: &'a str,
    amount: i64,
    unit_duration_ms: i64,
    started_at: DateTime<Utc>,
    costs: &'a HashMap<String, f64>,
}

pub async fn create_fixed(
    conn: &mut AsyncPgConnection,
    action: &FixedAction,
    costs: &HashMap<String, f64>,
) -> Result<()> {
    let payload = FixedPayload {
        id: action.header.id,
        body: action.header.body,
        family: action.family,
        element: &action.header.element,
        amount: action.amount,
        unit_duration_ms: action.unit_duration_ms,
        started_at: action.started_at,
        costs,
    };
    db::execute(conn, "create_ship_upgrade_action", &payload)
        .await
        .map_err(|e| e.refine_foreign_key())
}

pub async fn delete_progress(conn: &mut AsyncPgConnection, id: Uuid) -> Result<()> {
    diesel::delete(progress_actions::table.find(id))
        .execute(conn)
        .await
        .map_err(Error::from_db)?;
    Ok(())
}

/// Shrink a partially consumed fixed action, or drop it once empty.
pub async fn consume_fixed(
    conn: &mut AsyncPgConnection,
    id: Uuid,
    remaining: i64,
    started_at: DateTime<Utc>,
) -> Result<()> {
    if remaining <= 0 {
        diesel::delete(fixed_actions::table.find(id))
            .execute(conn)
            .await
            .map_err(Error::from_db)?;
    } else {
        diesel::update(fixed_actions::table.find(id))
            .set((
                fixed_actions::remaining.eq(remaining),
                fixed_actions::started_at.eq(started_at),
            ))
            .execute(conn)
            .await
            .map_err(Error::from_db)?;
    }
    Ok(())
}
