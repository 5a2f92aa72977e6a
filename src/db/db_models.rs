use chrono::{DateTime, Utc};
use diesel::{Identifiable, Insertable, Queryable, QueryableByName, Selectable};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Identifiable, Queryable, QueryableByName, Selectable)]
#[diesel(table_name = crate::schema::accounts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub mail: String,
    pub password: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Identifiable, Queryable, QueryableByName, Selectable)]
#[diesel(table_name = crate::schema::universes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Universe {
    pub id: Uuid,
    pub name: String,
    pub eco_speed: f64,
    pub fleet_speed: f64,
    pub fleet_acceleration: f64,
    pub cost_ratio: f64,
    pub production_ratio: f64,
    pub ships_to_ruins: f64,
    pub defenses_to_ruins: f64,
    pub moon_chance: f64,
    pub defense_rebuild_ratio: f64,
    pub pillage_ratio: f64,
    pub galaxies: i64,
    pub systems: i64,
    pub positions: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Identifiable, Queryable, QueryableByName, Selectable)]
#[diesel(table_name = crate::schema::players)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Player {
    pub id: Uuid,
    pub account_id: Uuid,
    pub universe_id: Uuid,
    pub name: String,
    pub economy_points: f64,
    pub research_points: f64,
    pub military_points: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = crate::schema::player_technologies)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PlayerTechnology {
    pub player_id: Uuid,
    pub technology: String,
    pub level: i64,
}

#[derive(Debug, Clone, Identifiable, Queryable, QueryableByName, Selectable)]
#[diesel(table_name = crate::schema::bodies)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BodyRow {
    pub id: Uuid,
    pub universe_id: Uuid,
    pub player_id: Uuid,
    pub kind: String,
    pub parent_id: Option<Uuid>,
    pub galaxy: i64,
    pub solar_system: i64,
    pub position: i64,
    pub name: String,
    pub fields: i64,
    pub diameter: i64,
    pub min_temperature: i64,
    pub max_temperature: i64,
    pub homeworld: bool,
    pub last_activity: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = crate::schema::body_resources)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BodyResource {
    pub body_id: Uuid,
    pub resource: String,
    pub amount: f64,
    pub production: f64,
    pub storage_capacity: f64,
    pub production_factor: f64,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = crate::schema::body_buildings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BodyBuilding {
    pub body_id: Uuid,
    pub building: String,
    pub level: i64,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = crate::schema::body_ships)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BodyShip {
    pub body_id: Uuid,
    pub ship: String,
    pub count: i64,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = crate::schema::body_defenses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BodyDefense {
    pub body_id: Uuid,
    pub defense: String,
    pub count: i64,
}

#[derive(Debug, Clone, Identifiable, Queryable, QueryableByName, Selectable)]
#[diesel(table_name = crate::schema::progress_actions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProgressActionRow {
    pub id: Uuid,
    pub body_id: Uuid,
    pub player_id: Uuid,
    pub family: String,
    pub element: String,
    pub current_level: i64,
    pub desired_level: i64,
    pub points: f64,
    pub costs: Value,
    pub created_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Identifiable, Queryable, QueryableByName, Selectable)]
#[diesel(table_name = crate::schema::fixed_actions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct FixedActionRow {
    pub id: Uuid,
    pub body_id: Uuid,
    pub family: String,
    pub element: String,
    pub amount: i64,
    pub remaining: i64,
    pub unit_duration_ms: i64,
    pub started_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Identifiable, Queryable, QueryableByName, Selectable)]
#[diesel(table_name = crate::schema::fleets)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct FleetRow {
    pub id: Uuid,
    pub universe_id: Uuid,
    pub player_id: Uuid,
    pub objective: String,
    pub target_galaxy: i64,
    pub target_system: i64,
    pub target_position: i64,
    pub target_kind: String,
    pub target_body_id: Option<Uuid>,
    pub arrival_time: DateTime<Utc>,
    pub return_time: DateTime<Utc>,
    pub is_returning: bool,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::fleets)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewFleet {
    pub id: Uuid,
    pub universe_id: Uuid,
    pub player_id: Uuid,
    pub objective: String,
    pub target_galaxy: i64,
    pub target_system: i64,
    pub target_position: i64,
    pub target_kind: String,
    pub target_body_id: Option<Uuid>,
    pub arrival_time: DateTime<Utc>,
    pub return_time: DateTime<Utc>,
    pub is_returning: bool,
    pub name: String,
}

#[derive(Debug, Clone, Identifiable, Queryable, QueryableByName, Selectable)]
#[diesel(table_name = crate::schema::fleet_components)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct FleetComponentRow {
    pub id: Uuid,
    pub fleet_id: Uuid,
    pub player_id: Uuid,
    pub source_body_id: Uuid,
    pub source_kind: String,
    pub speed_ratio: f64,
    pub joined_at: DateTime<Utc>,
    pub flight_duration_ms: i64,
    pub ships: Value,
    pub cargo: Value,
    pub consumption: Value,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::fleet_components)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewFleetComponent {
    pub id: Uuid,
    pub fleet_id: Uuid,
    pub player_id: Uuid,
    pub source_body_id: Uuid,
    pub source_kind: String,
    pub speed_ratio: f64,
    pub joined_at: DateTime<Utc>,
    pub flight_duration_ms: i64,
    pub ships: Value,
    pub cargo: Value,
    pub consumption: Value,
}

#[derive(Debug, Clone, Identifiable, Queryable, QueryableByName, Selectable)]
#[diesel(table_name = crate::schema::debris_fields)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DebrisField {
    pub id: Uuid,
    pub universe_id: Uuid,
    pub galaxy: i64,
    pub solar_system: i64,
    pub position: i64,
    pub resource: String,
    pub amount: f64,
    pub updated_at: DateTime<Utc>,
}
