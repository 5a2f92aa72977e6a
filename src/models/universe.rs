use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-universe multipliers and extents. Loaded once per request alongside
/// the catalog; gameplay formulas take these as parameters so several
/// universes with different speeds can share one process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Universe {
    pub id: Uuid,
    pub name: String,
    /// Divides action completion times.
    pub eco_speed: f64,
    /// Divides flight times.
    pub fleet_speed: f64,
    /// Extra flight-time divisor kept configurable instead of the legacy
    /// hard-coded rescale.
    pub fleet_acceleration: f64,
    /// Scales element costs.
    pub cost_ratio: f64,
    /// Scales per-second resource production.
    pub production_ratio: f64,
    /// Share of a destroyed ship's cost that turns into debris.
    pub ships_to_ruins: f64,
    /// Share of a destroyed defense's cost that turns into debris.
    pub defenses_to_ruins: f64,
    /// Scales the moon formation chance.
    pub moon_chance: f64,
    pub defense_rebuild_ratio: f64,
    pub pillage_ratio: f64,
    pub galaxies: i64,
    pub systems: i64,
    pub positions: i64,
    pub created_at: DateTime<Utc>,
}

impl Universe {
    /// Sensible defaults for a 1x universe; tests and fixtures start here.
    pub fn with_defaults(id: Uuid, name: &str) -> Universe {
        Universe {
            id,
            name: name.to_string(),
            eco_speed: 1.0,
            fleet_speed: 1.0,
            fleet_acceleration: 1.0,
            cost_ratio: 1.0,
            production_ratio: 1.0,
            ships_to_ruins: 0.3,
            defenses_to_ruins: 0.0,
            moon_chance: 1.0,
            defense_rebuild_ratio: 0.7,
            pillage_ratio: 0.5,
            galaxies: 9,
            systems: 499,
            positions: 15,
            created_at: Utc::now(),
        }
    }
}
