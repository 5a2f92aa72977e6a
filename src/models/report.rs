use crate::models::{Coordinates, ResourceAmount, UnitCount};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fight outcome from the defender's perspective.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FightOutcome {
    Victory,
    Draw,
    Loss,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetSurvivors {
    pub fleet: Uuid,
    pub ships: Vec<UnitCount>,
}

/// Combined combat report, persisted once and owned by every participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FightReport {
    pub id: Uuid,
    pub universe: Uuid,
    pub location: Coordinates,
    pub outcome: FightOutcome,
    pub attackers: Vec<Uuid>,
    pub defenders: Vec<Uuid>,
    pub fleets: Vec<Uuid>,
    pub survivors: Vec<FleetSurvivors>,
    pub surviving_defenses: Vec<UnitCount>,
    pub pillage: Vec<ResourceAmount>,
    pub debris: Vec<ResourceAmount>,
    pub rebuilt_defenses: i64,
    pub moon_diameter: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Depth of an espionage report, cumulative from materials up to researches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InfoLevel {
    Resources,
    Fleets,
    Defenses,
    Buildings,
    Researches,
}

impl InfoLevel {
    /// Report depth selected by the detection score
    /// `probes + (spy - def) * |spy - def|`.
    pub fn from_detection(detection: i64) -> InfoLevel {
        if detection < 2 {
            InfoLevel::Resources
        } else if detection == 2 {
            InfoLevel::Fleets
        } else if detection < 5 {
            InfoLevel::Defenses
        } else if detection < 7 {
            InfoLevel::Buildings
        } else {
            InfoLevel::Researches
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EspionageReport {
    pub id: Uuid,
    pub universe: Uuid,
    pub spy: Uuid,
    pub target_player: Uuid,
    pub location: Coordinates,
    pub info_level: InfoLevel,
    pub resources: Vec<ResourceAmount>,
    pub fleets: Vec<UnitCount>,
    pub defenses: Vec<UnitCount>,
    pub buildings: Vec<UnitCount>,
    pub researches: Vec<UnitCount>,
    pub counter_espionage: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpeditionReport {
    pub id: Uuid,
    pub universe: Uuid,
    pub player: Uuid,
    pub fleet: Uuid,
    pub location: Coordinates,
    pub outcome: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_info_level_thresholds() {
        assert_eq!(InfoLevel::from_detection(-3), InfoLevel::Resources);
        assert_eq!(InfoLevel::from_detection(1), InfoLevel::Resources);
        assert_eq!(InfoLevel::from_detection(2), InfoLevel::Fleets);
        assert_eq!(InfoLevel::from_detection(3), InfoLevel::Defenses);
        assert_eq!(InfoLevel::from_detection(4), InfoLevel::Defenses);
        assert_eq!(InfoLevel::from_detection(5), InfoLevel::Buildings);
        assert_eq!(InfoLevel::from_detection(6), InfoLevel::Buildings);
        assert_eq!(InfoLevel::from_detection(7), InfoLevel::Researches);
        assert_eq!(InfoLevel::from_detection(40), InfoLevel::Researches);
    }
}
