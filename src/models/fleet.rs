use crate::models::{BodyKind, Coordinates, ResourceAmount, UnitCount};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A fleet in flight. Components may come from several bodies; the fleet has
/// a single arrival instant that all components synchronize on. Bodies are
/// referenced by id only, never by ownership of the row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fleet {
    pub id: Uuid,
    pub universe: Uuid,
    pub player: Uuid,
    pub objective: String,
    pub target: Coordinates,
    pub target_body: Option<Uuid>,
    pub arrival_time: DateTime<Utc>,
    pub return_time: DateTime<Utc>,
    pub is_returning: bool,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Fleet {
    /// Fleets that have delivered their objective and fly home are consumed
    /// on return; outbound fleets first wait for their arrival instant.
    pub fn has_arrived(&self, now: DateTime<Utc>) -> bool {
        self.arrival_time <= now
    }

    pub fn has_returned(&self, now: DateTime<Utc>) -> bool {
        self.is_returning && self.return_time <= now
    }
}

/// One source-body manifest inside a fleet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetComponent {
    pub id: Uuid,
    pub fleet: Uuid,
    pub player: Uuid,
    pub source: Uuid,
    pub source_kind: BodyKind,
    /// User-chosen speed ratio in (0, 1], quantized to 10%.
    pub speed_ratio: f64,
    pub joined_at: DateTime<Utc>,
    pub flight_duration_ms: i64,
    pub ships: Vec<UnitCount>,
    pub cargo: Vec<ResourceAmount>,
    pub consumption: Vec<ResourceAmount>,
}

impl FleetComponent {
    pub fn flight_duration(&self) -> Duration {
        Duration::milliseconds(self.flight_duration_ms)
    }

    pub fn cargo_amount(&self) -> f64 {
        self.cargo.iter().map(|c| c.amount).sum()
    }

    pub fn ship_count(&self) -> i64 {
        self.ships.iter().map(|s| s.count).sum()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_fleet_arrival_and_return() {
        let now = Utc::now();
        let fleet = Fleet {
            id: Uuid::new_v4(),
            universe: Uuid::new_v4(),
            player: Uuid::new_v4(),
            objective: "transport".to_string(),
            target: Coordinates::new(1, 1, 5, BodyKind::Planet),
            target_body: None,
            arrival_time: now - Duration::seconds(10),
            return_time: now + Duration::seconds(10),
            is_returning: false,
            name: "supply run".to_string(),
            created_at: now - Duration::seconds(100),
        };
        assert!(fleet.has_arrived(now));
        assert!(!fleet.has_returned(now));
        let mut returning = fleet.clone();
        returning.is_returning = true;
        returning.return_time = now - Duration::seconds(1);
        assert!(returning.has_returned(now));
    }
}
