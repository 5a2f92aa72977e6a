use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Discriminant for the four action families. Progress actions (buildings,
/// technologies) move an element between two adjacent levels; fixed actions
/// (ships, defenses) build a count of identical units one by one.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActionFamily {
    Building,
    Technology,
    Ship,
    Defense,
}

impl ActionFamily {
    pub fn is_progress(&self) -> bool {
        matches!(self, ActionFamily::Building | ActionFamily::Technology)
    }
}

/// Fields shared by every action row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionHeader {
    pub id: Uuid,
    pub body: Uuid,
    pub element: String,
    pub created_at: DateTime<Utc>,
}

/// A building upgrade or a technology research. The desired level is always
/// one step away from the current one; costs are captured at validation time
/// and the points to credit on completion derive from them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressAction {
    pub header: ActionHeader,
    pub family: ActionFamily,
    pub player: Uuid,
    pub current_level: i64,
    pub desired_level: i64,
    pub points: f64,
    pub costs: HashMap<String, f64>,
    pub completed_at: DateTime<Utc>,
}

impl ProgressAction {
    pub fn is_upgrade(&self) -> bool {
        self.desired_level > self.current_level
    }
}

/// A queued batch of ships or defenses. Units complete one at a time; the
/// action row shrinks as units are consumed and disappears when empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedAction {
    pub header: ActionHeader,
    pub family: ActionFamily,
    pub amount: i64,
    pub remaining: i64,
    pub unit_duration_ms: i64,
    pub started_at: DateTime<Utc>,
}

impl FixedAction {
    pub fn unit_duration(&self) -> Duration {
        Duration::milliseconds(self.unit_duration_ms)
    }

    /// Completion instant of the k-th pending unit (1-based).
    pub fn unit_completion(&self, k: i64) -> DateTime<Utc> {
        self.started_at + Duration::milliseconds(self.unit_duration_ms * k)
    }

    /// Number of pending units finished by `now`.
    pub fn completed_units(&self, now: DateTime<Utc>) -> i64 {
        if self.unit_duration_ms <= 0 {
            return self.remaining;
        }
        let elapsed = (now - self.started_at).num_milliseconds();
        if elapsed < 0 {
            return 0;
        }
        (elapsed / self.unit_duration_ms).min(self.remaining)
    }

    /// Instant at which the whole queue drains.
    pub fn completion_time(&self) -> DateTime<Utc> {
        self.unit_completion(self.remaining)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn fixed(remaining: i64, unit_ms: i64) -> FixedAction {
        FixedAction {
            header: ActionHeader {
                id: Uuid::new_v4(),
                body: Uuid::new_v4(),
                element: "light_fighter".to_string(),
                created_at: Utc::now(),
            },
            family: ActionFamily::Ship,
            amount: remaining,
            remaining,
            unit_duration_ms: unit_ms,
            started_at: Utc::now(),
        }
    }

    #[test]
    fn test_completed_units() {
        let action = fixed(10, 1_000);
        assert_eq!(action.completed_units(action.started_at), 0);
        let later = action.started_at + Duration::milliseconds(3_500);
        assert_eq!(action.completed_units(later), 3);
        let way_later = action.started_at + Duration::seconds(3_600);
        assert_eq!(action.completed_units(way_later), 10);
    }

    #[test]
    fn test_zero_duration_completes_instantly() {
        let action = fixed(4, 0);
        assert_eq!(action.completed_units(action.started_at), 4);
    }

    #[test]
    fn test_completion_time() {
        let action = fixed(5, 2_000);
        assert_eq!(
            action.completion_time(),
            action.started_at + Duration::seconds(10)
        );
    }
}
