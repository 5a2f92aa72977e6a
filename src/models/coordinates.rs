use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BodyKind {
    Planet,
    Moon,
    Debris,
}

/// Position of a body inside a universe. The kind discriminates between the
/// planet, its moon and the debris field sharing the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinates {
    pub galaxy: i64,
    pub system: i64,
    pub position: i64,
    pub kind: BodyKind,
}

impl Coordinates {
    pub fn new(galaxy: i64, system: i64, position: i64, kind: BodyKind) -> Self {
        Self {
            galaxy,
            system,
            position,
            kind,
        }
    }

    /// True when both coordinates denote the same slot, regardless of which
    /// body kind sits there.
    pub fn same_slot(&self, other: &Coordinates) -> bool {
        self.galaxy == other.galaxy
            && self.system == other.system
            && self.position == other.position
    }

    pub fn with_kind(&self, kind: BodyKind) -> Coordinates {
        Coordinates { kind, ..*self }
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}:{}:{}:{}]",
            self.galaxy, self.system, self.position, self.kind
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_same_slot_ignores_kind() {
        let planet = Coordinates::new(1, 42, 8, BodyKind::Planet);
        let moon = Coordinates::new(1, 42, 8, BodyKind::Moon);
        let other = Coordinates::new(1, 42, 9, BodyKind::Planet);
        assert!(planet.same_slot(&moon));
        assert!(!planet.same_slot(&other));
    }

    #[test]
    fn test_display() {
        let c = Coordinates::new(3, 120, 7, BodyKind::Debris);
        assert_eq!(c.to_string(), "[3:120:7:debris]");
    }
}
