use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

pub const TECH_COMPUTERS: &str = "computers";
pub const TECH_ASTROPHYSICS: &str = "astrophysics";
pub const TECH_ESPIONAGE: &str = "espionage";
pub const TECH_WEAPONS: &str = "weapons";
pub const TECH_SHIELDING: &str = "shielding";
pub const TECH_ARMOUR: &str = "armour";
pub const TECH_RESEARCH_NETWORK: &str = "intergalactic_research_network";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: Uuid,
    pub account: Uuid,
    pub universe: Uuid,
    pub name: String,
    pub economy_points: f64,
    pub research_points: f64,
    pub military_points: f64,
    /// Fleets currently in flight for this player.
    pub fleets_count: i64,
    /// Expedition fleets currently in flight.
    pub expeditions_count: i64,
    pub technologies: HashMap<String, i64>,
    pub created_at: DateTime<Utc>,
}

impl Player {
    pub fn technology_level(&self, technology: &str) -> i64 {
        self.technologies.get(technology).copied().unwrap_or(0)
    }

    /// Maximum number of colonies allowed by astrophysics. Zero research
    /// means colonization is locked no matter how few planets are owned.
    pub fn can_colonize(&self, owned_planets: i64) -> bool {
        let astrophysics = self.technology_level(TECH_ASTROPHYSICS);
        if astrophysics == 0 {
            return false;
        }
        let max_planets = 2 + (astrophysics - 1) / 2;
        owned_planets < max_planets
    }

    pub fn max_fleets(&self) -> i64 {
        self.technology_level(TECH_COMPUTERS) + 1
    }

    pub fn max_expeditions(&self) -> i64 {
        (self.technology_level(TECH_ASTROPHYSICS) as f64).sqrt().floor() as i64
    }

    pub fn can_send_fleet(&self, expedition: bool) -> bool {
        if self.fleets_count >= self.max_fleets() {
            return false;
        }
        if expedition && self.expeditions_count >= self.max_expeditions() {
            return false;
        }
        true
    }

    /// Amplification applied to a unit's base combat stats by the owner's
    /// weapons, shielding and armour researches.
    pub fn combat_amplifiers(&self) -> (f64, f64, f64) {
        let amp = |tech: &str| 1.0 + 0.1 * self.technology_level(tech) as f64;
        (
            amp(TECH_WEAPONS),
            amp(TECH_SHIELDING),
            amp(TECH_ARMOUR),
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn player_with(technologies: &[(&str, i64)]) -> Player {
        Player {
            id: Uuid::new_v4(),
            account: Uuid::new_v4(),
            universe: Uuid::new_v4(),
            name: "tester".to_string(),
            economy_points: 0.0,
            research_points: 0.0,
            military_points: 0.0,
            fleets_count: 0,
            expeditions_count: 0,
            technologies: technologies
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_can_colonize_requires_astrophysics() {
        let player = player_with(&[]);
        assert!(!player.can_colonize(0));
        assert!(!player.can_colonize(1));
    }

    #[test]
    fn test_can_colonize_scales_with_level() {
        // level 1 -> 2 planets, level 3 -> 3, level 5 -> 4
        let player = player_with(&[(TECH_ASTROPHYSICS, 1)]);
        assert!(player.can_colonize(1));
        assert!(!player.can_colonize(2));
        let player = player_with(&[(TECH_ASTROPHYSICS, 3)]);
        assert!(player.can_colonize(2));
        assert!(!player.can_colonize(3));
        let player = player_with(&[(TECH_ASTROPHYSICS, 5)]);
        assert!(player.can_colonize(3));
    }

    #[test]
    fn test_can_send_fleet() {
        // no computers research: only state allowed is zero fleets in flight
        let mut player = player_with(&[]);
        assert!(player.can_send_fleet(false));
        player.fleets_count = 1;
        assert!(!player.can_send_fleet(false));

        let mut player = player_with(&[(TECH_COMPUTERS, 2), (TECH_ASTROPHYSICS, 4)]);
        player.fleets_count = 2;
        assert!(player.can_send_fleet(false));
        // expeditions capped at floor(sqrt(astrophysics)) = 2
        player.expeditions_count = 2;
        assert!(!player.can_send_fleet(true));
        assert!(player.can_send_fleet(false));
    }

    #[test]
    fn test_combat_amplifiers() {
        let player = player_with(&[(TECH_WEAPONS, 3), (TECH_ARMOUR, 1)]);
        let (weapon, shield, hull) = player.combat_amplifiers();
        assert_eq!(weapon, 1.3);
        assert_eq!(shield, 1.0);
        assert_eq!(hull, 1.1);
    }
}
