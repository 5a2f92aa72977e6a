//! Espionage resolution: report depth from the probe count and the research
//! gap, counter-espionage odds, and the hand-off to combat on detection.

use crate::catalog::SHIP_ESPIONAGE_PROBE;
use crate::error::{Error, Result};
use crate::fleet;
use crate::models::{
    Body, EspionageReport, Fleet, InfoLevel, Player, ResourceAmount, UnitCount, Universe,
    TECH_ESPIONAGE,
};
use crate::repo;
use crate::util::{clamp, seed_from_instant};
use chrono::{DateTime, Utc};
use diesel_async::AsyncPgConnection;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::*;
use uuid::Uuid;

/// Detection score: probes plus the signed square of the research gap.
pub fn detection(probes: i64, spy_level: i64, defender_level: i64) -> i64 {
    let gap = spy_level - defender_level;
    probes + gap * gap.abs()
}

/// Chance that the defender notices the probes and scrambles defenders:
/// `2^(def - spy) * defenderShips * probes * 0.25 / 100`, clamped to [0, 1].
pub fn counter_espionage_probability(
    probes: i64,
    spy_level: i64,
    defender_level: i64,
    defender_ships: i64,
) -> f64 {
    let scale = 2f64.powi((defender_level - spy_level) as i32);
    clamp(
        scale * defender_ships as f64 * probes as f64 * 0.25 / 100.0,
        0.0,
        1.0,
    )
}

fn sorted_counts(map: &std::collections::HashMap<String, i64>) -> Vec<UnitCount> {
    let mut entries: Vec<UnitCount> = map
        .iter()
        .filter(|(_, count)| **count > 0)
        .map(|(element, count)| UnitCount::new(element, *count))
        .collect();
    entries.sort_by(|a, b| a.element.cmp(&b.element));
    entries
}

/// Assemble the report sections the achieved depth grants. Deeper levels
/// are cumulative.
pub fn build_report(
    fleet: &Fleet,
    body: &Body,
    spy: &Player,
    defender: &Player,
    info_level: InfoLevel,
    counter_espionage: f64,
    now: DateTime<Utc>,
) -> EspionageReport {
    let resources: Vec<ResourceAmount> = body
        .resources()
        .iter()
        .map(|s| ResourceAmount::new(&s.resource, s.amount))
        .collect();
    let fleets = if info_level >= InfoLevel::Fleets {
        sorted_counts(body.ships())
    } else {
        Vec::new()
    };
    let defenses = if info_level >= InfoLevel::Defenses {
        sorted_counts(body.defenses())
    } else {
        Vec::new()
    };
    let buildings = if info_level >= InfoLevel::Buildings {
        sorted_counts(body.buildings())
    } else {
        Vec::new()
    };
    let researches = if info_level >= InfoLevel::Researches {
        sorted_counts(&defender.technologies)
    } else {
        Vec::new()
    };
    EspionageReport {
        id: Uuid::new_v4(),
        universe: fleet.universe,
        spy: spy.id,
        target_player: defender.id,
        location: fleet.target,
        info_level,
        resources,
        fleets,
        defenses,
        buildings,
        researches,
        counter_espionage,
        created_at: now,
    }
}

/// Resolve an espionage fleet over its target. Emits the report, then rolls
/// counter-espionage: on detection the probes are thrown to the defense
/// batteries, otherwise the fleet slips home.
pub async fn resolve(
    conn: &mut AsyncPgConnection,
    fleet: &Fleet,
    body: &mut Body,
    universe: &Universe,
    now: DateTime<Utc>,
) -> Result<()> {
    let components = repo::fleets::components(conn, fleet.id).await?;
    let probes: i64 = components
        .iter()
        .flat_map(|c| c.ships.iter())
        .filter(|s| s.element == SHIP_ESPIONAGE_PROBE)
        .map(|s| s.count)
        .sum();
    if probes <= 0 {
        return Err(Error::FleetEspionageSimulationFailure);
    }

    let spy = repo::players::fetch(conn, fleet.player).await?;
    let defender = repo::players::fetch(conn, body.player()).await?;
    let spy_level = spy.technology_level(TECH_ESPIONAGE);
    let defender_level = defender.technology_level(TECH_ESPIONAGE);
    let defender_ships: i64 = body.ships().values().sum();

    let info_level = InfoLevel::from_detection(detection(probes, spy_level, defender_level));
    let probability =
        counter_espionage_probability(probes, spy_level, defender_level, defender_ships);
    let report = build_report(fleet, body, &spy, &defender, info_level, probability, now);
    repo::reports::save_espionage(conn, &report).await?;
    debug!(
        "espionage at {}: level {:?}, counter {:.3}",
        fleet.target, info_level, probability
    );

    let mut rng = StdRng::seed_from_u64(seed_from_instant(fleet.arrival_time));
    if (rng.random::<f32>() as f64) <= probability {
        info!("espionage fleet {} detected, defenses open fire", fleet.id);
        return fleet::resolve_attack(conn, fleet, body, universe, now).await;
    }
    repo::fleets::set_returning(conn, fleet.id).await
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_detection_score() {
        assert_eq!(detection(3, 4, 4), 3);
        assert_eq!(detection(3, 6, 4), 7);
        // a better-defended target subtracts
        assert_eq!(detection(10, 2, 5), 1);
    }

    #[test]
    fn test_counter_espionage_clamps_to_one() {
        // probes 6, ships 100, spy 2 vs def 4: 4 * 100 * 6 * 0.25 / 100 = 6
        let p = counter_espionage_probability(6, 2, 4, 100);
        assert_eq!(p, 1.0);
    }

    #[test]
    fn test_counter_espionage_small_case() {
        // 2^0 * 8 * 2 * 0.25 / 100 = 0.04
        let p = counter_espionage_probability(2, 3, 3, 8);
        assert!((p - 0.04).abs() < 1e-12);
    }

    #[test]
    fn test_counter_espionage_zero_ships() {
        assert_eq!(counter_espionage_probability(5, 0, 9, 0), 0.0);
    }
}
