use chrono::{DateTime, Duration, Utc};

pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

/// Seconds expressed as a chrono duration with millisecond precision.
pub fn secs_to_duration(secs: f64) -> Duration {
    Duration::milliseconds((secs * 1000.0).round() as i64)
}

pub fn duration_to_secs(duration: Duration) -> f64 {
    duration.num_milliseconds() as f64 / 1000.0
}

/// Seed for the combat and espionage generators. Derived from the fleet
/// arrival instant so a rerun of the same fight is bit-identical.
pub fn seed_from_instant(instant: DateTime<Utc>) -> u64 {
    instant.timestamp_nanos_opt().unwrap_or_default() as u64
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_secs_round_trip() {
        let d = secs_to_duration(1920.5);
        assert_eq!(d.num_milliseconds(), 1_920_500);
        assert_eq!(duration_to_secs(d), 1920.5);
    }

    #[test]
    fn test_seed_is_stable() {
        let t = DateTime::parse_from_rfc3339("2024-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(seed_from_instant(t), seed_from_instant(t));
        assert_ne!(seed_from_instant(t), 0);
    }
}
