use chrono::{DateTime, Utc};
use std::time::Duration;

/// Wall-clock distance from `now` to `target`, zero once it has passed.
pub fn until(target: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (target - now).to_std().unwrap_or_default()
}

/// Whole seconds, rounding any partial second up.
pub fn ceil_seconds(d: Duration) -> u64 {
    let secs = d.as_secs();
    if d.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn until_clamps_past_targets() {
        let now = Utc::now();
        assert_eq!(until(now - ChronoDuration::seconds(5), now), Duration::ZERO);
        assert_eq!(until(now + ChronoDuration::seconds(5), now), Duration::from_secs(5));
    }

    #[test]
    fn partial_seconds_round_up() {
        assert_eq!(ceil_seconds(Duration::from_millis(1_001)), 2);
        assert_eq!(ceil_seconds(Duration::from_secs(3)), 3);
        assert_eq!(ceil_seconds(Duration::ZERO), 0);
    }
}
