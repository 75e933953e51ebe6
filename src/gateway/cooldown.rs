//! Per-provider rate-limit circuit breaker.
//!
//! The tracker is the only shared mutable state in the crate. It maps
//! provider name → monotonic next-available instant. Races only cause a
//! provider to be retried slightly early or late, which is acceptable.

use std::collections::HashMap;
use std::sync::{LazyLock, Mutex};
use std::time::{Duration, Instant};

use regex::Regex;

/// `18m`, `17.498s`, `1h` tokens inside a human-readable retry hint.
static DURATION_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]+(?:\.[0-9]+)?)([hms])").unwrap());

/// Parse a provider's human-readable retry interval.
///
/// Accepts `h`/`m`/`s` tokens in any combination: `"18m17.498s"` → 1097.498s,
/// `"42s"` → 42s, `"1h2m"` → 3720s. Returns `None` when no token is found
/// (callers fall back to a default cooldown).
pub fn parse_retry_interval(message: &str) -> Option<Duration> {
    let mut total_secs = 0.0f64;
    let mut found = false;

    for caps in DURATION_TOKEN.captures_iter(message) {
        let whole = caps.get(0).expect("regex group 0");
        // A trailing letter means the unit was a prefix of a longer word
        // ("500ms", "3mo") — not one of our tokens.
        if message[whole.end()..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic())
        {
            continue;
        }
        let amount: f64 = match caps[1].parse() {
            Ok(v) => v,
            Err(_) => continue,
        };
        let factor = match &caps[2] {
            "h" => 3600.0,
            "m" => 60.0,
            _ => 1.0,
        };
        total_secs += amount * factor;
        found = true;
    }

    if found && total_secs > 0.0 {
        Some(Duration::from_secs_f64(total_secs))
    } else {
        None
    }
}

/// Process-wide per-provider cooldown map.
///
/// Injected into every gateway rather than held as ambient global state,
/// so tests can isolate it and deployments can swap in a distributed
/// implementation at the same seam.
#[derive(Debug, Default)]
pub struct CooldownTracker {
    deadlines: Mutex<HashMap<String, Instant>>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suspend a provider for `duration` from now. Compare-then-set:
    /// an existing later deadline is kept, never shortened.
    pub fn suspend(&self, provider: &str, duration: Duration) {
        let deadline = Instant::now() + duration;
        let mut map = match self.deadlines.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let entry = map.entry(provider.to_string()).or_insert(deadline);
        if deadline > *entry {
            *entry = deadline;
        }
    }

    /// Remaining cooldown, if the provider is still suspended.
    pub fn remaining(&self, provider: &str) -> Option<Duration> {
        let map = match self.deadlines.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        map.get(provider)
            .and_then(|deadline| deadline.checked_duration_since(Instant::now()))
            .filter(|d| !d.is_zero())
    }

    pub fn is_cooling(&self, provider: &str) -> bool {
        self.remaining(provider).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minutes_and_fractional_seconds() {
        let d = parse_retry_interval("Please try again in 18m17.498s.").unwrap();
        assert!(d >= Duration::from_secs(1097), "got {d:?}");
        assert!(d < Duration::from_secs(1098));
    }

    #[test]
    fn parses_bare_seconds() {
        let d = parse_retry_interval("Rate limit reached. Retry after 42s").unwrap();
        assert_eq!(d, Duration::from_secs(42));
    }

    #[test]
    fn parses_hours_and_minutes() {
        let d = parse_retry_interval("try again in 1h2m").unwrap();
        assert_eq!(d, Duration::from_secs(3720));
    }

    #[test]
    fn ignores_unit_prefixes_of_longer_words() {
        // "ms" is not one of our tokens and must not count as minutes.
        assert_eq!(parse_retry_interval("latency was 500ms today"), None);
    }

    #[test]
    fn unparsable_message_is_none() {
        assert_eq!(parse_retry_interval("quota exceeded, come back later"), None);
        assert_eq!(parse_retry_interval(""), None);
    }

    #[test]
    fn suspend_and_expire() {
        let tracker = CooldownTracker::new();
        assert!(!tracker.is_cooling("openai"));

        tracker.suspend("openai", Duration::from_secs(30));
        assert!(tracker.is_cooling("openai"));
        assert!(tracker.remaining("openai").unwrap() > Duration::from_secs(29));
        assert!(!tracker.is_cooling("mistral"));
    }

    #[test]
    fn later_deadline_is_never_shortened() {
        let tracker = CooldownTracker::new();
        tracker.suspend("p", Duration::from_secs(120));
        tracker.suspend("p", Duration::from_secs(1));
        assert!(tracker.remaining("p").unwrap() > Duration::from_secs(118));
    }

    #[test]
    fn zero_duration_means_not_cooling() {
        let tracker = CooldownTracker::new();
        tracker.suspend("p", Duration::from_secs(0));
        assert!(!tracker.is_cooling("p"));
    }
}
