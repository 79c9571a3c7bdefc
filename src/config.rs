//! # Flight configuration.
//!
//! Provides [`FlightConfig`], the settings shared by flights and flight groups,
//! and [`Retention`], the policy deciding how long a settled flight stays
//! reachable through its group.
//!
//! Config is used in two ways:
//! 1. **Standalone flights**: `Flight::with_config(op, &config)` (timeout only)
//! 2. **Groups**: `FlightGroup::builder(config)` (all fields)
//!
//! ## Sentinel values
//! - `timeout = 0s` → no timeout
//! - `bus_capacity = 0` → clamped to 1

use std::time::Duration;

/// How long a group keeps a settled flight reachable by its key.
///
/// A flight itself never forgets its outcome; retention only controls whether
/// the next `FlightGroup::work` call for the same key joins it or starts a new one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Retention {
    /// Keep settled flights until forgotten or the group shuts down.
    #[default]
    Forever,
    /// Evict as soon as the flight settles; only in-flight work is shared.
    UntilSettled,
    /// Reuse a settled outcome while it is younger than the given age.
    Ttl(Duration),
}

impl Retention {
    /// Returns true if a flight settled `age` ago is still reusable.
    ///
    /// ```
    /// use std::time::Duration;
    /// use flightcast::Retention;
    ///
    /// let ttl = Retention::Ttl(Duration::from_secs(30));
    /// assert!(ttl.retains(Duration::from_secs(10)));
    /// assert!(!ttl.retains(Duration::from_secs(30)));
    /// assert!(!Retention::UntilSettled.retains(Duration::ZERO));
    /// ```
    #[inline]
    pub fn retains(&self, age: Duration) -> bool {
        match self {
            Retention::Forever => true,
            Retention::UntilSettled => false,
            Retention::Ttl(ttl) => age < *ttl,
        }
    }
}

/// Configuration for flights and flight groups.
///
/// ## Field semantics
/// - `timeout`: per-execution timeout (`0s` = none)
/// - `retention`: settled-flight reuse policy for groups
/// - `bus_capacity`: event bus ring buffer size (min 1)
#[derive(Clone, Debug)]
pub struct FlightConfig {
    /// Maximum time an operation may run before its flight fails with `Timeout`.
    ///
    /// On timeout the operation's token is cancelled and its future dropped.
    pub timeout: Duration,

    /// Settled-flight reuse policy (groups only).
    pub retention: Retention,

    /// Capacity of the event bus broadcast channel ring buffer (groups only).
    ///
    /// Slow listeners that lag behind more than `bus_capacity` messages skip older items.
    pub bus_capacity: usize,
}

impl FlightConfig {
    /// Returns the execution timeout as an `Option`.
    ///
    /// - `None` → no timeout
    /// - `Some(d)` → timeout applied to the single execution
    #[inline]
    pub fn default_timeout(&self) -> Option<Duration> {
        if self.timeout == Duration::ZERO {
            None
        } else {
            Some(self.timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for FlightConfig {
    /// Default configuration:
    ///
    /// - `timeout = 0s` (no timeout)
    /// - `retention = Retention::Forever` (permanent single-flight cache)
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            timeout: Duration::ZERO,
            retention: Retention::default(),
            bus_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_timeout_means_none() {
        let cfg = FlightConfig::default();
        assert_eq!(cfg.default_timeout(), None);

        let cfg = FlightConfig {
            timeout: Duration::from_millis(250),
            ..FlightConfig::default()
        };
        assert_eq!(cfg.default_timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_bus_capacity_clamped() {
        let cfg = FlightConfig {
            bus_capacity: 0,
            ..FlightConfig::default()
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }

    #[test]
    fn test_forever_retains_any_age() {
        assert!(Retention::Forever.retains(Duration::from_secs(u64::MAX)));
        assert_eq!(FlightConfig::default().retention, Retention::Forever);
    }
}
