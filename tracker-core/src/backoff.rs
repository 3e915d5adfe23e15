//! Reconnect backoff table used by the connection supervisor.
//!
//! The delays double at every step except between the fifth and sixth entry,
//! where the table jumps from 512 s to 2048 s. The values are kept verbatim.

use core::time::Duration;

/// Reconnect delays in seconds, indexed by the connect retry counter.
pub const BACKOFF_DELAYS_SECS: [u32; 15] = [
    32, 64, 128, 256, 512, 2_048, 4_096, 8_192, 16_384, 32_768, 65_536, 131_072, 262_144, 524_288,
    1_048_576,
];

/// Default number of connect retries before the cloud is reported unreachable.
pub const DEFAULT_CONNECT_RETRIES: u8 = 10;

/// Largest retry ceiling the table can serve (`ceiling + 1` must be a valid index).
pub const MAX_CONNECT_RETRIES: u8 = 13;

const _: () = assert!(BACKOFF_DELAYS_SECS.len() == MAX_CONNECT_RETRIES as usize + 2);
const _: () = assert!(DEFAULT_CONNECT_RETRIES <= MAX_CONNECT_RETRIES);

/// Lookup over [`BACKOFF_DELAYS_SECS`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BackoffSchedule {
    delays: &'static [u32],
}

impl BackoffSchedule {
    /// Schedule backed by the default table.
    pub const fn new() -> Self {
        Self {
            delays: &BACKOFF_DELAYS_SECS,
        }
    }

    /// Returns the delay armed after the `retries`-th connect attempt.
    #[must_use]
    pub fn delay(&self, retries: u8) -> Option<Duration> {
        self.delays
            .get(usize::from(retries))
            .map(|secs| Duration::from_secs(u64::from(*secs)))
    }

    /// Returns the delay for `retries`, saturating at the last table entry.
    #[must_use]
    pub fn delay_saturating(&self, retries: u8) -> Duration {
        let last = self.delays.len().saturating_sub(1);
        let index = usize::from(retries).min(last);
        Duration::from_secs(u64::from(self.delays[index]))
    }

    /// Number of entries in the table.
    pub fn len(&self) -> usize {
        self.delays.len()
    }

    /// Returns `true` when the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.delays.is_empty()
    }
}

impl Default for BackoffSchedule {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_are_non_decreasing() {
        let schedule = BackoffSchedule::new();
        let mut previous = Duration::ZERO;
        for retries in 0..schedule.len() as u8 {
            let delay = schedule.delay(retries).expect("delay within table");
            assert!(delay >= previous, "retry {retries} shrank the delay");
            previous = delay;
        }
    }

    #[test]
    fn table_gap_is_preserved() {
        let schedule = BackoffSchedule::new();
        assert_eq!(schedule.delay(4), Some(Duration::from_secs(512)));
        assert_eq!(schedule.delay(5), Some(Duration::from_secs(2_048)));
    }

    #[test]
    fn out_of_range_lookups() {
        let schedule = BackoffSchedule::new();
        assert_eq!(schedule.delay(15), None);
        assert_eq!(
            schedule.delay_saturating(200),
            Duration::from_secs(1_048_576)
        );
    }

    #[test]
    fn ceiling_leaves_room_for_final_attempt() {
        assert_eq!(MAX_CONNECT_RETRIES, 13);
        let schedule = BackoffSchedule::new();
        assert!(schedule.delay(MAX_CONNECT_RETRIES + 1).is_some());
        assert!(schedule.delay(MAX_CONNECT_RETRIES + 2).is_none());
        assert_eq!(schedule.len(), usize::from(MAX_CONNECT_RETRIES) + 2);
    }
}
