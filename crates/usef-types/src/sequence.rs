//! Process-wide monotonic id source.

use chrono::{DateTime, Datelike, Local, TimeZone, Timelike};
use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out strictly increasing numbers within one process.
///
/// The counter is seeded with the start time read as the 17 decimal digits
/// `yyyyMMddHHmmssSSS`, so values from a restarted process usually sort after
/// the previous run's. Nothing is guaranteed across processes.
#[derive(Debug)]
pub struct SequenceGenerator {
    counter: AtomicU64,
}

impl SequenceGenerator {
    /// Creates a generator seeded from the current local time.
    pub fn new() -> Self {
        Self::starting_at(timestamp_seed(&Local::now()))
    }

    /// Creates a generator whose first [`next`](Self::next) returns `seed + 1`.
    pub fn starting_at(seed: u64) -> Self {
        Self {
            counter: AtomicU64::new(seed),
        }
    }

    /// Returns the next value.
    pub fn next(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl Default for SequenceGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads a timestamp as the number `yyyyMMddHHmmssSSS`.
pub(crate) fn timestamp_seed<Tz: TimeZone>(at: &DateTime<Tz>) -> u64 {
    // chrono reports a leap second as 1000..=1999 ms; clamp to keep 17 digits.
    let millis = u64::from((at.nanosecond() / 1_000_000).min(999));
    let date = u64::from(at.year().unsigned_abs()) * 10_000
        + u64::from(at.month()) * 100
        + u64::from(at.day());
    let time = u64::from(at.hour()) * 10_000 + u64::from(at.minute()) * 100 + u64::from(at.second());
    (date * 1_000_000 + time) * 1_000 + millis
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn seed_matches_timestamp_digits() {
        let at = Utc
            .with_ymd_and_hms(2015, 7, 9, 8, 5, 3)
            .unwrap()
            .with_nanosecond(42_000_000)
            .unwrap();
        assert_eq!(timestamp_seed(&at), 20150709080503042);
        assert_eq!(timestamp_seed(&at).to_string().len(), 17);
    }

    #[test]
    fn new_generator_is_seeded_from_clock() {
        let seq = SequenceGenerator::new();
        let first = seq.next();
        assert_eq!(first.to_string().len(), 17);
        assert!(seq.next() > first);
    }

    #[test]
    fn starting_at_returns_seed_plus_one() {
        let seq = SequenceGenerator::starting_at(100);
        assert_eq!(seq.next(), 101);
        assert_eq!(seq.next(), 102);
    }

    #[test]
    fn concurrent_callers_get_distinct_increasing_values() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 1_000;

        let seq = Arc::new(SequenceGenerator::starting_at(0));
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let seq = Arc::clone(&seq);
                thread::spawn(move || (0..PER_THREAD).map(|_| seq.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut all = HashSet::new();
        for handle in handles {
            let values = handle.join().expect("thread should not panic");
            assert!(
                values.windows(2).all(|w| w[0] < w[1]),
                "each caller should observe strictly increasing values"
            );
            all.extend(values);
        }

        assert_eq!(all.len(), THREADS * PER_THREAD, "no value handed out twice");
        assert_eq!(all.iter().max().copied(), Some((THREADS * PER_THREAD) as u64));
    }
}
