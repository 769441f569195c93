//! Timestamp-based item ids

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

/// Mints string-encoded millisecond timestamps that strictly increase
///
/// Two items created within the same millisecond still get distinct ids, and a new id is
/// always above every numeric id already present in the collection.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: AtomicI64,
}

impl IdGenerator {
    /// Creates a generator with no history
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last: AtomicI64::new(0),
        }
    }

    /// Next id, above `existing` ids and every id this generator returned before
    ///
    /// Saturates at `i64::MAX`.
    pub fn next_id<'a>(&self, existing: impl IntoIterator<Item = &'a str>) -> String {
        let floor = existing
            .into_iter()
            .filter_map(|id| id.parse::<i64>().ok())
            .max()
            .unwrap_or(0);
        let now = Utc::now().timestamp_millis();

        let mut last = self.last.load(Ordering::SeqCst);
        loop {
            let candidate = now.max(last.saturating_add(1)).max(floor.saturating_add(1));
            match self
                .last
                .compare_exchange(last, candidate, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return candidate.to_string(),
                Err(actual) => last = actual,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_strictly_increase() {
        let ids = IdGenerator::new();
        let mut previous = 0_i64;
        for _ in 0..1_000 {
            let id: i64 = ids.next_id(std::iter::empty()).parse().expect("numeric id");
            assert!(id > previous);
            previous = id;
        }
    }

    #[test]
    fn test_ids_exceed_existing_ones() {
        let ids = IdGenerator::new();
        let far_future = (Utc::now().timestamp_millis() + 1_000_000).to_string();

        let id: i64 = ids
            .next_id(["1", far_future.as_str(), "not-a-number"])
            .parse()
            .expect("numeric id");

        assert_eq!(id, far_future.parse::<i64>().expect("numeric") + 1);
    }

    #[test]
    fn test_largest_existing_id_does_not_overflow() {
        let ids = IdGenerator::new();
        let max = i64::MAX.to_string();

        assert_eq!(ids.next_id([max.as_str()]), max);
        assert_eq!(ids.next_id(std::iter::empty()), max);
    }
}
