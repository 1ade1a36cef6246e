//! Per-topic write statistics.

use serde::Serialize;

use crate::time::Timestamp;

/// Bookkeeping a store keeps for every topic it has seen, notified or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TopicStats {
    /// When the topic was last written.
    pub write_date: Timestamp,
    /// How many writes the topic has received.
    pub writes: u64,
}

impl TopicStats {
    /// Stats for a topic written for the first time at `at`.
    #[must_use]
    pub fn first(at: Timestamp) -> Self {
        Self {
            write_date: at,
            writes: 1,
        }
    }

    /// Record another write at `at`.
    pub fn record(&mut self, at: Timestamp) {
        self.write_date = at;
        self.writes += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::now;

    #[test]
    fn should_count_writes() {
        let t0 = now();
        let mut stats = TopicStats::first(t0);
        let t1 = t0 + chrono::Duration::seconds(5);
        stats.record(t1);
        assert_eq!(stats.writes, 2);
        assert_eq!(stats.write_date, t1);
    }
}
