//! Batch match counters and the summary line.

use serde::Serialize;
use std::fmt;

/// Attempted/matched counters for one batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatchStatistics {
    pub attempted: usize,
    pub matched: usize,
}

/// Match percentage, or no data for an empty batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchRate {
    NoItemsProcessed,
    Percent(f64),
}

impl fmt::Display for MatchRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchRate::NoItemsProcessed => write!(f, "no data"),
            // whole percentages keep one decimal: "50.0"
            MatchRate::Percent(p) if p.fract() == 0.0 => write!(f, "{:.1}", p),
            MatchRate::Percent(p) => write!(f, "{}", p),
        }
    }
}

impl MatchStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one item, matched or not.
    pub fn record(&mut self, matched: bool) {
        self.attempted += 1;
        if matched {
            self.matched += 1;
        }
    }

    pub fn rate(&self) -> MatchRate {
        if self.attempted == 0 {
            MatchRate::NoItemsProcessed
        } else {
            MatchRate::Percent(100.0 * self.matched as f64 / self.attempted as f64)
        }
    }

    /// e.g. "Publications matched: 3/4. Percentage matched: 75.0"
    pub fn summary(&self, label: &str) -> String {
        format!(
            "{} matched: {}/{}. Percentage matched: {}",
            label,
            self.matched,
            self.attempted,
            self.rate()
        )
    }

    /// Log stats to stderr in JSON format
    pub fn log_phase(&self, phase: &str) {
        if let Ok(json) = serde_json::to_string_pretty(self) {
            eprintln!("[STATS:{}]\n{}", phase, json);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_batch_has_no_rate() {
        let stats = MatchStatistics::new();
        assert_eq!(stats.rate(), MatchRate::NoItemsProcessed);
        assert_eq!(
            stats.summary("Publications"),
            "Publications matched: 0/0. Percentage matched: no data"
        );
    }

    #[test]
    fn test_record_and_rate() {
        let mut stats = MatchStatistics::new();
        stats.record(true);
        stats.record(false);
        stats.record(true);
        stats.record(true);
        assert_eq!(stats.attempted, 4);
        assert_eq!(stats.matched, 3);
        assert_eq!(stats.rate(), MatchRate::Percent(75.0));
        assert_eq!(
            stats.summary("Manuscripts"),
            "Manuscripts matched: 3/4. Percentage matched: 75.0"
        );
    }

    #[test]
    fn test_rate_display() {
        assert_eq!(MatchRate::Percent(50.0).to_string(), "50.0");
        assert_eq!(MatchRate::Percent(100.0).to_string(), "100.0");
        assert_eq!(MatchRate::Percent(0.0).to_string(), "0.0");
        assert_eq!(MatchRate::Percent(200.0 / 3.0).to_string(), "66.66666666666667");
        assert_eq!(MatchRate::NoItemsProcessed.to_string(), "no data");
    }

    #[test]
    fn test_matched_never_exceeds_attempted() {
        let mut stats = MatchStatistics::new();
        for i in 0..10 {
            stats.record(i % 3 == 0);
            assert!(stats.matched <= stats.attempted);
        }
    }
}
