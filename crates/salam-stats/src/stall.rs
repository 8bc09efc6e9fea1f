//! Stall cause accounting.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Why a simulated cycle made no forward progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StallCause {
    MemoryLatency,
    RawHazard,
    WawHazard,
    WarHazard,
    FuContention,
    PortContention,
    DmaPending,
    ResourceLimit,
}

impl StallCause {
    pub const COUNT: usize = 8;

    /// All causes in reporting order.
    pub const ALL: [StallCause; StallCause::COUNT] = [
        StallCause::MemoryLatency,
        StallCause::RawHazard,
        StallCause::WawHazard,
        StallCause::WarHazard,
        StallCause::FuContention,
        StallCause::PortContention,
        StallCause::DmaPending,
        StallCause::ResourceLimit,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            StallCause::MemoryLatency => "memory_latency",
            StallCause::RawHazard => "raw_hazard",
            StallCause::WawHazard => "waw_hazard",
            StallCause::WarHazard => "war_hazard",
            StallCause::FuContention => "fu_contention",
            StallCause::PortContention => "port_contention",
            StallCause::DmaPending => "dma_pending",
            StallCause::ResourceLimit => "resource_limit",
        }
    }
}

impl fmt::Display for StallCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-cause stall counters plus streak tracking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StallBreakdown {
    by_cause: [u64; StallCause::COUNT],
    pub total_stall_cycles: u64,
    pub max_consecutive_stalls: u64,
    /// Number of times the accelerator entered a stall streak.
    pub stall_events: u64,
    #[serde(skip)]
    current_streak: u64,
}

impl StallBreakdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one stalled cycle attributed to `cause`.
    pub fn record(&mut self, cause: StallCause) {
        self.by_cause[cause.index()] += 1;
        self.total_stall_cycles += 1;
        if self.current_streak == 0 {
            self.stall_events += 1;
        }
        self.current_streak += 1;
        self.max_consecutive_stalls = self.max_consecutive_stalls.max(self.current_streak);
    }

    /// Ends the current stall streak, if any.
    pub fn record_no_stall(&mut self) {
        self.current_streak = 0;
    }

    pub fn count(&self, cause: StallCause) -> u64 {
        self.by_cause[cause.index()]
    }

    pub fn counts(&self) -> impl Iterator<Item = (StallCause, u64)> + '_ {
        StallCause::ALL.iter().map(|&cause| (cause, self.count(cause)))
    }

    pub fn current_streak(&self) -> u64 {
        self.current_streak
    }

    pub fn avg_stall_duration(&self) -> f64 {
        if self.stall_events == 0 {
            0.0
        } else {
            self.total_stall_cycles as f64 / self.stall_events as f64
        }
    }

    /// Cause with the most stalled cycles, the earlier cause on a tie.
    /// `None` when nothing stalled.
    pub fn dominant_cause(&self) -> Option<StallCause> {
        let mut best: Option<(StallCause, u64)> = None;
        for (cause, count) in self.counts() {
            if count > best.map_or(0, |(_, c)| c) {
                best = Some((cause, count));
            }
        }
        best.map(|(cause, _)| cause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_follow_reporting_order() {
        let names: Vec<&str> = StallCause::ALL.iter().map(|c| c.name()).collect();
        assert_eq!(
            names,
            [
                "memory_latency",
                "raw_hazard",
                "waw_hazard",
                "war_hazard",
                "fu_contention",
                "port_contention",
                "dma_pending",
                "resource_limit"
            ]
        );
        for (i, cause) in StallCause::ALL.iter().enumerate() {
            assert_eq!(cause.index(), i);
        }
    }

    #[test]
    fn record_increments_one_counter() {
        let mut stalls = StallBreakdown::new();
        stalls.record(StallCause::DmaPending);
        stalls.record(StallCause::DmaPending);
        assert_eq!(stalls.count(StallCause::DmaPending), 2);
        assert_eq!(stalls.count(StallCause::RawHazard), 0);
        assert_eq!(stalls.total_stall_cycles, 2);
    }

    #[test]
    fn streaks_and_events() {
        let mut stalls = StallBreakdown::new();
        stalls.record(StallCause::MemoryLatency);
        stalls.record(StallCause::RawHazard);
        stalls.record(StallCause::RawHazard);
        stalls.record_no_stall();
        stalls.record(StallCause::FuContention);
        assert_eq!(stalls.max_consecutive_stalls, 3);
        assert_eq!(stalls.stall_events, 2);
        assert_eq!(stalls.current_streak(), 1);
        assert_eq!(stalls.avg_stall_duration(), 2.0);
    }

    #[test]
    fn dominant_cause_breaks_ties_toward_earlier() {
        let mut stalls = StallBreakdown::new();
        assert_eq!(stalls.dominant_cause(), None);
        stalls.record(StallCause::ResourceLimit);
        stalls.record(StallCause::RawHazard);
        assert_eq!(stalls.dominant_cause(), Some(StallCause::RawHazard));
        stalls.record(StallCause::ResourceLimit);
        assert_eq!(stalls.dominant_cause(), Some(StallCause::ResourceLimit));
    }

    #[test]
    fn cause_deserializes_from_snake_case() {
        let cause: StallCause = serde_json::from_str("\"port_contention\"").unwrap();
        assert_eq!(cause, StallCause::PortContention);
    }
}
