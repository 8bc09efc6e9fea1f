//! Functional unit utilization.
//!
//! Busy intervals are half-open `[start, end)` cycle ranges. Concurrency is
//! kept as a start/end delta map per type, so the peak number of units busy
//! at once is a single sweep at report time.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Functional unit classes of the accelerator datapath.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FuType {
    #[serde(rename = "counter")]
    Counter,
    #[serde(rename = "int_addsub")]
    IntAddSub,
    #[serde(rename = "int_muldiv")]
    IntMulDiv,
    #[serde(rename = "int_shift")]
    IntShift,
    #[serde(rename = "int_bitwise")]
    IntBitwise,
    #[serde(rename = "fp_float_addsub")]
    FpFloatAddSub,
    #[serde(rename = "fp_float_muldiv")]
    FpFloatMulDiv,
    #[serde(rename = "fp_double_addsub")]
    FpDoubleAddSub,
    #[serde(rename = "fp_double_muldiv")]
    FpDoubleMulDiv,
    #[serde(rename = "zero_cycle")]
    ZeroCycle,
    #[serde(rename = "gep")]
    Gep,
    #[serde(rename = "conversion")]
    Conversion,
    #[serde(rename = "other")]
    Other,
}

impl FuType {
    pub const COUNT: usize = 13;

    pub const ALL: [FuType; FuType::COUNT] = [
        FuType::Counter,
        FuType::IntAddSub,
        FuType::IntMulDiv,
        FuType::IntShift,
        FuType::IntBitwise,
        FuType::FpFloatAddSub,
        FuType::FpFloatMulDiv,
        FuType::FpDoubleAddSub,
        FuType::FpDoubleMulDiv,
        FuType::ZeroCycle,
        FuType::Gep,
        FuType::Conversion,
        FuType::Other,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            FuType::Counter => "counter",
            FuType::IntAddSub => "int_addsub",
            FuType::IntMulDiv => "int_muldiv",
            FuType::IntShift => "int_shift",
            FuType::IntBitwise => "int_bitwise",
            FuType::FpFloatAddSub => "fp_float_addsub",
            FuType::FpFloatMulDiv => "fp_float_muldiv",
            FuType::FpDoubleAddSub => "fp_double_addsub",
            FuType::FpDoubleMulDiv => "fp_double_muldiv",
            FuType::ZeroCycle => "zero_cycle",
            FuType::Gep => "gep",
            FuType::Conversion => "conversion",
            FuType::Other => "other",
        }
    }
}

impl fmt::Display for FuType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Counters for one functional unit class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FuTypeUtilization {
    pub instances: u32,
    pub busy_cycles: u64,
    pub operations: u64,
    /// Requests that found every unit of this class busy.
    pub contention_stalls: u64,
    /// Cycle -> change in busy units at that cycle.
    #[serde(skip)]
    occupancy: BTreeMap<u64, i64>,
}

impl FuTypeUtilization {
    fn record_busy(&mut self, start: u64, end: u64) {
        self.operations += 1;
        if end > start {
            self.busy_cycles = self.busy_cycles.saturating_add(end - start);
            *self.occupancy.entry(start).or_insert(0) += 1;
            *self.occupancy.entry(end).or_insert(0) -= 1;
        }
    }

    /// Most units of this class busy in the same cycle.
    pub fn max_concurrent(&self) -> u64 {
        let mut busy = 0i64;
        let mut peak = 0i64;
        for delta in self.occupancy.values() {
            busy += delta;
            peak = peak.max(busy);
        }
        peak as u64
    }

    /// Busy cycles over available unit-cycles.
    pub fn utilization(&self, total_cycles: u64) -> f64 {
        let capacity = total_cycles.saturating_mul(u64::from(self.instances));
        if capacity == 0 {
            0.0
        } else {
            self.busy_cycles as f64 / capacity as f64
        }
    }

    /// Share of requests that hit contention.
    pub fn contention_rate(&self) -> f64 {
        let requests = self.operations.saturating_add(self.contention_stalls);
        if requests == 0 {
            0.0
        } else {
            self.contention_stalls as f64 / requests as f64
        }
    }

    /// Whether this class saw any configuration or traffic.
    pub fn is_active(&self) -> bool {
        self.instances > 0 || self.operations > 0 || self.contention_stalls > 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FuUtilization {
    by_type: [FuTypeUtilization; FuType::COUNT],
    pub total_busy_cycles: u64,
    pub total_contention_stalls: u64,
}

impl FuUtilization {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one operation that held a `fu` unit over `[start, end)`.
    pub fn record_busy(&mut self, fu: FuType, start: u64, end: u64) {
        self.by_type[fu.index()].record_busy(start, end);
        self.total_busy_cycles = self
            .total_busy_cycles
            .saturating_add(end.saturating_sub(start));
    }

    pub fn record_contention(&mut self, fu: FuType) {
        self.by_type[fu.index()].contention_stalls += 1;
        self.total_contention_stalls += 1;
    }

    pub fn set_instances(&mut self, fu: FuType, count: u32) {
        self.by_type[fu.index()].instances = count;
    }

    pub fn get(&self, fu: FuType) -> &FuTypeUtilization {
        &self.by_type[fu.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (FuType, &FuTypeUtilization)> + '_ {
        FuType::ALL.iter().map(|&fu| (fu, self.get(fu)))
    }

    pub fn total_instances(&self) -> u64 {
        self.by_type.iter().map(|t| u64::from(t.instances)).sum()
    }

    /// Busy cycles over the capacity of every configured unit.
    pub fn overall_utilization(&self, total_cycles: u64) -> f64 {
        let capacity = total_cycles.saturating_mul(self.total_instances());
        if capacity == 0 {
            0.0
        } else {
            self.total_busy_cycles as f64 / capacity as f64
        }
    }

    /// Class with the most contention stalls, the earlier class on a tie.
    pub fn most_contended(&self) -> Option<FuType> {
        let mut best: Option<(FuType, u64)> = None;
        for (fu, stats) in self.iter() {
            if stats.contention_stalls > best.map_or(0, |(_, c)| c) {
                best = Some((fu, stats.contention_stalls));
            }
        }
        best.map(|(fu, _)| fu)
    }
}
