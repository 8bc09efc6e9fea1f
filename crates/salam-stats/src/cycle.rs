//! Optional per-cycle queue occupancy tracking.
//!
//! The queue processor fills one [`CycleSample`] per simulated cycle between
//! `start` and `end`. Samples are kept in a bounded window; when it is full
//! the oldest sample is evicted. The window summary becomes the
//! `cycle_summary` section of the report.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Queue occupancy snapshot for one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleSample {
    pub cycle: u64,
    pub res_in_flight: u32,
    pub load_in_flight: u32,
    pub load_internal: u32,
    pub load_active: u32,
    pub load_raw_stall: u32,
    pub store_in_flight: u32,
    pub store_active: u32,
    pub comp_in_flight: u32,
    pub comp_launched: u32,
    pub comp_active: u32,
    pub comp_fu_stall: u32,
    pub comp_committed: u32,
}

/// Aggregate over the retained samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CycleSummary {
    pub samples: u64,
    pub evicted: u64,
    pub avg_res_in_flight: f64,
    pub avg_load_in_flight: f64,
    pub avg_store_in_flight: f64,
    pub avg_comp_in_flight: f64,
    pub peak_res_in_flight: u32,
    pub peak_load_in_flight: u32,
    pub peak_store_in_flight: u32,
    pub peak_comp_in_flight: u32,
    pub total_load_raw_stalls: u64,
    pub total_comp_fu_stalls: u64,
}

#[derive(Debug, Clone)]
pub struct CycleTracker {
    current: CycleSample,
    window: VecDeque<CycleSample>,
    capacity: usize,
    evicted: u64,
}

impl CycleTracker {
    /// Creates a tracker keeping two buffers of `buffer_size` samples.
    pub fn new(buffer_size: usize) -> Self {
        let capacity = buffer_size.max(1) * 2;
        CycleTracker {
            current: CycleSample::default(),
            window: VecDeque::with_capacity(capacity),
            capacity,
            evicted: 0,
        }
    }

    pub fn start(&mut self) {
        self.current = CycleSample::default();
    }

    pub fn current_mut(&mut self) -> &mut CycleSample {
        &mut self.current
    }

    pub fn current(&self) -> &CycleSample {
        &self.current
    }

    /// Stamps the current sample with `cycle` and stores it.
    pub fn end(&mut self, cycle: u64) {
        self.current.cycle = cycle;
        if self.window.len() == self.capacity {
            self.window.pop_front();
            self.evicted += 1;
        }
        self.window.push_back(self.current);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn samples(&self) -> impl Iterator<Item = &CycleSample> {
        self.window.iter()
    }

    pub fn summarize(&self) -> CycleSummary {
        let mut summary = CycleSummary {
            samples: self.window.len() as u64,
            evicted: self.evicted,
            ..CycleSummary::default()
        };
        if self.window.is_empty() {
            return summary;
        }

        let (mut res, mut load, mut store, mut comp) = (0u64, 0u64, 0u64, 0u64);
        for s in &self.window {
            res += u64::from(s.res_in_flight);
            load += u64::from(s.load_in_flight);
            store += u64::from(s.store_in_flight);
            comp += u64::from(s.comp_in_flight);
            summary.peak_res_in_flight = summary.peak_res_in_flight.max(s.res_in_flight);
            summary.peak_load_in_flight = summary.peak_load_in_flight.max(s.load_in_flight);
            summary.peak_store_in_flight = summary.peak_store_in_flight.max(s.store_in_flight);
            summary.peak_comp_in_flight = summary.peak_comp_in_flight.max(s.comp_in_flight);
            summary.total_load_raw_stalls += u64::from(s.load_raw_stall);
            summary.total_comp_fu_stalls += u64::from(s.comp_fu_stall);
        }

        let n = summary.samples as f64;
        summary.avg_res_in_flight = res as f64 / n;
        summary.avg_load_in_flight = load as f64 / n;
        summary.avg_store_in_flight = store as f64 / n;
        summary.avg_comp_in_flight = comp as f64 / n;
        summary
    }
}
