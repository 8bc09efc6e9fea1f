//! The accelerator-side handle to its statistics engine.
//!
//! An accelerator may run without an engine (not constructed yet, or already
//! torn down). All access goes through [`Accelerator::with_stats`], the one
//! place that checks, so a hook fired without an engine mutates nothing.
//! Finalize falls back to a reduced legacy report in that case.

use std::io::Write;

use serde::Serialize;

use crate::config::StatsContext;
use crate::edge::DepKinds;
use crate::engine::HwStatistics;
use crate::fu::FuType;
use crate::id::{Opcode, Uid};
use crate::metrics::{MemAccess, PowerInputs, Summary};
use crate::stall::StallCause;

/// Counters the accelerator keeps on its own, available even without an
/// engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LegacyReport {
    pub accelerator_name: String,
    pub setup_time_ns: f64,
    pub sim_time_ns: f64,
    pub clock_period_ns: u64,
    pub total_cycles: u64,
    pub stall_cycles: u64,
    pub committed_instructions: u64,
}

impl LegacyReport {
    pub fn print<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "=== {} (reduced statistics) ===", self.accelerator_name)?;
        writeln!(out, "Setup time:             {} ns", self.setup_time_ns)?;
        writeln!(out, "Simulation time:        {} ns", self.sim_time_ns)?;
        writeln!(out, "Clock period:           {} ns", self.clock_period_ns)?;
        writeln!(out, "Total cycles:           {}", self.total_cycles)?;
        writeln!(out, "Stall cycles:           {}", self.stall_cycles)?;
        writeln!(out, "Committed instructions: {}", self.committed_instructions)?;
        Ok(())
    }
}

/// What finalize produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Finalized {
    /// Full summary from the statistics engine.
    Structured(Summary),
    /// Reduced report; the engine was missing.
    Legacy(LegacyReport),
}

impl Finalized {
    pub fn summary(&self) -> Option<&Summary> {
        match self {
            Finalized::Structured(summary) => Some(summary),
            Finalized::Legacy(_) => None,
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, Finalized::Legacy(_))
    }
}

#[derive(Debug)]
pub struct Accelerator {
    name: String,
    stats: Option<HwStatistics>,
    total_cycles: u64,
    ended_cycles: u64,
    stall_cycles: u64,
    committed: u64,
}

impl Accelerator {
    pub fn new(name: impl Into<String>, ctx: StatsContext) -> Self {
        let name = name.into();
        let mut stats = HwStatistics::new(ctx);
        stats.set_accelerator_name(name.clone());
        Accelerator {
            name,
            stats: Some(stats),
            total_cycles: 0,
            ended_cycles: 0,
            stall_cycles: 0,
            committed: 0,
        }
    }

    /// An accelerator whose engine was never constructed.
    pub fn without_stats(name: impl Into<String>) -> Self {
        Accelerator {
            name: name.into(),
            stats: None,
            total_cycles: 0,
            ended_cycles: 0,
            stall_cycles: 0,
            committed: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_stats(&self) -> bool {
        self.stats.is_some()
    }

    pub fn stats(&self) -> Option<&HwStatistics> {
        self.stats.as_ref()
    }

    /// Tears the engine down early, returning it.
    pub fn detach_stats(&mut self) -> Option<HwStatistics> {
        self.stats.take()
    }

    /// Runs `f` against the engine if there is one.
    pub fn with_stats<R>(&mut self, f: impl FnOnce(&mut HwStatistics) -> R) -> Option<R> {
        self.stats.as_mut().map(f)
    }

    pub fn total_cycles(&self) -> u64 {
        self.total_cycles
    }

    pub fn stall_cycles(&self) -> u64 {
        self.stall_cycles
    }

    pub fn committed(&self) -> u64 {
        self.committed
    }

    // -----------------------------------------------------------------------
    // Queue processor hooks
    // -----------------------------------------------------------------------

    pub fn on_dependency(&mut self, producer: Uid, consumer: Uid, kinds: DepKinds) {
        self.with_stats(|s| s.record_dependency(producer, consumer, kinds));
    }

    pub fn on_commit(&mut self, uid: Uid, opcode: Opcode, is_load: bool, is_store: bool) {
        self.committed += 1;
        self.with_stats(|s| s.record_critical_path_node(uid, opcode, is_load, is_store));
    }

    pub fn on_stall(&mut self, cause: StallCause) {
        self.stall_cycles += 1;
        self.with_stats(|s| s.record_stall_cause(cause));
    }

    pub fn on_no_stall(&mut self) {
        self.with_stats(HwStatistics::record_no_stall);
    }

    pub fn on_parallelism(&mut self, ready: u64, issued: u64) {
        self.with_stats(|s| s.record_parallelism(ready, issued));
    }

    pub fn on_cycle_start(&mut self) {
        self.with_stats(HwStatistics::cycle_start);
    }

    /// Ends `cycle`. The cycle count is the highest cycle number seen, or
    /// the number of ended cycles when that is larger, so both 0-based and
    /// 1-based numbering count every cycle.
    pub fn on_cycle_end(&mut self, cycle: u64) {
        self.ended_cycles += 1;
        self.total_cycles = self.total_cycles.max(cycle).max(self.ended_cycles);
        self.with_stats(|s| s.cycle_end(cycle));
    }

    pub fn on_memory_read(&mut self, access: MemAccess) {
        self.with_stats(|s| s.record_memory_read(access));
    }

    pub fn on_memory_write(&mut self, access: MemAccess) {
        self.with_stats(|s| s.record_memory_write(access));
    }

    pub fn on_bus_widths(&mut self, read: u64, write: u64) {
        self.with_stats(|s| s.collect_bus_widths(read, write));
    }

    pub fn on_fu_busy(&mut self, fu: FuType, start: u64, end: u64) {
        self.with_stats(|s| s.record_fu_busy(fu, start, end));
    }

    pub fn on_fu_contention(&mut self, fu: FuType) {
        self.with_stats(|s| s.record_fu_contention(fu));
    }

    pub fn on_fu_instances(&mut self, fu: FuType, count: u32) {
        self.with_stats(|s| s.set_fu_instances(fu, count));
    }

    pub fn on_port_contention(&mut self, is_read: bool) {
        self.with_stats(|s| s.record_port_contention(is_read));
    }

    pub fn on_power(&mut self, inputs: PowerInputs) {
        self.with_stats(|s| s.collect_power(inputs));
    }

    pub fn on_area(&mut self, fu: f64, reg: f64, spm: f64, cache: f64) {
        self.with_stats(|s| s.collect_area(fu, reg, spm, cache));
    }

    // -----------------------------------------------------------------------
    // Finalize
    // -----------------------------------------------------------------------

    /// Closes the run and renders its outputs to `out` and the configured
    /// files.
    ///
    /// The engine is taken out of the accelerator; later hooks become
    /// no-ops. Output failures are logged and never returned.
    pub fn finalize<W: Write>(
        &mut self,
        setup_time_ns: f64,
        sim_time_ns: f64,
        clock_period_ns: u64,
        out: &mut W,
    ) -> Finalized {
        let Some(mut stats) = self.stats.take() else {
            tracing::warn!(
                accelerator = %self.name,
                "HWStatistics not available, falling back to legacy output"
            );
            let report = LegacyReport {
                accelerator_name: self.name.clone(),
                setup_time_ns,
                sim_time_ns,
                clock_period_ns,
                total_cycles: self.total_cycles,
                stall_cycles: self.stall_cycles,
                committed_instructions: self.committed,
            };
            if let Err(err) = report.print(out) {
                tracing::warn!(error = %err, "failed to print legacy report");
            }
            return Finalized::Legacy(report);
        };

        let span = stats.context().span().clone();
        let _guard = span.enter();

        stats.set_accelerator_name(self.name.clone());
        stats.collect_performance(
            setup_time_ns,
            sim_time_ns,
            clock_period_ns,
            self.total_cycles,
            self.stall_cycles,
        );
        stats.compute_critical_path();
        stats.summarize_cycles();

        let flags = stats.context().config.debug_flags;
        if flags.detailed_results {
            if let Err(err) = stats.print_detailed(out) {
                tracing::warn!(error = %err, "failed to print detailed results");
            }
        }
        if flags.csv_results {
            if let Err(err) = stats.print_csv(out) {
                tracing::warn!(error = %err, "failed to print CSV results");
            }
            stats.write_csv_file();
        }
        stats.write_json_file();

        Finalized::Structured(stats.into_summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DebugFlags, StatsConfig};

    fn tracked(name: &str) -> Accelerator {
        Accelerator::new(name, StatsContext::default())
    }

    #[test]
    fn hooks_reach_engine() {
        let mut acc = tracked("gemm");
        acc.on_dependency(Uid(1), Uid(2), DepKinds::RAW);
        acc.on_commit(Uid(2), Opcode(8), false, false);
        let depth = acc.with_stats(|s| s.get_instruction_depth(Uid(2)));
        assert_eq!(depth, Some(2));
        assert_eq!(acc.committed(), 1);
    }

    #[test]
    fn missing_engine_skips_without_mutation() {
        let mut acc = Accelerator::without_stats("dma_only");
        acc.on_dependency(Uid(1), Uid(2), DepKinds::RAW);
        acc.on_stall(StallCause::DmaPending);
        assert!(acc.with_stats(|s| s.current_max_depth()).is_none());
        assert!(!acc.has_stats());
        assert_eq!(acc.stall_cycles(), 1);
    }

    #[test]
    fn cycle_count_handles_both_numberings() {
        let mut zero_based = tracked("a");
        for cycle in 0..3 {
            zero_based.on_cycle_end(cycle);
        }
        assert_eq!(zero_based.total_cycles(), 3);

        let mut one_based = tracked("b");
        for cycle in 1..=3 {
            one_based.on_cycle_end(cycle);
        }
        assert_eq!(one_based.total_cycles(), 3);

        let mut sparse = Accelerator::without_stats("c");
        sparse.on_cycle_end(12);
        assert_eq!(sparse.total_cycles(), 12);
    }

    #[test]
    fn finalize_without_engine_is_legacy() {
        let mut acc = tracked("gemm");
        acc.on_cycle_end(40);
        acc.on_commit(Uid(1), Opcode(8), false, false);
        acc.detach_stats();

        let mut out = Vec::new();
        let result = acc.finalize(1.0, 2.0, 10, &mut out);
        assert!(result.is_legacy());
        let Finalized::Legacy(report) = result else {
            unreachable!()
        };
        assert_eq!(report.total_cycles, 40);
        assert_eq!(report.committed_instructions, 1);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("reduced statistics"));
    }

    #[test]
    fn finalize_structured_fills_performance_and_path() {
        let mut acc = tracked("vadd");
        acc.on_dependency(Uid(1), Uid(2), DepKinds::RAW);
        acc.on_commit(Uid(1), Opcode(30), true, false);
        acc.on_commit(Uid(2), Opcode(8), false, false);
        acc.on_stall(StallCause::MemoryLatency);
        acc.on_cycle_end(10);

        let mut out = Vec::new();
        let result = acc.finalize(0.0, 100.0, 10, &mut out);
        let summary = result.summary().unwrap();
        assert_eq!(summary.accelerator_name, "vadd");
        assert_eq!(summary.performance.total_cycles, 10);
        assert_eq!(summary.performance.stall_cycles, 1);
        assert_eq!(summary.dataflow.critical_path_length, 2);
        assert!(out.is_empty());
        assert!(!acc.has_stats());
    }

    #[test]
    fn finalize_prints_per_debug_flags() {
        let config = StatsConfig {
            debug_flags: DebugFlags {
                detailed_results: true,
                csv_results: true,
            },
            ..StatsConfig::default()
        };
        let mut acc = Accelerator::new("fir", StatsContext::new(config));
        let mut out = Vec::new();
        acc.finalize(0.0, 0.0, 1, &mut out);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\"accelerator_name\": \"fir\""));
        assert!(text.contains("metric,value\n"));
    }
}
