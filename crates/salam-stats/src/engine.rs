//! The per-accelerator statistics engine.
//!
//! [`HwStatistics`] is the entry point the queue processor talks to. It owns
//! the depth tracker, the producer index, stall accounting, optional cycle
//! tracking and the summary under construction. Every accounting method is
//! infallible and non-blocking; only the output helpers touch the filesystem.
//!
//! Within one cycle, an instruction's dependencies must be recorded before
//! its commit, since the commit reads its depth.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::config::StatsContext;
use crate::critical_path::CriticalPath;
use crate::cycle::{CycleSample, CycleTracker};
use crate::depth::DepthTracker;
use crate::edge::{DepKinds, DependencyEdge};
use crate::fu::FuType;
use crate::id::{Opcode, Uid};
use crate::metrics::{
    AreaMetrics, MemAccess, PerformanceMetrics, PowerInputs, PowerMetrics, Summary,
};
use crate::ops::OpClass;
use crate::recorder::DependencyRecorder;
use crate::report;
use crate::stall::StallCause;

#[derive(Debug)]
pub struct HwStatistics {
    ctx: StatsContext,
    depths: DepthTracker,
    recorder: DependencyRecorder,
    cycles: Option<CycleTracker>,
    critical_path: Option<CriticalPath>,
    summary: Summary,
}

impl HwStatistics {
    pub fn new(ctx: StatsContext) -> Self {
        let cycles = ctx
            .config
            .cycle_tracking
            .then(|| CycleTracker::new(ctx.config.stat_buffer_size));
        HwStatistics {
            ctx,
            depths: DepthTracker::new(),
            recorder: DependencyRecorder::new(),
            cycles,
            critical_path: None,
            summary: Summary::default(),
        }
    }

    pub fn context(&self) -> &StatsContext {
        &self.ctx
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    /// Consumes the engine, dropping the dependency graph and keeping the
    /// summary.
    pub fn into_summary(self) -> Summary {
        self.summary
    }

    // -----------------------------------------------------------------------
    // Dataflow
    // -----------------------------------------------------------------------

    /// Records that `consumer` depends on `producer`.
    ///
    /// Every set kind flag bumps its counter, even for an edge recorded
    /// before. The consumer's depth only grows.
    pub fn record_dependency(&mut self, producer: Uid, consumer: Uid, kinds: DepKinds) {
        let edge = DependencyEdge::new(producer, consumer, kinds);
        self.summary.dataflow.count_edge(kinds);
        if let Some(max) = self.recorder.record(&mut self.depths, &edge) {
            self.summary.dataflow.max_dependency_depth = max;
        }
    }

    /// Commit entry point: tracks `uid` as a leaf if it was never seen and
    /// tags its record with the opcode and class.
    pub fn record_critical_path_node(
        &mut self,
        uid: Uid,
        opcode: Opcode,
        is_load: bool,
        is_store: bool,
    ) {
        let class = OpClass::from_flags(is_load, is_store);
        let depth = self.depths.mark_committed(uid, opcode, class);
        self.summary.dataflow.max_dependency_depth = self.depths.max_depth();
        self.summary.dataflow.count_commit(depth);
    }

    /// Depth of `uid`, 0 if untracked.
    pub fn get_instruction_depth(&self, uid: Uid) -> u32 {
        self.depths.depth(uid)
    }

    pub fn current_max_depth(&self) -> u32 {
        self.depths.max_depth()
    }

    pub fn tracked_instructions(&self) -> usize {
        self.depths.len()
    }

    pub fn producers_of(&self, uid: Uid) -> &[Uid] {
        self.recorder.producers_of(uid)
    }

    pub fn record_parallelism(&mut self, ready: u64, issued: u64) {
        self.summary.dataflow.record_parallelism(ready, issued);
    }

    /// One-shot critical path pass. Calling it again recomputes from the
    /// current state and overwrites the derived fields.
    pub fn compute_critical_path(&mut self) -> &CriticalPath {
        let _guard = self.ctx.span().enter();
        if !self.recorder.is_acyclic() {
            tracing::debug!("producer graph contains a cycle; affected chains end early");
        }
        let path = CriticalPath::compute(&self.depths, &self.recorder);
        tracing::debug!(
            length = path.length,
            instructions = path.instruction_count(),
            tracked = self.depths.len(),
            "critical path computed"
        );
        self.summary.dataflow.apply_critical_path(&path);
        self.critical_path.insert(path)
    }

    /// Result of the last critical path pass, if one ran.
    pub fn critical_path(&self) -> Option<&CriticalPath> {
        self.critical_path.as_ref()
    }

    // -----------------------------------------------------------------------
    // Stalls
    // -----------------------------------------------------------------------

    pub fn record_stall_cause(&mut self, cause: StallCause) {
        self.summary.stalls.record(cause);
    }

    pub fn record_no_stall(&mut self) {
        self.summary.stalls.record_no_stall();
    }

    // -----------------------------------------------------------------------
    // Cycle tracking
    // -----------------------------------------------------------------------

    pub fn cycle_start(&mut self) {
        if let Some(cycles) = &mut self.cycles {
            cycles.start();
        }
    }

    /// Sample for the cycle in progress; `None` when tracking is off.
    pub fn current_cycle_mut(&mut self) -> Option<&mut CycleSample> {
        self.cycles.as_mut().map(CycleTracker::current_mut)
    }

    pub fn cycle_end(&mut self, cycle: u64) {
        self.summary.memory_access.end_cycle();
        if let Some(cycles) = &mut self.cycles {
            cycles.end(cycle);
        }
    }

    pub fn summarize_cycles(&mut self) {
        self.summary.cycle_summary = self.cycles.as_ref().map(CycleTracker::summarize);
    }

    // -----------------------------------------------------------------------
    // External collection
    // -----------------------------------------------------------------------

    pub fn set_accelerator_name(&mut self, name: impl Into<String>) {
        self.summary.accelerator_name = name.into();
        self.ctx.set_accelerator(&self.summary.accelerator_name);
    }

    pub fn collect_performance(
        &mut self,
        setup_time_ns: f64,
        sim_time_ns: f64,
        clock_period_ns: u64,
        total_cycles: u64,
        stall_cycles: u64,
    ) {
        self.summary.performance = PerformanceMetrics::collect(
            setup_time_ns,
            sim_time_ns,
            clock_period_ns,
            total_cycles,
            stall_cycles,
        );
    }

    pub fn record_memory_read(&mut self, access: MemAccess) {
        self.summary.memory_access.record_read(access);
    }

    pub fn record_memory_write(&mut self, access: MemAccess) {
        self.summary.memory_access.record_write(access);
    }

    /// Bus widths in bytes per cycle, for bandwidth utilization.
    pub fn collect_bus_widths(&mut self, read: u64, write: u64) {
        self.summary.memory_access.set_bus_widths(read, write);
    }

    pub fn record_port_contention(&mut self, is_read: bool) {
        self.summary.memory_access.record_port_contention(is_read);
    }

    // -----------------------------------------------------------------------
    // Functional units
    // -----------------------------------------------------------------------

    /// Records one operation holding a `fu` unit over cycles `[start, end)`.
    pub fn record_fu_busy(&mut self, fu: FuType, start: u64, end: u64) {
        self.summary.fu_utilization.record_busy(fu, start, end);
    }

    /// Records a request that found every `fu` unit busy. Stall cycles are
    /// reported separately through `record_stall_cause`.
    pub fn record_fu_contention(&mut self, fu: FuType) {
        self.summary.fu_utilization.record_contention(fu);
    }

    pub fn set_fu_instances(&mut self, fu: FuType, count: u32) {
        self.summary.fu_utilization.set_instances(fu, count);
    }

    pub fn collect_power(&mut self, inputs: PowerInputs) {
        self.summary.power = PowerMetrics::collect(inputs);
    }

    pub fn collect_area(&mut self, fu: f64, reg: f64, spm: f64, cache: f64) {
        self.summary.area = AreaMetrics::collect(fu, reg, spm, cache);
    }

    // -----------------------------------------------------------------------
    // Output
    // -----------------------------------------------------------------------

    pub fn to_json(&self) -> Result<String, crate::error::StatsError> {
        report::to_json(&self.summary, self.ctx.config.pretty_print)
    }

    pub fn print_summary<W: Write>(&self, out: &mut W) -> io::Result<()> {
        report::print_summary(&self.summary, out)
    }

    pub fn print_detailed<W: Write>(&self, out: &mut W) -> io::Result<()> {
        report::print_detailed(&self.summary, out)
    }

    pub fn print_csv<W: Write>(&self, out: &mut W) -> io::Result<()> {
        report::print_csv(&self.summary, out)
    }

    /// Writes the CSV next to the configured output path. `None` when no
    /// path is configured or the write failed (already logged).
    pub fn write_csv_file(&self) -> Option<PathBuf> {
        let output = self.configured_output()?;
        let _guard = self.ctx.span().enter();
        report::write_csv_file(&self.summary, output)
    }

    /// Writes the JSON summary to the configured output path.
    pub fn write_json_file(&self) -> Option<PathBuf> {
        let output = self.configured_output()?;
        let _guard = self.ctx.span().enter();
        report::write_json_file(&self.summary, output, self.ctx.config.pretty_print)
    }

    fn configured_output(&self) -> Option<&Path> {
        self.ctx.config.output_file.as_deref()
    }
}

impl Default for HwStatistics {
    fn default() -> Self {
        HwStatistics::new(StatsContext::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StatsConfig;

    fn raw(stats: &mut HwStatistics, p: u64, c: u64) {
        stats.record_dependency(Uid(p), Uid(c), DepKinds::RAW);
    }

    #[test]
    fn dependency_updates_summary_max() {
        let mut stats = HwStatistics::default();
        raw(&mut stats, 1, 2);
        raw(&mut stats, 2, 3);
        assert_eq!(stats.summary().dataflow.max_dependency_depth, 3);
        assert_eq!(stats.current_max_depth(), 3);
        assert_eq!(stats.summary().dataflow.true_dependencies, 2);
    }

    #[test]
    fn commit_of_unseen_uid_starts_at_leaf() {
        let mut stats = HwStatistics::default();
        raw(&mut stats, 1, 2);
        stats.record_critical_path_node(Uid(5), Opcode(8), false, false);
        assert_eq!(stats.get_instruction_depth(Uid(5)), 1);
        assert_eq!(stats.current_max_depth(), 2);
        assert_eq!(stats.summary().dataflow.total_instructions, 1);
    }

    #[test]
    fn first_commit_sets_max_depth() {
        let mut stats = HwStatistics::default();
        stats.record_critical_path_node(Uid(1), Opcode(8), false, false);
        assert_eq!(stats.summary().dataflow.max_dependency_depth, 1);
    }

    #[test]
    fn commit_averages_depth() {
        let mut stats = HwStatistics::default();
        raw(&mut stats, 1, 2);
        stats.record_critical_path_node(Uid(1), Opcode(30), true, false);
        stats.record_critical_path_node(Uid(2), Opcode(8), false, false);
        assert_eq!(stats.summary().dataflow.avg_dependency_depth, 1.5);
    }

    #[test]
    fn critical_path_fills_dataflow() {
        let mut stats = HwStatistics::default();
        raw(&mut stats, 1, 2);
        raw(&mut stats, 2, 3);
        stats.record_critical_path_node(Uid(1), Opcode(30), true, false);
        stats.record_critical_path_node(Uid(2), Opcode(8), false, false);
        stats.record_critical_path_node(Uid(3), Opcode(31), false, true);
        let length = stats.compute_critical_path().length;
        assert_eq!(length, 3);
        let df = &stats.summary().dataflow;
        assert_eq!(df.critical_path_length, 3);
        assert_eq!(df.critical_path_instructions, 3);
        assert_eq!(
            (df.critical_path_loads, df.critical_path_stores, df.critical_path_computes),
            (1, 1, 1)
        );
        assert_eq!(df.avg_ready_instructions, 1.0);
        assert_eq!(df.ilp(), 1.0);
    }

    #[test]
    fn recompute_after_more_edges_overwrites() {
        let mut stats = HwStatistics::default();
        raw(&mut stats, 1, 2);
        stats.compute_critical_path();
        raw(&mut stats, 2, 3);
        stats.compute_critical_path();
        assert_eq!(stats.summary().dataflow.critical_path_length, 3);
        assert_eq!(stats.critical_path().map(|p| p.members.len()), Some(3));
    }

    #[test]
    fn cycle_hooks_are_noops_when_disabled() {
        let mut stats = HwStatistics::default();
        stats.cycle_start();
        assert!(stats.current_cycle_mut().is_none());
        stats.cycle_end(1);
        stats.summarize_cycles();
        assert!(stats.summary().cycle_summary.is_none());
    }

    #[test]
    fn cycle_tracking_produces_summary() {
        let config = StatsConfig {
            cycle_tracking: true,
            stat_buffer_size: 2,
            ..StatsConfig::default()
        };
        let mut stats = HwStatistics::new(StatsContext::new(config));
        stats.cycle_start();
        if let Some(sample) = stats.current_cycle_mut() {
            sample.comp_in_flight = 6;
        }
        stats.cycle_end(1);
        stats.summarize_cycles();
        let summary = stats.summary().cycle_summary.unwrap();
        assert_eq!(summary.samples, 1);
        assert_eq!(summary.peak_comp_in_flight, 6);
    }

    #[test]
    fn fu_calls_feed_utilization() {
        let mut stats = HwStatistics::default();
        stats.set_fu_instances(FuType::FpFloatAddSub, 2);
        stats.record_fu_busy(FuType::FpFloatAddSub, 0, 3);
        stats.record_fu_contention(FuType::FpFloatAddSub);
        let fu = &stats.summary().fu_utilization;
        assert_eq!(fu.total_busy_cycles, 3);
        assert_eq!(fu.get(FuType::FpFloatAddSub).instances, 2);
        assert_eq!(fu.most_contended(), Some(FuType::FpFloatAddSub));
        assert_eq!(stats.summary().stalls.total_stall_cycles, 0);
    }

    #[test]
    fn cycle_end_closes_byte_window() {
        use crate::metrics::MemAccessKind;

        let mut stats = HwStatistics::default();
        stats.collect_bus_widths(8, 8);
        stats.record_memory_read(MemAccess::new(MemAccessKind::Spm, 1).at(0, 8));
        stats.cycle_end(1);
        stats.record_memory_read(MemAccess::new(MemAccessKind::Spm, 1).at(8, 8));
        stats.cycle_end(2);
        let mem = &stats.summary().memory_access;
        assert_eq!(mem.total_bytes_read, 16);
        assert_eq!(mem.peak_read_bytes_per_cycle, 8);
        assert_eq!(mem.read_bus_width, 8);
    }

    #[test]
    fn no_output_path_writes_nothing() {
        let stats = HwStatistics::default();
        assert_eq!(stats.write_csv_file(), None);
        assert_eq!(stats.write_json_file(), None);
    }

    #[test]
    fn name_is_recorded() {
        let mut stats = HwStatistics::default();
        stats.set_accelerator_name("fft");
        assert_eq!(stats.into_summary().accelerator_name, "fft");
    }
}
