//! The composite run summary and its sub-sections.
//!
//! Dataflow and stall sections are filled by the engine itself. Performance,
//! memory access, power and area are supplied by external collaborators
//! through collection calls and only held here, along with the handful of
//! derived fields that are pure functions of what was supplied.
//!
//! [`Summary::rows`] flattens everything into one ordered row list. Both the
//! JSON and the CSV renderer consume that list, so the two documents always
//! carry the same fields in the same order.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::critical_path::CriticalPath;
use crate::cycle::CycleSummary;
use crate::edge::DepKinds;
use crate::fu::FuUtilization;
use crate::id::Opcode;
use crate::stall::StallBreakdown;

// ---------------------------------------------------------------------------
// Performance
// ---------------------------------------------------------------------------

/// Timing and cycle counts reported by the simulator at finalize.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PerformanceMetrics {
    pub setup_time_ns: f64,
    pub sim_time_ns: f64,
    pub clock_period_ns: u64,
    pub sys_clock_ghz: f64,
    pub total_cycles: u64,
    pub stall_cycles: u64,
    pub executed_nodes: u64,
}

impl PerformanceMetrics {
    pub fn collect(
        setup_time_ns: f64,
        sim_time_ns: f64,
        clock_period_ns: u64,
        total_cycles: u64,
        stall_cycles: u64,
    ) -> Self {
        let sys_clock_ghz = if clock_period_ns > 0 {
            1.0 / clock_period_ns as f64
        } else {
            0.0
        };
        PerformanceMetrics {
            setup_time_ns,
            sim_time_ns,
            clock_period_ns,
            sys_clock_ghz,
            total_cycles,
            stall_cycles,
            // The drain cycle never executes a node.
            executed_nodes: total_cycles
                .saturating_sub(stall_cycles)
                .saturating_sub(1),
        }
    }

    pub fn total_time_ns(&self) -> f64 {
        self.setup_time_ns + self.sim_time_ns
    }

    /// Accelerator run time: cycles times the clock period.
    pub fn runtime_ns(&self) -> f64 {
        self.total_cycles as f64 * self.clock_period_ns as f64
    }

    pub fn active_cycles(&self) -> u64 {
        self.total_cycles.saturating_sub(self.stall_cycles)
    }

    /// Executed nodes per total cycle; 0 for a run with no cycles.
    pub fn ipc(&self) -> f64 {
        if self.total_cycles == 0 {
            0.0
        } else {
            self.executed_nodes as f64 / self.total_cycles as f64
        }
    }
}

// ---------------------------------------------------------------------------
// Memory access
// ---------------------------------------------------------------------------

/// Which memory a request went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemAccessKind {
    Cache,
    Spm,
    Dma,
    Local,
}

/// Address bucket size for the access heatmap, one cache line.
pub const ADDRESS_GRANULARITY: u64 = 64;

/// One completed memory request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemAccess {
    pub kind: MemAccessKind,
    #[serde(default)]
    pub addr: Option<u64>,
    #[serde(default)]
    pub bytes: u64,
    #[serde(default)]
    pub latency: u64,
    /// Only meaningful for cache accesses.
    #[serde(default)]
    pub cache_hit: bool,
}

impl MemAccess {
    pub fn new(kind: MemAccessKind, latency: u64) -> Self {
        MemAccess {
            kind,
            addr: None,
            bytes: 0,
            latency,
            cache_hit: false,
        }
    }

    pub fn hit(self, cache_hit: bool) -> Self {
        MemAccess { cache_hit, ..self }
    }

    /// Sets the address and transfer size.
    pub fn at(self, addr: u64, bytes: u64) -> Self {
        MemAccess {
            addr: Some(addr),
            bytes,
            ..self
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MemoryAccessMetrics {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_read_hits: u64,
    pub cache_read_misses: u64,
    pub cache_write_hits: u64,
    pub cache_write_misses: u64,
    pub spm_reads: u64,
    pub spm_writes: u64,
    pub dma_read_requests: u64,
    pub dma_write_requests: u64,
    pub local_reads: u64,
    pub local_writes: u64,
    pub read_count: u64,
    pub write_count: u64,
    pub total_read_latency: u64,
    pub total_write_latency: u64,
    pub min_read_latency: Option<u64>,
    pub max_read_latency: u64,
    pub min_write_latency: Option<u64>,
    pub max_write_latency: u64,
    pub read_port_stalls: u64,
    pub write_port_stalls: u64,
    pub total_bytes_read: u64,
    pub total_bytes_written: u64,
    pub peak_read_bytes_per_cycle: u64,
    pub peak_write_bytes_per_cycle: u64,
    /// Bytes per cycle each bus can move; 0 when unknown.
    pub read_bus_width: u64,
    pub write_bus_width: u64,
    /// Line-aligned address -> access count.
    pub read_lines: BTreeMap<u64, u64>,
    pub write_lines: BTreeMap<u64, u64>,
    #[serde(skip)]
    cycle_bytes_read: u64,
    #[serde(skip)]
    cycle_bytes_written: u64,
}

impl MemoryAccessMetrics {
    /// Counts one completed read. `cache_hit` only matters for cache reads.
    pub fn record_read(&mut self, access: MemAccess) {
        match access.kind {
            MemAccessKind::Cache => {
                self.count_cache(access.cache_hit);
                if access.cache_hit {
                    self.cache_read_hits += 1;
                } else {
                    self.cache_read_misses += 1;
                }
            }
            MemAccessKind::Spm => self.spm_reads += 1,
            MemAccessKind::Dma => self.dma_read_requests += 1,
            MemAccessKind::Local => self.local_reads += 1,
        }
        let latency = access.latency;
        self.read_count += 1;
        self.total_read_latency = self.total_read_latency.saturating_add(latency);
        self.min_read_latency = Some(self.min_read_latency.map_or(latency, |m| m.min(latency)));
        self.max_read_latency = self.max_read_latency.max(latency);

        self.total_bytes_read = self.total_bytes_read.saturating_add(access.bytes);
        self.cycle_bytes_read = self.cycle_bytes_read.saturating_add(access.bytes);
        self.peak_read_bytes_per_cycle = self.peak_read_bytes_per_cycle.max(self.cycle_bytes_read);
        if let Some(addr) = access.addr {
            *self.read_lines.entry(line_of(addr)).or_insert(0) += 1;
        }
    }

    /// Counts one completed write. `cache_hit` only matters for cache writes.
    pub fn record_write(&mut self, access: MemAccess) {
        match access.kind {
            MemAccessKind::Cache => {
                self.count_cache(access.cache_hit);
                if access.cache_hit {
                    self.cache_write_hits += 1;
                } else {
                    self.cache_write_misses += 1;
                }
            }
            MemAccessKind::Spm => self.spm_writes += 1,
            MemAccessKind::Dma => self.dma_write_requests += 1,
            MemAccessKind::Local => self.local_writes += 1,
        }
        let latency = access.latency;
        self.write_count += 1;
        self.total_write_latency = self.total_write_latency.saturating_add(latency);
        self.min_write_latency = Some(self.min_write_latency.map_or(latency, |m| m.min(latency)));
        self.max_write_latency = self.max_write_latency.max(latency);

        self.total_bytes_written = self.total_bytes_written.saturating_add(access.bytes);
        self.cycle_bytes_written = self.cycle_bytes_written.saturating_add(access.bytes);
        self.peak_write_bytes_per_cycle =
            self.peak_write_bytes_per_cycle.max(self.cycle_bytes_written);
        if let Some(addr) = access.addr {
            *self.write_lines.entry(line_of(addr)).or_insert(0) += 1;
        }
    }

    pub fn record_port_contention(&mut self, is_read: bool) {
        if is_read {
            self.read_port_stalls += 1;
        } else {
            self.write_port_stalls += 1;
        }
    }

    pub fn set_bus_widths(&mut self, read: u64, write: u64) {
        self.read_bus_width = read;
        self.write_bus_width = write;
    }

    /// Closes the per-cycle byte window.
    pub fn end_cycle(&mut self) {
        self.cycle_bytes_read = 0;
        self.cycle_bytes_written = 0;
    }

    fn count_cache(&mut self, hit: bool) {
        if hit {
            self.cache_hits += 1;
        } else {
            self.cache_misses += 1;
        }
    }

    pub fn cache_hit_rate(&self) -> f64 {
        ratio(self.cache_hits, self.cache_hits + self.cache_misses)
    }

    pub fn avg_read_latency(&self) -> f64 {
        ratio(self.total_read_latency, self.read_count)
    }

    pub fn avg_write_latency(&self) -> f64 {
        ratio(self.total_write_latency, self.write_count)
    }

    /// Bytes read over what the read bus could have moved in `total_cycles`.
    pub fn read_bandwidth_utilization(&self, total_cycles: u64) -> f64 {
        ratio(
            self.total_bytes_read,
            total_cycles.saturating_mul(self.read_bus_width),
        )
    }

    pub fn write_bandwidth_utilization(&self, total_cycles: u64) -> f64 {
        ratio(
            self.total_bytes_written,
            total_cycles.saturating_mul(self.write_bus_width),
        )
    }
}

fn line_of(addr: u64) -> u64 {
    addr / ADDRESS_GRANULARITY * ADDRESS_GRANULARITY
}

// ---------------------------------------------------------------------------
// Dataflow
// ---------------------------------------------------------------------------

/// Dependency, depth and parallelism statistics owned by the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DataflowMetrics {
    pub critical_path_length: u32,
    pub critical_path_instructions: u64,
    pub critical_path_loads: u64,
    pub critical_path_stores: u64,
    pub critical_path_computes: u64,
    pub critical_path_by_opcode: BTreeMap<Opcode, u64>,
    pub total_instructions: u64,
    pub total_dependency_edges: u64,
    pub true_dependencies: u64,
    pub anti_dependencies: u64,
    pub output_dependencies: u64,
    pub control_dependencies: u64,
    pub memory_dependencies: u64,
    pub avg_dependency_depth: f64,
    pub max_dependency_depth: u32,
    pub avg_ready_instructions: f64,
    pub max_parallel_ops: u64,
    pub total_issued: u64,
    pub sampled_cycles: u64,
    /// Ready-instruction count -> number of cycles it was observed.
    pub parallelism_histogram: BTreeMap<u64, u64>,
}

impl DataflowMetrics {
    /// Counts one recorded edge under every kind flag it carries.
    pub fn count_edge(&mut self, kinds: DepKinds) {
        self.total_dependency_edges += 1;
        if kinds.raw {
            self.true_dependencies += 1;
        }
        if kinds.war {
            self.anti_dependencies += 1;
        }
        if kinds.waw {
            self.output_dependencies += 1;
        }
        if kinds.control {
            self.control_dependencies += 1;
        }
        if kinds.memory {
            self.memory_dependencies += 1;
        }
    }

    /// Counts one committed instruction and folds its depth into the
    /// running mean.
    pub fn count_commit(&mut self, depth: u32) {
        self.total_instructions += 1;
        let n = self.total_instructions as f64;
        self.avg_dependency_depth += (f64::from(depth) - self.avg_dependency_depth) / n;
    }

    pub fn record_parallelism(&mut self, ready: u64, issued: u64) {
        *self.parallelism_histogram.entry(ready).or_insert(0) += 1;
        self.max_parallel_ops = self.max_parallel_ops.max(ready);
        self.total_issued = self.total_issued.saturating_add(issued);
        self.sampled_cycles += 1;
    }

    /// Copies the result of a critical-path pass into the dataflow fields.
    pub fn apply_critical_path(&mut self, path: &CriticalPath) {
        self.critical_path_length = path.length;
        if let Some(avg) = path.avg_ready_instructions {
            self.avg_ready_instructions = avg;
        }
        self.critical_path_instructions = path.instruction_count();
        self.critical_path_loads = path.loads;
        self.critical_path_stores = path.stores;
        self.critical_path_computes = path.computes;
        self.critical_path_by_opcode = path.by_opcode.clone();
    }

    /// Weighted mean of the ready histogram.
    pub fn avg_parallelism(&self) -> f64 {
        let (ready, cycles) = self
            .parallelism_histogram
            .iter()
            .fold((0u64, 0u64), |(r, c), (&ready, &cycles)| {
                (
                    r.saturating_add(ready.saturating_mul(cycles)),
                    c.saturating_add(cycles),
                )
            });
        ratio(ready, cycles)
    }

    pub fn avg_issued_per_cycle(&self) -> f64 {
        ratio(self.total_issued, self.sampled_cycles)
    }

    /// Committed instructions per critical-path level.
    pub fn ilp(&self) -> f64 {
        ratio(self.total_instructions, u64::from(self.critical_path_length))
    }
}

// ---------------------------------------------------------------------------
// Power and area
// ---------------------------------------------------------------------------

/// Component power figures in mW, as looked up by the power model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerInputs {
    pub fu_leakage: f64,
    pub fu_dynamic: f64,
    pub reg_leakage: f64,
    pub reg_dynamic: f64,
    pub spm_leakage: f64,
    pub spm_read_dynamic: f64,
    pub spm_write_dynamic: f64,
    pub cache_leakage: f64,
    pub cache_read_dynamic: f64,
    pub cache_write_dynamic: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PowerMetrics {
    pub inputs: PowerInputs,
    pub fu_total: f64,
    pub reg_total: f64,
    pub spm_total: f64,
    pub cache_total: f64,
    /// Datapath power: functional units plus registers.
    pub total_power: f64,
    pub acc_spm_total: f64,
    pub acc_cache_total: f64,
}

impl PowerMetrics {
    pub fn collect(inputs: PowerInputs) -> Self {
        let fu_total = inputs.fu_leakage + inputs.fu_dynamic;
        let reg_total = inputs.reg_leakage + inputs.reg_dynamic;
        let spm_total = inputs.spm_leakage + inputs.spm_read_dynamic + inputs.spm_write_dynamic;
        let cache_total =
            inputs.cache_leakage + inputs.cache_read_dynamic + inputs.cache_write_dynamic;
        let total_power = fu_total + reg_total;
        PowerMetrics {
            inputs,
            fu_total,
            reg_total,
            spm_total,
            cache_total,
            total_power,
            acc_spm_total: total_power + spm_total,
            acc_cache_total: total_power + cache_total,
        }
    }

    pub fn mem_leakage(&self) -> f64 {
        self.inputs.spm_leakage + self.inputs.cache_leakage
    }

    pub fn mem_total(&self) -> f64 {
        self.spm_total + self.cache_total
    }

    pub fn mem_dynamic(&self) -> f64 {
        self.mem_total() - self.mem_leakage()
    }

    /// Energy over `runtime_ns`. mW x ns is pJ, so each figure is scaled
    /// down by 1e6 to nJ.
    pub fn energy(&self, runtime_ns: f64) -> EnergyMetrics {
        let nj = |mw: f64| mw * runtime_ns / 1e6;
        let fu_energy_nj = nj(self.fu_total);
        let reg_energy_nj = nj(self.reg_total);
        let mem_energy_nj = nj(self.mem_total());
        EnergyMetrics {
            fu_energy_nj,
            reg_energy_nj,
            mem_energy_nj,
            total_energy_nj: fu_energy_nj + reg_energy_nj + mem_energy_nj,
        }
    }
}

/// Energy derived from power and run time, in nJ. The total covers the
/// datapath and both memories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EnergyMetrics {
    pub fu_energy_nj: f64,
    pub reg_energy_nj: f64,
    pub mem_energy_nj: f64,
    pub total_energy_nj: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AreaMetrics {
    pub fu_area_um2: f64,
    pub reg_area_um2: f64,
    pub spm_area_um2: f64,
    pub cache_area_um2: f64,
    pub total_area_um2: f64,
    pub acc_spm_area_um2: f64,
    pub acc_cache_area_um2: f64,
}

impl AreaMetrics {
    pub fn collect(fu: f64, reg: f64, spm: f64, cache: f64) -> Self {
        let total = fu + reg;
        AreaMetrics {
            fu_area_um2: fu,
            reg_area_um2: reg,
            spm_area_um2: spm,
            cache_area_um2: cache,
            total_area_um2: total,
            acc_spm_area_um2: total + spm,
            acc_cache_area_um2: total + cache,
        }
    }

    pub fn mem_area_um2(&self) -> f64 {
        self.spm_area_um2 + self.cache_area_um2
    }

    pub fn total_area_mm2(&self) -> f64 {
        self.total_area_um2 / 1e6
    }
}

// ---------------------------------------------------------------------------
// Summary and rows
// ---------------------------------------------------------------------------

/// Everything one accelerator reports at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub accelerator_name: String,
    pub performance: PerformanceMetrics,
    pub memory_access: MemoryAccessMetrics,
    pub dataflow: DataflowMetrics,
    pub fu_utilization: FuUtilization,
    pub power: PowerMetrics,
    pub area: AreaMetrics,
    pub stalls: StallBreakdown,
    pub cycle_summary: Option<CycleSummary>,
}

/// Report section a row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    /// Top-level identity fields.
    Identity,
    Performance,
    MemoryAccess,
    Bandwidth,
    Dataflow,
    CriticalPathByOpcode,
    FuUtilization,
    Power,
    Area,
    StallBreakdown,
    CycleSummary,
}

impl Section {
    /// JSON object key of the section, `None` for top-level fields.
    pub fn json_key(self) -> Option<&'static str> {
        match self {
            Section::Identity => None,
            Section::Performance => Some("performance"),
            Section::MemoryAccess => Some("memory_access"),
            Section::Bandwidth => Some("bandwidth"),
            Section::Dataflow => Some("dataflow"),
            Section::CriticalPathByOpcode => Some("critical_path_by_opcode"),
            Section::FuUtilization => Some("fu_utilization"),
            Section::Power => Some("power"),
            Section::Area => Some("area"),
            Section::StallBreakdown => Some("stall_breakdown"),
            Section::CycleSummary => Some("cycle_summary"),
        }
    }
}

/// A single reported value.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Int(u64),
    Float(f64),
    Text(String),
}

impl MetricValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Int(v) => Some(*v as f64),
            MetricValue::Float(v) => Some(*v),
            MetricValue::Text(_) => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            MetricValue::Int(v) => serde_json::Value::from(*v),
            // Non-finite floats have no JSON form.
            MetricValue::Float(v) => serde_json::Number::from_f64(*v)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            MetricValue::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Int(v) => write!(f, "{v}"),
            MetricValue::Float(v) => write!(f, "{v}"),
            MetricValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for MetricValue {
    fn from(v: u64) -> Self {
        MetricValue::Int(v)
    }
}

impl From<u32> for MetricValue {
    fn from(v: u32) -> Self {
        MetricValue::Int(u64::from(v))
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Float(v)
    }
}

impl From<&str> for MetricValue {
    fn from(v: &str) -> Self {
        MetricValue::Text(v.to_string())
    }
}

impl From<String> for MetricValue {
    fn from(v: String) -> Self {
        MetricValue::Text(v)
    }
}

/// One flattened summary field.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub section: Section,
    /// Key inside the section's JSON object.
    pub key: Cow<'static, str>,
    /// Metric name in the CSV document.
    pub csv_name: Cow<'static, str>,
    pub value: MetricValue,
}

struct RowSink {
    rows: Vec<Row>,
    section: Section,
}

impl RowSink {
    fn section(&mut self, section: Section) -> &mut Self {
        self.section = section;
        self
    }

    fn push(&mut self, key: &'static str, value: impl Into<MetricValue>) -> &mut Self {
        self.rows.push(Row {
            section: self.section,
            key: Cow::Borrowed(key),
            csv_name: Cow::Borrowed(key),
            value: value.into(),
        });
        self
    }

    fn push_prefixed(&mut self, prefix: &str, key: String, value: impl Into<MetricValue>) {
        self.rows.push(Row {
            section: self.section,
            csv_name: Cow::Owned(format!("{prefix}{key}")),
            key: Cow::Owned(key),
            value: value.into(),
        });
    }
}

impl Summary {
    /// Flattens the summary into report order.
    pub fn rows(&self) -> Vec<Row> {
        let mut sink = RowSink {
            rows: Vec::with_capacity(160),
            section: Section::Identity,
        };
        sink.push("accelerator_name", self.accelerator_name.as_str());

        let p = &self.performance;
        sink.section(Section::Performance)
            .push("setup_time_ns", p.setup_time_ns)
            .push("sim_time_ns", p.sim_time_ns)
            .push("total_time_ns", p.total_time_ns())
            .push("clock_period_ns", p.clock_period_ns)
            .push("sys_clock_ghz", p.sys_clock_ghz)
            .push("total_cycles", p.total_cycles)
            .push("stall_cycles", p.stall_cycles)
            .push("active_cycles", p.active_cycles())
            .push("executed_nodes", p.executed_nodes)
            .push("ipc", p.ipc());

        let m = &self.memory_access;
        sink.section(Section::MemoryAccess)
            .push("cache_hits", m.cache_hits)
            .push("cache_misses", m.cache_misses)
            .push("cache_hit_rate", m.cache_hit_rate())
            .push("spm_reads", m.spm_reads)
            .push("spm_writes", m.spm_writes)
            .push("dma_read_requests", m.dma_read_requests)
            .push("dma_write_requests", m.dma_write_requests)
            .push("local_reads", m.local_reads)
            .push("local_writes", m.local_writes)
            .push("avg_read_latency", m.avg_read_latency())
            .push("avg_write_latency", m.avg_write_latency())
            .push("min_read_latency", m.min_read_latency.unwrap_or(0))
            .push("max_read_latency", m.max_read_latency)
            .push("min_write_latency", m.min_write_latency.unwrap_or(0))
            .push("max_write_latency", m.max_write_latency)
            .push("read_port_stalls", m.read_port_stalls)
            .push("write_port_stalls", m.write_port_stalls);

        sink.section(Section::Bandwidth)
            .push("total_bytes_read", m.total_bytes_read)
            .push("total_bytes_written", m.total_bytes_written)
            .push("peak_read_bytes_per_cycle", m.peak_read_bytes_per_cycle)
            .push("peak_write_bytes_per_cycle", m.peak_write_bytes_per_cycle)
            .push("read_bus_width", m.read_bus_width)
            .push("write_bus_width", m.write_bus_width)
            .push(
                "read_bandwidth_utilization",
                m.read_bandwidth_utilization(p.total_cycles),
            )
            .push(
                "write_bandwidth_utilization",
                m.write_bandwidth_utilization(p.total_cycles),
            )
            .push("read_lines_touched", m.read_lines.len() as u64)
            .push("write_lines_touched", m.write_lines.len() as u64);

        let d = &self.dataflow;
        sink.section(Section::Dataflow)
            .push("critical_path_length", d.critical_path_length)
            .push("critical_path_instructions", d.critical_path_instructions)
            .push("critical_path_loads", d.critical_path_loads)
            .push("critical_path_stores", d.critical_path_stores)
            .push("critical_path_computes", d.critical_path_computes)
            .push("total_instructions", d.total_instructions)
            .push("total_dependency_edges", d.total_dependency_edges)
            .push("true_dependencies", d.true_dependencies)
            .push("anti_dependencies", d.anti_dependencies)
            .push("output_dependencies", d.output_dependencies)
            .push("control_dependencies", d.control_dependencies)
            .push("memory_dependencies", d.memory_dependencies)
            .push("avg_dependency_depth", d.avg_dependency_depth)
            .push("max_dependency_depth", d.max_dependency_depth)
            .push("avg_ready_instructions", d.avg_ready_instructions)
            .push("ilp", d.ilp())
            .push("avg_parallelism", d.avg_parallelism())
            .push("avg_issued_per_cycle", d.avg_issued_per_cycle())
            .push("max_parallel_ops", d.max_parallel_ops);

        sink.section(Section::CriticalPathByOpcode);
        for (opcode, count) in &d.critical_path_by_opcode {
            sink.push_prefixed("critical_path_opcode_", opcode.to_string(), *count);
        }

        let fu = &self.fu_utilization;
        sink.section(Section::FuUtilization);
        sink.push_prefixed("fu_", "total_busy_cycles".into(), fu.total_busy_cycles);
        sink.push_prefixed("fu_", "total_contention_stalls".into(), fu.total_contention_stalls);
        sink.push_prefixed("fu_", "total_instances".into(), fu.total_instances());
        sink.push_prefixed(
            "fu_",
            "overall_utilization".into(),
            fu.overall_utilization(p.total_cycles),
        );
        sink.push_prefixed(
            "fu_",
            "most_contended".into(),
            fu.most_contended().map_or("none", |t| t.name()),
        );
        for (ty, t) in fu.iter().filter(|(_, t)| t.is_active()) {
            let fields: [(&str, MetricValue); 7] = [
                ("instances", t.instances.into()),
                ("max_concurrent", t.max_concurrent().into()),
                ("busy_cycles", t.busy_cycles.into()),
                ("operations", t.operations.into()),
                ("contention_stalls", t.contention_stalls.into()),
                ("utilization", t.utilization(p.total_cycles).into()),
                ("contention_rate", t.contention_rate().into()),
            ];
            for (field, value) in fields {
                sink.push_prefixed("fu_", format!("{ty}_{field}"), value);
            }
        }

        let pw = &self.power;
        sink.section(Section::Power)
            .push("fu_leakage", pw.inputs.fu_leakage)
            .push("fu_dynamic", pw.inputs.fu_dynamic)
            .push("fu_total", pw.fu_total)
            .push("reg_leakage", pw.inputs.reg_leakage)
            .push("reg_dynamic", pw.inputs.reg_dynamic)
            .push("reg_total", pw.reg_total)
            .push("spm_leakage", pw.inputs.spm_leakage)
            .push("spm_read_dynamic", pw.inputs.spm_read_dynamic)
            .push("spm_write_dynamic", pw.inputs.spm_write_dynamic)
            .push("spm_total", pw.spm_total)
            .push("cache_leakage", pw.inputs.cache_leakage)
            .push("cache_read_dynamic", pw.inputs.cache_read_dynamic)
            .push("cache_write_dynamic", pw.inputs.cache_write_dynamic)
            .push("cache_total", pw.cache_total)
            .push("mem_leakage", pw.mem_leakage())
            .push("mem_dynamic", pw.mem_dynamic())
            .push("mem_total", pw.mem_total())
            .push("total_power", pw.total_power)
            .push("acc_spm_total", pw.acc_spm_total)
            .push("acc_cache_total", pw.acc_cache_total);
        let energy = pw.energy(p.runtime_ns());
        sink.push("fu_energy_nj", energy.fu_energy_nj)
            .push("reg_energy_nj", energy.reg_energy_nj)
            .push("mem_energy_nj", energy.mem_energy_nj)
            .push("total_energy_nj", energy.total_energy_nj);

        let a = &self.area;
        sink.section(Section::Area)
            .push("fu_area_um2", a.fu_area_um2)
            .push("reg_area_um2", a.reg_area_um2)
            .push("spm_area_um2", a.spm_area_um2)
            .push("cache_area_um2", a.cache_area_um2)
            .push("mem_area_um2", a.mem_area_um2())
            .push("total_area_um2", a.total_area_um2)
            .push("acc_spm_area_um2", a.acc_spm_area_um2)
            .push("acc_cache_area_um2", a.acc_cache_area_um2)
            .push("total_area_mm2", a.total_area_mm2());

        let s = &self.stalls;
        sink.section(Section::StallBreakdown);
        for (cause, count) in s.counts() {
            sink.push_prefixed("stall_", cause.name().to_string(), count);
        }
        sink.push("total_stall_cycles", s.total_stall_cycles)
            .push("max_consecutive_stalls", s.max_consecutive_stalls)
            .push("stall_events", s.stall_events)
            .push("avg_stall_duration", s.avg_stall_duration())
            .push(
                "dominant_bottleneck",
                s.dominant_cause().map_or("none", |c| c.name()),
            );

        if let Some(c) = &self.cycle_summary {
            sink.section(Section::CycleSummary);
            let fields: [(&str, MetricValue); 12] = [
                ("samples", c.samples.into()),
                ("evicted", c.evicted.into()),
                ("avg_res_in_flight", c.avg_res_in_flight.into()),
                ("avg_load_in_flight", c.avg_load_in_flight.into()),
                ("avg_store_in_flight", c.avg_store_in_flight.into()),
                ("avg_comp_in_flight", c.avg_comp_in_flight.into()),
                ("peak_res_in_flight", c.peak_res_in_flight.into()),
                ("peak_load_in_flight", c.peak_load_in_flight.into()),
                ("peak_store_in_flight", c.peak_store_in_flight.into()),
                ("peak_comp_in_flight", c.peak_comp_in_flight.into()),
                ("total_load_raw_stalls", c.total_load_raw_stalls.into()),
                ("total_comp_fu_stalls", c.total_comp_fu_stalls.into()),
            ];
            for (key, value) in fields {
                sink.push_prefixed("cycle_", key.to_string(), value);
            }
        }

        sink.rows
    }
}

fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}
