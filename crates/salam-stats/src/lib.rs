//! Dataflow dependency and critical-path statistics for simulated hardware
//! accelerators.
//!
//! One [`HwStatistics`] engine lives inside each accelerator. The per-cycle
//! queue processor reports resolved dependencies and commits; at the end of
//! the run the engine computes the critical path and renders a
//! performance/power/area summary as JSON and CSV.

pub mod accelerator;
pub mod config;
pub mod critical_path;
pub mod cycle;
pub mod depth;
pub mod edge;
pub mod engine;
pub mod error;
pub mod fu;
pub mod id;
pub mod metrics;
pub mod ops;
pub mod recorder;
pub mod report;
pub mod stall;
pub mod trace;

// Re-export commonly used types
pub use accelerator::{Accelerator, Finalized, LegacyReport};
pub use config::{DebugFlags, StatsConfig, StatsContext};
pub use critical_path::CriticalPath;
pub use edge::{DepKinds, DependencyEdge};
pub use engine::HwStatistics;
pub use error::StatsError;
pub use fu::FuType;
pub use id::{Opcode, Uid};
pub use metrics::{MemAccess, MemAccessKind, PowerInputs, Summary};
pub use ops::OpClass;
pub use stall::StallCause;
pub use trace::{parse_trace, TraceEvent};
