//! Engine configuration and the explicit context handed to each engine.
//!
//! Nothing here is process-global. A [`StatsContext`] is built once per
//! accelerator and moved into its [`HwStatistics`](crate::engine::HwStatistics).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::field;

use crate::error::StatsError;

/// Environment variable holding a comma separated debug flag list.
pub const DEBUG_FLAGS_ENV: &str = "SALAM_DEBUG_FLAGS";

/// Flag enabling the detailed text report.
pub const FLAG_RESULTS: &str = "SALAMResults";

/// Flag enabling CSV output (console and file).
pub const FLAG_RESULTS_CSV: &str = "SALAMResultsCSV";

/// Output switches taken from the simulator's debug flag list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugFlags {
    pub detailed_results: bool,
    pub csv_results: bool,
}

impl DebugFlags {
    /// Parses a gem5-style flag list such as `"SALAMResults,Exec"`.
    ///
    /// Flags that do not belong to the stats engine are ignored, as are
    /// surrounding whitespace and empty entries.
    pub fn parse(list: &str) -> Self {
        let mut flags = DebugFlags::default();
        for flag in list.split(',').map(str::trim).filter(|f| !f.is_empty()) {
            match flag {
                FLAG_RESULTS => flags.detailed_results = true,
                FLAG_RESULTS_CSV => flags.csv_results = true,
                other => tracing::trace!(flag = other, "ignoring unrelated debug flag"),
            }
        }
        flags
    }

    /// Reads [`DEBUG_FLAGS_ENV`]; unset means no flags.
    pub fn from_env() -> Self {
        std::env::var(DEBUG_FLAGS_ENV)
            .map(|v| Self::parse(&v))
            .unwrap_or_default()
    }

    pub fn union(self, other: DebugFlags) -> Self {
        DebugFlags {
            detailed_results: self.detailed_results || other.detailed_results,
            csv_results: self.csv_results || other.csv_results,
        }
    }
}

/// Per-engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// JSON summary path; the CSV path is derived from it.
    pub output_file: Option<PathBuf>,

    /// Pretty-print the JSON document.
    pub pretty_print: bool,

    /// Keep per-cycle queue occupancy samples.
    pub cycle_tracking: bool,

    /// Samples per buffer; two buffers are retained.
    pub stat_buffer_size: usize,

    pub debug_flags: DebugFlags,
}

impl Default for StatsConfig {
    fn default() -> Self {
        StatsConfig {
            output_file: None,
            pretty_print: true,
            cycle_tracking: false,
            stat_buffer_size: 1024,
            debug_flags: DebugFlags::default(),
        }
    }
}

impl StatsConfig {
    pub fn from_json_str(json: &str) -> Result<Self, StatsError> {
        let config: StatsConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, StatsError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| StatsError::io(path, e))?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), StatsError> {
        if self.stat_buffer_size == 0 {
            return Err(StatsError::Config {
                reason: "stat_buffer_size must be at least 1".into(),
            });
        }
        if let Some(path) = &self.output_file {
            if path.as_os_str().is_empty() {
                return Err(StatsError::Config {
                    reason: "output_file must not be empty".into(),
                });
            }
        }
        Ok(())
    }
}

/// Explicitly constructed context an engine is created from.
///
/// Owns the configuration and the `hw_stats` tracing span all of the
/// engine's log output is attached to.
#[derive(Debug, Clone)]
pub struct StatsContext {
    pub config: StatsConfig,
    span: tracing::Span,
}

impl StatsContext {
    pub fn new(config: StatsConfig) -> Self {
        let span = tracing::info_span!("hw_stats", accelerator = field::Empty);
        StatsContext { config, span }
    }

    pub fn span(&self) -> &tracing::Span {
        &self.span
    }

    /// Records the accelerator name on the span.
    pub fn set_accelerator(&self, name: &str) {
        self.span.record("accelerator", name);
    }
}

impl Default for StatsContext {
    fn default() -> Self {
        StatsContext::new(StatsConfig::default())
    }
}
