//! Rendering the summary to JSON, CSV and a short text report.
//!
//! The `try_*` file helpers return errors. The plain `write_*` wrappers are
//! what the finalize path uses: they log a warning and return `None` on
//! failure so a broken output path never interrupts the simulation.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::StatsError;
use crate::metrics::{MetricValue, Summary};

/// Version tag written at the top of the JSON document.
pub const REPORT_VERSION: &str = "2.0";

/// Builds the JSON document: `version`, `accelerator_name`, then one object
/// per section in row order.
pub fn to_json_value(summary: &Summary) -> Value {
    let mut root = Map::new();
    root.insert("version".into(), Value::from(REPORT_VERSION));
    for row in summary.rows() {
        let value = row.value.to_json();
        match row.section.json_key() {
            None => {
                root.insert(row.key.into_owned(), value);
            }
            Some(section) => {
                let entry = root
                    .entry(section)
                    .or_insert_with(|| Value::Object(Map::new()));
                if let Value::Object(fields) = entry {
                    fields.insert(row.key.into_owned(), value);
                }
            }
        }
    }
    Value::Object(root)
}

pub fn to_json(summary: &Summary, pretty: bool) -> Result<String, StatsError> {
    let value = to_json_value(summary);
    let json = if pretty {
        serde_json::to_string_pretty(&value)?
    } else {
        serde_json::to_string(&value)?
    };
    Ok(json)
}

/// Writes `metric,value` rows for every summary field.
pub fn print_csv<W: Write>(summary: &Summary, out: &mut W) -> io::Result<()> {
    writeln!(out, "metric,value")?;
    for row in summary.rows() {
        match &row.value {
            MetricValue::Text(text) => writeln!(out, "{},{}", row.csv_name, csv_field(text))?,
            value => writeln!(out, "{},{}", row.csv_name, value)?,
        }
    }
    Ok(())
}

fn csv_field(text: &str) -> String {
    if text.contains([',', '"', '\n']) {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}

/// Pretty JSON, for the detailed results flag.
pub fn print_detailed<W: Write>(summary: &Summary, out: &mut W) -> io::Result<()> {
    let json = serde_json::to_string_pretty(&to_json_value(summary)).map_err(io::Error::other)?;
    writeln!(out, "{json}")
}

/// Short human-oriented report.
pub fn print_summary<W: Write>(summary: &Summary, out: &mut W) -> io::Result<()> {
    let perf = &summary.performance;
    let df = &summary.dataflow;
    let stall_pct = if perf.total_cycles > 0 {
        100.0 * perf.stall_cycles as f64 / perf.total_cycles as f64
    } else {
        0.0
    };

    writeln!(out, "=== Accelerator Summary: {} ===", summary.accelerator_name)?;
    writeln!(
        out,
        "Cycles:        {} total, {} stalled ({:.1}%), {} active",
        perf.total_cycles,
        perf.stall_cycles,
        stall_pct,
        perf.active_cycles()
    )?;
    writeln!(
        out,
        "Bottleneck:    {}",
        summary
            .stalls
            .dominant_cause()
            .map_or("none", |cause| cause.name())
    )?;
    writeln!(
        out,
        "Cache hits:    {:.1}%",
        100.0 * summary.memory_access.cache_hit_rate()
    )?;
    writeln!(
        out,
        "Critical path: {} levels, {} instructions ({} load, {} store, {} compute)",
        df.critical_path_length,
        df.critical_path_instructions,
        df.critical_path_loads,
        df.critical_path_stores,
        df.critical_path_computes
    )?;
    writeln!(
        out,
        "ILP:           {:.2} (avg parallelism {:.2}, max {})",
        df.ilp(),
        df.avg_parallelism(),
        df.max_parallel_ops
    )?;
    writeln!(out, "Power:         {} mW", summary.power.total_power)?;
    writeln!(out, "Area:          {} mm^2", summary.area.total_area_mm2())?;
    Ok(())
}

/// CSV path next to a JSON output path: a trailing `.json` becomes `.csv`,
/// anything else gets `.csv` appended.
pub fn csv_path(output: &Path) -> PathBuf {
    if output.extension().is_some_and(|ext| ext == "json") {
        output.with_extension("csv")
    } else {
        let mut raw = output.as_os_str().to_os_string();
        raw.push(".csv");
        PathBuf::from(raw)
    }
}

pub fn try_write_csv_file(summary: &Summary, output: &Path) -> Result<PathBuf, StatsError> {
    let path = csv_path(output);
    write_with(&path, |w| print_csv(summary, w))?;
    Ok(path)
}

pub fn try_write_json_file(
    summary: &Summary,
    path: &Path,
    pretty: bool,
) -> Result<PathBuf, StatsError> {
    let json = to_json(summary, pretty)?;
    write_with(path, |w| writeln!(w, "{json}"))?;
    Ok(path.to_path_buf())
}

/// Writes the CSV file derived from `output`. Failures are logged, not
/// returned.
pub fn write_csv_file(summary: &Summary, output: &Path) -> Option<PathBuf> {
    log_outcome("CSV", try_write_csv_file(summary, output))
}

/// Writes the JSON summary to `path`. Failures are logged, not returned.
pub fn write_json_file(summary: &Summary, path: &Path, pretty: bool) -> Option<PathBuf> {
    log_outcome("JSON", try_write_json_file(summary, path, pretty))
}

fn log_outcome(kind: &str, result: Result<PathBuf, StatsError>) -> Option<PathBuf> {
    match result {
        Ok(path) => {
            tracing::info!(path = %path.display(), "{kind} statistics written");
            Some(path)
        }
        Err(err) => {
            tracing::warn!(error = %err, "failed to write {kind} statistics");
            None
        }
    }
}

fn write_with<F>(path: &Path, body: F) -> Result<(), StatsError>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    let file = File::create(path).map_err(|e| StatsError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    body(&mut writer)
        .and_then(|()| writer.flush())
        .map_err(|e| StatsError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stall::StallCause;

    fn sample() -> Summary {
        let mut summary = Summary {
            accelerator_name: "vadd".into(),
            ..Summary::default()
        };
        summary.performance = crate::metrics::PerformanceMetrics::collect(1.0, 2.0, 10, 20, 5);
        summary.stalls.record(StallCause::MemoryLatency);
        summary
    }

    #[test]
    fn csv_path_replaces_json_suffix() {
        assert_eq!(csv_path(Path::new("run1.json")), PathBuf::from("run1.csv"));
        assert_eq!(
            csv_path(Path::new("out/run1.json")),
            PathBuf::from("out/run1.csv")
        );
    }

    #[test]
    fn csv_path_appends_otherwise() {
        assert_eq!(csv_path(Path::new("run1")), PathBuf::from("run1.csv"));
        assert_eq!(csv_path(Path::new("run1.txt")), PathBuf::from("run1.txt.csv"));
    }

    #[test]
    fn json_starts_with_version_and_name() {
        let value = to_json_value(&sample());
        let keys: Vec<&String> = value.as_object().unwrap().keys().take(3).collect();
        assert_eq!(keys, ["version", "accelerator_name", "performance"]);
        assert_eq!(value["performance"]["total_cycles"], 20);
        assert_eq!(value["performance"]["executed_nodes"], 14);
        assert_eq!(value["stall_breakdown"]["memory_latency"], 1);
        assert_eq!(value["stall_breakdown"]["dominant_bottleneck"], "memory_latency");
    }

    #[test]
    fn compact_json_has_no_newlines() {
        let json = to_json(&sample(), false).unwrap();
        assert!(!json.contains('\n'));
        let pretty = to_json(&sample(), true).unwrap();
        assert!(pretty.contains('\n'));
    }

    #[test]
    fn csv_has_header_and_stall_rows() {
        let mut buf = Vec::new();
        print_csv(&sample(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("metric,value"));
        assert_eq!(lines.next(), Some("accelerator_name,vadd"));
        assert!(text.contains("\nstall_memory_latency,1\n"));
        assert!(text.contains("\nclock_period_ns,10\n"));
        assert!(text.contains("\nsys_clock_ghz,0.1\n"));
    }

    #[test]
    fn csv_quotes_text_with_commas() {
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\", ok"), "\"say \"\"hi\"\", ok\"");
        assert_eq!(csv_field("plain"), "plain");
    }

    #[test]
    fn summary_report_mentions_bottleneck() {
        let mut buf = Vec::new();
        print_summary(&sample(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("=== Accelerator Summary: vadd ==="));
        assert!(text.contains("Bottleneck:    memory_latency"));
        assert!(text.contains("25.0%"));
    }

    #[test]
    fn unwritable_path_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no_such_dir").join("run1.json");
        assert_eq!(write_csv_file(&sample(), &missing), None);
        assert!(matches!(
            try_write_csv_file(&sample(), &missing),
            Err(StatsError::Io { .. })
        ));
    }
}
