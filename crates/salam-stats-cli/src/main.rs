//! Accelerator statistics replay CLI.
//!
//! Provides the `salam-stats` binary. `replay` feeds a recorded JSON Lines
//! event trace through one accelerator and finalizes it exactly as the
//! simulator would, printing the summary report to stdout.
//!
//! Log output goes to stderr and is filtered through `RUST_LOG`. Debug flags
//! are merged from the config file, `SALAM_DEBUG_FLAGS` and `--debug-flags`.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use salam_stats::{Accelerator, DebugFlags, Finalized, StatsConfig, StatsContext, StatsError};

/// Accelerator statistics tools.
#[derive(Parser)]
#[command(name = "salam-stats", about = "Accelerator dataflow statistics tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Replay an event trace and emit the run summary.
    Replay {
        /// Path to the JSON Lines event trace.
        #[arg(short, long)]
        trace: PathBuf,

        /// JSON engine configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// JSON summary output path (overrides the config file).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Comma separated debug flags, e.g. "SALAMResults,SALAMResultsCSV".
        #[arg(long)]
        debug_flags: Option<String>,

        /// Accelerator name used in the report.
        #[arg(short, long, default_value = "accelerator")]
        name: String,

        /// Clock period in nanoseconds.
        #[arg(long, default_value_t = 10)]
        clock_period: u64,

        /// Setup time in nanoseconds reported alongside simulation time.
        #[arg(long, default_value_t = 0.0)]
        setup_ns: f64,

        /// Run without a statistics engine (reduced legacy report).
        #[arg(long)]
        no_stats: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Replay {
            trace,
            config,
            output,
            debug_flags,
            name,
            clock_period,
            setup_ns,
            no_stats,
        } => {
            let options = ReplayOptions {
                trace,
                config,
                output,
                debug_flags,
                name,
                clock_period,
                setup_ns,
                no_stats,
            };
            let exit_code = match run_replay(&options) {
                Ok(()) => 0,
                Err(err) => {
                    eprintln!("Error: {}", err);
                    exit_code_for(&err)
                }
            };
            process::exit(exit_code);
        }
    }
}

struct ReplayOptions {
    trace: PathBuf,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
    debug_flags: Option<String>,
    name: String,
    clock_period: u64,
    setup_ns: f64,
    no_stats: bool,
}

/// Exit code: 1 = bad input or configuration, 3 = I/O error.
fn exit_code_for(err: &StatsError) -> i32 {
    match err {
        StatsError::Io { .. } => 3,
        StatsError::Serialization(_) | StatsError::Config { .. } | StatsError::Trace { .. } => 1,
    }
}

fn load_config(options: &ReplayOptions) -> Result<StatsConfig, StatsError> {
    let mut config = match &options.config {
        Some(path) => StatsConfig::from_json_file(path)?,
        None => StatsConfig::default(),
    };
    if let Some(output) = &options.output {
        config.output_file = Some(output.clone());
    }
    let cli_flags = options
        .debug_flags
        .as_deref()
        .map(DebugFlags::parse)
        .unwrap_or_default();
    config.debug_flags = config
        .debug_flags
        .union(DebugFlags::from_env())
        .union(cli_flags);
    config.validate()?;
    Ok(config)
}

fn open_trace(path: &Path) -> Result<Vec<salam_stats::TraceEvent>, StatsError> {
    let file = File::open(path).map_err(|source| StatsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    salam_stats::parse_trace(BufReader::new(file))
}

fn run_replay(options: &ReplayOptions) -> Result<(), StatsError> {
    let config = load_config(options)?;
    let events = open_trace(&options.trace)?;
    tracing::info!(
        events = events.len(),
        trace = %options.trace.display(),
        "replaying trace"
    );

    let mut accelerator = if options.no_stats {
        Accelerator::without_stats(options.name.as_str())
    } else {
        Accelerator::new(options.name.as_str(), StatsContext::new(config))
    };
    accelerator.replay(&events);

    let sim_ns = accelerator.total_cycles() as f64 * options.clock_period as f64;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match accelerator.finalize(options.setup_ns, sim_ns, options.clock_period, &mut out) {
        Finalized::Structured(summary) => {
            salam_stats::report::print_summary(&summary, &mut out)
                .map_err(|source| StatsError::Io {
                    path: PathBuf::from("<stdout>"),
                    source,
                })?;
        }
        // The legacy report was already printed by finalize.
        Finalized::Legacy(_) => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> ReplayOptions {
        ReplayOptions {
            trace: PathBuf::from("trace.jsonl"),
            config: None,
            output: None,
            debug_flags: None,
            name: "acc".into(),
            clock_period: 10,
            setup_ns: 0.0,
            no_stats: false,
        }
    }

    #[test]
    fn exit_codes() {
        let io_err = StatsError::Io {
            path: PathBuf::from("x"),
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(exit_code_for(&io_err), 3);
        let trace_err = StatsError::Trace {
            line: 1,
            reason: "bad".into(),
        };
        assert_eq!(exit_code_for(&trace_err), 1);
    }

    #[test]
    fn cli_output_and_flags_override_config() {
        let mut opts = options();
        opts.output = Some(PathBuf::from("run1.json"));
        opts.debug_flags = Some("SALAMResultsCSV".into());
        let config = load_config(&opts).unwrap();
        assert_eq!(config.output_file, Some(PathBuf::from("run1.json")));
        assert!(config.debug_flags.csv_results);
    }

    #[test]
    fn missing_trace_is_io_error() {
        let err = open_trace(Path::new("/no/such/trace.jsonl")).unwrap_err();
        assert_eq!(exit_code_for(&err), 3);
    }

    #[test]
    fn replay_writes_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let trace = dir.path().join("trace.jsonl");
        std::fs::write(
            &trace,
            "{\"event\":\"dependency\",\"producer\":1,\"consumer\":2}\n\
             {\"event\":\"cycle_end\",\"cycle\":2}\n",
        )
        .unwrap();
        let mut opts = options();
        opts.trace = trace;
        opts.output = Some(dir.path().join("run1.json"));
        opts.debug_flags = Some("SALAMResultsCSV".into());
        run_replay(&opts).unwrap();
        assert!(dir.path().join("run1.json").exists());
        assert!(dir.path().join("run1.csv").exists());
    }
}
