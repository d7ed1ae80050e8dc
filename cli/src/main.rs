//! settle CLI — replay recorded tree traces through the relabeling engine.

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use settle_core::command::Command;
use settle_core::response::Response;
use settle_core::sys::Sys;
use settle_core::trace::{self, Trace};
use settle_core::SettleSettings;


/// Order-stable relabeling of a live item tree.
#[derive(Parser)]
#[command(name = "settle")]
#[command(about = "Replay recorded item-tree traces through the settle relabeling engine")]
#[command(version)]
struct Cli {
    /// Log at debug level (overrides SETTLE_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file (YAML or JSON).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}


#[derive(Subcommand)]
enum Commands {
    /// Replay a trace file and print the result.
    Replay {
        trace: PathBuf,

        #[arg(long, value_enum, default_value_t = View::Labels)]
        show: View,

        /// Export annotations, one per line; overrides the trace's own.
        #[arg(long)]
        annotations: Option<PathBuf>,
    },
    /// Print the effective settings.
    Config,
    /// Show help on a topic.
    Topics { topic: Option<String> },
}


#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum View {
    Labels,
    Snapshot,
    Export,
    Commits,
    Status,
}


fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Err(e) => {
            eprintln!("settle: {:#}", e);
            process::exit(1);
        }
    }
}


fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("SETTLE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}


fn run(cli: Cli) -> Result<String> {
    let settings = load_settings(cli.config.as_deref())?;

    match cli.command {
        Commands::Replay {
            trace,
            show,
            annotations,
        } => replay(&trace, show, annotations.as_deref(), settings),
        Commands::Config => serde_yaml::to_string(&settings).context("Failed to render settings"),
        Commands::Topics { topic } => Ok(settle_core::help::help_text(topic.as_deref())),
    }
}


fn replay(
    path: &Path,
    show: View,
    annotations: Option<&Path>,
    settings: SettleSettings,
) -> Result<String> {
    let recorded = Trace::from_file(path)?;
    let annotations = match annotations {
        Some(file) => std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read annotations from {}", file.display()))?
            .lines()
            .map(str::to_string)
            .collect(),
        None => recorded.annotations.clone(),
    };

    let report = trace::replay(&recorded, settings)
        .with_context(|| format!("Replay of {} failed", path.display()))?;
    tracing::debug!(commits = report.commits.len(), finished_ms = report.finished_ms, "replayed trace");

    if show == View::Commits {
        let lines = report
            .commits
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(lines.join("\n"));
    }

    let cmd = match show {
        View::Labels => Command::Labels,
        View::Snapshot => Command::Snapshot,
        View::Export => Command::Export { annotations },
        View::Status | View::Commits => Command::Status,
    };
    let mut sys = Sys::new(report.scheduler);
    match sys.execute(cmd, report.finished_ms) {
        Response::Ok { output } => Ok(output),
        Response::Error { message } => bail!(message),
    }
}


/// Settings from `--config`, else `settings.yaml` in the config directory.
/// A missing file in the config directory yields the defaults; a missing
/// explicit file is an error.
fn load_settings(explicit: Option<&Path>) -> Result<SettleSettings> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                bail!("Settings file not found: {}", path.display());
            }
            path.to_path_buf()
        }
        None => match resolve_config_dir() {
            Some(dir) => dir.join("settings.yaml"),
            None => return Ok(SettleSettings::default()),
        },
    };
    SettleSettings::load(&path).with_context(|| format!("Invalid settings in {}", path.display()))
}


fn resolve_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("SETTLE_CONFIG_DIR") {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|dir| dir.join("settle"))
}
