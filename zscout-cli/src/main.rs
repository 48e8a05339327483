//! Z-Scout CLI: serve the research gateway or run the pipeline from a terminal.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Z-Scout: structured research reports from Gemini
#[derive(Parser, Debug)]
#[command(name = "zscout", version, about, long_about = None)]
struct Cli {
    /// Gemini model to use
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Workspace directory
    #[arg(short, long, default_value = ".", global = true)]
    workspace: PathBuf,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the HTTP gateway
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Generate a research report
    Report {
        /// Research query
        query: String,
        /// Force Google Search grounding on
        #[arg(long, conflicts_with = "no_grounding")]
        grounding: bool,
        /// Force Google Search grounding off
        #[arg(long)]
        no_grounding: bool,
        /// Print the full report as JSON instead of Markdown
        #[arg(long)]
        json: bool,
        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Keep the first report even if it is below the quality thresholds
        #[arg(long)]
        skip_quality_retry: bool,
    },
    /// Extract subtopics from a query
    Subtopics {
        /// Research query
        query: String,
        /// Maximum number of subtopics
        #[arg(long)]
        max: Option<usize>,
        /// Report JSON file to derive subtopics from
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Write an abstract for a saved report
    Abstract {
        /// Report JSON file
        report: PathBuf,
        /// Original query, if not stored in the file
        #[arg(long)]
        query: Option<String>,
    },
    /// Research subtopics with grounding
    Scrape {
        /// Main research query
        query: String,
        /// Subtopic to research (repeatable)
        #[arg(short, long = "subtopic", required = true)]
        subtopics: Vec<String>,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Ask a question, optionally about a saved report
    Chat {
        /// Question to ask
        question: String,
        /// Report JSON file to use as context
        #[arg(long)]
        report: Option<PathBuf>,
        /// Enable Google Search grounding
        #[arg(long)]
        grounding: bool,
    },
    /// Manage stored reports
    Reports {
        #[command(subcommand)]
        action: ReportsAction,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ReportsAction {
    /// List stored reports, newest first
    List,
    /// Print a stored report
    Show {
        /// Report ID
        id: String,
        /// Print JSON instead of Markdown
        #[arg(long)]
        json: bool,
    },
    /// Delete a stored report
    Delete {
        /// Report ID
        id: String,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Create a default configuration file
    Init,
    /// Show the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "zscout", "zscout")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "zscout.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let mut config = zscout_core::load_config(Some(&workspace), None)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    if let Some(model) = &cli.model {
        config.gemini.model = model.clone();
    }
    for warning in config.validate() {
        tracing::warn!("{}", warning);
    }

    commands::handle_command(cli.command, config, &workspace).await
}
