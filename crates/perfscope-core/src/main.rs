//! Perfscope CLI
//!
//! Command-line interface for the Perfscope trace console.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use perfscope::console::Console;
use perfscope::logging::{self, LogTarget};
use perfscope::models::{QueryResult, SessionStatus, Severity};
use perfscope::{api::HttpTraceService, Config};

/// Perfscope - capture device traces and query them
#[derive(Parser)]
#[command(name = "perfscope")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "PERFSCOPE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Trace service base URL (overrides api.base_url)
    #[arg(long, global = true, env = "PERFSCOPE_API_URL")]
    api_url: Option<String>,

    /// Output format (for commands that support it)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the TUI dashboard
    Dashboard,

    /// List attached devices
    Devices,

    /// Manage the query catalog
    Queries {
        #[command(subcommand)]
        command: QueriesCommands,
    },

    /// Capture traces
    Trace {
        #[command(subcommand)]
        command: TraceCommands,
    },

    /// Run queries against a captured trace
    Query {
        #[command(subcommand)]
        command: QueryCommands,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
enum QueriesCommands {
    /// List built-in and custom queries
    List,

    /// Save a custom query
    Add {
        /// Display name
        #[arg(long)]
        name: String,

        /// SQL text
        #[arg(long)]
        sql: String,
    },

    /// Delete a custom query
    Remove {
        /// Query ID to delete
        id: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum TraceCommands {
    /// Start a capture and wait for the trace to become usable
    Start {
        /// Device to capture on (first attached device if omitted)
        #[arg(long)]
        device: Option<String>,
    },
}

#[derive(Subcommand)]
enum QueryCommands {
    /// Execute a query and wait for its result
    Run {
        /// Trace ID to query
        #[arg(long)]
        trace: String,

        /// Query ID to execute
        #[arg(long)]
        query: String,

        /// Give up after this long (e.g. "90s", "5m")
        #[arg(long, default_value = "5m", value_parser = parse_duration)]
        wait: Duration,
    },
}

fn parse_duration(s: &str) -> Result<Duration, String> {
    humantime::parse_duration(s).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        generate_completions(shell);
        return ExitCode::SUCCESS;
    }

    let config = match load_config(cli.config.as_deref(), cli.api_url.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} loading configuration: {e:#}", style("Error").red().bold());
            return ExitCode::FAILURE;
        }
    };

    // The dashboard owns the terminal, so it logs to files
    let target = match cli.command {
        Commands::Dashboard => LogTarget::File(config.log_directory()),
        _ => LogTarget::Stderr,
    };
    let _log_guard = match logging::init(&config.logging, cli.verbose, target) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{} initializing logging: {e}", style("Error").red().bold());
            return ExitCode::FAILURE;
        }
    };

    info!(base_url = %config.api.base_url, "Configuration loaded");
    let result = run(config, cli.command, cli.format).await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e:#}", style("Error:").red().bold());
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&std::path::Path>, api_url: Option<&str>) -> anyhow::Result<Config> {
    let mut config = Config::load(path)?;
    if let Some(url) = api_url {
        config.api.base_url = url.to_string();
        config.validate()?;
    }
    Ok(config)
}

async fn run(config: Config, command: Commands, format: OutputFormat) -> anyhow::Result<()> {
    let service = HttpTraceService::new(&config.api).context("creating trace service client")?;
    let console = Console::new(config, Arc::new(service));

    match command {
        Commands::Dashboard => run_dashboard(console).await,
        Commands::Devices => run_devices(console, format).await,
        Commands::Queries { command } => run_queries(console, command, format).await,
        Commands::Trace { command } => run_trace(console, command, format).await,
        Commands::Query { command } => run_query(console, command, format).await,
        Commands::Completions { .. } => Ok(()),
    }
}

#[cfg(feature = "tui")]
async fn run_dashboard(console: Console) -> anyhow::Result<()> {
    let mut app = perfscope::tui::App::new(console);
    app.run().await?;
    Ok(())
}

#[cfg(not(feature = "tui"))]
async fn run_dashboard(_console: Console) -> anyhow::Result<()> {
    bail!("this build of perfscope has no dashboard; rebuild with the `tui` feature")
}

async fn run_devices(mut console: Console, format: OutputFormat) -> anyhow::Result<()> {
    let spinner = spinner("Fetching devices…");
    console.refresh_devices();
    let limit = console.config().api.request_timeout * 2;
    let waited = console.run_until(limit, |c| !c.devices().is_refreshing()).await;
    spinner.finish_and_clear();
    waited?;
    check_notification(&console)?;

    let devices = console.devices().devices();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(devices)?),
        OutputFormat::Text if devices.is_empty() => println!("No devices found."),
        OutputFormat::Text => {
            for device in devices {
                let marker = if console.devices().selected() == Some(device) { "*" } else { " " };
                println!("{} {device}", style(marker).cyan());
            }
        }
    }
    Ok(())
}

async fn run_queries(
    mut console: Console,
    command: QueriesCommands,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let limit = console.config().api.request_timeout * 3;

    match command {
        QueriesCommands::List => {
            let spinner = spinner("Fetching queries…");
            console.refresh_catalog();
            let waited = console.run_until(limit, |c| !c.catalog().is_refreshing()).await;
            spinner.finish_and_clear();
            waited?;
            check_notification(&console)?;

            let entries = console.catalog().entries();
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(entries)?),
                OutputFormat::Text => {
                    let headers = ["ID".to_string(), "NAME".to_string(), "KIND".to_string()];
                    let rows: Vec<Vec<String>> = entries
                        .iter()
                        .map(|q| {
                            let kind = if q.builtin { "builtin" } else { "custom" };
                            vec![q.id.clone(), q.name.clone(), kind.to_string()]
                        })
                        .collect();
                    print_table(&headers, &rows);
                }
            }
        }
        QueriesCommands::Add { name, sql } => {
            let before = console.notifier().sequence();
            console.add_query(&name, &sql)?;
            let spinner = spinner("Saving query…");
            let waited = console
                .run_until(limit, |c| {
                    c.notifier().sequence() > before && !c.catalog().is_refreshing()
                })
                .await;
            spinner.finish_and_clear();
            waited?;
            report(&console)?;
        }
        QueriesCommands::Remove { id, yes } => {
            if !yes {
                let confirmed = dialoguer::Confirm::new()
                    .with_prompt(format!("Delete query '{id}'?"))
                    .default(false)
                    .interact()?;
                if !confirmed {
                    println!("Aborted.");
                    return Ok(());
                }
            }

            let before = console.notifier().sequence();
            console.remove_query(&id)?;
            let spinner = spinner("Deleting query…");
            let waited = console
                .run_until(limit, |c| {
                    c.notifier().sequence() > before && !c.catalog().is_refreshing()
                })
                .await;
            spinner.finish_and_clear();
            waited?;
            report(&console)?;
        }
    }
    Ok(())
}

async fn run_trace(
    mut console: Console,
    command: TraceCommands,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let TraceCommands::Start { device } = command;
    let timeout = console.config().api.request_timeout;

    let device = match device {
        Some(device) => device,
        None => {
            console.refresh_devices();
            console
                .run_until(timeout * 2, |c| !c.devices().is_refreshing())
                .await?;
            check_notification(&console)?;
            console
                .devices()
                .selected()
                .map(|d| d.as_str().to_string())
                .ok_or_else(|| anyhow!("no devices attached"))?
        }
    };

    console.start_trace(&device)?;
    let spinner = spinner(&format!("Capturing on {device}…"));
    let limit = console.config().session.capture_window + timeout * 2;
    let waited = console
        .run_until(limit, |c| c.session().status() != SessionStatus::Capturing)
        .await;
    spinner.finish_and_clear();
    waited?;
    check_notification(&console)?;

    let session = console.session().session();
    if session.status != SessionStatus::Ready {
        bail!("capture on {device} did not produce a trace");
    }
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(session)?),
        OutputFormat::Text => {
            let trace_id = session.id.as_deref().unwrap_or_default();
            let readiness = if session.confirmed { "confirmed" } else { "assumed" };
            println!("{} trace {} ({readiness})", style("Ready:").green().bold(), style(trace_id).cyan());
        }
    }
    Ok(())
}

async fn run_query(
    mut console: Console,
    command: QueryCommands,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let QueryCommands::Run { trace, query, wait } = command;

    console.execute(&trace, &query)?;
    let spinner = spinner(&format!("Running {query}…"));
    let waited = console
        .run_until(wait, |c| c.jobs().state().is_terminal())
        .await;
    spinner.finish_and_clear();
    waited?;
    check_notification(&console)?;

    let empty = QueryResult::default();
    let result = console.jobs().result().unwrap_or(&empty);
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(result)?),
        OutputFormat::Text if result.is_empty() => println!("Query returned no rows."),
        OutputFormat::Text => {
            print_table(&result.header_labels(), &result.display_rows());
            println!("{}", style(format!("{} row(s)", result.row_count())).dim());
        }
    }
    Ok(())
}

// Helper functions

fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(template) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        bar.set_style(template);
    }
    bar.enable_steady_tick(Duration::from_millis(100));
    bar.set_message(message.to_string());
    bar
}

/// Fail when the operation ended in an error notification
fn check_notification(console: &Console) -> anyhow::Result<()> {
    let note = console.notifier().current();
    if note.sequence > 0 && note.severity == Severity::Error {
        bail!("{}", note.message);
    }
    Ok(())
}

/// Print the final notification, failing on errors
fn report(console: &Console) -> anyhow::Result<()> {
    check_notification(console)?;
    let note = console.notifier().current();
    if note.sequence > 0 {
        println!("{}", style(note.message).green());
    }
    Ok(())
}

fn print_table(headers: &[String], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
    };

    println!("{}", style(line(headers)).bold());
    for row in rows {
        println!("{}", line(row));
    }
}

fn generate_completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "perfscope", &mut io::stdout());
}
