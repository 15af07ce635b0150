//! DI Log Analyzer CLI Application
//!
//! This is the command-line interface for the DI telemetry reports.
//! It uses the di-log-analyzer library and adds:
//! - Configuration loading (config.toml + flag overrides)
//! - Preprocessed topology cache management
//! - Telemetry file selection
//! - Report file output

use anyhow::Result;
use clap::{Args as ClapArgs, Parser, Subcommand};
use di_log_analyzer::{DataSource, ReportKind};
use std::path::PathBuf;

mod cache;
mod commands;
mod config;

use commands::RunContext;

/// DI Log Analyzer - Reports over gateway digital-input telemetry
#[derive(Parser, Debug)]
#[command(name = "di-log-cli")]
#[command(about = "Generate device activity reports from DI telemetry exports", long_about = None)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Directory holding the JSON exports (overrides config)
    #[arg(long, value_name = "DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Directory reports are written to (overrides config)
    #[arg(long, value_name = "DIR", global = true)]
    output_dir: Option<PathBuf>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pins never seen active in the selected telemetry
    NotWorking(ActivityArgs),
    /// Latest activation time of every pin
    LastTimeWork(ActivityArgs),
    /// Pins assigned to more than one device on a channel
    RepeatSignal,
    /// Last catalog update of every device
    LastUpdate,
    /// Rebuild the preprocessed topology cache
    Prepare,
}

#[derive(ClapArgs, Debug)]
struct ActivityArgs {
    /// Telemetry file to analyse, with or without .json (can be repeated; default: all)
    #[arg(short, long = "file", value_name = "NAME")]
    files: Vec<String>,

    /// List device pins without telemetry using placeholder values
    #[arg(long)]
    show_unmatched: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("DI Log Analyzer CLI v{}", env!("CARGO_PKG_VERSION"));
    log::debug!("Using analyzer library v{}", di_log_analyzer::VERSION);

    let Some(command) = &args.command else {
        println!("DI Log Analyzer - No report selected");
        println!("\nQuick Start:");
        println!("  di-log-cli not-working");
        println!("  di-log-cli last-time-work --file airaConnect.machineryMessages.2024-03");
        println!("  di-log-cli repeat-signal");
        println!("\nUse --help for more options");
        return Ok(());
    };

    let mut app_config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => config::AppConfig::default(),
    };

    if let Some(dir) = &args.data_dir {
        app_config.input.data_dir = dir.clone();
    }
    if let Some(dir) = &args.output_dir {
        app_config.output.output_dir = dir.clone();
    }
    if let Command::NotWorking(activity) | Command::LastTimeWork(activity) = command {
        app_config.report.show_unmatched |= activity.show_unmatched;
    }

    let ctx = RunContext {
        source: DataSource::new(&app_config.input.data_dir, app_config.input.analyzer.clone())?,
        output_dir: app_config.output.output_dir.clone(),
        cache_path: app_config.cache_path(),
        options: app_config.report_options()?,
    };

    match command {
        Command::NotWorking(activity) => {
            let path = commands::run_activity(&ctx, ReportKind::NotWorking, &activity.files)?;
            println!("✓ Report written: {:?}", path);
        }
        Command::LastTimeWork(activity) => {
            let path = commands::run_activity(&ctx, ReportKind::LastTimeWork, &activity.files)?;
            println!("✓ Report written: {:?}", path);
        }
        Command::RepeatSignal => {
            let path = commands::run_repeat_signal(&ctx)?;
            println!("✓ Report written: {:?}", path);
        }
        Command::LastUpdate => {
            let path = commands::run_last_update(&ctx)?;
            println!("✓ Report written: {:?}", path);
        }
        Command::Prepare => {
            commands::run_prepare(&ctx)?;
            println!("✓ Topology preprocessed: {:?}", ctx.cache_path);
        }
    }

    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
