//! Holiday Atlas - public-holiday aggregation across every country
//!
//! A CLI tool that fans requests out to Calendarific and Nager.Date with
//! bounded concurrency and per-request and overall time budgets, then
//! reports totals, today-sets, per-country lookups and busiest dates.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime or validation error (bad input, missing key, IO, etc.)
//!   2 - A fan-out batch had failed countries and --fail-on-partial was set

mod analysis;
mod cache;
mod cli;
mod config;
mod fanout;
mod models;
mod providers;
mod report;
mod service;

use anyhow::{Context, Result};
use cli::{Args, Command, OutputFormat};
use config::{Config, CONFIG_FILE};
use models::Report;
use service::{HolidayService, ServiceCaches};
use std::path::PathBuf;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("Holiday Atlas v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", redacted(&args));

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .holiday-atlas.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to tune concurrency, timeouts, endpoints and cache lifetimes.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Debug view of the arguments without the API key.
fn redacted(args: &Args) -> Args {
    let mut args = args.clone();
    if args.calendarific_key.is_some() {
        args.calendarific_key = Some("***".to_string());
    }
    args
}

/// Run the selected command. Returns the exit code (0 or 2).
async fn run(args: Args) -> Result<i32> {
    let Some(command) = args.command else {
        anyhow::bail!("No command given");
    };

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate()?;

    let api_key = service::resolve_api_key(args.calendarific_key.clone());
    let service = HolidayService::new(config, api_key, ServiceCaches::memory())
        .context("Failed to initialize HTTP client")?
        .with_progress(!args.quiet);

    let report = run_command(&service, command, &args).await?;

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report),
    };

    match service.config().general.output.as_deref().map(PathBuf::from) {
        Some(path) => {
            report::write_report(&output, &path)?;
            if !args.quiet {
                eprintln!("✅ Report saved to: {}", path.display());
            }
        }
        None => println!("{}", output),
    }

    if args.fail_on_partial && report.is_partial() {
        eprintln!("\n⛔ Some countries could not be fetched. Failing (exit code 2).");
        return Ok(2);
    }

    Ok(0)
}

/// Dispatch one command to the service.
async fn run_command(service: &HolidayService, command: Command, args: &Args) -> Result<Report> {
    let year = service::resolve_year(args.year)?;
    let countries = args.country_override();

    let report = match command {
        Command::Totals => {
            if !args.quiet {
                eprintln!("📥 Collecting national holiday totals for {}...", year);
            }
            Report::Totals(service.totals(year, countries.as_deref()).await?)
        }
        Command::Today => Report::Today(service.today(year, countries.as_deref()).await?),
        Command::Count => {
            let iso2 = service::validate_iso2(args.country.as_deref().unwrap_or_default())?;
            let month = service::resolve_month(args.month)?;
            Report::Count(
                service
                    .count(&iso2, year, month, args.scope, args.kind.as_deref())
                    .await?,
            )
        }
        Command::Details => {
            let iso2 = service::validate_iso2(args.country.as_deref().unwrap_or_default())?;
            Report::Details(service.details(&iso2, year).await?)
        }
        Command::TopDays => Report::TopDays(service.top_days(year)?),
        Command::BuildTotals => {
            if !args.quiet {
                eprintln!("📥 Rebuilding totals for {} from Nager.Date...", year);
            }
            Report::Build(service.build_totals(year).await?)
        }
    };

    if report.is_partial() {
        warn!("Some countries returned no data; their entries are empty");
    }

    Ok(report)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
