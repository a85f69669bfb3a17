//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::Scope;
use crate::providers::normalize_iso2;
use clap::Parser;
use std::path::PathBuf;

/// Lowest and highest years any operation accepts.
pub const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1900..=2100;

/// Holiday Atlas - public-holiday totals, today-sets and rankings
///
/// Fetches holiday data from Calendarific and Nager.Date, fans requests out
/// over every country with bounded concurrency, and prints compact JSON.
///
/// Examples:
///   holiday-atlas totals --year 2025
///   holiday-atlas today --data-dir public/data
///   holiday-atlas count --country FR --year 2025 --month 7 --scope public
///   holiday-atlas details --country US --year 2025 --format markdown
///   holiday-atlas build-totals --year 2025 --data-dir public/data
///   holiday-atlas --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Operation to run
    #[arg(value_enum, required_unless_present = "init_config")]
    pub command: Option<Command>,

    /// Year to report on (defaults to the current year)
    #[arg(short, long, value_name = "YEAR")]
    pub year: Option<i32>,

    /// Month for `count` (1-12, defaults to the current month)
    #[arg(long, value_name = "MONTH")]
    pub month: Option<u32>,

    /// ISO 3166-1 alpha-2 country code for `count` and `details`
    #[arg(long, value_name = "ISO2")]
    pub country: Option<String>,

    /// Which holiday types `count` includes
    #[arg(long, value_enum, default_value_t = Scope::National)]
    pub scope: Scope,

    /// Raw Calendarific `type` filter passed upstream by `count`
    #[arg(long = "type", value_name = "TYPE")]
    pub kind: Option<String>,

    /// Restrict `totals`/`today` to these countries (comma-separated ISO2)
    ///
    /// Example: --countries AL,FR,US
    #[arg(long, value_name = "CODES", value_delimiter = ',')]
    pub countries: Option<Vec<String>>,

    /// Directory holding totals-<year>.json and the other data files
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Output file path (prints to stdout when omitted)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (json, markdown)
    #[arg(long, default_value = "json", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Number of concurrent upstream requests
    ///
    /// Overrides [today] for the today command and [aggregator] otherwise,
    /// as do the two timeout flags.
    #[arg(long, value_name = "NUM")]
    pub concurrency: Option<usize>,

    /// Timeout for a single upstream request, in milliseconds
    #[arg(long, value_name = "MS")]
    pub item_timeout_ms: Option<u64>,

    /// Timeout for a whole fan-out batch, in milliseconds
    #[arg(long, value_name = "MS")]
    pub overall_timeout_ms: Option<u64>,

    /// Calendarific API key
    #[arg(long, env = "CALENDARIFIC_API_KEY", hide_env_values = true)]
    pub calendarific_key: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .holiday-atlas.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Exit with code 2 when a fan-out batch had failed items
    #[arg(long)]
    pub fail_on_partial: bool,

    /// Generate a default .holiday-atlas.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Operations the tool can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Command {
    /// National holiday count of every country (Calendarific)
    Totals,
    /// Countries with a public holiday today (Nager.Date)
    Today,
    /// Holiday count of one country and month (Calendarific)
    Count,
    /// Holiday list of one country and year (Nager.Date)
    Details,
    /// Busiest holiday dates from local data files
    TopDays,
    /// Rebuild totals-<year>.json from Nager.Date
    BuildTotals,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON format (default)
    #[default]
    Json,
    /// Markdown format
    Markdown,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(year) = self.year {
            if !YEAR_RANGE.contains(&year) {
                return Err(format!(
                    "Year must be between {} and {}",
                    YEAR_RANGE.start(),
                    YEAR_RANGE.end()
                ));
            }
        }

        if let Some(month) = self.month {
            if !(1..=12).contains(&month) {
                return Err("Month must be between 1 and 12".to_string());
            }
        }

        if matches!(self.command, Some(Command::Count) | Some(Command::Details)) {
            match self.country.as_deref() {
                None => return Err("--country is required for count and details".to_string()),
                Some(code) if normalize_iso2(code).is_none() => {
                    return Err(format!("Invalid ISO2 country code: {}", code))
                }
                Some(_) => {}
            }
        }

        if let Some(ref codes) = self.countries {
            if let Some(bad) = codes.iter().find(|c| normalize_iso2(c).is_none()) {
                return Err(format!("Invalid ISO2 country code: {}", bad));
            }
        }

        // Validate concurrency
        if self.concurrency == Some(0) {
            return Err("Concurrency must be at least 1".to_string());
        }

        if self.item_timeout_ms == Some(0) || self.overall_timeout_ms == Some(0) {
            return Err("Timeouts must be at least 1 millisecond".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// The `--countries` override, normalized.
    pub fn country_override(&self) -> Option<Vec<String>> {
        self.countries
            .as_ref()
            .map(|codes| codes.iter().filter_map(|c| normalize_iso2(c)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            command: Some(Command::Totals),
            year: Some(2025),
            month: None,
            country: None,
            scope: Scope::National,
            kind: None,
            countries: None,
            data_dir: None,
            output: None,
            format: OutputFormat::Json,
            concurrency: None,
            item_timeout_ms: None,
            overall_timeout_ms: None,
            calendarific_key: None,
            config: None,
            verbose: false,
            quiet: false,
            fail_on_partial: false,
            init_config: false,
        }
    }

    #[test]
    fn test_validation_year_range() {
        let mut args = make_args();
        assert!(args.validate().is_ok());
        args.year = Some(1899);
        assert!(args.validate().is_err());
        args.year = Some(2101);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_count_needs_country() {
        let mut args = make_args();
        args.command = Some(Command::Count);
        assert!(args.validate().is_err());

        args.country = Some("FRA".to_string());
        assert!(args.validate().is_err());

        args.country = Some("fr".to_string());
        assert!(args.validate().is_ok());

        args.month = Some(13);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_knobs() {
        let mut args = make_args();
        args.concurrency = Some(0);
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.item_timeout_ms = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_country_override_normalizes() {
        let mut args = make_args();
        args.countries = Some(vec!["al".to_string(), "FR".to_string()]);
        assert!(args.validate().is_ok());
        assert_eq!(
            args.country_override(),
            Some(vec!["AL".to_string(), "FR".to_string()])
        );

        args.countries = Some(vec!["ALB".to_string()]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_parse_from_command_line() {
        let args = Args::try_parse_from([
            "holiday-atlas",
            "count",
            "--country",
            "FR",
            "--year",
            "2025",
            "--month",
            "7",
            "--scope",
            "public",
        ])
        .unwrap();
        assert_eq!(args.command, Some(Command::Count));
        assert_eq!(args.scope, Scope::Public);
        assert_eq!(args.month, Some(7));

        let args = Args::try_parse_from(["holiday-atlas", "build-totals"]).unwrap();
        assert_eq!(args.command, Some(Command::BuildTotals));
    }
}
