//! Markdown and JSON rendering.
//!
//! JSON output is the report itself. Markdown output turns each report into
//! a small document with a table per section.

use crate::models::{
    BuildSummary, CountReport, DetailsReport, Report, TodayReport, TopDaysReport, TotalsReport,
};
use anyhow::{Context, Result};
use std::path::Path;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = match report {
        Report::Totals(r) => generate_totals_section(r),
        Report::Today(r) => generate_today_section(r),
        Report::Count(r) => generate_count_section(r),
        Report::Details(r) => generate_details_section(r),
        Report::TopDays(r) => generate_top_days_section(r),
        Report::Build(r) => generate_build_section(r),
    };

    output.push_str(&generate_footer());
    output
}

fn generate_totals_section(report: &TotalsReport) -> String {
    let mut section = String::new();

    section.push_str(&format!("# Holiday Totals {}\n\n", report.year));
    section.push_str(&format!("- **Scope:** {}\n", report.scope));
    section.push_str(&format!(
        "- **Countries:** {} of {} answered\n",
        report.metrics.countries_ok, report.metrics.countries_attempted
    ));
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n",
        report.metrics.duration_ms as f64 / 1000.0
    ));
    section.push_str(&format!(
        "- **Updated:** {}\n\n",
        report.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    section.push_str("| Code | Country | Holidays |\n");
    section.push_str("|------|---------|----------|\n");
    for (code, total) in &report.totals {
        let count = total
            .count
            .map(|c| c.to_string())
            .unwrap_or_else(|| "n/a".to_string());
        section.push_str(&format!("| {} | {} | {} |\n", code, total.name, count));
    }
    section.push('\n');

    section
}

fn generate_today_section(report: &TodayReport) -> String {
    let mut section = String::new();

    section.push_str(&format!(
        "# Public Holidays Today ({})\n\n",
        report.generated_at.format("%Y-%m-%d")
    ));

    if report.today.is_empty() {
        section.push_str("No country has a public holiday today.\n\n");
    } else {
        for code in &report.today {
            section.push_str(&format!("- {}\n", code));
        }
        section.push('\n');
    }

    if let Some(metrics) = report.metrics {
        section.push_str(&format!(
            "*Checked {} of {} countries in {}ms.*\n\n",
            metrics.succeeded, metrics.attempted, metrics.elapsed_ms
        ));
    }
    section.push_str(&format!("*Fresh for {}s.*\n\n", report.ttl_seconds));

    section
}

fn generate_count_section(report: &CountReport) -> String {
    let name = report.name.as_deref().unwrap_or(&report.iso2);
    format!(
        "# {} ({})\n\n**{}** {} holidays in {}-{:02}.\n\n",
        name, report.iso2, report.count, report.scope, report.year, report.month
    )
}

fn generate_details_section(report: &DetailsReport) -> String {
    let mut section = String::new();

    section.push_str(&format!("# Holidays in {} ({})\n\n", report.iso2, report.year));

    if report.holidays.is_empty() {
        section.push_str("No holidays listed.\n\n");
        return section;
    }

    section.push_str("| Date | Name | Local Name | Types | Scope |\n");
    section.push_str("|------|------|------------|-------|-------|\n");
    for holiday in &report.holidays {
        let scope = if holiday.global {
            "national".to_string()
        } else {
            holiday
                .counties
                .as_ref()
                .map(|c| c.join(", "))
                .unwrap_or_else(|| "regional".to_string())
        };
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            holiday.date,
            holiday.name.as_deref().unwrap_or(""),
            holiday.local_name.as_deref().unwrap_or(""),
            holiday.types.join(", "),
            scope
        ));
    }
    section.push('\n');

    section
}

fn generate_top_days_section(report: &TopDaysReport) -> String {
    let mut section = String::new();

    section.push_str(&format!("# Busiest Holiday Dates {}\n\n", report.year));

    for (rank, day) in report.top.iter().enumerate() {
        section.push_str(&format!(
            "{}. **{}** ({} countries)\n",
            rank + 1,
            day.date,
            day.count
        ));
        for item in &day.items {
            section.push_str(&format!("   - {} ({}): {}\n", item.country, item.iso2, item.name));
        }
    }
    section.push('\n');

    section
}

fn generate_build_section(summary: &BuildSummary) -> String {
    let mut section = String::new();

    section.push_str(&format!("# Totals {} rebuilt\n\n", summary.year));
    section.push_str(&format!("- **File:** `{}`\n", summary.path.display()));
    section.push_str(&format!("- **Countries:** {}\n", summary.countries));
    section.push_str(&format!(
        "- **Fetched:** {} of {}\n",
        summary.metrics.countries_ok, summary.metrics.countries_attempted
    ));
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n\n",
        summary.metrics.duration_ms as f64 / 1000.0
    ));

    section
}

fn generate_footer() -> String {
    format!(
        "---\n\n*Generated by holiday-atlas v{}. Data from Calendarific and Nager.Date.*\n",
        env!("CARGO_PKG_VERSION")
    )
}

/// Generate the JSON rendering of a report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize report to JSON")
}

/// Write rendered output to a file.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}
