// Report generation from analysis results

use colored::Colorize;
use pagescope_scanner::AnalysisResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

const HEAVY_RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";
const LIGHT_RULE: &str = "────────────────────────────────────────────────────────────────────────────────";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
    Markdown,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Text => "txt",
            ReportFormat::Json => "json",
            ReportFormat::Markdown => "md",
        }
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            "markdown" | "md" => Ok(ReportFormat::Markdown),
            other => Err(format!("unsupported report format: {}", other)),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportFormat::Text => f.write_str("text"),
            ReportFormat::Json => f.write_str("json"),
            ReportFormat::Markdown => f.write_str("markdown"),
        }
    }
}

/// Render `results` in `format`.
pub fn generate_report(
    format: ReportFormat,
    results: &[AnalysisResult],
) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(results)),
        ReportFormat::Json => generate_json_report(results),
        ReportFormat::Markdown => Ok(generate_markdown_report(results)),
    }
}

fn format_timestamp(result: &AnalysisResult) -> String {
    result.analyzed_at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn display_title(title: &str) -> &str {
    if title.is_empty() { "(none)" } else { title }
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

pub fn generate_text_report(results: &[AnalysisResult]) -> String {
    let mut report = String::new();

    report.push_str(HEAVY_RULE);
    report.push('\n');
    report.push_str(&format!("{}\n", "                          PAGESCOPE ANALYSIS REPORT".bold()));
    report.push_str(HEAVY_RULE);
    report.push_str("\n\n");

    if results.is_empty() {
        report.push_str("No pages analyzed.\n\n");
    }

    for (idx, result) in results.iter().enumerate() {
        if idx > 0 {
            report.push_str(LIGHT_RULE);
            report.push_str("\n\n");
        }

        report.push_str(&format!("URL:            {}\n", result.url.bright_white()));
        report.push_str(&format!("Analyzed:       {}\n", format_timestamp(result)));
        report.push_str(&format!(
            "HTML version:   {}\n",
            result.html_version.as_str().cyan()
        ));
        report.push_str(&format!("Title:          {}\n", display_title(&result.title)));

        let login = if result.has_login_form {
            yes_no(true).yellow().bold()
        } else {
            yes_no(false).normal()
        };
        report.push_str(&format!("Login form:     {}\n\n", login));

        report.push_str(&format!("{}\n", "HEADINGS".bright_blue().bold()));
        for (level, count) in result.headings.levels() {
            report.push_str(&format!("  {}  {}\n", level, count));
        }
        report.push_str(&format!("  total  {}\n\n", result.headings.total()));

        report.push_str(&format!("{}\n", "LINKS".bright_blue().bold()));
        report.push_str(&format!("  Internal      {}\n", result.links.internal));
        report.push_str(&format!("  External      {}\n", result.links.external));
        let inaccessible = result.links.inaccessible.to_string();
        let inaccessible = if result.links.inaccessible > 0 {
            inaccessible.red().bold()
        } else {
            inaccessible.green()
        };
        report.push_str(&format!("  Inaccessible  {}\n\n", inaccessible));
    }

    report.push_str(HEAVY_RULE);
    report.push('\n');
    report.push_str(&format!(
        "Generated by pagescope {} - {} page(s) analyzed\n",
        env!("CARGO_PKG_VERSION"),
        results.len()
    ));

    report
}

/// Pretty JSON in the `AnalysisResult` schema: a single object for one result, an array
/// otherwise.
pub fn generate_json_report(results: &[AnalysisResult]) -> Result<String, serde_json::Error> {
    match results {
        [single] => serde_json::to_string_pretty(single),
        many => serde_json::to_string_pretty(many),
    }
}

/// Table cells stay on one row: line breaks become spaces and pipes are escaped.
fn markdown_cell(text: &str) -> String {
    text.replace(['\r', '\n'], " ").replace('|', "\\|")
}

pub fn generate_markdown_report(results: &[AnalysisResult]) -> String {
    let mut report = String::from("# Pagescope Analysis Report\n\n");

    for result in results {
        report.push_str(&format!("## {}\n\n", result.url));
        report.push_str("| Field | Value |\n|---|---|\n");
        report.push_str(&format!("| Analyzed | {} |\n", format_timestamp(result)));
        report.push_str(&format!("| HTML version | {} |\n", result.html_version));
        report.push_str(&format!(
            "| Title | {} |\n",
            markdown_cell(display_title(&result.title))
        ));
        report.push_str(&format!("| Login form | {} |\n\n", yes_no(result.has_login_form)));

        report.push_str("### Headings\n\n| Level | Count |\n|---|---|\n");
        for (level, count) in result.headings.levels() {
            report.push_str(&format!("| {} | {} |\n", level, count));
        }
        report.push('\n');

        report.push_str("### Links\n\n| Kind | Count |\n|---|---|\n");
        report.push_str(&format!("| Internal | {} |\n", result.links.internal));
        report.push_str(&format!("| External | {} |\n", result.links.external));
        report.push_str(&format!("| Inaccessible | {} |\n\n", result.links.inaccessible));
    }

    report.push_str(&format!(
        "_Generated by pagescope {}_\n",
        env!("CARGO_PKG_VERSION")
    ));
    report
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}
