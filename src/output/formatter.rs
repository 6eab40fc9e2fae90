//! Output formatters for run summaries
//!
//! Provides the end-of-run table, a one-line summary and JSON output.

use std::path::Path;

use super::console::Palette;
use crate::models::{CaseRecord, RunSummary};

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    JsonPretty,
    Summary,
}

impl OutputFormat {
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" => Some(OutputFormat::Table),
            "json" => Some(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Some(OutputFormat::JsonPretty),
            "summary" => Some(OutputFormat::Summary),
            _ => None,
        }
    }
}

/// Summary formatter
pub struct SummaryFormatter {
    format: OutputFormat,
    palette: Palette,
}

impl SummaryFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            palette: Palette::new(true),
        }
    }

    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }

    /// Format the final run summary
    pub fn format_summary(&self, summary: &RunSummary, output_dir: &Path, log_file: Option<&Path>) -> String {
        match self.format {
            OutputFormat::Table => self.format_summary_table(summary, output_dir, log_file),
            OutputFormat::Json => serde_json::to_string(summary).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(summary).unwrap_or_default(),
            OutputFormat::Summary => self.format_summary_brief(summary),
        }
    }

    /// Format one case line for the detailed results list
    pub fn format_record(&self, record: &CaseRecord) -> String {
        let p = &self.palette;
        let (icon, status) = if record.success {
            ("✅", p.green("PASS"))
        } else {
            ("❌", p.red("FAIL"))
        };
        let elapsed = record
            .elapsed_secs
            .map(|secs| format!(" ({secs:.2}s)"))
            .unwrap_or_default();

        format!(
            "  {} {} - {} - {}{}",
            icon,
            p.white(&format!("ID {}", record.id)),
            p.cyan(&record.codename),
            status,
            elapsed
        )
    }

    fn format_summary_table(&self, summary: &RunSummary, output_dir: &Path, log_file: Option<&Path>) -> String {
        let p = &self.palette;
        let rule = p.bold(&p.cyan(&"=".repeat(60)));
        let rate = summary.success_rate();
        let mut output = String::new();

        output.push('\n');
        output.push_str(&rule);
        output.push('\n');
        output.push_str(&p.bold(&p.white("📊 EXECUTION SUMMARY 📊")));
        output.push('\n');
        output.push_str(&rule);
        output.push('\n');

        output.push_str(&format!(
            "{} {}\n",
            p.bold("📈 Total test cases:"),
            p.white(&summary.total.to_string())
        ));
        output.push_str(&format!(
            "{} {}\n",
            p.bold("✅ Successful:"),
            p.green(&summary.successful.to_string())
        ));
        output.push_str(&format!(
            "{} {}\n",
            p.bold("❌ Failed:"),
            p.red(&summary.failed.to_string())
        ));
        output.push_str(&format!(
            "{} {}\n",
            p.bold("📊 Success rate:"),
            p.rate(rate, &format!("{rate:.1}%"))
        ));

        if summary.has_timings() {
            output.push_str(&format!(
                "{} {}\n",
                p.bold("⏱️  Total execution time:"),
                p.white(&format!("{:.2}s", summary.total_time))
            ));
            output.push_str(&format!(
                "{} {}\n",
                p.bold("📊 Average execution time:"),
                p.white(&format!("{:.2}s", summary.avg_time))
            ));
            output.push_str(&format!(
                "{} {}\n",
                p.bold("⚡ Fastest test case:"),
                p.green(&format!("{:.2}s", summary.min_time))
            ));
            output.push_str(&format!(
                "{} {}\n",
                p.bold("🐌 Slowest test case:"),
                p.red(&format!("{:.2}s", summary.max_time))
            ));
        }

        output.push_str(&format!(
            "\n{} {}\n",
            p.bold("📁 Results saved in:"),
            p.blue(&format!("{}/", output_dir.display()))
        ));
        if let Some(log_file) = log_file {
            output.push_str(&format!(
                "{} {}\n",
                p.bold("📝 Log file:"),
                p.blue(&log_file.display().to_string())
            ));
        }

        if !summary.details.is_empty() {
            output.push_str(&format!("\n{}\n", p.bold("📋 Detailed Results:")));
            for record in &summary.details {
                output.push_str(&self.format_record(record));
                output.push('\n');
            }
        }

        output.push('\n');
        output.push_str(&rule);
        output.push('\n');
        output
    }

    fn format_summary_brief(&self, summary: &RunSummary) -> String {
        format!(
            "{}/{} successful ({:.1}%) - total {:.2}s, avg {:.2}s, min {:.2}s, max {:.2}s",
            summary.successful,
            summary.total,
            summary.success_rate(),
            summary.total_time,
            summary.avg_time,
            summary.min_time,
            summary.max_time
        )
    }
}
