//! Rendering of summaries for display.
//!
//! Profilers produce [`Summary`] values whose numbers are already formatted
//! with [`format_count`] and [`format_decimal`]. The formatters here lay a
//! summary out as aligned text, JSON or a Markdown table.
//!
//! # Examples
//!
//! ```rust
//! use table_explorer::analyzers::Summary;
//! use table_explorer::formatters::{HumanFormatter, SummaryFormatter};
//!
//! let summary = Summary::new()
//!     .with("Name of Table", "employees")
//!     .with("Number of Rows", "1,024");
//! let text = HumanFormatter::new().format("employees", &summary).unwrap();
//! assert!(text.contains("Number of Rows"));
//! ```

use serde::Serialize;

use crate::analyzers::types::{Summary, SummaryEntry};
use crate::error::Result;

/// Integer with `,` thousands separators, e.g. `1,234,567`.
pub fn format_count(value: u64) -> String {
    group_thousands(&value.to_string())
}

/// Fixed decimal places with `,` thousands separators, e.g. `1,234.500`.
pub fn format_decimal(value: f64, places: usize) -> String {
    if !value.is_finite() {
        return value.to_string().to_lowercase();
    }
    let formatted = format!("{:.*}", places, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };
    let sign = if value.is_sign_negative() { "-" } else { "" };
    match frac_part {
        Some(frac) => format!("{sign}{}.{frac}", group_thousands(int_part)),
        None => format!("{sign}{}", group_thousands(int_part)),
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Formats a summary into a string representation.
pub trait SummaryFormatter {
    fn format(&self, title: &str, summary: &Summary) -> Result<String>;
}

/// Aligned two-column plain text.
#[derive(Debug, Clone)]
pub struct HumanFormatter {
    separator: String,
}

impl Default for HumanFormatter {
    fn default() -> Self {
        Self {
            separator: " : ".to_string(),
        }
    }
}

impl HumanFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text placed between label and value.
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }
}

impl SummaryFormatter for HumanFormatter {
    fn format(&self, title: &str, summary: &Summary) -> Result<String> {
        let width = summary
            .entries
            .iter()
            .map(|e| e.description.chars().count())
            .max()
            .unwrap_or(0);

        let mut output = String::new();
        output.push_str(title);
        output.push('\n');
        output.push_str(&"=".repeat(title.chars().count()));
        output.push('\n');
        for entry in &summary.entries {
            output.push_str(&format!(
                "{:<width$}{}{}\n",
                entry.description, self.separator, entry.value
            ));
        }
        Ok(output)
    }
}

/// JSON object with a title and an ordered list of entries.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    pretty: bool,
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct JsonSummary<'a> {
    title: &'a str,
    entries: &'a [SummaryEntry],
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self { pretty: true }
    }

    /// Single-line output.
    pub fn compact() -> Self {
        Self { pretty: false }
    }
}

impl SummaryFormatter for JsonFormatter {
    fn format(&self, title: &str, summary: &Summary) -> Result<String> {
        let doc = JsonSummary {
            title,
            entries: &summary.entries,
        };
        let json = if self.pretty {
            serde_json::to_string_pretty(&doc)?
        } else {
            serde_json::to_string(&doc)?
        };
        Ok(json)
    }
}

/// Markdown heading followed by a two-column table.
#[derive(Debug, Clone)]
pub struct MarkdownFormatter {
    heading_level: u8,
}

impl Default for MarkdownFormatter {
    fn default() -> Self {
        Self { heading_level: 2 }
    }
}

impl MarkdownFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_heading_level(mut self, level: u8) -> Self {
        self.heading_level = level.clamp(1, 6);
        self
    }
}

impl SummaryFormatter for MarkdownFormatter {
    fn format(&self, title: &str, summary: &Summary) -> Result<String> {
        let mut output = format!("{} {title}\n\n", "#".repeat(self.heading_level as usize));
        output.push_str("| Description | Value |\n");
        output.push_str("|-------------|-------|\n");
        for entry in &summary.entries {
            output.push_str(&format!(
                "| {} | {} |\n",
                entry.description.replace('|', "\\|"),
                entry.value.replace('|', "\\|")
            ));
        }
        Ok(output)
    }
}
