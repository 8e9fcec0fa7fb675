//! CLI Output Formatting.
//!
//! Renders messages, key-value pairs and tables as styled text or JSON.

use console::style;
use serde::Serialize;
use std::collections::BTreeMap;

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT FORMAT
// ═══════════════════════════════════════════════════════════════════════════════

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON format
    Json,
    /// Pretty JSON format
    JsonPretty,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Ok(OutputFormat::JsonPretty),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT FORMATTER
// ═══════════════════════════════════════════════════════════════════════════════

/// Output formatter for CLI
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    /// Create new formatter
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Get format
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json | OutputFormat::JsonPretty)
    }

    /// Print success message
    pub fn success(&self, message: &str) {
        self.message("success", &style("✓").green().to_string(), message);
    }

    /// Print error message
    pub fn error(&self, message: &str) {
        if self.is_json() {
            self.print_json(&serde_json::json!({ "status": "error", "message": message }));
        } else {
            eprintln!("{} {}", style("✗").red(), message);
        }
    }

    /// Print warning message
    pub fn warning(&self, message: &str) {
        self.message("warning", &style("⚠").yellow().to_string(), message);
    }

    /// Print info message
    pub fn info(&self, message: &str) {
        self.message("info", &style("ℹ").blue().to_string(), message);
    }

    fn message(&self, status: &str, marker: &str, message: &str) {
        println!("{}", self.render_message(status, marker, message));
    }

    fn render_message(&self, status: &str, marker: &str, message: &str) -> String {
        if self.is_json() {
            self.render_json(&serde_json::json!({ "status": status, "message": message }))
        } else {
            format!("{} {}", marker, message)
        }
    }

    /// Print key-value pairs
    pub fn kv(&self, pairs: &[(&str, String)]) {
        if self.is_json() {
            let map: BTreeMap<&str, &str> = pairs.iter().map(|(k, v)| (*k, v.as_str())).collect();
            self.print_json(&map);
            return;
        }

        for (key, value) in pairs {
            println!("  {}: {}", style(key).bold(), style(value).green());
        }
    }

    /// Print section header
    pub fn section(&self, title: &str) {
        if !self.is_json() {
            println!();
            println!("{}", style(format!("=== {} ===", title)).cyan().bold());
        }
    }

    /// Print serializable data as JSON regardless of format
    pub fn data<T: Serialize>(&self, data: &T) {
        self.print_json(data);
    }

    /// Print table
    pub fn table(&self, headers: &[&str], rows: &[Vec<String>]) {
        if self.is_json() {
            let data: Vec<BTreeMap<&str, &str>> = rows
                .iter()
                .map(|row| {
                    headers
                        .iter()
                        .zip(row.iter())
                        .map(|(h, v)| (*h, v.as_str()))
                        .collect()
                })
                .collect();
            self.print_json(&data);
        } else {
            print!("{}", render_table(headers, rows));
        }
    }

    fn print_json<T: Serialize>(&self, data: &T) {
        println!("{}", self.render_json(data));
    }

    fn render_json<T: Serialize>(&self, data: &T) -> String {
        let output = if matches!(self.format, OutputFormat::JsonPretty) {
            serde_json::to_string_pretty(data)
        } else {
            serde_json::to_string(data)
        };
        output.unwrap_or_default()
    }
}

/// Render a plain text table with padded columns
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    if headers.is_empty() {
        return String::new();
    }

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let line = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{:width$}", cell, width = widths[i]))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    out.push_str(&line(headers.to_vec()));
    out.push('\n');
    out.push_str(&widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("-+-"));
    out.push('\n');
    for row in rows {
        out.push_str(&line(row.iter().take(widths.len()).map(String::as_str).collect()));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parse() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("TEXT".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("json-pretty".parse::<OutputFormat>().unwrap(), OutputFormat::JsonPretty);
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_info_message() {
        let text = OutputFormatter::new(OutputFormat::Text);
        assert_eq!(text.render_message("info", "i", "2 of 5 steps rejected"), "i 2 of 5 steps rejected");

        let json = OutputFormatter::new(OutputFormat::Json);
        let rendered = json.render_message("info", "i", "2 of 5 steps rejected");
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["status"], "info");
        assert_eq!(value["message"], "2 of 5 steps rejected");
    }

    #[test]
    fn test_render_table() {
        let table = render_table(
            &["account", "debt"],
            &[
                vec!["alice".into(), "1000".into()],
                vec!["bob".into(), "5".into()],
            ],
        );

        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "account | debt");
        assert_eq!(lines[1], "--------+-----");
        assert_eq!(lines[2], "alice   | 1000");
        assert_eq!(lines[3], "bob     | 5");
    }

    #[test]
    fn test_render_empty_headers() {
        assert!(render_table(&[], &[]).is_empty());
    }
}
