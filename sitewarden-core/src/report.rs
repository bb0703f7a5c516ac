// Report presentation: sorting, filtering and export

use crate::script::{Column, ReportRow};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sitewarden_scanner::NodeFailure;
use std::cmp::Ordering;
use std::fs::File;
use std::io::Write;
use std::path::Path;

const MAX_CELL_WIDTH: usize = 48;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
    Csv,
    Markdown,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            "csv" => Some(ReportFormat::Csv),
            "markdown" | "md" => Some(ReportFormat::Markdown),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Text => "txt",
            ReportFormat::Json => "json",
            ReportFormat::Csv => "csv",
            ReportFormat::Markdown => "md",
        }
    }
}

/// Rows of one report run together with their column schema
#[derive(Debug, Clone)]
pub struct ReportTable {
    pub title: String,
    pub columns: Vec<Column>,
    pub rows: Vec<ReportRow>,
}

impl ReportTable {
    pub fn new(title: impl Into<String>, columns: Vec<Column>, rows: Vec<ReportRow>) -> Self {
        Self {
            title: title.into(),
            columns,
            rows,
        }
    }

    pub fn column(&self, key: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.key.eq_ignore_ascii_case(key) || c.title.eq_ignore_ascii_case(key))
    }

    /// Stable sort on one column, numbers compared numerically. Returns
    /// `false` when the column is unknown.
    pub fn sort_by(&mut self, key: &str, descending: bool) -> bool {
        let Some(column) = self.column(key).map(|c| c.key) else {
            return false;
        };

        self.rows.sort_by(|a, b| {
            let ordering = compare_values(a.get(column), b.get(column));
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
        true
    }

    /// Keep rows where any cell contains `text`, ignoring case
    pub fn filter(&mut self, text: &str) {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return;
        }
        let columns = self.columns.clone();
        self.rows.retain(|row| {
            columns
                .iter()
                .any(|c| c.render(row.get(c.key)).to_lowercase().contains(&needle))
        });
    }

    pub fn cell_text(&self, row: &ReportRow, column: &Column) -> String {
        column.render(row.get(column.key))
    }

    pub fn render(&self, format: ReportFormat, errors: &[NodeFailure]) -> Result<String, serde_json::Error> {
        Ok(match format {
            ReportFormat::Text => self.render_text(errors),
            ReportFormat::Json => self.render_json(errors)?,
            ReportFormat::Csv => self.render_csv(),
            ReportFormat::Markdown => self.render_markdown(errors),
        })
    }

    pub fn render_text(&self, errors: &[NodeFailure]) -> String {
        let mut report = String::new();
        let rule = "━".repeat(80);

        report.push_str(&format!("{}\n", rule));
        report.push_str(&format!("  {}\n", self.title.to_uppercase()));
        report.push_str(&format!("{}\n\n", rule));
        report.push_str(&format!("Rows:         {}\n", self.rows.len()));
        report.push_str(&format!("Failed URLs:  {}\n\n", errors.len()));

        if self.rows.is_empty() {
            report.push_str("  (no rows)\n\n");
        } else {
            let cells: Vec<Vec<String>> = self
                .rows
                .iter()
                .map(|row| {
                    self.columns
                        .iter()
                        .map(|c| truncate(&self.cell_text(row, c), MAX_CELL_WIDTH))
                        .collect()
                })
                .collect();

            let widths: Vec<usize> = self
                .columns
                .iter()
                .enumerate()
                .map(|(i, c)| {
                    cells
                        .iter()
                        .map(|r| r[i].chars().count())
                        .chain(std::iter::once(c.title.chars().count()))
                        .max()
                        .unwrap_or(0)
                })
                .collect();

            let header: Vec<String> = self
                .columns
                .iter()
                .zip(&widths)
                .map(|(c, w)| pad(c.title, *w))
                .collect();
            report.push_str(&format!("  {}\n", header.join("  ").trim_end()));

            let underline: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
            report.push_str(&format!("  {}\n", underline.join("  ")));

            for row in &cells {
                let line: Vec<String> = row.iter().zip(&widths).map(|(v, w)| pad(v, *w)).collect();
                report.push_str(&format!("  {}\n", line.join("  ").trim_end()));
            }
            report.push('\n');
        }

        if !errors.is_empty() {
            report.push_str(&format!("{}\n", rule));
            report.push_str("FAILED URLS\n");
            report.push_str(&format!("{}\n\n", rule));
            for failure in errors {
                report.push_str(&format!("  ✗ {}\n    {}\n", failure.url, failure.reason));
            }
            report.push('\n');
        }

        report
    }

    pub fn render_json(&self, errors: &[NodeFailure]) -> Result<String, serde_json::Error> {
        let rows: Vec<Value> = self
            .rows
            .iter()
            .map(|row| {
                let mut cells = serde_json::Map::new();
                cells.insert("web_url".to_string(), Value::String(row.web_url.clone()));
                for column in &self.columns {
                    cells.insert(column.key.to_string(), row.get(column.key).clone());
                }
                Value::Object(cells)
            })
            .collect();

        let json_report = serde_json::json!({
            "report": {
                "metadata": {
                    "generator": "SiteWarden",
                    "version": env!("CARGO_PKG_VERSION"),
                    "generated_at": chrono::Utc::now().to_rfc3339(),
                    "title": self.title,
                },
                "columns": self.columns.iter().map(|c| serde_json::json!({
                    "key": c.key,
                    "title": c.title,
                })).collect::<Vec<_>>(),
                "summary": {
                    "total_rows": self.rows.len(),
                    "failed_urls": errors.len(),
                },
                "rows": rows,
                "errors": errors,
            }
        });

        serde_json::to_string_pretty(&json_report)
    }

    pub fn render_csv(&self) -> String {
        let mut out = String::new();
        let header: Vec<String> = self.columns.iter().map(|c| csv_field(c.title)).collect();
        out.push_str(&header.join(","));
        out.push_str("\r\n");

        for row in &self.rows {
            let line: Vec<String> = self
                .columns
                .iter()
                .map(|c| csv_field(&self.cell_text(row, c)))
                .collect();
            out.push_str(&line.join(","));
            out.push_str("\r\n");
        }
        out
    }

    pub fn render_markdown(&self, errors: &[NodeFailure]) -> String {
        let mut out = format!("# {}\n\n", self.title);

        let header: Vec<&str> = self.columns.iter().map(|c| c.title).collect();
        out.push_str(&format!("| {} |\n", header.join(" | ")));
        out.push_str(&format!("|{}\n", " --- |".repeat(self.columns.len())));

        for row in &self.rows {
            let line: Vec<String> = self
                .columns
                .iter()
                .map(|c| self.cell_text(row, c).replace('|', "\\|").replace('\n', " "))
                .collect();
            out.push_str(&format!("| {} |\n", line.join(" | ")));
        }

        if !errors.is_empty() {
            out.push_str("\n## Failed URLs\n\n");
            for failure in errors {
                out.push_str(&format!("- `{}`: {}\n", failure.url, failure.reason));
            }
        }
        out
    }
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .unwrap_or(0.0)
            .partial_cmp(&y.as_f64().unwrap_or(0.0))
            .unwrap_or(Ordering::Equal),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::String(x), Value::String(y)) => x.to_lowercase().cmp(&y.to_lowercase()),
        (x, y) => x.to_string().cmp(&y.to_string()),
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn truncate(value: &str, width: usize) -> String {
    let value = value.replace('\n', " ");
    if value.chars().count() <= width {
        value
    } else {
        let kept: String = value.chars().take(width.saturating_sub(1)).collect();
        format!("{}…", kept)
    }
}

fn pad(value: &str, width: usize) -> String {
    let len = value.chars().count();
    format!("{}{}", value, " ".repeat(width.saturating_sub(len)))
}
