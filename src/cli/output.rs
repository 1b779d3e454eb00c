//! Output formatting for CLI commands

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;

use crate::domain::PlainRecord;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Output helper for consistent formatting
pub struct Output {
    format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Prints a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Text => println!("{}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "success": true,
                        "message": message
                    })
                );
            }
        }
    }

    /// Prints structured data
    pub fn data<T: Serialize>(&self, data: &T) {
        match self.format {
            OutputFormat::Text => {
                // Callers normally print their own text; fall back to pretty JSON
                if let Ok(json) = serde_json::to_string_pretty(data) {
                    println!("{}", json);
                }
            }
            OutputFormat::Json => {
                if let Ok(json) = serde_json::to_string(data) {
                    println!("{}", json);
                }
            }
        }
    }

    /// Prints an entity in its plain-record form
    pub fn record<T: PlainRecord>(&self, entity: &T) -> Result<()> {
        self.data(&Value::Object(entity.to_record()?));
        Ok(())
    }

    /// Prints a list of entities in their plain-record form
    pub fn records<T: PlainRecord>(&self, entities: &[T]) -> Result<()> {
        let records = entities
            .iter()
            .map(|entity| entity.to_record().map(Value::Object))
            .collect::<Result<Vec<_>, _>>()?;
        self.data(&records);
        Ok(())
    }

    /// Returns true if using JSON format
    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }
}

/// Formats hours for tables, e.g. `12.5h`
pub fn hours(value: f64) -> String {
    format!("{:.1}h", value)
}

/// Formats a share in [0, 1] as a percentage
pub fn percent(value: f64) -> String {
    format!("{:.0}%", value * 100.0)
}
