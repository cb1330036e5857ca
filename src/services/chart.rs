//! Interpretation of chart blocks extracted from model replies.
//!
//! The extractor only guarantees valid JSON. This module decides whether that
//! JSON is a chart the terminal can summarize.

use serde_json::Value as JsonValue;
use std::fmt;

/// Kind of chart requested by the model
#[derive(Debug, Clone, PartialEq)]
pub enum ChartKind {
    /// Categorical bar chart
    Bar,
    /// Radial comparison
    Radar,
    /// Time-series line
    Line,
    Unsupported(String),
}

impl ChartKind {
    fn from_wire(value: &str) -> Self {
        match value {
            "bar" => Self::Bar,
            "radar" => Self::Radar,
            "line" => Self::Line,
            other => Self::Unsupported(other.to_string()),
        }
    }

    #[must_use]
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported(_))
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bar => f.write_str("bar"),
            Self::Radar => f.write_str("radar"),
            Self::Line => f.write_str("line"),
            Self::Unsupported(kind) => write!(f, "unsupported ({kind})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataPoint {
    pub label: String,
    pub value: f64,
}

/// A structured visualization descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct ChartPayload {
    pub kind: ChartKind,
    pub title: String,
    pub data: Vec<DataPoint>,
}

impl ChartPayload {
    /// Reads a chart from extracted JSON.
    ///
    /// Returns `None` when the `type` field or the `data` array is missing.
    /// Points without a label or a numeric value are skipped.
    #[must_use]
    pub fn from_value(value: &JsonValue) -> Option<Self> {
        let kind = value.get("type")?.as_str()?;
        let points = value.get("data")?.as_array()?;
        let title = value
            .get("title")
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_string();

        let data = points
            .iter()
            .filter_map(|point| {
                let label = match point.get("name")? {
                    JsonValue::String(name) => name.clone(),
                    JsonValue::Number(number) => number.to_string(),
                    _ => return None,
                };
                let value = point.get("value")?.as_f64()?;
                Some(DataPoint { label, value })
            })
            .collect();

        Some(Self {
            kind: ChartKind::from_wire(kind),
            title,
            data,
        })
    }

    /// One-line summary for terminal output
    #[must_use]
    pub fn describe(&self) -> String {
        if !self.kind.is_supported() {
            return format!("Unsupported chart type: {}", self.kind);
        }
        let points = self
            .data
            .iter()
            .map(|point| format!("{}={}", point.label, point.value))
            .collect::<Vec<_>>()
            .join(", ");
        format!("[{} chart] {}: {}", self.kind, self.title, points)
    }
}
