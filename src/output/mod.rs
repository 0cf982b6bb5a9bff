pub mod console;
pub mod json;
pub mod sarif;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::rules::Verdict;

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Console,
    Json,
    Sarif,
}

impl OutputFormat {
    pub fn from_str_lenient(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "console" | "text" => Some(Self::Console),
            "json" => Some(Self::Json),
            "sarif" => Some(Self::Sarif),
            _ => None,
        }
    }
}

/// Render a verdict into the specified format.
pub fn render(verdict: &Verdict, format: OutputFormat, target_name: &str) -> Result<String> {
    match format {
        OutputFormat::Console => Ok(console::render(verdict, target_name)),
        OutputFormat::Json => json::render(verdict, target_name),
        OutputFormat::Sarif => sarif::render(verdict, target_name),
    }
}
