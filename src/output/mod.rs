use chrono::Utc;
use clap::ValueEnum;
use serde::Serialize;

use crate::checks::{CheckResult, CheckSeverity};

/// Output format for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Standardized JSON envelope for every ghbox report
#[derive(Debug, Clone, Serialize)]
pub struct GhboxOutput {
    pub command: String,
    pub success: bool,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<Issue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl GhboxOutput {
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            success: true,
            timestamp: Utc::now().to_rfc3339(),
            issues: Vec::new(),
            data: None,
        }
    }

    pub fn with_success(mut self, success: bool) -> Self {
        self.success = success;
        self
    }

    pub fn with_issues(mut self, issues: Vec<Issue>) -> Self {
        self.issues = issues;
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Check result as it appears in JSON output
#[derive(Debug, Clone, Serialize)]
pub struct Issue {
    pub name: String,
    pub category: String,
    pub severity: CheckSeverity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
}

impl From<&CheckResult> for Issue {
    fn from(result: &CheckResult) -> Self {
        Self {
            name: result.name.clone(),
            category: result.category.clone(),
            severity: result.severity,
            message: result.message.clone(),
            suggested_fix: result.suggested_fix.clone(),
        }
    }
}

/// Error envelope printed by the binaries in JSON mode
pub fn error_json(error: &anyhow::Error, hint: Option<&str>) -> String {
    let value = serde_json::json!({
        "success": false,
        "error": error.to_string(),
        "hint": hint,
        "timestamp": Utc::now().to_rfc3339()
    });
    serde_json::to_string_pretty(&value).unwrap_or_default()
}
