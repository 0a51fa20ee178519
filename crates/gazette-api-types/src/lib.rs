//! Wire types shared by the Gazette HTTP API and its clients.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_TEMPLATE: &str = "report_v1";

fn default_template() -> String {
    DEFAULT_TEMPLATE.to_string()
}

/// Request body for `POST /reports`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub topic: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_template")]
    pub template: String,
    #[serde(default)]
    pub data: ReportData,
}

impl ReportRequest {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            tags: Vec::new(),
            template: default_template(),
            data: ReportData::default(),
        }
    }
}

/// Free-form payload handed to the report template.
///
/// `subtitle`, `summary` and `sections` have dedicated slots in the templates; any other
/// key is kept in `extra` and shown as a details list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<ReportSection>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSection {
    pub heading: String,
    #[serde(default)]
    pub body: String,
}

/// Response body for `POST /reports`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateReportResponse {
    pub report_id: String,
    pub view: String,
}

/// Response body for `POST /rebuild-archive`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildArchiveResponse {
    pub count: usize,
    pub index: String,
}

/// One row of the archive listing returned by `GET /reports`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    pub report_id: String,
    pub title: String,
    pub created_at: String,
}
