//! Report requests, stored metadata, and the set of known templates.

use std::{fmt, str::FromStr};

use gazette_api_types::ReportRequest;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::domain::{error::DomainError, slug::ReportId};

/// Minimum topic length, counted in characters rather than bytes.
pub const MIN_TOPIC_CHARS: usize = 3;

/// Templates a report can be rendered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportTemplate {
    ReportV1,
    ReportV1Sections,
}

impl ReportTemplate {
    pub const ALL: [ReportTemplate; 2] = [ReportTemplate::ReportV1, ReportTemplate::ReportV1Sections];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportTemplate::ReportV1 => "report_v1",
            ReportTemplate::ReportV1Sections => "report_v1_sections",
        }
    }
}

impl fmt::Display for ReportTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportTemplate {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let name = value.trim();
        let name = name.strip_suffix(".html").unwrap_or(name);
        Self::ALL
            .into_iter()
            .find(|template| template.as_str() == name)
            .ok_or_else(|| {
                let known = Self::ALL.map(|template| template.as_str()).join(", ");
                DomainError::validation(format!("unknown template `{value}` (known: {known})"))
            })
    }
}

/// Metadata record stored next to each rendered report as `meta.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMeta {
    pub report_id: String,
    pub title: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ReportMeta {
    pub fn new(report_id: &ReportId, title: &str, tags: &[String], created_at: OffsetDateTime) -> Self {
        Self {
            report_id: report_id.as_str().to_string(),
            title: title.to_string(),
            created_at,
            tags: tags.to_vec(),
        }
    }
}

/// `YYYY-MM-DD` rendering used in page headers and topic prefixes.
pub fn iso_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// Check a request before anything is rendered or written.
pub fn validate_request(request: &ReportRequest) -> Result<ReportTemplate, DomainError> {
    if request.topic.chars().count() < MIN_TOPIC_CHARS {
        return Err(DomainError::validation("topic too short"));
    }

    request.template.parse()
}
