//! Archive index: scan stored report metadata and render the listing page.
//!
//! A damaged or unreadable `meta.json` never fails the rebuild. The record
//! falls back to what the storage key reveals (the report id) and an empty
//! creation time, which sorts it after every dated report.

use std::sync::Arc;

use gazette_api_types::ArchiveEntry;
use metrics::counter;
use serde_json::{Map, Value};
use thiserror::Error;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::{info, warn};

use crate::application::storage::{HTML_CONTENT_TYPE, ObjectStore, StorageError, put_text};
use crate::presentation::views::{
    ArchiveIndexTemplate, ArchiveItemView, TemplateRenderError, render_template,
};

pub const REPORTS_PREFIX: &str = "reports/";
const META_FILE_NAME: &str = "meta.json";
const UNKNOWN_REPORT_ID: &str = "unknown";
const DATE_BADGE_CHARS: usize = 10;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to scan the report archive")]
    Storage(#[from] StorageError),
    #[error("failed to render the archive index")]
    Render(#[from] TemplateRenderError),
}

#[derive(Debug, Clone)]
pub struct ArchiveOptions {
    /// Storage key the index page is written to.
    pub index_key: String,
    /// Heading and document title of the index page.
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRecord {
    pub report_id: String,
    pub title: String,
    pub created_at: String,
}

impl ArchiveRecord {
    fn from_key(key: &str) -> Self {
        let report_id = extract_report_id(key);
        Self {
            title: derived_title(&report_id),
            report_id,
            created_at: String::new(),
        }
    }

    fn from_document(key: &str, document: &Map<String, Value>) -> Self {
        let report_id =
            non_empty_str(document, "report_id").unwrap_or_else(|| extract_report_id(key));
        let title = non_empty_str(document, "title").unwrap_or_else(|| derived_title(&report_id));
        let created_at = document
            .get("created_at")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Self {
            report_id,
            title,
            created_at,
        }
    }

    fn item_view(&self) -> ArchiveItemView {
        let date_badge = (!self.created_at.is_empty())
            .then(|| self.created_at.chars().take(DATE_BADGE_CHARS).collect());
        ArchiveItemView {
            href: format!("{REPORTS_PREFIX}{}/index.html", self.report_id),
            title: self.title.clone(),
            date_badge,
        }
    }
}

impl From<ArchiveRecord> for ArchiveEntry {
    fn from(record: ArchiveRecord) -> Self {
        Self {
            report_id: record.report_id,
            title: record.title,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuildOutcome {
    pub count: usize,
    pub index: String,
}

#[derive(Clone)]
pub struct ArchiveService {
    store: Arc<dyn ObjectStore>,
    options: ArchiveOptions,
}

impl ArchiveService {
    pub fn new(store: Arc<dyn ObjectStore>, options: ArchiveOptions) -> Self {
        Self { store, options }
    }

    pub fn index_key(&self) -> &str {
        &self.options.index_key
    }

    /// Every stored report, newest first.
    pub async fn records(&self) -> Result<Vec<ArchiveRecord>, ArchiveError> {
        let keys = self.store.list(REPORTS_PREFIX).await?;
        let mut records = Vec::new();

        for key in keys.iter().filter(|key| is_meta_key(key)) {
            let record = match self.store.get(key).await {
                Ok(bytes) => parse_record(key, &bytes),
                Err(err) => {
                    counter!("gazette_archive_corrupt_records_total").increment(1);
                    warn!(
                        target = "gazette::archive",
                        key = %key,
                        error = %err,
                        "metadata unreadable; deriving record from key"
                    );
                    ArchiveRecord::from_key(key)
                }
            };
            records.push(record);
        }

        sort_newest_first(&mut records);
        Ok(records)
    }

    /// Regenerate the index page from stored metadata.
    pub async fn rebuild(&self) -> Result<RebuildOutcome, ArchiveError> {
        self.rebuild_at(OffsetDateTime::now_utc()).await
    }

    pub async fn rebuild_at(&self, now: OffsetDateTime) -> Result<RebuildOutcome, ArchiveError> {
        let records = self.records().await?;
        let generated_at = now.format(&Rfc3339).unwrap_or_else(|_| now.to_string());

        let html = render_template(ArchiveIndexTemplate {
            title: self.options.title.clone(),
            items: records.iter().map(ArchiveRecord::item_view).collect(),
            generated_at,
        })?;

        put_text(
            self.store.as_ref(),
            &self.options.index_key,
            &html,
            HTML_CONTENT_TYPE,
        )
        .await?;

        counter!("gazette_archive_rebuilds_total").increment(1);
        info!(
            target = "gazette::archive",
            backend = self.store.backend(),
            count = records.len(),
            index = %self.options.index_key,
            "archive index rebuilt"
        );

        Ok(RebuildOutcome {
            count: records.len(),
            index: self.options.index_key.clone(),
        })
    }
}

fn is_meta_key(key: &str) -> bool {
    key.rsplit(['/', '\\']).next() == Some(META_FILE_NAME)
}

fn parse_record(key: &str, bytes: &[u8]) -> ArchiveRecord {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(document)) => ArchiveRecord::from_document(key, &document),
        Ok(_) => {
            counter!("gazette_archive_corrupt_records_total").increment(1);
            warn!(
                target = "gazette::archive",
                key = %key,
                "metadata is not a JSON object; deriving record from key"
            );
            ArchiveRecord::from_key(key)
        }
        Err(err) => {
            counter!("gazette_archive_corrupt_records_total").increment(1);
            warn!(
                target = "gazette::archive",
                key = %key,
                error = %err,
                "metadata is not valid JSON; deriving record from key"
            );
            ArchiveRecord::from_key(key)
        }
    }
}

fn non_empty_str(document: &Map<String, Value>, field: &str) -> Option<String> {
    document
        .get(field)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Sort by the stored `created_at` string, newest first.
///
/// RFC 3339 strings in UTC order lexicographically; records without a
/// timestamp sink to the bottom. Ties keep their listing order.
pub fn sort_newest_first(records: &mut [ArchiveRecord]) {
    records.sort_by(|left, right| right.created_at.cmp(&left.created_at));
}

/// Report id embedded in a storage key: the segment after the first `reports`.
pub fn extract_report_id(key: &str) -> String {
    let mut segments = key.split(['/', '\\']).filter(|segment| !segment.is_empty());
    segments
        .by_ref()
        .find(|segment| *segment == "reports")
        .and_then(|_| segments.next())
        .unwrap_or(UNKNOWN_REPORT_ID)
        .to_string()
}

/// Human title recovered from a report id by dropping the date suffix.
pub fn derived_title(report_id: &str) -> String {
    report_id
        .rsplit_once('-')
        .map_or(report_id, |(head, _)| head)
        .replace('-', " ")
}
