//! Daily batch: seed topics, create one report per topic, refresh the archive.

use std::sync::Arc;

use gazette_api_types::{ReportData, ReportRequest, ReportSection};
use time::{Date, OffsetDateTime};
use tracing::{info, warn};

use crate::application::archive::{ArchiveError, RebuildOutcome};
use crate::application::reports::ReportService;
use crate::application::topics::TopicGenerator;
use crate::domain::reports::{ReportTemplate, iso_date};

pub const DAILY_TAG: &str = "daily";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyFailure {
    pub topic: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyOutcome {
    pub topics: Vec<String>,
    pub created: Vec<String>,
    pub failed: Vec<DailyFailure>,
    pub archive: RebuildOutcome,
}

#[derive(Clone)]
pub struct DailyRunner {
    reports: Arc<ReportService>,
    topics: TopicGenerator,
}

impl DailyRunner {
    pub fn new(reports: Arc<ReportService>, topics: TopicGenerator) -> Self {
        Self { reports, topics }
    }

    pub async fn run(&self, limit: Option<usize>) -> Result<DailyOutcome, ArchiveError> {
        self.run_at(limit, OffsetDateTime::now_utc()).await
    }

    /// Run the batch as if the current UTC time were `now`.
    ///
    /// Report failures are recorded and skipped; only the final archive
    /// rebuild can fail the run.
    pub async fn run_at(
        &self,
        limit: Option<usize>,
        now: OffsetDateTime,
    ) -> Result<DailyOutcome, ArchiveError> {
        let today = now.date();
        let mut topics = self.topics.generate(today).await;
        if let Some(limit) = limit {
            topics.truncate(limit);
        }

        let mut created = Vec::with_capacity(topics.len());
        let mut failed = Vec::new();

        for topic in &topics {
            match self
                .reports
                .create_report_at(daily_request(topic, today), now)
                .await
            {
                Ok(outcome) => {
                    info!(
                        target = "gazette::daily",
                        report_id = %outcome.report_id,
                        "daily report created"
                    );
                    created.push(outcome.report_id);
                }
                Err(err) => {
                    warn!(
                        target = "gazette::daily",
                        topic = %topic,
                        error = %err,
                        "daily report failed; skipping"
                    );
                    failed.push(DailyFailure {
                        topic: topic.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }

        let archive = self.reports.archive().rebuild_at(now).await?;

        info!(
            target = "gazette::daily",
            created = created.len(),
            failed = failed.len(),
            indexed = archive.count,
            "daily run finished"
        );

        Ok(DailyOutcome {
            topics,
            created,
            failed,
            archive,
        })
    }
}

/// The request the daily batch submits for `topic`.
pub fn daily_request(topic: &str, today: Date) -> ReportRequest {
    ReportRequest {
        topic: topic.to_string(),
        tags: vec![DAILY_TAG.to_string()],
        template: ReportTemplate::ReportV1Sections.as_str().to_string(),
        data: ReportData {
            subtitle: Some(format!("Generated automatically on {}", iso_date(today))),
            summary: None,
            sections: vec![
                ReportSection {
                    heading: "Goal".to_string(),
                    body: "Produce a report automatically every day and refresh the index."
                        .to_string(),
                },
                ReportSection {
                    heading: "Status".to_string(),
                    body: "Validated by a local run; scheduled runs take over from here."
                        .to_string(),
                },
            ],
            extra: Default::default(),
        },
    }
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime};

    use super::*;
    use crate::application::archive::{ArchiveOptions, ArchiveService};
    use crate::application::topics::fallback_topics;
    use crate::infra::storage::LocalStore;

    fn runner(root: &std::path::Path) -> DailyRunner {
        let store = Arc::new(LocalStore::new(root.to_path_buf()).expect("store"));
        let archive = Arc::new(ArchiveService::new(
            store.clone(),
            ArchiveOptions {
                index_key: "index.html".to_string(),
                title: "Research Archive".to_string(),
            },
        ));
        let reports = Arc::new(ReportService::new(store, archive));
        DailyRunner::new(reports, TopicGenerator::default())
    }

    #[test]
    fn daily_request_uses_sections_template_and_tag() {
        let request = daily_request("Edge AI", date!(2024 - 03 - 02));
        assert_eq!(request.template, "report_v1_sections");
        assert_eq!(request.tags, vec!["daily".to_string()]);
        assert_eq!(
            request.data.subtitle.as_deref(),
            Some("Generated automatically on 2024-03-02")
        );
        assert_eq!(request.data.sections.len(), 2);
    }

    #[tokio::test]
    async fn run_creates_reports_for_fallback_topics() {
        let dir = tempfile::tempdir().expect("tempdir");
        let now = datetime!(2024-03-02 06:00 UTC);

        let outcome = runner(dir.path())
            .run_at(Some(3), now)
            .await
            .expect("daily run");

        assert_eq!(outcome.topics, fallback_topics(now.date())[..3].to_vec());
        assert_eq!(outcome.created.len(), 3);
        assert!(outcome.failed.is_empty());
        assert_eq!(outcome.archive.count, 3);
        assert!(
            outcome
                .created
                .iter()
                .all(|id| id.ends_with("-20240302"))
        );
    }

    #[tokio::test]
    async fn run_without_limit_uses_all_topics() {
        let dir = tempfile::tempdir().expect("tempdir");
        let outcome = runner(dir.path())
            .run_at(None, datetime!(2024-03-02 06:00 UTC))
            .await
            .expect("daily run");

        assert_eq!(outcome.created.len(), 10);
        assert_eq!(outcome.archive.count, 10);
    }
}
