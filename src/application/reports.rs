//! Report creation: render, persist page + metadata + bundle, refresh the index.

use std::sync::Arc;

use gazette_api_types::{CreateReportResponse, ReportRequest};
use metrics::counter;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;

use crate::application::archive::{ArchiveError, ArchiveService, RebuildOutcome};
use crate::application::bundle::{BundleError, build_bundle};
use crate::application::storage::{
    HTML_CONTENT_TYPE, JSON_CONTENT_TYPE, ObjectStore, StorageError, ZIP_CONTENT_TYPE, put_text,
};
use crate::domain::{
    error::DomainError,
    reports::{ReportMeta, iso_date, validate_request},
    slug::ReportId,
};
use crate::presentation::views::{ReportView, TemplateRenderError, render_report};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Render(#[from] TemplateRenderError),
    #[error("failed to encode report metadata")]
    Encode(#[from] serde_json::Error),
    #[error("failed to build report bundle")]
    Bundle(#[from] BundleError),
    #[error("failed to store report")]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateReportOutcome {
    pub report_id: String,
    /// Storage key of the rendered page.
    pub view: String,
    pub archive: RebuildOutcome,
}

impl From<CreateReportOutcome> for CreateReportResponse {
    fn from(outcome: CreateReportOutcome) -> Self {
        Self {
            report_id: outcome.report_id,
            view: outcome.view,
        }
    }
}

#[derive(Clone)]
pub struct ReportService {
    store: Arc<dyn ObjectStore>,
    archive: Arc<ArchiveService>,
}

impl ReportService {
    pub fn new(store: Arc<dyn ObjectStore>, archive: Arc<ArchiveService>) -> Self {
        Self { store, archive }
    }

    pub fn archive(&self) -> &Arc<ArchiveService> {
        &self.archive
    }

    pub async fn create_report(
        &self,
        request: ReportRequest,
    ) -> Result<CreateReportOutcome, ReportError> {
        self.create_report_at(request, OffsetDateTime::now_utc())
            .await
    }

    /// Create a report as if the current UTC time were `now`.
    pub async fn create_report_at(
        &self,
        request: ReportRequest,
        now: OffsetDateTime,
    ) -> Result<CreateReportOutcome, ReportError> {
        let template = validate_request(&request)?;
        let now = now.to_offset(time::UtcOffset::UTC);

        let report_id = ReportId::for_topic(&request.topic, now.date());
        let meta = ReportMeta::new(&report_id, &request.topic, &request.tags, now);

        let view = ReportView::new(
            &request.topic,
            &iso_date(now.date()),
            &request.tags,
            &request.data,
        );
        let html = render_report(template, view)?;
        let meta_json = serde_json::to_vec_pretty(&meta)?;
        let bundle = build_bundle(&html, &meta_json)?;

        let base = report_id.storage_prefix();
        let view_key = format!("{base}/index.html");
        let store = self.store.as_ref();

        put_text(store, &view_key, &html, HTML_CONTENT_TYPE).await?;
        store
            .put(&format!("{base}/meta.json"), meta_json.into(), JSON_CONTENT_TYPE)
            .await?;
        store
            .put(&format!("{base}/bundle.zip"), bundle, ZIP_CONTENT_TYPE)
            .await?;

        counter!("gazette_reports_created_total").increment(1);
        info!(
            target = "gazette::reports",
            report_id = %report_id,
            template = %template,
            backend = store.backend(),
            "report stored"
        );

        let archive = self.archive.rebuild_at(now).await?;

        Ok(CreateReportOutcome {
            report_id: report_id.into_string(),
            view: view_key,
            archive,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};

    use gazette_api_types::{ReportData, ReportSection};
    use time::macros::datetime;
    use zip::ZipArchive;

    use super::*;
    use crate::application::archive::ArchiveOptions;
    use crate::infra::storage::LocalStore;

    fn service(root: &std::path::Path) -> (Arc<LocalStore>, ReportService) {
        let store = Arc::new(LocalStore::new(root.to_path_buf()).expect("store"));
        let archive = Arc::new(ArchiveService::new(
            store.clone(),
            ArchiveOptions {
                index_key: "index.html".to_string(),
                title: "Research Archive".to_string(),
            },
        ));
        (store.clone(), ReportService::new(store, archive))
    }

    #[tokio::test]
    async fn create_report_writes_page_meta_bundle_and_index() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (store, service) = service(dir.path());

        let mut request = ReportRequest::new("研究流程自動化 Pipeline");
        request.tags = vec!["automation".to_string()];
        request.template = "report_v1_sections".to_string();
        request.data = ReportData {
            subtitle: Some("daily".to_string()),
            sections: vec![ReportSection {
                heading: "Goal".to_string(),
                body: "Automate".to_string(),
            }],
            ..ReportData::default()
        };

        let outcome = service
            .create_report_at(request, datetime!(2024-06-09 23:59:59 UTC))
            .await
            .expect("create");

        assert_eq!(outcome.report_id, "研究流程自動化-pipeline-20240609");
        assert_eq!(
            outcome.view,
            "reports/研究流程自動化-pipeline-20240609/index.html"
        );
        assert_eq!(outcome.archive.count, 1);

        let meta: serde_json::Value = serde_json::from_slice(
            &store
                .get("reports/研究流程自動化-pipeline-20240609/meta.json")
                .await
                .expect("meta"),
        )
        .expect("json");
        assert_eq!(meta["title"], "研究流程自動化 Pipeline");
        assert_eq!(meta["created_at"], "2024-06-09T23:59:59Z");
        assert_eq!(meta["tags"][0], "automation");

        let page = store.get(&outcome.view).await.expect("page");
        let page = String::from_utf8(page.to_vec()).expect("utf8");
        assert!(page.contains("2024-06-09"));
        assert!(page.contains("Goal"));

        let bundle = store
            .get("reports/研究流程自動化-pipeline-20240609/bundle.zip")
            .await
            .expect("bundle");
        let mut archive = ZipArchive::new(Cursor::new(bundle.to_vec())).expect("zip");
        let mut bundled_page = String::new();
        archive
            .by_name("index.html")
            .expect("page entry")
            .read_to_string(&mut bundled_page)
            .expect("read");
        assert_eq!(bundled_page, page);

        let index = store.get("index.html").await.expect("index");
        assert!(
            String::from_utf8(index.to_vec())
                .expect("utf8")
                .contains("研究流程自動化 Pipeline")
        );
    }

    #[tokio::test]
    async fn same_topic_on_same_day_overwrites() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (_, service) = service(dir.path());

        let first = service
            .create_report_at(
                ReportRequest::new("Fan curve checks"),
                datetime!(2024-06-09 08:00 UTC),
            )
            .await
            .expect("first");
        let second = service
            .create_report_at(
                ReportRequest::new("Fan curve checks"),
                datetime!(2024-06-09 18:00 UTC),
            )
            .await
            .expect("second");

        assert_eq!(first.report_id, second.report_id);
        assert_eq!(second.archive.count, 1);
    }

    #[tokio::test]
    async fn invalid_requests_write_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (_, service) = service(dir.path());

        let err = service
            .create_report(ReportRequest::new("ab"))
            .await
            .expect_err("too short");
        assert!(matches!(err, ReportError::Domain(_)));

        let mut request = ReportRequest::new("Valid topic");
        request.template = "missing".to_string();
        let err = service.create_report(request).await.expect_err("template");
        assert!(matches!(err, ReportError::Domain(_)));

        assert!(!dir.path().join("reports").exists());
        assert!(!dir.path().join("index.html").exists());
    }
}
