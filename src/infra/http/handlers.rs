use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use gazette_api_types::{ArchiveEntry, CreateReportResponse, RebuildArchiveResponse, ReportRequest};

use super::error::ApiError;
use super::state::HttpState;

pub async fn create_report(
    State(state): State<HttpState>,
    payload: Result<Json<ReportRequest>, JsonRejection>,
) -> Result<Json<CreateReportResponse>, ApiError> {
    let Json(request) = payload?;
    let outcome = state.reports.create_report(request).await?;
    Ok(Json(outcome.into()))
}

pub async fn rebuild_archive(
    State(state): State<HttpState>,
) -> Result<Json<RebuildArchiveResponse>, ApiError> {
    let outcome = state.archive.rebuild().await?;
    Ok(Json(RebuildArchiveResponse {
        count: outcome.count,
        index: outcome.index,
    }))
}

pub async fn list_reports(
    State(state): State<HttpState>,
) -> Result<Json<Vec<ArchiveEntry>>, ApiError> {
    let records = state.archive.records().await?;
    Ok(Json(records.into_iter().map(ArchiveEntry::from).collect()))
}

pub async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}
