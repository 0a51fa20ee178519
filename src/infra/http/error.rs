use std::error::Error as StdError;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::archive::ArchiveError;
use crate::application::error::ErrorReport;
use crate::application::reports::ReportError;
use crate::domain::error::DomainError;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const RENDER: &str = "render_error";
    pub const BUNDLE: &str = "bundle_error";
    pub const STORAGE: &str = "storage_error";
    pub const INTERNAL: &str = "internal_error";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    hint: Option<String>,
    chain: Vec<String>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: &'static str,
        hint: Option<String>,
    ) -> Self {
        Self {
            status,
            code,
            message,
            hint,
            chain: Vec::new(),
        }
    }

    /// Server-side failure: the cause chain is logged but not returned to the client.
    pub fn internal(code: &'static str, message: &'static str, error: &dyn StdError) -> Self {
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        let report = ErrorReport::from_error("infra::http", status, error);
        Self {
            status,
            code,
            message,
            hint: None,
            chain: report.messages,
        }
    }

    pub fn invalid_input(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            codes::INVALID_INPUT,
            "Invalid report request",
            Some(detail.into()),
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let report = if self.chain.is_empty() {
            ErrorReport::from_message(
                "infra::http",
                self.status,
                format!(
                    "{}: {}",
                    self.code,
                    self.hint.as_deref().unwrap_or(self.message)
                ),
            )
        } else {
            ErrorReport {
                source: "infra::http",
                status: self.status,
                messages: self.chain,
            }
        };

        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message.to_string(),
                hint: self.hint,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        // Attach a structured report so shared logging middleware can emit rich diagnostics.
        report.attach(&mut response);
        response
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let status = rejection.status();
        let code = if status == StatusCode::UNPROCESSABLE_ENTITY {
            codes::INVALID_INPUT
        } else {
            codes::BAD_REQUEST
        };
        Self::new(
            status,
            code,
            "Request body could not be parsed",
            Some(rejection.body_text()),
        )
    }
}

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::Domain(DomainError::Validation { message }) => {
                ApiError::invalid_input(message)
            }
            ReportError::Render(ref render) => {
                ApiError::internal(codes::RENDER, render.public_message, &err)
            }
            ReportError::Encode(_) | ReportError::Bundle(_) => {
                ApiError::internal(codes::BUNDLE, "Report could not be packaged", &err)
            }
            ReportError::Storage(_) => {
                ApiError::internal(codes::STORAGE, "Report could not be stored", &err)
            }
            ReportError::Archive(archive) => archive.into(),
        }
    }
}

impl From<ArchiveError> for ApiError {
    fn from(err: ArchiveError) -> Self {
        match err {
            ArchiveError::Storage(_) => {
                ApiError::internal(codes::STORAGE, "Archive storage unavailable", &err)
            }
            ArchiveError::Render(ref render) => {
                ApiError::internal(codes::RENDER, render.public_message, &err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::storage::StorageError;

    #[test]
    fn validation_errors_carry_detail_as_hint() {
        let err: ApiError = ReportError::Domain(DomainError::validation("topic too short")).into();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code(), codes::INVALID_INPUT);

        let response = err.into_response();
        let report = response.extensions().get::<ErrorReport>().expect("report");
        assert_eq!(report.messages, vec!["invalid_input: topic too short".to_string()]);
    }

    #[test]
    fn storage_errors_keep_chain_out_of_body() {
        let err: ApiError = ReportError::Storage(StorageError::remote("bucket offline")).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), codes::STORAGE);

        let response = err.into_response();
        let report = response.extensions().get::<ErrorReport>().expect("report");
        assert!(report.messages.iter().any(|m| m.contains("bucket offline")));
    }
}
