//! Failure normalization for every backend call.
//!
//! Whatever goes wrong (a structured problem response, a bare error status,
//! a timeout, a dropped connection) ends up as an [`ApiError`] carrying an
//! RFC 7807 [`ProblemDetails`] body.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;

use crate::models::ValidationError;

pub const PROBLEM_CONTENT_TYPE: &str = "application/problem+json";

/// RFC 7807 problem details
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProblemDetails {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_uri: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

impl ProblemDetails {
    pub fn new(status: u16, title: impl Into<String>) -> Self {
        Self {
            status,
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: &str) -> Self {
        self.correlation_id = Some(correlation_id.to_string());
        self
    }

    /// `detail` when present, otherwise `title`
    pub fn message(&self) -> &str {
        match self.detail.as_deref() {
            Some(detail) if !detail.trim().is_empty() => detail,
            _ => &self.title,
        }
    }
}

impl fmt::Display for ProblemDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Error returned by every API call
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// The backend answered with a problem-details body
    #[error("{0}")]
    Problem(ProblemDetails),

    /// The backend answered with an error status and an unstructured body
    #[error("{0}")]
    Http(ProblemDetails),

    /// The request did not complete within the configured timeout
    #[error("{0}")]
    Timeout(ProblemDetails),

    /// The backend could not be reached
    #[error("{0}")]
    Network(ProblemDetails),

    /// The backend answered 2xx with a body we could not decode
    #[error("{0}")]
    Decode(ProblemDetails),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn problem(&self) -> &ProblemDetails {
        match self {
            ApiError::Problem(p)
            | ApiError::Http(p)
            | ApiError::Timeout(p)
            | ApiError::Network(p)
            | ApiError::Decode(p) => p,
        }
    }

    pub fn status(&self) -> u16 {
        self.problem().status
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.problem().correlation_id.as_deref()
    }

    /// The string a state holder stores as its error
    pub fn message(&self) -> String {
        self.problem().message().to_string()
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == StatusCode::UNAUTHORIZED.as_u16()
    }

    pub fn not_found(what: impl fmt::Display) -> Self {
        ApiError::Problem(
            ProblemDetails::new(404, "Not Found").with_detail(format!("{} not found", what)),
        )
    }

    pub fn timeout(after: Duration, correlation_id: &str) -> Self {
        ApiError::Timeout(
            ProblemDetails::new(StatusCode::REQUEST_TIMEOUT.as_u16(), "Request Timeout")
                .with_detail(format!("Request timed out after {}s", after.as_secs()))
                .with_correlation_id(correlation_id),
        )
    }

    pub fn network(reason: impl fmt::Display, correlation_id: &str) -> Self {
        ApiError::Network(
            ProblemDetails::new(StatusCode::SERVICE_UNAVAILABLE.as_u16(), "Network Error")
                .with_detail(format!("Network error: {}", reason))
                .with_correlation_id(correlation_id),
        )
    }

    pub fn decode(status: StatusCode, reason: impl fmt::Display, correlation_id: &str) -> Self {
        let mut problem = ProblemDetails::new(StatusCode::BAD_GATEWAY.as_u16(), "Invalid Response")
            .with_detail(format!("Could not decode response body: {}", reason))
            .with_correlation_id(correlation_id);
        problem
            .extensions
            .insert("upstreamStatus".to_string(), Value::from(status.as_u16()));
        ApiError::Decode(problem)
    }

    /// Classify a transport failure from reqwest
    pub fn from_transport(err: &reqwest::Error, timeout: Duration, correlation_id: &str) -> Self {
        if err.is_timeout() {
            ApiError::timeout(timeout, correlation_id)
        } else {
            ApiError::network(err, correlation_id)
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Problem(
            ProblemDetails::new(StatusCode::UNPROCESSABLE_ENTITY.as_u16(), "Validation Failed")
                .with_detail(err.to_string()),
        )
    }
}

fn is_problem_content_type(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| ct.to_ascii_lowercase().starts_with(PROBLEM_CONTENT_TYPE))
        .unwrap_or(false)
}

fn is_json_content_type(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| ct.to_ascii_lowercase().starts_with("application/json"))
        .unwrap_or(false)
}

/// Turn a non-2xx response into an [`ApiError`].
///
/// Problem-details bodies are parsed and tagged with the correlation id.
/// Plain JSON bodies that look like problems (they carry a `title` or
/// `detail`) get the same treatment. Anything else is synthesized from the
/// status line, keeping the raw body as the `body` extension member.
pub fn normalize_error_response(
    status: StatusCode,
    content_type: Option<&str>,
    body: &str,
    correlation_id: &str,
) -> ApiError {
    if is_problem_content_type(content_type) || is_json_content_type(content_type) {
        if let Ok(mut problem) = serde_json::from_str::<ProblemDetails>(body) {
            let structured = is_problem_content_type(content_type)
                || problem.detail.is_some()
                || !problem.title.is_empty();
            if structured {
                if problem.status == 0 {
                    problem.status = status.as_u16();
                }
                if problem.title.is_empty() {
                    problem.title = reason_phrase(status).to_string();
                }
                problem.correlation_id = Some(correlation_id.to_string());
                return ApiError::Problem(problem);
            }
        }
    }

    let reason = reason_phrase(status);
    let mut problem = ProblemDetails::new(status.as_u16(), reason)
        .with_detail(format!(
            "Request failed with status {} {}",
            status.as_u16(),
            reason
        ))
        .with_correlation_id(correlation_id);
    if !body.trim().is_empty() {
        problem
            .extensions
            .insert("body".to_string(), Value::String(body.to_string()));
    }
    ApiError::Http(problem)
}

fn reason_phrase(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Unknown Status")
}
