//! Error types for the summarisation job client.

use std::fmt;
use thiserror::Error;

/// Placeholder used when the service gives no error message
pub const UNKNOWN_SERVICE_MESSAGE: &str = "Unknown error";

/// Which half of the job protocol a failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Submit,
    Poll,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Submit => f.write_str("submit"),
            Phase::Poll => f.write_str("poll"),
        }
    }
}

/// A non-success HTTP response from the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub http_status: u16,
    pub service_message: Option<String>,
    pub phase: Phase,
}

impl ApiError {
    pub fn new(http_status: u16, service_message: Option<String>, phase: Phase) -> Self {
        Self {
            http_status,
            service_message,
            phase,
        }
    }

    pub fn message(&self) -> &str {
        self.service_message
            .as_deref()
            .unwrap_or(UNKNOWN_SERVICE_MESSAGE)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} request failed with status {}: {}",
            self.phase,
            self.http_status,
            self.message()
        )
    }
}

/// Coarse grouping used when deciding what to tell the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Authentication,
    RateLimited,
    Other,
}

impl ErrorClass {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => ErrorClass::Authentication,
            429 => ErrorClass::RateLimited,
            _ => ErrorClass::Other,
        }
    }
}

#[derive(Error, Debug)]
pub enum SummarizeError {
    #[error("{0}")]
    SubmitHttp(ApiError),
    #[error("no operation location received from the service")]
    MissingOperationLocation,
    #[error("{0}")]
    PollHttp(ApiError),
    #[error("analysis failed: {}", .0.as_deref().unwrap_or("the service reported a failed job"))]
    ServiceAnalysisFailed(Option<String>),
    #[error("polling timed out after {attempts} attempts")]
    PollTimeout { attempts: u32 },
    #[error("invalid response format from the service: {0}")]
    ResultFormat(String),
    #[error("network error, check your internet connection: {0}")]
    NetworkUnavailable(String),
}

impl SummarizeError {
    /// The HTTP error behind this failure, if there was one
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            SummarizeError::SubmitHttp(e) | SummarizeError::PollHttp(e) => Some(e),
            _ => None,
        }
    }

    pub fn class(&self) -> ErrorClass {
        self.api_error()
            .map(|e| ErrorClass::from_status(e.http_status))
            .unwrap_or(ErrorClass::Other)
    }
}
