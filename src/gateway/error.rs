//! Errors raised by the analysis gateway.

use thiserror::Error;

/// Failure of a call to the analysis service.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request to {endpoint} timed out after {seconds}s")]
    Timeout { endpoint: String, seconds: u64 },

    #[error("cannot connect to {endpoint}")]
    Connect { endpoint: String },

    #[error("request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} API error {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("invalid response from {service}: {message}")]
    InvalidResponse {
        service: &'static str,
        message: String,
    },

    #[error("key point analysis job {job_id} failed: {message}")]
    JobFailed { job_id: String, message: String },

    #[error("{0}")]
    InvalidArgument(String),
}

impl GatewayError {
    pub(crate) fn invalid_response(service: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            service,
            message: message.into(),
        }
    }
}
