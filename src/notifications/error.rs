use thiserror::Error;

use super::outcome::BuildOutcome;
use super::template::TemplateError;

/// The job configuration cannot produce a message for this build
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("No template configured for {0} builds")]
    MissingTemplate(BuildOutcome),

    #[error("Invalid template for {outcome} builds: {source}")]
    InvalidTemplate {
        outcome: BuildOutcome,
        #[source]
        source: TemplateError,
    },
}

/// Shortening the build link or posting the message failed
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Please set your weibo access token")]
    MissingToken,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}
