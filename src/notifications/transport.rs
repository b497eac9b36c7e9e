use async_trait::async_trait;

use super::error::TransportError;

/// Delivery side of a notification: link shortening and posting
#[async_trait]
pub trait Transport: Send + Sync {
    /// Turn a build permalink into the feed's short form
    async fn shorten(&self, url: &str) -> Result<String, TransportError>;
    /// Publish a status message
    async fn post(&self, message: &str) -> Result<(), TransportError>;
}
