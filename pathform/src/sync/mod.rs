//! Catalog fetch and payload submission.
//!
//! Both operations are single-shot: no retries, no cancellation. Transport
//! failures are handled here and never reach the caller as errors.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use serde_json::Value;

use crate::data::{field::Catalog, payload::PayloadTree};

/// HTTP transport to a remote config server.
#[cfg(feature = "web")]
pub mod http;

/// In-process transport to a [`ConfigManager`](crate::manager::ConfigManager).
pub mod local;

#[cfg(feature = "web")]
pub use http::HttpSyncClient;
pub use local::LocalSyncClient;

/// Message reported when a submission does not reach the server.
pub const SAVE_FAILED_MSG: &str = "Failed to save config";

/// Message reported by the server after a successful update.
pub const SAVE_OK_MSG: &str = "Config successfully updated";

/// Result of a submission, as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveResponse {
    pub success: bool,
    pub msg: String,
}

impl SaveResponse {
    pub fn ok(msg: impl Into<String>) -> Self {
        Self {
            success: true,
            msg: msg.into(),
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            msg: msg.into(),
        }
    }

    /// Local stand-in for a submission that failed in transport.
    pub fn failed() -> Self {
        Self::error(SAVE_FAILED_MSG)
    }
}

/// Source of the field catalog and sink for edited payloads.
#[async_trait]
pub trait SyncClient: Send + Sync {
    /// Fetch the catalog array. Entries are validated by the caller.
    async fn fetch_catalog(&self) -> anyhow::Result<Vec<Value>>;

    /// Submit a payload and return the server's verdict.
    async fn submit_payload(&self, tree: &PayloadTree) -> anyhow::Result<SaveResponse>;
}

/// Fetch and validate the catalog.
///
/// A failed fetch yields an empty catalog; invalid entries only drop
/// themselves.
pub async fn load_catalog(client: &dyn SyncClient) -> Catalog {
    match client.fetch_catalog().await {
        Ok(entries) => Catalog::from_values(entries),
        Err(e) => {
            warn!("failed to load fields: {e:#}");
            Catalog::default()
        }
    }
}

/// Submit `tree`, mapping any transport failure to [`SaveResponse::failed`].
pub async fn submit(client: &dyn SyncClient, tree: &PayloadTree) -> SaveResponse {
    match client.submit_payload(tree).await {
        Ok(resp) => resp,
        Err(e) => {
            warn!("failed to submit config: {e:#}");
            SaveResponse::failed()
        }
    }
}
