use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    data::payload::PayloadTree,
    manager::ConfigManager,
    sync::{SAVE_OK_MSG, SaveResponse, SyncClient},
};

/// Talks to a [`ConfigManager`] in the same process.
///
/// Answers exactly like the HTTP server does for the same manager.
#[derive(Clone)]
pub struct LocalSyncClient {
    manager: Arc<ConfigManager>,
}

impl LocalSyncClient {
    pub fn new(manager: Arc<ConfigManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &Arc<ConfigManager> {
        &self.manager
    }
}

/// Apply a submitted payload and describe the outcome.
pub fn apply_payload(manager: &ConfigManager, payload: serde_json::Value) -> SaveResponse {
    match manager.apply(payload) {
        Ok(()) => SaveResponse::ok(SAVE_OK_MSG),
        Err(e) => {
            warn!("{e:#}");
            SaveResponse::error(format!("{e:#}"))
        }
    }
}

#[async_trait]
impl SyncClient for LocalSyncClient {
    async fn fetch_catalog(&self) -> anyhow::Result<Vec<serde_json::Value>> {
        let fields = self.manager.raw_fields()?;
        Ok(fields
            .into_iter()
            .map(serde_json::to_value)
            .collect::<Result<_, _>>()?)
    }

    async fn submit_payload(&self, tree: &PayloadTree) -> anyhow::Result<SaveResponse> {
        Ok(apply_payload(&self.manager, tree.clone().into_value()))
    }
}
