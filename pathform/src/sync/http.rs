use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;

use crate::{
    data::payload::PayloadTree,
    sync::{SaveResponse, SyncClient},
};

/// Path of the catalog endpoint.
pub const FIELDS_PATH: &str = "/fields.json";

/// Path of the submit endpoint.
pub const SAVE_PATH: &str = "/save";

/// Talks to a config server over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSyncClient {
    base: String,
    client: reqwest::Client,
}

impl HttpSyncClient {
    /// Create a client for the server at `base`, e.g. `http://127.0.0.1:5500`.
    pub fn new(base: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;
        Ok(Self {
            base: base.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}

#[async_trait]
impl SyncClient for HttpSyncClient {
    async fn fetch_catalog(&self) -> anyhow::Result<Vec<Value>> {
        let url = self.url(FIELDS_PATH);
        debug!("GET {url}");
        let fields = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to reach {url}"))?
            .error_for_status()?
            .json::<Vec<Value>>()
            .await?;
        Ok(fields)
    }

    async fn submit_payload(&self, tree: &PayloadTree) -> anyhow::Result<SaveResponse> {
        let url = self.url(SAVE_PATH);
        debug!("POST {url}");
        let resp = self
            .client
            .post(&url)
            .json(tree)
            .send()
            .await
            .with_context(|| format!("Failed to reach {url}"))?
            .error_for_status()?
            .json::<SaveResponse>()
            .await?;
        Ok(resp)
    }
}
