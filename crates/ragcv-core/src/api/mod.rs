pub mod client;
pub mod types;

use anyhow::Result;
use async_trait::async_trait;

pub use client::BackendClient;
pub use types::{Artifact, GeneratedResult};

/// The three remote operations the session drives.
///
/// Implementations must be cheap to share: the session clones an `Arc` of the
/// backend into every spawned request.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn query(&self, text: &str) -> Result<GeneratedResult>;

    async fn compile(&self, source: &str) -> Result<Vec<u8>>;

    async fn fetch_logs(&self) -> Result<String>;
}

#[async_trait]
impl Backend for BackendClient {
    async fn query(&self, text: &str) -> Result<GeneratedResult> {
        BackendClient::query(self, text).await
    }

    async fn compile(&self, source: &str) -> Result<Vec<u8>> {
        BackendClient::compile(self, source).await
    }

    async fn fetch_logs(&self) -> Result<String> {
        BackendClient::fetch_logs(self).await
    }
}
