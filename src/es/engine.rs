use async_trait::async_trait;
use serde_json::Value;

use crate::error::ProvisionError;

/// Status code and body of one engine call. Bodies that are not JSON are kept
/// as a JSON string.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineResponse {
    pub status: u16,
    pub body: Value,
}

impl EngineResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// `GET /_cluster/health?wait_for_status=..&timeout=..`
    async fn cluster_health(
        &self,
        wait_for_status: &str,
        timeout: &str,
    ) -> Result<EngineResponse, ProvisionError>;

    /// `HEAD /<index>`
    async fn index_exists(&self, index: &str) -> Result<bool, ProvisionError>;

    /// `PUT /<index>`
    async fn create_index(&self, index: &str, body: &Value)
    -> Result<EngineResponse, ProvisionError>;

    /// `DELETE /<index>`
    async fn delete_index(&self, index: &str) -> Result<EngineResponse, ProvisionError>;

    /// `GET /<index>/_mapping`
    async fn get_mapping(&self, index: &str) -> Result<EngineResponse, ProvisionError>;

    /// `PUT /_scripts/<id>`
    async fn put_script(&self, id: &str, body: &Value) -> Result<EngineResponse, ProvisionError>;
}
