use async_trait::async_trait;
use elasticsearch::cluster::ClusterHealthParts;
use elasticsearch::http::response::Response;
use elasticsearch::http::transport::{SingleNodeConnectionPool, TransportBuilder};
use elasticsearch::indices::{
    IndicesCreateParts, IndicesDeleteParts, IndicesExistsParts, IndicesGetMappingParts,
};
use elasticsearch::params::WaitForStatus;
use elasticsearch::{Elasticsearch, PutScriptParts};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::config::EsConfig;
use crate::error::ProvisionError;
use crate::es::engine::{EngineResponse, SearchEngine};

pub fn create_client(config: &EsConfig) -> anyhow::Result<Elasticsearch> {
    let url = Url::parse(&config.url)?;
    let pool = SingleNodeConnectionPool::new(url);
    let transport = TransportBuilder::new(pool)
        .disable_proxy()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()?;
    Ok(Elasticsearch::new(transport))
}

pub struct EsEngine {
    client: Elasticsearch,
}

impl EsEngine {
    pub fn new(client: Elasticsearch) -> Self {
        Self { client }
    }
}

fn wait_for_status(status: &str) -> WaitForStatus {
    match status {
        "green" => WaitForStatus::Green,
        "red" => WaitForStatus::Red,
        _ => WaitForStatus::Yellow,
    }
}

async fn into_engine_response(response: Response) -> Result<EngineResponse, ProvisionError> {
    let status = response.status_code().as_u16();
    let text = response.text().await?;
    let body = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    };
    Ok(EngineResponse::new(status, body))
}

#[async_trait]
impl SearchEngine for EsEngine {
    async fn cluster_health(
        &self,
        status: &str,
        timeout: &str,
    ) -> Result<EngineResponse, ProvisionError> {
        let response = self
            .client
            .cluster()
            .health(ClusterHealthParts::None)
            .wait_for_status(wait_for_status(status))
            .timeout(timeout)
            .send()
            .await?;
        into_engine_response(response).await
    }

    async fn index_exists(&self, index: &str) -> Result<bool, ProvisionError> {
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await?;
        Ok(response.status_code().is_success())
    }

    async fn create_index(
        &self,
        index: &str,
        body: &Value,
    ) -> Result<EngineResponse, ProvisionError> {
        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(body.clone())
            .send()
            .await?;
        into_engine_response(response).await
    }

    async fn delete_index(&self, index: &str) -> Result<EngineResponse, ProvisionError> {
        let response = self
            .client
            .indices()
            .delete(IndicesDeleteParts::Index(&[index]))
            .send()
            .await?;
        into_engine_response(response).await
    }

    async fn get_mapping(&self, index: &str) -> Result<EngineResponse, ProvisionError> {
        let response = self
            .client
            .indices()
            .get_mapping(IndicesGetMappingParts::Index(&[index]))
            .send()
            .await?;
        into_engine_response(response).await
    }

    async fn put_script(&self, id: &str, body: &Value) -> Result<EngineResponse, ProvisionError> {
        let response = self
            .client
            .put_script(PutScriptParts::Id(id))
            .body(body.clone())
            .send()
            .await?;
        into_engine_response(response).await
    }
}
