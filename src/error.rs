use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Elasticsearch error: {0}")]
    Elasticsearch(#[from] elasticsearch::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Elasticsearch not ready after {attempts} health checks")]
    NotReady { attempts: u32 },

    #[error("Step '{step}' rejected (status {status}): {details}")]
    Rejected {
        step: String,
        status: u16,
        details: String,
    },

    #[error("Template error: {0}")]
    Template(String),
}
