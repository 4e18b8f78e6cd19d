use clap::Parser;
use std::path::PathBuf;

use crate::config::{AppConfig, FailureMode};

#[derive(Debug, Parser)]
#[command(name = "places-search-init")]
#[command(about = "Provision the place/address search index and templates in Elasticsearch")]
#[command(version)]
pub struct Cli {
    #[arg(long, help = "Path to the TOML config file [default: config.toml if present]")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Elasticsearch base URL, e.g. http://localhost:9200")]
    pub es_url: Option<String>,

    #[arg(long, help = "Target index name")]
    pub index: Option<String>,

    #[arg(long, help = "Delete an existing index before creating it")]
    pub force_recreate: bool,

    #[arg(long, help = "Stop at the first failed step")]
    pub fail_fast: bool,

    #[arg(long, help = "Health checks before giving up (0 waits forever)")]
    pub max_attempts: Option<u32>,

    #[arg(long, help = "Print the payloads without contacting Elasticsearch")]
    pub dry_run: bool,
}

impl Cli {
    /// Flags win over config.toml and environment variables.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(url) = &self.es_url {
            config.elasticsearch.url = url.clone();
        }
        if let Some(index) = &self.index {
            config.elasticsearch.index_name = index.clone();
        }
        if let Some(max_attempts) = self.max_attempts {
            config.readiness.max_attempts = max_attempts;
        }
        if self.force_recreate {
            config.provision.force_recreate = true;
        }
        if self.fail_fast {
            config.provision.failure_mode = FailureMode::FailFast;
        }
    }
}
