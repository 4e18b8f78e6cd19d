use std::time::Duration;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::{FailureMode, ProvisionConfig, ReadinessConfig};
use crate::error::ProvisionError;
use crate::es::engine::{EngineResponse, SearchEngine};
use crate::es::mapping::{index_settings_and_mappings, mapping_mismatches};
use crate::es::templates::QueryTemplate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Applied,
    Skipped(String),
    Rejected { status: u16, details: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub step: String,
    pub status: StepStatus,
}

impl StepOutcome {
    fn new(step: impl Into<String>, status: StepStatus) -> Self {
        Self {
            step: step.into(),
            status,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.status, StepStatus::Rejected { .. })
    }
}

#[derive(Debug, Default)]
pub struct ProvisionReport {
    pub health_checks: u32,
    pub outcomes: Vec<StepOutcome>,
}

impl ProvisionReport {
    pub fn failures(&self) -> impl Iterator<Item = &StepOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }
}

pub struct Provisioner<E> {
    engine: E,
    index_name: String,
    templates: Vec<QueryTemplate>,
    readiness: ReadinessConfig,
    options: ProvisionConfig,
}

impl<E: SearchEngine> Provisioner<E> {
    pub fn new(
        engine: E,
        index_name: impl Into<String>,
        templates: Vec<QueryTemplate>,
        readiness: ReadinessConfig,
        options: ProvisionConfig,
    ) -> Self {
        Self {
            engine,
            index_name: index_name.into(),
            templates,
            readiness,
            options,
        }
    }

    pub async fn run(&self) -> Result<ProvisionReport, ProvisionError> {
        let mut report = ProvisionReport {
            health_checks: self.wait_until_ready().await?,
            ..Default::default()
        };
        info!("Elasticsearch is up - applying settings, mappings, and templates");

        let outcome = self.apply_index().await;
        self.record(&mut report, outcome)?;

        for template in &self.templates {
            let outcome = self.apply_template(template).await;
            self.record(&mut report, outcome)?;
        }

        if self.options.verify_mapping {
            let outcome = self.verify_mapping().await;
            self.record(&mut report, outcome)?;
        }

        let failed = report.failures().count();
        if failed == 0 {
            info!(steps = report.outcomes.len(), "Provisioning finished successfully");
        } else {
            warn!(
                steps = report.outcomes.len(),
                failed, "Provisioning finished with failed steps"
            );
        }
        Ok(report)
    }

    /// Polls cluster health until it answers with a 2xx. Returns the number of
    /// health checks issued.
    pub async fn wait_until_ready(&self) -> Result<u32, ProvisionError> {
        let interval = Duration::from_millis(self.readiness.interval_ms);
        let max_attempts = self.readiness.max_attempts;
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            match self
                .engine
                .cluster_health(
                    &self.readiness.wait_for_status,
                    &self.readiness.health_timeout,
                )
                .await
            {
                Ok(response) if response.is_success() => {
                    debug!(attempt = attempts, "Cluster health check succeeded");
                    return Ok(attempts);
                }
                Ok(response) => {
                    debug!(attempt = attempts, status = response.status, "Cluster not ready");
                }
                Err(e) => {
                    debug!(attempt = attempts, "Cluster health check failed: {e}");
                }
            }

            if max_attempts != 0 && attempts >= max_attempts {
                return Err(ProvisionError::NotReady { attempts });
            }

            info!("Waiting for Elasticsearch to be ready...");
            tokio::time::sleep(interval).await;
        }
    }

    /// Creates the index unless it already exists. With `force_recreate` an
    /// existing index is dropped first.
    pub async fn apply_index(&self) -> StepOutcome {
        let step = format!("index:{}", self.index_name);
        match self.try_apply_index().await {
            Ok(status) => StepOutcome::new(step, status),
            Err(e) => StepOutcome::new(step, transport_failure(e)),
        }
    }

    async fn try_apply_index(&self) -> Result<StepStatus, ProvisionError> {
        let index = self.index_name.as_str();

        let exists = match self.engine.index_exists(index).await {
            Ok(exists) => exists,
            Err(e) => {
                // create_index still reports an existing index as 400 already_exists
                warn!("Could not check whether index '{index}' exists: {e}");
                false
            }
        };

        if exists {
            if !self.options.force_recreate {
                info!("Index '{index}' already exists, skipping creation");
                return Ok(StepStatus::Skipped("index already exists".into()));
            }

            info!("Index '{index}' exists, deleting because force_recreate is enabled");
            let response = self.engine.delete_index(index).await?;
            if !(response.is_success() || response.status == 404) {
                return Ok(rejected(response));
            }
        }

        info!("Creating/Updating {index} index...");
        let response = self
            .engine
            .create_index(index, &index_settings_and_mappings())
            .await?;

        if response.is_success() {
            info!(status = response.status, "Index created/updated successfully");
            Ok(StepStatus::Applied)
        } else if response.status == 400 && already_exists(&response.body) {
            info!("Index already exists, skipping creation");
            Ok(StepStatus::Skipped("index already exists".into()))
        } else {
            Ok(rejected(response))
        }
    }

    pub async fn apply_template(&self, template: &QueryTemplate) -> StepOutcome {
        let step = format!("template:{}", template.name);
        info!("Creating/Updating _scripts/{}...", template.name);

        let result = match template.stored_script() {
            Ok(body) => self.engine.put_script(template.name, &body).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(response) if response.is_success() => {
                info!(
                    status = response.status,
                    "Template {} created/updated successfully", template.name
                );
                StepOutcome::new(step, StepStatus::Applied)
            }
            Ok(response) => StepOutcome::new(step, rejected(response)),
            Err(e) => StepOutcome::new(step, transport_failure(e)),
        }
    }

    /// Checks the live mapping against the field types the search templates
    /// depend on.
    pub async fn verify_mapping(&self) -> StepOutcome {
        let step = format!("mapping:{}", self.index_name);

        let response = match self.engine.get_mapping(&self.index_name).await {
            Ok(response) if response.is_success() => response,
            Ok(response) => return StepOutcome::new(step, rejected(response)),
            Err(e) => return StepOutcome::new(step, transport_failure(e)),
        };

        let properties = &response.body[self.index_name.as_str()]["mappings"]["properties"];
        let mismatches = if properties.is_object() {
            mapping_mismatches(properties)
        } else {
            vec!["empty mapping".to_string()]
        };

        if mismatches.is_empty() {
            info!("Mapping of '{}' looks correct", self.index_name);
            StepOutcome::new(step, StepStatus::Applied)
        } else {
            StepOutcome::new(
                step,
                StepStatus::Rejected {
                    status: response.status,
                    details: mismatches.join("; "),
                },
            )
        }
    }

    fn record(
        &self,
        report: &mut ProvisionReport,
        outcome: StepOutcome,
    ) -> Result<(), ProvisionError> {
        if let StepStatus::Rejected { status, details } = &outcome.status {
            error!(step = %outcome.step, status, "Step failed: {details}");
            if self.options.failure_mode == FailureMode::FailFast {
                return Err(ProvisionError::Rejected {
                    step: outcome.step,
                    status: *status,
                    details: details.clone(),
                });
            }
        }
        report.outcomes.push(outcome);
        Ok(())
    }
}

fn rejected(response: EngineResponse) -> StepStatus {
    StepStatus::Rejected {
        status: response.status,
        details: response.body.to_string(),
    }
}

/// Network errors carry no HTTP status; they are reported as status 0.
fn transport_failure(e: ProvisionError) -> StepStatus {
    StepStatus::Rejected {
        status: 0,
        details: e.to_string(),
    }
}

fn already_exists(body: &Value) -> bool {
    body["error"]["type"] == "resource_already_exists_exception"
        || body.to_string().contains("already exists")
}
