//! Host-side provisioning loop: fill the deployment input set, then watch
//! the deployment until it reaches a terminal state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use azd_api::{Deployment, LocationProvider, ResourceManager};
use azd_console::Console;
use azd_types::{ParamValue, ParameterDefinition, ProvisioningState};
use chrono::Utc;
use indexmap::IndexMap;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::progress::ProvisioningProgressDisplay;
use crate::prompt::{PromptError, Prompter};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// How a watch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
    Succeeded,
    Failed,
    /// The deployment engine canceled the deployment, or the local
    /// cancellation token fired. Not an error.
    Canceled,
}

/// Orchestrates parameter collection and progress watching for one command.
pub struct Provisioner {
    console: Arc<dyn Console>,
    resource_manager: Arc<dyn ResourceManager>,
    locations: Arc<dyn LocationProvider>,
    poll_interval: Duration,
}

impl Provisioner {
    pub fn new(
        console: Arc<dyn Console>,
        resource_manager: Arc<dyn ResourceManager>,
        locations: Arc<dyn LocationProvider>,
    ) -> Self {
        Self {
            console,
            resource_manager,
            locations,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Resolve every parameter in declaration order: stored values are
    /// reused as-is, everything else is prompted with the template's own
    /// default as the suggestion.
    pub async fn ensure_parameters(
        &self,
        definitions: &IndexMap<String, ParameterDefinition>,
        stored: &HashMap<String, Value>,
    ) -> Result<IndexMap<String, ParamValue>, PromptError> {
        let prompter = Prompter::new(Arc::clone(&self.console), Arc::clone(&self.locations));
        let mut values = IndexMap::new();
        for (name, definition) in definitions {
            if let Some(existing) = stored.get(name) {
                let value = ParamValue::from_json(existing, definition.r#type).map_err(|_| {
                    PromptError::StoredValueType {
                        name: name.clone(),
                        value: existing.clone(),
                    }
                })?;
                values.insert(name.clone(), value);
                continue;
            }
            let value = prompter
                .prompt_for_parameter(name, definition, definition.default_value.as_ref())
                .await?;
            values.insert(name.clone(), value);
        }
        Ok(values)
    }

    /// Poll the deployment, reporting progress each tick, until it reaches a
    /// terminal state or `cancellation` fires.
    ///
    /// Each watch owns a fresh progress display; tracker state is never
    /// shared between watches.
    pub async fn watch(
        &self,
        deployment: Arc<dyn Deployment>,
        cancellation: CancellationToken,
    ) -> Result<WatchOutcome> {
        let query_start = Utc::now();
        let mut display = ProvisioningProgressDisplay::new(
            Arc::clone(&self.resource_manager),
            Arc::clone(&self.console),
            Arc::clone(&deployment),
        );
        let mut ticker = tokio::time::interval(self.poll_interval);

        loop {
            tokio::select! {
                biased;
                _ = cancellation.cancelled() => {
                    info!("provisioning watch canceled");
                    return Ok(WatchOutcome::Canceled);
                }
                _ = ticker.tick() => {}
            }

            display.report_progress(Some(query_start)).await?;

            match deployment.get().await {
                Ok(summary) if summary.provisioning_state.is_terminal() => {
                    // One final sweep so operations settled between the last
                    // tick and the terminal state still get reported.
                    display.report_progress(Some(query_start)).await?;
                    let outcome = match summary.provisioning_state {
                        ProvisioningState::Succeeded => WatchOutcome::Succeeded,
                        ProvisioningState::Canceled => WatchOutcome::Canceled,
                        _ => WatchOutcome::Failed,
                    };
                    info!(deployment = %summary.name, state = %summary.provisioning_state, "deployment reached terminal state");
                    return Ok(outcome);
                }
                Ok(_) => {}
                Err(error) => {
                    // Transient; the next tick retries.
                    debug!("deployment state probe failed: {error:#}");
                }
            }
        }
    }
}
