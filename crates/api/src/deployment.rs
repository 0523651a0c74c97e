//! Deployment handle consumed by the progress tracker.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use azd_types::ProvisioningState;
use reqwest::Method;
use serde_json::Value;

use crate::ArmClient;

const DEPLOYMENTS_API_VERSION: &str = "2021-04-01";
const PORTAL_BASE_URL: &str = "https://portal.azure.com";

/// The slice of deployment state the core inspects.
#[derive(Debug, Clone)]
pub struct DeploymentSummary {
    pub name: String,
    pub provisioning_state: ProvisioningState,
}

/// Opaque reference to a cloud-side deployment. The tracker observes it but
/// does not own its lifecycle.
#[async_trait]
pub trait Deployment: Send + Sync {
    /// Fetch the deployment's current state.
    async fn get(&self) -> Result<DeploymentSummary>;

    /// The portal URL where the deployment's progress can be inspected.
    async fn deployment_url(&self) -> Result<String>;

    fn subscription_id(&self) -> &str;

    /// Fully qualified resource id of the deployment itself.
    fn id(&self) -> String;
}

/// A resource-group scoped ARM deployment.
#[derive(Debug, Clone)]
pub struct ArmDeployment {
    client: ArmClient,
    subscription_id: String,
    resource_group: String,
    name: String,
}

impl ArmDeployment {
    pub fn new(
        client: ArmClient,
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            client,
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            name: name.into(),
        }
    }

    /// ARM path of this deployment, also its fully qualified resource id.
    pub fn path(&self) -> String {
        format!(
            "/subscriptions/{}/resourcegroups/{}/providers/Microsoft.Resources/deployments/{}",
            self.subscription_id, self.resource_group, self.name
        )
    }

    /// Submit (create or update) the deployment with the given template and
    /// parameter values.
    pub async fn submit(&self, template: &Value, parameters: &Value) -> Result<()> {
        let body = serde_json::json!({
            "properties": {
                "mode": "Incremental",
                "template": template,
                "parameters": parameters,
            }
        });
        let response = self
            .client
            .request(Method::PUT, &self.path(), DEPLOYMENTS_API_VERSION)
            .json(&body)
            .send()
            .await
            .context("submit deployment")?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("deployment submission failed: HTTP {}: {}", status.as_u16(), text));
        }
        Ok(())
    }
}

#[async_trait]
impl Deployment for ArmDeployment {
    async fn get(&self) -> Result<DeploymentSummary> {
        let response = self
            .client
            .request(Method::GET, &self.path(), DEPLOYMENTS_API_VERSION)
            .send()
            .await
            .context("fetch deployment")?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("fetch deployment failed: HTTP {}: {}", status.as_u16(), text));
        }
        let body: Value = response.json().await.context("parse deployment body")?;
        let state = body
            .pointer("/properties/provisioningState")
            .and_then(|v| v.as_str())
            .map(ProvisioningState::from)
            .ok_or_else(|| anyhow!("deployment response is missing provisioningState"))?;
        Ok(DeploymentSummary {
            name: self.name.clone(),
            provisioning_state: state,
        })
    }

    async fn deployment_url(&self) -> Result<String> {
        Ok(format!(
            "{}/#view/HubsExtension/DeploymentDetailsBlade/~/overview/id/{}",
            PORTAL_BASE_URL,
            encode_path_segment(&self.path())
        ))
    }

    fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    fn id(&self) -> String {
        self.path()
    }
}

/// Percent-encode a resource path for embedding inside a portal URL segment.
fn encode_path_segment(path: &str) -> String {
    let mut encoded = String::with_capacity(path.len());
    for byte in path.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char);
            }
            other => {
                encoded.push('%');
                encoded.push_str(&format!("{other:02X}"));
            }
        }
    }
    encoded
}
