//! Resource-level queries over a deployment: operation listings, dynamic
//! display names, and subscription locations.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use azd_types::{DeploymentOperation, ProvisioningState, TargetResource};
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;

use crate::deployment::Deployment;
use crate::{ArmClient, display};

const OPERATIONS_API_VERSION: &str = "2021-04-01";
const SITES_API_VERSION: &str = "2022-03-01";
const LOCATIONS_API_VERSION: &str = "2022-12-01";

/// Queries the control plane for per-resource deployment state.
#[async_trait]
pub trait ResourceManager: Send + Sync {
    /// All operations of the deployment updated at or after `since`.
    async fn deployment_operations(
        &self,
        deployment: &dyn Deployment,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<DeploymentOperation>>;

    /// Resolve a resource type to its human display name, consulting the
    /// live resource where the name depends on the resource's kind.
    async fn resource_type_display_name(
        &self,
        subscription_id: &str,
        resource_id: &str,
        resource_type: &str,
    ) -> Result<String>;
}

/// A subscription region offered by the location picker.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub name: String,
    pub display_name: String,
    pub regional_display_name: String,
}

/// Lists the regions available to a subscription.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn locations(&self) -> Result<Vec<Location>>;
}

/// ARM-backed [`ResourceManager`].
#[derive(Debug, Clone)]
pub struct ArmResourceManager {
    client: ArmClient,
}

impl ArmResourceManager {
    pub fn new(client: ArmClient) -> Self {
        Self { client }
    }

    async fn get_json(&self, path: &str, api_version: &str) -> Result<Value> {
        let response = self
            .client
            .request(Method::GET, path, api_version)
            .send()
            .await
            .with_context(|| format!("GET {path}"))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("GET {path} failed: HTTP {}: {}", status.as_u16(), text));
        }
        response.json().await.context("parse response body")
    }
}

#[async_trait]
impl ResourceManager for ArmResourceManager {
    async fn deployment_operations(
        &self,
        deployment: &dyn Deployment,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<DeploymentOperation>> {
        let body = self
            .get_json(&format!("{}/operations", deployment.id()), OPERATIONS_API_VERSION)
            .await?;
        let mut operations = parse_operations(&body)?;
        if let Some(since) = since {
            operations.retain(|op| op.timestamp >= since);
        }
        Ok(operations)
    }

    async fn resource_type_display_name(
        &self,
        _subscription_id: &str,
        resource_id: &str,
        resource_type: &str,
    ) -> Result<String> {
        // Web sites carry their flavor in the resource's kind; everything
        // else resolves through the static table.
        if resource_type == "Microsoft.Web/sites" {
            let site = self.get_json(resource_id, SITES_API_VERSION).await?;
            let kind = site.get("kind").and_then(|k| k.as_str()).unwrap_or_default();
            return Ok(web_site_display_name(kind).to_string());
        }
        Ok(display::resource_type_display_name(resource_type)
            .unwrap_or_default()
            .to_string())
    }
}

fn web_site_display_name(kind: &str) -> &'static str {
    if kind.contains("functionapp") {
        "Function App"
    } else {
        "App Service"
    }
}

/// Flatten the ARM operations listing into [`DeploymentOperation`] records.
fn parse_operations(body: &Value) -> Result<Vec<DeploymentOperation>> {
    let entries = body
        .get("value")
        .and_then(|v| v.as_array())
        .ok_or_else(|| anyhow!("operations response is missing 'value'"))?;

    let mut operations = Vec::with_capacity(entries.len());
    for entry in entries {
        let Some(properties) = entry.get("properties") else {
            continue;
        };
        let target_resource = properties.get("targetResource").and_then(parse_target_resource);
        let provisioning_state = properties
            .get("provisioningState")
            .and_then(|v| v.as_str())
            .map(ProvisioningState::from)
            .unwrap_or(ProvisioningState::Other(String::new()));
        let timestamp = properties
            .get("timestamp")
            .and_then(|v| v.as_str())
            .and_then(|raw| raw.parse::<DateTime<Utc>>().ok())
            .ok_or_else(|| anyhow!("operation is missing a timestamp"))?;
        let duration = properties
            .get("duration")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        operations.push(DeploymentOperation {
            target_resource,
            provisioning_state,
            timestamp,
            duration,
        });
    }
    Ok(operations)
}

fn parse_target_resource(value: &Value) -> Option<TargetResource> {
    Some(TargetResource {
        id: value.get("id")?.as_str()?.to_string(),
        resource_name: value.get("resourceName")?.as_str()?.to_string(),
        resource_type: value.get("resourceType")?.as_str()?.to_string(),
    })
}

/// ARM-backed [`LocationProvider`] scoped to one subscription.
#[derive(Debug, Clone)]
pub struct ArmLocationProvider {
    client: ArmClient,
    subscription_id: String,
}

impl ArmLocationProvider {
    pub fn new(client: ArmClient, subscription_id: impl Into<String>) -> Self {
        Self {
            client,
            subscription_id: subscription_id.into(),
        }
    }
}

#[async_trait]
impl LocationProvider for ArmLocationProvider {
    async fn locations(&self) -> Result<Vec<Location>> {
        let path = format!("/subscriptions/{}/locations", self.subscription_id);
        let response = self
            .client
            .request(Method::GET, &path, LOCATIONS_API_VERSION)
            .send()
            .await
            .context("list locations")?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("list locations failed: HTTP {}: {}", status.as_u16(), text));
        }
        #[derive(Deserialize)]
        struct Listing {
            value: Vec<Location>,
        }
        let listing: Listing = response.json().await.context("parse locations body")?;
        Ok(listing.value)
    }
}
