//! Deployment operation records observed from the cloud deployment engine.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provisioning state reported by the deployment engine for an operation.
///
/// The engine reports free-form strings; the common states are modeled as
/// variants and anything else is preserved verbatim in `Other` so that log
/// lines render what the engine actually said.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningState {
    Running,
    Succeeded,
    Failed,
    Canceled,
    Other(String),
}

impl From<&str> for ProvisioningState {
    fn from(value: &str) -> Self {
        match value {
            "Running" => Self::Running,
            "Succeeded" => Self::Succeeded,
            "Failed" => Self::Failed,
            "Canceled" => Self::Canceled,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ProvisioningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => f.write_str("Running"),
            Self::Succeeded => f.write_str("Succeeded"),
            Self::Failed => f.write_str("Failed"),
            Self::Canceled => f.write_str("Canceled"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

impl Serialize for ProvisioningState {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ProvisioningState {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from(raw.as_str()))
    }
}

impl ProvisioningState {
    /// Whether this state ends a deployment.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }
}

/// The resource an operation targets. Absent for non-resource operations
/// such as template validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetResource {
    /// Fully qualified resource id
    pub id: String,
    pub resource_name: String,
    pub resource_type: String,
}

/// One unit of work inside a deployment, as reported by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentOperation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_resource: Option<TargetResource>,
    pub provisioning_state: ProvisioningState,
    /// Completion (or latest update) time reported by the engine
    pub timestamp: DateTime<Utc>,
    /// Elapsed time as an ISO-8601 duration string, kept verbatim
    #[serde(default)]
    pub duration: String,
}

impl DeploymentOperation {
    /// Convenience constructor used by pollers and tests.
    pub fn for_resource(
        id: impl Into<String>,
        name: impl Into<String>,
        resource_type: impl Into<String>,
        state: ProvisioningState,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            target_resource: Some(TargetResource {
                id: id.into(),
                resource_name: name.into(),
                resource_type: resource_type.into(),
            }),
            provisioning_state: state,
            timestamp,
            duration: String::new(),
        }
    }
}
