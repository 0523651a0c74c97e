//! Thin control-plane client and the interfaces the provisioning core
//! consumes from it.
//!
//! The core only depends on the [`Deployment`], [`ResourceManager`], and
//! [`LocationProvider`] traits; the ARM-backed implementations here are the
//! production wiring used by the binary.

pub mod deployment;
pub mod display;
pub mod resources;

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder};
use std::time::Duration;
use tracing::debug;

pub use deployment::{ArmDeployment, Deployment, DeploymentSummary};
pub use display::resource_type_display_name;
pub use resources::{ArmLocationProvider, ArmResourceManager, Location, LocationProvider, ResourceManager};

const DEFAULT_BASE_URL: &str = "https://management.azure.com";

/// HTTP client for the ARM control plane.
///
/// Credential acquisition lives outside this crate; the client reads an
/// already-minted bearer token from `AZD_ACCESS_TOKEN` and an optional base
/// URL override from `AZD_ARM_BASE`.
#[derive(Debug, Clone)]
pub struct ArmClient {
    pub base_url: String,
    pub http: Client,
    pub user_agent: String,
}

impl ArmClient {
    pub fn new_from_env() -> Result<Self> {
        let token = std::env::var("AZD_ACCESS_TOKEN").ok();
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(t) = token {
            let value = format!("Bearer {}", t);
            headers.insert(
                reqwest::header::AUTHORIZATION,
                reqwest::header::HeaderValue::from_str(&value).context("authorization header")?,
            );
        }
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let http = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .context("build http client")?;
        Ok(Self {
            base_url: std::env::var("AZD_ARM_BASE").unwrap_or_else(|_| DEFAULT_BASE_URL.into()),
            http,
            user_agent: format!("azd/0.1 (+https://example.com); {}", std::env::consts::OS),
        })
    }

    /// Build a request for an ARM path, attaching the api-version query.
    pub fn request(&self, method: reqwest::Method, path: &str, api_version: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, api_version, "building request");
        self.http
            .request(method, url)
            .query(&[("api-version", api_version)])
            .header(reqwest::header::USER_AGENT, &self.user_agent)
    }
}
