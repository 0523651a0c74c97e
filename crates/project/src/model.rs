//! Shared-mutable store of composed resources.

use std::fs;
use std::path::Path;
use std::sync::RwLock;

use anyhow::{Context, Result};
use azd_types::ComposedResource;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::catalog;

/// Mutating the project failed.
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("resource name must not be empty")]
    EmptyName,
    #[error("a resource named '{0}' already exists in the project")]
    DuplicateName(String),
    #[error("unknown resource type '{0}'")]
    UnknownType(String),
}

/// On-disk shape of a project file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ProjectFile {
    #[serde(default)]
    resources: Vec<ComposedResource>,
}

/// The active project's composable resources.
///
/// Readers take a consistent snapshot; mutation is serialized through the
/// single writer lock. Clone the `Arc<Project>` to share it between the host
/// command and the extension service.
#[derive(Debug, Default)]
pub struct Project {
    resources: RwLock<Vec<ComposedResource>>,
}

impl Project {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a project from its JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let file: ProjectFile = serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))?;
        debug!(resources = file.resources.len(), path = %path.display(), "loaded project");
        Ok(Self {
            resources: RwLock::new(file.resources),
        })
    }

    /// Persist the project to its JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let snapshot = self.list_resources();
        let file = ProjectFile { resources: snapshot };
        let rendered = serde_json::to_string_pretty(&file).context("serialize project")?;
        fs::write(path, rendered).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    /// Snapshot of all resources in declaration order.
    pub fn list_resources(&self) -> Vec<ComposedResource> {
        self.resources.read().expect("project lock poisoned").clone()
    }

    /// One resource by name.
    pub fn get_resource(&self, name: &str) -> Option<ComposedResource> {
        self.resources
            .read()
            .expect("project lock poisoned")
            .iter()
            .find(|resource| resource.name == name)
            .cloned()
    }

    /// Append a resource, normalizing it first.
    ///
    /// Normalization trims the name and de-duplicates `uses` while keeping
    /// first-occurrence order. `uses` entries may reference resources that do
    /// not exist yet; extensions wire dependencies before all parts of a
    /// composition are present.
    pub fn add_resource(&self, resource: ComposedResource) -> Result<ComposedResource, ProjectError> {
        let mut normalized = resource;
        normalized.name = normalized.name.trim().to_string();
        if normalized.name.is_empty() {
            return Err(ProjectError::EmptyName);
        }
        if catalog::find_resource_type(&normalized.r#type).is_none() {
            return Err(ProjectError::UnknownType(normalized.r#type));
        }
        let mut deduped = Vec::with_capacity(normalized.uses.len());
        for used in normalized.uses.drain(..) {
            if !deduped.contains(&used) {
                deduped.push(used);
            }
        }
        normalized.uses = deduped;

        let mut resources = self.resources.write().expect("project lock poisoned");
        if resources.iter().any(|existing| existing.name == normalized.name) {
            return Err(ProjectError::DuplicateName(normalized.name));
        }
        resources.push(normalized.clone());
        debug!(name = %normalized.name, resource_type = %normalized.r#type, "added resource");
        Ok(normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(name: &str, r#type: &str) -> ComposedResource {
        ComposedResource {
            name: name.to_string(),
            r#type: r#type.to_string(),
            ..ComposedResource::default()
        }
    }

    #[test]
    fn add_and_get_round_trip() {
        let project = Project::new();
        project.add_resource(resource("db", "db.postgres")).expect("add");
        let fetched = project.get_resource("db").expect("present");
        assert_eq!(fetched.r#type, "db.postgres");
        assert!(project.get_resource("missing").is_none());
    }

    #[test]
    fn add_normalizes_name_and_uses() {
        let project = Project::new();
        let mut input = resource("  web ", "host.containerapp");
        input.uses = vec!["db".into(), "vault".into(), "db".into()];
        let normalized = project.add_resource(input).expect("add");
        assert_eq!(normalized.name, "web");
        assert_eq!(normalized.uses, vec!["db", "vault"]);
    }

    #[test]
    fn add_rejects_duplicates_and_unknown_types() {
        let project = Project::new();
        project.add_resource(resource("db", "db.postgres")).expect("first add");
        assert!(matches!(
            project.add_resource(resource("db", "db.postgres")),
            Err(ProjectError::DuplicateName(_))
        ));
        assert!(matches!(
            project.add_resource(resource("x", "db.oracle")),
            Err(ProjectError::UnknownType(_))
        ));
        assert!(matches!(
            project.add_resource(resource("   ", "db.postgres")),
            Err(ProjectError::EmptyName)
        ));
    }

    #[test]
    fn list_returns_declaration_order() {
        let project = Project::new();
        project.add_resource(resource("a", "storage")).expect("add a");
        project.add_resource(resource("b", "keyvault")).expect("add b");
        let names: Vec<String> = project.list_resources().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("project.json");

        let project = Project::new();
        let mut web = resource("web", "host.containerapp");
        web.config = b"{\"ingress\":true}".to_vec();
        web.uses = vec!["db".into()];
        project.add_resource(web).expect("add");
        project.save(&path).expect("save");

        let loaded = Project::load(&path).expect("load");
        let resources = loaded.list_resources();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].name, "web");
        assert_eq!(resources[0].config, b"{\"ingress\":true}");
        assert_eq!(resources[0].uses, vec!["db"]);
    }
}
