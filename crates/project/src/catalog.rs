//! Static catalog of composable resource types.
//!
//! The catalog is compile-time data; runtime code only reads it. Order is
//! part of the contract: pickers and the extension ListResourceTypes
//! operation present entries in this order.

use std::sync::OnceLock;

use azd_types::ComposedResourceType;

fn entry(name: &str, display_name: &str, r#type: &str, kinds: &[&str]) -> ComposedResourceType {
    ComposedResourceType {
        name: name.to_string(),
        display_name: display_name.to_string(),
        r#type: r#type.to_string(),
        kinds: kinds.iter().map(|k| k.to_string()).collect(),
    }
}

/// All composable resource types known to this build.
pub fn resource_type_catalog() -> &'static [ComposedResourceType] {
    static CATALOG: OnceLock<Vec<ComposedResourceType>> = OnceLock::new();
    CATALOG.get_or_init(|| {
        vec![
            entry(
                "host.containerapp",
                "Container App",
                "Microsoft.App/containerApps",
                &["web", "api", "worker"],
            ),
            entry("host.appservice", "App Service", "Microsoft.Web/sites", &["app", "functionapp"]),
            entry(
                "db.postgres",
                "PostgreSQL flexible server",
                "Microsoft.DBforPostgreSQL/flexibleServers",
                &[],
            ),
            entry("db.mysql", "MySQL flexible server", "Microsoft.DBforMySQL/flexibleServers", &[]),
            entry("db.redis", "Cache for Redis", "Microsoft.Cache/redis", &[]),
            entry(
                "db.cosmos",
                "Cosmos DB",
                "Microsoft.DocumentDB/databaseAccounts",
                &["GlobalDocumentDB"],
            ),
            entry(
                "db.mongo",
                "Cosmos DB for MongoDB",
                "Microsoft.DocumentDB/databaseAccounts",
                &["MongoDB"],
            ),
            entry("storage", "Storage account", "Microsoft.Storage/storageAccounts", &[]),
            entry("keyvault", "Key Vault", "Microsoft.KeyVault/vaults", &[]),
            entry("messaging.servicebus", "Service Bus", "Microsoft.ServiceBus/namespaces", &[]),
            entry("messaging.eventhubs", "Event Hubs", "Microsoft.EventHub/namespaces", &[]),
            entry(
                "ai.openai.model",
                "Azure OpenAI model deployment",
                "Microsoft.CognitiveServices/accounts",
                &["OpenAI"],
            ),
        ]
    })
}

/// Look up one catalog entry by its type id.
pub fn find_resource_type(name: &str) -> Option<&'static ComposedResourceType> {
    resource_type_catalog().iter().find(|rt| rt.name == name)
}
