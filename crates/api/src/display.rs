//! Static resource-type display-name table.
//!
//! Fallback used when the dynamic lookup cannot produce a display name.
//! Types without an entry render no structured resource row at all, so keep
//! this table in sync with the resource kinds the catalog can provision.

/// Human display name for a control-plane resource type.
pub fn resource_type_display_name(resource_type: &str) -> Option<&'static str> {
    let display = match resource_type {
        "Microsoft.Resources/resourceGroups" => "Resource group",
        "Microsoft.Storage/storageAccounts" => "Storage account",
        "Microsoft.KeyVault/vaults" => "Key Vault",
        "Microsoft.Web/sites" => "App Service",
        "Microsoft.Web/serverfarms" => "App Service plan",
        "Microsoft.Web/staticSites" => "Static Web App",
        "Microsoft.App/containerApps" => "Container App",
        "Microsoft.App/managedEnvironments" => "Container Apps Environment",
        "Microsoft.ContainerRegistry/registries" => "Container Registry",
        "Microsoft.ContainerService/managedClusters" => "AKS Managed Cluster",
        "Microsoft.ManagedIdentity/userAssignedIdentities" => "Managed Identity",
        "Microsoft.Insights/components" => "Application Insights",
        "Microsoft.Insights/actiongroups" => "Action group",
        "Microsoft.Portal/dashboards" => "Portal dashboard",
        "Microsoft.OperationalInsights/workspaces" => "Log Analytics workspace",
        "Microsoft.CognitiveServices/accounts" => "Azure AI Services",
        "Microsoft.DocumentDB/databaseAccounts" => "Azure Cosmos DB",
        "Microsoft.Cache/redis" => "Cache for Redis",
        "Microsoft.ServiceBus/namespaces" => "Service Bus",
        "Microsoft.EventHub/namespaces" => "Event Hubs",
        "Microsoft.DBforPostgreSQL/flexibleServers" => "Azure Database for PostgreSQL flexible server",
        "Microsoft.DBforMySQL/flexibleServers" => "Azure Database for MySQL flexible server",
        "Microsoft.Sql/servers" => "SQL server",
        "Microsoft.Search/searchServices" => "Search service",
        "Microsoft.SignalRService/SignalR" => "SignalR",
        "Microsoft.Network/virtualNetworks" => "Virtual network",
        _ => return None,
    };
    Some(display)
}
