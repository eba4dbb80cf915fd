//! Azure operation traits and common types.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while talking to Azure.
#[derive(Error, Debug)]
pub enum AzureError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Resource not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Authentication error (token acquisition or 401/403 responses).
    #[error("Authentication error: {0}")]
    Auth(String),
}

impl AzureError {
    /// Stable error code for programmatic handling and report details.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Http(_) => "AZURE_HTTP",
            Self::Api { .. } => "AZURE_API",
            Self::NotFound(_) => "AZURE_NOT_FOUND",
            Self::Config(_) => "AZURE_CONFIG",
            Self::Serialization(_) => "AZURE_SERIALIZATION",
            Self::Auth(_) => "AZURE_AUTH",
        }
    }
}

// ============================================================================
// Resource group types
// ============================================================================

/// A resource group within a subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceGroup {
    /// Full resource ID.
    pub id: String,
    /// Resource group name.
    pub name: String,
    /// Azure region.
    pub location: String,
    /// Tags on the group itself.
    pub tags: HashMap<String, String>,
}

/// A resource contained in a resource group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    /// Full resource ID.
    pub id: String,
    /// Resource name.
    pub name: String,
    /// Resource type, e.g. `Microsoft.Compute/virtualMachines`.
    pub resource_type: String,
    /// When the resource was created, if ARM reports it.
    pub created_time: Option<DateTime<Utc>>,
    /// When the resource was last changed, if ARM reports it.
    pub changed_time: Option<DateTime<Utc>>,
}

/// Management lock level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockLevel {
    /// Resources cannot be deleted.
    CanNotDelete,
    /// Resources cannot be modified or deleted.
    ReadOnly,
    /// Level not recognised.
    #[serde(other)]
    Unknown,
}

/// A management lock applied at resource group scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagementLock {
    /// Lock name.
    pub name: String,
    /// Lock level.
    pub level: LockLevel,
    /// Free-form notes.
    pub notes: Option<String>,
}

/// Operations scoped to a single subscription.
///
/// Implemented by [`crate::SubscriptionClient`]; the cleanup runner only
/// depends on this trait so it can be driven by in-memory fakes.
#[async_trait]
pub trait ResourceGroupOps: Send + Sync {
    /// Subscription this context is bound to.
    fn subscription_id(&self) -> &str;

    /// List every resource group in the subscription.
    async fn list_resource_groups(&self) -> Result<Vec<ResourceGroup>, AzureError>;

    /// List the resources contained in a group, with created/changed times.
    async fn list_resources(&self, resource_group: &str) -> Result<Vec<Resource>, AzureError>;

    /// List management locks applying to a group.
    async fn list_locks(&self, resource_group: &str) -> Result<Vec<ManagementLock>, AzureError>;

    /// Merge tags into the group's existing tags.
    async fn merge_tags(
        &self,
        resource_group: &str,
        tags: HashMap<String, String>,
    ) -> Result<(), AzureError>;

    /// Submit deletion of a group. Returns once ARM accepts the request.
    async fn begin_delete(&self, resource_group: &str) -> Result<(), AzureError>;
}

// ============================================================================
// Key Vault types
// ============================================================================

/// A Key Vault access policy entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessPolicy {
    /// Tenant of the principal.
    pub tenant_id: String,
    /// Object ID of the user, group or service principal.
    pub object_id: String,
    /// Application ID for compound identities.
    pub application_id: Option<String>,
    /// Key permissions.
    pub keys: Vec<String>,
    /// Secret permissions.
    pub secrets: Vec<String>,
    /// Certificate permissions.
    pub certificates: Vec<String>,
    /// Storage account permissions.
    pub storage: Vec<String>,
}

/// A Key Vault as seen from the management plane.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vault {
    /// Full resource ID.
    pub id: String,
    /// Vault name.
    pub name: String,
    /// Azure region.
    pub location: String,
    /// Data plane URI, e.g. `https://myvault.vault.azure.net/`.
    pub vault_uri: Option<String>,
    /// Whether Azure RBAC replaces access policies.
    pub rbac_authorization: bool,
    /// Access policies.
    pub access_policies: Vec<AccessPolicy>,
}

/// A secret version returned by the data plane.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretVersion {
    /// Versioned secret identifier, e.g. `https://v.vault.azure.net/secrets/name/abc123`.
    pub id: String,
    /// When the version was created.
    pub created: Option<DateTime<Utc>>,
}

/// Vault listing for a subscription.
#[async_trait]
pub trait VaultInventory: Send + Sync {
    /// Subscription this context is bound to.
    fn subscription_id(&self) -> &str;

    /// List Key Vaults with their access policies.
    async fn list_vaults(&self) -> Result<Vec<Vault>, AzureError>;
}

/// Secret write access to a single vault.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Vault base URL.
    fn vault_url(&self) -> &str;

    /// Store a new version of a secret.
    async fn set_secret(&self, name: &str, value: &str) -> Result<SecretVersion, AzureError>;
}

// ============================================================================
// Web app types
// ============================================================================

/// Identifies a web app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebAppRef {
    /// Subscription ID.
    pub subscription_id: String,
    /// Resource group.
    pub resource_group: String,
    /// Site name.
    pub name: String,
}

impl std::fmt::Display for WebAppRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.subscription_id, self.resource_group, self.name)
    }
}

/// App Service application settings access.
#[async_trait]
pub trait AppSettingsOps: Send + Sync {
    /// Read all application settings.
    async fn list_app_settings(
        &self,
        app: &WebAppRef,
    ) -> Result<HashMap<String, String>, AzureError>;

    /// Replace all application settings.
    async fn update_app_settings(
        &self,
        app: &WebAppRef,
        settings: HashMap<String, String>,
    ) -> Result<(), AzureError>;

    /// Restart the site.
    async fn restart_app(&self, app: &WebAppRef) -> Result<(), AzureError>;
}
