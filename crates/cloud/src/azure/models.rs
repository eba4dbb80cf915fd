//! Azure API request and response models.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::traits::LockLevel;

/// Generic ARM list envelope.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    /// Items on this page.
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    /// Absolute URL of the next page.
    pub next_link: Option<String>,
}

// ============================================================================
// Resource groups and resources
// ============================================================================

/// Resource group as returned by `Microsoft.Resources`.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceGroupModel {
    /// Resource ID.
    pub id: String,
    /// Name.
    pub name: String,
    /// Location.
    pub location: String,
    /// Tags (ARM sends `null` when none are set).
    #[serde(default)]
    pub tags: Option<HashMap<String, String>>,
}

/// Generic resource, listed with `$expand=createdTime,changedTime`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenericResourceModel {
    /// Resource ID.
    pub id: String,
    /// Name.
    pub name: String,
    /// Resource type.
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Creation time.
    #[serde(default)]
    pub created_time: Option<DateTime<Utc>>,
    /// Last change time.
    #[serde(default)]
    pub changed_time: Option<DateTime<Utc>>,
}

/// Management lock.
#[derive(Debug, Clone, Deserialize)]
pub struct LockModel {
    /// Lock name.
    pub name: String,
    /// Lock properties.
    pub properties: LockProperties,
}

/// Management lock properties.
#[derive(Debug, Clone, Deserialize)]
pub struct LockProperties {
    /// Level.
    pub level: LockLevel,
    /// Notes.
    #[serde(default)]
    pub notes: Option<String>,
}

/// Body for `PATCH .../providers/Microsoft.Resources/tags/default`.
#[derive(Debug, Serialize)]
pub struct TagsPatchRequest {
    /// `Merge`, `Replace` or `Delete`.
    pub operation: String,
    /// Tags to apply.
    pub properties: TagsProperties,
}

/// Tag payload.
#[derive(Debug, Serialize)]
pub struct TagsProperties {
    /// Tag map.
    pub tags: HashMap<String, String>,
}

// ============================================================================
// Subscriptions
// ============================================================================

/// Subscription entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionModel {
    /// Subscription GUID.
    pub subscription_id: String,
    /// Display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// `Enabled`, `Disabled`, ...
    #[serde(default)]
    pub state: Option<String>,
}

// ============================================================================
// Key Vault (management plane)
// ============================================================================

/// Key Vault resource.
#[derive(Debug, Clone, Deserialize)]
pub struct VaultModel {
    /// Resource ID.
    pub id: String,
    /// Vault name.
    pub name: String,
    /// Location.
    pub location: String,
    /// Properties.
    pub properties: VaultProperties,
}

/// Key Vault properties.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultProperties {
    /// Tenant ID.
    #[serde(default)]
    pub tenant_id: Option<String>,
    /// Data plane URI.
    #[serde(default)]
    pub vault_uri: Option<String>,
    /// Access policies.
    #[serde(default)]
    pub access_policies: Vec<AccessPolicyEntry>,
    /// RBAC authorization flag.
    #[serde(default)]
    pub enable_rbac_authorization: Option<bool>,
}

/// Access policy entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessPolicyEntry {
    /// Tenant ID.
    pub tenant_id: String,
    /// Principal object ID.
    pub object_id: String,
    /// Application ID.
    #[serde(default)]
    pub application_id: Option<String>,
    /// Permissions.
    #[serde(default)]
    pub permissions: Permissions,
}

/// Permission sets of an access policy.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Permissions {
    /// Key permissions.
    #[serde(default)]
    pub keys: Vec<String>,
    /// Secret permissions.
    #[serde(default)]
    pub secrets: Vec<String>,
    /// Certificate permissions.
    #[serde(default)]
    pub certificates: Vec<String>,
    /// Storage permissions.
    #[serde(default)]
    pub storage: Vec<String>,
}

// ============================================================================
// Key Vault (data plane)
// ============================================================================

/// Body for `PUT /secrets/{name}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetSecretRequest<'a> {
    /// Secret value.
    pub value: &'a str,
    /// Optional content type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<&'a str>,
}

/// Secret bundle returned by the data plane. The value is never kept.
#[derive(Debug, Deserialize)]
pub struct SecretBundle {
    /// Versioned secret identifier.
    pub id: String,
    /// Attributes.
    #[serde(default)]
    pub attributes: Option<SecretAttributes>,
}

/// Secret attributes (times are POSIX seconds).
#[derive(Debug, Deserialize)]
pub struct SecretAttributes {
    /// Enabled flag.
    #[serde(default)]
    pub enabled: Option<bool>,
    /// Creation time.
    #[serde(default)]
    pub created: Option<i64>,
}

// ============================================================================
// App Service
// ============================================================================

/// App settings resource (`config/appsettings`).
#[derive(Debug, Serialize, Deserialize)]
pub struct AppSettingsResource {
    /// Setting name to value.
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

// ============================================================================
// AKS
// ============================================================================

/// AKS credentials response.
#[derive(Debug, Deserialize)]
pub struct AksCredentials {
    /// Kubeconfigs.
    #[serde(default)]
    pub kubeconfigs: Vec<KubeconfigEntry>,
}

/// Kubeconfig entry.
#[derive(Debug, Deserialize)]
pub struct KubeconfigEntry {
    /// Kubeconfig name.
    pub name: String,
    /// Kubeconfig value (base64 encoded).
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_group_null_tags() {
        let json = r#"{"id":"/subscriptions/s/resourceGroups/rg","name":"rg","location":"westeurope","tags":null,"properties":{"provisioningState":"Succeeded"}}"#;
        let rg: ResourceGroupModel = serde_json::from_str(json).unwrap();
        assert!(rg.tags.is_none());
    }

    #[test]
    fn test_generic_resource_times() {
        let json = r#"{
            "id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Storage/storageAccounts/sa",
            "name": "sa",
            "type": "Microsoft.Storage/storageAccounts",
            "createdTime": "2024-01-10T08:00:00.1234567Z",
            "changedTime": "2024-02-01T09:30:00Z"
        }"#;
        let res: GenericResourceModel = serde_json::from_str(json).unwrap();
        assert_eq!(res.resource_type, "Microsoft.Storage/storageAccounts");
        assert!(res.created_time.is_some());
        assert_eq!(res.changed_time.unwrap().to_rfc3339(), "2024-02-01T09:30:00+00:00");
    }

    #[test]
    fn test_lock_level_unknown() {
        let json = r#"{"name":"l","properties":{"level":"Something"}}"#;
        let lock: LockModel = serde_json::from_str(json).unwrap();
        assert_eq!(lock.properties.level, LockLevel::Unknown);
    }

    #[test]
    fn test_list_response_next_link() {
        let json = r#"{"value":[],"nextLink":"https://management.azure.com/next"}"#;
        let page: ListResponse<ResourceGroupModel> = serde_json::from_str(json).unwrap();
        assert_eq!(page.next_link.as_deref(), Some("https://management.azure.com/next"));
    }

    #[test]
    fn test_tags_patch_serialization() {
        let body = TagsPatchRequest {
            operation: "Merge".to_string(),
            properties: TagsProperties {
                tags: HashMap::from([("cleanup-candidate".to_string(), "2024-05-01".to_string())]),
            },
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["operation"], "Merge");
        assert_eq!(value["properties"]["tags"]["cleanup-candidate"], "2024-05-01");
    }
}
