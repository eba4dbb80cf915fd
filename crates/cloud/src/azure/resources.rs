//! Subscription-scoped Resource Manager operations.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::{debug, info};

use super::client::ArmClient;
use super::models::{
    GenericResourceModel, LockModel, ResourceGroupModel, TagsPatchRequest, TagsProperties,
    VaultModel,
};
use crate::traits::{
    AccessPolicy, AzureError, ManagementLock, Resource, ResourceGroup, ResourceGroupOps, Vault,
    VaultInventory,
};

/// Azure API version for `Microsoft.Resources`.
const RESOURCES_API_VERSION: &str = "2021-04-01";

/// Azure API version for `Microsoft.Authorization/locks`.
const LOCKS_API_VERSION: &str = "2016-09-01";

/// Azure API version for `Microsoft.KeyVault/vaults`.
const KEYVAULT_API_VERSION: &str = "2022-07-01";

/// Explicit per-subscription client context.
#[derive(Clone)]
pub struct SubscriptionClient {
    arm: ArmClient,
    subscription_id: String,
}

impl SubscriptionClient {
    pub(crate) fn new(arm: ArmClient, subscription_id: String) -> Self {
        Self {
            arm,
            subscription_id,
        }
    }

    /// Subscription ID this context is bound to.
    #[must_use]
    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    fn group_url(&self, resource_group: &str) -> String {
        self.arm
            .resource_group_url(&self.subscription_id, resource_group)
    }

    fn to_resource_group(model: ResourceGroupModel) -> ResourceGroup {
        ResourceGroup {
            id: model.id,
            name: model.name,
            location: model.location,
            tags: model.tags.unwrap_or_default(),
        }
    }

    fn to_resource(model: GenericResourceModel) -> Resource {
        Resource {
            id: model.id,
            name: model.name,
            resource_type: model.resource_type,
            created_time: model.created_time,
            changed_time: model.changed_time,
        }
    }

    fn to_vault(model: VaultModel) -> Vault {
        let access_policies = model
            .properties
            .access_policies
            .into_iter()
            .map(|p| AccessPolicy {
                tenant_id: p.tenant_id,
                object_id: p.object_id,
                application_id: p.application_id,
                keys: p.permissions.keys,
                secrets: p.permissions.secrets,
                certificates: p.permissions.certificates,
                storage: p.permissions.storage,
            })
            .collect();

        Vault {
            id: model.id,
            name: model.name,
            location: model.location,
            vault_uri: model.properties.vault_uri,
            rbac_authorization: model.properties.enable_rbac_authorization.unwrap_or(false),
            access_policies,
        }
    }
}

#[async_trait]
impl ResourceGroupOps for SubscriptionClient {
    fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    async fn list_resource_groups(&self) -> Result<Vec<ResourceGroup>, AzureError> {
        let url = format!(
            "{}/resourcegroups?api-version={}",
            self.arm.subscription_url(&self.subscription_id),
            RESOURCES_API_VERSION
        );

        let groups: Vec<ResourceGroupModel> = self.arm.rest.get_paged(&url).await?;
        debug!(
            subscription_id = %self.subscription_id,
            count = groups.len(),
            "Listed resource groups"
        );
        Ok(groups.into_iter().map(Self::to_resource_group).collect())
    }

    async fn list_resources(&self, resource_group: &str) -> Result<Vec<Resource>, AzureError> {
        let url = format!(
            "{}/resources?$expand=createdTime,changedTime&api-version={}",
            self.group_url(resource_group),
            RESOURCES_API_VERSION
        );

        let resources: Vec<GenericResourceModel> = self.arm.rest.get_paged(&url).await?;
        Ok(resources.into_iter().map(Self::to_resource).collect())
    }

    async fn list_locks(&self, resource_group: &str) -> Result<Vec<ManagementLock>, AzureError> {
        let url = format!(
            "{}/providers/Microsoft.Authorization/locks?api-version={}",
            self.group_url(resource_group),
            LOCKS_API_VERSION
        );

        let locks: Vec<LockModel> = self.arm.rest.get_paged(&url).await?;
        Ok(locks
            .into_iter()
            .map(|l| ManagementLock {
                name: l.name,
                level: l.properties.level,
                notes: l.properties.notes,
            })
            .collect())
    }

    async fn merge_tags(
        &self,
        resource_group: &str,
        tags: HashMap<String, String>,
    ) -> Result<(), AzureError> {
        let url = format!(
            "{}/providers/Microsoft.Resources/tags/default?api-version={}",
            self.group_url(resource_group),
            RESOURCES_API_VERSION
        );

        let body = TagsPatchRequest {
            operation: "Merge".to_string(),
            properties: TagsProperties { tags },
        };

        self.arm.rest.patch(&url, &body).await?;

        info!(
            subscription_id = %self.subscription_id,
            resource_group = %resource_group,
            "Resource group tags merged"
        );
        Ok(())
    }

    async fn begin_delete(&self, resource_group: &str) -> Result<(), AzureError> {
        info!(
            subscription_id = %self.subscription_id,
            resource_group = %resource_group,
            "Deleting resource group"
        );

        let url = format!(
            "{}?api-version={}",
            self.group_url(resource_group),
            RESOURCES_API_VERSION
        );

        self.arm.rest.delete(&url).await?;

        info!(
            subscription_id = %self.subscription_id,
            resource_group = %resource_group,
            "Resource group deletion initiated"
        );
        Ok(())
    }
}

#[async_trait]
impl VaultInventory for SubscriptionClient {
    fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    async fn list_vaults(&self) -> Result<Vec<Vault>, AzureError> {
        let url = format!(
            "{}/providers/Microsoft.KeyVault/vaults?api-version={}",
            self.arm.subscription_url(&self.subscription_id),
            KEYVAULT_API_VERSION
        );

        let vaults: Vec<VaultModel> = self.arm.rest.get_paged(&url).await?;
        Ok(vaults.into_iter().map(Self::to_vault).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::azure::models::{AccessPolicyEntry, Permissions, VaultProperties};

    #[test]
    fn test_vault_conversion_defaults_rbac_off() {
        let model = VaultModel {
            id: "/subscriptions/s/resourceGroups/rg/providers/Microsoft.KeyVault/vaults/kv".into(),
            name: "kv".into(),
            location: "westeurope".into(),
            properties: VaultProperties {
                tenant_id: Some("tenant".into()),
                vault_uri: Some("https://kv.vault.azure.net/".into()),
                access_policies: vec![AccessPolicyEntry {
                    tenant_id: "tenant".into(),
                    object_id: "obj".into(),
                    application_id: None,
                    permissions: Permissions {
                        secrets: vec!["get".into(), "list".into()],
                        ..Permissions::default()
                    },
                }],
                enable_rbac_authorization: None,
            },
        };

        let vault = SubscriptionClient::to_vault(model);
        assert!(!vault.rbac_authorization);
        assert_eq!(vault.access_policies.len(), 1);
        assert_eq!(vault.access_policies[0].secrets, vec!["get", "list"]);
    }

    #[test]
    fn test_resource_group_conversion_null_tags() {
        let rg = SubscriptionClient::to_resource_group(ResourceGroupModel {
            id: "id".into(),
            name: "rg".into(),
            location: "eastus".into(),
            tags: None,
        });
        assert!(rg.tags.is_empty());
    }
}
