//! Key Vault access policy audit.

use serde::Serialize;
use tracing::{debug, info, warn};

use azops_cloud::{AccessPolicy, Vault, VaultInventory};

use crate::report::TabularRecord;

/// One access policy grant (or one placeholder row for a vault without
/// policies).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessPolicyRow {
    pub subscription: String,
    pub vault_name: String,
    pub location: String,
    pub rbac_enabled: bool,
    pub tenant_id: String,
    pub object_id: String,
    pub application_id: String,
    pub key_permissions: String,
    pub secret_permissions: String,
    pub certificate_permissions: String,
    pub storage_permissions: String,
}

impl TabularRecord for AccessPolicyRow {
    const HEADERS: &'static [&'static str] = &[
        "Subscription",
        "VaultName",
        "Location",
        "RbacEnabled",
        "TenantId",
        "ObjectId",
        "ApplicationId",
        "KeyPermissions",
        "SecretPermissions",
        "CertificatePermissions",
        "StoragePermissions",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            self.subscription.clone(),
            self.vault_name.clone(),
            self.location.clone(),
            self.rbac_enabled.to_string(),
            self.tenant_id.clone(),
            self.object_id.clone(),
            self.application_id.clone(),
            self.key_permissions.clone(),
            self.secret_permissions.clone(),
            self.certificate_permissions.clone(),
            self.storage_permissions.clone(),
        ]
    }
}

/// Audit rows plus subscriptions that could not be listed.
#[derive(Debug, Default)]
pub struct AuditReport {
    pub rows: Vec<AccessPolicyRow>,
    pub failed_subscriptions: Vec<String>,
}

fn join(perms: &[String]) -> String {
    perms.join(";")
}

/// Flatten a vault into one row per access policy.
#[must_use]
pub fn flatten_vault(subscription: &str, vault: &Vault) -> Vec<AccessPolicyRow> {
    let row = |policy: &AccessPolicy| AccessPolicyRow {
        subscription: subscription.to_string(),
        vault_name: vault.name.clone(),
        location: vault.location.clone(),
        rbac_enabled: vault.rbac_authorization,
        tenant_id: policy.tenant_id.clone(),
        object_id: policy.object_id.clone(),
        application_id: policy.application_id.clone().unwrap_or_default(),
        key_permissions: join(&policy.keys),
        secret_permissions: join(&policy.secrets),
        certificate_permissions: join(&policy.certificates),
        storage_permissions: join(&policy.storage),
    };

    if vault.access_policies.is_empty() {
        return vec![row(&AccessPolicy::default())];
    }
    vault.access_policies.iter().map(row).collect()
}

/// List vaults in every subscription and flatten their access policies.
pub async fn audit_access_policies<V: VaultInventory>(subscriptions: &[V]) -> AuditReport {
    let mut report = AuditReport::default();

    for sub in subscriptions {
        let subscription_id = sub.subscription_id();
        match sub.list_vaults().await {
            Ok(vaults) => {
                debug!(subscription = %subscription_id, vaults = vaults.len(), "Listed key vaults");
                for vault in &vaults {
                    report.rows.extend(flatten_vault(subscription_id, vault));
                }
            }
            Err(e) => {
                warn!(
                    subscription = %subscription_id,
                    error = %e,
                    "Failed to list key vaults, skipping subscription"
                );
                report.failed_subscriptions.push(subscription_id.to_string());
            }
        }
    }

    info!(
        rows = report.rows.len(),
        failed_subscriptions = report.failed_subscriptions.len(),
        "Access policy audit complete"
    );
    report
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use azops_cloud::AzureError;

    use super::*;

    struct FakeInventory {
        id: String,
        vaults: Option<Vec<Vault>>,
    }

    #[async_trait]
    impl VaultInventory for FakeInventory {
        fn subscription_id(&self) -> &str {
            &self.id
        }

        async fn list_vaults(&self) -> Result<Vec<Vault>, AzureError> {
            self.vaults.clone().ok_or_else(|| AzureError::Api {
                status: 500,
                message: "boom".into(),
            })
        }
    }

    fn vault(name: &str, rbac: bool, policies: Vec<AccessPolicy>) -> Vault {
        Vault {
            id: format!("/subscriptions/s/resourceGroups/rg/providers/Microsoft.KeyVault/vaults/{name}"),
            name: name.into(),
            location: "westeurope".into(),
            vault_uri: Some(format!("https://{name}.vault.azure.net/")),
            rbac_authorization: rbac,
            access_policies: policies,
        }
    }

    fn policy(object_id: &str) -> AccessPolicy {
        AccessPolicy {
            tenant_id: "tenant".into(),
            object_id: object_id.into(),
            application_id: None,
            keys: vec![],
            secrets: vec!["get".into(), "list".into()],
            certificates: vec![],
            storage: vec![],
        }
    }

    #[test]
    fn test_one_row_per_policy() {
        let rows = flatten_vault("sub-1", &vault("kv-a", false, vec![policy("o1"), policy("o2")]));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].object_id, "o1");
        assert_eq!(rows[1].secret_permissions, "get;list");
        assert!(!rows[0].rbac_enabled);
    }

    #[test]
    fn test_rbac_vault_without_policies_yields_placeholder() {
        let rows = flatten_vault("sub-1", &vault("kv-rbac", true, vec![]));
        assert_eq!(rows.len(), 1);
        assert!(rows[0].rbac_enabled);
        assert!(rows[0].object_id.is_empty());
        assert!(rows[0].secret_permissions.is_empty());
    }

    #[test]
    fn test_row_cells_match_headers() {
        let rows = flatten_vault("sub-1", &vault("kv-a", false, vec![policy("o1")]));
        assert_eq!(rows[0].cells().len(), AccessPolicyRow::HEADERS.len());
    }

    #[tokio::test]
    async fn test_failed_subscription_skipped() {
        let subs = vec![
            FakeInventory {
                id: "sub-bad".into(),
                vaults: None,
            },
            FakeInventory {
                id: "sub-ok".into(),
                vaults: Some(vec![vault("kv-a", false, vec![policy("o1")])]),
            },
        ];

        let report = audit_access_policies(&subs).await;

        assert_eq!(report.failed_subscriptions, vec!["sub-bad".to_string()]);
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].subscription, "sub-ok");
    }
}
