//! Key Vault data plane client.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tracing::info;

use super::client::Rest;
use super::models::{SecretBundle, SetSecretRequest};
use crate::auth::{TokenCredential, VAULT_RESOURCE};
use crate::traits::{AzureError, SecretStore, SecretVersion};

/// Key Vault data plane API version.
const KEYVAULT_DATA_API_VERSION: &str = "7.4";

/// Public cloud vault DNS suffix.
const VAULT_DNS_SUFFIX: &str = "vault.azure.net";

/// Client for one vault's secrets.
#[derive(Clone)]
pub struct VaultClient {
    rest: Rest,
    vault_url: String,
}

impl VaultClient {
    /// Create a client for a vault given its name or its full URL.
    ///
    /// # Errors
    /// Returns error if the vault reference is invalid or the HTTP client
    /// cannot be created.
    pub fn new(credential: Arc<dyn TokenCredential>, vault: &str) -> Result<Self, AzureError> {
        Ok(Self {
            rest: Rest::new(credential, VAULT_RESOURCE)?,
            vault_url: Self::resolve_vault_url(vault)?,
        })
    }

    /// Turn a vault name or URL into a base URL without trailing slash.
    ///
    /// # Errors
    /// Returns error for an empty reference, an unparsable URL, or an
    /// invalid vault name.
    pub fn resolve_vault_url(vault: &str) -> Result<String, AzureError> {
        let vault = vault.trim();
        if vault.contains("://") {
            let parsed = url::Url::parse(vault)
                .map_err(|e| AzureError::Config(format!("invalid vault URL '{vault}': {e}")))?;
            return Ok(parsed.as_str().trim_end_matches('/').to_string());
        }

        let valid = (3..=24).contains(&vault.len())
            && vault.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            && vault.starts_with(|c: char| c.is_ascii_alphabetic());
        if !valid {
            return Err(AzureError::Config(format!("invalid vault name '{vault}'")));
        }

        Ok(format!("https://{vault}.{VAULT_DNS_SUFFIX}"))
    }

    fn validate_secret_name(name: &str) -> Result<(), AzureError> {
        let valid = (1..=127).contains(&name.len())
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
        if valid {
            Ok(())
        } else {
            Err(AzureError::Config(format!("invalid secret name '{name}'")))
        }
    }
}

#[async_trait]
impl SecretStore for VaultClient {
    fn vault_url(&self) -> &str {
        &self.vault_url
    }

    async fn set_secret(&self, name: &str, value: &str) -> Result<SecretVersion, AzureError> {
        Self::validate_secret_name(name)?;

        let url = format!(
            "{}/secrets/{}?api-version={}",
            self.vault_url, name, KEYVAULT_DATA_API_VERSION
        );

        let body = SetSecretRequest {
            value,
            content_type: None,
        };
        let bundle: SecretBundle = self.rest.put(&url, &body).await?;

        info!(
            vault = %self.vault_url,
            secret = %name,
            version_id = %bundle.id,
            "Secret version created"
        );

        Ok(SecretVersion {
            id: bundle.id,
            created: bundle
                .attributes
                .and_then(|a| a.created)
                .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_vault_name() {
        assert_eq!(
            VaultClient::resolve_vault_url("kv-prod-01").unwrap(),
            "https://kv-prod-01.vault.azure.net"
        );
    }

    #[test]
    fn test_resolve_vault_url_passthrough() {
        assert_eq!(
            VaultClient::resolve_vault_url("https://kv-prod-01.vault.azure.net/").unwrap(),
            "https://kv-prod-01.vault.azure.net"
        );
    }

    #[test]
    fn test_resolve_vault_rejects_bad_names() {
        assert!(VaultClient::resolve_vault_url("").is_err());
        assert!(VaultClient::resolve_vault_url("kv_prod").is_err());
        assert!(VaultClient::resolve_vault_url("1kv").is_err());
    }

    #[test]
    fn test_secret_name_validation() {
        assert!(VaultClient::validate_secret_name("db-password").is_ok());
        assert!(VaultClient::validate_secret_name("db_password").is_err());
        assert!(VaultClient::validate_secret_name("").is_err());
    }
}
