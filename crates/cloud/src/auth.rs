//! Bearer token acquisition.
//!
//! Tokens are never minted here. Each credential defers to an existing
//! authentication stack: a pre-issued token, the Azure CLI login, or the
//! Microsoft identity platform client-credentials endpoint.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::traits::AzureError;

/// Token audience for Azure Resource Manager.
pub const ARM_RESOURCE: &str = "https://management.azure.com/";

/// Token audience for the Key Vault data plane.
pub const VAULT_RESOURCE: &str = "https://vault.azure.net";

/// Default Microsoft identity platform authority.
const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

/// Tokens this close to expiry are refreshed.
const EXPIRY_MARGIN_SECS: i64 = 300;

/// An OAuth2 bearer token.
#[derive(Clone)]
pub struct AccessToken {
    /// Raw bearer token.
    pub token: String,
    /// Expiry, when known.
    pub expires_on: Option<DateTime<Utc>>,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        self.expires_on.is_none_or(|exp| {
            exp - chrono::Duration::seconds(EXPIRY_MARGIN_SECS) > Utc::now()
        })
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

/// Source of bearer tokens for a given resource audience.
#[async_trait]
pub trait TokenCredential: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Get a token valid for `resource`.
    async fn get_token(&self, resource: &str) -> Result<AccessToken, AzureError>;
}

/// Per-resource token cache shared by the refreshing credentials.
#[derive(Default)]
struct TokenCache {
    tokens: Mutex<HashMap<String, AccessToken>>,
}

impl TokenCache {
    async fn get(&self, resource: &str) -> Option<AccessToken> {
        let tokens = self.tokens.lock().await;
        tokens.get(resource).filter(|t| t.is_fresh()).cloned()
    }

    async fn put(&self, resource: &str, token: AccessToken) {
        self.tokens.lock().await.insert(resource.to_string(), token);
    }
}

// ============================================================================
// Static token
// ============================================================================

/// A pre-issued token used for every audience.
pub struct StaticTokenCredential {
    token: String,
}

impl StaticTokenCredential {
    /// Wrap an existing bearer token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenCredential for StaticTokenCredential {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn get_token(&self, _resource: &str) -> Result<AccessToken, AzureError> {
        Ok(AccessToken {
            token: self.token.clone(),
            expires_on: None,
        })
    }
}

// ============================================================================
// Azure CLI
// ============================================================================

/// Output of `az account get-access-token`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliTokenResponse {
    access_token: String,
    /// POSIX expiry, emitted by newer CLI versions.
    #[serde(rename = "expires_on")]
    expires_on_epoch: Option<i64>,
}

/// Uses the signed-in Azure CLI session (`az login`).
#[derive(Default)]
pub struct AzureCliCredential {
    cache: TokenCache,
}

impl AzureCliCredential {
    /// Create a CLI-backed credential.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn parse_output(stdout: &[u8]) -> Result<AccessToken, AzureError> {
        let parsed: CliTokenResponse = serde_json::from_slice(stdout)?;
        Ok(AccessToken {
            token: parsed.access_token,
            expires_on: parsed
                .expires_on_epoch
                .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        })
    }
}

#[async_trait]
impl TokenCredential for AzureCliCredential {
    fn name(&self) -> &'static str {
        "azure-cli"
    }

    async fn get_token(&self, resource: &str) -> Result<AccessToken, AzureError> {
        if let Some(token) = self.cache.get(resource).await {
            return Ok(token);
        }

        debug!(resource = %resource, "Requesting token from Azure CLI");

        let output = tokio::process::Command::new("az")
            .args([
                "account",
                "get-access-token",
                "--resource",
                resource,
                "--output",
                "json",
            ])
            .output()
            .await
            .map_err(|e| {
                AzureError::Auth(format!(
                    "Azure CLI `az` not found or not runnable ({e}). Install it and run `az login`"
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AzureError::Auth(format!(
                "az account get-access-token failed: {}",
                stderr.trim()
            )));
        }

        let token = Self::parse_output(&output.stdout)?;
        self.cache.put(resource, token.clone()).await;
        Ok(token)
    }
}

// ============================================================================
// Client credentials (service principal)
// ============================================================================

#[derive(Debug, Deserialize)]
struct OAuthTokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Service principal secret via the OAuth2 client-credentials grant.
pub struct ClientSecretCredential {
    client: Client,
    authority: String,
    tenant_id: String,
    client_id: String,
    client_secret: String,
    cache: TokenCache,
}

impl ClientSecretCredential {
    /// Create a credential against the public cloud authority.
    ///
    /// # Errors
    /// Returns error if HTTP client cannot be created.
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self, AzureError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(AzureError::Http)?;

        Ok(Self {
            client,
            authority: DEFAULT_AUTHORITY.to_string(),
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            cache: TokenCache::default(),
        })
    }

    /// Override the authority host (sovereign clouds, tests).
    #[must_use]
    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = authority.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl TokenCredential for ClientSecretCredential {
    fn name(&self) -> &'static str {
        "client-secret"
    }

    async fn get_token(&self, resource: &str) -> Result<AccessToken, AzureError> {
        if let Some(token) = self.cache.get(resource).await {
            return Ok(token);
        }

        let url = format!("{}/{}/oauth2/v2.0/token", self.authority, self.tenant_id);
        let scope = format!("{}/.default", resource.trim_end_matches('/'));

        debug!(url = %url, scope = %scope, "Requesting client-credentials token");

        let response = self
            .client
            .post(&url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("scope", scope.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(AzureError::Auth(format!(
                "token endpoint returned {}: {}",
                status.as_u16(),
                text
            )));
        }

        let parsed: OAuthTokenResponse = serde_json::from_str(&text)?;
        let token = AccessToken {
            token: parsed.access_token,
            expires_on: parsed
                .expires_in
                .map(|secs| Utc::now() + chrono::Duration::seconds(secs)),
        };
        self.cache.put(resource, token.clone()).await;
        Ok(token)
    }
}

// ============================================================================
// Selection
// ============================================================================

/// Pick a credential from environment-style variables.
///
/// Order: `AZURE_TENANT_ID` + `AZURE_CLIENT_ID` + `AZURE_CLIENT_SECRET`, then
/// `AZURE_ACCESS_TOKEN`, then the Azure CLI session.
///
/// # Errors
/// Returns error if the HTTP client for the client-secret flow cannot be built.
pub fn credential_from_lookup<F>(lookup: F) -> Result<Arc<dyn TokenCredential>, AzureError>
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    let credential: Arc<dyn TokenCredential> = if let (Some(tenant), Some(client), Some(secret)) = (
        non_empty("AZURE_TENANT_ID"),
        non_empty("AZURE_CLIENT_ID"),
        non_empty("AZURE_CLIENT_SECRET"),
    ) {
        Arc::new(ClientSecretCredential::new(tenant, client, secret)?)
    } else if let Some(token) = non_empty("AZURE_ACCESS_TOKEN") {
        Arc::new(StaticTokenCredential::new(token))
    } else {
        Arc::new(AzureCliCredential::new())
    };

    info!(credential = credential.name(), "Selected Azure credential");
    Ok(credential)
}

/// [`credential_from_lookup`] over the process environment.
///
/// # Errors
/// See [`credential_from_lookup`].
pub fn credential_from_env() -> Result<Arc<dyn TokenCredential>, AzureError> {
    credential_from_lookup(|key| std::env::var(key).ok())
}
