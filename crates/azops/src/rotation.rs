//! Key Vault secret rotation and propagation to web app settings.

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use azops_cloud::{AppSettingsOps, AzureError, SecretStore, WebAppRef};

use crate::errors::{ConfigError, OpsError};

/// Default generated secret length.
pub const DEFAULT_SECRET_LENGTH: usize = 32;

const MIN_SECRET_LENGTH: usize = 8;
const MAX_SECRET_LENGTH: usize = 1024;

/// How a bound setting receives the new secret.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingMode {
    /// `@Microsoft.KeyVault(SecretUri=...)` pointing at the new version.
    #[default]
    Reference,
    /// The literal secret value.
    Value,
}

/// A web app setting that follows a rotated secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretBinding {
    pub subscription_id: String,
    pub resource_group: String,
    pub web_app: String,
    pub setting: String,
    #[serde(default)]
    pub mode: BindingMode,
}

impl SecretBinding {
    #[must_use]
    pub fn app(&self) -> WebAppRef {
        WebAppRef {
            subscription_id: self.subscription_id.clone(),
            resource_group: self.resource_group.clone(),
            name: self.web_app.clone(),
        }
    }
}

/// Where the new secret value comes from.
#[derive(Clone)]
pub enum SecretValue {
    /// Caller-supplied value.
    Explicit(String),
    /// Random alphanumeric value of the given length.
    Generated { length: usize },
}

impl std::fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Explicit(_) => f.write_str("Explicit(<redacted>)"),
            Self::Generated { length } => write!(f, "Generated {{ length: {length} }}"),
        }
    }
}

/// One rotation request.
#[derive(Debug, Clone)]
pub struct RotationRequest {
    pub secret_name: String,
    pub value: SecretValue,
    pub restart_apps: bool,
}

/// Per-binding result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum BindingResult {
    Updated { restarted: bool },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindingOutcome {
    pub app: String,
    pub setting: String,
    #[serde(flatten)]
    pub result: BindingResult,
}

/// Result of a rotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RotationOutcome {
    pub secret_version_id: String,
    pub bindings: Vec<BindingOutcome>,
}

impl RotationOutcome {
    #[must_use]
    pub fn failed_bindings(&self) -> usize {
        self.bindings
            .iter()
            .filter(|b| matches!(b.result, BindingResult::Failed { .. }))
            .count()
    }
}

/// Random alphanumeric secret.
pub fn generate_secret(length: usize) -> Result<String, ConfigError> {
    if !(MIN_SECRET_LENGTH..=MAX_SECRET_LENGTH).contains(&length) {
        return Err(ConfigError::invalid(format!(
            "secret length must be between {MIN_SECRET_LENGTH} and {MAX_SECRET_LENGTH}, got {length}"
        )));
    }
    Ok(rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect())
}

/// App Service Key Vault reference for a secret version id.
#[must_use]
pub fn key_vault_reference(secret_version_id: &str) -> String {
    format!("@Microsoft.KeyVault(SecretUri={secret_version_id})")
}

/// Set a new secret version, then update every bound setting.
///
/// Fails only when the secret itself cannot be written; binding failures
/// are collected in the outcome.
pub async fn rotate_secret<S, A>(
    store: &S,
    apps: &A,
    request: &RotationRequest,
    bindings: &[SecretBinding],
) -> Result<RotationOutcome, OpsError>
where
    S: SecretStore + ?Sized,
    A: AppSettingsOps + ?Sized,
{
    let value = match &request.value {
        SecretValue::Explicit(v) if v.is_empty() => {
            return Err(ConfigError::invalid("secret value must not be empty").into());
        }
        SecretValue::Explicit(v) => v.clone(),
        SecretValue::Generated { length } => generate_secret(*length)?,
    };

    let version = store.set_secret(&request.secret_name, &value).await?;
    info!(
        vault = %store.vault_url(),
        secret = %request.secret_name,
        version = %version.id,
        "Secret rotated"
    );

    let mut outcomes = Vec::with_capacity(bindings.len());
    for binding in bindings {
        let app = binding.app();
        let new_setting = match binding.mode {
            BindingMode::Reference => key_vault_reference(&version.id),
            BindingMode::Value => value.clone(),
        };

        let updated =
            update_binding(apps, &app, &binding.setting, new_setting, request.restart_apps).await;
        let result = match updated {
            Ok(restarted) => {
                info!(
                    app = %app,
                    setting = %binding.setting,
                    mode = ?binding.mode,
                    restarted,
                    "Binding updated"
                );
                BindingResult::Updated { restarted }
            }
            Err(e) => {
                warn!(app = %app, setting = %binding.setting, error = %e, "Binding update failed");
                BindingResult::Failed {
                    error: e.to_string(),
                }
            }
        };

        outcomes.push(BindingOutcome {
            app: app.to_string(),
            setting: binding.setting.clone(),
            result,
        });
    }

    Ok(RotationOutcome {
        secret_version_id: version.id,
        bindings: outcomes,
    })
}

/// Read-modify-write one setting; returns whether the app was restarted.
async fn update_binding<A: AppSettingsOps + ?Sized>(
    apps: &A,
    app: &WebAppRef,
    setting: &str,
    value: String,
    restart: bool,
) -> Result<bool, AzureError> {
    let mut settings = apps.list_app_settings(app).await?;
    settings.insert(setting.to_string(), value);
    apps.update_app_settings(app, settings).await?;

    if restart {
        apps.restart_app(app).await?;
    }
    Ok(restart)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use azops_cloud::SecretVersion;

    use super::*;

    const VERSION_ID: &str = "https://kv-ops.vault.azure.net/secrets/db-password/abc123";

    #[derive(Default)]
    struct FakeVault {
        written: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl SecretStore for FakeVault {
        fn vault_url(&self) -> &str {
            "https://kv-ops.vault.azure.net"
        }

        async fn set_secret(&self, name: &str, value: &str) -> Result<SecretVersion, AzureError> {
            if self.fail {
                return Err(AzureError::Auth("forbidden".into()));
            }
            self.written.lock().unwrap().push((name.into(), value.into()));
            Ok(SecretVersion {
                id: VERSION_ID.into(),
                created: None,
            })
        }
    }

    #[derive(Default)]
    struct FakeApps {
        settings: Mutex<HashMap<String, HashMap<String, String>>>,
        missing: Vec<String>,
        restarted: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AppSettingsOps for FakeApps {
        async fn list_app_settings(
            &self,
            app: &WebAppRef,
        ) -> Result<HashMap<String, String>, AzureError> {
            if self.missing.contains(&app.name) {
                return Err(AzureError::NotFound(app.name.clone()));
            }
            Ok(self
                .settings
                .lock()
                .unwrap()
                .get(&app.name)
                .cloned()
                .unwrap_or_default())
        }

        async fn update_app_settings(
            &self,
            app: &WebAppRef,
            settings: HashMap<String, String>,
        ) -> Result<(), AzureError> {
            self.settings
                .lock()
                .unwrap()
                .insert(app.name.clone(), settings);
            Ok(())
        }

        async fn restart_app(&self, app: &WebAppRef) -> Result<(), AzureError> {
            self.restarted.lock().unwrap().push(app.name.clone());
            Ok(())
        }
    }

    fn binding(app: &str, mode: BindingMode) -> SecretBinding {
        SecretBinding {
            subscription_id: "sub-1".into(),
            resource_group: "rg-web".into(),
            web_app: app.into(),
            setting: "DB_PASSWORD".into(),
            mode,
        }
    }

    fn request(value: SecretValue, restart_apps: bool) -> RotationRequest {
        RotationRequest {
            secret_name: "db-password".into(),
            value,
            restart_apps,
        }
    }

    #[test]
    fn test_generate_secret() {
        let secret = generate_secret(32).unwrap();
        assert_eq!(secret.len(), 32);
        assert!(secret.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(secret, generate_secret(32).unwrap());
    }

    #[test]
    fn test_generate_secret_length_bounds() {
        assert!(generate_secret(4).is_err());
        assert!(generate_secret(2048).is_err());
        assert!(generate_secret(8).is_ok());
    }

    #[test]
    fn test_key_vault_reference() {
        assert_eq!(
            key_vault_reference(VERSION_ID),
            format!("@Microsoft.KeyVault(SecretUri={VERSION_ID})")
        );
    }

    #[test]
    fn test_explicit_value_redacted_in_debug() {
        let debug = format!("{:?}", SecretValue::Explicit("hunter2".into()));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_binding_mode_defaults_to_reference() {
        let binding: SecretBinding = serde_json::from_str(
            r#"{"subscriptionId":"s","resourceGroup":"rg","webApp":"app","setting":"X"}"#,
        )
        .unwrap();
        assert_eq!(binding.mode, BindingMode::Reference);
    }

    #[tokio::test]
    async fn test_rotate_updates_bindings() {
        let vault = FakeVault::default();
        let apps = FakeApps::default();
        apps.settings.lock().unwrap().insert(
            "api".into(),
            HashMap::from([("OTHER".to_string(), "keep".to_string())]),
        );

        let outcome = rotate_secret(
            &vault,
            &apps,
            &request(SecretValue::Explicit("s3cret-value".into()), false),
            &[
                binding("api", BindingMode::Reference),
                binding("worker", BindingMode::Value),
            ],
        )
        .await
        .unwrap();

        assert_eq!(outcome.secret_version_id, VERSION_ID);
        assert_eq!(outcome.failed_bindings(), 0);

        let settings = apps.settings.lock().unwrap();
        assert_eq!(settings["api"]["DB_PASSWORD"], key_vault_reference(VERSION_ID));
        assert_eq!(settings["api"]["OTHER"], "keep");
        assert_eq!(settings["worker"]["DB_PASSWORD"], "s3cret-value");
        assert!(apps.restarted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_binding_failure_does_not_stop_others() {
        let vault = FakeVault::default();
        let apps = FakeApps {
            missing: vec!["gone".into()],
            ..FakeApps::default()
        };

        let outcome = rotate_secret(
            &vault,
            &apps,
            &request(SecretValue::Generated { length: 24 }, true),
            &[
                binding("gone", BindingMode::Reference),
                binding("api", BindingMode::Reference),
            ],
        )
        .await
        .unwrap();

        assert_eq!(outcome.failed_bindings(), 1);
        assert_eq!(
            outcome.bindings[1].result,
            BindingResult::Updated { restarted: true }
        );
        assert_eq!(*apps.restarted.lock().unwrap(), vec!["api".to_string()]);

        let written = vault.written.lock().unwrap();
        assert_eq!(written[0].1.len(), 24);
    }

    #[tokio::test]
    async fn test_secret_write_failure_aborts() {
        let vault = FakeVault {
            fail: true,
            ..FakeVault::default()
        };
        let apps = FakeApps::default();

        let err = rotate_secret(
            &vault,
            &apps,
            &request(SecretValue::Generated { length: 32 }, false),
            &[binding("api", BindingMode::Reference)],
        )
        .await
        .unwrap_err();

        assert_eq!(err.error_code(), "AZURE_AUTH");
        assert!(apps.settings.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_explicit_value_rejected() {
        let err = rotate_secret(
            &FakeVault::default(),
            &FakeApps::default(),
            &request(SecretValue::Explicit(String::new()), false),
            &[],
        )
        .await
        .unwrap_err();
        assert!(err.is_user_error());
    }
}
