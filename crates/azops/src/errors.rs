//! Error types for azops operations.

use azops_cloud::AzureError;
use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file does not exist.
    #[error("Config file not found at '{path}'")]
    NotFound { path: String },

    /// Config file could not be parsed.
    #[error("Failed to parse config file '{path}': {message}")]
    Parse { path: String, message: String },

    /// Config values are inconsistent or out of range.
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    /// Config file could not be read.
    #[error("IO error reading config: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Shorthand for [`ConfigError::Invalid`].
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Stable error code.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "CONFIG_NOT_FOUND",
            Self::Parse { .. } => "CONFIG_PARSE_ERROR",
            Self::Invalid { .. } => "INVALID_CONFIGURATION",
            Self::Io { .. } => "CONFIG_IO_ERROR",
        }
    }

    /// Whether the user can fix this by editing the config or flags.
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::Parse { .. } | Self::Invalid { .. })
    }
}

/// Errors raised by the operational commands.
#[derive(Error, Debug)]
pub enum OpsError {
    /// Azure API failure.
    #[error(transparent)]
    Azure(#[from] AzureError),

    /// Kubernetes API failure.
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Kubeconfig could not be loaded.
    #[error("Invalid kubeconfig: {0}")]
    Kubeconfig(String),

    /// Report file could not be written.
    #[error("Failed to write report '{path}': {source}")]
    Report {
        path: String,
        source: std::io::Error,
    },

    /// JSON encoding failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration problem.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl OpsError {
    /// Stable error code.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Azure(e) => e.error_code(),
            Self::Kube(_) => "KUBE_API",
            Self::Kubeconfig(_) => "KUBECONFIG_INVALID",
            Self::Report { .. } => "REPORT_WRITE_FAILED",
            Self::Serialization(_) => "SERIALIZATION",
            Self::Config(e) => e.error_code(),
        }
    }

    /// Whether the error stems from user input rather than the platform.
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        match self {
            Self::Config(e) => e.is_user_error(),
            Self::Kubeconfig(_) => true,
            _ => false,
        }
    }
}

/// Process exit code for a failed run.
pub const EXIT_FAILURE: i32 = 1;
/// Process exit code when the failure is caused by user input.
pub const EXIT_USAGE: i32 = 2;

/// Pick the exit code for an error, looking through any added context.
#[must_use]
pub fn exit_code(error: &anyhow::Error) -> i32 {
    let user_error = error.chain().any(|cause| {
        cause
            .downcast_ref::<OpsError>()
            .is_some_and(OpsError::is_user_error)
            || cause
                .downcast_ref::<ConfigError>()
                .is_some_and(ConfigError::is_user_error)
    });
    if user_error {
        EXIT_USAGE
    } else {
        EXIT_FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_parse_error() {
        let error = ConfigError::Parse {
            path: "azops.yaml".to_string(),
            message: "invalid YAML".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Failed to parse config file 'azops.yaml': invalid YAML"
        );
        assert_eq!(error.error_code(), "CONFIG_PARSE_ERROR");
    }

    #[test]
    fn test_azure_error_passthrough() {
        let error = OpsError::from(AzureError::NotFound("rg-a".to_string()));
        assert_eq!(error.to_string(), "Resource not found: rg-a");
        assert_eq!(error.error_code(), "AZURE_NOT_FOUND");
        assert!(!error.is_user_error());
    }

    #[test]
    fn test_invalid_config_is_user_error() {
        let error = OpsError::from(ConfigError::invalid("no patterns"));
        assert_eq!(error.error_code(), "INVALID_CONFIGURATION");
        assert!(error.is_user_error());
    }

    #[test]
    fn test_config_user_errors() {
        assert!(ConfigError::invalid("bad").is_user_error());
        assert!(!ConfigError::NotFound {
            path: "azops.yaml".to_string()
        }
        .is_user_error());
    }

    #[test]
    fn test_exit_code_for_user_errors() {
        let err = anyhow::Error::from(ConfigError::invalid("no patterns"))
            .context("Failed to load configuration");
        assert_eq!(exit_code(&err), EXIT_USAGE);

        let err = anyhow::Error::from(OpsError::Kubeconfig("bad yaml".to_string()))
            .context("Failed to restart aks/default/api");
        assert_eq!(exit_code(&err), EXIT_USAGE);
    }

    #[test]
    fn test_exit_code_for_platform_errors() {
        let err = anyhow::Error::from(OpsError::from(AzureError::NotFound("rg-a".to_string())));
        assert_eq!(exit_code(&err), EXIT_FAILURE);

        let err = anyhow::anyhow!("some resource groups could not be processed");
        assert_eq!(exit_code(&err), EXIT_FAILURE);
    }
}
