//! Operational commands for Azure subscriptions.
//!
//! - [`cleanup`] - find idle resource groups, tag or delete them
//! - [`restart`] - rolling restart of an AKS deployment
//! - [`rotation`] - rotate a Key Vault secret and update bound web apps
//! - [`audit`] - export Key Vault access policies
//!
//! Azure access goes through [`azops_cloud`]; each command takes the client
//! traits it needs so it can run against in-memory fakes in tests.

pub mod audit;
pub mod cleanup;
pub mod config;
pub mod errors;
pub mod logging;
pub mod report;
pub mod restart;
pub mod rotation;
pub mod ui;

pub use config::AzopsConfig;
pub use errors::{ConfigError, OpsError};
