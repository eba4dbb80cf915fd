//! Azure control-plane client for azops.
//!
//! This crate wraps the handful of Azure REST surfaces the operational
//! commands need:
//!
//! - **Resource Manager** - resource groups, contained resources, locks, tags
//! - **Key Vault** - vault access policies and secret versions
//! - **App Service** - application settings
//! - **AKS** - user kubeconfig retrieval
//!
//! ## Authentication
//!
//! Tokens come from an existing auth stack, picked by [`credential_from_env`]:
//!
//! 1. Service principal (`AZURE_TENANT_ID`, `AZURE_CLIENT_ID`, `AZURE_CLIENT_SECRET`)
//! 2. Pre-issued token (`AZURE_ACCESS_TOKEN`)
//! 3. Azure CLI session (`az login`)
//!
//! ## Example
//!
//! ```rust,ignore
//! use azops_cloud::{credential_from_env, ArmClient, ResourceGroupOps};
//!
//! let arm = ArmClient::new(credential_from_env()?)?;
//! let sub = arm.subscription("00000000-0000-0000-0000-000000000000");
//! for group in sub.list_resource_groups().await? {
//!     println!("{} ({})", group.name, group.location);
//! }
//! ```

pub mod auth;
pub mod azure;
mod traits;

pub use auth::{
    credential_from_env, credential_from_lookup, AccessToken, AzureCliCredential,
    ClientSecretCredential, StaticTokenCredential, TokenCredential,
};
pub use azure::{ArmClient, SubscriptionClient, VaultClient};
pub use traits::{
    AccessPolicy, AppSettingsOps, AzureError, LockLevel, ManagementLock, Resource, ResourceGroup,
    ResourceGroupOps, SecretStore, SecretVersion, Vault, VaultInventory, WebAppRef,
};
