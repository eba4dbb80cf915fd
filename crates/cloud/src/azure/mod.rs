//! Microsoft Azure REST clients.
//!
//! ## Services
//!
//! - **Resource Manager** - subscriptions, resource groups, locks, tags
//! - **Key Vault** - vault inventory (management plane) and secrets (data plane)
//! - **App Service** - application settings and restarts
//! - **AKS** (Azure Kubernetes Service) - cluster user credentials

mod aks;
mod client;
mod keyvault;
mod models;
mod resources;
mod web;

pub use client::{ArmClient, ARM_BASE_URL};
pub use keyvault::VaultClient;
pub use models::*;
pub use resources::SubscriptionClient;
