//! AKS cluster credentials.

use tracing::info;

use super::client::ArmClient;
use super::models::AksCredentials;
use crate::traits::AzureError;

/// Azure API version for AKS.
const AKS_API_VERSION: &str = "2023-11-01";

impl ArmClient {
    /// Fetch the cluster user kubeconfig as YAML text.
    ///
    /// # Errors
    /// Returns error if the request fails, the response has no kubeconfig,
    /// or the payload is not valid base64 UTF-8.
    pub async fn get_aks_kubeconfig(
        &self,
        subscription_id: &str,
        resource_group: &str,
        cluster: &str,
    ) -> Result<String, AzureError> {
        // cluster can be full resource ID or just the cluster name
        let name = cluster.rsplit('/').next().unwrap_or(cluster);

        info!(cluster = %name, resource_group = %resource_group, "Fetching AKS user credentials");

        let url = format!(
            "{}/providers/Microsoft.ContainerService/managedClusters/{}/listClusterUserCredential?api-version={}",
            self.resource_group_url(subscription_id, resource_group),
            name,
            AKS_API_VERSION
        );

        let creds: AksCredentials = self.rest.post(&url).await?;
        decode_kubeconfig(&creds)
    }
}

fn decode_kubeconfig(creds: &AksCredentials) -> Result<String, AzureError> {
    let kubeconfig = creds
        .kubeconfigs
        .first()
        .ok_or_else(|| AzureError::Config("No kubeconfig available".to_string()))?;

    let decoded = base64::Engine::decode(
        &base64::engine::general_purpose::STANDARD,
        &kubeconfig.value,
    )
    .map_err(|e| AzureError::Config(format!("Failed to decode kubeconfig: {e}")))?;

    String::from_utf8(decoded).map_err(|e| AzureError::Config(format!("Invalid kubeconfig: {e}")))
}
