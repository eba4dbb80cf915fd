//! Rolling restart of a deployment in an AKS cluster.

use chrono::{DateTime, SecondsFormat, Utc};
use k8s_openapi::api::apps::v1::Deployment;
use kube::api::{Api, Patch, PatchParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use serde_json::json;
use tracing::{debug, info};

use azops_cloud::ArmClient;

use crate::errors::OpsError;

/// Pod template annotation bumped to trigger a rollout.
pub const RESTARTED_AT_ANNOTATION: &str = "kubectl.kubernetes.io/restartedAt";

/// Deployment to restart and the cluster hosting it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentTarget {
    pub subscription_id: String,
    pub resource_group: String,
    pub cluster: String,
    pub namespace: String,
    pub deployment: String,
}

impl std::fmt::Display for DeploymentTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.cluster, self.namespace, self.deployment)
    }
}

/// Merge patch equivalent to `kubectl rollout restart`.
#[must_use]
pub fn restart_patch(now: DateTime<Utc>) -> serde_json::Value {
    json!({
        "spec": {
            "template": {
                "metadata": {
                    "annotations": {
                        RESTARTED_AT_ANNOTATION: now.to_rfc3339_opts(SecondsFormat::Secs, true)
                    }
                }
            }
        }
    })
}

/// Build a Kubernetes client from kubeconfig YAML.
pub async fn client_from_kubeconfig(yaml: &str) -> Result<Client, OpsError> {
    let kubeconfig =
        Kubeconfig::from_yaml(yaml).map_err(|e| OpsError::Kubeconfig(e.to_string()))?;
    let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .map_err(|e| OpsError::Kubeconfig(e.to_string()))?;
    Ok(Client::try_from(config)?)
}

/// Patch the deployment's restart annotation.
pub async fn patch_restart(
    client: Client,
    namespace: &str,
    deployment: &str,
    now: DateTime<Utc>,
) -> Result<(), OpsError> {
    let deployments: Api<Deployment> = Api::namespaced(client, namespace);
    let patch = restart_patch(now);

    deployments
        .patch(deployment, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;

    Ok(())
}

/// Fetch cluster credentials and restart the deployment. Does not wait for
/// the rollout to finish.
pub async fn restart_deployment(
    arm: &ArmClient,
    target: &DeploymentTarget,
    now: DateTime<Utc>,
) -> Result<(), OpsError> {
    let kubeconfig = arm
        .get_aks_kubeconfig(&target.subscription_id, &target.resource_group, &target.cluster)
        .await?;
    debug!(cluster = %target.cluster, "Received cluster kubeconfig");

    let client = client_from_kubeconfig(&kubeconfig).await?;
    patch_restart(client, &target.namespace, &target.deployment, now).await?;

    info!(
        cluster = %target.cluster,
        namespace = %target.namespace,
        deployment = %target.deployment,
        "Deployment restart triggered"
    );
    Ok(())
}
