//! App Service (web app) configuration.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::info;

use super::client::ArmClient;
use super::models::AppSettingsResource;
use crate::traits::{AppSettingsOps, AzureError, WebAppRef};

/// Azure API version for `Microsoft.Web`.
const WEB_API_VERSION: &str = "2022-03-01";

impl ArmClient {
    fn site_url(&self, app: &WebAppRef) -> String {
        format!(
            "{}/providers/Microsoft.Web/sites/{}",
            self.resource_group_url(&app.subscription_id, &app.resource_group),
            app.name
        )
    }
}

#[async_trait]
impl AppSettingsOps for ArmClient {
    async fn list_app_settings(
        &self,
        app: &WebAppRef,
    ) -> Result<HashMap<String, String>, AzureError> {
        let url = format!(
            "{}/config/appsettings/list?api-version={}",
            self.site_url(app),
            WEB_API_VERSION
        );

        let settings: AppSettingsResource = self.rest.post(&url).await?;
        Ok(settings.properties)
    }

    async fn update_app_settings(
        &self,
        app: &WebAppRef,
        settings: HashMap<String, String>,
    ) -> Result<(), AzureError> {
        let url = format!(
            "{}/config/appsettings?api-version={}",
            self.site_url(app),
            WEB_API_VERSION
        );

        let body = AppSettingsResource {
            properties: settings,
        };
        let _: AppSettingsResource = self.rest.put(&url, &body).await?;

        info!(app = %app, "App settings updated");
        Ok(())
    }

    async fn restart_app(&self, app: &WebAppRef) -> Result<(), AzureError> {
        let url = format!(
            "{}/restart?api-version={}",
            self.site_url(app),
            WEB_API_VERSION
        );

        self.rest.post_empty(&url).await?;

        info!(app = %app, "Web app restart requested");
        Ok(())
    }
}
