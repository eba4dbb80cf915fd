//! Azure REST client core.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use tracing::{debug, warn};

use super::models::{ListResponse, SubscriptionModel};
use super::resources::SubscriptionClient;
use crate::auth::{TokenCredential, ARM_RESOURCE};
use crate::traits::AzureError;

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Public cloud Resource Manager endpoint.
pub const ARM_BASE_URL: &str = "https://management.azure.com";

/// Azure API version for subscriptions.
const SUBSCRIPTIONS_API_VERSION: &str = "2022-12-01";

/// Upper bound on pages followed for a single listing.
const MAX_PAGES: usize = 1000;

/// Authenticated JSON transport for one token audience.
#[derive(Clone)]
pub(crate) struct Rest {
    client: Client,
    credential: Arc<dyn TokenCredential>,
    resource: &'static str,
}

impl Rest {
    pub(crate) fn new(
        credential: Arc<dyn TokenCredential>,
        resource: &'static str,
    ) -> Result<Self, AzureError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(AzureError::Http)?;

        Ok(Self {
            client,
            credential,
            resource,
        })
    }

    async fn authorized(&self, builder: RequestBuilder) -> Result<RequestBuilder, AzureError> {
        let token = self.credential.get_token(self.resource).await?;
        Ok(builder.bearer_auth(token.token))
    }

    /// Make an authenticated GET request.
    pub(crate) async fn get<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<T, AzureError> {
        debug!(url = %url, "GET request");

        let response = self.authorized(self.client.get(url)).await?.send().await?;
        Self::handle_response(response).await
    }

    /// GET every page of an ARM list, following `nextLink`.
    pub(crate) async fn get_paged<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<Vec<T>, AzureError> {
        let mut items = Vec::new();
        let mut next = Some(url.to_string());
        let mut pages = 0;

        while let Some(page_url) = next.take() {
            let page: ListResponse<T> = self.get(&page_url).await?;
            items.extend(page.value);
            pages += 1;

            next = page.next_link.filter(|link| !link.is_empty() && *link != page_url);
            if pages >= MAX_PAGES && next.is_some() {
                warn!(url = %url, pages, "Stopping pagination at page limit");
                break;
            }
        }

        Ok(items)
    }

    /// Make an authenticated PUT request.
    pub(crate) async fn put<T, B>(&self, url: &str, body: &B) -> Result<T, AzureError>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        debug!(url = %url, "PUT request");

        let response = self
            .authorized(self.client.put(url))
            .await?
            .json(body)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Make an authenticated PATCH request, ignoring the response body.
    pub(crate) async fn patch<B>(&self, url: &str, body: &B) -> Result<(), AzureError>
    where
        B: serde::Serialize + ?Sized,
    {
        debug!(url = %url, "PATCH request");

        let response = self
            .authorized(self.client.patch(url))
            .await?
            .json(body)
            .send()
            .await?;

        Self::expect_success(response).await
    }

    /// Make an authenticated POST request with an empty body and a JSON response.
    pub(crate) async fn post<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<T, AzureError> {
        debug!(url = %url, "POST request");

        let response = self
            .authorized(self.client.post(url))
            .await?
            .header(reqwest::header::CONTENT_LENGTH, 0)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Make an authenticated POST request that returns empty body.
    pub(crate) async fn post_empty(&self, url: &str) -> Result<(), AzureError> {
        debug!(url = %url, "POST request (empty)");

        let response = self
            .authorized(self.client.post(url))
            .await?
            .header(reqwest::header::CONTENT_LENGTH, 0)
            .send()
            .await?;

        Self::expect_success(response).await
    }

    /// Make an authenticated DELETE request. A 404 counts as already deleted.
    pub(crate) async fn delete(&self, url: &str) -> Result<(), AzureError> {
        debug!(url = %url, "DELETE request");

        let response = self.authorized(self.client.delete(url)).await?.send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::expect_success(response).await
    }

    async fn expect_success(response: reqwest::Response) -> Result<(), AzureError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(Self::status_error(status, text))
        }
    }

    /// Handle API response.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, AzureError> {
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            serde_json::from_str(&text).map_err(|e| {
                warn!(error = %e, status = status.as_u16(), "Failed to parse response");
                AzureError::Serialization(e)
            })
        } else {
            Err(Self::status_error(status, text))
        }
    }

    fn status_error(status: StatusCode, text: String) -> AzureError {
        match status {
            StatusCode::NOT_FOUND => AzureError::NotFound(text),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AzureError::Auth(text),
            _ => AzureError::Api {
                status: status.as_u16(),
                message: text,
            },
        }
    }
}

/// Azure Resource Manager client.
///
/// Holds no subscription; use [`ArmClient::subscription`] to get an explicit
/// per-subscription context.
#[derive(Clone)]
pub struct ArmClient {
    pub(crate) rest: Rest,
    base_url: String,
}

impl ArmClient {
    /// Create a client against the public cloud endpoint.
    ///
    /// # Errors
    /// Returns error if HTTP client cannot be created.
    pub fn new(credential: Arc<dyn TokenCredential>) -> Result<Self, AzureError> {
        Ok(Self {
            rest: Rest::new(credential, ARM_RESOURCE)?,
            base_url: ARM_BASE_URL.to_string(),
        })
    }

    /// Point the client at a different Resource Manager endpoint.
    ///
    /// # Errors
    /// Returns error if `base_url` is not an absolute URL.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, AzureError> {
        url::Url::parse(base_url)
            .map_err(|e| AzureError::Config(format!("invalid ARM base URL '{base_url}': {e}")))?;
        self.base_url = base_url.trim_end_matches('/').to_string();
        Ok(self)
    }

    /// Resource Manager base URL without trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base}/subscriptions/{id}`.
    pub(crate) fn subscription_url(&self, subscription_id: &str) -> String {
        format!("{}/subscriptions/{}", self.base_url, subscription_id)
    }

    /// `{base}/subscriptions/{id}/resourceGroups/{rg}`.
    pub(crate) fn resource_group_url(&self, subscription_id: &str, resource_group: &str) -> String {
        format!(
            "{}/resourceGroups/{}",
            self.subscription_url(subscription_id),
            resource_group
        )
    }

    /// Bind a subscription context.
    #[must_use]
    pub fn subscription(&self, subscription_id: impl Into<String>) -> SubscriptionClient {
        SubscriptionClient::new(self.clone(), subscription_id.into())
    }

    /// List the subscriptions visible to the credential.
    pub async fn list_subscriptions(&self) -> Result<Vec<SubscriptionModel>, AzureError> {
        let url = format!(
            "{}/subscriptions?api-version={}",
            self.base_url, SUBSCRIPTIONS_API_VERSION
        );
        self.rest.get_paged(&url).await
    }
}
