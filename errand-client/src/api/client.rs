use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use super::{ApiError, ApiResult};
use crate::storage::CredentialProvider;
use errand_types::*;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8080";

/// Remote operations the post page needs from the order API
#[async_trait]
pub trait OrderApi: Send + Sync {
    /// `GET /order/{id}`, unwrapping the `data` envelope
    async fn fetch_order(&self, order_id: &str) -> ApiResult<Post>;

    /// `PATCH /order/{id}` with `{ action, ...payload }`.
    /// Returns the raw response body (`Null` when the body is empty).
    async fn patch_order(
        &self,
        order_id: &str,
        action: &OrderAction,
    ) -> ApiResult<serde_json::Value>;
}

/// API client for communicating with the order server
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: impl Into<String>, credentials: Arc<dyn CredentialProvider>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn order_url(&self, order_id: &str) -> String {
        format!("{}/order/{}", self.base_url, urlencoding::encode(order_id))
    }

    /// Helper to add the bearer token to a request if one is stored.
    /// The provider is queried on every request so a fresh login is picked up.
    fn add_auth_header(&self, req: reqwest::RequestBuilder) -> ApiResult<reqwest::RequestBuilder> {
        let token = self
            .credentials
            .load_token()
            .map_err(|e| ApiError::Credentials(e.to_string()))?;

        match token {
            Some(token) => Ok(req.bearer_auth(token)),
            None => {
                log::debug!("No auth token available, sending request without Authorization");
                Ok(req)
            }
        }
    }

    /// Map non-success statuses onto `ApiError`, returning the body text otherwise
    async fn read_body(&self, response: reqwest::Response) -> ApiResult<String> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.text().await?);
        }

        let text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());

        // Clean up HTML error messages (e.g., from reverse proxy error pages)
        let clean_error = if text.contains("<html>") || text.contains("<!DOCTYPE") {
            format!("Server returned {} error. Please check the server URL.", status.as_u16())
        } else if text.trim().is_empty() {
            format!("Server returned {}", status.as_u16())
        } else {
            text
        };

        match status.as_u16() {
            404 => Err(ApiError::NotFound(clean_error)),
            401 => Err(ApiError::Unauthorized(clean_error)),
            400 => Err(ApiError::BadRequest(clean_error)),
            _ => Err(ApiError::Api(clean_error)),
        }
    }

    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> ApiResult<T> {
        let body = self.read_body(response).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl OrderApi for ApiClient {
    async fn fetch_order(&self, order_id: &str) -> ApiResult<Post> {
        let url = self.order_url(order_id);
        let req = self.add_auth_header(self.client.get(&url))?;
        let response = req.send().await?;
        let envelope: OrderEnvelope = self.handle_response(response).await?;
        Ok(envelope.data)
    }

    async fn patch_order(
        &self,
        order_id: &str,
        action: &OrderAction,
    ) -> ApiResult<serde_json::Value> {
        let url = self.order_url(order_id);
        let req = self.add_auth_header(self.client.patch(&url).json(action))?;
        let response = req.send().await?;
        let body = self.read_body(response).await?;

        if body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StaticCredentials;

    #[test]
    fn test_order_url_encodes_id_and_trims_slash() {
        let client = ApiClient::new(
            "http://localhost:8080/",
            Arc::new(StaticCredentials::empty()),
        );
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(client.order_url("abc"), "http://localhost:8080/order/abc");
        assert_eq!(client.order_url("a b/c"), "http://localhost:8080/order/a%20b%2Fc");
    }
}
