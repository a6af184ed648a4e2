//! Route service HTTP client.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use ramble_core::gateway::RouteGateway;
use ramble_core::models::{
    ExploreRequest, ExploreResult, GenerateRequest, Route, RouteFeature, SaveRouteRequest,
    SavedRouteDetail, SavedRouteSummary, SnapRequest,
};

use crate::config::Config;

/// HTTP client for the routing/elevation/storage API.
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .context("Failed to build HTTP client")?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        what: &str,
    ) -> Result<T> {
        let url = self.url(path);
        tracing::debug!(%url, "sending {what} request");
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to send {what} request"))?;
        parse_response(response, what).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, what: &str) -> Result<T> {
        let url = self.url(path);
        tracing::debug!(%url, "sending {what} request");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to send {what} request"))?;
        parse_response(response, what).await
    }
}

async fn parse_response<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(anyhow!("{} failed: {} {}", what, status, error_detail(&body)));
    }
    response
        .json::<T>()
        .await
        .with_context(|| format!("Failed to parse {what} response"))
}

/// Pull the `detail` message out of an API error body, falling back to the
/// raw body when it is not the usual JSON shape.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("detail")
                .and_then(|detail| detail.as_str())
                .map(|detail| detail.to_string())
        })
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl RouteGateway for ApiClient {
    async fn generate(&self, request: GenerateRequest) -> Result<Route> {
        let feature: RouteFeature = self
            .post_json("/generate", &request, "route generation")
            .await?;
        Ok(Route::from_feature(feature))
    }

    async fn snap(&self, request: SnapRequest) -> Result<Route> {
        let feature: RouteFeature = self.post_json("/snap", &request, "route snap").await?;
        Ok(Route::from_feature(feature))
    }

    async fn explore(&self, request: ExploreRequest) -> Result<ExploreResult> {
        self.post_json("/explore", &request, "route exploration").await
    }

    async fn save_route(&self, request: SaveRouteRequest) -> Result<SavedRouteSummary> {
        self.post_json("/routes", &request, "route save").await
    }

    async fn list_routes(&self) -> Result<Vec<SavedRouteSummary>> {
        self.get_json("/routes", "route list").await
    }

    async fn get_route(&self, id: Uuid) -> Result<SavedRouteDetail> {
        self.get_json(&format!("/routes/{id}"), "route fetch").await
    }

    async fn delete_route(&self, id: Uuid) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!("/routes/{id}")))
            .send()
            .await
            .context("Failed to send route delete request")?;

        // Already gone counts as deleted.
        if response.status().as_u16() == 404 {
            return Ok(());
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("route delete failed: {} {}", status, error_detail(&body)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_detail_extracts_fastapi_shape() {
        assert_eq!(
            error_detail(r#"{"detail": "Valhalla unreachable"}"#),
            "Valhalla unreachable"
        );
    }

    #[test]
    fn error_detail_falls_back_to_raw_body() {
        assert_eq!(error_detail("<html>bad gateway</html>"), "<html>bad gateway</html>");
        assert_eq!(error_detail(r#"{"message": "other"}"#), r#"{"message": "other"}"#);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let config = Config {
            base_url: "http://localhost:8000/".to_string(),
            timeout_secs: 5,
        };
        let client = ApiClient::new(&config).unwrap();
        assert_eq!(client.url("/generate"), "http://localhost:8000/api/v1/generate");
    }
}
