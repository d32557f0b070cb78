use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::station::models::{
    PushSubscription, Report, SeismicAlertRequest, UnsubscribeRequest, VapidKeyResponse,
};

/// HTTP client for the station backend that generates reports and delivers
/// push notifications.
///
/// Without a configured base URL every call fails with
/// `AppError::ServiceUnavailable`, so the dashboard still serves live charts.
pub struct StationClient {
    http_client: Client,
    base_url: Option<String>,
}

impl StationClient {
    /// # Errors
    ///
    /// Returns `AppError::Internal` if the HTTP client cannot be built.
    pub fn new(config: &Config) -> AppResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.station_timeout_seconds))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            base_url: config.station_api_url.clone(),
        })
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    fn url(&self, path: &str) -> AppResult<String> {
        self.base_url
            .as_ref()
            .map(|base| format!("{base}{path}"))
            .ok_or_else(|| {
                AppError::ServiceUnavailable("Station backend is not configured".to_string())
            })
    }

    async fn send(&self, request: RequestBuilder) -> AppResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| AppError::Station(format!("Request failed: {e}")))?;
        Self::check(response).await
    }

    async fn check(response: Response) -> AppResult<Response> {
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AppError::Station("Rate limited (429)".to_string()));
        }

        if !response.status().is_success() {
            return Err(AppError::Station(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        Ok(response)
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> AppResult<T> {
        let text = response
            .text()
            .await
            .map_err(|e| AppError::Station(format!("Failed to get response text: {e}")))?;

        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                body_preview = %text.chars().take(500).collect::<String>(),
                "Failed to parse station response"
            );
            AppError::Station(format!("Failed to parse response: {e}"))
        })
    }

    /// Ask the backend to analyse the last day of readings and return a report.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Station` if the request fails or returns an error status.
    pub async fn generate_report(&self) -> AppResult<Report> {
        let url = self.url("/generate-report")?;
        let response = self.send(self.http_client.post(&url)).await?;
        Self::parse(response).await
    }

    /// Most recent stored report, `None` if the backend has none yet.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Station` if the request fails or returns an error status.
    pub async fn latest_report(&self) -> AppResult<Option<Report>> {
        let url = self.url("/latest-report")?;

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::Station(format!("Request failed: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = Self::check(response).await?;
        Self::parse(response).await.map(Some)
    }

    /// # Errors
    ///
    /// Returns `AppError::Station` if the request fails or returns an error status.
    pub async fn vapid_public_key(&self) -> AppResult<String> {
        let url = self.url("/vapid-public-key")?;
        let response = self.send(self.http_client.get(&url)).await?;
        let key: VapidKeyResponse = Self::parse(response).await?;
        Ok(key.public_key)
    }

    /// Register a browser push subscription with the backend.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Station` if the request fails or returns an error status.
    pub async fn subscribe(&self, subscription: &PushSubscription) -> AppResult<()> {
        let url = self.url("/push-subscribe")?;
        self.send(self.http_client.post(&url).json(subscription)).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `AppError::Station` if the request fails or returns an error status.
    pub async fn unsubscribe(&self, endpoint: &str) -> AppResult<()> {
        let url = self.url("/push-unsubscribe")?;
        let body = UnsubscribeRequest {
            endpoint: endpoint.to_string(),
        };
        self.send(self.http_client.post(&url).json(&body)).await?;
        Ok(())
    }

    /// Ask the backend to push a seismic alert to every subscriber.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Station` if the request fails or returns an error status.
    pub async fn send_seismic_alert(&self, magnitude: f64) -> AppResult<()> {
        let url = self.url("/push-seismic-alert")?;
        let body = SeismicAlertRequest { magnitude };
        self.send(self.http_client.post(&url).json(&body)).await?;
        Ok(())
    }
}
