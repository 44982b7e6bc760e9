//! HTTP client for the list-price service REST API.
//!
//! Wraps `reqwest` with envelope decoding and bearer-key handling. Server
//! errors arrive as `{ "error": { "code", "message" } }` bodies and surface
//! as [`ClientError::Api`].

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use msrp_core::settings::{Settings, SettingsPatch};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server returned an error envelope.
    #[error("API error ({code}): {message}")]
    Api { code: String, message: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

#[derive(Debug, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub database: String,
}

/// Client for the list-price service.
pub struct ApiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl ApiClient {
    /// Creates a client against the given base URL. The bearer key is
    /// attached to every request when present; public routes ignore it.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("msrp-cli/0.1")
            .build()?;

        // Normalise to exactly one trailing slash so endpoint paths append
        // cleanly.
        let base_url = format!("{}/", base_url.trim_end_matches('/'));

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// GET /api/v1/health.
    ///
    /// A degraded server reports its state in-band with a 503, so the
    /// envelope is decoded regardless of status.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] on network failure or
    /// [`ClientError::Deserialize`] on an unexpected body.
    pub async fn health(&self) -> Result<HealthStatus, ClientError> {
        let response = self.request(Method::GET, "api/v1/health").send().await?;
        let body = response.text().await?;
        let envelope: Envelope<HealthStatus> =
            serde_json::from_str(&body).map_err(|e| ClientError::Deserialize {
                context: "health".to_string(),
                source: e,
            })?;
        Ok(envelope.data)
    }

    /// GET /api/v1/settings (admin capability).
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Api`] on an error envelope (including auth
    /// failures), [`ClientError::Http`] on network failure, or
    /// [`ClientError::Deserialize`] on an unexpected body.
    pub async fn get_settings(&self) -> Result<Settings, ClientError> {
        let response = self.request(Method::GET, "api/v1/settings").send().await?;
        decode(response, "get_settings").await
    }

    /// POST /api/v1/settings (admin capability). Only fields present in the
    /// patch are sent, so absent fields keep their stored values.
    ///
    /// # Errors
    ///
    /// Same error surface as [`ApiClient::get_settings`].
    pub async fn update_settings(&self, patch: &SettingsPatch) -> Result<Settings, ClientError> {
        let response = self
            .request(Method::POST, "api/v1/settings")
            .json(patch)
            .send()
            .await?;
        decode(response, "update_settings").await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{path}", self.base_url));
        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }
        builder
    }
}

/// Decodes a success envelope, turning error envelopes into
/// [`ClientError::Api`].
async fn decode<T: DeserializeOwned>(
    response: reqwest::Response,
    context: &str,
) -> Result<T, ClientError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        if let Ok(err) = serde_json::from_str::<ErrorEnvelope>(&body) {
            return Err(ClientError::Api {
                code: err.error.code,
                message: err.error.message,
            });
        }
        return Err(ClientError::Api {
            code: status.as_u16().to_string(),
            message: body,
        });
    }

    let envelope: Envelope<T> =
        serde_json::from_str(&body).map_err(|e| ClientError::Deserialize {
            context: context.to_string(),
            source: e,
        })?;
    Ok(envelope.data)
}
