//! Layer payload fetching.
//!
//! [`LayerSource`] is the boundary between the run orchestration and the
//! network: it yields the raw payload bytes of one layer. [`HttpLayerSource`]
//! implements it against a map-service REST endpoint, issuing
//!
//! ```text
//! GET {data_url}/{layer_id}/query?where=1=1&f=json&outFields=*
//! ```

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use log::debug;
use reqwest::Client;
use url::Url;

use crate::config::AppConfig;
use crate::error::FetchError;

/// Query string requesting every feature with every attribute as JSON.
pub const QUERY_STRING: &str = "where=1=1&f=json&outFields=*";

/// Source of raw layer payloads.
#[async_trait]
pub trait LayerSource: Send + Sync {
    /// Fetch the raw payload of one layer.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] naming the layer if the payload cannot be obtained.
    async fn fetch_layer(&self, layer_id: u32) -> Result<Bytes, FetchError>;

    /// Human readable location of a layer, used in log messages.
    fn describe(&self, layer_id: u32) -> String {
        format!("layer {layer_id}")
    }
}

/// Build the query URL for a layer.
///
/// # Errors
///
/// Returns [`FetchError::InvalidUrl`] if `base_url` is not an absolute,
/// hierarchical URL.
pub fn build_query_url(base_url: &str, layer_id: u32) -> Result<Url, FetchError> {
    let invalid = |reason: String| FetchError::InvalidUrl {
        layer: layer_id,
        base_url: base_url.to_string(),
        reason,
    };

    let mut url = Url::parse(base_url.trim()).map_err(|e| invalid(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|()| invalid("URL cannot be a base".to_string()))?
        .pop_if_empty()
        .push(&layer_id.to_string())
        .push("query");
    url.set_query(Some(QUERY_STRING));
    url.set_fragment(None);
    Ok(url)
}

/// [`LayerSource`] backed by HTTP GET requests.
#[derive(Debug, Clone)]
pub struct HttpLayerSource {
    client: Client,
    base_url: String,
}

impl HttpLayerSource {
    /// Create a source for `base_url` with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Client`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("layerdump/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| FetchError::Client { source })?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Create a source from the configured base URL and timeout.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Client`] if the HTTP client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, FetchError> {
        Self::new(config.data_url.clone(), config.request_timeout())
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl LayerSource for HttpLayerSource {
    async fn fetch_layer(&self, layer_id: u32) -> Result<Bytes, FetchError> {
        let url = build_query_url(&self.base_url, layer_id)?;
        let url_text = url.to_string();
        debug!("Requesting layer {layer_id} at URL: {url_text}");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                layer: layer_id,
                url: url_text.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                layer: layer_id,
                url: url_text,
                status: status.as_u16(),
            });
        }

        response.bytes().await.map_err(|source| FetchError::Body {
            layer: layer_id,
            url: url_text,
            source,
        })
    }

    fn describe(&self, layer_id: u32) -> String {
        build_query_url(&self.base_url, layer_id)
            .map_or_else(|_| format!("layer {layer_id}"), |url| url.to_string())
    }
}
