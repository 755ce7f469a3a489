//! Render endpoint clients.
//!
//! The endpoint is a plain GET carrying the serialized form as query
//! parameters and answering with the re-rendered formset fragment.

use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use tracing::debug;

use crate::config::SyncConfig;
use crate::controller::ReloadRequest;
use crate::error::{Result, SyncError};

/// Fetches the fragment for a reload request.
pub trait RenderClient {
    /// Return the HTML fragment rendered for `request`.
    ///
    /// # Errors
    ///
    /// Any error is reported as a failed reload; the tree stays unchanged.
    fn fetch(&self, request: &ReloadRequest) -> Result<String>;
}

/// Blocking HTTP client for a live render endpoint.
#[derive(Debug, Clone)]
pub struct HttpRenderClient {
    /// HTTP client.
    client: Client,
    /// Base the formset's `data-url` is resolved against.
    base_url: Url,
}

impl HttpRenderClient {
    /// Create a client resolving endpoints against `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidUrl`] if `base_url` is not absolute and
    /// [`SyncError::Network`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url =
            Url::parse(base_url).map_err(|e| SyncError::InvalidUrl(format!("{base_url}: {e}")))?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    /// Create a client using the configured request timeout.
    ///
    /// # Errors
    ///
    /// See [`HttpRenderClient::new`].
    pub fn from_config(base_url: &str, config: &SyncConfig) -> Result<Self> {
        Self::new(base_url, Duration::from_secs(config.request_timeout_secs))
    }

    /// Full URL requested for `request`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::MissingEndpoint`] if the formset declares no
    /// endpoint and [`SyncError::InvalidUrl`] if it does not resolve.
    pub fn request_url(&self, request: &ReloadRequest) -> Result<Url> {
        let endpoint = request
            .endpoint
            .as_deref()
            .ok_or(SyncError::MissingEndpoint)?;
        let mut url = self
            .base_url
            .join(endpoint)
            .map_err(|e| SyncError::InvalidUrl(format!("{endpoint}: {e}")))?;
        if !request.snapshot.is_empty() {
            url.query_pairs_mut().extend_pairs(request.snapshot.pairs());
        }
        Ok(url)
    }
}

impl RenderClient for HttpRenderClient {
    fn fetch(&self, request: &ReloadRequest) -> Result<String> {
        let url = self.request_url(request)?;
        debug!(sequence = request.sequence, %url, "requesting formset render");
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "text/html")
            .send()?
            .error_for_status()?;
        Ok(response.text()?)
    }
}
