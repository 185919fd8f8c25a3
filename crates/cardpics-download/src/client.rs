//! HTTP catalog client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use cardpics_core::catalog::CatalogResponse;
use cardpics_core::{Card, CatalogPort, DownloadError};

/// Client identifier sent with every request.
pub(crate) const USER_AGENT: &str = "cardpics/0.3";

/// [`CatalogPort`] implementation over HTTP.
///
/// One GET per fetch; no retry here - a failed catalog fetch is fatal to
/// the run and retry policy belongs to the caller.
pub struct HttpCatalogClient {
    client: Client,
}

impl HttpCatalogClient {
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Default for HttpCatalogClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogPort for HttpCatalogClient {
    async fn fetch_catalog(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<Vec<Card>, DownloadError> {
        let request = self
            .client
            .get(url)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/json")
            .timeout(timeout);

        let response = request
            .send()
            .await
            .map_err(|err| DownloadError::catalog_fetch(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::catalog_fetch(format!("HTTP {status}")));
        }

        let payload: CatalogResponse = response
            .json()
            .await
            .map_err(|err| DownloadError::catalog_fetch(format!("invalid payload: {err}")))?;

        if payload.data.is_empty() {
            return Err(DownloadError::catalog_fetch("no entries in catalog payload"));
        }

        Ok(payload.data)
    }
}
