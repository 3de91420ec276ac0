//! HTTP implementation of [`RancherApi`].
//!
//! Builds resource URLs directly from the configured base (the v2-beta
//! project URL), authenticates every request with the account API keypair
//! via HTTP Basic auth, and maps transport, status, and decode failures
//! onto [`ClientError`].

use std::time::Duration;

use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::RancherApi;
use crate::error::{ClientError, ClientResult};
use crate::types::{Collection, Service, ServiceFilters, ServiceUpgrade, Stack, StackFilters};

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for [`RancherClient::new`].
#[derive(Debug, Clone)]
pub struct ClientOpts {
    /// Base URL of the Rancher API, e.g.
    /// `https://rancher.example.com/v2-beta/projects/1a5`.
    pub url: String,
    /// Account API access key, sent as the basic-auth username.
    pub access_key: String,
    /// Account API secret key, sent as the basic-auth password.
    pub secret_key: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl ClientOpts {
    /// Options for `url` with the given keypair and the default timeout.
    pub fn new(
        url: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Client for the subset of the Rancher API an upgrade run uses.
#[derive(Debug, Clone)]
pub struct RancherClient {
    base: Url,
    http: reqwest::Client,
    access_key: String,
    secret_key: String,
}

impl RancherClient {
    /// Build a client from connection options.
    ///
    /// Fails if the base URL does not parse or the HTTP client cannot be
    /// constructed. Credentials are not checked here; an invalid keypair
    /// surfaces as an API error on the first request.
    pub fn new(opts: ClientOpts) -> ClientResult<Self> {
        let base = Url::parse(opts.url.trim_end_matches('/')).map_err(|source| {
            ClientError::InvalidUrl {
                url: opts.url.clone(),
                source,
            }
        })?;

        let http = reqwest::Client::builder()
            .timeout(opts.timeout)
            .build()
            .map_err(ClientError::Init)?;

        Ok(Self {
            base,
            http,
            access_key: opts.access_key,
            secret_key: opts.secret_key,
        })
    }

    /// URL of a resource path under the API base.
    fn resource_url(&self, path: &str) -> String {
        // Url normalizes a bare host to a trailing "/"; trim so joining
        // never produces a double slash.
        format!("{}/{}", self.base.as_str().trim_end_matches('/'), path)
    }

    fn get(&self, url: &str) -> RequestBuilder {
        self.http
            .get(url)
            .basic_auth(&self.access_key, Some(&self.secret_key))
    }

    fn post(&self, url: &str) -> RequestBuilder {
        self.http
            .post(url)
            .basic_auth(&self.access_key, Some(&self.secret_key))
    }

    /// Send a request and decode the JSON response.
    ///
    /// Non-2xx responses become [`ClientError::Api`] carrying the status
    /// and response body for diagnostics.
    async fn send<T>(&self, url: &str, request: RequestBuilder) -> ClientResult<T>
    where
        T: DeserializeOwned,
    {
        let response = request
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Api {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        response.json().await.map_err(|source| ClientError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

impl RancherApi for RancherClient {
    async fn list_stacks(&self, filters: &StackFilters) -> ClientResult<Vec<Stack>> {
        let url = self.resource_url("stacks");
        debug!(%url, name = %filters.name, "listing stacks");
        let collection: Collection<Stack> = self.send(&url, self.get(&url).query(filters)).await?;
        Ok(collection.data)
    }

    async fn list_services(&self, filters: &ServiceFilters) -> ClientResult<Vec<Service>> {
        let url = self.resource_url("services");
        debug!(%url, name = %filters.name, "listing services");
        let collection: Collection<Service> = self.send(&url, self.get(&url).query(filters)).await?;
        Ok(collection.data)
    }

    async fn service_by_id(&self, id: &str) -> ClientResult<Service> {
        let url = self.resource_url(&format!("services/{id}"));
        debug!(%url, "fetching service");
        self.send(&url, self.get(&url)).await
    }

    async fn upgrade_service(&self, id: &str, upgrade: &ServiceUpgrade) -> ClientResult<Service> {
        let url = self.resource_url(&format!("services/{id}?action=upgrade"));
        debug!(%url, "requesting service upgrade");
        self.send(&url, self.post(&url).json(upgrade)).await
    }

    async fn finish_upgrade(&self, id: &str) -> ClientResult<Service> {
        let url = self.resource_url(&format!("services/{id}?action=finishupgrade"));
        debug!(%url, "finishing service upgrade");
        self.send(&url, self.post(&url)).await
    }
}
