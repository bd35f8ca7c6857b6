//! The HTTP client used by the rest of the application

use std::{fmt, sync::Arc, time::Duration};

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Method, Response,
};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use serde::{de::DeserializeOwned, Serialize};
use tollgate_tokens::{refresh::RefreshTokenExchange, CredentialStore};

use crate::{
    augment::resolve_target,
    expiry::{FailureHandler, LoggingObserver, SessionObserver},
    AccessTokenMiddleware, ApiError, ClientConfig, RefreshCoordinator, RefreshMiddleware,
};

/// Per-call options
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
    /// Extra headers; an `Authorization` header here overrides the stored token
    pub headers: HeaderMap,
    /// Query string pairs
    pub query: Vec<(String, String)>,
    /// A timeout for this call; by default calls never time out
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    /// Adds a header
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Adds a query string pair
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Sets a timeout for the call
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// A fully described request for [`ApiClient::request()`]
#[derive(Clone, Debug)]
pub struct RequestConfig {
    /// The request method
    pub method: Method,
    /// The request target, relative to the base address or absolute
    pub url: String,
    /// An optional JSON body
    pub body: Option<serde_json::Value>,
    /// Per-call options
    pub options: RequestOptions,
}

impl RequestConfig {
    /// Constructs a request without a body
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            body: None,
            options: RequestOptions::default(),
        }
    }

    /// Sets the JSON body
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets the per-call options
    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }
}

/// Builds an [`ApiClient`]
pub struct ApiClientBuilder {
    config: ClientConfig,
    store: CredentialStore,
    observer: Arc<dyn SessionObserver>,
    client: reqwest::Client,
}

impl ApiClientBuilder {
    /// Starts building a client with the given configuration
    ///
    /// Defaults to in-memory credential storage and a [`LoggingObserver`].
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            store: CredentialStore::in_memory(),
            observer: Arc::new(LoggingObserver),
            client: reqwest::Client::new(),
        }
    }

    /// Uses the given credential store
    pub fn store(mut self, store: CredentialStore) -> Self {
        self.store = store;
        self
    }

    /// Uses the given observer to report session expiry
    pub fn observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Uses the given transport for API calls
    ///
    /// The refresh exchange always runs on a separate plain client.
    pub fn transport(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Builds the client
    pub fn build(self) -> Result<ApiClient, ApiError> {
        let refresh_url = resolve_target(self.config.base_url(), self.config.refresh_path())
            .map_err(|source| ApiError::InvalidUrl {
                target: self.config.refresh_path().to_owned(),
                source,
            })?;

        let failure_handler = FailureHandler::new(
            self.store.clone(),
            self.observer,
            self.config.redirect_delay(),
        );
        let coordinator = Arc::new(RefreshCoordinator::new(
            RefreshTokenExchange::new(refresh_url),
            self.store.clone(),
            failure_handler,
        ));

        let client = ClientBuilder::new(self.client)
            .with(RefreshMiddleware::new(
                Arc::clone(&coordinator),
                self.config.login_failure_message(),
            ))
            .with(AccessTokenMiddleware::new(self.store.clone()))
            .build();

        tracing::debug!(base_url = self.config.base_url(), "constructed api client");

        Ok(ApiClient {
            base_url: self.config.base_url().into(),
            client,
            store: self.store,
            coordinator,
        })
    }
}

impl fmt::Debug for ApiClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ApiClientBuilder")
            .field("config", &self.config)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

/// An HTTP client for one backend base address
///
/// Every call has the stored access token attached and is transparently
/// replayed once if the token turns out to have expired. Clones share the
/// same transport, credentials, and refresh coordinator.
#[derive(Clone)]
pub struct ApiClient {
    base_url: Arc<str>,
    client: ClientWithMiddleware,
    store: CredentialStore,
    coordinator: Arc<RefreshCoordinator<RefreshTokenExchange>>,
}

impl ApiClient {
    /// Constructs a client with default storage and observer
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        ApiClientBuilder::new(config).build()
    }

    /// Starts building a client
    pub fn builder(config: ClientConfig) -> ApiClientBuilder {
        ApiClientBuilder::new(config)
    }

    /// The credential store used by this client
    pub fn credentials(&self) -> &CredentialStore {
        &self.store
    }

    /// The base address relative targets are resolved against
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether a session refresh is currently underway
    pub fn is_refreshing(&self) -> bool {
        self.coordinator.is_refreshing()
    }

    /// Sends a `GET` request and decodes the JSON response
    pub async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        options: &RequestOptions,
    ) -> Result<T, ApiError> {
        let resp = self.send::<()>(Method::GET, url, None, options).await?;
        decode(resp).await
    }

    /// Sends a `POST` request with a JSON body and decodes the JSON response
    pub async fn post<B, T>(&self, url: &str, body: &B, options: &RequestOptions) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let resp = self.send(Method::POST, url, Some(body), options).await?;
        decode(resp).await
    }

    /// Sends a `PUT` request with a JSON body and decodes the JSON response
    pub async fn put<B, T>(&self, url: &str, body: &B, options: &RequestOptions) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let resp = self.send(Method::PUT, url, Some(body), options).await?;
        decode(resp).await
    }

    /// Sends a `PATCH` request with a JSON body and decodes the JSON response
    pub async fn patch<B, T>(&self, url: &str, body: &B, options: &RequestOptions) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let resp = self.send(Method::PATCH, url, Some(body), options).await?;
        decode(resp).await
    }

    /// Sends a `DELETE` request and decodes the JSON response
    pub async fn delete<T: DeserializeOwned>(
        &self,
        url: &str,
        options: &RequestOptions,
    ) -> Result<T, ApiError> {
        let resp = self.send::<()>(Method::DELETE, url, None, options).await?;
        decode(resp).await
    }

    /// Sends a fully described request and returns the raw response
    ///
    /// Non-success statuses are still reported as [`ApiError::Status`].
    pub async fn request(&self, config: RequestConfig) -> Result<Response, ApiError> {
        self.send(config.method, &config.url, config.body.as_ref(), &config.options)
            .await
    }

    async fn send<B>(
        &self,
        method: Method,
        target: &str,
        body: Option<&B>,
        options: &RequestOptions,
    ) -> Result<Response, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let url = resolve_target(&self.base_url, target).map_err(|source| {
            tracing::error!(url = target, error = %source, "invalid request address");
            ApiError::InvalidUrl {
                target: target.to_owned(),
                source,
            }
        })?;

        let mut req = self
            .client
            .request(method.clone(), url.clone())
            .headers(options.headers.clone());
        if !options.query.is_empty() {
            req = req.query(&options.query);
        }
        if let Some(timeout) = options.timeout {
            req = req.timeout(timeout);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = match req.send().await {
            Ok(resp) => resp,
            Err(error) => {
                tracing::error!(
                    %method,
                    %url,
                    error = (&error as &dyn std::error::Error),
                    "request failed"
                );
                return Err(error.into());
            }
        };

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(%method, %url, status = status.as_u16(), "request returned an error status");
            return Err(ApiError::Status { status, body });
        }

        tracing::trace!(%method, %url, status = status.as_u16(), "request succeeded");
        Ok(resp)
    }
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("store", &self.store)
            .field("coordinator", &self.coordinator)
            .finish_non_exhaustive()
    }
}

/// Decodes a JSON body; an empty body decodes as `null`
async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    let body = resp.bytes().await.map_err(ApiError::BodyRead)?;
    if body.iter().all(u8::is_ascii_whitespace) {
        Ok(serde_json::from_slice(b"null")?)
    } else {
        Ok(serde_json::from_slice(&body)?)
    }
}
