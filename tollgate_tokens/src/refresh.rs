//! Exchanging a refresh token for a new access token

use std::{error, sync::Arc};

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

use crate::{AccessToken, CredentialStore};

pub mod dto;

/// An asynchronous source of refreshed access tokens
#[async_trait]
pub trait AsyncCredentialRefresher: Send + Sync {
    /// The error type returned in the event that the refresh fails
    type Error: error::Error + Send + Sync + 'static;

    /// Obtains a new access token using the refresh token held in `store`
    ///
    /// Returns `Ok(None)` when there is no refresh token to exchange. On
    /// success, the new credentials have already been persisted to `store`.
    async fn refresh(&self, store: &CredentialStore) -> Result<Option<AccessToken>, Self::Error>;
}

#[async_trait]
impl<T> AsyncCredentialRefresher for Arc<T>
where
    T: AsyncCredentialRefresher + ?Sized,
{
    type Error = T::Error;

    async fn refresh(&self, store: &CredentialStore) -> Result<Option<AccessToken>, Self::Error> {
        (**self).refresh(store).await
    }
}

/// Refreshes access tokens by exchanging the stored refresh token with an authority
///
/// The exchange is sent over its own plain [`reqwest::Client`], so it never
/// passes through any middleware stack that would intercept or retry it.
#[derive(Debug, Clone)]
pub struct RefreshTokenExchange {
    client: reqwest::Client,
    refresh_url: reqwest::Url,
}

impl RefreshTokenExchange {
    /// Constructs a new exchange against `refresh_url`
    pub fn new(refresh_url: reqwest::Url) -> Self {
        Self::with_client(reqwest::Client::new(), refresh_url)
    }

    /// Constructs a new exchange using a specific client
    ///
    /// The client should not carry a cookie store or default credentials.
    pub fn with_client(client: reqwest::Client, refresh_url: reqwest::Url) -> Self {
        Self {
            client,
            refresh_url,
        }
    }

    /// The URL of the refresh endpoint
    pub fn refresh_url(&self) -> &reqwest::Url {
        &self.refresh_url
    }
}

#[async_trait]
impl AsyncCredentialRefresher for RefreshTokenExchange {
    type Error = RefreshError;

    async fn refresh(&self, store: &CredentialStore) -> Result<Option<AccessToken>, Self::Error> {
        exchange_refresh_token(&self.client, self.refresh_url.clone(), store).await
    }
}

/// An error while attempting to exchange a refresh token
#[derive(Debug, Error)]
pub enum RefreshError {
    /// The authority rejected the refresh token as invalid or expired
    #[error("refresh token rejected by authority ({status}): {body}")]
    Rejected {
        /// The status returned by the authority
        status: StatusCode,
        /// The body of the rejection
        body: String,
    },
    /// An error from the authority with an error body
    #[error("error refreshing token with authority: {body}")]
    ErrorWithBody {
        /// The underlying request error
        source: reqwest::Error,
        /// The body of the error
        body: String,
    },
    /// Unable to deserialize the token body
    #[error("error deserializing token body from authority")]
    TokenBodyError(#[from] serde_json::Error),
    /// Unable to read the response
    #[error("error reading response body")]
    BodyReadError(#[source] reqwest::Error),
    /// Unable to send a refresh request to the authority
    #[error("error sending request to authority")]
    RequestSend(#[source] reqwest::Error),
}

impl RefreshError {
    /// Whether the authority reported the refresh token itself as invalid
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

#[tracing::instrument(err, skip(client, refresh_url, store), fields(refresh_url = %refresh_url))]
async fn exchange_refresh_token(
    client: &reqwest::Client,
    refresh_url: reqwest::Url,
    store: &CredentialStore,
) -> Result<Option<AccessToken>, RefreshError> {
    let refresh_token = match store.refresh_token().await {
        Some(rt) => rt,
        None => {
            tracing::debug!("no refresh token available, skipping exchange");
            return Ok(None);
        }
    };

    tracing::trace!("exchanging refresh token with authority");

    let resp = client
        .post(refresh_url)
        .json(&dto::RefreshRequest {
            refresh_token: &refresh_token,
        })
        .send()
        .await
        .map_err(RefreshError::RequestSend)?;

    let status = resp.status();
    tracing::debug!(
        response.status = status.as_u16(),
        "received refresh response from authority"
    );

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        let body = resp.text().await.unwrap_or_default();
        tracing::warn!(
            response.status = status.as_u16(),
            "refresh token rejected, clearing stored credentials"
        );
        store.clear_all().await;
        return Err(RefreshError::Rejected { status, body });
    }

    if let Err(error) = resp.error_for_status_ref() {
        let body = resp.text().await.map_err(RefreshError::BodyReadError)?;
        return Err(RefreshError::ErrorWithBody {
            source: error,
            body,
        });
    }

    let body = resp.bytes().await.map_err(RefreshError::BodyReadError)?;
    let resp: dto::RefreshResponse = serde_json::from_slice(&body)?;

    tracing::info!(
        has_refresh_token = resp.data.refresh_token.is_some(),
        "received new tokens"
    );

    store.set_access_token(Some(&resp.data.token)).await;
    if let Some(rt) = &resp.data.refresh_token {
        tracing::info!("received rotated refresh token");
        store.set_refresh_token(Some(rt)).await;
    }

    Ok(Some(resp.data.token))
}
