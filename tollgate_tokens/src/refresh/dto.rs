//! DTOs for the refresh-token exchange

use serde::{Deserialize, Serialize};

use crate::{AccessToken, RefreshToken, RefreshTokenRef};

/// The body sent to the refresh endpoint
#[derive(Debug, Serialize)]
pub struct RefreshRequest<'a> {
    /// The refresh token being exchanged
    pub refresh_token: &'a RefreshTokenRef,
}

/// The body returned by the refresh endpoint
#[derive(Debug, Deserialize, Serialize)]
pub struct RefreshResponse {
    /// The refreshed credentials
    pub data: RefreshedTokens,
}

/// The refreshed credentials
#[derive(Debug, Deserialize, Serialize)]
pub struct RefreshedTokens {
    /// The new access token
    pub token: AccessToken,

    /// The rotated refresh token, if the authority rotates them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<RefreshToken>,
}
