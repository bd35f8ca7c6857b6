use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{AccessToken, RefreshToken};

/// The signed-in user's profile
///
/// The profile is treated as an opaque JSON object. It is persisted and
/// returned verbatim; no field carries any meaning to this crate.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserProfile(Map<String, Value>);

impl UserProfile {
    /// Constructs a profile from a JSON object
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Gets a single field of the profile
    #[inline]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Gets all fields of the profile
    #[inline]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes the profile, returning the underlying JSON object
    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for UserProfile {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// The credential bundle returned by a successful sign-in
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AuthData {
    /// The access token
    pub token: AccessToken,

    /// The refresh token, if the backend issued one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<RefreshToken>,

    /// The signed-in user's profile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
}

/// The envelope in which the backend wraps [`AuthData`]
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LoginResponse {
    /// The credential bundle
    pub data: AuthData,
}
