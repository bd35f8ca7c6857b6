use std::{error, fmt, sync::Arc};

use crate::{
    storage::{CredentialStorage, InMemoryStorage},
    AccessToken, AccessTokenRef, AuthData, RefreshToken, RefreshTokenRef, UserProfile,
};

/// A slot in the credential store
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    /// The access token
    Access,
    /// The refresh token
    Refresh,
    /// The serialized user profile
    Profile,
}

impl CredentialKind {
    /// All credential slots
    pub const ALL: [CredentialKind; 3] = [Self::Access, Self::Refresh, Self::Profile];

    /// The key under which this slot is persisted
    pub const fn key(self) -> &'static str {
        match self {
            Self::Access => "token",
            Self::Refresh => "refresh_token",
            Self::Profile => "user",
        }
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Durable storage of the access token, refresh token, and user profile
///
/// The store never fails. Any fault reported by the underlying
/// [`CredentialStorage`] is logged and the value is treated as absent, so
/// callers are never disrupted by storage being unavailable.
///
/// Clones share the same underlying storage.
#[derive(Clone)]
pub struct CredentialStore {
    storage: Arc<dyn CredentialStorage>,
}

impl CredentialStore {
    /// Constructs a store over the given storage backend
    pub fn new(storage: impl CredentialStorage + 'static) -> Self {
        Self {
            storage: Arc::new(storage),
        }
    }

    /// Constructs a store that keeps credentials in memory only
    pub fn in_memory() -> Self {
        Self::new(InMemoryStorage::new())
    }

    /// Reads the raw value of a slot
    pub async fn get(&self, kind: CredentialKind) -> Option<String> {
        match self.storage.read(kind.key()).await {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(
                    slot = %kind,
                    error = (&*error as &dyn error::Error),
                    "unable to read credential from storage, treating as absent"
                );
                None
            }
        }
    }

    /// Sets the raw value of a slot
    ///
    /// Setting a slot to `None` is equivalent to [`clear()`][Self::clear()].
    pub async fn set(&self, kind: CredentialKind, value: Option<&str>) {
        let value = match value {
            Some(value) => value,
            None => return self.clear(kind).await,
        };

        match self.storage.write(kind.key(), value).await {
            Ok(()) => tracing::trace!(slot = %kind, "stored credential"),
            Err(error) => {
                tracing::warn!(
                    slot = %kind,
                    error = (&*error as &dyn error::Error),
                    "unable to write credential to storage"
                );
            }
        }
    }

    /// Clears a single slot
    pub async fn clear(&self, kind: CredentialKind) {
        match self.storage.remove(kind.key()).await {
            Ok(()) => tracing::trace!(slot = %kind, "cleared credential"),
            Err(error) => {
                tracing::warn!(
                    slot = %kind,
                    error = (&*error as &dyn error::Error),
                    "unable to remove credential from storage"
                );
            }
        }
    }

    /// Clears every slot
    pub async fn clear_all(&self) {
        for kind in CredentialKind::ALL {
            self.clear(kind).await;
        }
        tracing::debug!("cleared all stored credentials");
    }

    /// Gets the stored access token
    pub async fn access_token(&self) -> Option<AccessToken> {
        self.get(CredentialKind::Access).await.map(AccessToken::new)
    }

    /// Stores or clears the access token
    pub async fn set_access_token(&self, token: Option<&AccessTokenRef>) {
        self.set(CredentialKind::Access, token.map(|t| t.as_str()))
            .await
    }

    /// Gets the stored refresh token
    pub async fn refresh_token(&self) -> Option<RefreshToken> {
        self.get(CredentialKind::Refresh).await.map(RefreshToken::new)
    }

    /// Stores or clears the refresh token
    pub async fn set_refresh_token(&self, token: Option<&RefreshTokenRef>) {
        self.set(CredentialKind::Refresh, token.map(|t| t.as_str()))
            .await
    }

    /// Gets the stored user profile
    ///
    /// A profile that cannot be deserialized is logged and treated as absent.
    pub async fn user_profile(&self) -> Option<UserProfile> {
        let raw = self.get(CredentialKind::Profile).await?;
        match serde_json::from_str(&raw) {
            Ok(profile) => Some(profile),
            Err(error) => {
                tracing::warn!(
                    error = (&error as &dyn error::Error),
                    "stored user profile is not valid, treating as absent"
                );
                None
            }
        }
    }

    /// Stores or clears the user profile
    pub async fn set_user_profile(&self, profile: Option<&UserProfile>) {
        let profile = match profile {
            Some(profile) => profile,
            None => return self.clear(CredentialKind::Profile).await,
        };

        match serde_json::to_string(profile) {
            Ok(raw) => self.set(CredentialKind::Profile, Some(&raw)).await,
            Err(error) => {
                tracing::warn!(
                    error = (&error as &dyn error::Error),
                    "unable to serialize user profile"
                );
            }
        }
    }

    /// Persists the tokens and profile from a sign-in response
    ///
    /// Each slot is written in turn. Anything missing from `data` is cleared
    /// so that nothing from a previous session lingers.
    pub async fn set_auth_data(&self, data: &AuthData) {
        self.set_access_token(Some(&data.token)).await;
        self.set_refresh_token(data.refresh_token.as_deref()).await;
        self.set_user_profile(data.user.as_ref()).await;
        tracing::debug!(
            has_refresh_token = data.refresh_token.is_some(),
            has_user = data.user.is_some(),
            "stored sign-in credentials"
        );
    }

    /// Whether an access token is stored
    pub async fn has_access(&self) -> bool {
        self.get(CredentialKind::Access).await.is_some()
    }

    /// Whether a refresh token is stored
    pub async fn has_refresh(&self) -> bool {
        self.get(CredentialKind::Refresh).await.is_some()
    }

    /// Whether both an access token and a refresh token are stored
    pub async fn is_authenticated(&self) -> bool {
        self.has_access().await && self.has_refresh().await
    }
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("CredentialStore").finish_non_exhaustive()
    }
}
