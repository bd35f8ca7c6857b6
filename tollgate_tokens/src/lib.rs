//! Durable credential storage and refresh-token exchange for API clients
//!
//! This library holds the credentials a bearer-authenticated client needs to
//! talk to its backend: a short-lived access token, a longer-lived refresh
//! token, and the signed-in user's profile. It also knows how to trade the
//! refresh token for a new access token when the backend says the current one
//! is no longer good.
//!
//! # Storage
//!
//! The [`CredentialStore`] is the only way credentials are read or written.
//! It sits over a [`CredentialStorage`][storage::CredentialStorage] backend,
//! either kept in memory or persisted to a local file, and it never fails:
//! a backend fault is logged and the credential is treated as absent, so a
//! full disk or a corrupt file degrades to an unauthenticated client rather
//! than an error.
//!
//! ```
//! use tollgate_tokens::{AccessToken, AuthData, CredentialStore, RefreshToken};
//!
//! # #[tokio::main(flavor = "current_thread")] async fn main() {
//! let store = CredentialStore::in_memory();
//!
//! store
//!     .set_auth_data(&AuthData {
//!         token: AccessToken::from_static("access"),
//!         refresh_token: Some(RefreshToken::from_static("refresh")),
//!         user: None,
//!     })
//!     .await;
//!
//! assert!(store.is_authenticated().await);
//! # }
//! ```
//!
//! # Refreshing
//!
//! A [`RefreshTokenExchange`][refresh::RefreshTokenExchange] posts the stored
//! refresh token to the authority and persists whatever comes back. When the
//! authority rejects the refresh token outright (`401` or `403`), every stored
//! credential is cleared immediately.
//!
//! # Features
//!
//! The following features are supported by this crate, all of which are enabled by default:
//!
//! * `file`: Provides a credential storage backend using the local filesystem.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

mod braids;
mod profile;
pub mod refresh;
pub mod storage;
mod store;

pub use braids::*;
pub use profile::{AuthData, LoginResponse, UserProfile};
pub use store::{CredentialKind, CredentialStore};
