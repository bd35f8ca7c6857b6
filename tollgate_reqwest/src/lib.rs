//! An HTTP client that keeps its session alive
//!
//! The [`ApiClient`] is the single point of contact with a backend. Each call
//! it makes passes through two middlewares:
//!
//! 1. The [`RefreshMiddleware`] watches for `401 Unauthorized`. When one
//!    arrives, it asks the shared [`RefreshCoordinator`] for a new access
//!    token and replays the request once. Concurrent failures are coalesced
//!    onto a single refresh exchange; if that exchange fails, every waiting
//!    call fails with [`SessionExpired`] and the session is ended.
//! 2. The [`AccessTokenMiddleware`] attaches `Authorization: Bearer <token>`
//!    from the credential store, unless the call supplied its own
//!    `Authorization` header.
//!
//! ```
//! use tollgate_reqwest::{ApiClient, ClientConfig, RequestOptions};
//! use tollgate_tokens::CredentialStore;
//! # #[derive(serde::Deserialize)] struct Order;
//!
//! # #[tokio::main(flavor = "current_thread")] async fn main() -> Result<(), tollgate_reqwest::ApiError> {
//! let client = ApiClient::builder(ClientConfig::new("https://api.example.com"))
//!     .store(CredentialStore::in_memory())
//!     .build()?;
//!
//! let options = RequestOptions::default();
//! let req = client.get::<Vec<Order>>("/orders", &options);
//! # async move { req
//!     .await
//!     .unwrap();
//! # };
//! # Ok(())
//! # }
//! ```
//!
//! The middlewares can also be assembled by hand into any
//! [`ClientWithMiddleware`](reqwest_middleware::ClientWithMiddleware). The
//! refresh middleware must come first so that a replayed request picks up
//! the new token on its way back through the access token middleware.
//!
//! Attaching the access token can be scoped with any
//! [`Predicate`](predicates::Predicate) over the outgoing request, which is
//! useful when a single middleware stack talks to several backends. By
//! default it is attached to [`AnyRequest`].

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

pub mod augment;
pub mod config;
mod coordinator;
mod error;
pub mod expiry;
mod facade;

pub use augment::{AccessTokenMiddleware, AnyRequest};
pub use config::ClientConfig;
pub use coordinator::{AlreadyRetried, RefreshCoordinator, RefreshMiddleware};
pub use error::{ApiError, RefreshFailure, SessionExpired};
pub use expiry::{FailureHandler, LoggingObserver, SessionObserver};
pub use facade::{ApiClient, ApiClientBuilder, RequestConfig, RequestOptions};
