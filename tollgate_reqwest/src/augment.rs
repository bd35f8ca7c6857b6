//! Attaching the stored access token to outgoing requests
//!
//! If a request already has an `Authorization` header by the time the
//! [`AccessTokenMiddleware`] executes, the existing value is left in place,
//! allowing overrides to be specified per call.

use std::fmt;

use bytes::{BufMut, BytesMut};
use predicates::{reflection, Predicate};
use reqwest::{header, Request, Response, Url};
use reqwest_middleware::{Middleware, Next, Result};
use tollgate_tokens::{AccessTokenRef, CredentialStore};

/// A middleware that injects the stored access token into outgoing requests
///
/// When no access token is stored, the request is sent without an
/// `Authorization` header. This middleware never fails a request.
#[derive(Clone, Debug)]
pub struct AccessTokenMiddleware<P = AnyRequest> {
    store: CredentialStore,
    predicate: P,
}

impl AccessTokenMiddleware<AnyRequest> {
    /// Construct a new middleware from a credential store
    ///
    /// By default, the token is attached to every request. To restrict
    /// which requests receive it, provide a custom predicate with
    /// [`with_predicate()`][Self::with_predicate()].
    pub fn new(store: CredentialStore) -> Self {
        Self {
            store,
            predicate: AnyRequest,
        }
    }

    /// Replaces the default predicate with a custom predicate
    pub fn with_predicate<P>(self, predicate: P) -> AccessTokenMiddleware<P> {
        AccessTokenMiddleware {
            store: self.store,
            predicate,
        }
    }
}

fn bearer_header(token: &AccessTokenRef) -> Option<header::HeaderValue> {
    let mut header_value = BytesMut::with_capacity(token.as_str().len() + 7);
    header_value.put_slice(b"Bearer ");
    header_value.put_slice(token.as_str().as_bytes());
    match header::HeaderValue::from_maybe_shared(header_value.freeze()) {
        Ok(mut value) => {
            value.set_sensitive(true);
            Some(value)
        }
        Err(_) => {
            tracing::warn!("stored access token is not a valid header value, sending request without it");
            None
        }
    }
}

#[async_trait::async_trait]
impl<P> Middleware for AccessTokenMiddleware<P>
where
    P: Predicate<Request> + Send + Sync + 'static,
{
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut http::Extensions,
        next: Next<'_>,
    ) -> Result<Response> {
        if req.headers().contains_key(header::AUTHORIZATION) {
            tracing::trace!(url = %req.url(), "request carries its own authorization, leaving it in place");
        } else if self.predicate.eval(&req) {
            match self.store.access_token().await {
                Some(token) => {
                    if let Some(value) = bearer_header(&token) {
                        tracing::trace!(url = %req.url(), "attaching access token");
                        req.headers_mut().insert(header::AUTHORIZATION, value);
                    }
                }
                None => {
                    tracing::trace!(url = %req.url(), "no access token stored, sending unauthenticated");
                }
            }
        }

        next.run(req, extensions).await
    }
}

/// Attach an access token to every request
#[derive(Clone, Copy, Debug, Default)]
pub struct AnyRequest;

impl Predicate<Request> for AnyRequest {
    #[inline]
    fn eval(&self, _: &Request) -> bool {
        true
    }
}

impl reflection::PredicateReflection for AnyRequest {}
impl fmt::Display for AnyRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any request")
    }
}

/// Whether `target` is an absolute `http://` or `https://` address
///
/// The scheme is matched case-insensitively.
pub fn is_absolute(target: &str) -> bool {
    fn has_prefix(target: &str, prefix: &str) -> bool {
        target
            .get(..prefix.len())
            .map_or(false, |head| head.eq_ignore_ascii_case(prefix))
    }

    has_prefix(target, "http://") || has_prefix(target, "https://")
}

/// Resolves a request target against a base address
///
/// Absolute targets are used as-is and ignore `base` entirely. Anything else
/// is appended to `base`, with exactly one `/` between the two.
pub fn resolve_target(base: &str, target: &str) -> std::result::Result<Url, url::ParseError> {
    if is_absolute(target) {
        return Url::parse(target);
    }

    let base = base.trim_end_matches('/');
    let target = target.trim_start_matches('/');
    if target.is_empty() {
        Url::parse(base)
    } else {
        Url::parse(&format!("{}/{}", base, target))
    }
}
