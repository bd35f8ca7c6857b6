//! Single-flight credential refresh and request replay
//!
//! When a request is answered with `401 Unauthorized`, the
//! [`RefreshMiddleware`] asks the [`RefreshCoordinator`] for a fresh access
//! token and replays the request once with it. However many requests fail at
//! the same time, only one refresh exchange is performed: the first caller
//! drives it, and every other caller queues behind it until it resolves.
//!
//! A `401` whose body carries the sign-in failure message is a rejected
//! sign-in, not an expired session, and is passed through untouched.

use std::{
    collections::VecDeque,
    fmt, mem,
    sync::{Arc, Mutex, PoisonError},
};

use bytes::Bytes;
use reqwest::{Request, Response, ResponseBuilderExt, StatusCode};
use reqwest_middleware::{Error, Middleware, Next, Result};
use serde::Deserialize;
use tokio::sync::oneshot;
use tollgate_tokens::{refresh::AsyncCredentialRefresher, AccessToken, CredentialStore};

use crate::{expiry::FailureHandler, RefreshFailure, SessionExpired};

type Outcome = std::result::Result<AccessToken, Arc<RefreshFailure>>;

/// What a queued caller is told when it is released
enum Signal {
    Settled(Outcome),
    /// The caller driving the cycle went away; the receiver must drive it now
    TakeOver,
}

/// A caller suspended until the current refresh cycle resolves
struct PendingCaller {
    signal: oneshot::Sender<Signal>,
}

enum RefreshState {
    Idle,
    Refreshing { pending: VecDeque<PendingCaller> },
}

/// Coordinates refreshes so that at most one is in flight at a time
///
/// While a refresh cycle is underway, further callers are queued and settled
/// in arrival order once it resolves: all with the new access token, or all
/// with the same failure. A failed cycle ends the session through the
/// [`FailureHandler`] exactly once.
///
/// If the future driving a cycle is dropped before it resolves, the cycle is
/// handed to the earliest queued caller, which performs the exchange itself.
pub struct RefreshCoordinator<R> {
    state: Mutex<RefreshState>,
    refresher: R,
    store: CredentialStore,
    failure_handler: FailureHandler,
}

impl<R> RefreshCoordinator<R> {
    /// Constructs a new coordinator in the idle state
    pub fn new(refresher: R, store: CredentialStore, failure_handler: FailureHandler) -> Self {
        Self {
            state: Mutex::new(RefreshState::Idle),
            refresher,
            store,
            failure_handler,
        }
    }

    /// Whether a refresh cycle is currently underway
    pub fn is_refreshing(&self) -> bool {
        matches!(
            *self.state.lock().unwrap_or_else(PoisonError::into_inner),
            RefreshState::Refreshing { .. }
        )
    }

    /// Returns to idle and settles every queued caller in arrival order
    fn settle(&self, outcome: &Outcome) {
        let pending = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            match mem::replace(&mut *state, RefreshState::Idle) {
                RefreshState::Refreshing { pending } => pending,
                RefreshState::Idle => VecDeque::new(),
            }
        };

        tracing::debug!(
            pending = pending.len(),
            succeeded = outcome.is_ok(),
            "refresh cycle resolved, releasing queued callers"
        );

        for caller in pending {
            // A caller that has gone away has nothing left to settle
            let _ = caller.signal.send(Signal::Settled(outcome.clone()));
        }
    }

    /// Passes an unfinished cycle to the earliest queued caller still waiting
    ///
    /// Returns to idle if nobody is left to take it.
    fn hand_off(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let RefreshState::Refreshing { ref mut pending } = *state {
            while let Some(caller) = pending.pop_front() {
                if caller.signal.send(Signal::TakeOver).is_ok() {
                    tracing::debug!(
                        remaining = pending.len(),
                        "handing refresh cycle to the next queued caller"
                    );
                    return;
                }
            }
        }

        tracing::debug!("no queued caller left to take over the refresh cycle");
        *state = RefreshState::Idle;
    }
}

impl<R: AsyncCredentialRefresher> RefreshCoordinator<R> {
    /// Obtains a fresh access token, joining the refresh cycle in progress if there is one
    ///
    /// Only the caller driving a cycle performs the exchange, normally the one
    /// that started it. If the cycle fails, that caller also ends the session
    /// before returning.
    pub async fn refreshed_credential(&self) -> Outcome {
        let waiter = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            match *state {
                RefreshState::Idle => {
                    *state = RefreshState::Refreshing {
                        pending: VecDeque::new(),
                    };
                    None
                }
                RefreshState::Refreshing { ref mut pending } => {
                    let (tx, rx) = oneshot::channel();
                    pending.push_back(PendingCaller { signal: tx });
                    tracing::debug!(
                        position = pending.len(),
                        "refresh already in progress, queueing caller"
                    );
                    Some(rx)
                }
            }
        };

        let mut waiter = match waiter {
            Some(rx) => Waiter {
                coordinator: self,
                rx,
            },
            None => return self.run_cycle().await,
        };

        match (&mut waiter.rx).await {
            Ok(Signal::Settled(outcome)) => outcome,
            Ok(Signal::TakeOver) => {
                tracing::debug!("taking over abandoned refresh cycle");
                self.run_cycle().await
            }
            Err(_) => Err(Arc::new(RefreshFailure::Abandoned)),
        }
    }

    async fn run_cycle(&self) -> Outcome {
        tracing::debug!("starting refresh cycle");
        let mut guard = CycleGuard {
            coordinator: self,
            armed: true,
        };

        let outcome = match self.refresher.refresh(&self.store).await {
            Ok(Some(token)) => Ok(token),
            Ok(None) => Err(Arc::new(RefreshFailure::NoCredential)),
            Err(error) => Err(Arc::new(RefreshFailure::Exchange(Box::new(error)))),
        };

        guard.armed = false;
        self.settle(&outcome);

        match &outcome {
            Ok(_) => tracing::info!("refresh cycle succeeded"),
            Err(error) => {
                tracing::warn!(
                    error = (&**error as &dyn std::error::Error),
                    "refresh cycle failed"
                );
                self.failure_handler.handle().await;
            }
        }

        outcome
    }
}

impl<R> fmt::Debug for RefreshCoordinator<R>
where
    R: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("refreshing", &self.is_refreshing())
            .field("refresher", &self.refresher)
            .field("failure_handler", &self.failure_handler)
            .finish_non_exhaustive()
    }
}

/// Hands the cycle on if the cycle-driving future is dropped mid-refresh
struct CycleGuard<'a, R> {
    coordinator: &'a RefreshCoordinator<R>,
    armed: bool,
}

impl<R> Drop for CycleGuard<'_, R> {
    fn drop(&mut self) {
        if self.armed {
            tracing::warn!("refresh cycle dropped before completion");
            self.coordinator.hand_off();
        }
    }
}

/// A queued caller's receiving end
///
/// If the caller is dropped after being handed the cycle but before acting on
/// it, the cycle is passed on again.
struct Waiter<'a, R> {
    coordinator: &'a RefreshCoordinator<R>,
    rx: oneshot::Receiver<Signal>,
}

impl<R> Drop for Waiter<'_, R> {
    fn drop(&mut self) {
        self.rx.close();
        if let Ok(Signal::TakeOver) = self.rx.try_recv() {
            self.coordinator.hand_off();
        }
    }
}

/// Marks a request that has already been replayed after a refresh
///
/// A request carrying this marker is never replayed again; a second `401` is
/// returned to the caller as-is.
#[derive(Clone, Copy, Debug, Default)]
pub struct AlreadyRetried;

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// A middleware that refreshes the session on `401` and replays the request
///
/// Place it before the [`AccessTokenMiddleware`][crate::AccessTokenMiddleware]
/// in the stack. The request is captured before the access token is attached,
/// so the replay picks up the freshly stored token on its way through.
pub struct RefreshMiddleware<R> {
    coordinator: Arc<RefreshCoordinator<R>>,
    login_failure_message: Arc<str>,
}

impl<R> RefreshMiddleware<R> {
    /// Constructs a new middleware around a shared coordinator
    pub fn new(
        coordinator: Arc<RefreshCoordinator<R>>,
        login_failure_message: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            coordinator,
            login_failure_message: login_failure_message.into(),
        }
    }

    fn is_login_failure(&self, body: &[u8]) -> bool {
        serde_json::from_slice::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message)
            .map_or(false, |m| m == *self.login_failure_message)
    }
}

impl<R> Clone for RefreshMiddleware<R> {
    fn clone(&self) -> Self {
        Self {
            coordinator: Arc::clone(&self.coordinator),
            login_failure_message: Arc::clone(&self.login_failure_message),
        }
    }
}

impl<R: fmt::Debug> fmt::Debug for RefreshMiddleware<R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RefreshMiddleware")
            .field("coordinator", &self.coordinator)
            .field("login_failure_message", &self.login_failure_message)
            .finish()
    }
}

/// Reads a response body and puts it back together so it can still be returned
///
/// The rebuilt response keeps the status, version, headers, extensions and URL
/// of the original.
async fn buffer_response(response: Response) -> Result<(Response, Bytes)> {
    let status = response.status();
    let version = response.version();
    let headers = response.headers().clone();
    let extensions = response.extensions().clone();
    let url = response.url().clone();
    let body = response.bytes().await?;

    let mut builder = http::Response::builder().status(status).version(version);
    if let Some(h) = builder.headers_mut() {
        *h = headers;
    }
    if let Some(e) = builder.extensions_mut() {
        *e = extensions;
    }
    let rebuilt = builder
        .url(url)
        .body(body.clone())
        .map_err(Error::middleware)?;

    Ok((Response::from(rebuilt), body))
}

#[async_trait::async_trait]
impl<R> Middleware for RefreshMiddleware<R>
where
    R: AsyncCredentialRefresher + 'static,
{
    async fn handle(
        &self,
        req: Request,
        extensions: &mut http::Extensions,
        next: Next<'_>,
    ) -> Result<Response> {
        let retried = extensions.get::<AlreadyRetried>().is_some();
        let replay = if retried { None } else { req.try_clone() };

        let response = next.clone().run(req, extensions).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let replay = match replay {
            Some(replay) => replay,
            None => {
                tracing::debug!(
                    url = %response.url(),
                    retried,
                    "unauthorized response not eligible for refresh, passing through"
                );
                return Ok(response);
            }
        };

        let (response, body) = buffer_response(response).await?;
        if self.is_login_failure(&body) {
            tracing::debug!(
                url = %replay.url(),
                "unauthorized response is a failed sign-in, passing through"
            );
            return Ok(response);
        }

        tracing::debug!(url = %replay.url(), "access token rejected, refreshing session");
        extensions.insert(AlreadyRetried);

        match self.coordinator.refreshed_credential().await {
            Ok(_) => {
                tracing::debug!(url = %replay.url(), "replaying request with refreshed token");
                next.run(replay, extensions).await
            }
            Err(failure) => Err(Error::middleware(SessionExpired(failure))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use reqwest::{header, Client};
    use reqwest_middleware::ClientBuilder;
    use tokio::sync::Notify;
    use tollgate_tokens::{CredentialKind, RefreshToken};

    use super::*;
    use crate::{expiry::tests::RecordingObserver, AccessTokenMiddleware};

    #[derive(Debug, thiserror::Error)]
    #[error("authority unavailable")]
    struct Unavailable;

    /// A refresher that holds every exchange until released
    #[derive(Debug)]
    struct GatedRefresher {
        calls: AtomicUsize,
        gate: Notify,
        result: std::result::Result<Option<&'static str>, ()>,
    }

    impl GatedRefresher {
        fn new(result: std::result::Result<Option<&'static str>, ()>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                gate: Notify::new(),
                result,
            }
        }
    }

    #[async_trait]
    impl AsyncCredentialRefresher for GatedRefresher {
        type Error = Unavailable;

        async fn refresh(
            &self,
            store: &CredentialStore,
        ) -> std::result::Result<Option<AccessToken>, Self::Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            match self.result {
                Ok(Some(token)) => {
                    let token = AccessToken::from_static(token);
                    store.set_access_token(Some(&token)).await;
                    Ok(Some(token))
                }
                Ok(None) => Ok(None),
                Err(()) => Err(Unavailable),
            }
        }
    }

    struct Harness {
        refresher: Arc<GatedRefresher>,
        observer: Arc<RecordingObserver>,
        store: CredentialStore,
        coordinator: Arc<RefreshCoordinator<Arc<GatedRefresher>>>,
    }

    async fn harness(result: std::result::Result<Option<&'static str>, ()>) -> Harness {
        let store = CredentialStore::in_memory();
        store
            .set_access_token(Some(&AccessToken::from_static("A1")))
            .await;
        store
            .set_refresh_token(Some(&RefreshToken::from_static("R1")))
            .await;

        let refresher = Arc::new(GatedRefresher::new(result));
        let observer = Arc::new(RecordingObserver::default());
        let failure_handler =
            FailureHandler::new(store.clone(), observer.clone(), Duration::ZERO);
        let coordinator = Arc::new(RefreshCoordinator::new(
            Arc::clone(&refresher),
            store.clone(),
            failure_handler,
        ));

        Harness {
            refresher,
            observer,
            store,
            coordinator,
        }
    }

    async fn release(refresher: &GatedRefresher) {
        tokio::task::yield_now().await;
        refresher.gate.notify_one();
    }

    mod refresh_coordinator {
        use super::*;

        #[tokio::test]
        async fn concurrent_callers_share_a_single_refresh() {
            let h = harness(Ok(Some("A2"))).await;

            let (a, b, c, ()) = tokio::join!(
                h.coordinator.refreshed_credential(),
                h.coordinator.refreshed_credential(),
                h.coordinator.refreshed_credential(),
                release(&h.refresher),
            );

            assert_eq!(h.refresher.calls.load(Ordering::SeqCst), 1);
            for outcome in [a, b, c] {
                assert_eq!(outcome.unwrap().as_str(), "A2");
            }
            assert!(!h.coordinator.is_refreshing());
            assert_eq!(h.observer.expired.load(Ordering::SeqCst), 0);
        }

        #[tokio::test]
        async fn failed_refresh_rejects_every_caller_and_ends_the_session_once() {
            let h = harness(Err(())).await;

            let (a, b, c, ()) = tokio::join!(
                h.coordinator.refreshed_credential(),
                h.coordinator.refreshed_credential(),
                h.coordinator.refreshed_credential(),
                release(&h.refresher),
            );

            assert_eq!(h.refresher.calls.load(Ordering::SeqCst), 1);
            for outcome in [a, b, c] {
                assert!(matches!(*outcome.unwrap_err(), RefreshFailure::Exchange(_)));
            }
            assert_eq!(h.observer.expired.load(Ordering::SeqCst), 1);
            assert!(!h.store.is_authenticated().await);
        }

        #[tokio::test]
        async fn missing_refresh_token_fails_the_cycle() {
            let h = harness(Ok(None)).await;

            let (a, ()) = tokio::join!(
                h.coordinator.refreshed_credential(),
                release(&h.refresher),
            );

            assert!(matches!(*a.unwrap_err(), RefreshFailure::NoCredential));
            assert_eq!(h.observer.expired.load(Ordering::SeqCst), 1);
        }

        #[tokio::test]
        async fn a_later_failure_starts_a_new_cycle() {
            let h = harness(Ok(Some("A2"))).await;

            let (first, ()) = tokio::join!(
                h.coordinator.refreshed_credential(),
                release(&h.refresher),
            );
            let (second, ()) = tokio::join!(
                h.coordinator.refreshed_credential(),
                release(&h.refresher),
            );

            assert!(first.is_ok());
            assert!(second.is_ok());
            assert_eq!(h.refresher.calls.load(Ordering::SeqCst), 2);
        }

        #[tokio::test]
        async fn dropping_the_driving_caller_hands_the_cycle_to_a_queued_caller() {
            let h = harness(Ok(Some("A2"))).await;

            let mut driver = Box::pin(h.coordinator.refreshed_credential());
            let mut queued = Box::pin(h.coordinator.refreshed_credential());

            // Start the cycle, then queue a second caller behind it
            assert!(futures_poll(driver.as_mut()).await.is_none());
            assert!(futures_poll(queued.as_mut()).await.is_none());
            assert!(h.coordinator.is_refreshing());

            drop(driver);

            let (outcome, ()) = tokio::join!(queued, release(&h.refresher));

            assert_eq!(outcome.unwrap().as_str(), "A2");
            assert_eq!(h.refresher.calls.load(Ordering::SeqCst), 2);
            assert!(!h.coordinator.is_refreshing());
            assert_eq!(h.observer.expired.load(Ordering::SeqCst), 0);
            assert!(h.store.is_authenticated().await);
        }

        #[tokio::test]
        async fn dropping_every_caller_returns_to_idle() {
            let h = harness(Ok(Some("A2"))).await;

            let mut driver = Box::pin(h.coordinator.refreshed_credential());
            let mut queued = Box::pin(h.coordinator.refreshed_credential());
            assert!(futures_poll(driver.as_mut()).await.is_none());
            assert!(futures_poll(queued.as_mut()).await.is_none());

            drop(driver);
            drop(queued);

            assert!(!h.coordinator.is_refreshing());

            let (outcome, ()) = tokio::join!(
                h.coordinator.refreshed_credential(),
                release(&h.refresher),
            );
            assert_eq!(outcome.unwrap().as_str(), "A2");
        }

        async fn futures_poll<F: std::future::Future + Unpin>(fut: F) -> Option<F::Output> {
            tokio::select! {
                biased;
                out = fut => Some(out),
                _ = std::future::ready(()) => None,
            }
        }
    }

    /// A stand-in backend that rejects any token but the expected one
    struct Backend {
        valid: &'static str,
        body: &'static str,
        seen: Mutex<Vec<Option<String>>>,
    }

    impl Backend {
        fn new(valid: &'static str, body: &'static str) -> Self {
            Self {
                valid,
                body,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn seen(&self) -> Vec<Option<String>> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Middleware for Backend {
        async fn handle(
            &self,
            req: Request,
            _: &mut http::Extensions,
            _: Next<'_>,
        ) -> Result<Response> {
            let auth = req
                .headers()
                .get(header::AUTHORIZATION)
                .map(|v| v.to_str().unwrap().to_owned());
            let authorized = auth.as_deref() == Some(self.valid);
            self.seen.lock().unwrap().push(auth);

            let status = if authorized {
                StatusCode::OK
            } else {
                StatusCode::UNAUTHORIZED
            };
            let resp = http::Response::builder()
                .status(status)
                .header(header::CONTENT_TYPE, "application/json")
                .body(self.body)
                .unwrap();
            Ok(resp.into())
        }
    }

    fn client(h: &Harness, backend: Arc<Backend>) -> reqwest_middleware::ClientWithMiddleware {
        ClientBuilder::new(Client::default())
            .with(RefreshMiddleware::new(
                Arc::clone(&h.coordinator),
                crate::config::INVALID_CREDENTIALS,
            ))
            .with(AccessTokenMiddleware::new(h.store.clone()))
            .with_arc(backend)
            .build()
    }

    mod refresh_middleware {
        use super::*;

        #[tokio::test]
        async fn replays_once_with_the_refreshed_token() {
            let h = harness(Ok(Some("A2"))).await;
            let backend = Arc::new(Backend::new("Bearer A2", r#"{"ok":true}"#));
            let client = client(&h, backend.clone());

            let (resp, ()) = tokio::join!(
                client.get("https://api.test/orders").send(),
                release(&h.refresher),
            );

            assert_eq!(resp.unwrap().status(), StatusCode::OK);
            assert_eq!(
                backend.seen(),
                vec![Some("Bearer A1".to_owned()), Some("Bearer A2".to_owned())]
            );
        }

        #[tokio::test]
        async fn second_unauthorized_is_surfaced_without_another_refresh() {
            let h = harness(Ok(Some("A2"))).await;
            let backend = Arc::new(Backend::new("Bearer never", r#"{"message":"nope"}"#));
            let client = client(&h, backend.clone());

            let (resp, ()) = tokio::join!(
                client.get("https://api.test/orders").send(),
                release(&h.refresher),
            );

            assert_eq!(resp.unwrap().status(), StatusCode::UNAUTHORIZED);
            assert_eq!(h.refresher.calls.load(Ordering::SeqCst), 1);
            assert_eq!(backend.seen().len(), 2);
        }

        #[tokio::test]
        async fn failed_sign_in_is_passed_through_with_its_body() {
            let h = harness(Ok(Some("A2"))).await;
            let backend = Arc::new(Backend::new(
                "Bearer never",
                r#"{"message":"Invalid credentials"}"#,
            ));
            let client = client(&h, backend.clone());

            let resp = client.post("https://api.test/auth/login").send().await.unwrap();

            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(
                resp.headers().get(header::CONTENT_TYPE).unwrap(),
                "application/json"
            );
            assert_eq!(resp.text().await.unwrap(), r#"{"message":"Invalid credentials"}"#);
            assert_eq!(h.refresher.calls.load(Ordering::SeqCst), 0);
            assert!(!h.coordinator.is_refreshing());
            assert_eq!(backend.seen().len(), 1);
        }

        #[tokio::test]
        async fn failed_sign_in_keeps_the_response_origin() {
            use wiremock::{matchers::path, Mock, MockServer, ResponseTemplate};

            let server = MockServer::start().await;
            Mock::given(path("/auth/login"))
                .respond_with(
                    ResponseTemplate::new(401)
                        .set_body_json(serde_json::json!({ "message": "Invalid credentials" })),
                )
                .expect(1)
                .mount(&server)
                .await;

            let h = harness(Ok(Some("A2"))).await;
            let client = ClientBuilder::new(Client::default())
                .with(RefreshMiddleware::new(
                    Arc::clone(&h.coordinator),
                    crate::config::INVALID_CREDENTIALS,
                ))
                .with(AccessTokenMiddleware::new(h.store.clone()))
                .build();

            let url = format!("{}/auth/login", server.uri());
            let resp = client.post(&url).send().await.unwrap();

            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(resp.url().as_str(), url);
            assert_eq!(resp.remote_addr(), Some(*server.address()));
            assert_eq!(h.refresher.calls.load(Ordering::SeqCst), 0);
        }

        #[tokio::test]
        async fn failed_refresh_surfaces_session_expired_without_replay() {
            let h = harness(Err(())).await;
            let backend = Arc::new(Backend::new("Bearer A2", "{}"));
            let client = client(&h, backend.clone());

            let (resp, ()) = tokio::join!(
                client.get("https://api.test/orders").send(),
                release(&h.refresher),
            );

            let err = match resp.unwrap_err() {
                Error::Middleware(err) => err,
                other => panic!("unexpected error: {}", other),
            };
            assert!(err.downcast_ref::<SessionExpired>().is_some());
            assert_eq!(backend.seen().len(), 1);
            assert_eq!(h.store.get(CredentialKind::Access).await, None);
        }

        #[tokio::test]
        async fn other_failures_are_not_intercepted() {
            struct NotFound;

            #[async_trait]
            impl Middleware for NotFound {
                async fn handle(
                    &self,
                    _: Request,
                    _: &mut http::Extensions,
                    _: Next<'_>,
                ) -> Result<Response> {
                    let resp = http::Response::builder()
                        .status(StatusCode::NOT_FOUND)
                        .body("")
                        .unwrap();
                    Ok(resp.into())
                }
            }

            let h = harness(Ok(Some("A2"))).await;
            let client = ClientBuilder::new(Client::default())
                .with(RefreshMiddleware::new(
                    Arc::clone(&h.coordinator),
                    crate::config::INVALID_CREDENTIALS,
                ))
                .with(NotFound)
                .build();

            let resp = client.get("https://api.test/missing").send().await.unwrap();

            assert_eq!(resp.status(), StatusCode::NOT_FOUND);
            assert_eq!(h.refresher.calls.load(Ordering::SeqCst), 0);
        }
    }
}
