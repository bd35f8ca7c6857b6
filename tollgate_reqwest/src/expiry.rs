//! Ending a session once it can no longer be refreshed

use std::{fmt, sync::Arc, time::Duration};

use tollgate_tokens::CredentialStore;

/// Receives notice that the session has ended
///
/// Implemented by the host application to show an expiry notice and to
/// navigate to its sign-in surface. Neither method can fail.
pub trait SessionObserver: Send + Sync {
    /// Present a notice that the session has expired
    fn session_expired(&self);

    /// Navigate to the unauthenticated entry surface
    fn redirect_to_login(&self);
}

/// A session observer that only logs
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingObserver;

impl SessionObserver for LoggingObserver {
    fn session_expired(&self) {
        tracing::warn!("session expired, please sign in again");
    }

    fn redirect_to_login(&self) {
        tracing::info!("redirecting to sign-in");
    }
}

/// Ends the session after a refresh cycle fails
///
/// Presents the expiry notice, clears every stored credential, and then,
/// after `redirect_delay`, asks the host application to redirect to sign-in.
/// The delay gives the notice time to be seen.
#[derive(Clone)]
pub struct FailureHandler {
    store: CredentialStore,
    observer: Arc<dyn SessionObserver>,
    redirect_delay: Duration,
}

impl FailureHandler {
    /// Constructs a new failure handler
    pub fn new(
        store: CredentialStore,
        observer: Arc<dyn SessionObserver>,
        redirect_delay: Duration,
    ) -> Self {
        Self {
            store,
            observer,
            redirect_delay,
        }
    }

    /// Ends the session
    ///
    /// Returns once credentials are cleared. The redirect runs on a spawned
    /// task, so this must be called from within a Tokio runtime.
    pub async fn handle(&self) {
        tracing::info!(
            redirect_delay_ms = self.redirect_delay.as_millis() as u64,
            "session could not be refreshed, ending it"
        );

        self.observer.session_expired();
        self.store.clear_all().await;

        let observer = Arc::clone(&self.observer);
        let delay = self.redirect_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            observer.redirect_to_login();
        });
    }
}

impl fmt::Debug for FailureHandler {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("FailureHandler")
            .field("store", &self.store)
            .field("redirect_delay", &self.redirect_delay)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tollgate_tokens::{AccessToken, CredentialKind};

    use super::*;

    #[derive(Debug, Default)]
    pub(crate) struct RecordingObserver {
        pub(crate) expired: AtomicUsize,
        pub(crate) redirected: AtomicUsize,
    }

    impl SessionObserver for RecordingObserver {
        fn session_expired(&self) {
            self.expired.fetch_add(1, Ordering::SeqCst);
        }

        fn redirect_to_login(&self) {
            self.redirected.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn clears_credentials_and_redirects_after_the_delay() {
        let store = CredentialStore::in_memory();
        store
            .set_access_token(Some(&AccessToken::from_static("A1")))
            .await;
        let observer = Arc::new(RecordingObserver::default());
        let handler = FailureHandler::new(
            store.clone(),
            observer.clone(),
            Duration::from_millis(1500),
        );

        handler.handle().await;

        assert_eq!(observer.expired.load(Ordering::SeqCst), 1);
        assert_eq!(observer.redirected.load(Ordering::SeqCst), 0);
        for kind in CredentialKind::ALL {
            assert_eq!(store.get(kind).await, None);
        }

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(observer.redirected.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(600)).await;
        tokio::task::yield_now().await;
        assert_eq!(observer.redirected.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn is_idempotent_when_credentials_are_already_cleared() {
        let observer = Arc::new(RecordingObserver::default());
        let handler = FailureHandler::new(
            CredentialStore::in_memory(),
            observer.clone(),
            Duration::ZERO,
        );

        handler.handle().await;

        assert_eq!(observer.expired.load(Ordering::SeqCst), 1);
    }
}
