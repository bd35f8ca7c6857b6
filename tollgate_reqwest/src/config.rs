//! Client configuration

use std::time::Duration;

/// The message the backend sends with a `401` for a failed sign-in attempt
pub const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Configuration for an [`ApiClient`][crate::ApiClient]
#[derive(Clone, Debug)]
pub struct ClientConfig {
    base_url: String,
    refresh_path: String,
    redirect_delay: Duration,
    login_failure_message: String,
}

impl Default for ClientConfig {
    /// Default client configuration
    ///
    /// Uses an empty base address, a refresh endpoint of `/auth/refresh-token`,
    /// a redirect delay of 1.5 seconds, and treats `401` responses carrying
    /// `"Invalid credentials"` as failed sign-ins.
    fn default() -> Self {
        Self {
            base_url: String::new(),
            refresh_path: "/auth/refresh-token".to_owned(),
            redirect_delay: Duration::from_millis(1500),
            login_failure_message: INVALID_CREDENTIALS.to_owned(),
        }
    }
}

impl ClientConfig {
    /// Constructs a new configuration for the given base address
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Sets the path of the refresh endpoint
    ///
    /// Relative paths are resolved against the base address; absolute
    /// `http(s)://` addresses are used as-is.
    pub fn with_refresh_path(mut self, refresh_path: impl Into<String>) -> Self {
        self.refresh_path = refresh_path.into();
        self
    }

    /// Sets how long to wait after an expiry notice before redirecting to sign-in
    pub fn with_redirect_delay(mut self, redirect_delay: Duration) -> Self {
        self.redirect_delay = redirect_delay;
        self
    }

    /// Sets the `401` message that identifies a failed sign-in attempt
    pub fn with_login_failure_message(mut self, message: impl Into<String>) -> Self {
        self.login_failure_message = message.into();
        self
    }

    /// The base address relative request targets are resolved against
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The path or address of the refresh endpoint
    pub fn refresh_path(&self) -> &str {
        &self.refresh_path
    }

    /// The delay between an expiry notice and the redirect to sign-in
    pub fn redirect_delay(&self) -> Duration {
        self.redirect_delay
    }

    /// The `401` message that identifies a failed sign-in attempt
    pub fn login_failure_message(&self) -> &str {
        &self.login_failure_message
    }
}
