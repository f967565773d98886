//! Configuration options for the Orbit Learn client

use std::time::Duration;

use log::warn;

/// Environment variable overriding [`ClientOptions::request_timeout`], in seconds
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "ORBIT_LEARN_REQUEST_TIMEOUT_SECS";

/// Environment variable overriding [`ClientOptions::country`]
pub const ENV_COUNTRY: &str = "ORBIT_LEARN_COUNTRY";

/// Configuration options for the Orbit Learn client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Refresh ahead of time when the access token is known to be expired
    pub auto_refresh_token: bool,

    /// Keep the refresh token in durable storage across restarts
    pub persist_session: bool,

    /// The request timeout
    pub request_timeout: Option<Duration>,

    /// Slack applied when checking access token expiry
    pub expiry_margin: Duration,

    /// Country sent with sign-up, used server-side for consent rules
    pub country: String,

    /// Value of the `X-Client-Info` header
    pub client_info: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            auto_refresh_token: true,
            persist_session: true,
            request_timeout: Some(Duration::from_secs(30)),
            expiry_margin: Duration::from_secs(30),
            country: "US".to_string(),
            client_info: concat!("orbit-learn-rust/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientOptions {
    /// Defaults with overrides read from the environment.
    ///
    /// Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        let mut options = Self::default();

        if let Ok(raw) = std::env::var(ENV_REQUEST_TIMEOUT_SECS) {
            match raw.trim().parse::<u64>() {
                Ok(0) => options.request_timeout = None,
                Ok(secs) => options.request_timeout = Some(Duration::from_secs(secs)),
                Err(_) => warn!("Ignoring {}={:?}: not a number", ENV_REQUEST_TIMEOUT_SECS, raw),
            }
        }

        if let Ok(country) = std::env::var(ENV_COUNTRY) {
            let country = country.trim();
            if !country.is_empty() {
                options.country = country.to_uppercase();
            }
        }

        options
    }

    /// Set whether to automatically refresh the token
    pub fn with_auto_refresh_token(mut self, value: bool) -> Self {
        self.auto_refresh_token = value;
        self
    }

    /// Set whether to persist the session
    pub fn with_persist_session(mut self, value: bool) -> Self {
        self.persist_session = value;
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the expiry margin
    pub fn with_expiry_margin(mut self, value: Duration) -> Self {
        self.expiry_margin = value;
        self
    }

    /// Set the sign-up country
    pub fn with_country(mut self, value: &str) -> Self {
        self.country = value.to_string();
        self
    }

    /// Set the client info header
    pub fn with_client_info(mut self, value: &str) -> Self {
        self.client_info = value.to_string();
        self
    }
}
