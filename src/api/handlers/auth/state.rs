//! Auth state and configuration.

use super::token::TokenService;

const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
const DEFAULT_ATTEMPT_WINDOW: i64 = 10;
const DEFAULT_OTP_TTL_SECONDS: i64 = 10 * 60;
const DEFAULT_TOKEN_TTL_SECONDS: i64 = 24 * 60 * 60;
const DEFAULT_REFRESH_WINDOW_SECONDS: i64 = 60;

/// Tunables for the authentication core.
///
/// Thresholds are configuration, not hardcoded logic, so deployments can tune
/// the brute-force policy without a rebuild.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    origin: String,
    failure_threshold: u32,
    attempt_window: i64,
    otp_ttl_seconds: i64,
    token_ttl_seconds: i64,
    refresh_window_seconds: i64,
}

impl AuthConfig {
    #[must_use]
    pub fn new(origin: String) -> Self {
        Self {
            origin,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            attempt_window: DEFAULT_ATTEMPT_WINDOW,
            otp_ttl_seconds: DEFAULT_OTP_TTL_SECONDS,
            token_ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
            refresh_window_seconds: DEFAULT_REFRESH_WINDOW_SECONDS,
        }
    }

    #[must_use]
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_attempt_window(mut self, window: i64) -> Self {
        self.attempt_window = window;
        self
    }

    #[must_use]
    pub fn with_otp_ttl_seconds(mut self, seconds: i64) -> Self {
        self.otp_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_refresh_window_seconds(mut self, seconds: i64) -> Self {
        self.refresh_window_seconds = seconds;
        self
    }

    #[must_use]
    pub fn token_ttl_seconds(&self) -> i64 {
        self.token_ttl_seconds
    }

    #[must_use]
    pub fn refresh_window_seconds(&self) -> i64 {
        self.refresh_window_seconds
    }

    pub(super) fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    pub(super) fn attempt_window(&self) -> i64 {
        self.attempt_window
    }

    pub(super) fn otp_ttl_seconds(&self) -> i64 {
        self.otp_ttl_seconds
    }

    pub(super) fn cookie_secure(&self) -> bool {
        self.origin.starts_with("https://")
    }
}

/// Shared auth state, built once at startup and injected into handlers.
pub struct AuthState {
    config: AuthConfig,
    tokens: TokenService,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig, tokens: TokenService) -> Self {
        Self { config, tokens }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }
}
