//! Single-flight access token refresh
//!
//! [`TokenRefresher`] keeps the stored access token usable. Concurrent callers
//! that find the token expired share one refresh request: the first caller
//! starts it and everyone else awaits the same shared future. The refresher
//! never returns an error; any failure reads as "no valid token".

use crate::clock::Clock;
use crate::error::ClientError;
use crate::tokens::TokenStore;
use crate::types::RefreshResponse;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Refresh endpoint path, relative to the API base URL
pub const REFRESH_ENDPOINT: &str = "/auth/refresh";

/// Window in which a repeated refresh attempt is logged as rapid. Callers
/// inside it still join or start a refresh as usual.
pub const DEFAULT_DEBOUNCE_MS: i64 = 1000;

/// Lifetime assumed when the refresh response omits `expiresIn`
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Performs the refresh call against the backend
#[async_trait]
pub trait RefreshTransport: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, ClientError>;
}

/// Production transport: `POST {base}/auth/refresh {refreshToken}`
pub struct HttpRefreshTransport {
    http: reqwest::Client,
    base_url: String,
}

impl HttpRefreshTransport {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl RefreshTransport for HttpRefreshTransport {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, ClientError> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), REFRESH_ENDPOINT);
        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "refreshToken": refresh_token }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: format!("Token refresh failed (HTTP {status})"),
            });
        }

        serde_json::from_str(&body).map_err(|e| ClientError::MalformedResponse(e.to_string()))
    }
}

type RefreshFuture = Shared<BoxFuture<'static, bool>>;

#[derive(Default)]
struct FlightState {
    in_flight: Option<(u64, RefreshFuture)>,
    last_attempt: Option<DateTime<Utc>>,
    generation: u64,
}

struct RefresherInner {
    tokens: TokenStore,
    transport: Arc<dyn RefreshTransport>,
    clock: Arc<dyn Clock>,
    expiry_buffer: Duration,
    debounce: Duration,
    default_expires_in_secs: i64,
    state: Mutex<FlightState>,
}

/// Shared refresh service; clones share the same in-flight state
#[derive(Clone)]
pub struct TokenRefresher {
    inner: Arc<RefresherInner>,
}

impl TokenRefresher {
    pub fn new(
        tokens: TokenStore,
        transport: Arc<dyn RefreshTransport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Arc::new(RefresherInner {
                tokens,
                transport,
                clock,
                expiry_buffer: Duration::zero(),
                debounce: Duration::milliseconds(DEFAULT_DEBOUNCE_MS),
                default_expires_in_secs: DEFAULT_EXPIRES_IN_SECS,
                state: Mutex::new(FlightState::default()),
            }),
        }
    }

    /// Override timing parameters. Ignored, with a warning, once the refresher
    /// has been cloned.
    pub fn with_timing(
        mut self,
        expiry_buffer: Duration,
        debounce: Duration,
        default_expires_in_secs: i64,
    ) -> Self {
        match Arc::get_mut(&mut self.inner) {
            Some(inner) => {
                inner.expiry_buffer = expiry_buffer;
                inner.debounce = debounce;
                inner.default_expires_in_secs = default_expires_in_secs;
            }
            None => warn!("refresher already shared, timing overrides ignored"),
        }
        self
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.inner.tokens
    }

    /// Time of the most recent refresh attempt
    pub fn last_attempt(&self) -> Option<DateTime<Utc>> {
        self.inner.state.lock().last_attempt
    }

    pub fn is_refreshing(&self) -> bool {
        self.inner.state.lock().in_flight.is_some()
    }

    /// True when a usable access token is stored, refreshing it if needed
    pub async fn ensure_valid_token(&self) -> bool {
        let has_token = matches!(self.inner.tokens.access_token(), Ok(Some(_)));
        if has_token && !self.inner.tokens.is_token_expired(self.inner.expiry_buffer) {
            return true;
        }

        self.refresh().await
    }

    /// Refresh now, joining an in-flight refresh when there is one
    pub async fn refresh(&self) -> bool {
        let flight = {
            let mut state = self.inner.state.lock();
            let now = self.inner.clock.now();

            let within_debounce = state
                .last_attempt
                .is_some_and(|last| now - last < self.inner.debounce);

            let existing = state
                .in_flight
                .as_ref()
                .map(|(generation, flight)| (*generation, flight.clone()));

            match existing {
                Some((generation, flight)) => {
                    debug!(generation, within_debounce, "joining in-flight token refresh");
                    flight
                }
                None => {
                    if within_debounce {
                        debug!("no refresh in flight, starting a new one inside the debounce window");
                    }
                    state.generation += 1;
                    state.last_attempt = Some(now);
                    let generation = state.generation;

                    let inner = Arc::clone(&self.inner);
                    let flight = async move {
                        let _guard = FlightGuard {
                            inner: Arc::clone(&inner),
                            generation,
                        };
                        match AssertUnwindSafe(inner.perform_refresh())
                            .catch_unwind()
                            .await
                        {
                            Ok(ok) => ok,
                            Err(_) => {
                                warn!(generation, "token refresh panicked");
                                false
                            }
                        }
                    }
                    .boxed()
                    .shared();

                    state.in_flight = Some((generation, flight.clone()));
                    flight
                }
            }
        };

        flight.await
    }
}

/// Clears the in-flight slot when the flight ends, however it ends
struct FlightGuard {
    inner: Arc<RefresherInner>,
    generation: u64,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.inner.finish(self.generation);
    }
}

impl RefresherInner {
    async fn perform_refresh(&self) -> bool {
        let refresh_token = match self.tokens.refresh_token() {
            Ok(Some(token)) => token,
            Ok(None) => {
                debug!("no refresh token stored, cannot refresh");
                return false;
            }
            Err(e) => {
                warn!(error = %e, "failed to read refresh token");
                return false;
            }
        };

        let response = match self.transport.refresh(&refresh_token).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "token refresh request failed");
                return false;
            }
        };

        let token = match response.token.filter(|t| !t.is_empty()) {
            Some(token) if response.success => token,
            _ => {
                warn!(
                    message = response.message.as_deref().unwrap_or(""),
                    "token refresh rejected"
                );
                return false;
            }
        };

        let expires_in = response
            .expires_in
            .filter(|secs| *secs > 0)
            .unwrap_or(self.default_expires_in_secs);
        let next_refresh = response
            .refresh_token
            .filter(|t| !t.is_empty())
            .unwrap_or(refresh_token);

        match self
            .tokens
            .store_auth_tokens(&token, expires_in, Some(&next_refresh))
        {
            Ok(()) => {
                info!(expires_in, "access token refreshed");
                true
            }
            Err(e) => {
                warn!(error = %e, "failed to store refreshed token");
                false
            }
        }
    }

    fn finish(&self, generation: u64) {
        let mut state = self.state.lock();
        if matches!(&state.in_flight, Some((current, _)) if *current == generation) {
            state.in_flight = None;
        }
    }
}
