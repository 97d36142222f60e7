//! Auth session container
//!
//! Owns the current [`AuthSnapshot`] and turns login/register/refresh/logout
//! outcomes into reducer actions, persisting tokens and the user on the way.

use super::routes::{guard, Route, RouteDecision};
use super::state::{reduce, AuthAction, AuthSnapshot, AuthState};
use crate::api::AuthApi;
use crate::error::ClientError;
use crate::refresher::{TokenRefresher, DEFAULT_EXPIRES_IN_SECS};
use crate::report::{ErrorLevel, ErrorReporter, ErrorSource, ReportOptions};
use crate::storage::keys;
use crate::tokens::{TokenStore, TokenValidation};
use crate::types::{AuthResponse, RegisterRequest, User};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

/// Reason recorded in the blacklist for tokens given up at logout
pub const REASON_LOGOUT: &str = "logout";

pub struct AuthSession {
    api: AuthApi,
    tokens: TokenStore,
    refresher: TokenRefresher,
    reporter: ErrorReporter,
    default_expires_in_secs: i64,
    snapshot: RwLock<AuthSnapshot>,
}

impl AuthSession {
    pub fn new(api: AuthApi, refresher: TokenRefresher, reporter: ErrorReporter) -> Self {
        Self {
            api,
            tokens: refresher.tokens().clone(),
            refresher,
            reporter,
            default_expires_in_secs: DEFAULT_EXPIRES_IN_SECS,
            snapshot: RwLock::new(AuthSnapshot::default()),
        }
    }

    pub fn with_default_expires_in(mut self, secs: i64) -> Self {
        self.default_expires_in_secs = secs;
        self
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        self.snapshot.read().clone()
    }

    pub fn state(&self) -> AuthState {
        self.snapshot.read().auth_state
    }

    pub fn user(&self) -> Option<User> {
        self.snapshot.read().user.clone()
    }

    /// Decide whether `route` may be shown in the current state
    pub fn guard(&self, route: Route) -> RouteDecision {
        guard(self.state(), route)
    }

    fn dispatch(&self, action: AuthAction) -> AuthSnapshot {
        let mut snapshot = self.snapshot.write();
        let next = reduce(&snapshot, action);
        if next.auth_state != snapshot.auth_state {
            debug!(
                from = snapshot.auth_state.as_str(),
                to = next.auth_state.as_str(),
                "auth state transition"
            );
        }
        *snapshot = next.clone();
        next
    }

    fn report_silently(&self, err: &ClientError, level: ErrorLevel) {
        self.reporter.handle_error(
            err,
            ReportOptions::new(level, ErrorSource::Auth).display(false),
        );
    }

    /// Restore the persisted session
    pub fn initialize(&self) -> AuthSnapshot {
        match self.load_persisted() {
            Ok((token, user)) => {
                info!(
                    has_token = token.is_some(),
                    has_user = user.is_some(),
                    "auth session restored"
                );
                self.dispatch(AuthAction::InitializeSuccess { token, user })
            }
            Err(e) => {
                self.report_silently(&e, ErrorLevel::Error);
                self.dispatch(AuthAction::InitializeError {
                    error: e.user_message(),
                })
            }
        }
    }

    fn load_persisted(&self) -> Result<(Option<String>, Option<User>), ClientError> {
        let storage = self.tokens.storage();

        // Browser builds may only have the session in the fallback store
        if storage.has_fallback() {
            if let Err(e) = storage.backfill_from_fallback(keys::SESSION_KEYS) {
                warn!(error = %e, "failed to backfill session from fallback storage");
            }
        }

        let mut token = self.tokens.access_token()?;
        if let Some(current) = token.as_deref() {
            match self.tokens.validate_token(current) {
                TokenValidation::Blacklisted | TokenValidation::SignatureMismatch => {
                    warn!("discarding stored token that failed validation");
                    self.tokens.clear_auth_tokens()?;
                    token = None;
                }
                // Expired tokens are refreshed on first use
                TokenValidation::Expired | TokenValidation::Valid => {}
            }
        }

        let user = storage.get_object::<User>(keys::USER)?;
        Ok((token, user))
    }

    fn persist_auth(&self, response: &AuthResponse, user: &User) -> Result<(), ClientError> {
        if let Some(token) = response.token.as_deref().filter(|t| !t.is_empty()) {
            let expires_in = response
                .expires_in
                .filter(|secs| *secs > 0)
                .unwrap_or(self.default_expires_in_secs);
            self.tokens
                .store_auth_tokens(token, expires_in, response.refresh_token.as_deref())?;
        }

        let storage = self.tokens.storage();
        storage.set_object(keys::USER, user)?;
        storage.set_item(keys::USER_DISPLAY_NAME, &display_name(user))?;
        Ok(())
    }

    /// Apply a successful login/register response
    fn accept(&self, response: AuthResponse) -> Result<(Option<String>, User), ClientError> {
        let user = response
            .user
            .clone()
            .ok_or_else(|| ClientError::MalformedResponse("response is missing user".to_string()))?;
        self.persist_auth(&response, &user)?;
        Ok((response.token.filter(|t| !t.is_empty()), user))
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSnapshot, ClientError> {
        self.dispatch(AuthAction::LoginStart);

        let outcome = match self.api.login(email.trim(), password).await {
            Ok(response) => self.accept(response),
            Err(e) => Err(e),
        };

        match outcome {
            Ok((token, user)) => {
                info!(pending = user.is_pending(), "login succeeded");
                Ok(self.dispatch(AuthAction::LoginSuccess { token, user }))
            }
            Err(e) => {
                self.report_silently(&e, ErrorLevel::Warning);
                self.dispatch(AuthAction::LoginError {
                    error: e.user_message(),
                });
                Err(e)
            }
        }
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthSnapshot, ClientError> {
        self.dispatch(AuthAction::RegisterStart);

        let outcome = match self.api.register(request).await {
            Ok(response) => self.accept(response),
            Err(e) => Err(e),
        };

        match outcome {
            Ok((token, user)) => {
                info!(pending = user.is_pending(), "registration succeeded");
                Ok(self.dispatch(AuthAction::RegisterSuccess { token, user }))
            }
            Err(e) => {
                self.report_silently(&e, ErrorLevel::Warning);
                self.dispatch(AuthAction::RegisterError {
                    error: e.user_message(),
                });
                Err(e)
            }
        }
    }

    /// Sign out. Local state always ends up signed out, even when the server
    /// call fails.
    pub async fn logout(&self) -> AuthSnapshot {
        self.dispatch(AuthAction::LogoutStart);

        let token = self.tokens.access_token().ok().flatten();
        let server = self.api.logout().await;

        if let Some(token) = token.as_deref() {
            if let Err(e) = self.tokens.blacklist_token(token, REASON_LOGOUT) {
                self.report_silently(&e, ErrorLevel::Warning);
            }
        }
        self.clear_local_session(keys::LOGOUT_KEYS);

        match server {
            Ok(()) => {
                info!("logged out");
                self.dispatch(AuthAction::LogoutSuccess)
            }
            Err(e) => {
                self.report_silently(&e, ErrorLevel::Warning);
                self.dispatch(AuthAction::LogoutError {
                    error: e.user_message(),
                })
            }
        }
    }

    /// Make sure the session still has a usable token; a failed refresh ends
    /// the session
    pub async fn refresh(&self) -> AuthSnapshot {
        if self.refresher.ensure_valid_token().await {
            if let Ok(Some(token)) = self.tokens.access_token() {
                return self.dispatch(AuthAction::RefreshSuccess { token });
            }
        }

        warn!("token refresh failed, ending session");
        self.clear_local_session(keys::SESSION_KEYS);
        self.dispatch(AuthAction::RefreshError {
            error: "Session expired".to_string(),
        })
    }

    fn clear_local_session(&self, keys: &[&str]) {
        let storage = self.tokens.storage();
        for key in keys {
            if let Err(e) = storage.remove_item(key) {
                self.report_silently(&e, ErrorLevel::Warning);
            }
        }
    }
}

fn display_name(user: &User) -> String {
    if !user.display_name.trim().is_empty() {
        return user.display_name.clone();
    }
    user.username
        .clone()
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| user.email.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_fallbacks() {
        let mut user = User {
            id: "u".to_string(),
            email: "e@example.com".to_string(),
            display_name: "Dana".to_string(),
            username: Some("dana".to_string()),
            is_pending_approval: None,
        };
        assert_eq!(display_name(&user), "Dana");

        user.display_name = String::new();
        assert_eq!(display_name(&user), "dana");

        user.username = None;
        assert_eq!(display_name(&user), "e@example.com");
    }
}
