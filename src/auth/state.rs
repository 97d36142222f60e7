//! Auth state machine
//!
//! [`reduce`] is a pure function from the current [`AuthSnapshot`] and an
//! [`AuthAction`] to the next snapshot. The resulting [`AuthState`] is the
//! only thing route guarding looks at.

use crate::types::User;
use serde::{Deserialize, Serialize};

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    #[default]
    Initializing,
    Authenticated,
    Unauthenticated,
    LoggingOut,
    PendingApproval,
}

impl AuthState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthState::Initializing => "initializing",
            AuthState::Authenticated => "authenticated",
            AuthState::Unauthenticated => "unauthenticated",
            AuthState::LoggingOut => "logging_out",
            AuthState::PendingApproval => "pending_approval",
        }
    }
}

/// Everything the UI needs to render auth status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSnapshot {
    pub auth_state: AuthState,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub is_loading: bool,
}

/// Events that drive the state machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthAction {
    InitializeSuccess {
        #[serde(default)]
        token: Option<String>,
        #[serde(default)]
        user: Option<User>,
    },
    InitializeError {
        error: String,
    },
    LoginStart,
    LoginSuccess {
        #[serde(default)]
        token: Option<String>,
        user: User,
    },
    LoginError {
        error: String,
    },
    RegisterStart,
    RegisterSuccess {
        #[serde(default)]
        token: Option<String>,
        user: User,
    },
    RegisterError {
        error: String,
    },
    LogoutStart,
    LogoutSuccess,
    LogoutError {
        error: String,
    },
    RefreshSuccess {
        token: String,
    },
    RefreshError {
        error: String,
    },
}

/// State implied by a token/user pair
pub fn derive_state(token: Option<&str>, user: Option<&User>) -> AuthState {
    match (token.filter(|t| !t.is_empty()), user) {
        (_, Some(user)) if user.is_pending() => AuthState::PendingApproval,
        (Some(_), Some(_)) => AuthState::Authenticated,
        _ => AuthState::Unauthenticated,
    }
}

fn signed_in(token: Option<String>, user: Option<User>) -> AuthSnapshot {
    AuthSnapshot {
        auth_state: derive_state(token.as_deref(), user.as_ref()),
        user,
        token,
        error: None,
        is_loading: false,
    }
}

fn signed_out(error: Option<String>) -> AuthSnapshot {
    AuthSnapshot {
        auth_state: AuthState::Unauthenticated,
        user: None,
        token: None,
        error,
        is_loading: false,
    }
}

pub fn reduce(current: &AuthSnapshot, action: AuthAction) -> AuthSnapshot {
    match action {
        AuthAction::InitializeSuccess { token, user } => signed_in(token, user),
        AuthAction::InitializeError { error } => signed_out(Some(error)),

        AuthAction::LoginStart | AuthAction::RegisterStart => AuthSnapshot {
            is_loading: true,
            error: None,
            ..current.clone()
        },
        AuthAction::LoginSuccess { token, user } | AuthAction::RegisterSuccess { token, user } => {
            signed_in(token, Some(user))
        }
        AuthAction::LoginError { error } | AuthAction::RegisterError { error } => {
            signed_out(Some(error))
        }

        AuthAction::LogoutStart => AuthSnapshot {
            auth_state: AuthState::LoggingOut,
            is_loading: true,
            error: None,
            ..current.clone()
        },
        // Logout always lands signed out locally, whatever the server said
        AuthAction::LogoutSuccess => signed_out(None),
        AuthAction::LogoutError { error } => signed_out(Some(error)),

        AuthAction::RefreshSuccess { token } => {
            let user = current.user.clone();
            signed_in(Some(token), user)
        }
        AuthAction::RefreshError { error } => signed_out(Some(error)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn user(pending: bool) -> User {
        User {
            id: "u-1".to_string(),
            email: "user@example.com".to_string(),
            display_name: "User".to_string(),
            username: Some("user".to_string()),
            is_pending_approval: Some(pending),
        }
    }

    fn authenticated() -> AuthSnapshot {
        reduce(
            &AuthSnapshot::default(),
            AuthAction::LoginSuccess {
                token: Some("t".to_string()),
                user: user(false),
            },
        )
    }

    #[test]
    fn test_initial_state_is_initializing() {
        assert_eq!(AuthSnapshot::default().auth_state, AuthState::Initializing);
    }

    #[test]
    fn test_login_success_authenticates() {
        let next = authenticated();
        assert_eq!(next.auth_state, AuthState::Authenticated);
        assert_eq!(next.token.as_deref(), Some("t"));
        assert!(!next.is_loading);
    }

    #[test]
    fn test_pending_user_wins_over_token() {
        let next = reduce(
            &AuthSnapshot::default(),
            AuthAction::LoginSuccess {
                token: Some("t".to_string()),
                user: user(true),
            },
        );
        assert_eq!(next.auth_state, AuthState::PendingApproval);

        let next = reduce(
            &AuthSnapshot::default(),
            AuthAction::RegisterSuccess {
                token: None,
                user: user(true),
            },
        );
        assert_eq!(next.auth_state, AuthState::PendingApproval);
    }

    #[test]
    fn test_register_without_token_is_unauthenticated() {
        let next = reduce(
            &AuthSnapshot::default(),
            AuthAction::RegisterSuccess {
                token: None,
                user: user(false),
            },
        );
        assert_eq!(next.auth_state, AuthState::Unauthenticated);
    }

    #[test]
    fn test_start_sets_loading_and_keeps_state() {
        let current = authenticated();
        let next = reduce(&current, AuthAction::LoginStart);
        assert_eq!(next.auth_state, AuthState::Authenticated);
        assert!(next.is_loading);
        assert_eq!(next.error, None);
    }

    #[test]
    fn test_login_error_records_message() {
        let next = reduce(
            &AuthSnapshot::default(),
            AuthAction::LoginError {
                error: "Invalid credentials".to_string(),
            },
        );
        assert_eq!(next.auth_state, AuthState::Unauthenticated);
        assert_eq!(next.error.as_deref(), Some("Invalid credentials"));
    }

    #[test]
    fn test_logout_flow_is_fail_open() {
        let logging_out = reduce(&authenticated(), AuthAction::LogoutStart);
        assert_eq!(logging_out.auth_state, AuthState::LoggingOut);

        let failed = reduce(
            &logging_out,
            AuthAction::LogoutError {
                error: "network down".to_string(),
            },
        );
        assert_eq!(failed.auth_state, AuthState::Unauthenticated);
        assert_eq!(failed.user, None);
        assert_eq!(failed.token, None);

        let ok = reduce(&logging_out, AuthAction::LogoutSuccess);
        assert_eq!(ok.auth_state, AuthState::Unauthenticated);
    }

    #[test]
    fn test_refresh_transitions() {
        let refreshed = reduce(
            &authenticated(),
            AuthAction::RefreshSuccess {
                token: "t2".to_string(),
            },
        );
        assert_eq!(refreshed.auth_state, AuthState::Authenticated);
        assert_eq!(refreshed.token.as_deref(), Some("t2"));

        let failed = reduce(
            &refreshed,
            AuthAction::RefreshError {
                error: "expired".to_string(),
            },
        );
        assert_eq!(failed.auth_state, AuthState::Unauthenticated);
        assert_eq!(failed.user, None);
    }

    #[test]
    fn test_initialize_outcomes() {
        let empty = reduce(
            &AuthSnapshot::default(),
            AuthAction::InitializeSuccess {
                token: None,
                user: None,
            },
        );
        assert_eq!(empty.auth_state, AuthState::Unauthenticated);

        let restored = reduce(
            &AuthSnapshot::default(),
            AuthAction::InitializeSuccess {
                token: Some("t".to_string()),
                user: Some(user(false)),
            },
        );
        assert_eq!(restored.auth_state, AuthState::Authenticated);

        let failed = reduce(
            &AuthSnapshot::default(),
            AuthAction::InitializeError {
                error: "storage".to_string(),
            },
        );
        assert_eq!(failed.auth_state, AuthState::Unauthenticated);
    }

    #[test]
    fn test_action_wire_format() {
        let action: AuthAction = serde_json::from_str(
            r#"{"type":"LOGIN_SUCCESS","token":"t","user":{"id":"u","email":"e"}}"#,
        )
        .unwrap();
        assert!(matches!(action, AuthAction::LoginSuccess { .. }));

        let action: AuthAction = serde_json::from_str(r#"{"type":"LOGOUT_START"}"#).unwrap();
        assert_eq!(action, AuthAction::LogoutStart);

        let json = serde_json::to_value(AuthState::PendingApproval).unwrap();
        assert_eq!(json, "pending_approval");
    }
}
