//! Route guarding

use super::state::AuthState;
use serde::{Deserialize, Serialize};

/// Navigable screens of the app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Login,
    Register,
    PendingApproval,
    Home,
    Track,
    History,
    InstanceDetails,
    Strategies,
}

impl Route {
    /// Screens that require an approved, signed-in user
    pub fn is_protected(&self) -> bool {
        !matches!(self, Route::Login | Route::Register | Route::PendingApproval)
    }
}

/// What the router should do for a navigation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "route", rename_all = "snake_case")]
pub enum RouteDecision {
    Allow,
    /// Session state is in transition; show a loading screen
    Wait,
    Redirect(Route),
}

pub fn guard(state: AuthState, route: Route) -> RouteDecision {
    match state {
        AuthState::Initializing | AuthState::LoggingOut => RouteDecision::Wait,
        AuthState::Authenticated => match route {
            Route::Login | Route::Register | Route::PendingApproval => {
                RouteDecision::Redirect(Route::Home)
            }
            _ => RouteDecision::Allow,
        },
        AuthState::PendingApproval => match route {
            Route::PendingApproval => RouteDecision::Allow,
            _ => RouteDecision::Redirect(Route::PendingApproval),
        },
        AuthState::Unauthenticated => {
            if route.is_protected() || route == Route::PendingApproval {
                RouteDecision::Redirect(Route::Login)
            } else {
                RouteDecision::Allow
            }
        }
    }
}
