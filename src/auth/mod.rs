//! Authentication state
//!
//! - [`state`]: the pure reducer over [`AuthAction`]
//! - [`routes`]: route guarding by [`AuthState`]
//! - [`session`]: the container that drives the reducer from API outcomes

pub mod routes;
pub mod session;
pub mod state;

pub use routes::{guard, Route, RouteDecision};
pub use session::AuthSession;
pub use state::{derive_state, reduce, AuthAction, AuthSnapshot, AuthState};
