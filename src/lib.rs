//! BFRB Tracker - client core for body-focused repetitive behavior tracking
//!
//! The crate holds everything below the screen layer of the tracking app:
//! session storage, token handling and single-flight refresh, the auth state
//! machine, the REST client, and the multi-step tracking wizard.
//!
//! ## Modules
//!
//! - **Session**: [`storage`], [`tokens`], [`refresher`], [`auth`]
//! - **Data**: [`api`], [`types`], [`catalog`], [`history`]
//! - **Tracking**: [`wizard`], [`recovery`]
//!
//! [`BfrbClient`] wires them together from a [`ClientConfig`].

pub mod api;
pub mod auth;
pub mod catalog;
pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod history;
pub mod logging;
pub mod recovery;
pub mod refresher;
pub mod report;
pub mod storage;
pub mod tokens;
pub mod types;
pub mod wizard;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use api::{ApiClient, AuthApi, InstancesApi, StrategiesApi};
pub use auth::{AuthSession, AuthSnapshot, AuthState, Route, RouteDecision};
pub use client::BfrbClient;
pub use config::{ClientConfig, Environment, Platform};
pub use error::ClientError;
pub use refresher::TokenRefresher;
pub use report::{ErrorReporter, ReportOptions};
pub use storage::StorageAdapter;
pub use tokens::TokenStore;
pub use wizard::{FormDraft, TrackingWizard, WizardStep};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
