//! REST API access
//!
//! [`ApiClient`] is the only place requests are built. The endpoint wrappers
//! map CRUD verbs onto paths and unwrap response envelopes.

pub mod auth;
pub mod client;
pub mod instances;
pub mod strategies;

pub use auth::AuthApi;
pub use client::{unwrap_envelope, ApiBody, ApiClient};
pub use instances::InstancesApi;
pub use strategies::StrategiesApi;
