//! Client facade
//!
//! Wires storage, token handling, the refresher, the API wrappers, the auth
//! session and crash recovery from a single [`ClientConfig`].

use crate::api::{ApiClient, AuthApi, InstancesApi, StrategiesApi};
use crate::auth::{AuthSession, Route};
use crate::clock::{Clock, SystemClock};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::recovery::RecoveryStore;
use crate::refresher::{HttpRefreshTransport, TokenRefresher};
use crate::report::{AlertSink, ErrorReporter};
use crate::storage::{FileStore, KeyValueStore, StorageAdapter};
use crate::tokens::TokenStore;
use crate::types::Instance;
use crate::wizard::TrackingWizard;
use std::sync::Arc;
use tracing::{debug, warn};

/// File holding the native session store
pub const SESSION_FILE: &str = "session.json";
/// File holding the browser-style mirror store
pub const MIRROR_FILE: &str = "mirror.json";

pub struct BfrbClient {
    config: ClientConfig,
    clock: Arc<dyn Clock>,
    storage: Arc<StorageAdapter>,
    tokens: TokenStore,
    refresher: TokenRefresher,
    api: ApiClient,
    instances: InstancesApi,
    strategies: StrategiesApi,
    session: AuthSession,
    reporter: ErrorReporter,
    recovery: RecoveryStore,
}

impl BfrbClient {
    /// Build a client with file-backed storage under `config.storage.dir`
    pub fn from_config(config: ClientConfig) -> Result<Self, ClientError> {
        let dir = &config.storage.dir;
        let native: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(dir.join(SESSION_FILE)));
        let storage = if config.storage.mirror || config.api.platform.is_browser() {
            let mirror: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(dir.join(MIRROR_FILE)));
            StorageAdapter::for_platform(config.api.platform, native, mirror)
        } else {
            StorageAdapter::new(native)
        };

        Self::with_parts(
            config,
            Arc::new(storage),
            Arc::new(SystemClock),
            ErrorReporter::default(),
        )
    }

    /// Build a client over caller-provided storage, clock and reporter
    pub fn with_parts(
        config: ClientConfig,
        storage: Arc<StorageAdapter>,
        clock: Arc<dyn Clock>,
        reporter: ErrorReporter,
    ) -> Result<Self, ClientError> {
        config.validate()?;
        let base_url = config.resolve_base_url()?;
        debug!(%base_url, platform = ?config.api.platform, "building client");

        let http = reqwest::Client::builder()
            .user_agent(concat!("bfrb-tracker/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let tokens = TokenStore::new(storage.clone(), clock.clone())
            .with_blacklist_retention(config.auth.blacklist_retention());
        let transport = Arc::new(HttpRefreshTransport::new(http.clone(), base_url.clone()));
        let refresher = TokenRefresher::new(tokens.clone(), transport, clock.clone()).with_timing(
            config.auth.expiry_buffer(),
            config.auth.refresh_debounce(),
            config.auth.default_expires_in_secs,
        );

        let api = ApiClient::new(http, &base_url, refresher.clone())?;
        let session = AuthSession::new(AuthApi::new(api.clone()), refresher.clone(), reporter.clone())
            .with_default_expires_in(config.auth.default_expires_in_secs);
        let recovery = RecoveryStore::new(storage.clone(), clock.clone());

        Ok(Self {
            instances: InstancesApi::new(api.clone()),
            strategies: StrategiesApi::new(api.clone()),
            config,
            clock,
            storage,
            tokens,
            refresher,
            api,
            session,
            reporter,
            recovery,
        })
    }

    /// Route displayed errors to the host's alert dialog
    pub fn with_alert_sink(mut self, sink: Arc<dyn AlertSink>) -> Self {
        self.reporter = ErrorReporter::new(sink);
        self.session = AuthSession::new(
            AuthApi::new(self.api.clone()),
            self.refresher.clone(),
            self.reporter.clone(),
        )
        .with_default_expires_in(self.config.auth.default_expires_in_secs);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<StorageAdapter> {
        &self.storage
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn refresher(&self) -> &TokenRefresher {
        &self.refresher
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn instances(&self) -> &InstancesApi {
        &self.instances
    }

    pub fn strategies(&self) -> &StrategiesApi {
        &self.strategies
    }

    pub fn session(&self) -> &AuthSession {
        &self.session
    }

    pub fn reporter(&self) -> &ErrorReporter {
        &self.reporter
    }

    pub fn recovery(&self) -> &RecoveryStore {
        &self.recovery
    }

    /// A fresh wizard on this client's clock
    pub fn wizard(&self) -> TrackingWizard {
        TrackingWizard::new(self.clock.clone())
    }

    /// Submit the wizard and drop the saved recovery snapshot once the
    /// instance is recorded
    pub async fn submit_tracking(
        &self,
        wizard: &mut TrackingWizard,
    ) -> Result<(Instance, Route), ClientError> {
        let submitted = wizard.submit(&self.instances, &self.reporter).await?;
        if let Err(e) = self.recovery.clear() {
            warn!(error = %e, "failed to clear recovery snapshot after submit");
        }
        Ok(submitted)
    }
}
