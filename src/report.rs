//! Centralized error reporting
//!
//! All surfaced failures go through [`ErrorReporter::handle_error`]: they are
//! logged at the matching severity and, when requested, shown to the user
//! through the host's [`AlertSink`].

use crate::error::ClientError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Severity of a reported error
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorLevel {
    Info,
    Warning,
    Error,
    Critical,
}

/// Subsystem an error originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSource {
    Api,
    Auth,
    Ui,
    Storage,
    Network,
    Unknown,
}

impl ErrorSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorSource::Api => "api",
            ErrorSource::Auth => "auth",
            ErrorSource::Ui => "ui",
            ErrorSource::Storage => "storage",
            ErrorSource::Network => "network",
            ErrorSource::Unknown => "unknown",
        }
    }

    /// Best guess at the source of a client error
    pub fn classify(err: &ClientError) -> ErrorSource {
        match err {
            ClientError::Storage(_) | ClientError::Io(_) => ErrorSource::Storage,
            ClientError::Unauthorized(_) | ClientError::Rejected(_) => ErrorSource::Auth,
            ClientError::Http(_) => ErrorSource::Network,
            ClientError::Api { .. } | ClientError::MalformedResponse(_) | ClientError::Json(_) => {
                ErrorSource::Api
            }
            ClientError::Validation(_) => ErrorSource::Ui,
            ClientError::Url(_) | ClientError::Config(_) => ErrorSource::Unknown,
        }
    }

    /// Auth and storage failures stay silent so background work such as
    /// token refresh never interrupts the user
    pub fn displays_by_default(&self) -> bool {
        !matches!(self, ErrorSource::Auth | ErrorSource::Storage)
    }
}

/// How an error should be handled
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub level: ErrorLevel,
    pub source: ErrorSource,
    pub display_to_user: bool,
    pub context: BTreeMap<String, String>,
}

impl ReportOptions {
    pub fn new(level: ErrorLevel, source: ErrorSource) -> Self {
        Self {
            level,
            source,
            display_to_user: source.displays_by_default(),
            context: BTreeMap::new(),
        }
    }

    pub fn display(mut self, display_to_user: bool) -> Self {
        self.display_to_user = display_to_user;
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// What was reported, returned for callers that want to render it themselves
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub level: ErrorLevel,
    pub source: ErrorSource,
    pub title: String,
    pub message: String,
    pub displayed: bool,
    pub context: BTreeMap<String, String>,
}

/// Blocking alert dialog provided by the UI host
pub trait AlertSink: Send + Sync {
    fn show_alert(&self, title: &str, message: &str);
}

/// Sink for hosts without a UI
#[derive(Debug, Default)]
pub struct NoAlerts;

impl AlertSink for NoAlerts {
    fn show_alert(&self, _title: &str, _message: &str) {}
}

#[derive(Clone)]
pub struct ErrorReporter {
    sink: Arc<dyn AlertSink>,
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new(Arc::new(NoAlerts))
    }
}

impl ErrorReporter {
    pub fn new(sink: Arc<dyn AlertSink>) -> Self {
        Self { sink }
    }

    pub fn handle_error(
        &self,
        err: &dyn std::error::Error,
        options: ReportOptions,
    ) -> ErrorReport {
        let message = err.to_string();
        let source = options.source.as_str();
        let context = format!("{:?}", options.context);

        match options.level {
            ErrorLevel::Info => info!(source, %context, "{message}"),
            ErrorLevel::Warning => warn!(source, %context, "{message}"),
            ErrorLevel::Error => error!(source, %context, "{message}"),
            ErrorLevel::Critical => error!(source, %context, critical = true, "{message}"),
        }

        let title = title_for(options.level).to_string();
        if options.display_to_user {
            self.sink.show_alert(&title, &message);
        }

        ErrorReport {
            level: options.level,
            source: options.source,
            title,
            message,
            displayed: options.display_to_user,
            context: options.context,
        }
    }

    /// Report a [`ClientError`] with its classified source and default
    /// display policy
    pub fn report(&self, err: &ClientError, level: ErrorLevel) -> ErrorReport {
        self.handle_error(err, ReportOptions::new(level, ErrorSource::classify(err)))
    }
}

fn title_for(level: ErrorLevel) -> &'static str {
    match level {
        ErrorLevel::Info => "Notice",
        ErrorLevel::Warning => "Warning",
        ErrorLevel::Error => "Error",
        ErrorLevel::Critical => "Something went wrong",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        alerts: Mutex<Vec<(String, String)>>,
    }

    impl AlertSink for RecordingSink {
        fn show_alert(&self, title: &str, message: &str) {
            self.alerts
                .lock()
                .push((title.to_string(), message.to_string()));
        }
    }

    #[test]
    fn test_displayed_errors_reach_sink() {
        let sink = Arc::new(RecordingSink::default());
        let reporter = ErrorReporter::new(sink.clone());

        let err = ClientError::Api {
            status: 500,
            message: "Server exploded".to_string(),
        };
        let report = reporter.handle_error(
            &err,
            ReportOptions::new(ErrorLevel::Error, ErrorSource::Api)
                .display(true)
                .with_context("screen", "notes"),
        );

        assert!(report.displayed);
        assert_eq!(report.context.get("screen").map(String::as_str), Some("notes"));
        let alerts = sink.alerts.lock();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0], ("Error".to_string(), "Server exploded".to_string()));
    }

    #[test]
    fn test_auth_and_storage_are_silent_by_default() {
        let sink = Arc::new(RecordingSink::default());
        let reporter = ErrorReporter::new(sink.clone());

        let report = reporter.report(
            &ClientError::Unauthorized("expired".to_string()),
            ErrorLevel::Warning,
        );
        assert_eq!(report.source, ErrorSource::Auth);
        assert!(!report.displayed);

        let report = reporter.report(
            &ClientError::Storage("disk full".to_string()),
            ErrorLevel::Error,
        );
        assert_eq!(report.source, ErrorSource::Storage);
        assert!(!report.displayed);

        assert!(sink.alerts.lock().is_empty());
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            ErrorSource::classify(&ClientError::Validation("x".to_string())),
            ErrorSource::Ui
        );
        assert_eq!(
            ErrorSource::classify(&ClientError::MalformedResponse("x".to_string())),
            ErrorSource::Api
        );
    }
}
