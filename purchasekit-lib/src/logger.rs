//! Analytics and event logging.
//!
//! The coordinator reports every operation outcome through an injected
//! [`EventLogger`]. [`TracingLogger`] forwards events to `tracing`;
//! [`MemoryLogger`] keeps them in memory for tests and previews.

use std::sync::Mutex;

use crate::models::Params;

/// Event names emitted by the coordinator.
pub mod events {
    pub const LOGIN_STARTED: &str = "login_started";
    pub const LOGIN_SUCCEEDED: &str = "login_succeeded";
    pub const LOGIN_FAILED: &str = "login_failed";
    pub const LOGOUT_SUCCEEDED: &str = "logout_succeeded";
    pub const LOGOUT_FAILED: &str = "logout_failed";
    pub const PURCHASE_STARTED: &str = "purchase_started";
    pub const PURCHASE_SUCCEEDED: &str = "purchase_succeeded";
    pub const PURCHASE_FAILED: &str = "purchase_failed";
    pub const RESTORE_STARTED: &str = "restore_started";
    pub const RESTORE_SUCCEEDED: &str = "restore_succeeded";
    pub const RESTORE_FAILED: &str = "restore_failed";
    pub const GET_PRODUCTS_STARTED: &str = "get_products_started";
    pub const GET_PRODUCTS_SUCCEEDED: &str = "get_products_succeeded";
    pub const GET_PRODUCTS_FAILED: &str = "get_products_failed";
    pub const UPDATE_ATTRIBUTES_FAILED: &str = "update_attributes_failed";
    pub const ENTITLEMENTS_REFRESHED: &str = "entitlements_refreshed";
}

/// Severity of a logged event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    /// Diagnostic breadcrumb.
    Info,
    /// Product analytics worth forwarding to an analytics sink.
    Analytic,
    /// Unexpected but handled.
    Warning,
    /// A user-facing operation failed.
    Severe,
}

/// A named event with optional flat parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct LogEvent {
    /// Event name, see [`events`].
    pub name: String,
    /// Parameters, if any.
    pub params: Option<Params>,
    /// Severity level.
    pub severity: Severity,
}

impl LogEvent {
    /// Create an event without parameters.
    pub fn new(name: impl Into<String>, severity: Severity) -> Self {
        Self {
            name: name.into(),
            params: None,
            severity,
        }
    }

    /// Attach parameters.
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = Some(params);
        self
    }
}

/// Sink for coordinator events and user properties.
pub trait EventLogger: Send + Sync {
    /// Record a single event.
    fn log_event(&self, event: LogEvent);

    /// Merge properties into the current user's profile.
    fn merge_user_properties(&self, properties: Params, priority: bool);
}

/// Forwards events to `tracing`, mapping severity to level.
#[derive(Clone, Debug, Default)]
pub struct TracingLogger;

impl EventLogger for TracingLogger {
    fn log_event(&self, event: LogEvent) {
        let params = event
            .params
            .as_ref()
            .and_then(|p| serde_json::to_string(p).ok())
            .unwrap_or_default();
        match event.severity {
            Severity::Info => tracing::debug!(event = %event.name, %params),
            Severity::Analytic => tracing::info!(event = %event.name, %params),
            Severity::Warning => tracing::warn!(event = %event.name, %params),
            Severity::Severe => tracing::error!(event = %event.name, %params),
        }
    }

    fn merge_user_properties(&self, properties: Params, priority: bool) {
        tracing::debug!(count = properties.len(), priority, "merging user properties");
    }
}

/// Keeps every event and merged property in memory.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    events: Mutex<Vec<LogEvent>>,
    user_properties: Mutex<Params>,
}

impl MemoryLogger {
    /// Create an empty logger.
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded events, oldest first.
    pub fn events(&self) -> Vec<LogEvent> {
        self.events
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    /// Names of all recorded events, oldest first.
    pub fn event_names(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.name).collect()
    }

    /// Most recent event with the given name.
    pub fn last_event(&self, name: &str) -> Option<LogEvent> {
        self.events().into_iter().rev().find(|e| e.name == name)
    }

    /// Current merged user properties.
    pub fn user_properties(&self) -> Params {
        self.user_properties
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

impl EventLogger for MemoryLogger {
    fn log_event(&self, event: LogEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }

    fn merge_user_properties(&self, properties: Params, _priority: bool) {
        if let Ok(mut current) = self.user_properties.lock() {
            current.extend(properties);
        }
    }
}
