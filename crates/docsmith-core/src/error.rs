//! Error types for docsmith-core
//!
//! Typed failures use thiserror; load-time problems are collected in a
//! [`LoadReport`] so a session can start with defaults instead of failing.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for docsmith operations
#[derive(Error, Debug)]
pub enum CoreError {
    // ===================
    // Input Errors
    // ===================
    #[error("{message}")]
    Validation { field: &'static str, message: String },

    #[error("Invalid usage amount: {amount}")]
    InvalidUsageAmount { amount: f64 },

    #[error("Unknown plan: {name}")]
    UnknownPlan { name: String },

    #[error("Unknown project status: {name}")]
    UnknownStatus { name: String },

    // ===================
    // Persistence Errors
    // ===================
    #[error("Snapshot storage failed during {operation}")]
    Storage {
        operation: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Failed to encode snapshot {key}")]
    SnapshotEncode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Malformed snapshot {key}: {message}")]
    SnapshotDecode {
        key: String,
        message: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Snapshot store lock poisoned")]
    LockPoisoned,

    #[error("Failed to access {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ===================
    // Session Errors
    // ===================
    #[error("No active session")]
    NoActiveSession,

    #[error("Session already closed")]
    SessionClosed,

    // ===================
    // Generation Errors
    // ===================
    #[error("Documentation generation was cancelled")]
    GenerationCancelled,

    #[error("Documentation generation failed: {message}")]
    GenerationFailed { message: String },
}

impl CoreError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        CoreError::Validation {
            field,
            message: message.into(),
        }
    }

    /// True for errors the user can fix by changing their input
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            CoreError::Validation { .. }
                | CoreError::InvalidUsageAmount { .. }
                | CoreError::UnknownPlan { .. }
                | CoreError::UnknownStatus { .. }
        )
    }
}

/// Severity level for errors during load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Non-critical, can continue with degraded functionality
    Warning,
    /// Domain could not be read at all
    Error,
}

/// Individual error entry in load report
#[derive(Debug, Clone)]
pub struct LoadError {
    pub source: String,
    pub message: String,
    pub severity: ErrorSeverity,
    /// Actionable suggestion for user (optional)
    pub suggestion: Option<String>,
}

impl LoadError {
    pub fn warning(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
            severity: ErrorSeverity::Warning,
            suggestion: None,
        }
    }

    /// Create user-friendly error from CoreError with context-aware suggestions
    pub fn from_core_error(source: impl Into<String>, error: &CoreError) -> Self {
        let source = source.into();
        let (message, severity, suggestion) = match error {
            CoreError::SnapshotDecode { key, message, .. } => (
                format!("Snapshot {} is unreadable: {}", key, message),
                ErrorSeverity::Warning,
                Some("Defaults were restored; the next change overwrites it".to_string()),
            ),
            CoreError::Storage { operation, .. } => (
                format!("Snapshot storage failed during {}", operation),
                ErrorSeverity::Error,
                Some("Check that the data directory is writable".to_string()),
            ),
            CoreError::Io { path, .. } => (
                format!("Cannot access {}", path.display()),
                ErrorSeverity::Error,
                Some(format!("Check permissions: ls -ld {}", path.display())),
            ),
            _ => (error.to_string(), ErrorSeverity::Error, None),
        };

        Self {
            source,
            message,
            severity,
            suggestion,
        }
    }
}

/// Report of problems encountered while loading a user's snapshots
///
/// Missing snapshots are expected on first run and are not reported;
/// malformed or unreadable ones are.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub errors: Vec<LoadError>,
    pub projects_loaded: bool,
    pub usage_loaded: bool,
    pub plan_loaded: bool,
    /// Domains that fell back to seed/default values
    pub seeded: Vec<String>,
}

impl LoadReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, error: LoadError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, source: impl Into<String>, message: impl Into<String>) {
        self.errors.push(LoadError::warning(source, message));
    }

    /// Returns true if there are any errors (including warnings)
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns only warnings
    pub fn warnings(&self) -> impl Iterator<Item = &LoadError> {
        self.errors
            .iter()
            .filter(|e| e.severity == ErrorSeverity::Warning)
    }

    /// True when every domain came from a stored snapshot
    pub fn fully_restored(&self) -> bool {
        self.projects_loaded && self.usage_loaded && self.plan_loaded
    }
}

/// Whether in-memory state has reached the snapshot store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceHealth {
    /// Last write of every domain succeeded
    Healthy,
    /// Some domains hold changes the store rejected
    Unsaved { domains: Vec<String>, reason: String },
}

impl PersistenceHealth {
    pub fn is_healthy(&self) -> bool {
        matches!(self, PersistenceHealth::Healthy)
    }
}
