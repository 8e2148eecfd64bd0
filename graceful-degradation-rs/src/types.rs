//! # Error Types
//!
//! Errors raised by injected capabilities (agent invokers, phase heuristics)
//! and by framework initialization. The coordinator itself never returns
//! these to its caller; it folds them into recovery actions.

use std::error::Error as StdError;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A type alias for Result with the error type defaulting to our Error
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Categorizes different kinds of errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Provider throttled the request
    RateLimit,
    /// Operation did not finish in time
    Timeout,
    /// Connection reset or refused
    Connection,
    /// Any other failure expected to clear on its own
    Transient,
    /// An agent or fallback agent could not be invoked
    Invocation,
    /// A phase heuristic could not produce a result
    Heuristic,
    /// Invalid configuration
    Configuration,
    /// Logging or other framework setup failed
    Initialization,
    /// Unexpected internal error
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::RateLimit => write!(f, "Rate Limit Error"),
            ErrorKind::Timeout => write!(f, "Timeout Error"),
            ErrorKind::Connection => write!(f, "Connection Error"),
            ErrorKind::Transient => write!(f, "Transient Error"),
            ErrorKind::Invocation => write!(f, "Invocation Error"),
            ErrorKind::Heuristic => write!(f, "Heuristic Error"),
            ErrorKind::Configuration => write!(f, "Configuration Error"),
            ErrorKind::Initialization => write!(f, "Initialization Error"),
            ErrorKind::Internal => write!(f, "Internal Error"),
        }
    }
}

/// Core error type for the degradation framework
///
/// `Clone` is implemented manually and drops the underlying `cause`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Error {
    /// A unique identifier for this error instance
    pub id: Uuid,
    /// The kind of error that occurred
    pub kind: ErrorKind,
    /// Detailed error message
    pub message: String,
    /// The time when the error occurred
    pub timestamp: DateTime<Utc>,
    /// Agent, phase or component the error belongs to
    pub component: Option<String>,
    /// Additional context as key-value pairs
    #[serde(default)]
    pub context: serde_json::Map<String, serde_json::Value>,
    /// Chain of causes (not serialized)
    #[serde(skip)]
    pub cause: Option<Box<dyn StdError + Send + Sync>>,
    /// Flag indicating if this is a transient error that might succeed on retry
    pub transient: bool,
}

impl Clone for Error {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            kind: self.kind,
            message: self.message.clone(),
            timestamp: self.timestamp,
            component: self.component.clone(),
            context: self.context.clone(),
            cause: None,
            transient: self.transient,
        }
    }
}

impl Error {
    /// Creates a new error with the specified kind and message
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        let transient = matches!(
            kind,
            ErrorKind::RateLimit | ErrorKind::Timeout | ErrorKind::Connection | ErrorKind::Transient
        );

        Self {
            id: Uuid::new_v4(),
            kind,
            message: message.into(),
            timestamp: Utc::now(),
            component: None,
            context: serde_json::Map::new(),
            cause: None,
            transient,
        }
    }

    /// Sets the component name
    pub fn component<S: Into<String>>(mut self, component: S) -> Self {
        self.component = Some(component.into());
        self
    }

    /// Adds context information to the error
    pub fn context<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Serialize,
    {
        if let Ok(value) = serde_json::to_value(value) {
            self.context.insert(key.into(), value);
        }
        self
    }

    /// Chains this error with its cause
    pub fn cause<E>(mut self, cause: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Marks this error as transient (can be retried)
    pub fn transient(mut self) -> Self {
        self.transient = true;
        self
    }

    /// Returns true if this error is transient and might succeed on retry
    pub fn is_transient(&self) -> bool {
        self.transient
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;

        if let Some(component) = &self.component {
            write!(f, " [Component: {}]", component)?;
        }

        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause.as_ref().map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::new(ErrorKind::Internal, format!("JSON error: {}", err)).cause(err)
    }
}

impl From<shared_types_rs::ConfigError> for Error {
    fn from(err: shared_types_rs::ConfigError) -> Self {
        Self::new(ErrorKind::Configuration, err.to_string()).cause(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::new(ErrorKind::Heuristic, "missing user_input")
            .component("phase-1")
            .context("phase", 1);

        assert_eq!(err.kind, ErrorKind::Heuristic);
        assert_eq!(err.message, "missing user_input");
        assert_eq!(err.component, Some("phase-1".to_string()));
        assert_eq!(err.context["phase"], serde_json::json!(1));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_transient_kinds() {
        assert!(Error::new(ErrorKind::RateLimit, "429").is_transient());
        assert!(Error::new(ErrorKind::Connection, "ECONNRESET").is_transient());
        assert!(!Error::new(ErrorKind::Invocation, "no such agent").is_transient());
        assert!(Error::new(ErrorKind::Invocation, "flaky").transient().is_transient());
    }

    #[test]
    fn test_error_display_and_clone() {
        let err = Error::new(ErrorKind::Timeout, "agent timed out")
            .component("haiku-fast-agent")
            .cause(std::io::Error::new(std::io::ErrorKind::TimedOut, "io"));

        let display = format!("{}", err);
        assert!(display.contains("Timeout Error"));
        assert!(display.contains("agent timed out"));
        assert!(display.contains("Component: haiku-fast-agent"));

        assert!(err.source().is_some());
        let cloned = err.clone();
        assert!(cloned.source().is_none());
        assert_eq!(cloned.id, err.id);
    }
}
