//! Error types for the request/assertion core

use serde_json::Value;
use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, HarnessError>;

/// Why a request could not be completed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    ConnectionFailed,
    Timeout,
    DnsFailure,
}

impl fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NetworkErrorKind::ConnectionFailed => "connection failed",
            NetworkErrorKind::Timeout => "timeout",
            NetworkErrorKind::DnsFailure => "DNS failure",
        };
        write!(f, "{label}")
    }
}

/// A declarative check that did not hold against a captured response
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssertionFailure {
    #[error("Expected HTTP status {expected} but received {actual}")]
    StatusMismatch { expected: u16, actual: u16 },

    #[error("Field not found: {path}")]
    FieldNotFound { path: String },

    #[error("Field {path}: expected {expected} but found {actual}")]
    ValueMismatch {
        path: String,
        expected: Value,
        actual: Value,
    },
}

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Request context not configured: call configure before invoke")]
    NotConfigured,

    #[error("Invalid URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("Network error ({kind}): {reason}")]
    Network {
        kind: NetworkErrorKind,
        reason: String,
    },

    #[error("No response captured: send a request before asserting")]
    NoResponse,

    #[error("Assertion failed: {0}")]
    Assertion(#[from] AssertionFailure),

    #[error("Invalid field path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("No step definition matches '{text}'")]
    UnknownStep { text: String },

    #[error("Step '{text}' is ambiguous, it matches: {}", .candidates.join(", "))]
    AmbiguousStep {
        text: String,
        candidates: Vec<String>,
    },

    #[error("Invalid step pattern '{expression}': {reason}")]
    InvalidStepPattern { expression: String, reason: String },

    #[error("Invalid argument in step '{text}': {reason}")]
    InvalidStepArgument { text: String, reason: String },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl HarnessError {
    /// Assertion failures are recoverable within a scenario run; everything
    /// else aborts the remaining steps.
    pub fn is_assertion(&self) -> bool {
        matches!(self, HarnessError::Assertion(_))
    }

    pub fn network_kind(&self) -> Option<NetworkErrorKind> {
        match self {
            HarnessError::Network { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}
