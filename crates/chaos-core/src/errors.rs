//! Engine error taxonomy and the error-level policy.
//!
//! | Kind | Raised by | Policy |
//! |------|-----------|--------|
//! | Configuration | malformed catalog overlay | error level |
//! | Usage | missing function, argument/return before function, run without arguments | error level |
//! | TypeMismatch | example does not satisfy its descriptor | error level |
//! | Join | failure while joining asynchronous calls | always fatal |
//!
//! Failures of the function under test are not engine errors; they are
//! captured per call in a [`TestResult`](crate::report::TestResult).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::descriptor::TypeDescriptor;
use crate::value::Value;

/// Session-wide policy for configuration and usage violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorLevel {
    /// Level 0: every violation aborts the current operation.
    #[default]
    Fatal,
    /// Level 1: violations are logged and reported, the chain continues.
    Soft,
}

impl ErrorLevel {
    /// Map a raw level. Only `0` and `1` are valid.
    pub fn from_raw(level: u8) -> Option<Self> {
        match level {
            0 => Some(ErrorLevel::Fatal),
            1 => Some(ErrorLevel::Soft),
            _ => None,
        }
    }

    pub fn as_raw(&self) -> u8 {
        match self {
            ErrorLevel::Fatal => 0,
            ErrorLevel::Soft => 1,
        }
    }
}

impl fmt::Display for ErrorLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_raw())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    Usage,
    TypeMismatch,
    Join,
}

impl ErrorKind {
    pub fn short_name(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Usage => "usage",
            ErrorKind::TypeMismatch => "type_mismatch",
            ErrorKind::Join => "join",
        }
    }
}

/// Which declaration a type mismatch was raised for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Declaration {
    Argument,
    Return,
}

#[derive(Debug, Clone)]
pub enum ChaosError {
    /// Malformed catalog overlay.
    Configuration { invalid_categories: Vec<String> },
    /// The engine was used out of order.
    Usage { message: String },
    /// An example does not satisfy its declared or inferred descriptor.
    TypeMismatch {
        declaration: Declaration,
        example: Value,
        descriptor: TypeDescriptor,
    },
    /// Joining asynchronous calls failed; no partial results exist.
    Join { message: String },
}

impl ChaosError {
    pub fn usage(message: impl Into<String>) -> Self {
        ChaosError::Usage {
            message: message.into(),
        }
    }

    pub fn join(message: impl Into<String>) -> Self {
        ChaosError::Join {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ChaosError::Configuration { .. } => ErrorKind::Configuration,
            ChaosError::Usage { .. } => ErrorKind::Usage,
            ChaosError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            ChaosError::Join { .. } => ErrorKind::Join,
        }
    }

    /// The error-shaped value returned in place of a result under the soft
    /// policy.
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            status: "error".to_string(),
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

impl fmt::Display for ChaosError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChaosError::Configuration { invalid_categories } => write!(
                f,
                "Please pass an array of values for each destructive property (invalid: {})",
                invalid_categories.join(", ")
            ),
            ChaosError::Usage { message } => write!(f, "{}", message),
            ChaosError::TypeMismatch {
                declaration,
                example,
                descriptor,
            } => {
                let op = match declaration {
                    Declaration::Argument => "add_argument",
                    Declaration::Return => "set_expected_return",
                };
                write!(
                    f,
                    "{} expects the example {} to have type {}",
                    op, example, descriptor
                )
            }
            ChaosError::Join { message } => {
                write!(f, "failed to join asynchronous calls: {}", message)
            }
        }
    }
}

impl std::error::Error for ChaosError {}

/// Serializable error payload (`{"status": "error", ...}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub status: String,
    pub kind: ErrorKind,
    pub message: String,
}
