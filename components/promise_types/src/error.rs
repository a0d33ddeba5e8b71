//! Rejection reasons and their classification.
//!
//! A promise rejects with a [`PromiseError`]. Reasons are carried verbatim
//! through chains and adoptions; the engine never unwraps or reinterprets
//! them. The only reason the engine manufactures itself is the
//! [`ErrorKind::TypeMismatch`] produced when a promise is asked to adopt
//! itself.

use std::fmt;

use thiserror::Error;

/// The classification of a rejection reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A promise was resolved with itself (a chaining cycle)
    TypeMismatch,
    /// A foreign thenable violated its subscription contract
    Adoption,
    /// Failure reported by a setup routine or a chained handler
    Execution,
    /// Reason supplied by application code
    Application,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::TypeMismatch => "type mismatch",
            ErrorKind::Adoption => "adoption failure",
            ErrorKind::Execution => "execution failure",
            ErrorKind::Application => "application error",
        };
        f.write_str(name)
    }
}

/// A rejection reason.
///
/// # Examples
///
/// ```
/// use promise_types::{ErrorKind, PromiseError};
///
/// let reason = PromiseError::application("upstream unavailable");
/// assert_eq!(reason.kind, ErrorKind::Application);
/// assert_eq!(reason.to_string(), "application error: upstream unavailable");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct PromiseError {
    /// The classification of this reason
    pub kind: ErrorKind,
    /// Human-readable description
    pub message: String,
}

impl PromiseError {
    /// Creates a reason with an explicit kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// A chaining-cycle reason.
    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeMismatch, message)
    }

    /// A broken-adoption reason, for foreign thenable implementations.
    pub fn adoption(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Adoption, message)
    }

    /// A failed setup-routine or handler reason.
    pub fn execution(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Execution, message)
    }

    /// An application-supplied reason.
    pub fn application(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Application, message)
    }
}
