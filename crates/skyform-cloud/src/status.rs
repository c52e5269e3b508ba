//! Status classification
//!
//! Every backend service speaks its own status alphabet and marks failures
//! its own way (`ERROR`, `error_extending`, `attach_error`,
//! `PROVISIONING_ERROR`, ...). The alphabets are kept per resource kind; only
//! the four-way classification below is shared.

use serde::{Deserialize, Serialize};

/// Classification of a raw status string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusClass {
    /// Transitional status, keep polling
    Pending,
    /// The awaited status was reached
    Success,
    /// The backend reports the resource failed
    Error,
    /// Not part of the known alphabet, treated as pending until the deadline
    Unknown,
}

impl std::fmt::Display for StatusClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusClass::Pending => write!(f, "pending"),
            StatusClass::Success => write!(f, "success"),
            StatusClass::Error => write!(f, "error"),
            StatusClass::Unknown => write!(f, "unknown"),
        }
    }
}

/// Classification strategy
///
/// Implemented by [`StatusClassifier`] and by any `Fn(&str) -> StatusClass`
/// closure.
pub trait Classify: Send + Sync {
    fn classify(&self, raw: &str) -> StatusClass;
}

impl<F> Classify for F
where
    F: Fn(&str) -> StatusClass + Send + Sync,
{
    fn classify(&self, raw: &str) -> StatusClass {
        self(raw)
    }
}

/// How a resource kind marks failed states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorMarker {
    /// Exactly this status
    Exact(&'static str),
    /// Any status starting with this prefix (case-sensitive)
    Prefix(&'static str),
    /// Any status ending with this suffix (case-sensitive)
    Suffix(&'static str),
    /// Any status containing this word, ignoring ASCII case
    ContainsIgnoreCase(&'static str),
}

impl ErrorMarker {
    pub fn matches(&self, raw: &str) -> bool {
        match self {
            ErrorMarker::Exact(s) => raw == *s,
            ErrorMarker::Prefix(p) => raw.starts_with(p),
            ErrorMarker::Suffix(s) => raw.ends_with(s),
            ErrorMarker::ContainsIgnoreCase(word) => {
                raw.to_ascii_lowercase().contains(&word.to_ascii_lowercase())
            }
        }
    }
}

/// Status alphabet of one resource kind
#[derive(Debug, Clone, Copy)]
pub struct StatusAlphabet {
    /// Every non-error status the backend is documented to emit
    pub known: &'static [&'static str],
    pub error: ErrorMarker,
}

impl StatusAlphabet {
    pub const fn new(known: &'static [&'static str], error: ErrorMarker) -> Self {
        Self { known, error }
    }

    pub fn is_error(&self, raw: &str) -> bool {
        self.error.matches(raw)
    }

    /// Classifier for an operation awaiting `target`
    pub fn targeting<'a>(&'a self, target: &'a str) -> StatusClassifier<'a> {
        StatusClassifier {
            alphabet: self,
            target,
        }
    }
}

/// Classifies statuses of one alphabet against one target status
#[derive(Debug, Clone, Copy)]
pub struct StatusClassifier<'a> {
    alphabet: &'a StatusAlphabet,
    target: &'a str,
}

impl Classify for StatusClassifier<'_> {
    fn classify(&self, raw: &str) -> StatusClass {
        if raw == self.target {
            StatusClass::Success
        } else if self.alphabet.is_error(raw) {
            StatusClass::Error
        } else if self.alphabet.known.contains(&raw) {
            StatusClass::Pending
        } else {
            StatusClass::Unknown
        }
    }
}
