//! Lifecycle operations driven by the orchestrator

use serde::{Deserialize, Serialize};

/// Lifecycle operation performed against a remote resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Create a new resource
    Create,
    /// Refresh the observed state of a resource
    Read,
    /// Update an existing resource in place
    Update,
    /// Delete a resource
    Delete,
    /// Adopt an existing resource into state
    Import,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Create => write!(f, "create"),
            Operation::Read => write!(f, "read"),
            Operation::Update => write!(f, "update"),
            Operation::Delete => write!(f, "delete"),
            Operation::Import => write!(f, "import"),
        }
    }
}
