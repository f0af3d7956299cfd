//! Rule violations caught before a request reaches a repository.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("`{field}` {problem}")]
    InvalidField {
        field: &'static str,
        problem: String,
    },
    #[error("unknown {kind} `{key}` (expected one of: {})", .expected.join(", "))]
    UnknownView {
        kind: &'static str,
        key: String,
        expected: Vec<&'static str>,
    },
}

impl DomainError {
    pub fn invalid_field(field: &'static str, problem: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            problem: problem.into(),
        }
    }

    pub fn unknown_view(kind: &'static str, key: &str, expected: &[&'static str]) -> Self {
        Self::UnknownView {
            kind,
            key: key.to_string(),
            expected: expected.to_vec(),
        }
    }

    /// Name of the rejected field or view kind.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::InvalidField { field, .. } => *field,
            Self::UnknownView { kind, .. } => *kind,
        }
    }
}

/// Reject values that are empty once surrounding whitespace is removed.
pub fn require_text(field: &'static str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::invalid_field(field, "must not be blank"));
    }
    Ok(())
}
