use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Deterministic business failure raised by an aggregate or value object.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Bad input: blank name, non-positive price, zero quantity.
    #[error("{0}")]
    Validation(String),

    /// The command is well-formed but breaks a rule of the current state.
    #[error("{0}")]
    InvariantViolation(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The target (`"product"`, `"list"`, `"sale"`, `"user"`, ...) does not
    /// exist or was deleted.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Duplicate or competing state, e.g. an email that is already registered.
    #[error("{0}")]
    Conflict(String),

    /// A stock decrement would take a product below zero.
    #[error("insufficient stock for '{product}': available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: u32,
        requested: u64,
    },
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(what: &'static str) -> Self {
        Self::NotFound(what)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_read_as_sentences() {
        assert_eq!(DomainError::not_found("product").to_string(), "product not found");
        assert_eq!(DomainError::validation("name is required").to_string(), "name is required");

        let err = DomainError::InsufficientStock { product: "Lamp".to_string(), available: 1, requested: 3 };
        assert_eq!(err.to_string(), "insufficient stock for 'Lamp': available 1, requested 3");
    }
}
