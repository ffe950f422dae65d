//! Error types for relq.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelqError {
    /// A logical field name could not be mapped to a physical column.
    #[error("unknown field '{field}' on entity '{entity}'")]
    Resolution { entity: String, field: String },

    /// A field carries a formatting directive the dialect does not implement.
    #[error("dialect '{dialect}' does not support field formatter '{name}'")]
    UnsupportedFormatter { name: String, dialect: String },

    /// A join has no explicit criteria and no inferable key.
    #[error("no explicit or inferable join key between '{left}' and '{right}'")]
    JoinKey { left: String, right: String },

    /// A subquery used as a criterion value selects no field.
    #[error("subquery on entity '{entity}' selects no field")]
    SubqueryField { entity: String },

    /// The dialect or engine cannot express the requested operation.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// No physical table backs the entity.
    #[error("no physical table resolved for entity '{entity}'")]
    TableResolution { entity: String },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("execution error: {0}")]
    Execution(String),

    /// Execution was cancelled between units.
    #[error("execution cancelled")]
    Cancelled,
}

/// Result type alias for relq operations.
pub type RelqResult<T> = Result<T, RelqError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RelqError::Resolution {
            entity: "users".into(),
            field: "nope".into(),
        };
        assert_eq!(err.to_string(), "unknown field 'nope' on entity 'users'");

        let err = RelqError::JoinKey {
            left: "orders".into(),
            right: "tags".into(),
        };
        assert_eq!(
            err.to_string(),
            "no explicit or inferable join key between 'orders' and 'tags'"
        );
    }
}
