use serde::{Deserialize, Serialize};

use super::Value;

/// Comparison operator of a criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Pattern match with a caller-supplied pattern (no wildcard wrapping).
    Like,
    NotLike,
    /// Pattern match with a trailing `%` appended to the literal.
    StartsWith,
    /// Pattern match with a leading `%` prepended to the literal.
    EndsWith,
    /// Pattern match with `%` on both sides of the literal.
    Contains,
    NotContains,
    In,
    NotIn,
    IsNull,
    IsNotNull,
}

impl Operator {
    /// SQL keyword emitted for this operator.
    pub fn keyword(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "<>",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Like | Operator::StartsWith | Operator::EndsWith | Operator::Contains => {
                "LIKE"
            }
            Operator::NotLike | Operator::NotContains => "NOT LIKE",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
        }
    }

    /// Whether the operator takes a right-hand value at all.
    pub fn takes_value(&self) -> bool {
        !matches!(self, Operator::IsNull | Operator::IsNotNull)
    }

    /// Whether the operator tests set membership (row-limit rules differ).
    pub fn is_membership(&self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }

    /// Operator-specific value transformation applied before binding.
    /// LIKE-family operators wrap the literal in `%` wildcards.
    pub fn prepare_value(&self, value: Value) -> Value {
        match (self, value) {
            (Operator::StartsWith, Value::String(s)) => Value::String(format!("{s}%")),
            (Operator::EndsWith, Value::String(s)) => Value::String(format!("%{s}")),
            (Operator::Contains | Operator::NotContains, Value::String(s)) => {
                Value::String(format!("%{s}%"))
            }
            (_, v) => v,
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.keyword())
    }
}

/// Logical connector tying a condition to the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Connector {
    #[default]
    And,
    Or,
}

impl Connector {
    pub fn keyword(&self) -> &'static str {
        match self {
            Connector::And => "AND",
            Connector::Or => "OR",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn keyword(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}
