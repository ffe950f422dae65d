use serde::{Deserialize, Serialize};

use super::{Connector, Operator, Query, Value};

/// Right-hand side of a criterion. A closed set: translation dispatches
/// by exhaustive match, never by runtime type inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CriterionValue {
    /// Operator takes no value (IS NULL / IS NOT NULL).
    None,
    Literal(Value),
    /// Another field of the same entity.
    Field(String),
    Subquery(Box<Query>),
}

/// A single field/operator/value predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub field: String,
    pub op: Operator,
    pub value: CriterionValue,
    /// Connector to the previous condition in the list.
    pub connector: Connector,
}

/// One node of a condition tree: a criterion or a parenthesized group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    Criterion(Criterion),
    Group {
        connector: Connector,
        conditions: Vec<Condition>,
    },
}

impl Condition {
    /// Connector tying this condition to the previous one.
    pub fn connector(&self) -> Connector {
        match self {
            Condition::Criterion(c) => c.connector,
            Condition::Group { connector, .. } => *connector,
        }
    }
}
