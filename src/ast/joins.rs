use serde::{Deserialize, Serialize};

use super::{Condition, Connector, Operator, Query, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JoinKind {
    #[default]
    Inner,
    Left,
    Right,
    Cross,
}

impl JoinKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Cross => "CROSS JOIN",
        }
    }
}

/// Which side of a join a nested criterion evaluates against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Source,
    Target,
}

/// Right-hand operand of a regular join criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JoinOperand {
    Field(String),
    Literal(Value),
    Subquery(Box<Query>),
}

/// One criterion of a join's ON clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JoinCriterion {
    /// `<left> <op> <right>`. With `right_side` set, `left_field` belongs to
    /// the join target and the operand to the source, and emission swaps.
    Regular {
        left_field: String,
        op: Operator,
        right: JoinOperand,
        right_side: bool,
        connector: Connector,
    },
    /// A nested condition tree evaluated against one side only. Produces a
    /// parenthesized boolean expression, never a further join fragment.
    Query {
        side: Side,
        conditions: Vec<Condition>,
        connector: Connector,
    },
}

impl JoinCriterion {
    pub fn connector(&self) -> Connector {
        match self {
            JoinCriterion::Regular { connector, .. } => *connector,
            JoinCriterion::Query { connector, .. } => *connector,
        }
    }
}

/// A join entry of a query: target query, join kind, optional explicit
/// criteria. With no criteria the key is inferred from primary-key identity
/// or declared entity relations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Join {
    pub target: Box<Query>,
    pub kind: JoinKind,
    pub criteria: Vec<JoinCriterion>,
}
