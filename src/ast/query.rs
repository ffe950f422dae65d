use serde::{Deserialize, Serialize};

use super::{Condition, Join, SortDirection, Value};

/// Whether a query is a structured model or opaque pass-through text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QueryMode {
    #[default]
    Structured,
    RawText,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

/// Set operation joining two query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombineKind {
    Union,
    UnionAll,
    Intersect,
    Except,
}

impl CombineKind {
    pub fn name(&self) -> &'static str {
        match self {
            CombineKind::Union => "UNION",
            CombineKind::UnionAll => "UNION ALL",
            CombineKind::Intersect => "INTERSECT",
            CombineKind::Except => "EXCEPT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combine {
    pub kind: CombineKind,
    pub query: Box<Query>,
}

/// Direction of a recursive parent/child traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecurseDirection {
    /// Walk towards ancestors: anchor.dataField = cte.relationField.
    Up,
    /// Walk towards descendants: anchor.relationField = cte.dataField.
    Down,
}

/// Instructions to expand a query into a self-referential closure over a
/// parent/child relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recurse {
    pub data_field: String,
    pub relation_field: String,
    pub direction: RecurseDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateFunc {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunc {
    pub fn keyword(&self) -> &'static str {
        match self {
            AggregateFunc::Count => "COUNT",
            AggregateFunc::Sum => "SUM",
            AggregateFunc::Avg => "AVG",
            AggregateFunc::Min => "MIN",
            AggregateFunc::Max => "MAX",
        }
    }
}

/// One entry of a query's output field list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldSelection {
    Named(String),
    Aggregate {
        func: AggregateFunc,
        /// None means COUNT(1)-style aggregation over the whole row.
        field: Option<String>,
        alias: Option<String>,
    },
}

/// The abstract query model. Built by the caller, read-only to the
/// translator. In `RawText` mode only `raw_text` and `raw_params` are
/// meaningful; in `Structured` mode they are ignored.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Query {
    /// Logical entity name, resolved to physical tables by the metadata
    /// provider.
    pub entity: String,
    pub mode: QueryMode,
    /// Ordered conditions; each carries the connector to the previous one.
    pub conditions: Vec<Condition>,
    pub sorts: Vec<Sort>,
    pub joins: Vec<Join>,
    pub combines: Vec<Combine>,
    pub recurse: Option<Recurse>,
    /// Row offset for pagination.
    pub skip: Option<u64>,
    /// Row cap for pagination.
    pub take: Option<u64>,
    /// Output field filter; empty selects every entity field.
    pub fields: Vec<FieldSelection>,
    pub distinct: bool,
    pub group_by: Vec<String>,
    pub having: Vec<Condition>,
    /// Partitioning value narrowing sharded table resolution.
    pub shard: Option<Value>,
    pub raw_text: String,
    pub raw_params: Vec<(String, Value)>,
}
