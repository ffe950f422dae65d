//! The abstract query model: conditions, joins, combines, recursion,
//! paging and field selection. Built by callers, lowered by [`crate::translate`].

pub mod builders;
mod conditions;
mod joins;
mod operators;
mod query;
mod values;

pub use builders::{contains, criterion, eq, gt, is_not_null, is_null, lt, ne, or};
pub use conditions::{Condition, Criterion, CriterionValue};
pub use joins::{Join, JoinCriterion, JoinKind, JoinOperand, Side};
pub use operators::{Connector, Operator, SortDirection};
pub use query::{
    AggregateFunc, Combine, CombineKind, FieldSelection, Query, QueryMode, Recurse,
    RecurseDirection, Sort,
};
pub use values::{Value, WireType};
