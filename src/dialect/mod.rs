//! Dialect-specific SQL text generation.
//!
//! Identifier quoting and parameter placeholders are the only two places a
//! name ever touches SQL text; both live behind [`SqlDialect`] so swapping
//! dialects is mechanical and injection safety is testable in isolation.

mod mssql;
mod mysql;
mod postgres;

pub use mssql::SqlServerDialect;
pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;

use serde::{Deserialize, Serialize};

use crate::ast::CombineKind;
use crate::error::RelqResult;

/// Trait for dialect-specific SQL generation.
pub trait SqlDialect {
    fn name(&self) -> &'static str;

    /// Quote an identifier (table or column name).
    fn quote(&self, ident: &str) -> String;

    /// Placeholder for a parameter. Named dialects use the name, positional
    /// dialects the 1-based index.
    fn placeholder(&self, name: &str, index: usize) -> String;

    /// "TOP (n) "-style limiter placed right after SELECT, when the dialect
    /// has one.
    fn limit_prefix(&self, take: u64) -> Option<String>;

    /// "LIMIT n"-style limiter appended after ORDER BY, when the dialect
    /// has one.
    fn limit_suffix(&self, take: u64) -> Option<String>;

    /// Offset/fetch pagination clause. Requires an ORDER BY to be present.
    fn offset_fetch(&self, skip: u64, take: Option<u64>) -> String;

    /// Keyword for a set combine, or an error when the dialect lacks it.
    fn combine_keyword(&self, kind: CombineKind) -> RelqResult<&'static str>;

    /// Fragment fetching the identity generated by the preceding insert into
    /// `placeholder`. None when the dialect cannot fetch identities.
    fn identity_fetch(&self, column: &str, placeholder: &str) -> Option<String>;

    /// Apply a named field formatter to an expression.
    fn format_field(&self, formatter: &str, expr: &str) -> RelqResult<String>;

    fn with_keyword(&self) -> &'static str {
        "WITH"
    }

    /// Keyword opening a preamble that contains a recursive CTE.
    fn recursive_with_keyword(&self) -> &'static str {
        "WITH RECURSIVE"
    }
}

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Dialect {
    #[default]
    SqlServer,
    Postgres,
    MySql,
}

impl Dialect {
    pub fn generator(&self) -> Box<dyn SqlDialect> {
        match self {
            Dialect::SqlServer => Box::new(SqlServerDialect),
            Dialect::Postgres => Box::new(PostgresDialect),
            Dialect::MySql => Box::new(MySqlDialect),
        }
    }
}
