use super::SqlDialect;
use crate::ast::CombineKind;
use crate::error::{RelqError, RelqResult};

/// PostgreSQL generator: double-quote identifiers, positional `$n`
/// placeholders, LIMIT/OFFSET pagination, RETURNING for identities.
pub struct PostgresDialect;

impl SqlDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    fn placeholder(&self, _name: &str, index: usize) -> String {
        format!("${index}")
    }

    fn limit_prefix(&self, _take: u64) -> Option<String> {
        None
    }

    fn limit_suffix(&self, take: u64) -> Option<String> {
        Some(format!("LIMIT {take}"))
    }

    fn offset_fetch(&self, skip: u64, take: Option<u64>) -> String {
        match take {
            Some(take) => format!("LIMIT {take} OFFSET {skip}"),
            None => format!("OFFSET {skip}"),
        }
    }

    fn combine_keyword(&self, kind: CombineKind) -> RelqResult<&'static str> {
        Ok(kind.name())
    }

    fn identity_fetch(&self, column: &str, _placeholder: &str) -> Option<String> {
        Some(format!(" RETURNING {column}"))
    }

    fn format_field(&self, formatter: &str, expr: &str) -> RelqResult<String> {
        match formatter {
            "length" => Ok(format!("LENGTH({expr})")),
            "upper" => Ok(format!("UPPER({expr})")),
            "lower" => Ok(format!("LOWER({expr})")),
            "trim" => Ok(format!("TRIM({expr})")),
            other => Err(RelqError::UnsupportedFormatter {
                name: other.to_string(),
                dialect: self.name().to_string(),
            }),
        }
    }
}
