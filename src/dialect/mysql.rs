use super::SqlDialect;
use crate::ast::CombineKind;
use crate::error::{RelqError, RelqResult};

/// MySQL generator: backtick identifiers, `?` placeholders, LIMIT/OFFSET
/// pagination. INTERSECT and EXCEPT are not available.
pub struct MySqlDialect;

impl SqlDialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }

    fn placeholder(&self, _name: &str, _index: usize) -> String {
        "?".to_string()
    }

    fn limit_prefix(&self, _take: u64) -> Option<String> {
        None
    }

    fn limit_suffix(&self, take: u64) -> Option<String> {
        Some(format!("LIMIT {take}"))
    }

    fn offset_fetch(&self, skip: u64, take: Option<u64>) -> String {
        // MySQL has no offset without a limit; the documented idiom is an
        // effectively-unbounded row count.
        let take = take.unwrap_or(u64::MAX);
        format!("LIMIT {take} OFFSET {skip}")
    }

    fn combine_keyword(&self, kind: CombineKind) -> RelqResult<&'static str> {
        match kind {
            CombineKind::Union | CombineKind::UnionAll => Ok(kind.name()),
            CombineKind::Intersect | CombineKind::Except => Err(
                RelqError::UnsupportedOperation(format!("{} combine on mysql", kind.name())),
            ),
        }
    }

    fn identity_fetch(&self, _column: &str, _placeholder: &str) -> Option<String> {
        Some(";\nSELECT LAST_INSERT_ID()".to_string())
    }

    fn format_field(&self, formatter: &str, expr: &str) -> RelqResult<String> {
        match formatter {
            "length" => Ok(format!("CHAR_LENGTH({expr})")),
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
