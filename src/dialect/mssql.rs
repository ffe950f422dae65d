use super::SqlDialect;
use crate::ast::CombineKind;
use crate::error::{RelqError, RelqResult};

/// T-SQL generator. The engine's default dialect: `[bracket]` quoting,
/// `@name` placeholders, TOP/OFFSET-FETCH pagination.
pub struct SqlServerDialect;

impl SqlDialect for SqlServerDialect {
    fn name(&self) -> &'static str {
        "sqlserver"
    }

    fn quote(&self, ident: &str) -> String {
        format!("[{}]", ident.replace(']', "]]"))
    }

    fn placeholder(&self, name: &str, _index: usize) -> String {
        format!("@{name}")
    }

    fn limit_prefix(&self, take: u64) -> Option<String> {
        Some(format!("TOP ({take}) "))
    }

    fn limit_suffix(&self, _take: u64) -> Option<String> {
        None
    }

    fn offset_fetch(&self, skip: u64, take: Option<u64>) -> String {
        let mut sql = format!("OFFSET {skip} ROWS");
        if let Some(take) = take {
            sql.push_str(&format!(" FETCH NEXT {take} ROWS ONLY"));
        }
        sql
    }

    fn combine_keyword(&self, kind: CombineKind) -> RelqResult<&'static str> {
        Ok(kind.name())
    }

    fn identity_fetch(&self, _column: &str, placeholder: &str) -> Option<String> {
        Some(format!(";\nSELECT {placeholder} = SCOPE_IDENTITY()"))
    }

    fn format_field(&self, formatter: &str, expr: &str) -> RelqResult<String> {
        match formatter {
            "length" => Ok(format!("LEN({expr})")),
            "upper" => Ok(format!("UPPER({expr})")),
            "lower" => Ok(format!("LOWER({expr})")),
            "trim" => Ok(format!("LTRIM(RTRIM({expr}))")),
            other => Err(RelqError::UnsupportedFormatter {
                name: other.to_string(),
                dialect: self.name().to_string(),
            }),
        }
    }

    // T-SQL never spells RECURSIVE.
    fn recursive_with_keyword(&self) -> &'static str {
        "WITH"
    }
}
