//! Lowering the query model into dialect-specific, parameterized SQL.
//!
//! Translation is synchronous, recursive and fail-fast. All mutable state
//! (parameter sequence, alias and CTE counters, the parameter bag) lives in
//! a [`TranslationContext`] created fresh at every top-level entry point, so
//! a [`Translator`] can be reused across calls and repeated translation of
//! the same query is deterministic.

pub(crate) mod combine;
pub(crate) mod conditions;
pub(crate) mod joins;
pub(crate) mod statement;
pub(crate) mod subquery;

#[cfg(test)]
mod tests;

use crate::ast::{Query, QueryMode, Value};
use crate::dialect::{Dialect, SqlDialect};
use crate::error::{RelqError, RelqResult};
use crate::exec::ExecutionStatement;
use crate::meta::{Metadata, PhysicalField};
use crate::params::ParameterSet;

/// Mutable state threaded through one top-level translation.
#[derive(Debug, Default)]
pub struct TranslationContext {
    param_seq: usize,
    alias_seq: usize,
    cte_seq: usize,
    pub params: ParameterSet,
}

impl TranslationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a `<fieldName><sequence>` parameter for `value` and return
    /// its final name.
    pub fn register(&mut self, field: &str, value: Value) -> String {
        let name = format!("{}{}", field, self.param_seq);
        self.param_seq += 1;
        self.params.add(&name, value)
    }

    pub fn next_alias(&mut self) -> String {
        let alias = format!("t{}", self.alias_seq);
        self.alias_seq += 1;
        alias
    }

    pub fn next_cte(&mut self) -> String {
        let name = format!("cte{}", self.cte_seq);
        self.cte_seq += 1;
        name
    }
}

/// A named preamble ("with") fragment. Deduplicated by name and emitted
/// once, at the top level of the final statement.
#[derive(Debug, Clone, PartialEq)]
pub struct WithFragment {
    pub name: String,
    pub body: String,
    pub recursive: bool,
}

/// Per-node accumulation of translated fragments.
#[derive(Debug, Default)]
pub struct TranslationResult {
    pub select_list: String,
    pub from: String,
    pub alias: String,
    pub condition: String,
    pub joins: String,
    pub sort: String,
    pub group: String,
    pub having: String,
    pub with: Vec<WithFragment>,
    pub output_fields: Vec<PhysicalField>,
}

impl TranslationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a with-fragment unless one with the same name is present.
    pub fn push_with(&mut self, frag: WithFragment) {
        if !self.with.iter().any(|w| w.name == frag.name) {
            self.with.push(frag);
        }
    }

    pub fn absorb_with(&mut self, frags: Vec<WithFragment>) {
        for frag in frags {
            self.push_with(frag);
        }
    }
}

/// Output shape of a read statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectShape {
    /// Row projection.
    #[default]
    Rows,
    /// `SELECT 1 WHERE EXISTS (...)`.
    Exists,
    /// `SELECT COUNT(1) FROM (...) AS alias`.
    Count,
}

/// Compiled read statement: SQL text, parameter bag, resolved output fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: ParameterSet,
    pub output_fields: Vec<PhysicalField>,
}

/// The translation engine. Holds the dialect generator and the metadata
/// lookup; carries no per-call state.
pub struct Translator<'a> {
    dialect: Box<dyn SqlDialect>,
    meta: &'a dyn Metadata,
}

impl<'a> Translator<'a> {
    pub fn new(dialect: Dialect, meta: &'a dyn Metadata) -> Self {
        Self {
            dialect: dialect.generator(),
            meta,
        }
    }

    pub(crate) fn dialect(&self) -> &dyn SqlDialect {
        self.dialect.as_ref()
    }

    pub(crate) fn meta(&self) -> &dyn Metadata {
        self.meta
    }

    /// Quoted `alias.column` expression without formatter application.
    /// Used for projections, sorts and join keys.
    pub(crate) fn column_expr(
        &self,
        entity: &str,
        logical: &str,
        alias: Option<&str>,
    ) -> RelqResult<(String, PhysicalField)> {
        let field = self.meta.resolve_field(entity, logical)?;
        let expr = match alias {
            Some(alias) => format!(
                "{}.{}",
                self.dialect.quote(alias),
                self.dialect.quote(&field.column)
            ),
            None => self.dialect.quote(&field.column),
        };
        Ok((expr, field))
    }

    /// Column expression with the field's formatting directive applied.
    /// Used wherever the field appears in a comparison.
    pub(crate) fn field_expr(
        &self,
        entity: &str,
        logical: &str,
        alias: &str,
    ) -> RelqResult<(String, PhysicalField)> {
        let (mut expr, field) = self.column_expr(entity, logical, Some(alias))?;
        if let Some(formatter) = &field.formatter {
            expr = self.dialect.format_field(formatter, &expr)?;
        }
        Ok((expr, field))
    }

    /// Resolve the single physical table a read targets. Reads never fan out
    /// over shards, so an unnarrowed sharded entity is rejected rather than
    /// silently queried on one shard.
    pub(crate) fn read_table(&self, entity: &str, shard: Option<&Value>) -> RelqResult<String> {
        let mut tables = self.meta.resolve_tables(entity, shard)?;
        match tables.len() {
            0 => Err(RelqError::TableResolution {
                entity: entity.to_string(),
            }),
            1 => Ok(tables.remove(0)),
            _ => Err(RelqError::UnsupportedOperation(format!(
                "reading sharded entity '{entity}' requires a shard value to pick one table"
            ))),
        }
    }

    /// Allocate a parameter for `value` and return its placeholder text.
    pub(crate) fn bind(&self, ctx: &mut TranslationContext, field: &str, value: Value) -> String {
        let name = ctx.register(field, value);
        self.dialect.placeholder(&name, ctx.params.len())
    }

    /// Compile a read query. Raw-text queries pass through untouched.
    pub fn translate_select(&self, query: &Query, shape: SelectShape) -> RelqResult<Statement> {
        if query.mode == QueryMode::RawText {
            return Ok(Statement {
                sql: query.raw_text.clone(),
                params: raw_parameters(query),
                output_fields: Vec::new(),
            });
        }
        let mut ctx = TranslationContext::new();
        statement::build_select(self, query, shape, &mut ctx)
    }

    /// Compile an insert into one statement per physical (sharded) table.
    /// `command_id` keys the synthetic identity output parameter.
    pub fn translate_insert(
        &self,
        entity: &str,
        values: &[(String, Value)],
        command_id: &str,
    ) -> RelqResult<Vec<ExecutionStatement>> {
        statement::build_insert(self, entity, values, command_id)
    }

    /// Compile an update affecting the rows matched by `query`.
    pub fn translate_update(
        &self,
        query: &Query,
        values: &[(String, Value)],
    ) -> RelqResult<Vec<ExecutionStatement>> {
        if query.mode == QueryMode::RawText {
            return Ok(vec![ExecutionStatement::text(
                query.raw_text.clone(),
                raw_parameters(query),
            )]);
        }
        statement::build_update(self, query, values)
    }

    /// Compile a delete affecting the rows matched by `query`.
    pub fn translate_delete(&self, query: &Query) -> RelqResult<Vec<ExecutionStatement>> {
        if query.mode == QueryMode::RawText {
            return Ok(vec![ExecutionStatement::text(
                query.raw_text.clone(),
                raw_parameters(query),
            )]);
        }
        statement::build_delete(self, query)
    }
}

fn raw_parameters(query: &Query) -> ParameterSet {
    let mut params = ParameterSet::new();
    for (name, value) in &query.raw_params {
        params.add(name, value.clone());
    }
    params
}
