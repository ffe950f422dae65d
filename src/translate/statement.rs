//! Final statement assembly for SELECT / INSERT / UPDATE / DELETE.

use crate::ast::{FieldSelection, Query, QueryMode, Value};
use crate::dialect::SqlDialect;
use crate::error::{RelqError, RelqResult};
use crate::exec::{ExecutionStatement, ScriptKind};
use crate::meta::PhysicalField;
use crate::params::rewrite_placeholder;

use super::{
    combine, conditions, joins, subquery, SelectShape, Statement, TranslationContext,
    TranslationResult, Translator, WithFragment,
};

/// Lower one query node into its constituent fragments against a concrete
/// physical table.
pub(crate) fn build_core(
    t: &Translator,
    query: &Query,
    table: &str,
    ctx: &mut TranslationContext,
) -> RelqResult<TranslationResult> {
    let d = t.dialect();
    let mut result = TranslationResult::new();
    result.alias = ctx.next_alias();
    result.from = format!("{} AS {}", d.quote(table), d.quote(&result.alias));

    let (select_list, output_fields) = project(t, query, &result.alias)?;
    result.select_list = select_list;
    result.output_fields = output_fields;

    if let Some(recurse) = &query.recurse {
        // A recursive rewrite owns the whole filter of its level and cannot
        // take further joins there.
        if !query.joins.is_empty() {
            return Err(RelqError::UnsupportedOperation(format!(
                "recursive traversal of '{}' cannot be combined with joins at the same level",
                query.entity
            )));
        }
        let (condition, with) = subquery::resolve_recursive(t, query, recurse, &result.alias, ctx)?;
        result.condition = condition;
        result.absorb_with(with);
    } else {
        let (condition, with) =
            conditions::translate_all(t, &query.entity, &query.conditions, &result.alias, ctx)?;
        result.condition = condition;
        result.absorb_with(with);
        let (join_script, with) = joins::resolve_all(t, query, &result.alias, ctx)?;
        result.joins = join_script;
        result.absorb_with(with);
    }

    let mut group_parts = Vec::with_capacity(query.group_by.len());
    for field in &query.group_by {
        let (expr, _) = t.column_expr(&query.entity, field, Some(&result.alias))?;
        group_parts.push(expr);
    }
    result.group = group_parts.join(", ");

    let (having, with) =
        conditions::translate_all(t, &query.entity, &query.having, &result.alias, ctx)?;
    result.having = having;
    result.absorb_with(with);

    result.sort = build_sort(t, query, Some(&result.alias))?;
    Ok(result)
}

/// Compose a full read statement with shape wrapping and pagination.
pub(crate) fn build_select(
    t: &Translator,
    query: &Query,
    shape: SelectShape,
    ctx: &mut TranslationContext,
) -> RelqResult<Statement> {
    let d = t.dialect();
    let table = t.read_table(&query.entity, query.shard.as_ref())?;
    let mut core = build_core(t, query, &table, ctx)?;

    let (combine_script, combine_with) = combine::resolve_all(t, &query.combines, ctx)?;
    core.absorb_with(combine_with);

    // Past a set operator the operand aliases are out of scope; a combined
    // query is ordered by bare output column names.
    let combined = !combine_script.is_empty();
    let sort_alias = if combined { None } else { Some(core.alias.as_str()) };

    // Exactly one pagination strategy applies. An offset demands a total
    // order, so a deterministic sort is injected when the caller gave none.
    let mut sort = if combined {
        build_sort(t, query, None)?
    } else {
        core.sort.clone()
    };
    let mut prefix = String::new();
    let mut suffix = String::new();
    if let Some(skip) = query.skip {
        if sort.is_empty() {
            sort = fallback_sort(t, query, sort_alias)?;
        }
        suffix = format!(" {}", d.offset_fetch(skip, query.take));
    } else if let Some(take) = query.take {
        if sort.is_empty() {
            if let Some(p) = d.limit_prefix(take) {
                prefix = p;
            } else if let Some(s) = d.limit_suffix(take) {
                suffix = format!(" {s}");
            }
        } else if let Some(s) = d.limit_suffix(take) {
            suffix = format!(" {s}");
        } else {
            suffix = format!(" {}", d.offset_fetch(0, Some(take)));
        }
    }

    // Order only matters for row output or when a limiter depends on it;
    // inside EXISTS/COUNT wrappers an unpaged ORDER BY is dead weight (and
    // illegal on some dialects).
    let keep_sort =
        matches!(shape, SelectShape::Rows) || query.skip.is_some() || query.take.is_some();

    // DISTINCT precedes a prefix limiter (SELECT DISTINCT TOP (n) ...).
    let mut sql = String::from("SELECT ");
    if query.distinct {
        sql.push_str("DISTINCT ");
    }
    if !combined {
        sql.push_str(&prefix);
    }
    sql.push_str(&core.select_list);
    sql.push_str(" FROM ");
    sql.push_str(&core.from);
    sql.push_str(&core.joins);
    if !core.condition.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&core.condition);
    }
    if !core.group.is_empty() {
        sql.push_str(" GROUP BY ");
        sql.push_str(&core.group);
    }
    if !core.having.is_empty() {
        sql.push_str(" HAVING ");
        sql.push_str(&core.having);
    }
    sql.push_str(&combine_script);

    // Limiting and set combination do not commute: a paged combined query is
    // wrapped as a derived table before the limiter applies.
    if combined && (query.skip.is_some() || query.take.is_some()) {
        let outer_list = bare_output_list(t, query, d)?;
        let derived = d.quote(&ctx.next_alias());
        sql = format!("SELECT {prefix}{outer_list} FROM ({sql}) AS {derived}");
    }
    if keep_sort && !sort.is_empty() {
        sql.push_str(" ORDER BY ");
        sql.push_str(&sort);
    }
    sql.push_str(&suffix);

    let sql = match shape {
        SelectShape::Rows => sql,
        SelectShape::Exists => format!("SELECT 1 WHERE EXISTS ({sql})"),
        SelectShape::Count => {
            format!("SELECT COUNT(1) FROM ({sql}) AS {}", d.quote(&ctx.next_alias()))
        }
    };
    let sql = prepend_with(d, &core.with, sql);

    Ok(Statement {
        sql,
        params: std::mem::take(&mut ctx.params),
        output_fields: core.output_fields,
    })
}

/// Build a subselect usable inside a criterion, with operator-family row
/// limiting. A subquery carrying set combines is wrapped as a derived table
/// first, because limiting and set combination do not commute.
pub(crate) fn build_subselect(
    t: &Translator,
    query: &Query,
    limit: Option<u64>,
    ctx: &mut TranslationContext,
) -> RelqResult<(String, Vec<WithFragment>)> {
    if query.mode == QueryMode::RawText {
        let mut sql = query.raw_text.clone();
        for (name, value) in &query.raw_params {
            let final_name = ctx.params.add(name, value.clone());
            if final_name != *name {
                sql = rewrite_placeholder(&sql, name, &final_name, "@");
            }
        }
        return Ok((sql, Vec::new()));
    }

    let d = t.dialect();
    let table = t.read_table(&query.entity, query.shard.as_ref())?;
    let core = build_core(t, query, &table, ctx)?;
    let mut with = core.with;

    let mut inner = String::new();
    inner.push_str(&core.select_list);
    inner.push_str(" FROM ");
    inner.push_str(&core.from);
    inner.push_str(&core.joins);
    if !core.condition.is_empty() {
        inner.push_str(" WHERE ");
        inner.push_str(&core.condition);
    }
    if !core.group.is_empty() {
        inner.push_str(" GROUP BY ");
        inner.push_str(&core.group);
    }
    if !core.having.is_empty() {
        inner.push_str(" HAVING ");
        inner.push_str(&core.having);
    }

    let distinct = if query.distinct { "DISTINCT " } else { "" };
    let sql = if query.combines.is_empty() {
        let (prefix, tail) = cap(d, limit, &core.sort);
        format!("SELECT {distinct}{prefix}{inner}{tail}")
    } else {
        let (combine_script, combine_with) = combine::resolve_all(t, &query.combines, ctx)?;
        with.extend(combine_with);
        let outer_list = bare_output_list(t, query, d)?;
        let derived = d.quote(&ctx.next_alias());
        let outer_sort = build_sort(t, query, None)?;
        let (prefix, tail) = cap(d, limit, &outer_sort);
        format!(
            "SELECT {prefix}{outer_list} FROM (SELECT {distinct}{inner}{combine_script}) AS {derived}{tail}"
        )
    };
    Ok((sql, with))
}

/// Row-cap fragments for a subselect: prefix limiter when no order is
/// needed, suffix limiter (with the ORDER BY it requires) otherwise.
fn cap(d: &dyn SqlDialect, limit: Option<u64>, sort: &str) -> (String, String) {
    let Some(take) = limit else {
        return (String::new(), String::new());
    };
    if sort.is_empty() {
        if let Some(p) = d.limit_prefix(take) {
            (p, String::new())
        } else if let Some(s) = d.limit_suffix(take) {
            (String::new(), format!(" {s}"))
        } else {
            (String::new(), String::new())
        }
    } else {
        match d.limit_suffix(take) {
            Some(s) => (String::new(), format!(" ORDER BY {sort} {s}")),
            None => (
                String::new(),
                format!(" ORDER BY {sort} {}", d.offset_fetch(0, Some(take))),
            ),
        }
    }
}

/// One insert statement per physical (sharded) table. Auto-increment fields
/// are excluded from the value list and fetched back through a synthetic
/// output parameter keyed by the command identifier.
pub(crate) fn build_insert(
    t: &Translator,
    entity: &str,
    values: &[(String, Value)],
    command_id: &str,
) -> RelqResult<Vec<ExecutionStatement>> {
    let d = t.dialect();

    let mut identity: Option<PhysicalField> = None;
    let mut has_shard_key = false;
    for logical in t.meta().entity_fields(entity) {
        let field = t.meta().resolve_field(entity, &logical)?;
        if field.auto_increment {
            identity = Some(field.clone());
        }
        if field.shard_key {
            has_shard_key = true;
        }
    }
    if identity.is_some() && has_shard_key {
        return Err(RelqError::Configuration(format!(
            "entity '{entity}' combines an auto-increment field with a shard key"
        )));
    }

    // The inserted shard-key value, when present, narrows table resolution.
    let mut shard_value = None;
    for (logical, value) in values {
        if t.meta().resolve_field(entity, logical)?.shard_key {
            shard_value = Some(value.clone());
        }
    }

    let tables = t.meta().resolve_tables(entity, shard_value.as_ref())?;
    let mut statements = Vec::with_capacity(tables.len());
    for table in &tables {
        let mut ctx = TranslationContext::new();
        let mut columns = Vec::new();
        let mut placeholders = Vec::new();
        for (logical, value) in values {
            let field = t.meta().resolve_field(entity, logical)?;
            if field.auto_increment {
                continue;
            }
            columns.push(d.quote(&field.column));
            placeholders.push(t.bind(&mut ctx, logical, value.clone()));
        }
        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            d.quote(table),
            columns.join(", "),
            placeholders.join(", ")
        );
        let mut standalone = false;
        if let Some(field) = &identity {
            let name = ctx.params.add_output(&format!("{command_id}Identity"), field.wire_type);
            let placeholder = d.placeholder(&name, ctx.params.len());
            if let Some(fragment) = d.identity_fetch(&d.quote(&field.column), &placeholder) {
                sql.push_str(&fragment);
                standalone = true;
            }
        }
        statements.push(ExecutionStatement {
            sql,
            kind: ScriptKind::Text,
            must_affect: true,
            params: std::mem::take(&mut ctx.params),
            standalone,
        });
    }
    Ok(statements)
}

pub(crate) fn build_update(
    t: &Translator,
    query: &Query,
    values: &[(String, Value)],
) -> RelqResult<Vec<ExecutionStatement>> {
    let d = t.dialect();
    let tables = t.meta().resolve_tables(&query.entity, query.shard.as_ref())?;
    let mut statements = Vec::with_capacity(tables.len());
    for table in &tables {
        let mut ctx = TranslationContext::new();
        // SET binds first so parameter order follows text order.
        let mut sets = Vec::with_capacity(values.len());
        for (logical, value) in values {
            let field = t.meta().resolve_field(&query.entity, logical)?;
            let placeholder = t.bind(&mut ctx, logical, value.clone());
            sets.push(format!("{} = {placeholder}", d.quote(&field.column)));
        }
        let core = build_core(t, query, table, &mut ctx)?;
        let set_clause = sets.join(", ");

        let (sql, standalone) = if core.with.is_empty() {
            let mut sql = format!(
                "UPDATE {} SET {set_clause} FROM {}{}",
                d.quote(&core.alias),
                core.from,
                core.joins
            );
            if !core.condition.is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(&core.condition);
            }
            (sql, false)
        } else {
            // The filter cannot inline next to a preamble; compile it as an
            // independent select and join the mutation back on the key.
            let (target, join_target) = join_target(t, query, table, &core, &mut ctx)?;
            let sql = format!("UPDATE {target} SET {set_clause} {join_target}");
            (prepend_with(d, &core.with, sql), true)
        };

        statements.push(ExecutionStatement {
            sql,
            kind: ScriptKind::Text,
            must_affect: false,
            params: std::mem::take(&mut ctx.params),
            standalone,
        });
    }
    Ok(statements)
}

pub(crate) fn build_delete(t: &Translator, query: &Query) -> RelqResult<Vec<ExecutionStatement>> {
    let d = t.dialect();
    let tables = t.meta().resolve_tables(&query.entity, query.shard.as_ref())?;
    let mut statements = Vec::with_capacity(tables.len());
    for table in &tables {
        let mut ctx = TranslationContext::new();
        let core = build_core(t, query, table, &mut ctx)?;

        let (sql, standalone) = if core.with.is_empty() {
            let mut sql = format!("DELETE {} FROM {}{}", d.quote(&core.alias), core.from, core.joins);
            if !core.condition.is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(&core.condition);
            }
            (sql, false)
        } else {
            let (target, join_target) = join_target(t, query, table, &core, &mut ctx)?;
            let sql = format!("DELETE {target} {join_target}");
            (prepend_with(d, &core.with, sql), true)
        };

        statements.push(ExecutionStatement {
            sql,
            kind: ScriptKind::Text,
            must_affect: false,
            params: std::mem::take(&mut ctx.params),
            standalone,
        });
    }
    Ok(statements)
}

/// `FROM <table> INNER JOIN (<filter select>) AS <alias> ON <pk equality>`
/// tail for mutations whose filter carries a preamble. Returns the quoted
/// mutation-target alias and the tail.
fn join_target(
    t: &Translator,
    query: &Query,
    table: &str,
    core: &TranslationResult,
    ctx: &mut TranslationContext,
) -> RelqResult<(String, String)> {
    let d = t.dialect();
    let keys = t.meta().primary_keys(&query.entity);
    if keys.is_empty() {
        return Err(RelqError::Configuration(format!(
            "entity '{}' needs a primary key to apply a filtered mutation with a preamble",
            query.entity
        )));
    }

    let mut inner_list = Vec::with_capacity(keys.len());
    let mut key_columns = Vec::with_capacity(keys.len());
    for key in &keys {
        let (expr, field) = t.column_expr(&query.entity, key, Some(&core.alias))?;
        inner_list.push(expr);
        key_columns.push(d.quote(&field.column));
    }
    let mut inner = format!("SELECT {} FROM {}{}", inner_list.join(", "), core.from, core.joins);
    if !core.condition.is_empty() {
        inner.push_str(" WHERE ");
        inner.push_str(&core.condition);
    }

    let target = d.quote(&ctx.next_alias());
    let derived = d.quote(&ctx.next_alias());
    let on = key_columns
        .iter()
        .map(|k| format!("{target}.{k} = {derived}.{k}"))
        .collect::<Vec<_>>()
        .join(" AND ");
    let tail = format!(
        "FROM {} AS {target} INNER JOIN ({inner}) AS {derived} ON {on}",
        d.quote(table)
    );
    Ok((target, tail))
}

fn fallback_sort(t: &Translator, query: &Query, alias: Option<&str>) -> RelqResult<String> {
    let logical = query
        .fields
        .iter()
        .find_map(|f| match f {
            FieldSelection::Named(name) => Some(name.clone()),
            _ => None,
        })
        .or_else(|| t.meta().entity_fields(&query.entity).into_iter().next())
        .ok_or_else(|| {
            RelqError::UnsupportedOperation(format!(
                "cannot page entity '{}' without a sortable field",
                query.entity
            ))
        })?;
    let (expr, _) = t.column_expr(&query.entity, &logical, alias)?;
    Ok(format!("{expr} DESC"))
}

fn build_sort(t: &Translator, query: &Query, alias: Option<&str>) -> RelqResult<String> {
    let mut parts = Vec::with_capacity(query.sorts.len());
    for sort in &query.sorts {
        let (expr, _) = t.column_expr(&query.entity, &sort.field, alias)?;
        parts.push(format!("{expr} {}", sort.direction.keyword()));
    }
    Ok(parts.join(", "))
}

fn project(
    t: &Translator,
    query: &Query,
    alias: &str,
) -> RelqResult<(String, Vec<PhysicalField>)> {
    let d = t.dialect();
    let selections: Vec<FieldSelection> = if query.fields.is_empty() {
        t.meta()
            .entity_fields(&query.entity)
            .into_iter()
            .map(FieldSelection::Named)
            .collect()
    } else {
        query.fields.clone()
    };
    if selections.is_empty() {
        return Ok(("*".to_string(), Vec::new()));
    }

    let mut parts = Vec::with_capacity(selections.len());
    let mut outputs = Vec::new();
    for selection in &selections {
        match selection {
            FieldSelection::Named(name) => {
                let (expr, field) = t.column_expr(&query.entity, name, Some(alias))?;
                parts.push(expr);
                outputs.push(field);
            }
            FieldSelection::Aggregate {
                func,
                field,
                alias: agg_alias,
            } => {
                let inner = match field {
                    Some(name) => t.column_expr(&query.entity, name, Some(alias))?.0,
                    None => "1".to_string(),
                };
                let mut expr = format!("{}({inner})", func.keyword());
                if let Some(name) = agg_alias {
                    expr.push_str(&format!(" AS {}", d.quote(name)));
                }
                parts.push(expr);
            }
        }
    }
    Ok((parts.join(", "), outputs))
}

/// Bare output column list for re-projecting a derived table.
fn bare_output_list(t: &Translator, query: &Query, d: &dyn SqlDialect) -> RelqResult<String> {
    let mut parts = Vec::with_capacity(query.fields.len());
    for selection in &query.fields {
        match selection {
            FieldSelection::Named(name) => {
                let field = t.meta().resolve_field(&query.entity, name)?;
                parts.push(d.quote(&field.column));
            }
            FieldSelection::Aggregate {
                alias: Some(name), ..
            } => parts.push(d.quote(name)),
            FieldSelection::Aggregate { alias: None, .. } => return Ok("*".to_string()),
        }
    }
    if parts.is_empty() {
        Ok("*".to_string())
    } else {
        Ok(parts.join(", "))
    }
}

/// Emit the preamble once: with-fragments bubble up from every call site and
/// are deduplicated by name here, at the top level.
fn prepend_with(d: &dyn SqlDialect, with: &[WithFragment], sql: String) -> String {
    if with.is_empty() {
        return sql;
    }
    let mut seen: Vec<&str> = Vec::new();
    let mut decls = Vec::new();
    let mut any_recursive = false;
    for frag in with {
        if seen.contains(&frag.name.as_str()) {
            continue;
        }
        seen.push(&frag.name);
        any_recursive |= frag.recursive;
        decls.push(format!("{} AS ({})", d.quote(&frag.name), frag.body));
    }
    let keyword = if any_recursive {
        d.recursive_with_keyword()
    } else {
        d.with_keyword()
    };
    format!("{keyword} {} {sql}", decls.join(", "))
}
