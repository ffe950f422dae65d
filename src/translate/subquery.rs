//! Correlated subqueries and recursive CTE synthesis.

use crate::ast::{Operator, Query, Recurse, RecurseDirection};
use crate::error::{RelqError, RelqResult};

use super::{conditions, statement, TranslationContext, Translator, WithFragment};

/// Lower a criterion whose value is a subquery into
/// `<field> <op> (<subselect>)`.
///
/// Row limiting is decided by operator family: membership operators honor
/// the subquery's own row cap (unlimited otherwise); every other operator is
/// a scalar comparison and forces exactly one row.
pub(crate) fn correlate(
    t: &Translator,
    field_expr: &str,
    op: Operator,
    sub: &Query,
    ctx: &mut TranslationContext,
) -> RelqResult<(String, Vec<WithFragment>)> {
    if sub.fields.is_empty() {
        return Err(RelqError::SubqueryField {
            entity: sub.entity.clone(),
        });
    }
    let limit = if op.is_membership() { sub.take } else { Some(1) };
    let (select, with) = statement::build_subselect(t, sub, limit, ctx)?;
    Ok((format!("{field_expr} {} ({select})", op.keyword()), with))
}

/// Rewrite a recursive query into a CTE.
///
/// The seed branch filters the anchor table by the query's original
/// conditions; the recursive branch self-joins the CTE back to the anchor on
/// data-field/relation-field equality, oriented by direction. The caller's
/// filter becomes a membership test against the CTE, and the returned
/// fragments replace the query's own condition tree at that level.
pub(crate) fn resolve_recursive(
    t: &Translator,
    query: &Query,
    recurse: &Recurse,
    outer_alias: &str,
    ctx: &mut TranslationContext,
) -> RelqResult<(String, Vec<WithFragment>)> {
    let d = t.dialect();
    let table = d.quote(&t.read_table(&query.entity, query.shard.as_ref())?);

    let data = t.meta().resolve_field(&query.entity, &recurse.data_field)?;
    let relation = t
        .meta()
        .resolve_field(&query.entity, &recurse.relation_field)?;
    let data_col = d.quote(&data.column);
    let relation_col = d.quote(&relation.column);

    // Each recursive resolution gets a fresh CTE name; one statement may
    // carry several recursive filters.
    let cte = ctx.next_cte();

    let seed_alias = ctx.next_alias();
    let (seed_cond, mut with) =
        conditions::translate_all(t, &query.entity, &query.conditions, &seed_alias, ctx)?;
    let sa = d.quote(&seed_alias);
    let mut seed = format!("SELECT {sa}.{data_col}, {sa}.{relation_col} FROM {table} AS {sa}");
    if !seed_cond.is_empty() {
        seed.push_str(" WHERE ");
        seed.push_str(&seed_cond);
    }

    let anchor = d.quote(&ctx.next_alias());
    let walker = d.quote(&ctx.next_alias());
    let on = match recurse.direction {
        RecurseDirection::Up => format!("{anchor}.{data_col} = {walker}.{relation_col}"),
        RecurseDirection::Down => format!("{anchor}.{relation_col} = {walker}.{data_col}"),
    };
    let step = format!(
        "SELECT {anchor}.{data_col}, {anchor}.{relation_col} FROM {table} AS {anchor} \
         INNER JOIN {} AS {walker} ON {on}",
        d.quote(&cte)
    );

    with.push(WithFragment {
        name: cte.clone(),
        body: format!("{seed} UNION ALL {step}"),
        recursive: true,
    });

    let membership = format!(
        "{}.{data_col} IN (SELECT {data_col} FROM {})",
        d.quote(outer_alias),
        d.quote(&cte)
    );
    Ok((membership, with))
}
