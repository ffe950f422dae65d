//! Join clause resolution.
//!
//! Joins keys are taken from explicit criteria when given; otherwise they
//! are inferred from primary-key identity (same entity on both sides) or
//! declared entity relations.

use crate::ast::{Join, JoinCriterion, JoinKind, JoinOperand, Query, Side};
use crate::error::{RelqError, RelqResult};

use super::{conditions, subquery, TranslationContext, Translator, WithFragment};

pub(crate) struct JoinFragment {
    pub script: String,
    pub with: Vec<WithFragment>,
}

/// Resolve every join of `source`, allocating one alias per target.
pub(crate) fn resolve_all(
    t: &Translator,
    source: &Query,
    source_alias: &str,
    ctx: &mut TranslationContext,
) -> RelqResult<(String, Vec<WithFragment>)> {
    let mut script = String::new();
    let mut with = Vec::new();
    for join in &source.joins {
        let target_alias = ctx.next_alias();
        let frag = resolve_join(t, source, join, source_alias, &target_alias, ctx)?;
        script.push_str(&frag.script);
        with.extend(frag.with);
    }
    Ok((script, with))
}

fn resolve_join(
    t: &Translator,
    source: &Query,
    join: &Join,
    source_alias: &str,
    target_alias: &str,
    ctx: &mut TranslationContext,
) -> RelqResult<JoinFragment> {
    let d = t.dialect();
    let table = t.read_table(&join.target.entity, join.target.shard.as_ref())?;
    let mut script = format!(
        " {} {} AS {}",
        join.kind.keyword(),
        d.quote(&table),
        d.quote(target_alias)
    );

    // Cross joins carry no ON clause.
    if join.kind == JoinKind::Cross {
        return Ok(JoinFragment {
            script,
            with: Vec::new(),
        });
    }

    let mut on = String::new();
    let mut with = Vec::new();
    if join.criteria.is_empty() {
        on = infer_keys(t, source, &join.target, source_alias, target_alias)?;
    } else {
        for (i, criterion) in join.criteria.iter().enumerate() {
            let (frag, frags) = resolve_criterion(
                t,
                source,
                &join.target,
                criterion,
                source_alias,
                target_alias,
                ctx,
            )?;
            if i > 0 {
                on.push(' ');
                on.push_str(criterion.connector().keyword());
                on.push(' ');
            }
            on.push_str(&frag);
            with.extend(frags);
        }
    }

    script.push_str(" ON ");
    script.push_str(&on);
    Ok(JoinFragment { script, with })
}

/// Synthesize the implicit join key: primary-key equality for a self-join,
/// declared relation fields otherwise.
fn infer_keys(
    t: &Translator,
    source: &Query,
    target: &Query,
    source_alias: &str,
    target_alias: &str,
) -> RelqResult<String> {
    let pairs: Vec<(String, String)> = if source.entity == target.entity {
        t.meta()
            .primary_keys(&source.entity)
            .into_iter()
            .map(|k| (k.clone(), k))
            .collect()
    } else {
        t.meta().relation_fields(&source.entity, &target.entity)
    };

    if pairs.is_empty() {
        return Err(RelqError::JoinKey {
            left: source.entity.clone(),
            right: target.entity.clone(),
        });
    }

    let mut parts = Vec::with_capacity(pairs.len());
    for (left, right) in pairs {
        let (l, _) = t.column_expr(&source.entity, &left, Some(source_alias))?;
        let (r, _) = t.column_expr(&target.entity, &right, Some(target_alias))?;
        parts.push(format!("{l} = {r}"));
    }
    Ok(parts.join(" AND "))
}

fn resolve_criterion(
    t: &Translator,
    source: &Query,
    target: &Query,
    criterion: &JoinCriterion,
    source_alias: &str,
    target_alias: &str,
    ctx: &mut TranslationContext,
) -> RelqResult<(String, Vec<WithFragment>)> {
    match criterion {
        JoinCriterion::Regular {
            left_field,
            op,
            right,
            right_side,
            ..
        } => {
            // With right_side set, left_field lives on the target and the
            // operand on the source.
            let (left_entity, left_alias, other_entity, other_alias) = if *right_side {
                (&target.entity, target_alias, &source.entity, source_alias)
            } else {
                (&source.entity, source_alias, &target.entity, target_alias)
            };
            let (left, _) = t.field_expr(left_entity, left_field, left_alias)?;
            match right {
                JoinOperand::Field(field) => {
                    let (other, _) = t.field_expr(other_entity, field, other_alias)?;
                    if *right_side {
                        Ok((format!("{other} {} {left}", op.keyword()), Vec::new()))
                    } else {
                        Ok((format!("{left} {} {other}", op.keyword()), Vec::new()))
                    }
                }
                JoinOperand::Literal(value) => {
                    let placeholder = t.bind(ctx, left_field, op.prepare_value(value.clone()));
                    Ok((format!("{left} {} {placeholder}", op.keyword()), Vec::new()))
                }
                JoinOperand::Subquery(sub) => subquery::correlate(t, &left, *op, sub, ctx),
            }
        }
        JoinCriterion::Query {
            side, conditions, ..
        } => {
            let (entity, alias) = match side {
                Side::Source => (&source.entity, source_alias),
                Side::Target => (&target.entity, target_alias),
            };
            let (inner, with) = conditions::translate_all(t, entity, conditions, alias, ctx)?;
            Ok((format!("({inner})"), with))
        }
    }
}
