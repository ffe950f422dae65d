//! Condition-tree lowering.
//!
//! Recursively lowers an ordered condition list into a boolean SQL
//! expression plus the CTE fragments produced by any subquery criteria.

use crate::ast::{Condition, Criterion, CriterionValue, Value};
use crate::error::RelqResult;

use super::{subquery, TranslationContext, Translator, WithFragment};

/// Lower a condition list. The connector of the first emitted condition is
/// ignored; it has no left-hand predicate to attach to.
pub(crate) fn translate_all(
    t: &Translator,
    entity: &str,
    conditions: &[Condition],
    alias: &str,
    ctx: &mut TranslationContext,
) -> RelqResult<(String, Vec<WithFragment>)> {
    let mut expr = String::new();
    let mut with = Vec::new();
    for cond in conditions {
        let (frag, frags) = translate_one(t, entity, cond, alias, ctx)?;
        if frag.is_empty() {
            continue;
        }
        if !expr.is_empty() {
            expr.push(' ');
            expr.push_str(cond.connector().keyword());
            expr.push(' ');
        }
        expr.push_str(&frag);
        with.extend(frags);
    }
    Ok((expr, with))
}

fn translate_one(
    t: &Translator,
    entity: &str,
    condition: &Condition,
    alias: &str,
    ctx: &mut TranslationContext,
) -> RelqResult<(String, Vec<WithFragment>)> {
    match condition {
        Condition::Criterion(c) => translate_criterion(t, entity, c, alias, ctx),
        Condition::Group { conditions, .. } => match conditions.len() {
            // An empty group translates to nothing; a single child inlines
            // without parentheses.
            0 => Ok((String::new(), Vec::new())),
            1 => translate_one(t, entity, &conditions[0], alias, ctx),
            _ => {
                let (inner, with) = translate_all(t, entity, conditions, alias, ctx)?;
                if inner.is_empty() {
                    Ok((inner, with))
                } else {
                    Ok((format!("({inner})"), with))
                }
            }
        },
    }
}

fn translate_criterion(
    t: &Translator,
    entity: &str,
    criterion: &Criterion,
    alias: &str,
    ctx: &mut TranslationContext,
) -> RelqResult<(String, Vec<WithFragment>)> {
    let (expr, _) = t.field_expr(entity, &criterion.field, alias)?;
    let op = criterion.op;

    if !op.takes_value() {
        return Ok((format!("{expr} {}", op.keyword()), Vec::new()));
    }

    match &criterion.value {
        CriterionValue::None => Ok((format!("{expr} {}", op.keyword()), Vec::new())),
        CriterionValue::Subquery(sub) => subquery::correlate(t, &expr, op, sub, ctx),
        CriterionValue::Field(other) => {
            let (rhs, _) = t.field_expr(entity, other, alias)?;
            Ok((format!("{expr} {} {rhs}", op.keyword()), Vec::new()))
        }
        CriterionValue::Literal(value) => {
            // Membership over a literal list expands to one parameter per
            // element.
            if op.is_membership() {
                if let Value::Array(items) = value {
                    let placeholders: Vec<String> = items
                        .iter()
                        .map(|v| t.bind(ctx, &criterion.field, v.clone()))
                        .collect();
                    return Ok((
                        format!("{expr} {} ({})", op.keyword(), placeholders.join(", ")),
                        Vec::new(),
                    ));
                }
            }
            let placeholder = t.bind(ctx, &criterion.field, op.prepare_value(value.clone()));
            Ok((format!("{expr} {} {placeholder}", op.keyword()), Vec::new()))
        }
    }
}
