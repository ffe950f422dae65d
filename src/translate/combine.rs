//! Set-combine resolution (UNION, UNION ALL, INTERSECT, EXCEPT).

use crate::ast::Combine;
use crate::error::RelqResult;

use super::{statement, TranslationContext, Translator, WithFragment};

/// Fold a query's combine list into `<op> SELECT ...` fragments.
///
/// Field lists on the combined side must match arity and order of the
/// anchor's output fields; that is the caller's responsibility. Unsupported
/// combine kinds fail fast in the dialect rather than degrading.
pub(crate) fn resolve_all(
    t: &Translator,
    combines: &[Combine],
    ctx: &mut TranslationContext,
) -> RelqResult<(String, Vec<WithFragment>)> {
    let mut script = String::new();
    let mut with = Vec::new();
    for combine in combines {
        let keyword = t.dialect().combine_keyword(combine.kind)?;
        let (select, frags) = statement::build_subselect(t, &combine.query, None, ctx)?;
        script.push_str(&format!(" {keyword} {select}"));
        with.extend(frags);
    }
    Ok((script, with))
}
