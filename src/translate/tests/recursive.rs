use pretty_assertions::assert_eq;

use crate::ast::{JoinKind, Operator, Query, RecurseDirection};
use crate::dialect::Dialect;
use crate::error::RelqError;
use crate::translate::{SelectShape, Translator};

use super::catalog;

fn sql(dialect: Dialect, query: &Query) -> String {
    let cat = catalog();
    let t = Translator::new(dialect, &cat);
    t.translate_select(query, SelectShape::Rows).unwrap().sql
}

#[test]
fn test_upward_traversal() {
    let q = Query::read("categories")
        .fields(["id", "name"])
        .filter("id", Operator::Eq, 5)
        .recurse("id", "parentId", RecurseDirection::Up);
    assert_eq!(
        sql(Dialect::SqlServer, &q),
        "WITH [cte0] AS (\
         SELECT [t1].[Id], [t1].[ParentId] FROM [Categories] AS [t1] WHERE [t1].[Id] = @id0 \
         UNION ALL \
         SELECT [t2].[Id], [t2].[ParentId] FROM [Categories] AS [t2] \
         INNER JOIN [cte0] AS [t3] ON [t2].[Id] = [t3].[ParentId]) \
         SELECT [t0].[Id], [t0].[Name] FROM [Categories] AS [t0] \
         WHERE [t0].[Id] IN (SELECT [Id] FROM [cte0])"
    );
}

#[test]
fn test_downward_traversal_swaps_join_key() {
    let q = Query::read("categories")
        .fields(["id"])
        .filter("id", Operator::Eq, 5)
        .recurse("id", "parentId", RecurseDirection::Down);
    let sql = sql(Dialect::SqlServer, &q);
    assert!(sql.contains("ON [t2].[ParentId] = [t3].[Id]"), "{sql}");
}

#[test]
fn test_postgres_spells_recursive() {
    let q = Query::read("categories")
        .fields(["id"])
        .recurse("id", "parentId", RecurseDirection::Up);
    let sql = sql(Dialect::Postgres, &q);
    assert!(sql.starts_with("WITH RECURSIVE \"cte0\" AS ("), "{sql}");
}

#[test]
fn test_unfiltered_recursion_seeds_whole_table() {
    let q = Query::read("categories")
        .fields(["id"])
        .recurse("id", "parentId", RecurseDirection::Up);
    let sql = sql(Dialect::SqlServer, &q);
    assert!(
        sql.contains("AS (SELECT [t1].[Id], [t1].[ParentId] FROM [Categories] AS [t1] UNION ALL"),
        "{sql}"
    );
}

#[test]
fn test_recursion_with_joins_is_unsupported() {
    let cat = catalog();
    let t = Translator::new(Dialect::SqlServer, &cat);
    let q = Query::read("categories")
        .recurse("id", "parentId", RecurseDirection::Up)
        .join(Query::read("categories"), JoinKind::Inner, vec![]);
    let err = t.translate_select(&q, SelectShape::Rows).unwrap_err();
    assert!(matches!(err, RelqError::UnsupportedOperation(_)));
}
