use pretty_assertions::assert_eq;

use crate::ast::builders::gt;
use crate::ast::{AggregateFunc, CombineKind, Operator, Query};
use crate::dialect::Dialect;
use crate::error::RelqError;
use crate::translate::{SelectShape, Translator};

use super::catalog;

fn sql(query: &Query) -> String {
    let cat = catalog();
    let t = Translator::new(Dialect::SqlServer, &cat);
    t.translate_select(query, SelectShape::Rows).unwrap().sql
}

#[test]
fn test_empty_field_list_selects_every_entity_field() {
    let q = Query::read("users");
    assert_eq!(
        sql(&q),
        "SELECT [t0].[Id], [t0].[Name], [t0].[Email], [t0].[Active], [t0].[Age] \
         FROM [Users] AS [t0]"
    );
}

#[test]
fn test_distinct() {
    let q = Query::read("orders").fields(["status"]).distinct();
    assert_eq!(sql(&q), "SELECT DISTINCT [t0].[Status] FROM [Orders] AS [t0]");
}

#[test]
fn test_aggregate_with_grouping_and_having() {
    let q = Query::read("orders")
        .field("status")
        .aggregate(AggregateFunc::Count, None, "n")
        .group_by("status")
        .having(gt("total", 100));
    assert_eq!(
        sql(&q),
        "SELECT [t0].[Status], COUNT(1) AS [n] FROM [Orders] AS [t0] \
         GROUP BY [t0].[Status] HAVING [t0].[Total] > @total0"
    );
}

#[test]
fn test_sort_order() {
    let q = Query::read("users").fields(["id"]).sort("name").sort_desc("age");
    assert_eq!(
        sql(&q),
        "SELECT [t0].[Id] FROM [Users] AS [t0] ORDER BY [t0].[Name] ASC, [t0].[Age] DESC"
    );
}

#[test]
fn test_offset_injects_deterministic_sort() {
    let q = Query::read("users").fields(["name"]).page(10, 5);
    assert_eq!(
        sql(&q),
        "SELECT [t0].[Name] FROM [Users] AS [t0] \
         ORDER BY [t0].[Name] DESC OFFSET 10 ROWS FETCH NEXT 5 ROWS ONLY"
    );
}

#[test]
fn test_offset_keeps_explicit_sort() {
    let q = Query::read("users").fields(["id"]).sort("name").page(10, 5);
    assert_eq!(
        sql(&q),
        "SELECT [t0].[Id] FROM [Users] AS [t0] \
         ORDER BY [t0].[Name] ASC OFFSET 10 ROWS FETCH NEXT 5 ROWS ONLY"
    );
}

#[test]
fn test_unsorted_cap_uses_prefix_limiter() {
    let q = Query::read("users").fields(["id"]).take(3);
    assert_eq!(sql(&q), "SELECT TOP (3) [t0].[Id] FROM [Users] AS [t0]");
}

#[test]
fn test_sorted_cap_uses_suffix_limiter() {
    let q = Query::read("users").fields(["id"]).sort("name").take(3);
    assert_eq!(
        sql(&q),
        "SELECT [t0].[Id] FROM [Users] AS [t0] \
         ORDER BY [t0].[Name] ASC OFFSET 0 ROWS FETCH NEXT 3 ROWS ONLY"
    );
}

#[test]
fn test_exists_shape() {
    let cat = catalog();
    let t = Translator::new(Dialect::SqlServer, &cat);
    let q = Query::read("users")
        .fields(["id"])
        .filter("active", Operator::Eq, true);
    let stmt = t.translate_select(&q, SelectShape::Exists).unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT 1 WHERE EXISTS \
         (SELECT [t0].[Id] FROM [Users] AS [t0] WHERE [t0].[Active] = @active0)"
    );
}

#[test]
fn test_count_shape_wraps_as_derived_table() {
    let cat = catalog();
    let t = Translator::new(Dialect::SqlServer, &cat);
    let q = Query::read("users").fields(["id"]);
    let stmt = t.translate_select(&q, SelectShape::Count).unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT COUNT(1) FROM (SELECT [t0].[Id] FROM [Users] AS [t0]) AS [t1]"
    );
}

#[test]
fn test_union_combine() {
    let q = Query::read("users").fields(["id"]).combine(
        CombineKind::Union,
        Query::read("users")
            .fields(["id"])
            .filter("active", Operator::Eq, true),
    );
    assert_eq!(
        sql(&q),
        "SELECT [t0].[Id] FROM [Users] AS [t0] UNION \
         SELECT [t1].[Id] FROM [Users] AS [t1] WHERE [t1].[Active] = @active0"
    );
}

#[test]
fn test_capped_combine_wraps_as_derived_table() {
    // The cap must apply to the combined result, not to the first operand.
    let q = Query::read("users")
        .fields(["id"])
        .take(3)
        .combine(CombineKind::Union, Query::read("users").fields(["id"]));
    assert_eq!(
        sql(&q),
        "SELECT TOP (3) [Id] FROM \
         (SELECT [t0].[Id] FROM [Users] AS [t0] UNION \
         SELECT [t1].[Id] FROM [Users] AS [t1]) AS [t2]"
    );
}

#[test]
fn test_paged_combine_orders_by_bare_output_columns() {
    let q = Query::read("users")
        .fields(["id"])
        .page(10, 5)
        .combine(CombineKind::Union, Query::read("users").fields(["id"]));
    assert_eq!(
        sql(&q),
        "SELECT [Id] FROM \
         (SELECT [t0].[Id] FROM [Users] AS [t0] UNION \
         SELECT [t1].[Id] FROM [Users] AS [t1]) AS [t2] \
         ORDER BY [Id] DESC OFFSET 10 ROWS FETCH NEXT 5 ROWS ONLY"
    );
}

#[test]
fn test_sorted_combine_orders_after_the_set_operator() {
    let q = Query::read("users")
        .fields(["id"])
        .sort("id")
        .combine(CombineKind::Union, Query::read("users").fields(["id"]));
    assert_eq!(
        sql(&q),
        "SELECT [t0].[Id] FROM [Users] AS [t0] UNION \
         SELECT [t1].[Id] FROM [Users] AS [t1] ORDER BY [Id] ASC"
    );
}

#[test]
fn test_unnarrowed_sharded_read_is_rejected() {
    let cat = catalog();
    let t = Translator::new(Dialect::SqlServer, &cat);
    let q = Query::read("logs").fields(["message"]);
    let err = t.translate_select(&q, SelectShape::Rows).unwrap_err();
    assert!(matches!(err, RelqError::UnsupportedOperation(_)));
}

#[test]
fn test_shard_value_narrows_a_read_to_one_table() {
    let q = Query::read("logs").fields(["message"]).shard(3);
    assert_eq!(sql(&q), "SELECT [t0].[Message] FROM [Logs1] AS [t0]");
}

#[test]
fn test_mysql_rejects_intersect() {
    let cat = catalog();
    let t = Translator::new(Dialect::MySql, &cat);
    let q = Query::read("users")
        .fields(["id"])
        .combine(CombineKind::Intersect, Query::read("users").fields(["id"]));
    let err = t.translate_select(&q, SelectShape::Rows).unwrap_err();
    assert!(matches!(err, RelqError::UnsupportedOperation(_)));
}

#[test]
fn test_postgres_positional_placeholders_and_limit() {
    let cat = catalog();
    let t = Translator::new(Dialect::Postgres, &cat);
    let q = Query::read("users")
        .fields(["id"])
        .filter("name", Operator::Eq, "bob")
        .take(3);
    let stmt = t.translate_select(&q, SelectShape::Rows).unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT \"t0\".\"Id\" FROM \"Users\" AS \"t0\" WHERE \"t0\".\"Name\" = $1 LIMIT 3"
    );
}

#[test]
fn test_raw_text_passes_through() {
    let cat = catalog();
    let t = Translator::new(Dialect::SqlServer, &cat);
    let q = Query::raw("SELECT 1 WHERE [X] = @p").bind_raw("p", 5);
    let stmt = t.translate_select(&q, SelectShape::Rows).unwrap();
    assert_eq!(stmt.sql, "SELECT 1 WHERE [X] = @p");
    assert_eq!(stmt.params.len(), 1);
    assert!(stmt.params.contains("p"));
}
