//! End-to-end tests for building, validating, scoping, and rendering queries.

use analytics_core::{
    AggregationType, AnalyticsError, AnalyticsQueryBuilder, ColumnOptions, Direction,
    FilterCondition, FilterValue, QueryConfig, QueryParameter, TableName,
};

mod util;

use util::TestTracing;

fn daily_search_counts() -> AnalyticsQueryBuilder {
    AnalyticsQueryBuilder::new()
        .from(TableName::SearchQueries)
        .select_expression("toStartOfDay(created_at)", Some("time_stamp"))
        .select("id", ColumnOptions::new().aggregate(AggregationType::Count).alias("count"))
        .unwrap()
        .group_by(["time_stamp"], None)
        .order_by(["time_stamp"], Direction::Asc)
}

#[test]
fn and_helper_keeps_anchor_and_children_in_order() {
    let cs = vec![
        FilterCondition::eq("a", 1),
        FilterCondition::gt("b", 2),
        FilterCondition::like("c", "%x%"),
    ];
    let combined = AnalyticsQueryBuilder::and(cs.clone()).unwrap();
    assert_eq!(combined.predicate(), cs[0].predicate());
    assert_eq!(combined.children(), &cs[1..]);
    assert!(matches!(combined, FilterCondition::And(..)));
}

#[test]
fn or_helper_rejects_empty_list() {
    assert_eq!(
        AnalyticsQueryBuilder::or(Vec::new()).unwrap_err(),
        AnalyticsError::EmptyConditionList { combinator: "or" }
    );
}

#[test]
fn grouped_anchor_contributes_only_its_predicate() {
    let or_group = FilterCondition::any([FilterCondition::eq("a", 1), FilterCondition::eq("b", 2)])
        .unwrap();
    let cs = vec![or_group, FilterCondition::eq("c", 3)];
    let combined = AnalyticsQueryBuilder::and(cs.clone()).unwrap();
    assert!(matches!(combined, FilterCondition::And(..)));
    assert_eq!(combined.predicate(), cs[0].predicate());
    assert_eq!(combined.children(), &cs[1..]);

    let query = AnalyticsQueryBuilder::new().filter(combined).build();
    let sql = query.to_parameterized_sql();
    assert!(!sql.sql().contains(" OR "), "unexpected OR in {}", sql.sql());
}

#[test]
fn typical_chart_query_validates_and_renders() {
    let query = daily_search_counts()
        .filter(FilterCondition::gte("created_at", "2024-01-01 00:00:00"))
        .build()
        .scoped_to_dataset("ds-42");

    assert_eq!(query.validate(), Ok(()));

    let (sql, params) = query.to_parameterized_sql().into_parts();
    assert_eq!(
        sql,
        "SELECT COUNT(id) AS count, toStartOfDay(created_at) AS time_stamp FROM ? \
         WHERE created_at >= ? AND dataset_id = ? \
         GROUP BY time_stamp ORDER BY time_stamp ASC LIMIT ?"
    );
    assert_eq!(
        params,
        vec![
            QueryParameter::Identifier("search_queries".into()),
            QueryParameter::Value("2024-01-01 00:00:00".into()),
            QueryParameter::Value("ds-42".into()),
            QueryParameter::Value(FilterValue::from(20_u64)),
        ]
    );
}

#[test]
fn configured_builder_uses_configured_table_and_limits() {
    let config = QueryConfig {
        default_table: TableName::Recommendations,
        default_limit: Some(100),
        max_limit: 500,
    };
    let query = AnalyticsQueryBuilder::from_config(&config)
        .limit(600)
        .unwrap()
        .build();
    assert_eq!(query.table, TableName::Recommendations);
    assert_eq!(
        query.validate_with(&config),
        Err(AnalyticsError::LimitOutOfRange { value: 600, max: 500 })
    );

    let unlimited = AnalyticsQueryBuilder::from_config(&config).build();
    let sql = unlimited.to_parameterized_sql_with(&config);
    assert_eq!(
        sql.parameters().last(),
        Some(&QueryParameter::Value(FilterValue::from(100_u64)))
    );
}

#[test]
fn injection_through_raw_fragments_is_caught() {
    let query = daily_search_counts()
        .select_expression("1); DROP TABLE search_queries; --", None)
        .build();
    assert!(matches!(
        query.validate(),
        Err(AnalyticsError::InvalidExpression { .. })
    ));

    let query = daily_search_counts()
        .select("id; drop", ColumnOptions::new())
        .unwrap()
        .build();
    assert!(matches!(
        query.validate(),
        Err(AnalyticsError::InvalidIdentifier(_))
    ));
}

#[test]
fn shared_prefix_branches_do_not_interfere() {
    let base = daily_search_counts();
    let clicks = base
        .clone()
        .filter(FilterCondition::eq("event_type", "click"))
        .build();
    let views = base
        .filter(FilterCondition::eq("event_type", "view"))
        .limit(7)
        .unwrap()
        .build();
    assert_eq!(clicks.filter_conditions.len(), 1);
    assert_eq!(clicks.limit, None);
    assert_eq!(views.limit, Some(7));
    assert_eq!(clicks.columns, views.columns);
}

#[test]
fn builder_emits_trace_events() {
    let tracing = TestTracing::new();
    let _guard = tracing.install();

    let _ = daily_search_counts().build();

    tracing.assert_contains("built analytics query");
    tracing.assert_contains("table=search_queries");
}
