//! Fluent builder for [`AnalyticsQuery`].
//!
//! The builder is an owned value: each call consumes it and hands back the
//! next state, so a builder is never shared mutably. Clone it to branch two
//! queries from a common prefix. Validation happens at the call that breaks
//! a rule, never deferred to [`AnalyticsQueryBuilder::build`].
//!
//! ```
//! use analytics_core::{AggregationType, AnalyticsQueryBuilder, ColumnOptions, FilterCondition, TableName};
//!
//! let query = AnalyticsQueryBuilder::new()
//!     .from(TableName::SearchQueries)
//!     .select("search_type", ColumnOptions::new())?
//!     .select("id", ColumnOptions::new().aggregate(AggregationType::Count).alias("total"))?
//!     .filter(FilterCondition::eq("is_duplicate", false))
//!     .group_by(["search_type"], None)
//!     .limit(10)?
//!     .build();
//! assert_eq!(query.columns.len(), 2);
//! # Ok::<(), analytics_core::AnalyticsError>(())
//! ```

use crate::config::QueryConfig;

use super::filter::FilterCondition;
use super::query::{
    AggregationType, AnalyticsQuery, Column, CommonTableExpression, Direction, Expression,
    GroupBy, JoinClause, JoinType, OrderBy, TableName,
};
use super::types::{AnalyticsError, AnalyticsResult};

/// Options for [`AnalyticsQueryBuilder::select`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColumnOptions {
    pub alias: Option<String>,
    pub aggregation: Option<AggregationType>,
    pub distinct: bool,
}

impl ColumnOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn aggregate(mut self, aggregation: AggregationType) -> Self {
        self.aggregation = Some(aggregation);
        self
    }

    /// Only meaningful together with an aggregation (`COUNT(DISTINCT x)`).
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }
}

/// Immutable, chainable builder for [`AnalyticsQuery`].
#[derive(Clone, Debug, Default, PartialEq)]
#[must_use]
pub struct AnalyticsQueryBuilder {
    query: AnalyticsQuery,
}

impl AnalyticsQueryBuilder {
    /// Empty builder over the default `events` table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty builder over the configured default table.
    pub fn from_config(config: &QueryConfig) -> Self {
        Self::new().from(config.default_table.clone())
    }

    /// Append a column.
    pub fn select(mut self, name: impl Into<String>, options: ColumnOptions) -> AnalyticsResult<Self> {
        let name = name.into();
        if options.distinct && options.aggregation.is_none() {
            return Err(AnalyticsError::InvalidColumnSpec {
                column: name,
                reason: "distinct requires an aggregation".into(),
            });
        }
        tracing::trace!(column = %name, aggregation = ?options.aggregation, "select");
        self.query.columns.push(Column {
            name,
            alias: options.alias,
            aggregation: options.aggregation,
            distinct: options.distinct.then_some(true),
        });
        Ok(self)
    }

    /// Append a raw expression. The text is opaque at this layer.
    pub fn select_expression(mut self, expression: impl Into<String>, alias: Option<&str>) -> Self {
        self.query.expressions.push(Expression {
            expression: expression.into(),
            alias: alias.map(str::to_string),
        });
        self
    }

    pub fn from(mut self, table: impl Into<TableName>) -> Self {
        self.query.table = table.into();
        self
    }

    /// Append an inner join.
    pub fn join(self, table: impl Into<TableName>, on_clause: impl Into<String>) -> Self {
        self.join_with(table, on_clause, JoinType::Inner)
    }

    /// Append a join of the given kind. Joins apply in call order.
    pub fn join_with(
        mut self,
        table: impl Into<TableName>,
        on_clause: impl Into<String>,
        join_type: JoinType,
    ) -> Self {
        self.query.joins.push(JoinClause {
            table: table.into(),
            join_type,
            on_clause: on_clause.into(),
        });
        self
    }

    /// Append a top-level condition; repeated calls are ANDed.
    pub fn filter(mut self, condition: FilterCondition) -> Self {
        self.query.filter_conditions.push(condition);
        self
    }

    /// See [`FilterCondition::all`].
    pub fn and(conditions: impl IntoIterator<Item = FilterCondition>) -> AnalyticsResult<FilterCondition> {
        FilterCondition::all(conditions)
    }

    /// See [`FilterCondition::any`].
    pub fn or(conditions: impl IntoIterator<Item = FilterCondition>) -> AnalyticsResult<FilterCondition> {
        FilterCondition::any(conditions)
    }

    /// Set the GROUP BY clause, replacing any previous one.
    pub fn group_by<I, S>(mut self, columns: I, having: Option<&str>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.query.group_by = Some(GroupBy {
            columns: columns.into_iter().map(Into::into).collect(),
            having: having.map(str::to_string),
        });
        self
    }

    /// Set the ORDER BY clause, replacing any previous one.
    pub fn order_by<I, S>(mut self, columns: I, direction: Direction) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.query.order_by = Some(OrderBy {
            columns: columns.into_iter().map(Into::into).collect(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: i64) -> AnalyticsResult<Self> {
        self.query.limit = Some(non_negative("limit", limit)?);
        Ok(self)
    }

    pub fn offset(mut self, offset: i64) -> AnalyticsResult<Self> {
        self.query.offset = Some(non_negative("offset", offset)?);
        Ok(self)
    }

    /// Set the single CTE slot, replacing any previous one.
    pub fn with_cte(mut self, alias: impl Into<String>, query: AnalyticsQuery) -> Self {
        self.query.cte_query = Some(CommonTableExpression {
            alias: alias.into(),
            query: Box::new(query),
        });
        self
    }

    /// Snapshot of the assembled query. Each call returns an independent copy.
    pub fn build(&self) -> AnalyticsQuery {
        tracing::trace!(
            table = %self.query.table,
            columns = self.query.columns.len(),
            filters = self.query.filter_conditions.len(),
            "built analytics query"
        );
        self.query.clone()
    }
}

fn non_negative(field: &'static str, value: i64) -> AnalyticsResult<u64> {
    u64::try_from(value).map_err(|_| AnalyticsError::InvalidLimitOffset { field, value })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
