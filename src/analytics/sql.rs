//! Parameterized SQL rendering of an [`AnalyticsQuery`].
//!
//! Produces SQL text with `?` placeholders and the ordered parameter list a
//! driver binds against them. Table names travel as identifier parameters;
//! filter literals, LIMIT, and OFFSET travel as value parameters. Column
//! names, expressions, ON and HAVING clauses are written inline, so run
//! [`AnalyticsQuery::validate`] before rendering untrusted input.

use crate::config::QueryConfig;

use super::filter::{FilterCondition, FilterOperator, FilterValue, Predicate};
use super::query::AnalyticsQuery;

/// A value bound to one `?` placeholder.
#[derive(Clone, Debug, PartialEq)]
pub enum QueryParameter {
    /// Literal value, escaped by the driver.
    Value(FilterValue),
    /// Table or alias name, bound as an identifier.
    Identifier(String),
}

/// SQL text plus its parameters in placeholder order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SqlQuery {
    sql: String,
    parameters: Vec<QueryParameter>,
}

impl SqlQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn parameters(&self) -> &[QueryParameter] {
        &self.parameters
    }

    pub fn into_parts(self) -> (String, Vec<QueryParameter>) {
        (self.sql, self.parameters)
    }

    fn push_str(&mut self, s: &str) -> &mut Self {
        self.sql.push_str(s);
        self
    }

    fn push_identifier(&mut self, identifier: impl Into<String>) -> &mut Self {
        self.sql.push('?');
        self.parameters
            .push(QueryParameter::Identifier(identifier.into()));
        self
    }

    fn push_value(&mut self, value: FilterValue) -> &mut Self {
        self.sql.push('?');
        self.parameters.push(QueryParameter::Value(value));
        self
    }

    fn append(&mut self, other: SqlQuery) -> &mut Self {
        self.sql.push_str(&other.sql);
        self.parameters.extend(other.parameters);
        self
    }
}

impl AnalyticsQuery {
    /// Render with the default LIMIT policy.
    pub fn to_parameterized_sql(&self) -> SqlQuery {
        self.to_parameterized_sql_with(&QueryConfig::default())
    }

    /// Render, applying `config.default_limit` when the query sets none.
    pub fn to_parameterized_sql_with(&self, config: &QueryConfig) -> SqlQuery {
        let mut out = SqlQuery::new();
        render_query(self, config, &mut out);
        out
    }
}

fn render_query(query: &AnalyticsQuery, config: &QueryConfig, out: &mut SqlQuery) {
    if let Some(cte) = &query.cte_query {
        out.push_str("WITH ").push_identifier(cte.alias.as_str()).push_str(" AS (");
        render_query(&cte.query, config, out);
        out.push_str(") ");
    }

    out.push_str("SELECT ");
    let mut select_list: Vec<String> = Vec::with_capacity(query.columns.len() + query.expressions.len());
    for column in &query.columns {
        let mut item = match column.aggregation {
            Some(agg) if column.distinct == Some(true) => format!("{agg}(DISTINCT {})", column.name),
            Some(agg) => format!("{agg}({})", column.name),
            None => column.name.clone(),
        };
        if let Some(alias) = &column.alias {
            item.push_str(" AS ");
            item.push_str(alias);
        }
        select_list.push(item);
    }
    for expr in &query.expressions {
        let mut item = expr.expression.clone();
        if let Some(alias) = &expr.alias {
            item.push_str(" AS ");
            item.push_str(alias);
        }
        select_list.push(item);
    }
    if select_list.is_empty() {
        out.push_str("*");
    } else {
        out.push_str(&select_list.join(", "));
    }

    out.push_str(" FROM ").push_identifier(query.table.as_str());

    for join in &query.joins {
        out.push_str(" ")
            .push_str(join.join_type.as_sql())
            .push_str(" ")
            .push_identifier(join.table.as_str())
            .push_str(" ON ")
            .push_str(&join.on_clause);
    }

    if !query.filter_conditions.is_empty() {
        out.push_str(" WHERE ");
        for (i, condition) in query.filter_conditions.iter().enumerate() {
            if i > 0 {
                out.push_str(" AND ");
            }
            out.append(render_condition(condition));
        }
    }

    if let Some(group_by) = &query.group_by {
        if !group_by.columns.is_empty() {
            out.push_str(" GROUP BY ").push_str(&group_by.columns.join(", "));
        }
        // HAVING without GROUP BY filters the single aggregate row.
        if let Some(having) = &group_by.having {
            out.push_str(" HAVING ").push_str(having);
        }
    }

    if let Some(order_by) = &query.order_by
        && !order_by.columns.is_empty()
    {
        out.push_str(" ORDER BY ")
            .push_str(&order_by.columns.join(", "))
            .push_str(" ")
            .push_str(&order_by.direction.to_string());
    }

    if let Some(limit) = query.limit.or(config.default_limit) {
        out.push_str(" LIMIT ").push_value(limit.into());
    }
    if let Some(offset) = query.offset {
        out.push_str(" OFFSET ").push_value(offset.into());
    }
}

/// Render one condition node. Groups are parenthesized so they compose
/// safely under the top-level AND.
fn render_condition(condition: &FilterCondition) -> SqlQuery {
    let (predicate, children, joiner) = match condition {
        FilterCondition::Leaf(p) => return render_predicate(p),
        FilterCondition::And(p, kids) => (p, kids, " AND "),
        FilterCondition::Or(p, kids) => (p, kids, " OR "),
    };
    if children.is_empty() {
        return render_predicate(predicate);
    }

    let mut out = SqlQuery::new();
    out.push_str("(").append(render_predicate(predicate));
    for child in children {
        out.push_str(joiner).append(render_condition(child));
    }
    out.push_str(")");
    out
}

fn render_predicate(predicate: &Predicate) -> SqlQuery {
    let mut out = SqlQuery::new();
    let column = predicate.column.as_str();
    match predicate.operator {
        op if op.is_unary() => {
            out.push_str(column).push_str(" ").push_str(op.as_sql());
        }
        op if op.is_set() => {
            let values = match &predicate.value {
                FilterValue::Array(values) => values.clone(),
                single => vec![single.clone()],
            };
            if values.is_empty() {
                // `x IN ()` is a syntax error; an empty set matches nothing.
                out.push_str(if op == FilterOperator::In { "1 = 0" } else { "1 = 1" });
                return out;
            }
            out.push_str(column).push_str(" ").push_str(op.as_sql()).push_str(" (");
            for (i, value) in values.into_iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_value(value);
            }
            out.push_str(")");
        }
        op => {
            out.push_str(column)
                .push_str(" ")
                .push_str(op.as_sql())
                .push_str(" ")
                .push_value(predicate.value.clone());
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
