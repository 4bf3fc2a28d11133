//! Preflight validation of a built [`AnalyticsQuery`].
//!
//! The builder only enforces structural rules (distinct needs an
//! aggregation, LIMIT/OFFSET are non-negative). Before a query reaches the
//! store it is also checked for:
//! - **Identifier hygiene**: table, column, alias, and CTE names.
//! - **Raw fragments**: expressions, ON and HAVING clauses must not carry
//!   statement separators, comments, or write/DDL keywords.
//! - **LIMIT bounds**: `1..=max_limit`.
//!
//! CTE queries are checked recursively.

use crate::config::QueryConfig;

use super::query::AnalyticsQuery;
use super::types::{AnalyticsError, AnalyticsResult};

/// Keywords rejected in raw SQL fragments, matched as whole words.
const DENIED_KEYWORDS: &[&str] = &[
    "alter", "attach", "create", "delete", "detach", "drop", "grant", "insert", "rename",
    "revoke", "truncate", "update",
];

/// Token sequences rejected anywhere in identifiers and raw fragments.
const DENIED_SEQUENCES: &[&str] = &[";", "--", "/*", "*/"];

/// Check a table, column, or alias name.
///
/// Allowed: ASCII letters, digits, `_`, `*`, and `.` between non-empty
/// segments (`table.column`).
pub fn validate_identifier(name: &str) -> AnalyticsResult<()> {
    let invalid = || AnalyticsError::InvalidIdentifier(name.to_string());

    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '*')
    {
        return Err(invalid());
    }
    if name.starts_with('.') || name.ends_with('.') || name.contains("..") {
        return Err(invalid());
    }
    Ok(())
}

/// Check an opaque SQL fragment (expression, ON clause, HAVING clause).
pub fn validate_fragment(fragment: &str) -> AnalyticsResult<()> {
    let invalid = |reason: String| AnalyticsError::InvalidExpression {
        expression: fragment.to_string(),
        reason,
    };

    if fragment.trim().is_empty() {
        return Err(invalid("fragment is empty".into()));
    }
    if let Some(seq) = DENIED_SEQUENCES.iter().find(|seq| fragment.contains(**seq)) {
        return Err(invalid(format!("contains `{seq}`")));
    }
    let lower = fragment.to_ascii_lowercase();
    if let Some(word) = lower
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .find(|word| DENIED_KEYWORDS.contains(word))
    {
        return Err(invalid(format!("contains keyword `{word}`")));
    }
    Ok(())
}

impl AnalyticsQuery {
    /// Validate against the default limits; fails on the first issue.
    pub fn validate(&self) -> AnalyticsResult<()> {
        self.validate_with(&QueryConfig::default())
    }

    /// Validate against `config`; fails on the first issue.
    pub fn validate_with(&self, config: &QueryConfig) -> AnalyticsResult<()> {
        match self.issues(config).into_iter().next() {
            Some(issue) => Err(issue),
            None => Ok(()),
        }
    }

    /// Every problem found, in clause order, CTE issues first.
    pub fn issues(&self, config: &QueryConfig) -> Vec<AnalyticsError> {
        let mut issues = Vec::new();
        collect_issues(self, config, &mut issues);
        if !issues.is_empty() {
            tracing::debug!(count = issues.len(), table = %self.table, "analytics query failed validation");
        }
        issues
    }
}

fn collect_issues(query: &AnalyticsQuery, config: &QueryConfig, issues: &mut Vec<AnalyticsError>) {
    if let Some(cte) = &query.cte_query {
        note(issues, validate_identifier(&cte.alias));
        collect_issues(&cte.query, config, issues);
    }

    note(issues, validate_identifier(query.table.as_str()));

    for column in &query.columns {
        note(issues, validate_identifier(&column.name));
        if let Some(alias) = &column.alias {
            note(issues, validate_identifier(alias));
        }
        if column.distinct == Some(true) && column.aggregation.is_none() {
            issues.push(AnalyticsError::InvalidColumnSpec {
                column: column.name.clone(),
                reason: "distinct requires an aggregation".into(),
            });
        }
    }

    for expr in &query.expressions {
        note(issues, validate_fragment(&expr.expression));
        if let Some(alias) = &expr.alias {
            note(issues, validate_identifier(alias));
        }
    }

    for join in &query.joins {
        note(issues, validate_identifier(join.table.as_str()));
        note(issues, validate_fragment(&join.on_clause));
    }

    for condition in &query.filter_conditions {
        condition.walk(&mut |node| note(issues, validate_identifier(node.column())));
    }

    if let Some(group_by) = &query.group_by {
        for column in &group_by.columns {
            note(issues, validate_identifier(column));
        }
        if let Some(having) = &group_by.having {
            note(issues, validate_fragment(having));
        }
    }

    if let Some(order_by) = &query.order_by {
        for column in &order_by.columns {
            note(issues, validate_identifier(column));
        }
    }

    if let Some(limit) = query.limit
        && (limit == 0 || limit > config.max_limit)
    {
        issues.push(AnalyticsError::LimitOutOfRange {
            value: limit,
            max: config.max_limit,
        });
    }
}

fn note(issues: &mut Vec<AnalyticsError>, result: AnalyticsResult<()>) {
    if let Err(err) = result {
        issues.push(err);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
