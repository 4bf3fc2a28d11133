//! The analytics query IR.
//!
//! [`AnalyticsQuery`] is the structured description sent to the remote
//! columnar store. Its JSON shape is the wire contract with that service, so
//! field names are snake_case and empty optional parts are omitted.

use serde::{Deserialize, Serialize};

use super::filter::FilterCondition;

// ---------------------------------------------------------------------------
// Columns and expressions
// ---------------------------------------------------------------------------

/// Aggregate function applied to a selected column.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AggregationType {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl std::fmt::Display for AggregationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Count => write!(f, "COUNT"),
            Self::Sum => write!(f, "SUM"),
            Self::Avg => write!(f, "AVG"),
            Self::Min => write!(f, "MIN"),
            Self::Max => write!(f, "MAX"),
        }
    }
}

/// A selected column. Order in [`AnalyticsQuery::columns`] defines output
/// column order; names may repeat under different aliases.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<AggregationType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distinct: Option<bool>,
}

/// A raw computed expression, passed through untouched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expression {
    pub expression: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

// ---------------------------------------------------------------------------
// Tables and joins
// ---------------------------------------------------------------------------

/// Source table known to the analytics store, or a custom name.
///
/// Tables compare and hash by name, so `Custom("events")` equals
/// [`TableName::Events`]. Decoding always yields the known variant; use
/// `From<&str>` to get the same normalization when constructing.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableName {
    SearchQueries,
    RagQueries,
    Recommendations,
    #[default]
    Events,
    ClusterTopics,
    SearchClusterMemberships,
    Topics,
    Experiments,
    ExperimentUserAssignments,
    #[serde(untagged)]
    Custom(String),
}

impl TableName {
    pub fn as_str(&self) -> &str {
        match self {
            Self::SearchQueries => "search_queries",
            Self::RagQueries => "rag_queries",
            Self::Recommendations => "recommendations",
            Self::Events => "events",
            Self::ClusterTopics => "cluster_topics",
            Self::SearchClusterMemberships => "search_cluster_memberships",
            Self::Topics => "topics",
            Self::Experiments => "experiments",
            Self::ExperimentUserAssignments => "experiment_user_assignments",
            Self::Custom(name) => name,
        }
    }
}

impl PartialEq for TableName {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for TableName {}

impl std::hash::Hash for TableName {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for TableName {
    fn from(name: &str) -> Self {
        match name {
            "search_queries" => Self::SearchQueries,
            "rag_queries" => Self::RagQueries,
            "recommendations" => Self::Recommendations,
            "events" => Self::Events,
            "cluster_topics" => Self::ClusterTopics,
            "search_cluster_memberships" => Self::SearchClusterMemberships,
            "topics" => Self::Topics,
            "experiments" => Self::Experiments,
            "experiment_user_assignments" => Self::ExperimentUserAssignments,
            other => Self::Custom(other.to_string()),
        }
    }
}

/// Join kind. The engine applies joins left to right.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinType {
    #[default]
    Inner,
    Left,
    Right,
    Full,
}

impl JoinType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
            Self::Full => "FULL JOIN",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinClause {
    pub table: TableName,
    #[serde(default)]
    pub join_type: JoinType,
    pub on_clause: String,
}

// ---------------------------------------------------------------------------
// Grouping, ordering, CTE
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupBy {
    pub columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub having: Option<String>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    #[default]
    Desc,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Asc => write!(f, "ASC"),
            Self::Desc => write!(f, "DESC"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub columns: Vec<String>,
    #[serde(default)]
    pub direction: Direction,
}

/// The single named sub-query a query may carry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommonTableExpression {
    pub alias: String,
    pub query: Box<AnalyticsQuery>,
}

// ---------------------------------------------------------------------------
// AnalyticsQuery
// ---------------------------------------------------------------------------

/// The assembled query IR.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsQuery {
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expressions: Vec<Expression>,
    #[serde(default)]
    pub table: TableName,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub joins: Vec<JoinClause>,
    /// Top-level conditions, ANDed together.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filter_conditions: Vec<FilterCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<GroupBy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<OrderBy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cte_query: Option<CommonTableExpression>,
}

impl AnalyticsQuery {
    /// Copy of this query restricted to one dataset.
    ///
    /// Appends a top-level `dataset_id = <id>` condition. The CTE is left
    /// alone; callers scoping a CTE scope its query before attaching it.
    pub fn scoped_to_dataset(&self, dataset_id: &str) -> Self {
        let mut scoped = self.clone();
        scoped
            .filter_conditions
            .push(FilterCondition::eq("dataset_id", dataset_id));
        scoped
    }

    /// Depth of the CTE chain (0 when there is no CTE).
    pub fn cte_depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self;
        while let Some(cte) = &current.cte_query {
            depth += 1;
            current = &cte.query;
        }
        depth
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
