//! Recursive filter conditions.
//!
//! On the wire a condition is `{column, operator, value, and_filter?,
//! or_filter?}`. In memory a node is either a plain predicate or a predicate
//! anchoring exactly one AND group or one OR group, so a node carrying both
//! groups cannot be constructed. Decoding a wire node that populates both
//! fails with [`AnalyticsError::AmbiguousFilter`].

use serde::{Deserialize, Serialize};

use super::types::{AnalyticsError, AnalyticsResult};

// ---------------------------------------------------------------------------
// Operators and values
// ---------------------------------------------------------------------------

/// Comparison operator accepted by the store.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOperator {
    #[serde(rename = "=")]
    Equals,
    #[serde(rename = "!=")]
    NotEquals,
    #[serde(rename = "<>")]
    LessGreater,
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = ">=")]
    GreaterThanOrEquals,
    #[serde(rename = "<=")]
    LessThanOrEquals,
    #[serde(rename = "like")]
    Like,
    #[serde(rename = "not like")]
    NotLike,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "not in")]
    NotIn,
    #[serde(rename = "is null")]
    IsNull,
    #[serde(rename = "is not null")]
    IsNotNull,
}

impl FilterOperator {
    /// SQL spelling of the operator.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Equals => "=",
            Self::NotEquals => "!=",
            Self::LessGreater => "<>",
            Self::GreaterThan => ">",
            Self::LessThan => "<",
            Self::GreaterThanOrEquals => ">=",
            Self::LessThanOrEquals => "<=",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
            Self::IsNull => "IS NULL",
            Self::IsNotNull => "IS NOT NULL",
        }
    }

    /// Operators that ignore the value entirely.
    pub fn is_unary(&self) -> bool {
        matches!(self, Self::IsNull | Self::IsNotNull)
    }

    /// Operators that compare against a list.
    pub fn is_set(&self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }
}

impl std::fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Literal compared against a column.
///
/// Numbers keep their JSON representation so integer ids survive a round
/// trip without turning into floats.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    #[default]
    Null,
    Boolean(bool),
    Number(serde_json::Number),
    String(String),
    Array(Vec<FilterValue>),
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        Self::Number(i64::from(value).into())
    }
}

impl From<u64> for FilterValue {
    fn from(value: u64) -> Self {
        Self::Number(value.into())
    }
}

/// Non-finite floats have no JSON form and become `Null`.
impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        serde_json::Number::from_f64(value).map_or(Self::Null, Self::Number)
    }
}

impl<T: Into<FilterValue>> From<Vec<T>> for FilterValue {
    fn from(values: Vec<T>) -> Self {
        Self::Array(values.into_iter().map(Into::into).collect())
    }
}

// ---------------------------------------------------------------------------
// Predicate and condition tree
// ---------------------------------------------------------------------------

/// A single `column operator value` test.
#[derive(Clone, Debug, PartialEq)]
pub struct Predicate {
    pub column: String,
    pub operator: FilterOperator,
    pub value: FilterValue,
}

impl Predicate {
    pub fn new(
        column: impl Into<String>,
        operator: FilterOperator,
        value: impl Into<FilterValue>,
    ) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
        }
    }
}

/// A node in a filter expression.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(into = "WireFilterCondition", try_from = "WireFilterCondition")]
pub enum FilterCondition {
    /// The predicate alone.
    Leaf(Predicate),
    /// The predicate AND every child.
    And(Predicate, Vec<FilterCondition>),
    /// The predicate OR any child.
    Or(Predicate, Vec<FilterCondition>),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum GroupKind {
    And,
    Or,
}

impl GroupKind {
    fn name(self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

impl FilterCondition {
    pub fn new(
        column: impl Into<String>,
        operator: FilterOperator,
        value: impl Into<FilterValue>,
    ) -> Self {
        Self::Leaf(Predicate::new(column, operator, value))
    }

    pub fn eq(column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(column, FilterOperator::Equals, value)
    }

    pub fn ne(column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(column, FilterOperator::NotEquals, value)
    }

    pub fn gt(column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(column, FilterOperator::GreaterThan, value)
    }

    pub fn gte(column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(column, FilterOperator::GreaterThanOrEquals, value)
    }

    pub fn lt(column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(column, FilterOperator::LessThan, value)
    }

    pub fn lte(column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(column, FilterOperator::LessThanOrEquals, value)
    }

    pub fn like(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(column, FilterOperator::Like, FilterValue::String(pattern.into()))
    }

    pub fn is_in<T: Into<FilterValue>>(column: impl Into<String>, values: Vec<T>) -> Self {
        Self::new(column, FilterOperator::In, values)
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self::new(column, FilterOperator::IsNull, FilterValue::Null)
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Self::new(column, FilterOperator::IsNotNull, FilterValue::Null)
    }

    /// Conjunction anchored at the first condition.
    ///
    /// The node takes only `conditions[0]`'s column, operator, and value;
    /// any group the first condition carried is not kept. The remaining
    /// conditions become the AND group, in order.
    pub fn all(conditions: impl IntoIterator<Item = FilterCondition>) -> AnalyticsResult<Self> {
        Self::combine(conditions, GroupKind::And)
    }

    /// Disjunction anchored at the first condition. Mirror of [`Self::all`].
    pub fn any(conditions: impl IntoIterator<Item = FilterCondition>) -> AnalyticsResult<Self> {
        Self::combine(conditions, GroupKind::Or)
    }

    fn combine(
        conditions: impl IntoIterator<Item = FilterCondition>,
        kind: GroupKind,
    ) -> AnalyticsResult<Self> {
        let mut iter = conditions.into_iter();
        let anchor = iter.next().ok_or(AnalyticsError::EmptyConditionList {
            combinator: kind.name(),
        })?;

        let predicate = anchor.into_predicate();
        let children: Vec<_> = iter.collect();

        Ok(match kind {
            GroupKind::And => Self::And(predicate, children),
            GroupKind::Or => Self::Or(predicate, children),
        })
    }

    fn into_predicate(self) -> Predicate {
        match self {
            Self::Leaf(p) | Self::And(p, _) | Self::Or(p, _) => p,
        }
    }

    /// The anchoring predicate of this node.
    pub fn predicate(&self) -> &Predicate {
        match self {
            Self::Leaf(p) | Self::And(p, _) | Self::Or(p, _) => p,
        }
    }

    pub fn column(&self) -> &str {
        &self.predicate().column
    }

    pub fn operator(&self) -> FilterOperator {
        self.predicate().operator
    }

    pub fn value(&self) -> &FilterValue {
        &self.predicate().value
    }

    /// Conditions in this node's group; empty for a leaf.
    pub fn children(&self) -> &[FilterCondition] {
        match self {
            Self::Leaf(_) => &[],
            Self::And(_, kids) | Self::Or(_, kids) => kids,
        }
    }

    /// Visit this node and every descendant, depth first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a FilterCondition)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }
}

// ---------------------------------------------------------------------------
// Wire form
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
struct WireFilterCondition {
    column: String,
    operator: FilterOperator,
    #[serde(default)]
    value: FilterValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    and_filter: Option<Vec<FilterCondition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    or_filter: Option<Vec<FilterCondition>>,
}

impl From<FilterCondition> for WireFilterCondition {
    fn from(condition: FilterCondition) -> Self {
        let (predicate, and_filter, or_filter) = match condition {
            FilterCondition::Leaf(p) => (p, None, None),
            FilterCondition::And(p, kids) => (p, Some(kids), None),
            FilterCondition::Or(p, kids) => (p, None, Some(kids)),
        };
        Self {
            column: predicate.column,
            operator: predicate.operator,
            value: predicate.value,
            and_filter,
            or_filter,
        }
    }
}

impl TryFrom<WireFilterCondition> for FilterCondition {
    type Error = AnalyticsError;

    fn try_from(wire: WireFilterCondition) -> Result<Self, Self::Error> {
        let predicate = Predicate {
            column: wire.column,
            operator: wire.operator,
            value: wire.value,
        };
        // An empty group is treated as absent when the other one is populated.
        match (wire.and_filter, wire.or_filter) {
            (None, None) => Ok(Self::Leaf(predicate)),
            (Some(and), None) => Ok(Self::And(predicate, and)),
            (None, Some(or)) => Ok(Self::Or(predicate, or)),
            (Some(and), Some(or)) if or.is_empty() => Ok(Self::And(predicate, and)),
            (Some(and), Some(or)) if and.is_empty() => Ok(Self::Or(predicate, or)),
            (Some(_), Some(_)) => Err(AnalyticsError::AmbiguousFilter {
                column: predicate.column,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn all_anchors_first_condition() {
        let cs = vec![
            FilterCondition::eq("type", "search"),
            FilterCondition::gt("latency", 100),
            FilterCondition::is_not_null("query"),
        ];
        let combined = FilterCondition::all(cs.clone()).unwrap();
        assert_eq!(combined.predicate(), cs[0].predicate());
        assert_eq!(combined.children(), &cs[1..]);
        assert!(matches!(combined, FilterCondition::And(..)));
    }

    #[test]
    fn any_anchors_first_condition() {
        let cs = vec![
            FilterCondition::eq("type", "search"),
            FilterCondition::eq("type", "rag"),
        ];
        let combined = FilterCondition::any(cs.clone()).unwrap();
        assert_eq!(combined.column(), "type");
        assert_eq!(combined.children(), &cs[1..]);
        assert!(matches!(combined, FilterCondition::Or(..)));
    }

    #[test]
    fn empty_list_is_rejected() {
        assert_eq!(
            FilterCondition::all(Vec::new()),
            Err(AnalyticsError::EmptyConditionList { combinator: "and" })
        );
        assert_eq!(
            FilterCondition::any(Vec::new()),
            Err(AnalyticsError::EmptyConditionList { combinator: "or" })
        );
    }

    #[test]
    fn single_condition_yields_empty_group() {
        let combined = FilterCondition::all([FilterCondition::eq("a", 1)]).unwrap();
        assert_eq!(combined, FilterCondition::And(Predicate::new("a", FilterOperator::Equals, 1), vec![]));
    }

    #[test]
    fn less_greater_is_the_alternate_not_equals() {
        let op: FilterOperator = serde_json::from_value(json!("<>")).unwrap();
        assert_eq!(op, FilterOperator::LessGreater);
        assert_eq!(op.as_sql(), "<>");
        assert_eq!(serde_json::to_value(op).unwrap(), json!("<>"));
    }

    #[test]
    fn group_anchor_keeps_only_its_predicate() {
        let and_group = FilterCondition::all([
            FilterCondition::eq("a", 1),
            FilterCondition::eq("b", 2),
        ])
        .unwrap();
        let cs = vec![and_group, FilterCondition::eq("c", 3)];

        let outer = FilterCondition::all(cs.clone()).unwrap();
        assert_eq!(outer.predicate(), cs[0].predicate());
        assert_eq!(outer.children(), &cs[1..]);

        let mixed = FilterCondition::any(cs.clone()).unwrap();
        assert!(matches!(mixed, FilterCondition::Or(..)));
        assert_eq!(mixed.column(), "a");
        assert_eq!(mixed.children(), &cs[1..]);
    }

    #[test]
    fn wire_shape_uses_snake_case_groups() {
        let cond = FilterCondition::all([
            FilterCondition::eq("dataset_id", "abc"),
            FilterCondition::is_in("status", vec![200, 201]),
        ])
        .unwrap();
        let json = serde_json::to_value(&cond).unwrap();
        assert_eq!(
            json,
            json!({
                "column": "dataset_id",
                "operator": "=",
                "value": "abc",
                "and_filter": [
                    { "column": "status", "operator": "in", "value": [200, 201] }
                ]
            })
        );
    }

    #[test]
    fn wire_with_both_groups_is_rejected() {
        let raw = json!({
            "column": "a", "operator": "=", "value": 1,
            "and_filter": [{ "column": "b", "operator": "=", "value": 2 }],
            "or_filter": [{ "column": "c", "operator": "=", "value": 3 }]
        });
        let err = serde_json::from_value::<FilterCondition>(raw).unwrap_err();
        assert!(err.to_string().contains("mixes and_filter with or_filter"));
    }

    #[test]
    fn wire_with_one_empty_group_picks_the_other() {
        let raw = json!({
            "column": "a", "operator": "=", "value": 1,
            "and_filter": [],
            "or_filter": [{ "column": "c", "operator": "=", "value": 3 }]
        });
        let cond: FilterCondition = serde_json::from_value(raw).unwrap();
        assert!(matches!(cond, FilterCondition::Or(_, ref kids) if kids.len() == 1));
    }

    #[test]
    fn unary_operator_value_defaults_to_null() {
        let raw = json!({ "column": "deleted_at", "operator": "is null" });
        let cond: FilterCondition = serde_json::from_value(raw).unwrap();
        assert_eq!(cond, FilterCondition::is_null("deleted_at"));
        assert!(cond.operator().is_unary());
    }

    #[test]
    fn integer_values_stay_integers() {
        let json = serde_json::to_string(&FilterValue::from(42_i64)).unwrap();
        assert_eq!(json, "42");
        assert_eq!(FilterValue::from(f64::NAN), FilterValue::Null);
    }

    #[test]
    fn walk_visits_every_node() {
        let cond = FilterCondition::all([
            FilterCondition::eq("a", 1),
            FilterCondition::any([FilterCondition::eq("b", 2), FilterCondition::eq("c", 3)])
                .unwrap(),
        ])
        .unwrap();
        let mut seen = Vec::new();
        cond.walk(&mut |c| seen.push(c.column().to_string()));
        assert_eq!(seen, vec!["a", "b", "c"]);
    }
}
