//! # Prepare Parameters
//!
//! Wire-facing data model for one data manager request.
//!
//! ## Overview
//!
//! The frontend serializes its filter panel, ordering choice and row
//! selection into a single JSON document; the host deserializes it into
//! [`PrepareParams`] and hands it to the query engine untouched. Everything
//! here mirrors that wire contract, including its quirks: filter field paths
//! carry a `filter:tasks:` routing prefix, ordering fields a `tasks:` prefix,
//! and the selection block uses the camelCase key `selectedItems`.
//!
//! The engine treats a [`PrepareParams`] as immutable for the duration of one
//! query build.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Routing prefix marking a filter as a direct task filter.
///
/// Items without it target other record types (virtual filters) and are
/// ignored by the predicate builder.
pub const TASK_FILTER_PREFIX: &str = "filter:tasks:";

/// Routing prefix on ordering field paths.
pub const TASK_ORDERING_PREFIX: &str = "tasks:";

/// How filter items combine at the top level. Flat, never nested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Conjunction {
    #[default]
    And,
    Or,
}

/// Declared value type of a filter item.
///
/// Unrecognized wire spellings collapse to `Unknown`, which behaves as an
/// uncoerced passthrough exactly like `String`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Number,
    Datetime,
    Boolean,
    String,
    #[serde(other)]
    Unknown,
}

/// Comparison semantic behind each wire operator.
///
/// This is the operator registry: a fixed, closed mapping from operator name
/// to how the column is compared. Negation is tracked separately by
/// [`Operator::is_negated`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonKind {
    Equality,
    Less,
    Greater,
    LessOrEqual,
    GreaterOrEqual,
    IsNull,
    /// Case-insensitive substring match.
    Contains,
    Regex,
}

/// Filter operator as named on the wire.
///
/// The set is closed; anything else deserializes to [`Operator::Other`],
/// which degrades to a plain equality test instead of erroring. That fallback
/// is long-standing observable behavior, kept as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operator {
    Equal,
    NotEqual,
    Less,
    Greater,
    LessOrEqual,
    GreaterOrEqual,
    In,
    NotIn,
    Empty,
    Contains,
    NotContains,
    Regex,
    Other(String),
}

impl Operator {
    pub fn from_wire(s: &str) -> Self {
        match s {
            "equal" => Operator::Equal,
            "not_equal" => Operator::NotEqual,
            "less" => Operator::Less,
            "greater" => Operator::Greater,
            "less_or_equal" => Operator::LessOrEqual,
            "greater_or_equal" => Operator::GreaterOrEqual,
            "in" => Operator::In,
            "not_in" => Operator::NotIn,
            "empty" => Operator::Empty,
            "contains" => Operator::Contains,
            "not_contains" => Operator::NotContains,
            "regex" => Operator::Regex,
            other => Operator::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Operator::Equal => "equal",
            Operator::NotEqual => "not_equal",
            Operator::Less => "less",
            Operator::Greater => "greater",
            Operator::LessOrEqual => "less_or_equal",
            Operator::GreaterOrEqual => "greater_or_equal",
            Operator::In => "in",
            Operator::NotIn => "not_in",
            Operator::Empty => "empty",
            Operator::Contains => "contains",
            Operator::NotContains => "not_contains",
            Operator::Regex => "regex",
            Operator::Other(s) => s,
        }
    }

    /// Operator-to-comparison lookup. Unrecognized operators get plain
    /// equality, mirroring the empty-suffix fallback of the host platform.
    pub fn comparison(&self) -> ComparisonKind {
        match self {
            Operator::Equal | Operator::NotEqual => ComparisonKind::Equality,
            Operator::Less => ComparisonKind::Less,
            Operator::Greater => ComparisonKind::Greater,
            Operator::LessOrEqual => ComparisonKind::LessOrEqual,
            Operator::GreaterOrEqual => ComparisonKind::GreaterOrEqual,
            Operator::In | Operator::NotIn => ComparisonKind::Equality,
            Operator::Empty => ComparisonKind::IsNull,
            Operator::Contains | Operator::NotContains => ComparisonKind::Contains,
            Operator::Regex => ComparisonKind::Regex,
            Operator::Other(_) => ComparisonKind::Equality,
        }
    }

    /// Whether the emitted predicate is wrapped in a negation.
    ///
    /// Matches the `not_` name-prefix convention, so an unknown operator
    /// spelled `not_something` still negates its equality fallback.
    pub fn is_negated(&self) -> bool {
        match self {
            Operator::NotEqual | Operator::NotIn | Operator::NotContains => true,
            Operator::Other(s) => s.starts_with("not_"),
            _ => false,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Operator {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Operator {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Operator::from_wire(&s))
    }
}

/// Raw filter value: either a `{min, max}` range object or a single scalar.
///
/// Range detection follows the wire shape, not the operator: any object
/// carrying `min`/`max` keys is a range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Range { min: Value, max: Value },
    Scalar(Value),
}

impl FilterValue {
    /// Python-style truthiness over the wire value.
    ///
    /// Filter items whose value is falsy contribute no predicate; note this
    /// makes `false`, `0` and `""` unfilterable scalars by design of the
    /// wire contract (the frontend sends `"false"`/`"0"` strings instead).
    pub fn is_falsy(&self) -> bool {
        match self {
            FilterValue::Range { .. } => false,
            FilterValue::Scalar(v) => scalar_is_falsy(v),
        }
    }

    /// Text rendering of the value, used for regex patterns and substring
    /// needles. Strings render bare, everything else as its JSON form.
    pub fn as_text(&self) -> String {
        match self {
            FilterValue::Scalar(Value::String(s)) => s.clone(),
            FilterValue::Scalar(v) => v.to_string(),
            FilterValue::Range { min, max } => {
                serde_json::json!({ "min": min, "max": max }).to_string()
            }
        }
    }
}

pub(crate) fn scalar_is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().map(|f| f == 0.0).unwrap_or(false),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// One field/operator/value triple from the filter panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterItem {
    /// Prefixed field path, e.g. `filter:tasks:data.value`.
    pub filter: String,
    pub operator: Operator,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub value: FilterValue,
}

impl FilterItem {
    /// True when the field path lacks the task routing prefix.
    ///
    /// Virtual filters target other record types and are not handled by the
    /// task predicate builder; tagging them explicitly keeps the skip from
    /// reading as a rejection.
    pub fn is_virtual(&self) -> bool {
        !self.filter.starts_with(TASK_FILTER_PREFIX)
    }
}

/// All filter items of one request plus their combination mode.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Filters {
    #[serde(default)]
    pub conjunction: Conjunction,
    #[serde(default)]
    pub items: Vec<FilterItem>,
}

/// Explicit row selection from the data manager grid.
///
/// `all = false` reads `included` as an allow-list; `all = true` reads
/// `excluded` as a deny-list.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SelectedItems {
    #[serde(default)]
    pub all: bool,
    #[serde(default)]
    pub included: Vec<i64>,
    #[serde(default)]
    pub excluded: Vec<i64>,
}

/// Input contract for one prepared task query.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PrepareParams {
    #[serde(default)]
    pub project: Option<i64>,
    #[serde(default)]
    pub filters: Option<Filters>,
    #[serde(default)]
    pub ordering: Vec<String>,
    #[serde(default, rename = "selectedItems")]
    pub selected_items: Option<SelectedItems>,
}
