use chrono::NaiveDateTime;

use super::dialect::SqlDialect;
use crate::prepare_params::Conjunction;

/// Typed comparison operator on a single column expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Lt,
    Gt,
    Lte,
    Gte,
}

impl Comparator {
    fn to_sql(self) -> &'static str {
        match self {
            Comparator::Eq => "=",
            Comparator::Lt => "<",
            Comparator::Gt => ">",
            Comparator::Lte => "<=",
            Comparator::Gte => ">=",
        }
    }
}

/// A single typed value rendered into a predicate
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
    Timestamp(NaiveDateTime),
}

impl SqlValue {
    /// Carry an uncoerced wire scalar into SQL with its JSON type intact.
    /// Containers degrade to their JSON text, the same way the host platform
    /// compares them.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => SqlValue::Null,
            serde_json::Value::Bool(b) => SqlValue::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    SqlValue::Integer(i)
                } else {
                    SqlValue::Number(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => SqlValue::Text(s.clone()),
            other => SqlValue::Text(other.to_string()),
        }
    }

    pub fn to_sql(&self) -> String {
        match self {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Bool(b) => b.to_string(),
            SqlValue::Integer(i) => i.to_string(),
            SqlValue::Number(n) => n.to_string(),
            SqlValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
            SqlValue::Timestamp(ts) => format!("'{}'", ts.format("%Y-%m-%d %H:%M:%S%.6f")),
        }
    }
}

/// Represents different types of SQL conditions
///
/// The `field` side is always a ready SQL expression: a column name, a JSON
/// extraction or a subquery produced upstream. Only the comparison itself is
/// lowered here, with the dialect resolving the engine-specific operators.
#[derive(Debug, Clone)]
pub enum Condition {
    Compare {
        field: String,
        comparator: Comparator,
        value: SqlValue,
    },
    Between {
        field: String,
        start: SqlValue,
        end: SqlValue,
    },
    In {
        field: String,
        values: Vec<SqlValue>,
    },
    IsNull {
        field: String,
    },
    IsNotNull {
        field: String,
    },
    Contains {
        field: String,
        needle: String,
    },
    Regex {
        field: String,
        pattern: String,
    },
    Not(Box<Condition>),
    Group {
        conditions: Vec<Condition>,
        operator: LogicalOperator,
    },
    Raw {
        sql: String,
    },
}

impl Condition {
    /// Create a typed comparison condition
    pub fn compare(field: &str, comparator: Comparator, value: SqlValue) -> Self {
        Condition::Compare {
            field: field.to_string(),
            comparator,
            value,
        }
    }

    /// Create an inclusive BETWEEN condition
    pub fn between(field: &str, start: SqlValue, end: SqlValue) -> Self {
        Condition::Between {
            field: field.to_string(),
            start,
            end,
        }
    }

    /// Create an IN condition
    pub fn in_values(field: &str, values: Vec<SqlValue>) -> Self {
        Condition::In {
            field: field.to_string(),
            values,
        }
    }

    /// Create an IS NULL condition
    pub fn is_null(field: &str) -> Self {
        Condition::IsNull {
            field: field.to_string(),
        }
    }

    /// Create an IS NOT NULL condition
    pub fn is_not_null(field: &str) -> Self {
        Condition::IsNotNull {
            field: field.to_string(),
        }
    }

    /// Create a case-insensitive substring condition
    pub fn contains(field: &str, needle: &str) -> Self {
        Condition::Contains {
            field: field.to_string(),
            needle: needle.to_string(),
        }
    }

    /// Create a regex match condition
    pub fn regex(field: &str, pattern: &str) -> Self {
        Condition::Regex {
            field: field.to_string(),
            pattern: pattern.to_string(),
        }
    }

    /// Create a raw SQL condition
    pub fn raw(sql: &str) -> Self {
        Condition::Raw {
            sql: sql.to_string(),
        }
    }

    /// Wrap this condition in a negation
    pub fn negated(self) -> Self {
        Condition::Not(Box::new(self))
    }

    /// Combine conditions with OR
    pub fn any_of(conditions: Vec<Condition>) -> Self {
        Condition::Group {
            conditions,
            operator: LogicalOperator::Or,
        }
    }

    /// Combine conditions with AND
    pub fn all_of(conditions: Vec<Condition>) -> Self {
        Condition::Group {
            conditions,
            operator: LogicalOperator::And,
        }
    }

    /// Convert condition to SQL string
    pub fn to_sql(&self, dialect: &dyn SqlDialect) -> String {
        match self {
            Condition::Compare {
                field,
                comparator,
                value,
            } => {
                // equality against NULL means nullability, as the ORM
                // behind the original wire contract treats it
                if *comparator == Comparator::Eq && *value == SqlValue::Null {
                    format!("{field} IS NULL")
                } else {
                    format!("{} {} {}", field, comparator.to_sql(), value.to_sql())
                }
            }
            Condition::Between { field, start, end } => {
                format!("{} BETWEEN {} AND {}", field, start.to_sql(), end.to_sql())
            }
            Condition::In { field, values } => {
                let value_list = values
                    .iter()
                    .map(SqlValue::to_sql)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{field} IN ({value_list})")
            }
            Condition::IsNull { field } => {
                format!("{field} IS NULL")
            }
            Condition::IsNotNull { field } => {
                format!("{field} IS NOT NULL")
            }
            Condition::Contains { field, needle } => dialect.contains(field, needle),
            Condition::Regex { field, pattern } => dialect.regex_match(field, pattern),
            Condition::Not(inner) => {
                format!("NOT ({})", inner.to_sql(dialect))
            }
            Condition::Group {
                conditions,
                operator,
            } => {
                if conditions.is_empty() {
                    return "1=1".to_string();
                }
                if conditions.len() == 1 {
                    return conditions[0].to_sql(dialect);
                }
                let parts: Vec<String> = conditions.iter().map(|c| c.to_sql(dialect)).collect();
                format!("({})", parts.join(operator.to_sql()))
            }
            Condition::Raw { sql } => sql.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

impl LogicalOperator {
    fn to_sql(self) -> &'static str {
        match self {
            LogicalOperator::And => " AND ",
            LogicalOperator::Or => " OR ",
        }
    }
}

impl From<Conjunction> for LogicalOperator {
    fn from(conjunction: Conjunction) -> Self {
        match conjunction {
            Conjunction::And => LogicalOperator::And,
            Conjunction::Or => LogicalOperator::Or,
        }
    }
}

/// A flat set of conditions combined with a single logical operator
///
/// One data manager request combines every filter predicate with one AND or
/// OR; nesting only happens inside individual conditions (the string-empty
/// triple), never between items.
#[derive(Debug, Clone)]
pub struct FilterExpression {
    pub conditions: Vec<Condition>,
    pub operator: LogicalOperator,
}

impl FilterExpression {
    pub fn new(operator: LogicalOperator) -> Self {
        Self {
            conditions: Vec::new(),
            operator,
        }
    }

    /// Append one condition under the expression's operator
    pub fn add(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Convert to SQL string
    pub fn to_sql(&self, dialect: &dyn SqlDialect) -> String {
        if self.conditions.is_empty() {
            return "1=1".to_string();
        }

        if self.conditions.len() == 1 {
            return self.conditions[0].to_sql(dialect);
        }

        let condition_sqls: Vec<String> =
            self.conditions.iter().map(|c| c.to_sql(dialect)).collect();

        format!("({})", condition_sqls.join(self.operator.to_sql()))
    }
}
