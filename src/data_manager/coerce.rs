//! Wire value coercion.
//!
//! Filter values arrive as loosely typed JSON; the declared column type of
//! the filter item decides how they become SQL literals. `Number` and
//! `Datetime` coerce strictly and fail the whole request on bad input,
//! `Boolean` coerces permissively, `String` and unrecognized types pass
//! through untouched.

use chrono::NaiveDateTime;
use serde_json::Value;

use crate::error::{DataManagerError, DataManagerResult};
use crate::prepare_params::{scalar_is_falsy, ColumnType, FilterValue};
use crate::query_builder::SqlValue;

/// Wire datetime format: ISO-8601 with fractional seconds and a literal `Z`.
///
/// The fraction is optional on parse: `%.f` reads any number of digits after
/// the dot, or nothing at all, so second-precision stamps like
/// `2024-05-01T10:00:00Z` are accepted alongside the frontend's
/// microsecond form.
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// A coerced filter value, ready to render as SQL.
#[derive(Debug, Clone, PartialEq)]
pub enum Coerced {
    Scalar(SqlValue),
    Range { min: SqlValue, max: SqlValue },
}

/// Coerce a filter value according to its declared column type.
///
/// Range values coerce both bounds with the same rules. Strict types
/// (`Number`, `Datetime`) return an error on malformed input; the caller is
/// expected to fail the entire request rather than drop the filter.
pub fn cast_value(column_type: ColumnType, value: &FilterValue) -> DataManagerResult<Coerced> {
    match value {
        FilterValue::Range { min, max } => {
            let (min, max) = match column_type {
                ColumnType::Number => (cast_number(min)?, cast_number(max)?),
                ColumnType::Datetime => (cast_datetime(min)?, cast_datetime(max)?),
                _ => (SqlValue::from_json(min), SqlValue::from_json(max)),
            };
            Ok(Coerced::Range { min, max })
        }
        FilterValue::Scalar(scalar) => {
            let value = match column_type {
                ColumnType::Number => cast_number(scalar)?,
                ColumnType::Datetime => cast_datetime(scalar)?,
                ColumnType::Boolean => SqlValue::Bool(cast_bool_scalar(scalar)),
                ColumnType::String | ColumnType::Unknown => SqlValue::from_json(scalar),
            };
            Ok(Coerced::Scalar(value))
        }
    }
}

/// Permissive boolean coercion.
///
/// The strings `1`, `true`, `yes` and `on` are true in any case spelling,
/// every other string is false. Non-strings use their truthiness; range
/// values are always true.
pub fn cast_bool(value: &FilterValue) -> bool {
    match value {
        FilterValue::Range { .. } => true,
        FilterValue::Scalar(scalar) => cast_bool_scalar(scalar),
    }
}

fn cast_bool_scalar(value: &Value) -> bool {
    match value {
        Value::String(s) => matches!(s.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        other => !scalar_is_falsy(other),
    }
}

fn cast_number(value: &Value) -> DataManagerResult<SqlValue> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .map(SqlValue::Number)
            .ok_or_else(|| DataManagerError::invalid_number(n.to_string())),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(SqlValue::Number)
            .map_err(|_| DataManagerError::invalid_number(s.clone())),
        Value::Bool(b) => Ok(SqlValue::Number(if *b { 1.0 } else { 0.0 })),
        other => Err(DataManagerError::invalid_number(other.to_string())),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn cast_datetime(value: &Value) -> DataManagerResult<SqlValue> {
    let text = scalar_text(value);
    NaiveDateTime::parse_from_str(&text, DATETIME_FORMAT)
        .map(SqlValue::Timestamp)
        .map_err(|_| DataManagerError::invalid_datetime(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};
    use serde_json::json;

    fn scalar(v: Value) -> FilterValue {
        FilterValue::Scalar(v)
    }

    #[test]
    fn test_number_coercion() {
        let cases = [
            (json!(42), 42.0),
            (json!(1.5), 1.5),
            (json!("42.5"), 42.5),
            (json!(" 7 "), 7.0),
            (json!(true), 1.0),
        ];
        for (input, expected) in cases {
            let coerced = cast_value(ColumnType::Number, &scalar(input.clone())).unwrap();
            assert_eq!(
                coerced,
                Coerced::Scalar(SqlValue::Number(expected)),
                "input: {input}"
            );
        }
    }

    #[test]
    fn test_invalid_number_errors() {
        let err = cast_value(ColumnType::Number, &scalar(json!("abc"))).unwrap_err();
        assert!(matches!(err, DataManagerError::InvalidNumber { .. }));

        let err = cast_value(ColumnType::Number, &scalar(json!([1, 2]))).unwrap_err();
        assert!(matches!(err, DataManagerError::InvalidNumber { .. }));
    }

    #[test]
    fn test_datetime_coercion() {
        let coerced =
            cast_value(ColumnType::Datetime, &scalar(json!("2023-01-15T10:30:00.000001Z")))
                .unwrap();
        let expected = NaiveDate::from_ymd_opt(2023, 1, 15)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap()
            .with_nanosecond(1_000)
            .unwrap();
        assert_eq!(coerced, Coerced::Scalar(SqlValue::Timestamp(expected)));
    }

    #[test]
    fn test_datetime_without_fraction_parses() {
        let coerced =
            cast_value(ColumnType::Datetime, &scalar(json!("2024-05-01T10:00:00Z"))).unwrap();
        let expected = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        assert_eq!(coerced, Coerced::Scalar(SqlValue::Timestamp(expected)));
    }

    #[test]
    fn test_invalid_datetime_errors() {
        let err = cast_value(ColumnType::Datetime, &scalar(json!("Jan 15"))).unwrap_err();
        assert!(matches!(err, DataManagerError::InvalidDatetime { .. }));
    }

    #[test]
    fn test_boolean_coercion() {
        let truthy = [json!("1"), json!("true"), json!("Yes"), json!("ON"), json!(true), json!(2)];
        for v in truthy {
            assert_eq!(
                cast_value(ColumnType::Boolean, &scalar(v.clone())).unwrap(),
                Coerced::Scalar(SqlValue::Bool(true)),
                "input: {v}"
            );
        }
        let falsy = [json!("0"), json!("false"), json!("no"), json!("anything"), json!(false)];
        for v in falsy {
            assert_eq!(
                cast_value(ColumnType::Boolean, &scalar(v.clone())).unwrap(),
                Coerced::Scalar(SqlValue::Bool(false)),
                "input: {v}"
            );
        }
    }

    #[test]
    fn test_string_passthrough() {
        let coerced = cast_value(ColumnType::String, &scalar(json!("cat"))).unwrap();
        assert_eq!(coerced, Coerced::Scalar(SqlValue::Text("cat".to_string())));

        let coerced = cast_value(ColumnType::Unknown, &scalar(json!(5))).unwrap();
        assert_eq!(coerced, Coerced::Scalar(SqlValue::Integer(5)));
    }

    #[test]
    fn test_range_coercion() {
        let range = FilterValue::Range {
            min: json!("10"),
            max: json!("20"),
        };
        let coerced = cast_value(ColumnType::Number, &range).unwrap();
        assert_eq!(
            coerced,
            Coerced::Range {
                min: SqlValue::Number(10.0),
                max: SqlValue::Number(20.0),
            }
        );
    }

    #[test]
    fn test_range_bound_error_propagates() {
        let range = FilterValue::Range {
            min: json!("10"),
            max: json!("oops"),
        };
        assert!(cast_value(ColumnType::Number, &range).is_err());
    }
}
