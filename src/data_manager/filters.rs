//! # Filter Predicate Builder
//!
//! Translates the filter panel of one request into a single WHERE clause.
//!
//! ## Overview
//!
//! Every filter item runs through the same pipeline: skip items that cannot
//! filter (virtual targets, falsy values), resolve the field path, lower it
//! to a SQL expression, coerce the value per its declared type and emit one
//! condition. The conditions combine flat under the request conjunction;
//! nested boolean trees are not part of the wire contract.
//!
//! Special cases handled here rather than in the generic dispatch:
//!
//! - Numeric comparisons against JSON keys annotate a `filter_<key>` float
//!   cast and compare against that cast.
//! - `empty` on the always-annotated counters means "count is zero", not
//!   NULL.
//! - `empty` on text fields matches blank and NULL in all the forms the
//!   frontend has historically relied on.
//! - An invalid regex pattern fails soft: the whole query collapses to the
//!   empty set instead of erroring.
//!
//! ## Django Heritage
//!
//! This is the Rust rendition of `TaskQuerySet.apply_filters` from the
//! LabelKit data manager, including its observable quirks: unrecognized
//! operators degrade to equality and a `not_` name prefix still negates
//! them.

use regex::Regex;

use crate::data_manager::annotations::COUNTER_FIELDS;
use crate::data_manager::coerce::{cast_bool, cast_value, Coerced};
use crate::data_manager::fields::{resolve_field_path, ProjectSettings, ResolvedField};
use crate::error::DataManagerResult;
use crate::prepare_params::{ColumnType, ComparisonKind, Filters, Operator};
use crate::query_builder::{
    Comparator, Condition, FilterExpression, LogicalOperator, SqlValue, TaskQuery,
};

/// Apply the filter panel to a task query.
///
/// Returns the query with one combined WHERE expression appended, the empty
/// query if a regex pattern fails to compile, or an error if a strict value
/// coercion fails.
pub fn apply_filters(
    query: TaskQuery,
    filters: &Filters,
    settings: ProjectSettings,
    undefined_key: &str,
) -> DataManagerResult<TaskQuery> {
    if filters.items.is_empty() {
        return Ok(query);
    }

    let mut query = query;
    let mut filter_expression = FilterExpression::new(LogicalOperator::from(filters.conjunction));

    for item in &filters.items {
        // virtual filters target other record types; falsy values filter nothing
        if item.is_virtual() || item.value.is_falsy() {
            continue;
        }

        let resolved = match resolve_field_path(&item.filter, settings, undefined_key) {
            // the task column is a FK id; filtering goes through the
            // computed file name column instead
            ResolvedField::Column(name) if name == "file_upload" => {
                ResolvedField::Column("file_upload_field".to_string())
            }
            other => other,
        };

        // lower the field to a raw SQL expression; WHERE cannot reference
        // SELECT aliases, so computed columns inline their expression
        let mut lhs = match &resolved {
            ResolvedField::Column(name) => match query.annotation_expr(name) {
                Some(expr) => expr.to_string(),
                None => name.clone(),
            },
            ResolvedField::Data { key } => query.dialect().json_extract_text("data", key),
        };

        // numeric comparison on JSON text needs a float cast; expose it as a
        // filter_<key> column so the response can echo the casted value
        if item.column_type == ColumnType::Number {
            if let ResolvedField::Data { key } = &resolved {
                let alias = format!("filter_{}", key.replace("$undefined$", "undefined"));
                let cast = query.dialect().cast_json_float("data", key);
                query = query.annotate(&alias, &cast);
                lhs = cast;
            }
        }

        // `empty` on a counter asks whether the count is zero; the zero
        // compares as an integer no matter what type the item declares
        if let ResolvedField::Column(name) = &resolved {
            if COUNTER_FIELDS.contains(&name.as_str()) && item.operator == Operator::Empty {
                let zero = Condition::compare(&lhs, Comparator::Eq, SqlValue::Integer(0));
                filter_expression.add(if cast_bool(&item.value) {
                    zero
                } else {
                    zero.negated()
                });
                continue;
            }
        }

        // `empty` on text matches blank and NULL in both spellings the
        // wire contract has always produced
        if matches!(item.column_type, ColumnType::String | ColumnType::Unknown)
            && item.operator == Operator::Empty
        {
            let blank = Condition::compare(&lhs, Comparator::Eq, SqlValue::Text(String::new()));
            let null_eq = Condition::compare(&lhs, Comparator::Eq, SqlValue::Null);
            let null = Condition::is_null(&lhs);
            let condition = if cast_bool(&item.value) {
                Condition::any_of(vec![blank, null_eq, null])
            } else {
                Condition::all_of(vec![blank.negated(), null_eq.negated(), null.negated()])
            };
            filter_expression.add(condition);
            continue;
        }

        // reject broken patterns before they reach the engine; the frontend
        // sends these keystroke by keystroke
        if item.operator == Operator::Regex {
            let pattern = item.value.as_text();
            if let Err(error) = Regex::new(&pattern) {
                tracing::info!(pattern = %pattern, error = %error, "Incorrect regex for filter");
                return Ok(query.none());
            }
        }

        let condition = match item.operator.comparison() {
            ComparisonKind::IsNull => {
                if cast_bool(&item.value) {
                    Condition::is_null(&lhs)
                } else {
                    Condition::is_null(&lhs).negated()
                }
            }
            // needle and pattern render as text, but the declared type still
            // screens the value the same way the comparison operators do
            ComparisonKind::Contains => {
                cast_value(item.column_type, &item.value)?;
                wrap_negated(Condition::contains(&lhs, &item.value.as_text()), &item.operator)
            }
            ComparisonKind::Regex => {
                cast_value(item.column_type, &item.value)?;
                Condition::regex(&lhs, &item.value.as_text())
            }
            kind => {
                let condition = match (&item.operator, cast_value(item.column_type, &item.value)?) {
                    // a range always compares inclusively on both bounds
                    (_, Coerced::Range { min, max }) => Condition::between(&lhs, min, max),
                    (Operator::In | Operator::NotIn, Coerced::Scalar(scalar)) => {
                        Condition::between(&lhs, scalar.clone(), scalar)
                    }
                    (_, Coerced::Scalar(scalar)) => {
                        Condition::compare(&lhs, comparator_for(kind), scalar)
                    }
                };
                wrap_negated(condition, &item.operator)
            }
        };

        filter_expression.add(condition);
    }

    tracing::debug!(filter = %filter_expression.to_sql(query.dialect()), "Apply filter");
    Ok(query.filter(filter_expression))
}

fn wrap_negated(condition: Condition, operator: &Operator) -> Condition {
    if operator.is_negated() {
        condition.negated()
    } else {
        condition
    }
}

fn comparator_for(kind: ComparisonKind) -> Comparator {
    match kind {
        ComparisonKind::Less => Comparator::Lt,
        ComparisonKind::Greater => Comparator::Gt,
        ComparisonKind::LessOrEqual => Comparator::Lte,
        ComparisonKind::GreaterOrEqual => Comparator::Gte,
        _ => Comparator::Eq,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DataManagerError;
    use crate::prepare_params::{Conjunction, FilterItem, FilterValue};
    use crate::query_builder::BackendKind;
    use serde_json::{json, Value};

    const UNDEFINED: &str = "$undefined$";

    fn item(filter: &str, operator: Operator, column_type: ColumnType, value: Value) -> FilterItem {
        FilterItem {
            filter: filter.to_string(),
            operator,
            column_type,
            value: FilterValue::Scalar(value),
        }
    }

    fn apply(items: Vec<FilterItem>) -> TaskQuery {
        apply_with(items, Conjunction::And, ProjectSettings::default())
    }

    fn try_apply(items: Vec<FilterItem>) -> DataManagerResult<TaskQuery> {
        let filters = Filters {
            conjunction: Conjunction::And,
            items,
        };
        apply_filters(
            TaskQuery::new(BackendKind::Postgres),
            &filters,
            ProjectSettings::default(),
            UNDEFINED,
        )
    }

    fn apply_with(
        items: Vec<FilterItem>,
        conjunction: Conjunction,
        settings: ProjectSettings,
    ) -> TaskQuery {
        let filters = Filters { conjunction, items };
        apply_filters(
            TaskQuery::new(BackendKind::Postgres),
            &filters,
            settings,
            UNDEFINED,
        )
        .unwrap()
    }

    #[test]
    fn test_skips_virtual_and_falsy_items() {
        let query = apply(vec![
            item(
                "filter:annotations:id",
                Operator::Equal,
                ColumnType::Number,
                json!(3),
            ),
            item(
                "filter:tasks:data.text",
                Operator::Equal,
                ColumnType::String,
                json!(""),
            ),
        ]);
        assert!(!query.build_sql().contains("WHERE"));
    }

    #[test]
    fn test_string_equality_on_data_field() {
        let query = apply(vec![item(
            "filter:tasks:data.text",
            Operator::Equal,
            ColumnType::String,
            json!("cat"),
        )]);
        assert!(query.build_sql().contains("WHERE data ->> 'text' = 'cat'"));
    }

    #[test]
    fn test_or_conjunction() {
        let items = vec![
            item("filter:tasks:id", Operator::Equal, ColumnType::Number, json!(1)),
            item("filter:tasks:id", Operator::Equal, ColumnType::Number, json!(2)),
        ];
        let sql = apply_with(items, Conjunction::Or, ProjectSettings::default()).build_sql();
        assert!(sql.contains("(id = 1 OR id = 2)"), "sql: {sql}");
    }

    #[test]
    fn test_number_filter_annotates_float_cast() {
        let query = apply(vec![item(
            "filter:tasks:data.score",
            Operator::Greater,
            ColumnType::Number,
            json!("0.5"),
        )]);
        let sql = query.build_sql();
        assert!(query.has_annotation("filter_score"));
        assert!(sql.contains("CAST(data ->> 'score' AS DOUBLE PRECISION) > 0.5"), "sql: {sql}");
    }

    #[test]
    fn test_undefined_bucket_alias_drops_sigils() {
        let settings = ProjectSettings {
            only_undefined_field: true,
        };
        let query = apply_with(
            vec![item(
                "filter:tasks:data.score",
                Operator::Equal,
                ColumnType::Number,
                json!(1),
            )],
            Conjunction::And,
            settings,
        );
        assert!(query.has_annotation("filter_undefined"));
        assert!(query.build_sql().contains("data ->> '$undefined$'"));
    }

    #[test]
    fn test_counter_empty_rewrites_to_zero() {
        let query = apply(vec![item(
            "filter:tasks:total_annotations",
            Operator::Empty,
            ColumnType::Number,
            json!("true"),
        )]);
        assert!(query.build_sql().contains("total_annotations = 0"));

        let query = apply(vec![item(
            "filter:tasks:total_annotations",
            Operator::Empty,
            ColumnType::Number,
            json!("false"),
        )]);
        assert!(query.build_sql().contains("NOT (total_annotations = 0)"));
    }

    // the frontend declares the `empty` item as Boolean; the comparison must
    // still be against integer zero, never a boolean literal
    #[test]
    fn test_counter_empty_ignores_declared_type() {
        let query = apply(vec![item(
            "filter:tasks:total_annotations",
            Operator::Empty,
            ColumnType::Boolean,
            json!("true"),
        )]);
        let sql = query.build_sql();
        assert!(sql.contains("total_annotations = 0"), "sql: {sql}");
        assert!(!sql.contains("false"), "sql: {sql}");
    }

    #[test]
    fn test_string_empty_matches_blank_and_null() {
        let query = apply(vec![item(
            "filter:tasks:data.text",
            Operator::Empty,
            ColumnType::String,
            json!("true"),
        )]);
        let sql = query.build_sql();
        assert!(
            sql.contains(
                "(data ->> 'text' = '' OR data ->> 'text' IS NULL OR data ->> 'text' IS NULL)"
            ),
            "sql: {sql}"
        );
    }

    #[test]
    fn test_string_not_empty_negates_each_form() {
        let query = apply(vec![item(
            "filter:tasks:data.text",
            Operator::Empty,
            ColumnType::String,
            json!("false"),
        )]);
        let sql = query.build_sql();
        assert!(sql.contains("NOT (data ->> 'text' = '')"), "sql: {sql}");
        assert!(sql.contains("NOT (data ->> 'text' IS NULL)"), "sql: {sql}");
    }

    #[test]
    fn test_generic_empty_uses_nullability() {
        let query = apply(vec![item(
            "filter:tasks:completed_at",
            Operator::Empty,
            ColumnType::Datetime,
            json!("true"),
        )]);
        assert!(query.build_sql().contains("completed_at IS NULL"));

        let query = apply(vec![item(
            "filter:tasks:completed_at",
            Operator::Empty,
            ColumnType::Datetime,
            json!("false"),
        )]);
        assert!(query.build_sql().contains("NOT (completed_at IS NULL)"));
    }

    #[test]
    fn test_not_equal_wraps_negation() {
        let query = apply(vec![item(
            "filter:tasks:data.text",
            Operator::NotEqual,
            ColumnType::String,
            json!("cat"),
        )]);
        assert!(query.build_sql().contains("NOT (data ->> 'text' = 'cat')"));
    }

    #[test]
    fn test_in_range_compares_both_bounds() {
        let filters = Filters {
            conjunction: Conjunction::And,
            items: vec![FilterItem {
                filter: "filter:tasks:id".to_string(),
                operator: Operator::In,
                column_type: ColumnType::Number,
                value: FilterValue::Range {
                    min: json!(10),
                    max: json!(20),
                },
            }],
        };
        let query = apply_filters(
            TaskQuery::new(BackendKind::Postgres),
            &filters,
            ProjectSettings::default(),
            UNDEFINED,
        )
        .unwrap();
        assert!(query.build_sql().contains("id BETWEEN 10 AND 20"));
    }

    #[test]
    fn test_not_in_negates_range() {
        let filters = Filters {
            conjunction: Conjunction::And,
            items: vec![FilterItem {
                filter: "filter:tasks:created_at".to_string(),
                operator: Operator::NotIn,
                column_type: ColumnType::Datetime,
                value: FilterValue::Range {
                    min: json!("2023-01-01T00:00:00.000000Z"),
                    max: json!("2023-02-01T00:00:00.000000Z"),
                },
            }],
        };
        let query = apply_filters(
            TaskQuery::new(BackendKind::Postgres),
            &filters,
            ProjectSettings::default(),
            UNDEFINED,
        )
        .unwrap();
        let sql = query.build_sql();
        assert!(sql.contains("NOT (created_at BETWEEN '2023-01-01 00:00:00.000000' AND '2023-02-01 00:00:00.000000')"), "sql: {sql}");
    }

    #[test]
    fn test_contains_uses_ilike() {
        let query = apply(vec![item(
            "filter:tasks:data.text",
            Operator::Contains,
            ColumnType::String,
            json!("cat"),
        )]);
        assert!(query.build_sql().contains("data ->> 'text' ILIKE '%cat%'"));
    }

    #[test]
    fn test_invalid_regex_collapses_to_empty_set() {
        let query = apply(vec![item(
            "filter:tasks:data.text",
            Operator::Regex,
            ColumnType::String,
            json!("[unclosed"),
        )]);
        assert!(query.is_none());
        assert!(query.build_sql().contains("WHERE 1=0"));
    }

    #[test]
    fn test_valid_regex_emits_match() {
        let query = apply(vec![item(
            "filter:tasks:data.text",
            Operator::Regex,
            ColumnType::String,
            json!("^cat"),
        )]);
        assert!(query.build_sql().contains("data ->> 'text' ~ '^cat'"));
    }

    #[test]
    fn test_unknown_operator_degrades_to_equality() {
        let query = apply(vec![item(
            "filter:tasks:data.text",
            Operator::Other("starts_with".to_string()),
            ColumnType::String,
            json!("cat"),
        )]);
        assert!(query.build_sql().contains("data ->> 'text' = 'cat'"));

        let query = apply(vec![item(
            "filter:tasks:data.text",
            Operator::Other("not_started".to_string()),
            ColumnType::String,
            json!("cat"),
        )]);
        assert!(query.build_sql().contains("NOT (data ->> 'text' = 'cat')"));
    }

    #[test]
    fn test_file_upload_filters_through_computed_column() {
        let base = TaskQuery::new(BackendKind::Postgres).annotate(
            "file_upload_field",
            "(SELECT file_uploads.file FROM file_uploads WHERE file_uploads.id = tasks.file_upload_id)",
        );
        let filters = Filters {
            conjunction: Conjunction::And,
            items: vec![item(
                "filter:tasks:file_upload",
                Operator::Contains,
                ColumnType::String,
                json!("csv"),
            )],
        };
        let query =
            apply_filters(base, &filters, ProjectSettings::default(), UNDEFINED).unwrap();
        let sql = query.build_sql();
        assert!(
            sql.contains("(SELECT file_uploads.file FROM file_uploads WHERE file_uploads.id = tasks.file_upload_id) ILIKE '%csv%'"),
            "sql: {sql}"
        );
    }

    #[test]
    fn test_invalid_number_fails_request() {
        let result = try_apply(vec![item(
            "filter:tasks:data.score",
            Operator::Equal,
            ColumnType::Number,
            json!("abc"),
        )]);
        assert!(matches!(result, Err(DataManagerError::InvalidNumber { .. })));
    }

    #[test]
    fn test_contains_and_regex_validate_declared_type() {
        let result = try_apply(vec![item(
            "filter:tasks:data.score",
            Operator::Contains,
            ColumnType::Number,
            json!("abc"),
        )]);
        assert!(matches!(result, Err(DataManagerError::InvalidNumber { .. })));

        let result = try_apply(vec![item(
            "filter:tasks:data.score",
            Operator::Regex,
            ColumnType::Number,
            json!("abc"),
        )]);
        assert!(matches!(result, Err(DataManagerError::InvalidNumber { .. })));
    }

    #[test]
    fn test_boolean_filter_coerces_strings() {
        let query = apply(vec![item(
            "filter:tasks:is_labeled",
            Operator::Equal,
            ColumnType::Boolean,
            json!("true"),
        )]);
        assert!(query.build_sql().contains("is_labeled = true"));
    }
}
