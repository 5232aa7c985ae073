//! Field path resolution for filters and ordering.
//!
//! Wire field paths arrive with routing prefixes (`filter:tasks:`, `tasks:`)
//! and may address keys inside the `data` JSON payload (`data.<key>`).
//! Resolution decides where each path actually lives; the undefined-bucket
//! collapse applies here so every downstream stage sees the same key.

use crate::models::Task;
use crate::prepare_params::{PrepareParams, TASK_FILTER_PREFIX, TASK_ORDERING_PREFIX};

/// Nested-path prefix addressing the `data` JSON payload.
pub const DATA_PREFIX: &str = "data.";

/// Project-level flags affecting field resolution.
///
/// `only_undefined_field` is set on projects that store uploads without
/// declared fields; all their nested data lives under one configured JSON
/// key, so every `data.`-path collapses to it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectSettings {
    pub only_undefined_field: bool,
}

/// Where a filter or ordering field lives after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedField {
    /// A native or computed column addressed by name.
    Column(String),
    /// A key inside the `data` JSON payload.
    Data { key: String },
}

/// Resolve a wire field path to its storage location.
///
/// Strips the `filter:tasks:` routing prefix and rewrites `data.` paths to
/// JSON keys, collapsing the key into `undefined_key` when the project
/// stores undeclared fields. Anything else passes through as a column name
/// unchanged; validity is deferred to the storage engine.
pub fn resolve_field_path(
    raw: &str,
    settings: ProjectSettings,
    undefined_key: &str,
) -> ResolvedField {
    let field = raw.replace(TASK_FILTER_PREFIX, "");
    if let Some(key) = field.strip_prefix(DATA_PREFIX) {
        if settings.only_undefined_field {
            ResolvedField::Data {
                key: undefined_key.to_string(),
            }
        } else {
            ResolvedField::Data {
                key: key.to_string(),
            }
        }
    } else {
        ResolvedField::Column(field)
    }
}

/// Field names that need a computed column before filtering or ordering.
///
/// Collects the ordering field plus every filter field, then drops native
/// task columns and nested `data.` paths; what remains must come from the
/// annotation registry. Sorted so generated SQL is deterministic.
pub fn fields_for_annotation(prepare_params: &PrepareParams) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();

    // collect field from ordering
    if let Some(first) = prepare_params.ordering.first() {
        let field = first.replace(TASK_ORDERING_PREFIX, "");
        result.push(field.trim_start_matches('-').to_string());
    }

    // collect fields from filters
    if let Some(filters) = &prepare_params.filters {
        for item in &filters.items {
            result.push(item.filter.replace(TASK_FILTER_PREFIX, ""));
        }
    }

    result.sort();
    result.dedup();

    // regular model fields need no annotation, nested data fields resolve
    // through JSON extraction instead
    result.retain(|field| !Task::is_native_column(field) && !field.starts_with(DATA_PREFIX));

    result
}
