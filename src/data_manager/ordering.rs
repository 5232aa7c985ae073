//! Ordering resolution.
//!
//! The grid sorts by exactly one key at a time. Only the first entry of the
//! ordering list is honored; a leading `-` flips the direction and NULL rows
//! always sink to the bottom so sparse computed columns do not crowd out
//! real values.

use crate::data_manager::fields::{resolve_field_path, ProjectSettings, ResolvedField};
use crate::prepare_params::TASK_ORDERING_PREFIX;
use crate::query_builder::{OrderBy, TaskQuery};

/// Alias for the JSON extraction an ordering on a `data.` path annotates.
pub const ORDERING_FIELD_ALIAS: &str = "ordering_field";

/// Apply the request ordering to a task query.
///
/// Nested `data.` paths sort on the extracted JSON text under the
/// [`ORDERING_FIELD_ALIAS`] annotation, lexicographically and without any
/// cast. Absent or empty ordering falls back to the stable `id` order.
pub fn apply_ordering(
    query: TaskQuery,
    ordering: &[String],
    settings: ProjectSettings,
    undefined_key: &str,
) -> TaskQuery {
    let Some(first) = ordering.first() else {
        return query.order_by(OrderBy::asc("id"));
    };

    let field = first.replace(TASK_ORDERING_PREFIX, "");
    let ascending = !field.starts_with('-');
    let field = field.trim_start_matches('-');

    let (query, expr) = match resolve_field_path(field, settings, undefined_key) {
        ResolvedField::Data { key } => {
            let extract = query.dialect().json_extract_text("data", &key);
            (
                query.annotate(ORDERING_FIELD_ALIAS, &extract),
                ORDERING_FIELD_ALIAS.to_string(),
            )
        }
        // the bare column name is the FK id; ordering follows it directly,
        // unlike filtering which goes through the file name
        ResolvedField::Column(name) if name == "file_upload" => {
            (query, "file_upload_id".to_string())
        }
        ResolvedField::Column(name) => (query, name),
    };

    let order = if ascending {
        OrderBy::asc(&expr)
    } else {
        OrderBy::desc(&expr)
    };
    query.order_by(order.nulls_last())
}
