//! # Computed Column Registry
//!
//! Task rows expose columns that exist nowhere in the tasks table: the
//! completion timestamp, aggregated annotation and prediction payloads, the
//! annotator list, the uploaded file name. Each is a named annotator that
//! attaches a correlated subquery to the task query; the registry maps wire
//! field names to annotators and is consulted lazily, only for fields the
//! current request actually filters or orders by.
//!
//! The registry is shared across concurrent query builds and accepts
//! runtime registration, so host extensions can add their own computed
//! columns next to the built-ins.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{DataManagerError, DataManagerResult};
use crate::query_builder::TaskQuery;

/// Names of the counters every prepared query annotates up front.
///
/// Filters treat `empty` on these as a zero test rather than a NULL test,
/// and their registry entries are passthroughs.
pub const COUNTER_FIELDS: &[&str] = &[
    "total_predictions",
    "total_annotations",
    "cancelled_annotations",
];

/// One computed-column attachment.
///
/// Takes the query, returns it with the column annotated. The active SQL
/// dialect rides on the query itself.
pub type AnnotationFn = Arc<dyn Fn(TaskQuery) -> TaskQuery + Send + Sync>;

/// Thread-safe map from field name to annotator.
pub struct AnnotationRegistry {
    annotations: RwLock<HashMap<String, AnnotationFn>>,
}

impl AnnotationRegistry {
    /// Registry seeded with every built-in computed column.
    pub fn with_builtins() -> Self {
        let registry = Self {
            annotations: RwLock::new(HashMap::new()),
        };
        registry.register("completed_at", Arc::new(annotate_completed_at));
        registry.register("annotations_results", Arc::new(annotate_annotations_results));
        registry.register("predictions_results", Arc::new(annotate_predictions_results));
        registry.register("predictions_score", Arc::new(annotate_predictions_score));
        registry.register("annotators", Arc::new(annotate_annotators));
        registry.register("file_upload", Arc::new(annotate_file_upload));
        // counters are annotated on every query already; entries exist so
        // lookup succeeds when a request filters or orders on them
        for counter in COUNTER_FIELDS {
            registry.register(*counter, Arc::new(|query: TaskQuery| query));
        }
        registry
    }

    /// Register or replace one annotator.
    pub fn register(&self, field: impl Into<String>, annotation: AnnotationFn) {
        self.annotations.write().insert(field.into(), annotation);
    }

    /// Register several annotators at once.
    pub fn bulk_register(&self, entries: impl IntoIterator<Item = (String, AnnotationFn)>) {
        let mut annotations = self.annotations.write();
        for (field, annotation) in entries {
            annotations.insert(field, annotation);
        }
    }

    pub fn contains(&self, field: &str) -> bool {
        self.annotations.read().contains_key(field)
    }

    /// Registered field names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.annotations.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Apply the annotator registered under `field` to the query.
    ///
    /// An unregistered field is a fatal request error: the field survived
    /// native-column and data-path screening, so nothing else can provide
    /// it.
    pub fn apply(&self, query: TaskQuery, field: &str) -> DataManagerResult<TaskQuery> {
        let annotation = self
            .annotations
            .read()
            .get(field)
            .cloned()
            .ok_or_else(|| DataManagerError::unknown_annotation(field))?;
        Ok(annotation(query))
    }
}

impl Default for AnnotationRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for AnnotationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnnotationRegistry")
            .field("annotations", &self.names())
            .finish()
    }
}

/// Timestamp of the newest annotation on a labeled task, NULL otherwise.
fn annotate_completed_at(query: TaskQuery) -> TaskQuery {
    query.annotate(
        "completed_at",
        "(SELECT annotations.created_at FROM annotations \
         WHERE annotations.task_id = tasks.id AND tasks.is_labeled = true \
         ORDER BY annotations.created_at DESC LIMIT 1)",
    )
}

/// Aggregate a child-table expression into one value per task.
///
/// Engines without native array aggregation fall back to delimited text,
/// which aggregates empty groups to NULL and needs the explicit `''`
/// default the frontend expects.
fn child_aggregate(
    query: &TaskQuery,
    table: &str,
    expr: &str,
    distinct: bool,
    default_empty: bool,
) -> String {
    let mut aggregate = query.dialect().array_agg(expr, distinct);
    if default_empty && !query.dialect().has_native_array_agg() {
        aggregate = format!("COALESCE({aggregate}, '')");
    }
    format!("(SELECT {aggregate} FROM {table} WHERE {table}.task_id = tasks.id)")
}

fn annotate_annotations_results(query: TaskQuery) -> TaskQuery {
    let expr = child_aggregate(&query, "annotations", "annotations.result", false, true);
    query.annotate("annotations_results", &expr)
}

fn annotate_predictions_results(query: TaskQuery) -> TaskQuery {
    let expr = child_aggregate(&query, "predictions", "predictions.result", false, true);
    query.annotate("predictions_results", &expr)
}

fn annotate_predictions_score(query: TaskQuery) -> TaskQuery {
    query.annotate(
        "predictions_score",
        "(SELECT AVG(predictions.score) FROM predictions \
         WHERE predictions.task_id = tasks.id)",
    )
}

/// Distinct ids of everyone who annotated the task.
fn annotate_annotators(query: TaskQuery) -> TaskQuery {
    let expr = child_aggregate(
        &query,
        "annotations",
        "annotations.completed_by_id",
        true,
        false,
    );
    query.annotate("annotators", &expr)
}

/// Uploaded file name, exposed under the `file_upload_field` alias the
/// filter and response layers use.
fn annotate_file_upload(query: TaskQuery) -> TaskQuery {
    query.annotate(
        "file_upload_field",
        "(SELECT file_uploads.file FROM file_uploads \
         WHERE file_uploads.id = tasks.file_upload_id)",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_builder::BackendKind;

    #[test]
    fn test_builtins_registered() {
        let registry = AnnotationRegistry::with_builtins();
        for field in [
            "completed_at",
            "annotations_results",
            "predictions_results",
            "predictions_score",
            "annotators",
            "file_upload",
            "total_predictions",
            "total_annotations",
            "cancelled_annotations",
        ] {
            assert!(registry.contains(field), "missing builtin: {field}");
        }
    }

    #[test]
    fn test_unknown_field_is_fatal() {
        let registry = AnnotationRegistry::with_builtins();
        let result = registry.apply(TaskQuery::new(BackendKind::Postgres), "no_such_field");
        assert!(matches!(
            result,
            Err(DataManagerError::UnknownAnnotation { .. })
        ));
    }

    #[test]
    fn test_completed_at_subquery_shape() {
        let registry = AnnotationRegistry::with_builtins();
        let query = registry
            .apply(TaskQuery::new(BackendKind::Postgres), "completed_at")
            .unwrap();
        let sql = query.build_sql();
        assert!(sql.contains("ORDER BY annotations.created_at DESC LIMIT 1"), "sql: {sql}");
        assert!(sql.contains("AS \"completed_at\""), "sql: {sql}");
    }

    #[test]
    fn test_results_aggregation_per_backend() {
        let registry = AnnotationRegistry::with_builtins();

        let pg = registry
            .apply(TaskQuery::new(BackendKind::Postgres), "annotations_results")
            .unwrap();
        assert!(pg.build_sql().contains("ARRAY_AGG(annotations.result)"));

        let lite = registry
            .apply(TaskQuery::new(BackendKind::Sqlite), "annotations_results")
            .unwrap();
        assert!(lite
            .build_sql()
            .contains("COALESCE(GROUP_CONCAT(annotations.result), '')"));
    }

    #[test]
    fn test_annotators_aggregate_distinct() {
        let registry = AnnotationRegistry::with_builtins();
        let query = registry
            .apply(TaskQuery::new(BackendKind::Postgres), "annotators")
            .unwrap();
        assert!(query
            .build_sql()
            .contains("ARRAY_AGG(DISTINCT annotations.completed_by_id)"));
    }

    #[test]
    fn test_counter_entries_are_passthrough() {
        let registry = AnnotationRegistry::with_builtins();
        let base = TaskQuery::new(BackendKind::Postgres);
        let before = base.build_sql();
        let query = registry.apply(base, "total_annotations").unwrap();
        assert_eq!(query.build_sql(), before);
    }

    #[test]
    fn test_bulk_registration() {
        let registry = AnnotationRegistry::with_builtins();
        registry.bulk_register([
            (
                "reviewers".to_string(),
                Arc::new(|query: TaskQuery| query.annotate("reviewers", "(SELECT 1)"))
                    as AnnotationFn,
            ),
            (
                "drafts".to_string(),
                Arc::new(|query: TaskQuery| query.annotate("drafts", "(SELECT 2)"))
                    as AnnotationFn,
            ),
        ]);
        assert!(registry.contains("reviewers"));
        assert!(registry.contains("drafts"));
    }

    #[test]
    fn test_runtime_registration_overrides() {
        let registry = AnnotationRegistry::with_builtins();
        registry.register(
            "completed_at",
            Arc::new(|query: TaskQuery| query.annotate("completed_at", "NULL")),
        );
        let query = registry
            .apply(TaskQuery::new(BackendKind::Postgres), "completed_at")
            .unwrap();
        assert!(query.build_sql().contains("NULL AS \"completed_at\""));
    }
}
