//! # Prepared Task Queries
//!
//! The orchestrator behind the data manager grid: one call takes the raw
//! prepare parameters and produces a fully composed task query.
//!
//! ## Pipeline
//!
//! 1. Annotate the three counters every response carries.
//! 2. Lazily attach the computed columns the request filters or orders by.
//! 3. Scope to the requested project.
//! 4. Apply filters, then ordering.
//! 5. Restrict to the explicit row selection last, so it composes with
//!    everything above.
//!
//! ## Django Heritage
//!
//! Mirrors `PreparedTaskManager.get_queryset` / `.all` plus the selection
//! handling of `get_prepared_queryset` from the LabelKit data manager.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::DataManagerConfig;
use crate::data_manager::annotations::AnnotationRegistry;
use crate::data_manager::fields::{fields_for_annotation, ProjectSettings};
use crate::data_manager::filters::apply_filters;
use crate::data_manager::ordering::apply_ordering;
use crate::error::DataManagerResult;
use crate::prepare_params::PrepareParams;
use crate::query_builder::{Comparator, Condition, SqlValue, TaskQuery};

/// Builds prepared task queries.
///
/// Holds the backend configuration and a shared handle to the computed
/// column registry; one instance serves concurrent builds.
#[derive(Debug, Clone)]
pub struct PreparedTaskQueries {
    registry: Arc<AnnotationRegistry>,
    config: DataManagerConfig,
}

impl PreparedTaskQueries {
    pub fn new(registry: Arc<AnnotationRegistry>, config: DataManagerConfig) -> Self {
        Self { registry, config }
    }

    /// Instance with the built-in registry and default configuration.
    pub fn with_defaults() -> Self {
        Self::new(
            Arc::new(AnnotationRegistry::with_builtins()),
            DataManagerConfig::default(),
        )
    }

    pub fn registry(&self) -> &AnnotationRegistry {
        &self.registry
    }

    /// Base task query with the three counters annotated.
    ///
    /// Pagination summaries and the grid columns need these on every
    /// response, filtered or not.
    pub fn base_query(&self) -> TaskQuery {
        TaskQuery::new(self.config.backend)
            .annotate(
                "total_annotations",
                "(SELECT COUNT(DISTINCT annotations.id) FROM annotations \
                 WHERE annotations.task_id = tasks.id AND annotations.was_cancelled = false)",
            )
            .annotate(
                "cancelled_annotations",
                "(SELECT COUNT(DISTINCT annotations.id) FROM annotations \
                 WHERE annotations.task_id = tasks.id AND annotations.was_cancelled = true)",
            )
            .annotate(
                "total_predictions",
                "(SELECT COUNT(DISTINCT predictions.id) FROM predictions \
                 WHERE predictions.task_id = tasks.id)",
            )
    }

    /// Base query plus the computed columns named in `fields_for_evaluation`.
    ///
    /// Fails on fields no registered annotator provides.
    pub fn get_queryset(&self, fields_for_evaluation: &[String]) -> DataManagerResult<TaskQuery> {
        let mut query = self.base_query();
        for field in fields_for_evaluation {
            query = self.registry.apply(query, field)?;
        }
        Ok(query)
    }

    /// Compose the full query for one prepare request.
    pub fn all(
        &self,
        prepare_params: &PrepareParams,
        settings: ProjectSettings,
    ) -> DataManagerResult<TaskQuery> {
        let fields = fields_for_annotation(prepare_params);
        let mut query = self.get_queryset(&fields)?;

        if let Some(project_id) = prepare_params.project {
            query = query.filter_condition(Condition::compare(
                "project_id",
                Comparator::Eq,
                SqlValue::Integer(project_id),
            ));
        }

        if let Some(filters) = &prepare_params.filters {
            query = apply_filters(query, filters, settings, &self.config.undefined_field_key)?;
        }

        query = apply_ordering(
            query,
            &prepare_params.ordering,
            settings,
            &self.config.undefined_field_key,
        );

        if let Some(selected) = &prepare_params.selected_items {
            let id_list = |ids: &[i64]| {
                Condition::in_values(
                    "id",
                    ids.iter().copied().map(SqlValue::Integer).collect(),
                )
            };
            if !selected.all && !selected.included.is_empty() {
                query = query.filter_condition(id_list(&selected.included));
            } else if selected.all && !selected.excluded.is_empty() {
                query = query.filter_condition(id_list(&selected.excluded).negated());
            }
        }

        Ok(query)
    }

    /// Restrict a query to the projects of one organization.
    pub fn for_organization(&self, query: TaskQuery, organization_id: i64) -> TaskQuery {
        query.filter_condition(Condition::raw(&format!(
            "EXISTS (SELECT 1 FROM projects WHERE projects.id = tasks.project_id \
             AND projects.organization_id = {organization_id})"
        )))
    }

    /// Read the resolution flags of the project in scope.
    ///
    /// Without an explicit project this samples an arbitrary task's project,
    /// the same approximation the host platform makes; an empty scope means
    /// no collapse.
    pub async fn sample_project_settings(
        &self,
        pool: &PgPool,
        project: Option<i64>,
    ) -> DataManagerResult<ProjectSettings> {
        let flag: Option<(bool,)> = match project {
            Some(project_id) => {
                sqlx::query_as(
                    "SELECT projects.only_undefined_field FROM projects WHERE projects.id = $1",
                )
                .bind(project_id)
                .fetch_optional(pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    "SELECT projects.only_undefined_field FROM projects \
                     JOIN tasks ON tasks.project_id = projects.id LIMIT 1",
                )
                .fetch_optional(pool)
                .await?
            }
        };

        Ok(ProjectSettings {
            only_undefined_field: flag.map(|(value,)| value).unwrap_or(false),
        })
    }
}

impl Default for PreparedTaskQueries {
    fn default() -> Self {
        Self::with_defaults()
    }
}
