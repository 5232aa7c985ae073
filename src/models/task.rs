//! # Task Model
//!
//! Core task record queried by the data manager.
//!
//! ## Overview
//!
//! The `Task` model represents one labeling unit: a payload of source data
//! (`data`), its project scope, and labeling progress flags. The data manager
//! never mutates tasks; it filters, orders, and annotates them into result
//! pages, so this model only carries the read surface.
//!
//! ## Database Schema
//!
//! Maps to the `tasks` table with the following key columns:
//! - `id`: Primary key (BIGINT)
//! - `project_id`: Owning project (BIGINT, nullable for drafts)
//! - `data`: JSONB payload of client-defined fields
//! - `meta`: JSONB for import/source metadata
//! - `is_labeled`: Completion flag maintained by the host platform
//!
//! ## Django Heritage
//!
//! Mirrors the LabelKit platform's `Task` model; child tables (`annotations`,
//! `predictions`, `projects`, `file_uploads`) are reached through computed
//! columns rather than eager joins.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One labeling task row.
///
/// Nested fields live inside the `data` JSONB payload and are addressed by
/// filters as `data.<key>`; everything else is a native column. The split
/// matters to the query engine: native columns compare directly, nested keys
/// go through JSON extraction and casting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: i64,
    pub project_id: Option<i64>,
    pub data: Option<serde_json::Value>,
    pub meta: Option<serde_json::Value>,
    pub overlap: i32,
    pub is_labeled: bool,
    pub file_upload_id: Option<i64>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Task {
    /// Native column names of the `tasks` table.
    ///
    /// The required-field analysis skips these when deciding which computed
    /// columns a query needs, so the list must track the schema.
    pub const COLUMNS: &'static [&'static str] = &[
        "id",
        "project_id",
        "data",
        "meta",
        "overlap",
        "is_labeled",
        "file_upload_id",
        "created_at",
        "updated_at",
    ];

    /// Whether `field` is a native column rather than a computed one.
    pub fn is_native_column(field: &str) -> bool {
        Self::COLUMNS.contains(&field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_column_lookup() {
        assert!(Task::is_native_column("id"));
        assert!(Task::is_native_column("is_labeled"));
        assert!(!Task::is_native_column("total_annotations"));
        assert!(!Task::is_native_column("annotators"));
    }

    #[test]
    fn test_task_deserialization() {
        let raw = serde_json::json!({
            "id": 42,
            "project_id": 7,
            "data": {"image": "s3://bucket/1.jpg"},
            "meta": null,
            "overlap": 1,
            "is_labeled": false,
            "file_upload_id": null,
            "created_at": "2024-03-01T10:00:00",
            "updated_at": "2024-03-01T10:05:00"
        });
        let task: Task = serde_json::from_value(raw).unwrap();
        assert_eq!(task.id, 42);
        assert_eq!(task.project_id, Some(7));
        assert!(!task.is_labeled);
    }
}
