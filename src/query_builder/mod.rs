//! # Query Builder System
//!
//! Deferred SQL assembly for prepared task queries.
//!
//! ## Overview
//!
//! This module turns the data manager's structured stages into one SQL
//! statement: computed-column annotations, typed filter conditions, a single
//! ordering with explicit null placement, and LIMIT/OFFSET pagination. The
//! assembled [`TaskQuery`] is inert until executed, so callers can paginate
//! and count the same build without redoing it.
//!
//! ## Key Components
//!
//! - [`builder`] - Core query builder with SQL generation and execution
//! - [`conditions`] - Typed condition AST lowered to WHERE clauses
//! - [`dialect`] - Engine-specific SQL (PostgreSQL and SQLite)
//! - [`pagination`] - Grid pagination with LIMIT/OFFSET
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use labelkit_core::query_builder::{BackendKind, Comparator, Condition, OrderBy, SqlValue, TaskQuery};
//!
//! let query = TaskQuery::new(BackendKind::Postgres)
//!     .filter_condition(Condition::compare("project_id", Comparator::Eq, SqlValue::Integer(7)))
//!     .order_by(OrderBy::desc("created_at").nulls_last())
//!     .paginate(1, 50);
//! let sql = query.build_sql();
//! ```
//!
//! ## Django Heritage
//!
//! The stages mirror how the LabelKit platform composes its task queryset:
//! annotate, filter, order, slice. Field expressions are typed and lowered
//! per backend instead of being spelled as ORM lookup strings.

pub mod builder;
pub mod conditions;
pub mod dialect;
pub mod pagination;

pub use builder::{OrderBy, TaskQuery, TASKS_TABLE};
pub use conditions::{Comparator, Condition, FilterExpression, LogicalOperator, SqlValue};
pub use dialect::{BackendKind, PostgresDialect, SqlDialect, SqliteDialect};
pub use pagination::Pagination;
