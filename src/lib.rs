#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # LabelKit Core Rust
//!
//! High-performance Rust implementation of the data manager query engine.
//!
//! ## Overview
//!
//! LabelKit Core Rust is designed to complement the existing Django **LabelKit**
//! annotation platform, leveraging Rust's memory safety and performance
//! characteristics to handle the hot path of every data manager request:
//! translating filter panels, ordering choices and row selections into
//! executable SQL over millions of task rows.
//!
//! ## Architecture
//!
//! The core implements a **prepared query pipeline**: requests arrive as the
//! wire-level [`prepare_params::PrepareParams`] contract, pass through field
//! resolution, value coercion, lazy computed-column annotation and predicate
//! construction, and come out as a single composable [`query_builder::TaskQuery`].
//! Query construction is pure; nothing touches the database until the caller
//! fetches.
//!
//! ## Key Features
//!
//! - **Full Filter Grammar**: All twelve wire operators, flat AND/OR
//!   conjunction, typed value coercion with strict failure on bad input
//! - **JSON Field Access**: Filters and ordering over arbitrary keys of the
//!   task `data` payload, including the undefined-bucket collapse
//! - **Lazy Computed Columns**: A thread-safe annotation registry attaches
//!   correlated subqueries only for the fields a request touches
//! - **Fail-Safe Regex**: Broken patterns collapse the query to the empty
//!   set instead of erroring, keystroke by keystroke
//! - **Dual Backends**: PostgreSQL in production, SQLite for lightweight
//!   installs, behind one dialect seam
//!
//! ## Module Organization
//!
//! - [`prepare_params`] - wire contract for one data manager request
//! - [`data_manager`] - filters, ordering, computed columns, orchestration
//! - [`query_builder`] - composable SQL construction and execution
//! - [`models`] - the task row model
//! - [`config`] - configuration management
//! - [`error`] - structured error handling
//! - [`logging`] - structured logging initialization
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use labelkit_core::data_manager::PreparedTaskQueries;
//! use labelkit_core::models::Task;
//! use labelkit_core::prepare_params::PrepareParams;
//! use sqlx::PgPool;
//!
//! # async fn example(pool: &PgPool) -> Result<(), Box<dyn std::error::Error>> {
//! let queries = PreparedTaskQueries::with_defaults();
//!
//! let params: PrepareParams = serde_json::from_str(
//!     r#"{"project": 1, "ordering": ["tasks:-completed_at"]}"#,
//! )?;
//! let settings = queries.sample_project_settings(pool, params.project).await?;
//! let tasks: Vec<Task> = queries.all(&params, settings)?.fetch_all(pool).await?;
//!
//! println!("prepared {} tasks", tasks.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Integration
//!
//! This Rust core serves as the query construction engine the platform calls
//! into. The Django application keeps the web interface, permissions and
//! project management; this core handles the performance-critical query
//! pipeline behind the data manager grid.

pub mod config;
pub mod data_manager;
pub mod error;
pub mod logging;
pub mod models;
pub mod prepare_params;
pub mod query_builder;

pub use config::DataManagerConfig;
pub use data_manager::{AnnotationRegistry, PreparedTaskQueries, ProjectSettings};
pub use error::{DataManagerError, DataManagerResult};
pub use models::Task;
pub use prepare_params::{FilterItem, Filters, Operator, PrepareParams, SelectedItems};
pub use query_builder::{BackendKind, Pagination, TaskQuery};
