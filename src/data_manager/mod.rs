//! # Data Manager
//!
//! Query construction for the data manager grid: filters, ordering,
//! computed columns and row selection, composed into one executable task
//! query.
//!
//! ## Overview
//!
//! A request arrives as [`PrepareParams`](crate::prepare_params::PrepareParams)
//! and flows through a fixed pipeline owned by
//! [`PreparedTaskQueries`](prepared::PreparedTaskQueries): counters first,
//! then the computed columns the request actually touches, then project
//! scope, filters, ordering and the explicit row selection. Every stage is
//! pure query construction; nothing executes until the caller fetches.
//!
//! ## Key Components
//!
//! - [`fields`] - field path resolution and required-annotation analysis
//! - [`coerce`] - typed coercion of wire values into SQL literals
//! - [`filters`] - the filter panel to WHERE clause translation
//! - [`ordering`] - single-key ordering with nulls-last semantics
//! - [`annotations`] - the computed column registry and its built-ins
//! - [`prepared`] - the request orchestrator

pub mod annotations;
pub mod coerce;
pub mod fields;
pub mod filters;
pub mod ordering;
pub mod prepared;

pub use annotations::{AnnotationFn, AnnotationRegistry, COUNTER_FIELDS};
pub use coerce::{cast_bool, cast_value, Coerced, DATETIME_FORMAT};
pub use fields::{
    fields_for_annotation, resolve_field_path, ProjectSettings, ResolvedField, DATA_PREFIX,
};
pub use filters::apply_filters;
pub use ordering::{apply_ordering, ORDERING_FIELD_ALIAS};
pub use prepared::PreparedTaskQueries;
