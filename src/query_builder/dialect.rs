//! # SQL Dialect Capabilities
//!
//! The handful of SQL fragments the data manager needs that differ between
//! storage engines. PostgreSQL is the production backend; SQLite serves
//! lightweight installs. One implementation per backend, selected once from
//! configuration at startup and carried by the query builder from there.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Storage backend the engine lowers SQL for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Postgres,
    Sqlite,
}

impl BackendKind {
    /// The dialect implementation for this backend.
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            BackendKind::Postgres => &PostgresDialect,
            BackendKind::Sqlite => &SqliteDialect,
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(BackendKind::Postgres),
            "sqlite" | "sqlite3" => Ok(BackendKind::Sqlite),
            other => Err(format!("unsupported backend: {other}")),
        }
    }
}

/// Engine-specific SQL lowering.
///
/// Everything else the builder emits is portable; these five operations are
/// not. Conditions and annotators call through this trait instead of
/// branching on the active engine.
pub trait SqlDialect: Send + Sync + std::fmt::Debug {
    /// Extract a JSON object key from `column` as text.
    fn json_extract_text(&self, column: &str, key: &str) -> String;

    /// Extract a JSON object key from `column` and cast it to a float.
    fn cast_json_float(&self, column: &str, key: &str) -> String;

    /// Aggregate `expr` across child rows: native array aggregation, or the
    /// engine's delimited-concat equivalent.
    fn array_agg(&self, expr: &str, distinct: bool) -> String;

    /// Whether [`SqlDialect::array_agg`] produces a true array type.
    ///
    /// Engines that fall back to delimited text aggregate to NULL when no
    /// child rows exist and need an explicit empty-string default.
    fn has_native_array_agg(&self) -> bool;

    /// Case-insensitive substring match of `needle` against `field`.
    fn contains(&self, field: &str, needle: &str) -> String;

    /// Match `field` against a POSIX-compatible regex `pattern`.
    fn regex_match(&self, field: &str, pattern: &str) -> String;
}

#[derive(Debug, Clone, Copy)]
pub struct PostgresDialect;

impl SqlDialect for PostgresDialect {
    fn json_extract_text(&self, column: &str, key: &str) -> String {
        format!("{column} ->> '{}'", escape_string(key))
    }

    fn cast_json_float(&self, column: &str, key: &str) -> String {
        format!(
            "CAST({} AS DOUBLE PRECISION)",
            self.json_extract_text(column, key)
        )
    }

    fn array_agg(&self, expr: &str, distinct: bool) -> String {
        if distinct {
            format!("ARRAY_AGG(DISTINCT {expr})")
        } else {
            format!("ARRAY_AGG({expr})")
        }
    }

    fn has_native_array_agg(&self) -> bool {
        true
    }

    fn contains(&self, field: &str, needle: &str) -> String {
        format!("{field} ILIKE '%{}%'", escape_like(needle))
    }

    fn regex_match(&self, field: &str, pattern: &str) -> String {
        format!("{field} ~ '{}'", escape_string(pattern))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SqliteDialect;

impl SqlDialect for SqliteDialect {
    fn json_extract_text(&self, column: &str, key: &str) -> String {
        format!("json_extract({column}, '$.\"{}\"')", escape_string(key))
    }

    fn cast_json_float(&self, column: &str, key: &str) -> String {
        format!("CAST({} AS REAL)", self.json_extract_text(column, key))
    }

    fn array_agg(&self, expr: &str, distinct: bool) -> String {
        if distinct {
            format!("GROUP_CONCAT(DISTINCT {expr})")
        } else {
            format!("GROUP_CONCAT({expr})")
        }
    }

    fn has_native_array_agg(&self) -> bool {
        false
    }

    // SQLite LIKE is already case-insensitive for ASCII, matching the
    // icontains behavior the frontend expects on small installs.
    fn contains(&self, field: &str, needle: &str) -> String {
        format!("{field} LIKE '%{}%' ESCAPE '\\'", escape_like(needle))
    }

    // SQLite has no built-in REGEXP operator; the host registers a function
    // for it the same way Django's backend does.
    fn regex_match(&self, field: &str, pattern: &str) -> String {
        format!("{field} REGEXP '{}'", escape_string(pattern))
    }
}

fn escape_string(s: &str) -> String {
    s.replace('\'', "''")
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
        .replace('\'', "''")
}
