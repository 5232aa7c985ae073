use sqlx::{PgPool, Row};

use super::conditions::{Condition, FilterExpression};
use super::dialect::{BackendKind, SqlDialect};
use super::pagination::Pagination;

/// Table the data manager reads from
pub const TASKS_TABLE: &str = "tasks";

/// Single ordering key with explicit null placement
#[derive(Debug, Clone)]
pub struct OrderBy {
    pub expr: String,
    pub ascending: bool,
    pub nulls_last: bool,
}

impl OrderBy {
    pub fn asc(expr: &str) -> Self {
        Self {
            expr: expr.to_string(),
            ascending: true,
            nulls_last: false,
        }
    }

    pub fn desc(expr: &str) -> Self {
        Self {
            expr: expr.to_string(),
            ascending: false,
            nulls_last: false,
        }
    }

    /// Sort missing values after present ones regardless of direction
    pub fn nulls_last(mut self) -> Self {
        self.nulls_last = true;
        self
    }

    pub fn to_sql(&self) -> String {
        let direction = if self.ascending { "ASC" } else { "DESC" };
        let nulls = if self.nulls_last { " NULLS LAST" } else { "" };
        format!("{} {}{}", self.expr, direction, nulls)
    }
}

/// Deferred task query assembled by the data manager
///
/// Collects every stage of one prepared query: computed-column annotations in
/// the SELECT list, filter expressions, a single ordering and pagination.
/// Nothing touches the database until one of the fetch methods runs, so a
/// built query can be paginated and re-executed without re-running the build.
#[derive(Debug, Clone)]
pub struct TaskQuery {
    base_table: String,
    select_base: String,
    dialect: &'static dyn SqlDialect,
    annotations: Vec<(String, String)>,
    where_clauses: Vec<FilterExpression>,
    ordering: Option<OrderBy>,
    pagination: Option<Pagination>,
    empty: bool,
}

impl TaskQuery {
    /// Create a new task query for the given backend
    pub fn new(backend: BackendKind) -> Self {
        Self {
            base_table: TASKS_TABLE.to_string(),
            select_base: format!("{TASKS_TABLE}.*"),
            dialect: backend.dialect(),
            annotations: Vec::new(),
            where_clauses: Vec::new(),
            ordering: None,
            pagination: None,
            empty: false,
        }
    }

    /// The dialect this query lowers SQL with
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        self.dialect
    }

    /// Attach a computed column under `alias`.
    ///
    /// Re-annotating an existing alias replaces its expression, so built-in
    /// registry entries can be overridden without duplicate SELECT columns.
    pub fn annotate(mut self, alias: &str, expression: &str) -> Self {
        self.annotations.retain(|(a, _)| a != alias);
        self.annotations
            .push((alias.to_string(), expression.to_string()));
        self
    }

    /// Whether `alias` is already annotated on this query
    pub fn has_annotation(&self, alias: &str) -> bool {
        self.annotations.iter().any(|(a, _)| a == alias)
    }

    /// The SQL expression behind an annotation alias.
    ///
    /// WHERE clauses cannot reference SELECT aliases, so predicates against
    /// computed columns inline the expression instead.
    pub fn annotation_expr(&self, alias: &str) -> Option<&str> {
        self.annotations
            .iter()
            .find(|(a, _)| a == alias)
            .map(|(_, e)| e.as_str())
    }

    /// Add a filter expression stage. Empty expressions are dropped.
    pub fn filter(mut self, expression: FilterExpression) -> Self {
        if !expression.is_empty() {
            self.where_clauses.push(expression);
        }
        self
    }

    /// Add a single condition as its own filter stage
    pub fn filter_condition(self, condition: Condition) -> Self {
        let mut expression = FilterExpression::new(super::LogicalOperator::And);
        expression.add(condition);
        self.filter(expression)
    }

    /// Set the ordering key, replacing any previous one
    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.ordering = Some(order);
        self
    }

    /// Switch the query to an always-empty result (`WHERE 1=0`)
    pub fn none(mut self) -> Self {
        self.empty = true;
        self
    }

    /// Whether this query was short-circuited to an empty result
    pub fn is_none(&self) -> bool {
        self.empty
    }

    /// Add pagination from a 1-indexed page number and page size
    pub fn paginate(mut self, page: u32, page_size: u32) -> Self {
        self.pagination = Some(Pagination::new(page, page_size));
        self
    }

    /// Add a prebuilt pagination stage
    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }

    /// Add LIMIT clause
    pub fn limit(mut self, limit: u32) -> Self {
        if let Some(ref mut pagination) = self.pagination {
            pagination.limit = Some(limit);
        } else {
            self.pagination = Some(Pagination::limit_only(limit));
        }
        self
    }

    /// Build the complete SQL query string
    pub fn build_sql(&self) -> String {
        let mut sql = String::new();

        // SELECT clause: full task rows plus annotated columns
        sql.push_str("SELECT ");
        sql.push_str(&self.select_base);
        for (alias, expression) in &self.annotations {
            sql.push_str(&format!(
                ", {} AS \"{}\"",
                expression,
                alias.replace('"', "\"\"")
            ));
        }

        // FROM clause
        sql.push_str(&format!(" FROM {}", self.base_table));

        // WHERE clauses
        if self.empty {
            sql.push_str(" WHERE 1=0");
        } else if !self.where_clauses.is_empty() {
            sql.push_str(" WHERE ");
            let where_parts: Vec<String> = self
                .where_clauses
                .iter()
                .map(|clause| clause.to_sql(self.dialect))
                .collect();
            sql.push_str(&where_parts.join(" AND "));
        }

        // ORDER BY
        if let Some(ref ordering) = self.ordering {
            sql.push_str(&format!(" ORDER BY {}", ordering.to_sql()));
        }

        // LIMIT/OFFSET
        if let Some(ref pagination) = self.pagination {
            sql.push_str(&pagination.to_sql());
        }

        sql
    }

    /// Execute the query and return all rows
    pub async fn fetch_all<T>(&self, pool: &PgPool) -> Result<Vec<T>, sqlx::Error>
    where
        T: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
    {
        let sql = self.build_sql();
        tracing::debug!(sql = %sql, "Executing prepared task query");
        sqlx::query_as::<_, T>(&sql).fetch_all(pool).await
    }

    /// Execute the query and return one row
    pub async fn fetch_one<T>(&self, pool: &PgPool) -> Result<T, sqlx::Error>
    where
        T: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
    {
        let sql = self.build_sql();
        sqlx::query_as::<_, T>(&sql).fetch_one(pool).await
    }

    /// Execute the query and return optional row
    pub async fn fetch_optional<T>(&self, pool: &PgPool) -> Result<Option<T>, sqlx::Error>
    where
        T: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
    {
        let sql = self.build_sql();
        sqlx::query_as::<_, T>(&sql).fetch_optional(pool).await
    }

    /// Execute count query over the filtered set, ignoring pagination
    pub async fn count(&self, pool: &PgPool) -> Result<i64, sqlx::Error> {
        let mut count_query = self.clone();
        count_query.select_base = "COUNT(*)".to_string();
        count_query.annotations.clear();
        count_query.ordering = None;
        count_query.pagination = None;

        let sql = count_query.build_sql();
        let row = sqlx::query(&sql).fetch_one(pool).await?;

        Ok(row.get::<i64, _>(0))
    }

    /// Check if any rows match
    pub async fn exists(&self, pool: &PgPool) -> Result<bool, sqlx::Error> {
        let count = self.clone().limit(1).count(pool).await?;
        Ok(count > 0)
    }

    /// Fetch one grid page and the unpaginated total concurrently.
    ///
    /// The data manager renders every page together with the overall task
    /// count, so both queries run against the pool at the same time.
    pub async fn fetch_page<T>(
        &self,
        pool: &PgPool,
        pagination: Pagination,
    ) -> Result<(Vec<T>, i64), sqlx::Error>
    where
        T: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
    {
        let paged = self.clone().with_pagination(pagination);
        let (rows, total) = futures::try_join!(paged.fetch_all(pool), self.count(pool))?;
        Ok((rows, total))
    }
}
