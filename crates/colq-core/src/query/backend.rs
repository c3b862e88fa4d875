//! Row sources that execute query plans.

use tracing::trace;

use super::plan::QueryPlan;
use super::sql::{render_count, render_select, SqlStatement};
use crate::error::BackendError;

/// Something that can produce rows for a compiled plan.
///
/// One handle is shared by concurrent callers, so implementations are `Sync`.
pub trait RowSource: Sync {
    /// Row representation returned to callers.
    type Row;

    /// Fetch the rows the plan selects, honoring offset and limit.
    fn fetch(&self, plan: &QueryPlan) -> Result<Vec<Self::Row>, BackendError>;

    /// Count the rows (or groups) the plan matches. Pagination is ignored.
    fn count(&self, plan: &QueryPlan) -> Result<u64, BackendError>;
}

/// Executes rendered SQL. Implemented by the caller over their driver.
pub trait SqlExecutor: Sync {
    type Row;

    fn query_rows(&self, statement: &SqlStatement) -> Result<Vec<Self::Row>, BackendError>;

    /// Run a statement returning a single count.
    fn query_count(&self, statement: &SqlStatement) -> Result<u64, BackendError>;
}

/// Renders plans as PostgreSQL and hands them to an executor.
#[derive(Debug, Clone)]
pub struct SqlBackend<E> {
    executor: E,
}

impl<E: SqlExecutor> SqlBackend<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }
}

impl<E: SqlExecutor> RowSource for SqlBackend<E> {
    type Row = E::Row;

    fn fetch(&self, plan: &QueryPlan) -> Result<Vec<Self::Row>, BackendError> {
        let statement = render_select(plan);
        trace!(sql = %statement.sql, params = statement.params.len(), "fetch");
        self.executor.query_rows(&statement)
    }

    fn count(&self, plan: &QueryPlan) -> Result<u64, BackendError> {
        let statement = render_count(plan);
        trace!(sql = %statement.sql, params = statement.params.len(), "count");
        self.executor.query_count(&statement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        statements: Mutex<Vec<SqlStatement>>,
    }

    impl SqlExecutor for Recorder {
        type Row = String;

        fn query_rows(&self, statement: &SqlStatement) -> Result<Vec<String>, BackendError> {
            self.statements.lock().push(statement.clone());
            Ok(vec!["row".into()])
        }

        fn query_count(&self, statement: &SqlStatement) -> Result<u64, BackendError> {
            self.statements.lock().push(statement.clone());
            Ok(42)
        }
    }

    #[test]
    fn test_sql_backend_renders() {
        let plan = QueryPlan {
            entity: "User".into(),
            table: "users".into(),
            select: vec![],
            columns: vec![],
            joins: vec![],
            filters: vec![],
            group_by: vec![],
            having: vec![],
            order_by: vec![],
            offset: None,
            limit: Some(1),
        };
        let backend = SqlBackend::new(Recorder::default());
        assert_eq!(backend.count(&plan).unwrap(), 42);
        assert_eq!(backend.fetch(&plan).unwrap(), vec!["row".to_string()]);

        let statements = backend.executor().statements.lock();
        assert_eq!(statements[0].sql, r#"SELECT COUNT(*) FROM "users""#);
        assert_eq!(statements[1].sql, r#"SELECT "users".* FROM "users" LIMIT 1"#);
    }
}
