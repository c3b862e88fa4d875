//! Runs collection queries: compile, count, fetch.

use colq_proto::{CollectionQuery, CollectionResult, Page, Where};
use tracing::{debug, instrument};

use super::backend::RowSource;
use super::compiler::{CompileOptions, QueryCompiler};
use crate::catalog::Catalog;
use crate::error::{Error, Result};

/// Executes collection queries against a row source.
pub struct CollectionExecutor<'a, B: RowSource> {
    compiler: QueryCompiler<'a>,
    backend: &'a B,
}

impl<'a, B: RowSource> CollectionExecutor<'a, B> {
    pub fn new(catalog: &'a Catalog, backend: &'a B) -> Self {
        Self {
            compiler: QueryCompiler::new(catalog),
            backend,
        }
    }

    /// Run `query` with default scoping (soft-deleted rows hidden).
    pub fn find(&self, entity: &str, query: &CollectionQuery) -> Result<CollectionResult<B::Row>> {
        self.find_with(entity, query, CompileOptions::default())
    }

    /// Run `query` with explicit compile options.
    ///
    /// The total is counted before rows are fetched; a failed count aborts
    /// the fetch. Count-only queries never fetch.
    #[instrument(skip(self, query), fields(count_only = query.is_count_only()))]
    pub fn find_with(
        &self,
        entity: &str,
        query: &CollectionQuery,
        options: CompileOptions,
    ) -> Result<CollectionResult<B::Row>> {
        let plan = self.compiler.compile(entity, query, options)?;
        let total = self.backend.count(&plan.without_pagination())?;

        if query.is_count_only() {
            debug!(total, "count-only query");
            return Ok(CollectionResult::count_only(total));
        }

        let items = self.backend.fetch(&plan)?;
        debug!(total, fetched = items.len(), "collection query");
        Ok(CollectionResult::new(total, items))
    }

    /// Run `query` and attach page metadata.
    pub fn find_page(&self, entity: &str, query: &CollectionQuery) -> Result<Page<B::Row>> {
        self.find_page_with(entity, query, CompileOptions::default())
    }

    /// [`find_page`](Self::find_page) with explicit compile options.
    pub fn find_page_with(
        &self,
        entity: &str,
        query: &CollectionQuery,
        options: CompileOptions,
    ) -> Result<Page<B::Row>> {
        let result = self.find_with(entity, query, options)?;
        Ok(Page::from_result(result, query.take, query.skip))
    }

    /// List only soft-deleted rows.
    pub fn find_archived(&self, entity: &str, query: &CollectionQuery) -> Result<Page<B::Row>> {
        let table = self
            .compiler
            .catalog()
            .table(entity)
            .ok_or_else(|| Error::UnknownEntity(entity.to_string()))?;
        let column = table
            .soft_delete
            .clone()
            .ok_or_else(|| Error::NotSoftDeletable(entity.to_string()))?;

        let archived = query.clone().filter(Where::is_not_null(column));
        let result = self.find_with(entity, &archived, CompileOptions::with_deleted())?;
        Ok(Page::from_result(result, query.take, query.skip))
    }
}
