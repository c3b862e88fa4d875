//! Compilation and execution of collection queries.
//!
//! A [`Catalog`] describes the queryable tables. [`QueryCompiler`] resolves a
//! [`CollectionQuery`](colq_proto::CollectionQuery) against it into a
//! [`QueryPlan`], which a [`RowSource`] executes. [`CollectionExecutor`]
//! combines the two and returns totals with the requested page.

pub mod catalog;
pub mod error;
pub mod query;

pub use catalog::{
    Cardinality, Catalog, CatalogBuilder, ColumnDef, ColumnType, Module, RelationDef, TableDef,
};
pub use error::{BackendError, CatalogError, Error, Result};
pub use query::{
    CollectionExecutor, CompileOptions, MemoryStore, QueryCompiler, QueryPlan, RowSource,
    SqlBackend, SqlExecutor, SqlStatement,
};
