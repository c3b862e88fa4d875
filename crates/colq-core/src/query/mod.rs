//! Query compilation and execution.
//!
//! - [`compiler`] turns a `CollectionQuery` into a [`QueryPlan`]
//! - [`sql`] renders plans as PostgreSQL
//! - [`backend`] defines [`RowSource`] and the SQL-backed implementation
//! - [`memory`] evaluates plans over in-memory JSON rows
//! - [`executor`] ties compilation, counting and fetching together

pub mod backend;
pub mod compiler;
pub mod executor;
pub mod memory;
pub mod operand;
pub mod plan;
pub mod sql;

pub use backend::{RowSource, SqlBackend, SqlExecutor};
pub use compiler::{CompileOptions, QueryCompiler};
pub use executor::CollectionExecutor;
pub use memory::MemoryStore;
pub use operand::Operand;
pub use plan::{
    ColumnRef, CompareOp, Expr, Join, Predicate, PredicateGroup, QueryPlan, Quantifier, SortKey,
};
pub use sql::{render_count, render_select, SqlStatement};
