//! Table descriptors and the catalog that resolves entity names to them.
//!
//! A [`Module`] groups the tables one feature area contributes. Modules are
//! registered in order on a [`CatalogBuilder`]; [`CatalogBuilder::build`]
//! checks cross-table references and freezes the result.

mod registry;
mod relation;
mod table;

pub use registry::{Catalog, CatalogBuilder, Module};
pub use relation::{Cardinality, RelationDef};
pub use table::{ColumnDef, ColumnType, TableDef};
