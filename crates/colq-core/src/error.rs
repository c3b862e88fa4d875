//! Core error types.

use thiserror::Error;

/// Errors raised while compiling or executing a collection query.
#[derive(Debug, Error)]
pub enum Error {
    /// Protocol error (validation or decoding).
    #[error(transparent)]
    Protocol(#[from] colq_proto::Error),

    /// Catalog construction error.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// The entity is not registered in the catalog.
    #[error("unknown entity '{0}'")]
    UnknownEntity(String),

    /// A column reference does not exist on the resolved table.
    #[error("unknown column '{column}' on table '{table}'")]
    UnknownColumn { table: String, column: String },

    /// An include path names a relation the entity does not declare.
    #[error("entity '{entity}' has no relation '{relation}'")]
    UnknownRelation { entity: String, relation: String },

    /// A relation-qualified column references a relation the query does not join.
    #[error("relation '{relation}' is referenced but not included")]
    RelationNotJoined { relation: String },

    /// A JSON path or containment accessor was applied to a non-document column.
    #[error("column '{column}' does not support {accessor}")]
    InvalidAccessor { column: String, accessor: String },

    /// A filter value cannot be bound for its operator.
    #[error("invalid value for '{column}' with operator {operator}: {reason}")]
    InvalidValue {
        column: String,
        operator: String,
        reason: String,
    },

    /// HAVING clauses filter groups, so they need a GROUP BY.
    #[error("having requires at least one group_by column")]
    HavingWithoutGroupBy,

    /// Archived lookups need a soft-delete column.
    #[error("entity '{0}' is not soft-deletable")]
    NotSoftDeletable(String),

    /// Backend failure.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

impl From<colq_proto::ValidationError> for Error {
    fn from(err: colq_proto::ValidationError) -> Self {
        Error::Protocol(err.into())
    }
}

/// Catalog registration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// A module with this name is already registered.
    #[error("module '{0}' is already registered")]
    DuplicateModule(String),

    /// Two tables claim the same entity name.
    #[error("entity '{entity}' from module '{module}' is already registered")]
    DuplicateEntity { entity: String, module: String },

    /// Two entities share a table name.
    #[error("table '{0}' is registered by more than one entity")]
    DuplicateTable(String),

    /// A relation points at an entity that is not registered.
    #[error("relation '{entity}.{relation}' targets unknown entity '{target}'")]
    UnknownTarget {
        entity: String,
        relation: String,
        target: String,
    },

    /// A relation key is not a column of its table.
    #[error("relation '{entity}.{relation}' uses unknown key column '{column}'")]
    UnknownKey {
        entity: String,
        relation: String,
        column: String,
    },

    /// The soft-delete column is not declared.
    #[error("entity '{entity}' soft-delete column '{column}' is not declared")]
    UnknownSoftDeleteColumn { entity: String, column: String },
}

/// Errors raised by a row source.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    /// The backend has no rows for this table.
    #[error("table '{0}' does not exist")]
    UnknownTable(String),

    /// A parameter could not be converted to the column's type.
    #[error("cannot compare '{value}' with {expected} value")]
    Coercion { value: String, expected: String },

    /// The backend does not implement this operator.
    #[error("operator '{0}' is not supported by this backend")]
    UnsupportedOperator(String),

    /// Malformed row data.
    #[error("invalid row data: {0}")]
    InvalidData(String),

    /// Driver or execution failure.
    #[error("execution failed: {0}")]
    Execution(String),
}

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
