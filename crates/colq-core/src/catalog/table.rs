//! Table and column descriptors.

use serde::{Deserialize, Serialize};

use super::relation::RelationDef;

/// Storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Bool,
    Int,
    Float,
    Text,
    Uuid,
    Timestamp,
    /// JSON document (`jsonb`).
    Json,
    /// Array column.
    Array,
}

impl ColumnType {
    /// Whether JSON path and containment accessors apply.
    pub fn is_document(&self) -> bool {
        matches!(self, ColumnType::Json | ColumnType::Array)
    }

    /// Lowercase type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Bool => "bool",
            ColumnType::Int => "int",
            ColumnType::Float => "float",
            ColumnType::Text => "text",
            ColumnType::Uuid => "uuid",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Json => "json",
            ColumnType::Array => "array",
        }
    }
}

/// A column of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
    #[serde(default)]
    pub nullable: bool,
}

impl ColumnDef {
    /// Create a non-nullable column.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: false,
        }
    }

    /// Mark the column nullable.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// Descriptor of one queryable table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDef {
    /// Entity name used by callers.
    pub entity: String,
    /// Physical table name.
    pub table: String,
    pub columns: Vec<ColumnDef>,
    #[serde(default)]
    pub relations: Vec<RelationDef>,
    /// Deletion timestamp column, when rows are soft-deleted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soft_delete: Option<String>,
}

impl TableDef {
    /// Create a table descriptor with no columns.
    pub fn new(entity: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            table: table.into(),
            columns: Vec::new(),
            relations: Vec::new(),
            soft_delete: None,
        }
    }

    /// Add a column.
    pub fn with_column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    /// Add a relation.
    pub fn with_relation(mut self, relation: RelationDef) -> Self {
        self.relations.push(relation);
        self
    }

    /// Declare a nullable timestamp column as the soft-delete marker.
    pub fn with_soft_delete(mut self, column: impl Into<String>) -> Self {
        let column = column.into();
        if self.column(&column).is_none() {
            self.columns
                .push(ColumnDef::new(column.clone(), ColumnType::Timestamp).nullable());
        }
        self.soft_delete = Some(column);
        self
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Look up a relation by name.
    pub fn relation(&self, name: &str) -> Option<&RelationDef> {
        self.relations.iter().find(|r| r.name == name)
    }

    /// Column names in declaration order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}
