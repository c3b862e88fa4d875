//! Module registration and the frozen catalog.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::table::TableDef;
use crate::error::CatalogError;

/// A named set of table descriptors contributed by one feature area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub tables: Vec<TableDef>,
}

impl Module {
    /// Create an empty module.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: Vec::new(),
        }
    }

    /// Add a table descriptor.
    pub fn with_table(mut self, table: TableDef) -> Self {
        self.tables.push(table);
        self
    }
}

/// Collects modules in registration order.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    modules: Vec<Module>,
    entities: HashSet<String>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module.
    ///
    /// Fails when the module name or one of its entity names is taken.
    pub fn register(mut self, module: Module) -> Result<Self, CatalogError> {
        if self.modules.iter().any(|m| m.name == module.name) {
            return Err(CatalogError::DuplicateModule(module.name));
        }
        let mut seen = HashSet::new();
        for table in &module.tables {
            if self.entities.contains(&table.entity) || !seen.insert(table.entity.clone()) {
                return Err(CatalogError::DuplicateEntity {
                    entity: table.entity.clone(),
                    module: module.name.clone(),
                });
            }
        }
        debug!(module = %module.name, tables = module.tables.len(), "registered module");
        self.entities.extend(seen);
        self.modules.push(module);
        Ok(self)
    }

    /// Validate cross-table references and freeze the catalog.
    pub fn build(self) -> Result<Catalog, CatalogError> {
        let mut tables = HashMap::new();
        let mut by_table = HashMap::new();
        let mut modules = Vec::with_capacity(self.modules.len());

        for module in self.modules {
            let mut entities = Vec::with_capacity(module.tables.len());
            for table in module.tables {
                if by_table
                    .insert(table.table.clone(), table.entity.clone())
                    .is_some()
                {
                    return Err(CatalogError::DuplicateTable(table.table));
                }
                entities.push(table.entity.clone());
                tables.insert(table.entity.clone(), table);
            }
            modules.push((module.name, entities));
        }

        for table in tables.values() {
            check_table(table, &tables)?;
        }

        Ok(Catalog {
            tables,
            by_table,
            modules,
        })
    }
}

fn check_table(table: &TableDef, tables: &HashMap<String, TableDef>) -> Result<(), CatalogError> {
    if let Some(column) = &table.soft_delete {
        if table.column(column).is_none() {
            return Err(CatalogError::UnknownSoftDeleteColumn {
                entity: table.entity.clone(),
                column: column.clone(),
            });
        }
    }

    for relation in &table.relations {
        let target = tables
            .get(&relation.target)
            .ok_or_else(|| CatalogError::UnknownTarget {
                entity: table.entity.clone(),
                relation: relation.name.clone(),
                target: relation.target.clone(),
            })?;
        let unknown_key = |column: &str| CatalogError::UnknownKey {
            entity: table.entity.clone(),
            relation: relation.name.clone(),
            column: column.to_string(),
        };
        if table.column(&relation.local_key).is_none() {
            return Err(unknown_key(&relation.local_key));
        }
        if target.column(&relation.foreign_key).is_none() {
            return Err(unknown_key(&relation.foreign_key));
        }
    }
    Ok(())
}

/// Immutable lookup of table descriptors by entity name.
#[derive(Debug, Clone)]
pub struct Catalog {
    tables: HashMap<String, TableDef>,
    by_table: HashMap<String, String>,
    modules: Vec<(String, Vec<String>)>,
}

impl Catalog {
    /// Build a catalog from a single module.
    pub fn from_module(module: Module) -> Result<Self, CatalogError> {
        CatalogBuilder::new().register(module)?.build()
    }

    /// Resolve an entity name, or a physical table name, to its descriptor.
    pub fn table(&self, name: &str) -> Option<&TableDef> {
        self.tables
            .get(name)
            .or_else(|| self.by_table.get(name).and_then(|e| self.tables.get(e)))
    }

    /// Registered module names in registration order.
    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(|(name, _)| name.as_str())
    }

    /// Tables contributed by a module, in declaration order.
    pub fn module_tables(&self, module: &str) -> Option<Vec<&TableDef>> {
        self.modules
            .iter()
            .find(|(name, _)| name == module)
            .map(|(_, entities)| {
                entities
                    .iter()
                    .filter_map(|e| self.tables.get(e))
                    .collect()
            })
    }

    /// All entity names, grouped by module in registration order.
    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.modules
            .iter()
            .flat_map(|(_, entities)| entities.iter().map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ColumnDef, ColumnType, RelationDef};

    fn users() -> TableDef {
        TableDef::new("User", "users")
            .with_column(ColumnDef::new("id", ColumnType::Int))
            .with_column(ColumnDef::new("name", ColumnType::Text))
            .with_relation(RelationDef::has_many("posts", "Post", "user_id"))
    }

    fn posts() -> TableDef {
        TableDef::new("Post", "posts")
            .with_column(ColumnDef::new("id", ColumnType::Int))
            .with_column(ColumnDef::new("user_id", ColumnType::Int))
    }

    #[test]
    fn test_build_and_lookup() {
        let catalog = CatalogBuilder::new()
            .register(Module::new("accounts").with_table(users()))
            .unwrap()
            .register(Module::new("blog").with_table(posts()))
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(catalog.table("User").unwrap().table, "users");
        assert_eq!(catalog.table("posts").unwrap().entity, "Post");
        assert!(catalog.table("Comment").is_none());
        assert_eq!(catalog.modules().collect::<Vec<_>>(), vec!["accounts", "blog"]);
        assert_eq!(catalog.entities().collect::<Vec<_>>(), vec!["User", "Post"]);
        assert_eq!(catalog.module_tables("blog").unwrap()[0].entity, "Post");
        assert!(catalog.module_tables("billing").is_none());
    }

    #[test]
    fn test_duplicate_module() {
        let err = CatalogBuilder::new()
            .register(Module::new("accounts").with_table(posts()))
            .unwrap()
            .register(Module::new("accounts"))
            .unwrap_err();
        assert_eq!(err, CatalogError::DuplicateModule("accounts".into()));
    }

    #[test]
    fn test_duplicate_entity() {
        let err = CatalogBuilder::new()
            .register(Module::new("a").with_table(posts()))
            .unwrap()
            .register(Module::new("b").with_table(posts()))
            .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateEntity { ref entity, .. } if entity == "Post"));

        let err = CatalogBuilder::new()
            .register(Module::new("a").with_table(posts()).with_table(posts()))
            .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateEntity { .. }));
    }

    #[test]
    fn test_unknown_relation_target() {
        let err = Catalog::from_module(Module::new("accounts").with_table(users())).unwrap_err();
        assert_eq!(
            err,
            CatalogError::UnknownTarget {
                entity: "User".into(),
                relation: "posts".into(),
                target: "Post".into(),
            }
        );
    }

    #[test]
    fn test_unknown_relation_key() {
        let orphan = TableDef::new("Post", "posts").with_column(ColumnDef::new("id", ColumnType::Int));
        let err = Catalog::from_module(Module::new("m").with_table(users()).with_table(orphan))
            .unwrap_err();
        assert!(matches!(err, CatalogError::UnknownKey { ref column, .. } if column == "user_id"));
    }

    #[test]
    fn test_duplicate_table_name() {
        let shadow = TableDef::new("Article", "posts").with_column(ColumnDef::new("id", ColumnType::Int));
        let err = Catalog::from_module(Module::new("m").with_table(posts()).with_table(shadow))
            .unwrap_err();
        assert_eq!(err, CatalogError::DuplicateTable("posts".into()));
    }
}
