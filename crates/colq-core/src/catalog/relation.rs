//! Relation definitions between tables.

use serde::{Deserialize, Serialize};

/// Cardinality of a relation, seen from the declaring table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// At most one target row references this row.
    HasOne,
    /// Any number of target rows reference this row.
    HasMany,
    /// This row references one target row.
    BelongsTo,
}

/// A named relation from one table to another.
///
/// Joining the relation matches `target.foreign_key = parent.local_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDef {
    /// Relation name, used in include paths.
    pub name: String,
    /// Target entity name.
    pub target: String,
    /// Column on the declaring table.
    pub local_key: String,
    /// Column on the target table.
    pub foreign_key: String,
    /// Relation cardinality.
    pub cardinality: Cardinality,
}

impl RelationDef {
    /// Target rows carry `foreign_key` pointing at this table's `id`.
    pub fn has_one(
        name: impl Into<String>,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            local_key: "id".into(),
            foreign_key: foreign_key.into(),
            cardinality: Cardinality::HasOne,
        }
    }

    /// Like [`RelationDef::has_one`] with many target rows.
    pub fn has_many(
        name: impl Into<String>,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            cardinality: Cardinality::HasMany,
            ..Self::has_one(name, target, foreign_key)
        }
    }

    /// This table carries `local_key` pointing at the target's `id`.
    pub fn belongs_to(
        name: impl Into<String>,
        target: impl Into<String>,
        local_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            local_key: local_key.into(),
            foreign_key: "id".into(),
            cardinality: Cardinality::BelongsTo,
        }
    }
}
