//! Collection query model.

use crate::operator::FilterOperator;
use rkyv::{Archive, Deserialize, Serialize};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

/// Sort direction.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Archive,
    Serialize,
    Deserialize,
    SerdeSerialize,
    SerdeDeserialize,
)]
pub enum SortDirection {
    /// Ascending order.
    #[serde(rename = "ASC")]
    Asc,
    /// Descending order.
    #[serde(rename = "DESC")]
    Desc,
}

impl SortDirection {
    /// Wire and SQL keyword.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    /// Parse `ASC`/`DESC`, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("ASC") {
            Some(SortDirection::Asc)
        } else if s.eq_ignore_ascii_case("DESC") {
            Some(SortDirection::Desc)
        } else {
            None
        }
    }
}

/// Placement of NULL values in an ordering.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Archive,
    Serialize,
    Deserialize,
    SerdeSerialize,
    SerdeDeserialize,
)]
pub enum NullsOrder {
    /// NULLs sort before every value.
    #[serde(rename = "NULLS_FIRST")]
    First,
    /// NULLs sort after every value.
    #[serde(rename = "NULLS_LAST")]
    Last,
}

impl NullsOrder {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            NullsOrder::First => "NULLS_FIRST",
            NullsOrder::Last => "NULLS_LAST",
        }
    }

    /// Parse `NULLS_FIRST`/`NULLS_LAST`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NULLS_FIRST" => Some(NullsOrder::First),
            "NULLS_LAST" => Some(NullsOrder::Last),
            _ => None,
        }
    }
}

/// A single filter predicate.
///
/// Values always travel as strings; the compiler parses them according to
/// the operator (comma-split for `IN`/`BETWEEN`, wildcards for `LIKE`).
/// The column may carry a relation prefix (`profile.first_name`), a JSON
/// accessor (`meta->>key`, `meta->nested->>key`) or a containment marker
/// (`tags@>`).
#[derive(
    Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize,
)]
pub struct Where {
    /// Column reference.
    pub column: String,
    /// Comparison operator.
    pub operator: FilterOperator,
    /// Operand, parsed per operator.
    #[serde(default)]
    pub value: String,
}

impl Where {
    /// Create a predicate.
    pub fn new(
        column: impl Into<String>,
        operator: impl Into<FilterOperator>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            column: column.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }

    /// `column = value`
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(column, FilterOperator::Eq, value)
    }

    /// `column IS NULL`
    pub fn is_null(column: impl Into<String>) -> Self {
        Self::new(column, FilterOperator::IsNull, "")
    }

    /// `column IS NOT NULL`
    pub fn is_not_null(column: impl Into<String>) -> Self {
        Self::new(column, FilterOperator::IsNotNull, "")
    }
}

/// One sort key.
#[derive(
    Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize,
)]
pub struct Order {
    /// Column to sort by, optionally relation-qualified.
    pub column: String,
    /// Direction; ascending when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<SortDirection>,
    /// NULL placement; backend default when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nulls: Option<NullsOrder>,
}

impl Order {
    /// Order by a column with the default direction.
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: None,
            nulls: None,
        }
    }

    /// Ascending order.
    pub fn asc(column: impl Into<String>) -> Self {
        Self::new(column).with_direction(SortDirection::Asc)
    }

    /// Descending order.
    pub fn desc(column: impl Into<String>) -> Self {
        Self::new(column).with_direction(SortDirection::Desc)
    }

    /// Set the direction.
    pub fn with_direction(mut self, direction: SortDirection) -> Self {
        self.direction = Some(direction);
        self
    }

    /// Set NULL placement.
    pub fn with_nulls(mut self, nulls: NullsOrder) -> Self {
        self.nulls = Some(nulls);
        self
    }

    /// Effective direction.
    pub fn direction_or_default(&self) -> SortDirection {
        self.direction.unwrap_or(SortDirection::Asc)
    }
}

/// A relation to join with a restricted projection.
#[derive(
    Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize,
)]
pub struct IncludeSelect {
    /// Relation name.
    pub name: String,
    /// Columns of the relation to project.
    pub select: Vec<String>,
}

impl IncludeSelect {
    /// Create an include with a projection.
    pub fn new(name: impl Into<String>, select: Vec<String>) -> Self {
        Self {
            name: name.into(),
            select,
        }
    }
}

/// A declarative description of a collection fetch.
///
/// `where_` and `having` are lists of OR-groups: clauses inside a group
/// are ORed, groups are ANDed. `take`/`skip` distinguish "unset" from zero.
#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Eq,
    Archive,
    Serialize,
    Deserialize,
    SerdeSerialize,
    SerdeDeserialize,
)]
#[serde(default)]
pub struct CollectionQuery {
    /// Columns to return; empty means all.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub select: Vec<String>,
    /// Row filter as AND of OR-groups.
    #[serde(rename = "where", skip_serializing_if = "Vec::is_empty")]
    pub where_: Vec<Vec<Where>>,
    /// Maximum number of rows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take: Option<u64>,
    /// Number of rows to skip.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<u64>,
    /// Sort keys, first is primary.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<Order>,
    /// Relation paths to eager-load (`profile`, `roles.permissions`).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub includes: Vec<String>,
    /// Relations to eager-load with a column subset.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include_and_select: Vec<IncludeSelect>,
    /// Grouping columns.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub group_by: Vec<String>,
    /// Group filter as AND of OR-groups.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub having: Vec<Vec<Where>>,
    /// Return only the number of matching rows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<bool>,
}

impl CollectionQuery {
    /// Create an empty query (all columns, no filter, no bounds).
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column to the projection.
    pub fn select(mut self, column: impl Into<String>) -> Self {
        self.select.push(column.into());
        self
    }

    /// Add a single-clause group to the row filter.
    pub fn filter(mut self, clause: Where) -> Self {
        self.where_.push(vec![clause]);
        self
    }

    /// Add an OR-group to the row filter.
    pub fn where_group(mut self, group: Vec<Where>) -> Self {
        self.where_.push(group);
        self
    }

    /// Add an OR-group to the group filter.
    pub fn having_group(mut self, group: Vec<Where>) -> Self {
        self.having.push(group);
        self
    }

    /// Add a sort key.
    pub fn order(mut self, order: Order) -> Self {
        self.order_by.push(order);
        self
    }

    /// Add a grouping column.
    pub fn group(mut self, column: impl Into<String>) -> Self {
        self.group_by.push(column.into());
        self
    }

    /// Eager-load a relation path.
    pub fn include(mut self, path: impl Into<String>) -> Self {
        self.includes.push(path.into());
        self
    }

    /// Eager-load a relation with a projection.
    pub fn include_select(mut self, include: IncludeSelect) -> Self {
        self.include_and_select.push(include);
        self
    }

    /// Limit the number of rows.
    pub fn take(mut self, take: u64) -> Self {
        self.take = Some(take);
        self
    }

    /// Skip rows.
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Request only the total.
    pub fn count_only(mut self) -> Self {
        self.count = Some(true);
        self
    }

    /// Whether count-only mode is requested.
    pub fn is_count_only(&self) -> bool {
        self.count == Some(true)
    }

    /// Drop empty OR-groups from both `where_` and `having`.
    pub fn remove_empty_groups(mut self) -> Self {
        self.where_.retain(|group| !group.is_empty());
        self.having.retain(|group| !group.is_empty());
        self
    }

    /// Drop every where/having clause on `column`.
    ///
    /// Groups left empty are kept; [`remove_empty_groups`](Self::remove_empty_groups)
    /// strips them.
    pub fn remove_filter(mut self, column: &str) -> Self {
        for group in self.where_.iter_mut().chain(self.having.iter_mut()) {
            group.retain(|clause| clause.column != column);
        }
        self
    }

    /// Every relation the query joins, in join order.
    ///
    /// Nested paths yield their intermediate relations first.
    pub fn joined_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = Vec::new();
        let explicit = self
            .includes
            .iter()
            .map(String::as_str)
            .chain(self.include_and_select.iter().map(|i| i.name.as_str()));
        for path in explicit {
            let mut prefix = String::new();
            for segment in path.split('.') {
                if !prefix.is_empty() {
                    prefix.push('.');
                }
                prefix.push_str(segment);
                if !paths.contains(&prefix) {
                    paths.push(prefix.clone());
                }
            }
        }
        paths
    }
}
