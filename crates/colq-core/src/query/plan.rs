//! Backend-neutral query plan.
//!
//! A [`QueryPlan`] is the compiled form of a collection query: every column
//! reference is resolved against the catalog and qualified by a table alias,
//! every operand is bound, and joins carry their keys. Backends interpret it
//! directly ([`MemoryStore`](super::MemoryStore)) or render it
//! ([`render_select`](super::sql::render_select)).

use colq_proto::{NullsOrder, SortDirection};

use crate::catalog::RelationDef;

/// A column qualified by the alias of the table it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

/// Left-hand side of a predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// A plain column.
    Column(ColumnRef),
    /// `column -> path[0] -> ... ->> key`: text extracted from a JSON document.
    JsonText {
        column: ColumnRef,
        path: Vec<String>,
        key: String,
    },
    /// `(expr)::jsonb`
    JsonCast(Box<Expr>),
    /// `COUNT(table.*)`
    CountAll { table: String },
    /// `COUNT(column)`
    Count(ColumnRef),
}

/// Binary comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "<>",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
        }
    }
}

/// `= ANY(..)` or `= ALL(..)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    Any,
    All,
}

impl Quantifier {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Quantifier::Any => "ANY",
            Quantifier::All => "ALL",
        }
    }
}

/// A single boolean condition with bound parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Compare {
        expr: Expr,
        op: CompareOp,
        value: String,
    },
    Like {
        expr: Expr,
        pattern: String,
        case_insensitive: bool,
    },
    Quantified {
        expr: Expr,
        quantifier: Quantifier,
        value: String,
    },
    /// JSON or array containment (`@>`).
    Contains { expr: Expr, value: String },
    Between {
        expr: Expr,
        low: String,
        high: String,
    },
    InList {
        expr: Expr,
        values: Vec<String>,
        negated: bool,
    },
    IsNull { expr: Expr, negated: bool },
    /// An operator passed through to the backend untouched.
    Raw {
        expr: Expr,
        operator: String,
        value: String,
    },
}

impl Predicate {
    /// The left-hand side expression.
    pub fn expr(&self) -> &Expr {
        match self {
            Predicate::Compare { expr, .. }
            | Predicate::Like { expr, .. }
            | Predicate::Quantified { expr, .. }
            | Predicate::Contains { expr, .. }
            | Predicate::Between { expr, .. }
            | Predicate::InList { expr, .. }
            | Predicate::IsNull { expr, .. }
            | Predicate::Raw { expr, .. } => expr,
        }
    }
}

/// Predicates ORed together. Groups of a plan are ANDed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PredicateGroup {
    pub predicates: Vec<Predicate>,
}

impl PredicateGroup {
    pub fn new(predicates: Vec<Predicate>) -> Self {
        Self { predicates }
    }

    pub fn single(predicate: Predicate) -> Self {
        Self {
            predicates: vec![predicate],
        }
    }
}

/// A LEFT join of a relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    /// Dotted include path (`roles.permissions`).
    pub path: String,
    /// Alias the joined table is addressed by (`roles__permissions`).
    pub alias: String,
    /// Alias of the table the relation is declared on.
    pub parent: String,
    /// Physical target table.
    pub table: String,
    pub relation: RelationDef,
    /// Projected target columns.
    pub columns: Vec<String>,
}

impl Join {
    /// `alias.foreign_key`
    pub fn foreign_key(&self) -> ColumnRef {
        ColumnRef::new(&self.alias, &self.relation.foreign_key)
    }

    /// `parent.local_key`
    pub fn local_key(&self) -> ColumnRef {
        ColumnRef::new(&self.parent, &self.relation.local_key)
    }
}

/// Alias for a dotted include path.
pub fn join_alias(path: &str) -> String {
    path.replace('.', "__")
}

/// One ORDER BY key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub column: ColumnRef,
    pub direction: SortDirection,
    pub nulls: Option<NullsOrder>,
}

/// Compiled query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    /// Entity the plan was compiled for.
    pub entity: String,
    /// Physical root table, also its alias.
    pub table: String,
    /// Explicit projection; empty means every column of the root table.
    pub select: Vec<ColumnRef>,
    /// Every column of the root table, in declaration order.
    pub columns: Vec<String>,
    pub joins: Vec<Join>,
    pub filters: Vec<PredicateGroup>,
    pub group_by: Vec<ColumnRef>,
    pub having: Vec<PredicateGroup>,
    pub order_by: Vec<SortKey>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

impl QueryPlan {
    /// The same plan without offset or limit, used to count totals.
    pub fn without_pagination(&self) -> Self {
        Self {
            offset: None,
            limit: None,
            ..self.clone()
        }
    }

    /// Whether the plan groups rows.
    pub fn is_grouped(&self) -> bool {
        !self.group_by.is_empty()
    }

    /// Find a join by alias.
    pub fn join(&self, alias: &str) -> Option<&Join> {
        self.joins.iter().find(|j| j.alias == alias)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_without_pagination() {
        let plan = QueryPlan {
            entity: "User".into(),
            table: "users".into(),
            select: vec![],
            columns: vec!["id".into()],
            joins: vec![],
            filters: vec![],
            group_by: vec![],
            having: vec![],
            order_by: vec![],
            offset: Some(20),
            limit: Some(10),
        };
        let unbounded = plan.without_pagination();
        assert_eq!(unbounded.offset, None);
        assert_eq!(unbounded.limit, None);
        assert_eq!(unbounded.table, plan.table);
    }

    #[test]
    fn test_join_alias() {
        assert_eq!(join_alias("profile"), "profile");
        assert_eq!(join_alias("roles.permissions"), "roles__permissions");
    }
}
