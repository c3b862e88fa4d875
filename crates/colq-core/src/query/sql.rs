//! PostgreSQL rendering of query plans.

use std::fmt::Write;

use colq_proto::{NullsOrder, SortDirection};
use serde::Serialize;

use super::plan::{ColumnRef, Expr, Predicate, PredicateGroup, QueryPlan};

/// A rendered statement with positional (`$n`) parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<String>,
}

/// Render the row-fetching statement.
pub fn render_select(plan: &QueryPlan) -> SqlStatement {
    let mut w = SqlWriter::default();
    w.push("SELECT ");
    w.select_list(plan);
    w.from_where(plan);
    w.group_having(plan);

    if !plan.order_by.is_empty() {
        w.push(" ORDER BY ");
        for (i, key) in plan.order_by.iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            w.column(&key.column);
            w.push(match key.direction {
                SortDirection::Asc => " ASC",
                SortDirection::Desc => " DESC",
            });
            match key.nulls {
                Some(NullsOrder::First) => w.push(" NULLS FIRST"),
                Some(NullsOrder::Last) => w.push(" NULLS LAST"),
                None => {}
            }
        }
    }
    if let Some(limit) = plan.limit {
        let _ = write!(w.sql, " LIMIT {limit}");
    }
    if let Some(offset) = plan.offset {
        let _ = write!(w.sql, " OFFSET {offset}");
    }
    w.finish()
}

/// Render the statement counting matching rows, or matching groups when
/// the plan groups or filters with HAVING. Ordering and pagination are
/// ignored.
pub fn render_count(plan: &QueryPlan) -> SqlStatement {
    let mut w = SqlWriter::default();
    if plan.is_grouped() || !plan.having.is_empty() {
        w.push("SELECT COUNT(*) FROM (SELECT ");
        if plan.group_by.is_empty() {
            w.push("1");
        } else {
            w.column_list(&plan.group_by);
        }
        w.from_where(plan);
        w.group_having(plan);
        w.push(") AS ");
        w.ident("grouped");
    } else {
        w.push("SELECT COUNT(*)");
        w.from_where(plan);
    }
    w.finish()
}

#[derive(Default)]
struct SqlWriter {
    sql: String,
    params: Vec<String>,
}

impl SqlWriter {
    fn finish(self) -> SqlStatement {
        SqlStatement {
            sql: self.sql,
            params: self.params,
        }
    }

    fn push(&mut self, s: &str) {
        self.sql.push_str(s);
    }

    fn bind(&mut self, value: &str) {
        self.params.push(value.to_string());
        let _ = write!(self.sql, "${}", self.params.len());
    }

    fn ident(&mut self, name: &str) {
        self.sql.push('"');
        self.sql.push_str(&name.replace('"', "\"\""));
        self.sql.push('"');
    }

    fn literal(&mut self, value: &str) {
        self.sql.push('\'');
        self.sql.push_str(&value.replace('\'', "''"));
        self.sql.push('\'');
    }

    fn column(&mut self, column: &ColumnRef) {
        self.ident(&column.table);
        self.sql.push('.');
        self.ident(&column.column);
    }

    fn column_list(&mut self, columns: &[ColumnRef]) {
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.column(column);
        }
    }

    fn select_list(&mut self, plan: &QueryPlan) {
        if plan.select.is_empty() {
            self.ident(&plan.table);
            self.push(".*");
        } else {
            self.column_list(&plan.select);
        }
        for join in &plan.joins {
            for column in &join.columns {
                self.push(", ");
                self.column(&ColumnRef::new(&join.alias, column));
                self.push(" AS ");
                self.ident(&format!("{}__{}", join.alias, column));
            }
        }
    }

    fn from_where(&mut self, plan: &QueryPlan) {
        self.push(" FROM ");
        self.ident(&plan.table);
        for join in &plan.joins {
            self.push(" LEFT JOIN ");
            self.ident(&join.table);
            self.push(" AS ");
            self.ident(&join.alias);
            self.push(" ON ");
            self.column(&join.foreign_key());
            self.push(" = ");
            self.column(&join.local_key());
        }
        if !plan.filters.is_empty() {
            self.push(" WHERE ");
            self.groups(&plan.filters);
        }
    }

    fn group_having(&mut self, plan: &QueryPlan) {
        if plan.is_grouped() {
            self.push(" GROUP BY ");
            self.column_list(&plan.group_by);
        }
        if !plan.having.is_empty() {
            self.push(" HAVING ");
            self.groups(&plan.having);
        }
    }

    fn groups(&mut self, groups: &[PredicateGroup]) {
        for (i, group) in groups.iter().enumerate() {
            if i > 0 {
                self.push(" AND ");
            }
            self.push("(");
            for (j, predicate) in group.predicates.iter().enumerate() {
                if j > 0 {
                    self.push(" OR ");
                }
                self.predicate(predicate);
            }
            self.push(")");
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Column(column) => self.column(column),
            Expr::JsonText { column, path, key } => {
                self.column(column);
                for segment in path {
                    self.push(" -> ");
                    self.literal(segment);
                }
                self.push(" ->> ");
                self.literal(key);
            }
            Expr::JsonCast(inner) => {
                self.push("(");
                self.expr(inner);
                self.push(")::jsonb");
            }
            Expr::CountAll { table } => {
                self.push("COUNT(");
                self.ident(table);
                self.push(".*)");
            }
            Expr::Count(column) => {
                self.push("COUNT(");
                self.column(column);
                self.push(")");
            }
        }
    }

    fn predicate(&mut self, predicate: &Predicate) {
        self.expr(predicate.expr());
        match predicate {
            Predicate::Compare { op, value, .. } => {
                self.push(" ");
                self.push(op.as_sql());
                self.push(" ");
                self.bind(value);
            }
            Predicate::Like {
                pattern,
                case_insensitive,
                ..
            } => {
                self.push(if *case_insensitive { " ILIKE " } else { " LIKE " });
                self.bind(pattern);
            }
            Predicate::Quantified {
                quantifier, value, ..
            } => {
                self.push(" = ");
                self.push(quantifier.as_sql());
                self.push("(");
                self.bind(value);
                self.push(")");
            }
            Predicate::Contains { value, .. } => {
                self.push(" @> ");
                self.bind(value);
            }
            Predicate::Between { low, high, .. } => {
                self.push(" BETWEEN ");
                self.bind(low);
                self.push(" AND ");
                self.bind(high);
            }
            Predicate::InList { values, negated, .. } => {
                self.push(if *negated { " NOT IN (" } else { " IN (" });
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.bind(value);
                }
                self.push(")");
            }
            Predicate::IsNull { negated, .. } => {
                self.push(if *negated { " IS NOT NULL" } else { " IS NULL" });
            }
            Predicate::Raw {
                operator, value, ..
            } => {
                self.push(" ");
                self.push(operator);
                self.push(" ");
                self.bind(value);
            }
        }
    }
}
