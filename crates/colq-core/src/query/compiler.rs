//! Compiles a [`CollectionQuery`] into a [`QueryPlan`].
//!
//! The compiler validates the query, resolves the entity and every include
//! path from the catalog, interprets column references (relation-qualified,
//! JSON path and containment forms), binds operands and appends the
//! soft-delete constraint.

use colq_proto::{CollectionQuery, FilterOperator, Where};
use tracing::debug;

use super::operand::Operand;
use super::plan::{
    join_alias, ColumnRef, CompareOp, Expr, Join, Predicate, PredicateGroup, QueryPlan,
    Quantifier, SortKey,
};
use crate::catalog::{Catalog, TableDef};
use crate::error::{Error, Result};

/// Options that change how a query is scoped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Include soft-deleted rows.
    pub with_deleted: bool,
}

impl CompileOptions {
    /// Options that keep soft-deleted rows.
    pub fn with_deleted() -> Self {
        Self { with_deleted: true }
    }
}

/// Compiles queries against a catalog.
#[derive(Debug, Clone, Copy)]
pub struct QueryCompiler<'a> {
    catalog: &'a Catalog,
}

impl<'a> QueryCompiler<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    /// Compile `query` for `entity`.
    pub fn compile(
        &self,
        entity: &str,
        query: &CollectionQuery,
        options: CompileOptions,
    ) -> Result<QueryPlan> {
        query.validate()?;
        let query = query.clone().remove_empty_groups();
        if !query.having.is_empty() && query.group_by.is_empty() {
            return Err(Error::HavingWithoutGroupBy);
        }

        let root = self
            .catalog
            .table(entity)
            .ok_or_else(|| Error::UnknownEntity(entity.to_string()))?;
        let scope = Scope {
            root,
            joins: self.resolve_joins(root, &query)?,
        };

        let select = query
            .select
            .iter()
            .map(|c| scope.column(c))
            .collect::<Result<Vec<_>>>()?;

        let mut filters = query
            .where_
            .iter()
            .map(|group| scope.where_group(group))
            .collect::<Result<Vec<_>>>()?;

        let group_by = query
            .group_by
            .iter()
            .map(|c| scope.column(c))
            .collect::<Result<Vec<_>>>()?;

        let having = query
            .having
            .iter()
            .map(|group| scope.having_group(group))
            .collect::<Result<Vec<_>>>()?;

        let order_by = query
            .order_by
            .iter()
            .map(|order| {
                Ok(SortKey {
                    column: scope.column(&order.column)?,
                    direction: order.direction_or_default(),
                    nulls: order.nulls,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(column) = &root.soft_delete {
            if !options.with_deleted {
                filters.push(PredicateGroup::single(Predicate::IsNull {
                    expr: Expr::Column(ColumnRef::new(&root.table, column)),
                    negated: false,
                }));
            }
        }

        let plan = QueryPlan {
            entity: root.entity.clone(),
            table: root.table.clone(),
            select,
            columns: root.column_names().map(str::to_string).collect(),
            joins: scope.joins.into_iter().map(|(join, _)| join).collect(),
            filters,
            group_by,
            having,
            order_by,
            offset: query.skip,
            limit: query.take,
        };

        debug!(
            entity = %plan.entity,
            joins = plan.joins.len(),
            filters = plan.filters.len(),
            grouped = plan.is_grouped(),
            "compiled collection query"
        );
        Ok(plan)
    }

    /// Resolve every include path into a join, intermediates first.
    fn resolve_joins(
        &self,
        root: &'a TableDef,
        query: &CollectionQuery,
    ) -> Result<Vec<(Join, &'a TableDef)>> {
        let mut joins: Vec<(Join, &'a TableDef)> = Vec::new();

        for path in query.joined_paths() {
            let (parent_alias, parent, name) = match path.rsplit_once('.') {
                Some((parent_path, name)) => {
                    let (join, table) = joins
                        .iter()
                        .find(|(j, _)| j.path == parent_path)
                        .ok_or_else(|| Error::RelationNotJoined {
                            relation: parent_path.to_string(),
                        })?;
                    (join.alias.clone(), *table, name)
                }
                None => (root.table.clone(), root, path.as_str()),
            };

            let relation = parent.relation(name).ok_or_else(|| Error::UnknownRelation {
                entity: parent.entity.clone(),
                relation: name.to_string(),
            })?;
            let target = self
                .catalog
                .table(&relation.target)
                .ok_or_else(|| Error::UnknownEntity(relation.target.clone()))?;

            let columns = projection(query, &path, target)?;
            joins.push((
                Join {
                    alias: join_alias(&path),
                    path,
                    parent: parent_alias,
                    table: target.table.clone(),
                    relation: relation.clone(),
                    columns,
                },
                target,
            ));
        }
        Ok(joins)
    }
}

/// Columns a join projects: all of them unless the path is only named by
/// `include_and_select` entries.
fn projection(query: &CollectionQuery, path: &str, target: &TableDef) -> Result<Vec<String>> {
    let all = || target.column_names().map(str::to_string).collect();
    if query.includes.iter().any(|p| p == path) {
        return Ok(all());
    }

    let mut columns: Vec<String> = Vec::new();
    let mut restricted = false;
    for include in query.include_and_select.iter().filter(|i| i.name == path) {
        restricted = true;
        for column in &include.select {
            if target.column(column).is_none() {
                return Err(Error::UnknownColumn {
                    table: target.table.clone(),
                    column: column.clone(),
                });
            }
            if !columns.contains(column) {
                columns.push(column.clone());
            }
        }
    }
    if restricted {
        Ok(columns)
    } else {
        Ok(all())
    }
}

/// Tables addressable by a query: the root plus its joins.
struct Scope<'a> {
    root: &'a TableDef,
    joins: Vec<(Join, &'a TableDef)>,
}

impl<'a> Scope<'a> {
    /// Alias and descriptor of a joined relation path.
    fn joined(&self, path: &str) -> Result<(&str, &'a TableDef)> {
        self.joins
            .iter()
            .find(|(join, _)| join.path == path)
            .map(|(join, table)| (join.alias.as_str(), *table))
            .ok_or_else(|| Error::RelationNotJoined {
                relation: path.to_string(),
            })
    }

    /// Split `relation.column` into the owning alias, descriptor and column.
    fn locate<'c>(&self, column: &'c str) -> Result<(&str, &'a TableDef, &'c str)> {
        match column.rsplit_once('.') {
            Some((relation, field)) => {
                let (alias, table) = self.joined(relation)?;
                Ok((alias, table, field))
            }
            None => Ok((self.root.table.as_str(), self.root, column)),
        }
    }

    /// A plain column reference, as used by select, group by and order by.
    fn column(&self, column: &str) -> Result<ColumnRef> {
        let (alias, table, field) = self.locate(column)?;
        check_column(table, field)?;
        Ok(ColumnRef::new(alias, field))
    }

    /// Interpret a filter column.
    ///
    /// Returns the expression and whether the clause is a containment test.
    fn filter_expr(&self, column: &str, operator: &FilterOperator) -> Result<(Expr, bool)> {
        let accessor_at = [column.find("->"), column.find("@>")]
            .into_iter()
            .flatten()
            .min();
        let (head, accessor) = match accessor_at {
            Some(at) => column.split_at(at),
            None => (column, ""),
        };
        let (alias, table, field) = self.locate(head)?;
        let base = ColumnRef::new(alias, field);

        let (expr, mut containment) = if accessor.starts_with("@>") {
            require_document(table, field, "containment")?;
            (Expr::Column(base), true)
        } else if !accessor.is_empty() {
            require_document(table, field, "JSON path")?;
            let (path, key) = accessor.rsplit_once("->>").ok_or_else(|| Error::InvalidAccessor {
                column: column.to_string(),
                accessor: "JSON path without a ->> key".to_string(),
            })?;
            if key.is_empty() || key.contains("->") {
                return Err(Error::InvalidAccessor {
                    column: column.to_string(),
                    accessor: "JSON path without a ->> key".to_string(),
                });
            }
            let path = path
                .split("->")
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect();
            (
                Expr::JsonText {
                    column: base,
                    path,
                    key: key.to_string(),
                },
                false,
            )
        } else {
            check_column(table, field)?;
            (Expr::Column(base), false)
        };

        let expr = match operator {
            FilterOperator::ArrayFilter => {
                containment = true;
                match expr {
                    Expr::JsonText { .. } => Expr::JsonCast(Box::new(expr)),
                    other => {
                        require_document(table, field, "containment")?;
                        other
                    }
                }
            }
            FilterOperator::ArrayContains => {
                containment = true;
                if matches!(expr, Expr::Column(_)) {
                    require_document(table, field, "containment")?;
                }
                expr
            }
            _ => expr,
        };
        Ok((expr, containment))
    }

    fn where_group(&self, group: &[Where]) -> Result<PredicateGroup> {
        group
            .iter()
            .map(|clause| {
                let (expr, containment) = self.filter_expr(&clause.column, &clause.operator)?;
                predicate(expr, containment, clause)
            })
            .collect::<Result<Vec<_>>>()
            .map(PredicateGroup::new)
    }

    fn having_group(&self, group: &[Where]) -> Result<PredicateGroup> {
        group
            .iter()
            .map(|clause| {
                let expr = match clause.operator {
                    FilterOperator::Between
                    | FilterOperator::In
                    | FilterOperator::NotIn
                    | FilterOperator::Like
                    | FilterOperator::ILike => Expr::CountAll {
                        table: self.root.table.clone(),
                    },
                    _ => Expr::Count(self.column(&clause.column)?),
                };
                predicate(expr, false, clause)
            })
            .collect::<Result<Vec<_>>>()
            .map(PredicateGroup::new)
    }
}

fn check_column(table: &TableDef, column: &str) -> Result<()> {
    match table.column(column) {
        Some(_) => Ok(()),
        None => Err(Error::UnknownColumn {
            table: table.table.clone(),
            column: column.to_string(),
        }),
    }
}

fn require_document(table: &TableDef, column: &str, accessor: &str) -> Result<()> {
    let def = table.column(column).ok_or_else(|| Error::UnknownColumn {
        table: table.table.clone(),
        column: column.to_string(),
    })?;
    if def.column_type.is_document() {
        Ok(())
    } else {
        Err(Error::InvalidAccessor {
            column: column.to_string(),
            accessor: accessor.to_string(),
        })
    }
}

/// Bind a clause's operand to `expr`.
fn predicate(expr: Expr, containment: bool, clause: &Where) -> Result<Predicate> {
    let operator = &clause.operator;
    let operand = Operand::parse(operator, &clause.column, &clause.value)?;

    if containment {
        return Ok(Predicate::Contains {
            expr,
            value: clause.value.clone(),
        });
    }

    Ok(match operand {
        Operand::None => Predicate::IsNull {
            expr,
            negated: *operator == FilterOperator::IsNotNull,
        },
        Operand::Pattern(pattern) => Predicate::Like {
            expr,
            pattern,
            case_insensitive: *operator == FilterOperator::ILike,
        },
        Operand::Range(low, high) => Predicate::Between { expr, low, high },
        Operand::List(values) => Predicate::InList {
            expr,
            values,
            negated: *operator == FilterOperator::NotIn,
        },
        Operand::Scalar(value) => {
            let op = match operator {
                FilterOperator::NotEq => CompareOp::NotEq,
                FilterOperator::Gt => CompareOp::Gt,
                FilterOperator::Gte => CompareOp::Gte,
                FilterOperator::Lt => CompareOp::Lt,
                FilterOperator::Lte => CompareOp::Lte,
                FilterOperator::Any | FilterOperator::All => {
                    let quantifier = if *operator == FilterOperator::Any {
                        Quantifier::Any
                    } else {
                        Quantifier::All
                    };
                    return Ok(Predicate::Quantified {
                        expr,
                        quantifier,
                        value,
                    });
                }
                FilterOperator::ArrayFilter | FilterOperator::ArrayContains => {
                    return Ok(Predicate::Contains { expr, value });
                }
                FilterOperator::Raw(raw) => {
                    return Ok(Predicate::Raw {
                        expr,
                        operator: raw.clone(),
                        value,
                    });
                }
                // Eq, and BETWEEN values that are not a two-part range.
                _ => CompareOp::Eq,
            };
            Predicate::Compare { expr, op, value }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogBuilder, ColumnDef, ColumnType, Module, RelationDef};
    use crate::query::sql::render_select;
    use colq_proto::{IncludeSelect, NullsOrder, Order, SortDirection};
    use pretty_assertions::assert_eq;

    fn catalog() -> Catalog {
        let users = TableDef::new("User", "users")
            .with_column(ColumnDef::new("id", ColumnType::Int))
            .with_column(ColumnDef::new("name", ColumnType::Text))
            .with_column(ColumnDef::new("age", ColumnType::Int))
            .with_column(ColumnDef::new("metadata", ColumnType::Json).nullable())
            .with_column(ColumnDef::new("tags", ColumnType::Array))
            .with_relation(RelationDef::has_one("profile", "Profile", "user_id"))
            .with_relation(RelationDef::has_many("memberships", "Membership", "user_id"))
            .with_soft_delete("deleted_at");
        let profiles = TableDef::new("Profile", "profiles")
            .with_column(ColumnDef::new("id", ColumnType::Int))
            .with_column(ColumnDef::new("user_id", ColumnType::Int))
            .with_column(ColumnDef::new("bio", ColumnType::Text))
            .with_column(ColumnDef::new("settings", ColumnType::Json));
        let memberships = TableDef::new("Membership", "memberships")
            .with_column(ColumnDef::new("id", ColumnType::Int))
            .with_column(ColumnDef::new("user_id", ColumnType::Int))
            .with_column(ColumnDef::new("team_id", ColumnType::Int))
            .with_relation(RelationDef::belongs_to("team", "Team", "team_id"));
        let teams = TableDef::new("Team", "teams")
            .with_column(ColumnDef::new("id", ColumnType::Int))
            .with_column(ColumnDef::new("name", ColumnType::Text));

        CatalogBuilder::new()
            .register(
                Module::new("test")
                    .with_table(users)
                    .with_table(profiles)
                    .with_table(memberships)
                    .with_table(teams),
            )
            .unwrap()
            .build()
            .unwrap()
    }

    fn compile(query: &CollectionQuery) -> Result<QueryPlan> {
        let catalog = catalog();
        QueryCompiler::new(&catalog).compile("User", query, CompileOptions::with_deleted())
    }

    fn first_predicate(query: CollectionQuery) -> Predicate {
        compile(&query).unwrap().filters[0].predicates[0].clone()
    }

    fn col(table: &str, column: &str) -> Expr {
        Expr::Column(ColumnRef::new(table, column))
    }

    #[test]
    fn test_plain_comparisons() {
        let plan = compile(
            &CollectionQuery::new()
                .where_group(vec![
                    Where::new("age", FilterOperator::Gte, "18"),
                    Where::new("name", FilterOperator::NotEq, "root"),
                ])
                .filter(Where::eq("id", "7")),
        )
        .unwrap();

        assert_eq!(plan.filters.len(), 2);
        assert_eq!(
            plan.filters[0].predicates,
            vec![
                Predicate::Compare {
                    expr: col("users", "age"),
                    op: CompareOp::Gte,
                    value: "18".into()
                },
                Predicate::Compare {
                    expr: col("users", "name"),
                    op: CompareOp::NotEq,
                    value: "root".into()
                },
            ]
        );
    }

    #[test]
    fn test_soft_delete_scoping() {
        let catalog = catalog();
        let compiler = QueryCompiler::new(&catalog);
        let query = CollectionQuery::new();

        let plan = compiler.compile("User", &query, CompileOptions::default()).unwrap();
        assert_eq!(
            plan.filters,
            vec![PredicateGroup::single(Predicate::IsNull {
                expr: col("users", "deleted_at"),
                negated: false
            })]
        );

        let plan = compiler.compile("User", &query, CompileOptions::with_deleted()).unwrap();
        assert!(plan.filters.is_empty());

        let plan = compiler.compile("Team", &query, CompileOptions::default()).unwrap();
        assert!(plan.filters.is_empty());
    }

    #[test]
    fn test_like_and_lists() {
        assert_eq!(
            first_predicate(CollectionQuery::new().filter(Where::new("name", FilterOperator::ILike, "al"))),
            Predicate::Like {
                expr: col("users", "name"),
                pattern: "%al%".into(),
                case_insensitive: true
            }
        );
        assert_eq!(
            first_predicate(CollectionQuery::new().filter(Where::new("id", FilterOperator::NotIn, "1,2,3"))),
            Predicate::InList {
                expr: col("users", "id"),
                values: vec!["1".into(), "2".into(), "3".into()],
                negated: true
            }
        );
        assert!(matches!(
            compile(&CollectionQuery::new().filter(Where::new("id", FilterOperator::In, "1,"))),
            Err(Error::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_between_fallback() {
        assert_eq!(
            first_predicate(CollectionQuery::new().filter(Where::new("age", FilterOperator::Between, "18,30"))),
            Predicate::Between {
                expr: col("users", "age"),
                low: "18".into(),
                high: "30".into()
            }
        );
        assert_eq!(
            first_predicate(CollectionQuery::new().filter(Where::new("age", FilterOperator::Between, "18"))),
            Predicate::Compare {
                expr: col("users", "age"),
                op: CompareOp::Eq,
                value: "18".into()
            }
        );
    }

    #[test]
    fn test_unary_and_raw() {
        assert_eq!(
            first_predicate(CollectionQuery::new().filter(Where::is_not_null("metadata"))),
            Predicate::IsNull {
                expr: col("users", "metadata"),
                negated: true
            }
        );
        assert_eq!(
            first_predicate(CollectionQuery::new().filter(Where::new("name", "~*", "^a"))),
            Predicate::Raw {
                expr: col("users", "name"),
                operator: "~*".into(),
                value: "^a".into()
            }
        );
        assert_eq!(
            first_predicate(CollectionQuery::new().filter(Where::new("id", FilterOperator::Any, "{1,2}"))),
            Predicate::Quantified {
                expr: col("users", "id"),
                quantifier: Quantifier::Any,
                value: "{1,2}".into()
            }
        );
    }

    #[test]
    fn test_json_paths() {
        assert_eq!(
            first_predicate(CollectionQuery::new().filter(Where::eq("metadata->>plan", "pro"))),
            Predicate::Compare {
                expr: Expr::JsonText {
                    column: ColumnRef::new("users", "metadata"),
                    path: vec![],
                    key: "plan".into()
                },
                op: CompareOp::Eq,
                value: "pro".into()
            }
        );
        assert_eq!(
            first_predicate(CollectionQuery::new().filter(Where::eq("metadata->billing->>plan", "pro"))).expr(),
            &Expr::JsonText {
                column: ColumnRef::new("users", "metadata"),
                path: vec!["billing".into()],
                key: "plan".into()
            }
        );
        assert!(matches!(
            compile(&CollectionQuery::new().filter(Where::eq("name->>first", "a"))),
            Err(Error::InvalidAccessor { .. })
        ));
        assert!(matches!(
            compile(&CollectionQuery::new().filter(Where::eq("metadata->billing", "a"))),
            Err(Error::InvalidAccessor { .. })
        ));
    }

    #[test]
    fn test_containment() {
        assert_eq!(
            first_predicate(CollectionQuery::new().filter(Where::new("tags@>", FilterOperator::Eq, "[\"a\"]"))),
            Predicate::Contains {
                expr: col("users", "tags"),
                value: "[\"a\"]".into()
            }
        );
        assert_eq!(
            first_predicate(CollectionQuery::new().filter(Where::new(
                "metadata->>flags",
                FilterOperator::ArrayFilter,
                "[\"beta\"]"
            ))),
            Predicate::Contains {
                expr: Expr::JsonCast(Box::new(Expr::JsonText {
                    column: ColumnRef::new("users", "metadata"),
                    path: vec![],
                    key: "flags".into()
                })),
                value: "[\"beta\"]".into()
            }
        );
        assert!(matches!(
            compile(&CollectionQuery::new().filter(Where::new("age", FilterOperator::ArrayContains, "1"))),
            Err(Error::InvalidAccessor { .. })
        ));
    }

    #[test]
    fn test_relation_columns_require_join() {
        let err = compile(&CollectionQuery::new().filter(Where::eq("profile.bio", "x"))).unwrap_err();
        assert!(matches!(err, Error::RelationNotJoined { ref relation } if relation == "profile"));

        let plan = compile(
            &CollectionQuery::new()
                .include("profile")
                .filter(Where::eq("profile.settings->>theme", "dark"))
                .order(Order::asc("profile.bio")),
        )
        .unwrap();
        assert_eq!(
            plan.filters[0].predicates[0].expr(),
            &Expr::JsonText {
                column: ColumnRef::new("profile", "settings"),
                path: vec![],
                key: "theme".into()
            }
        );
        assert_eq!(plan.order_by[0].column, ColumnRef::new("profile", "bio"));
    }

    #[test]
    fn test_nested_includes() {
        let plan = compile(&CollectionQuery::new().include("memberships.team").include("memberships")).unwrap();
        assert_eq!(plan.joins.len(), 2);

        let memberships = &plan.joins[0];
        assert_eq!(memberships.alias, "memberships");
        assert_eq!(memberships.parent, "users");
        assert_eq!(memberships.foreign_key(), ColumnRef::new("memberships", "user_id"));
        assert_eq!(memberships.local_key(), ColumnRef::new("users", "id"));

        let team = &plan.joins[1];
        assert_eq!(team.path, "memberships.team");
        assert_eq!(team.alias, "memberships__team");
        assert_eq!(team.parent, "memberships");
        assert_eq!(team.foreign_key(), ColumnRef::new("memberships__team", "id"));
        assert_eq!(team.local_key(), ColumnRef::new("memberships", "team_id"));
        assert_eq!(team.columns, vec!["id", "name"]);

        let plan = compile(
            &CollectionQuery::new()
                .include("memberships.team")
                .filter(Where::eq("memberships.team.name", "core")),
        )
        .unwrap();
        assert_eq!(
            plan.filters[0].predicates[0].expr(),
            &col("memberships__team", "name")
        );
    }

    #[test]
    fn test_include_select_projection() {
        let plan = compile(
            &CollectionQuery::new().include_select(IncludeSelect::new("profile", vec!["bio".into()])),
        )
        .unwrap();
        assert_eq!(plan.joins[0].columns, vec!["bio"]);

        let err = compile(
            &CollectionQuery::new().include_select(IncludeSelect::new("profile", vec!["avatar".into()])),
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnknownColumn { ref column, .. } if column == "avatar"));

        let err = compile(&CollectionQuery::new().include("friends")).unwrap_err();
        assert!(matches!(err, Error::UnknownRelation { .. }));
    }

    #[test]
    fn test_having_aggregates() {
        let plan = compile(
            &CollectionQuery::new()
                .group("name")
                .having_group(vec![
                    Where::new("id", FilterOperator::Gt, "1"),
                    Where::new("id", FilterOperator::Between, "2,5"),
                ]),
        )
        .unwrap();
        assert_eq!(plan.group_by, vec![ColumnRef::new("users", "name")]);
        assert_eq!(
            plan.having[0].predicates[0].expr(),
            &Expr::Count(ColumnRef::new("users", "id"))
        );
        assert_eq!(
            plan.having[0].predicates[1].expr(),
            &Expr::CountAll {
                table: "users".into()
            }
        );
    }

    #[test]
    fn test_order_and_pagination() {
        let plan = compile(
            &CollectionQuery::new()
                .order(Order::new("name"))
                .order(Order::desc("age").with_nulls(NullsOrder::Last))
                .skip(20)
                .take(10),
        )
        .unwrap();
        assert_eq!(plan.order_by[0].direction, SortDirection::Asc);
        assert_eq!(plan.order_by[1].nulls, Some(NullsOrder::Last));
        assert_eq!((plan.offset, plan.limit), (Some(20), Some(10)));
    }

    #[test]
    fn test_rejections() {
        let catalog = catalog();
        let compiler = QueryCompiler::new(&catalog);
        assert!(matches!(
            compiler.compile("Ghost", &CollectionQuery::new(), CompileOptions::default()),
            Err(Error::UnknownEntity(_))
        ));
        assert!(matches!(
            compile(&CollectionQuery::new().select("password")),
            Err(Error::UnknownColumn { .. })
        ));
        assert!(matches!(
            compile(&CollectionQuery::new().filter(Where::new("name", "SOUNDS LIKE", "x"))),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn test_empty_groups_dropped() {
        let active = || Where::eq("name", "active");
        let padded = compile(
            &CollectionQuery::new()
                .where_group(vec![])
                .where_group(vec![active()])
                .having_group(vec![]),
        )
        .unwrap();
        let plain = compile(&CollectionQuery::new().where_group(vec![active()])).unwrap();

        assert_eq!(padded.filters, plain.filters);
        assert_eq!(padded.having, plain.having);
        assert_eq!(render_select(&padded), render_select(&plain));
    }

    #[test]
    fn test_having_requires_group_by() {
        let err = compile(
            &CollectionQuery::new().having_group(vec![Where::new("id", FilterOperator::Gt, "1")]),
        )
        .unwrap_err();
        assert!(matches!(err, Error::HavingWithoutGroupBy));
    }
}
