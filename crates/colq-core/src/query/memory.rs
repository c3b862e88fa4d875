//! In-memory row source over JSON rows.
//!
//! [`MemoryStore`] interprets a [`QueryPlan`] the way PostgreSQL would run
//! its rendered SQL: LEFT joins multiply parent rows, string parameters are
//! coerced to the type of the value they are compared with, NULLs never
//! satisfy a comparison, and NULLs sort last ascending and first descending
//! unless the key says otherwise.

use std::cmp::Ordering;
use std::collections::HashMap;

use colq_proto::{NullsOrder, SortDirection};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use tracing::trace;

use super::backend::RowSource;
use super::plan::{
    ColumnRef, CompareOp, Expr, Predicate, PredicateGroup, QueryPlan, Quantifier, SortKey,
};
use crate::error::BackendError;

type Row = Map<String, Value>;
type Tables = HashMap<String, Vec<Row>>;

/// Thread-safe in-memory tables of JSON objects.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load fixtures shaped as `{"table": [row, ...], ...}`.
    pub fn from_json(fixtures: Value) -> Result<Self, BackendError> {
        let Value::Object(tables) = fixtures else {
            return Err(BackendError::InvalidData(
                "fixtures must be an object of table arrays".into(),
            ));
        };
        let store = Self::new();
        for (table, rows) in tables {
            let Value::Array(rows) = rows else {
                return Err(BackendError::InvalidData(format!(
                    "fixtures for '{table}' must be an array"
                )));
            };
            store.insert_many(&table, rows)?;
        }
        Ok(store)
    }

    /// Append rows to a table. Creates the table on first insert.
    pub fn insert_many(
        &self,
        table: &str,
        rows: impl IntoIterator<Item = Value>,
    ) -> Result<(), BackendError> {
        let rows = rows
            .into_iter()
            .map(|row| match row {
                Value::Object(row) => Ok(row),
                other => Err(BackendError::InvalidData(format!(
                    "row for '{table}' is not an object: {other}"
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.tables
            .write()
            .entry(table.to_string())
            .or_default()
            .extend(rows);
        Ok(())
    }

    /// Whether no table holds any row.
    pub fn is_empty(&self) -> bool {
        self.tables.read().values().all(Vec::is_empty)
    }
}

impl RowSource for MemoryStore {
    type Row = Value;

    fn fetch(&self, plan: &QueryPlan) -> Result<Vec<Value>, BackendError> {
        let tables = self.tables.read();
        let mut buckets = buckets(plan, &tables)?;
        sort_buckets(&mut buckets, &plan.order_by);

        let offset = plan.offset.map_or(0, to_usize);
        let limit = plan.limit.map_or(usize::MAX, to_usize);
        let rows: Vec<Value> = buckets
            .iter()
            .skip(offset)
            .take(limit)
            .filter_map(|bucket| bucket.first())
            .map(|frame| project(plan, frame))
            .collect();
        trace!(table = %plan.table, rows = rows.len(), "memory fetch");
        Ok(rows)
    }

    fn count(&self, plan: &QueryPlan) -> Result<u64, BackendError> {
        let tables = self.tables.read();
        let total = buckets(plan, &tables)?.len() as u64;
        trace!(table = %plan.table, total, "memory count");
        Ok(total)
    }
}

fn to_usize(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}

/// One joined row: the row bound to each alias, `None` for unmatched joins.
#[derive(Debug, Clone)]
struct Frame<'a> {
    slots: Vec<(&'a str, Option<&'a Row>)>,
}

impl<'a> Frame<'a> {
    fn row(&self, alias: &str) -> Option<&'a Row> {
        self.slots
            .iter()
            .find(|(a, _)| *a == alias)
            .and_then(|(_, row)| *row)
    }

    /// Column value, `None` for SQL NULL.
    fn value(&self, column: &ColumnRef) -> Option<&'a Value> {
        self.row(&column.table)?
            .get(&column.column)
            .filter(|v| !v.is_null())
    }
}

/// What an expression is evaluated against.
#[derive(Clone, Copy)]
enum Scope<'s, 'a> {
    Row(&'s Frame<'a>),
    Group(&'s [Frame<'a>]),
}

impl<'s, 'a> Scope<'s, 'a> {
    fn frame(&self) -> Option<&'s Frame<'a>> {
        match *self {
            Scope::Row(frame) => Some(frame),
            Scope::Group(frames) => frames.first(),
        }
    }
}

/// Filtered rows, split into groups when the plan groups or has a HAVING
/// clause. Ungrouped plans yield one frame per bucket.
///
/// The compiler only emits HAVING together with GROUP BY; a hand-built plan
/// with HAVING alone is evaluated as a single aggregate group.
fn buckets<'a>(plan: &'a QueryPlan, tables: &'a Tables) -> Result<Vec<Vec<Frame<'a>>>, BackendError> {
    let frames = join_frames(plan, tables)?;

    let mut kept = Vec::with_capacity(frames.len());
    for frame in frames {
        if all_groups(&plan.filters, Scope::Row(&frame))? {
            kept.push(frame);
        }
    }

    if !plan.is_grouped() && plan.having.is_empty() {
        return Ok(kept.into_iter().map(|frame| vec![frame]).collect());
    }

    // Without GROUP BY the whole filtered set is one group, even when empty,
    // and fetching it yields its first row.
    let mut groups: Vec<(Vec<Option<&'a Value>>, Vec<Frame<'a>>)> = Vec::new();
    if plan.group_by.is_empty() {
        groups.push((Vec::new(), Vec::new()));
    }
    for frame in kept {
        let key: Vec<Option<&Value>> = plan.group_by.iter().map(|c| frame.value(c)).collect();
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(frame),
            None => groups.push((key, vec![frame])),
        }
    }

    let mut result = Vec::with_capacity(groups.len());
    for (_, members) in groups {
        if all_groups(&plan.having, Scope::Group(&members))? {
            result.push(members);
        }
    }
    Ok(result)
}

fn join_frames<'a>(plan: &'a QueryPlan, tables: &'a Tables) -> Result<Vec<Frame<'a>>, BackendError> {
    let rows = |table: &str| {
        tables
            .get(table)
            .ok_or_else(|| BackendError::UnknownTable(table.to_string()))
    };

    let mut frames: Vec<Frame<'a>> = rows(&plan.table)?
        .iter()
        .map(|row| Frame {
            slots: vec![(plan.table.as_str(), Some(row))],
        })
        .collect();

    for join in &plan.joins {
        let targets = rows(&join.table)?;
        let local_key = join.local_key();
        let mut next = Vec::with_capacity(frames.len());

        for frame in frames {
            let matched: Vec<&'a Row> = match frame.value(&local_key) {
                Some(key) => targets
                    .iter()
                    .filter(|row| {
                        row.get(&join.relation.foreign_key)
                            .is_some_and(|v| loose_eq(v, key))
                    })
                    .collect(),
                None => Vec::new(),
            };

            if matched.is_empty() {
                let mut frame = frame;
                frame.slots.push((join.alias.as_str(), None));
                next.push(frame);
            } else {
                for row in matched {
                    let mut joined = frame.clone();
                    joined.slots.push((join.alias.as_str(), Some(row)));
                    next.push(joined);
                }
            }
        }
        frames = next;
    }
    Ok(frames)
}

/// AND of OR-groups.
fn all_groups(groups: &[PredicateGroup], scope: Scope<'_, '_>) -> Result<bool, BackendError> {
    for group in groups {
        let mut any = false;
        for predicate in &group.predicates {
            if matches(predicate, scope)? {
                any = true;
                break;
            }
        }
        if !any {
            return Ok(false);
        }
    }
    Ok(true)
}

fn eval(expr: &Expr, scope: Scope<'_, '_>) -> Result<Option<Value>, BackendError> {
    match expr {
        Expr::Column(column) => Ok(scope.frame().and_then(|f| f.value(column)).cloned()),
        Expr::JsonText { column, path, key } => {
            let Some(mut doc) = scope.frame().and_then(|f| f.value(column)) else {
                return Ok(None);
            };
            for segment in path {
                match doc.get(segment.as_str()) {
                    Some(inner) => doc = inner,
                    None => return Ok(None),
                }
            }
            Ok(match doc.get(key.as_str()) {
                None | Some(Value::Null) => None,
                Some(Value::String(s)) => Some(Value::String(s.clone())),
                Some(other) => Some(Value::String(other.to_string())),
            })
        }
        Expr::JsonCast(inner) => match eval(inner, scope)? {
            Some(Value::String(text)) => serde_json::from_str(&text)
                .map(Some)
                .map_err(|_| coercion(&text, "json")),
            other => Ok(other),
        },
        Expr::CountAll { .. } => match scope {
            Scope::Group(frames) => Ok(Some(Value::from(frames.len() as u64))),
            Scope::Row(_) => Err(aggregate_in_row()),
        },
        Expr::Count(column) => match scope {
            Scope::Group(frames) => {
                let n = frames.iter().filter(|f| f.value(column).is_some()).count();
                Ok(Some(Value::from(n as u64)))
            }
            Scope::Row(_) => Err(aggregate_in_row()),
        },
    }
}

fn aggregate_in_row() -> BackendError {
    BackendError::Execution("aggregate used outside HAVING".into())
}

fn coercion(value: &str, expected: &str) -> BackendError {
    BackendError::Coercion {
        value: value.to_string(),
        expected: expected.to_string(),
    }
}

fn matches(predicate: &Predicate, scope: Scope<'_, '_>) -> Result<bool, BackendError> {
    if let Predicate::Raw { operator, .. } = predicate {
        return Err(BackendError::UnsupportedOperator(operator.clone()));
    }
    let lhs = eval(predicate.expr(), scope)?;

    if let Predicate::IsNull { negated, .. } = predicate {
        return Ok(lhs.is_none() != *negated);
    }
    let Some(lhs) = lhs else {
        return Ok(false);
    };

    match predicate {
        Predicate::Compare { op, value, .. } => {
            let ord = compare_param(&lhs, value)?;
            match op {
                CompareOp::Eq => Ok(ord == Some(Ordering::Equal)),
                CompareOp::NotEq => Ok(ord != Some(Ordering::Equal)),
                _ => {
                    let ord = ord.ok_or_else(|| coercion(value, "ordered"))?;
                    Ok(match op {
                        CompareOp::Gt => ord == Ordering::Greater,
                        CompareOp::Gte => ord != Ordering::Less,
                        CompareOp::Lt => ord == Ordering::Less,
                        _ => ord != Ordering::Greater,
                    })
                }
            }
        }
        Predicate::Like {
            pattern,
            case_insensitive,
            ..
        } => {
            let text = as_text(&lhs);
            Ok(if *case_insensitive {
                like_match(&text.to_lowercase(), &pattern.to_lowercase())
            } else {
                like_match(&text, pattern)
            })
        }
        Predicate::Quantified {
            quantifier, value, ..
        } => {
            let elements = parse_array_param(value)?;
            let mut hits = 0;
            for element in &elements {
                if compare_param(&lhs, element)? == Some(Ordering::Equal) {
                    hits += 1;
                }
            }
            Ok(match quantifier {
                Quantifier::Any => hits > 0,
                Quantifier::All => hits == elements.len(),
            })
        }
        Predicate::Contains { value, .. } => {
            let rhs: Value = serde_json::from_str(value).map_err(|_| coercion(value, "json"))?;
            Ok(json_contains(&lhs, &rhs))
        }
        Predicate::Between { low, high, .. } => {
            let above = compare_param(&lhs, low)?.ok_or_else(|| coercion(low, "ordered"))?;
            let below = compare_param(&lhs, high)?.ok_or_else(|| coercion(high, "ordered"))?;
            Ok(above != Ordering::Less && below != Ordering::Greater)
        }
        Predicate::InList { values, negated, .. } => {
            let mut found = false;
            for value in values {
                if compare_param(&lhs, value)? == Some(Ordering::Equal) {
                    found = true;
                    break;
                }
            }
            Ok(found != *negated)
        }
        Predicate::IsNull { .. } | Predicate::Raw { .. } => Ok(false),
    }
}

/// Compare a value with a text parameter coerced to the value's type.
///
/// Returns `None` when the two are unequal but have no order (documents).
fn compare_param(lhs: &Value, param: &str) -> Result<Option<Ordering>, BackendError> {
    match lhs {
        Value::Number(n) => {
            let p: f64 = param.trim().parse().map_err(|_| coercion(param, "numeric"))?;
            let n = n.as_f64().ok_or_else(|| coercion(param, "numeric"))?;
            Ok(n.partial_cmp(&p))
        }
        Value::Bool(b) => {
            let p = parse_bool(param).ok_or_else(|| coercion(param, "boolean"))?;
            Ok(Some(b.cmp(&p)))
        }
        Value::String(s) => Ok(Some(s.as_str().cmp(param))),
        Value::Array(_) | Value::Object(_) => {
            let p: Value = serde_json::from_str(param).map_err(|_| coercion(param, "json"))?;
            Ok((*lhs == p).then_some(Ordering::Equal))
        }
        Value::Null => Ok(None),
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "t" | "true" | "1" | "yes" | "on" => Some(true),
        "f" | "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parse an array parameter: a PostgreSQL literal (`{a,b}`) or a JSON array.
fn parse_array_param(value: &str) -> Result<Vec<String>, BackendError> {
    let trimmed = value.trim();
    if let Some(inner) = trimmed.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
        if inner.trim().is_empty() {
            return Ok(Vec::new());
        }
        return Ok(inner
            .split(',')
            .map(|e| e.trim().trim_matches('"').to_string())
            .collect());
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Array(items)) => Ok(items.iter().map(as_text).collect()),
        _ => Err(coercion(value, "array")),
    }
}

/// JSONB `@>` semantics.
fn json_contains(container: &Value, contained: &Value) -> bool {
    match (container, contained) {
        (Value::Object(a), Value::Object(b)) => b
            .iter()
            .all(|(k, bv)| a.get(k).is_some_and(|av| json_contains(av, bv))),
        (Value::Array(a), Value::Array(b)) => b
            .iter()
            .all(|bv| a.iter().any(|av| json_contains(av, bv))),
        (Value::Array(a), scalar) if !scalar.is_object() => a.iter().any(|av| av == scalar),
        (a, b) => loose_eq(a, b),
    }
}

fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// One element of a LIKE pattern.
#[derive(Clone, Copy, PartialEq)]
enum Wildcard {
    Any,
    One,
    Literal(char),
}

/// Match a string against a SQL LIKE pattern (`%`, `_`, backslash escapes).
///
/// Backtracks only to the most recent `%`, so the cost is bounded by
/// `value.len() * pattern.len()`.
pub(crate) fn like_match(value: &str, pattern: &str) -> bool {
    let value: Vec<char> = value.chars().collect();
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '%' => Wildcard::Any,
            '_' => Wildcard::One,
            // A trailing backslash can never match.
            '\\' => match chars.next() {
                Some(escaped) => Wildcard::Literal(escaped),
                None => return false,
            },
            other => Wildcard::Literal(other),
        });
    }

    let (mut v, mut t) = (0, 0);
    let mut resume: Option<(usize, usize)> = None;
    while v < value.len() {
        match tokens.get(t) {
            Some(Wildcard::Any) => {
                resume = Some((t, v));
                t += 1;
            }
            Some(Wildcard::One) => {
                v += 1;
                t += 1;
            }
            Some(Wildcard::Literal(c)) if *c == value[v] => {
                v += 1;
                t += 1;
            }
            _ => match resume {
                Some((star, from)) => {
                    t = star + 1;
                    v = from + 1;
                    resume = Some((star, from + 1));
                }
                None => return false,
            },
        }
    }
    tokens[t..].iter().all(|token| *token == Wildcard::Any)
}

fn sort_buckets(buckets: &mut [Vec<Frame<'_>>], keys: &[SortKey]) {
    if keys.is_empty() {
        return;
    }
    buckets.sort_by(|a, b| {
        for key in keys {
            let av = a.first().and_then(|f| f.value(&key.column));
            let bv = b.first().and_then(|f| f.value(&key.column));
            let ord = compare_sort(av, bv, key);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

fn compare_sort(a: Option<&Value>, b: Option<&Value>, key: &SortKey) -> Ordering {
    let nulls_first = match key.nulls {
        Some(NullsOrder::First) => true,
        Some(NullsOrder::Last) => false,
        None => key.direction == SortDirection::Desc,
    };
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) if nulls_first => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) if nulls_first => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => {
            let ord = compare_values(a, b);
            match key.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        }
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => rank(a)
            .cmp(&rank(b))
            .then_with(|| a.to_string().cmp(&b.to_string())),
    }
}

/// Shape a joined row for output.
///
/// Root columns land at the top level, joined relations nest under their
/// include path (`null` when the join matched nothing).
fn project(plan: &QueryPlan, frame: &Frame<'_>) -> Value {
    let mut out = Map::new();
    let root = frame.row(&plan.table);

    if plan.select.is_empty() && !plan.is_grouped() {
        for column in &plan.columns {
            let value = root.and_then(|r| r.get(column)).cloned().unwrap_or(Value::Null);
            out.insert(column.clone(), value);
        }
    }

    if !plan.is_grouped() {
        for join in &plan.joins {
            let nested = match frame.row(&join.alias) {
                Some(row) => Value::Object(
                    join.columns
                        .iter()
                        .map(|c| (c.clone(), row.get(c).cloned().unwrap_or(Value::Null)))
                        .collect(),
                ),
                None => Value::Null,
            };
            let segments: Vec<&str> = join.path.split('.').collect();
            if let Some((last, parents)) = segments.split_last() {
                insert_at(&mut out, parents, last, nested);
            }
        }
    }

    let explicit = if plan.select.is_empty() {
        &plan.group_by
    } else {
        &plan.select
    };
    for column in explicit {
        let value = frame.value(column).cloned().unwrap_or(Value::Null);
        match plan.join(&column.table) {
            Some(join) => {
                let segments: Vec<&str> = join.path.split('.').collect();
                let mut nested = segments.clone();
                nested.push(column.column.as_str());
                if let Some((last, parents)) = nested.split_last() {
                    insert_at(&mut out, parents, last, value);
                }
            }
            None => {
                out.insert(column.column.clone(), value);
            }
        }
    }
    Value::Object(out)
}

/// Insert `value` at `parents.key`, creating objects along the way.
/// Stops silently when a parent is not an object (an unmatched join).
fn insert_at(out: &mut Map<String, Value>, parents: &[&str], key: &str, value: Value) {
    let mut target = out;
    for parent in parents {
        let entry = target
            .entry(parent.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        match entry {
            Value::Object(map) => target = map,
            _ => return,
        }
    }
    target.insert(key.to_string(), value);
}
