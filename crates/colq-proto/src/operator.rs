//! Filter operators and their wire names.

use std::fmt;
use std::str::FromStr;

use rkyv::{Archive, Deserialize, Serialize};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

/// Backend operators that are not interpreted by the compiler but are
/// accepted by validation and passed through as `<expr> <op> ?`.
pub const PASSTHROUGH_OPERATORS: &[&str] = &[
    "~",
    "~*",
    "IS",
    "IS DISTINCT FROM",
    "@@",
    "<@",
    "&&",
    "&<",
    "&>",
    "-|-",
];

/// A filter operator as carried by a [`Where`](crate::Where) clause.
///
/// Parsing never fails: strings that do not name a known operator are kept
/// verbatim in [`FilterOperator::Raw`] so that validation can report them.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Archive,
    Serialize,
    Deserialize,
    SerdeSerialize,
    SerdeDeserialize,
)]
#[serde(from = "String", into = "String")]
pub enum FilterOperator {
    /// `=`
    Eq,
    /// `!=` (also parsed from `<>` and `NotEqual`).
    NotEq,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// Case-sensitive substring match.
    Like,
    /// Case-insensitive substring match.
    ILike,
    /// Membership in a comma-separated list.
    In,
    /// Non-membership in a comma-separated list.
    NotIn,
    /// Inclusive range given as `low,high`.
    Between,
    /// `= ANY(?)`
    Any,
    /// `= ALL(?)`
    All,
    /// Unary `IS NULL`.
    IsNull,
    /// Unary `IS NOT NULL`.
    IsNotNull,
    /// JSON containment, with nested `->>` extraction cast to JSON.
    ArrayFilter,
    /// JSON/array containment.
    ArrayContains,
    /// Anything else, passed through literally.
    Raw(String),
}

impl FilterOperator {
    /// Canonical wire name.
    pub fn as_str(&self) -> &str {
        match self {
            FilterOperator::Eq => "=",
            FilterOperator::NotEq => "!=",
            FilterOperator::Gt => ">",
            FilterOperator::Gte => ">=",
            FilterOperator::Lt => "<",
            FilterOperator::Lte => "<=",
            FilterOperator::Like => "LIKE",
            FilterOperator::ILike => "ILIKE",
            FilterOperator::In => "IN",
            FilterOperator::NotIn => "NotIn",
            FilterOperator::Between => "BETWEEN",
            FilterOperator::Any => "ANY",
            FilterOperator::All => "All",
            FilterOperator::IsNull => "IsNull",
            FilterOperator::IsNotNull => "IsNotNull",
            FilterOperator::ArrayFilter => "ArrayFilter",
            FilterOperator::ArrayContains => "ArrayContains",
            FilterOperator::Raw(op) => op,
        }
    }

    /// Parse a wire name, accepting the aliases older clients send.
    pub fn parse(s: &str) -> Self {
        match s {
            "=" => FilterOperator::Eq,
            "!=" | "<>" | "NotEqual" => FilterOperator::NotEq,
            ">" => FilterOperator::Gt,
            ">=" => FilterOperator::Gte,
            "<" => FilterOperator::Lt,
            "<=" => FilterOperator::Lte,
            "LIKE" => FilterOperator::Like,
            "ILIKE" => FilterOperator::ILike,
            "IN" => FilterOperator::In,
            "NotIn" | "NOT IN" => FilterOperator::NotIn,
            "BETWEEN" => FilterOperator::Between,
            "ANY" => FilterOperator::Any,
            "All" | "ALL" => FilterOperator::All,
            "IsNull" | "IS NULL" => FilterOperator::IsNull,
            "IsNotNull" | "NotNull" | "IS NOT NULL" => FilterOperator::IsNotNull,
            "ArrayFilter" => FilterOperator::ArrayFilter,
            "ArrayContains" | "contains" => FilterOperator::ArrayContains,
            other => FilterOperator::Raw(other.to_string()),
        }
    }

    /// Operators that take no value.
    pub fn is_unary(&self) -> bool {
        matches!(self, FilterOperator::IsNull | FilterOperator::IsNotNull)
    }

    /// Whether validation accepts this operator.
    pub fn is_recognized(&self) -> bool {
        match self {
            FilterOperator::Raw(op) => PASSTHROUGH_OPERATORS.contains(&op.as_str()),
            _ => true,
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOperator {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(FilterOperator::parse(s))
    }
}

impl From<&str> for FilterOperator {
    fn from(s: &str) -> Self {
        FilterOperator::parse(s)
    }
}

impl From<String> for FilterOperator {
    fn from(s: String) -> Self {
        FilterOperator::parse(&s)
    }
}

impl From<FilterOperator> for String {
    fn from(op: FilterOperator) -> Self {
        op.as_str().to_string()
    }
}
