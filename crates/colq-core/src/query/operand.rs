//! Typed operands parsed from the string value of a filter clause.

use colq_proto::FilterOperator;
use tracing::warn;

use crate::error::Error;

/// A filter value shaped for its operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// Unary operators bind nothing.
    None,
    /// One parameter bound as-is.
    Scalar(String),
    /// Substring pattern, already wrapped in `%`.
    Pattern(String),
    /// Inclusive range.
    Range(String, String),
    /// Membership list.
    List(Vec<String>),
}

impl Operand {
    /// Parse `value` for `operator`.
    ///
    /// `column` is only used for error reporting. A `BETWEEN` value that
    /// does not split into exactly two parts degrades to a scalar, which the
    /// compiler turns into an equality on the raw string.
    pub fn parse(operator: &FilterOperator, column: &str, value: &str) -> Result<Self, Error> {
        match operator {
            FilterOperator::IsNull | FilterOperator::IsNotNull => Ok(Operand::None),
            FilterOperator::Like | FilterOperator::ILike => Ok(Operand::Pattern(format!("%{value}%"))),
            FilterOperator::Between => match value.split(',').collect::<Vec<_>>().as_slice() {
                [low, high] => Ok(Operand::Range(low.to_string(), high.to_string())),
                _ => {
                    warn!(column, value, "BETWEEN value is not 'low,high', comparing for equality");
                    Ok(Operand::Scalar(value.to_string()))
                }
            },
            FilterOperator::In | FilterOperator::NotIn => {
                let values: Vec<String> = value.split(',').map(str::to_string).collect();
                if values.iter().any(String::is_empty) {
                    return Err(Error::InvalidValue {
                        column: column.to_string(),
                        operator: operator.to_string(),
                        reason: format!("empty element in list '{value}'"),
                    });
                }
                Ok(Operand::List(values))
            }
            _ => Ok(Operand::Scalar(value.to_string())),
        }
    }
}
