//! Structural validation of collection queries.

use crate::query::{CollectionQuery, IncludeSelect, Order, Where};
use thiserror::Error;

/// A structurally invalid query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    /// Path of the offending field, e.g. `where[1][0].operator`.
    pub field: String,
    /// What is wrong with it.
    pub reason: String,
}

impl ValidationError {
    /// Create a validation error.
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }

    fn required(field: impl Into<String>) -> Self {
        Self::new(field, "is required")
    }
}

impl Where {
    /// Validate a clause located at `path`.
    pub fn validate_at(&self, path: &str) -> Result<(), ValidationError> {
        if self.column.is_empty() {
            return Err(ValidationError::required(format!("{path}.column")));
        }
        if self.operator.as_str().is_empty() {
            return Err(ValidationError::required(format!("{path}.operator")));
        }
        if !self.operator.is_recognized() {
            return Err(ValidationError::new(
                format!("{path}.operator"),
                format!("unrecognized operator '{}'", self.operator),
            ));
        }
        if self.value.is_empty() && !self.operator.is_unary() {
            return Err(ValidationError::required(format!("{path}.value")));
        }
        Ok(())
    }
}

impl Order {
    /// Validate a sort key located at `path`.
    pub fn validate_at(&self, path: &str) -> Result<(), ValidationError> {
        if self.column.is_empty() {
            return Err(ValidationError::required(format!("{path}.column")));
        }
        Ok(())
    }
}

impl IncludeSelect {
    /// Validate an include located at `path`.
    pub fn validate_at(&self, path: &str) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::required(format!("{path}.name")));
        }
        if self.select.is_empty() {
            return Err(ValidationError::required(format!("{path}.select")));
        }
        validate_names(&self.select, &format!("{path}.select"))
    }
}

impl CollectionQuery {
    /// Check every structural requirement, reporting the first violation.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_names(&self.select, "select")?;
        validate_groups(&self.where_, "where")?;
        for (i, order) in self.order_by.iter().enumerate() {
            order.validate_at(&format!("order_by[{i}]"))?;
        }
        validate_names(&self.includes, "includes")?;
        for (i, include) in self.include_and_select.iter().enumerate() {
            include.validate_at(&format!("include_and_select[{i}]"))?;
        }
        validate_names(&self.group_by, "group_by")?;
        validate_groups(&self.having, "having")?;
        Ok(())
    }
}

fn validate_names(names: &[String], field: &str) -> Result<(), ValidationError> {
    match names.iter().position(String::is_empty) {
        Some(i) => Err(ValidationError::new(
            format!("{field}[{i}]"),
            "must not be empty",
        )),
        None => Ok(()),
    }
}

fn validate_groups(groups: &[Vec<Where>], field: &str) -> Result<(), ValidationError> {
    for (g, group) in groups.iter().enumerate() {
        for (i, clause) in group.iter().enumerate() {
            clause.validate_at(&format!("{field}[{g}][{i}]"))?;
        }
    }
    Ok(())
}
