//! Planner error types

use thiserror::Error;

use crate::access::AccessType;
use crate::catalog::{CatalogError, Kind};

/// Planner error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlannerError {
    /// Table could not be resolved
    #[error("Table '{0}' not found")]
    TableNotFound(String),

    /// Referenced column is not in the table schema
    #[error("Column '{column}' not found in table '{table}'")]
    ColumnNotFound { table: String, column: String },

    /// Access rules reject the request
    #[error("Access denied: {} on {}", access_name(.access), target(.table, .column))]
    AccessDenied {
        table: String,
        column: Option<String>,
        access: AccessType,
    },

    /// Operand kind not accepted where it is used
    #[error("Type mismatch in {context}: expected {expected}, found {}", kind_name(.found))]
    TypeMismatch {
        context: String,
        expected: String,
        found: Kind,
    },

    /// Partition descriptor cannot be used as a key
    #[error("Invalid partition column '{column}': {reason}")]
    InvalidPartitionColumn { column: String, reason: String },

    /// Builder state cannot be compiled
    #[error("Invalid query state: {0}")]
    InvalidQueryState(String),

    /// Table metadata rejected for another reason
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// Plan could not be encoded or decoded
    #[error("Plan encoding error: {0}")]
    Encoding(String),
}

fn access_name(access: &AccessType) -> &'static str {
    access.to_str()
}

fn kind_name(kind: &Kind) -> &'static str {
    kind.to_str()
}

fn target(table: &str, column: &Option<String>) -> String {
    match column {
        Some(c) => format!("{}.{}", table, c),
        None => table.to_string(),
    }
}

impl From<CatalogError> for PlannerError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::TableNotFound(name) => PlannerError::TableNotFound(name),
            CatalogError::ColumnNotFound { table, column } => {
                PlannerError::ColumnNotFound { table, column }
            }
            CatalogError::InvalidPartitionColumn { column, reason } => {
                PlannerError::InvalidPartitionColumn { column, reason }
            }
            other => PlannerError::Metadata(other.to_string()),
        }
    }
}

/// Result type for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_error_mapping() {
        assert_eq!(
            PlannerError::from(CatalogError::TableNotFound("t".to_string())),
            PlannerError::TableNotFound("t".to_string())
        );
        assert!(matches!(
            PlannerError::from(CatalogError::TableExists("t".to_string())),
            PlannerError::Metadata(_)
        ));
    }

    #[test]
    fn test_messages() {
        let err = PlannerError::AccessDenied {
            table: "orders".to_string(),
            column: Some("ssn".to_string()),
            access: AccessType::Read,
        };
        assert_eq!(err.to_string(), "Access denied: READ on orders.ssn");

        let err = PlannerError::TypeMismatch {
            context: "SUM".to_string(),
            expected: "numeric".to_string(),
            found: Kind::Varchar,
        };
        assert_eq!(
            err.to_string(),
            "Type mismatch in SUM: expected numeric, found VARCHAR"
        );
    }
}
