//! Query DSL
//!
//! ```ignore
//! use podql::dsl::{col, count, sum, table, v};
//!
//! let plan = table("sales.orders", &catalog)?
//!     .filter(col("region").eq(v("us")))
//!     .select([col("region"), sum(col("amount")), count(v(1))])
//!     .group_by([0])
//!     .sort([1], SortType::Desc)
//!     .limit(10)
//!     .compile(&compiler, &identity)?;
//! ```

pub mod expr;
pub mod query;

pub use expr::{CompareOp, Expr, FnKind, LogicalOp, Value};
pub use query::{Query, SortType};

use crate::catalog::MetaService;
use crate::planner::PlannerResult;

/// Start a query on a table resolved through the metadata service.
///
/// Every table carries the `_time_` column, declared or injected.
pub fn table(name: &str, meta: &dyn MetaService) -> PlannerResult<Query> {
    let table = meta.resolve(name)?;
    Ok(Query::new(table))
}

/// Column reference
pub fn col(name: impl Into<String>) -> Expr {
    Expr::Column(name.into())
}

/// Literal of any supported scalar (integers, floats, bools, strings)
pub fn v(value: impl Into<Value>) -> Expr {
    Expr::Const(value.into())
}

fn udf(kind: FnKind, operand: Expr) -> Expr {
    Expr::Udf {
        kind,
        operand: Box::new(operand),
    }
}

pub fn max(expr: Expr) -> Expr {
    udf(FnKind::Max, expr)
}

pub fn min(expr: Expr) -> Expr {
    udf(FnKind::Min, expr)
}

pub fn sum(expr: Expr) -> Expr {
    udf(FnKind::Sum, expr)
}

pub fn avg(expr: Expr) -> Expr {
    udf(FnKind::Avg, expr)
}

/// Row count.
///
/// The operand is always stored as a constant: it counts rows, so a
/// non-constant operand is kept only as its text and never read as a column.
pub fn count(expr: Expr) -> Expr {
    let operand = match expr {
        constant @ Expr::Const(_) => constant,
        other => Expr::Const(Value::String(other.to_string())),
    };
    udf(FnKind::Count, operand)
}

/// Boolean negation
pub fn reverse(expr: Expr) -> Expr {
    udf(FnKind::Not, expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, Kind, Table};
    use crate::planner::PlannerError;

    #[test]
    fn test_count_operand_is_constant() {
        let c = count(v(1));
        assert_eq!(
            c,
            Expr::Udf {
                kind: FnKind::Count,
                operand: Box::new(Expr::Const(Value::Int(1))),
            }
        );

        let c = count(col("amount"));
        match c {
            Expr::Udf { operand, .. } => {
                assert_eq!(*operand, Expr::Const(Value::String("amount".to_string())));
            }
            _ => panic!("Expected Udf"),
        }
        assert!(count(col("amount")).columns().is_empty());
    }

    #[test]
    fn test_literals() {
        assert_eq!(v(1), Expr::Const(Value::Int(1)));
        assert_eq!(v("us"), Expr::Const(Value::String("us".to_string())));
        assert_eq!(v(2.5), Expr::Const(Value::Float(2.5)));
    }

    #[test]
    fn test_udf_builders() {
        assert!(matches!(max(col("a")), Expr::Udf { kind: FnKind::Max, .. }));
        assert!(matches!(min(col("a")), Expr::Udf { kind: FnKind::Min, .. }));
        assert!(matches!(sum(col("a")), Expr::Udf { kind: FnKind::Sum, .. }));
        assert!(matches!(avg(col("a")), Expr::Udf { kind: FnKind::Avg, .. }));
        assert!(matches!(reverse(col("f")), Expr::Udf { kind: FnKind::Not, .. }));
    }

    #[test]
    fn test_table_resolution() {
        let catalog = Catalog::new();
        catalog
            .register(Table::builder("t").field("a", Kind::Int).build().unwrap())
            .unwrap();

        let q = table("t", &catalog).unwrap();
        assert_eq!(q.table().name(), "t");

        assert!(matches!(
            table("missing", &catalog),
            Err(PlannerError::TableNotFound(_))
        ));
    }
}
