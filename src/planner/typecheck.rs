//! Type checking for lowered plan expressions
//!
//! The type checker verifies:
//! - Comparison operands are compatible
//! - Pattern matches are applied to strings
//! - Logical connectives and negation see boolean operands
//! - Aggregate operands have a kind the function accepts

use crate::catalog::Kind;
use crate::dsl::FnKind;

use super::error::{PlannerError, PlannerResult};
use super::plan::PlanExpr;

/// Type checker
pub struct TypeChecker;

impl TypeChecker {
    /// Check an expression tree bottom-up
    pub fn check(expr: &PlanExpr) -> PlannerResult<()> {
        match expr {
            PlanExpr::Column { .. } | PlanExpr::Custom { .. } | PlanExpr::Literal(_) => Ok(()),
            PlanExpr::Function { func, arg, .. } => {
                Self::check(arg)?;
                Self::function_kind(*func, arg.kind()).map(|_| ())
            }
            PlanExpr::Compare { op, left, right } => {
                Self::check(left)?;
                Self::check(right)?;
                if op.is_pattern() {
                    Self::check_is_string(left, op.symbol())?;
                    Self::check_is_string(right, op.symbol())
                } else if Self::types_compatible(left.kind(), right.kind()) {
                    Ok(())
                } else {
                    Err(PlannerError::TypeMismatch {
                        context: format!("{}", expr),
                        expected: left.kind().to_str().to_string(),
                        found: right.kind(),
                    })
                }
            }
            PlanExpr::InList { expr: inner, values, .. } => {
                Self::check(inner)?;
                let kind = inner.kind();
                for value in values {
                    if !Self::types_compatible(kind, value.kind()) {
                        return Err(PlannerError::TypeMismatch {
                            context: "IN list".to_string(),
                            expected: kind.to_str().to_string(),
                            found: value.kind(),
                        });
                    }
                }
                Ok(())
            }
            PlanExpr::Logical { op, left, right } => {
                Self::check(left)?;
                Self::check(right)?;
                Self::check_is_boolean(left, op.name())?;
                Self::check_is_boolean(right, op.name())
            }
        }
    }

    /// Result kind of a function applied to an operand of `operand` kind
    pub fn function_kind(func: FnKind, operand: Kind) -> PlannerResult<Kind> {
        if func.accepts(operand) {
            Ok(func.result_kind(operand))
        } else {
            Err(PlannerError::TypeMismatch {
                context: func.name().to_string(),
                expected: func.expects().to_string(),
                found: operand,
            })
        }
    }

    /// Check expression evaluates to boolean
    pub fn check_is_boolean(expr: &PlanExpr, context: &str) -> PlannerResult<()> {
        let kind = expr.kind();
        if kind == Kind::Boolean {
            Ok(())
        } else {
            Err(PlannerError::TypeMismatch {
                context: context.to_string(),
                expected: Kind::Boolean.to_str().to_string(),
                found: kind,
            })
        }
    }

    fn check_is_string(expr: &PlanExpr, context: &str) -> PlannerResult<()> {
        let kind = expr.kind();
        if kind.is_string() {
            Ok(())
        } else {
            Err(PlannerError::TypeMismatch {
                context: context.to_string(),
                expected: Kind::Varchar.to_str().to_string(),
                found: kind,
            })
        }
    }

    /// Check if two kinds can be compared
    pub fn types_compatible(a: Kind, b: Kind) -> bool {
        a == b || (a.is_numeric() && b.is_numeric())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::{CompareOp, LogicalOp, Value};

    fn column(name: &str, kind: Kind) -> PlanExpr {
        PlanExpr::Column {
            name: name.to_string(),
            kind,
            masked: false,
        }
    }

    fn compare(op: CompareOp, left: PlanExpr, right: PlanExpr) -> PlanExpr {
        PlanExpr::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    #[test]
    fn test_numeric_comparison() {
        let e = compare(
            CompareOp::Gt,
            column("amount", Kind::Int),
            PlanExpr::Literal(Value::Float(2.5)),
        );
        assert!(TypeChecker::check(&e).is_ok());
    }

    #[test]
    fn test_string_vs_number_mismatch() {
        let e = compare(
            CompareOp::Eq,
            column("region", Kind::Varchar),
            PlanExpr::Literal(Value::Int(1)),
        );
        assert!(matches!(
            TypeChecker::check(&e),
            Err(PlannerError::TypeMismatch {
                found: Kind::BigInt,
                ..
            })
        ));
    }

    #[test]
    fn test_pattern_requires_strings() {
        let ok = compare(
            CompareOp::Like,
            column("region", Kind::Varchar),
            PlanExpr::Literal(Value::from("u%")),
        );
        assert!(TypeChecker::check(&ok).is_ok());

        let bad = compare(
            CompareOp::ILike,
            column("amount", Kind::Int),
            PlanExpr::Literal(Value::from("1%")),
        );
        assert!(TypeChecker::check(&bad).is_err());
    }

    #[test]
    fn test_in_list_kinds() {
        let ok = PlanExpr::InList {
            expr: Box::new(column("tier", Kind::SmallInt)),
            values: vec![Value::Int(1), Value::Int(2)],
            negated: false,
        };
        assert!(TypeChecker::check(&ok).is_ok());

        let bad = PlanExpr::InList {
            expr: Box::new(column("tier", Kind::SmallInt)),
            values: vec![Value::Int(1), Value::from("two")],
            negated: true,
        };
        assert!(TypeChecker::check(&bad).is_err());
    }

    #[test]
    fn test_logical_operands_boolean() {
        let e = PlanExpr::Logical {
            op: LogicalOp::And,
            left: Box::new(column("flag", Kind::Boolean)),
            right: Box::new(column("amount", Kind::Int)),
        };
        let err = TypeChecker::check(&e).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Type mismatch in AND: expected BOOLEAN, found INT"
        );
    }

    #[test]
    fn test_function_kind() {
        assert_eq!(
            TypeChecker::function_kind(FnKind::Count, Kind::Varchar).unwrap(),
            Kind::BigInt
        );
        assert_eq!(
            TypeChecker::function_kind(FnKind::Max, Kind::Double).unwrap(),
            Kind::Double
        );
        assert!(TypeChecker::function_kind(FnKind::Sum, Kind::Varchar).is_err());
        assert!(TypeChecker::function_kind(FnKind::Not, Kind::Int).is_err());
    }
}
