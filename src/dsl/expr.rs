//! Expression tree built by the query DSL
//!
//! Every node owns its children. Cloning an expression deep-copies the
//! tree, so two queries (or two fields of one query) never share a node.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::Kind;

/// Literal value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Value {
    /// Kind a literal carries before any coercion
    pub fn kind(&self) -> Kind {
        match self {
            Value::Bool(_) => Kind::Boolean,
            Value::Int(_) => Kind::BigInt,
            Value::Float(_) => Kind::Double,
            Value::String(_) => Kind::Varchar,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "'{}'", s),
        }
    }
}

macro_rules! value_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(i64::from(v))
            }
        })*
    };
}

value_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

// String literals are stored by value, separately from numeric scalars

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

/// Function applied by a UDF/UDAF node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FnKind {
    Max,
    Min,
    Count,
    Sum,
    Avg,
    /// Boolean negation
    Not,
}

impl FnKind {
    pub fn name(&self) -> &'static str {
        match self {
            FnKind::Max => "MAX",
            FnKind::Min => "MIN",
            FnKind::Count => "COUNT",
            FnKind::Sum => "SUM",
            FnKind::Avg => "AVG",
            FnKind::Not => "NOT",
        }
    }

    pub fn is_aggregate(&self) -> bool {
        !matches!(self, FnKind::Not)
    }

    /// Check if this function accepts an operand of `kind`
    pub fn accepts(&self, kind: Kind) -> bool {
        match self {
            FnKind::Count => true,
            FnKind::Max | FnKind::Min | FnKind::Sum | FnKind::Avg => kind.is_numeric(),
            FnKind::Not => kind == Kind::Boolean,
        }
    }

    /// Description of accepted operand kinds, for error messages
    pub fn expects(&self) -> &'static str {
        match self {
            FnKind::Count => "any",
            FnKind::Max | FnKind::Min | FnKind::Sum | FnKind::Avg => "numeric",
            FnKind::Not => "BOOLEAN",
        }
    }

    /// Result kind for an operand kind
    pub fn result_kind(&self, operand: Kind) -> Kind {
        match self {
            FnKind::Count => Kind::BigInt,
            FnKind::Max | FnKind::Min => operand,
            FnKind::Sum if operand.is_integer() => Kind::BigInt,
            FnKind::Sum | FnKind::Avg => Kind::Double,
            FnKind::Not => Kind::Boolean,
        }
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Like,
    ILike,
}

impl CompareOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Like => "LIKE",
            CompareOp::ILike => "ILIKE",
        }
    }

    /// Operator with operands swapped (`a < b` == `b > a`)
    pub fn flip(&self) -> CompareOp {
        match self {
            CompareOp::Gt => CompareOp::Lt,
            CompareOp::Ge => CompareOp::Le,
            CompareOp::Lt => CompareOp::Gt,
            CompareOp::Le => CompareOp::Ge,
            other => *other,
        }
    }

    pub fn is_pattern(&self) -> bool {
        matches!(self, CompareOp::Like | CompareOp::ILike)
    }
}

/// Logical connectives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    pub fn name(&self) -> &'static str {
        match self {
            LogicalOp::And => "AND",
            LogicalOp::Or => "OR",
        }
    }
}

/// Query expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column reference
    Column(String),
    /// Typed constant
    Const(Value),
    /// Function application over one operand
    Udf { kind: FnKind, operand: Box<Expr> },
    /// Binary comparison
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Membership in a literal list
    InList {
        expr: Box<Expr>,
        values: Vec<Value>,
        negated: bool,
    },
    /// AND / OR
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Named projection
    Alias { expr: Box<Expr>, name: String },
}

#[allow(clippy::should_implement_trait)]
impl Expr {
    fn compare(self, op: CompareOp, other: impl Into<Expr>) -> Expr {
        Expr::Compare {
            op,
            left: Box::new(self),
            right: Box::new(other.into()),
        }
    }

    /// `self = other`
    pub fn eq(self, other: impl Into<Expr>) -> Expr {
        self.compare(CompareOp::Eq, other)
    }

    /// `self != other`
    pub fn ne(self, other: impl Into<Expr>) -> Expr {
        self.compare(CompareOp::Ne, other)
    }

    pub fn gt(self, other: impl Into<Expr>) -> Expr {
        self.compare(CompareOp::Gt, other)
    }

    pub fn ge(self, other: impl Into<Expr>) -> Expr {
        self.compare(CompareOp::Ge, other)
    }

    pub fn lt(self, other: impl Into<Expr>) -> Expr {
        self.compare(CompareOp::Lt, other)
    }

    pub fn le(self, other: impl Into<Expr>) -> Expr {
        self.compare(CompareOp::Le, other)
    }

    /// Case-sensitive pattern match (`%` and `_` wildcards)
    pub fn like(self, pattern: impl Into<String>) -> Expr {
        self.compare(CompareOp::Like, Expr::Const(Value::String(pattern.into())))
    }

    /// Case-insensitive pattern match
    pub fn ilike(self, pattern: impl Into<String>) -> Expr {
        self.compare(CompareOp::ILike, Expr::Const(Value::String(pattern.into())))
    }

    /// `self IN (values)`
    pub fn is_in<I, V>(self, values: I) -> Expr
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Expr::InList {
            expr: Box::new(self),
            values: values.into_iter().map(Into::into).collect(),
            negated: false,
        }
    }

    /// `self NOT IN (values)`
    pub fn not_in<I, V>(self, values: I) -> Expr
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Expr::InList {
            expr: Box::new(self),
            values: values.into_iter().map(Into::into).collect(),
            negated: true,
        }
    }

    pub fn and(self, other: Expr) -> Expr {
        Expr::Logical {
            op: LogicalOp::And,
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    pub fn or(self, other: Expr) -> Expr {
        Expr::Logical {
            op: LogicalOp::Or,
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    /// Name the expression in the projection list
    pub fn alias(self, name: impl Into<String>) -> Expr {
        Expr::Alias {
            expr: Box::new(self),
            name: name.into(),
        }
    }

    /// Output name in a projection list
    pub fn output_name(&self) -> String {
        match self {
            Expr::Alias { name, .. } => name.clone(),
            Expr::Column(name) => name.clone(),
            other => other.to_string(),
        }
    }

    /// Check if this node is an aggregate application (looking through aliases)
    pub fn is_aggregate(&self) -> bool {
        match self {
            Expr::Udf { kind, .. } => kind.is_aggregate(),
            Expr::Alias { expr, .. } => expr.is_aggregate(),
            _ => false,
        }
    }

    /// Check if any node in the tree is an aggregate application
    pub fn contains_aggregate(&self) -> bool {
        match self {
            Expr::Column(_) | Expr::Const(_) => false,
            Expr::Udf { kind, operand } => kind.is_aggregate() || operand.contains_aggregate(),
            Expr::Compare { left, right, .. } | Expr::Logical { left, right, .. } => {
                left.contains_aggregate() || right.contains_aggregate()
            }
            Expr::InList { expr, .. } | Expr::Alias { expr, .. } => expr.contains_aggregate(),
        }
    }

    /// Referenced column names in visiting order (may repeat)
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Column(name) => out.push(name),
            Expr::Const(_) => {}
            Expr::Udf { operand, .. } => operand.collect_columns(out),
            Expr::Compare { left, right, .. } | Expr::Logical { left, right, .. } => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
            Expr::InList { expr, .. } | Expr::Alias { expr, .. } => expr.collect_columns(out),
        }
    }
}

impl From<Value> for Expr {
    fn from(v: Value) -> Self {
        Expr::Const(v)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column(name) => write!(f, "{}", name),
            Expr::Const(v) => write!(f, "{}", v),
            Expr::Udf { kind, operand } => write!(f, "{}({})", kind.name(), operand),
            Expr::Compare { op, left, right } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
            Expr::InList {
                expr,
                values,
                negated,
            } => {
                let list: Vec<String> = values.iter().map(Value::to_string).collect();
                let not = if *negated { "NOT " } else { "" };
                write!(f, "({} {}IN ({}))", expr, not, list.join(", "))
            }
            Expr::Logical { op, left, right } => {
                write!(f, "({} {} {})", left, op.name(), right)
            }
            Expr::Alias { expr, name } => write!(f, "{} AS {}", expr, name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str) -> Expr {
        Expr::Column(name.to_string())
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::from(7i32), Value::Int(7));
        assert_eq!(Value::from(7u8).kind(), Kind::BigInt);
        assert_eq!(Value::from(1.5f64), Value::Float(1.5));
        assert_eq!(Value::from("us"), Value::String("us".to_string()));
        assert_eq!(Value::from(String::from("eu")).as_str(), Some("eu"));
        assert_eq!(Value::from(true).kind(), Kind::Boolean);
    }

    #[test]
    fn test_fn_kind_operands() {
        assert!(FnKind::Count.accepts(Kind::Varchar));
        assert!(FnKind::Sum.accepts(Kind::Int));
        assert!(!FnKind::Sum.accepts(Kind::Varchar));
        assert!(!FnKind::Max.accepts(Kind::Boolean));
        assert!(FnKind::Not.accepts(Kind::Boolean));
        assert!(!FnKind::Not.is_aggregate());

        assert_eq!(FnKind::Sum.result_kind(Kind::Int), Kind::BigInt);
        assert_eq!(FnKind::Sum.result_kind(Kind::Float), Kind::Double);
        assert_eq!(FnKind::Avg.result_kind(Kind::Int), Kind::Double);
        assert_eq!(FnKind::Min.result_kind(Kind::SmallInt), Kind::SmallInt);
    }

    #[test]
    fn test_build_predicates() {
        let e = col("region")
            .eq(Expr::Const(Value::from("us")))
            .and(col("amount").gt(Expr::Const(Value::Int(10))));

        match &e {
            Expr::Logical { op, left, .. } => {
                assert_eq!(*op, LogicalOp::And);
                assert!(matches!(**left, Expr::Compare { op: CompareOp::Eq, .. }));
            }
            _ => panic!("Expected Logical"),
        }
        assert_eq!(e.columns(), vec!["region", "amount"]);
        assert_eq!(e.to_string(), "((region = 'us') AND (amount > 10))");
    }

    #[test]
    fn test_in_list_and_pattern() {
        let e = col("region").is_in(["us", "eu"]);
        assert_eq!(e.to_string(), "(region IN ('us', 'eu'))");

        let e = col("name").ilike("a%");
        assert!(matches!(e, Expr::Compare { op: CompareOp::ILike, .. }));

        let e = col("tier").not_in([1, 2]);
        assert_eq!(e.to_string(), "(tier NOT IN (1, 2))");
    }

    #[test]
    fn test_aggregate_detection() {
        let sum = Expr::Udf {
            kind: FnKind::Sum,
            operand: Box::new(col("amount")),
        };
        assert!(sum.is_aggregate());
        assert!(sum.clone().alias("total").is_aggregate());
        assert!(sum.clone().gt(Expr::Const(Value::Int(1))).contains_aggregate());
        assert!(!sum.clone().gt(Expr::Const(Value::Int(1))).is_aggregate());

        let not = Expr::Udf {
            kind: FnKind::Not,
            operand: Box::new(col("flag")),
        };
        assert!(!not.is_aggregate());
        assert!(!not.contains_aggregate());
    }

    #[test]
    fn test_output_names() {
        assert_eq!(col("amount").output_name(), "amount");
        assert_eq!(col("amount").alias("a").output_name(), "a");
        let max = Expr::Udf {
            kind: FnKind::Max,
            operand: Box::new(col("amount")),
        };
        assert_eq!(max.output_name(), "MAX(amount)");
    }

    #[test]
    fn test_clone_is_deep() {
        let original = col("x").eq(Expr::Const(Value::Int(1)));
        let mut copy = original.clone();
        if let Expr::Compare { left, .. } = &mut copy {
            **left = col("y");
        }
        assert_eq!(original.columns(), vec!["x"]);
        assert_eq!(copy.columns(), vec!["y"]);
    }
}
