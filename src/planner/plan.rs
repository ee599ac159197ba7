//! Compiled execution plan
//!
//! The plan is the only artifact handed to the execution layer. It owns a
//! lowered copy of every expression, has no reference back to the query
//! that produced it, and exposes no mutation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::{Kind, PartitionValue};
use crate::dsl::{CompareOp, FnKind, LogicalOp, SortType, Value};

use super::error::{PlannerError, PlannerResult};

/// Resolved, typed expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlanExpr {
    /// Physical column
    Column { name: String, kind: Kind, masked: bool },
    /// Derived column computed from `expr`
    Custom {
        name: String,
        kind: Kind,
        expr: String,
        masked: bool,
    },
    Literal(Value),
    Function {
        func: FnKind,
        arg: Box<PlanExpr>,
        kind: Kind,
    },
    Compare {
        op: CompareOp,
        left: Box<PlanExpr>,
        right: Box<PlanExpr>,
    },
    InList {
        expr: Box<PlanExpr>,
        values: Vec<Value>,
        negated: bool,
    },
    Logical {
        op: LogicalOp,
        left: Box<PlanExpr>,
        right: Box<PlanExpr>,
    },
}

impl PlanExpr {
    /// Result kind
    pub fn kind(&self) -> Kind {
        match self {
            PlanExpr::Column { kind, .. } => *kind,
            PlanExpr::Custom { kind, .. } => *kind,
            PlanExpr::Literal(v) => v.kind(),
            PlanExpr::Function { kind, .. } => *kind,
            PlanExpr::Compare { .. } | PlanExpr::InList { .. } | PlanExpr::Logical { .. } => {
                Kind::Boolean
            }
        }
    }

    /// Name of the column this node reads, if it is a column
    pub fn column_name(&self) -> Option<&str> {
        match self {
            PlanExpr::Column { name, .. } | PlanExpr::Custom { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Top level AND terms
    pub fn conjuncts(&self) -> Vec<&PlanExpr> {
        match self {
            PlanExpr::Logical {
                op: LogicalOp::And,
                left,
                right,
            } => {
                let mut terms = left.conjuncts();
                terms.extend(right.conjuncts());
                terms
            }
            other => vec![other],
        }
    }
}

impl fmt::Display for PlanExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanExpr::Column { name, masked, .. } | PlanExpr::Custom { name, masked, .. } => {
                if *masked {
                    write!(f, "mask({})", name)
                } else {
                    write!(f, "{}", name)
                }
            }
            PlanExpr::Literal(v) => write!(f, "{}", v),
            PlanExpr::Function { func, arg, .. } => write!(f, "{}({})", func.name(), arg),
            PlanExpr::Compare { op, left, right } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
            PlanExpr::InList {
                expr,
                values,
                negated,
            } => {
                let list: Vec<String> = values.iter().map(Value::to_string).collect();
                let not = if *negated { "NOT " } else { "" };
                write!(f, "({} {}IN ({}))", expr, not, list.join(", "))
            }
            PlanExpr::Logical { op, left, right } => {
                write!(f, "({} {} {})", left, op.name(), right)
            }
        }
    }
}

/// One output column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub name: String,
    pub expr: PlanExpr,
    pub kind: Kind,
    pub aggregate: bool,
}

/// Partition values (and their chunks) that can contain matching rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionHint {
    pub column: String,
    pub values: Vec<PartitionValue>,
    pub chunks: Vec<usize>,
}

/// Single bucket that can contain matching rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketHint {
    pub column: String,
    pub value: u64,
    pub bucket: u64,
    pub count: u64,
}

/// Inclusive bounds on the time column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Option<i64>,
    pub end: Option<i64>,
}

impl TimeRange {
    /// Check if no time value can satisfy the range
    pub fn is_empty(&self) -> bool {
        matches!((self.start, self.end), (Some(s), Some(e)) if s > e)
    }
}

/// Optional scan narrowing attached to a plan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanHints {
    pub partitions: Vec<PartitionHint>,
    pub bucket: Option<BucketHint>,
    pub time_range: Option<TimeRange>,
}

impl PlanHints {
    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty() && self.bucket.is_none() && self.time_range.is_none()
    }
}

/// Immutable compiled query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    table: String,
    filter: Option<PlanExpr>,
    projections: Vec<Projection>,
    group_by: Vec<usize>,
    sort_by: Vec<usize>,
    sort_type: SortType,
    limit: Option<u64>,
    masked_columns: Vec<String>,
    hints: PlanHints,
}

impl ExecutionPlan {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        table: String,
        filter: Option<PlanExpr>,
        projections: Vec<Projection>,
        group_by: Vec<usize>,
        sort_by: Vec<usize>,
        sort_type: SortType,
        limit: Option<u64>,
        masked_columns: Vec<String>,
        hints: PlanHints,
    ) -> Self {
        Self {
            table,
            filter,
            projections,
            group_by,
            sort_by,
            sort_type,
            limit,
            masked_columns,
            hints,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn filter(&self) -> Option<&PlanExpr> {
        self.filter.as_ref()
    }

    pub fn projections(&self) -> &[Projection] {
        &self.projections
    }

    /// Output column names in projection order
    pub fn output_names(&self) -> Vec<&str> {
        self.projections.iter().map(|p| p.name.as_str()).collect()
    }

    /// Projection indices to group by
    pub fn group_by(&self) -> &[usize] {
        &self.group_by
    }

    /// Projection indices to sort by
    pub fn sort_by(&self) -> &[usize] {
        &self.sort_by
    }

    pub fn sort_type(&self) -> SortType {
        self.sort_type
    }

    /// Row cap, `None` = unlimited
    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn is_aggregate(&self) -> bool {
        !self.group_by.is_empty() || self.projections.iter().any(|p| p.aggregate)
    }

    /// Columns whose values must be masked, sorted
    pub fn masked_columns(&self) -> &[String] {
        &self.masked_columns
    }

    pub fn hints(&self) -> &PlanHints {
        &self.hints
    }

    /// Partition hint of a column
    pub fn partition_hint(&self, column: &str) -> Option<&PartitionHint> {
        self.hints.partitions.iter().find(|h| h.column == column)
    }

    /// Serialize for the execution layer
    pub fn encode(&self) -> PlannerResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| PlannerError::Encoding(e.to_string()))
    }

    /// Deserialize a plan produced by `encode`
    pub fn decode(bytes: &[u8]) -> PlannerResult<Self> {
        bincode::deserialize(bytes).map_err(|e| PlannerError::Encoding(e.to_string()))
    }
}
