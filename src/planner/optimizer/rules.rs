//! Hint rules
//!
//! Rules that inspect a lowered filter and narrow the scan. A rule that
//! cannot prove anything leaves the hints untouched.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::catalog::{ColumnMetadata, PartitionValue, Table, PK};
use crate::dsl::{CompareOp, LogicalOp, Value};
use crate::planner::plan::{BucketHint, PartitionHint, PlanExpr, PlanHints};

/// Hint rule trait
pub trait HintRule: Send + Sync {
    /// Rule name for debugging
    fn name(&self) -> &'static str;

    /// Derive hints from a filter
    fn apply(&self, meta: &dyn ColumnMetadata, filter: &PlanExpr, hints: PlanHints) -> PlanHints;
}

/// `column <op> literal`, with the operator flipped when the literal is on the left
fn column_comparison(expr: &PlanExpr) -> Option<(&str, CompareOp, &Value)> {
    let PlanExpr::Compare { op, left, right } = expr else {
        return None;
    };
    match (left.as_ref(), right.as_ref()) {
        (PlanExpr::Column { name, .. }, PlanExpr::Literal(v)) => Some((name, *op, v)),
        (PlanExpr::Literal(v), PlanExpr::Column { name, .. }) => Some((name, op.flip(), v)),
        _ => None,
    }
}

/// Restrict scanned partitions from predicates on partition columns
pub struct PartitionPruning;

impl HintRule for PartitionPruning {
    fn name(&self) -> &'static str {
        "partition_pruning"
    }

    fn apply(&self, meta: &dyn ColumnMetadata, filter: &PlanExpr, mut hints: PlanHints) -> PlanHints {
        let Some(pod) = meta.pod() else {
            return hints;
        };

        for pk in pod.keys() {
            let Some(positions) = self.constrain(filter, pk) else {
                continue;
            };
            // Nothing pruned
            if positions.len() == pk.values().len() {
                continue;
            }

            let values = positions.iter().map(|&p| pk.values()[p].clone()).collect();
            let chunks: BTreeSet<usize> = positions.iter().map(|&p| pk.chunk_of(p)).collect();

            tracing::debug!(
                column = %pk.column(),
                kept = positions.len(),
                declared = pk.values().len(),
                "Partition pruned"
            );

            hints.partitions.push(PartitionHint {
                column: pk.column().to_string(),
                values,
                chunks: chunks.into_iter().collect(),
            });
        }
        hints
    }
}

impl PartitionPruning {
    /// Positions of declared values that can satisfy `expr`, `None` if
    /// the expression says nothing about this key
    fn constrain(&self, expr: &PlanExpr, pk: &PK) -> Option<BTreeSet<usize>> {
        match expr {
            PlanExpr::Logical { op, left, right } => {
                let l = self.constrain(left, pk);
                let r = self.constrain(right, pk);
                match (op, l, r) {
                    (LogicalOp::And, Some(a), Some(b)) => Some(a.intersection(&b).copied().collect()),
                    (LogicalOp::And, Some(a), None) | (LogicalOp::And, None, Some(a)) => Some(a),
                    (LogicalOp::Or, Some(a), Some(b)) => Some(a.union(&b).copied().collect()),
                    _ => None,
                }
            }
            PlanExpr::Compare { .. } => {
                let (column, op, literal) = column_comparison(expr)?;
                if column != pk.column() || op.is_pattern() {
                    return None;
                }
                Self::select(pk, |value| {
                    compare_partition(value, literal).map(|ord| match op {
                        CompareOp::Eq => ord == Ordering::Equal,
                        CompareOp::Ne => ord != Ordering::Equal,
                        CompareOp::Gt => ord == Ordering::Greater,
                        CompareOp::Ge => ord != Ordering::Less,
                        CompareOp::Lt => ord == Ordering::Less,
                        CompareOp::Le => ord != Ordering::Greater,
                        CompareOp::Like | CompareOp::ILike => true,
                    })
                })
            }
            PlanExpr::InList {
                expr,
                values,
                negated,
            } => {
                match expr.as_ref() {
                    PlanExpr::Column { name, .. } if name == pk.column() => {}
                    _ => return None,
                }
                Self::select(pk, |value| {
                    let mut found = false;
                    for literal in values {
                        if compare_partition(value, literal)? == Ordering::Equal {
                            found = true;
                        }
                    }
                    Some(found != *negated)
                })
            }
            _ => None,
        }
    }

    /// Positions whose value passes `keep`; `None` if any value is not comparable
    fn select<F>(pk: &PK, keep: F) -> Option<BTreeSet<usize>>
    where
        F: Fn(&PartitionValue) -> Option<bool>,
    {
        let mut positions = BTreeSet::new();
        for (position, value) in pk.values().iter().enumerate() {
            if keep(value)? {
                positions.insert(position);
            }
        }
        Some(positions)
    }
}

fn compare_partition(value: &PartitionValue, literal: &Value) -> Option<Ordering> {
    match (value, literal) {
        (PartitionValue::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (PartitionValue::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
        (PartitionValue::Str(a), Value::String(b)) => Some(a.as_str().cmp(b.as_str())),
        _ => None,
    }
}

/// Pick the bucket from an equality on the bucket column
pub struct BucketSelection;

impl HintRule for BucketSelection {
    fn name(&self) -> &'static str {
        "bucket_selection"
    }

    fn apply(&self, meta: &dyn ColumnMetadata, filter: &PlanExpr, mut hints: PlanHints) -> PlanHints {
        let bucket = meta.bucket();
        if bucket.is_empty() {
            return hints;
        }

        for term in filter.conjuncts() {
            let Some((column, CompareOp::Eq, literal)) = column_comparison(term) else {
                continue;
            };
            if column != bucket.bucket_column {
                continue;
            }
            // Negative keys have no bucket
            let Some(value) = literal.as_int().and_then(|i| u64::try_from(i).ok()) else {
                continue;
            };
            let Some(index) = bucket.bucket(value) else {
                break;
            };

            let hint = BucketHint {
                column: column.to_string(),
                value,
                bucket: index,
                count: bucket.count,
            };
            tracing::debug!(column = %hint.column, bucket = hint.bucket, "Bucket selected");
            hints.bucket = Some(hint);
            break;
        }
        hints
    }
}

/// Collect bounds on the time column
pub struct TimeRangeExtraction;

impl HintRule for TimeRangeExtraction {
    fn name(&self) -> &'static str {
        "time_range_extraction"
    }

    fn apply(&self, _meta: &dyn ColumnMetadata, filter: &PlanExpr, mut hints: PlanHints) -> PlanHints {
        let mut range = hints.time_range.unwrap_or_default();
        let mut bounded = hints.time_range.is_some();

        for term in filter.conjuncts() {
            let Some((column, op, literal)) = column_comparison(term) else {
                continue;
            };
            if column != Table::TIME_COLUMN {
                continue;
            }
            let Some(t) = literal.as_int() else {
                continue;
            };

            let (start, end) = match op {
                CompareOp::Eq => (Some(t), Some(t)),
                CompareOp::Gt => (Some(t.saturating_add(1)), None),
                CompareOp::Ge => (Some(t), None),
                CompareOp::Lt => (None, Some(t.saturating_sub(1))),
                CompareOp::Le => (None, Some(t)),
                _ => continue,
            };
            if let Some(s) = start {
                range.start = Some(range.start.map_or(s, |cur| cur.max(s)));
            }
            if let Some(e) = end {
                range.end = Some(range.end.map_or(e, |cur| cur.min(e)));
            }
            bounded = true;
        }

        if bounded {
            tracing::debug!(start = ?range.start, end = ?range.end, "Time range extracted");
            hints.time_range = Some(range);
        }
        hints
    }
}
