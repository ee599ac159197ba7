//! EXPLAIN output formatting
//!
//! Formats execution plans for display to users, outermost step first.

use std::fmt::Write;

use crate::dsl::SortType;

use super::plan::{ExecutionPlan, PlanHints, TimeRange};

/// Format an execution plan for EXPLAIN output
pub struct ExplainOutput;

impl ExplainOutput {
    /// Format an execution plan as a string
    pub fn format(plan: &ExecutionPlan) -> String {
        let mut output = String::new();
        Self::format_plan(plan, &mut output);
        output
    }

    fn format_plan(plan: &ExecutionPlan, out: &mut String) {
        let mut indent = 0;

        if let Some(limit) = plan.limit() {
            writeln!(out, "Limit: {}", limit).unwrap();
            indent += 1;
        }

        if !plan.sort_by().is_empty() {
            let prefix = "  ".repeat(indent);
            let keys = projection_names(plan, plan.sort_by());
            let dir = match plan.sort_type() {
                SortType::Asc => "ASC",
                SortType::Desc => "DESC",
            };
            writeln!(out, "{}Sort: [{}] {}", prefix, keys.join(", "), dir).unwrap();
            indent += 1;
        }

        let prefix = "  ".repeat(indent);
        writeln!(out, "{}Project: [{}]", prefix, plan.output_names().join(", ")).unwrap();
        if !plan.masked_columns().is_empty() {
            writeln!(out, "{}  masked: [{}]", prefix, plan.masked_columns().join(", ")).unwrap();
        }
        indent += 1;

        if plan.is_aggregate() {
            let prefix = "  ".repeat(indent);
            let groups = projection_names(plan, plan.group_by());
            let aggregates: Vec<String> = plan
                .projections()
                .iter()
                .filter(|p| p.aggregate)
                .map(|p| p.expr.to_string())
                .collect();
            writeln!(out, "{}Aggregate", prefix).unwrap();
            if !groups.is_empty() {
                writeln!(out, "{}  group by: [{}]", prefix, groups.join(", ")).unwrap();
            }
            if !aggregates.is_empty() {
                writeln!(out, "{}  aggregates: [{}]", prefix, aggregates.join(", ")).unwrap();
            }
            indent += 1;
        }

        let prefix = "  ".repeat(indent);
        writeln!(out, "{}Scan: {}", prefix, plan.table()).unwrap();
        if let Some(f) = plan.filter() {
            writeln!(out, "{}  filter: {}", prefix, f).unwrap();
        }
        Self::format_hints(plan.hints(), &prefix, out)
    }

    fn format_hints(hints: &PlanHints, prefix: &str, out: &mut String) {
        for p in &hints.partitions {
            let values: Vec<String> = p.values.iter().map(ToString::to_string).collect();
            let chunks: Vec<String> = p.chunks.iter().map(ToString::to_string).collect();
            writeln!(
                out,
                "{}  partitions: {} IN ({}) chunks [{}]",
                prefix,
                p.column,
                values.join(", "),
                chunks.join(", ")
            )
            .unwrap();
        }
        if let Some(b) = &hints.bucket {
            writeln!(
                out,
                "{}  bucket: {} = {} -> {}/{}",
                prefix, b.column, b.value, b.bucket, b.count
            )
            .unwrap();
        }
        if let Some(range) = &hints.time_range {
            writeln!(out, "{}  time: {}", prefix, format_range(range)).unwrap();
        }
    }
}

/// Names of indexed projections; a decoded plan may carry indices out of range
fn projection_names(plan: &ExecutionPlan, indices: &[usize]) -> Vec<String> {
    indices
        .iter()
        .map(|&i| match plan.projections().get(i) {
            Some(p) => p.name.clone(),
            None => format!("<invalid #{}>", i),
        })
        .collect()
}

fn format_range(range: &TimeRange) -> String {
    let bound = |b: Option<i64>| b.map_or_else(|| "..".to_string(), |v| v.to_string());
    format!("[{}, {}]", bound(range.start), bound(range.end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::access::{AccessRule, AccessType, ActionType, Identity};
    use crate::catalog::{BucketInfo, Column, Kind, PartitionInfo, Table};
    use crate::config::PlannerConfig;
    use crate::dsl::{col, sum, v, Query};
    use crate::planner::Compiler;

    fn orders() -> Arc<Table> {
        Arc::new(
            Table::builder("orders")
                .field("region", Kind::Varchar)
                .field("user_id", Kind::BigInt)
                .field("amount", Kind::Int)
                .column(
                    "region",
                    Column::new().partition(PartitionInfo::new(["us", "eu"], 1)),
                )
                .column(
                    "user_id",
                    Column::new().rule(AccessRule::everyone(AccessType::Read, ActionType::Mask)),
                )
                .bucket(BucketInfo::new(8, "user_id"))
                .build()
                .unwrap(),
        )
    }

    fn compile(query: Query) -> ExecutionPlan {
        let compiler = Compiler::new(PlannerConfig::new(ActionType::Allow));
        query.compile(&compiler, &Identity::new("bob")).unwrap()
    }

    #[test]
    fn test_explain_simple_select() {
        let plan = compile(
            Query::new(orders())
                .select([col("amount")])
                .filter(col("amount").gt(v(18))),
        );

        let explain = ExplainOutput::format(&plan);
        assert_eq!(
            explain,
            "Project: [amount]\n  Scan: orders\n    filter: (amount > 18)\n"
        );
    }

    #[test]
    fn test_explain_full_pipeline() {
        let plan = compile(
            Query::new(orders())
                .select([col("region"), sum(col("amount"))])
                .filter(
                    col("region")
                        .eq(v("us"))
                        .and(col("user_id").eq(v(13)))
                        .and(col(Table::TIME_COLUMN).ge(v(100))),
                )
                .group_by([0])
                .sort([1], SortType::Desc)
                .limit(10),
        );

        let explain = ExplainOutput::format(&plan);
        let lines: Vec<&str> = explain.lines().collect();
        assert_eq!(lines[0], "Limit: 10");
        assert_eq!(lines[1], "  Sort: [SUM(amount)] DESC");
        assert_eq!(lines[2], "    Project: [region, SUM(amount)]");
        assert_eq!(lines[3], "      masked: [user_id]");
        assert_eq!(lines[4], "      Aggregate");
        assert_eq!(lines[5], "        group by: [region]");
        assert_eq!(lines[6], "        aggregates: [SUM(amount)]");
        assert_eq!(lines[7], "        Scan: orders");
        assert!(explain.contains("partitions: region IN ('us') chunks [0]"));
        assert!(explain.contains("bucket: user_id = 13 -> 5/8"));
        assert!(explain.contains("time: [100, ..]"));
    }

    #[test]
    fn test_explain_out_of_range_indices() {
        let plan = compile(Query::new(orders()).select([col("amount")]));
        let broken = ExecutionPlan::new(
            plan.table().to_string(),
            None,
            plan.projections().to_vec(),
            vec![4],
            vec![0, 9],
            SortType::Asc,
            None,
            Vec::new(),
            PlanHints::default(),
        );
        let decoded = ExecutionPlan::decode(&broken.encode().unwrap()).unwrap();

        let explain = ExplainOutput::format(&decoded);
        let lines: Vec<&str> = explain.lines().collect();
        assert_eq!(lines[0], "Sort: [amount, <invalid #9>] ASC");
        assert_eq!(lines[2], "    Aggregate");
        assert_eq!(lines[3], "      group by: [<invalid #4>]");
    }
}
