//! Scan hint derivation
//!
//! Applies hint rules to a lowered filter. Hints never change query
//! results; they only let the execution layer skip partitions, buckets
//! and time ranges that cannot match.

pub mod rules;

pub use rules::{BucketSelection, HintRule, PartitionPruning, TimeRangeExtraction};

use crate::catalog::ColumnMetadata;
use crate::config::PlannerConfig;
use crate::planner::plan::{PlanExpr, PlanHints};

/// Runs a sequence of hint rules
pub struct Optimizer {
    rules: Vec<Box<dyn HintRule>>,
}

impl Optimizer {
    /// Create an optimizer with the rules enabled in `config`
    pub fn new(config: &PlannerConfig) -> Self {
        let mut rules: Vec<Box<dyn HintRule>> = vec![Box::new(TimeRangeExtraction)];
        if config.enable_partition_pruning {
            rules.push(Box::new(PartitionPruning));
        }
        if config.enable_bucket_hints {
            rules.push(Box::new(BucketSelection));
        }
        Self { rules }
    }

    /// Create an optimizer with custom rules
    pub fn with_rules(rules: Vec<Box<dyn HintRule>>) -> Self {
        Self { rules }
    }

    /// Derive hints for a filter by applying all rules
    pub fn optimize(&self, meta: &dyn ColumnMetadata, filter: Option<&PlanExpr>) -> PlanHints {
        let Some(filter) = filter else {
            return PlanHints::default();
        };
        self.rules
            .iter()
            .fold(PlanHints::default(), |hints, rule| rule.apply(meta, filter, hints))
    }

    /// Get the names of all rules
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::ActionType;

    #[test]
    fn test_rules_follow_config() {
        let all = Optimizer::new(&PlannerConfig::new(ActionType::Allow));
        assert_eq!(
            all.rule_names(),
            vec!["time_range_extraction", "partition_pruning", "bucket_selection"]
        );

        let config = PlannerConfig::new(ActionType::Allow)
            .partition_pruning(false)
            .bucket_hints(false);
        assert_eq!(
            Optimizer::new(&config).rule_names(),
            vec!["time_range_extraction"]
        );

        assert!(Optimizer::with_rules(Vec::new()).rule_names().is_empty());
    }
}
