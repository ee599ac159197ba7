//! Query builder
//!
//! A `Query` is bound to one table and accumulates filter, projections,
//! grouping, sorting and limit. Builder methods take the query by value and
//! return it, so expression ownership moves along the chain.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::access::Identity;
use crate::catalog::Table;
use crate::planner::{Compiler, ExecutionPlan, PlannerResult};

use super::expr::Expr;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortType {
    #[default]
    Asc,
    Desc,
}

/// Logical query under construction
#[derive(Debug, Clone)]
pub struct Query {
    table: Arc<Table>,
    filter: Option<Expr>,
    selects: Vec<Expr>,
    /// Indices into `selects`
    groups: Vec<usize>,
    /// Indices into `selects`
    sorts: Vec<usize>,
    sort_type: SortType,
    /// 0 = unlimited
    limit: usize,
}

impl Query {
    /// Create an empty query over a table
    pub fn new(table: Arc<Table>) -> Self {
        Self {
            table,
            filter: None,
            selects: Vec::new(),
            groups: Vec::new(),
            sorts: Vec::new(),
            sort_type: SortType::Asc,
            limit: 0,
        }
    }

    /// Set the boolean filter (WHERE).
    ///
    /// Replaces any previous filter; combine predicates with `Expr::and`.
    #[must_use]
    pub fn filter(mut self, predicate: Expr) -> Self {
        self.filter = Some(predicate);
        self
    }

    /// Replace the projection list
    #[must_use]
    pub fn select<I>(mut self, exprs: I) -> Self
    where
        I: IntoIterator<Item = Expr>,
    {
        self.selects = exprs.into_iter().collect();
        self
    }

    /// Group by projection indices
    #[must_use]
    pub fn group_by<I>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        self.groups = groups.into_iter().collect();
        self
    }

    /// Sort ascending by projection indices
    #[must_use]
    pub fn sort_by<I>(self, sorts: I) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        self.sort(sorts, SortType::Asc)
    }

    /// Sort by projection indices in the given direction
    #[must_use]
    pub fn sort<I>(mut self, sorts: I, sort_type: SortType) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        self.sorts = sorts.into_iter().collect();
        self.sort_type = sort_type;
        self
    }

    /// Cap returned rows, 0 = unlimited
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn table(&self) -> &Arc<Table> {
        &self.table
    }

    /// Current filter
    pub fn predicate(&self) -> Option<&Expr> {
        self.filter.as_ref()
    }

    pub fn selects(&self) -> &[Expr] {
        &self.selects
    }

    pub fn groups(&self) -> &[usize] {
        &self.groups
    }

    pub fn sorts(&self) -> &[usize] {
        &self.sorts
    }

    pub fn sort_type(&self) -> SortType {
        self.sort_type
    }

    pub fn row_limit(&self) -> usize {
        self.limit
    }

    /// Validate against the bound table and lower into an execution plan
    pub fn compile(&self, compiler: &Compiler, identity: &Identity) -> PlannerResult<ExecutionPlan> {
        compiler.compile(self, identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Kind;
    use crate::dsl::expr::Value;

    fn query() -> Query {
        let table = Table::builder("t")
            .field("x", Kind::Int)
            .field("y", Kind::Int)
            .build()
            .unwrap();
        Query::new(Arc::new(table))
    }

    fn col(name: &str) -> Expr {
        Expr::Column(name.to_string())
    }

    #[test]
    fn test_defaults() {
        let q = query();
        assert!(q.predicate().is_none());
        assert!(q.selects().is_empty());
        assert_eq!(q.sort_type(), SortType::Asc);
        assert_eq!(q.row_limit(), 0);
    }

    #[test]
    fn test_filter_replaces() {
        let q = query().filter(col("x").eq(Expr::Const(Value::Int(1))));
        let captured = q.predicate().cloned().unwrap();

        let q = q.filter(col("y").eq(Expr::Const(Value::Int(2))));

        assert_eq!(captured.columns(), vec!["x"]);
        assert_eq!(q.predicate().unwrap().columns(), vec!["y"]);
    }

    #[test]
    fn test_fields_overwrite() {
        let q = query()
            .select([col("x"), col("y")])
            .group_by([0])
            .sort([1], SortType::Desc)
            .limit(10)
            .select([col("y")])
            .group_by(Vec::new())
            .sort_by([0]);

        assert_eq!(q.selects(), &[col("y")]);
        assert!(q.groups().is_empty());
        assert_eq!(q.sorts(), &[0]);
        assert_eq!(q.sort_type(), SortType::Asc);
        assert_eq!(q.row_limit(), 10);
    }
}
