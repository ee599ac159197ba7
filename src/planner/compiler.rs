//! Query compiler
//!
//! Validates a `Query` against its bound table and lowers it into an
//! `ExecutionPlan`. Compilation is fail-fast:
//!
//! 1. Builder state (projections, indices, aggregate placement)
//! 2. Column resolution against the schema
//! 3. Access checks, table level then every referenced column
//! 4. Lowering and type checking
//! 5. Scan hints
//!
//! The compiler only reads the table. Any number of threads may compile
//! against the same `Arc<Table>` at once.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::access::{AccessEvaluator, AccessType, ActionType, Identity};
use crate::catalog::{ColumnMetadata, SchemaProvider, Table};
use crate::config::PlannerConfig;
use crate::dsl::{Expr, Query};

use super::error::{PlannerError, PlannerResult};
use super::optimizer::{HintRule, Optimizer};
use super::plan::{ExecutionPlan, PlanExpr, Projection};
use super::typecheck::TypeChecker;

/// Compiles queries into execution plans
pub struct Compiler {
    config: PlannerConfig,
    optimizer: Optimizer,
}

impl Compiler {
    /// Create a compiler with the hint rules enabled in `config`
    pub fn new(config: PlannerConfig) -> Self {
        let optimizer = Optimizer::new(&config);
        Self { config, optimizer }
    }

    /// Create a compiler with custom hint rules
    pub fn with_rules(config: PlannerConfig, rules: Vec<Box<dyn HintRule>>) -> Self {
        Self {
            config,
            optimizer: Optimizer::with_rules(rules),
        }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Names of the hint rules in application order
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.optimizer.rule_names()
    }

    /// Compile a query for a caller
    pub fn compile(&self, query: &Query, identity: &Identity) -> PlannerResult<ExecutionPlan> {
        let table: &Table = query.table();
        self.compile_against(table, query, identity)
    }

    fn compile_against<T>(
        &self,
        table: &T,
        query: &Query,
        identity: &Identity,
    ) -> PlannerResult<ExecutionPlan>
    where
        T: SchemaProvider + ColumnMetadata + AccessEvaluator,
    {
        let selects = expand_selects(table, query.selects());
        let filter = query.predicate();
        self.validate_state(&selects, query, filter)?;

        resolve_columns(table, filter.into_iter().chain(selects.iter()))?;

        let mut lowering = Lowering::new(table, identity, self.config.default_action);
        lowering.check_table()?;
        for expr in filter.into_iter().chain(selects.iter()) {
            lowering.authorize(expr, false)?;
        }

        let filter = match filter {
            Some(expr) => {
                let lowered = lowering.lower(expr, false)?;
                TypeChecker::check(&lowered)?;
                TypeChecker::check_is_boolean(&lowered, "WHERE")?;
                Some(lowered)
            }
            None => None,
        };

        let mut projections = Vec::with_capacity(selects.len());
        for select in &selects {
            let expr = lowering.lower(select, false)?;
            TypeChecker::check(&expr)?;
            projections.push(Projection {
                name: select.output_name(),
                kind: expr.kind(),
                aggregate: select.is_aggregate(),
                expr,
            });
        }

        let hints = self.optimizer.optimize(table, filter.as_ref());
        let masked_columns: Vec<String> = lowering.masked.into_iter().collect();
        let limit = match query.row_limit() {
            0 => None,
            n => Some(n as u64),
        };

        tracing::debug!(
            table = %table.table_name(),
            projections = projections.len(),
            masked = masked_columns.len(),
            partition_hints = hints.partitions.len(),
            "Query compiled"
        );

        Ok(ExecutionPlan::new(
            table.table_name().to_string(),
            filter,
            projections,
            query.groups().to_vec(),
            query.sorts().to_vec(),
            query.sort_type(),
            limit,
            masked_columns,
            hints,
        ))
    }

    /// Check builder state that needs no metadata
    fn validate_state(
        &self,
        selects: &[Expr],
        query: &Query,
        filter: Option<&Expr>,
    ) -> PlannerResult<()> {
        if selects.is_empty() {
            return Err(invalid("query has no projections"));
        }

        for (label, indices) in [("group", query.groups()), ("sort", query.sorts())] {
            if let Some(&i) = indices.iter().find(|&&i| i >= selects.len()) {
                return Err(invalid(format!(
                    "{} index {} out of range for {} projections",
                    label,
                    i,
                    selects.len()
                )));
            }
        }

        for &i in query.groups() {
            if selects[i].is_aggregate() {
                return Err(invalid(format!(
                    "cannot group by aggregate projection {}",
                    selects[i]
                )));
            }
        }

        for select in selects {
            check_aggregate_placement(select)?;
        }

        let aggregated = !query.groups().is_empty() || selects.iter().any(Expr::is_aggregate);
        if aggregated {
            for (i, select) in selects.iter().enumerate() {
                if !select.is_aggregate() && !query.groups().contains(&i) {
                    return Err(invalid(format!(
                        "projection {} must be grouped or aggregated",
                        select
                    )));
                }
            }
        }

        if let Some(filter) = filter {
            if filter.contains_aggregate() {
                return Err(invalid("aggregates are not allowed in the filter"));
            }
        }

        for expr in filter.into_iter().chain(selects.iter()) {
            self.check_in_lists(expr)?;
        }

        Ok(())
    }

    fn check_in_lists(&self, expr: &Expr) -> PlannerResult<()> {
        match expr {
            Expr::Column(_) | Expr::Const(_) => Ok(()),
            Expr::InList { expr, values, .. } => {
                if values.len() > self.config.max_in_list {
                    return Err(invalid(format!(
                        "IN list of {} values exceeds the limit of {}",
                        values.len(),
                        self.config.max_in_list
                    )));
                }
                self.check_in_lists(expr)
            }
            Expr::Udf { operand, .. } => self.check_in_lists(operand),
            Expr::Alias { expr, .. } => self.check_in_lists(expr),
            Expr::Compare { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.check_in_lists(left)?;
                self.check_in_lists(right)
            }
        }
    }
}

fn invalid(msg: impl Into<String>) -> PlannerError {
    PlannerError::InvalidQueryState(msg.into())
}

fn is_all_columns(expr: &Expr) -> bool {
    matches!(expr, Expr::Column(name) if name == Table::ALL_COLUMNS)
}

/// Replace top level `*` projections with every schema column
fn expand_selects<T: SchemaProvider>(table: &T, selects: &[Expr]) -> Vec<Expr> {
    let mut out = Vec::with_capacity(selects.len());
    for select in selects {
        if is_all_columns(select) {
            out.extend(
                table
                    .schema()
                    .fields()
                    .iter()
                    .map(|f| Expr::Column(f.name.clone())),
            );
        } else {
            out.push(select.clone());
        }
    }
    out
}

/// Aggregates may only appear at the top of a projection, never nested
fn check_aggregate_placement(select: &Expr) -> PlannerResult<()> {
    let inner = match select {
        Expr::Alias { expr, .. } => expr.as_ref(),
        other => other,
    };
    match inner {
        Expr::Udf { kind, operand } if kind.is_aggregate() => {
            if operand.contains_aggregate() {
                return Err(invalid(format!("nested aggregate in {}", select)));
            }
            Ok(())
        }
        other if other.contains_aggregate() => Err(invalid(format!(
            "aggregate must be the outermost function in {}",
            select
        ))),
        _ => Ok(()),
    }
}

/// Every referenced column must exist in the schema
fn resolve_columns<'a, T, I>(table: &T, exprs: I) -> PlannerResult<()>
where
    T: SchemaProvider,
    I: Iterator<Item = &'a Expr>,
{
    for expr in exprs {
        for name in expr.columns() {
            if name == Table::ALL_COLUMNS {
                return Err(invalid(format!(
                    "'{}' is only allowed as a projection",
                    Table::ALL_COLUMNS
                )));
            }
            if table.lookup(name).is_none() {
                return Err(PlannerError::ColumnNotFound {
                    table: table.table_name().to_string(),
                    column: name.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Lowers DSL expressions for one caller, tracking access decisions
struct Lowering<'a, T> {
    table: &'a T,
    groups: &'a HashSet<String>,
    default: ActionType,
    decisions: HashMap<(String, AccessType), ActionType>,
    masked: BTreeSet<String>,
}

impl<'a, T> Lowering<'a, T>
where
    T: SchemaProvider + ColumnMetadata + AccessEvaluator,
{
    fn new(table: &'a T, identity: &'a Identity, default: ActionType) -> Self {
        Self {
            table,
            groups: &identity.groups,
            default,
            decisions: HashMap::new(),
            masked: BTreeSet::new(),
        }
    }

    fn denied(&self, column: Option<&str>, access: AccessType) -> PlannerError {
        tracing::warn!(
            table = %self.table.table_name(),
            column = ?column,
            access = access.to_str(),
            "Access denied"
        );
        PlannerError::AccessDenied {
            table: self.table.table_name().to_string(),
            column: column.map(str::to_string),
            access,
        }
    }

    /// Table level READ
    fn check_table(&self) -> PlannerResult<()> {
        let action = self
            .table
            .check_access(AccessType::Read, self.groups, None, self.default);
        if action == ActionType::Deny {
            return Err(self.denied(None, AccessType::Read));
        }
        Ok(())
    }

    /// Action for reading `column`; aggregate operands are also checked
    /// for AGGREGATION, which can only restrict the READ decision
    fn column_action(&mut self, column: &str, aggregated: bool) -> PlannerResult<ActionType> {
        let read = self.decide(column, AccessType::Read, self.default);
        if read == ActionType::Deny {
            return Err(self.denied(Some(column), AccessType::Read));
        }
        if !aggregated {
            return Ok(read);
        }

        let action = read.restrict(self.decide(column, AccessType::Aggregation, read));
        if action == ActionType::Deny {
            return Err(self.denied(Some(column), AccessType::Aggregation));
        }
        Ok(action)
    }

    fn decide(&mut self, column: &str, access: AccessType, default: ActionType) -> ActionType {
        let key = (column.to_string(), access);
        if let Some(&action) = self.decisions.get(&key) {
            return action;
        }
        let action = self
            .table
            .check_access(access, self.groups, Some(column), default);
        self.decisions.insert(key, action);
        action
    }

    /// Access check every column under `expr` before anything is typed
    fn authorize(&mut self, expr: &Expr, aggregated: bool) -> PlannerResult<()> {
        match expr {
            Expr::Column(name) => self.column_action(name, aggregated).map(|_| ()),
            Expr::Const(_) => Ok(()),
            Expr::Udf { kind, operand } => {
                self.authorize(operand, aggregated || kind.is_aggregate())
            }
            Expr::InList { expr, .. } | Expr::Alias { expr, .. } => {
                self.authorize(expr, aggregated)
            }
            Expr::Compare { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.authorize(left, aggregated)?;
                self.authorize(right, aggregated)
            }
        }
    }

    fn lower(&mut self, expr: &Expr, aggregated: bool) -> PlannerResult<PlanExpr> {
        Ok(match expr {
            Expr::Column(name) => self.lower_column(name, aggregated)?,
            Expr::Const(v) => PlanExpr::Literal(v.clone()),
            Expr::Udf { kind, operand } => {
                let arg = self.lower(operand, aggregated || kind.is_aggregate())?;
                let result = TypeChecker::function_kind(*kind, arg.kind())?;
                PlanExpr::Function {
                    func: *kind,
                    arg: Box::new(arg),
                    kind: result,
                }
            }
            Expr::Compare { op, left, right } => PlanExpr::Compare {
                op: *op,
                left: Box::new(self.lower(left, aggregated)?),
                right: Box::new(self.lower(right, aggregated)?),
            },
            Expr::InList {
                expr,
                values,
                negated,
            } => PlanExpr::InList {
                expr: Box::new(self.lower(expr, aggregated)?),
                values: values.clone(),
                negated: *negated,
            },
            Expr::Logical { op, left, right } => PlanExpr::Logical {
                op: *op,
                left: Box::new(self.lower(left, aggregated)?),
                right: Box::new(self.lower(right, aggregated)?),
            },
            Expr::Alias { expr, .. } => self.lower(expr, aggregated)?,
        })
    }

    fn lower_column(&mut self, name: &str, aggregated: bool) -> PlannerResult<PlanExpr> {
        let kind = self
            .table
            .lookup(name)
            .ok_or_else(|| PlannerError::ColumnNotFound {
                table: self.table.table_name().to_string(),
                column: name.to_string(),
            })?;

        let masked = self.column_action(name, aggregated)? == ActionType::Mask;
        if masked && self.masked.insert(name.to_string()) {
            tracing::warn!(
                table = %self.table.table_name(),
                column = %name,
                "Column masked"
            );
        }

        tracing::debug!(column = %name, kind = kind.to_str(), masked, "Column resolved");

        Ok(match self.table.custom_column(name) {
            Some(custom) => PlanExpr::Custom {
                name: name.to_string(),
                kind,
                expr: custom.expr.clone(),
                masked,
            },
            None => PlanExpr::Column {
                name: name.to_string(),
                kind,
                masked,
            },
        })
    }
}
