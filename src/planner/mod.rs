//! Query planner
//!
//! Compiles DSL queries into immutable execution plans.
//!
//! ## Pipeline
//!
//! ```text
//! Query
//!   → Compiler::compile() → validated, resolved, access checked
//!   → TypeChecker::check() → typed PlanExpr trees
//!   → Optimizer::optimize() → scan hints
//!   → ExecutionPlan
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use podql::planner::{Compiler, ExplainOutput};
//!
//! let compiler = Compiler::new(PlannerConfig::new(ActionType::Deny));
//! let plan = compiler.compile(&query, &identity)?;
//! println!("{}", ExplainOutput::format(&plan));
//! ```

pub mod compiler;
pub mod error;
pub mod explain;
pub mod optimizer;
pub mod plan;
pub mod typecheck;

pub use compiler::Compiler;
pub use error::{PlannerError, PlannerResult};
pub use explain::ExplainOutput;
pub use optimizer::{BucketSelection, HintRule, Optimizer, PartitionPruning, TimeRangeExtraction};
pub use plan::{
    BucketHint, ExecutionPlan, PartitionHint, PlanExpr, PlanHints, Projection, TimeRange,
};
pub use typecheck::TypeChecker;
