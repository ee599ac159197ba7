//! podql - query DSL and plan compiler for a columnar analytics engine
//!
//! Features:
//! - Fluent, consuming query builder over an owned expression tree
//! - Table metadata with partition (pod) and bucket descriptors
//! - Table and column level access rules evaluated during compilation
//! - Immutable, serializable execution plans with pruning hints

pub mod access;
pub mod catalog;
pub mod config;
pub mod dsl;
pub mod planner;
