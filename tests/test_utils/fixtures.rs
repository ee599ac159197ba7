//! Fixture tables, catalogs and callers

use std::sync::Arc;

use podql::access::{AccessRule, AccessType, ActionType, Identity};
use podql::catalog::{BucketInfo, Catalog, Column, Kind, PartitionInfo, Table};
use podql::config::PlannerConfig;
use podql::planner::Compiler;

pub const ORDERS: &str = "sales.orders";
pub const EVENTS: &str = "web.events";

/// `sales.orders`: partitioned on region, bucketed on user_id, masked ssn,
/// closed to contractors
pub fn orders_table() -> Table {
    Table::builder(ORDERS)
        .field(Table::TIME_COLUMN, Kind::BigInt)
        .field("region", Kind::Varchar)
        .field("amount", Kind::Int)
        .field("user_id", Kind::BigInt)
        .field("ssn", Kind::Varchar)
        .column(
            "region",
            Column::new().partition(PartitionInfo::new(["us", "eu"], 4)),
        )
        .column("amount", Column::new().compress(true))
        .column(
            "ssn",
            Column::new()
                .bloom_filter(true)
                .rule(AccessRule::new(AccessType::Read, ["admin"], ActionType::Allow))
                .rule(AccessRule::everyone(AccessType::Read, ActionType::Mask)),
        )
        .rule(AccessRule::new(
            AccessType::Read,
            ["contractor"],
            ActionType::Deny,
        ))
        .bucket(BucketInfo::new(16, "user_id"))
        .ddl("CREATE TABLE sales.orders (_time_ BIGINT, region VARCHAR, amount INT, user_id BIGINT, ssn VARCHAR)")
        .build()
        .unwrap()
}

/// `web.events`: no partitions, no rules, time column injected
pub fn events_table() -> Table {
    Table::builder(EVENTS)
        .field("url", Kind::Varchar)
        .field("latency", Kind::Double)
        .field("status", Kind::SmallInt)
        .build()
        .unwrap()
}

pub fn orders() -> Arc<Table> {
    Arc::new(orders_table())
}

/// Catalog holding every fixture table
pub fn catalog() -> Catalog {
    let catalog = Catalog::new();
    catalog.register(orders_table()).unwrap();
    catalog.register(events_table()).unwrap();
    catalog
}

/// Compiler with ALLOW as the default action and every hint rule on
pub fn compiler() -> Compiler {
    Compiler::new(PlannerConfig::new(ActionType::Allow))
}

pub fn analyst() -> Identity {
    Identity::new("alice").group("analyst")
}

pub fn admin() -> Identity {
    Identity::new("root").group("admin")
}

pub fn contractor() -> Identity {
    Identity::new("carol").group("contractor")
}
