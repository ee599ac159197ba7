//! Access rule evaluation
//!
//! Rules are attached at two levels:
//! - Table: applies to every request against the table
//! - Column: applies on top of the table result for one column
//!
//! Evaluation is first-match in declaration order. A column level result can
//! only make the table level result more restrictive, never less.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of access being requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessType {
    /// Read raw column values
    Read,
    /// Use column values as an aggregate input
    Aggregation,
}

impl AccessType {
    /// Parse access type name (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "READ" => Some(AccessType::Read),
            "AGGREGATION" | "AGG" => Some(AccessType::Aggregation),
            _ => None,
        }
    }

    pub fn to_str(&self) -> &'static str {
        match self {
            AccessType::Read => "READ",
            AccessType::Aggregation => "AGGREGATION",
        }
    }
}

/// Outcome of an access check.
///
/// Variants are ordered from least to most restrictive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActionType {
    /// Values are returned unchanged
    Allow,
    /// Values are returned in an obscured form
    Mask,
    /// Request is rejected
    Deny,
}

impl ActionType {
    /// Parse action name (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "ALLOW" | "PASS" => Some(ActionType::Allow),
            "MASK" => Some(ActionType::Mask),
            "DENY" => Some(ActionType::Deny),
            _ => None,
        }
    }

    pub fn to_str(&self) -> &'static str {
        match self {
            ActionType::Allow => "ALLOW",
            ActionType::Mask => "MASK",
            ActionType::Deny => "DENY",
        }
    }

    /// Combine with another result, keeping the more restrictive one
    #[must_use]
    pub fn restrict(self, other: ActionType) -> ActionType {
        self.max(other)
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

/// A single access rule.
///
/// A rule matches a request when the access type is equal and the requester
/// belongs to at least one of the rule's groups. A rule with no groups
/// matches every requester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRule {
    pub access: AccessType,
    pub groups: BTreeSet<String>,
    pub action: ActionType,
    /// Restrict a table level rule to one column
    pub column: Option<String>,
}

impl AccessRule {
    /// Create a rule for the given groups
    pub fn new<I, S>(access: AccessType, groups: I, action: ActionType) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            access,
            groups: groups.into_iter().map(Into::into).collect(),
            action,
            column: None,
        }
    }

    /// Rule matching every requester
    pub fn everyone(access: AccessType, action: ActionType) -> Self {
        Self {
            access,
            groups: BTreeSet::new(),
            action,
            column: None,
        }
    }

    /// Scope the rule to a single column
    #[must_use]
    pub fn on_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    /// Check if this rule applies to a request
    pub fn matches(&self, access: AccessType, groups: &HashSet<String>) -> bool {
        if self.access != access {
            return false;
        }
        self.groups.is_empty() || self.groups.iter().any(|g| groups.contains(g))
    }
}

/// Requesting identity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub user: String,
    pub groups: HashSet<String>,
}

impl Identity {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            groups: HashSet::new(),
        }
    }

    /// Add a group membership
    #[must_use]
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.groups.insert(group.into());
        self
    }

    /// Check group membership
    pub fn in_group(&self, group: &str) -> bool {
        self.groups.contains(group)
    }
}

/// First matching rule's action, if any rule matches
pub fn evaluate_rules<'a, I>(rules: I, access: AccessType, groups: &HashSet<String>) -> Option<ActionType>
where
    I: IntoIterator<Item = &'a AccessRule>,
{
    rules
        .into_iter()
        .find(|rule| rule.matches(access, groups))
        .map(|rule| rule.action)
}

/// Decides the action for a request against a table or one of its columns
pub trait AccessEvaluator {
    /// Check access for a set of groups.
    ///
    /// `column == None` is a table level check. With a column, the column
    /// level rules are layered on top of the table level result. `default`
    /// applies when no table level rule matches.
    fn check_access(
        &self,
        access: AccessType,
        groups: &HashSet<String>,
        column: Option<&str>,
        default: ActionType,
    ) -> ActionType;
}
