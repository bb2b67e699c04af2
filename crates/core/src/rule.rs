//! Rule definitions shared by the customer and rate engines.

use serde::{Deserialize, Serialize};

use crate::condition::RuleCondition;
use crate::rate::Rate;
use crate::types::{DbId, Timestamp};

/// Which engine a rule belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Assigns `assigned_customer` through a customer code.
    Customer,
    /// Assigns a billing rate and computed amount.
    Rate,
}

impl RuleKind {
    /// How a rule's conditions combine for this engine.
    ///
    /// Rate rules require every condition; customer rules accept any one.
    pub fn match_mode(self) -> MatchMode {
        match self {
            Self::Customer => MatchMode::Any,
            Self::Rate => MatchMode::All,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Rate => "rate",
        }
    }
}

/// Logical combinator over a rule's conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    All,
    Any,
}

/// What a rule does to the records it matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleAction {
    AssignRate { rate_id: Option<DbId> },
    AssignCustomer { assign_to: Option<DbId> },
}

/// A user-authored automation rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: DbId,
    pub name: String,
    pub is_active: bool,
    /// Lower runs first. Need not be unique or contiguous.
    pub priority: i32,
    pub conditions: Vec<RuleCondition>,
    pub action: RuleAction,
    /// Cumulative matches across all runs.
    pub match_count: i64,
    pub last_run: Option<Timestamp>,
}

/// A rate rule together with the rate it references, if that rate exists.
#[derive(Debug, Clone, PartialEq)]
pub struct RateRuleRow {
    pub rule: Rule,
    pub rate: Option<Rate>,
}
