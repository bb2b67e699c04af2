//! Rule compiler: turns persisted rules into priority-ordered matchers with
//! resolved targets.
//!
//! A single malformed rule never fails compilation. It is left out of the
//! result and reported in [`Compilation::skipped`].

use serde::Serialize;

use crate::cargo::CargoRecord;
use crate::condition::ConditionMatcher;
use crate::customer_code::{CustomerCodeIndex, CustomerResolution};
use crate::rate::Rate;
use crate::rule::{MatchMode, RateRuleRow, Rule, RuleAction, RuleKind};
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// A rule ready for evaluation, carrying its resolved target `T`.
#[derive(Debug, Clone)]
pub struct CompiledRule<T> {
    pub id: DbId,
    pub name: String,
    pub priority: i32,
    pub mode: MatchMode,
    pub target: T,
    matchers: Vec<ConditionMatcher>,
}

impl<T> CompiledRule<T> {
    /// Evaluate the rule's combinator over its matchers.
    pub fn matches(&self, record: &CargoRecord) -> bool {
        match self.mode {
            MatchMode::All => self.matchers.iter().all(|m| m.matches(record)),
            MatchMode::Any => self.matchers.iter().any(|m| m.matches(record)),
        }
    }
}

/// Resolved target of a customer-assignment rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomerTarget {
    /// The raw `assign_to` reference configured on the rule.
    pub assign_to: DbId,
    pub resolution: CustomerResolution,
}

/// A rule excluded from a run, with the reason shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRule {
    pub rule_id: DbId,
    pub rule_name: String,
    pub reason: String,
}

/// Result of compiling one rule set.
#[derive(Debug, Clone)]
pub struct Compilation<T> {
    /// Valid rules, ascending by priority (stable for ties).
    pub rules: Vec<CompiledRule<T>>,
    pub skipped: Vec<SkippedRule>,
    /// Non-fatal notices, such as customer-code fallbacks.
    pub warnings: Vec<String>,
}

impl<T> Default for Compilation<T> {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            skipped: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

impl<T> Compilation<T> {
    fn skip(&mut self, rule: &Rule, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::warn!(rule_id = rule.id, rule_name = %rule.name, %reason, "Skipping invalid rule");
        self.skipped.push(SkippedRule {
            rule_id: rule.id,
            rule_name: rule.name.clone(),
            reason,
        });
    }

    fn finish(mut self) -> Self {
        // `sort_by_key` is stable, so equal priorities keep input order.
        self.rules.sort_by_key(|r| r.priority);
        self
    }
}

// ---------------------------------------------------------------------------
// Compilation
// ---------------------------------------------------------------------------

/// Whether `rule` takes part in this run at all.
fn is_selected(rule: &Rule, rule_ids: Option<&[DbId]>) -> bool {
    if !rule.is_active {
        return false;
    }
    match rule_ids {
        Some(ids) if !ids.is_empty() => ids.contains(&rule.id),
        _ => true,
    }
}

fn compile_matchers(rule: &Rule) -> Result<Vec<ConditionMatcher>, String> {
    if rule.conditions.is_empty() {
        return Err("rule has no conditions".to_string());
    }
    rule.conditions
        .iter()
        .enumerate()
        .map(|(i, c)| ConditionMatcher::compile(c).map_err(|e| format!("condition {i}: {e}")))
        .collect()
}

fn compiled<T>(
    rule: &Rule,
    kind: RuleKind,
    matchers: Vec<ConditionMatcher>,
    target: T,
) -> CompiledRule<T> {
    CompiledRule {
        id: rule.id,
        name: rule.name.clone(),
        priority: rule.priority,
        mode: kind.match_mode(),
        target,
        matchers,
    }
}

/// Compile rate-assignment rules joined with their rates.
pub fn compile_rate_rules(rows: Vec<RateRuleRow>, rule_ids: Option<&[DbId]>) -> Compilation<Rate> {
    let mut out = Compilation::default();

    for RateRuleRow { rule, rate } in rows {
        if !is_selected(&rule, rule_ids) {
            continue;
        }
        let rate_id = match rule.action {
            RuleAction::AssignRate { rate_id: Some(id) } => id,
            RuleAction::AssignRate { rate_id: None } => {
                out.skip(&rule, "no rate configured");
                continue;
            }
            RuleAction::AssignCustomer { .. } => {
                out.skip(&rule, "rule does not assign a rate");
                continue;
            }
        };
        let rate = match rate {
            Some(rate) if rate.id == rate_id && rate.is_valid() => rate,
            Some(_) => {
                out.skip(&rule, format!("rate {rate_id} is invalid"));
                continue;
            }
            None => {
                out.skip(&rule, format!("rate {rate_id} not found"));
                continue;
            }
        };
        match compile_matchers(&rule) {
            Ok(matchers) => out.rules.push(compiled(&rule, RuleKind::Rate, matchers, rate)),
            Err(reason) => out.skip(&rule, reason),
        }
    }

    out.finish()
}

/// Compile customer-assignment rules against the active customer codes.
pub fn compile_customer_rules(
    rules: Vec<Rule>,
    codes: &CustomerCodeIndex,
    rule_ids: Option<&[DbId]>,
) -> Compilation<CustomerTarget> {
    let mut out = Compilation::default();

    for rule in rules {
        if !is_selected(&rule, rule_ids) {
            continue;
        }
        let assign_to = match rule.action {
            RuleAction::AssignCustomer { assign_to: Some(id) } => id,
            RuleAction::AssignCustomer { assign_to: None } => {
                out.skip(&rule, "no customer code configured");
                continue;
            }
            RuleAction::AssignRate { .. } => {
                out.skip(&rule, "rule does not assign a customer");
                continue;
            }
        };
        let matchers = match compile_matchers(&rule) {
            Ok(m) => m,
            Err(reason) => {
                out.skip(&rule, reason);
                continue;
            }
        };

        let resolution = codes.resolve(assign_to);
        if resolution.fallback {
            tracing::warn!(
                rule_id = rule.id,
                assign_to,
                "Customer code not found among active codes, using value as customer id"
            );
            out.warnings.push(format!(
                "Rule '{}' ({}): customer code {assign_to} not found among active codes; \
                 assigning it verbatim as the customer id",
                rule.name, rule.id
            ));
        }

        let target = CustomerTarget { assign_to, resolution };
        out.rules.push(compiled(&rule, RuleKind::Customer, matchers, target));
    }

    out.finish()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::RuleCondition;
    use crate::customer_code::CustomerCode;
    use crate::rate::RateType;

    fn fixed_rate(id: DbId) -> Rate {
        Rate {
            id,
            name: format!("rate {id}"),
            rate_type: RateType::Fixed,
            base_rate: 10.0,
            multiplier: None,
            currency: None,
            is_active: true,
        }
    }

    fn rule(id: DbId, priority: i32, action: RuleAction) -> Rule {
        Rule {
            id,
            name: format!("rule {id}"),
            is_active: true,
            priority,
            conditions: vec![RuleCondition::new("mail_cat", "equals", "A")],
            action,
            match_count: 0,
            last_run: None,
        }
    }

    fn rate_row(id: DbId, priority: i32) -> RateRuleRow {
        RateRuleRow {
            rule: rule(id, priority, RuleAction::AssignRate { rate_id: Some(100 + id) }),
            rate: Some(fixed_rate(100 + id)),
        }
    }

    #[test]
    fn sorts_by_priority_keeping_input_order_for_ties() {
        let rows = vec![rate_row(1, 5), rate_row(2, 1), rate_row(3, 5), rate_row(4, 2)];
        let out = compile_rate_rules(rows, None);
        let ids: Vec<DbId> = out.rules.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 4, 1, 3]);
    }

    #[test]
    fn skips_rate_rule_without_rate() {
        let mut row = rate_row(1, 1);
        row.rate = None;
        let out = compile_rate_rules(vec![row, rate_row(2, 1)], None);
        assert_eq!(out.rules.len(), 1);
        assert_eq!(out.skipped.len(), 1);
        assert_eq!(out.skipped[0].rule_id, 1);
        assert!(out.skipped[0].reason.contains("not found"));
    }

    #[test]
    fn skips_rule_without_conditions() {
        let mut row = rate_row(1, 1);
        row.rule.conditions.clear();
        let out = compile_rate_rules(vec![row], None);
        assert!(out.rules.is_empty());
        assert_eq!(out.skipped[0].reason, "rule has no conditions");
    }

    #[test]
    fn skips_rule_with_unknown_operator() {
        let mut row = rate_row(1, 1);
        row.rule.conditions.push(RuleCondition::new("mail_cat", "approximately", "A"));
        let out = compile_rate_rules(vec![row], None);
        assert!(out.rules.is_empty());
        assert!(out.skipped[0].reason.contains("condition 1"));
    }

    #[test]
    fn inactive_and_unselected_rules_are_ignored_silently() {
        let mut inactive = rate_row(1, 1);
        inactive.rule.is_active = false;
        let out = compile_rate_rules(vec![inactive, rate_row(2, 1), rate_row(3, 1)], Some(&[3]));
        assert_eq!(out.rules.len(), 1);
        assert_eq!(out.rules[0].id, 3);
        assert!(out.skipped.is_empty());
    }

    #[test]
    fn empty_rule_id_filter_selects_everything() {
        let out = compile_rate_rules(vec![rate_row(1, 1), rate_row(2, 1)], Some(&[]));
        assert_eq!(out.rules.len(), 2);
    }

    #[test]
    fn rate_rules_use_all_and_customer_rules_use_any() {
        let out = compile_rate_rules(vec![rate_row(1, 1)], None);
        assert_eq!(out.rules[0].mode, MatchMode::All);

        let codes = CustomerCodeIndex::from_codes(&[]);
        let out = compile_customer_rules(
            vec![rule(1, 1, RuleAction::AssignCustomer { assign_to: Some(9) })],
            &codes,
            None,
        );
        assert_eq!(out.rules[0].mode, MatchMode::Any);
    }

    #[test]
    fn customer_rule_resolves_code_or_records_fallback() {
        let codes = CustomerCodeIndex::from_codes(&[CustomerCode {
            id: 9,
            code: "ACME".into(),
            customer_id: 900,
            is_active: true,
        }]);
        let out = compile_customer_rules(
            vec![
                rule(1, 1, RuleAction::AssignCustomer { assign_to: Some(9) }),
                rule(2, 2, RuleAction::AssignCustomer { assign_to: Some(77) }),
            ],
            &codes,
            None,
        );

        assert_eq!(out.rules[0].target.resolution.customer_id, 900);
        assert!(!out.rules[0].target.resolution.fallback);
        assert_eq!(out.rules[1].target.resolution.customer_id, 77);
        assert!(out.rules[1].target.resolution.fallback);
        assert_eq!(out.warnings.len(), 1);
        assert!(out.warnings[0].contains("77"));
    }

    #[test]
    fn customer_rule_without_assign_to_is_skipped() {
        let codes = CustomerCodeIndex::default();
        let out = compile_customer_rules(
            vec![rule(1, 1, RuleAction::AssignCustomer { assign_to: None })],
            &codes,
            None,
        );
        assert!(out.rules.is_empty());
        assert_eq!(out.skipped[0].reason, "no customer code configured");
    }

    #[test]
    fn wrong_action_kind_is_skipped() {
        let row = RateRuleRow {
            rule: rule(1, 1, RuleAction::AssignCustomer { assign_to: Some(1) }),
            rate: None,
        };
        let out = compile_rate_rules(vec![row], None);
        assert_eq!(out.skipped[0].reason, "rule does not assign a rate");
    }
}
