//! Rule conditions: the persisted field/operator/value triple and its
//! compiled matcher.
//!
//! All comparisons are case-insensitive. Configured values are lowercased
//! once when the matcher is built; record values are lowercased per test.

use serde::{Deserialize, Serialize};

use crate::cargo::{CargoField, CargoRecord};
use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

/// Comparison operator of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    Contains,
    StartsWith,
    EndsWith,
    GreaterThan,
    LessThan,
    IsEmpty,
    NotEmpty,
    DoesNotContain,
}

impl ConditionOperator {
    /// Canonical wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::Contains => "contains",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
            Self::GreaterThan => "greater_than",
            Self::LessThan => "less_than",
            Self::IsEmpty => "is_empty",
            Self::NotEmpty => "not_empty",
            Self::DoesNotContain => "does_not_contain",
        }
    }

    /// Parse an operator as stored by the rule editor.
    ///
    /// Case, surrounding whitespace and `-`/space separators are ignored,
    /// and a handful of shorthand aliases are accepted.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .trim()
            .to_ascii_lowercase()
            .chars()
            .map(|c| if c == '-' || c == ' ' { '_' } else { c })
            .collect();

        let op = match normalized.as_str() {
            "equals" | "equal" | "eq" | "=" | "==" => Self::Equals,
            "contains" => Self::Contains,
            "starts_with" | "begins_with" => Self::StartsWith,
            "ends_with" => Self::EndsWith,
            "greater_than" | "gt" | ">" => Self::GreaterThan,
            "less_than" | "lt" | "<" => Self::LessThan,
            "is_empty" | "empty" => Self::IsEmpty,
            "not_empty" | "is_not_empty" => Self::NotEmpty,
            "does_not_contain" | "not_contains" => Self::DoesNotContain,
            _ => return None,
        };
        Some(op)
    }

    /// Operators where a comma-separated value means "any of".
    pub fn accepts_value_list(self) -> bool {
        matches!(
            self,
            Self::Equals | Self::Contains | Self::StartsWith | Self::EndsWith
        )
    }

    fn is_numeric(self) -> bool {
        matches!(self, Self::GreaterThan | Self::LessThan)
    }
}

// ---------------------------------------------------------------------------
// Persisted condition
// ---------------------------------------------------------------------------

/// A condition exactly as stored on a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleCondition {
    pub field: String,
    pub operator: String,
    #[serde(default)]
    pub value: String,
}

impl RuleCondition {
    pub fn new(field: &str, operator: &str, value: &str) -> Self {
        Self {
            field: field.to_string(),
            operator: operator.to_string(),
            value: value.to_string(),
        }
    }
}

/// Validate a condition list before it is stored.
///
/// Stricter than compilation: unknown fields are rejected here, whereas
/// the compiler tolerates them and reads them as empty.
pub fn validate_conditions(conditions: &[RuleCondition]) -> Result<(), CoreError> {
    if conditions.is_empty() {
        return Err(CoreError::Validation(
            "A rule must have at least one condition".to_string(),
        ));
    }
    for (index, condition) in conditions.iter().enumerate() {
        if CargoField::from_name(&condition.field).is_none() {
            return Err(CoreError::Validation(format!(
                "Condition {index}: unknown field '{}'",
                condition.field
            )));
        }
        let Some(op) = ConditionOperator::parse(&condition.operator) else {
            return Err(CoreError::Validation(format!(
                "Condition {index}: unknown operator '{}'",
                condition.operator
            )));
        };
        if op.is_numeric() && condition.value.trim().parse::<f64>().is_err() {
            return Err(CoreError::Validation(format!(
                "Condition {index}: '{}' requires a numeric value, got '{}'",
                op.as_str(),
                condition.value
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Compiled matcher
// ---------------------------------------------------------------------------

/// Executable form of a [`RuleCondition`].
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionMatcher {
    /// `None` when the condition names a field the record does not have.
    field: Option<CargoField>,
    operator: ConditionOperator,
    /// Lowercased comparison values. Several only for "any of" lists.
    values: Vec<String>,
    /// Parsed threshold for numeric operators.
    threshold: Option<f64>,
}

impl ConditionMatcher {
    /// Build a matcher, failing only on an unrecognised operator.
    pub fn compile(condition: &RuleCondition) -> Result<Self, String> {
        let operator = ConditionOperator::parse(&condition.operator)
            .ok_or_else(|| format!("unknown operator '{}'", condition.operator))?;

        let lowered = condition.value.trim().to_lowercase();
        let values = if operator.accepts_value_list() && lowered.contains(',') {
            lowered
                .split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect()
        } else {
            vec![lowered]
        };

        let threshold = if operator.is_numeric() {
            values.first().and_then(|v| v.parse::<f64>().ok())
        } else {
            None
        };

        Ok(Self {
            field: CargoField::from_name(&condition.field),
            operator,
            values,
            threshold,
        })
    }

    pub fn field(&self) -> Option<CargoField> {
        self.field
    }

    /// Evaluate the condition against one record.
    pub fn matches(&self, record: &CargoRecord) -> bool {
        let actual = self
            .field
            .map(|f| record.field_text(f).trim().to_lowercase())
            .unwrap_or_default();

        match self.operator {
            ConditionOperator::Equals => self.values.iter().any(|v| actual == *v),
            ConditionOperator::Contains => self.values.iter().any(|v| actual.contains(v.as_str())),
            ConditionOperator::StartsWith => {
                self.values.iter().any(|v| actual.starts_with(v.as_str()))
            }
            ConditionOperator::EndsWith => self.values.iter().any(|v| actual.ends_with(v.as_str())),
            ConditionOperator::DoesNotContain => self
                .values
                .first()
                .is_some_and(|v| !actual.contains(v.as_str())),
            ConditionOperator::IsEmpty => actual.is_empty(),
            ConditionOperator::NotEmpty => !actual.is_empty(),
            ConditionOperator::GreaterThan => match (actual.parse::<f64>(), self.threshold) {
                (Ok(a), Some(t)) => a > t,
                _ => false,
            },
            ConditionOperator::LessThan => match (actual.parse::<f64>(), self.threshold) {
                (Ok(a), Some(t)) => a < t,
                _ => false,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
