//! HTTP handlers, one module per resource.

pub mod customer_codes;
pub mod rate_rules;
pub mod rates;
pub mod rules;

use std::future::Future;
use std::time::Duration;

use airmail_core::execution::ExecutionError;
use airmail_core::types::DbId;
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// A rule id as sent by clients: either a JSON number or a numeric string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RuleIdParam {
    Number(DbId),
    Text(String),
}

/// Normalise the optional `ruleIds` list. An empty list means "all rules".
pub fn parse_rule_ids(raw: Option<Vec<RuleIdParam>>) -> AppResult<Option<Vec<DbId>>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let ids = raw
        .into_iter()
        .map(|param| match param {
            RuleIdParam::Number(id) => Ok(id),
            RuleIdParam::Text(text) => text
                .trim()
                .parse::<DbId>()
                .map_err(|_| AppError::BadRequest(format!("Invalid rule id '{text}'"))),
        })
        .collect::<AppResult<Vec<_>>>()?;
    Ok((!ids.is_empty()).then_some(ids))
}

/// Run an engine future under the configured execution time budget.
pub async fn with_execution_timeout<T>(
    secs: u64,
    run: impl Future<Output = Result<T, ExecutionError>>,
) -> AppResult<T> {
    match tokio::time::timeout(Duration::from_secs(secs), run).await {
        Ok(result) => Ok(result?),
        Err(_) => {
            tracing::warn!(timeout_secs = secs, "Rule execution timed out");
            Err(AppError::Timeout { secs })
        }
    }
}

/// Run `validator` checks on a request body.
pub fn validate_body(body: &impl Validate) -> AppResult<()> {
    body.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn rule_ids_accept_numbers_and_numeric_strings() {
        let ids = parse_rule_ids(Some(vec![
            RuleIdParam::Number(3),
            RuleIdParam::Text(" 7 ".into()),
        ]))
        .unwrap();
        assert_eq!(ids, Some(vec![3, 7]));
    }

    #[test]
    fn empty_rule_id_list_selects_everything() {
        assert_eq!(parse_rule_ids(Some(vec![])).unwrap(), None);
        assert_eq!(parse_rule_ids(None).unwrap(), None);
    }

    #[test]
    fn non_numeric_rule_id_is_rejected() {
        let err = parse_rule_ids(Some(vec![RuleIdParam::Text("abc".into())])).unwrap_err();
        assert_matches!(err, AppError::BadRequest(msg) if msg.contains("abc"));
    }

    #[tokio::test]
    async fn slow_execution_maps_to_timeout() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, ExecutionError>(())
        };
        let err = with_execution_timeout(0, slow).await.unwrap_err();
        assert_matches!(err, AppError::Timeout { secs: 0 });
    }
}
