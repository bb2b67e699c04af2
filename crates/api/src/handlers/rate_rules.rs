//! Handlers for rate rules and the rate engine run.

use airmail_core::condition::{validate_conditions, RuleCondition};
use airmail_core::error::CoreError;
use airmail_core::execution::{self, ExecutionOptions};
use airmail_core::types::DbId;
use airmail_db::models::rate_rule::CreateRateRule;
use airmail_db::repositories::{RateRepo, RateRuleRepo};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use validator::Validate;

use super::{parse_rule_ids, validate_body, with_execution_timeout, RuleIdParam};
use crate::error::{AppError, AppResult};
use crate::response::{DataResponse, ExecutionResponse};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request DTOs
// ---------------------------------------------------------------------------

/// Request body for `POST /rate-rules/execute`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRateRulesRequest {
    #[serde(default)]
    pub rule_ids: Option<Vec<RuleIdParam>>,
    #[serde(default)]
    pub dry_run: bool,
}

/// Request body for creating a rate rule.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRateRuleRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub description: Option<String>,
    #[validate(range(min = 0))]
    pub priority: Option<i32>,
    #[validate(length(min = 1))]
    pub conditions: Vec<RuleCondition>,
    pub rate_id: DbId,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /rate-rules
pub async fn list_rate_rules(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let rules = RateRuleRepo::list_all(&state.pool).await?;
    Ok(Json(DataResponse { data: rules }))
}

/// POST /rate-rules
///
/// The referenced rate must exist.
pub async fn create_rate_rule(
    State(state): State<AppState>,
    Json(body): Json<CreateRateRuleRequest>,
) -> AppResult<impl IntoResponse> {
    validate_body(&body)?;
    validate_conditions(&body.conditions)?;

    if RateRepo::find_by_id(&state.pool, body.rate_id).await?.is_none() {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Rate {} does not exist",
            body.rate_id
        ))));
    }

    let create = CreateRateRule {
        name: body.name.trim().to_string(),
        description: body.description,
        priority: body.priority,
        conditions: body.conditions,
        rate_id: body.rate_id,
    };
    let rule = RateRuleRepo::create(&state.pool, &create).await?;
    tracing::info!(rule_id = rule.id, rate_id = create.rate_id, "Rate rule created");

    Ok((StatusCode::CREATED, Json(DataResponse { data: rule })))
}

/// POST /rate-rules/{id}/deactivate
pub async fn deactivate_rate_rule(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let rule = RateRuleRepo::deactivate(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "RateRule",
            id,
        }))?;
    tracing::info!(rule_id = id, "Rate rule deactivated");
    Ok(Json(DataResponse { data: rule }))
}

/// POST /rate-rules/execute
///
/// Assigns rates to cargo records that have none.
pub async fn execute_rate_rules(
    State(state): State<AppState>,
    body: Option<Json<ExecuteRateRulesRequest>>,
) -> AppResult<impl IntoResponse> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let options = ExecutionOptions {
        rule_ids: parse_rule_ids(body.rule_ids)?,
        dry_run: body.dry_run,
        process_all_data: false,
    };
    tracing::info!(dry_run = options.dry_run, rule_ids = ?options.rule_ids, "Executing rate rules");

    let store = state.engine_store();
    let report = with_execution_timeout(
        state.config.rule_execution_timeout_secs,
        execution::execute_rate_rules(&store, &options, &state.config.engine_limits),
    )
    .await?;

    Ok(Json(ExecutionResponse {
        success: true,
        message: report.summary_message(),
        results: report,
    }))
}
