//! Handlers for customer-assignment rules.
//!
//! Listing, creation and deactivation, plus the customer engine run.

use airmail_core::condition::{validate_conditions, RuleCondition};
use airmail_core::error::CoreError;
use airmail_core::execution::{execute_customer_rules, ExecutionOptions};
use airmail_core::types::DbId;
use airmail_db::models::rule::CreateRule;
use airmail_db::repositories::RuleRepo;
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

/// Request body for `POST /rules/execute`. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteCustomerRulesRequest {
    #[serde(default)]
    pub rule_ids: Option<Vec<RuleIdParam>>,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub process_all_data: bool,
}

/// Request body for creating a customer-assignment rule.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRuleRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub description: Option<String>,
    #[validate(range(min = 0))]
    pub priority: Option<i32>,
    #[validate(length(min = 1))]
    pub conditions: Vec<RuleCondition>,
    /// Customer code id, or a raw customer id if no such code exists.
    pub assign_to: DbId,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /rules
pub async fn list_rules(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let rules = RuleRepo::list_all(&state.pool).await?;
    Ok(Json(DataResponse { data: rules }))
}

/// POST /rules
pub async fn create_rule(
    State(state): State<AppState>,
    Json(body): Json<CreateRuleRequest>,
) -> AppResult<impl IntoResponse> {
    validate_body(&body)?;
    validate_conditions(&body.conditions)?;

    let create = CreateRule {
        name: body.name.trim().to_string(),
        description: body.description,
        priority: body.priority,
        conditions: body.conditions,
        assign_to: body.assign_to,
    };
    let rule = RuleRepo::create(&state.pool, &create).await?;
    tracing::info!(rule_id = rule.id, name = %rule.name, "Customer rule created");

    Ok((StatusCode::CREATED, Json(DataResponse { data: rule })))
}

/// POST /rules/{id}/deactivate
pub async fn deactivate_rule(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let rule = RuleRepo::deactivate(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Rule", id }))?;
    tracing::info!(rule_id = id, "Customer rule deactivated");
    Ok(Json(DataResponse { data: rule }))
}

/// POST /rules/execute
///
/// Assigns customers to cargo records. With `dryRun` the records are
/// matched and reported but never written.
pub async fn execute_rules(
    State(state): State<AppState>,
    body: Option<Json<ExecuteCustomerRulesRequest>>,
) -> AppResult<impl IntoResponse> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let options = ExecutionOptions {
        rule_ids: parse_rule_ids(body.rule_ids)?,
        dry_run: body.dry_run,
        process_all_data: body.process_all_data,
    };
    tracing::info!(
        dry_run = options.dry_run,
        process_all_data = options.process_all_data,
        rule_ids = ?options.rule_ids,
        "Executing customer rules"
    );

    let store = state.engine_store();
    let report = with_execution_timeout(
        state.config.rule_execution_timeout_secs,
        execute_customer_rules(&store, &options, &state.config.engine_limits),
    )
    .await?;

    Ok(Json(ExecutionResponse {
        success: true,
        message: report.summary_message(),
        results: report,
    }))
}
