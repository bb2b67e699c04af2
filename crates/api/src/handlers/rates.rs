//! Read-only handlers for billing rates.

use airmail_db::repositories::RateRepo;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /rates
pub async fn list_rates(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let rates = RateRepo::list_all(&state.pool).await?;
    Ok(Json(DataResponse { data: rates }))
}
