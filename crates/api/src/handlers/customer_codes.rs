//! Read-only handlers for customer codes.

use airmail_db::repositories::CustomerCodeRepo;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /customer-codes
pub async fn list_customer_codes(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let codes = CustomerCodeRepo::list_all(&state.pool).await?;
    Ok(Json(DataResponse { data: codes }))
}
