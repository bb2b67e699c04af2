pub mod customer_codes;
pub mod health;
pub mod rate_rules;
pub mod rates;
pub mod rules;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` administration route tree.
///
/// ```text
/// /rules                          list, create
/// /rules/{id}/deactivate          deactivate (POST)
/// /rate-rules                     list, create
/// /rate-rules/{id}/deactivate     deactivate (POST)
/// /rates                          list
/// /customer-codes                 list
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/rules", rules::router())
        .nest("/rate-rules", rate_rules::router())
        .nest("/rates", rates::router())
        .nest("/customer-codes", customer_codes::router())
}

/// Build the `/api/v1` engine execution routes.
///
/// Kept apart from [`api_routes`] so the general request timeout does not
/// apply; each run is bounded by the rule execution timeout instead.
///
/// ```text
/// /rules/execute                  customer engine (POST)
/// /rate-rules/execute             rate engine (POST)
/// ```
pub fn execution_routes() -> Router<AppState> {
    Router::new()
        .nest("/rules", rules::execution_router())
        .nest("/rate-rules", rate_rules::execution_router())
}
