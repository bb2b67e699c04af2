//! Route definitions for rate rules.
//!
//! ```text
//! GET    /                  -> list_rate_rules
//! POST   /                  -> create_rate_rule
//! POST   /{id}/deactivate   -> deactivate_rate_rule
//! POST   /execute           -> execute_rate_rules
//! ```

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::rate_rules;
use crate::state::AppState;

/// Administration routes, mounted at `/rate-rules`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(rate_rules::list_rate_rules).post(rate_rules::create_rate_rule),
        )
        .route("/{id}/deactivate", post(rate_rules::deactivate_rate_rule))
}

/// Engine route, mounted at `/rate-rules`.
pub fn execution_router() -> Router<AppState> {
    Router::new().route("/execute", post(rate_rules::execute_rate_rules))
}
