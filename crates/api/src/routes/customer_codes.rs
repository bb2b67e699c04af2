use axum::routing::get;
use axum::Router;

use crate::handlers::customer_codes;
use crate::state::AppState;

/// Customer code routes, mounted at `/customer-codes`.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(customer_codes::list_customer_codes))
}
