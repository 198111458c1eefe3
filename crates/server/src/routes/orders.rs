//! Order query endpoint.

use axum::{Json, Router, extract::State, routing::post};
use serde::Deserialize;

use ordergate_core::FilterMap;

use crate::error::ApiError;
use crate::services::export::{ExportedOrder, list_orders};
use crate::state::AppState;

/// Build the orders router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/orders", post(query_orders))
}

/// Request body for the order query.
#[derive(Debug, Deserialize)]
pub struct OrdersRequest {
    /// Filter criteria as a field-to-value object. Values may be scalars or
    /// lists of scalars.
    pub filters: serde_json::Value,
    /// Maximum number of orders to return; zero or absent means unlimited.
    #[serde(default)]
    pub limit: i64,
}

/// Query orders matching the given filters, fully aggregated with their
/// child records. Responds with one `{ "json": "..." }` entry per order,
/// newest first.
///
/// # Errors
///
/// Returns a `filters_invalid` fault for malformed filters or unroutable
/// filter fields, and a `database_error` fault if a query fails.
pub async fn query_orders(
    State(state): State<AppState>,
    Json(body): Json<OrdersRequest>,
) -> Result<Json<Vec<ExportedOrder>>, ApiError> {
    let filters = FilterMap::from_value(&body.filters)?;

    tracing::debug!(
        filter_count = filters.len(),
        limit = body.limit,
        "Order export requested"
    );

    let orders = list_orders(state.pool(), state.config(), &filters, body.limit).await?;

    tracing::info!(order_count = orders.len(), "Order export completed");

    Ok(Json(orders))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_defaults_to_zero() {
        let body: OrdersRequest =
            serde_json::from_value(serde_json::json!({"filters": {"status": "new"}})).unwrap();
        assert_eq!(body.limit, 0);
    }

    #[test]
    fn untyped_filters_are_accepted_by_the_body() {
        let body: OrdersRequest = serde_json::from_value(serde_json::json!({
            "filters": {"store_id": 2, "order_id": ["a", "b"]},
            "limit": 50,
        }))
        .unwrap();

        assert_eq!(body.limit, 50);
        assert!(FilterMap::from_value(&body.filters).is_ok());
    }
}
