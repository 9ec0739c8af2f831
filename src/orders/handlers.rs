use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use tracing::{info, instrument};

use crate::{
    error::ApiResult,
    orders::{
        dto::CreateOrderRequest,
        repo::{self, Order},
    },
    state::AppState,
};

pub fn order_routes() -> Router<AppState> {
    Router::new().route("/orders", post(create_order))
}

#[instrument(skip(state, payload))]
pub async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> ApiResult<(StatusCode, Json<Order>)> {
    let new_order = payload.validate()?;
    let order = repo::create(&state.db, &new_order).await?;
    info!(order_id = %order.id, quantity = order.quantity, "order placed");
    Ok((StatusCode::CREATED, Json(order)))
}
