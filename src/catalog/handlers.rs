use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    catalog::{
        dto::CreateProductRequest,
        repo::{self, Product},
    },
    error::{ApiError, ApiResult},
    state::AppState,
};

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/:id", get(get_product))
        .route("/products/category/:category", get(products_by_category))
        .route("/products/search/:term", get(search_products))
}

#[instrument(skip(state))]
pub async fn list_products(State(state): State<AppState>) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(repo::list(&state.db).await?))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Product>> {
    repo::find(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("product not found".into()))
}

#[instrument(skip(state))]
pub async fn products_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(repo::list_by_category(&state.db, &category).await?))
}

#[instrument(skip(state))]
pub async fn search_products(
    State(state): State<AppState>,
    Path(term): Path<String>,
) -> ApiResult<Json<Vec<Product>>> {
    let term = term.trim();
    if term.is_empty() {
        return Ok(Json(Vec::new()));
    }
    Ok(Json(repo::search(&state.db, term).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let new_product = payload.validate()?;
    let product = repo::create(&state.db, &new_product).await?;
    info!(product_id = %product.id, "product created");
    Ok((StatusCode::CREATED, Json(product)))
}
