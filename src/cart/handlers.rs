use axum::{extract::State, routing::get, Json, Router};
use tracing::{info, instrument};

use crate::{
    auth::extractors::AuthUser,
    cart::{
        dto::{CartResponse, ReplaceCartRequest},
        repo,
    },
    error::{ApiError, ApiResult},
    state::AppState,
};

pub fn cart_routes() -> Router<AppState> {
    Router::new().route("/cart", get(get_cart).put(replace_cart).delete(clear_cart))
}

#[instrument(skip(state))]
pub async fn get_cart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<CartResponse>> {
    let items = repo::list(&state.db, user_id).await?;
    Ok(Json(CartResponse { items }))
}

#[instrument(skip(state, payload))]
pub async fn replace_cart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ReplaceCartRequest>,
) -> ApiResult<Json<CartResponse>> {
    let lines = payload.validate()?;
    repo::replace(&state.db, user_id, &lines)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                ApiError::BadRequest("unknown product".into())
            }
            other => other.into(),
        })?;
    info!(%user_id, lines = lines.len(), "cart replaced");

    let items = repo::list(&state.db, user_id).await?;
    Ok(Json(CartResponse { items }))
}

#[instrument(skip(state))]
pub async fn clear_cart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<CartResponse>> {
    let removed = repo::clear(&state.db, user_id).await?;
    info!(%user_id, removed, "cart cleared");
    Ok(Json(CartResponse { items: Vec::new() }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use axum::extract::FromRef;
    use serde_json::json;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::auth::jwt::JwtKeys;

    #[tokio::test]
    async fn cart_requires_bearer_token() {
        let router = cart_routes().with_state(AppState::fake());
        for method in [Method::GET, Method::DELETE] {
            let req = Request::builder()
                .method(method)
                .uri("/cart")
                .body(Body::empty())
                .unwrap();
            let res = router.clone().oneshot(req).await.unwrap();
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    async fn replace_validates_before_touching_db() {
        let state = AppState::fake();
        let token = JwtKeys::from_ref(&state)
            .sign_access(Uuid::new_v4())
            .unwrap();
        let router = cart_routes().with_state(state);

        let body = json!({"items": [{"product_id": Uuid::new_v4(), "quantity": 0}]});
        let req = Request::builder()
            .method(Method::PUT)
            .uri("/cart")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let res = router.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
