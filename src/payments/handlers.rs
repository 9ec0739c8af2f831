use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    cart::repo::{self as cart_repo, PricedLine},
    config::PaymentsConfig,
    error::{ApiError, ApiResult},
    payments::{
        dto::{PreferenceResponse, WebhookAck, WebhookNotification},
        gateway::{BackUrls, PaymentGateway, PreferenceItem, PreferenceRequest},
        repo,
    },
    state::AppState,
};

pub fn checkout_routes() -> Router<AppState> {
    Router::new().route("/payments/preference", post(create_preference))
}

pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/webhooks/mercadopago", post(mercadopago_webhook))
}

fn gateway(state: &AppState) -> ApiResult<Arc<dyn PaymentGateway>> {
    state.payments.clone().ok_or(ApiError::CheckoutUnavailable)
}

pub(crate) fn build_preference_request(
    user_id: Uuid,
    lines: &[PricedLine],
    cfg: &PaymentsConfig,
) -> PreferenceRequest {
    PreferenceRequest {
        items: lines
            .iter()
            .map(|line| PreferenceItem {
                title: line.name.clone(),
                quantity: line.quantity,
                currency_id: cfg.currency.clone(),
                unit_price: line.price,
            })
            .collect(),
        back_urls: BackUrls::for_base(&cfg.back_url_base),
        external_reference: user_id.to_string(),
    }
}

#[instrument(skip(state))]
pub async fn create_preference(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<PreferenceResponse>> {
    let gateway = gateway(&state)?;

    let lines = cart_repo::priced_lines(&state.db, user_id).await?;
    if lines.is_empty() {
        return Err(ApiError::BadRequest("cart is empty".into()));
    }

    let request = build_preference_request(user_id, &lines, &state.config.payments);
    let preference = gateway.create_preference(&request).await?;
    info!(
        %user_id,
        provider = gateway.provider_name(),
        preference_id = %preference.id,
        "checkout preference created"
    );

    if let Err(e) =
        repo::record_preference(&state.db, user_id, &preference.id, &preference.init_point).await
    {
        error!(error = ?e, preference_id = %preference.id, "failed to store preference");
    }

    Ok(Json(PreferenceResponse {
        id: preference.id,
        init_point: preference.init_point,
    }))
}

#[instrument(skip(state, notification), fields(kind = %notification.kind))]
pub async fn mercadopago_webhook(
    State(state): State<AppState>,
    Json(notification): Json<WebhookNotification>,
) -> ApiResult<Json<WebhookAck>> {
    if notification.kind != "payment" {
        return Ok(Json(WebhookAck::ok()));
    }
    let Some(payment_id) = notification.resource_id() else {
        warn!("payment notification without id");
        return Ok(Json(WebhookAck::ok()));
    };

    let payment = gateway(&state)?.fetch_payment(&payment_id).await?;
    if !payment.is_approved() {
        info!(%payment_id, status = %payment.status, "payment not approved yet");
        return Ok(Json(WebhookAck::ok()));
    }

    let reference = payment.external_reference.as_deref().unwrap_or_default();
    match Uuid::parse_str(reference) {
        Ok(user_id) => {
            let removed = cart_repo::clear(&state.db, user_id).await?;
            info!(%payment_id, %user_id, removed, "payment approved; cart cleared");
        }
        Err(_) => warn!(%payment_id, reference, "approved payment without a user reference"),
    }
    Ok(Json(WebhookAck::ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        extract::FromRef,
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use tower::ServiceExt;

    use sqlx::PgPool;

    use crate::auth::jwt::JwtKeys;
    use crate::cart::repo::CartLine;
    use crate::payments::{
        error::PaymentResult,
        gateway::{Payment, Preference},
    };

    #[derive(Default)]
    struct StubGateway {
        status: String,
        reference: Option<String>,
        fetched: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PaymentGateway for StubGateway {
        async fn create_preference(&self, _: &PreferenceRequest) -> PaymentResult<Preference> {
            Ok(Preference {
                id: "pref-1".into(),
                init_point: "https://mp.example/pref-1".into(),
            })
        }

        async fn fetch_payment(&self, payment_id: &str) -> PaymentResult<Payment> {
            self.fetched.lock().unwrap().push(payment_id.to_string());
            Ok(Payment {
                status: self.status.clone(),
                external_reference: self.reference.clone(),
            })
        }

        fn provider_name(&self) -> &'static str {
            "stub"
        }
    }

    fn app(state: AppState) -> Router {
        checkout_routes().merge(webhook_routes()).with_state(state)
    }

    async fn post_json(
        router: Router,
        uri: &str,
        body: Value,
        bearer: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let res = router
            .oneshot(builder.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[test]
    fn preference_request_carries_cart_lines() {
        let user_id = Uuid::new_v4();
        let cfg = PaymentsConfig {
            access_token: Some("t".into()),
            api_base: "https://api.mercadopago.com".into(),
            back_url_base: "https://shop.example".into(),
            currency: "MXN".into(),
        };
        let lines = vec![PricedLine {
            product_id: Uuid::new_v4(),
            name: "Concha".into(),
            price: 18.5,
            quantity: 3,
        }];

        let req = build_preference_request(user_id, &lines, &cfg);
        assert_eq!(req.external_reference, user_id.to_string());
        assert_eq!(
            req.items,
            vec![PreferenceItem {
                title: "Concha".into(),
                quantity: 3,
                currency_id: "MXN".into(),
                unit_price: 18.5,
            }]
        );
        assert_eq!(req.back_urls.pending, "https://shop.example/cart?status=pending");
    }

    #[tokio::test]
    async fn preference_without_gateway_is_unavailable() {
        let state = AppState::fake();
        let token = JwtKeys::from_ref(&state).sign_access(Uuid::new_v4()).unwrap();
        let (status, body) =
            post_json(app(state), "/payments/preference", json!({}), Some(&token)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "checkout unavailable");
    }

    #[tokio::test]
    async fn preference_requires_login() {
        let (status, _) =
            post_json(app(AppState::fake()), "/payments/preference", json!({}), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn webhook_ignores_other_topics() {
        let (status, body) = post_json(
            app(AppState::fake()),
            "/webhooks/mercadopago",
            json!({"type": "merchant_order", "data": {"id": "1"}}),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn webhook_leaves_cart_for_pending_payment() {
        let gateway = Arc::new(StubGateway {
            status: "pending".into(),
            reference: Some(Uuid::new_v4().to_string()),
            ..Default::default()
        });
        let mut state = AppState::fake();
        state.payments = Some(gateway.clone() as Arc<dyn PaymentGateway>);

        let (status, body) = post_json(
            app(state),
            "/webhooks/mercadopago",
            json!({"type": "payment", "data": {"id": 555}}),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(*gateway.fetched.lock().unwrap(), vec!["555".to_string()]);
    }

    #[tokio::test]
    async fn webhook_tolerates_approved_payment_without_reference() {
        let mut state = AppState::fake();
        let gateway: Arc<dyn PaymentGateway> = Arc::new(StubGateway {
            status: "approved".into(),
            reference: None,
            ..Default::default()
        });
        state.payments = Some(gateway);
        let (status, _) = post_json(
            app(state),
            "/webhooks/mercadopago",
            json!({"type": "payment", "data": {"id": "1"}}),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn webhook_without_gateway_is_unavailable() {
        let (status, _) = post_json(
            app(AppState::fake()),
            "/webhooks/mercadopago",
            json!({"type": "payment", "data": {"id": "1"}}),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[sqlx::test]
    #[ignore = "needs DATABASE_URL pointing at a disposable Postgres"]
    async fn approved_payment_clears_referenced_cart(pool: PgPool) {
        let buyer: Uuid = sqlx::query_scalar(
            "INSERT INTO users (email, password_hash) VALUES ('buyer@x.com', 'h') RETURNING id",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        let other: Uuid = sqlx::query_scalar(
            "INSERT INTO users (email, password_hash) VALUES ('other@x.com', 'h') RETURNING id",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        let product: Uuid = sqlx::query_scalar(
            "INSERT INTO products (name, price) VALUES ('Concha', 18.5) RETURNING id",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        let line = [CartLine {
            product_id: product,
            quantity: 2,
        }];
        cart_repo::replace(&pool, buyer, &line).await.unwrap();
        cart_repo::replace(&pool, other, &line).await.unwrap();

        let gateway: Arc<dyn PaymentGateway> = Arc::new(StubGateway {
            status: "approved".into(),
            reference: Some(buyer.to_string()),
            ..Default::default()
        });
        let mut state = AppState::fake();
        state.db = pool.clone();
        state.payments = Some(gateway);

        let (status, body) = post_json(
            app(state),
            "/webhooks/mercadopago",
            json!({"type": "payment", "data": {"id": 777}}),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        assert!(cart_repo::list(&pool, buyer).await.unwrap().is_empty());
        assert_eq!(cart_repo::list(&pool, other).await.unwrap().len(), 1);
    }
}
