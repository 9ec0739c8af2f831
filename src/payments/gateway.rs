//! Payment provider seam and its Mercado Pago implementation.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use crate::config::PaymentsConfig;
use crate::payments::error::{PaymentError, PaymentResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreferenceItem {
    pub title: String,
    pub quantity: i32,
    pub currency_id: String,
    pub unit_price: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BackUrls {
    pub success: String,
    pub failure: String,
    pub pending: String,
}

impl BackUrls {
    /// `<base>/cart?status=...` for each outcome.
    pub fn for_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            success: format!("{base}/cart?status=success"),
            failure: format!("{base}/cart?status=failure"),
            pending: format!("{base}/cart?status=pending"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PreferenceRequest {
    pub items: Vec<PreferenceItem>,
    pub back_urls: BackUrls,
    pub external_reference: String,
}

/// Payment session created by the provider.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Preference {
    pub id: String,
    pub init_point: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Payment {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub external_reference: Option<String>,
}

impl Payment {
    pub fn is_approved(&self) -> bool {
        self.status == "approved"
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_preference(&self, request: &PreferenceRequest) -> PaymentResult<Preference>;

    async fn fetch_payment(&self, payment_id: &str) -> PaymentResult<Payment>;

    fn provider_name(&self) -> &'static str;
}

pub struct MercadoPagoGateway {
    client: Client,
    api_base: String,
    access_token: String,
}

impl MercadoPagoGateway {
    pub fn new(api_base: impl Into<String>, access_token: impl Into<String>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        })
    }

    /// `None` when no access token is configured.
    pub fn from_config(cfg: &PaymentsConfig) -> anyhow::Result<Option<Self>> {
        cfg.access_token
            .as_deref()
            .map(|token| Self::new(&cfg.api_base, token))
            .transpose()
    }

    async fn read<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> PaymentResult<T> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            error!(%status, "mercadopago request failed");
            return Err(PaymentError::Provider {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl PaymentGateway for MercadoPagoGateway {
    #[instrument(skip(self, request), fields(items = request.items.len()))]
    async fn create_preference(&self, request: &PreferenceRequest) -> PaymentResult<Preference> {
        let url = format!("{}/checkout/preferences", self.api_base);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(request)
            .send()
            .await?;
        let preference: Preference = Self::read(response).await?;
        if preference.id.is_empty() || preference.init_point.is_empty() {
            return Err(PaymentError::InvalidResponse(
                "preference without id or init_point".into(),
            ));
        }
        debug!(preference_id = %preference.id, "preference created");
        Ok(preference)
    }

    #[instrument(skip(self))]
    async fn fetch_payment(&self, payment_id: &str) -> PaymentResult<Payment> {
        let url = format!("{}/v1/payments/{}", self.api_base, payment_id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        Self::read(response).await
    }

    fn provider_name(&self) -> &'static str {
        "mercadopago"
    }
}
