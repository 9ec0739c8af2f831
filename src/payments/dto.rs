use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct PreferenceResponse {
    pub id: String,
    pub init_point: String,
}

/// Notification posted by Mercado Pago.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookNotification {
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: WebhookData,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookData {
    #[serde(default)]
    pub id: Value,
}

impl WebhookNotification {
    /// Resource id, sent either as a string or a number.
    pub fn resource_id(&self) -> Option<String> {
        match &self.data.id {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub status: &'static str,
}

impl WebhookAck {
    pub fn ok() -> Self {
        Self { status: "ok" }
    }
}
