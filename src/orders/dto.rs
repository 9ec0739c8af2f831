use serde::Deserialize;
use time::{macros::format_description, Date};

use crate::{error::ApiError, orders::repo::NewOrder};

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub product: String,
    pub quantity: Option<i32>,
    pub delivery_date: Option<String>,
    pub note: Option<String>,
}

impl CreateOrderRequest {
    pub fn validate(self) -> Result<NewOrder, ApiError> {
        let name = self.name.trim();
        let email = self.email.trim();
        let product = self.product.trim();
        if name.is_empty() || email.is_empty() || product.is_empty() {
            return Err(ApiError::BadRequest(
                "name, email and product are required".into(),
            ));
        }
        Ok(NewOrder {
            name: name.to_string(),
            email: email.to_lowercase(),
            product: product.to_string(),
            quantity: self.quantity.filter(|q| *q >= 1).unwrap_or(1),
            delivery_date: self.delivery_date.as_deref().and_then(parse_delivery_date),
            note: self.note.filter(|n| !n.trim().is_empty()),
        })
    }
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time part. Anything else is `None`.
pub(crate) fn parse_delivery_date(raw: &str) -> Option<Date> {
    let raw = raw.trim();
    let date = raw.get(..10).unwrap_or(raw);
    let rest = &raw[date.len()..];
    if !(rest.is_empty() || rest.starts_with('T') || rest.starts_with(' ')) {
        return None;
    }
    Date::parse(date, format_description!("[year]-[month]-[day]")).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn request() -> CreateOrderRequest {
        CreateOrderRequest {
            name: " Ana ".into(),
            email: "Ana@X.com".into(),
            product: "Pastel tres leches".into(),
            quantity: None,
            delivery_date: Some("2025-12-24".into()),
            note: Some("sin nuez".into()),
        }
    }

    #[test]
    fn defaults_quantity_and_parses_date() {
        let order = request().validate().unwrap();
        assert_eq!(order.name, "Ana");
        assert_eq!(order.email, "ana@x.com");
        assert_eq!(order.quantity, 1);
        assert_eq!(order.delivery_date, Some(date!(2025 - 12 - 24)));
        assert_eq!(order.note.as_deref(), Some("sin nuez"));
    }

    #[test]
    fn missing_required_fields_are_rejected() {
        let mut req = request();
        req.product = "  ".into();
        assert!(matches!(req.validate(), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn non_positive_quantity_falls_back_to_one() {
        let mut req = request();
        req.quantity = Some(0);
        assert_eq!(req.validate().unwrap().quantity, 1);

        let mut req = request();
        req.quantity = Some(3);
        assert_eq!(req.validate().unwrap().quantity, 3);
    }

    #[test]
    fn delivery_date_parsing() {
        assert_eq!(
            parse_delivery_date("2025-01-05T10:30:00"),
            Some(date!(2025 - 01 - 05))
        );
        assert_eq!(parse_delivery_date("2025-02-30"), None);
        assert_eq!(parse_delivery_date("mañana"), None);
        assert_eq!(parse_delivery_date("2025-01-05x"), None);
        assert_eq!(parse_delivery_date(""), None);
    }
}
