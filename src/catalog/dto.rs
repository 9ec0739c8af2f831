use serde::Deserialize;

use crate::{catalog::repo::NewProduct, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub image_url: Option<String>,
    pub category: Option<String>,
}

impl CreateProductRequest {
    pub fn validate(self) -> Result<NewProduct, ApiError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ApiError::BadRequest("name is required".into()));
        }
        let price = match self.price {
            Some(p) if p.is_finite() && p > 0.0 => p,
            _ => return Err(ApiError::BadRequest("price must be greater than zero".into())),
        };
        Ok(NewProduct {
            name: name.to_string(),
            description: non_blank(self.description),
            price,
            image_url: non_blank(self.image_url),
            category: non_blank(self.category),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
