use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    cart::repo::{CartItem, CartLine},
    error::ApiError,
};

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub items: Vec<CartItem>,
}

#[derive(Debug, Deserialize)]
pub struct CartLineRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct ReplaceCartRequest {
    #[serde(default)]
    pub items: Vec<CartLineRequest>,
}

impl ReplaceCartRequest {
    pub fn validate(self) -> Result<Vec<CartLine>, ApiError> {
        let mut seen = HashSet::with_capacity(self.items.len());
        self.items
            .into_iter()
            .map(|item| {
                if item.quantity < 1 {
                    return Err(ApiError::BadRequest("quantity must be at least 1".into()));
                }
                if !seen.insert(item.product_id) {
                    return Err(ApiError::BadRequest("duplicate product in cart".into()));
                }
                Ok(CartLine {
                    product_id: item.product_id,
                    quantity: item.quantity,
                })
            })
            .collect()
    }
}
