use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::Dish,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDishRequest {
    pub name: String,
    pub description: Option<String>,
    /// Minor currency units, e.g. 999 for 9.99.
    pub price: i64,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub is_available: Option<bool>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateDishRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub is_available: Option<bool>,
}

/// Highest accepted dish price, in minor units (1,000,000.00).
pub const MAX_PRICE: i64 = 100_000_000;

pub fn validate_price(price: i64) -> AppResult<()> {
    if price < 0 {
        return Err(AppError::bad_request("price must not be negative"));
    }
    if price > MAX_PRICE {
        return Err(AppError::bad_request(format!(
            "price must not exceed {MAX_PRICE}"
        )));
    }
    Ok(())
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct DishList {
    #[schema(value_type = Vec<Dish>)]
    pub items: Vec<Dish>,
}
