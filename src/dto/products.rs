use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

use crate::models::Product;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub discount_price: Option<i64>,
    pub category: String,
    pub material: Option<String>,
    pub color: Option<String>,
    pub dimensions: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub stock: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    /// Absent keeps the current discount, `null` removes it.
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<i64>)]
    pub discount_price: Option<Option<i64>>,
    pub category: Option<String>,
    pub material: Option<String>,
    pub color: Option<String>,
    pub dimensions: Option<String>,
    pub images: Option<Vec<String>>,
    pub stock: Option<i32>,
    pub is_active: Option<bool>,
}

fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct CategoryList {
    #[schema(value_type = Vec<String>)]
    pub items: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(json: serde_json::Value) -> UpdateProductRequest {
        serde_json::from_value(json).expect("update request")
    }

    #[test]
    fn discount_distinguishes_missing_from_null() {
        assert_eq!(update(serde_json::json!({ "name": "Sofa" })).discount_price, None);
        assert_eq!(
            update(serde_json::json!({ "discount_price": null })).discount_price,
            Some(None)
        );
        assert_eq!(
            update(serde_json::json!({ "discount_price": 900 })).discount_price,
            Some(Some(900))
        );
    }
}
