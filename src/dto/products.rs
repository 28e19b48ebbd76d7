use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Product, ProductKind};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ProductKind,
    #[schema(value_type = String, example = "1500.00")]
    pub price: Decimal,
    pub availability: Option<bool>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<ProductKind>,
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    pub availability: Option<bool>,
    /// An absent field leaves the description unchanged; an explicit `null`
    /// clears it.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
}

fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductList {
    pub items: Vec<Product>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductStats {
    pub total_products: i64,
    pub available_products: i64,
    pub unavailable_products: i64,
    pub product_types: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ContactSellerRequest {
    pub subject: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_description_means_leave_unchanged() {
        let req: UpdateProductRequest = serde_json::from_str(r#"{"name": "Silk Saree"}"#).unwrap();
        assert_eq!(req.description, None);
    }

    #[test]
    fn null_description_means_clear() {
        let req: UpdateProductRequest = serde_json::from_str(r#"{"description": null}"#).unwrap();
        assert_eq!(req.description, Some(None));
    }

    #[test]
    fn string_description_means_replace() {
        let req: UpdateProductRequest =
            serde_json::from_str(r#"{"description": "Handwoven"}"#).unwrap();
        assert_eq!(req.description, Some(Some("Handwoven".into())));
    }
}
