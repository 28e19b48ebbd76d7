use serde::Serialize;
use utoipa::ToSchema;

/// Pagination echo for catalog listings. Endpoints that return a single
/// record carry no meta block at all.
#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct Meta {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
}

impl Meta {
    pub fn paged(page: i64, per_page: i64, total: i64) -> Self {
        Self {
            page,
            per_page,
            total,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T, meta: Option<Meta>) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
            meta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_is_omitted_from_the_wire_when_absent() {
        let with = serde_json::to_value(ApiResponse::success(
            "Products",
            serde_json::json!([]),
            Some(Meta::paged(1, 20, 0)),
        ))
        .unwrap();
        assert_eq!(with["meta"]["per_page"], 20);

        let without =
            serde_json::to_value(ApiResponse::success("Product", serde_json::json!({}), None))
                .unwrap();
        assert!(without.get("meta").is_none());
    }
}
