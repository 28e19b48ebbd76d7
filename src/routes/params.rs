use serde::Deserialize;
use utoipa::ToSchema;

use crate::models::ProductKind;
use crate::query::CatalogFilter;

#[derive(Debug, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;
        (page, per_page, offset)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProductQuery {
    #[serde(flatten)]
    pub pagination: Pagination,
    pub search: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<ProductKind>,
    /// Raw availability flag; only the literal "true" (any case) filters.
    pub available: Option<String>,
}

impl ProductQuery {
    pub fn filter(&self) -> CatalogFilter {
        CatalogFilter {
            search: self.search.clone(),
            kind: self.kind,
            available: self.available.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_normalizes_out_of_range_values() {
        let p = Pagination {
            page: Some(0),
            per_page: Some(1000),
        };
        assert_eq!(p.normalize(), (1, 100, 0));

        let defaults = Pagination {
            page: None,
            per_page: None,
        };
        assert_eq!(defaults.normalize(), (1, 20, 0));
    }
}
