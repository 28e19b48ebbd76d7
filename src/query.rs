//! Catalog read-path query composition.
//!
//! Filters are an ordered pipeline of stages. Each stage either narrows the
//! selection or passes it through untouched when its parameter is absent, so
//! simultaneously supplied filters always compose conjunctively and each stage
//! can be tested on its own.

use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, Select};

use crate::entity::products::{Column, Entity as Products, ProductKind};

/// Optional catalog filters as they arrive from the query string. `available`
/// is kept raw: only the case-insensitive literal `"true"` activates the
/// availability stage, anything else means "no filter".
#[derive(Debug, Default, Clone)]
pub struct CatalogFilter {
    pub search: Option<String>,
    pub kind: Option<ProductKind>,
    pub available: Option<String>,
}

/// Build the filtered catalog view, newest listings first.
pub fn compose(filter: &CatalogFilter) -> Select<Products> {
    let select = Products::find();
    let select = apply_search(select, filter.search.as_deref());
    let select = apply_kind(select, filter.kind);
    let select = apply_availability(select, filter.available.as_deref());
    select.order_by_desc(Column::CreatedAt)
}

/// Case-insensitive substring match over name OR type.
fn apply_search(select: Select<Products>, search: Option<&str>) -> Select<Products> {
    let Some(search) = search.filter(|s| !s.is_empty()) else {
        return select;
    };
    let pattern = format!("%{search}%");
    select.filter(
        Condition::any()
            .add(Expr::col(Column::Name).ilike(pattern.clone()))
            .add(Expr::col(Column::Kind).ilike(pattern)),
    )
}

/// Exact category match, narrowing on top of whatever search matched.
fn apply_kind(select: Select<Products>, kind: Option<ProductKind>) -> Select<Products> {
    match kind {
        Some(kind) => select.filter(Column::Kind.eq(kind)),
        None => select,
    }
}

fn apply_availability(select: Select<Products>, available: Option<&str>) -> Select<Products> {
    if available_flag_is_truthy(available) {
        select.filter(Column::Availability.eq(true))
    } else {
        select
    }
}

pub fn available_flag_is_truthy(raw: Option<&str>) -> bool {
    raw.is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, QueryTrait};

    fn sql(filter: &CatalogFilter) -> String {
        compose(filter).build(DbBackend::Postgres).to_string()
    }

    #[test]
    fn no_filters_is_plain_ordered_scan() {
        let sql = sql(&CatalogFilter::default());
        assert!(!sql.contains("WHERE"), "unexpected filter in: {sql}");
        assert!(sql.contains(r#"ORDER BY "products"."created_at" DESC"#));
    }

    #[test]
    fn search_matches_name_or_type_case_insensitively() {
        let sql = sql(&CatalogFilter {
            search: Some("silk".into()),
            ..Default::default()
        });
        assert!(sql.contains(r#""name" ILIKE '%silk%'"#), "{sql}");
        assert!(sql.contains(r#""type" ILIKE '%silk%'"#), "{sql}");
        assert!(sql.contains("OR"), "{sql}");
    }

    #[test]
    fn empty_search_is_passthrough() {
        let sql = sql(&CatalogFilter {
            search: Some(String::new()),
            ..Default::default()
        });
        assert!(!sql.contains("ILIKE"), "{sql}");
    }

    #[test]
    fn kind_filter_is_exact() {
        let sql = sql(&CatalogFilter {
            kind: Some(ProductKind::Saree),
            ..Default::default()
        });
        assert!(sql.contains(r#""type" = 'saree'"#), "{sql}");
    }

    #[test]
    fn all_filters_compose_conjunctively() {
        let sql = sql(&CatalogFilter {
            search: Some("silk".into()),
            kind: Some(ProductKind::Scarf),
            available: Some("true".into()),
        });
        assert!(sql.contains("ILIKE"), "{sql}");
        assert!(sql.contains(r#""type" = 'scarf'"#), "{sql}");
        assert!(sql.contains(r#""availability" = TRUE"#), "{sql}");
        // Search and kind narrow together, not one-or-the-other.
        assert!(sql.contains(") AND "), "{sql}");
    }

    #[test]
    fn availability_flag_parsing() {
        assert!(available_flag_is_truthy(Some("true")));
        assert!(available_flag_is_truthy(Some("TRUE")));
        assert!(available_flag_is_truthy(Some("True")));
        assert!(!available_flag_is_truthy(Some("false")));
        assert!(!available_flag_is_truthy(Some("1")));
        assert!(!available_flag_is_truthy(Some("yes")));
        assert!(!available_flag_is_truthy(None));
    }

    #[test]
    fn availability_filter_only_when_truthy() {
        let on = sql(&CatalogFilter {
            available: Some("True".into()),
            ..Default::default()
        });
        assert!(on.contains(r#""availability" = TRUE"#), "{on}");

        let off = sql(&CatalogFilter {
            available: Some("anything".into()),
            ..Default::default()
        });
        assert!(!off.contains("availability"), "{off}");
    }
}
