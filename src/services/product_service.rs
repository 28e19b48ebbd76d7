use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::products::{CreateProductRequest, ProductList, ProductStats, UpdateProductRequest},
    entity::{Products, Profiles, products, profiles},
    error::{AppError, AppResult, FieldError},
    middleware::auth::AuthUser,
    models::{Product, ProductKind},
    policy::{self, Actor},
    query,
    response::{ApiResponse, Meta},
    routes::params::ProductQuery,
    state::AppState,
};

/// Resolve the authenticated caller into a policy actor. A missing profile is
/// a legitimate state, it just carries no role.
pub async fn load_actor<C: ConnectionTrait>(conn: &C, auth: &AuthUser) -> AppResult<Actor> {
    let profile = Profiles::find()
        .filter(profiles::Column::UserId.eq(auth.user_id))
        .one(conn)
        .await?;

    Ok(Actor::new(auth.user_id, profile.map(|p| p.role)))
}

pub async fn list_products(
    state: &AppState,
    params: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = params.pagination.normalize();

    let finder = query::compose(&params.filter());
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    let meta = Meta::paged(page, limit, total);
    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(meta),
    ))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let product = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(ApiResponse::success("Product", Product::from(product), None))
}

pub async fn create_product(
    state: &AppState,
    auth: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    let actor = load_actor(&state.orm, auth).await?;
    if !policy::can_create_product(&actor) {
        return Err(AppError::Forbidden("Only sellers can add products".into()));
    }

    validate_name(&payload.name)?;
    validate_price(payload.price)?;

    let active = products::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name),
        kind: Set(payload.kind),
        price: Set(payload.price),
        availability: Set(payload.availability.unwrap_or(true)),
        owner_id: Set(auth.user_id),
        description: Set(payload.description),
        created_at: NotSet,
        updated_at: NotSet,
    };
    let product = active.insert(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.orm,
        Some(auth.user_id),
        "product_create",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Product created",
        Product::from(product),
        None,
    ))
}

pub async fn update_product(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let actor = load_actor(&state.orm, auth).await?;
    if !policy::can_mutate_product(&actor, existing.owner_id) {
        return Err(deny_foreign_mutation(state, "update"));
    }

    if let Some(name) = payload.name.as_deref() {
        validate_name(name)?;
    }
    if let Some(price) = payload.price {
        validate_price(price)?;
    }

    let mut active: products::ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(kind) = payload.kind {
        active.kind = Set(kind);
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(availability) = payload.availability {
        active.availability = Set(availability);
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    active.updated_at = Set(Utc::now().into());

    let product = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.orm,
        Some(auth.user_id),
        "product_update",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Updated",
        Product::from(product),
        None,
    ))
}

pub async fn delete_product(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let actor = load_actor(&state.orm, auth).await?;
    if !policy::can_mutate_product(&actor, existing.owner_id) {
        return Err(deny_foreign_mutation(state, "delete"));
    }

    Products::delete_by_id(id).exec(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.orm,
        Some(auth.user_id),
        "product_delete",
        Some("products"),
        Some(serde_json::json!({ "product_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        None,
    ))
}

pub async fn product_stats(state: &AppState) -> AppResult<ApiResponse<ProductStats>> {
    let total = Products::find().count(&state.orm).await? as i64;
    let available = Products::find()
        .filter(products::Column::Availability.eq(true))
        .count(&state.orm)
        .await? as i64;

    let kinds: Vec<ProductKind> = Products::find()
        .select_only()
        .column(products::Column::Kind)
        .distinct()
        .into_tuple()
        .all(&state.orm)
        .await?;

    let stats = ProductStats {
        total_products: total,
        available_products: available,
        unavailable_products: total - available,
        product_types: kinds.len() as i64,
    };

    Ok(ApiResponse::success("Stats", stats, None))
}

/// Non-owner mutation denial. By default the resource's existence is disclosed
/// with an explicit ownership message; the conceal toggle switches to a plain
/// 404 instead.
fn deny_foreign_mutation(state: &AppState, action: &str) -> AppError {
    if state.config.conceal_foreign_products {
        AppError::NotFound
    } else {
        AppError::Forbidden(format!("You can only {action} your own products"))
    }
}

fn validate_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::Validation(vec![FieldError::new(
            "name",
            "This field is required",
        )]));
    }
    Ok(())
}

fn validate_price(price: Decimal) -> AppResult<()> {
    if price < Decimal::ZERO {
        return Err(AppError::Validation(vec![FieldError::new(
            "price",
            "Ensure this value is greater than or equal to 0",
        )]));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_price_is_a_field_error() {
        let err = validate_price(Decimal::new(-1, 2)).unwrap_err();
        match err {
            AppError::Validation(errors) => assert_eq!(errors[0].field, "price"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn zero_price_is_allowed() {
        assert!(validate_price(Decimal::ZERO).is_ok());
    }

    #[test]
    fn blank_name_is_a_field_error() {
        assert!(validate_name("  ").is_err());
        assert!(validate_name("Silk Saree").is_ok());
    }
}
