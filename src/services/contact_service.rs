use uuid::Uuid;

use crate::{
    dto::products::ContactSellerRequest,
    entity::{Products, Users, products, users},
    error::{AppError, AppResult, FieldError},
    mailer::Email,
    middleware::auth::AuthUser,
    policy,
    response::ApiResponse,
    services::product_service::load_actor,
    state::AppState,
};
use sea_orm::EntityTrait;

/// Relay a buyer's interest in a listing to its owner by email. The send is
/// best-effort: nothing in the store changes, and a transport failure comes
/// back as its own error, not a validation failure.
pub async fn contact_seller(
    state: &AppState,
    auth: &AuthUser,
    product_id: Uuid,
    payload: ContactSellerRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let product = Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let actor = load_actor(&state.orm, auth).await?;
    if !policy::can_contact_seller(&actor, product.owner_id) {
        return Err(AppError::Forbidden(
            "Only buyers can contact the seller of someone else's product".into(),
        ));
    }

    validate_contact(&payload)?;

    let sender = Users::find_by_id(auth.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let owner = Users::find_by_id(product.owner_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let email = build_contact_email(&product, &sender, &owner, &payload);
    state.mailer.send(email).await?;

    Ok(ApiResponse::success(
        "Your message has been sent to the seller!",
        serde_json::json!({}),
        None,
    ))
}

fn build_contact_email(
    product: &products::Model,
    sender: &users::Model,
    owner: &users::Model,
    payload: &ContactSellerRequest,
) -> Email {
    let full_name = format!("{} {}", sender.first_name, sender.last_name);
    let full_name = full_name.trim().to_string();
    let display_name = if full_name.is_empty() {
        sender.username.clone()
    } else {
        full_name
    };

    Email {
        to: owner.email.clone(),
        subject: format!("Interest in your product: {}", product.name),
        body: format!(
            "From: {} ({})\nSubject: {}\n\n{}\n\nProduct: {}\nPrice: ${}",
            display_name, sender.email, payload.subject, payload.message, product.name, product.price,
        ),
    }
}

fn validate_contact(payload: &ContactSellerRequest) -> AppResult<()> {
    let mut errors = Vec::new();
    if payload.subject.trim().is_empty() {
        errors.push(FieldError::new("subject", "This field is required"));
    }
    if payload.message.trim().is_empty() {
        errors.push(FieldError::new("message", "This field is required"));
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}
