use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use password_hash::rand_core::OsRng;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, QueryFilter, Set, SqlErr, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::auth::{AuthResponse, LoginRequest, LogoutRequest, RegisterRequest},
    entity::{Users, profiles, users},
    error::{AppError, AppResult, FieldError},
    middleware::auth::AuthUser,
    models::User,
    response::ApiResponse,
    state::AppState,
    token,
};

const MIN_PASSWORD_LEN: usize = 8;

/// Create an Identity and its Profile as one atomic unit and hand back a token
/// pair. A profile insert failure rolls the identity back with it.
pub async fn register(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<AuthResponse>> {
    validate_registration(&payload)?;

    let exists = Users::find()
        .filter(users::Column::Username.eq(payload.username.as_str()))
        .one(&state.orm)
        .await?;
    if exists.is_some() {
        return Err(duplicate_username());
    }

    let password_hash = hash_password(&payload.password)?;
    let user_id = Uuid::new_v4();

    let txn = state.orm.begin().await?;

    // The pre-check above races with the unique index under concurrent
    // registrations, so the violation is mapped here as well.
    let user = users::ActiveModel {
        id: Set(user_id),
        username: Set(payload.username),
        email: Set(payload.email),
        password_hash: Set(password_hash),
        first_name: Set(payload.first_name),
        last_name: Set(payload.last_name),
        created_at: NotSet,
    }
    .insert(&txn)
    .await
    .map_err(map_username_conflict)?;

    profiles::ActiveModel {
        user_id: Set(user_id),
        role: Set(payload.role.unwrap_or_default()),
        phone: Set(payload.phone),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    let tokens = token::issue(&state.config.jwt_secret, user.id)?;

    if let Err(err) = log_audit(
        &state.orm,
        Some(user.id),
        "user_register",
        Some("users"),
        Some(serde_json::json!({ "user_id": user.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "User created successfully",
        AuthResponse {
            user: user.into(),
            tokens,
        },
        None,
    ))
}

pub async fn login(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<AuthResponse>> {
    let user = Users::find()
        .filter(users::Column::Username.eq(payload.username.as_str()))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid username or password".into()))?;

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;

    if Argon2::default()
        .verify_password(payload.password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(AppError::BadRequest("Invalid username or password".into()));
    }

    let tokens = token::issue(&state.config.jwt_secret, user.id)?;

    if let Err(err) = log_audit(
        &state.orm,
        Some(user.id),
        "user_login",
        Some("users"),
        Some(serde_json::json!({ "user_id": user.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Logged in",
        AuthResponse {
            user: user.into(),
            tokens,
        },
        None,
    ))
}

/// The caller's own identity summary.
pub async fn profile(state: &AppState, auth: &AuthUser) -> AppResult<ApiResponse<User>> {
    let user = Users::find_by_id(auth.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(ApiResponse::success("Profile", User::from(user), None))
}

/// Invalidate the caller's refresh token.
pub async fn logout(
    state: &AppState,
    payload: LogoutRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let refresh = payload
        .refresh
        .ok_or_else(|| AppError::BadRequest("Refresh token required".into()))?;

    token::revoke_refresh(&state.orm, &state.config.jwt_secret, &refresh).await?;

    Ok(ApiResponse::success(
        "Successfully logged out",
        serde_json::json!({}),
        None,
    ))
}

fn duplicate_username() -> AppError {
    AppError::validation("username", "A user with that username already exists")
}

fn map_username_conflict(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => duplicate_username(),
        _ => AppError::OrmError(err),
    }
}

fn validate_registration(payload: &RegisterRequest) -> AppResult<()> {
    let mut errors = Vec::new();

    if payload.username.trim().is_empty() {
        errors.push(FieldError::new("username", "This field is required"));
    }
    if !payload.email.contains('@') {
        errors.push(FieldError::new("email", "Enter a valid email address"));
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        errors.push(FieldError::new(
            "password",
            "Password must be at least 8 characters",
        ));
    }
    if payload.password != payload.password_confirm {
        errors.push(FieldError::new("password_confirm", "Passwords don't match"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn request() -> RegisterRequest {
        RegisterRequest {
            username: "weaver".into(),
            email: "weaver@example.com".into(),
            password: "longenough".into(),
            password_confirm: "longenough".into(),
            first_name: String::new(),
            last_name: String::new(),
            role: Some(Role::Seller),
            phone: None,
        }
    }

    fn field_names(err: AppError) -> Vec<String> {
        match err {
            AppError::Validation(errors) => errors.into_iter().map(|e| e.field).collect(),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn valid_payload_passes() {
        assert!(validate_registration(&request()).is_ok());
    }

    #[test]
    fn mismatched_confirmation_names_the_confirmation_field() {
        let mut req = request();
        req.password_confirm = "different-pw".into();
        let fields = field_names(validate_registration(&req).unwrap_err());
        assert_eq!(fields, vec!["password_confirm"]);
    }

    #[test]
    fn short_password_names_the_password_field() {
        let mut req = request();
        req.password = "short".into();
        req.password_confirm = "short".into();
        let fields = field_names(validate_registration(&req).unwrap_err());
        assert_eq!(fields, vec!["password"]);
    }

    #[test]
    fn multiple_failures_are_reported_together() {
        let mut req = request();
        req.username = String::new();
        req.email = "not-an-email".into();
        req.password = "short".into();
        let fields = field_names(validate_registration(&req).unwrap_err());
        assert_eq!(
            fields,
            vec!["username", "email", "password", "password_confirm"]
        );
    }
}
