use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{AppError, FieldError};

/// `axum::Json` with the rejection folded into the validation-error envelope,
/// so a malformed body (including an unknown `role` or `type` value) comes
/// back as the same 400 shape as any other field error.
#[derive(Debug)]
pub struct Json<T>(pub T);

impl<S, T> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Json(value)),
            Err(rejection) => Err(reject(rejection)),
        }
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

fn reject(rejection: JsonRejection) -> AppError {
    AppError::Validation(vec![FieldError::new("body", rejection.body_text())])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::auth::RegisterRequest;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;

    fn json_request(body: &str) -> Request {
        HttpRequest::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn unknown_role_value_is_a_field_error_not_a_bare_rejection() {
        let body = r#"{
            "username": "weaver",
            "email": "weaver@example.com",
            "password": "longenough",
            "password_confirm": "longenough",
            "role": "admin"
        }"#;

        let err = Json::<RegisterRequest>::from_request(json_request(body), &())
            .await
            .unwrap_err();

        match err {
            AppError::Validation(errors) => {
                assert_eq!(errors[0].field, "body");
                assert!(errors[0].message.contains("unknown variant"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn well_formed_body_deserializes() {
        let body = r#"{
            "username": "weaver",
            "email": "weaver@example.com",
            "password": "longenough",
            "password_confirm": "longenough",
            "role": "seller"
        }"#;

        let Json(parsed) = Json::<RegisterRequest>::from_request(json_request(body), &())
            .await
            .unwrap();
        assert_eq!(parsed.username, "weaver");
    }
}
