use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{AuthResponse, LoginRequest, LogoutRequest, RegisterRequest},
        products::{
            ContactSellerRequest, CreateProductRequest, ProductList, ProductStats,
            UpdateProductRequest,
        },
    },
    error::FieldError,
    models::{Product, ProductKind, Role, User},
    response::{ApiResponse, Meta},
    routes::{auth, health, params, products},
    token::TokenPair,
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::profile,
        auth::logout,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::patch_product,
        products::delete_product,
        products::product_stats,
        products::contact_seller,
    ),
    components(
        schemas(
            User,
            Role,
            Product,
            ProductKind,
            TokenPair,
            FieldError,
            RegisterRequest,
            LoginRequest,
            LogoutRequest,
            AuthResponse,
            CreateProductRequest,
            UpdateProductRequest,
            ContactSellerRequest,
            ProductList,
            ProductStats,
            params::Pagination,
            params::ProductQuery,
            Meta,
            ApiResponse<User>,
            ApiResponse<AuthResponse>,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<ProductStats>,
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration, login and token lifecycle"),
        (name = "Products", description = "Silk product catalog"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
