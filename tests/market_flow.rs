use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::{ConnectionTrait, EntityTrait, PaginatorTrait, Statement};

use silk_market_api::{
    config::{AppConfig, SmtpConfig},
    db::{create_orm_conn, run_migrations},
    dto::{
        auth::{LogoutRequest, RegisterRequest},
        products::{ContactSellerRequest, CreateProductRequest, UpdateProductRequest},
    },
    entity::Users,
    error::AppError,
    mailer::RecordingMailer,
    middleware::auth::AuthUser,
    models::{ProductKind, Role},
    routes::params::{Pagination, ProductQuery},
    services::{auth_service, contact_service, product_service},
    state::AppState,
};

#[tokio::test]
async fn market_flow() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let database_url = match std::env::var("TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("TEST_DATABASE_URL not set; skipping market_flow test");
            return Ok(());
        }
    };

    let mailer = Arc::new(RecordingMailer::default());
    let state = setup_state(&database_url, mailer.clone(), false).await?;

    // Register a seller and a buyer.
    let seller = auth_service::register(&state, register_request("weaver", Some(Role::Seller)))
        .await?
        .data
        .unwrap();
    assert!(!seller.tokens.access.is_empty());
    assert!(!seller.tokens.refresh.is_empty());

    let buyer = auth_service::register(&state, register_request("shopper", Some(Role::Buyer)))
        .await?
        .data
        .unwrap();

    let auth_seller = AuthUser {
        user_id: seller.user.id,
    };
    let auth_buyer = AuthUser {
        user_id: buyer.user.id,
    };

    // A failed registration leaves no identity behind.
    let users_before = Users::find().count(&state.orm).await?;
    let mut bad = register_request("halfway", Some(Role::Buyer));
    bad.password_confirm = "different-pw".into();
    let err = auth_service::register(&state, bad).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(Users::find().count(&state.orm).await?, users_before);

    // Duplicate usernames are a field error, not a crash.
    let err = auth_service::register(&state, register_request("weaver", None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(Users::find().count(&state.orm).await?, users_before);

    // A profile insert failure rolls the identity back with it: phone is a
    // VARCHAR(20) column, so an overlong value fails after the user row is in.
    let mut overlong = register_request("overlong", Some(Role::Buyer));
    overlong.phone = Some("0".repeat(40));
    let err = auth_service::register(&state, overlong).await.unwrap_err();
    assert!(matches!(err, AppError::OrmError(_)));
    assert_eq!(Users::find().count(&state.orm).await?, users_before);

    // Two simultaneous registrations of the same fresh name: exactly one
    // lands, the loser gets the duplicate-username field error whether the
    // pre-check or the unique index catches it.
    let (a, b) = tokio::join!(
        auth_service::register(&state, register_request("racer", Some(Role::Buyer))),
        auth_service::register(&state, register_request("racer", Some(Role::Buyer))),
    );
    let failures: Vec<AppError> = [a, b].into_iter().filter_map(Result::err).collect();
    assert_eq!(failures.len(), 1);
    assert!(matches!(failures[0], AppError::Validation(_)));
    assert_eq!(Users::find().count(&state.orm).await?, users_before + 1);

    // Buyers cannot list products.
    let err = product_service::create_product(
        &state,
        &auth_buyer,
        create_request("Sneaky Saree", ProductKind::Saree, "1500.00"),
    )
    .await
    .unwrap_err();
    match err {
        AppError::Forbidden(msg) => assert_eq!(msg, "Only sellers can add products"),
        other => panic!("expected Forbidden, got {other:?}"),
    }

    // The seller lists a saree; defaults and ownership come out right.
    let saree = product_service::create_product(
        &state,
        &auth_seller,
        create_request("Silk Saree", ProductKind::Saree, "1500.00"),
    )
    .await?
    .data
    .unwrap();
    assert!(saree.availability);
    assert_eq!(saree.owner, seller.user.id);
    assert_eq!(saree.price, Decimal::new(150000, 2));

    // A non-owner update is denied with the explicit ownership message.
    let err = product_service::update_product(
        &state,
        &auth_buyer,
        saree.id,
        price_update("1800.00"),
    )
    .await
    .unwrap_err();
    match err {
        AppError::Forbidden(msg) => assert_eq!(msg, "You can only update your own products"),
        other => panic!("expected Forbidden, got {other:?}"),
    }

    // The owner's update goes through and refreshes updated_at.
    let updated = product_service::update_product(
        &state,
        &auth_seller,
        saree.id,
        price_update("1800.00"),
    )
    .await?
    .data
    .unwrap();
    assert_eq!(updated.price, Decimal::new(180000, 2));
    assert!(updated.updated_at > saree.updated_at);

    // Description: a string replaces it, an absent field leaves it alone, an
    // explicit null clears it.
    let described = product_service::update_product(
        &state,
        &auth_seller,
        saree.id,
        description_update(Some(Some("Handwoven kanjivaram".into()))),
    )
    .await?
    .data
    .unwrap();
    assert_eq!(described.description.as_deref(), Some("Handwoven kanjivaram"));

    let kept = product_service::update_product(
        &state,
        &auth_seller,
        saree.id,
        price_update("1800.00"),
    )
    .await?
    .data
    .unwrap();
    assert_eq!(kept.description.as_deref(), Some("Handwoven kanjivaram"));

    let cleared = product_service::update_product(
        &state,
        &auth_seller,
        saree.id,
        description_update(Some(None)),
    )
    .await?
    .data
    .unwrap();
    assert_eq!(cleared.description, None);

    // An unavailable shawl, then the availability filter.
    let mut shawl = create_request("Winter Shawl", ProductKind::Shawl, "900.00");
    shawl.availability = Some(false);
    product_service::create_product(&state, &auth_seller, shawl).await?;

    let listed = product_service::list_products(&state, catalog_query(None, None, Some("true")))
        .await?
        .data
        .unwrap();
    assert_eq!(listed.items.len(), 1);
    assert!(listed.items.iter().all(|p| p.availability));

    // Search and type filters narrow together.
    let listed = product_service::list_products(
        &state,
        catalog_query(Some("silk"), Some(ProductKind::Shawl), None),
    )
    .await?
    .data
    .unwrap();
    assert!(listed.items.is_empty());

    // The buyer contacts the seller: exactly one email, exact subject.
    contact_service::contact_seller(
        &state,
        &auth_buyer,
        updated.id,
        ContactSellerRequest {
            subject: "Still available?".into(),
            message: "Interested in this saree.".into(),
        },
    )
    .await?;
    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Interest in your product: Silk Saree");
    assert_eq!(sent[0].to, "weaver@example.com");

    // The seller never sees the contact path on their own listing.
    let err = contact_service::contact_seller(
        &state,
        &auth_seller,
        updated.id,
        ContactSellerRequest {
            subject: "Hello me".into(),
            message: "Talking to myself.".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    assert_eq!(mailer.sent().len(), 1);

    // Stats reflect the two listings.
    let stats = product_service::product_stats(&state).await?.data.unwrap();
    assert_eq!(stats.total_products, 2);
    assert_eq!(stats.available_products, 1);
    assert_eq!(stats.unavailable_products, 1);
    assert_eq!(stats.product_types, 2);

    // Logout revokes the refresh token; a second revoke is rejected.
    auth_service::logout(
        &state,
        LogoutRequest {
            refresh: Some(buyer.tokens.refresh.clone()),
        },
    )
    .await?;
    let err = auth_service::logout(
        &state,
        LogoutRequest {
            refresh: Some(buyer.tokens.refresh.clone()),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    // With concealment enabled, foreign mutations read as not-found.
    let concealed = AppState {
        config: Arc::new(AppConfig {
            conceal_foreign_products: true,
            ..(*state.config).clone()
        }),
        ..state.clone()
    };
    let err = product_service::delete_product(&concealed, &auth_buyer, updated.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    // The listing is still there for its owner.
    product_service::delete_product(&state, &auth_seller, updated.id).await?;
    let err = product_service::get_product(&state, updated.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    Ok(())
}

async fn setup_state(
    database_url: &str,
    mailer: Arc<RecordingMailer>,
    conceal: bool,
) -> anyhow::Result<AppState> {
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE audit_logs, revoked_tokens, products, profiles, users RESTART IDENTITY CASCADE",
    ))
    .await?;

    let config = AppConfig {
        database_url: database_url.to_string(),
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: "integration-test-secret".into(),
        conceal_foreign_products: conceal,
        smtp: SmtpConfig {
            host: "localhost".into(),
            port: 2525,
            username: String::new(),
            password: String::new(),
            from_address: "noreply@silkmarket.example".into(),
        },
    };

    Ok(AppState {
        orm,
        config: Arc::new(config),
        mailer,
    })
}

fn register_request(username: &str, role: Option<Role>) -> RegisterRequest {
    RegisterRequest {
        username: username.into(),
        email: format!("{username}@example.com"),
        password: "longenough".into(),
        password_confirm: "longenough".into(),
        first_name: String::new(),
        last_name: String::new(),
        role,
        phone: None,
    }
}

fn create_request(name: &str, kind: ProductKind, price: &str) -> CreateProductRequest {
    CreateProductRequest {
        name: name.into(),
        kind,
        price: price.parse().unwrap(),
        availability: None,
        description: None,
    }
}

fn price_update(price: &str) -> UpdateProductRequest {
    UpdateProductRequest {
        name: None,
        kind: None,
        price: Some(price.parse().unwrap()),
        availability: None,
        description: None,
    }
}

fn description_update(description: Option<Option<String>>) -> UpdateProductRequest {
    UpdateProductRequest {
        name: None,
        kind: None,
        price: None,
        availability: None,
        description,
    }
}

fn catalog_query(
    search: Option<&str>,
    kind: Option<ProductKind>,
    available: Option<&str>,
) -> ProductQuery {
    ProductQuery {
        pagination: Pagination {
            page: None,
            per_page: None,
        },
        search: search.map(str::to_string),
        kind,
        available: available.map(str::to_string),
    }
}
