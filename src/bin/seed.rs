use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

use silk_market_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    entity::{Products, Users, products, profiles, users},
    models::{ProductKind, Role},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;

    let seller_id = ensure_user(&orm, "weaver", "weaver@example.com", "seller123", Role::Seller).await?;
    let buyer_id = ensure_user(&orm, "shopper", "shopper@example.com", "buyer1234", Role::Buyer).await?;
    seed_products(&orm, seller_id).await?;

    println!("Seed completed. Seller ID: {seller_id}, Buyer ID: {buyer_id}");
    Ok(())
}

async fn ensure_user(
    orm: &DatabaseConnection,
    username: &str,
    email: &str,
    password: &str,
    role: Role,
) -> anyhow::Result<Uuid> {
    if let Some(existing) = Users::find()
        .filter(users::Column::Username.eq(username))
        .one(orm)
        .await?
    {
        println!("User {username} already present");
        return Ok(existing.id);
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let user = users::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(username.to_string()),
        email: Set(email.to_string()),
        password_hash: Set(password_hash),
        first_name: Set(String::new()),
        last_name: Set(String::new()),
        created_at: NotSet,
    }
    .insert(orm)
    .await?;

    profiles::ActiveModel {
        user_id: Set(user.id),
        role: Set(role),
        phone: Set(None),
    }
    .insert(orm)
    .await?;

    println!("Ensured user {username} (role={role:?})");
    Ok(user.id)
}

async fn seed_products(orm: &DatabaseConnection, owner_id: Uuid) -> anyhow::Result<()> {
    let listings = [
        ("Kanchipuram Silk Saree", ProductKind::Saree, "150000", true),
        ("Raw Mulberry Fabric", ProductKind::Fabric, "45000", true),
        ("Hand-dyed Scarf", ProductKind::Scarf, "12050", true),
        ("Pashmina Blend Shawl", ProductKind::Shawl, "89999", false),
    ];

    for (name, kind, price_cents, availability) in listings {
        let exists = Products::find()
            .filter(products::Column::Name.eq(name))
            .one(orm)
            .await?;
        if exists.is_some() {
            continue;
        }

        products::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            kind: Set(kind),
            price: Set(Decimal::new(price_cents.parse()?, 2)),
            availability: Set(availability),
            owner_id: Set(owner_id),
            description: Set(None),
            created_at: NotSet,
            updated_at: NotSet,
        }
        .insert(orm)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}
