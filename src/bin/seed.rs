use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use restaurant_ordering_api::{
    config::AppConfig,
    db::{create_pool, orm_from_pool, run_migrations},
    domain::Role,
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&orm_from_pool(&pool)).await?;

    let seller_id = ensure_user(&pool, "seller@example.com", "seller123", "Demo Seller", Role::Seller).await?;
    let customer_id =
        ensure_user(&pool, "customer@example.com", "customer123", "Demo Customer", Role::Customer).await?;
    let restaurant_id = ensure_restaurant(&pool, seller_id, "Ferris Noodle Bar").await?;
    seed_dishes(&pool, restaurant_id).await?;

    println!(
        "Seed completed. Seller ID: {seller_id}, Customer ID: {customer_id}, Restaurant ID: {restaurant_id}"
    );
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    full_name: &str,
    role: Role,
) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let mut tx = pool.begin().await?;
    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash)
        VALUES ($1, $2, $3)
        ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO profiles (id, email, full_name, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (id) DO UPDATE SET role = EXCLUDED.role, full_name = EXCLUDED.full_name
        "#,
    )
    .bind(user_id)
    .bind(email)
    .bind(full_name)
    .bind(role.as_str())
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn ensure_restaurant(pool: &sqlx::PgPool, seller_id: Uuid, name: &str) -> anyhow::Result<Uuid> {
    let existing: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM restaurants WHERE seller_id = $1 AND name = $2")
            .bind(seller_id)
            .bind(name)
            .fetch_optional(pool)
            .await?;
    if let Some((id,)) = existing {
        return Ok(id);
    }

    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO restaurants (id, seller_id, name, description, address, is_active)
        VALUES ($1, $2, $3, $4, $5, TRUE)
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(seller_id)
    .bind(name)
    .bind("Hand-pulled noodles and small plates")
    .bind("1 Crab Street")
    .fetch_one(pool)
    .await?;

    println!("Seeded restaurant {name}");
    Ok(id)
}

async fn seed_dishes(pool: &sqlx::PgPool, restaurant_id: Uuid) -> anyhow::Result<()> {
    let dishes = vec![
        ("Beef Noodle Soup", "Slow-braised beef in spiced broth", 1299_i64, "Noodles"),
        ("Dan Dan Noodles", "Sesame, chili oil and pork", 999, "Noodles"),
        ("Cucumber Salad", "Smashed cucumber with garlic", 500, "Sides"),
        ("Jasmine Tea", "Pot for one", 350, "Drinks"),
    ];

    for (name, desc, price, category) in dishes {
        sqlx::query(
            r#"
            INSERT INTO dishes (id, restaurant_id, name, description, price, category, is_available)
            SELECT $1, $2, $3, $4, $5, $6, TRUE
            WHERE NOT EXISTS (
                SELECT 1 FROM dishes WHERE restaurant_id = $2 AND name = $3
            )
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(restaurant_id)
        .bind(name)
        .bind(desc)
        .bind(price)
        .bind(category)
        .execute(pool)
        .await?;
    }

    println!("Seeded dishes");
    Ok(())
}
