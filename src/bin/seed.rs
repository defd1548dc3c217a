use furnimart_api::{
    config::AppConfig,
    db::{DbPool, create_pool, orm_from_pool, run_migrations},
    models::Role,
    services::{auth_service::hash_password, settings_service::ensure_settings},
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;

    let accounts = [
        ("Store Admin", "admin@furnimart.vn", "admin123", Role::Admin),
        ("Minh Manager", "manager@furnimart.vn", "manager123", Role::Manager),
        ("Lan Employee", "employee@furnimart.vn", "employee123", Role::Employee),
        ("Tuan Shipper", "shipper@furnimart.vn", "shipper123", Role::Shipper),
        ("Hoa Customer", "customer@furnimart.vn", "customer123", Role::Customer),
    ];
    for (name, email, password, role) in accounts {
        let id = ensure_user(&pool, name, email, password, role).await?;
        println!("Ensured user {email} (role={role}, id={id})");
    }

    seed_products(&pool).await?;

    let orm = orm_from_pool(&pool);
    let settings = ensure_settings(&orm).await?;
    println!("Settings ready for {}", settings.store_name);

    println!("Seed completed");
    Ok(())
}

async fn ensure_user(
    pool: &DbPool,
    name: &str,
    email: &str,
    password: &str,
    role: Role,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password)?;

    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, name, email, password_hash, role)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(role.as_str())
    .fetch_one(pool)
    .await?;

    Ok(user_id)
}

async fn seed_products(pool: &DbPool) -> anyhow::Result<()> {
    let products = [
        ("Oslo Three-Seat Sofa", "Linen sofa with solid ash legs", 12_900_000_i64, Some(11_500_000_i64), "Living Room", "linen", 8),
        ("Walnut Dining Table", "Six-seat table in oiled walnut", 18_500_000, None, "Dining Room", "walnut", 4),
        ("Rattan Armchair", "Hand-woven rattan lounge chair", 3_200_000, None, "Living Room", "rattan", 15),
        ("Oak Bed Frame 1m6", "Queen bed frame with slatted base", 9_800_000, Some(8_900_000), "Bedroom", "oak", 6),
        ("Pine Bookshelf", "Five-tier open bookshelf", 2_450_000, None, "Office", "pine", 3),
        ("Ergo Desk Chair", "Mesh office chair with lumbar support", 4_100_000, None, "Office", "mesh", 20),
    ];

    for (name, description, price, discount_price, category, material, stock) in products {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price, discount_price, category, material, stock)
            SELECT $1, $2, $3, $4, $5, $6, $7, $8
            WHERE NOT EXISTS (SELECT 1 FROM products WHERE name = $2)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(description)
        .bind(price)
        .bind(discount_price)
        .bind(category)
        .bind(material)
        .bind(stock)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}
