use storefront_api::{
    db::{DbPool, create_pool, run_migrations},
    domain::{category::Category, role::Role},
    services::auth_service::hash_password,
};
use uuid::Uuid;

struct SeedProduct {
    name: &'static str,
    description: &'static str,
    price: i64,
    original_price: Option<i64>,
    category: Category,
    brand: &'static str,
    sku: &'static str,
    stock: i32,
    featured: bool,
    rating: f64,
}

const PRODUCTS: &[SeedProduct] = &[
    SeedProduct {
        name: "Wireless Headphones",
        description: "Over-ear headphones with active noise cancelling",
        price: 7999,
        original_price: Some(9999),
        category: Category::Electronics,
        brand: "SoundWave",
        sku: "ELEC-0001",
        stock: 25,
        featured: true,
        rating: 4.6,
    },
    SeedProduct {
        name: "Smart Watch",
        description: "Fitness tracking, notifications and a week of battery",
        price: 19999,
        original_price: None,
        category: Category::Electronics,
        brand: "Pulse",
        sku: "ELEC-0002",
        stock: 15,
        featured: true,
        rating: 4.3,
    },
    SeedProduct {
        name: "Cotton T-Shirt",
        description: "Organic cotton crew neck tee",
        price: 1999,
        original_price: Some(2499),
        category: Category::Fashion,
        brand: "Basics",
        sku: "FASH-0001",
        stock: 100,
        featured: false,
        rating: 4.1,
    },
    SeedProduct {
        name: "The Rust Programming Language",
        description: "The official book on the Rust programming language",
        price: 3999,
        original_price: None,
        category: Category::Books,
        brand: "No Starch Press",
        sku: "BOOK-0001",
        stock: 40,
        featured: true,
        rating: 4.9,
    },
    SeedProduct {
        name: "Ceramic Mug",
        description: "Coffee tastes better with Ferris",
        price: 1200,
        original_price: Some(1500),
        category: Category::Home,
        brand: "Ferris & Co",
        sku: "HOME-0001",
        stock: 60,
        featured: false,
        rating: 4.7,
    },
    SeedProduct {
        name: "Yoga Mat",
        description: "Non-slip mat, 6mm thick",
        price: 2999,
        original_price: None,
        category: Category::Sports,
        brand: "Flow",
        sku: "SPRT-0001",
        stock: 30,
        featured: false,
        rating: 4.4,
    },
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")?;

    let pool = create_pool(&database_url).await?;
    run_migrations(&pool).await?;

    let admin_id = ensure_user(&pool, "Admin", "admin@example.com", "admin123", Role::Admin).await?;
    let user_id = ensure_user(&pool, "Test User", "user@example.com", "user123", Role::User).await?;
    seed_products(&pool, admin_id).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    pool: &DbPool,
    name: &str,
    email: &str,
    password: &str,
    role: Role,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, name, email, password_hash, role, is_email_verified)
        VALUES ($1, $2, $3, $4, $5, TRUE)
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

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn seed_products(pool: &DbPool, created_by: Uuid) -> anyhow::Result<()> {
    for product in PRODUCTS {
        sqlx::query(
            r#"
            INSERT INTO products
                (id, name, description, price, original_price, image, category, brand, sku,
                 stock, is_on_sale, is_featured, rating, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (sku) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(product.name)
        .bind(product.description)
        .bind(product.price)
        .bind(product.original_price)
        .bind(format!("/images/{}.jpg", product.sku.to_lowercase()))
        .bind(product.category.as_str())
        .bind(product.brand)
        .bind(product.sku)
        .bind(product.stock)
        .bind(product.original_price.is_some())
        .bind(product.featured)
        .bind(product.rating)
        .bind(created_by)
        .execute(pool)
        .await?;
    }

    println!("Seeded {} products", PRODUCTS.len());
    Ok(())
}
