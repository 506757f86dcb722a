use argon2::{
    Argon2, PasswordHasher,
    password_hash::{rand_core::OsRng, SaltString},
};
use salon_booking_api::config::AppConfig;
use salon_booking_api::db::create_pool;
use salon_booking_api::models::{ROLE_ADMIN, ROLE_CUSTOMER, ROLE_MANAGER, ROLE_PROVIDER};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    ensure_profile(&pool, "admin@example.com", "admin123", ROLE_ADMIN, "administrators", None)
        .await?;
    ensure_profile(&pool, "manager@example.com", "manager123", ROLE_MANAGER, "managers", None)
        .await?;

    let anna = ensure_profile(
        &pool,
        "anna@example.com",
        "provider123",
        ROLE_PROVIDER,
        "service_providers",
        Some("Hairdresser"),
    )
    .await?;
    let boris = ensure_profile(
        &pool,
        "boris@example.com",
        "provider123",
        ROLE_PROVIDER,
        "service_providers",
        Some("Nail technician"),
    )
    .await?;

    ensure_profile(&pool, "customer@example.com", "customer123", ROLE_CUSTOMER, "customers", None)
        .await?;

    let services = seed_services(&pool).await?;
    link_provider_services(&pool, anna, &services[..2]).await?;
    link_provider_services(&pool, boris, &services[2..]).await?;

    println!("Seed completed");
    Ok(())
}

/// Insert a user plus its role profile row; both are idempotent on re-run.
/// Returns the profile id.
async fn ensure_profile(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    role: &str,
    profile_table: &str,
    specialization: Option<&str>,
) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    sqlx::query(
        r#"
        INSERT INTO users (id, email, password_hash, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .execute(pool)
    .await?;

    let (user_id,): (Uuid,) = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(email)
        .fetch_one(pool)
        .await?;

    let sql = match specialization {
        Some(_) => format!(
            "INSERT INTO {profile_table} (id, user_id, phone, specialization) \
             VALUES ($1, $2, $3, $4) ON CONFLICT (user_id) DO NOTHING"
        ),
        None => format!(
            "INSERT INTO {profile_table} (id, user_id, phone) \
             VALUES ($1, $2, $3) ON CONFLICT (user_id) DO NOTHING"
        ),
    };
    let mut query = sqlx::query(&sql)
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind("+7-900-000-00-00");
    if let Some(value) = specialization {
        query = query.bind(value);
    }
    query.execute(pool).await?;

    let (profile_id,): (Uuid,) =
        sqlx::query_as(&format!("SELECT id FROM {profile_table} WHERE user_id = $1"))
            .bind(user_id)
            .fetch_one(pool)
            .await?;

    println!("Ensured user {email} (role={role})");
    Ok(profile_id)
}

async fn seed_services(pool: &sqlx::PgPool) -> anyhow::Result<Vec<Uuid>> {
    let services = vec![
        ("Haircut", "Cut and styling", 60, 150000_i64),
        ("Coloring", "Full hair coloring", 120, 350000_i64),
        ("Manicure", "Classic manicure", 45, 120000_i64),
        ("Pedicure", "Classic pedicure", 60, 140000_i64),
    ];

    let mut ids = Vec::new();
    for (name, desc, duration, price) in services {
        sqlx::query(
            r#"
            INSERT INTO services (id, name, description, duration_minutes, price)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(desc)
        .bind(duration)
        .bind(price)
        .execute(pool)
        .await?;

        let (id,): (Uuid,) = sqlx::query_as("SELECT id FROM services WHERE name = $1")
            .bind(name)
            .fetch_one(pool)
            .await?;
        ids.push(id);
    }

    println!("Seeded services");
    Ok(ids)
}

async fn link_provider_services(
    pool: &sqlx::PgPool,
    provider_id: Uuid,
    service_ids: &[Uuid],
) -> anyhow::Result<()> {
    for service_id in service_ids {
        sqlx::query(
            r#"
            INSERT INTO provider_services (service_provider_id, service_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(provider_id)
        .bind(service_id)
        .execute(pool)
        .await?;
    }
    Ok(())
}
