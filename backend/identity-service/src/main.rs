/// Rental Identity Service Main Entry Point
///
/// Starts with:
/// - PostgreSQL connection pool and migrations
/// - Argon2id hasher and session token issuer
/// - Optional admin bootstrap
use anyhow::{Context, Result};
use rental_identity_service::{
    config::{BootstrapSettings, Settings},
    db::PgIdentityStore,
    models::{NewAccount, Role},
    security::{PasswordHasher, SessionTokenIssuer},
    IdentityError, IdentityServices,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "rental_identity_service=info,info".into()),
        )
        .with_target(false)
        .json()
        .init();

    info!("Starting Rental Identity Service");

    // Load configuration
    let settings = Settings::load().context("Failed to load configuration")?;
    info!("Configuration loaded successfully");

    // Initialize database connection pool
    let db_pool = PgPoolOptions::new()
        .max_connections(settings.database.max_connections)
        .min_connections(settings.database.min_connections)
        .acquire_timeout(Duration::from_secs(settings.database.acquire_timeout))
        .connect(&settings.database.url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    info!(
        "Database pool initialized with {} max connections",
        settings.database.max_connections
    );

    // Run database migrations
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .context("Failed to run database migrations")?;
    info!("Database migrations completed");

    let hasher = PasswordHasher::with_params(
        settings.password.memory_kib,
        settings.password.iterations,
        settings.password.parallelism,
    )
    .context("Failed to configure password hasher")?;

    let tokens = SessionTokenIssuer::new(
        &settings.jwt.secret,
        settings.jwt.issuer.clone(),
        settings.jwt.expiry_seconds,
    )
    .context("Failed to configure session tokens")?;
    info!(issuer = %settings.jwt.issuer, "Session token issuer initialized");

    let store = Arc::new(PgIdentityStore::new(db_pool));
    let services = IdentityServices::new(store, hasher, tokens);

    if let Some(bootstrap) = &settings.bootstrap {
        bootstrap_admin(&services, bootstrap).await?;
    }

    info!("Rental Identity Service ready");
    Ok(())
}

/// Create the configured admin account unless its email is already taken
async fn bootstrap_admin(
    services: &IdentityServices<PgIdentityStore>,
    bootstrap: &BootstrapSettings,
) -> Result<()> {
    let admin = NewAccount {
        name: "Administrateur".to_string(),
        surname: "Agence".to_string(),
        email: bootstrap.admin_email.clone(),
        phone: String::new(),
        password: Some(bootstrap.admin_password.clone()),
        role: Some(Role::Admin),
    };

    match services.provisioning.create_account(admin).await {
        Ok(account) => {
            info!(account_id = %account.id, "Bootstrap admin account created");
            Ok(())
        }
        Err(IdentityError::EmailAlreadyExists) => {
            info!("Bootstrap admin account already exists, skipping");
            Ok(())
        }
        Err(e) => Err(e).context("Failed to bootstrap admin account"),
    }
}
