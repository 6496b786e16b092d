use std::sync::Arc;

use migration::{Migrator, MigratorTrait};
use tokio::sync::RwLock;

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "cryptogate={level},server={level},engine={level},rates={level}",
            level = settings.app.level
        ))
        .init();

    let db = parse_database(&settings.server.database).await?;

    let mut engine = engine::Engine::builder().database(db.clone()).build().await?;
    seed_demo_users(&mut engine).await?;

    let rates = rates::RateSource::new(
        settings.rates.unwrap_or_default().to_config(),
    )?;

    let state = server::ServerState {
        engine: Arc::new(RwLock::new(engine)),
        rates: Arc::new(rates),
        db,
    };

    let bind = settings
        .server
        .bind
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let addr = format!("{}:{}", bind, settings.server.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    server::run_with_listener(state, listener).await?;

    Ok(())
}

async fn parse_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        settings::Database::Memory => String::from("sqlite::memory:"),
        settings::Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}

/// First-run convenience: create the demo accounts the UI documents.
async fn seed_demo_users(
    engine: &mut engine::Engine,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if engine.user_count() > 0 {
        return Ok(());
    }

    engine
        .register("admin@cryptogate.dev", "admin123", "Admin User", true)
        .await?;
    engine
        .register("user@example.com", "user123", "John Doe", false)
        .await?;
    tracing::info!("seeded demo accounts");
    Ok(())
}
