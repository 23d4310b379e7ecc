//! SkillHub - A role-based learning management site

use anyhow::Result;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skillhub::{config::Config, db, web};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skillhub=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("SkillHub starting");

    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!(
        "Configuration loaded (media root {})",
        config.upload.path.display()
    );

    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Connected to {:?} database", config.database.driver);

    db::migrations::run_migrations(&pool).await?;

    let state = web::AppState::new(pool, config.clone())?;

    if config.accounts.seed_defaults {
        state.user_service.seed_default_accounts().await?;
    }
    if let Some(admin) = &config.accounts.admin {
        if state.user_service.bootstrap_admin(admin).await? {
            tracing::info!("Administrator {} created", admin.username);
        }
    }

    let purged = state.session_service.purge_expired().await?;
    if purged > 0 {
        tracing::info!("Removed {} expired sessions", purged);
    }

    let app = web::build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
