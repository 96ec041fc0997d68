#![forbid(unsafe_code)]

mod api;
mod auth;
mod clock;
mod config;
mod error;
mod models;
mod repository;
mod services;
mod write_guards;

use std::{future::IntoFuture, process::exit, sync::Arc};

use anyhow::Context;
use api::{cors_layer, create_router, AppState};
use auth::AuthGate;
use clock::{Clock, SystemClock};
use config::AppConfig;
use repository::{SeasonRepository, UserRepository};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tokio::{net::TcpListener, select, signal};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tracing::instrument]
#[tokio::main]
async fn main() {
    if let Err(err) = dotenvy::dotenv() {
        warn!("Could not load config from .env file: {err}");
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(
                    "bowl_picks=info"
                        .parse()
                        .expect("Hard-coded default directive should be correct"),
                )
                .from_env_lossy(),
        )
        .init();

    let app_config = match envy::from_env::<AppConfig>() {
        Ok(config) => config,
        Err(err) => {
            error!("Could not load app config: {err}");
            exit(255);
        }
    };

    let db_pool = match setup_database(&app_config).await {
        Ok(pool) => pool,
        Err(err) => {
            error!("Could not setup database: {err:#}");
            exit(255);
        }
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    if let Err(err) = bootstrap(&db_pool, &app_config, clock.as_ref()).await {
        error!("Could not prepare initial data: {err:#}");
        exit(255);
    }

    let app = match build_app(db_pool.clone(), clock, &app_config) {
        Ok(app) => app,
        Err(err) => {
            error!("Could not set up the API: {err:#}");
            exit(255);
        }
    };

    let listener = match TcpListener::bind(&app_config.bind_address).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("Could not listen on {}: {err}", app_config.bind_address);
            exit(255);
        }
    };

    info!("Listening on {}", app_config.bind_address);

    select! {
        _ = signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
            db_pool.close().await;
        },

        result = axum::serve(listener, app).into_future() => {
            if let Err(err) = result {
                error!("HTTP server failed: {err}");
            }
        },
    };
}

#[tracing::instrument(skip(config))]
async fn setup_database(config: &AppConfig) -> anyhow::Result<SqlitePool> {
    info!("Connecting to SQLite database at {}", config.database_url);
    let pool = SqlitePoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;
    info!("Running migrations");
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Done!");
    Ok(pool)
}

/// Seeds the participants and makes sure some season is active.
async fn bootstrap(pool: &SqlitePool, config: &AppConfig, clock: &dyn Clock) -> anyhow::Result<()> {
    let added = UserRepository::new(pool.clone())
        .seed_users(&config.seed_users, clock.now())
        .await
        .context("seeding users")?;
    if added > 0 {
        info!("Seeded {added} participants");
    }

    let season = SeasonRepository::new(pool.clone())
        .ensure_active_season(&config.initial_season, clock.now())
        .await
        .context("ensuring an active season")?;
    info!("Active season is {}", season.label);

    Ok(())
}

fn build_app(pool: SqlitePool, clock: Arc<dyn Clock>, config: &AppConfig) -> anyhow::Result<axum::Router> {
    let auth = AuthGate::new(
        config.family_password.clone(),
        &config.token_secret,
        config.token_ttl(),
        clock.clone(),
    )?;
    let cors = cors_layer(&config.cors_origins).context("parsing CORS origins")?;

    Ok(create_router(AppState::new(pool, clock, auth), cors))
}
