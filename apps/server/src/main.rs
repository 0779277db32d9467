#![warn(clippy::all, clippy::pedantic)]

use std::path::PathBuf;
use std::sync::Arc;

use actix_web::{App, HttpServer, middleware, web};
use clap::Parser;
use heartcheck::cache::spawn_keepalive;
use heartcheck::clock::{Clock, SystemClock};
use heartcheck::{FreshnessPolicy, HeartbleedProbe, LibsqlCache, Orchestrator};
use tracing::info;
use tracing::level_filters::LevelFilter;

mod config;
mod error;
mod routes;
mod state;

use config::{Config, Settings};
use error::AppError;
use state::AppState;

/// Serve cached-or-live TLS heartbeat verdicts over HTTP.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Config file (defaults to $XDG_CONFIG_HOME/heartcheck/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Default log level, `RUST_LOG` takes precedence
    #[arg(short, long, default_value = "info")]
    log_level: LevelFilter,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[actix_web::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    logger::init_with_level(args.log_level);

    let config = Config::from_config(args.config.as_deref())?;
    let settings = config.settings()?;

    if args.print_config {
        print!("{config}");
        return Ok(());
    }

    run_server(&config, settings).await
}

async fn run_server(config: &Config, settings: Settings) -> Result<(), AppError> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    info!("Opening verdict cache at {}", config.cache.database);
    let cache = LibsqlCache::connect(
        &config.cache.database,
        &config.cache.auth_token,
        config.cache.pool_size,
        clock.clone(),
    )
    .await?;

    let keepalive = settings.keepalive.map(|every| spawn_keepalive(cache.pool().clone(), every));

    let probe = HeartbleedProbe::new(config.probe.payload.clone().into_bytes(), settings.probe_timeout);
    let orchestrator = Orchestrator::new(
        Arc::new(cache),
        Arc::new(probe),
        FreshnessPolicy::new(settings.expiry),
        clock,
    )
    .with_service(config.probe.service.clone());

    let state = web::Data::new(AppState::new(
        orchestrator,
        settings.redirect_url.clone(),
        settings.request_timeout,
    ));

    info!("Starting server on {}", settings.listen);
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::Logger::default())
            .configure(routes::routes)
            .default_service(web::to(routes::index::redirect))
    })
    .bind(settings.listen)?
    .run()
    .await?;

    if let Some(handle) = keepalive {
        handle.abort();
    }

    Ok(())
}
