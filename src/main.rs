use actix_cors::Cors;
use actix_web::{error, middleware, web, App, HttpRequest, HttpResponse, HttpServer};
use nightrank::config::Settings;
use nightrank::core::{ScoreEngine, Selector};
use nightrank::models::ErrorResponse;
use nightrank::routes::{self, local_clock, AppState};
use nightrank::services::{CachedCatalog, InMemoryCatalog, VenueCatalog};
use std::io;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn bad_request(kind: &str, message: String) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: kind.to_string(),
        message,
        status_code: 400,
    })
}

/// Handle JSON payload errors
fn handle_json_payload_error(err: error::JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    let response = bad_request("invalid_json", format!("Invalid JSON: {}", err));
    error::InternalError::from_response(err, response).into()
}

/// Handle query payload errors
fn handle_query_payload_error(err: error::QueryPayloadError, req: &HttpRequest) -> actix_web::Error {
    tracing::info!("Query error on {}: {}", req.path(), err);
    let response = bad_request("invalid_query", format!("Invalid query: {}", err));
    error::InternalError::from_response(err, response).into()
}

fn init_logging(settings: Option<&Settings>) {
    let log_level = std::env::var("LOG_LEVEL")
        .ok()
        .or_else(|| settings.map(|s| s.logging.level.clone()))
        .unwrap_or_else(|| "info".to_string());
    let log_format = std::env::var("LOG_FORMAT")
        .ok()
        .or_else(|| settings.map(|s| s.logging.format.clone()))
        .unwrap_or_else(|| "compact".to_string());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.compact().init();
    }
}

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
    error!("{}: {}", context, err);
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load();
    init_logging(settings.as_ref().ok());

    info!("Starting nightrank venue service...");

    let settings = settings.map_err(|e| startup_error("Failed to load configuration", e))?;
    info!("Configuration loaded successfully");

    // Score engine with the audited weight table
    let weights = settings
        .scoring
        .weights
        .to_weights()
        .map_err(|e| startup_error("Invalid scoring weights", e))?;
    let selector = Selector::new(ScoreEngine::new(weights), settings.open_hours.build_policy());

    info!(
        "Selector initialized with weights: {:?}, open-hours policy: {:?}",
        weights, settings.open_hours.policy
    );

    // Venue catalog behind a read-through cache
    let catalog = InMemoryCatalog::load(&settings.catalog.path)
        .await
        .map_err(|e| startup_error("Failed to load venue catalog", e))?;
    info!("Loaded {} venues from {}", catalog.len(), settings.catalog.path);

    let cache_ttl = settings.catalog.cache_ttl_secs.unwrap_or(60);
    let cache_size = settings.catalog.cache_size.unwrap_or(1000);
    let catalog: Arc<dyn VenueCatalog> = Arc::new(CachedCatalog::new(catalog, cache_size, cache_ttl));
    info!("Catalog cache initialized ({} entries, TTL: {}s)", cache_size, cache_ttl);

    // Build application state
    let app_state = AppState {
        catalog,
        selector,
        selection: settings.selection.clone(),
        clock: local_clock(),
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
