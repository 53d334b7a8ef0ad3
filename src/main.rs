use actix_web::middleware::{Logger, NormalizePath};
use actix_web::web::{self, Data};
use actix_web::{App, HttpResponse, HttpServer, Responder, get};
use std::sync::Arc;

mod api;
mod attendance;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod models;
mod routes;
mod utils;

use crate::attendance::mysql_store::MySqlAttendanceStore;
use crate::attendance::store::AttendanceStore;
use crate::attendance::tracker::AttendanceTracker;
use crate::auth::handlers::ensure_bootstrap_admin;
use crate::docs::ApiDoc;
use crate::routes::Limiters;
use crate::utils::selfie_store::{LocalSelfieStore, SelfieStore};
use crate::utils::settings_cache::GeoFenceSettings;
use config::Config;
use db::init_db;
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

/// Selfies arrive as base64 data URLs inside the JSON body.
const JSON_LIMIT_BYTES: usize = 8 * 1024 * 1024;

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!(policy = ?config.session_policy, "Server starting...");

    let pool = init_db(&config.database_url).await?;
    ensure_bootstrap_admin(&pool, &config).await?;

    let settings = Arc::new(GeoFenceSettings::new(pool.clone(), config.geofence_cache_ttl));
    let store: Arc<dyn AttendanceStore> = Arc::new(MySqlAttendanceStore::new(pool.clone()));
    let local_selfies = LocalSelfieStore::new(config.upload_dir.clone());
    info!(dir = %local_selfies.dir().display(), "Selfie uploads directory");
    let selfies: Arc<dyn SelfieStore> = Arc::new(local_selfies);

    let tracker = Data::new(AttendanceTracker::new(
        store,
        settings.clone(),
        config.session_policy,
    ));
    let selfies = Data::from(selfies);
    let settings_data = Data::from(settings.clone());

    actix_web::rt::spawn(async move {
        if let Err(e) = settings.warmup().await {
            warn!(error = %e, "Failed to warm up geo-fence cache");
        }
    });

    let limiters = Limiters::from_config(&config)?;
    let server_addr = config.server_addr.clone();
    let pool = Data::new(pool);
    let config = Data::new(config);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(web::JsonConfig::default().limit(JSON_LIMIT_BYTES))
            .app_data(pool.clone())
            .app_data(config.clone())
            .app_data(tracker.clone())
            .app_data(selfies.clone())
            .app_data(settings_data.clone())
            .service(health)
            // Configure auth + protected routes with rate limiting
            .configure(|cfg| routes::configure(cfg, &config, &limiters))
    })
    .bind(&server_addr)?
    .run()
    .await?;

    Ok(())
}
