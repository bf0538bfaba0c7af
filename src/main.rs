use actix_cors::Cors;
use actix_web::http::header;
use actix_web::{App, HttpServer, web};
use anyhow::Context;
use biomarker_screen_api::application::auth_service::AuthService;
use biomarker_screen_api::application::prediction_service::PredictionService;
use biomarker_screen_api::application::upload_service::UploadService;
use biomarker_screen_api::data::sqlite::SqliteRepository;
use biomarker_screen_api::domain::repository::{PredictionRepository, UserRepository};
use biomarker_screen_api::infrastructure::config::Config;
use biomarker_screen_api::infrastructure::logging::init_logging;
use biomarker_screen_api::infrastructure::model_store::ModelStore;
use biomarker_screen_api::presentation::handlers::AppState;
use biomarker_screen_api::presentation::middleware::{
    JwtAuthMiddleware, RequestIdMiddleware, TimingMiddleware,
};
use biomarker_screen_api::presentation::routes::api_scope;
use std::sync::Arc;
use tracing::info;

const ROUTES: &[&str] = &[
    "GET /api/health",
    "POST /api/auth/login",
    "POST /api/auth/register",
    "GET|POST /api/biomarkers",
    "GET|POST /api/process_mri",
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_logging();

    let config = Config::from_env()?;
    info!(
        bind_addr = %config.bind_addr,
        model_dir = %config.model_dir.display(),
        upload_dir = %config.upload_dir.display(),
        "Configuration loaded"
    );

    let models = Arc::new(
        ModelStore::load(&config.model_dir)
            .with_context(|| format!("loading models from {}", config.model_dir.display()))?,
    );

    let repository = Arc::new(SqliteRepository::connect(&config.database_url).await?);
    let users: Arc<dyn UserRepository> = repository.clone();
    let predictions: Arc<dyn PredictionRepository> = repository;

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("creating upload directory {}", config.upload_dir.display()))?;

    let auth_service = Arc::new(AuthService::new(users, config.jwt_secret.clone()));
    let state = web::Data::new(AppState {
        auth_service: auth_service.clone(),
        prediction_service: PredictionService::new(models.clone(), predictions.clone()),
        upload_service: UploadService::new(config.upload_dir.clone(), models, predictions),
        max_upload_bytes: config.max_upload_bytes,
    });
    let auth = JwtAuthMiddleware::new(auth_service);
    let cors_origins = config.cors_origins.clone();

    let server = HttpServer::new(move || {
        let cors = cors_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![header::CONTENT_TYPE, header::AUTHORIZATION])
            .expose_headers(vec![header::CONTENT_TYPE, header::AUTHORIZATION])
            .supports_credentials();

        App::new()
            .app_data(state.clone())
            .wrap(cors)
            .wrap(TimingMiddleware)
            .wrap(RequestIdMiddleware)
            .service(api_scope(auth.clone()))
    })
    .bind(&config.bind_addr)
    .with_context(|| format!("binding {}", config.bind_addr))?;

    info!(
        address = %config.bind_addr,
        routes = %ROUTES.join(", "),
        "Starting HTTP server"
    );
    server.run().await?;
    Ok(())
}
