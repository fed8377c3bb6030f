use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use cifar_backend::config::ServerConfig;
use cifar_backend::handlers::{self, AppState};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ServerConfig::parse();

    if !config.model_path.exists() {
        warn!(
            "model file '{}' not found yet; it will be loaded on the first request",
            config.model_path.display()
        );
    }

    let state = web::Data::new(AppState::new(&config.model_path, config.max_upload_bytes));

    info!("Server running at http://{}:{}", config.host, config.port);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header();

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(handlers::configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
