mod errors;
mod params;
mod services;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use clap::Parser;

use blob_store::LocalUploadStore;
use record_log::RecordLog;

use crate::params::Args;
use crate::services::intake_service::{self, AppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt::init();

    let upload_dir = args.upload_dir();
    std::fs::create_dir_all(&args.data_dir)?;
    std::fs::create_dir_all(&upload_dir)?;

    // Opening the log also repairs a damaged store file before the first
    // request can touch it.
    let records = RecordLog::open(&args.data_dir)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    let shared_state = web::Data::new(AppState {
        records,
        uploads: LocalUploadStore::new(upload_dir),
        auth_token: args.auth_token.clone(),
    });

    let allow_origins = args.allow_origins.clone();
    let max_bytes = args.max_content_length_bytes();

    tracing::info!(
        "intake server listening on 0.0.0.0:{}, data dir {}",
        args.port,
        args.data_dir,
    );

    HttpServer::new(move || {
        App::new()
            .wrap(build_cors(&allow_origins))
            .app_data(shared_state.clone())
            .app_data(web::PayloadConfig::new(max_bytes))
            .app_data(
                actix_multipart::form::MultipartFormConfig::default()
                    .total_limit(max_bytes)
                    .memory_limit(max_bytes),
            )
            .service(intake_service::receive)
            .service(intake_service::receive_multipart)
            .service(intake_service::root)
            .service(intake_service::healthz)
    })
    .bind(("0.0.0.0", args.port))?
    .run()
    .await
}

fn build_cors(allow_origins: &str) -> Cors {
    let trimmed = allow_origins.trim();
    if trimmed == "*" || trimmed.is_empty() {
        return Cors::permissive();
    }

    let mut cors = Cors::default().allow_any_method().allow_any_header();
    for origin in trimmed.split(',').map(str::trim).filter(|o| !o.is_empty()) {
        cors = cors.allowed_origin(origin);
    }
    cors
}
