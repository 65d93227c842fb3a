#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the Polaris early-warning dashboard.
//!
//! Hosts one [`Engine`] for the lifetime of the process and exposes its
//! view and override commands as a small JSON API under `/api`. The
//! browser dashboard polls `GET /api/dashboard`; the engine keeps
//! refreshing from the upstream feeds in the background.

mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use polaris_engine::{Engine, EngineConfig};

/// Shared application state.
pub struct AppState {
    /// The dashboard engine.
    pub engine: Arc<Engine>,
}

/// Registers the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/dashboard", web::get().to(handlers::dashboard))
            .route("/priority", web::get().to(handlers::priority))
            .route("/refresh", web::post().to(handlers::refresh))
            .route("/override", web::post().to(handlers::set_override))
            .route("/override", web::delete().to(handlers::clear_override)),
    );
}

/// Starts the engine and serves the dashboard API until the server stops.
///
/// This is a regular async function; the caller provides the runtime
/// (e.g. via `#[actix_web::main]`). The engine's refresh loop is stopped
/// before returning.
///
/// # Errors
///
/// Returns an `std::io::Result` error if the engine cannot be built from
/// `config`, or if the HTTP server fails to bind or encounters a runtime
/// error.
#[allow(clippy::future_not_send)]
pub async fn run_server(config: EngineConfig, bind_addr: &str, port: u16) -> std::io::Result<()> {
    let engine = Arc::new(Engine::from_config(config).map_err(std::io::Error::other)?);
    engine.start();

    let state = web::Data::new(AppState {
        engine: engine.clone(),
    });

    log::info!("Starting server on {bind_addr}:{port}");

    let result = HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await;

    log::info!("Server stopped, shutting down engine");
    engine.shutdown().await;

    result
}
