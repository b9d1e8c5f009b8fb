//! Shared application state and route wiring

use std::sync::Arc;

use actix_web::web;

use ag_core::engine::AuthEngine;
use ag_core::sync::ClusterSync;

use crate::routes;

/// State shared by every handler
pub struct AppState {
    pub engine: Arc<AuthEngine>,
    /// Present when cluster synchronization is enabled
    pub sync: Option<Arc<ClusterSync>>,
}

impl AppState {
    pub fn new(engine: Arc<AuthEngine>, sync: Option<Arc<ClusterSync>>) -> Self {
        Self { engine, sync }
    }
}

/// Register the full route tree on an actix service config
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(routes::status::health))
        .service(
            web::scope("/v1")
                .route("/auth", web::post().to(routes::auth::authenticate))
                .route("/status", web::get().to(routes::status::status))
                .route("/lock", web::post().to(routes::cache::lock_account))
                .service(
                    web::scope("/cache")
                        .route("/flush", web::post().to(routes::cache::flush))
                        .route("/clear", web::post().to(routes::cache::clear)),
                ),
        );
}
