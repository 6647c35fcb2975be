//! Fitness-habit gamification backend.
//!
//! Users log up to three routines a day, each paying a fixed amount of
//! currency ("exp", later "protein"). The currency levels up collectible
//! characters, and a global board ranks users by the sum of their
//! character levels.
//!
//! Local SQLite state is authoritative. A remote record store, when
//! configured, receives a best-effort copy of registrations, routines,
//! level changes and visits.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod remote;
pub mod services;
pub mod state;
pub mod store;
pub mod validation;

use ntex::web;

/// Registers every API route on `cfg`.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/health", web::get().to(health))
        // Identity
        .route("/api/login", web::post().to(handlers::users::login))
        .route("/api/users/{id}/balance", web::get().to(handlers::users::get_balance))
        .route(
            "/api/users/{id}/balance/wait",
            web::get().to(handlers::users::wait_balance),
        )
        // Characters
        .route("/api/characters", web::get().to(handlers::characters::get_catalog))
        .route("/api/users/{id}/characters", web::get().to(handlers::characters::get_sheet))
        .route(
            "/api/users/{id}/characters/{character_id}/level-up",
            web::post().to(handlers::characters::level_up),
        )
        .route(
            "/api/users/{id}/characters/{character_id}/exp",
            web::post().to(handlers::characters::add_exp),
        )
        // Routines
        .route("/api/users/{id}/routines", web::post().to(handlers::routines::submit))
        .route("/api/users/{id}/routines/{date}", web::get().to(handlers::routines::get_day))
        // Ranking
        .route("/api/ranking", web::get().to(handlers::ranking::get_ranking));
}

async fn health() -> web::HttpResponse {
    web::HttpResponse::Ok().json(&serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
