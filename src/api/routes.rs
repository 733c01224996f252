// API route configuration

use crate::api::handlers;
use crate::error::AppError;
use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    // Malformed bodies and path ids are reported like any other validation failure.
    let json_config = web::JsonConfig::default()
        .error_handler(|err, _req| AppError::validation("body", err.to_string()).into());
    let path_config = web::PathConfig::default()
        .error_handler(|err, _req| AppError::validation("id", err.to_string()).into());

    cfg.app_data(json_config)
        .app_data(path_config)
        .route("/health", web::get().to(handlers::health_check))
        .route("/import/official", web::post().to(handlers::trigger_import))
        .service(
            web::scope("/film")
                .route("", web::get().to(handlers::list_films))
                .route("/create", web::post().to(handlers::create_film))
                .route("/{id}", web::get().to(handlers::get_film))
                .route("/{id}/update", web::put().to(handlers::update_film))
                .route("/{id}/delete", web::delete().to(handlers::delete_film)),
        )
        .service(
            web::scope("/planet")
                .route("", web::get().to(handlers::list_planets))
                .route("/create", web::post().to(handlers::create_planet))
                .route("/{id}", web::get().to(handlers::get_planet))
                .route("/{id}/update", web::put().to(handlers::update_planet))
                .route("/{id}/delete", web::delete().to(handlers::delete_planet)),
        );
}
