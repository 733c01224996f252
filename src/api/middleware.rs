// Middleware for logging, compression, path normalization and CORS

use actix_cors::Cors;
use actix_web::http::header;
use actix_web::middleware::{Compress, Logger, NormalizePath};

pub fn setup_middleware() -> (Logger, Compress, NormalizePath) {
    let logger = Logger::default();
    let compress = Compress::default();
    // "/film/" and "/film" reach the same handler.
    let normalize = NormalizePath::trim();
    (logger, compress, normalize)
}

/// `*` (alone or among the entries) allows any origin.
pub fn setup_cors(allowed_origins: &str) -> Cors {
    let origins: Vec<&str> = allowed_origins
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .collect();

    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
        .allowed_headers(vec![
            header::AUTHORIZATION,
            header::ACCEPT,
            header::CONTENT_TYPE,
        ])
        .max_age(3600);

    if origins.contains(&"*") {
        return cors.allow_any_origin();
    }
    for origin in origins {
        cors = cors.allowed_origin(origin);
    }

    cors
}
