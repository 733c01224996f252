// HTTP request handlers for API endpoints

use crate::api::models::*;
use crate::config::ImportConfig;
use crate::database_ops::db::Db;
use crate::database_ops::swapi::import_official_data;
use crate::database_ops::{films, planets};
use crate::error::AppError;
use actix_web::{web, HttpResponse};

type HandlerResult = Result<HttpResponse, AppError>;

/// Health check endpoint
pub async fn health_check(db: web::Data<Db>) -> HttpResponse {
    let database = if db.ping().await {
        "connected"
    } else {
        "disconnected"
    };

    HttpResponse::Ok().json(ApiResponse::success(HealthResponse {
        status: "healthy".to_string(),
        database: database.to_string(),
    }))
}

/// Run the canonical import on demand.
pub async fn trigger_import(db: web::Data<Db>, config: web::Data<ImportConfig>) -> HandlerResult {
    tracing::info!("official data import requested");
    let summary = import_official_data(db.get_ref(), config.get_ref()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(summary)))
}

// ---------- films ----------

pub async fn list_films(db: web::Data<Db>) -> HandlerResult {
    let body: Vec<FilmResponse> = films::list(db.get_ref())
        .await?
        .into_iter()
        .map(FilmResponse::from)
        .collect();
    Ok(HttpResponse::Ok().json(body))
}

pub async fn get_film(db: web::Data<Db>, path: web::Path<i64>) -> HandlerResult {
    let film = films::get(db.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(FilmResponse::from(film)))
}

pub async fn create_film(db: web::Data<Db>, payload: web::Json<FilmRequest>) -> HandlerResult {
    let (film, planets) = payload.into_inner().into_parts();
    let created = films::create(db.get_ref(), film, &planets).await?;
    Ok(HttpResponse::Created().json(FilmResponse::from(created)))
}

pub async fn update_film(
    db: web::Data<Db>,
    path: web::Path<i64>,
    payload: web::Json<FilmUpdateRequest>,
) -> HandlerResult {
    let (changes, planets) = payload.into_inner().into_parts();
    let updated = films::update(db.get_ref(), path.into_inner(), changes, planets.as_ref()).await?;
    Ok(HttpResponse::Ok().json(FilmResponse::from(updated)))
}

pub async fn delete_film(db: web::Data<Db>, path: web::Path<i64>) -> HandlerResult {
    films::delete(db.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

// ---------- planets ----------

pub async fn list_planets(db: web::Data<Db>) -> HandlerResult {
    let body: Vec<PlanetResponse> = planets::list(db.get_ref())
        .await?
        .into_iter()
        .map(PlanetResponse::from)
        .collect();
    Ok(HttpResponse::Ok().json(body))
}

pub async fn get_planet(db: web::Data<Db>, path: web::Path<i64>) -> HandlerResult {
    let planet = planets::get(db.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(PlanetResponse::from(planet)))
}

pub async fn create_planet(db: web::Data<Db>, payload: web::Json<PlanetRequest>) -> HandlerResult {
    let (planet, films) = payload.into_inner().into_parts();
    let created = planets::create(db.get_ref(), planet, &films).await?;
    Ok(HttpResponse::Created().json(PlanetResponse::from(created)))
}

pub async fn update_planet(
    db: web::Data<Db>,
    path: web::Path<i64>,
    payload: web::Json<PlanetUpdateRequest>,
) -> HandlerResult {
    let (changes, films) = payload.into_inner().into_parts();
    let updated = planets::update(db.get_ref(), path.into_inner(), changes, films.as_ref()).await?;
    Ok(HttpResponse::Ok().json(PlanetResponse::from(updated)))
}

pub async fn delete_planet(db: web::Data<Db>, path: web::Path<i64>) -> HandlerResult {
    planets::delete(db.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
