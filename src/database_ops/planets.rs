use crate::database_ops::associations::{self, Side};
use crate::database_ops::db::Db;
use crate::database_ops::models::{NewPlanet, Planet, PlanetChanges, PlanetRow};
use crate::error::{AppError, EntityKind, Result};
use itertools::Itertools;
use sqlx::SqliteConnection;
use std::collections::BTreeSet;
use tracing::{info, instrument};

const SELECT_PLANET: &str =
    "SELECT id, name, climates, diameter, population, official FROM planet";

pub async fn list(db: &Db) -> Result<Vec<Planet>> {
    let mut conn = db.pool.acquire().await?;
    let rows: Vec<PlanetRow> = sqlx::query_as(&format!("{SELECT_PLANET} ORDER BY id"))
        .fetch_all(&mut *conn)
        .await?;
    let links: Vec<(i64, i64)> =
        sqlx::query_as("SELECT planet_id, film_id FROM association ORDER BY planet_id, film_id")
            .fetch_all(&mut *conn)
            .await?;
    let mut by_planet = links.into_iter().into_group_map();

    Ok(rows
        .into_iter()
        .map(|row| {
            let films = by_planet.remove(&row.id).unwrap_or_default();
            Planet::from_row(row, films)
        })
        .collect())
}

pub async fn get(db: &Db, id: i64) -> Result<Planet> {
    let mut conn = db.pool.acquire().await?;
    load(&mut conn, id).await
}

pub(crate) async fn fetch_row(conn: &mut SqliteConnection, id: i64) -> Result<PlanetRow> {
    sqlx::query_as(&format!("{SELECT_PLANET} WHERE id = ?"))
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::not_found(EntityKind::Planet, id))
}

pub(crate) async fn load(conn: &mut SqliteConnection, id: i64) -> Result<Planet> {
    let row = fetch_row(&mut *conn, id).await?;
    let films = associations::linked_ids(&mut *conn, Side::Planet, id).await?;
    Ok(Planet::from_row(row, films.into_iter().collect()))
}

pub async fn find_id_by_name(conn: &mut SqliteConnection, name: &str) -> Result<Option<i64>> {
    let id = sqlx::query_scalar("SELECT id FROM planet WHERE name = ?")
        .bind(name)
        .fetch_optional(conn)
        .await?;
    Ok(id)
}

pub async fn count_official(conn: &mut SqliteConnection) -> Result<i64> {
    let n = sqlx::query_scalar("SELECT COUNT(*) FROM planet WHERE official = 1")
        .fetch_one(conn)
        .await?;
    Ok(n)
}

/// Insert a row; a duplicate name surfaces as `Conflict`.
pub async fn insert(conn: &mut SqliteConnection, planet: &NewPlanet) -> Result<i64> {
    let done = sqlx::query(
        "INSERT INTO planet (name, climates, diameter, population, official) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&planet.name)
    .bind(&planet.climates)
    .bind(planet.diameter)
    .bind(planet.population)
    .bind(planet.official)
    .execute(conn)
    .await
    .map_err(|e| AppError::from_write(e, EntityKind::Planet, &planet.name))?;
    Ok(done.last_insert_rowid())
}

#[instrument(skip(db, planet), fields(name = %planet.name))]
pub async fn create(db: &Db, planet: NewPlanet, films: &BTreeSet<i64>) -> Result<Planet> {
    planet.validate()?;

    let mut tx = db.pool.begin().await?;
    associations::ensure_counterparts_exist(&mut tx, Side::Planet, films).await?;
    let id = insert(&mut tx, &planet).await?;
    let delta = associations::reconcile(&BTreeSet::new(), Some(films));
    associations::apply_delta(&mut tx, Side::Planet, id, &delta).await?;
    let created = load(&mut tx, id).await?;
    tx.commit().await?;

    info!(id, films = created.films.len(), "planet created");
    Ok(created)
}

/// Apply field changes and, when `films` is supplied, reconcile the planet's
/// film links, all in one transaction.
#[instrument(skip(db, changes, films))]
pub async fn update(
    db: &Db,
    id: i64,
    changes: PlanetChanges,
    films: Option<&BTreeSet<i64>>,
) -> Result<Planet> {
    changes.validate()?;

    let mut tx = db.pool.begin().await?;
    let current = fetch_row(&mut tx, id).await?;
    let delta = associations::sync_links(&mut tx, Side::Planet, id, films).await?;

    let name = changes.name.unwrap_or(current.name);
    let climates = changes.climates.unwrap_or(current.climates);
    let diameter = changes.diameter.unwrap_or(current.diameter);
    let population = changes.population.unwrap_or(current.population);
    sqlx::query(
        "UPDATE planet SET name = ?, climates = ?, diameter = ?, population = ? WHERE id = ?",
    )
    .bind(&name)
    .bind(&climates)
    .bind(diameter)
    .bind(population)
    .bind(id)
    .execute(&mut *tx)
    .await
    .map_err(|e| AppError::from_write(e, EntityKind::Planet, &name))?;

    let updated = load(&mut tx, id).await?;
    tx.commit().await?;

    info!(
        id,
        added = delta.to_add.len(),
        removed = delta.to_remove.len(),
        "planet updated"
    );
    Ok(updated)
}

/// Remove the planet's links, then the planet.
#[instrument(skip(db))]
pub async fn delete(db: &Db, id: i64) -> Result<()> {
    let mut tx = db.pool.begin().await?;
    fetch_row(&mut tx, id).await?;
    let unlinked = associations::unlink_all(&mut tx, Side::Planet, id).await?;
    sqlx::query("DELETE FROM planet WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!(id, unlinked, "planet deleted");
    Ok(())
}
