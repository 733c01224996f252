use crate::database_ops::associations::{self, Side};
use crate::database_ops::db::Db;
use crate::database_ops::models::{Film, FilmChanges, FilmRow, NewFilm};
use crate::error::{AppError, EntityKind, Result};
use itertools::Itertools;
use sqlx::SqliteConnection;
use std::collections::BTreeSet;
use tracing::{info, instrument};

const SELECT_FILM: &str = "SELECT id, title, release_date, official FROM film";

pub async fn list(db: &Db) -> Result<Vec<Film>> {
    let mut conn = db.pool.acquire().await?;
    let rows: Vec<FilmRow> = sqlx::query_as(&format!("{SELECT_FILM} ORDER BY id"))
        .fetch_all(&mut *conn)
        .await?;
    let links: Vec<(i64, i64)> =
        sqlx::query_as("SELECT film_id, planet_id FROM association ORDER BY film_id, planet_id")
            .fetch_all(&mut *conn)
            .await?;
    let mut by_film = links.into_iter().into_group_map();

    Ok(rows
        .into_iter()
        .map(|row| {
            let planets = by_film.remove(&row.id).unwrap_or_default();
            Film::from_row(row, planets)
        })
        .collect())
}

pub async fn get(db: &Db, id: i64) -> Result<Film> {
    let mut conn = db.pool.acquire().await?;
    load(&mut conn, id).await
}

pub(crate) async fn fetch_row(conn: &mut SqliteConnection, id: i64) -> Result<FilmRow> {
    sqlx::query_as(&format!("{SELECT_FILM} WHERE id = ?"))
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::not_found(EntityKind::Film, id))
}

pub(crate) async fn load(conn: &mut SqliteConnection, id: i64) -> Result<Film> {
    let row = fetch_row(&mut *conn, id).await?;
    let planets = associations::linked_ids(&mut *conn, Side::Film, id).await?;
    Ok(Film::from_row(row, planets.into_iter().collect()))
}

pub async fn find_id_by_title(conn: &mut SqliteConnection, title: &str) -> Result<Option<i64>> {
    let id = sqlx::query_scalar("SELECT id FROM film WHERE title = ?")
        .bind(title)
        .fetch_optional(conn)
        .await?;
    Ok(id)
}

pub async fn count_official(conn: &mut SqliteConnection) -> Result<i64> {
    let n = sqlx::query_scalar("SELECT COUNT(*) FROM film WHERE official = 1")
        .fetch_one(conn)
        .await?;
    Ok(n)
}

/// Insert a row; a duplicate title surfaces as `Conflict`.
pub async fn insert(conn: &mut SqliteConnection, film: &NewFilm) -> Result<i64> {
    let done = sqlx::query("INSERT INTO film (title, release_date, official) VALUES (?, ?, ?)")
        .bind(&film.title)
        .bind(film.release_date)
        .bind(film.official)
        .execute(conn)
        .await
        .map_err(|e| AppError::from_write(e, EntityKind::Film, &film.title))?;
    Ok(done.last_insert_rowid())
}

#[instrument(skip(db, film), fields(title = %film.title))]
pub async fn create(db: &Db, film: NewFilm, planets: &BTreeSet<i64>) -> Result<Film> {
    film.validate()?;

    let mut tx = db.pool.begin().await?;
    associations::ensure_counterparts_exist(&mut tx, Side::Film, planets).await?;
    let id = insert(&mut tx, &film).await?;
    let delta = associations::reconcile(&BTreeSet::new(), Some(planets));
    associations::apply_delta(&mut tx, Side::Film, id, &delta).await?;
    let created = load(&mut tx, id).await?;
    tx.commit().await?;

    info!(id, planets = created.planets.len(), "film created");
    Ok(created)
}

/// Apply field changes and, when `planets` is supplied, reconcile the film's
/// planet links, all in one transaction.
#[instrument(skip(db, changes, planets))]
pub async fn update(
    db: &Db,
    id: i64,
    changes: FilmChanges,
    planets: Option<&BTreeSet<i64>>,
) -> Result<Film> {
    changes.validate()?;

    let mut tx = db.pool.begin().await?;
    let current = fetch_row(&mut tx, id).await?;
    let delta = associations::sync_links(&mut tx, Side::Film, id, planets).await?;

    let title = changes.title.unwrap_or(current.title);
    let release_date = changes.release_date.unwrap_or(current.release_date);
    sqlx::query("UPDATE film SET title = ?, release_date = ? WHERE id = ?")
        .bind(&title)
        .bind(release_date)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::from_write(e, EntityKind::Film, &title))?;

    let updated = load(&mut tx, id).await?;
    tx.commit().await?;

    info!(
        id,
        added = delta.to_add.len(),
        removed = delta.to_remove.len(),
        "film updated"
    );
    Ok(updated)
}

/// Remove the film's links, then the film.
#[instrument(skip(db))]
pub async fn delete(db: &Db, id: i64) -> Result<()> {
    let mut tx = db.pool.begin().await?;
    fetch_row(&mut tx, id).await?;
    let unlinked = associations::unlink_all(&mut tx, Side::Film, id).await?;
    sqlx::query("DELETE FROM film WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!(id, unlinked, "film deleted");
    Ok(())
}
