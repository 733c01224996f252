//! Film ↔ planet links.
//!
//! A link set is always edited from one owning entity: a film's planets or a
//! planet's films. Callers hand over the desired counterpart ids as an
//! `Option`; `None` leaves the stored links alone while an empty set clears
//! them. Validation runs against the database before anything is written, and
//! every write happens on the caller's connection so it shares the owner's
//! transaction.

use crate::error::{AppError, EntityKind, Result};
use sqlx::SqliteConnection;
use std::collections::BTreeSet;
use tracing::debug;

/// Which end of the association owns the edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Film,
    Planet,
}

impl Side {
    pub fn owner_kind(self) -> EntityKind {
        match self {
            Side::Film => EntityKind::Film,
            Side::Planet => EntityKind::Planet,
        }
    }

    pub fn counterpart_kind(self) -> EntityKind {
        match self {
            Side::Film => EntityKind::Planet,
            Side::Planet => EntityKind::Film,
        }
    }

    fn owner_column(self) -> &'static str {
        match self {
            Side::Film => "film_id",
            Side::Planet => "planet_id",
        }
    }

    fn counterpart_column(self) -> &'static str {
        match self {
            Side::Film => "planet_id",
            Side::Planet => "film_id",
        }
    }

    fn counterpart_table(self) -> &'static str {
        match self {
            Side::Film => "planet",
            Side::Planet => "film",
        }
    }

    /// Orders `(owner, counterpart)` as `(film_id, planet_id)`.
    fn pair(self, owner: i64, counterpart: i64) -> (i64, i64) {
        match self {
            Side::Film => (owner, counterpart),
            Side::Planet => (counterpart, owner),
        }
    }
}

/// Links to create and links to drop for one owner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkDelta {
    pub to_add: BTreeSet<i64>,
    pub to_remove: BTreeSet<i64>,
}

impl LinkDelta {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Minimal delta turning `current` into `desired`. An absent target yields an
/// empty delta.
pub fn reconcile(current: &BTreeSet<i64>, desired: Option<&BTreeSet<i64>>) -> LinkDelta {
    let Some(desired) = desired else {
        return LinkDelta::default();
    };
    LinkDelta {
        to_add: desired.difference(current).copied().collect(),
        to_remove: current.difference(desired).copied().collect(),
    }
}

/// Counterpart ids currently linked to `owner`.
pub async fn linked_ids(conn: &mut SqliteConnection, side: Side, owner: i64) -> Result<BTreeSet<i64>> {
    let sql = format!(
        "SELECT {} FROM association WHERE {} = ?",
        side.counterpart_column(),
        side.owner_column()
    );
    let ids: Vec<i64> = sqlx::query_scalar(&sql).bind(owner).fetch_all(conn).await?;
    Ok(ids.into_iter().collect())
}

/// Fails with `NotFound` on the first (lowest) id that has no counterpart row.
pub async fn ensure_counterparts_exist(
    conn: &mut SqliteConnection,
    side: Side,
    ids: &BTreeSet<i64>,
) -> Result<()> {
    let sql = format!(
        "SELECT EXISTS (SELECT 1 FROM {} WHERE id = ?)",
        side.counterpart_table()
    );
    for &id in ids {
        let exists: i64 = sqlx::query_scalar(&sql).bind(id).fetch_one(&mut *conn).await?;
        if exists == 0 {
            return Err(AppError::not_found(side.counterpart_kind(), id));
        }
    }
    Ok(())
}

/// Insert one association row.
pub async fn link(
    conn: &mut SqliteConnection,
    film_id: i64,
    planet_id: i64,
    official: bool,
) -> Result<()> {
    sqlx::query("INSERT INTO association (film_id, planet_id, official) VALUES (?, ?, ?)")
        .bind(film_id)
        .bind(planet_id)
        .bind(official)
        .execute(conn)
        .await?;
    Ok(())
}

/// Delete the association row for exactly this pair.
pub async fn unlink(conn: &mut SqliteConnection, film_id: i64, planet_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM association WHERE film_id = ? AND planet_id = ?")
        .bind(film_id)
        .bind(planet_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Drop every link held by `owner`; returns how many rows went away.
pub async fn unlink_all(conn: &mut SqliteConnection, side: Side, owner: i64) -> Result<u64> {
    let sql = format!("DELETE FROM association WHERE {} = ?", side.owner_column());
    let done = sqlx::query(&sql).bind(owner).execute(conn).await?;
    Ok(done.rows_affected())
}

/// Write a computed delta. Links created here are never marked official.
pub async fn apply_delta(
    conn: &mut SqliteConnection,
    side: Side,
    owner: i64,
    delta: &LinkDelta,
) -> Result<()> {
    for &counterpart in &delta.to_remove {
        let (film_id, planet_id) = side.pair(owner, counterpart);
        unlink(&mut *conn, film_id, planet_id).await?;
    }
    for &counterpart in &delta.to_add {
        let (film_id, planet_id) = side.pair(owner, counterpart);
        link(&mut *conn, film_id, planet_id, false).await?;
    }
    Ok(())
}

/// Validate, diff and apply in one go. Nothing is written when `desired` is
/// absent or when any desired counterpart is missing.
pub async fn sync_links(
    conn: &mut SqliteConnection,
    side: Side,
    owner: i64,
    desired: Option<&BTreeSet<i64>>,
) -> Result<LinkDelta> {
    let Some(target) = desired else {
        return Ok(LinkDelta::default());
    };
    ensure_counterparts_exist(&mut *conn, side, target).await?;
    let current = linked_ids(&mut *conn, side, owner).await?;
    let delta = reconcile(&current, Some(target));
    apply_delta(&mut *conn, side, owner, &delta).await?;
    debug!(
        owner_kind = %side.owner_kind(),
        owner,
        added = delta.to_add.len(),
        removed = delta.to_remove.len(),
        "links reconciled"
    );
    Ok(delta)
}
