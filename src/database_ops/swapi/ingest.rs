use super::client::{SwapiClient, SwapiFilm, SwapiPlanet};
use crate::config::{AppConfig, ImportConfig};
use crate::database_ops::associations;
use crate::database_ops::db::Db;
use crate::database_ops::models::{NewFilm, NewPlanet};
use crate::database_ops::{films, planets};
use crate::error::{AppError, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, error, info, instrument};

/// What one import run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub skipped: bool,
    pub films_created: u32,
    pub films_reused: u32,
    pub planets_created: u32,
    pub planets_skipped: u32,
    pub associations_created: u32,
}

/// Load the canonical films and planets, unless enough official rows already
/// exist. The whole run is bounded by `config.deadline`.
#[instrument(skip_all, fields(base_url = %config.base_url))]
pub async fn import_official_data(db: &Db, config: &ImportConfig) -> Result<ImportSummary> {
    match tokio::time::timeout(config.deadline, run(db, config)).await {
        Ok(result) => result,
        Err(_) => Err(AppError::Upstream(format!(
            "import did not finish within {:?}",
            config.deadline
        ))),
    }
}

/// Import gate run by the server entry points before they bind. A failed
/// import is logged and the caller keeps going.
pub async fn import_on_startup(db: &Db, config: &AppConfig) -> Option<ImportSummary> {
    if !config.import_on_startup {
        info!("IMPORT_ON_STARTUP disabled; skipping official data import");
        return None;
    }
    match import_official_data(db, &config.import).await {
        Ok(summary) => {
            info!(?summary, "official data import finished");
            Some(summary)
        }
        Err(e) => {
            error!(error = %e, "official data import failed");
            None
        }
    }
}

async fn run(db: &Db, config: &ImportConfig) -> Result<ImportSummary> {
    let (official_films, official_planets) = {
        let mut conn = db.pool.acquire().await?;
        (
            films::count_official(&mut conn).await?,
            planets::count_official(&mut conn).await?,
        )
    };

    if official_films >= config.expected_films && official_planets >= config.expected_planets {
        info!(official_films, official_planets, "all official data checked");
        return Ok(ImportSummary {
            skipped: true,
            ..Default::default()
        });
    }

    info!(official_films, official_planets, "downloading official data");
    let client = SwapiClient::new(config)?;
    let mut summary = ImportSummary::default();

    let film_ids = import_films(db, &client, &mut summary).await?;
    info!(
        created = summary.films_created,
        reused = summary.films_reused,
        "films done"
    );

    import_planets(db, &client, &film_ids, &mut summary).await?;
    info!(
        created = summary.planets_created,
        skipped = summary.planets_skipped,
        links = summary.associations_created,
        "planets done"
    );

    Ok(summary)
}

/// Upsert every film by title and map each upstream url to its local id.
async fn import_films(
    db: &Db,
    client: &SwapiClient,
    summary: &mut ImportSummary,
) -> Result<HashMap<String, i64>> {
    let mut by_url = HashMap::new();
    let mut next = Some(client.films_url()?);

    while let Some(url) = next {
        let page = client.fetch_page::<SwapiFilm>(&url).await?;
        let mut conn = db.pool.acquire().await?;
        for record in page.results {
            let id = match films::find_id_by_title(&mut conn, &record.title).await? {
                Some(id) => {
                    summary.films_reused += 1;
                    id
                }
                None => {
                    let film = NewFilm {
                        release_date: parse_release_date(&record)?,
                        title: record.title.clone(),
                        official: true,
                    };
                    let id = films::insert(&mut conn, &film).await?;
                    summary.films_created += 1;
                    debug!(id, title = %film.title, "official film stored");
                    id
                }
            };
            by_url.insert(record.url, id);
        }
        next = page.next;
    }

    Ok(by_url)
}

/// Insert unseen planets with their film links, one transaction per planet.
/// Planets already present by name are left exactly as they are.
async fn import_planets(
    db: &Db,
    client: &SwapiClient,
    film_ids: &HashMap<String, i64>,
    summary: &mut ImportSummary,
) -> Result<()> {
    let mut next = Some(client.planets_url()?);

    while let Some(url) = next {
        let page = client.fetch_page::<SwapiPlanet>(&url).await?;
        for record in page.results {
            let mut tx = db.pool.begin().await?;
            if planets::find_id_by_name(&mut tx, &record.name).await?.is_some() {
                summary.planets_skipped += 1;
                continue;
            }

            let planet = normalize_planet(&record)?;
            let linked = resolve_films(&record, film_ids)?;
            let planet_id = planets::insert(&mut tx, &planet).await?;
            for &film_id in &linked {
                associations::link(&mut tx, film_id, planet_id, true).await?;
            }
            tx.commit().await?;

            summary.planets_created += 1;
            summary.associations_created = summary
                .associations_created
                .saturating_add(u32::try_from(linked.len()).unwrap_or(u32::MAX));
            debug!(planet_id, name = %planet.name, films = linked.len(), "official planet stored");
        }
        next = page.next;
    }

    Ok(())
}

fn parse_release_date(record: &SwapiFilm) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(record.release_date.trim(), "%Y-%m-%d").map_err(|e| {
        AppError::Upstream(format!(
            "film {:?} has malformed release_date {:?}: {e}",
            record.title, record.release_date
        ))
    })
}

fn resolve_films(record: &SwapiPlanet, film_ids: &HashMap<String, i64>) -> Result<BTreeSet<i64>> {
    record
        .films
        .iter()
        .map(|url| {
            film_ids.get(url).copied().ok_or_else(|| {
                AppError::Upstream(format!(
                    "planet {:?} references unknown film {url}",
                    record.name
                ))
            })
        })
        .collect()
}

/// `None` for absent, blank or `"unknown"` values.
fn known(raw: Option<&str>) -> Option<&str> {
    let value = raw?.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("unknown") {
        None
    } else {
        Some(value)
    }
}

fn normalize_planet(record: &SwapiPlanet) -> Result<NewPlanet> {
    let malformed = |field: &str, raw: &str| {
        AppError::Upstream(format!(
            "planet {:?} has malformed {field} {raw:?}",
            record.name
        ))
    };

    let diameter = match known(record.diameter.as_deref()) {
        Some(raw) => {
            let value: f64 = raw
                .replace(',', "")
                .parse()
                .map_err(|_| malformed("diameter", raw))?;
            (value > 0.0).then_some(value)
        }
        None => None,
    };
    let population = match known(record.population.as_deref()) {
        Some(raw) => {
            let value: i64 = raw
                .replace(',', "")
                .parse()
                .map_err(|_| malformed("population", raw))?;
            (value >= 0).then_some(value)
        }
        None => None,
    };

    let planet = NewPlanet {
        name: record.name.clone(),
        climates: known(record.climate.as_deref()).map(str::to_string),
        diameter,
        population,
        official: true,
    };
    planet
        .validate()
        .map_err(|e| AppError::Upstream(format!("planet record rejected: {e}")))?;
    Ok(planet)
}
