// API request/response models (DTOs)

use crate::database_ops::models::{Film, FilmChanges, NewFilm, NewPlanet, Planet, PlanetChanges};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;

/// Envelope for the operational endpoints (health, import).
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            meta: Some(Meta::now()),
        }
    }
}

/// Metadata included in envelope responses
#[derive(Debug, Serialize, Deserialize)]
pub struct Meta {
    pub timestamp: DateTime<Utc>,
    pub request_id: String,
    pub version: String,
}

impl Meta {
    pub fn now() -> Self {
        Self {
            timestamp: Utc::now(),
            request_id: uuid::Uuid::new_v4().to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
}

/// Distinguishes an omitted field (`None`) from an explicit `null` (`Some(None)`).
/// Pair with `#[serde(default)]`.
fn explicit_null<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn id_set(ids: Vec<i64>) -> BTreeSet<i64> {
    ids.into_iter().collect()
}

// ---------- films ----------

#[derive(Debug, Deserialize)]
pub struct FilmRequest {
    pub title: String,
    pub release_date: NaiveDate,
    #[serde(default)]
    pub planets: Option<Vec<i64>>,
}

impl FilmRequest {
    /// Client-created films are never official; a missing planet list means none.
    pub fn into_parts(self) -> (NewFilm, BTreeSet<i64>) {
        let film = NewFilm {
            title: self.title,
            release_date: self.release_date,
            official: false,
        };
        (film, id_set(self.planets.unwrap_or_default()))
    }
}

/// Every field optional. `planets` absent or `null` keeps the current links,
/// `[]` clears them.
#[derive(Debug, Default, Deserialize)]
pub struct FilmUpdateRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub release_date: Option<NaiveDate>,
    #[serde(default)]
    pub planets: Option<Vec<i64>>,
}

impl FilmUpdateRequest {
    pub fn into_parts(self) -> (FilmChanges, Option<BTreeSet<i64>>) {
        let changes = FilmChanges {
            title: self.title,
            release_date: self.release_date,
        };
        (changes, self.planets.map(id_set))
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct FilmResponse {
    pub id: i64,
    pub title: String,
    pub release_date: NaiveDate,
    pub planets: Vec<i64>,
}

impl From<Film> for FilmResponse {
    fn from(film: Film) -> Self {
        Self {
            id: film.id,
            title: film.title,
            release_date: film.release_date,
            planets: film.planets,
        }
    }
}

// ---------- planets ----------

#[derive(Debug, Deserialize)]
pub struct PlanetRequest {
    pub name: String,
    #[serde(default, alias = "climate")]
    pub climates: Option<String>,
    #[serde(default)]
    pub diameter: Option<f64>,
    #[serde(default)]
    pub population: Option<i64>,
    #[serde(default)]
    pub films: Option<Vec<i64>>,
}

impl PlanetRequest {
    pub fn into_parts(self) -> (NewPlanet, BTreeSet<i64>) {
        let planet = NewPlanet {
            name: self.name,
            climates: self.climates,
            diameter: self.diameter,
            population: self.population,
            official: false,
        };
        (planet, id_set(self.films.unwrap_or_default()))
    }
}

/// Every field optional. For `climates`, `diameter` and `population` an
/// explicit `null` clears the stored value. `films` follows the same rule as
/// `FilmUpdateRequest::planets`.
#[derive(Debug, Default, Deserialize)]
pub struct PlanetUpdateRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "climate", deserialize_with = "explicit_null")]
    pub climates: Option<Option<String>>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub diameter: Option<Option<f64>>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub population: Option<Option<i64>>,
    #[serde(default)]
    pub films: Option<Vec<i64>>,
}

impl PlanetUpdateRequest {
    pub fn into_parts(self) -> (PlanetChanges, Option<BTreeSet<i64>>) {
        let changes = PlanetChanges {
            name: self.name,
            climates: self.climates,
            diameter: self.diameter,
            population: self.population,
        };
        (changes, self.films.map(id_set))
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct PlanetResponse {
    pub id: i64,
    pub name: String,
    pub climates: Option<String>,
    pub diameter: Option<f64>,
    pub population: Option<i64>,
    pub films: Vec<i64>,
}

impl From<Planet> for PlanetResponse {
    fn from(planet: Planet) -> Self {
        Self {
            id: planet.id,
            name: planet.name,
            climates: planet.climates,
            diameter: planet.diameter,
            population: planet.population,
            films: planet.films,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omitted_planet_list_differs_from_empty() {
        let omitted: FilmUpdateRequest = serde_json::from_str(r#"{"title": "x"}"#).unwrap();
        assert_eq!(omitted.into_parts().1, None);

        let nulled: FilmUpdateRequest = serde_json::from_str(r#"{"planets": null}"#).unwrap();
        assert_eq!(nulled.into_parts().1, None);

        let empty: FilmUpdateRequest = serde_json::from_str(r#"{"planets": []}"#).unwrap();
        assert_eq!(empty.into_parts().1, Some(BTreeSet::new()));
    }

    #[test]
    fn duplicate_ids_collapse() {
        let req: FilmRequest = serde_json::from_str(
            r#"{"title": "Teste", "release_date": "2022-02-09", "planets": [3, 1, 3]}"#,
        )
        .unwrap();
        let (_, planets) = req.into_parts();
        assert_eq!(planets, BTreeSet::from([1, 3]));
    }

    #[test]
    fn explicit_null_clears_but_omission_keeps() {
        let req: PlanetUpdateRequest =
            serde_json::from_str(r#"{"diameter": null, "climate": "arid"}"#).unwrap();
        let (changes, films) = req.into_parts();
        assert_eq!(changes.diameter, Some(None));
        assert_eq!(changes.population, None);
        assert_eq!(changes.climates, Some(Some("arid".to_string())));
        assert_eq!(films, None);
    }

    #[test]
    fn create_without_links_defaults_to_none() {
        let req: PlanetRequest = serde_json::from_str(r#"{"name": "Planeteste"}"#).unwrap();
        let (planet, films) = req.into_parts();
        assert!(!planet.official);
        assert!(films.is_empty());
    }
}
