//! Catalogue entities as stored, plus the field-level rules they must satisfy.

use crate::error::{AppError, Result};
use chrono::NaiveDate;
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct FilmRow {
    pub id: i64,
    pub title: String,
    pub release_date: NaiveDate,
    pub official: bool,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct PlanetRow {
    pub id: i64,
    pub name: String,
    pub climates: Option<String>,
    pub diameter: Option<f64>,
    pub population: Option<i64>,
    pub official: bool,
}

/// A film together with the ids of the planets it links to, ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct Film {
    pub id: i64,
    pub title: String,
    pub release_date: NaiveDate,
    pub official: bool,
    pub planets: Vec<i64>,
}

impl Film {
    pub fn from_row(row: FilmRow, planets: Vec<i64>) -> Self {
        Self {
            id: row.id,
            title: row.title,
            release_date: row.release_date,
            official: row.official,
            planets,
        }
    }
}

/// A planet together with the ids of the films it appears in, ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct Planet {
    pub id: i64,
    pub name: String,
    pub climates: Option<String>,
    pub diameter: Option<f64>,
    pub population: Option<i64>,
    pub official: bool,
    pub films: Vec<i64>,
}

impl Planet {
    pub fn from_row(row: PlanetRow, films: Vec<i64>) -> Self {
        Self {
            id: row.id,
            name: row.name,
            climates: row.climates,
            diameter: row.diameter,
            population: row.population,
            official: row.official,
            films,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewFilm {
    pub title: String,
    pub release_date: NaiveDate,
    pub official: bool,
}

#[derive(Debug, Clone)]
pub struct NewPlanet {
    pub name: String,
    pub climates: Option<String>,
    pub diameter: Option<f64>,
    pub population: Option<i64>,
    pub official: bool,
}

/// Partial film update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct FilmChanges {
    pub title: Option<String>,
    pub release_date: Option<NaiveDate>,
}

/// Partial planet update. For the nullable columns the outer `Option` says
/// whether the field was supplied at all and the inner one carries the new
/// value, so `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct PlanetChanges {
    pub name: Option<String>,
    pub climates: Option<Option<String>>,
    pub diameter: Option<Option<f64>>,
    pub population: Option<Option<i64>>,
}

pub fn validate_natural_key(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::validation(field, "must not be blank"));
    }
    Ok(())
}

pub fn validate_diameter(diameter: Option<f64>) -> Result<()> {
    match diameter {
        Some(d) if !d.is_finite() || d <= 0.0 => {
            Err(AppError::validation("diameter", "must be positive"))
        }
        _ => Ok(()),
    }
}

pub fn validate_population(population: Option<i64>) -> Result<()> {
    match population {
        Some(p) if p < 0 => Err(AppError::validation("population", "must be positive or zero")),
        _ => Ok(()),
    }
}

impl NewFilm {
    pub fn validate(&self) -> Result<()> {
        validate_natural_key("title", &self.title)
    }
}

impl NewPlanet {
    pub fn validate(&self) -> Result<()> {
        validate_natural_key("name", &self.name)?;
        validate_diameter(self.diameter)?;
        validate_population(self.population)
    }
}

impl FilmChanges {
    pub fn validate(&self) -> Result<()> {
        match &self.title {
            Some(title) => validate_natural_key("title", title),
            None => Ok(()),
        }
    }
}

impl PlanetChanges {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            validate_natural_key("name", name)?;
        }
        validate_diameter(self.diameter.flatten())?;
        validate_population(self.population.flatten())
    }
}
