pub mod associations;
pub mod db;
pub mod films;
pub mod models;
pub mod planets;
pub mod swapi;
