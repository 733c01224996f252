// HTTP surface: films and planets CRUD plus operational endpoints

pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;

pub use server::ApiServer;
