// HTTP API server binary for holocron.
// Imports the canonical dataset (if needed) before accepting requests.

use anyhow::Result;
use holocron::api::ApiServer;
use holocron::database_ops::swapi::import_on_startup;
use holocron::util::env as env_util;
use holocron::{logging, AppConfig, Db};

#[actix_web::main]
async fn main() -> Result<()> {
    logging::init_tracing(logging::DEFAULT_FILTER)?;

    tracing::info!("Initializing holocron API server");

    env_util::init_env();
    env_util::preflight_check("api_server", &[], AppConfig::LOGGED_KEYS)?;
    let config = AppConfig::from_env();

    let db = Db::connect(&config.database_url, config.max_connections).await?;
    tracing::info!("Database connected successfully");

    import_on_startup(&db, &config).await;

    let server = ApiServer::from_config(&config);
    server.run(db, config.import).await?;

    Ok(())
}
