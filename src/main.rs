use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use holocron::api::ApiServer;
use holocron::database_ops::swapi::{import_official_data, import_on_startup};
use holocron::util::env as env_util;
use holocron::{logging, AppConfig, Db};

#[derive(Parser, Debug)]
#[command(name = "holocron", version, about = "Films/planets catalogue admin CLI")]
struct Cli {
    /// Overrides DATABASE_URL
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Run the startup import (unless IMPORT_ON_STARTUP is off), then serve the REST API
    Serve,
    /// Import the canonical films and planets from SWAPI
    Import {
        /// Base URL of the upstream API
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Print row counts per table, split by provenance
    Counts,
}

#[actix_web::main]
async fn main() -> Result<()> {
    logging::init_tracing(logging::DEFAULT_FILTER)?;
    let cli = Cli::parse();

    let mut config = AppConfig::from_env();
    if let Some(url) = cli.database_url {
        config.database_url = url;
    }
    let db = Db::connect(&config.database_url, config.max_connections)
        .await
        .context("failed to open database")?;

    match cli.command {
        Commands::Serve => {
            env_util::preflight_check("serve", &[], AppConfig::LOGGED_KEYS)?;
            import_on_startup(&db, &config).await;
            ApiServer::from_config(&config).run(db, config.import).await?;
        }
        Commands::Import { base_url } => {
            let mut import = config.import;
            if let Some(url) = base_url {
                import.base_url = url;
            }
            let summary = import_official_data(&db, &import)
                .await
                .context("official data import failed")?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Counts => {
            let counts = db.counts().await?;
            println!("{:<12} {:>8} {:>8}", "table", "total", "official");
            println!("{:<12} {:>8} {:>8}", "film", counts.films, counts.official_films);
            println!("{:<12} {:>8} {:>8}", "planet", counts.planets, counts.official_planets);
            println!(
                "{:<12} {:>8} {:>8}",
                "association", counts.associations, counts.official_associations
            );
        }
    }

    Ok(())
}
