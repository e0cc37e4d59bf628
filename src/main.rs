use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use app::database::{self, run_migrations, seed_development_data, Memory, Repository};
use rocket::Rocket;
use serde::Deserialize;
use url::Url;

#[derive(Debug, Deserialize)]
struct Config {
    database_url: Option<Url>,
    rate_limit: RateLimitConfig,
    #[serde(default)]
    seed_development_data: bool,
}

#[derive(Debug, Deserialize)]
struct RateLimitConfig {
    limit: usize,
    span_secs: u64,
}

impl RateLimitConfig {
    fn into_rate_limit(self) -> api::RateLimit {
        api::RateLimit::new(self.limit, Duration::from_secs(self.span_secs))
    }
}

async fn open_repository(database_url: Option<&Url>) -> anyhow::Result<Arc<dyn Repository>> {
    match database_url {
        Some(url) => {
            let db = database::connect(url)
                .await
                .context("failed to connect to the database")?;
            run_migrations(&db)
                .await
                .context("failed to run migrations")?;
            Ok(Arc::new(db))
        }
        None => {
            log::warn!("no database_url configured, data is kept in memory and lost on exit");
            Ok(Arc::new(Memory::default()))
        }
    }
}

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let rocket = Rocket::build();
    let config: Config = rocket
        .figment()
        .extract()
        .context("invalid configuration")?;

    let repository = open_repository(config.database_url.as_ref()).await?;
    if config.seed_development_data {
        seed_development_data(&*repository)
            .await
            .context("failed to seed development data")?;
    }

    let _ = api::register(rocket, repository, config.rate_limit.into_rate_limit())
        .launch()
        .await
        .map_err(|e| anyhow::anyhow!("server failed: {}", e))?;
    Ok(())
}
