use std::{env, fs};

use anyhow::Context;
use foodgram::{database, models::NewIngredient, repository::IngredientRepository};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let path = env::args()
        .nth(1)
        .context("usage: import-ingredients <ingredients.json>")?;

    let raw = fs::read_to_string(&path).with_context(|| format!("failed to read {path}"))?;
    let items: Vec<NewIngredient> =
        serde_json::from_str(&raw).with_context(|| format!("{path} is not a valid ingredient list"))?;

    tracing::info!(path = %path, count = items.len(), "Importing ingredients");

    let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = database::connect(&database_url, 1).await?;

    let inserted = IngredientRepository::new(pool).import(&items).await?;

    tracing::info!(
        inserted,
        skipped = items.len() as u64 - inserted,
        "Ingredient import finished"
    );

    Ok(())
}
