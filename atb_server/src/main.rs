mod config;
mod error;
mod housekeeping;
mod render;
mod state;
mod web;

use anyhow::{Context, Result};
use atb_lib::atb_api::Client;
use atb_lib::{DiscountScraper, DiscountService};
use clap::Parser;
use tracing::info;

use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("atb_discounts=info".parse()?)
                .add_directive("atb_lib=info".parse()?),
        )
        .with_target(false)
        .init();

    let cfg = Config::parse();

    let client = Client::with_options(cfg.client_options())
        .context("invalid catalog client settings")?;
    let scraper = DiscountScraper::from_client(client)?;
    let service = DiscountService::new(scraper, cfg.fresh_for(), cfg.expire_after());

    housekeeping::start_cleanup(service.clone(), housekeeping::CLEANUP_EVERY);

    let app = web::router::build_router(AppState { service });
    let addr = cfg.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("could not listen on {}", addr))?;
    info!("listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
