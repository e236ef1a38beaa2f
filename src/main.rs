/// Mahakim proxy
///
/// HTTP front for the Mahakim court-records middleware: encrypts lookup
/// parameters, opens encrypted response envelopes, aggregates a dossier
/// from four dependent calls and caches the result for 24 hours.

mod api;
mod cache;
mod config;
mod context;
mod crypto;
mod dossier;
mod error;
mod jobs;
mod metrics;
mod server;
mod upstream;

use config::ServerConfig;
use context::AppContext;
use error::ProxyResult;
use std::{sync::Arc, time::Duration};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ProxyResult<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mahakim_proxy=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    print_banner();

    let config = ServerConfig::from_env()?;
    tracing::info!(level = %config.logging.level, "Configuration loaded");
    let cleanup_interval = Duration::from_secs(config.cache.cleanup_interval_secs);

    let ctx = AppContext::new(config)?;

    // Start background jobs
    let scheduler = Arc::new(jobs::JobScheduler::new(Arc::clone(&ctx.cache), cleanup_interval));
    scheduler.start();

    server::serve(ctx).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
    __  ___      __          __   _
   /  |/  /___ _/ /_  ____ _/ /__(_)___ ___
  / /|_/ / __ `/ __ \/ __ `/ //_/ / __ `__ \
 / /  / / /_/ / / / / /_/ / ,< / / / / / / /
/_/  /_/\__,_/_/ /_/\__,_/_/|_/_/_/ /_/ /_/

        Court records proxy v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
