use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::task::JoinSet;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod accounts;
mod catalog;
mod client;
mod config;
mod error;
mod metrics;
mod scanner;
mod state;
mod web;


use crate::config::Configuration;
use crate::state::UiState;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Opt {
    /// Extra configuration files, merged in order over the defaults.
    #[clap(short, long, value_parser)]
    config: Vec<PathBuf>,

    /// Print the catalog to stdout and exit instead of serving.
    #[clap(long)]
    sout: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let options = Opt::parse();

    let config = Configuration::config(Configuration::figment(options.config))?;
    let state = Arc::new(UiState::new(config).await?);

    if options.sout {
        let catalog = catalog::build_catalog(&state.client, &state.config.registry).await?;
        let rendered =
            serde_json::to_string_pretty(&catalog).context("Failed to render catalog")?;
        println!("{rendered}");
        return Ok(());
    }

    let mut tasks = JoinSet::new();

    metrics::start_metrics(&mut tasks, state.clone())?;

    let app = web::router(state.clone()).layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id()),
    );

    let listen_addr = format!("{}:{}", state.config.web.address, state.config.web.port);
    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("Failed to bind {listen_addr}"))?;

    info!("Listening on {listen_addr}");

    tasks.spawn(async move {
        axum::serve(listener, app).await?;
        Ok(())
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        Some(result) = tasks.join_next() => {
            result.context("Background task panicked")??;
        }
    }

    tasks.shutdown().await;

    Ok(())
}
