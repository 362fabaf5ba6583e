pub mod browse;
pub mod cli;
pub mod coalescer;
pub mod commands;
pub mod config;
pub mod error;
pub mod manager;
pub mod remote;
pub mod render;
pub mod stats;

use std::ffi::OsString;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info};

#[tracing::instrument(skip_all)]
pub fn run(raw_args: Vec<OsString>) -> anyhow::Result<()> {
    let cli = cli::GlobalCli::parse_from(raw_args);

    cli::init_tracing(cli.verbose, cli.quiet)?;

    info!(
        verbose = cli.verbose,
        quiet = cli.quiet,
        "starting taskdeck"
    );

    let mut cfg = config::Config::load(cli.rcfile.as_deref())?;
    cfg.apply_overrides(cli.rc_overrides.into_iter().map(|kv| (kv.key, kv.value)));
    if let Some(url) = cli.api_url.as_deref() {
        cfg.set("api.url", url);
    }
    debug!(api_url = %cfg.api_url(), files = ?cfg.loaded_files, "configuration resolved");

    let store = remote::HttpStore::from_config(&cfg)
        .with_context(|| format!("failed to configure task store at {}", cfg.api_url()))?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let command = cli
        .command
        .unwrap_or(cli::Command::List(cli::ListArgs::default()));

    runtime.block_on(async move {
        let mut session = commands::Session::new(cfg, Arc::new(store))?;
        commands::dispatch(&mut session, command).await
    })?;

    info!("done");
    Ok(())
}
