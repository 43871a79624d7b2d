pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod persist;
pub mod render;
pub mod seed;
pub mod store;
pub mod task;
pub mod view;

use std::ffi::OsString;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{debug, info};

#[tracing::instrument(skip_all)]
pub fn run(raw_args: Vec<OsString>) -> anyhow::Result<()> {
    let pre = cli::preprocess_args(&raw_args)?;
    let cli = cli::GlobalCli::parse_from(pre.cleaned_args);

    cli::init_tracing(cli.verbose, cli.quiet)?;

    info!(
        verbose = cli.verbose,
        quiet = cli.quiet,
        "starting fancy-todo CLI"
    );
    debug!(?pre.rc_overrides, "preprocessed rc overrides");

    let mut cfg = config::Config::load(cli.rc_file.as_deref())?;
    cfg.apply_overrides(
        pre.rc_overrides
            .into_iter()
            .chain(cli.rc_overrides.into_iter().map(|kv| (kv.key, kv.value))),
    );

    let data_dir = config::resolve_data_dir(&cfg, cli.data.as_deref())
        .context("failed to resolve data directory")?;

    let mut kv = persist::FileKv::open(&data_dir)
        .with_context(|| format!("failed to open data directory {}", data_dir.display()))?;

    let mut store = persist::load_state(&kv, Utc::now());

    let mut renderer = render::Renderer::new(&cfg)?;
    let inv = cli::Invocation::parse(&cfg, cli.rest)?;

    commands::dispatch(&mut store, &cfg, &mut renderer, inv)?;

    // The one commit point: mutations only mark the store dirty, and
    // the whole batch lands here after the command finishes.
    if store.take_dirty() {
        persist::save_state(&mut kv, &store);
        debug!("committed state");
    }

    info!("done");
    Ok(())
}
