// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! mhd: module host daemon
//!
//! Hosts units from the repository directory with only the host code base
//! linked. Embedders that link unit code build their own `CodeCatalog` and
//! call `mh_daemon::startup` the same way.

use std::process::ExitCode;
use std::sync::Arc;

use mh_daemon::{env, logging, startup, Config, LifecycleError};
use mh_engine::{CodeCatalog, HostCodebase};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "daemon failed");
            eprintln!("mhd: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), LifecycleError> {
    let config = Config::load()?;
    let _guard = logging::init(&config.log_dir, env::log_stderr())?;
    info!(state_dir = %config.state_dir.display(), version = %config.host_version, "starting mhd");

    let mut daemon = startup(&config, Arc::new(CodeCatalog::new()), Arc::new(HostCodebase::new()))?;
    daemon.host.spawn_timer();
    if let Some(updates) = daemon.host.spawn_update_check() {
        tokio::spawn(async move {
            match updates.await {
                Ok(true) => info!("unit updates available"),
                Ok(false) => {}
                Err(e) => error!(error = %e, "update check task failed"),
            }
        });
    }

    tokio::signal::ctrl_c().await?;
    daemon.shutdown().await
}
