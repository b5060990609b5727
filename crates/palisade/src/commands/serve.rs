//! Serve command - runs every configured profile until Ctrl-C.

use std::path::PathBuf;

use anyhow::{Context as _, Result, anyhow};
use clap::Args;
use palisade_server::ProfileRuntime;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use super::Context;

/// Arguments for the serve command.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Config file (default: ./palisade.toml, then the user config dir)
    #[arg(short, long, env = "PALISADE_CONFIG")]
    pub config: Option<PathBuf>,
}

type RuntimeSet = JoinSet<(String, palisade_server::Result<()>)>;

pub async fn run(args: ServeArgs, ctx: &Context) -> Result<()> {
    let loaded = palisade_config::load_config(args.config.as_deref())
        .context("Failed to load configuration")?;

    info!(
        source = %loaded.source.display(),
        profiles = loaded.profiles.len(),
        "Loaded configuration"
    );
    for warning in &loaded.warnings {
        warn!("{}", warning);
    }

    // Bind every listener before serving any, so a port conflict aborts startup.
    let mut bound = Vec::with_capacity(loaded.profiles.len());
    for profile in loaded.profiles {
        let name = profile.name.clone();
        let runtime = ProfileRuntime::new(profile)
            .with_context(|| format!("Failed to initialize profile '{}'", name))?;
        let listener = runtime
            .bind()
            .await
            .with_context(|| format!("Failed to start profile '{}'", name))?;
        bound.push((runtime, listener));
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut runtimes = RuntimeSet::new();
    for (runtime, listener) in bound {
        let name = runtime.name().to_string();
        let mut stop = shutdown_rx.clone();
        runtimes.spawn(async move {
            let result = runtime
                .serve(listener, async move {
                    let _ = stop.changed().await;
                })
                .await;
            (name, result)
        });
    }

    if ctx.verbose {
        info!(count = runtimes.len(), "All profiles running");
    }

    let outcome = supervise(&mut runtimes).await;

    let _ = shutdown_tx.send(true);
    while let Some(joined) = runtimes.join_next().await {
        match joined {
            Ok((name, Err(e))) => error!(profile = %name, error = %e, "Profile failed during shutdown"),
            Err(e) => error!(error = %e, "Profile task panicked during shutdown"),
            Ok((_, Ok(()))) => {}
        }
    }

    info!("Gateway stopped");
    outcome
}

/// Wait for Ctrl-C or for a runtime to fail, whichever comes first.
async fn supervise(runtimes: &mut RuntimeSet) -> Result<()> {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            signal = &mut ctrl_c => {
                signal.context("Failed to listen for Ctrl-C")?;
                info!("Shutdown requested");
                return Ok(());
            }
            joined = runtimes.join_next() => match joined {
                None => return Ok(()),
                Some(Ok((name, Ok(())))) => warn!(profile = %name, "Profile exited"),
                Some(Ok((name, Err(e)))) => {
                    return Err(anyhow::Error::new(e).context(format!("Profile '{}' failed", name)));
                }
                Some(Err(e)) => return Err(anyhow!("Profile task panicked: {}", e)),
            }
        }
    }
}
