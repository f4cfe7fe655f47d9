mod polling;

use crate::channels::Notifier;
use crate::core::clock::SystemClock;
use crate::core::settings::Settings;
use crate::core::state::StateFile;
use crate::core::tracker::{TrackerConfig, VinTracker};
use crate::providers::TeslaInventory;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::oneshot;

use polling::{LoopOptions, PollingLoop};

pub async fn run(settings: Settings) -> Result<()> {
    tracing::info!("Starting stock tracker");

    let source = Arc::new(TeslaInventory::new(&settings.inventory)?);
    let notifier = Notifier::from_settings(&settings)?;
    let state = settings.state_file.as_ref().map(StateFile::new);
    let tracker = load_tracker(settings.tracker_config(), state.as_ref());

    let mut polling = PollingLoop::new(
        tracker,
        source,
        notifier,
        Arc::new(SystemClock),
        LoopOptions::from(&settings),
    );
    if let Some(state) = state {
        polling = polling.with_state_file(state);
    }

    // Install the signal handlers before the first cycle so an early
    // interrupt still goes through the orderly shutdown path.
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        wait_for_signal().await;
        let _ = shutdown_tx.send(());
    });

    polling
        .run(async {
            let _ = shutdown_rx.await;
        })
        .await?;

    tracing::info!("Stock tracker stopped");
    Ok(())
}

fn load_tracker(config: TrackerConfig, state: Option<&StateFile>) -> VinTracker {
    let Some(state) = state else {
        return VinTracker::new(config);
    };

    match state.load() {
        Ok(Some(snapshot)) => {
            let tracker = VinTracker::restore(config, snapshot);
            tracing::info!(path = ?state.path(), tracked = tracker.len(), "Restored tracker state");
            tracker
        }
        Ok(None) => VinTracker::new(config),
        Err(e) => {
            tracing::warn!(error = %format!("{e:#}"), "Ignoring unreadable tracker state");
            VinTracker::new(config)
        }
    }
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
