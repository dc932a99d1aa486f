use anyhow::Result;
use tokio::sync::watch;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::services::quiz_status;

pub(crate) async fn run(state: AppState) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handles = vec![tokio::spawn(quiz_status_loop(state.clone(), shutdown_rx))];

    crate::core::shutdown::shutdown_signal("worker").await;
    if shutdown_tx.send(true).is_err() {
        tracing::warn!("Failed to broadcast shutdown signal to background tasks");
    }

    for handle in handles {
        if let Err(err) = handle.await {
            tracing::error!(error = %err, "Background task join failed");
        }
    }

    Ok(())
}

async fn quiz_status_loop(state: AppState, mut shutdown: watch::Receiver<bool>) {
    let period = Duration::from_secs(state.settings().quiz().status_interval_seconds);
    let mut tick = interval(period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::info!(interval_seconds = period.as_secs(), "Quiz status worker started");

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                match quiz_status::run_transitions(state.db(), primitive_now_utc()).await {
                    Ok(0) => {}
                    Ok(changed) => tracing::info!(changed, "Applied quiz status transitions"),
                    Err(err) => tracing::error!(error = %err, "run_transitions failed"),
                }
            }
        }
    }

    tracing::info!("Quiz status worker stopped");
}
