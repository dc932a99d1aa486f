use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled {
        return Ok(());
    }

    if PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

pub(crate) fn record_availability_check(outcome: &'static str) {
    metrics::counter!("quiz_availability_checks_total", "outcome" => outcome).increment(1);
}

pub(crate) fn record_marking_run(attempts: usize) {
    metrics::counter!("quiz_marking_runs_total").increment(1);
    metrics::histogram!("quiz_marking_attempts").record(attempts as f64);
}

pub(crate) fn record_status_transition(to: &'static str) {
    metrics::counter!("quiz_status_transitions_total", "to" => to).increment(1);
}
