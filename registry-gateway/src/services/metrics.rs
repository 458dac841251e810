use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

use crate::services::registry::RegistryOperation;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Installs the global Prometheus recorder. Calling it again is a no-op.
pub fn init_metrics() -> anyhow::Result<()> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("failed to install Prometheus recorder: {}", e))?;

    let _ = METRICS_HANDLE.set(handle);
    Ok(())
}

pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

/// Counts one registry round trip by operation and outcome.
pub fn record_registry_call(operation: RegistryOperation, success: bool, elapsed: Duration) {
    let labels = [
        ("operation", operation.as_str().to_string()),
        (
            "outcome",
            if success { "success" } else { "failure" }.to_string(),
        ),
    ];

    counter!("registry_requests_total", &labels).increment(1);
    histogram!("registry_request_duration_seconds", &labels).record(elapsed.as_secs_f64());
}

/// Counts compensating deletes of robot accounts after a failed grant.
pub fn record_compensation(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!("gateway_compensations_total", "outcome" => outcome).increment(1);
}
