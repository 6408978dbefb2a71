use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::net::SocketAddr;

/// One-time metrics registration (so series show up on scrape).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("monitor_fetch_total", "Listing fetches issued by monitors.");
        describe_counter!(
            "monitor_new_items_total",
            "Items observed for the first time by a monitor."
        );
        describe_counter!(
            "monitor_blank_total",
            "Fetches that returned nothing newer than the tip."
        );
        describe_counter!(
            "monitor_health_checks_total",
            "Existence probes run against the tip front."
        );
        describe_counter!(
            "monitor_tip_shaved_total",
            "Tip entries dropped because the item was deleted."
        );
        describe_counter!(
            "dispatch_handler_errors_total",
            "Handler invocations that returned an error or panicked."
        );
        describe_counter!(
            "reddit_request_errors_total",
            "Reddit HTTP requests that failed or returned non-2xx."
        );
        describe_gauge!("engine_last_tick_ts", "Unix ts of the last engine tick.");
    });
}

/// Install the Prometheus recorder and return the handle used for rendering.
pub fn install_prometheus() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("prometheus: install recorder")?;
    ensure_metrics_described();
    Ok(handle)
}

/// Install the recorder together with the exporter's own `/metrics` HTTP
/// listener. Must be called from inside a tokio runtime.
pub fn install_prometheus_listener(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .with_context(|| format!("prometheus: listen on {addr}"))?;
    ensure_metrics_described();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics::counter;

    #[test]
    fn recorder_renders_described_series() {
        // Other unit tests share this process-wide recorder; use a series of our own.
        let handle = install_prometheus().unwrap();
        describe_counter!("telemetry_render_total", "Render check.");
        counter!("telemetry_render_total").increment(2);

        let out = handle.render();
        assert!(out.contains("# HELP telemetry_render_total Render check."));
        assert!(out.contains("telemetry_render_total 2"));
    }
}
