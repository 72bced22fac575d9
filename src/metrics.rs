use anyhow::{Context, Result};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus recorder with an HTTP listener on `addr`
/// (scrape `/metrics`). Must be called from inside the tokio runtime.
pub fn init(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("prometheus: install exporter")?;

    describe_counter!(
        "postwatch_items_polled_total",
        "Items returned by the content source."
    );
    describe_counter!(
        "postwatch_items_fresh_total",
        "Polled items newer than their source's watermark."
    );
    describe_counter!(
        "postwatch_notifications_total",
        "Notifications delivered, per channel."
    );
    describe_counter!(
        "postwatch_restarts_total",
        "Supervised restarts of the run loop."
    );
    describe_histogram!("postwatch_fetch_ms", "Listing fetch time in milliseconds.");

    tracing::info!(%addr, "metrics exporter listening");
    Ok(())
}
