use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and pre-register journal counters.
/// Returns a `PrometheusHandle` whose `render()` method produces the
/// text/plain Prometheus scrape payload.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    register_counters();
    Ok(handle)
}

/// Build a handle without installing it globally. Used where a recorder may
/// already be installed (one per process).
pub fn detached_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}

fn register_counters() {
    // Pre-register counters so they appear even before the first increment.
    counter!("positions_created_total").absolute(0);
    counter!("positions_closed_total").absolute(0);
    counter!("operations_deleted_total").absolute(0);
    counter!("ledger_rejections_total").absolute(0);
    for kind in ["entry", "increment", "partial_exit"] {
        counter!("operations_recorded_total", "kind" => kind).absolute(0);
    }
}
