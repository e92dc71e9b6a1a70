pub mod config;
pub mod metrics;
pub mod pipeline;

pub use config::AppConfig;
pub use metrics::{Metrics, MetricsSnapshot, TimedOperation};
pub use pipeline::{Pipeline, PipelineSummary, PolicyChoice};

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` filters, default `info`.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
