use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub struct Metrics {
    // Runs
    pipeline_runs: AtomicUsize,
    pipeline_failures: AtomicUsize,
    loads: AtomicUsize,
    load_failures: AtomicUsize,

    // Timing (in microseconds)
    total_pipeline_time_us: AtomicU64,
    total_load_time_us: AtomicU64,

    // Counts
    files_processed: AtomicUsize,
    files_degraded: AtomicUsize,
    entities_extracted: AtomicUsize,
    edges_extracted: AtomicUsize,
    nodes_loaded: AtomicUsize,
    edges_loaded: AtomicUsize,
    edges_skipped: AtomicUsize,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            pipeline_runs: AtomicUsize::new(0),
            pipeline_failures: AtomicUsize::new(0),
            loads: AtomicUsize::new(0),
            load_failures: AtomicUsize::new(0),
            total_pipeline_time_us: AtomicU64::new(0),
            total_load_time_us: AtomicU64::new(0),
            files_processed: AtomicUsize::new(0),
            files_degraded: AtomicUsize::new(0),
            entities_extracted: AtomicUsize::new(0),
            edges_extracted: AtomicUsize::new(0),
            nodes_loaded: AtomicUsize::new(0),
            edges_loaded: AtomicUsize::new(0),
            edges_skipped: AtomicUsize::new(0),
        })
    }

    pub fn record_pipeline(
        &self,
        duration: Duration,
        files: usize,
        degraded: usize,
        entities: usize,
        edges: usize,
    ) {
        self.pipeline_runs.fetch_add(1, Ordering::Relaxed);
        self.total_pipeline_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.files_processed.fetch_add(files, Ordering::Relaxed);
        self.files_degraded.fetch_add(degraded, Ordering::Relaxed);
        self.entities_extracted.fetch_add(entities, Ordering::Relaxed);
        self.edges_extracted.fetch_add(edges, Ordering::Relaxed);
    }

    pub fn record_pipeline_failure(&self) {
        self.pipeline_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_load(&self, duration: Duration, nodes: usize, edges: usize, skipped: usize) {
        self.loads.fetch_add(1, Ordering::Relaxed);
        self.total_load_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.nodes_loaded.fetch_add(nodes, Ordering::Relaxed);
        self.edges_loaded.fetch_add(edges, Ordering::Relaxed);
        self.edges_skipped.fetch_add(skipped, Ordering::Relaxed);
    }

    pub fn record_load_failure(&self) {
        self.load_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            pipeline_runs: self.pipeline_runs.load(Ordering::Relaxed),
            pipeline_failures: self.pipeline_failures.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            load_failures: self.load_failures.load(Ordering::Relaxed),
            avg_pipeline_time_ms: avg_time_ms(&self.total_pipeline_time_us, &self.pipeline_runs),
            avg_load_time_ms: avg_time_ms(&self.total_load_time_us, &self.loads),
            files_processed: self.files_processed.load(Ordering::Relaxed),
            files_degraded: self.files_degraded.load(Ordering::Relaxed),
            entities_extracted: self.entities_extracted.load(Ordering::Relaxed),
            edges_extracted: self.edges_extracted.load(Ordering::Relaxed),
            nodes_loaded: self.nodes_loaded.load(Ordering::Relaxed),
            edges_loaded: self.edges_loaded.load(Ordering::Relaxed),
            edges_skipped: self.edges_skipped.load(Ordering::Relaxed),
        }
    }
}

fn avg_time_ms(total_us: &AtomicU64, count: &AtomicUsize) -> f64 {
    let total = total_us.load(Ordering::Relaxed) as f64;
    let cnt = count.load(Ordering::Relaxed) as f64;
    if cnt > 0.0 {
        total / cnt / 1000.0 // Convert to ms
    } else {
        0.0
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub pipeline_runs: usize,
    pub pipeline_failures: usize,
    pub loads: usize,
    pub load_failures: usize,
    pub avg_pipeline_time_ms: f64,
    pub avg_load_time_ms: f64,
    pub files_processed: usize,
    pub files_degraded: usize,
    pub entities_extracted: usize,
    pub edges_extracted: usize,
    pub nodes_loaded: usize,
    pub edges_loaded: usize,
    pub edges_skipped: usize,
}

pub struct TimedOperation {
    start: Instant,
}

impl TimedOperation {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
