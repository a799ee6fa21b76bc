mod logging;
mod metrics;

pub use logging::{LogQuery, LogRecord, SqliteLogLayer, SqliteLogSink};
pub use metrics::{HistogramSummary, MetricType, MetricsQuery, MetricsRecorder, MetricsSnapshot};

use std::path::PathBuf;
use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Configuration for the telemetry subsystem.
#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    /// Default log level. Overridden by RUST_LOG env var.
    pub log_level: Level,
    /// Per-module level overrides (e.g. "babel_relay" => DEBUG).
    pub module_levels: Vec<(String, Level)>,
    /// JSON log lines on stdout; plain compact lines when false.
    pub json_logs: bool,
    /// Whether to persist warn+ logs to SQLite.
    pub log_to_sqlite: bool,
    /// Path to the log database.
    pub log_db_path: PathBuf,
    /// Whether metrics recording is enabled.
    pub metrics_enabled: bool,
    /// Path to the metrics database.
    pub metrics_db_path: PathBuf,
    /// How often to snapshot metrics to SQLite (seconds).
    pub metrics_snapshot_interval_secs: u64,
    /// How many days of metric snapshots to retain.
    pub metrics_retention_days: u32,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        let babel_dir = dirs_fallback();
        Self {
            log_level: Level::INFO,
            module_levels: Vec::new(),
            json_logs: true,
            log_to_sqlite: true,
            log_db_path: babel_dir.join("relay-logs.db"),
            metrics_enabled: true,
            metrics_db_path: babel_dir.join("relay-metrics.db"),
            metrics_snapshot_interval_secs: 60,
            metrics_retention_days: 7,
        }
    }
}

/// Handle to the telemetry sinks. Keep it alive for the process lifetime.
pub struct TelemetryGuard {
    log_sink: Option<Arc<SqliteLogSink>>,
    metrics_recorder: Option<Arc<MetricsRecorder>>,
}

impl TelemetryGuard {
    /// Access the metrics recorder for recording and querying.
    pub fn metrics(&self) -> Option<Arc<MetricsRecorder>> {
        self.metrics_recorder.clone()
    }

    /// Access the log sink for querying persisted logs.
    pub fn logs(&self) -> Option<&SqliteLogSink> {
        self.log_sink.as_deref()
    }
}

/// Initialize the telemetry subsystem. Call once at startup.
pub fn init_telemetry(config: TelemetryConfig) -> TelemetryGuard {
    // Build the env filter from config
    let mut filter_str = config.log_level.to_string().to_lowercase();
    for (module, level) in &config.module_levels {
        filter_str.push_str(&format!(",{}={}", module, level.to_string().to_lowercase()));
    }
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let fmt_layer: Box<dyn Layer<tracing_subscriber::Registry> + Send + Sync> =
        if config.json_logs {
            tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_filter(env_filter)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .compact()
                .with_target(true)
                .with_filter(env_filter)
                .boxed()
        };

    // Optional SQLite sink for warn+ logs
    let (sqlite_layer, sqlite_sink) = if config.log_to_sqlite {
        match SqliteLogSink::new(&config.log_db_path) {
            Ok(sink) => {
                let sink = Arc::new(sink);
                let layer = SqliteLogLayer::new(sink.clone());
                (Some(layer), Some(sink))
            }
            Err(e) => {
                eprintln!("babel-telemetry: failed to open log DB: {e}");
                (None, None)
            }
        }
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(sqlite_layer)
        .init();

    let metrics_recorder = if config.metrics_enabled {
        match MetricsRecorder::new(&config.metrics_db_path) {
            Ok(recorder) => Some(Arc::new(recorder)),
            Err(e) => {
                tracing::warn!("babel-telemetry: failed to open metrics DB: {e}");
                None
            }
        }
    } else {
        None
    };

    // Periodic snapshot + retention pruning, when a runtime is available
    if let (Some(recorder), Ok(handle)) =
        (&metrics_recorder, tokio::runtime::Handle::try_current())
    {
        let recorder = Arc::clone(recorder);
        let interval = std::time::Duration::from_secs(config.metrics_snapshot_interval_secs.max(1));
        let retention_days = config.metrics_retention_days;
        handle.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // consume first immediate tick
            loop {
                ticker.tick().await;
                if let Err(e) = recorder.snapshot() {
                    tracing::warn!("metrics snapshot failed: {e}");
                }
                if let Err(e) = recorder.prune(retention_days) {
                    tracing::warn!("metrics prune failed: {e}");
                }
            }
        });
    }

    TelemetryGuard {
        log_sink: sqlite_sink,
        metrics_recorder,
    }
}

/// Fallback data dir for default sink paths.
fn dirs_fallback() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
        .join(".babel")
}
