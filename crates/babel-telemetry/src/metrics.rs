use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

/// Type of metric.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    Counter,
    Gauge,
    Histogram,
}

/// A snapshot of a metric value at a point in time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub id: i64,
    pub timestamp: String,
    pub name: String,
    pub value: f64,
    pub labels: Option<String>,
    pub metric_type: MetricType,
}

/// Query parameters for searching metric snapshots.
#[derive(Clone, Debug, Default)]
pub struct MetricsQuery {
    pub name: Option<String>,
    pub since: Option<String>,
    pub limit: Option<u32>,
}

/// Monotonically increasing counter.
struct Counter {
    value: AtomicU64,
}

impl Counter {
    fn new() -> Self {
        Self { value: AtomicU64::new(0) }
    }
    fn increment(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }
    fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Gauge over integer counts (connections, room members). Relay gauges
/// are always counts, so plain i64 arithmetic is enough.
struct Gauge {
    value: AtomicI64,
}

impl Gauge {
    fn new() -> Self {
        Self { value: AtomicI64::new(0) }
    }
    fn set(&self, v: i64) {
        self.value.store(v, Ordering::Relaxed);
    }
    fn add(&self, delta: i64) {
        self.value.fetch_add(delta, Ordering::Relaxed);
    }
    fn get(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Histogram that keeps all observations for percentile computation.
struct Histogram {
    observations: Mutex<Vec<f64>>,
}

impl Histogram {
    fn new() -> Self {
        Self {
            observations: Mutex::new(Vec::new()),
        }
    }
    fn observe(&self, value: f64) {
        self.observations.lock().push(value);
    }
    fn summary(&self) -> HistogramSummary {
        let mut obs = self.observations.lock();
        if obs.is_empty() {
            return HistogramSummary::default();
        }
        obs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let count = obs.len();
        let sum: f64 = obs.iter().sum();
        let p50 = obs[count / 2];
        let p95 = obs[((count as f64 * 0.95) as usize).min(count - 1)];
        let p99 = obs[((count as f64 * 0.99) as usize).min(count - 1)];
        HistogramSummary {
            count: count as u64,
            sum,
            p50,
            p95,
            p99,
        }
    }
}

/// Summary statistics from a histogram.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct HistogramSummary {
    pub count: u64,
    pub sum: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

/// Metric key: name + sorted labels.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
struct MetricKey {
    name: String,
    labels: Vec<(String, String)>,
}

impl MetricKey {
    fn new(name: impl Into<String>, labels: &[(&str, &str)]) -> Self {
        let mut sorted: Vec<(String, String)> = labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        Self {
            name: name.into(),
            labels: sorted,
        }
    }

    fn labels_json(&self) -> Option<String> {
        if self.labels.is_empty() {
            return None;
        }
        let map: HashMap<&str, &str> = self
            .labels
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        serde_json::to_string(&map).ok()
    }
}

/// Thread-safe metrics recorder backed by SQLite for historical snapshots.
/// Live values stay in memory; `snapshot()` persists them.
pub struct MetricsRecorder {
    counters: RwLock<HashMap<MetricKey, Counter>>,
    gauges: RwLock<HashMap<MetricKey, Gauge>>,
    histograms: RwLock<HashMap<MetricKey, Histogram>>,
    db: Mutex<Connection>,
}

impl MetricsRecorder {
    pub fn new(db_path: &Path) -> Result<Self, rusqlite::Error> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(db_path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             CREATE TABLE IF NOT EXISTS metrics_snapshots (
                 id INTEGER PRIMARY KEY AUTOINCREMENT,
                 timestamp TEXT NOT NULL,
                 name TEXT NOT NULL,
                 value REAL NOT NULL,
                 labels TEXT,
                 metric_type TEXT NOT NULL
             );
             CREATE INDEX IF NOT EXISTS idx_metrics_name ON metrics_snapshots(name, timestamp);",
        )?;
        Ok(Self {
            counters: RwLock::new(HashMap::new()),
            gauges: RwLock::new(HashMap::new()),
            histograms: RwLock::new(HashMap::new()),
            db: Mutex::new(conn),
        })
    }

    pub fn counter_inc(&self, name: &str, labels: &[(&str, &str)], n: u64) {
        let key = MetricKey::new(name, labels);
        let counters = self.counters.read();
        if let Some(c) = counters.get(&key) {
            c.increment(n);
            return;
        }
        drop(counters);
        let mut counters = self.counters.write();
        counters.entry(key).or_insert_with(Counter::new).increment(n);
    }

    pub fn gauge_set(&self, name: &str, labels: &[(&str, &str)], value: i64) {
        let key = MetricKey::new(name, labels);
        let gauges = self.gauges.read();
        if let Some(g) = gauges.get(&key) {
            g.set(value);
            return;
        }
        drop(gauges);
        let mut gauges = self.gauges.write();
        gauges.entry(key).or_insert_with(Gauge::new).set(value);
    }

    pub fn gauge_add(&self, name: &str, labels: &[(&str, &str)], delta: i64) {
        let key = MetricKey::new(name, labels);
        let gauges = self.gauges.read();
        if let Some(g) = gauges.get(&key) {
            g.add(delta);
            return;
        }
        drop(gauges);
        let mut gauges = self.gauges.write();
        gauges.entry(key).or_insert_with(Gauge::new).add(delta);
    }

    pub fn histogram_observe(&self, name: &str, labels: &[(&str, &str)], value: f64) {
        let key = MetricKey::new(name, labels);
        let histograms = self.histograms.read();
        if let Some(h) = histograms.get(&key) {
            h.observe(value);
            return;
        }
        drop(histograms);
        let mut histograms = self.histograms.write();
        histograms
            .entry(key)
            .or_insert_with(Histogram::new)
            .observe(value);
    }

    pub fn histogram_summary(&self, name: &str, labels: &[(&str, &str)]) -> HistogramSummary {
        let key = MetricKey::new(name, labels);
        self.histograms
            .read()
            .get(&key)
            .map(|h| h.summary())
            .unwrap_or_default()
    }

    pub fn counter_get(&self, name: &str, labels: &[(&str, &str)]) -> u64 {
        let key = MetricKey::new(name, labels);
        self.counters.read().get(&key).map_or(0, |c| c.get())
    }

    pub fn gauge_get(&self, name: &str, labels: &[(&str, &str)]) -> i64 {
        let key = MetricKey::new(name, labels);
        self.gauges.read().get(&key).map_or(0, |g| g.get())
    }

    /// Persist the current value of every metric to SQLite.
    pub fn snapshot(&self) -> Result<usize, rusqlite::Error> {
        let now = Utc::now().to_rfc3339();
        let db = self.db.lock();
        let mut count = 0;

        let counters = self.counters.read();
        for (key, counter) in counters.iter() {
            db.execute(
                "INSERT INTO metrics_snapshots (timestamp, name, value, labels, metric_type)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![now, key.name, counter.get() as f64, key.labels_json(), "counter"],
            )?;
            count += 1;
        }
        drop(counters);

        let gauges = self.gauges.read();
        for (key, gauge) in gauges.iter() {
            db.execute(
                "INSERT INTO metrics_snapshots (timestamp, name, value, labels, metric_type)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![now, key.name, gauge.get() as f64, key.labels_json(), "gauge"],
            )?;
            count += 1;
        }
        drop(gauges);

        // Histogram snapshots persist the p50
        let histograms = self.histograms.read();
        for (key, histogram) in histograms.iter() {
            let summary = histogram.summary();
            db.execute(
                "INSERT INTO metrics_snapshots (timestamp, name, value, labels, metric_type)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![now, key.name, summary.p50, key.labels_json(), "histogram"],
            )?;
            count += 1;
        }

        Ok(count)
    }

    /// Query historical metric snapshots.
    pub fn query(&self, q: &MetricsQuery) -> Result<Vec<MetricsSnapshot>, rusqlite::Error> {
        let db = self.db.lock();
        let mut sql = String::from(
            "SELECT id, timestamp, name, value, labels, metric_type FROM metrics_snapshots WHERE 1=1",
        );
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(name) = &q.name {
            sql.push_str(&format!(" AND name = ?{}", params.len() + 1));
            params.push(Box::new(name.clone()));
        }
        if let Some(since) = &q.since {
            sql.push_str(&format!(" AND timestamp >= ?{}", params.len() + 1));
            params.push(Box::new(since.clone()));
        }

        sql.push_str(" ORDER BY id DESC");
        let limit = q.limit.unwrap_or(100);
        sql.push_str(&format!(" LIMIT {limit}"));

        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            params.iter().map(|p| p.as_ref()).collect();
        let mut stmt = db.prepare(&sql)?;
        let rows = stmt.query_map(param_refs.as_slice(), |row| {
            let mt_str: String = row.get(5)?;
            let metric_type = match mt_str.as_str() {
                "gauge" => MetricType::Gauge,
                "histogram" => MetricType::Histogram,
                _ => MetricType::Counter,
            };
            Ok(MetricsSnapshot {
                id: row.get(0)?,
                timestamp: row.get(1)?,
                name: row.get(2)?,
                value: row.get(3)?,
                labels: row.get(4)?,
                metric_type,
            })
        })?;

        rows.collect()
    }

    /// Prune snapshots older than retention_days.
    pub fn prune(&self, retention_days: u32) -> Result<usize, rusqlite::Error> {
        let db = self.db.lock();
        let cutoff = Utc::now()
            .checked_sub_signed(chrono::Duration::days(retention_days as i64))
            .unwrap_or_else(Utc::now)
            .to_rfc3339();
        db.execute(
            "DELETE FROM metrics_snapshots WHERE timestamp < ?1",
            rusqlite::params![cutoff],
        )
    }
}
