use analytics_core::{FixedClock, SeriesRow, format_api_timestamp};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use serde_json::json;
use std::path::PathBuf;
use tempfile::TempDir;

/// Captures tracing output for tests.
#[allow(dead_code)]
pub struct TestTracing {
    buffer: std::sync::Arc<std::sync::Mutex<Vec<u8>>>,
}

#[allow(dead_code)]
impl TestTracing {
    pub fn new() -> Self {
        Self {
            buffer: std::sync::Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.buffer.clone();
        let make_writer = move || TestWriter(writer.clone());
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .without_time()
            .with_max_level(tracing::Level::TRACE)
            .with_writer(make_writer)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn output(&self) -> String {
        let buf = self.buffer.lock().unwrap();
        String::from_utf8_lossy(&buf).to_string()
    }

    /// Assert that the captured log output contains the provided substring.
    pub fn assert_contains(&self, needle: &str) {
        let out = self.output();
        assert!(
            out.contains(needle),
            "expected logs to contain `{needle}`, got:\n{out}"
        );
    }

    /// Return captured log lines (trimmed of trailing newline) for fine-grained checks.
    pub fn lines(&self) -> Vec<String> {
        self.output()
            .lines()
            .map(std::string::ToString::to_string)
            .collect()
    }
}

#[allow(dead_code)]
pub struct EnvGuard {
    key: String,
    prev: Option<String>,
}

#[allow(dead_code)]
impl EnvGuard {
    pub fn set(key: &str, val: impl AsRef<str>) -> Self {
        let prev = std::env::var(key).ok();
        unsafe { std::env::set_var(key, val.as_ref()) };
        Self {
            key: key.to_string(),
            prev,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match &self.prev {
            Some(v) => unsafe { std::env::set_var(&self.key, v) },
            None => unsafe { std::env::remove_var(&self.key) },
        }
    }
}

struct TestWriter(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

impl std::io::Write for TestWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut guard = self.0.lock().unwrap();
        guard.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[allow(dead_code)]
pub struct TempFixtureDir {
    pub dir: TempDir,
}

#[allow(dead_code)]
impl TempFixtureDir {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("tempdir"),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }
}

/// Shorthand for a UTC instant.
#[allow(dead_code)]
pub fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
}

/// Clock frozen at 2024-01-10 12:00:00 UTC.
#[allow(dead_code)]
pub fn fixed_clock() -> FixedClock {
    FixedClock(utc(2024, 1, 10, 12, 0, 0))
}

/// Deterministic sparse-series generator for tests.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct SeriesFixtureBuilder {
    start: DateTime<Utc>,
    step: TimeDelta,
    count: usize,
    every: usize,
    base_value: f64,
}

#[allow(dead_code)]
impl SeriesFixtureBuilder {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            start,
            step: TimeDelta::days(1),
            count: 3,
            every: 1,
            base_value: 1.0,
        }
    }

    pub fn step(mut self, step: TimeDelta) -> Self {
        self.step = step;
        self
    }

    pub fn count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    /// Keep only every `n`th row, leaving gaps for the densifier to fill.
    pub fn every(mut self, n: usize) -> Self {
        self.every = n.max(1);
        self
    }

    pub fn base_value(mut self, value: f64) -> Self {
        self.base_value = value;
        self
    }

    fn points(&self) -> impl Iterator<Item = (DateTime<Utc>, f64)> + '_ {
        (0..self.count)
            .filter(|i| i % self.every == 0)
            .map(|i| {
                let t = self.start + self.step * i as i32;
                (t, self.base_value + i as f64)
            })
    }

    pub fn rows(&self) -> Vec<SeriesRow> {
        self.points()
            .map(|(t, v)| SeriesRow::new(format_api_timestamp(t), v))
            .collect()
    }

    /// Rows as the store returns them: `time_stamp` plus a quoted `count`.
    pub fn json_rows(&self) -> Vec<serde_json::Value> {
        self.points()
            .map(|(t, v)| {
                json!({
                    "time_stamp": format_api_timestamp(t),
                    "count": v.to_string(),
                })
            })
            .collect()
    }
}
