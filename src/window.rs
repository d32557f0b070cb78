//! Bounded real-time sliding windows feeding the live charts.
//!
//! Each known channel owns an ordered sequence of [`Sample`]s bounded two ways:
//!
//! - **Time**: after an append at `t`, samples older than `t - window_ms` are
//!   trimmed from the head. A sample exactly at `t - window_ms` is kept.
//! - **Count**: the sequence never holds more than `max_samples`; the oldest
//!   excess is dropped after the time trim.
//!
//! Samples are appended unconditionally at the tail, so a late sample does not
//! corrupt the buffer; it only delays head trimming until newer samples push
//! it out of the window.
//!
//! Every append overwrites the channel's full sequence in the backing
//! [`KvStore`] as a JSON array of `{"x": ms, "y": value}`. Storage failures are
//! never fatal: unreadable or malformed state loads as an empty sequence and a
//! failed write leaves the in-memory window authoritative.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;

use crate::channels::ChannelCatalog;
use crate::storage::KvStore;

/// Reference trailing window: 10 minutes.
pub const DEFAULT_WINDOW_MS: i64 = 10 * 60 * 1000;

/// Reference hard cap on samples per channel.
pub const DEFAULT_MAX_SAMPLES: usize = 6500;

/// One `(timestamp, value)` observation.
///
/// Non-finite values serialize as JSON `null` and read back as NaN.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Sample {
    /// Milliseconds since the Unix epoch
    #[serde(rename = "x")]
    pub timestamp: i64,
    #[serde(rename = "y", deserialize_with = "null_as_nan")]
    pub value: f64,
}

impl Sample {
    #[must_use]
    pub const fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

fn null_as_nan<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowConfig {
    pub window_ms: i64,
    pub max_samples: usize,
    /// Drop NaN and infinite values at ingestion instead of storing them
    pub reject_non_finite: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            window_ms: DEFAULT_WINDOW_MS,
            max_samples: DEFAULT_MAX_SAMPLES,
            reject_non_finite: false,
        }
    }
}

#[derive(Debug, Default)]
struct ChannelBuffer {
    samples: Vec<Sample>,
    revision: u64,
}

impl ChannelBuffer {
    fn push(&mut self, sample: Sample, config: &WindowConfig) {
        self.samples.push(sample);

        let window_start = sample.timestamp.saturating_sub(config.window_ms);
        let stale = self
            .samples
            .iter()
            .take_while(|s| s.timestamp < window_start)
            .count();
        self.samples.drain(..stale);

        self.enforce_cap(config.max_samples);
        self.revision += 1;
    }

    fn enforce_cap(&mut self, max_samples: usize) {
        if self.samples.len() > max_samples {
            let excess = self.samples.len() - max_samples;
            self.samples.drain(..excess);
        }
    }

    fn bounds(&self, window_ms: i64) -> Option<(i64, i64)> {
        self.samples
            .last()
            .map(|last| (last.timestamp.saturating_sub(window_ms), last.timestamp))
    }
}

/// Read-only copy of one channel's window, as handed to the rendering surface.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct WindowSnapshot {
    pub channel: String,
    pub samples: Vec<Sample>,
    /// Axis start: latest timestamp minus the window duration
    pub window_start: i64,
    /// Axis end: latest timestamp
    pub window_end: i64,
    /// Bumped on every append; unchanged revision means unchanged samples
    pub revision: u64,
}

/// Sliding windows for every channel of a catalog, persisted to a [`KvStore`].
pub struct WindowStore<S: KvStore> {
    catalog: ChannelCatalog,
    config: WindowConfig,
    store: S,
    buffers: HashMap<String, ChannelBuffer>,
}

impl<S: KvStore> WindowStore<S> {
    #[must_use]
    pub fn new(catalog: ChannelCatalog, config: WindowConfig, store: S) -> Self {
        Self {
            catalog,
            config,
            store,
            buffers: HashMap::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    #[must_use]
    pub fn catalog(&self) -> &ChannelCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Seed the in-memory windows from storage.
    ///
    /// Called once at startup so charts are pre-populated before live data
    /// arrives. Restored sequences are capped to `max_samples` in case the
    /// limit was lowered since they were written. Returns the number of
    /// channels that had persisted samples.
    pub fn restore(&mut self) -> usize {
        let mut restored = 0;
        for channel in self.catalog.iter() {
            let mut samples = self.load(channel.key);
            if samples.is_empty() {
                continue;
            }
            if samples.len() > self.config.max_samples {
                let excess = samples.len() - self.config.max_samples;
                samples.drain(..excess);
            }
            tracing::debug!(channel = %channel.key, samples = samples.len(), "Window restored");
            self.buffers.insert(
                channel.key.to_string(),
                ChannelBuffer {
                    samples,
                    revision: 1,
                },
            );
            restored += 1;
        }
        restored
    }

    /// Append one sample to a channel's window and persist the result.
    ///
    /// Returns the updated sequence, or `None` when the sample was dropped:
    /// the channel is not in the catalog, or the value is non-finite and
    /// `reject_non_finite` is set. A dropped sample creates no buffer and
    /// causes no storage write.
    pub fn append(&mut self, channel_key: &str, timestamp: i64, value: f64) -> Option<&[Sample]> {
        if !self.catalog.is_known(channel_key) {
            tracing::trace!(channel = %channel_key, "Dropping sample for unknown channel");
            return None;
        }
        if self.config.reject_non_finite && !value.is_finite() {
            tracing::debug!(channel = %channel_key, timestamp, "Dropping non-finite sample");
            return None;
        }

        let buffer = self.buffers.entry(channel_key.to_string()).or_default();
        buffer.push(Sample::new(timestamp, value), &self.config);

        persist(&self.store, channel_key, &buffer.samples);

        Some(buffer.samples.as_slice())
    }

    /// The persisted sequence for a channel.
    ///
    /// Absent keys, storage read failures and unparsable content all yield an
    /// empty sequence.
    #[must_use]
    pub fn load(&self, channel_key: &str) -> Vec<Sample> {
        let raw = match self.store.get(channel_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(channel = %channel_key, error = %e, "Failed to read persisted window");
                return Vec::new();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(channel = %channel_key, error = %e, "Discarding malformed persisted window");
            Vec::new()
        })
    }

    /// `(latest - window_ms, latest)` for a channel, `None` if it has no samples.
    #[must_use]
    pub fn window_bounds(&self, channel_key: &str) -> Option<(i64, i64)> {
        self.buffers
            .get(channel_key)
            .and_then(|b| b.bounds(self.config.window_ms))
    }

    /// In-memory samples of a channel, empty if none have arrived.
    #[must_use]
    pub fn samples(&self, channel_key: &str) -> &[Sample] {
        self.buffers
            .get(channel_key)
            .map(|b| b.samples.as_slice())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn revision(&self, channel_key: &str) -> u64 {
        self.buffers.get(channel_key).map_or(0, |b| b.revision)
    }

    /// Whether a buffer exists for the channel (created on first accepted sample).
    #[must_use]
    pub fn has_buffer(&self, channel_key: &str) -> bool {
        self.buffers.contains_key(channel_key)
    }

    /// Copy of a channel's window, `None` if it has no samples.
    #[must_use]
    pub fn snapshot(&self, channel_key: &str) -> Option<WindowSnapshot> {
        let buffer = self.buffers.get(channel_key)?;
        let (window_start, window_end) = buffer.bounds(self.config.window_ms)?;
        Some(WindowSnapshot {
            channel: channel_key.to_string(),
            samples: buffer.samples.clone(),
            window_start,
            window_end,
            revision: buffer.revision,
        })
    }
}

fn persist<S: KvStore>(store: &S, channel_key: &str, samples: &[Sample]) {
    let encoded = match serde_json::to_string(samples) {
        Ok(encoded) => encoded,
        Err(e) => {
            tracing::warn!(channel = %channel_key, error = %e, "Failed to encode window");
            return;
        }
    };

    if let Err(e) = store.set(channel_key, encoded) {
        tracing::warn!(channel = %channel_key, error = %e, "Failed to persist window");
    }
}
