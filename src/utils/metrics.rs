//! Observability and Metrics
//!
//! Counters describing what the client engine did during a run: round-trips,
//! frames and bytes moved, key exchanges, checksum mismatches and transfer
//! outcomes.
//!
//! Uses atomic counters so a snapshot can be taken from another task while a
//! transfer is in flight.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info};

/// Metrics collector for one client session
#[derive(Debug)]
pub struct Metrics {
    /// Round-trips started (one per fresh connection)
    pub round_trips_total: AtomicU64,
    /// Round-trips that ended in an error
    pub round_trips_failed: AtomicU64,
    /// Frames written to the transport
    pub frames_sent: AtomicU64,
    /// Frames read from the transport
    pub frames_received: AtomicU64,
    /// Meaningful bytes sent (padding excluded)
    pub bytes_sent: AtomicU64,
    /// Meaningful bytes received (padding excluded)
    pub bytes_received: AtomicU64,
    /// Symmetric keys installed by key exchange or reconnect
    pub keys_installed: AtomicU64,
    /// Upload attempts, including retries
    pub upload_attempts: AtomicU64,
    /// Checksum disagreements reported by the server
    pub crc_mismatches: AtomicU64,
    /// Transfers confirmed with a matching checksum
    pub transfers_completed: AtomicU64,
    /// Transfers given up after the retry budget ran out
    pub transfers_abandoned: AtomicU64,
    /// Start time for uptime calculation
    start_time: Instant,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            round_trips_total: AtomicU64::new(0),
            round_trips_failed: AtomicU64::new(0),
            frames_sent: AtomicU64::new(0),
            frames_received: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            keys_installed: AtomicU64::new(0),
            upload_attempts: AtomicU64::new(0),
            crc_mismatches: AtomicU64::new(0),
            transfers_completed: AtomicU64::new(0),
            transfers_abandoned: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn round_trip_started(&self) {
        self.round_trips_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn round_trip_failed(&self) {
        self.round_trips_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a logical message sent as `frames` frames
    pub fn message_sent(&self, frames: u64, byte_count: u64) {
        self.frames_sent.fetch_add(frames, Ordering::Relaxed);
        self.bytes_sent.fetch_add(byte_count, Ordering::Relaxed);
    }

    /// Record a logical message received over `frames` frames
    pub fn message_received(&self, frames: u64, byte_count: u64) {
        self.frames_received.fetch_add(frames, Ordering::Relaxed);
        self.bytes_received.fetch_add(byte_count, Ordering::Relaxed);
    }

    pub fn key_installed(&self) {
        self.keys_installed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn upload_attempt(&self) {
        self.upload_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn crc_mismatch(&self) {
        self.crc_mismatches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn transfer_completed(&self) {
        self.transfers_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn transfer_abandoned(&self) {
        self.transfers_abandoned.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            round_trips_total: self.round_trips_total.load(Ordering::Relaxed),
            round_trips_failed: self.round_trips_failed.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            keys_installed: self.keys_installed.load(Ordering::Relaxed),
            upload_attempts: self.upload_attempts.load(Ordering::Relaxed),
            crc_mismatches: self.crc_mismatches.load(Ordering::Relaxed),
            transfers_completed: self.transfers_completed.load(Ordering::Relaxed),
            transfers_abandoned: self.transfers_abandoned.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            round_trips_total = snapshot.round_trips_total,
            round_trips_failed = snapshot.round_trips_failed,
            frames_sent = snapshot.frames_sent,
            frames_received = snapshot.frames_received,
            bytes_sent = snapshot.bytes_sent,
            bytes_received = snapshot.bytes_received,
            keys_installed = snapshot.keys_installed,
            upload_attempts = snapshot.upload_attempts,
            crc_mismatches = snapshot.crc_mismatches,
            transfers_completed = snapshot.transfers_completed,
            transfers_abandoned = snapshot.transfers_abandoned,
            uptime_seconds = snapshot.uptime_seconds,
            "Transfer metrics snapshot"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub round_trips_total: u64,
    pub round_trips_failed: u64,
    pub frames_sent: u64,
    pub frames_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub keys_installed: u64,
    pub upload_attempts: u64,
    pub crc_mismatches: u64,
    pub transfers_completed: u64,
    pub transfers_abandoned: u64,
    pub uptime_seconds: u64,
}

/// Timer for measuring operation duration
pub struct Timer {
    start: Instant,
    operation: &'static str,
}

impl Timer {
    /// Start timing an operation
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        debug!(
            operation = self.operation,
            duration_ms = duration.as_millis(),
            "Operation completed"
        );
    }
}
