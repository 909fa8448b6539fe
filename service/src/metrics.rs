//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Lock-free metrics for the Parley server

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Lock-free server metrics
///
/// All metrics are stored as atomics and can be updated from any worker
/// without locks. Use [`ServerMetrics::snapshot`] to read them together.
#[derive(Debug)]
pub struct ServerMetrics {
    // Connection counts
    total_connections: AtomicU64,
    active_connections: AtomicU64,
    rejected_connections: AtomicU64,

    // Traffic
    lines_received: AtomicU64,
    replies_sent: AtomicU64,

    // Protocol outcomes
    logins_succeeded: AtomicU64,
    logins_failed: AtomicU64,
    commands_executed: AtomicU64,

    // Errors
    protocol_violations: AtomicU64,
    transport_errors: AtomicU64,

    // Timing (stored as nanoseconds)
    total_connection_duration_ns: AtomicU64,

    started_at: Instant,
}

impl Default for ServerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerMetrics {
    /// Create a new metrics instance
    pub fn new() -> Self {
        Self {
            total_connections: AtomicU64::new(0),
            active_connections: AtomicU64::new(0),
            rejected_connections: AtomicU64::new(0),
            lines_received: AtomicU64::new(0),
            replies_sent: AtomicU64::new(0),
            logins_succeeded: AtomicU64::new(0),
            logins_failed: AtomicU64::new(0),
            commands_executed: AtomicU64::new(0),
            protocol_violations: AtomicU64::new(0),
            transport_errors: AtomicU64::new(0),
            total_connection_duration_ns: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    // Connection tracking

    /// Record a new connection being registered
    pub fn connection_opened(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a connection being torn down
    pub fn connection_closed(&self, duration: Duration) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
        self.total_connection_duration_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    /// Record a connection dropped because the server was full
    pub fn connection_rejected(&self) {
        self.rejected_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current number of active connections
    pub fn active_connections(&self) -> u64 {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Get the total number of connections since server start
    pub fn total_connections(&self) -> u64 {
        self.total_connections.load(Ordering::Relaxed)
    }

    // Traffic

    /// Record a line handed to the protocol
    pub fn line_received(&self) {
        self.lines_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a reply line written
    pub fn reply_sent(&self) {
        self.replies_sent.fetch_add(1, Ordering::Relaxed);
    }

    // Protocol outcomes

    /// Record a successful login
    pub fn login_succeeded(&self) {
        self.logins_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rejected username/password pair
    pub fn login_failed(&self) {
        self.logins_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a command answered
    pub fn command_executed(&self) {
        self.commands_executed.fetch_add(1, Ordering::Relaxed);
    }

    // Errors

    /// Record a connection closed for a protocol violation
    pub fn protocol_violation(&self) {
        self.protocol_violations.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a connection closed by a read or write failure
    pub fn transport_error(&self) {
        self.transport_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    ///
    /// The snapshot may not be perfectly consistent if metrics are being
    /// updated concurrently, but it is close enough for monitoring.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_connections: self.total_connections.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
            rejected_connections: self.rejected_connections.load(Ordering::Relaxed),
            lines_received: self.lines_received.load(Ordering::Relaxed),
            replies_sent: self.replies_sent.load(Ordering::Relaxed),
            logins_succeeded: self.logins_succeeded.load(Ordering::Relaxed),
            logins_failed: self.logins_failed.load(Ordering::Relaxed),
            commands_executed: self.commands_executed.load(Ordering::Relaxed),
            protocol_violations: self.protocol_violations.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
            uptime: self.started_at.elapsed(),
            avg_connection_duration: self.average_connection_duration(),
        }
    }

    fn average_connection_duration(&self) -> Duration {
        let closed = self
            .total_connections
            .load(Ordering::Relaxed)
            .saturating_sub(self.active_connections.load(Ordering::Relaxed));
        if closed == 0 {
            return Duration::ZERO;
        }
        let total_ns = self.total_connection_duration_ns.load(Ordering::Relaxed);
        Duration::from_nanos(total_ns / closed)
    }
}

/// A snapshot of server metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    /// Total connections since server start
    pub total_connections: u64,
    /// Current active connections
    pub active_connections: u64,
    /// Connections dropped at the connection limit
    pub rejected_connections: u64,
    /// Total lines handed to the protocol
    pub lines_received: u64,
    /// Total reply lines written
    pub replies_sent: u64,
    /// Successful logins
    pub logins_succeeded: u64,
    /// Failed logins
    pub logins_failed: u64,
    /// Commands answered
    pub commands_executed: u64,
    /// Connections closed for protocol violations
    pub protocol_violations: u64,
    /// Connections closed by transport failures
    pub transport_errors: u64,
    /// Server uptime
    pub uptime: Duration,
    /// Average duration of closed connections
    pub avg_connection_duration: Duration,
}

impl MetricsSnapshot {
    /// Calculate total error count
    pub fn total_errors(&self) -> u64 {
        self.protocol_violations + self.transport_errors
    }

    /// Calculate lines received per second
    pub fn lines_per_sec(&self) -> f64 {
        if self.uptime.is_zero() {
            return 0.0;
        }
        self.lines_received as f64 / self.uptime.as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_connection_tracking() {
        let metrics = ServerMetrics::new();

        assert_eq!(metrics.active_connections(), 0);
        assert_eq!(metrics.total_connections(), 0);

        metrics.connection_opened();
        metrics.connection_opened();
        assert_eq!(metrics.active_connections(), 2);
        assert_eq!(metrics.total_connections(), 2);

        metrics.connection_closed(Duration::from_secs(10));
        assert_eq!(metrics.active_connections(), 1);
        assert_eq!(metrics.total_connections(), 2);
        assert_eq!(metrics.snapshot().avg_connection_duration, Duration::from_secs(10));

        metrics.connection_rejected();
        assert_eq!(metrics.snapshot().rejected_connections, 1);
    }

    #[test]
    fn test_protocol_tracking() {
        let metrics = ServerMetrics::new();

        metrics.line_received();
        metrics.line_received();
        metrics.reply_sent();
        metrics.login_failed();
        metrics.login_succeeded();
        metrics.command_executed();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.lines_received, 2);
        assert_eq!(snapshot.replies_sent, 1);
        assert_eq!(snapshot.logins_failed, 1);
        assert_eq!(snapshot.logins_succeeded, 1);
        assert_eq!(snapshot.commands_executed, 1);
    }

    #[test]
    fn test_error_tracking() {
        let metrics = ServerMetrics::new();

        metrics.protocol_violation();
        metrics.transport_error();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.protocol_violations, 1);
        assert_eq!(snapshot.transport_errors, 1);
        assert_eq!(snapshot.total_errors(), 2);
    }

    #[test]
    fn test_concurrent_updates() {
        let metrics = std::sync::Arc::new(ServerMetrics::new());
        let mut handles = vec![];

        for _ in 0..10 {
            let metrics = metrics.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    metrics.connection_opened();
                    metrics.line_received();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(metrics.total_connections(), 1000);
        assert_eq!(metrics.snapshot().lines_received, 1000);
    }
}
