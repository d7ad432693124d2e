//! Per-sweep counters and the sweep-end summary line.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

/// Counters for one sweep, or for one user's share of it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepCounts {
    pub users_scanned: usize,
    pub users_without_token: usize,
    /// Users whose order listing failed.
    pub users_failed: usize,
    pub orders_scanned: usize,
    pub malformed: usize,
    pub no_threshold: usize,
    pub already_sent: usize,
    pub dispatched: usize,
    pub invalid_token: usize,
    pub transport_failed: usize,
    pub render_failures: usize,
    pub ledger_read_failures: usize,
    pub ledger_write_failures: usize,
    /// Records that already existed when a delivered notification was marked.
    pub duplicate_records: usize,
}

impl SweepCounts {
    pub fn merge(&mut self, other: &SweepCounts) {
        self.users_scanned += other.users_scanned;
        self.users_without_token += other.users_without_token;
        self.users_failed += other.users_failed;
        self.orders_scanned += other.orders_scanned;
        self.malformed += other.malformed;
        self.no_threshold += other.no_threshold;
        self.already_sent += other.already_sent;
        self.dispatched += other.dispatched;
        self.invalid_token += other.invalid_token;
        self.transport_failed += other.transport_failed;
        self.render_failures += other.render_failures;
        self.ledger_read_failures += other.ledger_read_failures;
        self.ledger_write_failures += other.ledger_write_failures;
        self.duplicate_records += other.duplicate_records;
    }

    /// Dispatch attempts that did not end in delivery.
    pub fn failed(&self) -> usize {
        self.invalid_token + self.transport_failed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepReport {
    /// The instant thresholds were evaluated against.
    pub evaluated_at: DateTime<Utc>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(flatten)]
    pub counts: SweepCounts,
    /// Set when the sweep ended early (user listing failed).
    pub aborted: Option<String>,
}

impl SweepReport {
    pub fn is_aborted(&self) -> bool {
        self.aborted.is_some()
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }

    /// Emit the sweep-end log line.
    pub fn log(&self) {
        let c = &self.counts;
        if let Some(reason) = &self.aborted {
            warn!(
                evaluated_at = %self.evaluated_at,
                duration_ms = self.duration_ms(),
                reason = %reason,
                "Deadline sweep aborted"
            );
            return;
        }
        info!(
            evaluated_at = %self.evaluated_at,
            duration_ms = self.duration_ms(),
            users = c.users_scanned,
            users_without_token = c.users_without_token,
            users_failed = c.users_failed,
            orders = c.orders_scanned,
            dispatched = c.dispatched,
            already_sent = c.already_sent,
            no_threshold = c.no_threshold,
            malformed = c.malformed,
            failed = c.failed(),
            ledger_read_failures = c.ledger_read_failures,
            ledger_write_failures = c.ledger_write_failures,
            duplicate_records = c.duplicate_records,
            "Deadline sweep finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_adds_every_counter() {
        let mut total = SweepCounts {
            users_scanned: 1,
            dispatched: 2,
            ..Default::default()
        };
        total.merge(&SweepCounts {
            users_scanned: 1,
            dispatched: 1,
            invalid_token: 1,
            transport_failed: 2,
            duplicate_records: 1,
            ..Default::default()
        });
        assert_eq!(total.users_scanned, 2);
        assert_eq!(total.dispatched, 3);
        assert_eq!(total.failed(), 3);
        assert_eq!(total.duplicate_records, 1);
    }

    #[test]
    fn report_serializes_flat() {
        let now = Utc::now();
        let report = SweepReport {
            evaluated_at: now,
            started_at: now,
            finished_at: now,
            counts: SweepCounts {
                dispatched: 4,
                ..Default::default()
            },
            aborted: None,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["dispatched"], 4);
        assert!(json["aborted"].is_null());
        assert!(!report.is_aborted());
        assert_eq!(report.duration_ms(), 0);
    }
}
