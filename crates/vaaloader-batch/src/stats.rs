//! Run-level counters.

use serde::Serialize;

use crate::worker::WorkerReport;

/// Totals for one completed backfill run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Lines the producer read from the file
    pub lines_read: u64,
    /// Lines workers popped and handled (equals `lines_read` on a clean run)
    pub lines_processed: u64,
    pub persisted: u64,
    pub field_parse_errors: u64,
    pub hex_decode_errors: u64,
    pub message_decode_errors: u64,
    pub upsert_errors: u64,
    pub workers: usize,
    pub elapsed_ms: u64,
}

impl RunStats {
    /// Sum worker reports into run totals.
    pub fn from_reports(lines_read: u64, reports: &[WorkerReport]) -> Self {
        let mut stats = Self {
            lines_read,
            workers: reports.len(),
            ..Self::default()
        };
        for r in reports {
            stats.lines_processed += r.lines;
            stats.persisted += r.persisted;
            stats.field_parse_errors += r.field_parse_errors;
            stats.hex_decode_errors += r.hex_decode_errors;
            stats.message_decode_errors += r.message_decode_errors;
            stats.upsert_errors += r.upsert_errors;
        }
        stats
    }

    pub fn failures(&self) -> u64 {
        self.field_parse_errors + self.hex_decode_errors + self.message_decode_errors + self.upsert_errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;

    #[test]
    fn sums_reports() {
        let mut a = WorkerReport::new(0);
        a.record(Ok(()));
        a.record(Err(FailureKind::HexDecode));
        let mut b = WorkerReport::new(1);
        b.record(Ok(()));
        b.record(Err(FailureKind::Upsert));
        b.record(Err(FailureKind::FieldParse));

        let stats = RunStats::from_reports(5, &[a, b]);
        assert_eq!(stats.lines_processed, 5);
        assert_eq!(stats.persisted, 2);
        assert_eq!(stats.failures(), 3);
        assert_eq!(stats.workers, 2);
    }

    #[test]
    fn serializes_flat() {
        let json = serde_json::to_value(RunStats::default()).unwrap();
        assert_eq!(json["lines_read"], 0);
        assert_eq!(json["upsert_errors"], 0);
    }
}
