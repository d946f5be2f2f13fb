//! Timing instrumentation for backend handlers.
//!
//! Handlers record the elapsed wall-clock time of every read, write, and
//! destroy against a named counter. Recording is an observability side
//! effect only: the recorder API is infallible by construction, so a broken
//! sink can never change a handler's return value.

use std::time::{Duration, Instant};

/// Metric counter names, one per handler kind and operation.
pub mod names {
    pub const SQL_READ_TIME: &str = "sql/session_read_time";
    pub const SQL_WRITE_TIME: &str = "sql/session_write_time";
    pub const SQL_DELETE_TIME: &str = "sql/session_delete_time";

    pub const CACHE_READ_TIME: &str = "cache/session_read_time";
    pub const CACHE_WRITE_TIME: &str = "cache/session_write_time";
    pub const CACHE_DELETE_TIME: &str = "cache/session_delete_time";
}

/// Sink for handler timing samples.
pub trait MetricsRecorder: Send + Sync {
    /// Record one elapsed-time sample against a named counter.
    fn record_duration(&self, metric: &'static str, elapsed: Duration);
}

/// Default recorder that emits timing samples as `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRecorder;

impl MetricsRecorder for TracingRecorder {
    fn record_duration(&self, metric: &'static str, elapsed: Duration) {
        tracing::debug!(
            target: "satchel::metrics",
            metric,
            elapsed_us = elapsed.as_micros() as u64,
            "session handler timing"
        );
    }
}

/// Recorder that drops all samples.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRecorder;

impl MetricsRecorder for NullRecorder {
    fn record_duration(&self, _metric: &'static str, _elapsed: Duration) {}
}

/// Run `f`, recording its wall-clock duration under `metric`.
pub fn timed<T>(
    recorder: &dyn MetricsRecorder,
    metric: &'static str,
    f: impl FnOnce() -> T,
) -> T {
    let start = Instant::now();
    let result = f();
    recorder.record_duration(metric, start.elapsed());
    result
}


#[cfg(test)]
mod tests {
    use super::test_support::CapturingRecorder;
    use super::*;

    #[test]
    fn test_timed_returns_closure_result() {
        let recorder = NullRecorder;
        let value = timed(&recorder, names::SQL_READ_TIME, || 42);
        assert_eq!(value, 42);
    }

    #[test]
    fn test_timed_records_sample() {
        let recorder = CapturingRecorder::new();
        timed(&recorder, names::CACHE_WRITE_TIME, || ());
        assert_eq!(recorder.recorded(), vec![names::CACHE_WRITE_TIME]);
    }

    #[test]
    fn test_timed_records_even_on_error_result() {
        let recorder = CapturingRecorder::new();
        let result: Result<(), &str> = timed(&recorder, names::SQL_DELETE_TIME, || Err("boom"));
        assert!(result.is_err());
        assert_eq!(recorder.count_for(names::SQL_DELETE_TIME), 1);
    }

    #[test]
    fn test_tracing_recorder_is_infallible() {
        // No subscriber installed; recording must still be a no-op success.
        TracingRecorder.record_duration(names::CACHE_READ_TIME, Duration::from_micros(5));
    }
}
