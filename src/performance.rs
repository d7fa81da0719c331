use std::time::{Duration, Instant};

/// Timing instrumentation for table construction and batch processing.
/// Wraps an expression and logs its duration at debug level when slow.
#[cfg(debug_assertions)]
macro_rules! time_operation {
    ($operation:expr, $name:expr) => {{
        let start = std::time::Instant::now();
        let result = $operation;
        let duration = start.elapsed();
        if duration.as_millis() > 10 {
            log::debug!("⏱️ {} took {:.3}ms", $name, duration.as_secs_f64() * 1000.0);
        }
        result
    }};
}

#[cfg(not(debug_assertions))]
macro_rules! time_operation {
    ($operation:expr, $name:expr) => {{
        $operation
    }};
}

pub(crate) use time_operation;

/// Tracks the elapsed time of a multi-step operation
pub struct PerformanceTracker {
    operation: String,
    start: Instant,
}

impl PerformanceTracker {
    pub fn start(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn finish(self) -> Duration {
        let duration = self.start.elapsed();
        log::debug!("⏱️ {} completed in {:.3}ms", self.operation, duration.as_secs_f64() * 1000.0);
        duration
    }

    pub fn checkpoint(&self, checkpoint_name: &str) {
        let duration = self.start.elapsed();
        log::trace!("⏱️ {} - {} at {:.3}ms", self.operation, checkpoint_name, duration.as_secs_f64() * 1000.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_performance_tracker_creation() {
        let tracker = PerformanceTracker::start("build_feature_table");
        assert_eq!(tracker.operation, "build_feature_table");
        assert!(tracker.start <= Instant::now());
    }

    #[test]
    fn test_performance_tracker_finish() {
        let tracker = PerformanceTracker::start("batch");

        thread::sleep(Duration::from_millis(1));

        let duration = tracker.finish();
        assert!(duration.as_millis() >= 1);
    }

    #[test]
    fn test_performance_tracker_checkpoints() {
        let tracker = PerformanceTracker::start("batch");

        thread::sleep(Duration::from_millis(1));
        tracker.checkpoint("ranked");

        thread::sleep(Duration::from_millis(1));
        tracker.checkpoint("emitted");

        let duration = tracker.finish();
        assert!(duration.as_millis() >= 2);
    }

    #[test]
    fn test_time_operation_macro() {
        let result = time_operation!({
            thread::sleep(Duration::from_millis(1));
            42
        }, "test_macro");

        assert_eq!(result, 42);
    }

    #[test]
    fn test_time_operation_macro_with_error() {
        let result: Result<i32, &str> = time_operation!({
            Err("test error")
        }, "test_macro_error");

        assert_eq!(result.unwrap_err(), "test error");
    }
}
