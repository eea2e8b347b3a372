use anyhow::Result;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

/// Initialize structured logging system
///
/// The returned guard flushes the file writer on drop and must be kept alive
/// for as long as the process logs.
pub fn init_logging(log_level: Option<&str>, log_file: Option<&Path>, json: bool) -> Result<Option<WorkerGuard>> {
    // Set up environment filter
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            let level = log_level.unwrap_or("info");
            EnvFilter::try_new(level)
        })
        .map_err(|e| anyhow::anyhow!("Failed to create log filter: {}", e))?;

    // Create registry
    let registry = Registry::default().with(env_filter);

    // Add console layer
    let console_layer = if json {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .json()
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(true)
            .with_thread_ids(true)
            .boxed()
    };

    // Add file layer if log file is specified
    let guard = if let Some(log_path) = log_file {
        let directory = log_path.parent().unwrap_or_else(|| Path::new("."));
        let file_name = log_path.file_name().map_or_else(
            || "waste-sorter.log".into(),
            |name| name.to_string_lossy().into_owned(),
        );
        let file_appender = rolling::daily(directory, file_name);
        let (non_blocking_appender, guard) = non_blocking(file_appender);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking_appender)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .json();

        registry.with(console_layer).with(file_layer).try_init()?;
        Some(guard)
    } else {
        registry.with(console_layer).try_init()?;
        None
    };

    info!("Logging system initialized");
    Ok(guard)
}

/// Times one pipeline stage and logs the duration.
///
/// [`finish`](Self::finish) logs at info level; a timer dropped without
/// finishing (early return, `?`) logs at debug level instead.
pub struct OperationTimer {
    operation: &'static str,
    start: Instant,
    reported: bool,
}

impl OperationTimer {
    /// Start timing `operation`
    #[must_use]
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
            reported: false,
        }
    }

    /// Elapsed time so far
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Log completion and return the duration in milliseconds
    pub fn finish(mut self) -> u128 {
        self.reported = true;
        let duration = self.start.elapsed().as_millis();
        info!(operation = self.operation, duration_ms = duration, "Operation completed");
        duration
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        if !self.reported && !std::thread::panicking() {
            debug!(
                operation = self.operation,
                duration_ms = self.start.elapsed().as_millis(),
                "Operation ended early"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_measures_elapsed() {
        let timer = OperationTimer::new("test");
        std::thread::sleep(Duration::from_millis(5));
        assert!(timer.elapsed() >= Duration::from_millis(5));
        assert!(timer.finish() >= 5);
    }
}
