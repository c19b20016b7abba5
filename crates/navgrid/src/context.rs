//! Build context for bake operations providing logging, stage timing, and progress tracking
//!
//! Every message recorded here is also forwarded to the `log` facade, so hosts
//! that only install a logger still see bake warnings, while tools that want to
//! inspect a finished bake can read them back from the context.

use std::collections::HashMap;
use std::time::Duration;
use web_time::Instant;

/// Log level for context messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Debug level messages
    Debug = 0,
    /// Informational messages
    Info = 1,
    /// Warning messages
    Warning = 2,
    /// Error messages
    Error = 3,
}

/// Bake stages that are timed individually
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BakeStage {
    /// The whole bake
    Total,
    /// Obstacle rasterization
    Rasterization,
    /// Agent radius inflation
    Inflation,
    /// Region labeling
    Regions,
    /// Contour tracing
    Contours,
    /// Polyline simplification
    Simplification,
    /// Ear clipping
    Triangulation,
    /// Delaunay edge flipping
    Delaunay,
    /// Convex polygon merging
    Merge,
    /// Neighbor graph construction
    Adjacency,
}

/// Progress information for long-running operations
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Current step number
    pub current: usize,
    /// Total number of steps
    pub total: usize,
    /// Description of current operation
    pub description: String,
}

/// Log entry containing message and metadata
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Log level
    pub level: LogLevel,
    /// Timestamp when log was created
    pub timestamp: Instant,
    /// Log message
    pub message: String,
    /// Optional category for grouping logs
    pub category: Option<String>,
}

/// Accumulated timing for one stage
#[derive(Debug, Clone, Copy, Default)]
pub struct StageTiming {
    /// Total time spent in the stage
    pub duration: Duration,
    /// Number of times the stage ran
    pub count: usize,
}

/// Context for bake operations
#[derive(Debug)]
pub struct BuildContext {
    logs: Vec<LogEntry>,
    active_timers: HashMap<BakeStage, Instant>,
    timers: HashMap<BakeStage, StageTiming>,
    progress: Option<ProgressInfo>,
    min_log_level: LogLevel,
    enable_timing: bool,
    max_log_entries: usize,
}

impl Default for BuildContext {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildContext {
    /// Creates a new build context with default settings
    pub fn new() -> Self {
        Self {
            logs: Vec::new(),
            active_timers: HashMap::new(),
            timers: HashMap::new(),
            progress: None,
            min_log_level: LogLevel::Info,
            enable_timing: true,
            max_log_entries: 1000,
        }
    }

    /// Sets the minimum log level recorded in the context
    pub fn set_log_level(&mut self, level: LogLevel) {
        self.min_log_level = level;
    }

    /// Enables or disables stage timing
    pub fn set_timing_enabled(&mut self, enabled: bool) {
        self.enable_timing = enabled;
    }

    /// Sets the maximum number of log entries to keep
    pub fn set_max_log_entries(&mut self, max_entries: usize) {
        self.max_log_entries = max_entries;
    }

    /// Logs a debug message
    pub fn log_debug(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message.into(), None);
    }

    /// Logs an info message
    pub fn log_info(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Info, message.into(), None);
    }

    /// Logs a warning message
    pub fn log_warning(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message.into(), None);
    }

    /// Logs a warning message with category
    pub fn log_warning_with_category(
        &mut self,
        message: impl Into<String>,
        category: impl Into<String>,
    ) {
        self.log(LogLevel::Warning, message.into(), Some(category.into()));
    }

    /// Logs an error message
    pub fn log_error(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Error, message.into(), None);
    }

    fn log(&mut self, level: LogLevel, message: String, category: Option<String>) {
        let target = category.as_deref().unwrap_or("navgrid");
        match level {
            LogLevel::Debug => log::debug!(target: "navgrid", "[{}] {}", target, message),
            LogLevel::Info => log::info!(target: "navgrid", "[{}] {}", target, message),
            LogLevel::Warning => log::warn!(target: "navgrid", "[{}] {}", target, message),
            LogLevel::Error => log::error!(target: "navgrid", "[{}] {}", target, message),
        }

        if level < self.min_log_level {
            return;
        }

        self.logs.push(LogEntry {
            level,
            timestamp: Instant::now(),
            message,
            category,
        });

        // Trim logs if we exceed the maximum
        if self.logs.len() > self.max_log_entries {
            self.logs.remove(0);
        }
    }

    /// Starts a timer for the given stage
    pub fn start_timer(&mut self, stage: BakeStage) {
        if self.enable_timing {
            self.active_timers.insert(stage, Instant::now());
        }
    }

    /// Stops a timer and records the duration
    pub fn stop_timer(&mut self, stage: BakeStage) {
        if !self.enable_timing {
            return;
        }
        if let Some(start_time) = self.active_timers.remove(&stage) {
            let entry = self.timers.entry(stage).or_default();
            entry.duration += start_time.elapsed();
            entry.count += 1;
        }
    }

    /// Runs `f` while timing it under `stage`
    pub fn timed<T>(&mut self, stage: BakeStage, f: impl FnOnce(&mut Self) -> T) -> T {
        self.start_timer(stage);
        let result = f(self);
        self.stop_timer(stage);
        result
    }

    /// Gets the total duration for a completed timer
    pub fn get_timer_duration(&self, stage: BakeStage) -> Option<Duration> {
        self.timers.get(&stage).map(|t| t.duration)
    }

    /// Gets how many times a stage was timed
    pub fn get_timer_count(&self, stage: BakeStage) -> usize {
        self.timers.get(&stage).map(|t| t.count).unwrap_or(0)
    }

    /// Updates progress information
    pub fn set_progress(&mut self, current: usize, total: usize, description: impl Into<String>) {
        self.progress = Some(ProgressInfo {
            current,
            total,
            description: description.into(),
        });
    }

    /// Clears progress information
    pub fn clear_progress(&mut self) {
        self.progress = None;
    }

    /// Gets current progress information
    pub fn get_progress(&self) -> Option<&ProgressInfo> {
        self.progress.as_ref()
    }

    /// Gets all log entries
    pub fn get_logs(&self) -> &[LogEntry] {
        &self.logs
    }

    /// Gets log entries for a specific level
    pub fn get_logs_by_level(&self, level: LogLevel) -> Vec<&LogEntry> {
        self.logs.iter().filter(|entry| entry.level == level).collect()
    }

    /// Gets the recorded warnings
    pub fn warnings(&self) -> Vec<&LogEntry> {
        self.get_logs_by_level(LogLevel::Warning)
    }

    /// Resets the context (clears logs, timers, and progress)
    pub fn reset(&mut self) {
        self.logs.clear();
        self.active_timers.clear();
        self.timers.clear();
        self.progress = None;
    }

    /// Formats a summary of stage timers, slowest first
    pub fn timer_summary(&self) -> String {
        let mut sorted: Vec<_> = self.timers.iter().collect();
        sorted.sort_by(|a, b| b.1.duration.cmp(&a.1.duration));

        let mut out = String::from("=== Bake Performance Summary ===\n");
        for (stage, timing) in sorted {
            out.push_str(&format!(
                "{:16} {:8.2}ms ({} calls)\n",
                format!("{:?}", stage),
                timing.duration.as_secs_f64() * 1000.0,
                timing.count
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_creation() {
        let context = BuildContext::new();
        assert!(context.get_logs().is_empty());
        assert!(context.timers.is_empty());
        assert!(context.get_progress().is_none());
    }

    #[test]
    fn test_log_level_filtering() {
        let mut context = BuildContext::new();
        context.set_log_level(LogLevel::Warning);

        context.log_debug("Debug message");
        context.log_info("Info message");
        context.log_warning("Warning message");
        context.log_error("Error message");

        assert_eq!(context.get_logs().len(), 2);
        assert_eq!(context.get_logs()[0].level, LogLevel::Warning);
        assert_eq!(context.get_logs()[1].level, LogLevel::Error);
        assert_eq!(context.warnings().len(), 1);
    }

    #[test]
    fn test_warning_category() {
        let mut context = BuildContext::new();
        context.log_warning_with_category("too many regions", "regions");
        let warnings = context.warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].category.as_deref(), Some("regions"));
    }

    #[test]
    fn test_timed_stage_accumulates() {
        let mut context = BuildContext::new();
        for _ in 0..3 {
            let value = context.timed(BakeStage::Contours, |_| 7);
            assert_eq!(value, 7);
        }
        assert_eq!(context.get_timer_count(BakeStage::Contours), 3);
        assert!(context.get_timer_duration(BakeStage::Contours).is_some());
        assert!(context.timer_summary().contains("Contours"));
    }

    #[test]
    fn test_timing_disabled() {
        let mut context = BuildContext::new();
        context.set_timing_enabled(false);
        context.timed(BakeStage::Total, |_| ());
        assert_eq!(context.get_timer_count(BakeStage::Total), 0);
    }

    #[test]
    fn test_max_log_entries() {
        let mut context = BuildContext::new();
        context.set_max_log_entries(3);
        for i in 0..5 {
            context.log_info(format!("Message {}", i));
        }
        assert_eq!(context.get_logs().len(), 3);
        assert_eq!(context.get_logs()[2].message, "Message 4");
    }

    #[test]
    fn test_reset() {
        let mut context = BuildContext::new();
        context.log_info("Test message");
        context.timed(BakeStage::Total, |_| ());
        context.set_progress(1, 2, "Test progress");
        context.reset();
        assert!(context.get_logs().is_empty());
        assert!(context.timers.is_empty());
        assert!(context.get_progress().is_none());
    }
}
