use std::collections::HashMap;
use std::time::Instant;

/// One display refresh at 60 Hz.
pub const REALTIME_FRAME_BUDGET_MS: f64 = 1000.0 / 60.0;

/// Observer for per-frame pipeline events.
///
/// Keeps the frame driver independent of where progress and timings end up
/// (the `log` facade, a UI, nowhere).
pub trait PipelineLogger: Send {
    /// Report frame-level progress.
    fn progress(&mut self, current: usize, total: usize);

    /// Record how long a named stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. number of active filters).
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// CLI logger: records per-stage timings and metrics and logs a summary
/// when the run ends, including how many composites overran the real-time
/// frame budget.
///
/// Progress lines are throttled to one every `throttle_frames` frames.
pub struct StdoutPipelineLogger {
    throttle_frames: usize,
    frame_budget_ms: f64,
    timings: HashMap<String, Vec<f64>>,
    metrics: HashMap<String, Vec<f64>>,
    start_time: Instant,
    total_frames: usize,
    messages: Vec<String>,
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

impl StdoutPipelineLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            frame_budget_ms: REALTIME_FRAME_BUDGET_MS,
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
            total_frames: 0,
            messages: Vec::new(),
        }
    }

    pub fn with_frame_budget(mut self, budget_ms: f64) -> Self {
        self.frame_budget_ms = budget_ms;
        self
    }

    /// Number of `composite` timings above the frame budget.
    pub fn frames_over_budget(&self) -> usize {
        self.timings_for("composite")
            .map(|t| t.iter().filter(|&&ms| ms > self.frame_budget_ms).count())
            .unwrap_or(0)
    }

    /// Returns the formatted summary string, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let frames = self.total_frames;
        let mut lines = vec![format!(
            "Filter summary ({frames} frames, {:.1}s total):",
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &self.timings[stage];
            let avg_ms = mean(durations);
            let max_ms = durations.iter().cloned().fold(0.0, f64::max);
            lines.push(format!(
                "  {stage:10}: avg {avg_ms:6.2}ms  max {max_ms:6.2}ms"
            ));
        }

        let mut metric_names: Vec<_> = self.metrics.keys().collect();
        metric_names.sort();
        for name in metric_names {
            lines.push(format!("  {name}: avg {:.1}", mean(&self.metrics[name])));
        }

        if self.timings.contains_key("composite") {
            lines.push(format!(
                "  Over {:.1}ms budget: {} frame(s)",
                self.frame_budget_ms,
                self.frames_over_budget()
            ));
        }

        if frames > 0 && elapsed_ms > 0.0 {
            let fps = frames as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    pub fn metrics_for(&self, name: &str) -> Option<&[f64]> {
        self.metrics.get(name).map(|v| v.as_slice())
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(10)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.total_frames = total;
        if total > 0 && (current % self.throttle_frames == 0 || current == total) {
            let pct = current as f64 / total as f64 * 100.0;
            log::info!("Filtered {current}/{total} frames ({pct:.1}%)");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .push(value);
    }

    fn info(&mut self, message: &str) {
        self.messages.push(message.to_string());
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_null_logger_all_methods_are_noop() {
        let mut logger = NullPipelineLogger;
        logger.progress(1, 10);
        logger.timing("composite", 5.0);
        logger.metric("active_filters", 3.0);
        logger.info("hello");
        logger.summary();
    }

    #[test]
    fn test_timing_records_values() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.timing("composite", 20.0);
        logger.timing("composite", 30.0);
        logger.timing("write", 5.0);

        let composite = logger.timings_for("composite").unwrap();
        assert_eq!(composite, &[20.0, 30.0]);
        assert_eq!(logger.timings_for("write").unwrap().len(), 1);
        assert!(logger.timings_for("read").is_none());
    }

    #[test]
    fn test_metric_average() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.metric("active_filters", 3.0);
        logger.metric("active_filters", 4.0);
        assert_relative_eq!(mean(logger.metrics_for("active_filters").unwrap()), 3.5);
    }

    #[test]
    fn test_summary_lists_stages_and_metrics() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.total_frames = 10;
        logger.timing("composite", 2.0);
        logger.timing("write", 5.0);
        logger.metric("active_filters", 2.0);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("Filter summary"));
        assert!(summary.contains("composite"));
        assert!(summary.contains("write"));
        assert!(summary.contains("active_filters: avg 2.0"));
        assert!(summary.contains("fps"));
    }

    #[test]
    fn test_frames_over_budget() {
        let mut logger = StdoutPipelineLogger::new(10).with_frame_budget(10.0);
        for ms in [4.0, 12.0, 9.9, 30.0] {
            logger.timing("composite", ms);
        }
        logger.timing("write", 50.0);
        assert_eq!(logger.frames_over_budget(), 2);
        assert!(logger
            .summary_string()
            .unwrap()
            .contains("Over 10.0ms budget: 2 frame(s)"));
    }

    #[test]
    fn test_default_budget_is_one_refresh() {
        let logger = StdoutPipelineLogger::default();
        assert_relative_eq!(logger.frame_budget_ms, 16.666, epsilon = 1e-2);
        assert_eq!(logger.throttle_frames, 10);
    }

    #[test]
    fn test_empty_summary_returns_none() {
        let logger = StdoutPipelineLogger::new(10);
        assert!(logger.summary_string().is_none());
    }

    #[test]
    fn test_progress_tracks_total() {
        let mut logger = StdoutPipelineLogger::new(0);
        for i in 1..=20 {
            logger.progress(i, 20);
        }
        assert_eq!(logger.total_frames, 20);
        assert_eq!(logger.throttle_frames, 1);
    }

    #[test]
    fn test_info_stores_messages() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.info("frame size changed");
        assert_eq!(logger.messages, vec!["frame size changed".to_string()]);
    }
}
