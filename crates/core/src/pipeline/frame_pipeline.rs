use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::compositing::filter_chain::FilterChain;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::video::domain::frame_sink::FrameSink;
use crate::video::domain::frame_source::FrameSource;

/// Explicit per-tick driver: source → filter chain → sink.
///
/// Holds no timer or loop of its own beyond [`run`](Self::run); an external
/// scheduler can call [`tick`](Self::tick) once per display or capture
/// opportunity instead. Each tick runs to completion, so cancellation is only
/// observed between frames and a partially composited frame never reaches
/// the sink.
pub struct FramePipeline {
    source: Box<dyn FrameSource>,
    chain: FilterChain,
    sink: Box<dyn FrameSink>,
    logger: Box<dyn PipelineLogger>,
    cancelled: Arc<AtomicBool>,
    processed: usize,
}

impl FramePipeline {
    pub fn new(
        source: Box<dyn FrameSource>,
        chain: FilterChain,
        sink: Box<dyn FrameSink>,
        logger: Box<dyn PipelineLogger>,
        cancelled: Option<Arc<AtomicBool>>,
    ) -> Self {
        Self {
            source,
            chain,
            sink,
            logger,
            cancelled: cancelled.unwrap_or_else(|| Arc::new(AtomicBool::new(false))),
            processed: 0,
        }
    }

    pub fn chain(&self) -> &FilterChain {
        &self.chain
    }

    pub fn processed(&self) -> usize {
        self.processed
    }

    /// Processes one frame. Returns `false` once the source is exhausted.
    pub fn tick(&mut self) -> Result<bool, Box<dyn std::error::Error>> {
        let mut frame = match self.source.next_frame() {
            Some(frame) => frame?,
            None => return Ok(false),
        };

        let (width, height) = frame.dimensions();
        if self.chain.dimensions() != (width, height) {
            let (old_w, old_h) = self.chain.dimensions();
            self.logger.info(&format!(
                "Frame size changed {old_w}x{old_h} -> {width}x{height}, rebuilding filters"
            ));
            self.chain.resize(width, height)?;
        }

        let t0 = Instant::now();
        self.chain.apply_all(&mut frame)?;
        self.logger
            .timing("composite", t0.elapsed().as_secs_f64() * 1000.0);
        self.logger
            .metric("active_filters", self.chain.active_kinds().len() as f64);

        let t1 = Instant::now();
        self.sink.write(&frame)?;
        self.logger
            .timing("write", t1.elapsed().as_secs_f64() * 1000.0);

        self.processed += 1;
        let total = self.source.len_hint().unwrap_or(self.processed);
        self.logger.progress(self.processed, total);
        Ok(true)
    }

    /// Ticks until the source is exhausted or cancellation is requested.
    /// Returns the number of frames processed.
    pub fn run(&mut self) -> Result<usize, Box<dyn std::error::Error>> {
        while !self.cancelled.load(Ordering::Relaxed) {
            if !self.tick()? {
                break;
            }
        }
        if self.cancelled.load(Ordering::Relaxed) {
            self.logger
                .info(&format!("Cancelled after {} frame(s)", self.processed));
        }
        self.sink.finish()?;
        Ok(self.processed)
    }

    /// Releases the chain's resources and emits the logger summary.
    pub fn finish(mut self) -> usize {
        self.chain.dispose();
        self.logger.summary();
        self.processed
    }
}
