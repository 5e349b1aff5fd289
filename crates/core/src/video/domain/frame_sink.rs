use crate::shared::frame::FrameBuffer;

/// Consumes filtered frames (display, capture, export).
pub trait FrameSink: Send {
    fn write(&mut self, frame: &FrameBuffer) -> Result<(), Box<dyn std::error::Error>>;

    /// Flushes anything buffered. Called once after the last frame.
    fn finish(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        Ok(())
    }
}
