use crate::shared::frame::FrameBuffer;

/// Supplies raw frames to the pipeline, one per tick.
///
/// The source owns each frame until it is returned; ownership then passes
/// to the caller.
pub trait FrameSource: Send {
    /// Next frame in capture order, or `None` once the source is exhausted.
    fn next_frame(&mut self) -> Option<Result<FrameBuffer, Box<dyn std::error::Error>>>;

    /// Total number of frames, when known up front.
    fn len_hint(&self) -> Option<usize> {
        None
    }
}
