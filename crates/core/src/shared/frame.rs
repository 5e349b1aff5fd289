use ndarray::{s, ArrayView3, ArrayViewMut3};

/// Bytes per pixel. Frames are always RGBA8.
pub const CHANNELS: usize = 4;

/// A single frame: contiguous RGBA bytes in row-major order.
///
/// Alpha is 255 for opaque video. A frame is owned by exactly one pipeline
/// stage at a time; stages hand it on by value or lend it as `&mut`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
    index: usize,
}

impl FrameBuffer {
    pub fn new(data: Vec<u8>, width: u32, height: u32, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            byte_len(width, height),
            "data length must equal width * height * 4"
        );
        Self {
            data,
            width,
            height,
            index,
        }
    }

    /// Frame of the given size with every pixel set to `rgba`.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = (width as usize) * (height as usize);
        let mut data = Vec::with_capacity(pixels * CHANNELS);
        for _ in 0..pixels {
            data.extend_from_slice(&rgba);
        }
        Self::new(data, width, height, 0)
    }

    /// Zeroed scratch surface of the given size.
    pub fn blank(width: u32, height: u32) -> Self {
        Self::new(vec![0; byte_len(width, height)], width, height, 0)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// RGBA value at column `x`, row `y`.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y as usize) * (self.width as usize) + x as usize) * CHANNELS;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    /// Overwrites this frame's pixels with `other`'s.
    ///
    /// Panics if the dimensions differ: the compositor never crops or
    /// stretches, so a mismatch is a caller bug.
    pub fn copy_from(&mut self, other: &FrameBuffer) {
        assert_eq!(
            self.dimensions(),
            other.dimensions(),
            "frame dimensions must match for copy"
        );
        self.data.copy_from_slice(&other.data);
    }

    /// Resizes to `width x height`, discarding contents.
    pub fn reallocate(&mut self, width: u32, height: u32) {
        self.data.clear();
        self.data.resize(byte_len(width, height), 0);
        self.width = width;
        self.height = height;
    }

    /// Drops the pixel storage, leaving a 0x0 frame.
    pub fn release(&mut self) {
        self.data = Vec::new();
        self.width = 0;
        self.height = 0;
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    pub fn as_ndarray_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        ArrayViewMut3::from_shape(self.shape(), &mut self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Mean value of each color channel over the whole frame.
    pub fn mean_color(&self) -> [f64; 3] {
        if self.data.is_empty() {
            return [0.0; 3];
        }
        let view = self.as_ndarray();
        let mut means = [0.0; 3];
        for (c, mean) in means.iter_mut().enumerate() {
            let channel = view.slice(s![.., .., c]);
            let sum: f64 = channel.iter().map(|&v| v as f64).sum();
            *mean = sum / channel.len() as f64;
        }
        means
    }

    fn shape(&self) -> (usize, usize, usize) {
        (self.height as usize, self.width as usize, CHANNELS)
    }
}

pub fn byte_len(width: u32, height: u32) -> usize {
    (width as usize) * (height as usize) * CHANNELS
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 16]; // 2x2x4
        let frame = FrameBuffer::new(data.clone(), 2, 2, 5);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.index(), 5);
        assert_eq!(frame.data(), &data[..]);
    }

    #[test]
    fn test_filled_sets_every_pixel() {
        let frame = FrameBuffer::filled(3, 2, [255, 0, 0, 255]);
        for y in 0..2 {
            for x in 0..3 {
                assert_eq!(frame.pixel(x, y), [255, 0, 0, 255]);
            }
        }
    }

    #[test]
    fn test_clone_is_independent() {
        let frame = FrameBuffer::filled(2, 2, [100, 100, 100, 255]);
        let mut cloned = frame.clone();
        cloned.data_mut()[0] = 0;
        assert_eq!(frame.data()[0], 100);
        assert_eq!(cloned.data()[0], 0);
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * 4")]
    fn test_mismatched_data_length_panics_in_debug() {
        FrameBuffer::new(vec![0u8; 10], 2, 2, 0);
    }

    #[test]
    fn test_copy_from_same_size() {
        let src = FrameBuffer::filled(2, 2, [1, 2, 3, 255]);
        let mut dst = FrameBuffer::blank(2, 2);
        dst.copy_from(&src);
        assert_eq!(dst.data(), src.data());
    }

    #[test]
    #[should_panic(expected = "frame dimensions must match for copy")]
    fn test_copy_from_mismatched_panics() {
        let src = FrameBuffer::filled(2, 2, [1, 2, 3, 255]);
        let mut dst = FrameBuffer::blank(3, 2);
        dst.copy_from(&src);
    }

    #[test]
    fn test_reallocate_and_release() {
        let mut frame = FrameBuffer::blank(2, 2);
        frame.reallocate(4, 3);
        assert_eq!(frame.dimensions(), (4, 3));
        assert_eq!(frame.data().len(), 48);
        frame.release();
        assert!(frame.is_empty());
        assert_eq!(frame.dimensions(), (0, 0));
    }

    #[test]
    fn test_as_ndarray_shape() {
        let frame = FrameBuffer::blank(4, 2);
        assert_eq!(frame.as_ndarray().shape(), &[2, 4, 4]); // (height, width, channels)
    }

    #[test]
    fn test_as_ndarray_mut_modification() {
        let mut frame = FrameBuffer::blank(2, 2);
        {
            let mut arr = frame.as_ndarray_mut();
            arr[[1, 0, 2]] = 128; // row=1, col=0, B channel
        }
        assert_eq!(frame.pixel(0, 1)[2], 128);
    }

    #[test]
    fn test_mean_color() {
        let mut frame = FrameBuffer::filled(2, 1, [0, 100, 200, 255]);
        frame.data_mut()[0] = 50;
        let mean = frame.mean_color();
        assert_relative_eq!(mean[0], 25.0);
        assert_relative_eq!(mean[1], 100.0);
        assert_relative_eq!(mean[2], 200.0);
    }

    #[test]
    fn test_mean_color_of_empty_frame() {
        let mut frame = FrameBuffer::blank(1, 1);
        frame.release();
        assert_eq!(frame.mean_color(), [0.0; 3]);
    }
}
