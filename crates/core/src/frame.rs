//! Raster frames and their grid partition.
//!
//! A [`Frame`] is a packed `height × width × channels` pixel buffer.
//! [`FrameGrid`] divides a frame into `rows × cols` rectangular blocks,
//! indexed row-major, which are the protocol's unit of independent
//! compression: losing datagrams for one block never affects the pixels
//! of any other block.
//!
//! ## Edge blocks
//!
//! The nominal block extent is `ceil(height/rows) × ceil(width/cols)`.
//! When the frame dimensions do not divide evenly, blocks in the last
//! row/column are *clamped* to the frame boundary and are smaller than
//! nominal. Nothing is padded and nothing outside the frame is ever
//! transmitted. Both sides derive the same rectangles from the shared
//! [`StreamConfig`](crate::StreamConfig), so extents never need to be
//! carried on the wire. Geometries whose partition would clamp a whole
//! row or column of blocks down to zero extent are rejected by
//! [`StreamConfig::validate`](crate::StreamConfig::validate).

use crate::error::{Result, StreamError};

/// Frame geometry as `(height, width, channels)`.
pub type Shape = (usize, usize, usize);

/// A packed, row-major raster image.
///
/// Sample layout is interleaved: the pixel at `(y, x)` starts at
/// `(y * width + x) * channels`. Blocks produced by [`FrameGrid::split`]
/// are themselves `Frame`s with their own (smaller) shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    height: usize,
    width: usize,
    channels: usize,
    data: Vec<u8>,
}

impl Frame {
    /// Wrap an existing pixel buffer. Fails if the buffer length does
    /// not equal `height * width * channels`.
    pub fn new(data: Vec<u8>, shape: Shape) -> Result<Self> {
        let (height, width, channels) = shape;
        if data.len() != height * width * channels {
            return Err(StreamError::BufferLength {
                len: data.len(),
                shape,
            });
        }
        Ok(Self {
            height,
            width,
            channels,
            data,
        })
    }

    /// An all-zero (black) frame of the given shape.
    pub fn zeros(shape: Shape) -> Self {
        let (height, width, channels) = shape;
        Self {
            height,
            width,
            channels,
            data: vec![0u8; height * width * channels],
        }
    }

    /// `(height, width, channels)` of this frame.
    pub fn shape(&self) -> Shape {
        (self.height, self.width, self.channels)
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Whether the frame holds no pixels at all.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The packed pixel buffer.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consume the frame, returning its pixel buffer.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Byte range of the pixel row `y`, columns `[x, x + w)`.
    fn row_range(&self, y: usize, x: usize, w: usize) -> std::ops::Range<usize> {
        let start = (y * self.width + x) * self.channels;
        start..start + w * self.channels
    }
}

/// A pixel rectangle within a frame: origin `(y, x)`, extent `(h, w)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRect {
    pub y: usize,
    pub x: usize,
    pub h: usize,
    pub w: usize,
}

/// The fixed `rows × cols` partition of a frame into blocks.
///
/// Blocks are indexed `0..rows*cols` in row-major order. The partition
/// is purely geometric and deterministic: the same shape and grid always
/// produce identical rectangles, on both ends of the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGrid {
    rows: usize,
    cols: usize,
}

impl FrameGrid {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Total number of blocks in the partition.
    pub fn block_count(&self) -> usize {
        self.rows * self.cols
    }

    /// Nominal block extent `(ceil(h/rows), ceil(w/cols))`.
    pub fn nominal_block_size(&self, shape: Shape) -> (usize, usize) {
        let (height, width, _) = shape;
        (height.div_ceil(self.rows), width.div_ceil(self.cols))
    }

    /// The clamped pixel rectangle of block `index` within a frame of
    /// the given shape, or `None` when the index is out of range.
    ///
    /// Edge blocks are clamped to the frame boundary (see module docs).
    pub fn block_rect(&self, index: usize, shape: Shape) -> Option<BlockRect> {
        if index >= self.block_count() {
            return None;
        }
        let (height, width, _) = shape;
        let (bh, bw) = self.nominal_block_size(shape);
        let row = index / self.cols;
        let col = index % self.cols;
        let y = row * bh;
        let x = col * bw;
        Some(BlockRect {
            y,
            x,
            h: bh.min(height.saturating_sub(y)),
            w: bw.min(width.saturating_sub(x)),
        })
    }

    /// The shape `(h, w, channels)` block `index` has for frames of the
    /// given shape.
    pub fn block_shape(&self, index: usize, shape: Shape) -> Option<Shape> {
        let rect = self.block_rect(index, shape)?;
        Some((rect.h, rect.w, shape.2))
    }

    /// Split a frame into its row-major block sequence.
    ///
    /// Each returned block owns a copy of its pixels; the source frame
    /// is untouched.
    pub fn split(&self, frame: &Frame) -> Vec<Frame> {
        let shape = frame.shape();
        let channels = frame.channels();
        let mut blocks = Vec::with_capacity(self.block_count());

        for index in 0..self.block_count() {
            // index < block_count, rect always present
            let rect = self.block_rect(index, shape).unwrap_or(BlockRect {
                y: 0,
                x: 0,
                h: 0,
                w: 0,
            });
            let mut data = Vec::with_capacity(rect.h * rect.w * channels);
            for dy in 0..rect.h {
                data.extend_from_slice(&frame.data[frame.row_range(rect.y + dy, rect.x, rect.w)]);
            }
            blocks.push(Frame {
                height: rect.h,
                width: rect.w,
                channels,
                data,
            });
        }
        blocks
    }

    /// Write blocks into `frame` at their row-major grid offsets.
    ///
    /// A block whose shape does not match its rectangle is skipped and
    /// the destination pixels keep their previous content; the caller
    /// decides what those previous pixels are (the receiver hands in its
    /// cached output frame, so skipped slots show stale rather than
    /// corrupt data). Missing trailing blocks are likewise left alone.
    pub fn join_into(&self, blocks: &[Frame], frame: &mut Frame) {
        let shape = frame.shape();
        for (index, block) in blocks.iter().enumerate().take(self.block_count()) {
            let Some(rect) = self.block_rect(index, shape) else {
                break;
            };
            if block.shape() != (rect.h, rect.w, shape.2) {
                tracing::debug!(
                    block = index,
                    expected = ?(rect.h, rect.w, shape.2),
                    actual = ?block.shape(),
                    "block shape does not fit its grid slot, keeping previous pixels"
                );
                continue;
            }
            for dy in 0..rect.h {
                let dst = frame.row_range(rect.y + dy, rect.x, rect.w);
                let src = block.row_range(dy, 0, rect.w);
                frame.data[dst].copy_from_slice(&block.data[src]);
            }
        }
    }

    /// Assemble a fresh frame from blocks, starting from black pixels.
    pub fn join(&self, blocks: &[Frame], shape: Shape) -> Frame {
        let mut frame = Frame::zeros(shape);
        self.join_into(blocks, &mut frame);
        frame
    }
}
