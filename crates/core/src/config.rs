use crate::error::{Result, StreamError};
use crate::frame::{FrameGrid, Shape};
use crate::protocol::HEADER_SIZE;

/// Default datagram buffer size in bytes (header + payload).
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Default JPEG quality for block compression (1–100).
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Stream session parameters shared by sender and receiver.
///
/// The protocol has no handshake: both ends must be constructed with the
/// same frame shape and grid geometry, agreed out of band. The buffer
/// size bounds every datagram (positional header included); redundancy
/// is the number of times the sender transmits each datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    /// Frame height in pixels.
    pub height: usize,
    /// Frame width in pixels.
    pub width: usize,
    /// Samples per pixel: 3 (RGB) or 1 (grayscale).
    pub channels: usize,
    /// Number of block rows in the grid partition.
    pub grid_rows: usize,
    /// Number of block columns in the grid partition.
    pub grid_cols: usize,
    /// Maximum datagram size in bytes, header included.
    pub buffer_size: usize,
    /// Times each datagram is transmitted (≥ 1). UDP is fire-and-forget;
    /// retransmission is the only loss mitigation.
    pub redundancy: usize,
    /// JPEG quality used for block compression (1–100).
    pub jpeg_quality: u8,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            height: 480,
            width: 640,
            channels: 3,
            grid_rows: 4,
            grid_cols: 4,
            buffer_size: DEFAULT_BUFFER_SIZE,
            redundancy: 1,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl StreamConfig {
    /// The agreed frame shape as `(height, width, channels)`.
    pub fn shape(&self) -> Shape {
        (self.height, self.width, self.channels)
    }

    /// The grid partition described by this configuration.
    pub fn grid(&self) -> FrameGrid {
        FrameGrid::new(self.grid_rows, self.grid_cols)
    }

    /// Usable chunk payload per datagram: buffer size minus the header.
    pub fn max_payload(&self) -> usize {
        self.buffer_size - HEADER_SIZE
    }

    /// Reject geometrically impossible parameter combinations early,
    /// before any socket is bound or thread spawned.
    pub fn validate(&self) -> Result<()> {
        if self.height == 0 || self.width == 0 {
            return Err(StreamError::InvalidConfig(format!(
                "frame dimensions must be non-zero, got {}x{}",
                self.height, self.width
            )));
        }
        if self.channels != 1 && self.channels != 3 {
            return Err(StreamError::UnsupportedChannels(self.channels));
        }
        if self.grid_rows == 0 || self.grid_cols == 0 {
            return Err(StreamError::InvalidConfig(format!(
                "grid must have at least one row and column, got {}x{}",
                self.grid_rows, self.grid_cols
            )));
        }
        if self.grid_rows > self.height || self.grid_cols > self.width {
            return Err(StreamError::InvalidConfig(format!(
                "grid {}x{} finer than frame {}x{}",
                self.grid_rows, self.grid_cols, self.height, self.width
            )));
        }
        // The ceil-based partition must not leave a row or column of
        // zero-extent blocks (e.g. height 5 over 4 rows puts row 3 past
        // the frame). Such blocks cannot be encoded on either end.
        if (self.grid_rows - 1) * self.height.div_ceil(self.grid_rows) >= self.height {
            return Err(StreamError::InvalidConfig(format!(
                "grid with {} rows leaves empty blocks for frame height {}",
                self.grid_rows, self.height
            )));
        }
        if (self.grid_cols - 1) * self.width.div_ceil(self.grid_cols) >= self.width {
            return Err(StreamError::InvalidConfig(format!(
                "grid with {} columns leaves empty blocks for frame width {}",
                self.grid_cols, self.width
            )));
        }
        if self.buffer_size <= HEADER_SIZE {
            return Err(StreamError::InvalidConfig(format!(
                "buffer size {} leaves no room for payload after the {}-byte header",
                self.buffer_size, HEADER_SIZE
            )));
        }
        if self.redundancy == 0 {
            return Err(StreamError::InvalidConfig(
                "redundancy must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
