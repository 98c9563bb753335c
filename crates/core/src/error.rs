//! Error types for the gridstream library.

use crate::frame::Shape;

/// Errors that can occur in the gridstream library.
///
/// Variants map to specific failure modes across the stack:
///
/// - **Transport**: [`Io`](Self::Io) for socket/network failures,
///   [`SourceDisconnected`](Self::SourceDisconnected) for a queue-fed
///   message source whose producer went away.
/// - **Wire**: [`MalformedHeader`](Self::MalformedHeader) and
///   [`InvalidChunk`](Self::InvalidChunk) for datagrams that cannot be
///   placed into the receiver grid.
/// - **Media**: [`Decode`](Self::Decode) and
///   [`UnsupportedChannels`](Self::UnsupportedChannels) for codec failures.
/// - **Shape**: [`ShapeMismatch`](Self::ShapeMismatch) and
///   [`BufferLength`](Self::BufferLength) for pixel buffers that do not
///   fit the agreed frame geometry.
/// - **Lifecycle**: [`AlreadyRunning`](Self::AlreadyRunning),
///   [`InvalidConfig`](Self::InvalidConfig).
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Underlying I/O or socket error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Datagram shorter than the 12-byte positional header.
    #[error("datagram header truncated: got {len} bytes, need 12")]
    MalformedHeader { len: usize },

    /// Header parsed but its coordinates do not fit the configured grid.
    #[error(
        "chunk coordinates out of range: block {block_index}, \
         chunk {chunk_index} of {chunk_count}"
    )]
    InvalidChunk {
        block_index: u32,
        chunk_count: u32,
        chunk_index: u32,
    },

    /// Compressed block bytes could not be decoded.
    #[error("block decode failed: {0}")]
    Decode(#[from] image::ImageError),

    /// Only 1-channel (grayscale) and 3-channel (RGB) frames are supported.
    #[error("unsupported channel count: {0}")]
    UnsupportedChannels(usize),

    /// A frame or block does not have the shape the session agreed on.
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch { expected: Shape, actual: Shape },

    /// A pixel buffer's length does not match its declared shape.
    #[error("pixel buffer length {len} does not match shape {shape:?}")]
    BufferLength { len: usize, shape: Shape },

    /// [`StreamReceiver::start`](crate::StreamReceiver::start) was called
    /// while the ingestion worker is already running.
    #[error("receiver already running")]
    AlreadyRunning,

    /// The message source's feeding side was dropped; no more datagrams
    /// can ever arrive.
    #[error("message source disconnected")]
    SourceDisconnected,

    /// Rejected [`StreamConfig`](crate::StreamConfig) field combination.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience alias for `Result<T, StreamError>`.
pub type Result<T> = std::result::Result<T, StreamError>;
