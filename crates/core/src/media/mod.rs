//! Block compression codecs.
//!
//! Each grid block is compressed independently before packetization, so
//! a lost datagram degrades exactly one block of the reconstructed
//! frame. The [`BlockCodec`] trait is the seam between the protocol and
//! the image codec; [`jpeg::JpegCodec`] is the default implementation.
//!
//! ## Requirements on implementations
//!
//! - `encode` must accept all-zero blocks: the receiver seeds its grid
//!   state with the compressed encoding of black blocks so that a frame
//!   is reconstructible before any datagram arrives.
//! - `decode` must fail with an error (never panic) on truncated or
//!   corrupt input. The receiver treats a decode failure as "keep the
//!   last good pixels for this block".

pub mod jpeg;

use crate::error::Result;
use crate::frame::Frame;

/// A lossy image codec applied per grid block.
///
/// Implementations are stateless with respect to the stream: every call
/// encodes or decodes one block in isolation.
pub trait BlockCodec: Send + Sync {
    /// Compress one block into a self-contained byte buffer.
    fn encode(&self, block: &Frame) -> Result<Vec<u8>>;

    /// Decompress a block previously produced by [`encode`](Self::encode).
    ///
    /// `channels` selects the sample layout of the returned frame (the
    /// compressed form may carry its own color model).
    fn decode(&self, bytes: &[u8], channels: usize) -> Result<Frame>;

    /// Codec name for logging (e.g. `"JPEG"`).
    fn name(&self) -> &'static str;
}
