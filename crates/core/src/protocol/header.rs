use crate::error::{Result, StreamError};

/// Size of the positional header prefixed to every datagram.
pub const HEADER_SIZE: usize = 12;

/// Positional metadata carried by every datagram.
///
/// `block_index` locates the block within the grid (row-major),
/// `chunk_index` locates this payload within the block's compressed
/// bytes, and `chunk_count` declares how many chunks the block was
/// split into. The receiver resizes its slot buffer to match, since
/// a block's compressed length varies from frame to frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub block_index: u32,
    pub chunk_count: u32,
    pub chunk_index: u32,
}

impl ChunkHeader {
    /// Serialize as three big-endian 32-bit integers.
    pub fn write(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.block_index.to_be_bytes());
        buf[4..8].copy_from_slice(&self.chunk_count.to_be_bytes());
        buf[8..12].copy_from_slice(&self.chunk_index.to_be_bytes());
        buf
    }

    /// Parse the first 12 bytes of a datagram.
    ///
    /// Fails with [`StreamError::MalformedHeader`] when fewer than 12
    /// bytes are supplied; trailing bytes (the chunk payload) are left
    /// for the caller.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(StreamError::MalformedHeader { len: buf.len() });
        }
        // lengths checked above, try_into cannot fail
        Ok(Self {
            block_index: u32::from_be_bytes(buf[0..4].try_into().unwrap()),
            chunk_count: u32::from_be_bytes(buf[4..8].try_into().unwrap()),
            chunk_index: u32::from_be_bytes(buf[8..12].try_into().unwrap()),
        })
    }
}
