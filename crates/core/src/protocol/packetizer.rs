use super::header::{ChunkHeader, HEADER_SIZE};

/// Split a compressed block into payload-sized chunks.
///
/// Produces `ceil(len / max_payload)` chunks; all but the last are
/// exactly `max_payload` bytes. Empty input yields no chunks; the
/// streamer skips such blocks entirely rather than sending an empty
/// datagram.
pub fn split_to_chunks(data: &[u8], max_payload: usize) -> Vec<&[u8]> {
    data.chunks(max_payload).collect()
}

/// Builds the datagram sequence for one compressed block.
///
/// Each datagram is a [`ChunkHeader`] followed by one chunk of the
/// block's bytes, and fits within `max_payload + HEADER_SIZE`, the
/// configured datagram buffer size.
#[derive(Debug, Clone, Copy)]
pub struct Packetizer {
    max_payload: usize,
}

impl Packetizer {
    pub fn new(max_payload: usize) -> Self {
        debug_assert!(max_payload > 0);
        Self { max_payload }
    }

    pub fn max_payload(&self) -> usize {
        self.max_payload
    }

    /// Assemble the full datagram sequence for `compressed`, tagging
    /// every chunk with `block_index` and the total chunk count.
    pub fn datagrams(&self, block_index: u32, compressed: &[u8]) -> Vec<Vec<u8>> {
        let chunks = split_to_chunks(compressed, self.max_payload);
        let chunk_count = chunks.len() as u32;

        let datagrams: Vec<Vec<u8>> = chunks
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| {
                let header = ChunkHeader {
                    block_index,
                    chunk_count,
                    chunk_index: i as u32,
                };
                let mut datagram = Vec::with_capacity(HEADER_SIZE + chunk.len());
                datagram.extend_from_slice(&header.write());
                datagram.extend_from_slice(chunk);
                datagram
            })
            .collect();

        tracing::trace!(
            block_index,
            compressed_len = compressed.len(),
            chunk_count,
            "block packetized"
        );

        datagrams
    }
}
