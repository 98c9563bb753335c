//! The datagram wire format.
//!
//! Every UDP payload carries a 12-byte positional header followed by a
//! slice of one block's compressed bytes:
//!
//! ```text
//!  0               4               8               12
//! +---------------+---------------+---------------+----------------
//! |  block_index  |  chunk_count  |  chunk_index  | chunk payload...
//! +---------------+---------------+---------------+----------------
//!      (all three are big-endian 32-bit integers)
//! ```
//!
//! Each datagram is self-describing: it can be placed into the receiver
//! grid regardless of arrival order, duplication, or the fate of its
//! siblings. There is no frame sequence number; a newer datagram for a
//! block simply overwrites the slot in place (see the receiver docs for
//! the consequences).

pub mod header;
pub mod packetizer;

pub use header::{ChunkHeader, HEADER_SIZE};
pub use packetizer::{Packetizer, split_to_chunks};
