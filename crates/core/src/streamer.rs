//! Sender side: grid split, block compression, packetization, transmit.

use std::net::SocketAddr;

use crate::config::StreamConfig;
use crate::error::{Result, StreamError};
use crate::frame::{Frame, FrameGrid, Shape};
use crate::media::{BlockCodec, jpeg::JpegCodec};
use crate::protocol::Packetizer;
use crate::transport::UdpTransport;

/// Transmits frames as block-grid datagram bursts.
///
/// Owns its socket and destination exclusively. One call to
/// [`send_image`](Self::send_image) emits every datagram of one frame,
/// each repeated `redundancy` times; there are no acknowledgments and
/// no retries beyond that. Typically driven synchronously from a
/// capture loop.
pub struct Streamer {
    transport: UdpTransport,
    destination: SocketAddr,
    grid: FrameGrid,
    codec: JpegCodec,
    packetizer: Packetizer,
    shape: Shape,
    redundancy: usize,
}

impl Streamer {
    /// Bind an ephemeral socket and prepare to stream to `destination`
    /// with the given session parameters.
    pub fn new(destination: SocketAddr, config: &StreamConfig) -> Result<Self> {
        config.validate()?;
        let streamer = Self {
            transport: UdpTransport::bind()?,
            destination,
            grid: config.grid(),
            codec: JpegCodec::new(config.jpeg_quality),
            packetizer: Packetizer::new(config.max_payload()),
            shape: config.shape(),
            redundancy: config.redundancy,
        };
        tracing::info!(
            %destination,
            shape = ?streamer.shape,
            grid = ?(streamer.grid.rows(), streamer.grid.cols()),
            redundancy = streamer.redundancy,
            "streamer ready"
        );
        Ok(streamer)
    }

    /// The destination this streamer transmits to.
    pub fn destination(&self) -> SocketAddr {
        self.destination
    }

    /// Split, compress, packetize, and transmit one frame.
    ///
    /// An empty frame is a no-op. A frame whose shape differs from the
    /// session's agreed shape is rejected: the receiver sizes its grid
    /// from that shape and cannot place blocks of any other geometry.
    /// Socket errors propagate to the caller; UDP loss is invisible here.
    pub fn send_image(&self, frame: &Frame) -> Result<()> {
        if frame.is_empty() {
            tracing::trace!("empty frame, nothing sent");
            return Ok(());
        }
        if frame.shape() != self.shape {
            return Err(StreamError::ShapeMismatch {
                expected: self.shape,
                actual: frame.shape(),
            });
        }

        let blocks = self.grid.split(frame);
        let mut datagram_total = 0usize;

        for (block_index, block) in blocks.iter().enumerate() {
            let compressed = self.codec.encode(block)?;
            let datagrams = self.packetizer.datagrams(block_index as u32, &compressed);
            if datagrams.is_empty() {
                tracing::warn!(block_index, "codec produced no bytes, block skipped");
                continue;
            }
            for datagram in &datagrams {
                for _ in 0..self.redundancy {
                    self.transport.send_to(datagram, self.destination)?;
                }
            }
            datagram_total += datagrams.len();
        }

        tracing::trace!(
            blocks = blocks.len(),
            datagrams = datagram_total,
            redundancy = self.redundancy,
            "frame sent"
        );
        Ok(())
    }
}
