//! Block-grid video streaming over UDP.
//!
//! gridstream transports live camera frames over unreliable,
//! size-limited datagrams. Each frame is divided into a fixed grid of
//! blocks, every block is JPEG-compressed independently, and the
//! compressed bytes are split into datagram-sized chunks tagged with
//! their grid position. The receiver stores whatever arrives, in any
//! order and duplicated or not, and reconstructs the best-available
//! frame on demand, falling back to a block's last good pixels when
//! its chunks are missing or stale.
//!
//! ```no_run
//! use gridstream::{Frame, StreamConfig, StreamReceiver, Streamer, UdpSource};
//!
//! # fn main() -> gridstream::Result<()> {
//! let config = StreamConfig::default();
//!
//! // receiver end
//! let source = UdpSource::bind("0.0.0.0:5000", config.buffer_size)?;
//! let mut receiver = StreamReceiver::new(source, &config)?;
//! receiver.start()?;
//! let frame = receiver.get_frame(); // black until datagrams arrive
//!
//! // sender end
//! let streamer = Streamer::new("192.168.1.50:5000".parse().unwrap(), &config)?;
//! streamer.send_image(&Frame::zeros(config.shape()))?;
//! # Ok(())
//! # }
//! ```
//!
//! Sender and receiver never negotiate: grid geometry, frame shape, and
//! buffer size are agreed out of band via a shared [`StreamConfig`].

pub mod config;
pub mod error;
pub mod frame;
pub mod media;
pub mod protocol;
pub mod receiver;
pub mod streamer;
pub mod transport;

pub use config::StreamConfig;
pub use error::{Result, StreamError};
pub use frame::{Frame, FrameGrid, Shape};
pub use media::{BlockCodec, jpeg::JpegCodec};
pub use receiver::StreamReceiver;
pub use streamer::Streamer;
pub use transport::{MessageSource, QueueSource, UdpSource, UdpTransport};
