//! Datagram transport for outbound frames and inbound chunk messages.
//!
//! The sender side is a thin socket wrapper ([`UdpTransport`]): bind an
//! ephemeral socket, `send_to` each datagram, done.
//!
//! The receiver side is abstracted behind [`MessageSource`] so the
//! ingestion loop does not care where datagrams come from:
//!
//! - [`UdpSource`]: a bound UDP socket polled with a short read timeout,
//!   so a cooperative shutdown flag is honored promptly even when no
//!   traffic arrives.
//! - [`QueueSource`]: a channel fed by some other component, used by
//!   tests and by processes that demultiplex one socket into several
//!   receivers.

pub mod queue;
pub mod udp;

use crate::error::Result;

pub use queue::QueueSource;
pub use udp::{UdpSource, UdpTransport};

/// A pull-based source of inbound datagrams for the ingestion loop.
///
/// `Ok(Some(bytes))` delivers one datagram, `Ok(None)` means nothing is
/// available right now (the loop re-checks its shutdown flag and polls
/// again), and `Err` is fatal: the ingestion thread logs it and exits,
/// leaving the last reconstructed frame servable.
pub trait MessageSource {
    fn next_message(&mut self) -> Result<Option<Vec<u8>>>;
}
