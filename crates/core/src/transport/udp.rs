use std::io::ErrorKind;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use super::MessageSource;
use crate::error::Result;

/// How long a receive call may block before the ingestion loop gets a
/// chance to observe its shutdown flag.
const RECV_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// UDP transport for outbound datagram delivery.
///
/// Binds a single ephemeral socket (`0.0.0.0:0`) and sends datagrams to
/// the destination the [`Streamer`](crate::Streamer) was built with.
/// This layer is address-only and knows nothing about frames, blocks,
/// or chunks.
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    /// Bind an ephemeral UDP socket for outbound datagrams.
    pub fn bind() -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        Ok(Self { socket })
    }

    /// Send raw bytes to a specific socket address.
    pub fn send_to(&self, payload: &[u8], addr: SocketAddr) -> Result<usize> {
        Ok(self.socket.send_to(payload, addr)?)
    }

    /// The local address of the bound socket.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

/// Inbound datagram source backed by a bound UDP socket.
///
/// The socket carries a 50 ms read timeout: [`next_message`] returns
/// `Ok(None)` on timeout rather than blocking forever, which is what
/// lets [`StreamReceiver::stop`](crate::StreamReceiver::stop) terminate
/// the ingestion thread promptly.
///
/// [`next_message`]: MessageSource::next_message
pub struct UdpSource {
    socket: UdpSocket,
    buf: Vec<u8>,
}

impl UdpSource {
    /// Bind to `addr` and size the receive buffer to the configured
    /// datagram buffer size. Datagrams longer than `buffer_size` are
    /// truncated by the OS; the sender never produces them.
    pub fn bind(addr: impl ToSocketAddrs, buffer_size: usize) -> Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_read_timeout(Some(RECV_POLL_INTERVAL))?;
        tracing::debug!(addr = %socket.local_addr()?, buffer_size, "UDP source bound");
        Ok(Self {
            socket,
            buf: vec![0u8; buffer_size],
        })
    }

    /// The local address of the bound socket (useful with port 0).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

impl MessageSource for UdpSource {
    fn next_message(&mut self) -> Result<Option<Vec<u8>>> {
        match self.socket.recv_from(&mut self.buf) {
            Ok((len, _addr)) => Ok(Some(self.buf[..len].to_vec())),
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
