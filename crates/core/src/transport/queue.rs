use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};

use super::MessageSource;
use crate::error::{Result, StreamError};

const QUEUE_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A [`MessageSource`] fed through an in-process channel.
///
/// Mirrors the socket behavior: a bounded wait per pull so the
/// ingestion loop keeps observing its shutdown flag, `Ok(None)` when
/// the queue is momentarily empty, and a fatal
/// [`StreamError::SourceDisconnected`] once every [`Sender`] is gone.
pub struct QueueSource {
    rx: Receiver<Vec<u8>>,
}

impl QueueSource {
    /// Create a connected `(feeder, source)` pair.
    pub fn channel() -> (Sender<Vec<u8>>, Self) {
        let (tx, rx) = unbounded();
        (tx, Self { rx })
    }

    /// Wrap an existing channel receiver.
    pub fn from_receiver(rx: Receiver<Vec<u8>>) -> Self {
        Self { rx }
    }
}

impl MessageSource for QueueSource {
    fn next_message(&mut self) -> Result<Option<Vec<u8>>> {
        match self.rx.recv_timeout(QUEUE_POLL_INTERVAL) {
            Ok(msg) => Ok(Some(msg)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(StreamError::SourceDisconnected),
        }
    }
}
