//! Receiver side: chunk ingestion, grid state, frame reconstruction.
//!
//! A [`StreamReceiver`] owns a [`MessageSource`] and a per-block grid of
//! chunk slots. [`start`](StreamReceiver::start) spawns the ingestion
//! worker, which pulls datagrams and writes their payloads into the
//! grid; any consumer thread calls [`get_frame`](StreamReceiver::get_frame)
//! at its own cadence to reconstruct the best-available frame. The grid
//! is the only state shared between the two, guarded by one mutex with
//! short critical sections.
//!
//! ## Degraded behavior
//!
//! Every slot is seeded at construction with the chunks of a compressed
//! all-black block, so `get_frame` is callable immediately. A block
//! whose slots currently mix chunks from two different frames (or lost
//! some chunks entirely) usually fails to decode; the receiver then
//! keeps that block's last good pixels. There is no frame sequence
//! number on the wire; when a newer datagram declares a different
//! chunk count for a block, the slot buffer is resized in place and the
//! block transiently holds mixed data. This is an accepted limitation
//! inherited from the wire format.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

use crate::config::StreamConfig;
use crate::error::{Result, StreamError};
use crate::frame::{Frame, FrameGrid, Shape};
use crate::media::{BlockCodec, jpeg::JpegCodec};
use crate::protocol::{ChunkHeader, HEADER_SIZE, split_to_chunks};
use crate::transport::MessageSource;

/// Upper bound on the chunk count a datagram may declare for one block.
///
/// A well-formed sender never comes near this (a block would have to
/// compress to ~4 MiB at the default payload size); the cap keeps a
/// corrupt or hostile header from growing a slot buffer without limit.
const MAX_CHUNKS_PER_BLOCK: u32 = 4096;

/// Grid state mutated by the ingestion thread and read by consumers.
struct GridState {
    /// `slots[block][chunk]` holds the stored chunk bytes. Always fully
    /// populated: seeded with a black block's chunks, then overwritten
    /// in place as datagrams arrive.
    slots: Vec<Vec<Vec<u8>>>,
    /// Last successfully decoded pixels per block.
    decoded: Vec<Frame>,
    /// Reconstructed output frame, reused across `get_frame` calls so
    /// blocks that fail to decode show their previous pixels.
    output: Frame,
}

/// State shared between the ingestion worker and consumer threads.
struct Shared {
    grid: FrameGrid,
    shape: Shape,
    codec: JpegCodec,
    state: Mutex<GridState>,
    running: AtomicBool,
}

impl Shared {
    /// Place one datagram's payload into the grid.
    ///
    /// Returns an error (for the caller to log and drop) when the
    /// header is truncated or its coordinates cannot be placed. The
    /// grid is untouched in every error case.
    fn ingest(&self, datagram: &[u8]) -> Result<()> {
        let header = ChunkHeader::parse(datagram)?;
        let payload = &datagram[HEADER_SIZE..];

        let block_index = header.block_index as usize;
        if block_index >= self.grid.block_count()
            || header.chunk_count == 0
            || header.chunk_count > MAX_CHUNKS_PER_BLOCK
            || header.chunk_index >= header.chunk_count
        {
            return Err(StreamError::InvalidChunk {
                block_index: header.block_index,
                chunk_count: header.chunk_count,
                chunk_index: header.chunk_index,
            });
        }

        let mut state = self.state.lock();
        let slots = &mut state.slots[block_index];
        let declared = header.chunk_count as usize;
        if slots.len() != declared {
            tracing::trace!(
                block_index,
                old = slots.len(),
                new = declared,
                "chunk count changed, resizing block slots"
            );
            resize_slots(slots, declared);
        }
        slots[header.chunk_index as usize] = payload.to_vec();
        Ok(())
    }

    /// Decode every block from its current chunks and join the last
    /// good set into the output frame.
    fn reconstruct(&self) -> Frame {
        let mut state = self.state.lock();
        let GridState {
            slots,
            decoded,
            output,
        } = &mut *state;

        for (index, block_slots) in slots.iter().enumerate() {
            let bytes = block_slots.concat();
            match self.codec.decode(&bytes, self.shape.2) {
                Ok(block) => {
                    let expected = self.grid.block_shape(index, self.shape);
                    if Some(block.shape()) == expected {
                        decoded[index] = block;
                    } else {
                        tracing::debug!(
                            block = index,
                            expected = ?expected,
                            actual = ?block.shape(),
                            "decoded block has wrong shape, keeping cached pixels"
                        );
                    }
                }
                Err(e) => {
                    tracing::trace!(block = index, error = %e, "block decode failed, keeping cached pixels");
                }
            }
        }

        self.grid.join_into(decoded, output);
        output.clone()
    }
}

/// Grow or shrink a block's chunk slots to the declared count.
///
/// Growing pads with clones of the first slot, shrinking truncates.
/// Surviving chunks are kept: only the declared count changed, and any
/// stale mix is caught later by the decode step. This is the single
/// place where the resize policy lives.
fn resize_slots(slots: &mut Vec<Vec<u8>>, declared: usize) {
    if declared > slots.len() {
        let filler = slots.first().cloned().unwrap_or_default();
        slots.resize(declared, filler);
    } else {
        slots.truncate(declared);
    }
}

/// Reassembles the latest complete-enough frame from inbound datagrams.
///
/// Construction seeds the grid so [`get_frame`](Self::get_frame) works
/// immediately (returning black); [`start`](Self::start) spawns the
/// ingestion worker; [`stop`](Self::stop) flips the shared flag and
/// joins it. Dropping the receiver stops the worker too.
pub struct StreamReceiver {
    shared: Arc<Shared>,
    source: Option<Box<dyn MessageSource + Send>>,
    worker: Option<JoinHandle<()>>,
}

impl StreamReceiver {
    /// Build a receiver over any message source with the session's
    /// agreed parameters.
    pub fn new(
        source: impl MessageSource + Send + 'static,
        config: &StreamConfig,
    ) -> Result<Self> {
        config.validate()?;

        let grid = config.grid();
        let shape = config.shape();
        let codec = JpegCodec::new(config.jpeg_quality);
        let max_payload = config.max_payload();

        // Seed every block with the chunks of its compressed black
        // block, so reconstruction has a decodable starting point.
        let zero_blocks = grid.split(&Frame::zeros(shape));
        let mut slots = Vec::with_capacity(zero_blocks.len());
        for block in &zero_blocks {
            let compressed = codec.encode(block)?;
            slots.push(
                split_to_chunks(&compressed, max_payload)
                    .into_iter()
                    .map(<[u8]>::to_vec)
                    .collect(),
            );
        }

        let shared = Arc::new(Shared {
            grid,
            shape,
            codec,
            state: Mutex::new(GridState {
                slots,
                decoded: zero_blocks,
                output: Frame::zeros(shape),
            }),
            running: AtomicBool::new(false),
        });

        Ok(Self {
            shared,
            source: Some(Box::new(source)),
            worker: None,
        })
    }

    /// Spawn the ingestion worker thread.
    ///
    /// Fails with [`StreamError::AlreadyRunning`] if the worker was
    /// already started; a stopped receiver cannot be restarted.
    pub fn start(&mut self) -> Result<()> {
        if self.shared.running.load(Ordering::SeqCst) {
            return Err(StreamError::AlreadyRunning);
        }
        let source = self.source.take().ok_or(StreamError::AlreadyRunning)?;

        self.shared.running.store(true, Ordering::SeqCst);
        let shared = self.shared.clone();
        let handle = thread::Builder::new()
            .name("gridstream-ingest".into())
            .spawn(move || receive_stream(shared, source))?;
        self.worker = Some(handle);
        Ok(())
    }

    /// Request shutdown and join the ingestion worker.
    ///
    /// The worker observes the flag within one source poll interval
    /// (50 ms for the bundled sources).
    pub fn stop(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                tracing::warn!("ingestion worker panicked");
            }
        }
        tracing::info!("receiver stopped");
    }

    /// Whether the ingestion worker is (still) running.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Reconstruct and return the best-available frame right now.
    ///
    /// Never waits for new data. Blocks that cannot currently be
    /// decoded keep their last good pixels (black until the first
    /// datagrams arrive). Calling this twice with no ingestion in
    /// between returns bit-identical frames.
    pub fn get_frame(&self) -> Frame {
        self.shared.reconstruct()
    }
}

impl Drop for StreamReceiver {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Ingestion loop: thread entry point of the worker.
///
/// Per-datagram errors are logged and dropped; source errors are fatal
/// to this thread only; consumers keep reconstructing from the last
/// ingested state.
fn receive_stream(shared: Arc<Shared>, mut source: Box<dyn MessageSource + Send>) {
    tracing::debug!("ingestion worker started");
    while shared.running.load(Ordering::SeqCst) {
        match source.next_message() {
            Ok(Some(datagram)) => {
                if let Err(e) = shared.ingest(&datagram) {
                    tracing::warn!(error = %e, len = datagram.len(), "datagram dropped");
                }
            }
            Ok(None) => {} // timeout, re-check the running flag
            Err(e) => {
                tracing::error!(error = %e, "message source failed, ingestion stopped");
                break;
            }
        }
    }
    shared.running.store(false, Ordering::SeqCst);
    tracing::debug!("ingestion worker exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Packetizer;
    use crate::transport::QueueSource;
    use std::time::{Duration, Instant};

    fn test_config() -> StreamConfig {
        StreamConfig {
            height: 48,
            width: 64,
            grid_rows: 2,
            grid_cols: 2,
            buffer_size: 256, // small payloads force several chunks per block
            ..Default::default()
        }
    }

    fn gradient(shape: Shape) -> Frame {
        let (h, w, c) = shape;
        let data = (0..h * w * c)
            .map(|i| {
                let pixel = i / c;
                (((pixel / w) * 3 + (pixel % w) * 2) % 256) as u8
            })
            .collect();
        Frame::new(data, shape).unwrap()
    }

    /// All datagrams of one frame, in block/chunk order.
    fn frame_datagrams(frame: &Frame, config: &StreamConfig) -> Vec<Vec<u8>> {
        let grid = config.grid();
        let codec = JpegCodec::new(config.jpeg_quality);
        let packetizer = Packetizer::new(config.max_payload());
        grid.split(frame)
            .iter()
            .enumerate()
            .flat_map(|(i, block)| packetizer.datagrams(i as u32, &codec.encode(block).unwrap()))
            .collect()
    }

    fn receiver(config: &StreamConfig) -> StreamReceiver {
        let (_tx, source) = QueueSource::channel();
        StreamReceiver::new(source, config).unwrap()
    }

    fn ingest_all(rx: &StreamReceiver, datagrams: &[Vec<u8>]) {
        for d in datagrams {
            rx.shared.ingest(d).unwrap();
        }
    }

    #[test]
    fn black_frame_before_any_data() {
        let config = test_config();
        let rx = receiver(&config);
        let frame = rx.get_frame();
        assert_eq!(frame.shape(), config.shape());
        assert!(frame.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn get_frame_is_idempotent() {
        let config = test_config();
        let rx = receiver(&config);
        let datagrams = frame_datagrams(&gradient(config.shape()), &config);
        ingest_all(&rx, &datagrams[..datagrams.len() / 2]);
        assert_eq!(rx.get_frame(), rx.get_frame());
    }

    #[test]
    fn full_delivery_reconstructs_the_frame() {
        let config = test_config();
        let rx = receiver(&config);
        let original = gradient(config.shape());
        ingest_all(&rx, &frame_datagrams(&original, &config));

        let reconstructed = rx.get_frame();
        assert_eq!(reconstructed.shape(), original.shape());

        // JPEG is lossy; the gradient should survive within tolerance
        let mean: f64 = original
            .data()
            .iter()
            .zip(reconstructed.data())
            .map(|(&a, &b)| f64::from(a.abs_diff(b)))
            .sum::<f64>()
            / original.data().len() as f64;
        assert!(mean < 8.0, "mean abs diff {mean}");
    }

    #[test]
    fn delivery_order_does_not_matter() {
        let config = test_config();
        let datagrams = frame_datagrams(&gradient(config.shape()), &config);
        assert!(datagrams.len() > 4, "need multiple chunks for this test");

        let forward = receiver(&config);
        ingest_all(&forward, &datagrams);

        let reversed = receiver(&config);
        let mut rev = datagrams.clone();
        rev.reverse();
        ingest_all(&reversed, &rev);

        let shuffled = receiver(&config);
        // deterministic permutation: odd-indexed datagrams first
        let mut mixed: Vec<Vec<u8>> = datagrams.iter().skip(1).step_by(2).cloned().collect();
        mixed.extend(datagrams.iter().step_by(2).cloned());
        ingest_all(&shuffled, &mixed);

        let reference = forward.get_frame();
        assert_eq!(reversed.get_frame(), reference);
        assert_eq!(shuffled.get_frame(), reference);
    }

    #[test]
    fn duplicates_do_not_change_the_result() {
        let config = test_config();
        let datagrams = frame_datagrams(&gradient(config.shape()), &config);

        let once = receiver(&config);
        ingest_all(&once, &datagrams);

        let thrice = receiver(&config);
        for _ in 0..3 {
            ingest_all(&thrice, &datagrams);
        }

        assert_eq!(once.get_frame(), thrice.get_frame());
    }

    #[test]
    fn partial_loss_degrades_one_block_only() {
        let config = test_config();
        let original = gradient(config.shape());
        let datagrams = frame_datagrams(&original, &config);

        // drop the second chunk of block 0
        let victim = datagrams
            .iter()
            .position(|d| {
                let h = ChunkHeader::parse(d).unwrap();
                h.block_index == 0 && h.chunk_index == 1
            })
            .expect("block 0 should span multiple chunks");
        let rx = receiver(&config);
        for (i, d) in datagrams.iter().enumerate() {
            if i != victim {
                rx.shared.ingest(d).unwrap();
            }
        }

        let frame = rx.get_frame();
        assert_eq!(frame.shape(), config.shape());

        // blocks 1..4 must be intact despite block 0's mixed chunks
        let grid = config.grid();
        let full = receiver(&config);
        ingest_all(&full, &datagrams);
        let reference = full.get_frame();
        for index in 1..grid.block_count() {
            let rect = grid.block_rect(index, config.shape()).unwrap();
            for dy in 0..rect.h {
                let y = rect.y + dy;
                let row = |f: &Frame| {
                    f.data()[(y * config.width + rect.x) * 3..(y * config.width + rect.x + rect.w) * 3]
                        .to_vec()
                };
                assert_eq!(row(&frame), row(&reference), "block {index} row {dy}");
            }
        }
    }

    #[test]
    fn malformed_datagram_leaves_state_untouched() {
        let config = test_config();
        let rx = receiver(&config);
        let before = rx.get_frame();

        assert!(matches!(
            rx.shared.ingest(&[0x01, 0x02, 0x03]),
            Err(StreamError::MalformedHeader { len: 3 })
        ));
        assert_eq!(rx.get_frame(), before);
    }

    #[test]
    fn out_of_range_coordinates_dropped() {
        let config = test_config();
        let rx = receiver(&config);

        let bad_block = ChunkHeader {
            block_index: 99,
            chunk_count: 1,
            chunk_index: 0,
        };
        assert!(matches!(
            rx.shared.ingest(&bad_block.write()),
            Err(StreamError::InvalidChunk { block_index: 99, .. })
        ));

        let bad_chunk = ChunkHeader {
            block_index: 0,
            chunk_count: 2,
            chunk_index: 5,
        };
        assert!(rx.shared.ingest(&bad_chunk.write()).is_err());

        let zero_count = ChunkHeader {
            block_index: 0,
            chunk_count: 0,
            chunk_index: 0,
        };
        assert!(rx.shared.ingest(&zero_count.write()).is_err());

        let huge_count = ChunkHeader {
            block_index: 0,
            chunk_count: MAX_CHUNKS_PER_BLOCK + 1,
            chunk_index: 0,
        };
        assert!(rx.shared.ingest(&huge_count.write()).is_err());
    }

    #[test]
    fn corrupt_block_falls_back_to_cached_pixels() {
        let config = test_config();
        let original = gradient(config.shape());
        let datagrams = frame_datagrams(&original, &config);

        let rx = receiver(&config);
        ingest_all(&rx, &datagrams);
        let good = rx.get_frame();

        // overwrite block 2 with garbage that cannot decode
        let mut garbage = ChunkHeader {
            block_index: 2,
            chunk_count: 1,
            chunk_index: 0,
        }
        .write()
        .to_vec();
        garbage.extend_from_slice(&[0xAB; 32]);
        rx.shared.ingest(&garbage).unwrap();

        // the decode fails, so the frame is unchanged
        assert_eq!(rx.get_frame(), good);
    }

    #[test]
    fn resize_policy_pads_and_truncates() {
        let mut slots = vec![vec![1u8], vec![2u8], vec![3u8]];
        resize_slots(&mut slots, 5);
        assert_eq!(slots, vec![vec![1], vec![2], vec![3], vec![1], vec![1]]);
        resize_slots(&mut slots, 2);
        assert_eq!(slots, vec![vec![1], vec![2]]);
    }

    #[test]
    fn chunk_count_change_resizes_in_place() {
        let config = test_config();
        let rx = receiver(&config);

        let seeded_len = rx.shared.state.lock().slots[1].len();
        let mut datagram = ChunkHeader {
            block_index: 1,
            chunk_count: (seeded_len + 4) as u32,
            chunk_index: 0,
        }
        .write()
        .to_vec();
        datagram.extend_from_slice(&[0xFF; 16]);
        rx.shared.ingest(&datagram).unwrap();

        let state = rx.shared.state.lock();
        assert_eq!(state.slots[1].len(), seeded_len + 4);
        assert_eq!(state.slots[1][0], vec![0xFF; 16]);
    }

    #[test]
    fn worker_ingests_from_queue_and_stops_promptly() {
        let config = test_config();
        let original = gradient(config.shape());
        let (tx, source) = QueueSource::channel();
        let mut rx = StreamReceiver::new(source, &config).unwrap();
        rx.start().unwrap();
        assert!(matches!(rx.start(), Err(StreamError::AlreadyRunning)));

        for d in frame_datagrams(&original, &config) {
            tx.send(d).unwrap();
        }

        // wait until the worker has drained the queue into the grid
        let deadline = Instant::now() + Duration::from_secs(5);
        let reference = {
            let direct = receiver(&config);
            ingest_all(&direct, &frame_datagrams(&original, &config));
            direct.get_frame()
        };
        loop {
            if rx.get_frame() == reference {
                break;
            }
            assert!(Instant::now() < deadline, "worker did not ingest in time");
            thread::sleep(Duration::from_millis(20));
        }

        let stop_started = Instant::now();
        rx.stop();
        assert!(stop_started.elapsed() < Duration::from_secs(1));
        assert!(!rx.is_running());
    }

    #[test]
    fn stop_survives_a_panicked_worker() {
        struct PanickingSource;
        impl MessageSource for PanickingSource {
            fn next_message(&mut self) -> Result<Option<Vec<u8>>> {
                panic!("source blew up");
            }
        }

        let config = test_config();
        let mut rx = StreamReceiver::new(PanickingSource, &config).unwrap();
        rx.start().unwrap();
        thread::sleep(Duration::from_millis(50));

        // the join result is Err; stop must not propagate the panic
        rx.stop();
        assert!(!rx.is_running());
        assert_eq!(rx.get_frame().shape(), config.shape());
    }

    #[test]
    fn source_failure_kills_worker_but_not_consumers() {
        let config = test_config();
        let (tx, source) = QueueSource::channel();
        let mut rx = StreamReceiver::new(source, &config).unwrap();
        rx.start().unwrap();

        drop(tx); // source disconnects -> worker exits on its own

        let deadline = Instant::now() + Duration::from_secs(5);
        while rx.is_running() {
            assert!(Instant::now() < deadline, "worker did not exit");
            thread::sleep(Duration::from_millis(20));
        }
        // consumer still gets a well-shaped frame
        assert_eq!(rx.get_frame().shape(), config.shape());
    }
}
