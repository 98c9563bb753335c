use std::net::SocketAddr;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use gridstream::{Frame, StreamConfig, StreamReceiver, Streamer, UdpSource};

#[derive(Parser)]
#[command(
    name = "gridstream",
    about = "Block-grid video streaming over UDP: synthetic sender and stats receiver"
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Frame height in pixels
    #[arg(long, default_value_t = 480)]
    height: usize,

    /// Frame width in pixels
    #[arg(long, default_value_t = 640)]
    width: usize,

    /// Grid rows
    #[arg(long, default_value_t = 4)]
    rows: usize,

    /// Grid columns
    #[arg(long, default_value_t = 4)]
    cols: usize,

    /// Datagram buffer size in bytes (header included)
    #[arg(long, default_value_t = 1024)]
    buffer_size: usize,
}

#[derive(Subcommand)]
enum Command {
    /// Stream synthetic test-pattern frames to a destination
    Send {
        /// Destination address (host:port)
        #[arg(long, short)]
        dest: SocketAddr,

        /// Frames per second
        #[arg(long, default_value_t = 24)]
        fps: u32,

        /// Times each datagram is transmitted
        #[arg(long, default_value_t = 1)]
        redundancy: usize,
    },
    /// Receive a stream and report reconstruction statistics
    Recv {
        /// Bind address (host:port)
        #[arg(long, short, default_value = "0.0.0.0:5000")]
        bind: String,
    },
}

/// Moving diagonal gradient: cheap to generate, visibly animated, and
/// compresses well enough to exercise multi-chunk blocks.
fn test_pattern(shape: (usize, usize, usize), tick: usize) -> Frame {
    let (h, w, c) = shape;
    let data = (0..h * w * c)
        .map(|i| {
            let pixel = i / c;
            let (y, x) = (pixel / w, pixel % w);
            ((y + 2 * x + 5 * tick + 40 * (i % c)) % 256) as u8
        })
        .collect();
    Frame::new(data, shape).expect("pattern buffer matches shape")
}

fn run(args: Args) -> gridstream::Result<()> {
    let mut config = StreamConfig {
        height: args.height,
        width: args.width,
        grid_rows: args.rows,
        grid_cols: args.cols,
        buffer_size: args.buffer_size,
        ..Default::default()
    };

    match args.command {
        Command::Send {
            dest,
            fps,
            redundancy,
        } => {
            config.redundancy = redundancy;
            let streamer = Streamer::new(dest, &config)?;
            let frame_interval = Duration::from_secs_f64(1.0 / f64::from(fps.max(1)));

            tracing::info!(%dest, fps, "sending test pattern, Ctrl-C to stop");
            let mut tick = 0usize;
            loop {
                let started = Instant::now();
                streamer.send_image(&test_pattern(config.shape(), tick))?;
                tick = tick.wrapping_add(1);
                if let Some(rest) = frame_interval.checked_sub(started.elapsed()) {
                    std::thread::sleep(rest);
                }
            }
        }
        Command::Recv { bind } => {
            let source = UdpSource::bind(bind.as_str(), config.buffer_size)?;
            tracing::info!(addr = %source.local_addr()?, "listening");
            let mut receiver = StreamReceiver::new(source, &config)?;
            receiver.start()?;

            loop {
                std::thread::sleep(Duration::from_secs(1));
                let frame = receiver.get_frame();
                let mean: f64 = frame.data().iter().map(|&b| f64::from(b)).sum::<f64>()
                    / frame.data().len().max(1) as f64;
                tracing::info!(
                    shape = ?frame.shape(),
                    mean_sample = format_args!("{mean:.1}"),
                    running = receiver.is_running(),
                    "frame reconstructed"
                );
                if !receiver.is_running() {
                    tracing::warn!("ingestion worker exited, still serving last frame");
                }
            }
        }
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("gridstream failed: {e}");
        std::process::exit(1);
    }
}
