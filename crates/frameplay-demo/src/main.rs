//! Headless player: opens a source, plays it for a while and reports progress.
//!
//! ```bash
//! RUST_LOG=frameplay=debug cargo run -p frameplay-demo -- /path/to/video.mp4 --seconds 5
//! frameplay-demo /dev/video0 --software
//! frameplay-demo "rtsp://camera.local/live?w=1920&h=1080&o=l"
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use frameplay::{ChannelEvents, PlayerConfig, PlayerEvent, VideoPlayer};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Parser, Debug)]
#[command(name = "frameplay-demo")]
#[command(about = "Play a video file, stream or camera and report decoded frames")]
struct Args {
    /// File path, URI or /dev/videoN device
    input: String,

    /// Seek back to the start when playback completes
    #[arg(long)]
    auto_repeat: bool,

    /// Use videoconvert even when vapostproc is available
    #[arg(long)]
    software: bool,

    /// Seconds to play before stopping
    #[arg(short, long, default_value = "10")]
    seconds: u64,

    /// Playback rate applied after starting
    #[arg(short, long)]
    rate: Option<f64>,

    /// Initial seek position in milliseconds
    #[arg(long)]
    seek: Option<i64>,

    /// Source volume
    #[arg(long)]
    volume: Option<f64>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("frameplay=info".parse()?)
                .add_directive("frameplay_core=info".parse()?)
                .add_directive("frameplay_demo=debug".parse()?),
        )
        .init();

    let args = Args::parse();

    let mut config = PlayerConfig::from_env().with_auto_repeat(args.auto_repeat);
    if args.software {
        config = config.with_hardware_acceleration(false);
    }

    let (events, rx) = ChannelEvents::unbounded();
    let mut player = VideoPlayer::open(&args.input, Arc::new(events), config)?;
    tracing::info!(
        "Opened {} as {:?}: {}x{}, duration {}ms",
        player.source().uri(),
        player.source().kind(),
        player.width(),
        player.height(),
        player.duration()
    );

    if let Some(volume) = args.volume {
        if !player.set_volume(volume) {
            tracing::warn!("Volume not applied");
        }
    }
    if !player.play() {
        return Err("failed to start playback".into());
    }
    if let Some(position) = args.seek {
        player.set_seek(position);
    }
    if let Some(rate) = args.rate {
        if !player.set_playback_rate(rate) {
            tracing::warn!("Rate {rate} not applied");
        }
    }

    let deadline = Instant::now() + Duration::from_secs(args.seconds);
    let mut last_report = Instant::now();
    let mut completed = false;

    while Instant::now() < deadline && !completed {
        std::thread::sleep(POLL_INTERVAL);
        let position = player.current_position();

        for event in rx.try_iter() {
            match event {
                PlayerEvent::Completed => {
                    tracing::info!("Playback completed");
                    completed = !args.auto_repeat;
                }
                PlayerEvent::Initialized | PlayerEvent::FrameDecoded => {}
            }
        }

        if last_report.elapsed() >= Duration::from_secs(1) {
            last_report = Instant::now();
            let bytes = player.frame_buffer().map(|f| f.len()).unwrap_or(0);
            let frames = player.frames_delivered();
            tracing::info!(
                "position {position}ms, {frames} frames, {}x{} ({bytes} bytes), rate {}{}",
                player.width(),
                player.height(),
                player.playback_rate(),
                if player.is_muted() { " (muted)" } else { "" }
            );
        }
    }

    player.stop();
    let frames = player.frames_delivered();
    player.close();
    tracing::info!("Decoded {frames} frames");
    Ok(())
}
