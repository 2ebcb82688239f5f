//! Headless preview runner.
//!
//! Opens a preview through the launcher with simulated media elements and
//! drives it at frame rate on a single-threaded tokio runtime, logging every
//! session event. Usage: `reelmix [preview.yaml]`. Set RUST_LOG=debug for
//! scheduler decisions, RUST_LOG=trace for per-frame drift.

use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use reelmix::core::clock::{Clock, SystemClock};
use reelmix::core::time::format_time;
use reelmix::media::element::MediaBackend;
use reelmix::media::simulated::SimulatedBackend;
use reelmix::playback::state::TransportState;
use reelmix::{load_config, PlaybackError, PreviewConfig, PreviewLauncher, SessionEvent, TickOutcome};

const FRAME_INTERVAL_MS: u64 = 16;
const MAX_LOOPS: u32 = 2;

fn main() {
    // Initialize logger - set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => match load_config(Path::new(&path)) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("{}; using the demo preview", err);
                demo_config()
            }
        },
        None => demo_config(),
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            log::error!("failed to start runtime: {}", err);
            std::process::exit(1);
        }
    };

    if let Err(err) = runtime.block_on(run_preview(config)) {
        log::error!("preview failed: {}", err);
        std::process::exit(1);
    }
}

fn demo_config() -> PreviewConfig {
    PreviewConfig {
        photo_uri: Some("demo/still.jpg".to_string()),
        music_uri: Some("demo/track.mp3".to_string()),
        music_offset_ms: -500,
        photo_duration_sec: 3.0,
        ..PreviewConfig::default()
    }
}

async fn run_preview(config: PreviewConfig) -> Result<(), PlaybackError> {
    let clock: Rc<dyn Clock> = Rc::new(SystemClock::new());
    let backend: Rc<dyn MediaBackend> = Rc::new(SimulatedBackend::new(Rc::clone(&clock)));
    let mut launcher = PreviewLauncher::new(config, backend, clock);

    log::info!("thumbnail: {:?}", launcher.thumbnail_uri());
    let session = launcher.open()?;
    let events = session.subscribe();
    session.play();

    let mut interval = tokio::time::interval(Duration::from_millis(FRAME_INTERVAL_MS));
    let mut loops = 0;
    loop {
        interval.tick().await;
        let outcome = session.tick()?;

        for event in events.try_iter() {
            match event {
                SessionEvent::PositionSec(_) => log::debug!("event: {:?}", event),
                _ => log::info!("event: {:?}", event),
            }
        }

        match outcome {
            TickOutcome::Looped => {
                loops += 1;
                if loops >= MAX_LOOPS {
                    break;
                }
            }
            TickOutcome::Ended | TickOutcome::Closed => break,
            TickOutcome::Running => {}
        }
        if session.state() == TransportState::Stopped {
            log::warn!("primary media unavailable, showing poster {:?}", session.poster_uri());
            break;
        }
    }

    log::info!(
        "preview stopped at {} / {}",
        format_time(session.position_ms()),
        format_time(session.duration_ms())
    );
    launcher.close();
    Ok(())
}
