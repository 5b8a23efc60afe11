//! Drive a short playback session on the simulated desktop engine.
//!
//! Run with:
//! ```bash
//! cargo run -p core-service --example simulated_session
//! ```

use anyhow::Context;
use bridge_traits::time::LogLevel;
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use core_service::{bootstrap_desktop, PlaybackSettings, QueueSource, RepeatMode, Track};
use std::time::Duration;
use tracing::info;

fn album() -> Vec<Track> {
    [("intro", 3), ("single", 4), ("outro", 3)]
        .into_iter()
        .enumerate()
        .map(|(i, (id, secs))| {
            Track::new(id, format!("Track {}", i + 1), Duration::from_secs(secs))
                .with_artist("Simulated Artist")
                .with_album("Demo Album")
                .with_ordinal(Some(1), Some(i as u32 + 1))
        })
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(
        LoggingConfig::default()
            .with_format(LogFormat::Pretty)
            .with_level(LogLevel::Debug),
    )
    .context("failed to initialize logging")?;

    let service = bootstrap_desktop(PlaybackSettings::default())
        .await
        .context("failed to start playback service")?;

    let mut status = service.watch();
    service
        .set_queue(album(), 0, QueueSource::album("demo"))
        .await?;
    service.set_repeat_mode(RepeatMode::Off).await?;

    // Let the first track run for a bit, then skip ahead.
    tokio::time::sleep(Duration::from_secs(2)).await;
    service.next().await?;

    while status.changed().await.is_ok() {
        let snapshot = status.borrow_and_update().clone();
        info!(
            position_ms = snapshot.position_ms,
            duration_ms = snapshot.duration_ms,
            playing = snapshot.is_playing,
            "Progress"
        );
        if !snapshot.is_loaded {
            break;
        }
    }

    info!(state = ?service.player_state(), "Queue finished");
    service.shutdown().await?;
    Ok(())
}
