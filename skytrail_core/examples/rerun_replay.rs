//! Skytrail Rerun Replay
//!
//! Replays three synthetic flights into a Rerun viewer, chasing the first.
//! Run with: cargo run -p skytrail_core --example rerun_replay --features visualization

use skytrail_core::visualization::RerunHost;
use skytrail_core::{AnimationController, Dataset, EntityId, PlaybackConfig, RawTrack, Sample};
use skytrail_env::{FrameClock, TokioFrameClock};
use std::sync::Arc;
use std::time::Duration;

/// A gliding spiral: one sample every two minutes for six hours.
fn spiral(id: &str, radius: f64, phase: f64) -> RawTrack {
    let samples = (0..180)
        .map(|k| {
            let t = 1_407_996_000.0 + k as f64 * 120.0;
            let angle = phase + k as f64 * 0.05;
            Sample::new(
                t,
                radius * angle.cos() + k as f64 * 40.0,
                radius * angle.sin(),
                200.0 + 150.0 * (k as f64 * 0.02).sin(),
            )
        })
        .collect();
    RawTrack::new(id, samples)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    println!("🪶 Skytrail Rerun Replay");

    let dataset = Arc::new(Dataset::from_raw(vec![
        spiral("stork-1", 800.0, 0.0),
        spiral("stork-2", 600.0, 1.5),
        spiral("stork-3", 1_000.0, 3.0),
    ]));

    let config = PlaybackConfig::default()
        .with_step(120.0)
        .with_trail_window(3_600.0);
    let period = Duration::from_millis(config.frame_interval_ms);

    let host = RerunHost::spawn("Skytrail Replay")?;
    let mut controller = AnimationController::new(host, config)?;
    controller.load_dataset(dataset);
    controller.set_follow(Some(EntityId::from("stork-1")));
    controller.play();

    let clock = TokioFrameClock::new(period);
    while let Some(frame_no) = clock.next_frame().await {
        controller.tick();
        if let Some(err) = controller.last_error() {
            eprintln!("⚠️  {}", err);
            break;
        }
        if frame_no >= 400 {
            clock.stop();
        }
    }

    println!("✅ Done");
    Ok(())
}
