//! skytrail Replay Harness CLI
//!
//! Run deterministic playback scenarios, or replay a Movebank CSV export.

use clap::Parser;
use skytrail_core::{Dataset, EntityId, Frame, PlaybackConfig, Precision};
use skytrail_env::TokioFrameClock;
use skytrail_sim::scenarios::ScenarioId;
use skytrail_sim::{check_frame, check_truth, drive, load_movebank_csv};
use skytrail_sim::{ScenarioMetrics, ScenarioResult, ScenarioRunner, SimConfig, SimExport, SimWorld};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// skytrail replay harness CLI
#[derive(Parser, Debug)]
#[command(name = "skytrail-sim")]
#[command(about = "Run deterministic playback checks for skytrail", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Number of synthetic flights
    #[arg(short, long, default_value = "8")]
    entities: usize,

    /// Scenario to run (steady_replay, scrub_storm, loop_wrap, sparse_sampling,
    /// degenerate_data, chase_cam, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Number of random seeds to test (for CI mode)
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Display frames per run
    #[arg(short, long, default_value = "300")]
    frames: u64,

    /// Replay a Movebank CSV export instead of synthetic flights
    #[arg(long)]
    csv: Option<String>,

    /// Playback configuration as a JSON file
    #[arg(long)]
    config: Option<String>,

    /// Entity to follow with the chase camera
    #[arg(long)]
    follow: Option<String>,

    /// Pace frames with a wall clock at the configured frame interval
    #[arg(long)]
    realtime: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export published frames to a JSON file
    #[arg(long)]
    export: Option<String>,
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

fn load_playback(path: Option<&str>) -> PlaybackConfig {
    let Some(path) = path else {
        return PlaybackConfig::default();
    };
    let json = std::fs::read_to_string(path)
        .unwrap_or_else(|e| fail(format!("cannot read {}: {}", path, e)));
    PlaybackConfig::from_json_str(&json).unwrap_or_else(|e| fail(format!("{}: {}", path, e)))
}

/// Plays `world` for `frames` display frames, checking every frame.
fn play(world: &mut SimWorld, frames: u64, realtime: bool, export: &mut SimExport) -> ScenarioResult {
    let mut published: Vec<Frame> = Vec::new();
    world.controller.play();

    if realtime {
        let runtime = tokio::runtime::Runtime::new()
            .unwrap_or_else(|e| fail(format!("cannot start runtime: {}", e)));
        let interval = Duration::from_millis(world.controller.config().frame_interval_ms.max(1));
        runtime.block_on(async {
            let clock = TokioFrameClock::new(interval);
            drive(&mut world.controller, &clock, frames, |f| {
                published.push(f.clone())
            })
            .await;
        });
    } else {
        published.extend((0..frames).filter_map(|_| world.step()));
    }

    let mut metrics = ScenarioMetrics {
        rejected_tracks: world.dataset.rejected().len(),
        ..Default::default()
    };
    let mut failure: Option<String> = None;
    for frame in &published {
        metrics.frames_published += 1;
        if frame.camera.is_some() {
            metrics.camera_poses += 1;
        }
        if failure.is_none() {
            let config = world.controller.config();
            failure = check_frame(frame, &world.dataset, config)
                .and_then(|_| match config.precision {
                    Precision::Full => check_truth(frame, &world.oracle, &mut metrics),
                    Precision::Decimals(_) => Ok(()),
                })
                .err();
        }
        export.add_frame(frame);
    }

    if let Some(err) = world.controller.last_error() {
        warn!("Host reported {}", err);
        metrics.host_errors += 1;
    }

    ScenarioResult {
        scenario: ScenarioId::SteadyReplay,
        seed: world.config.seed,
        passed: failure.is_none(),
        total_ticks: frames,
        final_time_secs: world.controller.current_time(),
        final_entity_count: world.dataset.len(),
        failure_reason: failure,
        metrics,
    }
}

fn write_export(export: &mut SimExport, result: &ScenarioResult, path: Option<&str>) {
    let Some(path) = path else {
        return;
    };
    export.finalize(result.passed, result.failure_reason.clone());
    match export.write_to_file(path) {
        Ok(()) => info!("Exported {} frames to {}", export.frames.len(), path),
        Err(e) => error!("Failed to write export: {:?}", e),
    }
}

/// Replays a Movebank CSV through the recording host.
fn run_csv(args: &Args, csv_path: &str, playback: PlaybackConfig) -> ScenarioResult {
    let report = load_movebank_csv(csv_path).unwrap_or_else(|e| fail(e));
    if report.dropped_rows > 0 {
        warn!("Dropped {} unusable rows from {}", report.dropped_rows, csv_path);
    }

    let dataset = Arc::new(Dataset::from_raw(report.tracks));
    for rejected in dataset.rejected() {
        warn!("Rejected track: {}", rejected);
    }
    if dataset.is_empty() {
        fail(format!("{} holds no playable track", csv_path));
    }
    info!(
        "Loaded {} tracks from {} ({} rejected)",
        dataset.len(),
        csv_path,
        dataset.rejected().len()
    );

    let config = SimConfig {
        seed: args.seed,
        playback,
        ..Default::default()
    };
    let mut world = SimWorld::from_dataset(config, dataset).unwrap_or_else(|e| fail(e));
    if let Some(target) = &args.follow {
        world.controller.set_follow(Some(EntityId::from(target.as_str())));
    }

    let mut export = SimExport::new("replay", args.seed);
    let result = play(&mut world, args.frames, args.realtime, &mut export);
    write_export(&mut export, &result, args.export.as_deref());
    result
}

/// Runs a steady replay over synthetic flights, keeping every frame.
fn run_with_export(args: &Args, seed: u64, playback: PlaybackConfig) -> ScenarioResult {
    let config = SimConfig {
        seed,
        num_entities: args.entities,
        playback,
        ..Default::default()
    };
    let mut world = SimWorld::new(config).unwrap_or_else(|e| fail(e));
    let target = args
        .follow
        .as_deref()
        .map(EntityId::from)
        .or_else(|| world.oracle.flights().first().map(|f| f.id.clone()));
    world.controller.set_follow(target);

    let mut export = SimExport::new(ScenarioId::SteadyReplay.name(), seed);
    let result = play(&mut world, args.frames, args.realtime, &mut export);
    write_export(&mut export, &result, args.export.as_deref());
    result
}

fn report(args: &Args, all_results: &[ScenarioResult]) -> usize {
    let total = all_results.len();
    let failed_count = all_results.iter().filter(|r| !r.passed).count();

    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": total - failed_count,
            "failed": failed_count,
            "results": all_results,
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => fail(e),
        }
        return failed_count;
    }

    info!("");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    if failed_count == 0 {
        info!("✅ All {} runs passed!", total);
    } else {
        error!("❌ {}/{} runs failed!", failed_count, total);
        for result in all_results.iter().filter(|r| !r.passed) {
            error!(
                "  - {} seed={}: {}",
                result.scenario.name(),
                result.seed,
                result.failure_reason.as_deref().unwrap_or("unknown")
            );
        }
    }
    failed_count
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        fail(format!("failed to set tracing subscriber: {}", e));
    }

    if !args.json {
        info!("skytrail replay harness v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let playback = load_playback(args.config.as_deref());
    debug!("Playback config: {:?}", playback);

    // Determine base seed
    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42)
    } else {
        args.seed
    };

    // Real data and export runs are single replays, not scenario sweeps
    if let Some(csv_path) = &args.csv {
        let result = run_csv(&args, csv_path, playback);
        if report(&args, &[result]) > 0 {
            std::process::exit(1);
        }
        return;
    }
    if args.export.is_some() || args.realtime {
        let result = run_with_export(&args, base_seed, playback);
        if report(&args, &[result]) > 0 {
            std::process::exit(1);
        }
        return;
    }

    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        vec![args.scenario.parse().unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            eprintln!(
                "Available scenarios: {}, all",
                ScenarioId::all()
                    .iter()
                    .map(|s| s.name())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            std::process::exit(1);
        })]
    };

    let mut all_results: Vec<ScenarioResult> = Vec::new();
    for seed_offset in 0..args.seeds {
        let seed = base_seed.wrapping_add(seed_offset as u64);

        let runner = ScenarioRunner::new(seed, args.entities)
            .with_frames(args.frames)
            .with_playback(playback.clone());

        for scenario in &scenarios {
            let result = runner.run(*scenario);

            if !args.json {
                if result.passed {
                    info!("✓ {} (seed={}) PASSED", scenario.name(), seed);
                } else {
                    error!(
                        "✗ {} (seed={}) FAILED: {}",
                        scenario.name(),
                        seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }
            all_results.push(result);
        }
    }

    // Exit with proper code for CI
    if report(&args, &all_results) > 0 {
        std::process::exit(1);
    }
}
