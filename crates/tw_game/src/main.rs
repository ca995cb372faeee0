//! Tileworld -- headless frame loop and entry point.
//!
//! The loop owns the platform side: it allocates game memory, feeds one input
//! snapshot per frame into [`GameState::update_and_render`], and routes
//! input through the record/playback looper. Inputs come from a scripted JSON
//! replay, a recorded input file, or an idle script that just presses start.
//!
//! Usage:
//!   tw_game [config.json] [--replay path] [--record path] [--playback path] [--frames n]

mod config;
mod game;
mod render;
mod replay;
mod worldgen;

use std::path::PathBuf;

use tw_core::{Button, GameInput, GameMemory, InputRecording, PixelSurface, RecordPlayback};

use config::load_config_from_path;
use game::GameState;
use replay::load_replay_from_path;

const DEFAULT_CONFIG_PATH: &str = "assets/config.json";
const DEFAULT_FRAMES: usize = 600;
const IDLE_DT: f32 = 1.0 / 60.0;
const SURFACE_WIDTH: i32 = 960;
const SURFACE_HEIGHT: i32 = 540;

#[derive(Debug, Default)]
struct RunArgs {
    config_path: Option<PathBuf>,
    replay_path: Option<PathBuf>,
    record_path: Option<PathBuf>,
    playback_path: Option<PathBuf>,
    frames: Option<usize>,
}

fn parse_args(args: impl Iterator<Item = String>) -> Result<RunArgs, String> {
    let mut parsed = RunArgs::default();
    let mut args = args;
    while let Some(arg) = args.next() {
        let mut value = |flag: &str| {
            args.next()
                .ok_or_else(|| format!("Missing value for {flag}"))
        };
        match arg.as_str() {
            "--replay" => parsed.replay_path = Some(PathBuf::from(value("--replay")?)),
            "--record" => parsed.record_path = Some(PathBuf::from(value("--record")?)),
            "--playback" => parsed.playback_path = Some(PathBuf::from(value("--playback")?)),
            "--frames" => {
                let raw = value("--frames")?;
                let frames = raw
                    .parse()
                    .map_err(|e| format!("Invalid --frames value '{raw}': {e}"))?;
                parsed.frames = Some(frames);
            }
            flag if flag.starts_with("--") => return Err(format!("Unknown flag {flag}")),
            path => parsed.config_path = Some(PathBuf::from(path)),
        }
    }
    if parsed.replay_path.is_some() && parsed.playback_path.is_some() {
        return Err("--replay and --playback are mutually exclusive".to_string());
    }
    if parsed.record_path.is_some() && parsed.playback_path.is_some() {
        return Err("--record and --playback are mutually exclusive".to_string());
    }
    Ok(parsed)
}

/// Presses start on controller 0 for one frame, then idles.
fn idle_script() -> Vec<GameInput> {
    let mut press = GameInput::new(IDLE_DT);
    if let Some(controller) = press.controller_mut(0) {
        controller.is_connected = 1;
        controller.button_mut(Button::Start).process(true);
    }
    let mut release = press.next_frame();
    if let Some(controller) = release.controller_mut(0) {
        controller.button_mut(Button::Start).process(false);
    }
    vec![press, release]
}

fn run(args: RunArgs) -> Result<(), String> {
    let config_path = args
        .config_path
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = load_config_from_path(&config_path)?;
    log::info!(
        "Config {}: tile {} m / {} px, chunk shift {}, {} rooms",
        config_path.display(),
        config.tile_side_in_meters,
        config.tile_side_in_pixels,
        config.chunk_shift,
        config.world_gen.screens
    );

    let mut memory = GameMemory::new(
        config.permanent_storage_bytes(),
        config.transient_storage_bytes(),
    );
    let mut state = GameState::new(config, &mut memory).map_err(|e| e.to_string())?;
    let surface = PixelSurface::new(SURFACE_WIDTH, SURFACE_HEIGHT, 4);

    let mut looper: RecordPlayback<GameState> = RecordPlayback::new();
    let script = match (&args.replay_path, &args.playback_path) {
        (Some(path), _) => load_replay_from_path(path)?.expanded_inputs(),
        (None, Some(path)) => {
            let recording = InputRecording::read_from_path(path).map_err(|e| e.to_string())?;
            log::info!("Playing back {} recorded frames", recording.len());
            looper.load(recording, &state);
            if !looper.begin_playback(&mut state) {
                return Err(format!("Recording {} has no frames", path.display()));
            }
            Vec::new()
        }
        (None, None) => idle_script(),
    };
    if args.record_path.is_some() {
        looper.begin_recording(&state);
    }

    let frames = args.frames.unwrap_or(match script.len() {
        0 => looper.recording().len().max(1),
        len if args.replay_path.is_some() => len,
        _ => DEFAULT_FRAMES,
    });

    let mut commands = 0usize;
    let mut dropped = 0usize;
    let mut previous = GameInput::new(IDLE_DT);
    for frame in 0..frames {
        let mut input = match script.get(frame) {
            Some(scripted) => *scripted,
            None => previous.next_frame(),
        };
        looper.process(&mut input, &mut state);
        let group = state
            .update_and_render(&input, &mut memory.transient, &surface)
            .map_err(|e| format!("Frame {frame} failed: {e}"))?;
        commands += group.commands().len();
        dropped += group.dropped();
        previous = input;
    }

    if let Some(path) = &args.record_path {
        looper.end_recording();
        looper
            .recording()
            .write_to_path(path)
            .map_err(|e| e.to_string())?;
    }

    let sim = state.simulation();
    let camera = sim.camera();
    let stats = sim.world().stats();
    log::info!(
        "Ran {frames} frames: {commands} draw commands ({dropped} dropped), {} high / {} low",
        sim.entities().high_count(),
        sim.entities().low_count() - 1
    );
    log::info!(
        "Camera at tile ({}, {}, {}); {} chunks ({} chained), {} overflow entity blocks",
        camera.tile_x,
        camera.tile_y,
        camera.tile_z,
        stats.chunks,
        stats.chained_chunks,
        stats.overflow_blocks
    );
    if let Some(hero) = state.controlled_entity(0) {
        if let Some(low) = sim.entities().low(hero) {
            let p = low.position;
            log::info!(
                "Hero {hero} at tile ({}, {}, {}) offset ({:.3}, {:.3})",
                p.tile_x,
                p.tile_y,
                p.tile_z,
                p.offset.x,
                p.offset.y
            );
        }
    }
    let summary = state.world_summary();
    log::debug!(
        "World walk ended in room ({}, {}) on layer {}",
        summary.last_room.0,
        summary.last_room.1,
        summary.last_room.2
    );
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(err) => {
            log::error!("{err}");
            std::process::exit(2);
        }
    };
    if let Err(err) = run(args) {
        log::error!("{err}");
        std::process::exit(1);
    }
}
