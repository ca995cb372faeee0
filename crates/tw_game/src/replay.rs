use serde::Deserialize;
use std::path::Path;

use tw_core::{Button, GameInput, PlatformFiles, StdFiles, MAX_CONTROLLERS};

#[derive(Debug, Deserialize, Clone)]
pub struct ReplaySequence {
    #[serde(default = "default_dt")]
    pub fixed_dt: f32,
    /// Controller slot the script drives.
    #[serde(default)]
    pub controller: usize,
    pub frames: Vec<ReplayFrame>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReplayFrame {
    #[serde(default)]
    pub move_x: f32,
    #[serde(default)]
    pub move_y: f32,
    #[serde(default)]
    pub start_pressed: bool,
    #[serde(default)]
    pub jump_pressed: bool,
    #[serde(default = "default_repeat")]
    pub repeat: u32,
}

impl ReplaySequence {
    /// One input snapshot per simulated frame. Button levels carry over
    /// between frames, so half transitions appear only where a button changes.
    pub fn expanded_inputs(&self) -> Vec<GameInput> {
        let mut out = Vec::new();
        let mut current = GameInput::new(self.fixed_dt);
        for frame in &self.frames {
            for _ in 0..frame.repeat.max(1) {
                let mut next = current.next_frame();
                next.frame_delta = self.fixed_dt;
                if let Some(controller) = next.controller_mut(self.controller) {
                    controller.is_connected = 1;
                    controller.set_stick(frame.move_x, frame.move_y);
                    controller
                        .button_mut(Button::Start)
                        .process(frame.start_pressed);
                    controller
                        .button_mut(Button::ActionUp)
                        .process(frame.jump_pressed);
                }
                out.push(next);
                current = next;
            }
        }
        out
    }
}

/// Reads a replay through the platform file capability. Unlike the config,
/// a missing or empty replay is an error.
pub fn load_replay(files: &dyn PlatformFiles, path: &Path) -> Result<ReplaySequence, String> {
    let file = files.read_entire_file(path);
    if file.is_empty() {
        return Err(format!("Failed to read replay {}", path.display()));
    }
    let replay: ReplaySequence = serde_json::from_slice(&file.contents)
        .map_err(|e| format!("Failed to parse replay JSON {}: {e}", path.display()))?;
    validate_replay(&replay)?;
    log::info!(
        "Loaded replay {} ({} frame groups)",
        path.display(),
        replay.frames.len()
    );
    Ok(replay)
}

pub fn load_replay_from_path(path: &Path) -> Result<ReplaySequence, String> {
    load_replay(&StdFiles, path)
}

fn validate_replay(replay: &ReplaySequence) -> Result<(), String> {
    if replay.fixed_dt <= 0.0 {
        return Err("Replay validation failed: fixed_dt must be > 0".to_string());
    }
    if replay.frames.is_empty() {
        return Err("Replay validation failed: frames list is empty".to_string());
    }
    if replay.controller >= MAX_CONTROLLERS {
        return Err(format!(
            "Replay validation failed: controller {} must be < {MAX_CONTROLLERS}",
            replay.controller
        ));
    }
    Ok(())
}

const fn default_dt() -> f32 {
    1.0 / 60.0
}

const fn default_repeat() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};
    use tw_core::MemoryFiles;

    fn temp_file_path(name_hint: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "tw_replay_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    #[test]
    fn replay_file_parses_and_expands() {
        let path = temp_file_path("parse");
        fs::write(
            &path,
            r#"{
              "fixed_dt": 0.016666667,
              "frames": [
                { "start_pressed": true },
                { "move_x": 1.0, "repeat": 3 },
                { "move_x": 2.0, "jump_pressed": true, "repeat": 1 }
              ]
            }"#,
        )
        .expect("write replay file");

        let replay = load_replay_from_path(&path).expect("replay should load");
        let expanded = replay.expanded_inputs();
        assert_eq!(expanded.len(), 5);

        let first = expanded[0].controller(0).expect("slot 0");
        assert!(first.is_connected());
        assert!(first.button(Button::Start).was_pressed());

        let second = expanded[1].controller(0).expect("slot 0");
        assert!(second.button(Button::Start).was_released());
        assert_eq!(second.stick_average_x, 1.0);

        let last = expanded[4].controller(0).expect("slot 0");
        assert!(last.button(Button::ActionUp).was_pressed());
        assert_eq!(last.stick_average_x, 1.0, "stick is clamped");
        assert!((expanded[4].frame_delta - 0.016666667).abs() < 1e-9);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn held_buttons_do_not_retrigger() {
        let replay = ReplaySequence {
            fixed_dt: 0.1,
            controller: 2,
            frames: vec![ReplayFrame {
                move_x: 0.0,
                move_y: 0.0,
                start_pressed: true,
                jump_pressed: false,
                repeat: 3,
            }],
        };
        let inputs = replay.expanded_inputs();
        let start: Vec<_> = inputs
            .iter()
            .map(|i| *i.controller(2).expect("slot 2").button(Button::Start))
            .collect();
        assert!(start[0].was_pressed());
        assert!(start[1].is_held() && !start[1].was_pressed());
        assert!(start[2].is_held() && !start[2].was_pressed());
        assert!(!inputs[0].controller(0).expect("slot 0").is_connected());
    }

    #[test]
    fn invalid_replays_are_rejected() {
        let mut files = MemoryFiles::new();
        for (name, body) in [
            ("dt.json", r#"{ "fixed_dt": 0.0, "frames": [ {} ] }"#),
            ("empty.json", r#"{ "frames": [] }"#),
            ("controller.json", r#"{ "controller": 9, "frames": [ {} ] }"#),
        ] {
            files.insert(name, body);
            let err = load_replay(&files, Path::new(name)).expect_err(name);
            assert!(err.contains("validation failed"), "{name}: {err}");
        }
    }

    #[test]
    fn missing_replay_is_an_error() {
        let files = MemoryFiles::new();
        let err = load_replay(&files, Path::new("nowhere.json")).expect_err("missing");
        assert!(err.contains("Failed to read replay"), "{err}");
    }
}
