//! Input recording and looped playback.
//!
//! A recording file is a [`RecordingHeader`] followed by raw [`GameInput`]
//! snapshots in their `#[repr(C)]` layout. That layout *is* the file format:
//! any change to `GameInput` must bump [`RECORDING_VERSION`].
//!
//! [`RecordPlayback`] pairs the input stream with a snapshot of the state the
//! recording started from. During playback, reaching the end of the stream
//! restores that snapshot and starts over, so the same frames replay forever.

use std::fs;
use std::mem::size_of;
use std::path::Path;

use bytemuck::{Pod, Zeroable};
use thiserror::Error;

use crate::input::GameInput;

const RECORDING_MAGIC: [u8; 4] = *b"TWIR";
pub const RECORDING_VERSION: u32 = 1;

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct RecordingHeader {
    magic: [u8; 4],
    version: u32,
    snapshot_size: u32,
    count: u32,
}

#[derive(Debug, Error)]
pub enum RecordingError {
    #[error("recording i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not an input recording (bad magic)")]
    BadMagic,
    #[error("unsupported recording version {found} (expected {expected})")]
    Version { found: u32, expected: u32 },
    #[error("snapshot size mismatch: file stores {found} bytes per frame, expected {expected}")]
    SnapshotSize { found: u32, expected: u32 },
    #[error("recording truncated: expected {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputRecording {
    inputs: Vec<GameInput>,
}

impl InputRecording {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, input: GameInput) {
        self.inputs.push(input);
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn inputs(&self) -> &[GameInput] {
        &self.inputs
    }

    pub fn clear(&mut self) {
        self.inputs.clear();
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let header = RecordingHeader {
            magic: RECORDING_MAGIC,
            version: RECORDING_VERSION,
            snapshot_size: size_of::<GameInput>() as u32,
            count: self.inputs.len() as u32,
        };
        let payload: &[u8] = bytemuck::cast_slice(&self.inputs);
        let mut out = Vec::with_capacity(size_of::<RecordingHeader>() + payload.len());
        out.extend_from_slice(bytemuck::bytes_of(&header));
        out.extend_from_slice(payload);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RecordingError> {
        let header_size = size_of::<RecordingHeader>();
        if bytes.len() < header_size {
            return Err(RecordingError::Truncated {
                expected: header_size,
                found: bytes.len(),
            });
        }
        let header: RecordingHeader = bytemuck::pod_read_unaligned(&bytes[..header_size]);
        if header.magic != RECORDING_MAGIC {
            return Err(RecordingError::BadMagic);
        }
        if header.version != RECORDING_VERSION {
            return Err(RecordingError::Version {
                found: header.version,
                expected: RECORDING_VERSION,
            });
        }
        let snapshot_size = size_of::<GameInput>();
        if header.snapshot_size as usize != snapshot_size {
            return Err(RecordingError::SnapshotSize {
                found: header.snapshot_size,
                expected: snapshot_size as u32,
            });
        }

        let payload = &bytes[header_size..];
        let expected = header.count as usize * snapshot_size;
        if payload.len() < expected {
            return Err(RecordingError::Truncated {
                expected,
                found: payload.len(),
            });
        }

        // The buffer is not guaranteed to be aligned for GameInput.
        let inputs = payload[..expected]
            .chunks_exact(snapshot_size)
            .map(bytemuck::pod_read_unaligned)
            .collect();
        Ok(Self { inputs })
    }

    pub fn write_to_path(&self, path: &Path) -> Result<(), RecordingError> {
        fs::write(path, self.to_bytes())?;
        log::info!(
            "Wrote input recording '{}' ({} frames)",
            path.display(),
            self.inputs.len()
        );
        Ok(())
    }

    pub fn read_from_path(path: &Path) -> Result<Self, RecordingError> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    #[default]
    Idle,
    Recording,
    Playing,
}

/// Record-then-loop driver around an [`InputRecording`].
#[derive(Debug, Clone)]
pub struct RecordPlayback<S> {
    mode: LoopMode,
    start_state: Option<S>,
    recording: InputRecording,
    cursor: usize,
}

impl<S: Clone> RecordPlayback<S> {
    pub fn new() -> Self {
        Self {
            mode: LoopMode::Idle,
            start_state: None,
            recording: InputRecording::new(),
            cursor: 0,
        }
    }

    pub fn mode(&self) -> LoopMode {
        self.mode
    }

    pub fn recording(&self) -> &InputRecording {
        &self.recording
    }

    pub fn begin_recording(&mut self, state: &S) {
        self.start_state = Some(state.clone());
        self.recording.clear();
        self.cursor = 0;
        self.mode = LoopMode::Recording;
    }

    pub fn end_recording(&mut self) {
        if self.mode == LoopMode::Recording {
            self.mode = LoopMode::Idle;
        }
    }

    /// Loads an existing recording that will start from `state`.
    pub fn load(&mut self, recording: InputRecording, state: &S) {
        self.recording = recording;
        self.start_state = Some(state.clone());
        self.cursor = 0;
        self.mode = LoopMode::Idle;
    }

    /// Restores the recorded start state. Returns false when there is nothing
    /// to play back.
    pub fn begin_playback(&mut self, state: &mut S) -> bool {
        let Some(start) = &self.start_state else {
            return false;
        };
        if self.recording.is_empty() {
            return false;
        }
        *state = start.clone();
        self.cursor = 0;
        self.mode = LoopMode::Playing;
        true
    }

    pub fn end_playback(&mut self) {
        if self.mode == LoopMode::Playing {
            self.mode = LoopMode::Idle;
        }
    }

    /// Called once per frame before the simulation runs. Records `input`, or
    /// overwrites it with the next recorded frame while playing back.
    pub fn process(&mut self, input: &mut GameInput, state: &mut S) {
        match self.mode {
            LoopMode::Idle => {}
            LoopMode::Recording => self.recording.push(*input),
            LoopMode::Playing => {
                if self.cursor >= self.recording.len() {
                    self.cursor = 0;
                    if let Some(start) = &self.start_state {
                        *state = start.clone();
                    }
                    log::debug!("Input playback looped");
                }
                if let Some(recorded) = self.recording.inputs().get(self.cursor) {
                    *input = *recorded;
                    self.cursor += 1;
                }
            }
        }
    }
}

impl<S: Clone> Default for RecordPlayback<S> {
    fn default() -> Self {
        Self::new()
    }
}
