//! Services the platform layer provides to the game: the output surface
//! description, file reading, and the memory block the game lives in.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::arena::MemoryArena;

/// Describes the pixel buffer an external rasterizer draws into. The game
/// never touches pixels itself; it only needs the dimensions to place draw
/// commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelSurface {
    pub width: i32,
    pub height: i32,
    pub pitch: i32,
    pub bytes_per_pixel: i32,
}

impl PixelSurface {
    pub fn new(width: i32, height: i32, bytes_per_pixel: i32) -> Self {
        Self {
            width,
            height,
            pitch: width * bytes_per_pixel,
            bytes_per_pixel,
        }
    }

    pub fn center(&self) -> (f32, f32) {
        (0.5 * self.width as f32, 0.5 * self.height as f32)
    }
}

/// Result of a whole-file read. Empty on failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileResult {
    pub contents: Vec<u8>,
}

impl FileResult {
    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }
}

pub trait PlatformFiles {
    fn read_entire_file(&self, path: &Path) -> FileResult;
}

/// Reads straight from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFiles;

impl PlatformFiles for StdFiles {
    fn read_entire_file(&self, path: &Path) -> FileResult {
        match fs::read(path) {
            Ok(contents) => FileResult { contents },
            Err(err) => {
                log::warn!("Failed to read {}: {err}", path.display());
                FileResult::default()
            }
        }
    }
}

/// In-memory file set, mostly for tests and embedded defaults.
#[derive(Debug, Clone, Default)]
pub struct MemoryFiles {
    files: HashMap<PathBuf, Vec<u8>>,
}

impl MemoryFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), contents.into());
    }
}

impl PlatformFiles for MemoryFiles {
    fn read_entire_file(&self, path: &Path) -> FileResult {
        FileResult {
            contents: self.files.get(path).cloned().unwrap_or_default(),
        }
    }
}

/// The memory block the platform hands to the game, split into a permanent
/// zone (long-lived game and world state) and a transient zone (per-frame
/// scratch).
#[derive(Debug, Clone)]
pub struct GameMemory {
    pub permanent: MemoryArena,
    pub transient: MemoryArena,
}

impl GameMemory {
    pub fn new(permanent_size: usize, transient_size: usize) -> Self {
        Self {
            permanent: MemoryArena::new(permanent_size),
            transient: MemoryArena::new(transient_size),
        }
    }
}
