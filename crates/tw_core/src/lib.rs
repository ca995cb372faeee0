pub mod arena;
pub mod input;
pub mod platform;
pub mod recording;

pub use arena::{kilobytes, megabytes, ArenaBlock, ArenaError, MemoryArena};
pub use input::{Button, ButtonState, ControllerInput, GameInput, MAX_CONTROLLERS};
pub use platform::{FileResult, GameMemory, MemoryFiles, PixelSurface, PlatformFiles, StdFiles};
pub use recording::{InputRecording, LoopMode, RecordPlayback, RecordingError};
