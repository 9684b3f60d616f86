//! Media engine collaborator interface.
//!
//! The pool never decodes or renders anything itself. It drives opaque engine
//! instances through this trait pair: a [`MediaEngine`] factory creates one
//! [`EngineInstance`] per concurrently playing stream, because audio-output
//! routing is fixed at instance creation time. Commands are fire-and-forget;
//! progress and lifecycle are observed later through [`EngineInstance::state`].

use std::path::Path;

use thiserror::Error;

/// Lifecycle states reported by an engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No media loaded, or playback was stopped.
    Idle,
    /// Media is loading/buffering and has not produced frames yet.
    Opening,
    Playing,
    Paused,
    /// The current media reached end of stream.
    Ended,
    /// The engine failed while opening or playing the current media.
    Error,
}

/// Instance-creation options. Audio routing cannot change after creation,
/// which is why per-slot mute toggles replace the whole instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineOptions {
    /// Create the instance with a silent audio output.
    pub silent: bool,
}

/// Opaque rendering target handle owned by the UI collaborator.
///
/// The wrapped value is a platform window/widget id; the pool only passes it
/// through to [`EngineInstance::bind_output`] and never interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(pub u64);

/// Failures raised by the engine collaborator.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to create engine instance: {0}")]
    CreateFailed(String),
    #[error("engine rejected media {path}: {reason}")]
    OpenRejected { path: String, reason: String },
}

/// One playback engine bound to one slot.
///
/// `open` is the only call that reports failure synchronously; everything
/// else returns immediately and surfaces problems through `state`.
pub trait EngineInstance: Send {
    /// Load a media file. A successful return means the engine accepted the
    /// file, not that decoding will succeed; runtime failures show up as
    /// [`EngineState::Error`].
    fn open(&mut self, path: &Path) -> Result<(), EngineError>;
    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    fn state(&self) -> EngineState;
    /// Normalized playback position in `[0, 1]`.
    fn position(&self) -> f32;
    fn set_position(&mut self, position: f32);
    fn time_ms(&self) -> u64;
    fn set_time_ms(&mut self, time_ms: u64);
    /// Total length of the loaded media in milliseconds, `0` if unknown.
    fn length_ms(&self) -> u64;
    /// Volume in `0..=100`.
    fn set_volume(&mut self, volume: u8);
    fn set_mute(&mut self, muted: bool);
    /// Route video output into the given surface. One-shot: must be re-issued
    /// after the surface is re-parented, because some platforms drop the
    /// association across reparenting.
    fn bind_output(&mut self, surface: SurfaceHandle);
    /// Release underlying engine resources. The instance must not be used
    /// afterwards; callers wait a short settle period after `stop` before
    /// releasing so the engine's worker threads can quiesce.
    fn release(&mut self);
}

/// Factory for engine instances, one per slot.
pub trait MediaEngine: Send + Sync {
    fn create_instance(
        &self,
        options: EngineOptions,
    ) -> Result<Box<dyn EngineInstance>, EngineError>;
}

/// Allocator for per-slot rendering surfaces, implemented by the UI
/// collaborator. Each surface is bound to exactly one engine instance at a
/// time and handed back through `release` when its slot is torn down.
pub trait SurfaceProvider: Send {
    fn allocate(&mut self) -> SurfaceHandle;
    fn release(&mut self, surface: SurfaceHandle);
}
