//! One playback unit: engine instance + surface + assignment state.

use std::path::{Path, PathBuf};

use crate::engine::{EngineInstance, EngineState, SurfaceHandle};

pub type SlotId = usize;

/// A slot exclusively owns its engine instance for the slot's lifetime.
/// Instances are never shared across slots: per-slot audio routing is fixed
/// at instance creation, so a mute toggle swaps the whole instance while the
/// surface and assignment stay put.
pub struct Slot {
    id: SlotId,
    engine: Box<dyn EngineInstance>,
    surface: SurfaceHandle,
    current_file: Option<PathBuf>,
    muted: bool,
    /// Last captured normalized playback offset, `[0, 1]`.
    position: f32,
}

impl Slot {
    pub fn new(id: SlotId, engine: Box<dyn EngineInstance>, surface: SurfaceHandle) -> Slot {
        Slot {
            id,
            engine,
            surface,
            current_file: None,
            muted: false,
            position: 0.0,
        }
    }

    pub fn id(&self) -> SlotId {
        self.id
    }

    pub fn surface(&self) -> SurfaceHandle {
        self.surface
    }

    pub fn current_file(&self) -> Option<&Path> {
        self.current_file.as_deref()
    }

    pub fn set_current_file(&mut self, file: Option<PathBuf>) {
        self.current_file = file;
    }

    pub fn muted(&self) -> bool {
        self.muted
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn state(&self) -> EngineState {
        self.engine.state()
    }

    /// Reads the engine's current offset and remembers it, so a later
    /// instance swap can resume from where playback actually was.
    pub fn capture_position(&mut self) -> f32 {
        self.position = self.engine.position().clamp(0.0, 1.0);
        self.position
    }

    pub fn last_position(&self) -> f32 {
        self.position
    }

    pub fn engine(&self) -> &dyn EngineInstance {
        self.engine.as_ref()
    }

    pub fn engine_mut(&mut self) -> &mut dyn EngineInstance {
        self.engine.as_mut()
    }

    /// Swaps in a replacement engine instance, returning the retired one.
    /// The caller is responsible for having stopped and settled the old
    /// instance first.
    pub fn replace_engine(&mut self, engine: Box<dyn EngineInstance>) -> Box<dyn EngineInstance> {
        std::mem::replace(&mut self.engine, engine)
    }
}
