//! The playback pool: owns every slot and drives assignment and transport.
//!
//! All mutation happens on the manager thread (bus pump or poller tick), so
//! the pool itself carries no locks. Engine commands are fire-and-forget;
//! the only waits are short settle sleeps after `stop` before an instance is
//! released, because the engine's worker threads need a moment to quiesce.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    thread,
    time::Duration,
};

use log::{debug, info, warn};
use rand::rngs::StdRng;
use thiserror::Error;

use crate::{
    catalog::Catalog,
    config::Config,
    engine::{EngineError, EngineOptions, EngineState, MediaEngine, SurfaceProvider},
    selection,
    slot::{Slot, SlotId},
};

/// Supported pool size range.
pub const MIN_SLOTS: usize = 1;
pub const MAX_SLOTS: usize = 9;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("no playable files found under {}", root.display())]
    CatalogEmpty { root: PathBuf },
    #[error("no catalog loaded")]
    NoCatalog,
    #[error("no slot with id {0}")]
    NoSuchSlot(SlotId),
    #[error("requested slot count {requested} outside supported range {min}..={max}")]
    InvalidResizeTarget {
        requested: usize,
        min: usize,
        max: usize,
    },
    #[error("slot {slot} failed to open {}", path.display())]
    EngineOpenFailed {
        slot: SlotId,
        path: PathBuf,
        #[source]
        source: EngineError,
    },
    #[error(transparent)]
    Engine(#[from] EngineError),
}

pub struct PlaybackPool {
    engine: Arc<dyn MediaEngine>,
    surfaces: Box<dyn SurfaceProvider>,
    config: Config,
    slots: Vec<Slot>,
    catalog: Option<Catalog>,
    global_volume: u8,
    global_muted: bool,
    rng: StdRng,
}

impl PlaybackPool {
    pub fn new(
        engine: Arc<dyn MediaEngine>,
        surfaces: Box<dyn SurfaceProvider>,
        config: Config,
    ) -> PlaybackPool {
        let global_volume = config.playback.default_volume.min(100);
        PlaybackPool {
            engine,
            surfaces,
            config,
            slots: Vec::new(),
            catalog: None,
            global_volume,
            global_muted: false,
            rng: selection::new_selection_rng(),
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn catalog(&self) -> Option<&Catalog> {
        self.catalog.as_ref()
    }

    pub fn global_volume(&self) -> u8 {
        self.global_volume
    }

    pub fn global_muted(&self) -> bool {
        self.global_muted
    }

    /// Discovers playable files under `root` and replaces the session
    /// catalog wholesale. Running slots keep playing their old files until
    /// the next assignment touches them.
    pub fn load_catalog(&mut self, root: &Path) -> Result<usize, PoolError> {
        let catalog = Catalog::load(root)?;
        let file_count = catalog.len();
        info!(
            "Catalog replaced: {} files under {}",
            file_count,
            root.display()
        );
        self.catalog = Some(catalog);
        Ok(file_count)
    }

    /// Installs an already-built catalog (manual file drops).
    pub fn set_catalog(&mut self, catalog: Catalog) {
        self.catalog = Some(catalog);
    }

    /// Grows or shrinks the pool to `new_count` slots.
    ///
    /// Growing allocates a fresh surface and engine instance per new slot
    /// and, when a catalog is loaded, assigns and starts a random file in
    /// each. Shrinking retires the trailing slots in reverse-index order:
    /// stop, settle, release instance, release surface. Surfaces of
    /// surviving slots are untouched; `new_count == current` is a no-op.
    pub fn resize(&mut self, new_count: usize) -> Result<(), PoolError> {
        if !(MIN_SLOTS..=MAX_SLOTS).contains(&new_count) {
            return Err(PoolError::InvalidResizeTarget {
                requested: new_count,
                min: MIN_SLOTS,
                max: MAX_SLOTS,
            });
        }

        while self.slots.len() > new_count {
            let mut slot = self.slots.pop().expect("checked non-empty");
            debug!("Retiring slot {}", slot.id());
            self.retire_slot(&mut slot);
        }

        while self.slots.len() < new_count {
            let id = self.slots.len();
            let surface = self.surfaces.allocate();
            let instance = match self.engine.create_instance(EngineOptions::default()) {
                Ok(instance) => instance,
                Err(err) => {
                    self.surfaces.release(surface);
                    return Err(err.into());
                }
            };
            let mut slot = Slot::new(id, instance, surface);
            slot.engine_mut().bind_output(surface);
            self.slots.push(slot);
            debug!("Created slot {} on surface {:?}", id, surface);

            if self.catalog.is_some() {
                if let Err(err) = self.assign_random(id) {
                    warn!("Slot {}: initial assignment failed: {}", id, err);
                }
            }
        }

        Ok(())
    }

    /// Picks a random file for one slot (excluding everything currently
    /// assigned anywhere in the pool, including this slot's own prior file)
    /// and starts it.
    pub fn assign_random(&mut self, slot_id: SlotId) -> Result<PathBuf, PoolError> {
        if slot_id >= self.slots.len() {
            return Err(PoolError::NoSuchSlot(slot_id));
        }
        let catalog = self.catalog.as_ref().ok_or(PoolError::NoCatalog)?;
        let excluded: Vec<PathBuf> = self
            .slots
            .iter()
            .filter_map(|slot| slot.current_file().map(Path::to_path_buf))
            .collect();
        let chosen = selection::choose_next(catalog.files(), &excluded, &mut self.rng)
            .ok_or(PoolError::NoCatalog)?
            .to_path_buf();
        self.start_slot_file(slot_id, &chosen)?;
        Ok(chosen)
    }

    /// Assigns an explicit file to one slot, bypassing random selection.
    /// Used for manual playlist picks.
    pub fn replace_slot(&mut self, slot_id: SlotId, path: &Path) -> Result<(), PoolError> {
        if slot_id >= self.slots.len() {
            return Err(PoolError::NoSuchSlot(slot_id));
        }
        self.start_slot_file(slot_id, path)
    }

    /// Clears every assignment, then assigns and starts a fresh random file
    /// in each slot. Returns the now-playing label (basenames in slot
    /// order). Per-slot open failures are logged and skipped; the loop
    /// always visits every slot.
    pub fn reshuffle_all(&mut self) -> Result<String, PoolError> {
        if self.catalog.is_none() {
            return Err(PoolError::NoCatalog);
        }
        for slot in &mut self.slots {
            slot.set_current_file(None);
        }
        for slot_id in 0..self.slots.len() {
            if let Err(err) = self.assign_random(slot_id) {
                warn!("Slot {}: reshuffle assignment failed: {}", slot_id, err);
            }
        }
        Ok(self.now_playing_label())
    }

    /// Resumes paused playback, or, when every slot is terminal
    /// (Idle/Ended), starts a fresh random set instead. Returns the new
    /// now-playing label when a reshuffle happened.
    pub fn play_all(&mut self) -> Result<Option<String>, PoolError> {
        let all_terminal = self
            .slots
            .iter()
            .all(|slot| matches!(slot.state(), EngineState::Idle | EngineState::Ended));
        if all_terminal {
            let label = self.reshuffle_all()?;
            return Ok(Some(label));
        }
        for slot in &mut self.slots {
            slot.engine_mut().play();
        }
        Ok(None)
    }

    pub fn pause_all(&mut self) {
        for slot in &mut self.slots {
            slot.engine_mut().pause();
        }
    }

    /// Stops every active slot, settling after each stop. Assignments are
    /// kept; the next `play_all` over the resulting terminal states starts
    /// a fresh random set.
    pub fn stop_all(&mut self) {
        let settle_ms = self.config.timing.stop_settle_ms;
        for slot in &mut self.slots {
            if matches!(
                slot.state(),
                EngineState::Playing | EngineState::Paused | EngineState::Opening
            ) {
                slot.capture_position();
                slot.engine_mut().stop();
                settle(settle_ms);
            }
        }
    }

    /// Flips one slot's individual mute by replacing its engine instance,
    /// preserving the current file and playback position.
    ///
    /// Audio routing is fixed at instance creation, so this is a real
    /// teardown/recreate: capture position, stop, settle, create the
    /// replacement with the flipped routing, release the old instance,
    /// rebind the same surface, reopen, seek, resume. The replacement is
    /// created before the old instance is released so a creation failure
    /// leaves the slot with its previous instance and mute state.
    pub fn set_individual_mute(&mut self, slot_id: SlotId, muted: bool) -> Result<(), PoolError> {
        if slot_id >= self.slots.len() {
            return Err(PoolError::NoSuchSlot(slot_id));
        }
        if self.slots[slot_id].muted() == muted {
            return Ok(());
        }

        let position = self.slots[slot_id].capture_position();
        let current = self.slots[slot_id].current_file().map(Path::to_path_buf);
        let surface = self.slots[slot_id].surface();

        self.slots[slot_id].engine_mut().stop();
        settle(self.config.timing.stop_settle_ms);

        let replacement = self
            .engine
            .create_instance(EngineOptions { silent: muted })
            .map_err(|err| {
                warn!(
                    "Slot {}: mute toggle kept previous routing, replacement instance failed: {}",
                    slot_id, err
                );
                err
            })?;

        let mut retired = self.slots[slot_id].replace_engine(replacement);
        retired.release();
        drop(retired);

        self.slots[slot_id].set_muted(muted);
        self.slots[slot_id].engine_mut().bind_output(surface);

        if let Some(path) = current {
            let volume = self.effective_volume(muted);
            let slot = &mut self.slots[slot_id];
            let engine = slot.engine_mut();
            engine
                .open(&path)
                .map_err(|err| PoolError::EngineOpenFailed {
                    slot: slot_id,
                    path: path.clone(),
                    source: err,
                })?;
            engine.set_position(position);
            engine.play();
            engine.set_volume(volume);
            slot.set_current_file(Some(path));
        }
        debug!("Slot {}: individual mute set to {}", slot_id, muted);
        Ok(())
    }

    /// Applies a new global volume to every slot. Individually muted slots
    /// get an effective volume of 0 on top of their silent routing.
    pub fn set_global_volume(&mut self, volume: u8) {
        self.global_volume = volume.min(100);
        self.apply_effective_volumes();
    }

    pub fn set_global_mute(&mut self, muted: bool) {
        self.global_muted = muted;
        self.apply_effective_volumes();
    }

    /// Broadcast seek for the shared scrubber: every slot jumps to the same
    /// normalized offset.
    pub fn set_position_all(&mut self, position: f32) {
        let clamped = position.clamp(0.0, 1.0);
        for slot in &mut self.slots {
            slot.engine_mut().set_position(clamped);
        }
    }

    /// Re-issues the surface binding for every slot. Required after surface
    /// re-parenting (entering/leaving an exclusive full-area mode) because
    /// some platforms lose the output association across reparenting.
    pub fn rebind_all_surfaces(&mut self) {
        for slot in &mut self.slots {
            let surface = slot.surface();
            slot.engine_mut().bind_output(surface);
        }
    }

    /// Comma-joined basenames of the assigned files, in slot order.
    pub fn now_playing_label(&self) -> String {
        let names: Vec<String> = self
            .slots
            .iter()
            .filter_map(|slot| slot.current_file())
            .map(|path| {
                path.file_name()
                    .map(|name| name.to_string_lossy().to_string())
                    .unwrap_or_else(|| path.display().to_string())
            })
            .collect();
        names.join(", ")
    }

    /// Stops and releases every slot, then waits for the engine's worker
    /// threads before returning. Called once ahead of process teardown.
    pub fn shutdown(&mut self) {
        let settle_ms = self.config.timing.stop_settle_ms;
        for mut slot in self.slots.drain(..) {
            if matches!(
                slot.state(),
                EngineState::Playing | EngineState::Paused | EngineState::Opening
            ) {
                slot.engine_mut().stop();
            }
            settle(settle_ms);
            slot.engine_mut().release();
            self.surfaces.release(slot.surface());
        }
        settle(self.config.timing.teardown_settle_ms);
        info!("Playback pool shut down");
    }

    fn retire_slot(&mut self, slot: &mut Slot) {
        if matches!(
            slot.state(),
            EngineState::Playing | EngineState::Paused | EngineState::Opening
        ) {
            slot.engine_mut().stop();
            settle(self.config.timing.stop_settle_ms);
        }
        slot.engine_mut().release();
        self.surfaces.release(slot.surface());
    }

    /// Opens and starts `path` on one slot. On failure the slot keeps its
    /// previous assignment state and becomes eligible for the poller's
    /// retry when its engine reports `Error`.
    fn start_slot_file(&mut self, slot_id: SlotId, path: &Path) -> Result<(), PoolError> {
        let muted = self.slots[slot_id].muted();
        let volume = self.effective_volume(muted);
        let slot = &mut self.slots[slot_id];
        let engine = slot.engine_mut();
        engine
            .open(path)
            .map_err(|err| PoolError::EngineOpenFailed {
                slot: slot_id,
                path: path.to_path_buf(),
                source: err,
            })?;
        engine.play();
        engine.set_volume(volume);
        engine.set_mute(false);
        slot.set_current_file(Some(path.to_path_buf()));
        Ok(())
    }

    fn effective_volume(&self, slot_muted: bool) -> u8 {
        if self.global_muted || slot_muted {
            0
        } else {
            self.global_volume
        }
    }

    fn apply_effective_volumes(&mut self) {
        let global_muted = self.global_muted;
        let global_volume = self.global_volume;
        for slot in &mut self.slots {
            let volume = if global_muted || slot.muted() {
                0
            } else {
                global_volume
            };
            slot.engine_mut().set_volume(volume);
        }
    }
}

fn settle(settle_ms: u64) {
    if settle_ms > 0 {
        thread::sleep(Duration::from_millis(settle_ms));
    }
}
