//! Event-bus protocol shared by the pool manager and the UI collaborator.
//!
//! Commands flow from UI handlers into the pool manager; notifications flow
//! back out for labels, warnings, and the shared scrubber. The pool manager
//! is the single consumer of commands, so all pool mutation stays on its
//! thread.

use std::path::PathBuf;

use crate::slot::SlotId;

/// Top-level envelope for all bus traffic.
#[derive(Debug, Clone)]
pub enum Message {
    Pool(PoolCommand),
    Ui(PoolEvent),
}

/// Commands into the pool manager.
#[derive(Debug, Clone)]
pub enum PoolCommand {
    /// Discover playable files under a root folder and start a fresh set.
    LoadFolder(PathBuf),
    /// Grow or shrink the pool.
    SetSlotCount(usize),
    PlayAll,
    PauseAll,
    StopAll,
    /// Manual skip: fresh random set in every slot.
    NextAll,
    /// Manual playlist pick for one slot, bypassing random selection.
    ReplaceSlot { slot: SlotId, path: PathBuf },
    SetSlotMuted { slot: SlotId, muted: bool },
    /// Global volume, `0..=100`.
    SetVolume(u8),
    SetGlobalMute(bool),
    /// Shared-scrubber seek, normalized `0..1`, broadcast to every slot.
    SeekAll(f32),
    /// Re-issue surface bindings after the UI re-parented the video area.
    RebindSurfaces,
    /// Periodic lifecycle poll, posted by the tick scheduler.
    Tick,
    /// Stop everything, release engine resources, end the manager loop.
    Shutdown,
}

/// Notifications out of the pool manager.
#[derive(Debug, Clone)]
pub enum PoolEvent {
    CatalogLoaded { root: PathBuf, file_count: usize },
    /// Folder had no playable files; playback controls stay disabled.
    CatalogRejected { root: PathBuf, reason: String },
    /// Comma-joined basenames of the assigned files, in slot order.
    NowPlayingChanged(String),
    /// One slot's recoverable failure; siblings are unaffected.
    SlotFailed { slot: SlotId, reason: String },
    /// Aggregate progress of the furthest-along stream.
    Progress {
        position: f32,
        elapsed_ms: u64,
        total_ms: u64,
    },
    SlotCountChanged(usize),
    PlaybackStopped,
}
