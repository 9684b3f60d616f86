//! shufflegrid: playback pool orchestrator for grid-style random video
//! playback.
//!
//! The crate owns a variable-size pool of independent playback engines, one
//! per grid cell. Each slot keeps playing random files from a per-session
//! catalog, replaced on end-of-stream by a poller tick, with per-slot audio
//! routing swaps and pool-wide transport broadcasts. Rendering, window
//! management, and dialogs stay with the host: they reach the pool through
//! the [`protocol`] bus and implement the [`engine`] collaborator traits.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod layout;
pub mod logging;
pub mod poller;
pub mod pool;
pub mod pool_manager;
pub mod protocol;
pub mod selection;
pub mod slot;

pub use catalog::Catalog;
pub use config::Config;
pub use engine::{
    EngineError, EngineInstance, EngineOptions, EngineState, MediaEngine, SurfaceHandle,
    SurfaceProvider,
};
pub use poller::{spawn_tick_scheduler, LifecyclePoller, PoolProgress, TickReport};
pub use pool::{PlaybackPool, PoolError, MAX_SLOTS, MIN_SLOTS};
pub use pool_manager::PoolManager;
pub use protocol::{Message, PoolCommand, PoolEvent};
pub use slot::{Slot, SlotId};
