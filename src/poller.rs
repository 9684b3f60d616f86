//! Periodic lifecycle observation over the pool.
//!
//! The engine binding exposes no push callbacks we can rely on across
//! platforms, so slot lifecycle is observed by polling: a scheduler thread
//! posts a tick on the bus every couple hundred milliseconds, and the
//! manager thread runs [`LifecyclePoller::tick`] against the pool. The tick
//! is the single authoritative place where engine state transitions cause
//! side effects; an engine binding with an event callback should forward
//! into the same pool entry points rather than mutating slots itself.

use std::{path::PathBuf, thread, time::Duration};

use log::{debug, warn};
use tokio::sync::broadcast::Sender;

use crate::{
    engine::EngineState,
    pool::PlaybackPool,
    protocol::{Message, PoolCommand},
    slot::SlotId,
};

/// Pool-wide aggregates for the shared scrubber. The single slider tracks
/// the furthest-along stream, so ties break toward the maximum reported
/// position and length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolProgress {
    /// Maximum normalized position across slots, `[0, 1]`.
    pub position: f32,
    /// Maximum elapsed time across slots, in milliseconds.
    pub elapsed_ms: u64,
    /// Maximum known media length across slots, in milliseconds.
    pub total_ms: u64,
}

/// One slot's recoverable failure noticed during a tick.
#[derive(Debug, Clone)]
pub struct SlotFailure {
    pub slot: SlotId,
    pub message: String,
}

/// Everything one tick did, for the manager to turn into bus events.
#[derive(Debug, Default)]
pub struct TickReport {
    /// Slots that received a fresh assignment this tick.
    pub replaced: Vec<(SlotId, PathBuf)>,
    pub failures: Vec<SlotFailure>,
    /// Present whenever at least one slot knows its media length.
    pub progress: Option<PoolProgress>,
}

#[derive(Debug, Default)]
pub struct LifecyclePoller;

impl LifecyclePoller {
    pub fn new() -> LifecyclePoller {
        LifecyclePoller
    }

    /// Inspects every slot once and reacts to terminal engine states.
    ///
    /// Ended slots get the next random file (their own finished file is in
    /// the exclusion set, so it can only recur through the small-catalog
    /// fallback). Errored slots are reported and then skipped forward the
    /// same way: engine errors are recoverable, never fatal to the pool.
    pub fn tick(&mut self, pool: &mut PlaybackPool) -> TickReport {
        let mut report = TickReport {
            progress: aggregate_progress(pool),
            ..TickReport::default()
        };

        for slot_id in 0..pool.slot_count() {
            match pool.slots()[slot_id].state() {
                EngineState::Ended => {
                    debug!("Slot {}: media ended, assigning next file", slot_id);
                    match pool.assign_random(slot_id) {
                        Ok(path) => report.replaced.push((slot_id, path)),
                        Err(err) => {
                            warn!("Slot {}: replacement failed: {}", slot_id, err);
                            report.failures.push(SlotFailure {
                                slot: slot_id,
                                message: err.to_string(),
                            });
                        }
                    }
                }
                EngineState::Error => {
                    warn!("Slot {}: engine reported an error, skipping ahead", slot_id);
                    report.failures.push(SlotFailure {
                        slot: slot_id,
                        message: "playback error, skipping to next file".to_string(),
                    });
                    match pool.assign_random(slot_id) {
                        Ok(path) => report.replaced.push((slot_id, path)),
                        Err(err) => {
                            warn!("Slot {}: recovery assignment failed: {}", slot_id, err);
                        }
                    }
                }
                _ => {}
            }
        }

        report
    }
}

fn aggregate_progress(pool: &PlaybackPool) -> Option<PoolProgress> {
    let mut progress: Option<PoolProgress> = None;
    for slot in pool.slots() {
        let engine = slot.engine();
        let length_ms = engine.length_ms();
        if length_ms == 0 {
            continue;
        }
        let entry = progress.get_or_insert(PoolProgress {
            position: 0.0,
            elapsed_ms: 0,
            total_ms: 0,
        });
        entry.position = entry.position.max(engine.position());
        entry.elapsed_ms = entry.elapsed_ms.max(engine.time_ms());
        entry.total_ms = entry.total_ms.max(length_ms);
    }
    progress
}

/// Spawns the tick scheduler thread: posts `PoolCommand::Tick` on the bus
/// every `interval` until the bus has no receivers left, then exits.
///
/// The scheduler never touches the pool itself; only the manager thread
/// mutates it, which keeps the single-threaded cooperative model intact
/// and guarantees ticks never overlap.
pub fn spawn_tick_scheduler(
    bus_sender: Sender<Message>,
    interval: Duration,
) -> thread::JoinHandle<()> {
    thread::spawn(move || loop {
        thread::sleep(interval);
        if bus_sender.send(Message::Pool(PoolCommand::Tick)).is_err() {
            debug!("Tick scheduler exiting: bus has no receivers");
            break;
        }
    })
}
