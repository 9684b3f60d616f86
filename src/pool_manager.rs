//! Bus-driven manager that owns the playback pool on a single thread.
//!
//! UI handlers and the tick scheduler only ever post commands on the bus;
//! this pump is the one place that touches the pool, which is what makes
//! resize and mute-toggle non-reentrancy a non-issue.

use log::{debug, warn};
use tokio::sync::broadcast::{error::RecvError, Receiver, Sender};

use crate::{
    poller::LifecyclePoller,
    pool::PlaybackPool,
    protocol::{Message, PoolCommand, PoolEvent},
};

pub struct PoolManager {
    pool: PlaybackPool,
    poller: LifecyclePoller,
    bus_receiver: Receiver<Message>,
    bus_sender: Sender<Message>,
}

impl PoolManager {
    pub fn new(
        pool: PlaybackPool,
        bus_receiver: Receiver<Message>,
        bus_sender: Sender<Message>,
    ) -> PoolManager {
        PoolManager {
            pool,
            poller: LifecyclePoller::new(),
            bus_receiver,
            bus_sender,
        }
    }

    /// Pumps bus commands until `Shutdown` arrives or the bus closes.
    pub fn run(&mut self) {
        loop {
            match self.bus_receiver.blocking_recv() {
                Ok(Message::Pool(command)) => {
                    if self.handle_command(command) {
                        break;
                    }
                }
                Ok(Message::Ui(_)) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!("PoolManager: bus lagged, skipped {} messages", skipped);
                }
                Err(RecvError::Closed) => {
                    debug!("PoolManager: bus closed, shutting pool down");
                    self.pool.shutdown();
                    break;
                }
            }
        }
    }

    /// Returns true when the manager loop should end.
    fn handle_command(&mut self, command: PoolCommand) -> bool {
        match command {
            PoolCommand::LoadFolder(root) => match self.pool.load_catalog(&root) {
                Ok(file_count) => {
                    self.emit(PoolEvent::CatalogLoaded {
                        root,
                        file_count,
                    });
                    // The original player starts a fresh random set as soon
                    // as a folder with playable files is chosen.
                    match self.pool.reshuffle_all() {
                        Ok(label) => self.emit(PoolEvent::NowPlayingChanged(label)),
                        Err(err) => warn!("Initial shuffle failed: {}", err),
                    }
                }
                Err(err) => {
                    warn!("Folder rejected: {}", err);
                    self.emit(PoolEvent::CatalogRejected {
                        root,
                        reason: err.to_string(),
                    });
                }
            },
            PoolCommand::SetSlotCount(count) => match self.pool.resize(count) {
                Ok(()) => {
                    self.emit(PoolEvent::SlotCountChanged(self.pool.slot_count()));
                    self.emit(PoolEvent::NowPlayingChanged(self.pool.now_playing_label()));
                }
                Err(err) => warn!("Resize to {} rejected: {}", count, err),
            },
            PoolCommand::PlayAll => match self.pool.play_all() {
                Ok(Some(label)) => self.emit(PoolEvent::NowPlayingChanged(label)),
                Ok(None) => {}
                Err(err) => warn!("Play failed: {}", err),
            },
            PoolCommand::PauseAll => self.pool.pause_all(),
            PoolCommand::StopAll => {
                self.pool.stop_all();
                self.emit(PoolEvent::PlaybackStopped);
            }
            PoolCommand::NextAll => match self.pool.reshuffle_all() {
                Ok(label) => self.emit(PoolEvent::NowPlayingChanged(label)),
                Err(err) => warn!("Shuffle failed: {}", err),
            },
            PoolCommand::ReplaceSlot { slot, path } => {
                match self.pool.replace_slot(slot, &path) {
                    Ok(()) => {
                        self.emit(PoolEvent::NowPlayingChanged(self.pool.now_playing_label()))
                    }
                    Err(err) => {
                        warn!("Slot {}: manual pick failed: {}", slot, err);
                        self.emit(PoolEvent::SlotFailed {
                            slot,
                            reason: err.to_string(),
                        });
                    }
                }
            }
            PoolCommand::SetSlotMuted { slot, muted } => {
                if let Err(err) = self.pool.set_individual_mute(slot, muted) {
                    warn!("Slot {}: mute toggle failed: {}", slot, err);
                    self.emit(PoolEvent::SlotFailed {
                        slot,
                        reason: err.to_string(),
                    });
                }
            }
            PoolCommand::SetVolume(volume) => self.pool.set_global_volume(volume),
            PoolCommand::SetGlobalMute(muted) => self.pool.set_global_mute(muted),
            PoolCommand::SeekAll(position) => self.pool.set_position_all(position),
            PoolCommand::RebindSurfaces => self.pool.rebind_all_surfaces(),
            PoolCommand::Tick => self.handle_tick(),
            PoolCommand::Shutdown => {
                self.pool.shutdown();
                return true;
            }
        }
        false
    }

    fn handle_tick(&mut self) {
        let report = self.poller.tick(&mut self.pool);
        for failure in &report.failures {
            self.emit(PoolEvent::SlotFailed {
                slot: failure.slot,
                reason: failure.message.clone(),
            });
        }
        if !report.replaced.is_empty() {
            self.emit(PoolEvent::NowPlayingChanged(self.pool.now_playing_label()));
        }
        if let Some(progress) = report.progress {
            self.emit(PoolEvent::Progress {
                position: progress.position,
                elapsed_ms: progress.elapsed_ms,
                total_ms: progress.total_ms,
            });
        }
    }

    fn emit(&self, event: PoolEvent) {
        let _ = self.bus_sender.send(Message::Ui(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Config,
        engine::fake::{FakeEngine, FakeSurfaces},
        engine::EngineState,
    };
    use std::{
        fs,
        path::PathBuf,
        sync::Arc,
        thread,
        time::{Duration, Instant},
    };
    use tokio::sync::broadcast::{self, error::TryRecvError};

    struct PoolManagerHarness {
        bus_sender: broadcast::Sender<Message>,
        receiver: broadcast::Receiver<Message>,
        engine: FakeEngine,
        root: PathBuf,
    }

    impl PoolManagerHarness {
        fn new(name: &str, files: &[&str]) -> Self {
            let root = std::env::temp_dir().join(format!("shufflegrid-manager-{}", name));
            let _ = fs::remove_dir_all(&root);
            fs::create_dir_all(&root).expect("failed to create scratch dir");
            for file in files {
                fs::write(root.join(file), b"").expect("failed to create file");
            }

            let engine = FakeEngine::new();
            let mut config = Config::default();
            config.timing.stop_settle_ms = 0;
            config.timing.teardown_settle_ms = 0;
            let pool = PlaybackPool::new(
                Arc::new(engine.clone()),
                Box::new(FakeSurfaces::default()),
                config,
            );

            let (bus_sender, _) = broadcast::channel(4096);
            let manager_receiver = bus_sender.subscribe();
            let manager_sender = bus_sender.clone();
            thread::spawn(move || {
                let mut manager = PoolManager::new(pool, manager_receiver, manager_sender);
                manager.run();
            });

            let receiver = bus_sender.subscribe();
            PoolManagerHarness {
                bus_sender,
                receiver,
                engine,
                root,
            }
        }

        fn send(&self, command: PoolCommand) {
            self.bus_sender
                .send(Message::Pool(command))
                .expect("failed to send command to bus");
        }

        fn drain_messages(&mut self) {
            loop {
                match self.receiver.try_recv() {
                    Ok(_) => {}
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Lagged(_)) => continue,
                    Err(TryRecvError::Closed) => break,
                }
            }
        }
    }

    impl Drop for PoolManagerHarness {
        fn drop(&mut self) {
            let _ = self.bus_sender.send(Message::Pool(PoolCommand::Shutdown));
            let _ = fs::remove_dir_all(&self.root);
        }
    }

    fn wait_for_message<F>(
        receiver: &mut broadcast::Receiver<Message>,
        timeout: Duration,
        mut predicate: F,
    ) -> Message
    where
        F: FnMut(&Message) -> bool,
    {
        let start = Instant::now();
        loop {
            if start.elapsed() > timeout {
                panic!("timed out waiting for expected message");
            }
            match receiver.try_recv() {
                Ok(message) => {
                    if predicate(&message) {
                        return message;
                    }
                }
                Err(TryRecvError::Empty) => thread::sleep(Duration::from_millis(5)),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Closed) => panic!("bus closed while waiting for message"),
            }
        }
    }

    #[test]
    fn test_load_folder_reports_catalog_and_starts_playback() {
        let mut harness =
            PoolManagerHarness::new("load", &["a.mp4", "b.mkv", "c.webm", "skip.txt"]);
        harness.send(PoolCommand::SetSlotCount(2));
        wait_for_message(&mut harness.receiver, Duration::from_secs(1), |message| {
            matches!(message, Message::Ui(PoolEvent::SlotCountChanged(2)))
        });

        harness.send(PoolCommand::LoadFolder(harness.root.clone()));

        let loaded = wait_for_message(&mut harness.receiver, Duration::from_secs(1), |message| {
            matches!(message, Message::Ui(PoolEvent::CatalogLoaded { .. }))
        });
        if let Message::Ui(PoolEvent::CatalogLoaded { file_count, .. }) = loaded {
            assert_eq!(file_count, 3, "txt file is filtered out");
        }
        let playing = wait_for_message(&mut harness.receiver, Duration::from_secs(1), |message| {
            matches!(message, Message::Ui(PoolEvent::NowPlayingChanged(_)))
        });
        if let Message::Ui(PoolEvent::NowPlayingChanged(label)) = playing {
            assert_eq!(label.split(", ").count(), 2, "one basename per slot");
        }
    }

    #[test]
    fn test_empty_folder_is_rejected_without_killing_the_manager() {
        let mut harness = PoolManagerHarness::new("empty", &["notes.txt"]);
        harness.send(PoolCommand::SetSlotCount(1));
        wait_for_message(&mut harness.receiver, Duration::from_secs(1), |message| {
            matches!(message, Message::Ui(PoolEvent::SlotCountChanged(1)))
        });

        harness.send(PoolCommand::LoadFolder(harness.root.clone()));
        wait_for_message(&mut harness.receiver, Duration::from_secs(1), |message| {
            matches!(message, Message::Ui(PoolEvent::CatalogRejected { .. }))
        });

        // Manager still answers commands afterwards.
        harness.drain_messages();
        harness.send(PoolCommand::SetSlotCount(2));
        wait_for_message(&mut harness.receiver, Duration::from_secs(1), |message| {
            matches!(message, Message::Ui(PoolEvent::SlotCountChanged(2)))
        });
    }

    #[test]
    fn test_tick_replaces_an_ended_slot_and_updates_the_label() {
        let mut harness = PoolManagerHarness::new("tick", &["a.mp4", "b.mkv", "c.webm"]);
        harness.send(PoolCommand::SetSlotCount(2));
        harness.send(PoolCommand::LoadFolder(harness.root.clone()));
        wait_for_message(&mut harness.receiver, Duration::from_secs(1), |message| {
            matches!(message, Message::Ui(PoolEvent::NowPlayingChanged(_)))
        });
        harness.drain_messages();

        harness.engine.set_state(0, EngineState::Ended);
        harness.send(PoolCommand::Tick);

        wait_for_message(&mut harness.receiver, Duration::from_secs(1), |message| {
            matches!(message, Message::Ui(PoolEvent::NowPlayingChanged(_)))
        });
        assert_eq!(harness.engine.state_of(0), Some(EngineState::Playing));
    }

    #[test]
    fn test_tick_reports_progress_for_the_scrubber() {
        let mut harness = PoolManagerHarness::new("progress", &["a.mp4"]);
        harness.send(PoolCommand::SetSlotCount(1));
        harness.send(PoolCommand::LoadFolder(harness.root.clone()));
        wait_for_message(&mut harness.receiver, Duration::from_secs(1), |message| {
            matches!(message, Message::Ui(PoolEvent::NowPlayingChanged(_)))
        });
        harness.drain_messages();

        harness.engine.set_progress(0, 0.5, 30_000, 60_000);
        harness.send(PoolCommand::Tick);

        let progress = wait_for_message(&mut harness.receiver, Duration::from_secs(1), |message| {
            matches!(message, Message::Ui(PoolEvent::Progress { .. }))
        });
        if let Message::Ui(PoolEvent::Progress {
            position,
            elapsed_ms,
            total_ms,
        }) = progress
        {
            assert!((position - 0.5).abs() < f32::EPSILON);
            assert_eq!(elapsed_ms, 30_000);
            assert_eq!(total_ms, 60_000);
        }
    }

    #[test]
    fn test_errored_slot_surfaces_a_warning_event() {
        let mut harness = PoolManagerHarness::new("errored", &["a.mp4", "b.mkv"]);
        harness.send(PoolCommand::SetSlotCount(1));
        harness.send(PoolCommand::LoadFolder(harness.root.clone()));
        wait_for_message(&mut harness.receiver, Duration::from_secs(1), |message| {
            matches!(message, Message::Ui(PoolEvent::NowPlayingChanged(_)))
        });
        harness.drain_messages();

        harness.engine.set_state(0, EngineState::Error);
        harness.send(PoolCommand::Tick);

        wait_for_message(&mut harness.receiver, Duration::from_secs(1), |message| {
            matches!(message, Message::Ui(PoolEvent::SlotFailed { slot: 0, .. }))
        });
        // The same tick already skipped the slot forward.
        assert_eq!(harness.engine.state_of(0), Some(EngineState::Playing));
    }

    #[test]
    fn test_stop_all_emits_playback_stopped() {
        let mut harness = PoolManagerHarness::new("stop", &["a.mp4"]);
        harness.send(PoolCommand::SetSlotCount(1));
        harness.send(PoolCommand::LoadFolder(harness.root.clone()));
        wait_for_message(&mut harness.receiver, Duration::from_secs(1), |message| {
            matches!(message, Message::Ui(PoolEvent::NowPlayingChanged(_)))
        });

        harness.send(PoolCommand::StopAll);
        wait_for_message(&mut harness.receiver, Duration::from_secs(1), |message| {
            matches!(message, Message::Ui(PoolEvent::PlaybackStopped))
        });
        assert_eq!(harness.engine.state_of(0), Some(EngineState::Idle));
    }
}
