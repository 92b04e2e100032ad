//! The owning-thread service loop around `MonitorHub`.
//!
//! One thread owns the hub; every mutation arrives over a command channel,
//! which serializes each device's detector -> delta -> history chain in
//! arrival order without any locking. The same loop runs the low-frequency
//! prune tick.
//!
//! Safety: each `MonitorService` spawns exactly one thread that is shut
//! down and joined when the service is dropped, preventing thread leaks.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel as xch;
use tally_traits::clock::Clock;
use tally_traits::{RawMessage, RawSource};

use crate::error::{Report, Result, ServiceError, ValidationError};
use crate::history::HistoryEntry;
use crate::hub::{EnrichedReading, MonitorEvent, MonitorHub};
use crate::inventory::InventoryCfg;
use crate::reading::StatusTag;

enum Command {
    Ingest {
        device_id: Option<String>,
        payload: String,
        tag: Option<StatusTag>,
    },
    SetConfig {
        device_id: String,
        cfg: InventoryCfg,
        reply: xch::Sender<std::result::Result<(), ValidationError>>,
    },
    SetManualCount {
        device_id: String,
        count: i64,
        reply: xch::Sender<std::result::Result<u32, ValidationError>>,
    },
    Snapshot {
        device_id: Option<String>,
        reply: xch::Sender<Vec<HistoryEntry>>,
    },
    LatestReading {
        device_id: String,
        reply: xch::Sender<Option<EnrichedReading>>,
    },
    Subscribe {
        reply: xch::Sender<xch::Receiver<MonitorEvent>>,
    },
}

pub struct MonitorService {
    tx: Option<xch::Sender<Command>>,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl MonitorService {
    /// Spawn the owning thread. `prune_every` bounds how often the history
    /// age sweep and idle-window discard run while the loop is otherwise
    /// idle.
    pub fn spawn<C>(mut hub: MonitorHub, clock: C, prune_every: Duration) -> Self
    where
        C: Clock + Send + Sync + 'static,
    {
        let (tx, rx) = xch::unbounded::<Command>();
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_flag = shutdown.clone();

        let join_handle = std::thread::spawn(move || {
            let epoch = clock.now();
            loop {
                if shutdown_flag.load(Ordering::Relaxed) {
                    tracing::debug!("monitor service received shutdown signal");
                    break;
                }
                match rx.recv_timeout(prune_every) {
                    Ok(cmd) => {
                        let now_ms = clock.ms_since(epoch);
                        handle(&mut hub, cmd, now_ms);
                    }
                    Err(xch::RecvTimeoutError::Timeout) => {
                        hub.prune(clock.ms_since(epoch));
                    }
                    Err(xch::RecvTimeoutError::Disconnected) => {
                        tracing::debug!("all service handles dropped, exiting thread");
                        break;
                    }
                }
            }
            tracing::trace!("monitor service thread exiting cleanly");
        });

        Self {
            tx: Some(tx),
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    /// Fire-and-forget raw reading, stamped with the loop's arrival time.
    /// Never blocks and never errors; dropped silently if the loop is gone.
    pub fn ingest(&self, device_id: Option<&str>, payload: &str, tag: Option<StatusTag>) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(Command::Ingest {
                device_id: device_id.map(str::to_string),
                payload: payload.to_string(),
                tag,
            });
        }
    }

    pub fn subscribe(&self) -> Result<xch::Receiver<MonitorEvent>> {
        let (reply, rx) = xch::bounded(1);
        self.send(Command::Subscribe { reply })?;
        rx.recv().map_err(|_| Report::new(ServiceError::Stopped))
    }

    pub fn set_config(&self, device_id: &str, cfg: InventoryCfg) -> Result<()> {
        let (reply, rx) = xch::bounded(1);
        self.send(Command::SetConfig {
            device_id: device_id.to_string(),
            cfg,
            reply,
        })?;
        rx.recv()
            .map_err(|_| Report::new(ServiceError::Stopped))?
            .map_err(Report::new)
    }

    pub fn set_manual_count(&self, device_id: &str, count: i64) -> Result<u32> {
        let (reply, rx) = xch::bounded(1);
        self.send(Command::SetManualCount {
            device_id: device_id.to_string(),
            count,
            reply,
        })?;
        rx.recv()
            .map_err(|_| Report::new(ServiceError::Stopped))?
            .map_err(Report::new)
    }

    pub fn history_snapshot(&self, device_id: Option<&str>) -> Result<Vec<HistoryEntry>> {
        let (reply, rx) = xch::bounded(1);
        self.send(Command::Snapshot {
            device_id: device_id.map(str::to_string),
            reply,
        })?;
        rx.recv().map_err(|_| Report::new(ServiceError::Stopped))
    }

    pub fn latest_reading(&self, device_id: &str) -> Result<Option<EnrichedReading>> {
        let (reply, rx) = xch::bounded(1);
        self.send(Command::LatestReading {
            device_id: device_id.to_string(),
            reply,
        })?;
        rx.recv().map_err(|_| Report::new(ServiceError::Stopped))
    }

    /// Drain a transport source into the loop until the source ends, the
    /// service shuts down, or the source fails.
    pub fn pump<S: RawSource>(&self, source: &mut S) -> Result<()> {
        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                return Ok(());
            }
            match source.recv() {
                Ok(Some(RawMessage {
                    device_id,
                    payload,
                    status,
                })) => {
                    let tag = status.as_deref().and_then(StatusTag::parse);
                    self.ingest(device_id.as_deref(), &payload, tag);
                }
                Ok(None) => return Ok(()),
                Err(e) => return Err(eyre::eyre!("raw source failed: {e}")),
            }
        }
    }

    fn send(&self, cmd: Command) -> Result<()> {
        let tx = self.tx.as_ref().ok_or_else(|| Report::new(ServiceError::Stopped))?;
        tx.send(cmd).map_err(|_| Report::new(ServiceError::Stopped))
    }
}

fn handle(hub: &mut MonitorHub, cmd: Command, now_ms: u64) {
    match cmd {
        Command::Ingest {
            device_id,
            payload,
            tag,
        } => hub.ingest(device_id.as_deref(), &payload, now_ms, tag),
        Command::SetConfig {
            device_id,
            cfg,
            reply,
        } => {
            let _ = reply.send(hub.set_config(&device_id, cfg));
        }
        Command::SetManualCount {
            device_id,
            count,
            reply,
        } => {
            let _ = reply.send(hub.set_manual_count(&device_id, count));
        }
        Command::Snapshot { device_id, reply } => {
            let _ = reply.send(hub.history_snapshot(now_ms, device_id.as_deref()));
        }
        Command::LatestReading { device_id, reply } => {
            let _ = reply.send(hub.latest_reading(&device_id).cloned());
        }
        Command::Subscribe { reply } => {
            let _ = reply.send(hub.subscribe());
        }
    }
}

impl Drop for MonitorService {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        // Disconnect the command channel so a parked recv_timeout wakes now
        // instead of at the next prune tick.
        drop(self.tx.take());
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => tracing::trace!("monitor service thread joined"),
                Err(e) => tracing::warn!(?e, "monitor service thread panicked during shutdown"),
            }
        }
    }
}
