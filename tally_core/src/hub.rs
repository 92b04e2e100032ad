//! The broadcast/query facade tying the pipeline stages together.
//!
//! One `MonitorHub` holds every per-device store (window, config, state)
//! keyed by device id with lazy create on first access; nothing is shared
//! across device keys. The hub itself is plain synchronous code with no
//! interior locking; `service::MonitorService` runs it on a single owning
//! thread when real concurrency is needed.

use std::collections::HashMap;

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::error::ValidationError;
use crate::history::{HistoryBuffer, HistoryCfg, HistoryEntry};
use crate::inventory::{CountChange, InventoryCfg, InventoryState, apply_stable_weight};
use crate::reading::{Reading, StatusTag};
use crate::stabilizer::{Classification, DeviceWindow, Stability, StabilizerCfg, StabilizerMode};

/// A reading enriched with its classification and the device's current
/// count. Broadcast for every ingested reading, stable or not.
#[derive(Debug, Clone)]
pub struct EnrichedReading {
    pub device_id: String,
    pub weight_kg: Option<f64>,
    pub stability: Stability,
    /// Current accepted count, once the device has inventory state.
    pub item_count: Option<u32>,
    /// Item delta produced by this reading; nonzero only when a delta was
    /// accepted.
    pub item_delta: i64,
    pub at_ms: u64,
    pub raw_payload: String,
}

/// Events fanned out to subscribers.
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    /// Every ingested reading.
    Reading(EnrichedReading),
    /// An accepted nonzero item delta.
    CountChanged {
        device_id: String,
        item_delta: i64,
        item_count: u32,
        at_ms: u64,
    },
    /// A device's configuration was replaced and its state reset.
    ConfigReset {
        device_id: String,
        config: InventoryCfg,
        state: InventoryState,
    },
    /// The count was overwritten by an external command.
    ManualCountSet { device_id: String, item_count: u32 },
}

#[derive(Debug)]
pub struct MonitorHub {
    mode: StabilizerMode,
    stabilizer: StabilizerCfg,
    default_inventory: InventoryCfg,
    idle_device_ms: u64,
    history: HistoryBuffer,
    windows: HashMap<String, DeviceWindow>,
    configs: HashMap<String, InventoryCfg>,
    states: HashMap<String, InventoryState>,
    latest: HashMap<String, EnrichedReading>,
    subscribers: Vec<Sender<MonitorEvent>>,
}

impl MonitorHub {
    pub fn builder() -> HubBuilder {
        HubBuilder::default()
    }

    /// Register a new observer. The receiver sees every event from now on;
    /// dropping it unsubscribes on the next broadcast.
    pub fn subscribe(&mut self) -> Receiver<MonitorEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Feed one raw reading. Never blocks and never fails: unparsable
    /// payloads are broadcast with no value and skip all further math.
    pub fn ingest(
        &mut self,
        device_id: Option<&str>,
        payload: &str,
        at_ms: u64,
        tag: Option<StatusTag>,
    ) {
        let reading = Reading::from_payload(device_id, payload, at_ms, tag);

        let classification = match reading.weight_kg {
            None => {
                tracing::debug!(
                    device = %reading.device_id,
                    payload = %reading.raw_payload,
                    "unparsable payload forwarded without value"
                );
                Classification::unstable()
            }
            Some(kg) => {
                let window = self.windows.entry(reading.device_id.clone()).or_default();
                match self.mode {
                    StabilizerMode::Computed => window.observe(&self.stabilizer, at_ms, kg),
                    StabilizerMode::Tagged => window.observe_tagged(at_ms, kg, reading.tag),
                }
            }
        };

        let mut item_delta = 0i64;
        let mut change_event = None;
        if let Some(stable_kg) = classification.emitted_kg {
            let cfg = self
                .configs
                .get(&reading.device_id)
                .unwrap_or(&self.default_inventory)
                .clone();
            let state = self
                .states
                .entry(reading.device_id.clone())
                .or_insert_with(|| InventoryState::seeded(&cfg));
            let outcome = apply_stable_weight(state, &cfg, stable_kg);
            match outcome.change {
                CountChange::Initialized => {
                    tracing::info!(
                        device = %reading.device_id,
                        count = outcome.item_count,
                        kg = stable_kg,
                        "count anchored"
                    );
                    self.history.push(
                        at_ms,
                        HistoryEntry {
                            device_id: reading.device_id.clone(),
                            weight_kg: stable_kg,
                            item_count: outcome.item_count,
                            at_ms,
                        },
                    );
                }
                CountChange::Accepted => {
                    item_delta = outcome.delta;
                    tracing::info!(
                        device = %reading.device_id,
                        delta = outcome.delta,
                        count = outcome.item_count,
                        kg = stable_kg,
                        "count changed"
                    );
                    self.history.push(
                        at_ms,
                        HistoryEntry {
                            device_id: reading.device_id.clone(),
                            weight_kg: stable_kg,
                            item_count: outcome.item_count,
                            at_ms,
                        },
                    );
                    change_event = Some(MonitorEvent::CountChanged {
                        device_id: reading.device_id.clone(),
                        item_delta: outcome.delta,
                        item_count: outcome.item_count,
                        at_ms,
                    });
                }
                CountChange::Rejected => {
                    tracing::debug!(
                        device = %reading.device_id,
                        kg = stable_kg,
                        "delta rejected by policy"
                    );
                }
                CountChange::Noise => {}
            }
        }

        let item_count = self.states.get(&reading.device_id).map(|s| s.item_count);
        let enriched = EnrichedReading {
            device_id: reading.device_id,
            weight_kg: reading.weight_kg,
            stability: classification.stability,
            item_count,
            item_delta,
            at_ms,
            raw_payload: reading.raw_payload,
        };
        self.latest
            .insert(enriched.device_id.clone(), enriched.clone());
        self.broadcast(MonitorEvent::Reading(enriched));
        if let Some(event) = change_event {
            self.broadcast(event);
        }
    }

    /// Replace a device's configuration. Resets that device's state to the
    /// new baseline, observably, and emits a reset event. Rejection leaves
    /// everything untouched.
    pub fn set_config(
        &mut self,
        device_id: &str,
        cfg: InventoryCfg,
    ) -> Result<(), ValidationError> {
        cfg.validate()?;
        let state = InventoryState::seeded(&cfg);
        self.configs.insert(device_id.to_string(), cfg.clone());
        self.states.insert(device_id.to_string(), state.clone());
        tracing::info!(
            device = device_id,
            count = state.item_count,
            "inventory config replaced; state reset"
        );
        self.broadcast(MonitorEvent::ConfigReset {
            device_id: device_id.to_string(),
            config: cfg,
            state,
        });
        Ok(())
    }

    /// Overwrite the current count without touching the stable-weight
    /// anchor or the configuration. Emits a reset notification distinct
    /// from a change event.
    pub fn set_manual_count(&mut self, device_id: &str, count: i64) -> Result<u32, ValidationError> {
        if count < 0 {
            return Err(ValidationError::new("count", "must be >= 0"));
        }
        let count = u32::try_from(count).map_err(|_| ValidationError::new("count", "out of range"))?;
        {
            let cfg = self
                .configs
                .get(device_id)
                .unwrap_or(&self.default_inventory);
            let state = self
                .states
                .entry(device_id.to_string())
                .or_insert_with(|| InventoryState::seeded(cfg));
            state.item_count = count;
        }
        tracing::info!(device = device_id, count, "count set manually");
        self.broadcast(MonitorEvent::ManualCountSet {
            device_id: device_id.to_string(),
            item_count: count,
        });
        Ok(count)
    }

    /// Current history in arrival order; all devices when `device_id` is
    /// `None`. Reads run the age sweep but are otherwise idempotent.
    pub fn history_snapshot(&mut self, now_ms: u64, device_id: Option<&str>) -> Vec<HistoryEntry> {
        self.history.snapshot(now_ms, device_id)
    }

    /// Most recent enriched reading for a device, if it has reported.
    pub fn latest_reading(&self, device_id: &str) -> Option<&EnrichedReading> {
        self.latest.get(device_id)
    }

    /// Timer-driven sweep: history age eviction and idle-window discard.
    /// Inventory state and configs survive; only the sample window goes.
    pub fn prune(&mut self, now_ms: u64) {
        self.history.prune_age(now_ms);
        let idle = self.idle_device_ms;
        if idle > 0 {
            self.windows.retain(|device_id, window| {
                let keep = window.idle_for(now_ms) < idle;
                if !keep {
                    tracing::debug!(device = %device_id, "discarding idle device window");
                }
                keep
            });
        }
    }

    fn broadcast(&mut self, event: MonitorEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

/// Builder for `MonitorHub`. Every section defaults; `build()` validates.
#[derive(Default)]
pub struct HubBuilder {
    mode: StabilizerMode,
    stabilizer: Option<StabilizerCfg>,
    history: Option<HistoryCfg>,
    default_inventory: Option<InventoryCfg>,
    idle_device_ms: Option<u64>,
}

impl HubBuilder {
    pub fn with_mode(mut self, mode: StabilizerMode) -> Self {
        self.mode = mode;
        self
    }
    pub fn with_stabilizer(mut self, cfg: StabilizerCfg) -> Self {
        self.stabilizer = Some(cfg);
        self
    }
    pub fn with_history(mut self, cfg: HistoryCfg) -> Self {
        self.history = Some(cfg);
        self
    }
    pub fn with_default_inventory(mut self, cfg: InventoryCfg) -> Self {
        self.default_inventory = Some(cfg);
        self
    }
    pub fn with_idle_device_ms(mut self, ms: u64) -> Self {
        self.idle_device_ms = Some(ms);
        self
    }

    /// Validate and build the hub.
    pub fn build(self) -> crate::error::Result<MonitorHub> {
        let stabilizer = self.stabilizer.unwrap_or_default();
        if stabilizer.window_ms == 0 {
            return Err(eyre::Report::new(ValidationError::new(
                "window_ms",
                "must be >= 1",
            )));
        }
        if !stabilizer.max_delta_kg.is_finite() || stabilizer.max_delta_kg < 0.0 {
            return Err(eyre::Report::new(ValidationError::new(
                "max_delta_kg",
                "must be a finite value >= 0",
            )));
        }
        if stabilizer.min_samples == 0 {
            return Err(eyre::Report::new(ValidationError::new(
                "min_samples",
                "must be >= 1",
            )));
        }

        let history = self.history.unwrap_or_default();
        if history.retention_ms == 0 {
            return Err(eyre::Report::new(ValidationError::new(
                "retention_ms",
                "must be >= 1",
            )));
        }
        if history.max_entries == 0 {
            return Err(eyre::Report::new(ValidationError::new(
                "max_entries",
                "must be >= 1",
            )));
        }

        let default_inventory = self.default_inventory.unwrap_or_default();
        default_inventory.validate().map_err(eyre::Report::new)?;

        Ok(MonitorHub {
            mode: self.mode,
            stabilizer,
            default_inventory,
            idle_device_ms: self.idle_device_ms.unwrap_or(5 * 60 * 1000),
            history: HistoryBuffer::new(history),
            windows: HashMap::new(),
            configs: HashMap::new(),
            states: HashMap::new(),
            latest: HashMap::new(),
            subscribers: Vec::new(),
        })
    }
}
