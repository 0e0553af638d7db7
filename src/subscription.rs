// OPC UA test server for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2021 Alexander Schrode
use crate::address_space::{read_lock, NodeManagerRef};
use log::{debug, trace, warn};
use opcua_types::{DataValue, MonitoringMode, NodeId, Variant};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::time::Duration;

/// A monitored Value attribute as announced by the session layer
#[derive(Debug, Clone)]
pub struct DataItem {
    pub id: u32,
    pub node_id: NodeId,
    /// Sampling interval in milliseconds
    pub sampling_interval: f64,
    pub monitoring_mode: MonitoringMode,
}

impl DataItem {
    pub fn new(id: u32, node_id: NodeId, sampling_interval: f64) -> Self {
        Self {
            id,
            node_id,
            sampling_interval,
            monitoring_mode: MonitoringMode::Reporting,
        }
    }
}

/// Value change reported for a data item
#[derive(Debug, Clone)]
pub struct Notification {
    pub item_id: u32,
    pub value: DataValue,
}

struct SampledItem {
    item: DataItem,
    since_last_sample: Duration,
    last_value: Option<Variant>,
}

/// Sampling interval in milliseconds as Duration. Negative and NaN
/// intervals sample on every pass, unrepresentable ones saturate.
fn sampling_period(interval_ms: f64) -> Duration {
    Duration::try_from_secs_f64(interval_ms.max(0.0) / 1000.0).unwrap_or(Duration::MAX)
}

/// Samples the value getters of monitored variables at their negotiated rate.
/// Only the last sampled variant is kept, to detect changes.
pub struct SubscriptionModel {
    node_manager: NodeManagerRef,
    items: Mutex<BTreeMap<u32, SampledItem>>,
}

impl SubscriptionModel {
    pub fn new(node_manager: NodeManagerRef) -> Self {
        Self {
            node_manager,
            items: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn on_data_items_created(&self, data_items: &[DataItem]) {
        let mut items = self.items.lock();
        for item in data_items {
            debug!("Monitoring {} as item {}", item.node_id, item.id);
            items.insert(
                item.id,
                SampledItem {
                    item: item.clone(),
                    // first sample happens right away
                    since_last_sample: sampling_period(item.sampling_interval),
                    last_value: None,
                },
            );
        }
    }

    pub fn on_data_items_modified(&self, data_items: &[DataItem]) {
        let mut items = self.items.lock();
        for item in data_items {
            match items.get_mut(&item.id) {
                Some(sampled) => sampled.item = item.clone(),
                None => warn!("Modifying unknown data item {}", item.id),
            }
        }
    }

    pub fn on_data_items_deleted(&self, data_items: &[DataItem]) {
        let mut items = self.items.lock();
        for item in data_items {
            items.remove(&item.id);
        }
    }

    pub fn on_monitoring_mode_changed(&self, data_items: &[DataItem]) {
        let mut items = self.items.lock();
        for item in data_items {
            if let Some(sampled) = items.get_mut(&item.id) {
                sampled.item.monitoring_mode = item.monitoring_mode;
            }
        }
    }

    pub fn item_count(&self) -> usize {
        self.items.lock().len()
    }

    /// Advances the sampling clocks by elapsed, samples every due item and
    /// returns the changes of reporting items
    pub fn sample(&self, elapsed: Duration) -> Vec<Notification> {
        let node_manager = match read_lock(&*self.node_manager) {
            Ok(nm) => nm,
            Err(_) => return Vec::new(),
        };
        let mut notifications = Vec::new();
        let mut items = self.items.lock();
        for sampled in items.values_mut() {
            if sampled.item.monitoring_mode == MonitoringMode::Disabled {
                continue;
            }
            sampled.since_last_sample = sampled.since_last_sample.saturating_add(elapsed);
            let interval = sampling_period(sampled.item.sampling_interval);
            if sampled.since_last_sample < interval {
                continue;
            }
            sampled.since_last_sample = Duration::from_secs(0);
            let value = match node_manager.read_value(&sampled.item.node_id) {
                Ok(v) => v,
                Err(err) => {
                    trace!("Sampling {} failed: {}", sampled.item.node_id, err);
                    continue;
                }
            };
            if value.value == sampled.last_value {
                continue;
            }
            sampled.last_value = value.value.clone();
            if sampled.item.monitoring_mode == MonitoringMode::Reporting {
                notifications.push(Notification {
                    item_id: sampled.item.id,
                    value,
                });
            }
        }
        notifications
    }
}
