// OPC UA test server for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2021 Alexander Schrode
mod device;
mod jitter;
mod value;

pub use device::{Device, DeviceSnapshot};
pub use jitter::SmoothJitter;
pub use value::TimestampedValue;

use crate::address_space::VariableNodeBuilder;
use crate::config::SimulationConfiguration;
use crate::constants::{
    BASE_FOLDER, CONTROL_FOLDER, PHYSICAL_PROPERTIES_FOLDER, SIMULATION_FOLDER,
    SIMULATION_NAMESPACE_URI, SIMULATION_PROPERTIES_FOLDER, TEST_NAMESPACE_URI, TICK_PERIOD,
};
use crate::error::NamespaceError;
use crate::namespace::{Namespace, NamespaceContext};
use crate::scheduler::TickScheduler;
use log::{error, info};
use opcua_types::status_code::StatusCode;
use opcua_types::{DataTypeId, DataValue, LocalizedText, NodeId, ReferenceTypeId};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;

type Extractor = fn(&Device) -> DataValue;
type Injector = fn(&Device, DataValue);

/// A device variable and where it lives
struct DeviceVariable {
    folder: &'static str,
    name: &'static str,
    label: &'static str,
    data_type: DataTypeId,
    extractor: Extractor,
    injector: Option<Injector>,
}

const DEVICE_VARIABLES: [DeviceVariable; 5] = [
    DeviceVariable {
        folder: SIMULATION_PROPERTIES_FOLDER,
        name: "ambientTemperatureSetpoint",
        label: "Ambient temperature setpoint",
        data_type: DataTypeId::Double,
        extractor: Device::ambient_temperature_setpoint,
        injector: Some(Device::set_ambient_temperature_setpoint),
    },
    DeviceVariable {
        folder: PHYSICAL_PROPERTIES_FOLDER,
        name: "temperature",
        label: "Temperature",
        data_type: DataTypeId::Double,
        extractor: Device::temperature,
        injector: None,
    },
    DeviceVariable {
        folder: PHYSICAL_PROPERTIES_FOLDER,
        name: "ambientTemperature",
        label: "Ambient temperature",
        data_type: DataTypeId::Double,
        extractor: Device::ambient_temperature,
        injector: None,
    },
    DeviceVariable {
        folder: PHYSICAL_PROPERTIES_FOLDER,
        name: "powerConsumption",
        label: "Power Consumption",
        data_type: DataTypeId::Double,
        extractor: Device::power_consumption,
        injector: None,
    },
    DeviceVariable {
        folder: CONTROL_FOLDER,
        name: "active",
        label: "Active",
        data_type: DataTypeId::Boolean,
        extractor: Device::active,
        injector: Some(Device::set_active),
    },
];

const DEVICE_FOLDERS: [&str; 3] = [
    SIMULATION_PROPERTIES_FOLDER,
    PHYSICAL_PROPERTIES_FOLDER,
    CONTROL_FOLDER,
];

/// Namespace with virtual heating devices, advanced by a periodic tick
pub struct SimulationNamespace {
    configuration: SimulationConfiguration,
    devices: Vec<Arc<Device>>,
    scheduler: TickScheduler,
    seed: Option<u64>,
}

impl SimulationNamespace {
    pub fn new(configuration: SimulationConfiguration) -> Self {
        Self {
            configuration,
            devices: Vec::new(),
            scheduler: TickScheduler::new(TICK_PERIOD),
            seed: None,
        }
    }

    /// Changes the tick period, must be called before startup
    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.scheduler = TickScheduler::new(period);
        self
    }

    /// Seeds the device noise, device n uses seed + n
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn configuration(&self) -> &SimulationConfiguration {
        &self.configuration
    }

    /// Devices in creation order
    pub fn devices(&self) -> &[Arc<Device>] {
        &self.devices
    }

    pub fn is_ticking(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Advances every device once, in creation order
    pub fn tick(&self) {
        tick_all(&self.devices);
    }

    fn create_device(&self, idx: u32) -> Device {
        match self.seed {
            Some(seed) => Device::with_rng(StdRng::seed_from_u64(seed.wrapping_add(u64::from(idx)))),
            None => Device::new(),
        }
    }

    fn create_base_folder(ctx: &mut NamespaceContext<'_>) -> Result<NodeId, NamespaceError> {
        let bulk_index = ctx.namespace_index_of(TEST_NAMESPACE_URI).ok_or_else(|| {
            error!("{} needs the namespace {}", SIMULATION_NAMESPACE_URI, TEST_NAMESPACE_URI);
            NamespaceError::MissingNamespace(TEST_NAMESPACE_URI.to_string())
        })?;
        let root = ctx.add_folder(
            &format!("{}/{}", BASE_FOLDER, SIMULATION_FOLDER),
            SIMULATION_FOLDER,
            SIMULATION_FOLDER,
        )?;
        let parent = NodeId::new(bulk_index, BASE_FOLDER);
        ctx.add_reference(&root, ReferenceTypeId::Organizes, &parent, false)?;
        Ok(root)
    }

    fn register_device(
        ctx: &mut NamespaceContext<'_>,
        base: &NodeId,
        idx: u32,
        device: &Arc<Device>,
    ) -> Result<(), NamespaceError> {
        let name = format!("Device {:04}", idx);
        let device_path = format!("{}/{}/{}", BASE_FOLDER, SIMULATION_FOLDER, name);
        let folder = ctx.add_folder(&device_path, &name, &name)?;
        ctx.add_organizes(base, &folder)?;

        let mut sub_folders = Vec::with_capacity(DEVICE_FOLDERS.len());
        for sub in DEVICE_FOLDERS.iter() {
            let path = format!("{}/{}", device_path, sub);
            let id = ctx.add_folder(&path, sub, sub)?;
            ctx.add_organizes(&folder, &id)?;
            sub_folders.push((*sub, path, id));
        }

        for var in DEVICE_VARIABLES.iter() {
            let (_, path, folder_id) = sub_folders
                .iter()
                .find(|(sub, _, _)| *sub == var.folder)
                .ok_or_else(|| NamespaceError::UnknownNode(ctx.new_node_id(var.folder)))?;
            let node_id = Self::register_variable(ctx, path, var, device)?;
            ctx.add_organizes(folder_id, &node_id)?;
        }
        Ok(())
    }

    fn register_variable(
        ctx: &mut NamespaceContext<'_>,
        folder_path: &str,
        var: &DeviceVariable,
        device: &Arc<Device>,
    ) -> Result<NodeId, NamespaceError> {
        let extractor = var.extractor;
        let source = device.clone();
        let mut builder = VariableNodeBuilder::new(
            ctx.new_node_id(&format!("{}/{}", folder_path, var.name)),
            ctx.new_qualified_name(var.name),
            LocalizedText::new("en", var.label),
        )
        .data_type(var.data_type)
        .value_getter(move || extractor(&source));

        if let Some(injector) = var.injector {
            let target = device.clone();
            let lifecycle = ctx.lifecycle().clone();
            builder = builder.value_setter(move |value: DataValue| -> Result<(), StatusCode> {
                lifecycle.check_writable()?;
                injector(&target, value);
                Ok(())
            });
        }
        ctx.add_variable(builder.build()?)
    }
}

fn tick_all(devices: &[Arc<Device>]) {
    for device in devices {
        device.tick();
    }
}

impl Namespace for SimulationNamespace {
    fn uri(&self) -> &str {
        SIMULATION_NAMESPACE_URI
    }

    fn populate(&mut self, ctx: &mut NamespaceContext<'_>) -> Result<(), NamespaceError> {
        let base = Self::create_base_folder(ctx)?;
        info!(
            "Populating {} with {} devices",
            SIMULATION_NAMESPACE_URI, self.configuration.number_of_devices
        );
        for idx in 0..self.configuration.number_of_devices {
            let device = Arc::new(self.create_device(idx));
            Self::register_device(ctx, &base, idx, &device)?;
            self.devices.push(device);
        }
        // the task list is frozen from here on
        let tasks = self.devices.clone();
        self.scheduler.start(move || tick_all(&tasks))
    }

    fn stop(&mut self) {
        self.scheduler.stop();
    }
}
