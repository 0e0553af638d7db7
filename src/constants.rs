// OPC UA test server for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2021 Alexander Schrode
use std::time::Duration;

/// Uri of the bulk namespace. The "milo" token is part of the wire contract.
pub const TEST_NAMESPACE_URI: &str = "urn:omp:milo:test-namespace";
/// Uri of the device simulation namespace
pub const SIMULATION_NAMESPACE_URI: &str = "urn:omp:milo:simulation-namespace";

pub const SERVER_NAME: &str = "OMP OPC UA Test Server";
pub const PRODUCT_URI: &str = "urn:omp:milo:test-server";
pub const DEFAULT_TCP_PORT: u16 = 12686;
/// Path of the session endpoints
pub const DEFAULT_ENDPOINT_PATH: &str = "/milo";
/// Appended to the endpoint path for the unsecured discovery endpoint
pub const DISCOVERY_SUFFIX: &str = "/discovery";
pub const DEFAULT_SECURITY_DIRECTORY: &str = "security";
/// Built in user accepted by the username token policy
pub const DEFAULT_USER: &str = "milo";
pub const DEFAULT_PASSWORD: &str = "the-power-of-open";

/// Root folder of the bulk namespace, also the parent of the simulation root
pub const BASE_FOLDER: &str = "OMP";
pub const SINGLE_PREFIX: &str = "Single";
pub const ARRAY_PREFIX: &str = "Array";

pub const SIMULATION_FOLDER: &str = "Simulation";
pub const SIMULATION_PROPERTIES_FOLDER: &str = "Simulation Properties";
pub const PHYSICAL_PROPERTIES_FOLDER: &str = "Physical Properties";
pub const CONTROL_FOLDER: &str = "Control";

/// Period of the simulation tick
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Number of samples averaged by the ambient noise generator
pub const JITTER_SAMPLES: usize = 30;
/// Scale applied to every gaussian sample of the ambient noise generator
pub const JITTER_BANDWIDTH: f64 = 0.5;

pub const INITIAL_TEMPERATURE: f64 = 15.0;
/// Fraction of the temperature difference kept per tick
pub const THERMAL_DECAY: f64 = 0.9;
/// Temperature gain per tick of an active device
pub const HEATING_GAIN: f64 = 2.0;
pub const POWER_MEAN: f64 = 1000.0;
pub const POWER_DEVIATION: f64 = 100.0;
