// OPC UA test server for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2021 Alexander Schrode
use super::jitter::SmoothJitter;
use super::value::TimestampedValue;
use crate::constants::{
    HEATING_GAIN, INITIAL_TEMPERATURE, JITTER_BANDWIDTH, JITTER_SAMPLES, POWER_DEVIATION,
    POWER_MEAN, THERMAL_DECAY,
};
use crate::until::{variant_as_f64, variant_is_true};
use log::debug;
use opcua_types::DataValue;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Consistent copy of the device fields
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceSnapshot {
    pub ambient_temperature_setpoint: f64,
    pub ambient_temperature: f64,
    pub temperature: f64,
    pub power_consumption: f64,
    pub active: bool,
}

struct DeviceState {
    ambient_temperature_setpoint: TimestampedValue<f64>,
    ambient_temperature: TimestampedValue<f64>,
    temperature: TimestampedValue<f64>,
    power_consumption: TimestampedValue<f64>,
    active: TimestampedValue<bool>,
    jitter: SmoothJitter,
    rng: StdRng,
}

impl DeviceState {
    fn tick(&mut self) {
        let ambient = *self.ambient_temperature_setpoint.value() + self.jitter.next(&mut self.rng);
        self.ambient_temperature.set_value(ambient);

        let mut diff = (*self.temperature.value() - ambient) * THERMAL_DECAY;
        if *self.active.value() {
            let noise: f64 = self.rng.sample(StandardNormal);
            self.power_consumption
                .set_value(POWER_MEAN + POWER_DEVIATION * noise);
            diff += HEATING_GAIN;
        } else {
            self.power_consumption.set_value(0.0);
        }

        self.temperature.set_value(ambient + diff);
    }
}

/// A virtual heating device. All fields sit behind one lock so a tick is
/// observed either completely or not at all.
pub struct Device {
    state: Mutex<DeviceState>,
}

impl Device {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Creates a device drawing its noise from rng. The first tick is
    /// already applied.
    pub fn with_rng(mut rng: StdRng) -> Self {
        let jitter = SmoothJitter::new(&mut rng, JITTER_SAMPLES, JITTER_BANDWIDTH);
        let device = Self {
            state: Mutex::new(DeviceState {
                ambient_temperature_setpoint: TimestampedValue::new(INITIAL_TEMPERATURE),
                ambient_temperature: TimestampedValue::new(INITIAL_TEMPERATURE),
                temperature: TimestampedValue::new(INITIAL_TEMPERATURE),
                power_consumption: TimestampedValue::new(0.0),
                active: TimestampedValue::new(false),
                jitter,
                rng,
            }),
        };
        device.tick();
        device
    }

    /// Advances the thermal model by one step
    pub fn tick(&self) {
        self.state.lock().tick();
    }

    pub fn snapshot(&self) -> DeviceSnapshot {
        let state = self.state.lock();
        DeviceSnapshot {
            ambient_temperature_setpoint: *state.ambient_temperature_setpoint.value(),
            ambient_temperature: *state.ambient_temperature.value(),
            temperature: *state.temperature.value(),
            power_consumption: *state.power_consumption.value(),
            active: *state.active.value(),
        }
    }

    pub fn ambient_temperature_setpoint(&self) -> DataValue {
        self.state.lock().ambient_temperature_setpoint.as_data_value()
    }

    pub fn ambient_temperature(&self) -> DataValue {
        self.state.lock().ambient_temperature.as_data_value()
    }

    pub fn temperature(&self) -> DataValue {
        self.state.lock().temperature.as_data_value()
    }

    pub fn power_consumption(&self) -> DataValue {
        self.state.lock().power_consumption.as_data_value()
    }

    pub fn active(&self) -> DataValue {
        self.state.lock().active.as_data_value()
    }

    /// Takes any numeric value, everything else is ignored
    pub fn set_ambient_temperature_setpoint(&self, data_value: DataValue) {
        match data_value.value.as_ref().and_then(variant_as_f64) {
            Some(v) => {
                self.state.lock().ambient_temperature_setpoint.set_value(v);
            }
            None => debug!("Ignoring non numeric setpoint {:?}", data_value.value),
        }
    }

    /// Only a boolean true activates the device, anything else deactivates it
    pub fn set_active(&self, data_value: DataValue) {
        let active = data_value
            .value
            .as_ref()
            .map(variant_is_true)
            .unwrap_or(false);
        self.state.lock().active.set_value(active);
    }
}

impl Default for Device {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::until::data_value_now;
    use opcua_types::Variant;

    fn device() -> Device {
        Device::with_rng(StdRng::seed_from_u64(42))
    }

    #[test]
    fn starts_idle() {
        let d = device();
        let s = d.snapshot();
        assert_eq!(s.ambient_temperature_setpoint, INITIAL_TEMPERATURE);
        assert_eq!(s.power_consumption, 0.0);
        assert!(!s.active);
        // the construction tick moved the ambient by the jitter only
        assert!((s.ambient_temperature - INITIAL_TEMPERATURE).abs() < 1.0);
        assert!((s.temperature - INITIAL_TEMPERATURE).abs() < 1.0);
    }

    #[test]
    fn setpoint_round_trip() {
        let d = device();
        d.set_ambient_temperature_setpoint(data_value_now(Variant::Double(21.123456789)));
        assert_eq!(
            d.ambient_temperature_setpoint().value,
            Some(Variant::Double(21.123456789))
        );
        d.set_ambient_temperature_setpoint(data_value_now(Variant::Int32(30)));
        assert_eq!(d.snapshot().ambient_temperature_setpoint, 30.0);
    }

    #[test]
    fn bad_setpoint_is_ignored() {
        let d = device();
        d.set_ambient_temperature_setpoint(data_value_now(Variant::from("hot")));
        d.set_ambient_temperature_setpoint(data_value_now(Variant::Boolean(true)));
        d.set_ambient_temperature_setpoint(data_value_now(Variant::Empty));
        assert_eq!(d.snapshot().ambient_temperature_setpoint, INITIAL_TEMPERATURE);
    }

    #[test]
    fn active_requires_boolean_true() {
        let d = device();
        d.set_active(data_value_now(Variant::Boolean(true)));
        assert!(d.snapshot().active);
        d.set_active(data_value_now(Variant::Int32(1)));
        assert!(!d.snapshot().active);
        d.set_active(data_value_now(Variant::Boolean(true)));
        d.set_active(data_value_now(Variant::Empty));
        assert!(!d.snapshot().active);
    }

    #[test]
    fn active_device_heats_and_draws_power() {
        let d = device();
        d.set_active(data_value_now(Variant::Boolean(true)));
        d.tick();
        let s = d.snapshot();
        assert!(s.power_consumption >= 500.0 && s.power_consumption <= 1500.0);
        assert!(s.temperature > s.ambient_temperature);
    }

    #[test]
    fn inactive_device_draws_no_power() {
        let d = device();
        d.set_active(data_value_now(Variant::Boolean(true)));
        d.tick();
        d.set_active(data_value_now(Variant::Boolean(false)));
        d.tick();
        assert_eq!(d.snapshot().power_consumption, 0.0);
        assert_eq!(d.power_consumption().value, Some(Variant::Double(0.0)));
    }

    #[test]
    fn temperature_decays_to_setpoint() {
        let d = device();
        d.set_active(data_value_now(Variant::Boolean(true)));
        for _ in 0..20 {
            d.tick();
        }
        d.set_active(data_value_now(Variant::Boolean(false)));
        let start = d.snapshot();
        let initial_gap = (start.temperature - start.ambient_temperature_setpoint).abs();
        assert!(initial_gap > 5.0);
        for k in 1..=30 {
            d.tick();
            let s = d.snapshot();
            let bound = THERMAL_DECAY.powi(k) * initial_gap + 1.5;
            assert!((s.temperature - s.ambient_temperature_setpoint).abs() <= bound);
        }
    }

    #[test]
    fn setpoint_step_settles() {
        let d = device();
        d.set_ambient_temperature_setpoint(data_value_now(Variant::Double(25.0)));
        for _ in 0..100 {
            d.tick();
        }
        let s = d.snapshot();
        assert!((s.temperature - 25.0).abs() <= 1.5);
        assert!((s.ambient_temperature - 25.0).abs() <= 1.5);
    }
}
