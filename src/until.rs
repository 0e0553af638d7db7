// OPC UA test server for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2021 Alexander Schrode
use opcua_types::status_code::StatusCode;
use opcua_types::{DataValue, DateTime, Variant};

/// Wraps a value into a good DataValue with the given source timestamp
pub fn data_value_at(value: Variant, source_timestamp: DateTime) -> DataValue {
    DataValue {
        value: Some(value),
        status: Some(StatusCode::Good),
        source_timestamp: Some(source_timestamp),
        source_picoseconds: None,
        server_timestamp: None,
        server_picoseconds: None,
    }
}

/// Wraps a value into a good DataValue stamped with the current time
pub fn data_value_now(value: Variant) -> DataValue {
    data_value_at(value, DateTime::now())
}

/// Converts every numeric variant to f64, everything else is None
pub fn variant_as_f64(value: &Variant) -> Option<f64> {
    match *value {
        Variant::SByte(v) => Some(f64::from(v)),
        Variant::Byte(v) => Some(f64::from(v)),
        Variant::Int16(v) => Some(f64::from(v)),
        Variant::UInt16(v) => Some(f64::from(v)),
        Variant::Int32(v) => Some(f64::from(v)),
        Variant::UInt32(v) => Some(f64::from(v)),
        Variant::Int64(v) => Some(v as f64),
        Variant::UInt64(v) => Some(v as f64),
        Variant::Float(v) => Some(f64::from(v)),
        Variant::Double(v) => Some(v),
        _ => None,
    }
}

/// True only for a boolean variant holding true
pub fn variant_is_true(value: &Variant) -> bool {
    matches!(value, Variant::Boolean(true))
}
