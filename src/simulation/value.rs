// OPC UA test server for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2021 Alexander Schrode
use crate::until::data_value_at;
use opcua_types::{DataValue, DateTime, Variant};

/// A value with the source timestamp of its last change
#[derive(Debug, Clone)]
pub struct TimestampedValue<T> {
    value: T,
    timestamp: DateTime,
}

impl<T> TimestampedValue<T>
where
    T: PartialEq + Clone + Into<Variant>,
{
    pub fn new(value: T) -> Self {
        Self {
            value,
            timestamp: DateTime::now(),
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn timestamp(&self) -> &DateTime {
        &self.timestamp
    }

    /// Stores the value, the timestamp only moves if the value differs.
    /// Returns true on change.
    pub fn set_value(&mut self, value: T) -> bool {
        if self.value == value {
            return false;
        }
        self.value = value;
        self.timestamp = DateTime::now();
        true
    }

    pub fn as_data_value(&self) -> DataValue {
        data_value_at(self.value.clone().into(), self.timestamp.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn equal_writes_keep_timestamp() {
        let mut v = TimestampedValue::new(1.5_f64);
        let initial = v.timestamp().clone();
        thread::sleep(Duration::from_millis(5));
        assert!(!v.set_value(1.5));
        assert_eq!(v.timestamp(), &initial);

        assert!(v.set_value(2.5));
        let changed = v.timestamp().clone();
        assert!(changed != initial);
        thread::sleep(Duration::from_millis(5));
        assert!(!v.set_value(2.5));
        assert_eq!(v.timestamp(), &changed);
    }

    #[test]
    fn data_value_carries_source_timestamp() {
        let v = TimestampedValue::new(true);
        let dv = v.as_data_value();
        assert_eq!(dv.value, Some(Variant::Boolean(true)));
        assert_eq!(dv.source_timestamp.as_ref(), Some(v.timestamp()));
    }
}
