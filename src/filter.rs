// OPC UA test server for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2021 Alexander Schrode
use opcua_types::status_code::StatusCode;
use opcua_types::DataValue;
use std::fmt;
use std::sync::Arc;

/// Produces the Value attribute of a variable each time it is read.
/// Implementations must be cheap and must not block.
pub trait ValueGetter: Send + Sync {
    fn get(&self) -> DataValue;
}

/// Consumes a written Value attribute. Values that can't be converted
/// to the target type are dropped and reported as success.
pub trait ValueSetter: Send + Sync {
    fn set(&self, value: DataValue) -> Result<(), StatusCode>;
}

impl<F> ValueGetter for F
where
    F: Fn() -> DataValue + Send + Sync,
{
    fn get(&self) -> DataValue {
        self()
    }
}

impl<F> ValueSetter for F
where
    F: Fn(DataValue) -> Result<(), StatusCode> + Send + Sync,
{
    fn set(&self, value: DataValue) -> Result<(), StatusCode> {
        self(value)
    }
}

/// Interceptor on the Value attribute of a variable
#[derive(Clone)]
pub enum AttributeFilter {
    GetValue(Arc<dyn ValueGetter>),
    SetValue(Arc<dyn ValueSetter>),
}

impl AttributeFilter {
    pub fn get_value<G: ValueGetter + 'static>(getter: G) -> Self {
        Self::GetValue(Arc::new(getter))
    }

    pub fn set_value<S: ValueSetter + 'static>(setter: S) -> Self {
        Self::SetValue(Arc::new(setter))
    }
}

impl fmt::Debug for AttributeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GetValue(_) => f.write_str("GetValue"),
            Self::SetValue(_) => f.write_str("SetValue"),
        }
    }
}

/// Ordered list of attribute filters. The first filter that handles an
/// access wins.
#[derive(Clone, Debug, Default)]
pub struct FilterChain {
    filters: Vec<AttributeFilter>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_last(&mut self, filter: AttributeFilter) {
        self.filters.push(filter);
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn getter(&self) -> Option<Arc<dyn ValueGetter>> {
        self.filters.iter().find_map(|f| match f {
            AttributeFilter::GetValue(g) => Some(g.clone()),
            AttributeFilter::SetValue(_) => None,
        })
    }

    pub fn setter(&self) -> Option<Arc<dyn ValueSetter>> {
        self.filters.iter().find_map(|f| match f {
            AttributeFilter::SetValue(s) => Some(s.clone()),
            AttributeFilter::GetValue(_) => None,
        })
    }

    pub fn has_setter(&self) -> bool {
        self.setter().is_some()
    }

    /// Reads the value through the first getter, None if no getter is installed
    pub fn get_value(&self) -> Option<DataValue> {
        self.getter().map(|g| g.get())
    }

    /// Writes the value through the first setter, None if no setter is installed
    pub fn set_value(&self, value: DataValue) -> Option<Result<(), StatusCode>> {
        self.setter().map(|s| s.set(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::until::data_value_now;
    use opcua_types::Variant;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn first_getter_wins() {
        let mut chain = FilterChain::new();
        assert!(chain.get_value().is_none());
        chain.add_last(AttributeFilter::get_value(|| data_value_now(Variant::Int32(1))));
        chain.add_last(AttributeFilter::get_value(|| data_value_now(Variant::Int32(2))));
        let dv = chain.get_value().unwrap();
        assert_eq!(dv.value, Some(Variant::Int32(1)));
        assert!(!chain.has_setter());
    }

    #[test]
    fn setter_receives_written_value() {
        let stored = Arc::new(AtomicI32::new(0));
        let target = stored.clone();
        let mut chain = FilterChain::new();
        chain.add_last(AttributeFilter::get_value(|| data_value_now(Variant::Empty)));
        chain.add_last(AttributeFilter::set_value(move |dv: DataValue| -> Result<(), StatusCode> {
            if let Some(Variant::Int32(v)) = dv.value {
                target.store(v, Ordering::SeqCst);
            }
            Ok(())
        }));
        assert!(chain.has_setter());
        assert_eq!(chain.len(), 2);
        let res = chain.set_value(data_value_now(Variant::Int32(42)));
        assert_eq!(res, Some(Ok(())));
        assert_eq!(stored.load(Ordering::SeqCst), 42);
    }
}
