// OPC UA test server for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2021 Alexander Schrode
use crate::address_space::VariableNodeBuilder;
use crate::config::TestConfiguration;
use crate::constants::{ARRAY_PREFIX, BASE_FOLDER, SINGLE_PREFIX, TEST_NAMESPACE_URI};
use crate::error::NamespaceError;
use crate::namespace::{Namespace, NamespaceContext};
use crate::until::data_value_now;
use log::{info, trace};
use opcua_types::status_code::StatusCode;
use opcua_types::{DataTypeId, DataValue, LocalizedText, NodeId, ReferenceTypeId, Variant};
use rand::Rng;

/// Primitive types exposed by the bulk namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestType {
    Int64,
    Float,
    Boolean,
}

/// Types of the scalar instances
pub const SINGLE_TYPES: [TestType; 3] = [TestType::Int64, TestType::Float, TestType::Boolean];
/// Types of the array instances, for now the same as the scalars
pub const ARRAY_TYPES: [TestType; 3] = SINGLE_TYPES;

impl TestType {
    /// Browse name of the variable
    pub fn name(self) -> &'static str {
        match self {
            TestType::Int64 => "Int64",
            TestType::Float => "Float",
            TestType::Boolean => "Boolean",
        }
    }

    pub fn data_type(self) -> DataTypeId {
        match self {
            TestType::Int64 => DataTypeId::Int64,
            TestType::Float => DataTypeId::Float,
            TestType::Boolean => DataTypeId::Boolean,
        }
    }

    /// Draws a fresh random value. Float draws a double in [0, 1) and
    /// sends it as Double.
    pub fn generate<R: Rng + ?Sized>(self, rng: &mut R) -> Variant {
        match self {
            TestType::Int64 => Variant::Int64(rng.gen()),
            TestType::Float => Variant::Double(rng.gen()),
            TestType::Boolean => Variant::Boolean(rng.gen()),
        }
    }

    /// Draws count independent values into an array
    pub fn generate_array<R: Rng + ?Sized>(self, rng: &mut R, count: usize) -> Variant {
        match self {
            TestType::Int64 => {
                let values: Vec<i64> = (0..count).map(|_| rng.gen()).collect();
                Variant::from(&values[..])
            }
            TestType::Float => {
                let values: Vec<f64> = (0..count).map(|_| rng.gen()).collect();
                Variant::from(&values[..])
            }
            TestType::Boolean => {
                let values: Vec<bool> = (0..count).map(|_| rng.gen()).collect();
                Variant::from(&values[..])
            }
        }
    }

    pub fn next(self) -> DataValue {
        data_value_now(self.generate(&mut rand::thread_rng()))
    }

    pub fn next_array(self, count: usize) -> DataValue {
        data_value_now(self.generate_array(&mut rand::thread_rng(), count))
    }
}

/// Namespace with many random valued variables, used for load tests
pub struct BulkNamespace {
    configuration: TestConfiguration,
}

impl BulkNamespace {
    pub fn new(configuration: TestConfiguration) -> Self {
        Self { configuration }
    }

    pub fn configuration(&self) -> &TestConfiguration {
        &self.configuration
    }

    fn create_base_folder(ctx: &mut NamespaceContext<'_>) -> Result<NodeId, NamespaceError> {
        let base = ctx.add_folder(BASE_FOLDER, BASE_FOLDER, BASE_FOLDER)?;
        ctx.add_reference(
            &base,
            ReferenceTypeId::Organizes,
            &NodeId::objects_folder_id(),
            false,
        )?;
        Ok(base)
    }

    /// Adds the folder prefix + "Type" with instances folders holding one
    /// variable per type. Arrays are used when array_size is set.
    fn populate_type(
        ctx: &mut NamespaceContext<'_>,
        base: &NodeId,
        prefix: &str,
        types: &[TestType],
        instances: u32,
        array_size: Option<u32>,
    ) -> Result<(), NamespaceError> {
        let type_name = format!("{}Type", prefix);
        let folder_path = format!("{}/{}", BASE_FOLDER, prefix);
        let folder = ctx.add_folder(&folder_path, &type_name, &type_name)?;
        ctx.add_organizes(base, &folder)?;

        for i in 0..instances {
            let name = format!("{}{:06}", prefix, i);
            let instance_path = format!("{}/{}", folder_path, name);
            let instance = ctx.add_folder(
                &instance_path,
                &name,
                &format!("{}({})", type_name, name),
            )?;
            ctx.add_organizes(&folder, &instance)?;

            for t in types.iter().copied() {
                let builder = VariableNodeBuilder::new(
                    ctx.new_node_id(&format!("{}/{}", instance_path, t.name())),
                    ctx.new_qualified_name(t.name()),
                    LocalizedText::new("en", t.name()),
                )
                .data_type(t.data_type());
                let builder = match array_size {
                    Some(size) => builder
                        .array_dimensions(size)
                        .value_getter(move || t.next_array(size as usize)),
                    None => builder.value_getter(move || t.next()),
                };
                // advertised writable, writes are accepted and dropped
                let variable = builder
                    .value_setter(|value: DataValue| -> Result<(), StatusCode> {
                        trace!("Dropping write {:?}", value.value);
                        Ok(())
                    })
                    .build()?;
                let node_id = ctx.add_variable(variable)?;
                ctx.add_organizes(&instance, &node_id)?;
            }
        }
        Ok(())
    }
}

impl Namespace for BulkNamespace {
    fn uri(&self) -> &str {
        TEST_NAMESPACE_URI
    }

    fn populate(&mut self, ctx: &mut NamespaceContext<'_>) -> Result<(), NamespaceError> {
        self.configuration.validate()?;
        let cfg = &self.configuration;
        info!(
            "Populating {} with {} scalar and {} array instances",
            TEST_NAMESPACE_URI, cfg.number_of_simple, cfg.number_of_array
        );
        let base = Self::create_base_folder(ctx)?;
        Self::populate_type(ctx, &base, SINGLE_PREFIX, &SINGLE_TYPES, cfg.number_of_simple, None)?;
        Self::populate_type(
            ctx,
            &base,
            ARRAY_PREFIX,
            &ARRAY_TYPES,
            cfg.number_of_array,
            Some(cfg.array_size),
        )?;
        Ok(())
    }
}
