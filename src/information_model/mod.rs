// OPC UA test server for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2021 Alexander Schrode
use crate::address_space::{AccessLevel, FolderNode, NodeManager, VariableNode};
use log::{error, trace};
use opcua_server::prelude::*;
use opcua_server::prelude::{AccessLevel as UaAccessLevel, UserAccessLevel};
mod server;
pub use server::{server_builder, TestServer};

/// Makes the AddressSpace of an opcua server the host of the namespaces
impl NodeManager for AddressSpace {
    fn register_namespace(&mut self, uri: &str) -> Result<u16, StatusCode> {
        AddressSpace::register_namespace(self, uri).map_err(|_| {
            error!("Couldn't register namespace {}", uri);
            StatusCode::BadInternalError
        })
    }

    fn namespace_index(&self, uri: &str) -> Option<u16> {
        AddressSpace::namespace_index(self, uri)
    }

    fn add_folder(&mut self, folder: FolderNode) -> Result<(), StatusCode> {
        trace!("AddressSpace: Add folder {}", folder.node_id);
        let inserted = ObjectBuilder::new(&folder.node_id, folder.browse_name, folder.display_name)
            .is_folder()
            .insert(self);
        if inserted {
            Ok(())
        } else {
            Err(StatusCode::BadNodeIdExists)
        }
    }

    fn add_variable(&mut self, variable: VariableNode) -> Result<(), StatusCode> {
        trace!("AddressSpace: Add variable {}", variable.node_id);
        let value_rank = variable.value_rank();
        let mut builder = VariableBuilder::new(
            &variable.node_id,
            variable.browse_name,
            variable.display_name,
        )
        .data_type(variable.data_type)
        .has_type_definition(VariableTypeId::BaseDataVariableType)
        .access_level(UaAccessLevel::from_bits_truncate(
            variable.access_level.bits(),
        ))
        .user_access_level(UserAccessLevel::from_bits_truncate(
            variable.user_access_level.bits(),
        ))
        .value_rank(value_rank);
        if let Some(dims) = &variable.array_dimensions {
            builder = builder.array_dimensions(dims);
        }
        if let Some(getter) = variable.filter_chain.getter() {
            builder = builder.value_getter(AttrFnGetter::new_boxed(
                move |_, _, _, _, _, _| -> Result<Option<DataValue>, StatusCode> {
                    Ok(Some(getter.get()))
                },
            ));
        }
        if let Some(setter) = variable.filter_chain.setter() {
            if !variable.access_level.contains(AccessLevel::CURRENT_WRITE) {
                return Err(StatusCode::BadInvalidArgument);
            }
            builder = builder.value_setter(AttrFnSetter::new_boxed(
                move |_, _, _, value| -> Result<(), StatusCode> { setter.set(value) },
            ));
        }
        if builder.insert(self) {
            Ok(())
        } else {
            Err(StatusCode::BadNodeIdExists)
        }
    }

    fn add_reference(
        &mut self,
        source: &NodeId,
        reference_type: ReferenceTypeId,
        target: &NodeId,
        forward: bool,
    ) -> Result<(), StatusCode> {
        let (source, target) = if forward {
            (source, target)
        } else {
            (target, source)
        };
        if self.find_node(source).is_none() && self.find_node(target).is_none() {
            return Err(StatusCode::BadNodeIdUnknown);
        }
        self.insert_reference(source, target, reference_type);
        Ok(())
    }

    fn contains(&self, node_id: &NodeId) -> bool {
        self.find_node(node_id).is_some()
    }

    fn read_value(&self, node_id: &NodeId) -> Result<DataValue, StatusCode> {
        self.get_variable_value(node_id)
            .map_err(|_| StatusCode::BadNodeIdUnknown)
    }

    // access levels of client writes are checked by the server's write service
    fn write_value(&mut self, node_id: &NodeId, value: DataValue) -> Result<(), StatusCode> {
        match self.find_variable_mut(node_id) {
            Some(v) => v.set_value(NumericRange::None, value.value.unwrap_or(Variant::Empty)),
            None => Err(StatusCode::BadNodeIdUnknown),
        }
    }
}
