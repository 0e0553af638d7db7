// OPC UA test server for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2021 Alexander Schrode
use crate::address_space::{write_lock, FolderNode, NodeManager, NodeManagerRef, VariableNode};
use crate::error::NamespaceError;
use crate::subscription::{DataItem, SubscriptionModel};
use log::{error, info, warn};
use opcua_types::status_code::StatusCode;
use opcua_types::{LocalizedText, NodeId, QualifiedName, ReferenceTypeId};
use parking_lot::RwLock;
use std::sync::Arc;

/// Lifecycle of a namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Constructed,
    Populated,
    Running,
    Stopping,
    Stopped,
}

/// Shared view on the lifecycle state, handed to value setters so they can
/// refuse writes once the namespace is going down
#[derive(Debug, Clone)]
pub struct LifecycleHandle {
    state: Arc<RwLock<LifecycleState>>,
}

impl LifecycleHandle {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(LifecycleState::Constructed)),
        }
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.read()
    }

    fn set_state(&self, state: LifecycleState) {
        *self.state.write() = state;
    }

    pub fn accepts_writes(&self) -> bool {
        matches!(
            self.state(),
            LifecycleState::Populated | LifecycleState::Running
        )
    }

    /// Err(BadShutdown) once the namespace left the running state
    pub fn check_writable(&self) -> Result<(), StatusCode> {
        if self.accepts_writes() {
            Ok(())
        } else {
            Err(NamespaceError::ShuttingDown.into())
        }
    }
}

impl Default for LifecycleHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Node creation primitives of one namespace, valid while populating
pub struct NamespaceContext<'a> {
    namespace_index: u16,
    node_manager: &'a mut (dyn NodeManager + Send + Sync),
    lifecycle: LifecycleHandle,
}

impl<'a> NamespaceContext<'a> {
    pub fn new(
        namespace_index: u16,
        node_manager: &'a mut (dyn NodeManager + Send + Sync),
        lifecycle: LifecycleHandle,
    ) -> Self {
        Self {
            namespace_index,
            node_manager,
            lifecycle,
        }
    }

    pub fn namespace_index(&self) -> u16 {
        self.namespace_index
    }

    /// Index of another namespace known to the server
    pub fn namespace_index_of(&self, uri: &str) -> Option<u16> {
        self.node_manager.namespace_index(uri)
    }

    pub fn lifecycle(&self) -> &LifecycleHandle {
        &self.lifecycle
    }

    pub fn new_node_id(&self, id: &str) -> NodeId {
        NodeId::new(self.namespace_index, id.to_string())
    }

    pub fn new_qualified_name(&self, name: &str) -> QualifiedName {
        QualifiedName::new(self.namespace_index, name)
    }

    /// Adds a folder with the string id `id` and returns its node id
    pub fn add_folder(
        &mut self,
        id: &str,
        browse_name: &str,
        display_name: &str,
    ) -> Result<NodeId, NamespaceError> {
        let node_id = self.new_node_id(id);
        self.ensure_unique(&node_id)?;
        let folder = FolderNode::new(
            node_id.clone(),
            self.new_qualified_name(browse_name),
            LocalizedText::new("en", display_name),
        );
        self.node_manager.add_folder(folder)?;
        Ok(node_id)
    }

    pub fn add_variable(&mut self, variable: VariableNode) -> Result<NodeId, NamespaceError> {
        let node_id = variable.node_id.clone();
        self.ensure_unique(&node_id)?;
        self.node_manager.add_variable(variable)?;
        Ok(node_id)
    }

    pub fn add_reference(
        &mut self,
        source: &NodeId,
        reference_type: ReferenceTypeId,
        target: &NodeId,
        forward: bool,
    ) -> Result<(), NamespaceError> {
        self.node_manager
            .add_reference(source, reference_type, target, forward)?;
        Ok(())
    }

    /// parent Organizes child
    pub fn add_organizes(&mut self, parent: &NodeId, child: &NodeId) -> Result<(), NamespaceError> {
        self.add_reference(parent, ReferenceTypeId::Organizes, child, true)
    }

    fn ensure_unique(&self, node_id: &NodeId) -> Result<(), NamespaceError> {
        if self.node_manager.contains(node_id) {
            error!("Node {} is created twice", node_id);
            Err(NamespaceError::DuplicateNodeId(node_id.clone()))
        } else {
            Ok(())
        }
    }
}

/// Content of a namespace. populate is the startup task and stop the
/// shutdown task run by ManagedNamespace.
pub trait Namespace {
    fn uri(&self) -> &str;
    /// Builds the node graph, called exactly once
    fn populate(&mut self, ctx: &mut NamespaceContext<'_>) -> Result<(), NamespaceError>;
    /// Stops background work, must wait for work in flight
    fn stop(&mut self) {}
}

/// Registers a namespace with the server and drives its lifecycle
pub struct ManagedNamespace<N: Namespace> {
    namespace: N,
    node_manager: NodeManagerRef,
    namespace_index: Option<u16>,
    lifecycle: LifecycleHandle,
    subscription_model: SubscriptionModel,
}

impl<N: Namespace> ManagedNamespace<N> {
    pub fn new(node_manager: NodeManagerRef, namespace: N) -> Self {
        Self {
            namespace,
            subscription_model: SubscriptionModel::new(node_manager.clone()),
            node_manager,
            namespace_index: None,
            lifecycle: LifecycleHandle::new(),
        }
    }

    pub fn uri(&self) -> &str {
        self.namespace.uri()
    }

    pub fn namespace(&self) -> &N {
        &self.namespace
    }

    pub fn namespace_index(&self) -> Option<u16> {
        self.namespace_index
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    pub fn lifecycle(&self) -> &LifecycleHandle {
        &self.lifecycle
    }

    pub fn subscription_model(&self) -> &SubscriptionModel {
        &self.subscription_model
    }

    /// Registers the uri and populates the namespace. A failed startup
    /// leaves the namespace stopped.
    pub fn startup(&mut self) -> Result<(), NamespaceError> {
        if self.lifecycle.state() != LifecycleState::Constructed {
            warn!("Namespace {} was already started", self.namespace.uri());
            return Err(NamespaceError::AlreadyStarted);
        }
        match self.populate() {
            Ok(index) => {
                self.namespace_index = Some(index);
                self.lifecycle.set_state(LifecycleState::Running);
                info!("Namespace {} is running with index {}", self.namespace.uri(), index);
                Ok(())
            }
            Err(err) => {
                error!("Starting namespace {} failed: {}", self.namespace.uri(), err);
                self.lifecycle.set_state(LifecycleState::Stopped);
                Err(err)
            }
        }
    }

    fn populate(&mut self) -> Result<u16, NamespaceError> {
        let mut node_manager = write_lock(&*self.node_manager)?;
        let index = node_manager.register_namespace(self.namespace.uri())?;
        let mut ctx = NamespaceContext::new(index, &mut *node_manager, self.lifecycle.clone());
        self.lifecycle.set_state(LifecycleState::Populated);
        self.namespace.populate(&mut ctx)?;
        Ok(index)
    }

    /// Runs the shutdown task. Nodes stay with the server.
    pub fn shutdown(&mut self) {
        match self.lifecycle.state() {
            LifecycleState::Populated | LifecycleState::Running => {
                self.lifecycle.set_state(LifecycleState::Stopping);
                self.namespace.stop();
                self.lifecycle.set_state(LifecycleState::Stopped);
                info!("Namespace {} stopped", self.namespace.uri());
            }
            LifecycleState::Constructed => self.lifecycle.set_state(LifecycleState::Stopped),
            LifecycleState::Stopping | LifecycleState::Stopped => {}
        }
    }

    pub fn on_data_items_created(&self, data_items: &[DataItem]) {
        self.subscription_model.on_data_items_created(data_items);
    }

    pub fn on_data_items_modified(&self, data_items: &[DataItem]) {
        self.subscription_model.on_data_items_modified(data_items);
    }

    pub fn on_data_items_deleted(&self, data_items: &[DataItem]) {
        self.subscription_model.on_data_items_deleted(data_items);
    }

    pub fn on_monitoring_mode_changed(&self, data_items: &[DataItem]) {
        self.subscription_model.on_monitoring_mode_changed(data_items);
    }
}
