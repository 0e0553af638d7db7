// OPC UA test server for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2021 Alexander Schrode
use crate::filter::{AttributeFilter, FilterChain, ValueGetter, ValueSetter};
use log::{error, trace};
use opcua_types::status_code::StatusCode;
use opcua_types::{DataTypeId, DataValue, LocalizedText, NodeId, QualifiedName, ReferenceTypeId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Uri of namespace 0
pub const OPC_UA_NAMESPACE_URI: &str = "http://opcfoundation.org/UA/";

bitflags::bitflags! {
    pub struct AccessLevel: u8 {
        const CURRENT_READ = 1;
        const CURRENT_WRITE = 2;
    }
}

/// A folder node, organizes other nodes
#[derive(Debug, Clone)]
pub struct FolderNode {
    pub node_id: NodeId,
    pub browse_name: QualifiedName,
    pub display_name: LocalizedText,
}

impl FolderNode {
    pub fn new(node_id: NodeId, browse_name: QualifiedName, display_name: LocalizedText) -> Self {
        Self {
            node_id,
            browse_name,
            display_name,
        }
    }
}

/// A variable node whose value is served by its filter chain
#[derive(Debug, Clone)]
pub struct VariableNode {
    pub node_id: NodeId,
    pub browse_name: QualifiedName,
    pub display_name: LocalizedText,
    pub data_type: DataTypeId,
    pub array_dimensions: Option<Vec<u32>>,
    pub access_level: AccessLevel,
    pub user_access_level: AccessLevel,
    pub filter_chain: FilterChain,
}

impl VariableNode {
    /// -1 for scalars, 1 for one dimensional arrays
    pub fn value_rank(&self) -> i32 {
        match &self.array_dimensions {
            Some(dims) => dims.len() as i32,
            None => -1,
        }
    }

    pub fn is_writable(&self) -> bool {
        self.access_level.contains(AccessLevel::CURRENT_WRITE)
    }
}

/// Helps building a VariableNode. The access level is derived from the
/// filters: a variable is writable exactly when a setter is installed.
pub struct VariableNodeBuilder {
    node_id: NodeId,
    browse_name: QualifiedName,
    display_name: LocalizedText,
    data_type: DataTypeId,
    array_dimensions: Option<Vec<u32>>,
    filter_chain: FilterChain,
}

impl VariableNodeBuilder {
    pub fn new(node_id: NodeId, browse_name: QualifiedName, display_name: LocalizedText) -> Self {
        Self {
            node_id,
            browse_name,
            display_name,
            data_type: DataTypeId::BaseDataType,
            array_dimensions: None,
            filter_chain: FilterChain::new(),
        }
    }

    pub fn data_type(mut self, data_type: DataTypeId) -> Self {
        self.data_type = data_type;
        self
    }

    /// Makes the variable a one dimensional array of size elements
    pub fn array_dimensions(mut self, size: u32) -> Self {
        self.array_dimensions = Some(vec![size]);
        self
    }

    pub fn value_getter<G: ValueGetter + 'static>(mut self, getter: G) -> Self {
        self.filter_chain.add_last(AttributeFilter::get_value(getter));
        self
    }

    pub fn value_setter<S: ValueSetter + 'static>(mut self, setter: S) -> Self {
        self.filter_chain.add_last(AttributeFilter::set_value(setter));
        self
    }

    pub fn filter(mut self, filter: AttributeFilter) -> Self {
        self.filter_chain.add_last(filter);
        self
    }

    pub fn build(self) -> Result<VariableNode, StatusCode> {
        if let Some(dims) = &self.array_dimensions {
            if dims.iter().any(|d| *d == 0) {
                error!("Variable {} has an empty array dimension", self.node_id);
                return Err(StatusCode::BadInvalidArgument);
            }
        }
        let access_level = if self.filter_chain.has_setter() {
            AccessLevel::CURRENT_READ | AccessLevel::CURRENT_WRITE
        } else {
            AccessLevel::CURRENT_READ
        };
        Ok(VariableNode {
            node_id: self.node_id,
            browse_name: self.browse_name,
            display_name: self.display_name,
            data_type: self.data_type,
            array_dimensions: self.array_dimensions,
            access_level,
            user_access_level: access_level,
            filter_chain: self.filter_chain,
        })
    }
}

/// A reference stored in forward direction source -> target
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub source: NodeId,
    pub reference_type: ReferenceTypeId,
    pub target: NodeId,
}

/// The node management primitives of the hosting server
pub trait NodeManager {
    /// Registers a namespace uri and returns its index. Registering a known
    /// uri returns the existing index.
    fn register_namespace(&mut self, uri: &str) -> Result<u16, StatusCode>;
    /// Index of a registered namespace
    fn namespace_index(&self, uri: &str) -> Option<u16>;
    fn add_folder(&mut self, folder: FolderNode) -> Result<(), StatusCode>;
    fn add_variable(&mut self, variable: VariableNode) -> Result<(), StatusCode>;
    /// Adds a reference. With forward == false the reference points from
    /// target to source.
    fn add_reference(
        &mut self,
        source: &NodeId,
        reference_type: ReferenceTypeId,
        target: &NodeId,
        forward: bool,
    ) -> Result<(), StatusCode>;
    fn contains(&self, node_id: &NodeId) -> bool;
    /// Reads the Value attribute of a variable
    fn read_value(&self, node_id: &NodeId) -> Result<DataValue, StatusCode>;
    /// Writes the Value attribute of a variable
    fn write_value(&mut self, node_id: &NodeId, value: DataValue) -> Result<(), StatusCode>;
}

/// Shared handle on the node manager of the host
pub type NodeManagerRef = Arc<RwLock<dyn NodeManager + Send + Sync>>;

pub(crate) fn read_lock<T: ?Sized>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, StatusCode> {
    lock.read().map_err(|_| {
        error!("Node manager lock is poisoned");
        StatusCode::BadInternalError
    })
}

pub(crate) fn write_lock<T: ?Sized>(
    lock: &RwLock<T>,
) -> Result<RwLockWriteGuard<'_, T>, StatusCode> {
    lock.write().map_err(|_| {
        error!("Node manager lock is poisoned");
        StatusCode::BadInternalError
    })
}

#[derive(Debug)]
enum SimpleNode {
    Folder(FolderNode),
    Variable(VariableNode),
}

impl SimpleNode {
    fn browse_name(&self) -> &QualifiedName {
        match self {
            SimpleNode::Folder(f) => &f.browse_name,
            SimpleNode::Variable(v) => &v.browse_name,
        }
    }
}

/// In memory node manager for standalone use and tests. It knows the
/// ObjectsFolder of namespace 0 and whatever gets added.
pub struct SimpleNodeManager {
    namespaces: Vec<String>,
    nodes: HashMap<NodeId, SimpleNode>,
    references: Vec<Reference>,
}

impl SimpleNodeManager {
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        let objects = NodeId::objects_folder_id();
        nodes.insert(
            objects.clone(),
            SimpleNode::Folder(FolderNode::new(
                objects,
                QualifiedName::new(0, "Objects"),
                LocalizedText::new("", "Objects"),
            )),
        );
        Self {
            namespaces: vec![OPC_UA_NAMESPACE_URI.to_string()],
            nodes,
            references: Vec::new(),
        }
    }

    pub fn new_arc_lock() -> Arc<RwLock<Self>> {
        Arc::new(RwLock::new(Self::new()))
    }

    pub fn find_variable(&self, node_id: &NodeId) -> Option<&VariableNode> {
        match self.nodes.get(node_id) {
            Some(SimpleNode::Variable(v)) => Some(v),
            _ => None,
        }
    }

    pub fn find_folder(&self, node_id: &NodeId) -> Option<&FolderNode> {
        match self.nodes.get(node_id) {
            Some(SimpleNode::Folder(f)) => Some(f),
            _ => None,
        }
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }

    pub fn variable_count(&self) -> usize {
        self.nodes
            .values()
            .filter(|n| matches!(n, SimpleNode::Variable(_)))
            .count()
    }

    pub fn folder_count(&self) -> usize {
        self.nodes.len() - self.variable_count()
    }

    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    /// Targets of forward references of the given type
    pub fn children(&self, node_id: &NodeId, reference_type: ReferenceTypeId) -> Vec<&NodeId> {
        self.references
            .iter()
            .filter(|r| &r.source == node_id && r.reference_type == reference_type)
            .map(|r| &r.target)
            .collect()
    }

    /// Sources of inverse references of the given type
    pub fn parents(&self, node_id: &NodeId, reference_type: ReferenceTypeId) -> Vec<&NodeId> {
        self.references
            .iter()
            .filter(|r| &r.target == node_id && r.reference_type == reference_type)
            .map(|r| &r.source)
            .collect()
    }

    /// Follows Organizes references from the ObjectsFolder matching the
    /// browse names of path
    pub fn resolve_path(&self, path: &[&str]) -> Option<NodeId> {
        let mut current = NodeId::objects_folder_id();
        for name in path {
            let next = self
                .children(&current, ReferenceTypeId::Organizes)
                .into_iter()
                .find(|id| {
                    self.nodes
                        .get(*id)
                        .map(|n| n.browse_name().name.value().as_deref() == Some(*name))
                        .unwrap_or(false)
                })?
                .clone();
            current = next;
        }
        Some(current)
    }

    fn insert(&mut self, node_id: NodeId, node: SimpleNode) -> Result<(), StatusCode> {
        if self.nodes.contains_key(&node_id) {
            error!("Node {} already exists", node_id);
            return Err(StatusCode::BadNodeIdExists);
        }
        trace!("SimpleNodeManager: Add {}", node_id);
        self.nodes.insert(node_id, node);
        Ok(())
    }
}

impl Default for SimpleNodeManager {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeManager for SimpleNodeManager {
    fn register_namespace(&mut self, uri: &str) -> Result<u16, StatusCode> {
        if let Some(idx) = self.namespace_index(uri) {
            return Ok(idx);
        }
        if self.namespaces.len() > u16::MAX as usize {
            return Err(StatusCode::BadTooManyOperations);
        }
        self.namespaces.push(uri.to_string());
        Ok((self.namespaces.len() - 1) as u16)
    }

    fn namespace_index(&self, uri: &str) -> Option<u16> {
        self.namespaces
            .iter()
            .position(|ns| ns == uri)
            .map(|idx| idx as u16)
    }

    fn add_folder(&mut self, folder: FolderNode) -> Result<(), StatusCode> {
        self.insert(folder.node_id.clone(), SimpleNode::Folder(folder))
    }

    fn add_variable(&mut self, variable: VariableNode) -> Result<(), StatusCode> {
        self.insert(variable.node_id.clone(), SimpleNode::Variable(variable))
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
        // The other end may live in a namespace that isn't populated yet
        if !self.nodes.contains_key(source) && !self.nodes.contains_key(target) {
            return Err(StatusCode::BadNodeIdUnknown);
        }
        let reference = Reference {
            source: source.clone(),
            reference_type,
            target: target.clone(),
        };
        if !self.references.contains(&reference) {
            self.references.push(reference);
        }
        Ok(())
    }

    fn contains(&self, node_id: &NodeId) -> bool {
        self.nodes.contains_key(node_id)
    }

    fn read_value(&self, node_id: &NodeId) -> Result<DataValue, StatusCode> {
        let variable = self
            .find_variable(node_id)
            .ok_or(StatusCode::BadNodeIdUnknown)?;
        variable
            .filter_chain
            .get_value()
            .ok_or(StatusCode::BadNotReadable)
    }

    fn write_value(&mut self, node_id: &NodeId, value: DataValue) -> Result<(), StatusCode> {
        let variable = self
            .find_variable(node_id)
            .ok_or(StatusCode::BadNodeIdUnknown)?;
        if !variable.user_access_level.contains(AccessLevel::CURRENT_WRITE) {
            return Err(StatusCode::BadNotWritable);
        }
        variable
            .filter_chain
            .set_value(value)
            .unwrap_or(Err(StatusCode::BadNotWritable))
    }
}
