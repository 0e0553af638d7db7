// OPC UA test server for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2021 Alexander Schrode
//! Namespaces of an OPC UA test server: a configurable bulk of generated
//! variables and a set of simulated heating devices.
pub mod address_space;
pub mod bulk;
pub mod config;
pub mod constants;
pub mod error;
pub mod filter;
#[cfg(feature = "server-integration")]
pub mod information_model;
pub mod namespace;
pub mod scheduler;
pub mod simulation;
pub mod subscription;
pub mod until;

pub mod prelude {
    pub use crate::address_space::{
        AccessLevel, FolderNode, NodeManager, NodeManagerRef, Reference, SimpleNodeManager,
        VariableNode, VariableNodeBuilder,
    };
    pub use crate::bulk::{BulkNamespace, TestType};
    pub use crate::config::{
        Configuration, ServerConfiguration, SimulationConfiguration, TestConfiguration,
    };
    pub use crate::error::{ConfigError, NamespaceError};
    pub use crate::filter::{AttributeFilter, FilterChain, ValueGetter, ValueSetter};
    #[cfg(feature = "server-integration")]
    pub use crate::information_model::TestServer;
    pub use crate::namespace::{
        LifecycleHandle, LifecycleState, ManagedNamespace, Namespace, NamespaceContext,
    };
    pub use crate::scheduler::TickScheduler;
    pub use crate::simulation::{Device, DeviceSnapshot, SimulationNamespace};
    pub use crate::subscription::{DataItem, Notification, SubscriptionModel};
    pub use opcua_types::status_code::StatusCode;
    pub use opcua_types::{
        DataTypeId, DataValue, DateTime, LocalizedText, MonitoringMode, NodeId, QualifiedName,
        ReferenceTypeId, Variant,
    };
}
