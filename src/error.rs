// OPC UA test server for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2021 Alexander Schrode
use opcua_types::status_code::StatusCode;
use opcua_types::NodeId;
use thiserror::Error;

/// Errors raised while building or running a namespace
#[derive(Debug, Error)]
pub enum NamespaceError {
    #[error("namespace {0} is not registered with the server")]
    MissingNamespace(String),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("node id {0} already exists")]
    DuplicateNodeId(NodeId),
    #[error("node id {0} is unknown")]
    UnknownNode(NodeId),
    #[error("namespace is shutting down")]
    ShuttingDown,
    #[error("namespace was already started")]
    AlreadyStarted,
    #[error("server rejected the request: {0}")]
    Host(StatusCode),
    #[error("tick scheduler failed: {0}")]
    Scheduler(#[from] std::io::Error),
}

impl From<StatusCode> for NamespaceError {
    fn from(status: StatusCode) -> Self {
        Self::Host(status)
    }
}

impl From<NamespaceError> for StatusCode {
    fn from(err: NamespaceError) -> Self {
        match err {
            NamespaceError::MissingNamespace(_) | NamespaceError::InvalidConfiguration(_) => {
                StatusCode::BadConfigurationError
            }
            NamespaceError::DuplicateNodeId(_) => StatusCode::BadNodeIdExists,
            NamespaceError::UnknownNode(_) => StatusCode::BadNodeIdUnknown,
            NamespaceError::ShuttingDown => StatusCode::BadShutdown,
            NamespaceError::AlreadyStarted => StatusCode::BadInvalidState,
            NamespaceError::Host(status) => status,
            NamespaceError::Scheduler(_) => StatusCode::BadInternalError,
        }
    }
}

/// Errors raised while loading the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("unable to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<ConfigError> for NamespaceError {
    fn from(err: ConfigError) -> Self {
        Self::InvalidConfiguration(err.to_string())
    }
}
