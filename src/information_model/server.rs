// OPC UA test server for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2021 Alexander Schrode
use crate::address_space::NodeManagerRef;
use crate::bulk::BulkNamespace;
use crate::config::{Configuration, ServerConfiguration};
use crate::error::NamespaceError;
use crate::namespace::ManagedNamespace;
use crate::simulation::SimulationNamespace;
use log::{error, info};
use opcua_server::prelude::*;
use std::fs;

/// Builds the server endpoints: None and Basic256Sha256 SignAndEncrypt on the
/// endpoint path plus an unsecured discovery endpoint. Every endpoint only
/// accepts the configured users.
pub fn server_builder(cfg: &ServerConfiguration) -> ServerBuilder {
    let user_token_ids: Vec<String> = cfg.users.keys().cloned().collect();
    let mut builder = ServerBuilder::new()
        .application_name(cfg.application_name.clone())
        .application_uri(cfg.application_uri.clone())
        .product_uri(cfg.product_uri.clone())
        .create_sample_keypair(true)
        .pki_dir(cfg.pki_dir())
        .host_and_port(cfg.host.clone(), cfg.tcp_port)
        .discovery_server_url(None)
        .discovery_urls(vec![cfg.discovery_path()]);
    for (user, password) in &cfg.users {
        builder = builder.user_token(user.clone(), ServerUserToken::user_pass(user.clone(), password.clone()));
    }
    builder
        .endpoint(
            "none",
            ServerEndpoint::new_none(&cfg.endpoint_path, &user_token_ids),
        )
        .endpoint(
            "basic256sha256_sign_encrypt",
            ServerEndpoint::new_basic256sha256_sign_encrypt(&cfg.endpoint_path, &user_token_ids),
        )
        .endpoint(
            "discovery",
            ServerEndpoint::new_none(&cfg.discovery_path(), &user_token_ids),
        )
}

/// The test server: an opcua server hosting the bulk and the simulation
/// namespace
pub struct TestServer {
    server: Server,
    bulk: ManagedNamespace<BulkNamespace>,
    simulation: ManagedNamespace<SimulationNamespace>,
}

impl TestServer {
    pub fn new(configuration: Configuration) -> Result<Self, NamespaceError> {
        configuration.validate()?;
        let cfg = &configuration.server;
        fs::create_dir_all(&cfg.security_directory).map_err(|err| {
            error!(
                "Unable to create security directory {}: {}",
                cfg.security_directory.display(),
                err
            );
            NamespaceError::InvalidConfiguration(format!(
                "unable to create security directory {}",
                cfg.security_directory.display()
            ))
        })?;
        let server = server_builder(cfg)
            .server()
            .ok_or_else(|| {
                NamespaceError::InvalidConfiguration("server configuration is invalid".into())
            })?;
        let node_manager: NodeManagerRef = server.address_space().clone();
        let bulk = ManagedNamespace::new(
            node_manager.clone(),
            BulkNamespace::new(configuration.test.clone()),
        );
        let simulation = ManagedNamespace::new(
            node_manager,
            SimulationNamespace::new(configuration.simulation.clone()),
        );
        let mut test_server = Self {
            server,
            bulk,
            simulation,
        };
        test_server.start()?;
        Ok(test_server)
    }

    pub fn bulk(&self) -> &ManagedNamespace<BulkNamespace> {
        &self.bulk
    }

    pub fn simulation(&self) -> &ManagedNamespace<SimulationNamespace> {
        &self.simulation
    }

    // the simulation links into the bulk namespace so it comes second
    fn start(&mut self) -> Result<(), NamespaceError> {
        self.bulk.startup()?;
        self.simulation.startup()?;
        Ok(())
    }

    /// Runs the server until it terminates, then stops the namespaces
    pub fn run(self) {
        let TestServer {
            server,
            mut bulk,
            mut simulation,
        } = self;
        info!("Running {}", bulk.uri());
        server.run();
        simulation.shutdown();
        bulk.shutdown();
    }
}
