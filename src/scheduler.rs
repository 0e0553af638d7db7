// OPC UA test server for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2021 Alexander Schrode
use crate::error::NamespaceError;
use log::{debug, error, info};
use std::thread;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;

struct Worker {
    stop: oneshot::Sender<()>,
    thread: thread::JoinHandle<()>,
}

/// Runs a task at a fixed rate on one dedicated thread. Runs never overlap,
/// an overrun delays the following ticks.
pub struct TickScheduler {
    period: Duration,
    worker: Option<Worker>,
}

impl TickScheduler {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            worker: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Starts ticking, the first tick fires right away
    pub fn start<F>(&mut self, mut task: F) -> Result<(), NamespaceError>
    where
        F: FnMut() + Send + 'static,
    {
        if self.worker.is_some() {
            return Err(NamespaceError::AlreadyStarted);
        }
        if self.period == Duration::from_secs(0) {
            return Err(NamespaceError::InvalidConfiguration(
                "tick period must not be zero".into(),
            ));
        }
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let period = self.period;
        let thread = thread::Builder::new()
            .name("simulation-tick".into())
            .spawn(move || {
                runtime.block_on(async move {
                    let mut interval = tokio::time::interval(period);
                    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    loop {
                        tokio::select! {
                            biased;
                            _ = &mut stop_rx => break,
                            _ = interval.tick() => task(),
                        }
                    }
                });
                debug!("Tick worker finished");
            })?;
        info!("Ticking every {:?}", period);
        self.worker = Some(Worker {
            stop: stop_tx,
            thread,
        });
        Ok(())
    }

    /// Cancels further ticks and waits for a running tick to complete
    pub fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            // the worker may already be gone, nothing to cancel then
            let _ = worker.stop.send(());
            if worker.thread.join().is_err() {
                error!("Tick worker panicked");
            }
            info!("Stopped ticking");
        }
    }
}

impl Drop for TickScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
