//! Multi-client runtime
//!
//! Drives one OS thread per client, each looping over
//! [`ClientWorkload::next`] and handing every unit of work to its own
//! [`Driver`]. All clients are spawned from the workload before any thread
//! starts, and a [`StartGate`] releases the loops together.

use crate::workload::{ClientWorkload, UnitOfWork, Workload};
use crate::Result;
use std::ops::ControlFlow;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

/// Executes units of work against the system under test
pub trait Driver: Send {
    /// Execute one unit of work
    ///
    /// `Err` counts as a failed unit and the client carries on;
    /// `Ok(ControlFlow::Break(()))` stops this client for the rest of the run.
    fn execute(&mut self, client_id: usize, work: UnitOfWork) -> anyhow::Result<ControlFlow<()>>;
}

/// Per-client counters from one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientReport {
    pub client_id: usize,
    /// Calls to `next()`, successful or not
    pub iterations: u64,
    /// Evaluations that stopped at a failing command
    pub failed_evaluations: u64,
    /// Statements handed to the driver, including partial units
    pub statements: u64,
    /// Units the driver rejected
    pub driver_errors: u64,
    /// The driver asked this client to stop before the deadline
    pub stopped_by_driver: bool,
}

/// One-shot gate holding client threads until every client is spawned
///
/// Unlike a barrier it does not need a participant count, so it can be
/// abandoned when spawning fails part way and the waiting threads exit.
#[derive(Clone, Default)]
pub struct StartGate {
    inner: Arc<(Mutex<Option<bool>>, Condvar)>,
}

impl StartGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until the gate is opened or abandoned; `true` means run
    pub fn wait(&self) -> bool {
        let (state, cond) = &*self.inner;
        let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            match *state {
                Some(go) => return go,
                None => state = cond.wait(state).unwrap_or_else(PoisonError::into_inner),
            }
        }
    }

    /// Release every waiter to run
    pub fn open(&self) {
        self.settle(true);
    }

    /// Release every waiter without running
    pub fn abandon(&self) {
        self.settle(false);
    }

    fn settle(&self, go: bool) {
        let (state, cond) = &*self.inner;
        *state.lock().unwrap_or_else(PoisonError::into_inner) = Some(go);
        cond.notify_all();
    }
}

/// Runs a fixed number of clients against one workload
pub struct ClientRuntime {
    num_clients: usize,
    max_iterations: Option<u64>,
}

impl ClientRuntime {
    pub fn new(num_clients: usize) -> Self {
        Self { num_clients, max_iterations: None }
    }

    /// Stop each client after `max` iterations even if time remains
    pub fn with_max_iterations(mut self, max: u64) -> Self {
        self.max_iterations = Some(max);
        self
    }

    pub fn num_clients(&self) -> usize {
        self.num_clients
    }

    /// Run every client until `duration` elapses (or the iteration cap)
    ///
    /// `driver_factory` is called once per client, on the spawning thread.
    pub fn run<D, F>(
        &self,
        workload: &Workload,
        duration: Duration,
        mut driver_factory: F,
    ) -> Result<Vec<ClientReport>>
    where
        D: Driver + 'static,
        F: FnMut(usize) -> D,
    {
        if self.num_clients == 0 {
            return Err(crate::Error::Config("client count must be > 0".to_string()));
        }

        // Spawn every client before any loop starts so the master stream is
        // only touched from this thread.
        let clients: Vec<(ClientWorkload, D)> = (0..self.num_clients)
            .map(|_| {
                let client = workload.new_client();
                let driver = driver_factory(client.id());
                (client, driver)
            })
            .collect();

        tracing::info!("starting {} client(s) for {:?}", self.num_clients, duration);

        let gate = StartGate::new();
        let max_iterations = self.max_iterations;
        let mut handles = Vec::with_capacity(self.num_clients);

        for (client, driver) in clients {
            let thread_gate = gate.clone();
            let spawned = thread::Builder::new()
                .name(format!("client-{}", client.id()))
                .spawn(move || {
                    if !thread_gate.wait() {
                        return None;
                    }
                    let deadline = Instant::now() + duration;
                    Some(run_client(client, driver, deadline, max_iterations))
                });

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    gate.abandon();
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(e.into());
                }
            }
        }

        gate.open();

        let mut reports = Vec::with_capacity(handles.len());
        for handle in handles {
            let report = handle
                .join()
                .map_err(|payload| crate::Error::ClientPanicked(panic_message(&*payload)))?;
            reports.extend(report);
        }

        let iterations: u64 = reports.iter().map(|r| r.iterations).sum();
        let failed: u64 = reports.iter().map(|r| r.failed_evaluations).sum();
        tracing::info!("run finished: {} iteration(s), {} failed evaluation(s)", iterations, failed);

        Ok(reports)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn run_client<D: Driver>(
    mut client: ClientWorkload,
    mut driver: D,
    deadline: Instant,
    max_iterations: Option<u64>,
) -> ClientReport {
    let mut report = ClientReport { client_id: client.id(), ..Default::default() };

    while Instant::now() < deadline && max_iterations.is_none_or(|max| report.iterations < max) {
        report.iterations += 1;

        let work = match client.next() {
            Ok(work) => work,
            Err(failure) => {
                tracing::debug!("client {}: {}", client.id(), failure);
                report.failed_evaluations += 1;
                failure.work
            }
        };

        report.statements += work.statements.len() as u64;
        match driver.execute(client.id(), work) {
            Ok(ControlFlow::Continue(())) => {}
            Ok(ControlFlow::Break(())) => {
                tracing::info!("client {}: driver stopped the client", client.id());
                report.stopped_by_driver = true;
                break;
            }
            Err(e) => {
                tracing::warn!("client {}: driver error: {:#}", client.id(), e);
                report.driver_errors += 1;
            }
        }
    }

    report
}
