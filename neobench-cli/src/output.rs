//! Drivers used by the CLI and run summaries

use neobench_core::runtime::{ClientReport, Driver};
use neobench_core::workload::{Statement, UnitOfWork};
use serde::Serialize;
use std::io::{self, Write};
use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, PoisonError};

/// One line of `generate` output
#[derive(Debug, Serialize)]
pub struct WorkRecord<'a> {
    pub client: usize,
    pub readonly: bool,
    pub statements: &'a [Statement],
}

/// Driver that prints every unit of work as a JSON line
///
/// All clients share the writer; each line is written under the lock so
/// lines never interleave. A closed reader (broken pipe) stops the client.
pub struct JsonLinesDriver<W: Write + Send> {
    out: Arc<Mutex<W>>,
}

impl<W: Write + Send> JsonLinesDriver<W> {
    pub fn new(out: Arc<Mutex<W>>) -> Self {
        Self { out }
    }
}

impl<W: Write + Send> Driver for JsonLinesDriver<W> {
    fn execute(
        &mut self,
        client_id: usize,
        work: UnitOfWork,
    ) -> anyhow::Result<ControlFlow<()>> {
        let record =
            WorkRecord { client: client_id, readonly: work.readonly, statements: &work.statements };
        let line = serde_json::to_string(&record)?;

        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        match writeln!(out, "{}", line) {
            Ok(()) => Ok(ControlFlow::Continue(())),
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(ControlFlow::Break(())),
            Err(e) => Err(e.into()),
        }
    }
}

/// Driver that discards work; useful for measuring generation throughput
#[derive(Debug, Default)]
pub struct NullDriver;

impl Driver for NullDriver {
    fn execute(
        &mut self,
        _client_id: usize,
        _work: UnitOfWork,
    ) -> anyhow::Result<ControlFlow<()>> {
        Ok(ControlFlow::Continue(()))
    }
}

/// Totals across all clients
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub clients: usize,
    pub iterations: u64,
    pub failed_evaluations: u64,
    pub statements: u64,
    pub driver_errors: u64,
    /// Clients the driver stopped early, e.g. because the reader went away
    pub stopped_clients: usize,
}

impl RunSummary {
    pub fn from_reports(reports: &[ClientReport]) -> Self {
        reports.iter().fold(
            Self { clients: reports.len(), ..Default::default() },
            |mut acc, report| {
                acc.iterations += report.iterations;
                acc.failed_evaluations += report.failed_evaluations;
                acc.statements += report.statements;
                acc.driver_errors += report.driver_errors;
                acc.stopped_clients += usize::from(report.stopped_by_driver);
                acc
            },
        )
    }

    pub fn log(&self) {
        tracing::info!("=== Run Summary ===");
        tracing::info!("Clients: {}", self.clients);
        tracing::info!("Units of work: {}", self.iterations);
        tracing::info!("Statements: {}", self.statements);
        if self.failed_evaluations > 0 {
            tracing::warn!("Failed evaluations: {}", self.failed_evaluations);
        }
        if self.driver_errors > 0 {
            tracing::warn!("Driver errors: {}", self.driver_errors);
        }
        if self.stopped_clients > 0 {
            tracing::info!("Clients stopped by output: {}", self.stopped_clients);
        }
    }
}
