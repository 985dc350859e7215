//! Process-wide workload definition and client factory

use super::client::ClientWorkload;
use super::selector::Scripts;
use crate::seed::{components, derive_seed};
use crate::value::Variables;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

/// Master stream plus the id handed to the next client
#[derive(Debug)]
struct Master {
    rng: SmallRng,
    next_id: usize,
}

/// Scripts and baseline variables shared by every client of a run
///
/// Immutable after construction apart from the master randomness stream,
/// which is only touched when spawning clients and sits behind a mutex so
/// clients can also be spawned while others are running.
#[derive(Debug)]
pub struct Workload {
    variables: Variables,
    scripts: Arc<Scripts>,
    master: Mutex<Master>,
}

impl Workload {
    /// Create a workload
    ///
    /// # Parameters
    /// - `variables`: baseline bindings every script evaluation starts from
    /// - `scripts`: validated script set
    /// - `seed`: master seed for reproducible runs (None = use entropy)
    pub fn new(variables: Variables, scripts: Scripts, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => SmallRng::seed_from_u64(derive_seed(s, components::WORKLOAD_MASTER)),
            None => SmallRng::from_os_rng(),
        };

        Self {
            variables,
            scripts: Arc::new(scripts),
            master: Mutex::new(Master { rng, next_id: 0 }),
        }
    }

    /// Spawn a client that writes diagnostics to stderr
    pub fn new_client(&self) -> ClientWorkload {
        self.new_client_with_sink(Box::new(io::stderr()))
    }

    /// Spawn a client with its own randomness stream seeded from the master
    pub fn new_client_with_sink(&self, stderr: Box<dyn Write + Send>) -> ClientWorkload {
        let (id, seed) = {
            let mut master = self.master.lock().unwrap_or_else(PoisonError::into_inner);
            let id = master.next_id;
            master.next_id += 1;
            (id, master.rng.random::<u64>())
        };

        tracing::debug!("spawned client {} (seed {:#018x})", id, seed);
        ClientWorkload::new(
            id,
            self.variables.clone(),
            Arc::clone(&self.scripts),
            SmallRng::seed_from_u64(seed),
            stderr,
        )
    }

    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    pub fn scripts(&self) -> &Scripts {
        &self.scripts
    }
}
