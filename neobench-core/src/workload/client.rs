//! Per-client workload handle

use super::script::{EvalFailure, ScriptContext, UnitOfWork};
use super::selector::Scripts;
use crate::value::Variables;
use rand::rngs::SmallRng;
use std::io::Write;
use std::sync::Arc;

/// One benchmark worker's view of a workload
///
/// Owns a private randomness stream and a copy of the baseline variables;
/// the scripts are shared read-only with every other client.
pub struct ClientWorkload {
    id: usize,
    variables: Variables,
    scripts: Arc<Scripts>,
    rng: SmallRng,
    stderr: Box<dyn Write + Send>,
}

impl ClientWorkload {
    pub(crate) fn new(
        id: usize,
        variables: Variables,
        scripts: Arc<Scripts>,
        rng: SmallRng,
        stderr: Box<dyn Write + Send>,
    ) -> Self {
        Self { id, variables, scripts, rng, stderr }
    }

    /// Produce the next unit of work
    ///
    /// Picks a script with this client's randomness stream and evaluates it
    /// against a fresh copy of the baseline variables, so bindings made by
    /// one call are never visible to the next.
    pub fn next(&mut self) -> Result<UnitOfWork, EvalFailure> {
        let vars = self.variables.clone();
        let script = self.scripts.choose(&mut self.rng);
        script.eval(ScriptContext::new(vars, &mut self.rng, &mut *self.stderr))
    }

    /// Sequence number assigned by the owning workload
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn variables(&self) -> &Variables {
        &self.variables
    }
}

impl std::fmt::Debug for ClientWorkload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientWorkload")
            .field("id", &self.id)
            .field("variables", &self.variables)
            .field("scripts", &self.scripts.len())
            .finish_non_exhaustive()
    }
}
