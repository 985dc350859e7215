//! Seed derivation for reproducible workloads
//!
//! A benchmark run is configured with a single master seed. Every consumer of
//! randomness derives its own seed by hashing the master seed together with a
//! component name, so adding a new consumer never shifts the streams of
//! existing ones.
//!
//! ```
//! use neobench_core::seed::{derive_seed, components};
//!
//! let master = derive_seed(42, components::WORKLOAD_MASTER);
//! assert_eq!(master, derive_seed(42, components::WORKLOAD_MASTER));
//! assert_ne!(master, derive_seed(43, components::WORKLOAD_MASTER));
//! ```

use sha2::{Digest, Sha256};

/// Derive a component-specific seed from a master seed using SHA-256
///
/// The master seed is hashed big-endian followed by the component name; the
/// first 8 bytes of the digest form the derived seed.
pub fn derive_seed(master_seed: u64, component: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(master_seed.to_be_bytes());
    hasher.update(component.as_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

/// Component names used with [`derive_seed`]
pub mod components {
    /// Master stream that seeds every client of a workload
    pub const WORKLOAD_MASTER: &str = "workload_master";
}
