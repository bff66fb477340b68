//! # Validator Node Runtime
//!
//! Library half of the `node-runtime` binary: configuration, genesis,
//! storage backends and the wiring that turns a `NodeConfig` into a running
//! validator.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (file, then environment overrides)
//! 2. Build the genesis block and open the chain store, verifying the
//!    stored chain against it
//! 3. Build the validator registry and agreement engine
//! 4. Bind the peer server
//! 5. Spawn the server and the tick scheduler
//!
//! Any failure before step 5 is fatal.

pub mod adapters;
pub mod config;
pub mod genesis;
pub mod runtime;

pub use config::{ConfigError, NodeConfig, StorageBackend};
pub use genesis::genesis_block;
pub use runtime::{NodeRuntime, RunningNode};
