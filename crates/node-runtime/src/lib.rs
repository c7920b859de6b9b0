//! # Ledger-Core Node Runtime
//!
//! Builds a node from `LC_*` environment variables and runs it.
//!
//! ## Startup Sequence
//!
//! 1. Load and validate `NodeConfig`
//! 2. Open the data directory (exclusive lock)
//! 3. Register validators and draw the first validator set
//! 4. Open finality, then recover the chain against it
//! 5. Start the sync task and the mining task
//!
//! ## Modules
//!
//! - `config` - `NodeConfig::from_env`
//! - `node` - Subsystem wiring, self-voting, validator rotation
//! - `tasks` - Mining and sync loops
//! - `runtime` - Task lifecycle and shutdown
//! - `broadcaster` - `LoggingBroadcaster`

pub mod broadcaster;
pub mod config;
pub mod error;
pub mod node;
pub mod runtime;
pub mod tasks;

pub use broadcaster::LoggingBroadcaster;
pub use config::{ConfigError, NodeConfig};
pub use error::{NodeError, NodeResult};
pub use node::Node;
pub use runtime::NodeRuntime;
