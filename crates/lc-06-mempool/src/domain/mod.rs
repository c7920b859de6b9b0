pub mod ban;
pub mod config;
pub mod entry;
pub mod errors;
pub mod pool;
pub mod status;

pub use ban::BanTracker;
pub use config::MempoolConfig;
pub use entry::{fee_rate, MempoolEntry, PricedEntry};
pub use errors::Reject;
pub use pool::{AdmissionResult, TransactionPool};
pub use status::{RejectionCounters, TxStatus};
