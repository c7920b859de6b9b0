pub mod genesis;
pub mod snapshot;
pub mod validation;

pub use genesis::build_genesis;
pub use snapshot::{ChainSnapshot, ReorgSummary, TransactionRecord};
pub use validation::BlockValidator;
