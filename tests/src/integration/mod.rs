//! Integration flows across mempool, mining, fork choice and finality.

pub mod fixtures;

mod convergence;
mod durability;
mod finality_safety;
mod mempool_flows;
