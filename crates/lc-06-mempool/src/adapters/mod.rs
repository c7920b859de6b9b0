//! Adapters connecting the pool to concrete state.

mod state;
