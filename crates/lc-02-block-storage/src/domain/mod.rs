//! Envelope codec and key layout.

pub mod envelope;
pub mod keys;
