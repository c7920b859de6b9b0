pub mod outbound;

pub use outbound::StateProvider;
