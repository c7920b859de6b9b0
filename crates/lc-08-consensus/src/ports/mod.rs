pub mod outbound;

pub use outbound::{Broadcaster, ChainInfo, PeerClient};
