pub mod peer;

pub use peer::LocalPeer;
