//! Blob key layout.

pub const BLOCKS_PREFIX: &str = "blocks/";
pub const CHECKPOINTS_PREFIX: &str = "checkpoints/";
pub const FINALITY_CERTIFICATES: &str = "finality_certificates.json";
pub const FINALITY_STATE: &str = "finality_state.json";

pub fn block_key(height: u64) -> String {
    format!("{BLOCKS_PREFIX}{height:010}.json")
}

pub fn checkpoint_key(height: u64) -> String {
    format!("{CHECKPOINTS_PREFIX}{height:010}.json")
}

/// Height encoded in a `blocks/` or `checkpoints/` key.
pub fn height_from_key(key: &str) -> Option<u64> {
    key.rsplit('/')
        .next()?
        .strip_suffix(".json")?
        .parse()
        .ok()
}
