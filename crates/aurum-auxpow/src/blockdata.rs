/// Merged-mining proof structures and verification.
pub mod auxpow;

/// Block-related data structures and functionality.
pub mod block;

/// Transaction-related data structures and functionality.
pub mod transaction;
