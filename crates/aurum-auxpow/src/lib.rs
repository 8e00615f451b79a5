//! Auxiliary proof-of-work (AuxPoW) verification core for the Aurum network.
//!
//! Aurum blocks can be merge-mined against a parent blockchain: the parent
//! miner commits to the Aurum block hash inside its coinbase transaction, and
//! the resulting [`AuxPow`] structure proves that commitment. This crate
//! implements the consensus-critical commitment check, the deterministic
//! chain-slot derivation, and the construction of minimal AuxPoW skeletons
//! used by tests and at genesis.
//!
//! Evaluating the parent block's own proof of work (SHA-256d, Equihash or
//! Zhash) is the caller's responsibility; this crate only verifies that the
//! parent commits to a given Aurum block.

#![cfg_attr(test, allow(clippy::arithmetic_side_effects))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::indexing_slicing))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod blockdata;
pub mod consensus;
pub mod merkle;
pub mod network;
pub mod util;

pub use blockdata::auxpow::{AuxPow, AuxPowError, AuxPowVersion, CoinbaseProof, MerkleProof};
pub use consensus::Params;
pub use network::Network;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
