//! Parent block headers.
//!
//! A merge-mined Aurum block embeds the header of the parent block the real
//! work was done on. Two parent families exist: chains with the standard
//! 80-byte header, and Equihash/Zhash chains whose headers carry a 256-bit
//! nonce and a solution vector. The AuxPoW verifier only reads the version
//! (for the encoded chain id) and the transaction Merkle root; the remaining
//! fields are carried for the caller's proof-of-work evaluation.

use bitcoin::io::Write;
use bitcoin::{BlockHash, TxMerkleNode};
use serde::{Deserialize, Serialize};

use crate::consensus::Encodable;

mod equihash;

pub use bitcoin::block::Header as DefaultHeader;
pub use equihash::EquihashHeader;

/// The header of the parent block a merged-mining proof points at.
///
/// The variant tag is not self-describing on the wire; it is selected by the
/// flag bits of the surrounding [`AuxPow`](crate::AuxPow) version, and the
/// decoder keeps the two consistent by construction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParentHeader {
    /// Standard 80-byte header.
    Default(DefaultHeader),
    /// Equihash or Zhash header.
    Equihash(EquihashHeader),
}

impl ParentHeader {
    /// The parent chain's id, encoded in the upper 16 bits of the header
    /// version.
    pub fn chain_id(&self) -> i32 {
        match self {
            ParentHeader::Default(header) => header.version.to_consensus() >> 16,
            ParentHeader::Equihash(header) => header.version.to_consensus() >> 16,
        }
    }

    /// The root of the parent block's transaction Merkle tree.
    pub fn merkle_root(&self) -> TxMerkleNode {
        match self {
            ParentHeader::Default(header) => header.merkle_root,
            ParentHeader::Equihash(header) => header.merkle_root,
        }
    }

    /// Returns the parent block hash.
    pub fn block_hash(&self) -> BlockHash {
        match self {
            ParentHeader::Default(header) => header.block_hash(),
            ParentHeader::Equihash(header) => header.block_hash(),
        }
    }
}

impl Encodable for ParentHeader {
    fn consensus_encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<usize, bitcoin::io::Error> {
        match self {
            ParentHeader::Default(header) => header.consensus_encode(writer),
            ParentHeader::Equihash(header) => header.consensus_encode(writer),
        }
    }
}
