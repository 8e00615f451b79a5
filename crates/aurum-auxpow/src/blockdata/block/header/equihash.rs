//! Equihash-family parent block header.

use bitcoin::block::Version;
use bitcoin::hashes::Hash;
use bitcoin::{BlockHash, CompactTarget, TxMerkleNode};
use serde::{Deserialize, Serialize};

use crate::consensus::{impl_consensus_encoding, Encodable};

/// Block header of an Equihash or Zhash parent chain.
///
/// Compared to the standard header this carries a reserved field, a 256-bit
/// nonce, and the Equihash solution. Which personalization the solution was
/// produced under (Equihash proper or Zhash) is recorded by the enclosing
/// AuxPoW version flags, not by the header itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquihashHeader {
    /// Block version; the upper 16 bits encode the parent chain id.
    pub version: Version,
    /// Reference to the previous block in the chain.
    pub prev_blockhash: BlockHash,
    /// The root hash of the merkle tree of transactions in the block.
    pub merkle_root: TxMerkleNode,
    /// Reserved field, zero on every deployed parent chain.
    pub reserved: [u8; 32],
    /// The timestamp of the block, as claimed by the miner.
    pub time: u32,
    /// The target value below which the blockhash must lie.
    pub bits: CompactTarget,
    /// The 256-bit Equihash nonce.
    pub nonce: [u8; 32],
    /// The Equihash solution.
    pub solution: Vec<u8>,
}

impl_consensus_encoding!(
    EquihashHeader,
    version,
    prev_blockhash,
    merkle_root,
    reserved,
    time,
    bits,
    nonce,
    solution
);

impl EquihashHeader {
    /// Returns the block hash of the header.
    pub fn block_hash(&self) -> BlockHash {
        let mut engine = BlockHash::engine();
        self.consensus_encode(&mut engine)
            .expect("engines don't error");
        BlockHash::from_engine(engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::consensus::{deserialize, serialize};

    fn header(solution: Vec<u8>) -> EquihashHeader {
        EquihashHeader {
            version: Version::from_consensus(1),
            prev_blockhash: BlockHash::all_zeros(),
            merkle_root: TxMerkleNode::all_zeros(),
            reserved: [0; 32],
            time: 1_718_524_492,
            bits: CompactTarget::from_consensus(0x1d0f_ffff),
            nonce: [0x42; 32],
            solution,
        }
    }

    #[test]
    fn test_consensus_roundtrip() {
        let header = header(vec![0xAA; 100]);
        let decoded: EquihashHeader = deserialize(&serialize(&header)).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_block_hash_commits_to_solution() {
        assert_ne!(
            header(vec![1, 2, 3]).block_hash(),
            header(vec![3, 2, 1]).block_hash()
        );
    }
}
