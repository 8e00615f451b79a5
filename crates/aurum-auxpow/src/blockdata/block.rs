pub use bitcoin::block::{BlockHash, TxMerkleNode, Version};
use bitcoin::hashes::Hash;
use bitcoin::io::{Read, Write};
use bitcoin::CompactTarget;
use serde::{Deserialize, Serialize};

use crate::blockdata::auxpow::AuxPow;
use crate::consensus::{Decodable, Encodable, EncodeDecodeError, MAX_VEC_SIZE};

pub mod header;

/// Version bit signalling that an AuxPoW follows the header on the wire.
pub const VERSION_AUXPOW: i32 = 1 << 8;
/// Version bit declaring the block's own algorithm to be Equihash.
pub const VERSION_ALGO_EQUIHASH: i32 = 1 << 9;
/// Version bit declaring the block's own algorithm to be Zhash.
pub const VERSION_ALGO_ZHASH: i32 = 1 << 10;

/// The proof-of-work algorithm a block header declares for itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Algo {
    Sha256d,
    Equihash,
    Zhash,
}

/// Aurum block header.
///
/// Contains all the block's information except the actual transactions, but
/// including a root of a merkle tree committing to all transactions in the
/// block. When the AuxPoW version bit is set the header is followed on the
/// wire by the [`AuxPow`] proving the parent chain's commitment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Block version; also carries the AuxPoW and algorithm bits.
    pub version: Version,
    /// Reference to the previous block in the chain.
    pub prev_blockhash: BlockHash,
    /// The root hash of the merkle tree of transactions in the block.
    pub merkle_root: TxMerkleNode,
    /// The timestamp of the block, as claimed by the miner.
    pub time: u32,
    /// The target value below which the blockhash must lie.
    pub bits: CompactTarget,
    /// The nonce, selected to obtain a low enough blockhash.
    pub nonce: u32,
    /// The merged-mining proof, present iff the version bit says so.
    pub auxpow: Option<AuxPow>,
}

impl Header {
    /// Returns the block hash of the header.
    ///
    /// The hash covers only the 80 header bytes; the attached AuxPoW is
    /// never part of it (it commits to this hash, so it cannot be).
    pub fn block_hash(&self) -> BlockHash {
        let mut engine = BlockHash::engine();
        self.encode_pure(&mut engine).expect("engines don't error");
        BlockHash::from_engine(engine)
    }

    /// Whether the AuxPoW version bit is set.
    pub fn is_auxpow(&self) -> bool {
        self.version.to_consensus() & VERSION_AUXPOW != 0
    }

    /// Sets or clears the AuxPoW version bit.
    pub fn set_auxpow_version(&mut self, enable: bool) {
        let mut bits = self.version.to_consensus();
        if enable {
            bits |= VERSION_AUXPOW;
        } else {
            bits &= !VERSION_AUXPOW;
        }
        self.version = Version::from_consensus(bits);
    }

    /// The algorithm this header declares for its own proof of work.
    pub fn algo(&self) -> Algo {
        let bits = self.version.to_consensus();
        if bits & VERSION_ALGO_ZHASH != 0 {
            Algo::Zhash
        } else if bits & VERSION_ALGO_EQUIHASH != 0 {
            Algo::Equihash
        } else {
            Algo::Sha256d
        }
    }

    fn encode_pure<W: Write + ?Sized>(&self, writer: &mut W) -> Result<usize, bitcoin::io::Error> {
        let mut len = 0;
        len += self.version.consensus_encode(writer)?;
        len += self.prev_blockhash.consensus_encode(writer)?;
        len += self.merkle_root.consensus_encode(writer)?;
        len += self.time.consensus_encode(writer)?;
        len += self.bits.consensus_encode(writer)?;
        len += self.nonce.consensus_encode(writer)?;
        Ok(len)
    }
}

impl Encodable for Header {
    fn consensus_encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<usize, bitcoin::io::Error> {
        let mut len = self.encode_pure(writer)?;
        if self.is_auxpow() {
            len += self.auxpow.as_ref().expect("auxpow").consensus_encode(writer)?;
        }
        Ok(len)
    }
}

impl Decodable for Header {
    fn consensus_decode_from_finite_reader<R: Read + ?Sized>(
        reader: &mut R,
    ) -> Result<Self, EncodeDecodeError> {
        let version = Version::consensus_decode_from_finite_reader(reader)?;
        let prev_blockhash = Decodable::consensus_decode_from_finite_reader(reader)?;
        let merkle_root = Decodable::consensus_decode_from_finite_reader(reader)?;
        let time = Decodable::consensus_decode_from_finite_reader(reader)?;
        let bits = Decodable::consensus_decode_from_finite_reader(reader)?;
        let nonce = Decodable::consensus_decode_from_finite_reader(reader)?;

        let auxpow = if version.to_consensus() & VERSION_AUXPOW != 0 {
            Some(AuxPow::consensus_decode_from_finite_reader(reader)?)
        } else {
            None
        };

        Ok(Header {
            version,
            prev_blockhash,
            merkle_root,
            time,
            bits,
            nonce,
            auxpow,
        })
    }

    fn consensus_decode<R: Read + ?Sized>(reader: &mut R) -> Result<Self, EncodeDecodeError> {
        let mut reader = reader.take(MAX_VEC_SIZE as u64);
        Self::consensus_decode_from_finite_reader(&mut reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockdata::auxpow::AuxPowVersion;
    use crate::consensus::Params;
    use bitcoin::consensus::{deserialize, serialize};
    use bitcoin::hashes::Hash;

    fn header(version: i32) -> Header {
        Header {
            version: Version::from_consensus(version),
            prev_blockhash: BlockHash::all_zeros(),
            merkle_root: TxMerkleNode::all_zeros(),
            time: 1_718_524_492,
            bits: CompactTarget::from_consensus(0x1d0f_ffff),
            nonce: 7,
            auxpow: None,
        }
    }

    #[test]
    fn test_algo_bits() {
        assert_eq!(header(1).algo(), Algo::Sha256d);
        assert_eq!(header(1 | VERSION_ALGO_EQUIHASH).algo(), Algo::Equihash);
        assert_eq!(header(1 | VERSION_ALGO_ZHASH).algo(), Algo::Zhash);
    }

    #[test]
    fn test_auxpow_version_bit() {
        let mut header = header(1);
        assert!(!header.is_auxpow());
        header.set_auxpow_version(true);
        assert!(header.is_auxpow());
        assert_eq!(header.version.to_consensus(), 1 | VERSION_AUXPOW);
        header.set_auxpow_version(false);
        assert_eq!(header.version.to_consensus(), 1);
    }

    #[test]
    fn test_block_hash_ignores_attached_auxpow() {
        let mut with_proof = header(1);
        AuxPow::init(
            &mut with_proof,
            AuxPowVersion::from_consensus(0).unwrap(),
            &Params::REGTEST,
        );

        let mut without_proof = with_proof.clone();
        without_proof.auxpow = None;
        assert_eq!(with_proof.block_hash(), without_proof.block_hash());
    }

    #[test]
    fn test_consensus_roundtrip_plain() {
        let header = header(1);
        let encoded = serialize(&header);
        assert_eq!(encoded.len(), 80);
        let decoded: Header = deserialize(&encoded).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_consensus_roundtrip_with_auxpow() {
        let mut header = header(1);
        AuxPow::init(
            &mut header,
            AuxPowVersion::from_consensus(AuxPowVersion::STAKE_FLAG).unwrap(),
            &Params::REGTEST,
        );

        let decoded: Header = deserialize(&serialize(&header)).unwrap();
        assert_eq!(decoded, header);
        assert!(decoded.auxpow.is_some());
    }
}
