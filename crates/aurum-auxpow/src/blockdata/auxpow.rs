//! Merged-mining proof of work.
//!
//! An [`AuxPow`] proves that a parent-chain miner committed to a specific
//! Aurum block: the parent coinbase embeds the root of a chain Merkle tree
//! whose leaves are the hashes of merge-mined child blocks, and the proof
//! carries both Merkle branches (child hash up to the embedded root, and
//! coinbase up to the parent's transaction root) plus the parent header the
//! work was done on.
//!
//! [`AuxPow::check`] is consensus-critical and byte-exact; any deviation in
//! hashing order, endianness or index arithmetic forks the network. It does
//! not evaluate the parent's own proof of work.

use std::iter;
use std::sync::Arc;

use bitcoin::absolute::LockTime;
use bitcoin::block::Version;
use bitcoin::hashes::Hash;
use bitcoin::io::{Read, Write};
use bitcoin::script::{Builder, PushBytesBuf};
use bitcoin::transaction::Version as TxVersion;
use bitcoin::{
    merkle_tree, BlockHash, CompactTarget, OutPoint, Sequence, Transaction, TxIn, TxMerkleNode,
    Txid, Witness,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::blockdata::block::header::{DefaultHeader, EquihashHeader, ParentHeader};
use crate::blockdata::block::Header;
use crate::blockdata::transaction::StakeTransaction;
use crate::consensus::{Decodable, Encodable, EncodeDecodeError, Params, MAX_VEC_SIZE};
use crate::merkle;

/// Marker preceding the chain Merkle root in a parent coinbase script.
pub const MERGED_MINING_HEADER: [u8; 4] = [0xFA, 0xBE, b'm', b'm'];

/// Hard cap on the chain Merkle branch length (chain tree height).
pub const MAX_CHAIN_MERKLE_BRANCH: usize = 30;

/// Furthest offset at which the chain Merkle root may start in a coinbase
/// script that carries no merged-mining marker. 8-12 bytes are enough to
/// encode extraNonce and nBits.
const MAX_LEGACY_ROOT_OFFSET: usize = 20;

/// AuxPoW version word.
///
/// A bit field selecting the parent-header and coinbase variants. Only the
/// combinations that name a coherent variant pair can be constructed;
/// `ZHASH_FLAG` implies `EQUIHASH_FLAG` and unknown bits are rejected, so a
/// decoded proof can never disagree with its own flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuxPowVersion(u32);

impl AuxPowVersion {
    /// Parent block is an Equihash chain.
    pub const EQUIHASH_FLAG: u32 = 0x1;
    /// Parent block is an Equihash chain solved under the Zhash
    /// personalization; requires [`Self::EQUIHASH_FLAG`].
    pub const ZHASH_FLAG: u32 = 0x2;
    /// Parent coinbase is a stake-style transaction.
    pub const STAKE_FLAG: u32 = 0x4;

    const KNOWN_FLAGS: u32 = Self::EQUIHASH_FLAG | Self::ZHASH_FLAG | Self::STAKE_FLAG;

    /// Constructs a version word from its consensus encoding, rejecting
    /// unknown bits and `ZHASH_FLAG` without `EQUIHASH_FLAG`.
    pub fn from_consensus(bits: u32) -> Option<Self> {
        let known = bits & !Self::KNOWN_FLAGS == 0;
        let zhash_coherent = bits & Self::ZHASH_FLAG == 0 || bits & Self::EQUIHASH_FLAG != 0;
        (known && zhash_coherent).then_some(AuxPowVersion(bits))
    }

    /// Returns the raw version word.
    pub fn to_consensus(self) -> u32 {
        self.0
    }

    /// Whether the parent is an Equihash chain.
    pub fn is_equihash(self) -> bool {
        self.0 & Self::EQUIHASH_FLAG != 0
    }

    /// Whether the parent solution uses the Zhash personalization.
    pub fn is_zhash(self) -> bool {
        self.0 & Self::ZHASH_FLAG != 0
    }

    /// Whether the parent coinbase is stake-style.
    pub fn is_stake(self) -> bool {
        self.0 & Self::STAKE_FLAG != 0
    }

    fn has_equihash_parent(self) -> bool {
        self.0 & (Self::EQUIHASH_FLAG | Self::ZHASH_FLAG) != 0
    }
}

/// A transaction together with the Merkle branch proving its inclusion in a
/// parent block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof<T> {
    /// The proven transaction, shared with whoever assembled the block.
    pub tx: Arc<T>,
    /// Hash of the parent block the transaction belongs to.
    pub block_hash: BlockHash,
    /// Sibling hashes up to the parent block's transaction Merkle root.
    pub branch: Vec<TxMerkleNode>,
    /// Leaf index of the transaction; always 0 for a coinbase.
    pub index: u32,
}

impl<T: Encodable> Encodable for MerkleProof<T> {
    fn consensus_encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<usize, bitcoin::io::Error> {
        let mut len = self.tx.as_ref().consensus_encode(writer)?;
        len += self.block_hash.consensus_encode(writer)?;
        len += self.branch.consensus_encode(writer)?;
        len += self.index.consensus_encode(writer)?;
        Ok(len)
    }
}

impl<T: Decodable> Decodable for MerkleProof<T> {
    fn consensus_decode_from_finite_reader<R: Read + ?Sized>(
        reader: &mut R,
    ) -> Result<Self, EncodeDecodeError> {
        Ok(MerkleProof {
            tx: Arc::new(T::consensus_decode_from_finite_reader(reader)?),
            block_hash: Decodable::consensus_decode_from_finite_reader(reader)?,
            branch: Decodable::consensus_decode_from_finite_reader(reader)?,
            index: Decodable::consensus_decode_from_finite_reader(reader)?,
        })
    }

    fn consensus_decode<R: Read + ?Sized>(reader: &mut R) -> Result<Self, EncodeDecodeError> {
        let mut reader = reader.take(MAX_VEC_SIZE as u64);
        Self::consensus_decode_from_finite_reader(&mut reader)
    }
}

/// The parent coinbase and its inclusion proof.
///
/// The two variants differ only in transaction shape; verification consumes
/// the input script of input 0 and the transaction hash from either.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoinbaseProof {
    /// Standard UTXO-style coinbase.
    Pow(MerkleProof<Transaction>),
    /// Stake-style coinbase.
    Stake(MerkleProof<StakeTransaction>),
}

impl CoinbaseProof {
    /// Leaf index of the coinbase in the parent block.
    pub fn index(&self) -> u32 {
        match self {
            CoinbaseProof::Pow(proof) => proof.index,
            CoinbaseProof::Stake(proof) => proof.index,
        }
    }

    /// Sibling hashes up to the parent's transaction Merkle root.
    pub fn branch(&self) -> &[TxMerkleNode] {
        match self {
            CoinbaseProof::Pow(proof) => &proof.branch,
            CoinbaseProof::Stake(proof) => &proof.branch,
        }
    }

    /// The coinbase transaction id.
    pub fn txid(&self) -> Txid {
        match self {
            CoinbaseProof::Pow(proof) => proof.tx.compute_txid(),
            CoinbaseProof::Stake(proof) => proof.tx.compute_txid(),
        }
    }

    /// Raw bytes of input 0's script, or empty if the transaction has no
    /// inputs.
    pub fn script_sig(&self) -> &[u8] {
        match self {
            CoinbaseProof::Pow(proof) => proof
                .tx
                .input
                .first()
                .map_or(&[][..], |input| input.script_sig.as_bytes()),
            CoinbaseProof::Stake(proof) => proof
                .tx
                .input
                .first()
                .map_or(&[][..], |input| input.script_sig.as_bytes()),
        }
    }
}

impl Encodable for CoinbaseProof {
    fn consensus_encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<usize, bitcoin::io::Error> {
        match self {
            CoinbaseProof::Pow(proof) => proof.consensus_encode(writer),
            CoinbaseProof::Stake(proof) => proof.consensus_encode(writer),
        }
    }
}

/// Reasons an [`AuxPow`] fails verification.
///
/// Callers decide whether a failure invalidates the block, penalizes a peer
/// or is merely logged; the verifier only reports the first check that
/// failed.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AuxPowError {
    /// The coinbase proof does not point at the first transaction.
    #[error("AuxPow is not a generate")]
    NotGenerate,
    /// The parent block carries this chain's own chain id.
    #[error("Aux POW parent has our chain ID")]
    ParentHasOurChainId,
    /// The chain Merkle branch exceeds the 30-level cap.
    #[error("Aux POW chain merkle branch too long")]
    ChainMerkleBranchTooLong,
    /// A Zhash proof without its 8-byte personalization string.
    #[error("Aux POW Zhash personalization string size has wrong size.")]
    ZhashPersonalizationSize,
    /// The coinbase does not fold to the parent's transaction Merkle root.
    #[error("Aux POW merkle root incorrect")]
    MerkleRootIncorrect,
    /// The chain Merkle root is nowhere in the parent coinbase script.
    #[error("Aux POW missing chain merkle root in parent coinbase")]
    MissingChainMerkleRoot,
    /// More than one merged-mining marker in the coinbase script.
    #[error("Multiple merged mining headers in coinbase")]
    MultipleMergedMiningHeaders,
    /// The marker is present but not immediately before the root.
    #[error("Merged mining header is not just before chain merkle root")]
    HeaderNotBeforeRoot,
    /// A markerless coinbase with the root past the first 20 bytes.
    #[error("Aux POW chain merkle root must start in the first 20 bytes of the parent coinbase")]
    ChainMerkleRootTooLate,
    /// The script ends before the tree size and nonce.
    #[error("Aux POW missing chain merkle tree size and nonce in parent coinbase")]
    MissingTreeSizeAndNonce,
    /// The embedded tree size disagrees with the branch length.
    #[error("Aux POW merkle branch size does not match parent coinbase")]
    TreeSizeMismatch { expected: u32, found: u32 },
    /// The chain index is not the deterministic slot for this nonce.
    #[error("Aux POW wrong index")]
    WrongIndex { expected: u32, found: u32 },
}

/// An auxiliary proof of work attached to an Aurum block header.
///
/// Immutable after construction; [`AuxPow::check`] only reads it and proofs
/// may be shared across threads freely.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuxPow {
    /// Flag word selecting the parent and coinbase variants.
    pub version: AuxPowVersion,
    /// The parent coinbase and its inclusion proof.
    pub coinbase: CoinbaseProof,
    /// Siblings folding the child block hash up to the chain Merkle root
    /// embedded in the parent coinbase.
    pub chain_merkle_branch: Vec<TxMerkleNode>,
    /// Leaf index of this chain in the chain Merkle tree.
    pub chain_index: u32,
    /// Parent block header the real work was done on.
    pub parent: ParentHeader,
    /// Zhash personalization string; present iff the Zhash flag is set.
    pub zhash_config: Option<[u8; 8]>,
}

impl AuxPow {
    /// Verifies that the parent block commits to the Aurum block
    /// `aux_block_hash` on behalf of chain `chain_id`.
    ///
    /// Runs the commitment checks in a fixed order and reports the first
    /// failure. The parent header's own proof of work is **not** evaluated
    /// here; callers do that against the appropriate algorithm.
    pub fn check(
        &self,
        aux_block_hash: BlockHash,
        chain_id: i32,
        params: &Params,
    ) -> Result<(), AuxPowError> {
        if params.strict_chain_id && self.parent.chain_id() == chain_id {
            return Err(rejected(AuxPowError::ParentHasOurChainId));
        }

        if self.coinbase.index() != 0 {
            return Err(rejected(AuxPowError::NotGenerate));
        }

        if self.chain_merkle_branch.len() > MAX_CHAIN_MERKLE_BRANCH {
            return Err(rejected(AuxPowError::ChainMerkleBranchTooLong));
        }

        if self.version.is_zhash() && self.zhash_config.is_none() {
            return Err(rejected(AuxPowError::ZhashPersonalizationSize));
        }

        // Fold the child block hash up to the chain Merkle root; the
        // coinbase embeds it byte-reversed.
        let root_hash = merkle::fold_merkle_branch(
            aux_block_hash.to_raw_hash(),
            &self.chain_merkle_branch,
            self.chain_index,
        );
        let mut root_bytes = root_hash.to_byte_array();
        root_bytes.reverse();

        // The coinbase must be in the parent block's transaction tree.
        let tx_root = merkle::fold_merkle_branch(
            self.coinbase.txid().to_raw_hash(),
            self.coinbase.branch(),
            self.coinbase.index(),
        );
        if TxMerkleNode::from_raw_hash(tx_root) != self.parent.merkle_root() {
            return Err(rejected(AuxPowError::MerkleRootIncorrect));
        }

        let script = self.coinbase.script_sig();
        let marker_pos = find_subslice(script, &MERGED_MINING_HEADER, 0);
        let Some(root_pos) = find_subslice(script, &root_bytes, 0) else {
            return Err(rejected(AuxPowError::MissingChainMerkleRoot));
        };

        match marker_pos {
            Some(pos) => {
                // Enforce a single chain commitment: exactly one marker,
                // immediately followed by the root.
                if find_subslice(script, &MERGED_MINING_HEADER, pos + 1).is_some() {
                    return Err(rejected(AuxPowError::MultipleMergedMiningHeaders));
                }
                if pos + MERGED_MINING_HEADER.len() != root_pos {
                    return Err(rejected(AuxPowError::HeaderNotBeforeRoot));
                }
            }
            None => {
                // Markerless coinbases must keep the root early in the
                // script instead.
                if root_pos > MAX_LEGACY_ROOT_OFFSET {
                    return Err(rejected(AuxPowError::ChainMerkleRootTooLate));
                }
            }
        }

        // The root is followed by the chain tree size and a nonce, both
        // little-endian. Hashing the nonce with our chain id must land on
        // the claimed slot, so the same parent work cannot be submitted to
        // this chain twice under different indices.
        let tail = &script[root_pos + root_bytes.len()..];
        if tail.len() < 8 {
            return Err(rejected(AuxPowError::MissingTreeSizeAndNonce));
        }

        let height = self.chain_merkle_branch.len() as u32;
        let tree_size = u32::from_le_bytes([tail[0], tail[1], tail[2], tail[3]]);
        if tree_size != 1u32 << height {
            return Err(rejected(AuxPowError::TreeSizeMismatch {
                expected: 1u32 << height,
                found: tree_size,
            }));
        }

        let nonce = u32::from_le_bytes([tail[4], tail[5], tail[6], tail[7]]);
        let expected = Self::expected_index(nonce, chain_id, height);
        if self.chain_index != expected {
            return Err(rejected(AuxPowError::WrongIndex {
                expected,
                found: self.chain_index,
            }));
        }

        Ok(())
    }

    /// Chooses the slot for chain `chain_id` in a chain Merkle tree of
    /// height `height`, pseudo-randomly but fixed for a size/nonce/chain
    /// combination.
    ///
    /// The computation deliberately wraps at 32 bits; taking the result
    /// modulo a power of two makes the overflow harmless while keeping the
    /// value identical across word sizes. `height` never exceeds 30, so the
    /// final shift stays in range.
    pub fn expected_index(nonce: u32, chain_id: i32, height: u32) -> u32 {
        let mut rand = nonce;
        rand = rand.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        rand = rand.wrapping_add(chain_id as u32);
        rand = rand.wrapping_mul(1_103_515_245).wrapping_add(12_345);

        rand % (1u32 << height)
    }

    /// Attaches a minimal AuxPoW to a freshly built header.
    ///
    /// The synthetic parent commits to `header` as the only leaf of a
    /// height-zero chain tree, so the result passes [`AuxPow::check`]
    /// structurally for any chain id (the parent carries no valid proof of
    /// work; tests and genesis construction do not need one).
    pub fn init(header: &mut Header, version: AuxPowVersion, params: &Params) {
        // Set the auxpow bit first; the hash we commit to includes it.
        header.set_auxpow_version(true);
        let block_hash = header.block_hash();

        // Chain Merkle root (the single-leaf tree is the child hash itself,
        // byte-reversed), then tree size 1 and nonce 0 in little-endian.
        let mut input_data = block_hash.to_byte_array().to_vec();
        input_data.reverse();
        input_data.push(1);
        input_data.extend_from_slice(&[0u8; 7]);

        let mut payload = PushBytesBuf::new();
        payload
            .extend_from_slice(&input_data)
            .expect("commitment payload is 40 bytes");
        let script_sig = Builder::new().push_slice(payload).into_script();

        let input = TxIn {
            previous_output: OutPoint::null(),
            script_sig,
            sequence: Sequence::MAX,
            witness: Witness::default(),
        };

        let auxpow = if version.is_stake() {
            let tx = Arc::new(StakeTransaction {
                version: 1,
                time: 0,
                input: vec![input],
                output: Vec::new(),
                lock_time: 0,
            });
            let parent = synthetic_parent(version, single_leaf_root(tx.compute_txid()));
            AuxPow {
                version,
                coinbase: CoinbaseProof::Stake(MerkleProof {
                    block_hash: parent.block_hash(),
                    tx,
                    branch: Vec::new(),
                    index: 0,
                }),
                chain_merkle_branch: Vec::new(),
                chain_index: 0,
                parent,
                zhash_config: version.is_zhash().then(|| params.zhash_personalization),
            }
        } else {
            let tx = Arc::new(Transaction {
                version: TxVersion::ONE,
                lock_time: LockTime::ZERO,
                input: vec![input],
                output: Vec::new(),
            });
            let parent = synthetic_parent(version, single_leaf_root(tx.compute_txid()));
            AuxPow {
                version,
                coinbase: CoinbaseProof::Pow(MerkleProof {
                    block_hash: parent.block_hash(),
                    tx,
                    branch: Vec::new(),
                    index: 0,
                }),
                chain_merkle_branch: Vec::new(),
                chain_index: 0,
                parent,
                zhash_config: version.is_zhash().then(|| params.zhash_personalization),
            }
        };

        header.auxpow = Some(auxpow);
    }
}

/// Logs a rejection before handing the error back to the caller.
fn rejected(error: AuxPowError) -> AuxPowError {
    tracing::debug!(%error, "aux proof-of-work rejected");
    error
}

fn find_subslice(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

fn single_leaf_root(txid: Txid) -> TxMerkleNode {
    merkle_tree::calculate_root(iter::once(txid.to_raw_hash()))
        .map(TxMerkleNode::from_raw_hash)
        .expect("exactly one leaf")
}

/// Builds the fake parent block header of the variant the flags call for,
/// containing only the coinbase.
fn synthetic_parent(version: AuxPowVersion, merkle_root: TxMerkleNode) -> ParentHeader {
    if version.has_equihash_parent() {
        ParentHeader::Equihash(EquihashHeader {
            version: Version::from_consensus(1),
            prev_blockhash: BlockHash::all_zeros(),
            merkle_root,
            reserved: [0; 32],
            time: 0,
            bits: CompactTarget::from_consensus(0),
            nonce: [0; 32],
            solution: Vec::new(),
        })
    } else {
        ParentHeader::Default(DefaultHeader {
            version: Version::from_consensus(1),
            prev_blockhash: BlockHash::all_zeros(),
            merkle_root,
            time: 0,
            bits: CompactTarget::from_consensus(0),
            nonce: 0,
        })
    }
}

impl Encodable for AuxPow {
    fn consensus_encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<usize, bitcoin::io::Error> {
        let mut len = self.version.to_consensus().consensus_encode(writer)?;
        len += self.coinbase.consensus_encode(writer)?;
        len += self.chain_merkle_branch.consensus_encode(writer)?;
        len += self.chain_index.consensus_encode(writer)?;
        len += self.parent.consensus_encode(writer)?;
        if self.version.is_zhash() {
            let config = self.zhash_config.as_ref().expect("zhash personalization");
            len += config.to_vec().consensus_encode(writer)?;
        }
        Ok(len)
    }
}

impl Decodable for AuxPow {
    fn consensus_decode_from_finite_reader<R: Read + ?Sized>(
        reader: &mut R,
    ) -> Result<Self, EncodeDecodeError> {
        let bits = u32::consensus_decode_from_finite_reader(reader)?;
        let version = AuxPowVersion::from_consensus(bits)
            .ok_or(EncodeDecodeError::ParseFailed("invalid aux proof-of-work version flags"))?;

        let coinbase = if version.is_stake() {
            CoinbaseProof::Stake(Decodable::consensus_decode_from_finite_reader(reader)?)
        } else {
            CoinbaseProof::Pow(Decodable::consensus_decode_from_finite_reader(reader)?)
        };

        let chain_merkle_branch = Decodable::consensus_decode_from_finite_reader(reader)?;
        let chain_index = u32::consensus_decode_from_finite_reader(reader)?;

        let parent = if version.has_equihash_parent() {
            ParentHeader::Equihash(Decodable::consensus_decode_from_finite_reader(reader)?)
        } else {
            ParentHeader::Default(Decodable::consensus_decode_from_finite_reader(reader)?)
        };

        let zhash_config = if version.is_zhash() {
            let bytes = Vec::<u8>::consensus_decode_from_finite_reader(reader)?;
            let config: [u8; 8] = bytes.try_into().map_err(|_| {
                EncodeDecodeError::ParseFailed("Zhash personalization string must be 8 bytes")
            })?;
            Some(config)
        } else {
            None
        };

        Ok(AuxPow {
            version,
            coinbase,
            chain_merkle_branch,
            chain_index,
            parent,
            zhash_config,
        })
    }

    fn consensus_decode<R: Read + ?Sized>(reader: &mut R) -> Result<Self, EncodeDecodeError> {
        let mut reader = reader.take(MAX_VEC_SIZE as u64);
        Self::consensus_decode_from_finite_reader(&mut reader)
    }
}
