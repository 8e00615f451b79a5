//! Stake-style transactions.
//!
//! Parent chains running proof of stake carry a timestamp inside every
//! transaction, between the version and the inputs. The extra field
//! participates in the transaction hash, which is all the AuxPoW verifier
//! cares about; everything else matches the standard layout.

use bitcoin::hashes::{sha256d, Hash};
use bitcoin::{TxIn, TxOut, Txid};
use serde::{Deserialize, Serialize};

use crate::consensus::{impl_consensus_encoding, Encodable};

/// A stake-style (PoS) transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeTransaction {
    /// The protocol version.
    pub version: i32,
    /// Transaction timestamp, as claimed by the staker.
    pub time: u32,
    /// List of transaction inputs.
    pub input: Vec<TxIn>,
    /// List of transaction outputs.
    pub output: Vec<TxOut>,
    /// Earliest block height or time this transaction may be included at.
    pub lock_time: u32,
}

impl_consensus_encoding!(StakeTransaction, version, time, input, output, lock_time);

impl StakeTransaction {
    /// Computes the transaction id as the double-SHA256 of the serialized
    /// transaction.
    pub fn compute_txid(&self) -> Txid {
        let mut engine = sha256d::Hash::engine();
        self.consensus_encode(&mut engine)
            .expect("engines don't error");
        Txid::from_raw_hash(sha256d::Hash::from_engine(engine))
    }

    /// Whether this is the block's generate transaction: a single input
    /// spending the null outpoint.
    pub fn is_coinbase(&self) -> bool {
        self.input.len() == 1 && self.input[0].previous_output.is_null()
    }
}
