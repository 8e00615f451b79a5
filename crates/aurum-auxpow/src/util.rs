use bitcoin::hashes::Hash;
use hex::FromHex;

/// Parses a 32-byte hash from its display form.
///
/// Hashes print byte-reversed, and the merged-mining commitment embeds the
/// chain Merkle root in that same reversed order. This turns the printed
/// form back into internal byte order, so fixtures and RPC output can be
/// compared against what [`AuxPow::check`](crate::AuxPow::check) computes.
pub fn hash_from_display_hex<T>(hex: &str) -> Result<T, hex::FromHexError>
where
    T: Hash<Bytes = [u8; 32]>,
{
    let mut bytes = <[u8; 32]>::from_hex(hex)?;
    bytes.reverse();
    Ok(T::from_byte_array(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockdata::auxpow::{AuxPow, AuxPowVersion};
    use crate::blockdata::block::{BlockHash, Header, TxMerkleNode, Version};
    use crate::consensus::Params;
    use bitcoin::CompactTarget;

    #[test]
    fn test_round_trips_a_merge_mined_block_hash() {
        let mut header = Header {
            version: Version::from_consensus(1),
            prev_blockhash: BlockHash::all_zeros(),
            merkle_root: TxMerkleNode::all_zeros(),
            time: 1_718_524_492,
            bits: CompactTarget::from_consensus(0x1d0f_ffff),
            nonce: 7,
            auxpow: None,
        };
        AuxPow::init(
            &mut header,
            AuxPowVersion::from_consensus(0).unwrap(),
            &Params::REGTEST,
        );
        let hash = header.block_hash();

        // The printed form is byte-reversed; parsing it back must yield the
        // hash the proof commits to.
        let parsed: BlockHash = hash_from_display_hex(&hash.to_string()).unwrap();
        assert_eq!(parsed, hash);
    }

    #[test]
    fn test_reverses_into_internal_byte_order() {
        let node: TxMerkleNode = hash_from_display_hex(
            "00000000000000000000000000000000000000000000000000000000deadbeef",
        )
        .unwrap();
        assert_eq!(node.to_byte_array()[..4], [0xEF, 0xBE, 0xAD, 0xDE]);
        assert_eq!(node.to_byte_array()[4..], [0; 28]);
    }

    #[test]
    fn test_rejects_invalid_hex() {
        assert!(hash_from_display_hex::<BlockHash>("not a hash").is_err());
        // Wrong length.
        assert!(hash_from_display_hex::<BlockHash>("deadbeef").is_err());
    }
}
