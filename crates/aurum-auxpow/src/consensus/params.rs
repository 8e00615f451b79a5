use crate::network::Network;

/// Consensus parameters governing the merged-mining commitment check.
#[derive(Debug, Clone, Copy)]
pub struct Params {
    /// Network for which these parameters are defined.
    pub network: Network,
    /// This chain's merged-mining chain id. Only the low 16 bits are
    /// meaningful; the same range is what a parent header encodes in the
    /// upper 16 bits of its version.
    pub chain_id: i32,
    /// Whether to reject parent blocks that carry our own chain id. A parent
    /// and child sharing a chain id would allow self-merge-mining.
    pub strict_chain_id: bool,
    /// Personalization string handed to the external Zhash solution
    /// verifier. Always exactly 8 ASCII bytes.
    pub zhash_personalization: [u8; 8],
}

impl Params {
    /// Consensus parameters for the Aurum mainnet network.
    pub const MAINNET: Self = Self {
        network: Network::Mainnet,
        chain_id: 0x0041,
        strict_chain_id: true,
        zhash_personalization: *b"AurumPoW",
    };
    /// Consensus parameters for the Aurum testnet network.
    pub const TESTNET: Self = Self {
        network: Network::Testnet,
        chain_id: 0x0042,
        strict_chain_id: true,
        zhash_personalization: *b"AurumPoW",
    };
    /// Consensus parameters for the Aurum regtest network.
    ///
    /// Regtest does not enforce the chain-id guard, so the synthetic AuxPoW
    /// produced by [`AuxPow::init`](crate::AuxPow::init) verifies as-is.
    pub const REGTEST: Self = Self {
        network: Network::Regtest,
        chain_id: 0x0041,
        strict_chain_id: false,
        zhash_personalization: *b"AurumPoW",
    };

    /// Returns the consensus parameters for the given network.
    pub fn for_network(network: Network) -> Self {
        match network {
            Network::Mainnet => Self::MAINNET,
            Network::Testnet => Self::TESTNET,
            Network::Regtest => Self::REGTEST,
        }
    }
}
