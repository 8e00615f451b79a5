#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Network {
    /// Mainnet Aurum network.
    Mainnet,
    /// Testnet Aurum network.
    Testnet,
    /// Regtest Aurum network.
    Regtest,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "aurum",
            Network::Testnet => "aurumtestnet",
            Network::Regtest => "aurumregtest",
        }
    }
}
