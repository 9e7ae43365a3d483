use anyhow::{Result, anyhow};
use std::fmt;
use std::str::FromStr;

/// Chain the wallet talks to. Testnet unless `SUI_CHAIN` or `--chain` says otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Network {
    Devnet,
    #[default]
    Testnet,
    Mainnet,
}

impl Network {
    pub const ALL: [Network; 3] = [Network::Devnet, Network::Testnet, Network::Mainnet];

    /// Public Mysten fullnode, used when no RPC override is configured.
    pub fn rpc_url(&self) -> &'static str {
        match self {
            Network::Devnet => "https://fullnode.devnet.sui.io:443",
            Network::Testnet => "https://fullnode.testnet.sui.io:443",
            Network::Mainnet => "https://fullnode.mainnet.sui.io:443",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Devnet => "devnet",
            Network::Testnet => "testnet",
            Network::Mainnet => "mainnet",
        }
    }

    /// Whether the mock prover may be used here. Its proofs never verify on mainnet.
    pub fn allows_mock_prover(&self) -> bool {
        !matches!(self, Network::Mainnet)
    }
}

impl FromStr for Network {
    type Err = anyhow::Error;

    /// Accepts `testnet` as well as the wallet-standard `sui:testnet`.
    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_lowercase();
        let name = name.strip_prefix("sui:").unwrap_or(&name);
        Network::ALL
            .into_iter()
            .find(|n| n.as_str() == name)
            .ok_or_else(|| {
                let known = Network::ALL.map(|n| n.as_str()).join(", ");
                anyhow!("unknown chain '{}', expected one of: {}", s, known)
            })
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_network() {
        assert_eq!("Mainnet".parse::<Network>().unwrap(), Network::Mainnet);
        assert_eq!(" sui:devnet ".parse::<Network>().unwrap(), Network::Devnet);
        assert_eq!(Network::default(), Network::Testnet);

        let err = "localnet".parse::<Network>().unwrap_err().to_string();
        assert!(err.contains("'localnet'"));
        assert!(err.contains("devnet, testnet, mainnet"));
    }

    #[test]
    fn test_names_round_trip_through_display() {
        for network in Network::ALL {
            assert_eq!(network.to_string().parse::<Network>().unwrap(), network);
        }
    }

    #[test]
    fn test_mock_prover_only_off_mainnet() {
        assert!(Network::Testnet.allows_mock_prover());
        assert!(Network::Devnet.allows_mock_prover());
        assert!(!Network::Mainnet.allows_mock_prover());
    }
}
