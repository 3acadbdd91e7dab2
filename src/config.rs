//! Configuration for the fee relay client

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::relay::program;

/// Which Solana cluster the relay program lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Network {
    #[default]
    MainnetBeta,
    Devnet,
}

impl Network {
    /// Relay program id deployed on this cluster
    pub fn relay_program_id(&self) -> Pubkey {
        match self {
            Network::MainnetBeta => program::mainnet_id(),
            Network::Devnet => program::devnet_id(),
        }
    }
}

/// Statistics tag attached to relayed transactions
///
/// The relay service aggregates usage per operation kind; this does not
/// change transaction semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    TopUp,
    #[default]
    Transfer,
    Swap,
    Other,
}

/// Per-request relay configuration; feeds the stats tag sent with every
/// relayed transaction
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RelayConfiguration {
    #[serde(default)]
    pub operation_type: OperationType,
    /// Token symbol reported to the relay for statistics
    #[serde(default)]
    pub currency: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = RelayConfiguration::default();
        assert_eq!(cfg.operation_type, OperationType::Transfer);
        assert!(cfg.currency.is_none());
    }

    #[test]
    fn test_deserializes_with_missing_fields() {
        let cfg: RelayConfiguration = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.operation_type, OperationType::Transfer);
        assert!(cfg.currency.is_none());
    }

    #[test]
    fn test_network_program_ids_differ() {
        assert_ne!(
            Network::MainnetBeta.relay_program_id(),
            Network::Devnet.relay_program_id()
        );
    }
}
