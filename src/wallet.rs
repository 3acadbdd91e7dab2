//! Wallet management module
//!
//! The relay pipeline never takes custody of seed material; it only needs
//! the user's keypair for partial signing. [`AccountStorage`] is the seam
//! the application implements, and [`Wallet`] is the file/keypair-backed
//! implementation used by tests and simple integrations.

use anyhow::{Context, Result};
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use std::sync::Arc;

/// Source of the user's signing account
///
/// Returns `None` when no account is configured; the context manager
/// treats that as an invalid-context condition rather than panicking.
pub trait AccountStorage: Send + Sync {
    fn account(&self) -> Option<Arc<Keypair>>;
}

/// Keypair-backed wallet
pub struct Wallet {
    keypair: Arc<Keypair>,
}

impl Wallet {
    /// Create a wallet from a keypair file (raw 64 bytes or JSON array)
    pub fn from_file(path: &str) -> Result<Self> {
        let keypair_bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read keypair file: {}", path))?;

        let keypair = if keypair_bytes.len() == 64 {
            // Raw bytes format - validate before conversion
            if keypair_bytes.iter().all(|&b| b == 0) {
                anyhow::bail!("Invalid keypair: all-zero key rejected");
            }
            Keypair::try_from(keypair_bytes.as_slice()).context("Invalid keypair bytes")?
        } else {
            // JSON format
            let json: Vec<u8> = serde_json::from_slice(&keypair_bytes)
                .context("Failed to parse keypair JSON")?;
            if json.len() != 64 {
                anyhow::bail!(
                    "Invalid keypair length: expected 64 bytes, got {}",
                    json.len()
                );
            }
            if json.iter().all(|&b| b == 0) {
                anyhow::bail!("Invalid keypair: all-zero key rejected");
            }
            Keypair::try_from(json.as_slice()).context("Invalid keypair from JSON")?
        };

        Ok(Self {
            keypair: Arc::new(keypair),
        })
    }

    pub fn from_keypair(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
        }
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    /// Clone the keypair (for signer lists that need owned keypairs)
    pub fn keypair_cloned(&self) -> Keypair {
        Keypair::try_from(self.keypair.to_bytes().as_slice()).expect("Valid keypair")
    }

    pub fn keypair_arc(&self) -> Arc<Keypair> {
        Arc::clone(&self.keypair)
    }
}

impl AccountStorage for Wallet {
    fn account(&self) -> Option<Arc<Keypair>> {
        Some(Arc::clone(&self.keypair))
    }
}

impl Clone for Wallet {
    fn clone(&self) -> Self {
        Self {
            keypair: Arc::clone(&self.keypair),
        }
    }
}
