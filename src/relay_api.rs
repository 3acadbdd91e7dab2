//! Relay service HTTP API
//!
//! The relay server exposes a small REST surface: the fee payer it signs
//! with, per-user free-tier limits, and two submission endpoints that
//! either relay a transaction end to end or just co-sign it and hand it
//! back. [`RelayApi`] is the seam; [`HttpRelayApiClient`] is the reqwest
//! implementation. Versions above 1 are addressed under a `/v{n}` prefix.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::debug;

use crate::config::{OperationType, RelayConfiguration};
use crate::error::FeeRelayerError;
use crate::relay::context::UsageStatus;
use crate::types::PreparedTransaction;

/// Client-side view of the relay server API
#[async_trait]
pub trait RelayApi: Send + Sync {
    /// Pubkey of the account the relay signs transactions with
    async fn fee_payer_pubkey(&self) -> Result<Pubkey, FeeRelayerError>;

    /// Free-tier usage counters for a user authority
    async fn free_fee_limits(&self, authority: &Pubkey) -> Result<UsageStatus, FeeRelayerError>;

    /// Submit a transaction for the relay to sign and broadcast
    async fn relay_transaction(
        &self,
        param: &RelayTransactionParam,
    ) -> Result<Signature, FeeRelayerError>;

    /// Ask the relay to co-sign a transaction without broadcasting it
    async fn sign_relay_transaction(
        &self,
        param: &RelayTransactionParam,
    ) -> Result<Signature, FeeRelayerError>;
}

/// Usage statistics tag sent along with relayed transactions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsInfo {
    pub operation_type: OperationType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

impl From<&RelayConfiguration> for StatsInfo {
    fn from(config: &RelayConfiguration) -> Self {
        Self {
            operation_type: config.operation_type,
            currency: config.currency.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestAccountMeta {
    /// Index into the `pubkeys` table
    pub pubkey: u8,
    pub is_signer: bool,
    pub is_writable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestInstruction {
    /// Index of the program id in the `pubkeys` table
    #[serde(rename = "program_id")]
    pub program_index: u8,
    pub accounts: Vec<RequestAccountMeta>,
    pub data: Vec<u8>,
}

/// Compiled-message form of a transaction, as the relay server expects it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayTransactionParam {
    pub instructions: Vec<RequestInstruction>,
    /// Signer index (as a decimal string) to base58 signature
    pub signatures: HashMap<String, String>,
    pub pubkeys: Vec<String>,
    pub blockhash: String,
    #[serde(rename = "info")]
    pub stats_info: StatsInfo,
}

impl RelayTransactionParam {
    /// Flatten a prepared transaction into the relay wire format
    pub fn new(
        prepared: &PreparedTransaction,
        stats_info: StatsInfo,
    ) -> Result<Self, FeeRelayerError> {
        let message = &prepared.transaction.message;

        let pubkeys: Vec<String> = message.account_keys.iter().map(|k| k.to_string()).collect();

        let instructions = message
            .instructions
            .iter()
            .map(|compiled| RequestInstruction {
                program_index: compiled.program_id_index,
                accounts: compiled
                    .accounts
                    .iter()
                    .map(|&index| RequestAccountMeta {
                        pubkey: index,
                        is_signer: message.is_signer(index as usize),
                        is_writable: message.is_maybe_writable(index as usize, None),
                    })
                    .collect(),
                data: compiled.data.clone(),
            })
            .collect();

        let mut signatures = HashMap::new();
        let signer_slots = usize::from(message.header.num_required_signatures);
        for signer in prepared.signer_pubkeys() {
            let index = message
                .account_keys
                .iter()
                .position(|key| *key == signer)
                .ok_or(FeeRelayerError::InvalidSignature)?;
            // Side signers without a signature slot are fee accounting
            // only; they have nothing to send
            if index >= signer_slots {
                continue;
            }
            let signature = prepared.find_signature(&signer)?;
            signatures.insert(index.to_string(), signature.to_string());
        }

        Ok(Self {
            instructions,
            signatures,
            pubkeys,
            blockhash: message.recent_blockhash.to_string(),
            stats_info,
        })
    }
}

#[derive(Debug, Deserialize)]
struct FreeFeeLimitsResponse {
    limits: Limits,
    processed_fee: ProcessedFee,
}

#[derive(Debug, Deserialize)]
struct Limits {
    max_fee_amount: u64,
    max_fee_count: u64,
    max_token_account_creation_count: u64,
}

#[derive(Debug, Deserialize)]
struct ProcessedFee {
    total_fee_amount: u64,
    fee_count: u64,
    rent_count: u64,
}

impl From<FreeFeeLimitsResponse> for UsageStatus {
    fn from(response: FreeFeeLimitsResponse) -> Self {
        UsageStatus {
            max_usage: response.limits.max_fee_count,
            current_usage: response.processed_fee.fee_count,
            max_amount: response.limits.max_fee_amount,
            amount_used: response.processed_fee.total_fee_amount,
            reached_limit_for_account_creation: response.processed_fee.rent_count
                >= response.limits.max_token_account_creation_count,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RelayErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct SignRelayTransactionResponse {
    signature: String,
}

/// Reqwest-backed relay API client
pub struct HttpRelayApiClient {
    client: reqwest::Client,
    base_url: String,
    version: u8,
}

impl HttpRelayApiClient {
    pub fn new(base_url: impl Into<String>, version: u8) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            version,
        }
    }

    fn url(&self, path: &str) -> String {
        if self.version > 1 {
            format!("{}/v{}{}", self.base_url, self.version, path)
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    async fn check(&self, response: reqwest::Response) -> Result<reqwest::Response, FeeRelayerError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<RelayErrorBody>(&body) {
            Ok(err) => Err(FeeRelayerError::Relay {
                code: err.code,
                message: err.message,
            }),
            Err(_) => Err(FeeRelayerError::Relay {
                code: status.as_u16() as i64,
                message: body,
            }),
        }
    }

    fn parse_signature(raw: &str) -> Result<Signature, FeeRelayerError> {
        let bytes = bs58::decode(raw.trim())
            .into_vec()
            .map_err(|_| FeeRelayerError::InvalidSignature)?;
        Signature::try_from(bytes.as_slice()).map_err(|_| FeeRelayerError::InvalidSignature)
    }
}

#[async_trait]
impl RelayApi for HttpRelayApiClient {
    async fn fee_payer_pubkey(&self) -> Result<Pubkey, FeeRelayerError> {
        let response = self.client.get(self.url("/fee_payer/pubkey")).send().await?;
        let body = self.check(response).await?.text().await?;
        // The server returns the key as a bare or JSON-quoted string
        let raw = body.trim().trim_matches('"');
        Pubkey::from_str(raw)
            .map_err(|_| FeeRelayerError::internal(format!("bad fee payer pubkey: {raw}")))
    }

    async fn free_fee_limits(&self, authority: &Pubkey) -> Result<UsageStatus, FeeRelayerError> {
        let url = self.url(&format!("/free_fee_limits/{authority}"));
        let response = self.client.get(url).send().await?;
        let limits: FreeFeeLimitsResponse = self.check(response).await?.json().await?;
        Ok(limits.into())
    }

    async fn relay_transaction(
        &self,
        param: &RelayTransactionParam,
    ) -> Result<Signature, FeeRelayerError> {
        let response = self
            .client
            .post(self.url("/relay_transaction"))
            .json(param)
            .send()
            .await?;
        // Response is a one-element JSON array of signature strings
        let signatures: Vec<String> = self.check(response).await?.json().await?;
        let raw = signatures.first().ok_or(FeeRelayerError::InvalidSignature)?;
        debug!(signature = %raw, "transaction relayed");
        Self::parse_signature(raw)
    }

    async fn sign_relay_transaction(
        &self,
        param: &RelayTransactionParam,
    ) -> Result<Signature, FeeRelayerError> {
        let response = self
            .client
            .post(self.url("/sign_relay_transaction"))
            .json(param)
            .send()
            .await?;
        let signed: SignRelayTransactionResponse = self.check(response).await?.json().await?;
        Self::parse_signature(&signed.signature)
    }
}
