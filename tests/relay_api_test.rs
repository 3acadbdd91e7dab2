//! Integration tests for the relay HTTP API client
//!
//! Validates:
//! - Fee payer pubkey parsing (bare and JSON-quoted)
//! - Free-tier limits mapping
//! - Relay submission response and error-body handling
//! - Versioned path prefixes

use fee_relay::error::FeeRelayerError;
use fee_relay::relay_api::{HttpRelayApiClient, RelayApi, RelayTransactionParam, StatsInfo};
use fee_relay::types::{FeeAmount, PreparedTransaction};
use fee_relay::OperationType;
use solana_sdk::{
    hash::Hash, message::Message, pubkey::Pubkey, signature::Keypair, signer::Signer,
    system_instruction, transaction::Transaction,
};

fn sample_param() -> RelayTransactionParam {
    let fee_payer = Pubkey::new_unique();
    let user = Keypair::new();
    let ix = system_instruction::transfer(&user.pubkey(), &fee_payer, 100);
    let message = Message::new_with_blockhash(&[ix], Some(&fee_payer), &Hash::new_unique());
    let prepared = PreparedTransaction::new(
        Transaction::new_unsigned(message),
        vec![user],
        FeeAmount::new(10_000, 0),
    )
    .unwrap();
    RelayTransactionParam::new(
        &prepared,
        StatsInfo {
            operation_type: OperationType::Transfer,
            currency: None,
        },
    )
    .unwrap()
}

#[tokio::test]
async fn test_fee_payer_pubkey_accepts_quoted_string() {
    let mut server = mockito::Server::new_async().await;
    let expected = Pubkey::new_unique();
    let mock = server
        .mock("GET", "/fee_payer/pubkey")
        .with_status(200)
        .with_body(format!("\"{expected}\""))
        .create_async()
        .await;

    let client = HttpRelayApiClient::new(server.url(), 1);
    let pubkey = client.fee_payer_pubkey().await.unwrap();
    assert_eq!(pubkey, expected);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_free_fee_limits_mapping() {
    let mut server = mockito::Server::new_async().await;
    let authority = Pubkey::new_unique();
    let mock = server
        .mock("GET", format!("/free_fee_limits/{authority}").as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "limits": {
                    "max_fee_amount": 10000000,
                    "max_fee_count": 100,
                    "max_token_account_creation_count": 30
                },
                "processed_fee": {
                    "total_fee_amount": 25000,
                    "fee_count": 5,
                    "rent_count": 2
                }
            }"#,
        )
        .create_async()
        .await;

    let client = HttpRelayApiClient::new(server.url(), 1);
    let usage = client.free_fee_limits(&authority).await.unwrap();
    assert_eq!(usage.max_usage, 100);
    assert_eq!(usage.current_usage, 5);
    assert_eq!(usage.amount_used, 25_000);
    assert!(!usage.reached_limit_for_account_creation);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_relay_transaction_returns_first_signature() {
    let mut server = mockito::Server::new_async().await;
    let signature = solana_sdk::signature::Signature::from([7u8; 64]);
    let mock = server
        .mock("POST", "/relay_transaction")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!("[\"{signature}\"]"))
        .create_async()
        .await;

    let client = HttpRelayApiClient::new(server.url(), 1);
    let returned = client.relay_transaction(&sample_param()).await.unwrap();
    assert_eq!(returned, signature);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_error_body_surfaces_code_and_message() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/relay_transaction")
        .with_status(400)
        .with_body(r#"{"code": 6, "message": "insufficient funds for top up"}"#)
        .create_async()
        .await;

    let client = HttpRelayApiClient::new(server.url(), 1);
    let err = client.relay_transaction(&sample_param()).await.unwrap_err();
    match err {
        FeeRelayerError::Relay { code, message } => {
            assert_eq!(code, 6);
            assert_eq!(message, "insufficient funds for top up");
        }
        other => panic!("expected relay error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_version_prefix_applied_above_v1() {
    let mut server = mockito::Server::new_async().await;
    let expected = Pubkey::new_unique();
    let mock = server
        .mock("GET", "/v2/fee_payer/pubkey")
        .with_status(200)
        .with_body(expected.to_string())
        .create_async()
        .await;

    let client = HttpRelayApiClient::new(server.url(), 2);
    let pubkey = client.fee_payer_pubkey().await.unwrap();
    assert_eq!(pubkey, expected);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_sign_relay_transaction_parses_signature_field() {
    let mut server = mockito::Server::new_async().await;
    let signature = solana_sdk::signature::Signature::from([9u8; 64]);
    server
        .mock("POST", "/sign_relay_transaction")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!(
            "{{\"signature\": \"{signature}\", \"transaction\": \"\"}}"
        ))
        .create_async()
        .await;

    let client = HttpRelayApiClient::new(server.url(), 1);
    let returned = client
        .sign_relay_transaction(&sample_param())
        .await
        .unwrap();
    assert_eq!(returned, signature);
}
