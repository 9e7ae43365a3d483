use axum::{Json, Router, routing::post};
use serde_json::{Value, json};
use session::Session;
use sui::{ChainClient, ChainError, Direction, EpochSource, TransferError, TransferRequest};
use sui_sdk_types::{Argument, Command, TransactionKind};
use zklogin::{EphemeralKeyPair, IssBase64Details, ProofPoints, ZkProof};

const OWNER: &str = "0x00000000000000000000000000000000000000000000000000000000000000aa";
const OTHER: &str = "0x00000000000000000000000000000000000000000000000000000000000000bb";
const USDC: &str = "0xdba34672e30cb065b1f93e3ab55318768fd6fef66c15942c9f7cb846e2f900e7::usdc::USDC";

async fn serve(handler: fn(&str, &Value) -> Value) -> ChainClient {
    let app = Router::new().route(
        "/",
        post(move |Json(body): Json<Value>| async move {
            let method = body["method"].as_str().unwrap_or_default().to_string();
            Json(handler(&method, &body["params"]))
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    ChainClient::new(format!("http://{}/", addr))
}

fn ok(result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": 1, "result": result })
}

fn tx_block(digest: &str, ts: u64, sender: &str, recipient: &str) -> Value {
    json!({
        "digest": digest,
        "timestampMs": ts.to_string(),
        "transaction": { "data": { "sender": sender } },
        "effects": { "status": { "status": "success" }, "gasUsed": {
            "computationCost": "750000", "storageCost": "0", "storageRebate": "0"
        }},
        "balanceChanges": [
            { "owner": { "AddressOwner": recipient }, "coinType": "0x2::sui::SUI", "amount": "250000000" }
        ]
    })
}

fn coin(coin_type: &str, id: u8, balance: u64) -> Value {
    json!({
        "coinType": coin_type,
        "coinObjectId": format!("0x{:064x}", id),
        "version": "7",
        "digest": "11111111111111111111111111111111",
        "balance": balance.to_string()
    })
}

fn node(method: &str, params: &Value) -> Value {
    match method {
        "suix_getReferenceGasPrice" => ok(json!("1000")),
        "suix_getCoins" => {
            let data = match params[1].as_str() {
                Some(USDC) => vec![coin(USDC, 0x21, 1_000_000), coin(USDC, 0x22, 1_500_000)],
                _ => vec![coin("0x2::sui::SUI", 0x11, 500_000_000), coin("0x2::sui::SUI", 0x12, 3_000_000_000)],
            };
            ok(json!({ "data": data, "nextCursor": null, "hasNextPage": false }))
        }
        "sui_executeTransactionBlock" => ok(json!({
            "digest": "5xDigestOk",
            "effects": { "status": { "status": "success" } }
        })),
        "suix_getAllCoins" => ok(json!({
            "data": [{
                "coinType": "0x2::sui::SUI",
                "coinObjectId": "0x0000000000000000000000000000000000000000000000000000000000000c01",
                "version": "3",
                "digest": "11111111111111111111111111111111",
                "balance": "1000000000"
            }],
            "nextCursor": null,
            "hasNextPage": false
        })),
        "suix_getLatestSuiSystemState" => ok(json!({ "epoch": "812", "protocolVersion": "70" })),
        "suix_queryTransactionBlocks" => {
            let filter = &params[0]["filter"];
            let data = if filter.get("FromAddress").is_some() {
                vec![tx_block("sent-1", 2_000, OWNER, OTHER), tx_block("self-1", 1_000, OWNER, OWNER)]
            } else {
                vec![tx_block("recv-1", 3_000, OTHER, OWNER), tx_block("self-1", 1_000, OWNER, OWNER)]
            };
            ok(json!({ "data": data, "nextCursor": null, "hasNextPage": false }))
        }
        _ => json!({ "jsonrpc": "2.0", "id": 1, "error": { "code": -32601, "message": "Method not found" } }),
    }
}

fn rejecting_node(method: &str, params: &Value) -> Value {
    match method {
        "sui_executeTransactionBlock" => ok(json!({
            "digest": "5xDigestFailed",
            "effects": { "status": { "status": "failure", "error": "InsufficientCoinBalance" } }
        })),
        _ => node(method, params),
    }
}

fn failing_node(_method: &str, _params: &Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": 1, "error": { "code": -32000, "message": "node is syncing" } })
}

#[tokio::test]
async fn one_sui_is_worth_two_forty_five() {
    let client = serve(node).await;
    let balances = client.fetch_balances("0xaa").await.unwrap();

    assert_eq!(balances.len(), 1);
    assert_eq!(balances[0].symbol, "SUI");
    assert_eq!(balances[0].balance, "1.000000");
    assert_eq!(balances[0].usd_value, "2.45");
}

#[tokio::test]
async fn history_merges_both_directions() {
    let client = serve(node).await;
    let history = client.fetch_transactions(OWNER).await.unwrap();

    let digests: Vec<&str> = history.iter().map(|t| t.digest.as_str()).collect();
    assert_eq!(digests, vec!["recv-1", "sent-1", "self-1"]);
    assert_eq!(history[0].direction, Direction::Received);
    assert_eq!(history[1].direction, Direction::Sent);
    assert_eq!(history[1].amount, "0.25");
    assert_eq!(history[1].fee, "0.00075");
}

#[tokio::test]
async fn reads_current_epoch() {
    let client = serve(node).await;
    assert_eq!(client.current_epoch().await.unwrap(), 812);
}

#[tokio::test]
async fn fetch_failures_are_errors_not_empty_lists() {
    let client = serve(failing_node).await;

    let err = client.fetch_balances(OWNER).await.unwrap_err();
    assert!(matches!(err, ChainError::Rpc { code: -32000, .. }));
    assert!(err.to_string().contains("node is syncing"));

    assert!(client.fetch_transactions(OWNER).await.is_err());
}

#[tokio::test]
async fn rejects_malformed_address() {
    let client = serve(node).await;
    assert!(matches!(
        client.fetch_balances("not-an-address").await,
        Err(ChainError::InvalidAddress(_))
    ));
}

fn session(max_epoch: u64) -> Session {
    Session {
        ephemeral_key: EphemeralKeyPair::from_secret_bytes(&[7u8; 32]).to_sui_private_key().unwrap(),
        proof: ZkProof {
            proof_points: ProofPoints {
                a: vec!["1".into(), "2".into(), "1".into()],
                b: vec![
                    vec!["3".into(), "4".into()],
                    vec!["5".into(), "6".into()],
                    vec!["1".into(), "0".into()],
                ],
                c: vec!["7".into(), "8".into(), "1".into()],
            },
            iss_base64_details: IssBase64Details {
                value: "wiaXNzIjoi".into(),
                index_mod_4: 1,
            },
            header_base64: "eyJhbGciOiJSUzI1NiJ9".into(),
            address_seed: "42".into(),
        },
        max_epoch,
        user_secret: None,
    }
}

fn request(amount: &str, coin_type: Option<&str>) -> TransferRequest {
    TransferRequest {
        recipient: OTHER.to_string(),
        amount: amount.to_string(),
        coin_type: coin_type.map(str::to_string),
    }
}

fn commands(tx: &sui_sdk_types::Transaction) -> &[Command] {
    match &tx.kind {
        TransactionKind::ProgrammableTransaction(ptb) => &ptb.commands,
        other => panic!("unexpected transaction kind {:?}", other),
    }
}

#[tokio::test]
async fn sui_transfer_splits_from_gas() {
    let client = serve(node).await;
    let tx = sui::build_transfer(&client, OWNER, &request("1", None)).await.unwrap();

    assert_eq!(tx.sender.to_string(), OWNER);
    assert_eq!(tx.gas_payment.price, 1000);
    assert_eq!(tx.gas_payment.budget, sui::transfer::GAS_BUDGET);
    // The 3 SUI coin alone covers amount plus budget
    assert_eq!(tx.gas_payment.objects.len(), 1);

    let commands = commands(&tx);
    assert_eq!(commands.len(), 2);
    assert!(matches!(&commands[0], Command::SplitCoins(split) if split.coin == Argument::Gas && split.amounts.len() == 1));
    assert!(matches!(&commands[1], Command::TransferObjects(t) if t.objects.len() == 1));
}

#[tokio::test]
async fn token_transfer_merges_then_splits_owned_coins() {
    let client = serve(node).await;
    let tx = sui::build_transfer(&client, OWNER, &request("2", Some(USDC))).await.unwrap();

    assert_eq!(tx.gas_payment.objects.len(), 1);
    let commands = commands(&tx);
    assert_eq!(commands.len(), 3);
    assert!(matches!(&commands[0], Command::MergeCoins(merge) if merge.coins_to_merge.len() == 1));
    assert!(matches!(&commands[1], Command::SplitCoins(split) if split.coin != Argument::Gas));
    assert!(matches!(&commands[2], Command::TransferObjects(_)));
}

#[tokio::test]
async fn transfer_beyond_balance_is_refused() {
    let client = serve(node).await;
    let err = sui::build_transfer(&client, OWNER, &request("5", None)).await.unwrap_err();
    assert!(matches!(
        err,
        TransferError::InsufficientBalance { available: 3_500_000_000, .. }
    ));

    let err = sui::build_transfer(&client, OWNER, &request("3", Some(USDC))).await.unwrap_err();
    assert!(matches!(err, TransferError::InsufficientBalance { available: 2_500_000, .. }));
}

#[tokio::test]
async fn sign_and_submit_returns_digest() {
    let client = serve(node).await;
    let digest = sui::sign_and_submit(&client, &session(812), OWNER, &request("0.5", None))
        .await
        .unwrap();
    assert_eq!(digest, "5xDigestOk");
}

#[tokio::test]
async fn failed_effects_are_rejections() {
    let client = serve(rejecting_node).await;
    let err = sui::sign_and_submit(&client, &session(900), OWNER, &request("0.5", None))
        .await
        .unwrap_err();
    match err {
        TransferError::Rejected { digest, reason } => {
            assert_eq!(digest, "5xDigestFailed");
            assert_eq!(reason, "InsufficientCoinBalance");
        }
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn expired_session_is_not_signed() {
    let client = serve(node).await;
    let err = sui::sign_and_submit(&client, &session(811), OWNER, &request("0.5", None))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TransferError::SessionExpired { max_epoch: 811, current_epoch: 812 }
    ));
}
