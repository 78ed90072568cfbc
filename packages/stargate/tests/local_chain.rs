//! Tests against a running local simd node.
//!
//! Run with `cargo test -- --ignored`. The node is taken from `STARGATE_RPC`
//! (default `http://127.0.0.1:26657`) and the funded signer from the raw hex key in
//! `STARGATE_KEY_FILE` (default `./simd.alice.private.key`).

use stargate::{
    coin::{amount_of, coin},
    error::RejectionStage,
    Address, Cosmos, CosmosNetwork, Error, Fee, HasAddress, SecretKind, SecretSource, StdFee,
    Wallet,
};

async fn connect() -> Cosmos {
    let mut builder = CosmosNetwork::Local.builder();
    if let Ok(endpoint) = std::env::var("STARGATE_RPC") {
        builder.set_endpoint(endpoint);
    }
    builder.build().await.unwrap()
}

fn alice(cosmos: &Cosmos) -> Wallet {
    let path = std::env::var("STARGATE_KEY_FILE")
        .unwrap_or_else(|_| "./simd.alice.private.key".to_owned());
    Wallet::load(&SecretSource::new(path, SecretKind::RawKey), cosmos.get_hrp()).unwrap()
}

fn fresh_address(cosmos: &Cosmos) -> Address {
    let phrase = Wallet::generate_phrase();
    *Wallet::from_phrase(&phrase, cosmos.get_hrp())
        .unwrap()
        .address()
}

#[tokio::test]
#[ignore]
async fn empty_account_has_no_balances() {
    let cosmos = connect().await;
    let balances = cosmos.all_balances(fresh_address(&cosmos)).await.unwrap();
    assert_eq!(balances, vec![]);
}

#[tokio::test]
#[ignore]
async fn unknown_transaction_is_none() {
    let cosmos = connect().await;
    let res = cosmos
        .get_transaction("0000000000000000000000000000000000000000000000000000000000000000")
        .await
        .unwrap();
    assert!(res.is_none());
}

#[tokio::test]
#[ignore]
async fn transfer_moves_exact_amount() {
    let cosmos = connect().await;
    let wallet = alice(&cosmos);
    let denom = cosmos.get_gas_coin().to_owned();
    let recipient = fresh_address(&cosmos);

    let before = cosmos.all_balances(wallet.get_address()).await.unwrap();
    let res = wallet
        .send_tokens(
            &cosmos,
            recipient,
            vec![coin(100000, &denom)],
            Fee::Explicit(StdFee {
                amount: vec![coin(1000, &denom)],
                gas: 200000,
            }),
        )
        .await
        .unwrap();
    assert!(res.is_success());
    assert!(res.height > 0);

    let received = cosmos.all_balances(recipient).await.unwrap();
    assert_eq!(amount_of(&received, &denom).unwrap(), 100000);
    let after = cosmos.all_balances(wallet.get_address()).await.unwrap();
    assert_eq!(
        amount_of(&before, &denom).unwrap() - amount_of(&after, &denom).unwrap(),
        101000
    );

    let fetched = cosmos.get_transaction(&res.hash).await.unwrap().unwrap();
    assert_eq!(fetched.spender(), Some(wallet.get_address_string()));
}

#[tokio::test]
#[ignore]
async fn insufficient_gas_is_rejected() {
    let cosmos = connect().await;
    let wallet = alice(&cosmos);
    let denom = cosmos.get_gas_coin().to_owned();
    let recipient = fresh_address(&cosmos);

    let before = cosmos.all_balances(wallet.get_address()).await.unwrap();
    let err = wallet
        .send_tokens(
            &cosmos,
            recipient,
            vec![coin(100000, &denom)],
            Fee::Explicit(StdFee {
                amount: vec![coin(1, &denom)],
                gas: 1000,
            }),
        )
        .await
        .unwrap_err();
    match err {
        Error::TransactionRejected { stage, code, .. } => {
            assert!(matches!(stage, RejectionStage::CheckTx));
            assert_ne!(code, 0);
        }
        e => panic!("Unexpected error: {e}"),
    }

    let after = cosmos.all_balances(wallet.get_address()).await.unwrap();
    assert_eq!(before, after);
    assert_eq!(cosmos.all_balances(recipient).await.unwrap(), vec![]);
}
