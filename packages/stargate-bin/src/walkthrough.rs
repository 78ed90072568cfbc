//! Connect, inspect a historical faucet transfer, then sign and broadcast transfers of our own.

use anyhow::{Context, Result};
use stargate::{
    coin::{amount_of, coin, PrettyCoins},
    proto::cosmos::{bank::v1beta1::MsgSend, staking::v1beta1::MsgDelegate},
    Address, AddressHrp, Cosmos, CosmosNetwork, DecodedMessage, Fee, HasAddress, IndexedTx, StdFee, TxBuilder,
    Wallet,
};

use crate::secret::SecretOpt;

const ALICE: &str = "cosmos1ymcwj2xk0k786phq90vg20s5uupxwr55fzgl77";
const FAUCET_TX: &str = "9EDABB7B3F8047B9FE64CE08786343B34DDFA4F314FFAFDBCFB7D377DF11E9D4";
const THETA_VALIDATOR: &str = "cosmosvaloper178h4s6at5v9cd8m9n7ew3hg7k9eh0s6wptxpcn";

#[derive(clap::Parser)]
pub(crate) struct Opt {
    /// Address the loaded secret must derive to
    #[clap(long, default_value = ALICE)]
    expected_address: Address,
    /// Historical faucet transaction to inspect
    #[clap(long, default_value = FAUCET_TX)]
    faucet_tx: String,
    #[clap(flatten)]
    secret: SecretOpt,
    /// Recipient of the transfer, defaults to the faucet that funded us
    #[clap(long)]
    recipient: Option<Address>,
    /// Amount to send, in the gas coin
    #[clap(long, default_value_t = 100000)]
    amount: u128,
    /// Explicit fee for the transfer, in the gas coin
    #[clap(long, default_value_t = 1000)]
    fee: u128,
    /// Explicit gas limit for the transfer
    #[clap(long, default_value_t = 200000)]
    gas: u64,
    /// Validator for the send plus delegate transaction. Testnet default: 01node
    #[clap(long)]
    validator: Option<String>,
    /// Amount to delegate, in the gas coin
    #[clap(long, default_value_t = 1000)]
    delegate_amount: u128,
    /// Skip the send plus delegate transaction
    #[clap(long)]
    no_delegate: bool,
}

impl Opt {
    fn validator(&self, network: CosmosNetwork, hrp: AddressHrp) -> Result<Option<Address>> {
        if self.no_delegate {
            return Ok(None);
        }
        let validator = match (&self.validator, network) {
            (Some(validator), _) => validator.as_str(),
            (None, CosmosNetwork::ThetaTestnet) => THETA_VALIDATOR,
            (None, CosmosNetwork::Local) => return Ok(None),
        };
        parse_validator(validator, hrp).map(Some)
    }
}

/// Parse a validator operator address for a chain whose accounts use `hrp`.
pub(crate) fn parse_validator(s: &str, hrp: AddressHrp) -> Result<Address> {
    let valoper = hrp.validator_operator()?;
    Address::parse_with_hrp(s, valoper)
        .with_context(|| format!("Invalid validator operator address {s}"))
}

pub(crate) async fn go(opt: Opt, cosmos: Cosmos, network: CosmosNetwork) -> Result<()> {
    let denom = cosmos.get_gas_coin().to_owned();
    println!(
        "With client, chain id: {}, height: {}",
        cosmos.get_chain_id().await?,
        cosmos.get_height().await?
    );
    println!(
        "Alice balances: {}",
        PrettyCoins(&cosmos.all_balances(opt.expected_address).await?)
    );

    // Review the faucet transaction
    let faucet_tx = cosmos
        .get_transaction(&opt.faucet_tx)
        .await?
        .with_context(|| format!("Faucet transaction {} not found", opt.faucet_tx))?;
    println!();
    print_indexed_tx("Faucet Tx", &faucet_tx);
    let decoded = faucet_tx.decode()?;
    println!(
        "\nFaucet decoded tx: memo {:?}, {} message(s), {} signature(s)",
        decoded.memo(),
        decoded.raw_messages().len(),
        decoded.signatures.len()
    );
    println!("\nFaucet decoded tx messages:");
    for any in decoded.raw_messages() {
        println!("  {}", any.type_url);
    }
    let messages = decoded.messages()?;
    let send = match messages.first() {
        Some(DecodedMessage::Send(send)) => send,
        Some(other) => anyhow::bail!("Expected a MsgSend in the faucet transaction, found {other}"),
        None => anyhow::bail!("Faucet transaction contains no messages"),
    };
    println!("\nSent message: {}", messages[0]);

    let faucet: Address = send.from_address.parse()?;
    println!(
        "\nFaucet balances: {}",
        PrettyCoins(&cosmos.all_balances(faucet).await?)
    );

    // Same address, found via the emitted events
    let spender = faucet_tx
        .spender()
        .context("No coin_spent event with a spender in the faucet transaction")?;
    println!("\nFaucet address from raw log: {spender}");
    anyhow::ensure!(
        spender == send.from_address,
        "Decoded sender {} does not match event spender {spender}",
        send.from_address
    );

    // Signing
    let wallet = opt.secret.load(network, cosmos.get_hrp())?;
    let alice = *wallet.address();
    println!("\nAlice's address from signer: \n{alice}\n{}", opt.expected_address);
    anyhow::ensure!(
        alice == opt.expected_address,
        "Secret derives {alice}, expected {}. Wrong secret file or prefix?",
        opt.expected_address
    );
    println!(
        "\nWith signing client, chain id: {}, height: {}",
        cosmos.get_chain_id().await?,
        cosmos.get_height().await?
    );

    println!("\nGas fee: {}", PrettyCoins(decoded.fee()));
    println!("Gas limit: {}", decoded.gas_limit());

    let recipient = opt.recipient.unwrap_or(faucet);
    let alice_before = cosmos.all_balances(alice).await?;
    let recipient_before = cosmos.all_balances(recipient).await?;
    println!("\nAlice balance before: {}", PrettyCoins(&alice_before));
    println!("Faucet balance before: {}", PrettyCoins(&recipient_before));

    let result = wallet
        .send_tokens(
            &cosmos,
            recipient,
            vec![coin(opt.amount, &denom)],
            Fee::Explicit(StdFee {
                amount: vec![coin(opt.fee, &denom)],
                gas: opt.gas,
            }),
        )
        .await?;
    println!();
    print_indexed_tx("Token transfer result", &result);

    let alice_after = cosmos.all_balances(alice).await?;
    let recipient_after = cosmos.all_balances(recipient).await?;
    println!("\nAlice balance after: {}", PrettyCoins(&alice_after));
    println!("Faucet balance after: {}", PrettyCoins(&recipient_after));
    if recipient != alice {
        let before_alice = amount_of(&alice_before, &denom)?;
        check_balance(
            "Faucet",
            amount_of(&recipient_after, &denom)?,
            amount_of(&recipient_before, &denom)?.checked_add(opt.amount),
        );
        check_balance(
            "Alice",
            amount_of(&alice_after, &denom)?,
            opt.amount
                .checked_add(opt.fee)
                .and_then(|spent| before_alice.checked_sub(spent)),
        );
    }

    if let Some(validator) = opt.validator(network, cosmos.get_hrp())? {
        multi_send(&cosmos, &wallet, recipient, validator, &denom, &opt).await?;
    }

    Ok(())
}

async fn multi_send(
    cosmos: &Cosmos,
    wallet: &Wallet,
    recipient: Address,
    validator: Address,
    denom: &str,
    opt: &Opt,
) -> Result<()> {
    let mut txbuilder = TxBuilder::default();
    txbuilder
        .add_message(MsgSend {
            from_address: wallet.get_address_string(),
            to_address: recipient.get_address_string(),
            amount: vec![coin(opt.amount, denom)],
        })
        .add_message(MsgDelegate {
            delegator_address: wallet.get_address_string(),
            validator_address: validator.get_address_string(),
            amount: Some(coin(opt.delegate_amount, denom)),
        });
    tracing::debug!("Signing and broadcasting:\n{txbuilder}");
    let result = txbuilder
        .sign_and_broadcast(cosmos, wallet, Fee::Auto)
        .await
        .context("Send plus delegate transaction failed")?;
    println!();
    print_indexed_tx("Send plus delegate result", &result);
    Ok(())
}

/// Warn when a balance differs from what the transfer implies.
fn check_balance(who: &str, actual: u128, expected: Option<u128>) {
    if expected != Some(actual) {
        match expected {
            Some(expected) => {
                tracing::warn!("{who} balance is {actual}, expected {expected}")
            }
            None => tracing::warn!("{who} balance is {actual}, expected amount is out of range"),
        }
    }
}

pub(crate) fn print_indexed_tx(label: &str, tx: &IndexedTx) {
    println!("{label}:");
    println!("  Hash: {}", tx.hash);
    println!("  Height: {}", tx.height);
    println!("  Code: {}", tx.code);
    if !tx.codespace.is_empty() {
        println!("  Codespace: {}", tx.codespace);
    }
    println!("  Gas used: {}/{}", tx.gas_used, tx.gas_wanted);
    println!("  Events: {}", tx.log_events().len());
    println!("  Encoded length: {}", tx.tx.len());
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn validator_needs_operator_prefix() {
        let validator = parse_validator(THETA_VALIDATOR, AddressHrp::COSMOS).unwrap();
        assert_eq!(validator.to_string(), THETA_VALIDATOR);
        parse_validator(ALICE, AddressHrp::COSMOS).unwrap_err();
        parse_validator("not an address", AddressHrp::COSMOS).unwrap_err();
    }

    #[test]
    fn validator_defaults_follow_network() {
        let opt = Opt::try_parse_from(["test"]).unwrap();
        assert_eq!(
            opt.validator(CosmosNetwork::ThetaTestnet, AddressHrp::COSMOS)
                .unwrap()
                .map(|v| v.to_string()),
            Some(THETA_VALIDATOR.to_owned())
        );
        assert_eq!(
            opt.validator(CosmosNetwork::Local, AddressHrp::COSMOS).unwrap(),
            None
        );

        let opt = Opt::try_parse_from(["test", "--validator", ALICE]).unwrap();
        opt.validator(CosmosNetwork::Local, AddressHrp::COSMOS)
            .unwrap_err();

        let opt = Opt::try_parse_from(["test", "--no-delegate"]).unwrap();
        assert_eq!(
            opt.validator(CosmosNetwork::ThetaTestnet, AddressHrp::COSMOS)
                .unwrap(),
            None
        );
    }
}
