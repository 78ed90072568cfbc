mod parsed_coin;
mod secret;
mod walkthrough;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use parsed_coin::ParsedCoin;
use secret::SecretOpt;
use stargate::{
    clap::CosmosOpt,
    coin::PrettyCoins,
    proto::cosmos::{bank::v1beta1::MsgSend, staking::v1beta1::MsgDelegate},
    Address, AddressHrp, DecodedMessage, Fee, HasAddress, StdFee, TxBuilder, Wallet,
};
use tracing_subscriber::EnvFilter;

/// Walk through querying, inspecting, signing and broadcasting on a Cosmos SDK chain
#[derive(clap::Parser)]
struct Cmd {
    #[clap(flatten)]
    opt: Opt,
    #[clap(subcommand)]
    subcommand: Subcommand,
}

#[derive(clap::Parser)]
struct Opt {
    #[clap(flatten)]
    network_opt: CosmosOpt,
    /// Turn on verbose output
    #[clap(long, short, global = true)]
    verbose: bool,
}

impl Opt {
    fn init_logger(&self) {
        let default_filter = if self.verbose {
            "stargate=debug,info"
        } else {
            "info"
        };
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[derive(clap::Parser)]
struct FeeOpt {
    /// Explicit fee, e.g. 1000uatom. Estimated by simulation when omitted
    #[clap(long, requires = "gas")]
    fee: Option<ParsedCoin>,
    /// Explicit gas limit, used together with --fee
    #[clap(long, requires = "fee")]
    gas: Option<u64>,
}

impl FeeOpt {
    fn into_fee(self) -> Fee {
        match (self.fee, self.gas) {
            (Some(fee), Some(gas)) => Fee::Explicit(StdFee {
                amount: vec![fee.into()],
                gas,
            }),
            _ => Fee::Auto,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cmd = Cmd::parse();
    cmd.opt.init_logger();

    cmd.subcommand.go(cmd.opt).await
}

#[derive(clap::Parser)]
enum Subcommand {
    /// Run the full query, inspect, sign and broadcast flow
    Walkthrough {
        #[clap(flatten)]
        opt: walkthrough::Opt,
    },
    /// Show chain ID, node version and height
    ChainInfo {},
    /// Print balances
    PrintBalances {
        /// Address on the chain
        address: Address,
    },
    /// Show transaction details
    ShowTx {
        txhash: String,
        /// Pretty-print the JSON raw log
        #[clap(long)]
        pretty: bool,
    },
    /// Print the address of a secret file
    PrintAddress {
        #[clap(flatten)]
        secret: SecretOpt,
    },
    /// Generate wallet
    GenWallet {
        /// Human readable part of the printed address
        #[clap(long, default_value_t = AddressHrp::COSMOS)]
        hrp: AddressHrp,
        /// Also write the mnemonic to this file
        #[clap(long)]
        output: Option<PathBuf>,
    },
    /// Send coins to the given address
    SendCoins {
        #[clap(flatten)]
        secret: SecretOpt,
        #[clap(flatten)]
        fee: FeeOpt,
        /// Memo to put on transaction
        #[clap(long)]
        memo: Option<String>,
        /// Destination address
        dest: Address,
        /// Coins to send
        coins: Vec<ParsedCoin>,
    },
    /// Delegate to a validator
    Delegate {
        #[clap(flatten)]
        secret: SecretOpt,
        #[clap(flatten)]
        fee: FeeOpt,
        /// Validator operator address, e.g. cosmosvaloper1...
        validator: String,
        /// Amount to delegate
        amount: ParsedCoin,
    },
    /// Generate bash shell completion script
    GenerateShellCompletions {
        /// Which shell to generate for
        #[clap(default_value_t = clap_complete::Shell::Bash)]
        shell: clap_complete::Shell,
    },
}

impl Subcommand {
    pub(crate) async fn go(self, opt: Opt) -> Result<()> {
        let network = opt.network_opt.network;
        match self {
            Subcommand::Walkthrough { opt: walkthrough } => {
                let cosmos = opt.network_opt.build().await?;
                walkthrough::go(walkthrough, cosmos, network).await?;
            }
            Subcommand::ChainInfo {} => {
                let cosmos = opt.network_opt.build().await?;
                let info = cosmos.node_info().await?;
                println!("Endpoint: {}", cosmos.get_endpoint());
                println!("Chain ID: {}", info.chain_id);
                println!("Node version: {}", info.version);
                println!("Height: {}", cosmos.get_height().await?);
            }
            Subcommand::PrintBalances { address } => {
                let cosmos = opt.network_opt.build().await?;
                let balances = cosmos.all_balances(address).await?;
                for coin in &balances {
                    println!("{}{}", coin.amount, coin.denom);
                }
                if balances.is_empty() {
                    println!("0");
                }
            }
            Subcommand::ShowTx { txhash, pretty } => {
                let cosmos = opt.network_opt.build().await?;
                let tx = cosmos
                    .get_transaction(&txhash)
                    .await?
                    .with_context(|| format!("Transaction {txhash} not found"))?;
                walkthrough::print_indexed_tx("Transaction", &tx);
                if pretty {
                    match serde_json::from_str::<serde_json::Value>(&tx.raw_log) {
                        Err(_) => println!("Raw log is not JSON: {}", tx.raw_log),
                        Ok(raw_log) => {
                            serde_json::to_writer_pretty(std::io::stdout(), &raw_log)?;
                            println!();
                        }
                    }
                } else {
                    println!("Raw log: {}", tx.raw_log);
                }
                let decoded = tx.decode()?;
                println!("Memo: {:?}", decoded.memo());
                println!("Fee: {}", PrettyCoins(decoded.fee()));
                println!("Gas limit: {}", decoded.gas_limit());
                for (idx, any) in decoded.raw_messages().iter().enumerate() {
                    match DecodedMessage::decode(any) {
                        Ok(msg) => {
                            println!("Message #{idx}: {msg}, signed by {}", msg.signer())
                        }
                        Err(_) => println!("Message #{idx}: {} (not decoded)", any.type_url),
                    }
                }
                if let Some(spender) = tx.spender() {
                    println!("Spender: {spender}");
                }
            }
            Subcommand::PrintAddress { secret } => {
                let hrp = opt.network_opt.builder().hrp();
                println!("{}", secret.load(network, hrp)?);
            }
            Subcommand::GenWallet { hrp, output } => gen_wallet(hrp, output)?,
            Subcommand::SendCoins {
                secret,
                fee,
                memo,
                dest,
                coins,
            } => {
                anyhow::ensure!(!coins.is_empty(), "No coins to send");
                let cosmos = opt.network_opt.build().await?;
                let wallet = secret.load(network, cosmos.get_hrp())?;
                let mut txbuilder = TxBuilder::default();
                txbuilder
                    .add_message(MsgSend {
                        from_address: wallet.get_address_string(),
                        to_address: dest.get_address_string(),
                        amount: coins.into_iter().map(|x| x.into()).collect(),
                    })
                    .set_optional_memo(memo);
                let txres = txbuilder
                    .sign_and_broadcast(&cosmos, &wallet, fee.into_fee())
                    .await?;
                println!("{}", txres.hash);
            }
            Subcommand::Delegate {
                secret,
                fee,
                validator,
                amount,
            } => {
                let cosmos = opt.network_opt.build().await?;
                let wallet = secret.load(network, cosmos.get_hrp())?;
                let validator = walkthrough::parse_validator(&validator, cosmos.get_hrp())?;
                tracing::info!(
                    "Delegating {}{} to {validator}",
                    amount.amount(),
                    amount.denom()
                );
                let mut txbuilder = TxBuilder::default();
                txbuilder.add_message(MsgDelegate {
                    delegator_address: wallet.get_address_string(),
                    validator_address: validator.get_address_string(),
                    amount: Some(amount.into()),
                });
                let txres = txbuilder
                    .sign_and_broadcast(&cosmos, &wallet, fee.into_fee())
                    .await?;
                println!("{}", txres.hash);
            }
            Subcommand::GenerateShellCompletions { shell } => {
                clap_complete::generate(
                    shell,
                    &mut Cmd::command(),
                    "stargate",
                    &mut std::io::stdout(),
                );
            }
        }

        Ok(())
    }
}

fn gen_wallet(hrp: AddressHrp, output: Option<PathBuf>) -> Result<()> {
    let phrase = Wallet::generate_phrase();
    let wallet = Wallet::from_phrase(&phrase, hrp)?;
    println!("Mnemonic: {phrase}");
    println!("Address: {}", wallet.address());
    if let Some(output) = output {
        fs_err::write(&output, format!("{phrase}\n"))?;
        println!("Mnemonic written to {}", output.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_consistent() {
        Cmd::command().debug_assert();
    }

    #[test]
    fn explicit_fee_needs_gas() {
        Cmd::try_parse_from([
            "stargate",
            "delegate",
            "--fee",
            "1000stake",
            "cosmosvaloper178h4s6at5v9cd8m9n7ew3hg7k9eh0s6wptxpcn",
            "5stake",
        ])
        .map(|_| ())
        .unwrap_err();
        let cmd = Cmd::try_parse_from([
            "stargate",
            "send-coins",
            "--fee",
            "1000stake",
            "--gas",
            "200000",
            "cosmos1ymcwj2xk0k786phq90vg20s5uupxwr55fzgl77",
            "100000stake",
        ])
        .unwrap();
        match cmd.subcommand {
            Subcommand::SendCoins { fee, .. } => assert_eq!(
                fee.into_fee(),
                Fee::Explicit(StdFee {
                    amount: vec![stargate::coin::coin(1000, "stake")],
                    gas: 200000
                })
            ),
            _ => panic!("Wrong subcommand"),
        }
    }
}
