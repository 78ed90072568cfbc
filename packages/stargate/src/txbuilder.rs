use std::fmt::Display;

use cosmos_sdk_proto::{
    cosmos::{
        bank::v1beta1::MsgSend,
        base::v1beta1::Coin,
        crypto::secp256k1::PubKey,
        tx::{
            signing::v1beta1::SignMode,
            v1beta1::{
                mode_info::{Single, Sum},
                AuthInfo, Fee as ProtoFee, ModeInfo, SignDoc, SignerInfo, Tx, TxBody,
            },
        },
    },
    traits::Message,
    Any,
};

use crate::{
    error::{Action, RejectionStage},
    tx::{tx_hash, IndexedTx},
    Cosmos, Error, HasAddress, Result, TxMessage, Wallet,
};

const SECP256K1_PUBKEY_TYPE_URL: &str = "/cosmos.crypto.secp256k1.PubKey";

/// A fully specified fee: the amount paid and the gas limit.
#[derive(Clone, Debug, PartialEq)]
pub struct StdFee {
    pub amount: Vec<Coin>,
    pub gas: u64,
}

/// How to determine the fee of a transaction.
#[derive(Clone, Debug, PartialEq)]
pub enum Fee {
    /// Use exactly this fee and gas limit, no simulation.
    Explicit(StdFee),
    /// Simulate and pad the gas used by the configured multiplier.
    Auto,
    /// Simulate and pad the gas used by the given multiplier.
    AutoWithMultiplier(f64),
}

/// Transaction builder
///
/// This is the core interface for producing, simulating, and broadcasting transactions.
#[derive(Default, Clone, Debug)]
pub struct TxBuilder {
    messages: Vec<TxMessage>,
    memo: Option<String>,
    skip_code_check: bool,
}

impl Display for TxBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for (idx, msg) in self.messages.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{}: {}", msg.type_url(), msg.description())?;
        }
        if let Some(memo) = &self.memo {
            if !self.messages.is_empty() {
                writeln!(f)?;
            }
            write!(f, "memo: {memo}")?;
        }
        Ok(())
    }
}

impl TxBuilder {
    /// Add a message to this transaction. Messages execute in insertion order.
    pub fn add_message(&mut self, msg: impl Into<TxMessage>) -> &mut Self {
        self.messages.push(msg.into());
        self
    }

    /// Set the memo field.
    pub fn set_memo(&mut self, memo: impl Into<String>) -> &mut Self {
        self.memo = Some(memo.into());
        self
    }

    /// Either set or clear the memo field.
    pub fn set_optional_memo(&mut self, memo: impl Into<Option<String>>) -> &mut Self {
        self.memo = memo.into();
        self
    }

    /// When calling [TxBuilder::sign_and_broadcast], skip the check of whether the code is 0
    pub fn set_skip_code_check(&mut self, skip_code_check: bool) -> &mut Self {
        self.skip_code_check = skip_code_check;
        self
    }

    pub fn messages(&self) -> &[TxMessage] {
        &self.messages
    }

    /// Make a [TxBody] for this builder
    fn make_tx_body(&self) -> TxBody {
        TxBody {
            messages: self
                .messages
                .iter()
                .cloned()
                .map(|msg| msg.into_protobuf().0)
                .collect(),
            memo: self.memo.as_deref().unwrap_or_default().to_owned(),
            ..Default::default()
        }
    }

    /// Simulate the transaction, returning the gas used.
    pub async fn simulate(&self, cosmos: &Cosmos, wallet: &Wallet) -> Result<u64> {
        let sequence = match cosmos.get_base_account(wallet.get_address_string()).await {
            Ok(account) => account.sequence,
            Err(Error::AccountNotFound { .. }) => {
                tracing::warn!("Simulating with a non-existent wallet. Setting sequence number to 0");
                0
            }
            Err(e) => return Err(e),
        };

        // Simulate with no signature and no fee
        let simulate_tx = Tx {
            body: Some(self.make_tx_body()),
            auth_info: Some(make_auth_info(wallet, sequence, vec![], 0)),
            signatures: vec![vec![]],
        };
        let res = cosmos.simulate(simulate_tx.encode_to_vec()).await;
        if let Err(Error::QueryFailed { log, .. }) = &res {
            if let Some(expected) = get_expected_sequence(log) {
                tracing::warn!(
                    "Account sequence mismatch while simulating, node expects {expected}"
                );
            }
        }
        res
    }

    /// Sign transaction, broadcast, wait for it to be included, confirm that it was successful
    pub async fn sign_and_broadcast(
        &self,
        cosmos: &Cosmos,
        wallet: &Wallet,
        fee: Fee,
    ) -> Result<IndexedTx> {
        let fee = match fee {
            Fee::Explicit(fee) => fee,
            Fee::Auto => {
                self.auto_fee(cosmos, wallet, cosmos.get_builder().gas_estimate_multiplier())
                    .await?
            }
            Fee::AutoWithMultiplier(multiplier) => {
                self.auto_fee(cosmos, wallet, multiplier).await?
            }
        };

        let base_account = cosmos
            .get_base_account(wallet.get_address_string())
            .await?;
        let chain_id = cosmos.get_chain_id().await?;
        let tx = sign_tx(
            wallet,
            &chain_id,
            base_account.account_number,
            base_account.sequence,
            self.make_tx_body(),
            fee,
        );

        let tx_bytes = tx.encode_to_vec();
        let local_hash = tx_hash(&tx_bytes);
        let res = cosmos.broadcast_tx_sync(tx_bytes).await?;
        check_broadcast_hash(&local_hash, &res.txhash)?;
        if !self.skip_code_check && res.code != 0 {
            return Err(Error::TransactionRejected {
                expected_sequence: get_expected_sequence(&res.raw_log),
                txhash: res.txhash,
                stage: RejectionStage::CheckTx,
                code: res.code,
                codespace: res.codespace,
                raw_log: res.raw_log,
            });
        }
        tracing::info!("Broadcast transaction {}", res.txhash);

        let res = cosmos.wait_for_transaction(&res.txhash).await?;
        if !self.skip_code_check && res.code != 0 {
            return Err(Error::TransactionRejected {
                expected_sequence: get_expected_sequence(&res.raw_log),
                txhash: res.hash,
                stage: RejectionStage::Delivery,
                code: res.code,
                codespace: res.codespace,
                raw_log: res.raw_log,
            });
        }
        tracing::info!(
            "Transaction {} included at height {}, gas used {}/{}",
            res.hash,
            res.height,
            res.gas_used,
            res.gas_wanted
        );

        Ok(res)
    }

    async fn auto_fee(&self, cosmos: &Cosmos, wallet: &Wallet, multiplier: f64) -> Result<StdFee> {
        let gas_price = cosmos
            .get_builder()
            .gas_price()
            .ok_or(Error::MissingGasPrice)?;
        let gas_used = self.simulate(cosmos, wallet).await?;
        let gas = estimated_gas_limit(gas_used, multiplier);
        tracing::debug!("Simulation used {gas_used} gas, requesting {gas}");
        Ok(StdFee {
            amount: vec![gas_price.fee_for(gas)],
            gas,
        })
    }
}

/// Pad the simulated gas, truncating toward zero.
fn estimated_gas_limit(gas_used: u64, multiplier: f64) -> u64 {
    (gas_used as f64 * multiplier) as u64
}

fn make_signer_infos(wallet: &Wallet, sequence: u64) -> Vec<SignerInfo> {
    vec![SignerInfo {
        public_key: Some(Any {
            type_url: SECP256K1_PUBKEY_TYPE_URL.to_owned(),
            value: PubKey {
                key: wallet.public_key_bytes().to_owned(),
            }
            .encode_to_vec(),
        }),
        mode_info: Some(ModeInfo {
            sum: Some(Sum::Single(Single {
                mode: SignMode::Direct as i32,
            })),
        }),
        sequence,
    }]
}

fn make_auth_info(wallet: &Wallet, sequence: u64, amount: Vec<Coin>, gas_limit: u64) -> AuthInfo {
    AuthInfo {
        signer_infos: make_signer_infos(wallet, sequence),
        fee: Some(ProtoFee {
            amount,
            gas_limit,
            payer: "".to_owned(),
            granter: "".to_owned(),
        }),
        ..Default::default()
    }
}

/// Produce a SIGN_MODE_DIRECT signed transaction.
fn sign_tx(
    wallet: &Wallet,
    chain_id: &str,
    account_number: u64,
    sequence: u64,
    body: TxBody,
    fee: StdFee,
) -> Tx {
    let auth_info = make_auth_info(wallet, sequence, fee.amount, fee.gas);
    let sign_doc = SignDoc {
        body_bytes: body.encode_to_vec(),
        auth_info_bytes: auth_info.encode_to_vec(),
        chain_id: chain_id.to_owned(),
        account_number,
    };
    let signature = wallet.sign_bytes(&sign_doc.encode_to_vec());
    Tx {
        body: Some(body),
        auth_info: Some(auth_info),
        signatures: vec![signature.serialize_compact().to_vec()],
    }
}

impl Wallet {
    /// Send coins to another account in a single `MsgSend`.
    pub async fn send_tokens(
        &self,
        cosmos: &Cosmos,
        recipient: impl HasAddress,
        amount: Vec<Coin>,
        fee: Fee,
    ) -> Result<IndexedTx> {
        let mut txbuilder = TxBuilder::default();
        txbuilder.add_message(MsgSend {
            from_address: self.get_address_string(),
            to_address: recipient.get_address_string(),
            amount,
        });
        txbuilder.sign_and_broadcast(cosmos, self, fee).await
    }
}

/// The node must report the hash of the bytes we sent.
fn check_broadcast_hash(expected: &str, reported: &str) -> Result<()> {
    if reported.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(Error::InvalidResponse {
            action: Action::Broadcast,
            message: format!("Node reported transaction hash {reported}, expected {expected}"),
        })
    }
}

/// Returned the expected account sequence mismatch based on an error message, if present
fn get_expected_sequence(message: &str) -> Option<u64> {
    for line in message.lines() {
        if let Some(x) = get_expected_sequence_single(line) {
            return Some(x);
        }
    }
    None
}

fn get_expected_sequence_single(message: &str) -> Option<u64> {
    let s = message.strip_prefix("account sequence mismatch, expected ")?;
    let comma = s.find(',')?;
    s[..comma].parse().ok()
}
