//! Error types exposed by this package.

use std::{fmt::Display, path::PathBuf, sync::Arc};

use crate::{client::Transport, AddressHrp};

/// Errors that can occur while parsing or building an [crate::Address].
#[derive(thiserror::Error, Debug, Clone)]
pub enum AddressError {
    #[error("Invalid bech32 encoding in {address:?}: {source}")]
    InvalidBech32 {
        address: String,
        source: bech32::Error,
    },
    #[error("Address {address:?} uses Bech32m, only Bech32 is supported")]
    InvalidVariant { address: String },
    #[error("Address {address:?} decodes to {actual} bytes, expected 20 or 32")]
    InvalidByteCount { address: String, actual: usize },
    #[error("Invalid human readable part (HRP) {hrp:?}")]
    InvalidHrp { hrp: String },
    #[error("Address {address} has prefix {actual}, expected {expected}")]
    WrongHrp {
        address: String,
        actual: AddressHrp,
        expected: AddressHrp,
    },
}

/// Errors while loading a signing identity from local secret material.
#[derive(thiserror::Error, Debug)]
pub enum WalletError {
    #[error("Unable to read secret file {}: {source}", path.display())]
    ReadSecret {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Private key is not valid hex: {source}")]
    InvalidHex { source: hex::FromHexError },
    #[error("Private key rejected by secp256k1: {source}")]
    InvalidPrivateKey {
        source: bitcoin::secp256k1::Error,
    },
    #[error("Unable to parse mnemonic phrase: {source}")]
    InvalidMnemonic { source: bip39::Error },
    #[error("Invalid derivation path {path:?}: {source}")]
    InvalidDerivationPath {
        path: String,
        source: bitcoin::util::bip32::Error,
    },
    #[error("Key derivation failed: {source}")]
    Derivation { source: bitcoin::util::bip32::Error },
    #[error("Secret file {} is empty", path.display())]
    EmptySecret { path: PathBuf },
}

/// Which step of a transaction's lifecycle produced a non-zero result code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectionStage {
    /// The node refused the transaction during CheckTx, nothing landed on chain.
    CheckTx,
    /// The transaction was included in a block but execution failed.
    Delivery,
}

impl Display for RejectionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            RejectionStage::CheckTx => "check-tx",
            RejectionStage::Delivery => "delivery",
        })
    }
}

/// The action being performed when a network error occurred.
#[derive(Clone, Debug)]
pub enum Action {
    NodeStatus,
    AllBalances(String),
    GetAccount(String),
    GetTx(String),
    Simulate,
    Broadcast,
}

impl Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::NodeStatus => f.write_str("node status"),
            Action::AllBalances(address) => write!(f, "query all balances for {address}"),
            Action::GetAccount(address) => write!(f, "query account {address}"),
            Action::GetTx(txhash) => write!(f, "get transaction {txhash}"),
            Action::Simulate => f.write_str("simulate transaction"),
            Action::Broadcast => f.write_str("broadcast transaction"),
        }
    }
}

/// General errors while interacting with the chain.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Invalid {transport} endpoint {endpoint}: {message}")]
    InvalidEndpoint {
        endpoint: Arc<String>,
        transport: Transport,
        message: String,
    },
    #[error("Network error talking to {endpoint} during {action}: {source}")]
    Rpc {
        endpoint: Arc<String>,
        action: Action,
        source: reqwest::Error,
    },
    #[error("JSON-RPC error from {endpoint} during {action}: code {code}, {message}{}", data.as_deref().map(|d| format!(" ({d})")).unwrap_or_default())]
    JsonRpc {
        endpoint: Arc<String>,
        action: Action,
        code: i64,
        message: String,
        data: Option<String>,
    },
    #[error("Unable to establish gRPC connection to {endpoint}: {source}")]
    GrpcConnect {
        endpoint: Arc<String>,
        source: tonic::transport::Error,
    },
    #[error("gRPC error from {endpoint} during {action}: {source}")]
    Grpc {
        endpoint: Arc<String>,
        action: Action,
        source: tonic::Status,
    },
    #[error("Query failed during {action} with code {code}: {log}")]
    QueryFailed {
        action: Action,
        code: u32,
        log: String,
    },
    #[error("Invalid response during {action}: {message}")]
    InvalidResponse { action: Action, message: String },
    #[error("Unable to decode {what}: {source}")]
    Decode {
        what: String,
        source: prost::DecodeError,
    },
    #[error("Unsupported message type URL {type_url}")]
    UnknownTypeUrl { type_url: String },
    #[error("Transaction envelope is missing its {field}")]
    MissingEnvelopeField { field: &'static str },
    #[error("Invalid transaction hash {hash:?}, expected 64 hex characters")]
    InvalidTxHash { hash: String },
    #[error("Invalid coin amount {amount:?} for denom {denom}")]
    InvalidCoinAmount { denom: String, amount: String },
    #[error("Invalid gas price {input:?}: {message}")]
    InvalidGasPrice { input: String, message: &'static str },
    #[error("Automatic fee estimation needs a gas price, none is configured")]
    MissingGasPrice,
    #[error("Account {address} does not exist on chain, send some tokens there before signing")]
    AccountNotFound { address: String },
    #[error("Transaction {txhash} failed during {stage} with code {code} (codespace {codespace:?}). Raw log: {raw_log}")]
    TransactionRejected {
        txhash: String,
        stage: RejectionStage,
        code: u32,
        codespace: String,
        raw_log: String,
        /// Populated when the chain reported an account sequence mismatch.
        expected_sequence: Option<u64>,
    },
    #[error("Transaction {txhash} was not included after {attempts} attempts")]
    TransactionNotIncluded { txhash: String, attempts: usize },
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error(transparent)]
    Wallet(#[from] WalletError),
}

impl Error {
    pub(crate) fn decode(what: impl Into<String>, source: prost::DecodeError) -> Self {
        Error::Decode {
            what: what.into(),
            source,
        }
    }
}
