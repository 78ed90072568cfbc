mod grpc;
mod node;
mod query;
mod rpc;

use std::{fmt::Display, str::FromStr, sync::Arc};

use cosmos_sdk_proto::{
    cosmos::{
        auth::v1beta1::{BaseAccount, QueryAccountRequest},
        bank::v1beta1::QueryAllBalancesRequest,
        base::{query::v1beta1::PageRequest, v1beta1::Coin},
        tx::v1beta1::SimulateRequest,
    },
    traits::Message,
};

use crate::{
    error::Action,
    tx::{normalize_tx_hash, IndexedTx},
    AddressHrp, CosmosBuilder, Error, Result,
};

use self::node::Node;

const BASE_ACCOUNT_TYPE_URL: &str = "/cosmos.auth.v1beta1.BaseAccount";

/// Protocol used to talk to a node.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum Transport {
    /// Tendermint JSON-RPC, usually port 26657
    Rpc,
    /// Cosmos SDK gRPC, usually port 9090
    Grpc,
}

impl Transport {
    fn as_str(self) -> &'static str {
        match self {
            Transport::Rpc => "rpc",
            Transport::Grpc => "grpc",
        }
    }
}

impl Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Transport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rpc" | "tendermint" => Ok(Transport::Rpc),
            "grpc" => Ok(Transport::Grpc),
            _ => Err(format!("Unknown transport {s:?}, expected rpc or grpc")),
        }
    }
}

/// Identity reported by the node we're connected to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeInfo {
    pub chain_id: String,
    /// Tendermint/CometBFT version, e.g. `0.34.24`
    pub version: String,
}

impl NodeInfo {
    /// Tendermint 0.34 base64 encodes event attribute keys and values in RPC responses.
    pub(crate) fn base64_event_attributes(&self) -> bool {
        self.version.starts_with("0.34")
    }
}

/// Result of submitting a transaction to the mempool.
#[derive(Clone, Debug)]
pub struct BroadcastResult {
    pub txhash: String,
    /// Result of CheckTx, 0 means accepted
    pub code: u32,
    pub codespace: String,
    pub raw_log: String,
}

/// A connection to a Cosmos SDK node.
#[derive(Clone)]
pub struct Cosmos {
    builder: Arc<CosmosBuilder>,
    node: Arc<Node>,
}

impl std::fmt::Debug for Cosmos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cosmos")
            .field("endpoint", self.node.endpoint())
            .field("transport", &self.builder.transport())
            .finish()
    }
}

impl CosmosBuilder {
    /// Connect and confirm the node answers before returning.
    pub async fn build(self) -> Result<Cosmos> {
        let node = Node::connect(&self, false).await?;
        let cosmos = Cosmos {
            builder: Arc::new(self),
            node: Arc::new(node),
        };
        // Force strict connection
        cosmos.sanity_check().await?;
        Ok(cosmos)
    }

    /// Create the client without contacting the node.
    pub async fn build_lazy(self) -> Result<Cosmos> {
        let node = Node::connect(&self, true).await?;
        Ok(Cosmos {
            builder: Arc::new(self),
            node: Arc::new(node),
        })
    }
}

impl Cosmos {
    pub fn get_builder(&self) -> &Arc<CosmosBuilder> {
        &self.builder
    }

    pub fn get_endpoint(&self) -> &str {
        self.node.endpoint()
    }

    pub fn get_hrp(&self) -> AddressHrp {
        self.builder.hrp()
    }

    pub fn get_gas_coin(&self) -> &str {
        self.builder.gas_coin()
    }

    pub async fn sanity_check(&self) -> Result<()> {
        self.node_info().await.map(|_| ())
    }

    /// Chain ID and node version, fetched once and cached.
    pub async fn node_info(&self) -> Result<&NodeInfo> {
        self.node.node_info().await
    }

    pub async fn get_chain_id(&self) -> Result<String> {
        Ok(self.node_info().await?.chain_id.clone())
    }

    /// Height of the latest committed block.
    pub async fn get_height(&self) -> Result<i64> {
        self.node.latest_height().await
    }

    /// All balances held by an address. An address with no holdings gives an empty list.
    pub async fn all_balances(&self, address: impl Into<String>) -> Result<Vec<Coin>> {
        let address = address.into();
        let mut coins = Vec::new();
        let mut pagination = None;
        loop {
            let mut res = self
                .node
                .query(QueryAllBalancesRequest {
                    address: address.clone(),
                    pagination: pagination.take(),
                    ..Default::default()
                })
                .await?;
            coins.append(&mut res.balances);
            match res.pagination {
                Some(x) if !x.next_key.is_empty() => {
                    pagination = Some(PageRequest {
                        key: x.next_key,
                        ..Default::default()
                    })
                }
                _ => break Ok(coins),
            }
        }
    }

    /// Look up a transaction by hash. `None` if the node doesn't know it.
    pub async fn get_transaction(&self, txhash: impl AsRef<str>) -> Result<Option<IndexedTx>> {
        let txhash = normalize_tx_hash(txhash.as_ref())?;
        self.node.tx(&txhash).await
    }

    /// Account number and sequence for a signer.
    pub async fn get_base_account(&self, address: impl Into<String>) -> Result<BaseAccount> {
        let address = address.into();
        let res = match self
            .node
            .query(QueryAccountRequest {
                address: address.clone(),
            })
            .await
        {
            Ok(res) => res,
            Err(Error::QueryFailed { log, .. }) if log.contains("not found") => {
                return Err(Error::AccountNotFound { address })
            }
            Err(Error::Grpc { source, .. }) if source.code() == tonic::Code::NotFound => {
                return Err(Error::AccountNotFound { address })
            }
            Err(e) => return Err(e),
        };
        let account = res.account.ok_or_else(|| Error::AccountNotFound {
            address: address.clone(),
        })?;
        if account.type_url != BASE_ACCOUNT_TYPE_URL {
            return Err(Error::UnknownTypeUrl {
                type_url: account.type_url,
            });
        }
        BaseAccount::decode(account.value.as_slice())
            .map_err(|source| Error::decode(BASE_ACCOUNT_TYPE_URL, source))
    }

    /// Simulate a transaction, returning the gas used.
    pub async fn simulate(&self, tx_bytes: Vec<u8>) -> Result<u64> {
        #[allow(deprecated)]
        let res = self
            .node
            .query(SimulateRequest {
                tx: None,
                tx_bytes,
            })
            .await?;
        res.gas_info
            .map(|gas_info| gas_info.gas_used)
            .ok_or_else(|| Error::InvalidResponse {
                action: Action::Simulate,
                message: "Missing gas_info in SimulateResponse".to_owned(),
            })
    }

    /// Submit a signed transaction and wait for the CheckTx result only.
    pub async fn broadcast_tx_sync(&self, tx_bytes: Vec<u8>) -> Result<BroadcastResult> {
        let res = self.node.broadcast_tx_sync(tx_bytes).await?;
        tracing::debug!("Initial broadcast response: {res:?}");
        Ok(res)
    }

    /// Poll until a broadcast transaction is included in a block.
    pub async fn wait_for_transaction(&self, txhash: impl AsRef<str>) -> Result<IndexedTx> {
        let txhash = normalize_tx_hash(txhash.as_ref())?;
        let attempts = self.builder.transaction_attempts();
        for attempt in 1..=attempts {
            match self.node.tx(&txhash).await? {
                Some(tx) => return Ok(tx),
                None => {
                    tracing::debug!("Transaction {txhash} not ready, attempt #{attempt}/{attempts}");
                    tokio::time::sleep(self.builder.poll_interval()).await;
                }
            }
        }
        Err(Error::TransactionNotIncluded { txhash, attempts })
    }
}
