//! Cosmos gRPC transport.

use std::sync::Arc;

use cosmos_sdk_proto::{
    cosmos::{
        auth::v1beta1::query_client::QueryClient as AuthQueryClient,
        bank::v1beta1::query_client::QueryClient as BankQueryClient,
        base::tendermint::v1beta1::{
            service_client::ServiceClient as TendermintClient, GetLatestBlockRequest,
            GetNodeInfoRequest,
        },
        tx::v1beta1::{
            service_client::ServiceClient as TxServiceClient, BroadcastMode, BroadcastTxRequest,
            GetTxRequest,
        },
    },
    traits::Message,
};
use tonic::transport::{Channel, ClientTlsConfig, Endpoint};

use crate::{
    error::Action,
    tx::{EventAttribute, IndexedTx, TxEvent},
    Error, Result,
};

use super::{BroadcastResult, NodeInfo, Transport};

pub(crate) struct GrpcClient {
    endpoint: Arc<String>,
    channel: Channel,
}

impl GrpcClient {
    fn make_endpoint(endpoint: &Arc<String>) -> Result<Endpoint> {
        let invalid = |message: String| Error::InvalidEndpoint {
            endpoint: endpoint.clone(),
            transport: Transport::Grpc,
            message,
        };
        let grpc_endpoint = Endpoint::from_shared(endpoint.to_string())
            .map_err(|e| invalid(e.to_string()))?;
        if endpoint.starts_with("https://") {
            grpc_endpoint
                .tls_config(ClientTlsConfig::new())
                .map_err(|e| invalid(format!("Unable to configure TLS: {e}")))
        } else {
            Ok(grpc_endpoint)
        }
    }

    pub(crate) async fn connect(endpoint: Arc<String>) -> Result<Self> {
        let channel = Self::make_endpoint(&endpoint)?
            .connect()
            .await
            .map_err(|source| Error::GrpcConnect {
                endpoint: endpoint.clone(),
                source,
            })?;
        Ok(GrpcClient { endpoint, channel })
    }

    pub(crate) fn connect_lazy(endpoint: Arc<String>) -> Result<Self> {
        let channel = Self::make_endpoint(&endpoint)?.connect_lazy();
        Ok(GrpcClient { endpoint, channel })
    }

    pub(crate) fn grpc_error(&self, action: Action, source: tonic::Status) -> Error {
        Error::Grpc {
            endpoint: self.endpoint.clone(),
            action,
            source,
        }
    }

    pub(crate) fn auth_query_client(&self) -> AuthQueryClient<Channel> {
        AuthQueryClient::new(self.channel.clone())
    }

    pub(crate) fn bank_query_client(&self) -> BankQueryClient<Channel> {
        BankQueryClient::new(self.channel.clone())
    }

    pub(crate) fn tx_service_client(&self) -> TxServiceClient<Channel> {
        TxServiceClient::new(self.channel.clone())
    }

    fn tendermint_client(&self) -> TendermintClient<Channel> {
        TendermintClient::new(self.channel.clone())
    }

    pub(crate) async fn node_info(&self) -> Result<NodeInfo> {
        let res = self
            .tendermint_client()
            .get_node_info(GetNodeInfoRequest {})
            .await
            .map_err(|source| self.grpc_error(Action::NodeStatus, source))?
            .into_inner();
        let info = res.default_node_info.ok_or_else(|| Error::InvalidResponse {
            action: Action::NodeStatus,
            message: "Missing default_node_info".to_owned(),
        })?;
        Ok(NodeInfo {
            chain_id: info.network,
            version: info.version,
        })
    }

    pub(crate) async fn latest_height(&self) -> Result<i64> {
        let res = self
            .tendermint_client()
            .get_latest_block(GetLatestBlockRequest {})
            .await
            .map_err(|source| self.grpc_error(Action::NodeStatus, source))?
            .into_inner();
        res.block
            .and_then(|block| block.header)
            .map(|header| header.height)
            .ok_or_else(|| Error::InvalidResponse {
                action: Action::NodeStatus,
                message: "Latest block is missing its header".to_owned(),
            })
    }

    pub(crate) async fn tx(&self, txhash: &str) -> Result<Option<IndexedTx>> {
        let action = Action::GetTx(txhash.to_owned());
        let res = match self
            .tx_service_client()
            .get_tx(GetTxRequest {
                hash: txhash.to_owned(),
            })
            .await
        {
            Ok(res) => res.into_inner(),
            // Some nodes report a missing transaction without the NotFound code
            Err(e) if e.code() == tonic::Code::NotFound || e.message().contains("not found") => {
                tracing::debug!("Transaction {txhash} not found");
                return Ok(None);
            }
            Err(source) => return Err(self.grpc_error(action, source)),
        };
        let txres = res.tx_response.ok_or_else(|| Error::InvalidResponse {
            action: action.clone(),
            message: "Missing tx_response".to_owned(),
        })?;
        let tx = match (txres.tx, res.tx) {
            (Some(any), _) => any.value,
            (None, Some(tx)) => tx.encode_to_vec(),
            (None, None) => {
                return Err(Error::InvalidResponse {
                    action,
                    message: "Response contains no transaction".to_owned(),
                })
            }
        };
        let events = txres
            .events
            .into_iter()
            .map(|event| TxEvent {
                kind: event.r#type,
                attributes: event
                    .attributes
                    .into_iter()
                    .map(|attr| EventAttribute {
                        key: String::from_utf8_lossy(AsRef::<[u8]>::as_ref(&attr.key))
                            .into_owned(),
                        value: String::from_utf8_lossy(AsRef::<[u8]>::as_ref(&attr.value))
                            .into_owned(),
                    })
                    .collect(),
            })
            .collect();
        Ok(Some(IndexedTx {
            height: txres.height,
            hash: txres.txhash,
            code: txres.code,
            codespace: txres.codespace,
            raw_log: txres.raw_log,
            events,
            gas_wanted: txres.gas_wanted,
            gas_used: txres.gas_used,
            tx,
        }))
    }

    pub(crate) async fn broadcast_tx_sync(&self, tx_bytes: Vec<u8>) -> Result<BroadcastResult> {
        let res = self
            .tx_service_client()
            .broadcast_tx(BroadcastTxRequest {
                tx_bytes,
                mode: BroadcastMode::Sync as i32,
            })
            .await
            .map_err(|source| self.grpc_error(Action::Broadcast, source))?
            .into_inner()
            .tx_response
            .ok_or_else(|| Error::InvalidResponse {
                action: Action::Broadcast,
                message: "Missing inner tx_response".to_owned(),
            })?;
        Ok(BroadcastResult {
            txhash: res.txhash,
            code: res.code,
            codespace: res.codespace,
            raw_log: res.raw_log,
        })
    }
}
