use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::{tx::IndexedTx, CosmosBuilder, Result};

use super::{grpc::GrpcClient, query::QueryRequest, rpc::RpcClient, BroadcastResult, NodeInfo, Transport};

/// Connection to a single node over either transport.
pub(crate) struct Node {
    endpoint: Arc<String>,
    client: NodeClient,
    node_info: OnceCell<NodeInfo>,
}

enum NodeClient {
    Rpc(RpcClient),
    Grpc(GrpcClient),
}

impl Node {
    pub(crate) async fn connect(builder: &CosmosBuilder, lazy: bool) -> Result<Node> {
        let endpoint = Arc::new(builder.endpoint());
        let client = match builder.transport() {
            Transport::Rpc => NodeClient::Rpc(RpcClient::new(endpoint.clone())?),
            Transport::Grpc if lazy => {
                NodeClient::Grpc(GrpcClient::connect_lazy(endpoint.clone())?)
            }
            Transport::Grpc => NodeClient::Grpc(GrpcClient::connect(endpoint.clone()).await?),
        };
        Ok(Node {
            endpoint,
            client,
            node_info: OnceCell::new(),
        })
    }

    pub(crate) fn endpoint(&self) -> &Arc<String> {
        &self.endpoint
    }

    pub(crate) async fn query<Req: QueryRequest>(&self, req: Req) -> Result<Req::Response> {
        match &self.client {
            NodeClient::Rpc(rpc) => {
                let action = req.action();
                rpc.abci_query(Req::ABCI_PATH, req, action).await
            }
            NodeClient::Grpc(grpc) => {
                let action = req.action();
                req.perform_grpc(grpc)
                    .await
                    .map(tonic::Response::into_inner)
                    .map_err(|source| grpc.grpc_error(action, source))
            }
        }
    }

    /// Chain ID and node version. Fetched once per node.
    pub(crate) async fn node_info(&self) -> Result<&NodeInfo> {
        self.node_info
            .get_or_try_init(|| async {
                let info = match &self.client {
                    NodeClient::Rpc(rpc) => rpc.status().await?.0,
                    NodeClient::Grpc(grpc) => grpc.node_info().await?,
                };
                tracing::debug!(
                    "Connected to {} running {} on chain {}",
                    self.endpoint,
                    info.version,
                    info.chain_id
                );
                Ok(info)
            })
            .await
    }

    pub(crate) async fn latest_height(&self) -> Result<i64> {
        match &self.client {
            NodeClient::Rpc(rpc) => {
                let (info, height) = rpc.status().await?;
                // Fails only when already cached
                let _ = self.node_info.set(info);
                Ok(height)
            }
            NodeClient::Grpc(grpc) => grpc.latest_height().await,
        }
    }

    /// Look up a transaction by validated uppercase hex hash.
    pub(crate) async fn tx(&self, txhash: &str) -> Result<Option<IndexedTx>> {
        match &self.client {
            NodeClient::Rpc(rpc) => {
                let base64_attributes = self.node_info().await?.base64_event_attributes();
                rpc.tx(txhash, base64_attributes).await
            }
            NodeClient::Grpc(grpc) => grpc.tx(txhash).await,
        }
    }

    pub(crate) async fn broadcast_tx_sync(&self, tx_bytes: Vec<u8>) -> Result<BroadcastResult> {
        match &self.client {
            NodeClient::Rpc(rpc) => rpc.broadcast_tx_sync(&tx_bytes).await,
            NodeClient::Grpc(grpc) => grpc.broadcast_tx_sync(tx_bytes).await,
        }
    }
}
