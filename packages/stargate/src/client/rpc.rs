//! Tendermint JSON-RPC transport.

use std::{fmt::Display, str::FromStr, sync::Arc};

use base64::Engine;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};

use crate::{
    error::Action,
    tx::{EventAttribute, IndexedTx, TxEvent},
    Error, Result,
};

use super::{BroadcastResult, NodeInfo};

#[derive(Serialize)]
struct Request<'a, P> {
    jsonrpc: &'static str,
    method: &'a str,
    id: u64,
    params: P,
}

#[derive(Deserialize)]
struct Response<R> {
    result: Option<R>,
    error: Option<RpcError>,
}

#[derive(Deserialize)]
struct RpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<String>,
}

#[derive(Serialize)]
struct AbciQueryParams {
    path: String,
    data: String,
    prove: bool,
}

#[derive(Deserialize)]
struct AbciQueryResult {
    response: AbciQueryResponse,
}

#[derive(Deserialize)]
struct AbciQueryResponse {
    #[serde(default)]
    code: u32,
    #[serde(default)]
    log: String,
    #[serde(default)]
    value: Option<String>,
}

#[derive(Serialize)]
struct NoParams {}

#[derive(Deserialize)]
struct StatusResult {
    node_info: StatusNodeInfo,
    sync_info: SyncInfo,
}

#[derive(Deserialize)]
struct StatusNodeInfo {
    network: String,
    version: String,
}

#[derive(Deserialize)]
struct SyncInfo {
    #[serde(deserialize_with = "string_or_number")]
    latest_block_height: i64,
}

#[derive(Serialize)]
struct TxParams {
    hash: String,
    prove: bool,
}

#[derive(Deserialize)]
struct TxResult {
    hash: String,
    #[serde(deserialize_with = "string_or_number")]
    height: i64,
    tx_result: DeliverTx,
    tx: String,
}

#[derive(Deserialize)]
struct DeliverTx {
    #[serde(default)]
    code: u32,
    #[serde(default)]
    codespace: String,
    #[serde(default)]
    log: String,
    #[serde(default, deserialize_with = "string_or_number")]
    gas_wanted: i64,
    #[serde(default, deserialize_with = "string_or_number")]
    gas_used: i64,
    #[serde(default)]
    events: Vec<RpcEvent>,
}

#[derive(Deserialize)]
struct RpcEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    attributes: Vec<RpcEventAttribute>,
}

#[derive(Deserialize)]
struct RpcEventAttribute {
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    value: Option<String>,
}

#[derive(Serialize)]
struct BroadcastParams {
    tx: String,
}

#[derive(Deserialize)]
struct BroadcastTxSyncResult {
    #[serde(default)]
    code: u32,
    #[serde(default)]
    codespace: String,
    #[serde(default)]
    log: String,
    hash: String,
}

/// Tendermint encodes 64-bit integers as JSON strings.
fn string_or_number<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(serde_json::Number),
    }
    let s = match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s,
        StringOrNumber::Number(n) => n.to_string(),
    };
    s.parse().map_err(serde::de::Error::custom)
}

/// Outcome of a JSON-RPC call that reached the node.
enum CallError {
    /// The node answered with a JSON-RPC error object.
    Remote(RpcError),
    Other(Error),
}

impl From<Error> for CallError {
    fn from(e: Error) -> Self {
        CallError::Other(e)
    }
}

pub(crate) struct RpcClient {
    endpoint: Arc<String>,
    client: reqwest::Client,
}

impl RpcClient {
    pub(crate) fn new(endpoint: Arc<String>) -> Result<Self> {
        reqwest::Url::parse(&endpoint).map_err(|e| Error::InvalidEndpoint {
            endpoint: endpoint.clone(),
            transport: super::Transport::Rpc,
            message: e.to_string(),
        })?;
        Ok(RpcClient {
            endpoint,
            client: reqwest::Client::new(),
        })
    }

    async fn call<P, R>(&self, method: &str, params: P, action: &Action) -> Result<R, CallError>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let req = Request {
            jsonrpc: "2.0",
            method,
            id: rand::random(),
            params,
        };
        let rpc_err = |source| Error::Rpc {
            endpoint: self.endpoint.clone(),
            action: action.clone(),
            source,
        };

        tracing::debug!("JSON-RPC {method} to {}", self.endpoint);
        let raw_body = self
            .client
            .post(self.endpoint.as_str())
            .json(&req)
            .send()
            .await
            .map_err(rpc_err)?
            .text()
            .await
            .map_err(rpc_err)?;

        let res: Response<R> =
            serde_json::from_str(&raw_body).map_err(|e| Error::InvalidResponse {
                action: action.clone(),
                message: format!("Unable to parse JSON-RPC response ({e}): {raw_body}"),
            })?;
        match (res.result, res.error) {
            (_, Some(error)) => Err(CallError::Remote(error)),
            (Some(result), None) => Ok(result),
            (None, None) => Err(CallError::Other(Error::InvalidResponse {
                action: action.clone(),
                message: "JSON-RPC response has neither result nor error".to_owned(),
            })),
        }
    }

    fn remote_error(&self, action: Action, error: RpcError) -> Error {
        Error::JsonRpc {
            endpoint: self.endpoint.clone(),
            action,
            code: error.code,
            message: error.message,
            data: error.data,
        }
    }

    async fn call_simple<P, R>(&self, method: &str, params: P, action: Action) -> Result<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        match self.call(method, params, &action).await {
            Ok(res) => Ok(res),
            Err(CallError::Remote(error)) => Err(self.remote_error(action, error)),
            Err(CallError::Other(e)) => Err(e),
        }
    }

    pub(crate) async fn status(&self) -> Result<(NodeInfo, i64)> {
        let StatusResult {
            node_info,
            sync_info,
        } = self
            .call_simple("status", NoParams {}, Action::NodeStatus)
            .await?;
        Ok((
            NodeInfo {
                chain_id: node_info.network,
                version: node_info.version,
            },
            sync_info.latest_block_height,
        ))
    }

    /// Perform an ABCI query, protobuf encoding the request and decoding the response.
    pub(crate) async fn abci_query<Req, Res>(
        &self,
        path: &str,
        req: Req,
        action: Action,
    ) -> Result<Res>
    where
        Req: prost::Message,
        Res: prost::Message + Default,
    {
        let params = AbciQueryParams {
            path: path.to_owned(),
            data: hex::encode(req.encode_to_vec()),
            prove: false,
        };
        let AbciQueryResult { response } =
            self.call_simple("abci_query", params, action.clone()).await?;
        if response.code != 0 {
            return Err(Error::QueryFailed {
                action,
                code: response.code,
                log: response.log,
            });
        }
        let value = match response.value {
            None => vec![],
            Some(value) => base64::engine::general_purpose::STANDARD
                .decode(value)
                .map_err(|e| Error::InvalidResponse {
                    action: action.clone(),
                    message: format!("Invalid base64 in ABCI response: {e}"),
                })?,
        };
        Res::decode(value.as_slice()).map_err(|source| Error::decode(path, source))
    }

    /// Look up a committed transaction. `txhash` must already be validated hex.
    pub(crate) async fn tx(
        &self,
        txhash: &str,
        base64_attributes: bool,
    ) -> Result<Option<IndexedTx>> {
        let action = Action::GetTx(txhash.to_owned());
        let hash = hex::decode(txhash).map_err(|_| Error::InvalidTxHash {
            hash: txhash.to_owned(),
        })?;
        let params = TxParams {
            hash: base64::engine::general_purpose::STANDARD.encode(hash),
            prove: false,
        };
        let res: TxResult = match self.call("tx", params, &action).await {
            Ok(res) => res,
            Err(CallError::Remote(error)) if is_not_found(&error) => {
                tracing::debug!("Transaction {txhash} not found");
                return Ok(None);
            }
            Err(CallError::Remote(error)) => return Err(self.remote_error(action, error)),
            Err(CallError::Other(e)) => return Err(e),
        };
        let tx = base64::engine::general_purpose::STANDARD
            .decode(&res.tx)
            .map_err(|e| Error::InvalidResponse {
                action: action.clone(),
                message: format!("Invalid base64 transaction bytes: {e}"),
            })?;
        let events = res
            .tx_result
            .events
            .into_iter()
            .map(|event| convert_event(event, base64_attributes))
            .collect();
        Ok(Some(IndexedTx {
            height: res.height,
            hash: res.hash,
            code: res.tx_result.code,
            codespace: res.tx_result.codespace,
            raw_log: res.tx_result.log,
            events,
            gas_wanted: res.tx_result.gas_wanted,
            gas_used: res.tx_result.gas_used,
            tx,
        }))
    }

    pub(crate) async fn broadcast_tx_sync(&self, tx_bytes: &[u8]) -> Result<BroadcastResult> {
        let params = BroadcastParams {
            tx: base64::engine::general_purpose::STANDARD.encode(tx_bytes),
        };
        let res: BroadcastTxSyncResult = self
            .call_simple("broadcast_tx_sync", params, Action::Broadcast)
            .await?;
        Ok(BroadcastResult {
            txhash: res.hash,
            code: res.code,
            codespace: res.codespace,
            raw_log: res.log,
        })
    }
}

fn is_not_found(error: &RpcError) -> bool {
    error
        .data
        .as_deref()
        .map_or(false, |data| data.contains("not found"))
        || error.message.contains("not found")
}

fn convert_event(event: RpcEvent, base64_attributes: bool) -> TxEvent {
    let decode = |s: Option<String>| {
        let s = s.unwrap_or_default();
        if base64_attributes {
            base64::engine::general_purpose::STANDARD
                .decode(&s)
                .ok()
                .and_then(|bytes| String::from_utf8(bytes).ok())
                .unwrap_or(s)
        } else {
            s
        }
    };
    TxEvent {
        kind: event.kind,
        attributes: event
            .attributes
            .into_iter()
            .map(|attr| EventAttribute {
                key: decode(attr.key),
                value: decode(attr.value),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_status() {
        let raw = r#"{"jsonrpc":"2.0","id":1,"result":{"node_info":{"network":"theta-testnet-001","version":"0.34.24"},"sync_info":{"latest_block_height":"15829171","catching_up":false}}}"#;
        let res: Response<StatusResult> = serde_json::from_str(raw).unwrap();
        let status = res.result.unwrap();
        assert_eq!(status.node_info.network, "theta-testnet-001");
        assert_eq!(status.sync_info.latest_block_height, 15829171);
    }

    #[test]
    fn parse_not_found() {
        let raw = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32603,"message":"Internal error","data":"tx (9EDABB) not found"}}"#;
        let res: Response<TxResult> = serde_json::from_str(raw).unwrap();
        assert!(res.result.is_none());
        assert!(is_not_found(&res.error.unwrap()));
    }

    #[test]
    fn parse_tx_result() {
        let raw = r#"{"jsonrpc":"2.0","id":1,"result":{"hash":"AB","height":"42","index":0,"tx_result":{"code":0,"data":null,"log":"[]","gas_wanted":"200000","gas_used":"81234","events":[{"type":"Y29pbl9zcGVudA==","attributes":[{"key":"c3BlbmRlcg==","value":"Y29zbW9zMWFiYw==","index":true},{"key":"YW1vdW50","value":null}]}],"codespace":""},"tx":"CgA="}}"#;
        let res: Response<TxResult> = serde_json::from_str(raw).unwrap();
        let tx = res.result.unwrap();
        assert_eq!(tx.height, 42);
        assert_eq!(tx.tx_result.gas_used, 81234);
        let event = convert_event(tx.tx_result.events.into_iter().next().unwrap(), true);
        // Event types are never base64 encoded, only attributes
        assert_eq!(event.kind, "Y29pbl9zcGVudA==");
        assert_eq!(event.find_attribute("spender"), Some("cosmos1abc"));
        assert_eq!(event.find_attribute("amount"), Some(""));
    }

    #[test]
    fn plain_attributes_untouched() {
        let event = RpcEvent {
            kind: "coin_spent".to_owned(),
            attributes: vec![RpcEventAttribute {
                key: Some("spender".to_owned()),
                value: Some("cosmos1abc".to_owned()),
            }],
        };
        let event = convert_event(event, false);
        assert_eq!(event.find_attribute("spender"), Some("cosmos1abc"));
    }

    #[test]
    fn abci_empty_value() {
        let raw = r#"{"jsonrpc":"2.0","id":1,"result":{"response":{"code":0,"log":"","info":"","index":"0","key":null,"value":null,"proofOps":null,"height":"10","codespace":""}}}"#;
        let res: Response<AbciQueryResult> = serde_json::from_str(raw).unwrap();
        let response = res.result.unwrap().response;
        assert_eq!(response.code, 0);
        assert!(response.value.is_none());
    }

    #[test]
    fn numbers_or_strings() {
        #[derive(Deserialize, Debug)]
        struct Height {
            #[serde(deserialize_with = "string_or_number")]
            height: i64,
        }
        let a: Height = serde_json::from_str(r#"{"height":"7"}"#).unwrap();
        let b: Height = serde_json::from_str(r#"{"height":7}"#).unwrap();
        assert_eq!(a.height, b.height);
        serde_json::from_str::<Height>(r#"{"height":"seven"}"#).unwrap_err();
    }
}
