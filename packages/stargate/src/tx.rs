//! Committed transactions and the events they emitted.

use serde::Deserialize;

use crate::{decode::DecodedTx, Result};

/// A key/value attribute attached to a [TxEvent].
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct EventAttribute {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

/// An event emitted while executing a transaction, e.g. `coin_spent`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TxEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub attributes: Vec<EventAttribute>,
}

impl TxEvent {
    /// Value of the first attribute with the given key.
    pub fn find_attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.key == key)
            .map(|attr| attr.value.as_str())
    }
}

/// First event of the given kind.
pub fn find_event<'a>(events: &'a [TxEvent], kind: &str) -> Option<&'a TxEvent> {
    events.iter().find(|event| event.kind == kind)
}

/// One entry of the JSON raw log produced by Cosmos SDK 0.47 and earlier.
#[derive(Deserialize)]
struct RawLogEntry {
    #[serde(default)]
    events: Vec<TxEvent>,
}

/// Events contained in a JSON raw log, or `None` if the log isn't in that format.
///
/// Failed transactions and SDK 0.50 nodes put plain text (or nothing) here.
pub fn parse_raw_log(raw_log: &str) -> Option<Vec<TxEvent>> {
    let entries: Vec<RawLogEntry> = serde_json::from_str(raw_log).ok()?;
    Some(entries.into_iter().flat_map(|entry| entry.events).collect())
}

/// A transaction as stored on chain, plus its execution result.
#[derive(Clone, Debug)]
pub struct IndexedTx {
    pub height: i64,
    /// Uppercase hex SHA-256 of the transaction bytes.
    pub hash: String,
    /// 0 means success
    pub code: u32,
    pub codespace: String,
    pub raw_log: String,
    /// Events as reported by the node alongside the transaction.
    pub events: Vec<TxEvent>,
    pub gas_wanted: i64,
    pub gas_used: i64,
    /// Protobuf encoded `cosmos.tx.v1beta1.Tx`
    pub tx: Vec<u8>,
}

impl IndexedTx {
    pub fn is_success(&self) -> bool {
        self.code == 0
    }

    /// Decode the transaction envelope.
    pub fn decode(&self) -> Result<DecodedTx> {
        DecodedTx::decode(&self.tx)
    }

    /// Events from the raw log when it is JSON, otherwise the events reported by the node.
    pub fn log_events(&self) -> Vec<TxEvent> {
        match parse_raw_log(&self.raw_log) {
            Some(events) if !events.is_empty() => events,
            _ => self.events.clone(),
        }
    }

    /// The sender according to the first `coin_spent` event, via its `spender` attribute.
    pub fn spender(&self) -> Option<String> {
        find_event(&self.log_events(), "coin_spent")
            .and_then(|event| event.find_attribute("spender"))
            .map(ToOwned::to_owned)
    }
}

/// Check that a transaction hash is 64 hex characters, returning it uppercased.
pub fn normalize_tx_hash(hash: &str) -> Result<String> {
    let trimmed = hash.trim();
    if trimmed.len() == 64 && trimmed.bytes().all(|b| b.is_ascii_hexdigit()) {
        Ok(trimmed.to_ascii_uppercase())
    } else {
        Err(crate::Error::InvalidTxHash {
            hash: hash.to_owned(),
        })
    }
}

/// Hash of encoded transaction bytes, as used for lookups.
pub fn tx_hash(tx_bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(tx_bytes);
    hex::encode_upper(hasher.finalize())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Raw log of a faucet MsgSend in the Cosmos SDK 0.45/0.46 format.
    pub(crate) const FAUCET_RAW_LOG: &str = r#"[{"events":[{"type":"coin_received","attributes":[{"key":"receiver","value":"cosmos1ymcwj2xk0k786phq90vg20s5uupxwr55fzgl77"},{"key":"amount","value":"10000000uatom"}]},{"type":"coin_spent","attributes":[{"key":"spender","value":"cosmos15aptdqmm7ddgtcrjvc5hs988rlrkze40l4q0he"},{"key":"amount","value":"10000000uatom"}]},{"type":"message","attributes":[{"key":"action","value":"/cosmos.bank.v1beta1.MsgSend"},{"key":"sender","value":"cosmos15aptdqmm7ddgtcrjvc5hs988rlrkze40l4q0he"},{"key":"module","value":"bank"}]},{"type":"transfer","attributes":[{"key":"recipient","value":"cosmos1ymcwj2xk0k786phq90vg20s5uupxwr55fzgl77"},{"key":"sender","value":"cosmos15aptdqmm7ddgtcrjvc5hs988rlrkze40l4q0he"},{"key":"amount","value":"10000000uatom"}]}]}]"#;

    pub(crate) const FAUCET: &str = "cosmos15aptdqmm7ddgtcrjvc5hs988rlrkze40l4q0he";

    fn event(kind: &str, attributes: &[(&str, &str)]) -> TxEvent {
        TxEvent {
            kind: kind.to_owned(),
            attributes: attributes
                .iter()
                .map(|(key, value)| EventAttribute {
                    key: (*key).to_owned(),
                    value: (*value).to_owned(),
                })
                .collect(),
        }
    }

    fn indexed(raw_log: &str, events: Vec<TxEvent>) -> IndexedTx {
        IndexedTx {
            height: 1,
            hash: "00".repeat(32),
            code: 0,
            codespace: String::new(),
            raw_log: raw_log.to_owned(),
            events,
            gas_wanted: 0,
            gas_used: 0,
            tx: vec![],
        }
    }

    #[test]
    fn spender_from_raw_log() {
        let tx = indexed(FAUCET_RAW_LOG, vec![]);
        assert_eq!(tx.spender().as_deref(), Some(FAUCET));
    }

    #[test]
    fn spender_from_events_when_raw_log_empty() {
        let tx = indexed(
            "",
            vec![
                event("tx", &[("fee", "")]),
                event("coin_spent", &[("amount", "5stake"), ("spender", "cosmos1abc")]),
                event("coin_spent", &[("spender", "cosmos1second")]),
            ],
        );
        assert_eq!(tx.spender().as_deref(), Some("cosmos1abc"));
    }

    #[test]
    fn spender_missing() {
        let tx = indexed("out of gas in location: ReadFlat", vec![]);
        assert_eq!(tx.spender(), None);
        let tx = indexed("[]", vec![event("coin_spent", &[("amount", "1stake")])]);
        assert_eq!(tx.spender(), None);
    }

    #[test]
    fn find_helpers() {
        let events = parse_raw_log(FAUCET_RAW_LOG).unwrap();
        assert_eq!(events.len(), 4);
        let transfer = find_event(&events, "transfer").unwrap();
        assert_eq!(transfer.find_attribute("amount"), Some("10000000uatom"));
        assert_eq!(transfer.find_attribute("memo"), None);
        assert!(find_event(&events, "delegate").is_none());
        assert!(parse_raw_log("not json").is_none());
    }

    #[test]
    fn tx_hash_validation() {
        let hash = "9edabb7b3f8047b9fe64ce08786343b34ddfa4f314ffafdbcfb7d377df11e9d4";
        assert_eq!(normalize_tx_hash(hash).unwrap(), hash.to_ascii_uppercase());
        normalize_tx_hash("9EDABB").unwrap_err();
        normalize_tx_hash(&"Z".repeat(64)).unwrap_err();
    }

    #[test]
    fn hash_of_bytes() {
        // SHA-256 of the empty string
        assert_eq!(
            tx_hash(&[]),
            "E3B0C44298FC1C149AFBF4C8996FB92427AE41E4649B934CA495991B7852B855"
        );
    }
}
