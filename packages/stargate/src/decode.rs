//! Decoding of raw transaction bytes into typed messages.

use std::fmt::Display;

use cosmos_sdk_proto::{
    cosmos::{
        bank::v1beta1::MsgSend,
        base::v1beta1::Coin,
        staking::v1beta1::{MsgDelegate, MsgUndelegate},
        tx::v1beta1::{AuthInfo, Tx, TxBody},
    },
    traits::Message,
    Any,
};

use crate::{
    coin::PrettyCoins,
    messages::{MSG_DELEGATE_TYPE_URL, MSG_SEND_TYPE_URL, MSG_UNDELEGATE_TYPE_URL},
    Error, Result,
};

/// A transaction envelope with body and auth info present.
#[derive(Clone, Debug)]
pub struct DecodedTx {
    pub body: TxBody,
    pub auth_info: AuthInfo,
    pub signatures: Vec<Vec<u8>>,
}

impl DecodedTx {
    /// Decode a protobuf encoded `cosmos.tx.v1beta1.Tx`.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let Tx {
            body,
            auth_info,
            signatures,
        } = Tx::decode(bytes).map_err(|source| Error::decode("transaction envelope", source))?;
        Ok(DecodedTx {
            body: body.ok_or(Error::MissingEnvelopeField { field: "body" })?,
            auth_info: auth_info.ok_or(Error::MissingEnvelopeField { field: "auth_info" })?,
            signatures,
        })
    }

    /// Messages in the order they appear in the body, still packed.
    pub fn raw_messages(&self) -> &[Any] {
        &self.body.messages
    }

    /// Decode every message by its type URL.
    ///
    /// Fails on the first message with an unsupported type URL or malformed payload.
    pub fn messages(&self) -> Result<Vec<DecodedMessage>> {
        self.body.messages.iter().map(DecodedMessage::decode).collect()
    }

    /// Fee paid, empty if the envelope carries no fee.
    pub fn fee(&self) -> &[Coin] {
        self.auth_info
            .fee
            .as_ref()
            .map_or(&[], |fee| fee.amount.as_slice())
    }

    pub fn gas_limit(&self) -> u64 {
        self.auth_info.fee.as_ref().map_or(0, |fee| fee.gas_limit)
    }

    pub fn memo(&self) -> &str {
        &self.body.memo
    }
}

/// A message whose type URL this crate understands.
#[derive(Clone, Debug, PartialEq)]
pub enum DecodedMessage {
    Send(MsgSend),
    Delegate(MsgDelegate),
    Undelegate(MsgUndelegate),
}

impl DecodedMessage {
    pub fn decode(any: &Any) -> Result<Self> {
        let value = any.value.as_slice();
        let err = |source| Error::decode(any.type_url.clone(), source);
        match any.type_url.as_str() {
            MSG_SEND_TYPE_URL => MsgSend::decode(value).map(DecodedMessage::Send).map_err(err),
            MSG_DELEGATE_TYPE_URL => MsgDelegate::decode(value)
                .map(DecodedMessage::Delegate)
                .map_err(err),
            MSG_UNDELEGATE_TYPE_URL => MsgUndelegate::decode(value)
                .map(DecodedMessage::Undelegate)
                .map_err(err),
            _ => Err(Error::UnknownTypeUrl {
                type_url: any.type_url.clone(),
            }),
        }
    }

    pub fn type_url(&self) -> &'static str {
        match self {
            DecodedMessage::Send(_) => MSG_SEND_TYPE_URL,
            DecodedMessage::Delegate(_) => MSG_DELEGATE_TYPE_URL,
            DecodedMessage::Undelegate(_) => MSG_UNDELEGATE_TYPE_URL,
        }
    }

    /// The account that authorized this message.
    pub fn signer(&self) -> &str {
        match self {
            DecodedMessage::Send(msg) => &msg.from_address,
            DecodedMessage::Delegate(msg) => &msg.delegator_address,
            DecodedMessage::Undelegate(msg) => &msg.delegator_address,
        }
    }
}

impl Display for DecodedMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodedMessage::Send(msg) => write!(
                f,
                "{}: {} -> {}: {}",
                self.type_url(),
                msg.from_address,
                msg.to_address,
                PrettyCoins(&msg.amount)
            ),
            DecodedMessage::Delegate(msg) => write!(
                f,
                "{}: {} -> {}: {}",
                self.type_url(),
                msg.delegator_address,
                msg.validator_address,
                PrettyCoins(msg.amount.as_slice())
            ),
            DecodedMessage::Undelegate(msg) => write!(
                f,
                "{}: {} <- {}: {}",
                self.type_url(),
                msg.delegator_address,
                msg.validator_address,
                PrettyCoins(msg.amount.as_slice())
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use cosmos_sdk_proto::cosmos::tx::v1beta1::Fee;

    use crate::{
        coin::coin,
        messages::TxMessage,
        tx::{
            tests::{FAUCET, FAUCET_RAW_LOG},
            IndexedTx,
        },
    };

    use super::*;

    const ME: &str = "cosmos1ymcwj2xk0k786phq90vg20s5uupxwr55fzgl77";

    fn envelope(messages: Vec<Any>, fee: Vec<Coin>, gas_limit: u64) -> Vec<u8> {
        Tx {
            body: Some(TxBody {
                messages,
                memo: "faucet".to_owned(),
                ..Default::default()
            }),
            auth_info: Some(AuthInfo {
                fee: Some(Fee {
                    amount: fee,
                    gas_limit,
                    ..Default::default()
                }),
                ..Default::default()
            }),
            signatures: vec![vec![0; 64]],
        }
        .encode_to_vec()
    }

    fn send(from: &str, to: &str, amount: u128, denom: &str) -> Any {
        TxMessage::from(MsgSend {
            from_address: from.to_owned(),
            to_address: to.to_owned(),
            amount: vec![coin(amount, denom)],
        })
        .into_protobuf()
        .0
    }

    #[test]
    fn decode_single_send() {
        let bytes = envelope(
            vec![send(FAUCET, ME, 10000000, "uatom")],
            vec![coin(500, "uatom")],
            200000,
        );
        let tx = DecodedTx::decode(&bytes).unwrap();
        assert_eq!(tx.memo(), "faucet");
        assert_eq!(tx.fee(), &[coin(500, "uatom")]);
        assert_eq!(tx.gas_limit(), 200000);
        assert_eq!(tx.raw_messages().len(), 1);
        assert_eq!(tx.raw_messages()[0].type_url, MSG_SEND_TYPE_URL);

        let messages = tx.messages().unwrap();
        match messages.as_slice() {
            [DecodedMessage::Send(msg)] => {
                assert_eq!(msg.from_address, FAUCET);
                assert_eq!(msg.to_address, ME);
                assert_eq!(msg.amount[0].amount, "10000000");
            }
            other => panic!("Unexpected messages: {other:?}"),
        }
    }

    #[test]
    fn decoded_sender_matches_spender() {
        let indexed = IndexedTx {
            height: 12,
            hash: "9EDABB7B3F8047B9FE64CE08786343B34DDFA4F314FFAFDBCFB7D377DF11E9D4".to_owned(),
            code: 0,
            codespace: String::new(),
            raw_log: FAUCET_RAW_LOG.to_owned(),
            events: vec![],
            gas_wanted: 200000,
            gas_used: 80000,
            tx: envelope(vec![send(FAUCET, ME, 10000000, "uatom")], vec![], 200000),
        };
        let messages = indexed.decode().unwrap().messages().unwrap();
        assert_eq!(Some(messages[0].signer()), indexed.spender().as_deref());
    }

    #[test]
    fn multi_message_order() {
        let delegate = TxMessage::from(MsgDelegate {
            delegator_address: ME.to_owned(),
            validator_address: "cosmosvaloper1val".to_owned(),
            amount: Some(coin(1000, "uatom")),
        })
        .into_protobuf()
        .0;
        let bytes = envelope(
            vec![send(ME, FAUCET, 100000, "uatom"), delegate],
            vec![],
            0,
        );
        let messages = DecodedTx::decode(&bytes).unwrap().messages().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].type_url(), MSG_SEND_TYPE_URL);
        assert_eq!(messages[1].type_url(), MSG_DELEGATE_TYPE_URL);
        assert_eq!(
            messages[1].to_string(),
            "/cosmos.staking.v1beta1.MsgDelegate: cosmos1ymcwj2xk0k786phq90vg20s5uupxwr55fzgl77 -> cosmosvaloper1val: 1000uatom"
        );
    }

    #[test]
    fn unknown_type_url() {
        let bytes = envelope(
            vec![Any {
                type_url: "/cosmwasm.wasm.v1.MsgExecuteContract".to_owned(),
                value: vec![],
            }],
            vec![],
            0,
        );
        let tx = DecodedTx::decode(&bytes).unwrap();
        assert!(matches!(
            tx.messages(),
            Err(Error::UnknownTypeUrl { type_url }) if type_url == "/cosmwasm.wasm.v1.MsgExecuteContract"
        ));
    }

    #[test]
    fn malformed_payload() {
        let bytes = envelope(
            vec![Any {
                type_url: MSG_SEND_TYPE_URL.to_owned(),
                value: vec![0xff, 0xff, 0xff],
            }],
            vec![],
            0,
        );
        let tx = DecodedTx::decode(&bytes).unwrap();
        assert!(matches!(tx.messages(), Err(Error::Decode { .. })));
    }

    #[test]
    fn missing_envelope_parts() {
        let no_body = Tx {
            body: None,
            auth_info: Some(AuthInfo::default()),
            signatures: vec![],
        }
        .encode_to_vec();
        assert!(matches!(
            DecodedTx::decode(&no_body),
            Err(Error::MissingEnvelopeField { field: "body" })
        ));
        // Empty bytes decode to an envelope with nothing set
        assert!(matches!(
            DecodedTx::decode(&[]),
            Err(Error::MissingEnvelopeField { .. })
        ));
        assert!(matches!(
            DecodedTx::decode(&[0xff, 0x01]),
            Err(Error::Decode { .. })
        ));
    }
}
