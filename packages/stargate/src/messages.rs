//! Messages which can be placed in a transaction, tagged with their type URL.

use cosmos_sdk_proto::{
    cosmos::{
        bank::v1beta1::MsgSend,
        staking::v1beta1::{MsgDelegate, MsgUndelegate},
    },
    traits::Message,
    Any,
};

use crate::coin::PrettyCoins;

pub const MSG_SEND_TYPE_URL: &str = "/cosmos.bank.v1beta1.MsgSend";
pub const MSG_DELEGATE_TYPE_URL: &str = "/cosmos.staking.v1beta1.MsgDelegate";
pub const MSG_UNDELEGATE_TYPE_URL: &str = "/cosmos.staking.v1beta1.MsgUndelegate";

/// A message to include in a transaction, including the type URL string.
///
/// Carries a human readable description for logging and error messages.
#[derive(Clone, Debug)]
pub struct TxMessage {
    type_url: String,
    value: Vec<u8>,
    description: String,
}

impl TxMessage {
    /// Construct a new message from its raw parts.
    pub fn new(type_url: impl Into<String>, value: Vec<u8>, description: impl Into<String>) -> Self {
        TxMessage {
            type_url: type_url.into(),
            value,
            description: description.into(),
        }
    }

    pub fn type_url(&self) -> &str {
        &self.type_url
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Split into the protobuf [Any] and the description.
    pub fn into_protobuf(self) -> (Any, String) {
        (
            Any {
                type_url: self.type_url,
                value: self.value,
            },
            self.description,
        )
    }
}

impl From<MsgSend> for TxMessage {
    fn from(msg: MsgSend) -> Self {
        TxMessage::new(
            MSG_SEND_TYPE_URL,
            msg.encode_to_vec(),
            format!(
                "{} sending {} to {}",
                msg.from_address,
                PrettyCoins(msg.amount.as_slice()),
                msg.to_address,
            ),
        )
    }
}

impl From<MsgDelegate> for TxMessage {
    fn from(msg: MsgDelegate) -> Self {
        TxMessage::new(
            MSG_DELEGATE_TYPE_URL,
            msg.encode_to_vec(),
            format!(
                "{} delegating {} to {}",
                msg.delegator_address,
                PrettyCoins(msg.amount.as_slice()),
                msg.validator_address,
            ),
        )
    }
}

impl From<MsgUndelegate> for TxMessage {
    fn from(msg: MsgUndelegate) -> Self {
        TxMessage::new(
            MSG_UNDELEGATE_TYPE_URL,
            msg.encode_to_vec(),
            format!(
                "{} undelegating {} from {}",
                msg.delegator_address,
                PrettyCoins(msg.amount.as_slice()),
                msg.validator_address,
            ),
        )
    }
}
