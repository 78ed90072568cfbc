//! Query, inspect, sign and broadcast against Cosmos SDK chains.
//!
//! Connects over Tendermint JSON-RPC or Cosmos gRPC. See [CosmosBuilder] for connection
//! options and [TxBuilder] for producing transactions.

pub use address::{parse_raw_address, Address, AddressHrp, HasAddress, RawAddress};
pub use client::{BroadcastResult, Cosmos, NodeInfo, Transport};
pub use cosmos_builder::CosmosBuilder;
pub use cosmos_network::CosmosNetwork;
pub use cosmos_sdk_proto as proto;
pub use cosmos_sdk_proto::cosmos::base::v1beta1::Coin;
pub use decode::{DecodedMessage, DecodedTx};
pub use error::Error;
pub use gas_price::GasPrice;
pub use messages::TxMessage;
pub use tx::{find_event, EventAttribute, IndexedTx, TxEvent};
pub use txbuilder::{Fee, StdFee, TxBuilder};
pub use wallet::{AccountData, SecretKind, SecretSource, SeedPhrase, Wallet};

mod address;
mod client;
pub mod coin;
mod cosmos_builder;
mod cosmos_network;
mod decode;
pub mod error;
mod gas_price;
pub mod messages;
pub mod tx;
mod txbuilder;
mod wallet;

#[cfg(feature = "clap")]
pub mod clap;

pub type Result<T, E = Error> = std::result::Result<T, E>;
