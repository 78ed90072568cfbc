use std::{fmt::Display, str::FromStr};

use serde::de::Visitor;

use crate::{AddressHrp, CosmosBuilder, GasPrice, Result};

/// Built-in connection presets.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum CosmosNetwork {
    /// A single node `simd` chain on this machine.
    Local,
    /// The public Cosmos Hub testnet.
    ThetaTestnet,
}

impl CosmosNetwork {
    fn as_str(self) -> &'static str {
        match self {
            CosmosNetwork::Local => "local",
            CosmosNetwork::ThetaTestnet => "theta-testnet",
        }
    }

    pub fn all() -> [CosmosNetwork; 2] {
        [CosmosNetwork::Local, CosmosNetwork::ThetaTestnet]
    }

    pub fn builder(self) -> CosmosBuilder {
        match self {
            CosmosNetwork::Local => {
                CosmosBuilder::new("http://127.0.0.1:26657", AddressHrp::COSMOS, "stake")
            }
            CosmosNetwork::ThetaTestnet => {
                let mut builder = CosmosBuilder::new(
                    "rpc.sentry-01.theta-testnet.polypore.xyz:26657",
                    AddressHrp::COSMOS,
                    "uatom",
                );
                builder.set_gas_price(Some(GasPrice::from_parts(25, 4, "uatom")));
                builder
            }
        }
    }
}

impl Display for CosmosNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CosmosNetwork {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CosmosNetwork::all()
            .into_iter()
            .find(|network| network.as_str() == s)
            .ok_or_else(|| format!("Unknown network: {s}"))
    }
}

impl serde::Serialize for CosmosNetwork {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for CosmosNetwork {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(CosmosNetworkVisitor)
    }
}

struct CosmosNetworkVisitor;

impl<'de> Visitor<'de> for CosmosNetworkVisitor {
    type Value = CosmosNetwork;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("CosmosNetwork")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        CosmosNetwork::from_str(v).map_err(E::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_roundtrip() {
        for network in CosmosNetwork::all() {
            assert_eq!(network.to_string().parse::<CosmosNetwork>(), Ok(network));
            let json = serde_json::to_string(&network).unwrap();
            assert_eq!(serde_json::from_str::<CosmosNetwork>(&json).unwrap(), network);
        }
        "juno-mainnet".parse::<CosmosNetwork>().unwrap_err();
    }

    #[test]
    fn presets() {
        let local = CosmosNetwork::Local.builder();
        assert_eq!(local.endpoint(), "http://127.0.0.1:26657");
        assert_eq!(local.gas_coin(), "stake");
        assert!(local.gas_price().is_none());

        let testnet = CosmosNetwork::ThetaTestnet.builder();
        assert_eq!(
            testnet.endpoint(),
            "http://rpc.sentry-01.theta-testnet.polypore.xyz:26657"
        );
        assert_eq!(testnet.hrp(), AddressHrp::COSMOS);
        assert_eq!(testnet.gas_price().unwrap().to_string(), "0.0025uatom");
    }
}
