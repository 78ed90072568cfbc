use crate::{AddressHrp, Cosmos, CosmosBuilder, CosmosNetwork, GasPrice, Result, Transport};

/// Command line options for connecting to a Cosmos network
#[derive(clap::Parser, Clone, Debug)]
pub struct CosmosOpt {
    /// Which preset to start from
    #[clap(long, env = "COSMOS_NETWORK", global = true, default_value_t = CosmosNetwork::Local)]
    pub network: CosmosNetwork,
    /// Optional endpoint override, e.g. http://127.0.0.1:26657
    #[clap(long, env = "COSMOS_ENDPOINT", global = true)]
    pub endpoint: Option<String>,
    /// Protocol spoken by the endpoint: rpc (Tendermint) or grpc
    #[clap(long, env = "COSMOS_TRANSPORT", global = true)]
    pub transport: Option<Transport>,
    /// Optional address prefix override
    #[clap(long, env = "COSMOS_HRP", global = true)]
    pub hrp: Option<AddressHrp>,
    /// Optional gas/fee denom override
    #[clap(long, env = "COSMOS_GAS_COIN", global = true)]
    pub gas_coin: Option<String>,
    /// Gas price for automatic fees, e.g. 0.0025uatom
    #[clap(long, env = "COSMOS_GAS_PRICE", global = true)]
    pub gas_price: Option<GasPrice>,
    /// Optional gas multiplier override
    #[clap(long, env = "COSMOS_GAS_MULTIPLIER", global = true)]
    pub gas_multiplier: Option<f64>,
}

impl CosmosOpt {
    pub fn builder(&self) -> CosmosBuilder {
        self.clone().into_builder()
    }

    pub fn into_builder(self) -> CosmosBuilder {
        let CosmosOpt {
            network,
            endpoint,
            transport,
            hrp,
            gas_coin,
            gas_price,
            gas_multiplier,
        } = self;

        let mut builder = network.builder();
        if let Some(endpoint) = endpoint {
            builder.set_endpoint(endpoint);
        }
        if let Some(hrp) = hrp {
            builder.set_hrp(hrp);
        }
        if let Some(gas_coin) = gas_coin {
            builder.set_gas_coin(gas_coin);
        }
        if let Some(transport) = transport {
            builder.set_transport(Some(transport));
        }
        if let Some(gas_price) = gas_price {
            builder.set_gas_price(Some(gas_price));
        }
        builder.set_gas_estimate_multiplier(gas_multiplier);

        builder
    }

    pub async fn build(&self) -> Result<Cosmos> {
        self.builder().build().await
    }

    pub async fn build_lazy(&self) -> Result<Cosmos> {
        self.builder().build_lazy().await
    }
}
