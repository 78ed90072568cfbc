use std::time::Duration;

use crate::{client::Transport, AddressHrp, GasPrice};

/// Used to build a [crate::Cosmos].
#[derive(Clone, Debug)]
pub struct CosmosBuilder {
    endpoint: String,
    gas_coin: String,
    hrp: AddressHrp,

    // Values with defaults
    transport: Option<Transport>,
    gas_price: Option<GasPrice>,
    gas_estimate_multiplier: Option<f64>,
    transaction_attempts: Option<usize>,
    poll_interval: Option<Duration>,
}

impl CosmosBuilder {
    /// Create a new [CosmosBuilder] with default options where possible.
    pub fn new(endpoint: impl Into<String>, hrp: AddressHrp, gas_coin: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            gas_coin: gas_coin.into(),
            hrp,
            transport: None,
            gas_price: None,
            gas_estimate_multiplier: None,
            transaction_attempts: None,
            poll_interval: None,
        }
    }

    /// Endpoint to connect to, with `http://` added when no scheme is given.
    pub fn endpoint(&self) -> String {
        normalize_endpoint(&self.endpoint)
    }

    /// See [Self::endpoint]
    pub fn set_endpoint(&mut self, endpoint: impl Into<String>) {
        self.endpoint = endpoint.into();
    }

    /// Native coin used for gas payments and balance reporting
    pub fn gas_coin(&self) -> &str {
        self.gas_coin.as_ref()
    }

    /// See [Self::gas_coin]
    pub fn set_gas_coin(&mut self, gas_coin: impl Into<String>) {
        self.gas_coin = gas_coin.into();
    }

    /// Human-readable part (HRP) of chain addresses
    pub fn hrp(&self) -> AddressHrp {
        self.hrp
    }

    /// See [Self::hrp]
    pub fn set_hrp(&mut self, hrp: AddressHrp) {
        self.hrp = hrp;
    }

    /// Protocol used to talk to the node
    ///
    /// Defaults to Tendermint JSON-RPC.
    pub fn transport(&self) -> Transport {
        self.transport.unwrap_or(Transport::Rpc)
    }

    /// See [Self::transport]
    pub fn set_transport(&mut self, transport: Option<Transport>) {
        self.transport = transport;
    }

    /// Gas price used to compute fees when the fee is estimated automatically
    ///
    /// No default: automatic fees fail without one.
    pub fn gas_price(&self) -> Option<&GasPrice> {
        self.gas_price.as_ref()
    }

    /// See [Self::gas_price]
    pub fn set_gas_price(&mut self, gas_price: Option<GasPrice>) {
        self.gas_price = gas_price;
    }

    /// Multiplier applied to simulated gas when fees are computed automatically. Defaults to 1.3.
    pub fn gas_estimate_multiplier(&self) -> f64 {
        self.gas_estimate_multiplier.unwrap_or(1.3)
    }

    /// See [Self::gas_estimate_multiplier]
    pub fn set_gas_estimate_multiplier(&mut self, gas_estimate_multiplier: Option<f64>) {
        self.gas_estimate_multiplier = gas_estimate_multiplier;
    }

    /// How many times to look for a broadcast transaction before giving up
    ///
    /// Default: 30
    pub fn transaction_attempts(&self) -> usize {
        self.transaction_attempts.unwrap_or(30)
    }

    /// See [Self::transaction_attempts]
    pub fn set_transaction_attempts(&mut self, transaction_attempts: Option<usize>) {
        self.transaction_attempts = transaction_attempts;
    }

    /// Delay between attempts to find a broadcast transaction
    ///
    /// Default: 2 seconds
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval.unwrap_or_else(|| Duration::from_secs(2))
    }

    /// See [Self::poll_interval]
    pub fn set_poll_interval(&mut self, poll_interval: Option<Duration>) {
        self.poll_interval = poll_interval;
    }
}

fn normalize_endpoint(endpoint: &str) -> String {
    let endpoint = endpoint.trim().trim_end_matches('/');
    if endpoint.contains("://") {
        endpoint.to_owned()
    } else {
        format!("http://{endpoint}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_scheme() {
        assert_eq!(
            normalize_endpoint("rpc.sentry-01.theta-testnet.polypore.xyz:26657"),
            "http://rpc.sentry-01.theta-testnet.polypore.xyz:26657"
        );
        assert_eq!(
            normalize_endpoint("http://127.0.0.1:26657/"),
            "http://127.0.0.1:26657"
        );
        assert_eq!(
            normalize_endpoint("https://grpc.example.com"),
            "https://grpc.example.com"
        );
    }

    #[test]
    fn defaults() {
        let mut builder = CosmosBuilder::new("127.0.0.1:26657", AddressHrp::COSMOS, "stake");
        assert_eq!(builder.transport(), Transport::Rpc);
        assert_eq!(builder.gas_estimate_multiplier(), 1.3);
        assert_eq!(builder.transaction_attempts(), 30);
        assert!(builder.gas_price().is_none());
        builder.set_gas_estimate_multiplier(Some(4.2));
        builder.set_transport(Some(Transport::Grpc));
        assert_eq!(builder.gas_estimate_multiplier(), 4.2);
        assert_eq!(builder.transport(), Transport::Grpc);
    }
}
