use std::path::PathBuf;

use anyhow::{Context, Result};
use stargate::{AddressHrp, CosmosNetwork, SecretKind, SecretSource, Wallet};

/// Where to load the signing secret from
#[derive(clap::Parser, Clone, Debug)]
pub(crate) struct SecretOpt {
    /// File containing a hex private key or a mnemonic phrase
    #[clap(long, env = "STARGATE_SECRET_FILE")]
    secret_file: Option<PathBuf>,
    /// Format of the secret file: raw-key or mnemonic
    #[clap(long, env = "STARGATE_SECRET_KIND")]
    secret_kind: Option<SecretKind>,
}

impl SecretOpt {
    /// Defaults follow the network: a raw key for the local chain, a mnemonic for the testnet.
    pub(crate) fn source(&self, network: CosmosNetwork) -> SecretSource {
        let (path, kind) = match network {
            CosmosNetwork::Local => ("./simd.alice.private.key", SecretKind::RawKey),
            CosmosNetwork::ThetaTestnet => ("./testnet.alice.mnemonic.key", SecretKind::Mnemonic),
        };
        SecretSource::new(
            self.secret_file.clone().unwrap_or_else(|| path.into()),
            self.secret_kind.unwrap_or(kind),
        )
    }

    pub(crate) fn load(&self, network: CosmosNetwork, hrp: AddressHrp) -> Result<Wallet> {
        let source = self.source(network);
        Wallet::load(&source, hrp).with_context(|| {
            format!(
                "Unable to load {} secret from {}",
                source.kind,
                source.path.display()
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn network_defaults() {
        let opt = SecretOpt::try_parse_from(["test"]).unwrap();
        if opt.secret_file.is_none() && opt.secret_kind.is_none() {
            let local = opt.source(CosmosNetwork::Local);
            assert_eq!(local.kind, SecretKind::RawKey);
            assert_eq!(local.path, PathBuf::from("./simd.alice.private.key"));
            let testnet = opt.source(CosmosNetwork::ThetaTestnet);
            assert_eq!(testnet.kind, SecretKind::Mnemonic);
        }
    }

    #[test]
    fn explicit_kind_wins() {
        let opt = SecretOpt::try_parse_from([
            "test",
            "--secret-file",
            "/tmp/key",
            "--secret-kind",
            "mnemonic",
        ])
        .unwrap();
        let source = opt.source(CosmosNetwork::Local);
        assert_eq!(source.kind, SecretKind::Mnemonic);
        assert_eq!(source.path, PathBuf::from("/tmp/key"));
    }
}
