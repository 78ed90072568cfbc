use std::str::FromStr;

use anyhow::Context;
use stargate::Coin;

/// A coin given on the command line as `<amount><denom>`, e.g. `100000uatom`.
#[derive(PartialEq, Eq, Debug, Clone)]
pub(crate) struct ParsedCoin {
    denom: String,
    amount: u128,
}

impl ParsedCoin {
    pub(crate) fn amount(&self) -> u128 {
        self.amount
    }

    pub(crate) fn denom(&self) -> &str {
        &self.denom
    }
}

impl From<ParsedCoin> for Coin {
    fn from(ParsedCoin { denom, amount }: ParsedCoin) -> Self {
        stargate::coin::coin(amount, denom)
    }
}

impl FromStr for ParsedCoin {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        (|| {
            let idx = s
                .find(|c: char| !c.is_ascii_digit())
                .context("Missing denom")?;
            let (amount, denom) = s.split_at(idx);
            anyhow::ensure!(!amount.is_empty(), "Must not have an empty amount");
            // IBC denoms look like ibc/27394FB0...
            anyhow::ensure!(
                stargate::coin::is_valid_denom(denom),
                "Denom must start with a lowercase letter and contain only letters, digits and /"
            );
            Ok(ParsedCoin {
                denom: denom.to_owned(),
                amount: amount.parse().context("Amount does not fit in 128 bits")?,
            })
        })()
        .with_context(|| format!("Could not parse coin value {s:?}"))
    }
}
