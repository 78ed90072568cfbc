//! Exact arithmetic over [Coin] amounts.

use std::fmt::Display;

use cosmos_sdk_proto::cosmos::base::v1beta1::Coin;

use crate::{Error, Result};

/// Parse a coin amount. Amounts are integer strings, never floats.
pub fn parse_amount(coin: &Coin) -> Result<u128> {
    if coin.amount.is_empty() || !coin.amount.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidCoinAmount {
            denom: coin.denom.clone(),
            amount: coin.amount.clone(),
        });
    }
    coin.amount.parse().map_err(|_| Error::InvalidCoinAmount {
        denom: coin.denom.clone(),
        amount: coin.amount.clone(),
    })
}

/// Total held of the given denom. Missing denoms count as zero.
pub fn amount_of(coins: &[Coin], denom: &str) -> Result<u128> {
    let mut total = 0u128;
    for coin in coins.iter().filter(|coin| coin.denom == denom) {
        total = total
            .checked_add(parse_amount(coin)?)
            .ok_or_else(|| Error::InvalidCoinAmount {
                denom: coin.denom.clone(),
                amount: coin.amount.clone(),
            })?;
    }
    Ok(total)
}

/// Denoms start with a lowercase letter followed by letters, digits or `/`,
/// e.g. `uatom` or `ibc/27394FB0...`.
pub fn is_valid_denom(denom: &str) -> bool {
    denom.len() <= MAX_DENOM_LEN
        && denom.starts_with(|c: char| c.is_ascii_lowercase())
        && denom.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'/')
}

const MAX_DENOM_LEN: usize = 128;

pub fn coin(amount: u128, denom: impl Into<String>) -> Coin {
    Coin {
        denom: denom.into(),
        amount: amount.to_string(),
    }
}

/// Display helper, renders as `100stake, 5uatom`.
pub struct PrettyCoins<'a>(pub &'a [Coin]);

impl Display for PrettyCoins<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.0.is_empty() {
            return f.write_str("(none)");
        }
        for (idx, Coin { denom, amount }) in self.0.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{amount}{denom}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denom_rules() {
        assert!(is_valid_denom("uatom"));
        assert!(is_valid_denom("stake"));
        assert!(is_valid_denom("ibc/27394FB092D2ECCD56123C74F36E4C1F926001CEADA9CA97EA622B25F41E5EB2"));
        assert!(!is_valid_denom(""));
        assert!(!is_valid_denom("UATOM"));
        assert!(!is_valid_denom("e-3uatom"));
        assert!(!is_valid_denom(".5uatom"));
        assert!(!is_valid_denom(&"u".repeat(129)));
    }

    #[test]
    fn amounts_are_exact() {
        // Larger than f64 can represent exactly
        let big = coin(123_456_789_012_345_678_901_234_567, "uatom");
        assert_eq!(parse_amount(&big).unwrap(), 123_456_789_012_345_678_901_234_567);
    }

    #[test]
    fn rejects_non_integer() {
        parse_amount(&Coin {
            denom: "stake".to_owned(),
            amount: "1.5".to_owned(),
        })
        .unwrap_err();
        parse_amount(&Coin {
            denom: "stake".to_owned(),
            amount: "".to_owned(),
        })
        .unwrap_err();
        parse_amount(&Coin {
            denom: "stake".to_owned(),
            amount: "-1".to_owned(),
        })
        .unwrap_err();
    }

    #[test]
    fn amount_of_missing_denom_is_zero() {
        let coins = vec![coin(5, "stake"), coin(7, "uatom"), coin(3, "stake")];
        assert_eq!(amount_of(&coins, "stake").unwrap(), 8);
        assert_eq!(amount_of(&coins, "uosmo").unwrap(), 0);
        assert_eq!(amount_of(&[], "stake").unwrap(), 0);
    }

    #[test]
    fn pretty() {
        assert_eq!(
            PrettyCoins(&[coin(100000, "stake"), coin(1, "uatom")]).to_string(),
            "100000stake, 1uatom"
        );
        assert_eq!(PrettyCoins(&[]).to_string(), "(none)");
    }
}
