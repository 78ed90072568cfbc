//! Gas prices in the `0.0025uatom` notation, with exact fee calculation.

use std::{fmt::Display, str::FromStr};

use cosmos_sdk_proto::cosmos::base::v1beta1::Coin;

use crate::{coin::is_valid_denom, Error};

/// Price of one unit of gas, stored as a decimal fraction to avoid rounding drift.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GasPrice {
    /// Price scaled by `10^decimals`
    numerator: u128,
    decimals: u32,
    denom: String,
}

/// Beyond this the scale factor no longer fits comfortably in a u128.
const MAX_DECIMALS: u32 = 18;

impl GasPrice {
    /// `numerator / 10^decimals` per unit of gas.
    pub(crate) fn from_parts(numerator: u128, decimals: u32, denom: impl Into<String>) -> Self {
        debug_assert!(decimals <= MAX_DECIMALS);
        GasPrice {
            numerator,
            decimals,
            denom: denom.into(),
        }
    }

    pub fn denom(&self) -> &str {
        &self.denom
    }

    /// Fee for the given gas limit, rounded up to the next whole unit.
    pub fn fee_for(&self, gas_limit: u64) -> Coin {
        let scale = 10u128.pow(self.decimals);
        let total = self.numerator.saturating_mul(u128::from(gas_limit));
        let amount = total / scale + u128::from(total % scale != 0);
        Coin {
            denom: self.denom.clone(),
            amount: amount.to_string(),
        }
    }
}

impl FromStr for GasPrice {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |message| Error::InvalidGasPrice {
            input: s.to_owned(),
            message,
        };
        let idx = s
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .ok_or_else(|| err("missing denom"))?;
        let (amount, denom) = s.split_at(idx);
        if amount.is_empty() {
            return Err(err("missing amount"));
        }
        if !is_valid_denom(denom) {
            return Err(err("invalid denom"));
        }
        let (whole, fraction) = match amount.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (amount, ""),
        };
        if (whole.is_empty() && fraction.is_empty()) || fraction.contains('.') {
            return Err(err("malformed amount"));
        }
        let fraction = fraction.trim_end_matches('0');
        let decimals = u32::try_from(fraction.len()).map_err(|_| err("too many decimals"))?;
        if decimals > MAX_DECIMALS {
            return Err(err("too many decimals"));
        }
        let digits = format!("{whole}{fraction}");
        let numerator = if digits.is_empty() {
            0
        } else {
            digits.parse().map_err(|_| err("amount out of range"))?
        };
        Ok(GasPrice {
            numerator,
            decimals,
            denom: denom.to_owned(),
        })
    }
}

impl Display for GasPrice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let scale = 10u128.pow(self.decimals);
        let whole = self.numerator / scale;
        if self.decimals == 0 {
            write!(f, "{whole}{}", self.denom)
        } else {
            let fraction = self.numerator % scale;
            write!(
                f,
                "{whole}.{fraction:0width$}{}",
                self.denom,
                width = self.decimals as usize
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fee(price: &str, gas: u64) -> String {
        price.parse::<GasPrice>().unwrap().fee_for(gas).amount
    }

    #[test]
    fn parse_and_display() {
        let price: GasPrice = "0.0025uatom".parse().unwrap();
        assert_eq!(price.denom(), "uatom");
        assert_eq!(price.to_string(), "0.0025uatom");
        assert_eq!("1stake".parse::<GasPrice>().unwrap().to_string(), "1stake");
        assert_eq!(
            "0.50ibc/ABC".parse::<GasPrice>().unwrap().to_string(),
            "0.5ibc/ABC"
        );
    }

    #[test]
    fn parse_errors() {
        "uatom".parse::<GasPrice>().unwrap_err();
        "0.0025".parse::<GasPrice>().unwrap_err();
        "0.0.1uatom".parse::<GasPrice>().unwrap_err();
        ".uatom".parse::<GasPrice>().unwrap_err();
        "1UATOM".parse::<GasPrice>().unwrap_err();
        // Not scientific notation, and not a denom either
        "1e-3uatom".parse::<GasPrice>().unwrap_err();
        "0.1u:atom".parse::<GasPrice>().unwrap_err();
    }

    #[test]
    fn fee_is_exact_and_rounds_up() {
        // 0.0025 is not exactly representable as f64; integer math keeps this at 500
        assert_eq!(fee("0.0025uatom", 200000), "500");
        assert_eq!(fee("0.0025uatom", 259000), "648");
        assert_eq!(fee("0.0025uatom", 1), "1");
        assert_eq!(fee("0uatom", 200000), "0");
        assert_eq!(fee("2stake", 100), "200");
    }
}
