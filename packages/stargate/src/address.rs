use std::{
    collections::HashSet,
    fmt::{Debug, Display},
    str::FromStr,
};

use bech32::{FromBase32, ToBase32};
use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::error::AddressError;

/// A raw address value not connected to a specific blockchain. You usually want [Address].
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum RawAddress {
    Twenty { raw_address: [u8; 20] },
    ThirtyTwo { raw_address: [u8; 32] },
}

/// Parse a raw address and its HRP from a string. Supports any Cosmos-compatible blockchain.
pub fn parse_raw_address(s: &str) -> Result<(AddressHrp, RawAddress), AddressError> {
    let (hrp, data, variant) = bech32::decode(s).map_err(|source| AddressError::InvalidBech32 {
        address: s.to_owned(),
        source,
    })?;
    match variant {
        bech32::Variant::Bech32 => (),
        bech32::Variant::Bech32m => {
            return Err(AddressError::InvalidVariant {
                address: s.to_owned(),
            })
        }
    }
    let data = Vec::<u8>::from_base32(&data).map_err(|source| AddressError::InvalidBech32 {
        address: s.to_owned(),
        source,
    })?;
    let raw_address =
        RawAddress::try_from(data.as_slice()).map_err(|_| AddressError::InvalidByteCount {
            address: s.to_owned(),
            actual: data.len(),
        })?;
    Ok((AddressHrp::new(&hrp)?, raw_address))
}

impl AsRef<[u8]> for RawAddress {
    fn as_ref(&self) -> &[u8] {
        match self {
            RawAddress::Twenty { raw_address } => raw_address,
            RawAddress::ThirtyTwo { raw_address } => raw_address,
        }
    }
}

impl From<[u8; 20]> for RawAddress {
    fn from(raw_address: [u8; 20]) -> Self {
        RawAddress::Twenty { raw_address }
    }
}

impl From<[u8; 32]> for RawAddress {
    fn from(raw_address: [u8; 32]) -> Self {
        RawAddress::ThirtyTwo { raw_address }
    }
}

impl TryFrom<&[u8]> for RawAddress {
    type Error = usize;

    /// On failure, returns the number of bytes found.
    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        match value.try_into().ok() {
            Some(raw_address) => Ok(RawAddress::Twenty { raw_address }),
            None => value
                .try_into()
                .map(|raw_address| RawAddress::ThirtyTwo { raw_address })
                .map_err(|_| value.len()),
        }
    }
}

impl RawAddress {
    pub fn with_hrp(self, hrp: AddressHrp) -> Address {
        Address {
            raw_address: self,
            hrp,
        }
    }
}

/// The human readable part (HRP) of a bech32 address, e.g. `cosmos` or `cosmosvaloper`.
///
/// Values are interned so that the type stays [Copy].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressHrp(&'static str);

impl AddressHrp {
    /// Account addresses on the Cosmos Hub and most SDK test chains.
    pub const COSMOS: AddressHrp = AddressHrp("cosmos");

    pub fn new(hrp: &str) -> Result<Self, AddressError> {
        static INTERNED: Lazy<Mutex<HashSet<&'static str>>> =
            Lazy::new(|| Mutex::new(HashSet::new()));

        if hrp.is_empty()
            || hrp.len() > 83
            || !hrp
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
        {
            return Err(AddressError::InvalidHrp {
                hrp: hrp.to_owned(),
            });
        }

        let mut guard = INTERNED.lock();
        Ok(match guard.get(hrp) {
            Some(interned) => AddressHrp(interned),
            None => {
                let interned: &'static str = Box::leak(hrp.to_owned().into_boxed_str());
                guard.insert(interned);
                AddressHrp(interned)
            }
        })
    }

    pub fn as_str(self) -> &'static str {
        self.0
    }

    /// Prefix of validator operator addresses on the same chain, e.g. `cosmosvaloper`.
    pub fn validator_operator(self) -> Result<Self, AddressError> {
        AddressHrp::new(&format!("{}valoper", self.0))
    }
}

impl FromStr for AddressHrp {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AddressHrp::new(s)
    }
}

impl Display for AddressHrp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

impl Debug for AddressHrp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// An address on a Cosmos blockchain
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    raw_address: RawAddress,
    hrp: AddressHrp,
}

impl Address {
    pub fn raw(&self) -> &RawAddress {
        &self.raw_address
    }

    pub fn hrp(&self) -> AddressHrp {
        self.hrp
    }

    /// Same raw bytes under a different prefix, e.g. account to validator operator.
    pub fn with_hrp(&self, hrp: AddressHrp) -> Self {
        Address {
            raw_address: self.raw_address,
            hrp,
        }
    }

    /// Parse and require a specific prefix.
    pub fn parse_with_hrp(s: &str, expected: AddressHrp) -> Result<Self, AddressError> {
        let address: Address = s.parse()?;
        if address.hrp == expected {
            Ok(address)
        } else {
            Err(AddressError::WrongHrp {
                address: s.to_owned(),
                actual: address.hrp,
                expected,
            })
        }
    }
}

impl Display for Address {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        // The HRP was validated on construction, so encoding cannot fail.
        bech32::encode_to_fmt(
            fmt,
            self.hrp.as_str(),
            self.raw_address.to_base32(),
            bech32::Variant::Bech32,
        )
        .map_err(|_| std::fmt::Error)?
    }
}

impl Debug for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{self}\"")
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

impl From<&Address> for String {
    fn from(address: &Address) -> Self {
        address.to_string()
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hrp, raw_address) = parse_raw_address(s)?;
        Ok(Address { raw_address, hrp })
    }
}

pub trait HasAddress {
    fn get_address(&self) -> Address;

    fn get_address_string(&self) -> String {
        self.get_address().to_string()
    }
}

impl HasAddress for Address {
    fn get_address(&self) -> Address {
        *self
    }
}

impl<T: HasAddress> HasAddress for &T {
    fn get_address(&self) -> Address {
        HasAddress::get_address(*self)
    }
}

#[cfg(test)]
mod tests {
    use quickcheck::Arbitrary;

    use super::*;

    #[derive(Clone, Debug)]
    struct TestHrp(AddressHrp);

    impl Arbitrary for TestHrp {
        fn arbitrary(g: &mut quickcheck::Gen) -> Self {
            let hrp = *g
                .choose(&["cosmos", "cosmosvaloper", "osmo", "juno", "stars"])
                .unwrap();
            TestHrp(AddressHrp::new(hrp).unwrap())
        }
    }

    impl Arbitrary for RawAddress {
        fn arbitrary(g: &mut quickcheck::Gen) -> Self {
            if bool::arbitrary(g) {
                let mut raw_address = [0; 20];
                for byte in &mut raw_address {
                    *byte = u8::arbitrary(g);
                }
                RawAddress::Twenty { raw_address }
            } else {
                let mut raw_address = [0; 32];
                for byte in &mut raw_address {
                    *byte = u8::arbitrary(g);
                }
                RawAddress::ThirtyTwo { raw_address }
            }
        }
    }

    quickcheck::quickcheck! {
        fn roundtrip_address(hrp: TestHrp, raw_address: RawAddress) -> bool {
            let address1 = raw_address.with_hrp(hrp.0);
            let s1 = address1.to_string();
            let address2: Address = s1.parse().unwrap();
            let s2 = address2.to_string();
            assert_eq!(s1, s2);
            assert_eq!(address1, address2);
            true
        }
    }

    #[test]
    fn spot_roundtrip_cosmos() {
        const S: &str = "cosmos1ymcwj2xk0k786phq90vg20s5uupxwr55fzgl77";
        let address: Address = S.parse().unwrap();
        assert_eq!(S, &address.to_string());
        assert_eq!(address.hrp(), AddressHrp::COSMOS);
    }

    #[test]
    fn spot_roundtrip_valoper() {
        const S: &str = "cosmosvaloper178h4s6at5v9cd8m9n7ew3hg7k9eh0s6wptxpcn";
        let valoper = AddressHrp::COSMOS.validator_operator().unwrap();
        assert_eq!(valoper.as_str(), "cosmosvaloper");
        let address = Address::parse_with_hrp(S, valoper).unwrap();
        assert_eq!(S, &address.to_string());

        // An account address is not a validator
        let err = Address::parse_with_hrp("cosmos1ymcwj2xk0k786phq90vg20s5uupxwr55fzgl77", valoper)
            .unwrap_err();
        assert!(matches!(err, AddressError::WrongHrp { .. }));
    }

    #[test]
    fn wrong_hrp_rejected() {
        const S: &str = "cosmos1ymcwj2xk0k786phq90vg20s5uupxwr55fzgl77";
        let err = Address::parse_with_hrp(S, AddressHrp::new("osmo").unwrap()).unwrap_err();
        assert!(matches!(err, AddressError::WrongHrp { .. }));
    }

    #[test]
    fn invalid_checksum_rejected() {
        "cosmos1ymcwj2xk0k786phq90vg20s5uupxwr55fzgl78"
            .parse::<Address>()
            .unwrap_err();
    }

    #[test]
    fn invalid_hrp_rejected() {
        AddressHrp::new("").unwrap_err();
        AddressHrp::new("Cosmos").unwrap_err();
        AddressHrp::new("cosmos valoper").unwrap_err();
    }

    #[test]
    fn hrp_interning_is_stable() {
        let a = AddressHrp::new("osmo").unwrap();
        let b = AddressHrp::new("osmo").unwrap();
        assert_eq!(a, b);
        assert_eq!(AddressHrp::new("cosmos").unwrap(), AddressHrp::COSMOS);
    }
}
