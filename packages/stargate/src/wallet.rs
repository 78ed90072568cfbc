use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use bitcoin::hashes::{ripemd160, sha256, Hash};
use bitcoin::secp256k1::ecdsa::Signature;
use bitcoin::secp256k1::{All, Message, PublicKey, Secp256k1, SecretKey};
use bitcoin::util::bip32::{DerivationPath, ExtendedPrivKey};
use once_cell::sync::OnceCell;
use rand::Rng;

use crate::address::{AddressHrp, RawAddress};
use crate::error::WalletError;
use crate::{Address, HasAddress};

/// Standard Cosmos derivation path, coin type 118.
pub const COSMOS_DERIVATION_PATH: &str = "m/44'/118'/0'/0/0";

/// A seed phrase for a wallet
#[derive(Clone)]
pub struct SeedPhrase {
    mnemonic: bip39::Mnemonic,
}

impl SeedPhrase {
    fn random() -> SeedPhrase {
        let mut rng = rand::thread_rng();
        let mut entropy: [u8; 32] = [0; 32];
        for b in &mut entropy {
            *b = rng.gen();
        }
        SeedPhrase {
            // 32 bytes of entropy is always valid for a 24 word phrase
            mnemonic: bip39::Mnemonic::from_entropy(&entropy)
                .expect("32 bytes of entropy is a valid mnemonic length"),
        }
    }

    pub fn phrase(&self) -> String {
        self.mnemonic.to_string()
    }
}

impl FromStr for SeedPhrase {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let words = s.split_whitespace().collect::<Vec<_>>().join(" ");
        let mnemonic = words
            .parse()
            .map_err(|source| WalletError::InvalidMnemonic { source })?;
        Ok(SeedPhrase { mnemonic })
    }
}

/// The format of a locally stored secret.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SecretKind {
    /// Hex encoded 32 byte secp256k1 private key.
    RawKey,
    /// BIP-39 mnemonic phrase, derived along [COSMOS_DERIVATION_PATH].
    Mnemonic,
}

impl SecretKind {
    fn as_str(self) -> &'static str {
        match self {
            SecretKind::RawKey => "raw-key",
            SecretKind::Mnemonic => "mnemonic",
        }
    }
}

impl Display for SecretKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecretKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw-key" | "key" | "hex" => Ok(SecretKind::RawKey),
            "mnemonic" | "phrase" => Ok(SecretKind::Mnemonic),
            _ => Err(format!(
                "Unknown secret kind {s:?}, expected raw-key or mnemonic"
            )),
        }
    }
}

/// Where to find the secret material for a signing identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecretSource {
    pub path: PathBuf,
    pub kind: SecretKind,
}

impl SecretSource {
    pub fn new(path: impl Into<PathBuf>, kind: SecretKind) -> Self {
        SecretSource {
            path: path.into(),
            kind,
        }
    }
}

/// A single account exposed by a [Wallet].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountData {
    pub address: Address,
    /// Compressed secp256k1 public key
    pub public_key: [u8; 33],
}

/// A wallet capable of signing on a specific blockchain
#[derive(Clone)]
// Not deriving Copy since this is a pretty large data structure.
pub struct Wallet {
    address: Address,
    secret_key: SecretKey,
    public_key_bytes: [u8; 33],
}

fn global_secp() -> &'static Secp256k1<All> {
    static CELL: OnceCell<Secp256k1<All>> = OnceCell::new();
    CELL.get_or_init(Secp256k1::new)
}

impl Wallet {
    fn from_secret_key(secret_key: SecretKey, hrp: AddressHrp) -> Wallet {
        let public_key_bytes = PublicKey::from_secret_key(global_secp(), &secret_key).serialize();
        let address = RawAddress::from(address_from_public_key(&public_key_bytes)).with_hrp(hrp);
        Wallet {
            address,
            secret_key,
            public_key_bytes,
        }
    }

    /// Import a hex encoded private key directly.
    pub fn from_hex_key(hex_key: &str, hrp: AddressHrp) -> Result<Self, WalletError> {
        let trimmed = hex_key.trim();
        let trimmed = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(trimmed).map_err(|source| WalletError::InvalidHex { source })?;
        let secret_key = SecretKey::from_slice(&bytes)
            .map_err(|source| WalletError::InvalidPrivateKey { source })?;
        Ok(Self::from_secret_key(secret_key, hrp))
    }

    /// Derive from a mnemonic phrase.
    ///
    /// The phrase may be preceded by an explicit derivation path, e.g. `m/44'/118'/0'/0/1 word word ...`.
    pub fn from_phrase(phrase: &str, hrp: AddressHrp) -> Result<Self, WalletError> {
        let phrase = phrase.trim();
        let (path, phrase) = match phrase.split_once(char::is_whitespace) {
            Some((path, rest)) if path.starts_with("m/44") => (path, rest),
            _ => (COSMOS_DERIVATION_PATH, phrase),
        };
        let derivation_path =
            DerivationPath::from_str(path).map_err(|source| WalletError::InvalidDerivationPath {
                path: path.to_owned(),
                source,
            })?;
        let seed_phrase = SeedPhrase::from_str(phrase)?;
        Self::from_seed_phrase(&seed_phrase, &derivation_path, hrp)
    }

    fn from_seed_phrase(
        seed_phrase: &SeedPhrase,
        derivation_path: &DerivationPath,
        hrp: AddressHrp,
    ) -> Result<Self, WalletError> {
        let secp = global_secp();
        let root_private_key = ExtendedPrivKey::new_master(
            bitcoin::Network::Bitcoin,
            &seed_phrase.mnemonic.to_seed(""),
        )
        .map_err(|source| WalletError::Derivation { source })?;
        let privkey = root_private_key
            .derive_priv(secp, derivation_path)
            .map_err(|source| WalletError::Derivation { source })?;
        Ok(Self::from_secret_key(privkey.private_key, hrp))
    }

    /// Load from a secret file. The file is read completely before this returns.
    pub fn load(source: &SecretSource, hrp: AddressHrp) -> Result<Self, WalletError> {
        let contents = read_secret(&source.path)?;
        let wallet = match source.kind {
            SecretKind::RawKey => Self::from_hex_key(&contents, hrp)?,
            SecretKind::Mnemonic => Self::from_phrase(&contents, hrp)?,
        };
        tracing::debug!(
            "Loaded {} wallet {} from {}",
            source.kind,
            wallet.address,
            source.path.display()
        );
        Ok(wallet)
    }

    /// Generate a random 24 word mnemonic phrase
    pub fn generate_phrase() -> String {
        SeedPhrase::random().phrase()
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// All accounts this wallet can sign for. Always exactly one.
    pub fn accounts(&self) -> Vec<AccountData> {
        vec![AccountData {
            address: self.address,
            public_key: self.public_key_bytes,
        }]
    }

    pub fn public_key_bytes(&self) -> &[u8] {
        &self.public_key_bytes
    }

    /// SHA-256 the message and sign it, producing a low-S signature.
    pub fn sign_bytes(&self, msg: &[u8]) -> Signature {
        let msg = sha256::Hash::hash(msg);
        let msg = Message::from_slice(msg.as_ref()).expect("SHA-256 digests are 32 bytes");
        global_secp().sign_ecdsa(&msg, &self.secret_key)
    }
}

fn read_secret(path: &Path) -> Result<String, WalletError> {
    let contents = fs_err::read_to_string(path).map_err(|source| WalletError::ReadSecret {
        path: path.to_owned(),
        source,
    })?;
    if contents.trim().is_empty() {
        Err(WalletError::EmptySecret {
            path: path.to_owned(),
        })
    } else {
        Ok(contents)
    }
}

fn address_from_public_key(public_key: &[u8]) -> [u8; 20] {
    let sha = sha256::Hash::hash(public_key);
    ripemd160::Hash::hash(sha.as_ref()).into_inner()
}

impl Display for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.address)
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl HasAddress for Wallet {
    fn get_address(&self) -> Address {
        self.address
    }
}
