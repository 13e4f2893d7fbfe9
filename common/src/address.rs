//! Puzzle hash ↔ bech32m address encoding.
//!
//! Wallets report the selected account as a 32-byte puzzle hash in hex. For
//! display and for the backend's `owner_address` field it is re-encoded as a
//! bech32m string whose human-readable part is the network prefix
//! (`xch` on mainnet, `txch` on testnets).

use bech32::{FromBase32, ToBase32, Variant};

/// Length of a puzzle hash in bytes.
pub const PUZZLE_HASH_LEN: usize = 32;

/// Errors from address encoding and decoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AddressError {
    InvalidHex(String),
    InvalidLength { expected: usize, actual: usize },
    Bech32(String),
    WrongVariant,
    PrefixMismatch { expected: String, actual: String },
}

impl std::fmt::Display for AddressError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidHex(msg) => write!(f, "invalid puzzle hash hex: {msg}"),
            Self::InvalidLength { expected, actual } => {
                write!(f, "puzzle hash must be {expected} bytes, got {actual}")
            }
            Self::Bech32(msg) => write!(f, "bech32 error: {msg}"),
            Self::WrongVariant => write!(f, "address is not bech32m"),
            Self::PrefixMismatch { expected, actual } => {
                write!(f, "address prefix is {actual}, expected {expected}")
            }
        }
    }
}

impl std::error::Error for AddressError {}

/// Strip an optional `0x` prefix from a hex string.
pub fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x").unwrap_or(s)
}

/// Parse a hex puzzle hash (with or without `0x`) into its raw bytes.
pub fn parse_puzzle_hash(puzzle_hash: &str) -> Result<[u8; PUZZLE_HASH_LEN], AddressError> {
    let bytes = hex::decode(strip_hex_prefix(puzzle_hash))
        .map_err(|e| AddressError::InvalidHex(e.to_string()))?;
    <[u8; PUZZLE_HASH_LEN]>::try_from(bytes.as_slice()).map_err(|_| {
        AddressError::InvalidLength {
            expected: PUZZLE_HASH_LEN,
            actual: bytes.len(),
        }
    })
}

/// Encode a puzzle hash as a bech32m address with the given network prefix.
pub fn encode_address(puzzle_hash: &str, prefix: &str) -> Result<String, AddressError> {
    let bytes = parse_puzzle_hash(puzzle_hash)?;
    bech32::encode(prefix, bytes.to_base32(), Variant::Bech32m)
        .map_err(|e| AddressError::Bech32(e.to_string()))
}

/// Decode a bech32m address back to `(prefix, puzzle_hash_hex)`.
pub fn decode_address(address: &str) -> Result<(String, String), AddressError> {
    let (hrp, data, variant) =
        bech32::decode(address).map_err(|e| AddressError::Bech32(e.to_string()))?;
    if variant != Variant::Bech32m {
        return Err(AddressError::WrongVariant);
    }
    let bytes = Vec::<u8>::from_base32(&data).map_err(|e| AddressError::Bech32(e.to_string()))?;
    if bytes.len() != PUZZLE_HASH_LEN {
        return Err(AddressError::InvalidLength {
            expected: PUZZLE_HASH_LEN,
            actual: bytes.len(),
        });
    }
    Ok((hrp, hex::encode(bytes)))
}

/// Decode an address and check it belongs to the expected network.
pub fn decode_address_for(address: &str, prefix: &str) -> Result<String, AddressError> {
    let (hrp, puzzle_hash) = decode_address(address)?;
    if hrp != prefix {
        return Err(AddressError::PrefixMismatch {
            expected: prefix.to_string(),
            actual: hrp,
        });
    }
    Ok(puzzle_hash)
}
