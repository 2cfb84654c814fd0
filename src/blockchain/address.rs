//! Conversion between EVM hex addresses and bech32 ledger addresses.
//!
//! Both encodings carry the same 20 bytes. The bech32 form re-packs them
//! into 5-bit groups before checksumming under the chain's prefix.

use bech32::primitives::decode::CheckedHrpstring;
use bech32::{Bech32, Fe32, Fe32IterExt, Hrp};
use thiserror::Error;

/// Length in bytes of an account address.
pub const ADDRESS_LEN: usize = 20;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid hex address: {0}")]
    InvalidHex(String),

    #[error("expected {ADDRESS_LEN} address bytes, got {0}")]
    InvalidLength(usize),

    #[error("invalid bech32 prefix '{0}'")]
    InvalidPrefix(String),

    #[error("invalid bech32 address: {0}")]
    Bech32(String),

    #[error("bit conversion failed")]
    BitConversion,
}

/// General power-of-two base conversion.
///
/// Re-packs `data`, read as `from_bits`-wide groups, into `to_bits`-wide
/// groups. Returns `None` when an input value does not fit in `from_bits`,
/// or, with `pad` off, when the trailing bits are not zero padding.
pub fn convert_bits(data: &[u8], from_bits: u32, to_bits: u32, pad: bool) -> Option<Vec<u8>> {
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let maxv: u32 = (1 << to_bits) - 1;
    let max_acc: u32 = (1 << (from_bits + to_bits - 1)) - 1;
    let mut out = Vec::with_capacity(data.len() * from_bits as usize / to_bits as usize + 1);

    for &value in data {
        let value = u32::from(value);
        if value >> from_bits != 0 {
            return None;
        }
        acc = ((acc << from_bits) | value) & max_acc;
        bits += from_bits;
        while bits >= to_bits {
            bits -= to_bits;
            out.push(((acc >> bits) & maxv) as u8);
        }
    }

    if pad {
        if bits > 0 {
            out.push(((acc << (to_bits - bits)) & maxv) as u8);
        }
    } else if bits >= from_bits || (acc << (to_bits - bits)) & maxv != 0 {
        return None;
    }

    Some(out)
}

/// True when `address` looks like a 0x-prefixed 20-byte hex address.
pub fn is_evm_address(address: &str) -> bool {
    address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .is_some_and(|hex| hex.len() == ADDRESS_LEN * 2 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Parse a 0x-prefixed hex address into raw bytes.
pub fn evm_bytes(address: &str) -> Result<[u8; ADDRESS_LEN], AddressError> {
    let hex_part = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .ok_or_else(|| AddressError::InvalidHex(address.to_string()))?;
    let bytes = hex::decode(hex_part).map_err(|e| AddressError::InvalidHex(e.to_string()))?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| AddressError::InvalidLength(bytes.len()))
}

/// Encode raw address bytes as bech32 under `prefix`.
pub fn encode_bech32(prefix: &str, bytes: &[u8]) -> Result<String, AddressError> {
    let hrp = Hrp::parse(prefix).map_err(|_| AddressError::InvalidPrefix(prefix.to_string()))?;
    let words = convert_bits(bytes, 8, 5, true).ok_or(AddressError::BitConversion)?;
    let fes = words
        .into_iter()
        .map(Fe32::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| AddressError::BitConversion)?;

    Ok(fes.into_iter().with_checksum::<Bech32>(&hrp).chars().collect())
}

/// Decode a bech32 address into its prefix and raw bytes.
pub fn decode_bech32(address: &str) -> Result<(String, Vec<u8>), AddressError> {
    let checked = CheckedHrpstring::new::<Bech32>(address)
        .map_err(|e| AddressError::Bech32(e.to_string()))?;
    let words = checked
        .data_part_ascii_no_checksum()
        .iter()
        .map(|&b| Fe32::from_char(b as char).map(Fe32::to_u8))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AddressError::Bech32(e.to_string()))?;
    let bytes = convert_bits(&words, 5, 8, false).ok_or(AddressError::BitConversion)?;

    Ok((checked.hrp().to_lowercase(), bytes))
}

/// Convert an EVM address into the bech32 address with the given prefix.
pub fn to_bech32(prefix: &str, evm_address: &str) -> Result<String, AddressError> {
    let bytes = evm_bytes(evm_address)?;
    encode_bech32(prefix, &bytes)
}

/// Convert a bech32 address into a lowercase 0x-prefixed EVM address.
pub fn to_evm(bech32_address: &str) -> Result<String, AddressError> {
    let (_, bytes) = decode_bech32(bech32_address)?;
    if bytes.len() != ADDRESS_LEN {
        return Err(AddressError::InvalidLength(bytes.len()));
    }
    Ok(format!("0x{}", hex::encode(bytes)))
}

/// Normalize a recipient given in either encoding to EVM hex form.
pub fn normalize_to_evm(address: &str) -> Result<String, AddressError> {
    if is_evm_address(address) {
        Ok(address.to_string())
    } else {
        to_evm(address)
    }
}

/// Canonical form of a recipient given in either encoding: lowercase 0x hex.
pub fn canonical_recipient(address: &str) -> Result<String, AddressError> {
    if is_evm_address(address) {
        Ok(format!("0x{}", hex::encode(evm_bytes(address)?)))
    } else {
        to_evm(address)
    }
}

/// Check that `address` is a well-formed recipient for a chain using `prefix`.
pub fn validate_recipient(address: &str, prefix: &str) -> Result<(), AddressError> {
    if is_evm_address(address) {
        return Ok(());
    }
    let (hrp, bytes) = decode_bech32(address)?;
    if hrp != prefix {
        return Err(AddressError::InvalidPrefix(hrp));
    }
    if bytes.len() != ADDRESS_LEN {
        return Err(AddressError::InvalidLength(bytes.len()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVM: &str = "0x1448b2449076672aCD167b91406c09552101C5C9";
    const MANTRA: &str = "mantra1z3yty3yswenj4ngk0wg5qmqf25ssr3wfqayuhv";

    #[test]
    fn test_to_bech32_fixed() {
        assert_eq!(to_bech32("mantra", EVM).unwrap(), MANTRA);
    }

    #[test]
    fn test_round_trip() {
        let back = to_evm(&to_bech32("mantra", EVM).unwrap()).unwrap();
        assert_eq!(back.to_lowercase(), EVM.to_lowercase());
    }

    #[test]
    fn test_to_evm_fixed() {
        assert_eq!(to_evm(MANTRA).unwrap(), EVM.to_lowercase());
    }

    #[test]
    fn test_convert_bits_rejects_overflow() {
        // 32 does not fit in 5 bits
        assert_eq!(convert_bits(&[1, 32], 5, 8, true), None);
    }

    #[test]
    fn test_convert_bits_padding() {
        // One byte becomes two 5-bit groups when padded
        assert_eq!(convert_bits(&[0xff], 8, 5, true), Some(vec![31, 28]));
        // Without padding the leftover bits must be zero
        assert_eq!(convert_bits(&[31, 28], 5, 8, false), Some(vec![0xff]));
        assert_eq!(convert_bits(&[31, 31], 5, 8, false), None);
    }

    #[test]
    fn test_bad_checksum() {
        let mut corrupted = MANTRA.to_string();
        corrupted.pop();
        corrupted.push('q');
        assert!(matches!(to_evm(&corrupted), Err(AddressError::Bech32(_))));
    }

    #[test]
    fn test_invalid_hex() {
        assert!(to_bech32("mantra", "0x1234").is_err());
        assert!(to_bech32("mantra", "1448b2449076672aCD167b91406c09552101C5C9").is_err());
        assert!(to_bech32("mantra", "0xzz48b2449076672aCD167b91406c09552101C5C9").is_err());
    }

    #[test]
    fn test_normalize_and_validate() {
        assert_eq!(normalize_to_evm(EVM).unwrap(), EVM);
        assert_eq!(normalize_to_evm(MANTRA).unwrap(), EVM.to_lowercase());

        assert!(validate_recipient(MANTRA, "mantra").is_ok());
        assert!(validate_recipient(EVM, "mantra").is_ok());
        assert_eq!(
            validate_recipient(MANTRA, "cosmos"),
            Err(AddressError::InvalidPrefix("mantra".to_string()))
        );
        assert!(validate_recipient("not-an-address", "mantra").is_err());
    }

    #[test]
    fn test_canonical_recipient_merges_encodings() {
        let expected = EVM.to_lowercase();
        let upper = format!("0x{}", EVM[2..].to_uppercase());
        for form in [EVM, expected.as_str(), upper.as_str(), MANTRA] {
            assert_eq!(canonical_recipient(form).unwrap(), expected, "{form}");
        }
        assert!(canonical_recipient("not-an-address").is_err());
    }
}
