//! Small conversions between stack words and fixed-width byte arrays.

use primitive_types::{H160, H256, U256};

/// Convert a word into a 32-byte big-endian hash.
#[inline]
pub fn u256_to_h256(v: U256) -> H256 {
	let mut bytes = [0u8; 32];
	v.to_big_endian(&mut bytes);
	H256(bytes)
}

/// Convert a 32-byte big-endian hash into a word.
#[inline]
pub fn h256_to_u256(v: H256) -> U256 {
	U256::from_big_endian(v.as_bytes())
}

/// Truncate a word to its low 20 bytes, as addresses are read off the
/// stack.
#[inline]
pub fn u256_to_address(v: U256) -> H160 {
	let mut bytes = [0u8; 32];
	v.to_big_endian(&mut bytes);
	H160::from_slice(&bytes[12..])
}

/// Zero-extend an address into a word.
#[inline]
pub fn address_to_u256(v: H160) -> U256 {
	U256::from_big_endian(v.as_bytes())
}
