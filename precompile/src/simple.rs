//! ECRECOVER, SHA256, RIPEMD160 and IDENTITY.

use ethervm_interpreter::Revision;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use sha2::Digest;
use sha3::Keccak256;

use crate::{left_pad, linear_cost, Precompile, PrecompileError};

pub struct Ecrecover;

impl Precompile for Ecrecover {
	fn gas(&self, _input: &[u8], _rev: Revision) -> u64 {
		3000
	}

	fn run(&self, input: &[u8]) -> Result<Vec<u8>, PrecompileError> {
		let mut offset = 0;
		let input = crate::read_padded(input, &mut offset, 128);

		// v is a full 32-byte word; everything except the last byte
		// must be zero and the byte itself 27 or 28
		if input[32..63] != [0u8; 31] || ![27, 28].contains(&input[63]) {
			return Ok(Vec::new());
		}

		let mut msg = [0u8; 32];
		let mut sig = [0u8; 64];
		msg.copy_from_slice(&input[0..32]);
		sig[0..32].copy_from_slice(&input[64..96]);
		sig[32..64].copy_from_slice(&input[96..128]);

		let recover = || -> Option<Vec<u8>> {
			let mut recid = input[63] - 27;
			let mut sig = Signature::from_bytes((&sig[..]).into()).ok()?;
			// a high-s signature recovers the same key as its
			// normalized form under the flipped parity
			if let Some(normalized) = sig.normalize_s() {
				sig = normalized;
				recid ^= 1;
			}

			let recid = RecoveryId::from_byte(recid)?;
			let pubkey = VerifyingKey::recover_from_prehash(&msg, &sig, recid).ok()?;

			let hash = Keccak256::digest(&pubkey.to_encoded_point(false).as_bytes()[1..]);
			Some(left_pad(&hash[12..], 32))
		};

		// malformed signatures yield an empty result, not an error,
		// so the caller's push-zero path applies
		Ok(recover().unwrap_or_default())
	}
}

pub struct Sha256;

impl Precompile for Sha256 {
	fn gas(&self, input: &[u8], _rev: Revision) -> u64 {
		linear_cost(input.len(), 60, 12)
	}

	fn run(&self, input: &[u8]) -> Result<Vec<u8>, PrecompileError> {
		let hash = sha2::Sha256::digest(input);
		Ok(hash.to_vec())
	}
}

pub struct Ripemd160;

impl Precompile for Ripemd160 {
	fn gas(&self, input: &[u8], _rev: Revision) -> u64 {
		linear_cost(input.len(), 600, 120)
	}

	fn run(&self, input: &[u8]) -> Result<Vec<u8>, PrecompileError> {
		let hash = ripemd::Ripemd160::digest(input);
		Ok(left_pad(&hash, 32))
	}
}

pub struct Identity;

impl Precompile for Identity {
	fn gas(&self, input: &[u8], _rev: Revision) -> u64 {
		linear_cost(input.len(), 15, 3)
	}

	fn run(&self, input: &[u8]) -> Result<Vec<u8>, PrecompileError> {
		Ok(input.to_vec())
	}
}
