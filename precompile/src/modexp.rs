//! Arbitrary-precision modular exponentiation, priced per EIP-198.

use ethervm_interpreter::Revision;
use num::{BigUint, One, Zero};

use crate::{read_padded, Precompile, PrecompileError};

pub struct ModExp;

/// Lengths past this make the quadratic complexity term dwarf any
/// plausible gas budget, so the exact value never matters; it only
/// bounds the allocations `run` may attempt.
const MAX_LENGTH: u64 = 1 << 20;

fn mult_complexity(x: u128) -> u128 {
	if x <= 64 {
		x * x
	} else if x <= 1024 {
		x * x / 4 + 96 * x - 3072
	} else {
		x * x / 16 + 480 * x - 199_680
	}
}

fn adjusted_exponent_length(exp_len: u64, exp_head: &BigUint) -> u128 {
	let head_bits = if exp_head.is_zero() {
		0
	} else {
		exp_head.bits() - 1
	};

	if exp_len <= 32 {
		head_bits as u128
	} else {
		8 * (exp_len as u128 - 32) + head_bits as u128
	}
}

fn read_length(input: &[u8], offset: &mut usize) -> u64 {
	let word = read_padded(input, offset, 32);
	let value = BigUint::from_bytes_be(&word);

	// anything that does not fit u64 is priced out of existence anyway
	u64::try_from(value).unwrap_or(u64::MAX)
}

impl Precompile for ModExp {
	fn gas(&self, input: &[u8], _rev: Revision) -> u64 {
		let mut offset = 0;
		let base_len = read_length(input, &mut offset);
		let exp_len = read_length(input, &mut offset);
		let mod_len = read_length(input, &mut offset);

		if base_len > MAX_LENGTH || exp_len > MAX_LENGTH || mod_len > MAX_LENGTH {
			return u64::MAX;
		}

		// the first 32 bytes of the exponent drive the iteration count
		let mut head_offset = 96 + base_len as usize;
		let head = read_padded(input, &mut head_offset, exp_len.min(32) as usize);
		let exp_head = BigUint::from_bytes_be(&head);

		let complexity = mult_complexity(base_len.max(mod_len) as u128);
		let iterations = adjusted_exponent_length(exp_len, &exp_head).max(1);

		let cost = complexity.saturating_mul(iterations) / 20;
		u64::try_from(cost).unwrap_or(u64::MAX)
	}

	fn run(&self, input: &[u8]) -> Result<Vec<u8>, PrecompileError> {
		let mut offset = 0;
		let base_len = read_length(input, &mut offset);
		let exp_len = read_length(input, &mut offset);
		let mod_len = read_length(input, &mut offset);

		if base_len > MAX_LENGTH || exp_len > MAX_LENGTH || mod_len > MAX_LENGTH {
			return Err("unreasonably large operand length".into());
		}

		if mod_len == 0 {
			return Ok(Vec::new());
		}

		let base = BigUint::from_bytes_be(&read_padded(input, &mut offset, base_len as usize));
		let exponent = BigUint::from_bytes_be(&read_padded(input, &mut offset, exp_len as usize));
		let modulus = BigUint::from_bytes_be(&read_padded(input, &mut offset, mod_len as usize));

		let r = if modulus.is_zero() || modulus.is_one() {
			BigUint::zero()
		} else {
			base.modpow(&exponent, &modulus)
		};

		// the output is left-padded to exactly the modulus length
		let bytes = r.to_bytes_be();
		let mut out = vec![0u8; mod_len as usize];
		let start = mod_len as usize - bytes.len();
		out[start..].copy_from_slice(&bytes);
		Ok(out)
	}
}
