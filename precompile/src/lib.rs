//! Fixed-address contracts `0x01..0x09` with protocol-specified gas
//! schedules. Each contract splits into a pure `gas` function, priced
//! before execution, and a `run` function producing the output bytes.
//! The revision gates (Byzantium for `0x05..0x08`, Istanbul for
//! `0x09`) are part of the dispatch surface.

mod blake2;
mod bn256;
mod modexp;
mod simple;

use std::borrow::Cow;

use ethervm_interpreter::{Revision, VmError};
use primitive_types::H160;

pub use crate::blake2::Blake2f;
pub use crate::bn256::{Bn256Add, Bn256Mul, Bn256Pairing};
pub use crate::modexp::ModExp;
pub use crate::simple::{Ecrecover, Identity, Ripemd160, Sha256};

/// Failure produced by a contract's `run` function. Callers consume
/// the frame's entire gas budget on any failure, so the message is
/// diagnostic only.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PrecompileError(pub Cow<'static, str>);

impl From<&'static str> for PrecompileError {
	fn from(msg: &'static str) -> Self {
		PrecompileError(Cow::Borrowed(msg))
	}
}

impl std::fmt::Display for PrecompileError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.0)
	}
}

impl std::error::Error for PrecompileError {}

/// A natively implemented contract.
pub trait Precompile {
	/// Gas charged for `input` under revision `rev`.
	fn gas(&self, input: &[u8], rev: Revision) -> u64;

	/// Execute over `input`.
	fn run(&self, input: &[u8]) -> Result<Vec<u8>, PrecompileError>;
}

const fn address(last: u8) -> H160 {
	H160([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, last])
}

fn contract_index(addr: H160) -> Option<u8> {
	let last = addr.0[19];
	if (1..=9).contains(&last) && addr == address(last) {
		Some(last)
	} else {
		None
	}
}

fn contract_at(addr: H160) -> Option<&'static dyn Precompile> {
	match contract_index(addr)? {
		1 => Some(&Ecrecover),
		2 => Some(&Sha256),
		3 => Some(&Ripemd160),
		4 => Some(&Identity),
		5 => Some(&ModExp),
		6 => Some(&Bn256Add),
		7 => Some(&Bn256Mul),
		8 => Some(&Bn256Pairing),
		9 => Some(&Blake2f),
		_ => None,
	}
}

/// Whether `addr` is a precompiled contract active under `rev`.
pub fn is_precompiled(addr: H160, rev: Revision) -> bool {
	match contract_index(addr) {
		Some(5..=8) => rev >= Revision::Byzantium,
		Some(9) => rev >= Revision::Istanbul,
		Some(_) => true,
		None => false,
	}
}

/// Dispatch a precompiled execution: charge the gas function against
/// the budget, then run. A failing run consumes the whole budget.
pub fn run_precompiled(
	addr: H160,
	input: &[u8],
	gas: u64,
	rev: Revision,
) -> (Vec<u8>, u64, Option<VmError>) {
	let contract = contract_at(addr).expect("dispatch gated on is_precompiled");

	let gas_cost = contract.gas(input, rev);
	if gas < gas_cost {
		return (Vec::new(), 0, Some(VmError::OutOfGas));
	}

	let gas = gas - gas_cost;
	match contract.run(input) {
		Ok(output) => (output, gas, None),
		Err(_) => (Vec::new(), 0, Some(VmError::OutOfGas)),
	}
}

/// `base + word * ceil(len/32)`, the shape shared by the hash
/// contracts and IDENTITY.
fn linear_cost(len: usize, base: u64, word: u64) -> u64 {
	base + (len as u64 + 31) / 32 * word
}

/// Read `size` bytes starting at `*offset`, zero-filling past the end
/// of the input, and advance the cursor.
fn read_padded(input: &[u8], offset: &mut usize, size: usize) -> Vec<u8> {
	let mut buf = vec![0u8; size];

	let start = (*offset).min(input.len());
	let end = (*offset + size).min(input.len());
	buf[..end - start].copy_from_slice(&input[start..end]);

	*offset += size;
	buf
}

fn left_pad(buf: &[u8], n: usize) -> Vec<u8> {
	if buf.len() >= n {
		return buf.to_vec();
	}
	let mut out = vec![0u8; n];
	out[n - buf.len()..].copy_from_slice(buf);
	out
}
