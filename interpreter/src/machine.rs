use primitive_types::{H160, H256, U256};

use crate::bitmap::CodeBitmap;
use crate::dispatch::TABLE;
use crate::error::VmError;
use crate::host::Host;
use crate::opcode::Opcode;
use crate::revision::Revision;
use crate::stack::{Stack, STACK_LIMIT};
use crate::util::{u256_to_address, u256_to_h256};

/// Memory offsets and sizes past this value always exhaust the gas
/// budget, so they are rejected up front as overflows.
const MAX_MEMORY_RANGE: u64 = 0xffff_ffff_e0;

/// A single call frame: bytecode, stack, memory and the gas meter,
/// executing against a [Host].
pub struct Machine<'h> {
	pub(crate) ip: isize,
	pub(crate) code: Vec<u8>,
	pub(crate) stack: Stack,
	pub(crate) memory: Vec<u8>,
	pub(crate) last_gas_cost: u64,
	pub(crate) gas: u64,
	pub(crate) bitmap: CodeBitmap,
	pub(crate) return_data: Vec<u8>,
	pub(crate) ret: Vec<u8>,
	pub(crate) err: Option<VmError>,
	pub(crate) stop: bool,

	pub(crate) address: H160,
	pub(crate) caller: H160,
	pub(crate) value: U256,
	pub(crate) input: Vec<u8>,
	pub(crate) depth: usize,
	pub(crate) is_static: bool,

	pub(crate) rev: Revision,
	pub(crate) host: &'h mut dyn Host,
}

impl<'h> Machine<'h> {
	#[allow(clippy::too_many_arguments)]
	pub fn new(
		host: &'h mut dyn Host,
		rev: Revision,
		code: Vec<u8>,
		input: Vec<u8>,
		gas: u64,
		address: H160,
		caller: H160,
		value: U256,
		depth: usize,
		is_static: bool,
	) -> Self {
		let bitmap = CodeBitmap::for_code(&code);
		Machine {
			ip: 0,
			code,
			stack: Stack::new(),
			memory: Vec::new(),
			last_gas_cost: 0,
			gas,
			bitmap,
			return_data: Vec::new(),
			ret: Vec::new(),
			err: None,
			stop: false,
			address,
			caller,
			value,
			input,
			depth,
			is_static,
			rev,
			host,
		}
	}

	/// Dispatch loop. Exits with the `RETURN`/`REVERT` payload and the
	/// frame error, if any.
	pub fn run(&mut self) -> (Vec<u8>, Option<VmError>) {
		let code_size = self.code.len() as isize;

		while !self.stop {
			if self.ip >= code_size {
				self.halt();
				break;
			}

			let op = Opcode(self.code[self.ip as usize]);

			let inst = match TABLE[op.as_usize()] {
				Some(inst) => inst,
				None => {
					self.exit(VmError::OpcodeNotFound);
					break;
				}
			};
			if self.stack.len() < inst.stack {
				self.exit(VmError::StackUnderflow);
				break;
			}
			if !self.consume_gas(inst.gas) {
				break;
			}

			(inst.exec)(self, op);

			if self.stack.len() > STACK_LIMIT {
				self.exit(VmError::StackOverflow);
				break;
			}
			self.ip += 1;
		}

		(self.ret.clone(), self.err)
	}

	#[inline]
	pub fn gas(&self) -> u64 {
		self.gas
	}

	#[inline]
	pub(crate) fn is_revision(&self, rev: Revision) -> bool {
		self.rev >= rev
	}

	pub(crate) fn halt(&mut self) {
		self.stop = true;
	}

	pub(crate) fn exit(&mut self, err: VmError) {
		self.stop = true;
		self.err = Some(err);
	}

	/// Deduct gas; on shortfall the frame halts with `OutOfGas`.
	#[inline]
	pub(crate) fn consume_gas(&mut self, gas: u64) -> bool {
		if self.gas < gas {
			self.exit(VmError::OutOfGas);
			return false;
		}
		self.gas -= gas;
		true
	}

	#[inline]
	pub(crate) fn push(&mut self, value: U256) {
		self.stack.push(value);
	}

	#[inline]
	pub(crate) fn pop(&mut self) -> U256 {
		self.stack.pop()
	}

	#[inline]
	pub(crate) fn pop_address(&mut self) -> H160 {
		u256_to_address(self.stack.pop())
	}

	#[inline]
	pub(crate) fn pop_h256(&mut self) -> H256 {
		u256_to_h256(self.stack.pop())
	}

	pub(crate) fn reset_return_data(&mut self) {
		self.return_data.clear();
	}

	pub(crate) fn in_static_call(&self) -> bool {
		self.is_static
	}

	/// Whether `dest` passes all three jump checks: bounded bit-length,
	/// an instruction start, and an actual `JUMPDEST` byte.
	pub(crate) fn valid_jumpdest(&self, dest: U256) -> bool {
		if dest.bits() >= 63 {
			return false;
		}
		let udest = dest.low_u64() as usize;
		if udest >= self.code.len() {
			return false;
		}
		self.bitmap.is_set(udest) && self.code[udest] == Opcode::JUMPDEST.0
	}

	/// Grow memory to cover `[offset, offset+size)`, charging the
	/// incremental quadratic cost. Zero-size ranges are free and do not
	/// grow memory. Returns false (with the frame halted) on gas
	/// overflow or exhaustion.
	pub(crate) fn check_memory(&mut self, offset: U256, size: U256) -> bool {
		if size.is_zero() {
			return true;
		}

		if offset.bits() > 64 || size.bits() > 64 {
			self.exit(VmError::GasUintOverflow);
			return false;
		}

		let o = offset.low_u64();
		let s = size.low_u64();

		if o > MAX_MEMORY_RANGE || s > MAX_MEMORY_RANGE {
			self.exit(VmError::GasUintOverflow);
			return false;
		}

		let new_size = o + s;
		if (self.memory.len() as u64) < new_size {
			let w = (new_size + 31) / 32;
			let new_cost = 3 * w + w * w / 512;
			let cost = new_cost - self.last_gas_cost;
			self.last_gas_cost = new_cost;

			if !self.consume_gas(cost) {
				return false;
			}
			self.memory.resize((w * 32) as usize, 0);
		}
		true
	}

	/// Copy the memory range `[offset, offset+size)` out of the frame,
	/// growing (and charging for) memory first.
	pub(crate) fn memory_slice(&mut self, offset: U256, size: U256) -> Option<Vec<u8>> {
		if size.is_zero() {
			return Some(Vec::new());
		}

		if !self.check_memory(offset, size) {
			return None;
		}

		let o = offset.low_u64() as usize;
		let s = size.low_u64() as usize;
		Some(self.memory[o..o + s].to_vec())
	}

	/// Write `size` bytes of `src` starting at `src_offset` into memory
	/// at `mem_offset`, zero-filling whatever the source cannot cover.
	/// The destination range must already be within memory bounds.
	pub(crate) fn write_padded(&mut self, mem_offset: u64, src: &[u8], size: u64, src_offset: U256) {
		let dst = &mut self.memory[mem_offset as usize..(mem_offset + size) as usize];

		if src_offset.bits() > 64 {
			dst.fill(0);
			return;
		}

		let src_len = src.len() as u64;
		let begin = src_offset.low_u64().min(src_len);
		let copy_size = size.min(src_len - begin);

		if copy_size > 0 {
			dst[..copy_size as usize]
				.copy_from_slice(&src[begin as usize..(begin + copy_size) as usize]);
		}
		dst[copy_size as usize..].fill(0);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::host::{CallKind, CallOutput, StorageStatus, TxContext};

	pub(crate) struct NullHost;

	impl Host for NullHost {
		fn account_exists(&self, _address: H160) -> bool {
			false
		}
		fn get_storage(&self, _address: H160, _key: H256) -> H256 {
			H256::zero()
		}
		fn set_storage(&mut self, _address: H160, _key: H256, _value: H256) -> StorageStatus {
			StorageStatus::Unchanged
		}
		fn get_balance(&self, _address: H160) -> U256 {
			U256::zero()
		}
		fn get_code(&self, _address: H160) -> Vec<u8> {
			Vec::new()
		}
		fn get_code_size(&self, _address: H160) -> usize {
			0
		}
		fn get_code_hash(&self, _address: H160) -> H256 {
			H256::zero()
		}
		fn selfdestruct(&mut self, _address: H160, _beneficiary: H160) {}
		fn emit_log(&mut self, _address: H160, _topics: Vec<H256>, _data: Vec<u8>) {}
		fn get_tx_context(&self) -> TxContext {
			TxContext::default()
		}
		fn get_block_hash(&self, _number: i64) -> H256 {
			H256::zero()
		}
		fn call(
			&mut self,
			_kind: CallKind,
			_recipient: H160,
			_sender: H160,
			_value: U256,
			_input: &[u8],
			gas: u64,
			_depth: usize,
			_is_static: bool,
			_salt: H256,
			_code_address: H160,
		) -> CallOutput {
			CallOutput {
				output: Vec::new(),
				gas_left: gas,
				create_address: H160::zero(),
				error: None,
			}
		}
	}

	fn machine<'h>(host: &'h mut dyn Host, code: &[u8], gas: u64) -> Machine<'h> {
		Machine::new(
			host,
			Revision::Istanbul,
			code.to_vec(),
			Vec::new(),
			gas,
			H160::zero(),
			H160::zero(),
			U256::zero(),
			0,
			false,
		)
	}

	#[test]
	fn memory_expansion_charges_incrementally() {
		let mut host = NullHost;
		let mut m = machine(&mut host, &[], 1_000);

		// one word: 3*1 + 1/512 = 3
		assert!(m.check_memory(U256::zero(), U256::from(32)));
		assert_eq!(m.gas, 997);
		assert_eq!(m.memory.len(), 32);

		// growing to two words only charges the difference
		assert!(m.check_memory(U256::from(32), U256::from(32)));
		assert_eq!(m.gas, 994);
		assert_eq!(m.memory.len(), 64);

		// already covered: free
		assert!(m.check_memory(U256::zero(), U256::from(64)));
		assert_eq!(m.gas, 994);
	}

	#[test]
	fn zero_size_access_is_free() {
		let mut host = NullHost;
		let mut m = machine(&mut host, &[], 10);

		assert!(m.check_memory(U256::MAX, U256::zero()));
		assert_eq!(m.gas, 10);
		assert!(m.memory.is_empty());
	}

	#[test]
	fn oversized_range_is_gas_overflow() {
		let mut host = NullHost;
		let mut m = machine(&mut host, &[], u64::MAX);

		assert!(!m.check_memory(U256::from(0xffff_ffff_e1u64), U256::one()));
		assert_eq!(m.err, Some(VmError::GasUintOverflow));
	}

	#[test]
	fn jumpdest_inside_push_immediate_is_invalid() {
		let mut host = NullHost;
		// PUSH1 0x5b; JUMPDEST
		let m = machine(&mut host, &[0x60, 0x5b, 0x5b], 0);

		assert!(!m.valid_jumpdest(U256::from(1)));
		assert!(m.valid_jumpdest(U256::from(2)));
		assert!(!m.valid_jumpdest(U256::from(3)));
		assert!(!m.valid_jumpdest(U256::one() << 64));
	}
}
