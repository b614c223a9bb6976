//! Stack manipulation, memory access and control flow.

use primitive_types::U256;

use crate::error::VmError;
use crate::machine::Machine;
use crate::opcode::Opcode;
use crate::util::u256_to_h256;

pub(crate) fn stop(m: &mut Machine, _op: Opcode) {
	m.halt();
}

pub(crate) fn pop(m: &mut Machine, _op: Opcode) {
	m.pop();
}

pub(crate) fn mload(m: &mut Machine, _op: Opcode) {
	let offset = m.pop();

	match m.memory_slice(offset, U256::from(32)) {
		Some(word) => m.push(U256::from_big_endian(&word)),
		None => (),
	}
}

pub(crate) fn mstore(m: &mut Machine, _op: Opcode) {
	let offset = m.pop();
	let value = m.pop();

	if !m.check_memory(offset, U256::from(32)) {
		return;
	}

	let o = offset.low_u64() as usize;
	let word = u256_to_h256(value);
	m.memory[o..o + 32].copy_from_slice(word.as_bytes());
}

pub(crate) fn mstore8(m: &mut Machine, _op: Opcode) {
	let offset = m.pop();
	let value = m.pop();

	if !m.check_memory(offset, U256::one()) {
		return;
	}

	m.memory[offset.low_u64() as usize] = (value.low_u64() & 0xff) as u8;
}

pub(crate) fn jump(m: &mut Machine, _op: Opcode) {
	let dest = m.pop();

	if m.valid_jumpdest(dest) {
		// the loop post-increments unconditionally
		m.ip = dest.low_u64() as isize - 1;
	} else {
		m.exit(VmError::InvalidJump);
	}
}

pub(crate) fn jumpi(m: &mut Machine, _op: Opcode) {
	let dest = m.pop();
	let cond = m.pop();

	if !cond.is_zero() {
		if m.valid_jumpdest(dest) {
			m.ip = dest.low_u64() as isize - 1;
		} else {
			m.exit(VmError::InvalidJump);
		}
	}
}

pub(crate) fn jumpdest(_m: &mut Machine, _op: Opcode) {}

pub(crate) fn push(m: &mut Machine, op: Opcode) {
	let n = op.is_push().expect("push opcodes carry an immediate") as usize;
	let ip = m.ip as usize;

	let mut buf = [0u8; 32];
	let start = (ip + 1).min(m.code.len());
	let end = (ip + 1 + n).min(m.code.len());
	buf[32 - n..32 - n + (end - start)].copy_from_slice(&m.code[start..end]);

	m.push(U256::from_big_endian(&buf[32 - n..]));
	m.ip += n as isize;
}

pub(crate) fn dup(m: &mut Machine, op: Opcode) {
	let n = (op.0 - Opcode::DUP1.0 + 1) as usize;

	if m.stack.len() < n {
		m.exit(VmError::StackUnderflow);
		return;
	}
	let value = m.stack.peek_at(n);
	m.push(value);
}

pub(crate) fn swap(m: &mut Machine, op: Opcode) {
	let n = (op.0 - Opcode::SWAP1.0 + 1) as usize;

	if m.stack.len() < n + 1 {
		m.exit(VmError::StackUnderflow);
		return;
	}
	m.stack.swap(n);
}
