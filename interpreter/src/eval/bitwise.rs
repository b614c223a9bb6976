use primitive_types::U256;

use crate::error::VmError;
use crate::i256::{I256, Sign};
use crate::machine::Machine;
use crate::opcode::Opcode;
use crate::revision::Revision;

fn bool_word(b: bool) -> U256 {
	if b {
		U256::one()
	} else {
		U256::zero()
	}
}

pub(crate) fn lt(m: &mut Machine, _op: Opcode) {
	let a = m.pop();
	let b = m.pop();
	m.push(bool_word(a < b));
}

pub(crate) fn gt(m: &mut Machine, _op: Opcode) {
	let a = m.pop();
	let b = m.pop();
	m.push(bool_word(a > b));
}

pub(crate) fn slt(m: &mut Machine, _op: Opcode) {
	let a = I256::from(m.pop());
	let b = I256::from(m.pop());
	m.push(bool_word(a < b));
}

pub(crate) fn sgt(m: &mut Machine, _op: Opcode) {
	let a = I256::from(m.pop());
	let b = I256::from(m.pop());
	m.push(bool_word(a > b));
}

pub(crate) fn eq(m: &mut Machine, _op: Opcode) {
	let a = m.pop();
	let b = m.pop();
	m.push(bool_word(a == b));
}

pub(crate) fn iszero(m: &mut Machine, _op: Opcode) {
	let a = m.pop();
	m.push(bool_word(a.is_zero()));
}

pub(crate) fn and(m: &mut Machine, _op: Opcode) {
	let a = m.pop();
	let b = m.pop();
	m.push(a & b);
}

pub(crate) fn or(m: &mut Machine, _op: Opcode) {
	let a = m.pop();
	let b = m.pop();
	m.push(a | b);
}

pub(crate) fn xor(m: &mut Machine, _op: Opcode) {
	let a = m.pop();
	let b = m.pop();
	m.push(a ^ b);
}

pub(crate) fn not(m: &mut Machine, _op: Opcode) {
	let a = m.pop();
	m.push(!a);
}

pub(crate) fn byte(m: &mut Machine, _op: Opcode) {
	let i = m.pop();
	let x = m.pop();

	if i > U256::from(31) {
		m.push(U256::zero());
	} else {
		let shift = (31 - i.low_u64()) * 8;
		m.push((x >> shift as usize) & U256::from(0xff));
	}
}

pub(crate) fn shl(m: &mut Machine, _op: Opcode) {
	if !m.is_revision(Revision::Constantinople) {
		m.exit(VmError::OpcodeNotFound);
		return;
	}

	let shift = m.pop();
	let value = m.pop();

	if shift > U256::from(255) {
		m.push(U256::zero());
	} else {
		m.push(value << shift.low_u64() as usize);
	}
}

pub(crate) fn shr(m: &mut Machine, _op: Opcode) {
	if !m.is_revision(Revision::Constantinople) {
		m.exit(VmError::OpcodeNotFound);
		return;
	}

	let shift = m.pop();
	let value = m.pop();

	if shift > U256::from(255) {
		m.push(U256::zero());
	} else {
		m.push(value >> shift.low_u64() as usize);
	}
}

pub(crate) fn sar(m: &mut Machine, _op: Opcode) {
	if !m.is_revision(Revision::Constantinople) {
		m.exit(VmError::OpcodeNotFound);
		return;
	}

	let shift = m.pop();
	let value = I256::from(m.pop());

	if shift > U256::from(255) {
		match value.0 {
			Sign::Plus | Sign::Zero => m.push(U256::zero()),
			Sign::Minus => m.push(U256::MAX),
		}
		return;
	}

	let shift = shift.low_u64() as usize;
	match value.0 {
		Sign::Plus | Sign::Zero => m.push(value.1 >> shift),
		Sign::Minus => {
			// arithmetic shift of a negative: shift the offset-by-one
			// magnitude so the result rounds towards minus infinity
			let shifted = ((value.1.overflowing_sub(U256::one()).0) >> shift)
				.overflowing_add(U256::one())
				.0;
			m.push(U256::from(I256(Sign::Minus, shifted)));
		}
	}
}
