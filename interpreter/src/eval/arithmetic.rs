use primitive_types::{U256, U512};

use crate::i256::I256;
use crate::machine::Machine;
use crate::opcode::Opcode;
use crate::revision::Revision;

pub(crate) fn add(m: &mut Machine, _op: Opcode) {
	let a = m.pop();
	let b = m.pop();
	m.push(a.overflowing_add(b).0);
}

pub(crate) fn mul(m: &mut Machine, _op: Opcode) {
	let a = m.pop();
	let b = m.pop();
	m.push(a.overflowing_mul(b).0);
}

pub(crate) fn sub(m: &mut Machine, _op: Opcode) {
	let a = m.pop();
	let b = m.pop();
	m.push(a.overflowing_sub(b).0);
}

pub(crate) fn div(m: &mut Machine, _op: Opcode) {
	let a = m.pop();
	let b = m.pop();
	if b.is_zero() {
		m.push(U256::zero());
	} else {
		m.push(a / b);
	}
}

pub(crate) fn sdiv(m: &mut Machine, _op: Opcode) {
	let a = I256::from(m.pop());
	let b = I256::from(m.pop());
	m.push(U256::from(a / b));
}

pub(crate) fn rem(m: &mut Machine, _op: Opcode) {
	let a = m.pop();
	let b = m.pop();
	if b.is_zero() {
		m.push(U256::zero());
	} else {
		m.push(a % b);
	}
}

pub(crate) fn srem(m: &mut Machine, _op: Opcode) {
	let a = I256::from(m.pop());
	let b = I256::from(m.pop());
	m.push(U256::from(a % b));
}

pub(crate) fn addmod(m: &mut Machine, _op: Opcode) {
	let a = m.pop();
	let b = m.pop();
	let z = m.pop();

	if z.is_zero() {
		m.push(U256::zero());
	} else {
		let sum = U512::from(a) + U512::from(b);
		let r = sum % U512::from(z);
		m.push(U256::try_from(r).expect("modulus fits a word"));
	}
}

pub(crate) fn mulmod(m: &mut Machine, _op: Opcode) {
	let a = m.pop();
	let b = m.pop();
	let z = m.pop();

	if z.is_zero() {
		m.push(U256::zero());
	} else {
		let r = a.full_mul(b) % U512::from(z);
		m.push(U256::try_from(r).expect("modulus fits a word"));
	}
}

pub(crate) fn exp(m: &mut Machine, _op: Opcode) {
	let mut base = m.pop();
	let exponent = m.pop();

	let per_byte = if m.is_revision(Revision::SpuriousDragon) {
		50
	} else {
		10
	};
	let gas = ((exponent.bits() as u64 + 7) / 8) * per_byte;
	if !m.consume_gas(gas) {
		return;
	}

	// square and multiply over the full 256-bit exponent
	let mut r = U256::one();
	let mut e = exponent;
	while !e.is_zero() {
		if e.bit(0) {
			r = r.overflowing_mul(base).0;
		}
		e = e >> 1;
		base = base.overflowing_mul(base).0;
	}
	m.push(r);
}

pub(crate) fn signextend(m: &mut Machine, _op: Opcode) {
	let ext = m.pop();
	let x = m.pop();

	if ext >= U256::from(32) {
		m.push(x);
		return;
	}

	let bit = ext.low_u64() as usize * 8 + 7;
	let mask = U256::MAX >> (255 - bit);
	if x.bit(bit) {
		m.push(x | !mask);
	} else {
		m.push(x & mask);
	}
}
