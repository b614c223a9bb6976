//! Instructions with host side effects: hashing, storage, logs,
//! nested frames and frame termination.

use primitive_types::{H160, H256, U256};
use sha3::{Digest, Keccak256};

use crate::error::VmError;
use crate::host::{CallKind, StorageStatus};
use crate::machine::Machine;
use crate::opcode::Opcode;
use crate::revision::Revision;
use crate::util::{address_to_u256, h256_to_u256, u256_to_h256};

const SHA3_WORD_GAS: u64 = 6;
const CALL_DEPTH_LIMIT: usize = 1024;

pub(crate) fn sha3(m: &mut Machine, _op: Opcode) {
	let offset = m.pop();
	let length = m.pop();

	let data = match m.memory_slice(offset, length) {
		Some(data) => data,
		None => return,
	};

	let size = length.low_u64();
	if !m.consume_gas(((size + 31) / 32) * SHA3_WORD_GAS) {
		return;
	}

	let hash = Keccak256::digest(&data);
	m.push(U256::from_big_endian(&hash));
}

pub(crate) fn sload(m: &mut Machine, _op: Opcode) {
	let loc = m.pop();

	let gas = if m.is_revision(Revision::Istanbul) {
		800
	} else if m.is_revision(Revision::TangerineWhistle) {
		200
	} else {
		50
	};
	if !m.consume_gas(gas) {
		return;
	}

	let value = m.host.get_storage(m.address, u256_to_h256(loc));
	m.push(h256_to_u256(value));
}

pub(crate) fn sstore(m: &mut Machine, _op: Opcode) {
	if m.in_static_call() {
		m.exit(VmError::WriteProtection);
		return;
	}

	// EIP-1706: reject writes that would leave less than the stipend
	if m.is_revision(Revision::Istanbul) && m.gas <= 2300 {
		m.exit(VmError::OutOfGas);
		return;
	}

	let key = m.pop_h256();
	let value = m.pop_h256();

	let legacy_gas_metering = !m.is_revision(Revision::Istanbul)
		&& (m.is_revision(Revision::Petersburg) || !m.is_revision(Revision::Constantinople));

	let status = m.host.set_storage(m.address, key, value);

	let cost = match status {
		StorageStatus::Unchanged | StorageStatus::ModifiedAgain => {
			if m.is_revision(Revision::Istanbul) {
				800
			} else if legacy_gas_metering {
				5000
			} else {
				200
			}
		}
		StorageStatus::Modified | StorageStatus::Deleted => 5000,
		StorageStatus::Added => 20000,
	};
	m.consume_gas(cost);
}

pub(crate) fn log(m: &mut Machine, op: Opcode) {
	let topic_count = (op.0 - Opcode::LOG0.0) as usize;

	if m.in_static_call() {
		m.exit(VmError::WriteProtection);
		return;
	}

	if m.stack.len() < 2 + topic_count {
		m.exit(VmError::StackUnderflow);
		return;
	}

	let offset = m.pop();
	let size = m.pop();

	let mut topics = Vec::with_capacity(topic_count);
	for _ in 0..topic_count {
		topics.push(m.pop_h256());
	}

	let data = match m.memory_slice(offset, size) {
		Some(data) => data,
		None => return,
	};

	if !m.consume_gas(topic_count as u64 * 375) {
		return;
	}
	if !m.consume_gas(size.low_u64() * 8) {
		return;
	}

	let address = m.address;
	m.host.emit_log(address, topics, data);
}

pub(crate) fn selfdestruct(m: &mut Machine, _op: Opcode) {
	if m.in_static_call() {
		m.exit(VmError::WriteProtection);
		return;
	}

	let beneficiary = m.pop_address();

	let mut gas = 0;
	if m.is_revision(Revision::TangerineWhistle) {
		gas = 5000;
		if m.rev == Revision::TangerineWhistle || !m.host.get_balance(m.address).is_zero() {
			if !m.host.account_exists(beneficiary) {
				gas += 25000;
			}
		}
	}
	if !m.consume_gas(gas) {
		return;
	}

	let address = m.address;
	m.host.selfdestruct(address, beneficiary);
	m.halt();
}

pub(crate) fn halt(m: &mut Machine, op: Opcode) {
	if op == Opcode::REVERT && !m.is_revision(Revision::Byzantium) {
		m.exit(VmError::OpcodeNotFound);
		return;
	}

	let offset = m.pop();
	let size = m.pop();

	match m.memory_slice(offset, size) {
		Some(data) => m.ret = data,
		None => return,
	}

	if op == Opcode::REVERT {
		m.exit(VmError::ExecutionReverted);
	} else {
		m.halt();
	}
}

fn op_to_call_kind(op: Opcode) -> CallKind {
	match op {
		Opcode::CALL | Opcode::STATICCALL => CallKind::Call,
		Opcode::CALLCODE => CallKind::CallCode,
		Opcode::DELEGATECALL => CallKind::DelegateCall,
		Opcode::CREATE => CallKind::Create,
		Opcode::CREATE2 => CallKind::Create2,
		_ => panic!("opcode {:?} is not a call", op),
	}
}

pub(crate) fn create(m: &mut Machine, op: Opcode) {
	if m.in_static_call() {
		m.exit(VmError::WriteProtection);
		return;
	}

	if op == Opcode::CREATE2 && !m.is_revision(Revision::Constantinople) {
		m.exit(VmError::OpcodeNotFound);
		return;
	}

	m.reset_return_data();

	let value = m.pop();
	let offset = m.pop();
	let length = m.pop();

	let salt = if op == Opcode::CREATE2 {
		m.pop()
	} else {
		U256::zero()
	};

	let input = match m.memory_slice(offset, length) {
		Some(input) => input,
		None => {
			m.push(U256::zero());
			return;
		}
	};

	if !value.is_zero() && m.host.get_balance(m.address) < value {
		m.push(U256::zero());
		return;
	}

	if op == Opcode::CREATE2 {
		// init code is hashed for the address derivation
		let size = length.low_u64();
		if !m.consume_gas(((size + 31) / 32) * SHA3_WORD_GAS) {
			m.push(U256::zero());
			return;
		}
	}

	// CREATE2 always applies the EIP-150 reservation
	let mut gas = m.gas;
	if m.is_revision(Revision::TangerineWhistle) || op == Opcode::CREATE2 {
		gas -= gas / 64;
	}

	if !m.consume_gas(gas) {
		m.push(U256::zero());
		return;
	}

	if m.depth >= CALL_DEPTH_LIMIT {
		m.push(U256::zero());
		m.gas += gas;
		return;
	}

	let kind = op_to_call_kind(op);
	let address = m.address;
	let depth = m.depth;
	let result = m.host.call(
		kind,
		H160::zero(),
		address,
		value,
		&input,
		gas,
		depth + 1,
		false,
		u256_to_h256(salt),
		H160::zero(),
	);

	if result.error.is_some() {
		m.push(U256::zero());
	} else {
		m.push(address_to_u256(result.create_address));
	}

	m.gas += result.gas_left;
	m.return_data = result.output;
}

pub(crate) fn call(m: &mut Machine, op: Opcode) {
	m.reset_return_data();

	if op == Opcode::CALL && m.in_static_call() {
		if !m.stack.peek_at(3).is_zero() {
			m.exit(VmError::WriteProtection);
			return;
		}
	}

	if op == Opcode::DELEGATECALL && !m.is_revision(Revision::Homestead) {
		m.exit(VmError::OpcodeNotFound);
		return;
	}
	if op == Opcode::STATICCALL && !m.is_revision(Revision::Byzantium) {
		m.exit(VmError::OpcodeNotFound);
		return;
	}

	let kind = op_to_call_kind(op);

	let initial_gas = m.pop();
	let addr = m.pop_address();

	let mut value = if op == Opcode::CALL || op == Opcode::CALLCODE {
		m.pop()
	} else {
		U256::zero()
	};

	let in_offset = m.pop();
	let in_size = m.pop();
	let ret_offset = m.pop();
	let ret_size = m.pop();

	let args = match m.memory_slice(in_offset, in_size) {
		Some(args) => args,
		None => return,
	};
	if !m.check_memory(ret_offset, ret_size) {
		return;
	}

	let mut gas_cost: u64 = if m.is_revision(Revision::TangerineWhistle) {
		700
	} else {
		40
	};

	let transfers_value = (op == Opcode::CALL || op == Opcode::CALLCODE) && !value.is_zero();

	if op == Opcode::CALL {
		if (transfers_value || m.rev < Revision::SpuriousDragon) && !m.host.account_exists(addr) {
			gas_cost += 25000;
		}
	}
	if transfers_value {
		gas_cost += 9000;
	}

	let requested_fits = initial_gas.bits() <= 64;
	let mut gas: u64;
	if m.is_revision(Revision::TangerineWhistle) {
		let mut available = m.gas.saturating_sub(gas_cost);
		available -= available / 64;

		if !requested_fits || available < initial_gas.low_u64() {
			gas = available;
		} else {
			gas = initial_gas.low_u64();
		}
	} else {
		if !requested_fits {
			m.exit(VmError::OutOfGas);
			return;
		}
		gas = initial_gas.low_u64();
	}

	let gas_cost = match gas_cost.checked_add(gas) {
		Some(total) => total,
		None => {
			m.exit(VmError::OutOfGas);
			return;
		}
	};
	if !m.consume_gas(gas_cost) {
		return;
	}
	if transfers_value {
		gas += 2300;
	}

	let mut caller = m.address;
	let mut to = addr;
	let code_address = addr;
	let is_static = op == Opcode::STATICCALL || m.is_static;

	if op == Opcode::CALLCODE || op == Opcode::DELEGATECALL {
		to = m.address;
		if op == Opcode::DELEGATECALL {
			value = m.value;
			caller = m.caller;
		}
	}

	if transfers_value && m.host.get_balance(m.address) < value {
		m.gas += gas;
		m.push(U256::zero());
		return;
	}

	if m.depth >= CALL_DEPTH_LIMIT {
		m.push(U256::zero());
		m.gas += gas;
		return;
	}

	let depth = m.depth;
	let result = m.host.call(
		kind,
		to,
		caller,
		value,
		&args,
		gas,
		depth + 1,
		is_static,
		H256::zero(),
		code_address,
	);

	if result.error.is_some() {
		m.push(U256::zero());
	} else {
		m.push(U256::one());
	}

	if !result.output.is_empty() {
		let offset = ret_offset.low_u64() as usize;
		let size = ret_size.low_u64() as usize;
		let n = size.min(result.output.len());
		m.memory[offset..offset + n].copy_from_slice(&result.output[..n]);
	}

	m.gas += result.gas_left;
	m.return_data = result.output;
}
