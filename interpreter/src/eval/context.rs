//! Environment and data-copy instructions.

use primitive_types::U256;

use crate::error::VmError;
use crate::machine::Machine;
use crate::opcode::Opcode;
use crate::revision::Revision;
use crate::util::{address_to_u256, h256_to_u256};

const COPY_WORD_GAS: u64 = 3;

pub(crate) fn address(m: &mut Machine, _op: Opcode) {
	let a = m.address;
	m.push(address_to_u256(a));
}

pub(crate) fn balance(m: &mut Machine, _op: Opcode) {
	let addr = m.pop_address();

	let gas = if m.is_revision(Revision::Istanbul) {
		700
	} else if m.is_revision(Revision::TangerineWhistle) {
		400
	} else {
		20
	};
	if !m.consume_gas(gas) {
		return;
	}

	let balance = m.host.get_balance(addr);
	m.push(balance);
}

pub(crate) fn selfbalance(m: &mut Machine, _op: Opcode) {
	if !m.is_revision(Revision::Istanbul) {
		m.exit(VmError::OpcodeNotFound);
		return;
	}

	let balance = m.host.get_balance(m.address);
	m.push(balance);
}

pub(crate) fn chainid(m: &mut Machine, _op: Opcode) {
	if !m.is_revision(Revision::Istanbul) {
		m.exit(VmError::OpcodeNotFound);
		return;
	}

	let chain_id = m.host.get_tx_context().chain_id;
	m.push(U256::from(chain_id));
}

pub(crate) fn origin(m: &mut Machine, _op: Opcode) {
	let origin = m.host.get_tx_context().origin;
	m.push(address_to_u256(origin));
}

pub(crate) fn caller(m: &mut Machine, _op: Opcode) {
	let c = m.caller;
	m.push(address_to_u256(c));
}

pub(crate) fn callvalue(m: &mut Machine, _op: Opcode) {
	let v = m.value;
	m.push(v);
}

pub(crate) fn calldataload(m: &mut Machine, _op: Opcode) {
	let offset = m.pop();

	let mut buf = [0u8; 32];
	read_padded(&mut buf, &m.input, offset);
	m.push(U256::from_big_endian(&buf));
}

pub(crate) fn calldatasize(m: &mut Machine, _op: Opcode) {
	let len = m.input.len();
	m.push(U256::from(len));
}

pub(crate) fn calldatacopy(m: &mut Machine, _op: Opcode) {
	let mem_offset = m.pop();
	let data_offset = m.pop();
	let length = m.pop();

	if !m.check_memory(mem_offset, length) {
		return;
	}

	let size = length.low_u64();
	if !m.consume_gas(((size + 31) / 32) * COPY_WORD_GAS) {
		return;
	}

	if size != 0 {
		let input = core::mem::take(&mut m.input);
		m.write_padded(mem_offset.low_u64(), &input, size, data_offset);
		m.input = input;
	}
}

pub(crate) fn codesize(m: &mut Machine, _op: Opcode) {
	let len = m.code.len();
	m.push(U256::from(len));
}

pub(crate) fn codecopy(m: &mut Machine, _op: Opcode) {
	let mem_offset = m.pop();
	let data_offset = m.pop();
	let length = m.pop();

	if !m.check_memory(mem_offset, length) {
		return;
	}

	let size = length.low_u64();
	if !m.consume_gas(((size + 31) / 32) * COPY_WORD_GAS) {
		return;
	}

	if size != 0 {
		let code = core::mem::take(&mut m.code);
		m.write_padded(mem_offset.low_u64(), &code, size, data_offset);
		m.code = code;
	}
}

pub(crate) fn extcodesize(m: &mut Machine, _op: Opcode) {
	let addr = m.pop_address();

	let gas = if m.is_revision(Revision::TangerineWhistle) {
		700
	} else {
		20
	};
	if !m.consume_gas(gas) {
		return;
	}

	let size = m.host.get_code_size(addr);
	m.push(U256::from(size));
}

pub(crate) fn extcodecopy(m: &mut Machine, _op: Opcode) {
	let addr = m.pop_address();
	let mem_offset = m.pop();
	let code_offset = m.pop();
	let length = m.pop();

	if !m.check_memory(mem_offset, length) {
		return;
	}

	let size = length.low_u64();
	if !m.consume_gas(((size + 31) / 32) * COPY_WORD_GAS) {
		return;
	}

	let gas = if m.is_revision(Revision::TangerineWhistle) {
		700
	} else {
		20
	};
	if !m.consume_gas(gas) {
		return;
	}

	let code = m.host.get_code(addr);
	if size != 0 {
		m.write_padded(mem_offset.low_u64(), &code, size, code_offset);
	}
}

pub(crate) fn extcodehash(m: &mut Machine, _op: Opcode) {
	if !m.is_revision(Revision::Constantinople) {
		m.exit(VmError::OpcodeNotFound);
		return;
	}

	let addr = m.pop_address();

	let gas = if m.is_revision(Revision::Istanbul) {
		700
	} else {
		400
	};
	if !m.consume_gas(gas) {
		return;
	}

	let hash = m.host.get_code_hash(addr);
	m.push(h256_to_u256(hash));
}

pub(crate) fn gasprice(m: &mut Machine, _op: Opcode) {
	let price = m.host.get_tx_context().gas_price;
	m.push(price);
}

pub(crate) fn returndatasize(m: &mut Machine, _op: Opcode) {
	if !m.is_revision(Revision::Byzantium) {
		m.exit(VmError::OpcodeNotFound);
		return;
	}

	let len = m.return_data.len();
	m.push(U256::from(len));
}

pub(crate) fn returndatacopy(m: &mut Machine, _op: Opcode) {
	if !m.is_revision(Revision::Byzantium) {
		m.exit(VmError::OpcodeNotFound);
		return;
	}

	let mem_offset = m.pop();
	let data_offset = m.pop();
	let length = m.pop();

	if !m.check_memory(mem_offset, length) {
		return;
	}

	let size = length.low_u64();
	if !m.consume_gas(((size + 31) / 32) * COPY_WORD_GAS) {
		return;
	}

	let end = match data_offset.checked_add(length) {
		Some(end) if end.bits() <= 64 => end.low_u64(),
		_ => {
			m.exit(VmError::ReturnDataOutOfBounds);
			return;
		}
	};
	if (m.return_data.len() as u64) < end {
		m.exit(VmError::ReturnDataOutOfBounds);
		return;
	}

	if size != 0 {
		let o = mem_offset.low_u64() as usize;
		let data = m.return_data[data_offset.low_u64() as usize..end as usize].to_vec();
		m.memory[o..o + data.len()].copy_from_slice(&data);
	}
}

pub(crate) fn blockhash(m: &mut Machine, _op: Opcode) {
	let num = m.pop();

	if num.bits() > 63 {
		m.push(U256::zero());
		return;
	}

	let n = num.low_u64() as i64;
	let last_block = m.host.get_tx_context().number;

	// only the 256 most recent blocks are addressable
	if last_block - 257 < n && n < last_block {
		let hash = m.host.get_block_hash(n);
		m.push(h256_to_u256(hash));
	} else {
		m.push(U256::zero());
	}
}

pub(crate) fn coinbase(m: &mut Machine, _op: Opcode) {
	let coinbase = m.host.get_tx_context().coinbase;
	m.push(address_to_u256(coinbase));
}

pub(crate) fn timestamp(m: &mut Machine, _op: Opcode) {
	let ts = m.host.get_tx_context().timestamp;
	m.push(U256::from(ts as u64));
}

pub(crate) fn number(m: &mut Machine, _op: Opcode) {
	let number = m.host.get_tx_context().number;
	m.push(U256::from(number as u64));
}

pub(crate) fn difficulty(m: &mut Machine, _op: Opcode) {
	let difficulty = m.host.get_tx_context().difficulty;
	m.push(difficulty);
}

pub(crate) fn gaslimit(m: &mut Machine, _op: Opcode) {
	let limit = m.host.get_tx_context().gas_limit;
	m.push(U256::from(limit as u64));
}

pub(crate) fn pc(m: &mut Machine, _op: Opcode) {
	let ip = m.ip;
	m.push(U256::from(ip as u64));
}

pub(crate) fn msize(m: &mut Machine, _op: Opcode) {
	let len = m.memory.len();
	m.push(U256::from(len));
}

pub(crate) fn gas(m: &mut Machine, _op: Opcode) {
	let gas = m.gas;
	m.push(U256::from(gas));
}

/// Fill `dst` from `src[offset..]`, zero-padding past the source end.
fn read_padded(dst: &mut [u8], src: &[u8], offset: U256) {
	if offset.bits() > 64 {
		dst.fill(0);
		return;
	}

	let src_len = src.len() as u64;
	let begin = offset.low_u64().min(src_len);
	let copy_size = (dst.len() as u64).min(src_len - begin);

	if copy_size > 0 {
		dst[..copy_size as usize].copy_from_slice(&src[begin as usize..(begin + copy_size) as usize]);
	}
	dst[copy_size as usize..].fill(0);
}
