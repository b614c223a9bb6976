//! The instruction table: one `{handler, stack_min, base_gas}` entry
//! per defined opcode. Revision gating for opcodes that exist only on
//! later forks happens inside the handlers, so a single table serves
//! every revision.

use crate::eval::{arithmetic, bitwise, context, flow, system};
use crate::machine::Machine;
use crate::opcode::Opcode;

pub(crate) type OpFn = fn(&mut Machine<'_>, Opcode);

#[derive(Clone, Copy)]
pub(crate) struct Instruction {
	pub exec: OpFn,
	/// Minimum stack depth checked before the handler runs. DUP, SWAP
	/// and LOG verify their own, larger requirements.
	pub stack: usize,
	/// Static gas charged before the handler runs.
	pub gas: u64,
}

const fn inst(exec: OpFn, stack: usize, gas: u64) -> Option<Instruction> {
	Some(Instruction { exec, stack, gas })
}

pub(crate) static TABLE: [Option<Instruction>; 256] = build_table();

const fn build_table() -> [Option<Instruction>; 256] {
	let mut t: [Option<Instruction>; 256] = [None; 256];

	t[Opcode::STOP.as_usize()] = inst(flow::stop, 0, 0);
	t[Opcode::ADD.as_usize()] = inst(arithmetic::add, 2, 3);
	t[Opcode::MUL.as_usize()] = inst(arithmetic::mul, 2, 5);
	t[Opcode::SUB.as_usize()] = inst(arithmetic::sub, 2, 3);
	t[Opcode::DIV.as_usize()] = inst(arithmetic::div, 2, 5);
	t[Opcode::SDIV.as_usize()] = inst(arithmetic::sdiv, 2, 5);
	t[Opcode::MOD.as_usize()] = inst(arithmetic::rem, 2, 5);
	t[Opcode::SMOD.as_usize()] = inst(arithmetic::srem, 2, 5);
	t[Opcode::ADDMOD.as_usize()] = inst(arithmetic::addmod, 3, 8);
	t[Opcode::MULMOD.as_usize()] = inst(arithmetic::mulmod, 3, 8);
	t[Opcode::EXP.as_usize()] = inst(arithmetic::exp, 2, 10);
	t[Opcode::SIGNEXTEND.as_usize()] = inst(arithmetic::signextend, 2, 5);

	t[Opcode::LT.as_usize()] = inst(bitwise::lt, 2, 3);
	t[Opcode::GT.as_usize()] = inst(bitwise::gt, 2, 3);
	t[Opcode::SLT.as_usize()] = inst(bitwise::slt, 2, 3);
	t[Opcode::SGT.as_usize()] = inst(bitwise::sgt, 2, 3);
	t[Opcode::EQ.as_usize()] = inst(bitwise::eq, 2, 3);
	t[Opcode::ISZERO.as_usize()] = inst(bitwise::iszero, 1, 3);
	t[Opcode::AND.as_usize()] = inst(bitwise::and, 2, 3);
	t[Opcode::OR.as_usize()] = inst(bitwise::or, 2, 3);
	t[Opcode::XOR.as_usize()] = inst(bitwise::xor, 2, 3);
	t[Opcode::NOT.as_usize()] = inst(bitwise::not, 1, 3);
	t[Opcode::BYTE.as_usize()] = inst(bitwise::byte, 2, 3);
	t[Opcode::SHL.as_usize()] = inst(bitwise::shl, 2, 3);
	t[Opcode::SHR.as_usize()] = inst(bitwise::shr, 2, 3);
	t[Opcode::SAR.as_usize()] = inst(bitwise::sar, 2, 3);

	t[Opcode::SHA3.as_usize()] = inst(system::sha3, 2, 30);

	t[Opcode::ADDRESS.as_usize()] = inst(context::address, 0, 2);
	t[Opcode::BALANCE.as_usize()] = inst(context::balance, 1, 0);
	t[Opcode::ORIGIN.as_usize()] = inst(context::origin, 0, 2);
	t[Opcode::CALLER.as_usize()] = inst(context::caller, 0, 2);
	t[Opcode::CALLVALUE.as_usize()] = inst(context::callvalue, 0, 2);
	t[Opcode::CALLDATALOAD.as_usize()] = inst(context::calldataload, 1, 3);
	t[Opcode::CALLDATASIZE.as_usize()] = inst(context::calldatasize, 0, 2);
	t[Opcode::CALLDATACOPY.as_usize()] = inst(context::calldatacopy, 3, 3);
	t[Opcode::CODESIZE.as_usize()] = inst(context::codesize, 0, 2);
	t[Opcode::CODECOPY.as_usize()] = inst(context::codecopy, 3, 3);
	t[Opcode::GASPRICE.as_usize()] = inst(context::gasprice, 0, 2);
	t[Opcode::EXTCODESIZE.as_usize()] = inst(context::extcodesize, 1, 0);
	t[Opcode::EXTCODECOPY.as_usize()] = inst(context::extcodecopy, 4, 0);
	t[Opcode::RETURNDATASIZE.as_usize()] = inst(context::returndatasize, 0, 2);
	t[Opcode::RETURNDATACOPY.as_usize()] = inst(context::returndatacopy, 3, 3);
	t[Opcode::EXTCODEHASH.as_usize()] = inst(context::extcodehash, 1, 0);

	t[Opcode::BLOCKHASH.as_usize()] = inst(context::blockhash, 1, 20);
	t[Opcode::COINBASE.as_usize()] = inst(context::coinbase, 0, 2);
	t[Opcode::TIMESTAMP.as_usize()] = inst(context::timestamp, 0, 2);
	t[Opcode::NUMBER.as_usize()] = inst(context::number, 0, 2);
	t[Opcode::DIFFICULTY.as_usize()] = inst(context::difficulty, 0, 2);
	t[Opcode::GASLIMIT.as_usize()] = inst(context::gaslimit, 0, 2);
	t[Opcode::CHAINID.as_usize()] = inst(context::chainid, 0, 2);
	t[Opcode::SELFBALANCE.as_usize()] = inst(context::selfbalance, 0, 5);

	t[Opcode::POP.as_usize()] = inst(flow::pop, 1, 2);
	t[Opcode::MLOAD.as_usize()] = inst(flow::mload, 1, 3);
	t[Opcode::MSTORE.as_usize()] = inst(flow::mstore, 2, 3);
	t[Opcode::MSTORE8.as_usize()] = inst(flow::mstore8, 2, 3);
	t[Opcode::SLOAD.as_usize()] = inst(system::sload, 1, 0);
	t[Opcode::SSTORE.as_usize()] = inst(system::sstore, 2, 0);
	t[Opcode::JUMP.as_usize()] = inst(flow::jump, 1, 8);
	t[Opcode::JUMPI.as_usize()] = inst(flow::jumpi, 2, 10);
	t[Opcode::PC.as_usize()] = inst(context::pc, 0, 2);
	t[Opcode::MSIZE.as_usize()] = inst(context::msize, 0, 2);
	t[Opcode::GAS.as_usize()] = inst(context::gas, 0, 2);
	t[Opcode::JUMPDEST.as_usize()] = inst(flow::jumpdest, 0, 1);

	let mut i = Opcode::PUSH1.as_usize();
	while i <= Opcode::PUSH32.as_usize() {
		t[i] = inst(flow::push, 0, 3);
		i += 1;
	}

	let mut i = Opcode::DUP1.as_usize();
	while i <= Opcode::DUP16.as_usize() {
		t[i] = inst(flow::dup, 0, 3);
		i += 1;
	}

	let mut i = Opcode::SWAP1.as_usize();
	while i <= Opcode::SWAP16.as_usize() {
		t[i] = inst(flow::swap, 0, 3);
		i += 1;
	}

	let mut i = Opcode::LOG0.as_usize();
	while i <= Opcode::LOG4.as_usize() {
		t[i] = inst(system::log, 0, 375);
		i += 1;
	}

	t[Opcode::CREATE.as_usize()] = inst(system::create, 3, 32000);
	t[Opcode::CALL.as_usize()] = inst(system::call, 7, 0);
	t[Opcode::CALLCODE.as_usize()] = inst(system::call, 7, 0);
	t[Opcode::RETURN.as_usize()] = inst(system::halt, 2, 0);
	t[Opcode::DELEGATECALL.as_usize()] = inst(system::call, 6, 0);
	t[Opcode::CREATE2.as_usize()] = inst(system::create, 4, 32000);
	t[Opcode::STATICCALL.as_usize()] = inst(system::call, 6, 0);
	t[Opcode::REVERT.as_usize()] = inst(system::halt, 2, 0);
	t[Opcode::SELFDESTRUCT.as_usize()] = inst(system::selfdestruct, 1, 0);

	t
}
