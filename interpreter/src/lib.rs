//! EVM bytecode interpreter: a stack machine over 256-bit words with
//! byte-addressable memory, exact gas metering and revision-gated
//! opcode semantics. The machine talks to the outside world only
//! through the [Host] trait, which keeps it executable against both
//! the real transition driver and synthetic test hosts.

mod bitmap;
mod dispatch;
mod error;
mod eval;
mod host;
mod i256;
mod machine;
mod opcode;
mod revision;
mod stack;
mod util;

pub use crate::bitmap::CodeBitmap;
pub use crate::error::VmError;
pub use crate::host::{CallKind, CallOutput, Host, StorageStatus, TxContext};
pub use crate::i256::{I256, Sign};
pub use crate::machine::Machine;
pub use crate::opcode::Opcode;
pub use crate::revision::Revision;
pub use crate::stack::{Stack, STACK_LIMIT};
pub use crate::util::{address_to_u256, h256_to_u256, u256_to_address, u256_to_h256};

use primitive_types::{H160, U256};

/// One configured virtual machine, ready to execute frames against a
/// host.
pub struct Evm<'h> {
	pub host: &'h mut dyn Host,
	pub rev: Revision,
}

impl<'h> Evm<'h> {
	/// Execute a single frame. For creates the input doubles as the
	/// init code; for calls the code is fetched from `code_address`.
	///
	/// Returns the `RETURN`/`REVERT` payload, the gas left and the
	/// frame error. Any error other than
	/// [VmError::ExecutionReverted] consumes all remaining gas.
	#[allow(clippy::too_many_arguments)]
	pub fn run(
		&mut self,
		kind: CallKind,
		recipient: H160,
		sender: H160,
		value: U256,
		input: &[u8],
		gas: u64,
		depth: usize,
		is_static: bool,
		code_address: H160,
	) -> (Vec<u8>, u64, Option<VmError>) {
		let is_create = matches!(kind, CallKind::Create | CallKind::Create2);

		let code = if is_create {
			input.to_vec()
		} else {
			self.host.get_code(code_address)
		};
		let input = if is_create { Vec::new() } else { input.to_vec() };

		let mut machine = Machine::new(
			&mut *self.host,
			self.rev,
			code,
			input,
			gas,
			recipient,
			sender,
			value,
			depth,
			is_static,
		);

		let (ret, err) = machine.run();
		let mut gas_left = machine.gas();

		if let Some(err) = err {
			if err != VmError::ExecutionReverted {
				gas_left = 0;
			}
		}

		(ret, gas_left, err)
	}
}
