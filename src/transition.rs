//! The transition driver: applies messages against the overlay,
//! charging intrinsic gas, opening call and create frames, settling
//! refunds and paying the coinbase. It is also the [Host] the
//! interpreter executes against.

use ethervm_interpreter::{
	CallKind, CallOutput, Evm, Host, Revision, StorageStatus, TxContext, VmError,
};
use log::{debug, trace};
use primitive_types::{H160, H256, U256};

use crate::address::{create_address, create_address2};
use crate::config::Config;
use crate::error::TransitionError;
use crate::state::{Contract, Message, Object, Output, EMPTY_CODE_HASH};
use crate::txn::Txn;

const SPURIOUS_DRAGON_MAX_CODE_SIZE: usize = 24576;

/// Base cost of a transaction not creating a contract.
pub const TX_GAS: u64 = 21000;

/// Base cost of a contract-creation transaction, from Homestead.
pub const TX_GAS_CONTRACT_CREATION: u64 = 53000;

/// Executes messages over one transaction overlay.
pub struct Transition<'a> {
	txn: Txn<'a>,
	config: Config<'a>,
}

impl<'a> Transition<'a> {
	pub fn new(config: Config<'a>) -> Self {
		let txn = Txn::new(config.state, config.rev);
		Transition { txn, config }
	}

	fn is_revision(&self, rev: Revision) -> bool {
		self.config.rev >= rev
	}

	/// The in-flight overlay, for embedders that seed or inspect state
	/// between messages.
	pub fn txn(&mut self) -> &mut Txn<'a> {
		&mut self.txn
	}

	/// Enumerate the accumulated state changes for the trie builder.
	pub fn commit(&self) -> Vec<Object> {
		self.txn.commit()
	}

	/// Apply one message, settle gas, and sweep deletable objects.
	pub fn write(&mut self, msg: &Message) -> Result<Output, TransitionError> {
		let gas_left = self.pre_check(msg)?;
		let mut output = self.apply(msg, gas_left);
		self.post_check(msg, &mut output);

		if self.is_revision(Revision::Byzantium) {
			self.txn.clean_delete_objects(true);
		} else {
			let delete_empty = self.is_revision(Revision::SpuriousDragon);
			self.txn.clean_delete_objects(delete_empty);
		}

		debug!(
			"message applied; from={:?} gas={} success={} gas_left={}",
			msg.from, msg.gas, output.success, output.gas_left
		);
		Ok(output)
	}

	/// Returns the gas available for execution once the upfront cost
	/// is escrowed and the intrinsic charge deducted.
	fn pre_check(&mut self, msg: &Message) -> Result<u64, TransitionError> {
		if self.txn.get_nonce(msg.from) != msg.nonce {
			return Err(TransitionError::IncorrectNonce);
		}

		let upfront = U256::from(msg.gas)
			.checked_mul(msg.gas_price)
			.ok_or(TransitionError::NotEnoughFundsForGas)?;
		self.txn
			.sub_balance(msg.from, upfront)
			.map_err(|_| TransitionError::NotEnoughFundsForGas)?;

		let intrinsic = transaction_gas_cost(
			msg,
			self.is_revision(Revision::Homestead),
			self.is_revision(Revision::Istanbul),
		)?;
		let gas_left = msg
			.gas
			.checked_sub(intrinsic)
			.ok_or(TransitionError::IntrinsicGasTooLow)?;

		if self.txn.get_balance(msg.from) < msg.value {
			return Err(TransitionError::InsufficientFunds);
		}

		Ok(gas_left)
	}

	fn apply(&mut self, msg: &Message, gas: u64) -> Output {
		self.config.ctx.gas_price = msg.gas_price;
		self.config.ctx.origin = msg.from;

		let (ret, gas_left, err) = match msg.to {
			None => {
				let address = create_address(msg.from, self.txn.get_nonce(msg.from));
				let contract =
					Contract::creation(0, msg.from, address, msg.value, gas, msg.input.clone());
				let (ret, gas_left, _, err) = self.apply_create(contract);
				(ret, gas_left, err)
			}
			Some(to) => {
				self.txn.incr_nonce(msg.from);
				let contract = Contract::call(0, msg.from, to, msg.value, gas, msg.input.clone());
				let (ret, gas_left, _, err) = self.apply_call(contract, CallKind::Call);
				(ret, gas_left, err)
			}
		};

		let mut output = Output {
			return_value: ret,
			logs: self.txn.take_logs(),
			gas_left,
			success: err.is_none(),
			contract_address: H160::zero(),
		};

		// receipts carry the address derived from the message nonce
		if msg.to.is_none() {
			output.contract_address = create_address(msg.from, msg.nonce);
		}

		output
	}

	fn post_check(&mut self, msg: &Message, output: &mut Output) {
		let mut gas_used = msg.gas - output.gas_left;

		// refunds cover at most half the gas used
		let mut refund = self.txn.get_refund();
		let max_refund = gas_used / 2;
		if refund > max_refund {
			refund = max_refund;
		}
		output.gas_left += refund;
		gas_used -= refund;

		let remaining = U256::from(output.gas_left) * msg.gas_price;
		self.txn.add_balance(msg.from, remaining);

		let coinbase_fee = U256::from(gas_used) * msg.gas_price;
		let coinbase = self.config.ctx.coinbase;
		self.txn.add_balance(coinbase, coinbase_fee);
	}

	fn transfer(&mut self, from: H160, to: H160, amount: U256) -> Result<(), VmError> {
		self.txn.sub_balance(from, amount)?;
		self.txn.add_balance(to, amount);
		Ok(())
	}

	/// Dispatch a frame: cheatcodes, then precompiles, then the
	/// interpreter.
	fn run(&mut self, contract: &Contract) -> (Vec<u8>, u64, Option<VmError>) {
		for cheat in &self.config.cheatcodes {
			if cheat.can_run(contract.code_address) {
				cheat.run(contract.code_address, &contract.input);
				// cheatcodes consume no gas
				return (Vec::new(), contract.gas, None);
			}
		}

		if ethervm_precompile::is_precompiled(contract.code_address, self.config.rev) {
			return ethervm_precompile::run_precompiled(
				contract.code_address,
				&contract.input,
				contract.gas,
				self.config.rev,
			);
		}

		let rev = self.config.rev;
		let mut evm = Evm { host: self, rev };
		evm.run(
			contract.kind,
			contract.address,
			contract.caller,
			contract.value,
			&contract.input,
			contract.gas,
			contract.depth,
			contract.is_static,
			contract.code_address,
		)
	}

	fn apply_call(
		&mut self,
		contract: Contract,
		kind: CallKind,
	) -> (Vec<u8>, u64, H160, Option<VmError>) {
		let snapshot = self.txn.snapshot();
		self.txn.touch_account(contract.address);

		if kind == CallKind::Call {
			// transfers happen only on plain calls
			if let Err(err) = self.transfer(contract.caller, contract.address, contract.value) {
				return (Vec::new(), contract.gas, H160::zero(), Some(err));
			}
		}

		trace!(
			"call frame; to={:?} depth={} gas={}",
			contract.address,
			contract.depth,
			contract.gas
		);

		let (mut ret, gas_left, err) = self.run(&contract);
		if let Some(err) = err {
			self.txn.revert_to_snapshot(snapshot);
			if err != VmError::ExecutionReverted {
				// only a revert carries a return payload out
				ret = Vec::new();
			}
		}
		(ret, gas_left, H160::zero(), err)
	}

	fn has_code_or_nonce(&self, addr: H160) -> bool {
		if self.txn.get_nonce(addr) != 0 {
			return true;
		}
		let code_hash = self.txn.get_code_hash(addr);
		code_hash != EMPTY_CODE_HASH && code_hash != H256::zero()
	}

	fn apply_create(&mut self, mut contract: Contract) -> (Vec<u8>, u64, H160, Option<VmError>) {
		let gas_limit = contract.gas;

		let address = match contract.kind {
			CallKind::Create => create_address(contract.caller, self.txn.get_nonce(contract.caller)),
			CallKind::Create2 => {
				create_address2(contract.caller, contract.salt, &contract.input)
			}
			_ => panic!("apply_create on a non-create kind"),
		};
		contract.code_address = address;
		contract.address = address;

		self.txn.incr_nonce(contract.caller);

		if self.has_code_or_nonce(contract.address) {
			return (Vec::new(), 0, address, Some(VmError::AddressCollision));
		}

		let snapshot = self.txn.snapshot();

		if self.is_revision(Revision::SpuriousDragon) {
			// materialize the account so its nonce can move before
			// the init code runs
			self.txn.create_account(contract.address);
			self.txn.incr_nonce(contract.address);
		}

		if let Err(err) = self.transfer(contract.caller, contract.address, contract.value) {
			return (Vec::new(), gas_limit, address, Some(err));
		}

		trace!(
			"create frame; address={:?} depth={} gas={}",
			address,
			contract.depth,
			gas_limit
		);

		let (mut ret, mut gas_left, err) = self.run(&contract);

		if let Some(err) = err {
			self.txn.revert_to_snapshot(snapshot);
			if err != VmError::ExecutionReverted {
				ret = Vec::new();
			}
			return (ret, gas_left, address, Some(err));
		}

		if self.is_revision(Revision::SpuriousDragon) && ret.len() > SPURIOUS_DRAGON_MAX_CODE_SIZE {
			self.txn.revert_to_snapshot(snapshot);
			return (Vec::new(), 0, address, Some(VmError::MaxCodeSizeExceeded));
		}

		let gas_cost = ret.len() as u64 * 200;
		if gas_left < gas_cost {
			// out of gas storing the deployed code: Homestead reverts
			// the frame, Frontier deploys an empty contract
			if self.is_revision(Revision::Homestead) {
				self.txn.revert_to_snapshot(snapshot);
				gas_left = 0;
			}
			return (Vec::new(), gas_left, address, Some(VmError::OutOfGas));
		}

		gas_left -= gas_cost;
		self.txn.set_code(contract.address, ret);

		(Vec::new(), gas_left, address, None)
	}

	fn callx(&mut self, contract: Contract) -> (Vec<u8>, u64, H160, Option<VmError>) {
		match contract.kind {
			CallKind::Create | CallKind::Create2 => self.apply_create(contract),
			kind => self.apply_call(contract, kind),
		}
	}
}

impl<'a> Host for Transition<'a> {
	fn account_exists(&self, address: H160) -> bool {
		self.txn.account_exists(address)
	}

	fn get_storage(&self, address: H160, key: H256) -> H256 {
		self.txn.get_state(address, key)
	}

	fn set_storage(&mut self, address: H160, key: H256, value: H256) -> StorageStatus {
		self.txn.set_storage(address, key, value)
	}

	fn get_balance(&self, address: H160) -> U256 {
		self.txn.get_balance(address)
	}

	fn get_code(&self, address: H160) -> Vec<u8> {
		self.txn.get_code(address)
	}

	fn get_code_size(&self, address: H160) -> usize {
		self.txn.get_code_size(address)
	}

	fn get_code_hash(&self, address: H160) -> H256 {
		self.txn.get_code_hash(address)
	}

	fn selfdestruct(&mut self, address: H160, beneficiary: H160) {
		// 24000 is refunded only on the first suicide of an address
		if !self.txn.has_suicided(address) {
			self.txn.add_refund(24000);
		}
		let balance = self.txn.get_balance(address);
		self.txn.add_balance(beneficiary, balance);
		self.txn.suicide(address);
	}

	fn emit_log(&mut self, address: H160, topics: Vec<H256>, data: Vec<u8>) {
		self.txn.emit_log(address, topics, data);
	}

	fn get_tx_context(&self) -> TxContext {
		self.config.ctx.clone()
	}

	fn get_block_hash(&self, number: i64) -> H256 {
		(self.config.get_hash)(number as u64)
	}

	fn call(
		&mut self,
		kind: CallKind,
		recipient: H160,
		sender: H160,
		value: U256,
		input: &[u8],
		gas: u64,
		depth: usize,
		is_static: bool,
		salt: H256,
		code_address: H160,
	) -> CallOutput {
		let contract = Contract {
			kind,
			address: recipient,
			caller: sender,
			code_address,
			depth,
			value,
			input: input.to_vec(),
			gas,
			is_static,
			salt,
		};

		let (output, gas_left, create_address, error) = self.callx(contract);
		CallOutput {
			output,
			gas_left,
			create_address,
			error,
		}
	}
}

/// Intrinsic gas of a message: the flat transaction charge plus the
/// per-byte cost of its input.
pub fn transaction_gas_cost(
	msg: &Message,
	is_homestead: bool,
	is_istanbul: bool,
) -> Result<u64, TransitionError> {
	// creation carries its own base price only from Homestead
	let mut cost: u64 = if msg.is_contract_creation() && is_homestead {
		TX_GAS_CONTRACT_CREATION
	} else {
		TX_GAS
	};

	let payload = &msg.input;
	if !payload.is_empty() {
		let zeros = payload.iter().filter(|byte| **byte == 0).count() as u64;
		let non_zeros = payload.len() as u64 - zeros;
		let non_zero_cost: u64 = if is_istanbul { 16 } else { 68 };

		if (u64::MAX - cost) / non_zero_cost < non_zeros {
			return Err(TransitionError::IntrinsicGasOverflow);
		}
		cost += non_zeros * non_zero_cost;

		if (u64::MAX - cost) / 4 < zeros {
			return Err(TransitionError::IntrinsicGasOverflow);
		}
		cost += zeros * 4;
	}

	Ok(cost)
}
