//! The collaboration surface between the interpreter and the outer world.

use primitive_types::{H160, H256, U256};

use crate::error::VmError;

/// What flavour of frame a [Host::call] should open.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CallKind {
	Call,
	CallCode,
	DelegateCall,
	Create,
	Create2,
}

/// EIP-2200 classification of a storage write, returned by
/// [Host::set_storage] and priced by the `SSTORE` handler.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StorageStatus {
	/// The slot already held the written value.
	Unchanged,
	/// First write of the slot in this transaction, to a fresh value.
	Modified,
	/// The slot was already dirtied earlier in the transaction.
	ModifiedAgain,
	/// A zero slot became non-zero.
	Added,
	/// A non-zero slot became zero.
	Deleted,
}

/// Per-transaction environment exposed through the host.
#[derive(Clone, Debug, Default)]
pub struct TxContext {
	pub gas_price: U256,
	pub origin: H160,
	pub coinbase: H160,
	pub number: i64,
	pub timestamp: i64,
	pub gas_limit: i64,
	pub chain_id: u64,
	pub difficulty: U256,
}

/// Result of a [Host::call] dispatch, covering both message calls and
/// contract creation.
#[derive(Clone, Debug)]
pub struct CallOutput {
	pub output: Vec<u8>,
	pub gas_left: u64,
	pub create_address: H160,
	pub error: Option<VmError>,
}

/// Everything the interpreter may ask of its environment. The
/// transition driver is the production implementation; tests plug in
/// synthetic hosts.
pub trait Host {
	/// Whether an account exists. From Spurious Dragon this means
	/// "is not empty" rather than "was ever touched".
	fn account_exists(&self, address: H160) -> bool;

	/// Read a storage slot through the transaction overlay.
	fn get_storage(&self, address: H160, key: H256) -> H256;

	/// Write a storage slot and classify the write for gas purposes.
	fn set_storage(&mut self, address: H160, key: H256, value: H256) -> StorageStatus;

	fn get_balance(&self, address: H160) -> U256;

	fn get_code(&self, address: H160) -> Vec<u8>;

	fn get_code_size(&self, address: H160) -> usize;

	/// Code hash of an account; the zero hash for empty accounts.
	fn get_code_hash(&self, address: H160) -> H256;

	/// Mark the executing account as suicided and move its balance to
	/// the beneficiary.
	fn selfdestruct(&mut self, address: H160, beneficiary: H160);

	fn emit_log(&mut self, address: H160, topics: Vec<H256>, data: Vec<u8>);

	fn get_tx_context(&self) -> TxContext;

	/// Hash of a historic block, for `BLOCKHASH`.
	fn get_block_hash(&self, number: i64) -> H256;

	/// Open a nested frame. `recipient` and `code_address` are ignored
	/// for creates, where the host derives the new address itself.
	#[allow(clippy::too_many_arguments)]
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
	) -> CallOutput;
}
