//! Core state types shared by the overlay and the transition driver.

use ethervm_interpreter::CallKind;
use primitive_types::{H160, H256, U256};
use std::collections::BTreeMap;

/// keccak256 of the empty byte string.
pub const EMPTY_CODE_HASH: H256 = H256([
	0xc5, 0xd2, 0x46, 0x01, 0x86, 0xf7, 0x23, 0x3c, 0x92, 0x7e, 0x7d, 0xb2, 0xdc, 0xc7, 0x03, 0xc0,
	0xe5, 0x00, 0xb6, 0x53, 0xca, 0x82, 0x27, 0x3b, 0x7b, 0xfa, 0xd8, 0x04, 0x5d, 0x85, 0xa4, 0x70,
]);

/// Root of the empty storage trie, keccak256(rlp("")).
pub const EMPTY_ROOT_HASH: H256 = H256([
	0x56, 0xe8, 0x1f, 0x17, 0x1b, 0xcc, 0x55, 0xa6, 0xff, 0x83, 0x45, 0xe6, 0x92, 0xc0, 0xf8, 0x6e,
	0x5b, 0x48, 0xe0, 0x1b, 0x99, 0x6c, 0xad, 0xc0, 0x01, 0x62, 0x2f, 0xb5, 0xe3, 0x63, 0xb4, 0x21,
]);

/// An account as retrieved from, and committed back to, the state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
	pub nonce: u64,
	pub balance: U256,
	pub root: H256,
	pub code_hash: H256,
	pub code: Vec<u8>,
}

impl Default for Account {
	fn default() -> Self {
		Account {
			nonce: 0,
			balance: U256::zero(),
			root: EMPTY_ROOT_HASH,
			code_hash: EMPTY_CODE_HASH,
			code: Vec::new(),
		}
	}
}

/// Overlay entry for one account. Storage keeps an explicit `None` for
/// slots deleted within the transaction, which is distinct from a slot
/// the overlay never touched.
#[derive(Clone, Debug, Default)]
pub struct StateObject {
	pub account: Account,
	pub suicide: bool,
	pub deleted: bool,
	pub dirty_code: bool,
	pub storage: BTreeMap<H256, Option<H256>>,
}

impl StateObject {
	/// An account is empty iff nonce, balance and code are all unset.
	pub fn empty(&self) -> bool {
		self.account.nonce == 0
			&& self.account.balance.is_zero()
			&& self.account.code_hash == EMPTY_CODE_HASH
	}
}

/// Final state change of one account, handed to the external trie
/// builder after a transaction commits.
#[derive(Clone, Debug)]
pub struct Object {
	pub address: H160,
	pub nonce: u64,
	pub balance: U256,
	pub root: H256,
	pub code_hash: H256,
	pub dirty_code: bool,
	pub code: Vec<u8>,
	pub deleted: bool,
	pub storage: Vec<StorageObject>,
}

/// One committed storage write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageObject {
	pub key: H256,
	pub value: H256,
	pub deleted: bool,
}

/// A log record emitted during execution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Log {
	pub address: H160,
	pub topics: Vec<H256>,
	pub data: Vec<u8>,
}

/// Result of applying one message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Output {
	pub logs: Vec<Log>,
	pub success: bool,
	pub gas_left: u64,
	/// For creation messages, the address derived from the message
	/// nonce. Advisory: consumers wanting the exact created address
	/// should take it from the creation frame.
	pub contract_address: H160,
	pub return_value: Vec<u8>,
}

/// A transaction message. A missing `to` makes it a contract creation.
#[derive(Clone, Debug)]
pub struct Message {
	pub nonce: u64,
	pub gas_price: U256,
	pub gas: u64,
	pub to: Option<H160>,
	pub value: U256,
	pub input: Vec<u8>,
	pub from: H160,
}

impl Message {
	pub fn is_contract_creation(&self) -> bool {
		self.to.is_none()
	}
}

/// Descriptor of one call frame.
#[derive(Clone, Debug)]
pub struct Contract {
	pub kind: CallKind,
	pub code_address: H160,
	pub address: H160,
	pub caller: H160,
	pub depth: usize,
	pub value: U256,
	pub input: Vec<u8>,
	pub gas: u64,
	pub is_static: bool,
	pub salt: H256,
}

impl Contract {
	pub fn new(
		kind: CallKind,
		depth: usize,
		from: H160,
		to: H160,
		value: U256,
		gas: u64,
		input: Vec<u8>,
	) -> Self {
		Contract {
			kind,
			code_address: to,
			address: to,
			caller: from,
			depth,
			value,
			input,
			gas,
			is_static: false,
			salt: H256::zero(),
		}
	}

	pub fn creation(
		depth: usize,
		from: H160,
		to: H160,
		value: U256,
		gas: u64,
		code: Vec<u8>,
	) -> Self {
		Contract::new(CallKind::Create, depth, from, to, value, gas, code)
	}

	pub fn call(depth: usize, from: H160, to: H160, value: U256, gas: u64, input: Vec<u8>) -> Self {
		Contract::new(CallKind::Call, depth, from, to, value, gas, input)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use sha3::{Digest, Keccak256};

	#[test]
	fn empty_hash_constants() {
		assert_eq!(
			EMPTY_CODE_HASH.as_bytes(),
			Keccak256::digest([0u8; 0]).as_slice()
		);
		// rlp of the empty string is 0x80
		assert_eq!(
			EMPTY_ROOT_HASH.as_bytes(),
			Keccak256::digest([0x80u8]).as_slice()
		);
	}

	#[test]
	fn state_object_emptiness() {
		let mut obj = StateObject::default();
		assert!(obj.empty());

		obj.account.nonce = 1;
		assert!(!obj.empty());

		obj.account.nonce = 0;
		obj.account.balance = U256::one();
		assert!(!obj.empty());
	}
}
