//! Snapshot backends: the read-only world state a transaction overlay
//! sits on top of.

use primitive_types::{H160, H256, U256};
use sha3::{Digest, Keccak256};
use std::collections::BTreeMap;

use crate::state::Account;

/// Read access to committed world state. A trie-backed store
/// implements this in production; tests use [InMemoryState].
pub trait Snapshot {
	/// Account at `addr`; `None` (not an error) when absent.
	fn get_account(&self, addr: H160) -> Option<Account>;

	/// Storage slot under the account's storage root; the zero hash
	/// when absent.
	fn get_storage(&self, addr: H160, root: H256, key: H256) -> H256;
}

/// A backend with no accounts at all.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptyState;

impl Snapshot for EmptyState {
	fn get_account(&self, _addr: H160) -> Option<Account> {
		None
	}

	fn get_storage(&self, _addr: H160, _root: H256, _key: H256) -> H256 {
		H256::zero()
	}
}

/// Map-backed world state for tests and embedders without a trie.
#[derive(Clone, Debug, Default)]
pub struct InMemoryState {
	accounts: BTreeMap<H160, Account>,
	storage: BTreeMap<(H160, H256), H256>,
}

impl InMemoryState {
	pub fn new() -> Self {
		Self::default()
	}

	/// Insert an account with the given balance and nonce.
	pub fn set_account(&mut self, addr: H160, account: Account) {
		self.accounts.insert(addr, account);
	}

	/// Insert an account holding only a balance.
	pub fn set_balance(&mut self, addr: H160, balance: U256) {
		let account = self.accounts.entry(addr).or_default();
		account.balance = balance;
	}

	/// Install code, keeping the code hash consistent.
	pub fn set_code(&mut self, addr: H160, code: Vec<u8>) {
		let account = self.accounts.entry(addr).or_default();
		account.code_hash = H256::from_slice(&Keccak256::digest(&code));
		account.code = code;
	}

	pub fn set_storage(&mut self, addr: H160, key: H256, value: H256) {
		self.storage.insert((addr, key), value);
	}
}

impl Snapshot for InMemoryState {
	fn get_account(&self, addr: H160) -> Option<Account> {
		self.accounts.get(&addr).cloned()
	}

	fn get_storage(&self, addr: H160, _root: H256, key: H256) -> H256 {
		self.storage
			.get(&(addr, key))
			.copied()
			.unwrap_or_default()
	}
}
