//! Transactional state overlay: every change a transaction makes is
//! layered over a read-only [Snapshot] backend and can be rewound to
//! any previously taken snapshot.
//!
//! The overlay is a stack of copy-on-write layers. Reads walk the
//! layers top-down and fall through to the backend; writes re-insert a
//! merged copy of the object into the top layer. Taking a snapshot
//! seals the current layer, so reverting truncates back to the sealed
//! depth. Logs and the refund counter are versioned per layer and roll
//! back together with account data.

use ethervm_interpreter::{Revision, StorageStatus, VmError};
use primitive_types::{H160, H256, U256};
use sha3::{Digest, Keccak256};
use std::collections::BTreeMap;

use crate::backend::Snapshot;
use crate::state::{Account, Log, Object, StateObject, StorageObject};

#[derive(Default)]
struct Layer {
	objects: BTreeMap<H160, StateObject>,
	logs: Vec<Log>,
	refund: Option<u64>,
}

/// The in-flight state of one transaction.
pub struct Txn<'a> {
	snapshot: &'a dyn Snapshot,
	layers: Vec<Layer>,
	/// Layer depth at each snapshot, indexed by snapshot id.
	/// Append-only for the lifetime of the transaction.
	checkpoints: Vec<usize>,
	rev: Revision,
}

impl<'a> Txn<'a> {
	pub fn new(snapshot: &'a dyn Snapshot, rev: Revision) -> Self {
		Txn {
			snapshot,
			layers: vec![Layer::default()],
			checkpoints: Vec::new(),
			rev,
		}
	}

	fn is_revision(&self, rev: Revision) -> bool {
		self.rev >= rev
	}

	fn top_mut(&mut self) -> &mut Layer {
		self.layers.last_mut().expect("at least one layer")
	}

	/// Capture the overlay; the returned id stays valid for the whole
	/// transaction.
	pub fn snapshot(&mut self) -> usize {
		let id = self.checkpoints.len();
		self.checkpoints.push(self.layers.len());
		self.layers.push(Layer::default());
		id
	}

	/// Rewind every write made since `snapshot(id)` was taken.
	pub fn revert_to_snapshot(&mut self, id: usize) {
		let depth = *self
			.checkpoints
			.get(id)
			.expect("revert to unknown snapshot");
		assert!(depth <= self.layers.len(), "revert to unknown snapshot");

		self.layers.truncate(depth);
		self.layers.push(Layer::default());
	}

	/// Raw overlay entry, including deleted markers. Does not consult
	/// the backend.
	fn overlay_object(&self, addr: H160) -> Option<&StateObject> {
		for layer in self.layers.iter().rev() {
			if let Some(object) = layer.objects.get(&addr) {
				return Some(object);
			}
		}
		None
	}

	/// The live view of an account: overlay first, then backend.
	fn get_state_object(&self, addr: H160) -> Option<StateObject> {
		if let Some(object) = self.overlay_object(addr) {
			if object.deleted {
				return None;
			}
			return Some(object.clone());
		}

		let account = self.snapshot.get_account(addr)?;
		Some(StateObject {
			account,
			..StateObject::default()
		})
	}

	/// Read-modify-write of one account. With `create`, a fresh empty
	/// object is materialized when the account does not exist yet; the
	/// callback sees `None` otherwise.
	fn upsert_account<F>(&mut self, addr: H160, create: bool, f: F)
	where
		F: FnOnce(Option<&mut StateObject>),
	{
		let mut object = self.get_state_object(addr);
		if object.is_none() && create {
			object = Some(StateObject::default());
		}

		f(object.as_mut());

		if let Some(object) = object {
			self.top_mut().objects.insert(addr, object);
		}
	}

	pub fn get_account(&self, addr: H160) -> Option<Account> {
		self.get_state_object(addr).map(|object| object.account)
	}

	// balances

	pub fn add_balance(&mut self, addr: H160, amount: U256) {
		self.upsert_account(addr, true, |object| {
			let object = object.expect("created on demand");
			object.account.balance = object.account.balance.saturating_add(amount);
		});
	}

	/// Credit a block reward. A reward resurrects an account suicided
	/// in this transaction with only the reward as its balance.
	pub fn add_sealing_reward(&mut self, addr: H160, amount: U256) {
		self.upsert_account(addr, true, |object| {
			let object = object.expect("created on demand");
			if object.suicide {
				*object = StateObject::default();
				object.account.balance = amount;
			} else {
				object.account.balance = object.account.balance.saturating_add(amount);
			}
		});
	}

	/// Deduct from a balance. Deducting zero always succeeds.
	pub fn sub_balance(&mut self, addr: H160, amount: U256) -> Result<(), VmError> {
		if amount.is_zero() {
			return Ok(());
		}

		if self.get_balance(addr) < amount {
			return Err(VmError::InsufficientFunds);
		}

		self.upsert_account(addr, true, |object| {
			let object = object.expect("created on demand");
			object.account.balance -= amount;
		});
		Ok(())
	}

	pub fn set_balance(&mut self, addr: H160, balance: U256) {
		self.upsert_account(addr, true, |object| {
			object.expect("created on demand").account.balance = balance;
		});
	}

	pub fn get_balance(&self, addr: H160) -> U256 {
		match self.get_state_object(addr) {
			Some(object) => object.account.balance,
			None => U256::zero(),
		}
	}

	// nonces

	pub fn incr_nonce(&mut self, addr: H160) {
		self.upsert_account(addr, true, |object| {
			object.expect("created on demand").account.nonce += 1;
		});
	}

	pub fn set_nonce(&mut self, addr: H160, nonce: u64) {
		self.upsert_account(addr, true, |object| {
			object.expect("created on demand").account.nonce = nonce;
		});
	}

	pub fn get_nonce(&self, addr: H160) -> u64 {
		match self.get_state_object(addr) {
			Some(object) => object.account.nonce,
			None => 0,
		}
	}

	// code

	pub fn set_code(&mut self, addr: H160, code: Vec<u8>) {
		self.upsert_account(addr, true, |object| {
			let object = object.expect("created on demand");
			object.account.code_hash = H256::from_slice(&Keccak256::digest(&code));
			object.account.code = code;
			object.dirty_code = true;
		});
	}

	pub fn get_code(&self, addr: H160) -> Vec<u8> {
		match self.get_state_object(addr) {
			Some(object) => object.account.code,
			None => Vec::new(),
		}
	}

	pub fn get_code_size(&self, addr: H160) -> usize {
		self.get_code(addr).len()
	}

	/// Code hash of the account, or the zero hash if the account is
	/// empty or absent.
	pub fn get_code_hash(&self, addr: H160) -> H256 {
		if self.empty(addr) {
			return H256::zero();
		}
		match self.get_state_object(addr) {
			Some(object) => object.account.code_hash,
			None => H256::zero(),
		}
	}

	// storage

	/// Write a slot and classify the change per EIP-2200. The refund
	/// counter moves as a side effect of the classification.
	pub fn set_storage(&mut self, addr: H160, key: H256, value: H256) -> StorageStatus {
		let old_value = self.get_state(addr, key);
		if old_value == value {
			return StorageStatus::Unchanged;
		}

		// current: dirtied by earlier writes of this transaction
		// original: the slot before the transaction started
		let current = old_value;
		let original = self.get_committed_state(addr, key);

		self.set_state(addr, key, value);

		let is_istanbul = self.is_revision(Revision::Istanbul);
		let legacy_gas_metering = !is_istanbul
			&& (self.is_revision(Revision::Petersburg) || !self.is_revision(Revision::Constantinople));

		if legacy_gas_metering {
			if old_value.is_zero() {
				return StorageStatus::Added;
			} else if value.is_zero() {
				self.add_refund(15000);
				return StorageStatus::Deleted;
			}
			return StorageStatus::Modified;
		}

		if original == current {
			if original.is_zero() {
				return StorageStatus::Added;
			}
			if value.is_zero() {
				self.add_refund(15000);
				return StorageStatus::Deleted;
			}
			return StorageStatus::Modified;
		}

		if !original.is_zero() {
			if current.is_zero() {
				// the slot was recreated after an earlier delete
				self.sub_refund(15000);
			} else if value.is_zero() {
				self.add_refund(15000);
			}
		}
		if original == value {
			if original.is_zero() {
				// the slot was used as scratch space within the
				// transaction
				if is_istanbul {
					self.add_refund(19200);
				} else {
					self.add_refund(19800);
				}
			} else if is_istanbul {
				self.add_refund(4200);
			} else {
				self.add_refund(4800);
			}
		}
		StorageStatus::ModifiedAgain
	}

	/// Raw overlay write; a zero value records a deletion.
	pub fn set_state(&mut self, addr: H160, key: H256, value: H256) {
		self.upsert_account(addr, true, |object| {
			let object = object.expect("created on demand");
			if value.is_zero() {
				object.storage.insert(key, None);
			} else {
				object.storage.insert(key, Some(value));
			}
		});
	}

	/// Live slot value: the overlay if the transaction wrote the slot,
	/// else the backend.
	pub fn get_state(&self, addr: H160, key: H256) -> H256 {
		let object = match self.get_state_object(addr) {
			Some(object) => object,
			None => return H256::zero(),
		};

		if let Some(value) = object.storage.get(&key) {
			return value.unwrap_or_default();
		}
		self.snapshot.get_storage(addr, object.account.root, key)
	}

	/// Slot value as of the start of the transaction, bypassing every
	/// overlay write.
	pub fn get_committed_state(&self, addr: H160, key: H256) -> H256 {
		let object = match self.get_state_object(addr) {
			Some(object) => object,
			None => return H256::zero(),
		};
		self.snapshot.get_storage(addr, object.account.root, key)
	}

	// logs

	pub fn emit_log(&mut self, addr: H160, topics: Vec<H256>, data: Vec<u8>) {
		self.top_mut().logs.push(Log {
			address: addr,
			topics,
			data,
		});
	}

	/// Drain the logs accumulated so far, in emission order.
	pub fn take_logs(&mut self) -> Vec<Log> {
		let mut logs = Vec::new();
		for layer in &mut self.layers {
			logs.append(&mut layer.logs);
		}
		logs
	}

	// refund counter

	pub fn add_refund(&mut self, gas: u64) {
		let refund = self.get_refund() + gas;
		self.top_mut().refund = Some(refund);
	}

	pub fn sub_refund(&mut self, gas: u64) {
		let refund = self.get_refund() - gas;
		self.top_mut().refund = Some(refund);
	}

	pub fn get_refund(&self) -> u64 {
		for layer in self.layers.iter().rev() {
			if let Some(refund) = layer.refund {
				return refund;
			}
		}
		0
	}

	// lifecycle

	/// Mark the account suicided and zero its balance. Returns whether
	/// this was the first suicide of the account.
	pub fn suicide(&mut self, addr: H160) -> bool {
		let mut suicided = false;
		self.upsert_account(addr, false, |object| {
			if let Some(object) = object {
				suicided = !object.suicide;
				object.suicide = true;
				object.account.balance = U256::zero();
			}
		});
		suicided
	}

	pub fn has_suicided(&self, addr: H160) -> bool {
		self.get_state_object(addr)
			.map(|object| object.suicide)
			.unwrap_or(false)
	}

	/// Force the account into the overlay so the empty-account sweep
	/// can see it.
	pub fn touch_account(&mut self, addr: H160) {
		self.upsert_account(addr, true, |_| {});
	}

	/// Reset the account to a fresh state, preserving only its
	/// balance. Used for the Spurious Dragon create-with-nonce rule.
	pub fn create_account(&mut self, addr: H160) {
		let mut object = StateObject::default();
		if let Some(prev) = self.get_state_object(addr) {
			object.account.balance = prev.account.balance;
		}
		self.top_mut().objects.insert(addr, object);
	}

	pub fn account_exists(&self, addr: H160) -> bool {
		if self.rev >= Revision::SpuriousDragon {
			return !self.empty(addr);
		}
		self.get_state_object(addr).is_some()
	}

	fn empty(&self, addr: H160) -> bool {
		match self.get_state_object(addr) {
			Some(object) => object.empty(),
			None => true,
		}
	}

	/// Post-transaction sweep: suicided objects become deleted, and so
	/// do empty-but-touched ones when `delete_empty` is set. The
	/// refund counter is cleared for the next transaction.
	pub fn clean_delete_objects(&mut self, delete_empty: bool) {
		let mut remove = Vec::new();
		for (addr, object) in self.merged_overlay() {
			if object.suicide || object.empty() && delete_empty {
				remove.push(addr);
			}
		}

		for addr in remove {
			let mut object = self
				.overlay_object(addr)
				.cloned()
				.expect("swept objects come from the overlay");
			object.deleted = true;
			self.top_mut().objects.insert(addr, object);
		}

		for layer in &mut self.layers {
			layer.refund = None;
		}
	}

	/// Latest version of every overlay entry, raw.
	fn merged_overlay(&self) -> BTreeMap<H160, &StateObject> {
		let mut merged = BTreeMap::new();
		for layer in &self.layers {
			for (addr, object) in &layer.objects {
				merged.insert(*addr, object);
			}
		}
		merged
	}

	/// Enumerate the final state changes for the trie builder.
	pub fn commit(&self) -> Vec<Object> {
		let mut objects = Vec::new();

		for (addr, object) in self.merged_overlay() {
			let mut out = Object {
				address: addr,
				nonce: object.account.nonce,
				balance: object.account.balance,
				root: object.account.root,
				code_hash: object.account.code_hash,
				dirty_code: object.dirty_code,
				code: object.account.code.clone(),
				deleted: object.deleted,
				storage: Vec::new(),
			};

			if !object.deleted {
				for (key, value) in &object.storage {
					out.storage.push(StorageObject {
						key: *key,
						value: value.unwrap_or_default(),
						deleted: value.is_none(),
					});
				}
			}

			objects.push(out);
		}

		objects
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::backend::{EmptyState, InMemoryState};
	use crate::state::EMPTY_CODE_HASH;

	fn addr(n: u8) -> H160 {
		H160::repeat_byte(n)
	}

	fn key(n: u8) -> H256 {
		H256::repeat_byte(n)
	}

	#[test]
	fn balance_round_trip() {
		let state = EmptyState;
		let mut txn = Txn::new(&state, Revision::Istanbul);

		txn.add_balance(addr(1), U256::from(100));
		assert_eq!(txn.get_balance(addr(1)), U256::from(100));

		txn.sub_balance(addr(1), U256::from(30)).unwrap();
		assert_eq!(txn.get_balance(addr(1)), U256::from(70));

		assert_eq!(
			txn.sub_balance(addr(1), U256::from(100)),
			Err(VmError::InsufficientFunds)
		);

		// deducting zero from a missing account is a no-op
		assert_eq!(txn.sub_balance(addr(2), U256::zero()), Ok(()));
	}

	#[test]
	fn revert_rewinds_accounts_logs_and_refund() {
		let state = EmptyState;
		let mut txn = Txn::new(&state, Revision::Istanbul);

		txn.add_balance(addr(1), U256::from(5));
		txn.emit_log(addr(1), vec![], vec![1]);
		txn.add_refund(100);

		let snapshot = txn.snapshot();

		txn.add_balance(addr(1), U256::from(5));
		txn.set_balance(addr(2), U256::from(9));
		txn.emit_log(addr(1), vec![], vec![2]);
		txn.add_refund(50);
		assert_eq!(txn.get_refund(), 150);

		txn.revert_to_snapshot(snapshot);

		assert_eq!(txn.get_balance(addr(1)), U256::from(5));
		assert_eq!(txn.get_balance(addr(2)), U256::zero());
		assert_eq!(txn.get_refund(), 100);
		assert_eq!(txn.take_logs().len(), 1);
	}

	#[test]
	fn revert_twice_to_the_same_snapshot() {
		let state = EmptyState;
		let mut txn = Txn::new(&state, Revision::Istanbul);

		let snapshot = txn.snapshot();
		txn.set_balance(addr(1), U256::from(1));
		txn.revert_to_snapshot(snapshot);

		txn.set_balance(addr(1), U256::from(2));
		txn.revert_to_snapshot(snapshot);

		assert_eq!(txn.get_balance(addr(1)), U256::zero());
	}

	#[test]
	fn nested_snapshots_rewind_independently() {
		let state = EmptyState;
		let mut txn = Txn::new(&state, Revision::Istanbul);

		let outer = txn.snapshot();
		txn.set_balance(addr(1), U256::from(1));

		let inner = txn.snapshot();
		txn.set_balance(addr(1), U256::from(2));

		txn.revert_to_snapshot(inner);
		assert_eq!(txn.get_balance(addr(1)), U256::from(1));

		txn.revert_to_snapshot(outer);
		assert_eq!(txn.get_balance(addr(1)), U256::zero());
	}

	#[test]
	fn storage_reads_through_backend() {
		let mut state = InMemoryState::new();
		state.set_balance(addr(1), U256::one());
		state.set_storage(addr(1), key(1), key(9));

		let mut txn = Txn::new(&state, Revision::Istanbul);
		assert_eq!(txn.get_state(addr(1), key(1)), key(9));
		assert_eq!(txn.get_committed_state(addr(1), key(1)), key(9));

		txn.set_state(addr(1), key(1), key(7));
		assert_eq!(txn.get_state(addr(1), key(1)), key(7));
		// the committed view is unaffected by overlay writes
		assert_eq!(txn.get_committed_state(addr(1), key(1)), key(9));

		// a zero write is a deletion, distinct from never-written
		txn.set_state(addr(1), key(1), H256::zero());
		assert_eq!(txn.get_state(addr(1), key(1)), H256::zero());
	}

	#[test]
	fn sstore_classification_fresh_slot() {
		let state = EmptyState;
		let mut txn = Txn::new(&state, Revision::Istanbul);

		// 0 -> 1: added, no refund
		assert_eq!(
			txn.set_storage(addr(1), key(1), key(2)),
			StorageStatus::Added
		);
		assert_eq!(txn.get_refund(), 0);

		// 1 -> 1: unchanged
		assert_eq!(
			txn.set_storage(addr(1), key(1), key(2)),
			StorageStatus::Unchanged
		);

		// 1 -> 0 in the same transaction: the refund for clearing,
		// plus the reset-to-original credit
		assert_eq!(
			txn.set_storage(addr(1), key(1), H256::zero()),
			StorageStatus::ModifiedAgain
		);
		assert_eq!(txn.get_refund(), 19200);
	}

	#[test]
	fn sstore_classification_committed_slot() {
		let mut state = InMemoryState::new();
		state.set_balance(addr(1), U256::one());
		state.set_storage(addr(1), key(1), key(9));

		let mut txn = Txn::new(&state, Revision::Istanbul);

		// 9 -> 0: delete, 15000 refund
		assert_eq!(
			txn.set_storage(addr(1), key(1), H256::zero()),
			StorageStatus::Deleted
		);
		assert_eq!(txn.get_refund(), 15000);

		// 0 -> 9 again: recreate takes the refund back, restore adds
		// the reset credit
		assert_eq!(
			txn.set_storage(addr(1), key(1), key(9)),
			StorageStatus::ModifiedAgain
		);
		assert_eq!(txn.get_refund(), 15000 - 15000 + 4200);
	}

	#[test]
	fn sstore_legacy_metering() {
		let state = EmptyState;
		let mut txn = Txn::new(&state, Revision::Homestead);

		assert_eq!(
			txn.set_storage(addr(1), key(1), key(2)),
			StorageStatus::Added
		);
		assert_eq!(
			txn.set_storage(addr(1), key(1), key(3)),
			StorageStatus::Modified
		);
		assert_eq!(
			txn.set_storage(addr(1), key(1), H256::zero()),
			StorageStatus::Deleted
		);
		assert_eq!(txn.get_refund(), 15000);
	}

	#[test]
	fn suicide_zeroes_balance_once() {
		let state = EmptyState;
		let mut txn = Txn::new(&state, Revision::Istanbul);

		// no object: nothing to suicide
		assert!(!txn.suicide(addr(1)));

		txn.set_balance(addr(1), U256::from(5));
		assert!(txn.suicide(addr(1)));
		assert!(txn.has_suicided(addr(1)));
		assert_eq!(txn.get_balance(addr(1)), U256::zero());

		// second suicide is not "first"
		assert!(!txn.suicide(addr(1)));
	}

	#[test]
	fn sweep_deletes_suicided_and_empty() {
		let state = EmptyState;
		let mut txn = Txn::new(&state, Revision::Istanbul);

		txn.set_balance(addr(1), U256::from(5));
		txn.suicide(addr(1));
		txn.touch_account(addr(2));
		txn.set_balance(addr(3), U256::from(1));
		txn.add_refund(1000);

		txn.clean_delete_objects(true);

		assert!(txn.get_account(addr(1)).is_none());
		assert!(txn.get_account(addr(2)).is_none());
		assert!(txn.get_account(addr(3)).is_some());
		assert_eq!(txn.get_refund(), 0);

		let committed = txn.commit();
		let deleted: Vec<_> = committed.iter().filter(|o| o.deleted).collect();
		assert_eq!(deleted.len(), 2);
	}

	#[test]
	fn sweep_keeps_empty_without_flag() {
		let state = EmptyState;
		let mut txn = Txn::new(&state, Revision::Homestead);

		txn.touch_account(addr(2));
		txn.clean_delete_objects(false);
		assert!(txn.get_account(addr(2)).is_some());
	}

	#[test]
	fn sealing_reward_resurrects_suicided_account() {
		let state = EmptyState;
		let mut txn = Txn::new(&state, Revision::Istanbul);

		txn.set_balance(addr(1), U256::from(40));
		txn.suicide(addr(1));
		txn.add_sealing_reward(addr(1), U256::from(3));

		// only the reward survives the resurrection
		assert_eq!(txn.get_balance(addr(1)), U256::from(3));
		assert!(!txn.has_suicided(addr(1)));

		txn.add_sealing_reward(addr(2), U256::from(5));
		txn.add_sealing_reward(addr(2), U256::from(5));
		assert_eq!(txn.get_balance(addr(2)), U256::from(10));
	}

	#[test]
	fn create_account_preserves_balance() {
		let state = EmptyState;
		let mut txn = Txn::new(&state, Revision::Istanbul);

		txn.set_balance(addr(1), U256::from(77));
		txn.incr_nonce(addr(1));
		txn.create_account(addr(1));

		assert_eq!(txn.get_balance(addr(1)), U256::from(77));
		assert_eq!(txn.get_nonce(addr(1)), 0);
	}

	#[test]
	fn code_hash_of_empty_account_is_zero() {
		let state = EmptyState;
		let mut txn = Txn::new(&state, Revision::Istanbul);

		txn.touch_account(addr(1));
		assert_eq!(txn.get_code_hash(addr(1)), H256::zero());

		txn.set_code(addr(1), vec![0x00]);
		assert_ne!(txn.get_code_hash(addr(1)), H256::zero());
		assert_ne!(txn.get_code_hash(addr(1)), EMPTY_CODE_HASH);
		assert_eq!(txn.get_code(addr(1)), vec![0x00]);
		assert_eq!(txn.get_code_size(addr(1)), 1);
	}

	#[test]
	fn account_exists_depends_on_revision() {
		let state = EmptyState;

		let mut txn = Txn::new(&state, Revision::Istanbul);
		txn.touch_account(addr(1));
		// an empty account does not "exist" from Spurious Dragon on
		assert!(!txn.account_exists(addr(1)));
		txn.set_balance(addr(1), U256::one());
		assert!(txn.account_exists(addr(1)));

		let mut txn = Txn::new(&state, Revision::Homestead);
		txn.touch_account(addr(1));
		assert!(txn.account_exists(addr(1)));
	}

	#[test]
	fn commit_reports_storage_deletions() {
		let mut state = InMemoryState::new();
		state.set_balance(addr(1), U256::one());
		state.set_storage(addr(1), key(1), key(9));

		let mut txn = Txn::new(&state, Revision::Istanbul);
		txn.set_storage(addr(1), key(1), H256::zero());
		txn.set_storage(addr(1), key(2), key(3));

		let objects = txn.commit();
		assert_eq!(objects.len(), 1);
		let storage = &objects[0].storage;
		assert_eq!(storage.len(), 2);
		assert!(storage.iter().any(|s| s.key == key(1) && s.deleted));
		assert!(storage
			.iter()
			.any(|s| s.key == key(2) && s.value == key(3) && !s.deleted));
	}
}
