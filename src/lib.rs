//! Deterministic EVM execution engine.
//!
//! Given a [Message] and a read-only [Snapshot] of world state, a
//! [Transition] executes the message exactly per protocol rules for
//! the configured [Revision] and yields an [Output] plus the set of
//! committed [Object]s destined for an external trie builder.
//!
//! The engine is split in three: the bytecode interpreter (the
//! `ethervm-interpreter` crate), the precompiled contracts
//! (`ethervm-precompile`), and this crate, which owns the
//! transactional state overlay ([Txn]) and the transition driver.

mod address;
mod backend;
mod config;
mod error;
mod state;
mod transition;
mod txn;

pub use crate::address::{create_address, create_address2};
pub use crate::backend::{EmptyState, InMemoryState, Snapshot};
pub use crate::config::{Cheatcode, Config, GetHashFn};
pub use crate::error::TransitionError;
pub use crate::state::{
	Account, Contract, Log, Message, Object, Output, StateObject, StorageObject, EMPTY_CODE_HASH,
	EMPTY_ROOT_HASH,
};
pub use crate::transition::{
	transaction_gas_cost, Transition, TX_GAS, TX_GAS_CONTRACT_CREATION,
};
pub use crate::txn::Txn;

pub use ethervm_interpreter::{
	CallKind, Host, Revision, StorageStatus, TxContext, VmError,
};
