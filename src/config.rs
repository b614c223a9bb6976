//! Transition configuration: revision, block context, the snapshot
//! backend, the block-hash source and test-only cheatcodes.

use ethervm_interpreter::{Revision, TxContext};
use primitive_types::{H160, H256};
use sha3::{Digest, Keccak256};

use crate::backend::{EmptyState, Snapshot};

/// Maps a block number to its hash, for `BLOCKHASH`.
pub type GetHashFn = Box<dyn Fn(u64) -> H256>;

/// An address-matched input interceptor that short-circuits execution
/// with zero gas consumed. Test-only; external to the protocol.
pub trait Cheatcode {
	fn can_run(&self, addr: H160) -> bool;
	fn run(&self, addr: H160, input: &[u8]);
}

static EMPTY_STATE: EmptyState = EmptyState;

/// Parametrization of a [crate::Transition].
pub struct Config<'a> {
	pub state: &'a dyn Snapshot,
	pub rev: Revision,
	pub ctx: TxContext,
	pub get_hash: GetHashFn,
	pub cheatcodes: Vec<Box<dyn Cheatcode>>,
}

impl<'a> Config<'a> {
	pub fn new(state: &'a dyn Snapshot) -> Self {
		Config {
			state,
			rev: Revision::Istanbul,
			ctx: TxContext::default(),
			get_hash: Box::new(default_get_hash),
			cheatcodes: Vec::new(),
		}
	}

	pub fn with_revision(mut self, rev: Revision) -> Self {
		self.rev = rev;
		self
	}

	pub fn with_context(mut self, ctx: TxContext) -> Self {
		self.ctx = ctx;
		self
	}

	pub fn with_get_hash(mut self, get_hash: GetHashFn) -> Self {
		self.get_hash = get_hash;
		self
	}

	pub fn with_cheatcode(mut self, cheatcode: Box<dyn Cheatcode>) -> Self {
		self.cheatcodes.push(cheatcode);
		self
	}
}

impl Default for Config<'static> {
	fn default() -> Self {
		Config::new(&EMPTY_STATE)
	}
}

fn default_get_hash(number: u64) -> H256 {
	H256::from_slice(&Keccak256::digest(number.to_string().as_bytes()))
}
