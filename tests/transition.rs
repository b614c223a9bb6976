//! End-to-end message application against an in-memory snapshot.

use ethervm::{
	create_address, Cheatcode, Config, InMemoryState, Message, Transition, TransitionError,
	TxContext,
};
use primitive_types::{H160, H256, U256};
use std::cell::Cell;
use std::rc::Rc;

fn sender() -> H160 {
	H160::repeat_byte(0x11)
}

fn coinbase() -> H160 {
	H160::repeat_byte(0xcb)
}

fn funded_state() -> InMemoryState {
	let mut state = InMemoryState::new();
	state.set_balance(sender(), U256::from(10_000_000u64));
	state
}

fn config(state: &InMemoryState) -> Config<'_> {
	Config::new(state).with_context(TxContext {
		coinbase: coinbase(),
		number: 100,
		timestamp: 1_600_000_000,
		gas_limit: 10_000_000,
		chain_id: 1,
		..TxContext::default()
	})
}

fn message(to: Option<H160>, input: Vec<u8>) -> Message {
	Message {
		nonce: 0,
		gas_price: U256::one(),
		gas: 100_000,
		to,
		value: U256::zero(),
		input,
		from: sender(),
	}
}

#[test]
fn plain_value_transfer() {
	let mut state = funded_state();
	let recipient = H160::repeat_byte(0x22);
	state.set_balance(recipient, U256::from(5u64));

	let mut transition = Transition::new(config(&state));
	let mut msg = message(Some(recipient), Vec::new());
	msg.value = U256::from(95u64);

	let output = transition.write(&msg).unwrap();

	assert!(output.success);
	assert_eq!(msg.gas - output.gas_left, 21000);
	assert_eq!(
		transition.txn().get_balance(recipient),
		U256::from(100u64)
	);
	assert_eq!(
		transition.txn().get_balance(sender()),
		U256::from(10_000_000u64 - 95 - 21000)
	);
	assert_eq!(transition.txn().get_balance(coinbase()), U256::from(21000u64));
	assert_eq!(transition.txn().get_nonce(sender()), 1);
}

#[test]
fn add_program_end_to_end() {
	let mut state = funded_state();
	let contract = H160::repeat_byte(0x22);
	// PUSH1 1; PUSH1 2; ADD; STOP
	state.set_code(contract, hex::decode("600160020100").unwrap());

	let mut transition = Transition::new(config(&state));
	let output = transition.write(&message(Some(contract), Vec::new())).unwrap();

	assert!(output.success);
	assert!(output.return_value.is_empty());
	assert_eq!(100_000 - output.gas_left, 21000 + 9);
}

#[test]
fn sstore_refund_capped_at_half_gas_used() {
	let mut state = funded_state();
	let contract = H160::repeat_byte(0x22);
	// write 1 then 0 to slot 0
	state.set_code(contract, hex::decode("6001600055600060005500").unwrap());

	let mut transition = Transition::new(config(&state));
	let output = transition.write(&message(Some(contract), Vec::new())).unwrap();

	assert!(output.success);
	// execution: 3+3+20000 for the add, 3+3+800 for the clear
	let execution = 20812u64;
	let refund = 19200u64;
	assert_eq!(100_000 - output.gas_left, 21000 + execution - refund);
	// the refund never exceeds half the gas used
	assert!(refund <= (21000 + execution) / 2);
}

#[test]
fn reverted_frame_rewinds_storage_but_keeps_gas() {
	let mut state = funded_state();
	let contract = H160::repeat_byte(0x22);
	// SSTORE(0, 1) then REVERT(0, 0)
	state.set_code(contract, hex::decode("600160005560006000fd").unwrap());

	let mut transition = Transition::new(config(&state));
	let output = transition.write(&message(Some(contract), Vec::new())).unwrap();

	assert!(!output.success);
	// 5 pushes, one fresh SSTORE, a free revert
	assert_eq!(100_000 - output.gas_left, 21000 + 20012);
	assert_eq!(
		transition.txn().get_state(contract, H256::zero()),
		H256::zero()
	);
	// no refund sneaks in from the reverted write
	assert_eq!(transition.txn().get_refund(), 0);
}

#[test]
fn create_deploys_returned_code() {
	let state = funded_state();
	let mut transition = Transition::new(config(&state));

	// MSTORE8(0, 1); RETURN(0, 1) - deploys the single byte 0x01
	let init = hex::decode("600160005360016000f3").unwrap();
	let msg = message(None, init);
	let output = transition.write(&msg).unwrap();

	assert!(output.success);
	let created = create_address(sender(), 0);
	assert_eq!(output.contract_address, created);
	assert_eq!(transition.txn().get_code(created), vec![0x01]);
	// created accounts start at nonce 1 from Spurious Dragon
	assert_eq!(transition.txn().get_nonce(created), 1);
	assert_eq!(transition.txn().get_nonce(sender()), 1);

	// intrinsic 53000 + 136 input bytes, 18 execution, 200 deposit
	assert_eq!(100_000 - output.gas_left, 53136 + 18 + 200);
}

#[test]
fn create_collision_fails() {
	let mut state = funded_state();
	// an account with a nonce already lives at the target address
	let created = create_address(sender(), 0);
	state.set_account(
		created,
		ethervm::Account {
			nonce: 7,
			..Default::default()
		},
	);

	let mut transition = Transition::new(config(&state));
	let output = transition.write(&message(None, vec![0x00])).unwrap();

	assert!(!output.success);
	assert_eq!(output.gas_left, 0);
}

#[test]
fn oversized_deployment_reverts() {
	let state = funded_state();
	let mut transition = Transition::new(config(&state));

	// RETURN(0, 24577): one byte over the Spurious Dragon limit
	let init = hex::decode("6160016000f3").unwrap();
	let mut msg = message(None, init);
	msg.gas = 2_000_000;
	let output = transition.write(&msg).unwrap();

	assert!(!output.success);
	assert_eq!(output.gas_left, 0);
	let created = create_address(sender(), 0);
	assert_eq!(transition.txn().get_code(created), Vec::<u8>::new());
}

#[test]
fn logs_are_collected_in_order() {
	let mut state = funded_state();
	let contract = H160::repeat_byte(0x22);
	// LOG1 with topic 0xaa over an empty memory range
	state.set_code(contract, hex::decode("60aa60006000a100").unwrap());

	let mut transition = Transition::new(config(&state));
	let output = transition.write(&message(Some(contract), Vec::new())).unwrap();

	assert!(output.success);
	assert_eq!(output.logs.len(), 1);
	assert_eq!(output.logs[0].address, contract);
	assert_eq!(
		output.logs[0].topics,
		vec![H256::from_low_u64_be(0xaa)]
	);
	assert!(output.logs[0].data.is_empty());
}

#[test]
fn selfdestruct_moves_balance_and_sweeps() {
	let mut state = funded_state();
	let contract = H160::repeat_byte(0x22);
	let heir = H160::repeat_byte(0x33);
	state.set_balance(contract, U256::from(100u64));
	// PUSH20 heir; SELFDESTRUCT
	let mut code = vec![0x73];
	code.extend_from_slice(heir.as_bytes());
	code.push(0xff);
	state.set_code(contract, code);

	let mut transition = Transition::new(config(&state));
	let output = transition.write(&message(Some(contract), Vec::new())).unwrap();

	assert!(output.success);
	assert_eq!(transition.txn().get_balance(heir), U256::from(100u64));
	// the suicided account is gone after the sweep
	assert!(transition.txn().get_account(contract).is_none());

	// PUSH20 plus 5000 base plus 25000 for the fresh beneficiary,
	// minus the 24000 suicide refund
	assert_eq!(100_000 - output.gas_left, 21000 + 3 + 30000 - 24000);

	let objects = transition.commit();
	assert!(objects
		.iter()
		.any(|object| object.address == contract && object.deleted));
}

#[test]
fn precompile_reachable_through_call() {
	let state = funded_state();
	let mut transition = Transition::new(config(&state));

	let identity = H160::from_low_u64_be(4);
	let msg = message(Some(identity), hex::decode("deadbeef").unwrap());
	let output = transition.write(&msg).unwrap();

	assert!(output.success);
	assert_eq!(output.return_value, hex::decode("deadbeef").unwrap());
	// intrinsic with four non-zero bytes, then the identity cost
	assert_eq!(100_000 - output.gas_left, 21000 + 4 * 16 + 18);
}

struct Recorder {
	address: H160,
	hits: Rc<Cell<usize>>,
}

impl Cheatcode for Recorder {
	fn can_run(&self, addr: H160) -> bool {
		addr == self.address
	}

	fn run(&self, _addr: H160, _input: &[u8]) {
		self.hits.set(self.hits.get() + 1);
	}
}

#[test]
fn cheatcode_short_circuits_with_zero_gas() {
	let state = funded_state();
	let target = H160::repeat_byte(0x77);
	let hits = Rc::new(Cell::new(0));

	let config = config(&state).with_cheatcode(Box::new(Recorder {
		address: target,
		hits: hits.clone(),
	}));
	let mut transition = Transition::new(config);

	let output = transition.write(&message(Some(target), Vec::new())).unwrap();

	assert!(output.success);
	assert_eq!(hits.get(), 1);
	// only the intrinsic charge applies
	assert_eq!(100_000 - output.gas_left, 21000);
}

#[test]
fn pre_check_failures() {
	let state = funded_state();

	let mut transition = Transition::new(config(&state));
	let mut msg = message(Some(H160::zero()), Vec::new());
	msg.nonce = 3;
	assert_eq!(
		transition.write(&msg),
		Err(TransitionError::IncorrectNonce)
	);

	let mut transition = Transition::new(config(&state));
	let mut msg = message(Some(H160::zero()), Vec::new());
	msg.gas = 20_000_000; // more than the sender can escrow at price 1
	assert_eq!(
		transition.write(&msg),
		Err(TransitionError::NotEnoughFundsForGas)
	);

	let mut transition = Transition::new(config(&state));
	let mut msg = message(Some(H160::zero()), Vec::new());
	msg.gas = 20_999;
	assert_eq!(
		transition.write(&msg),
		Err(TransitionError::IntrinsicGasTooLow)
	);

	let mut transition = Transition::new(config(&state));
	let mut msg = message(Some(H160::zero()), Vec::new());
	msg.value = U256::from(100_000_000u64);
	assert_eq!(
		transition.write(&msg),
		Err(TransitionError::InsufficientFunds)
	);
}

#[test]
fn nested_call_propagates_value() {
	let mut state = funded_state();
	let outer = H160::repeat_byte(0x22);
	let inner = H160::repeat_byte(0x33);

	// outer: CALL(gas=0x2710, to=inner, value=7, no data, no ret)
	let mut code = Vec::new();
	code.extend_from_slice(&hex::decode("60006000600060006007").unwrap());
	code.push(0x73); // PUSH20 inner
	code.extend_from_slice(inner.as_bytes());
	code.extend_from_slice(&hex::decode("612710f100").unwrap());
	state.set_code(outer, code);
	state.set_balance(outer, U256::from(50u64));

	let mut transition = Transition::new(config(&state));
	let output = transition.write(&message(Some(outer), Vec::new())).unwrap();

	assert!(output.success);
	assert_eq!(transition.txn().get_balance(inner), U256::from(7u64));
	assert_eq!(transition.txn().get_balance(outer), U256::from(43u64));
}
