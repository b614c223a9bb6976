//! Contract address derivation for CREATE and CREATE2.

use primitive_types::{H160, H256};
use rlp::RlpStream;
use sha3::{Digest, Keccak256};

/// `keccak256(rlp([sender, nonce]))[12..]`
pub fn create_address(sender: H160, nonce: u64) -> H160 {
	let mut stream = RlpStream::new_list(2);
	stream.append(&sender);
	stream.append(&nonce);

	let hash = Keccak256::digest(stream.out());
	H160::from_slice(&hash[12..])
}

/// `keccak256(0xff ++ sender ++ salt ++ keccak256(init_code))[12..]`
pub fn create_address2(sender: H160, salt: H256, init_code: &[u8]) -> H160 {
	let init_hash = Keccak256::digest(init_code);

	let mut hasher = Keccak256::new();
	hasher.update([0xff]);
	hasher.update(sender.as_bytes());
	hasher.update(salt.as_bytes());
	hasher.update(init_hash);

	let hash = hasher.finalize();
	H160::from_slice(&hash[12..])
}
