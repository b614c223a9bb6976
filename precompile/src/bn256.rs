//! BN254 curve contracts: point addition, scalar multiplication and
//! the pairing check. EIP-1108 cut the prices at Istanbul.

use bn::{pairing_batch, AffineG1, AffineG2, Fq, Fq2, Group, Gt, G1, G2};
use ethervm_interpreter::Revision;
use primitive_types::U256;

use crate::{read_padded, Precompile, PrecompileError};

fn read_point(input: &[u8], offset: &mut usize) -> Result<G1, PrecompileError> {
	let buf = read_padded(input, offset, 64);

	let px = Fq::from_slice(&buf[0..32]).map_err(|_| "invalid point x coordinate")?;
	let py = Fq::from_slice(&buf[32..64]).map_err(|_| "invalid point y coordinate")?;

	if px == Fq::zero() && py == Fq::zero() {
		Ok(G1::zero())
	} else {
		Ok(AffineG1::new(px, py)
			.map_err(|_| "point not on curve")?
			.into())
	}
}

fn write_point(point: G1) -> Vec<u8> {
	let mut buf = [0u8; 64];
	if let Some(affine) = AffineG1::from_jacobian(point) {
		// the point at infinity stays all zeroes
		affine
			.x()
			.to_big_endian(&mut buf[0..32])
			.expect("32-byte destination");
		affine
			.y()
			.to_big_endian(&mut buf[32..64])
			.expect("32-byte destination");
	}
	buf.to_vec()
}

pub struct Bn256Add;

impl Precompile for Bn256Add {
	fn gas(&self, _input: &[u8], rev: Revision) -> u64 {
		if rev >= Revision::Istanbul {
			150
		} else {
			500
		}
	}

	fn run(&self, input: &[u8]) -> Result<Vec<u8>, PrecompileError> {
		let mut offset = 0;
		let p1 = read_point(input, &mut offset)?;
		let p2 = read_point(input, &mut offset)?;

		Ok(write_point(p1 + p2))
	}
}

pub struct Bn256Mul;

impl Precompile for Bn256Mul {
	fn gas(&self, _input: &[u8], rev: Revision) -> u64 {
		if rev >= Revision::Istanbul {
			6000
		} else {
			40000
		}
	}

	fn run(&self, input: &[u8]) -> Result<Vec<u8>, PrecompileError> {
		let mut offset = 0;
		let p = read_point(input, &mut offset)?;

		let buf = read_padded(input, &mut offset, 32);
		let fr = bn::Fr::from_slice(&buf).map_err(|_| "invalid scalar")?;

		Ok(write_point(p * fr))
	}
}

pub struct Bn256Pairing;

impl Precompile for Bn256Pairing {
	fn gas(&self, input: &[u8], rev: Revision) -> u64 {
		let (base, point) = if rev >= Revision::Istanbul {
			(45_000, 34_000)
		} else {
			(100_000, 80_000)
		};
		base + point * (input.len() / 192) as u64
	}

	fn run(&self, input: &[u8]) -> Result<Vec<u8>, PrecompileError> {
		let verdict = if input.is_empty() {
			true
		} else {
			if input.len() % 192 != 0 {
				return Err("bad elliptic curve pairing size".into());
			}

			let mut pairs = Vec::with_capacity(input.len() / 192);
			for chunk in input.chunks_exact(192) {
				let ax = Fq::from_slice(&chunk[0..32]).map_err(|_| "invalid a x coordinate")?;
				let ay = Fq::from_slice(&chunk[32..64]).map_err(|_| "invalid a y coordinate")?;

				// G2 coordinates arrive with the imaginary part first
				let bay = Fq::from_slice(&chunk[64..96]).map_err(|_| "invalid b coefficient")?;
				let bax = Fq::from_slice(&chunk[96..128]).map_err(|_| "invalid b coefficient")?;
				let bby = Fq::from_slice(&chunk[128..160]).map_err(|_| "invalid b coefficient")?;
				let bbx = Fq::from_slice(&chunk[160..192]).map_err(|_| "invalid b coefficient")?;

				let b_a = Fq2::new(bax, bay);
				let b_b = Fq2::new(bbx, bby);

				let b = if b_a.is_zero() && b_b.is_zero() {
					G2::zero()
				} else {
					G2::from(AffineG2::new(b_a, b_b).map_err(|_| "b point not on curve")?)
				};
				let a = if ax.is_zero() && ay.is_zero() {
					G1::zero()
				} else {
					G1::from(AffineG1::new(ax, ay).map_err(|_| "a point not on curve")?)
				};
				pairs.push((a, b));
			}

			pairing_batch(&pairs) == Gt::one()
		};

		let mut out = [0u8; 32];
		if verdict {
			U256::one().to_big_endian(&mut out);
		}
		Ok(out.to_vec())
	}
}
