//! Signed interpretation of stack words.
//!
//! `SDIV`, `SMOD`, `SLT`, `SGT` and `SAR` view the 256-bit word as a
//! two's-complement integer. [I256] carries the sign separately from
//! the magnitude; converting from and back to [U256] performs the
//! two's-complement mapping, so the round trip is exactly the
//! `to256`/`toU256` coercion pair.

use core::cmp::Ordering;
use core::ops::{Div, Rem};

use primitive_types::U256;

/// Sign of an [I256].
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Sign {
	Plus,
	Minus,
	Zero,
}

impl Sign {
	fn rank(self) -> i8 {
		match self {
			Sign::Minus => -1,
			Sign::Zero => 0,
			Sign::Plus => 1,
		}
	}
}

/// A 256-bit word split into sign and magnitude.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct I256(pub Sign, pub U256);

impl I256 {
	pub fn zero() -> I256 {
		I256(Sign::Zero, U256::zero())
	}

	/// `-2^255`, the one value whose negation does not fit.
	pub fn min_value() -> I256 {
		I256(Sign::Minus, U256::one() << 255)
	}
}

impl From<U256> for I256 {
	fn from(val: U256) -> I256 {
		if val.is_zero() {
			I256::zero()
		} else if val.bit(255) {
			I256(Sign::Minus, !val + U256::one())
		} else {
			I256(Sign::Plus, val)
		}
	}
}

impl From<I256> for U256 {
	fn from(value: I256) -> U256 {
		match value.0 {
			Sign::Zero => U256::zero(),
			Sign::Plus => value.1,
			Sign::Minus => !value.1 + U256::one(),
		}
	}
}

impl Ord for I256 {
	fn cmp(&self, other: &I256) -> Ordering {
		match self.0.rank().cmp(&other.0.rank()) {
			// between two negatives the larger magnitude is smaller
			Ordering::Equal if self.0 == Sign::Minus => self.1.cmp(&other.1).reverse(),
			Ordering::Equal => self.1.cmp(&other.1),
			unequal => unequal,
		}
	}
}

impl PartialOrd for I256 {
	fn partial_cmp(&self, other: &I256) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Div for I256 {
	type Output = I256;

	fn div(self, other: I256) -> I256 {
		// division by zero yields zero; integer `/` would panic here
		if other.1.is_zero() {
			return I256::zero();
		}

		// -2^255 divided by 1 or -1 has magnitude 2^255, which does
		// not fit a positive I256; both wrap back to -2^255
		if self == I256::min_value() && other.1 == U256::one() {
			return I256::min_value();
		}

		let magnitude = self.1 / other.1;
		if magnitude.is_zero() {
			return I256::zero();
		}

		if (self.0 == Sign::Minus) == (other.0 == Sign::Minus) {
			I256(Sign::Plus, magnitude)
		} else {
			I256(Sign::Minus, magnitude)
		}
	}
}

impl Rem for I256 {
	type Output = I256;

	fn rem(self, other: I256) -> I256 {
		// modulus by zero yields zero; integer `%` would panic here
		if other.1.is_zero() {
			return I256::zero();
		}

		let magnitude = self.1 % other.1;
		if magnitude.is_zero() {
			return I256::zero();
		}

		// truncated division: the remainder takes the dividend's sign
		I256(self.0, magnitude)
	}
}
