use thiserror::Error;

/// Failure of a transaction before or while entering execution. These
/// abort the transaction without touching state; failures *inside*
/// execution surface through [crate::Output::success] instead.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
	#[error("incorrect nonce")]
	IncorrectNonce,

	#[error("not enough funds to cover gas costs")]
	NotEnoughFundsForGas,

	#[error("not enough funds for transfer with given value")]
	InsufficientFunds,

	#[error("overflow in intrinsic gas calculation")]
	IntrinsicGasOverflow,

	#[error("not enough gas supplied for intrinsic gas costs")]
	IntrinsicGasTooLow,
}
