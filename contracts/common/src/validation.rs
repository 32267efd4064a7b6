//! Validation Helpers for the xALGO Consensus Pool
//!
//! Reusable checks for call parameters and grouped transactions.
//!
//! ## Features
//!
//! - `check!` macro for cleaner validation code
//! - Rekey / close-out guards for grouped payments and asset transfers
//! - Fixed-width parsers for raw call parameters
//!
//! ## Usage
//!
//! ```rust,ignore
//! use xalgo_common::validation::{check, check_payment};
//!
//! check!(amount > 0, ConsensusError::ZeroAmount);
//! check_payment(&txn, &caller, &app_address)?;
//! ```

use crate::{
    errors::{ConsensusError, ConsensusResult},
    types::{Address, AssetId, AssetTransferTxn, Hash32, Nonce, PaymentTxn, TxnShape, ZERO_ADDRESS},
};

// ============ Validation Macro ============

/// Check a condition and return an error if it fails.
///
/// # Examples
///
/// ```rust,ignore
/// check!(fee <= MAX_FEE, ConsensusError::FeeTooHigh { fee, max: MAX_FEE });
/// ```
#[macro_export]
macro_rules! check {
    ($condition:expr, $error:expr) => {
        if !($condition) {
            return Err($error);
        }
    };
}

pub use check;

// ============ Transaction Guards ============

/// Reject a transaction that rekeys or closes out the sender's account.
pub fn rekey_and_close_to_check(shape: &TxnShape) -> ConsensusResult<()> {
    check!(
        shape.rekey_to == ZERO_ADDRESS,
        ConsensusError::InvalidTransaction { reason: "rekey_to must be unset" }
    );
    check!(
        shape.close_remainder_to == ZERO_ADDRESS,
        ConsensusError::InvalidTransaction { reason: "close_remainder_to must be unset" }
    );
    check!(
        shape.asset_close_to == ZERO_ADDRESS,
        ConsensusError::InvalidTransaction { reason: "asset_close_to must be unset" }
    );
    Ok(())
}

/// Validate a grouped payment from `sender` to `receiver`.
pub fn check_payment(txn: &PaymentTxn, sender: &Address, receiver: &Address) -> ConsensusResult<()> {
    rekey_and_close_to_check(&txn.shape)?;
    check!(
        txn.sender == *sender,
        ConsensusError::InvalidTransaction { reason: "payment sender mismatch" }
    );
    check!(
        txn.receiver == *receiver,
        ConsensusError::InvalidTransaction { reason: "payment receiver mismatch" }
    );
    Ok(())
}

/// Validate a grouped asset transfer of `asset_id` from `sender` to `receiver`.
pub fn check_asset_transfer(
    txn: &AssetTransferTxn,
    sender: &Address,
    receiver: &Address,
    asset_id: AssetId,
) -> ConsensusResult<()> {
    rekey_and_close_to_check(&txn.shape)?;
    check!(
        txn.asset_id == asset_id,
        ConsensusError::InvalidTransaction { reason: "unexpected asset" }
    );
    check!(
        txn.sender == *sender,
        ConsensusError::InvalidTransaction { reason: "asset transfer sender mismatch" }
    );
    check!(
        txn.receiver == *receiver,
        ConsensusError::InvalidTransaction { reason: "asset transfer receiver mismatch" }
    );
    Ok(())
}

/// Require the signer to hold a role.
pub fn require_role(holder: Address, signer: Address) -> ConsensusResult<()> {
    check!(
        holder == signer,
        ConsensusError::Unauthorized { expected: holder, actual: signer }
    );
    Ok(())
}

// ============ Raw Parameter Parsers ============

fn parse_fixed<const N: usize>(param: &'static str, bytes: &[u8]) -> ConsensusResult<[u8; N]> {
    <[u8; N]>::try_from(bytes).map_err(|_| ConsensusError::InvalidLength {
        param,
        expected: N,
        actual: bytes.len(),
    })
}

/// Parse a 32-byte address.
pub fn parse_address(param: &'static str, bytes: &[u8]) -> ConsensusResult<Address> {
    parse_fixed(param, bytes)
}

/// Parse a 32-byte SHA-256 digest.
pub fn parse_hash(param: &'static str, bytes: &[u8]) -> ConsensusResult<Hash32> {
    parse_fixed(param, bytes)
}

/// Parse a `NONCE_SIZE`-byte delayed mint nonce.
pub fn parse_nonce(bytes: &[u8]) -> ConsensusResult<Nonce> {
    parse_fixed("nonce", bytes)
}

/// Parse a 64-byte state proof key.
pub fn parse_state_proof_key(bytes: &[u8]) -> ConsensusResult<[u8; 64]> {
    parse_fixed("state_proof_key", bytes)
}

// ============ Tests ============

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_macro() {
        fn positive(value: u64) -> ConsensusResult<()> {
            check!(value > 0, ConsensusError::ZeroAmount);
            Ok(())
        }

        assert!(positive(100).is_ok());
        assert_eq!(positive(0), Err(ConsensusError::ZeroAmount));
    }

    #[test]
    fn test_rekey_and_close_to_check() {
        assert!(rekey_and_close_to_check(&TxnShape::default()).is_ok());

        let rekeyed = TxnShape { rekey_to: [1u8; 32], ..TxnShape::default() };
        assert!(rekey_and_close_to_check(&rekeyed).is_err());

        let closed = TxnShape { close_remainder_to: [1u8; 32], ..TxnShape::default() };
        assert!(rekey_and_close_to_check(&closed).is_err());

        let asset_closed = TxnShape { asset_close_to: [1u8; 32], ..TxnShape::default() };
        assert!(rekey_and_close_to_check(&asset_closed).is_err());
    }

    #[test]
    fn test_check_payment() {
        let user = [1u8; 32];
        let app = [2u8; 32];
        let txn = PaymentTxn::new(user, app, 1_000);

        assert!(check_payment(&txn, &user, &app).is_ok());
        assert!(check_payment(&txn, &app, &app).is_err());
        assert!(check_payment(&txn, &user, &user).is_err());
    }

    #[test]
    fn test_check_asset_transfer() {
        let user = [1u8; 32];
        let app = [2u8; 32];
        let txn = AssetTransferTxn::new(user, app, 7, 50);

        assert!(check_asset_transfer(&txn, &user, &app, 7).is_ok());
        assert!(check_asset_transfer(&txn, &user, &app, 8).is_err());

        let mut closing = txn.clone();
        closing.shape.asset_close_to = app;
        assert!(check_asset_transfer(&closing, &user, &app, 7).is_err());
    }

    #[test]
    fn test_require_role() {
        assert!(require_role([1u8; 32], [1u8; 32]).is_ok());
        assert_eq!(
            require_role([1u8; 32], [2u8; 32]),
            Err(ConsensusError::Unauthorized { expected: [1u8; 32], actual: [2u8; 32] })
        );
    }

    #[test]
    fn test_parsers_check_length() {
        assert_eq!(parse_address("receiver", &[9u8; 32]).unwrap(), [9u8; 32]);
        assert_eq!(
            parse_address("receiver", &[9u8; 31]),
            Err(ConsensusError::InvalidLength { param: "receiver", expected: 32, actual: 31 })
        );
        assert_eq!(parse_nonce(&[0, 1]).unwrap(), [0, 1]);
        assert!(parse_nonce(&[0, 1, 2]).is_err());
        assert!(parse_state_proof_key(&[0u8; 64]).is_ok());
        assert!(parse_hash("approval", &[]).is_err());
    }
}
