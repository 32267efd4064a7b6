//! xALGO Common Library
//!
//! Shared types, constants, and utilities for the xALGO consensus pool.
//!
//! The pool takes ALGO deposits, mints the xALGO derivative token against
//! them and keeps the deposits spread across a bounded set of proposer
//! accounts that have delegated signing authority to the pool. Rewards
//! earned by the proposers raise the xALGO/ALGO rate; a fee on those
//! rewards accrues to the protocol admin.
//!
//! ## Modules
//!
//! - **constants**: Token, precision, fee and storage-cost constants
//! - **errors**: `ConsensusError` with stable codes
//! - **types**: Global state, roles, grouped transaction components
//! - **math**: Fixed-point rate math with widened intermediates
//! - **layout**: Byte-exact codecs for persisted records
//! - **events**: Protocol events and their indexer log encoding
//! - **validation**: Transaction guards and raw parameter parsers
//!
//! This crate is `no_std` compatible when built without the `std` feature.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

// Re-export Vec for submodules based on feature
#[cfg(not(feature = "std"))]
pub use alloc::vec::Vec;
#[cfg(feature = "std")]
pub use std::vec::Vec;

pub mod constants;
pub mod errors;
pub mod types;
pub mod math;
pub mod layout;
pub mod events;
pub mod validation;

// Re-exports for convenience
pub use constants::*;
pub use errors::*;
pub use types::*;
pub use math::*;
pub use layout::*;
pub use events::*;
