//! Cooler Common Library
//!
//! Shared types, constants, and utilities for the collateralized lending
//! core: the MonoCooler money market, the deposit manager and the
//! fixed-term clearinghouse.
//!
//! ## Key Features
//!
//! - **Fixed-Point Math**: WAD/RAY arithmetic with explicit rounding direction
//! - **Continuous Compounding**: Taylor series `e^x` with range reduction
//! - **Typed Errors**: Structured error kinds carrying attempted vs. allowed amounts
//! - **Event Log**: Indexable events, discarded together with aborted state
//! - **Capability Traits**: Treasury, governance token, custody, delegation and vault seams
//! - **In-Memory Capabilities**: Ledger-backed implementations for tests and simulation
//!
//! This crate is `no_std` compatible when built without the `std` feature.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

// Re-export collections for submodules based on feature
#[cfg(not(feature = "std"))]
pub use alloc::vec::Vec;
#[cfg(feature = "std")]
pub use std::vec::Vec;

#[cfg(not(feature = "std"))]
pub use alloc::collections::BTreeMap;
#[cfg(feature = "std")]
pub use std::collections::BTreeMap;

pub mod constants;
pub mod errors;
pub mod types;
pub mod math;
pub mod events;
pub mod capabilities;
pub mod memory;

// Re-exports for convenience
pub use constants::*;
pub use errors::*;
pub use types::*;
pub use math::*;
pub use events::*;
pub use capabilities::*;
pub use memory::*;
