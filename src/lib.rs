// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! # Bottle Ledger
//!
//! This library tracks refrigerant gas bottles and the transactions applied to
//! them: fills, recoveries and transfers in; charges, transfers out, returns
//! and reversals out. It computes each bottle's running balance, infers the
//! gas it holds, and renders its ledger.
//!
//! ## Core Components
//!
//! - [`Ledger`]: Validates and records transactions, computes bottle state
//! - [`compute_bottle_state`]: Balance and gas inference over a bottle's history
//! - [`Store`]: Persistence contract, with [`MemoryStore`] as the in-memory backend
//! - [`TransactionKind`]: Supported transaction types and their direction
//! - [`LedgerError`]: Error types for ledger operations
//!
//! ## Example
//!
//! ```
//! use bottle_ledger_rs::{GasCode, Ledger, SubmitTransaction};
//! use rust_decimal_macros::dec;
//!
//! let ledger = Ledger::in_memory();
//!
//! ledger
//!     .submit(SubmitTransaction::new("B-001", "R410A", "fill", dec!(5)))
//!     .unwrap();
//! ledger
//!     .submit(SubmitTransaction::new("B-001", "R410A", "charge", dec!(1.5)))
//!     .unwrap();
//!
//! let state = ledger.bottle_state("B-001").unwrap();
//! assert_eq!(state.current_quantity, dec!(3.5));
//! assert_eq!(state.gas, Some(GasCode::from("R410A")));
//! ```

pub mod balance;
mod base;
mod bottle;
pub mod config;
pub mod error;
pub mod http;
mod ledger;
pub mod request;
pub mod store;
pub mod telemetry;
mod transaction;

pub use balance::{BottleState, BottleStatus, LedgerRow, compute_bottle_state};
pub use base::{BottleSerial, GasCode, TransactionId};
pub use bottle::{Bottle, BottleHistory, Gas};
pub use error::{ErrorKind, LedgerError, StoreError};
pub use ledger::Ledger;
pub use request::{
    EditTransaction, QuantityError, QuantityInput, RegisterBottle, SubmitTransaction,
};
pub use store::{MemoryStore, Store};
pub use transaction::{Direction, Transaction, TransactionKind, UnknownKind};
