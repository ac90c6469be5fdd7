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

//! Error types for ledger operations.

use thiserror::Error;

/// Broad class of a [`LedgerError`], used to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller supplied missing or malformed input.
    Validation,
    /// The referenced bottle or transaction does not exist.
    NotFound,
    /// The store failed.
    Server,
}

/// Failures reported by a [`Store`](crate::Store) implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store could not be reached or refused the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The write conflicts with the stored state.
    #[error("store conflict: {0}")]
    Conflict(String),
}

/// Ledger operation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Serial number is missing or blank
    #[error("serial number is required")]
    MissingSerial,

    /// A required submission field is missing or blank
    #[error("missing required fields: serial, gasCode, transactionType, quantityKg")]
    MissingFields,

    /// Type tag outside the fixed enumeration
    #[error("invalid transactionType: {0}")]
    InvalidTransactionType(String),

    /// Quantity is not a finite number greater than zero
    #[error("quantityKg must be a positive number")]
    InvalidQuantity,

    /// A finite number that does not fit a decimal (28 significant digits)
    #[error("{0} is outside the supported decimal range")]
    OutOfRange(&'static str),

    /// Opening balance is not a finite number
    #[error("openingBalanceKg must be a number")]
    InvalidOpeningBalance,

    /// Request body is not valid JSON or a field has the wrong type
    #[error("malformed request body: {0}")]
    MalformedBody(String),

    /// Timestamp is not RFC 3339
    #[error("invalid occurredAt: {0}")]
    InvalidTimestamp(String),

    /// Unknown bottle serial
    #[error("bottle not found")]
    BottleNotFound,

    /// Unknown transaction id
    #[error("transaction not found")]
    TransactionNotFound,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::MissingSerial
            | LedgerError::MissingFields
            | LedgerError::InvalidTransactionType(_)
            | LedgerError::InvalidQuantity
            | LedgerError::OutOfRange(_)
            | LedgerError::InvalidOpeningBalance
            | LedgerError::MalformedBody(_)
            | LedgerError::InvalidTimestamp(_) => ErrorKind::Validation,
            LedgerError::BottleNotFound | LedgerError::TransactionNotFound => ErrorKind::NotFound,
            LedgerError::Store(_) => ErrorKind::Server,
        }
    }
}
