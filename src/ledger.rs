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

//! Ledger service.
//!
//! The [`Ledger`] is the central component: it validates requests, assigns the
//! quantity sign from the transaction type, keeps gas and bottle records in
//! step with submitted transactions, and computes bottle state on read.
//!
//! # Operations
//!
//! - **Bottle state**: balance, gas and ledger rows for a serial.
//! - **Submit**: record a new transaction, creating the bottle and gas if needed.
//! - **Edit**: change type, quantity, gas, notes or timestamp of a transaction.
//! - **Delete**: remove a transaction. No compensating entry is written.
//! - **Register**: set a bottle's opening balance.

use crate::balance::{BottleState, compute_bottle_state};
use crate::base::{BottleSerial, GasCode, TransactionId};
use crate::bottle::Bottle;
use crate::request::{
    EditTransaction, RegisterBottle, SubmitTransaction, non_blank, parse_kind,
    parse_opening_balance, parse_timestamp, positive_quantity, quantity_magnitude,
};
use crate::store::{MemoryStore, Store};
use crate::transaction::Transaction;
use crate::LedgerError;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

/// Bottle ledger over a [`Store`].
///
/// Cloning is cheap; clones share the same store.
///
/// # Invariants
///
/// - Stored quantities of inflow types are positive, outflow types negative.
/// - A submitted transaction's bottle is re-pointed at the transaction's gas.
/// - Balances are never stored; they are recomputed from history on every read.
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn Store>,
}

impl Ledger {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Creates a ledger backed by an empty [`MemoryStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    /// Computes the current state of the bottle with `serial`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::MissingSerial`] - `serial` is blank.
    /// - [`LedgerError::BottleNotFound`] - no bottle has this serial.
    pub fn bottle_state(&self, serial: &str) -> Result<BottleState, LedgerError> {
        let serial = non_blank(Some(serial)).ok_or(LedgerError::MissingSerial)?;
        let history = self
            .store
            .find_bottle(&BottleSerial::new(serial))?
            .ok_or(LedgerError::BottleNotFound)?;

        let state = compute_bottle_state(&history.bottle, &history.transactions);
        debug!(
            serial = %state.serial,
            rows = state.ledger.len(),
            current = %state.current_quantity,
            "computed bottle state"
        );
        Ok(state)
    }

    /// Creates a bottle or replaces its opening balance and gas.
    ///
    /// Fields left out of `request` keep their stored value. Existing
    /// transactions are not touched.
    pub fn register_bottle(&self, request: RegisterBottle) -> Result<Bottle, LedgerError> {
        let serial = non_blank(request.serial.as_deref())
            .map(BottleSerial::new)
            .ok_or(LedgerError::MissingSerial)?;
        let opening_balance = request
            .opening_balance
            .as_ref()
            .map(parse_opening_balance)
            .transpose()?;

        let gas = match non_blank(request.gas_code.as_deref()) {
            Some(code) => Some(self.store.upsert_gas(&GasCode::new(code))?.code),
            None => None,
        };

        let bottle = self
            .store
            .register_bottle(&serial, opening_balance, gas.as_ref())?;

        info!(serial = %bottle.serial, opening = ?bottle.opening_balance, "registered bottle");
        Ok(bottle)
    }

    /// Records a new transaction.
    ///
    /// The gas is created if unknown, and the bottle is created or re-pointed
    /// at that gas. The quantity is a magnitude; inflow types store it
    /// positive and outflow types negative.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::MissingFields`] - serial, gas, type or quantity absent.
    /// - [`LedgerError::InvalidTransactionType`] - type outside the enumeration.
    /// - [`LedgerError::InvalidQuantity`] - quantity not a finite number above zero.
    /// - [`LedgerError::OutOfRange`] - quantity too large or too small for a decimal.
    /// - [`LedgerError::InvalidTimestamp`] - `occurredAt` is not RFC 3339.
    pub fn submit(&self, request: SubmitTransaction) -> Result<Transaction, LedgerError> {
        let (Some(serial), Some(gas_code), Some(tag), Some(quantity)) = (
            non_blank(request.serial.as_deref()),
            non_blank(request.gas_code.as_deref()),
            non_blank(request.transaction_type.as_deref()),
            request.quantity.as_ref(),
        ) else {
            return Err(LedgerError::MissingFields);
        };

        let kind = parse_kind(tag)?;
        let magnitude = quantity_magnitude(quantity)?;
        let occurred_at = match non_blank(request.occurred_at.as_deref()) {
            Some(text) => parse_timestamp(text)?,
            None => Utc::now(),
        };

        let gas = self.store.upsert_gas(&GasCode::new(gas_code))?;
        let bottle = self
            .store
            .upsert_bottle(&BottleSerial::new(serial), Some(&gas.code))?;

        let transaction = Transaction {
            id: TransactionId::generate(),
            serial: bottle.serial,
            kind,
            quantity: Some(kind.direction().signed(magnitude)),
            occurred_at,
            notes: request.notes,
            gas_code: Some(gas.code),
        };
        self.store.insert_transaction(transaction.clone())?;

        info!(
            id = %transaction.id,
            serial = %transaction.serial,
            kind = %transaction.kind,
            quantity = ?transaction.quantity,
            "recorded transaction"
        );
        Ok(transaction)
    }

    /// Applies a partial update to a transaction.
    ///
    /// Type and quantity are validated as on submission, and the sign is
    /// re-derived from the resulting type. Without a new quantity the stored
    /// magnitude is reused; an explicit `null` quantity is rejected. A non-blank gas code also re-points the owning
    /// bottle at that gas.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::TransactionNotFound`] - unknown id.
    /// - Validation errors as for [`Ledger::submit`].
    pub fn edit(
        &self,
        id: &TransactionId,
        request: EditTransaction,
    ) -> Result<Transaction, LedgerError> {
        let existing = self
            .store
            .get_transaction(id)?
            .ok_or(LedgerError::TransactionNotFound)?;

        let kind = match request.transaction_type.as_deref() {
            Some(tag) => parse_kind(tag.trim())?,
            None => existing.kind,
        };
        let magnitude = match &request.quantity {
            Some(quantity) => quantity_magnitude(quantity)?,
            None => positive_quantity(existing.quantity.map(|q| q.abs()))?,
        };
        let occurred_at = match non_blank(request.occurred_at.as_deref()) {
            Some(text) => parse_timestamp(text)?,
            None => existing.occurred_at,
        };

        let gas_code = match non_blank(request.gas_code.as_deref()) {
            Some(code) => {
                let gas = self.store.upsert_gas(&GasCode::new(code))?;
                self.store.upsert_bottle(&existing.serial, Some(&gas.code))?;
                Some(gas.code)
            }
            None => existing.gas_code,
        };

        let updated = Transaction {
            id: existing.id,
            serial: existing.serial,
            kind,
            quantity: Some(kind.direction().signed(magnitude)),
            occurred_at,
            notes: request.notes.or(existing.notes),
            gas_code,
        };
        if !self.store.update_transaction(updated.clone())? {
            return Err(LedgerError::TransactionNotFound);
        }

        info!(
            id = %updated.id,
            serial = %updated.serial,
            kind = %updated.kind,
            quantity = ?updated.quantity,
            "edited transaction"
        );
        Ok(updated)
    }

    /// Removes a transaction unconditionally.
    pub fn delete(&self, id: &TransactionId) -> Result<Transaction, LedgerError> {
        let removed = self
            .store
            .delete_transaction(id)?
            .ok_or(LedgerError::TransactionNotFound)?;
        info!(id = %removed.id, serial = %removed.serial, "deleted transaction");
        Ok(removed)
    }

    pub fn transaction(&self, id: &TransactionId) -> Result<Transaction, LedgerError> {
        self.store
            .get_transaction(id)?
            .ok_or(LedgerError::TransactionNotFound)
    }

    /// Returns all transactions, newest first.
    pub fn transactions(&self) -> Result<Vec<Transaction>, LedgerError> {
        Ok(self.store.list_transactions()?)
    }

    /// Returns the state of every bottle, ordered by serial.
    pub fn bottle_states(&self) -> Result<Vec<BottleState>, LedgerError> {
        let mut states = Vec::new();
        for bottle in self.store.list_bottles()? {
            if let Some(history) = self.store.find_bottle(&bottle.serial)? {
                states.push(compute_bottle_state(&history.bottle, &history.transactions));
            }
        }
        Ok(states)
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::in_memory()
    }
}
