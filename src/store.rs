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

//! Persistence contract and the in-memory store.
//!
//! [`Store`] is everything the ledger needs from a database: bottle lookup with
//! ordered history, gas and bottle upserts, and transaction CRUD. Calls are
//! blocking and carry no timeout or retry of their own.
//!
//! [`MemoryStore`] keeps every table in a [`DashMap`], so individual record
//! upserts are atomic while reads spanning several records are not.

use crate::base::{BottleSerial, GasCode, TransactionId};
use crate::bottle::{Bottle, BottleHistory, Gas};
use crate::error::StoreError;
use crate::transaction::Transaction;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rust_decimal::Decimal;
use std::cmp::Reverse;
use std::sync::atomic::{AtomicU64, Ordering};

/// Storage backend for bottles, gases and transactions.
pub trait Store: Send + Sync {
    /// Looks up a bottle with its transactions, ascending by occurrence time.
    fn find_bottle(&self, serial: &BottleSerial) -> Result<Option<BottleHistory>, StoreError>;

    /// Returns every bottle, ordered by serial.
    fn list_bottles(&self) -> Result<Vec<Bottle>, StoreError>;

    /// Returns the gas for `code`, creating it (named after the code) if absent.
    fn upsert_gas(&self, code: &GasCode) -> Result<Gas, StoreError>;

    /// Returns the bottle for `serial`, creating it if absent. When `gas` is
    /// given the bottle's gas association is set to it.
    fn upsert_bottle(
        &self,
        serial: &BottleSerial,
        gas: Option<&GasCode>,
    ) -> Result<Bottle, StoreError>;

    /// Like [`Store::upsert_bottle`], and also sets the opening balance when
    /// given. Both changes land in one atomic write of the bottle record.
    fn register_bottle(
        &self,
        serial: &BottleSerial,
        opening_balance: Option<Decimal>,
        gas: Option<&GasCode>,
    ) -> Result<Bottle, StoreError>;

    /// Stores a new transaction.
    ///
    /// Fails with [`StoreError::Conflict`] if the id is already taken.
    fn insert_transaction(&self, transaction: Transaction) -> Result<(), StoreError>;

    /// Replaces a stored transaction. Returns `false` if the id is unknown.
    fn update_transaction(&self, transaction: Transaction) -> Result<bool, StoreError>;

    /// Removes a transaction, returning it if it existed.
    fn delete_transaction(&self, id: &TransactionId) -> Result<Option<Transaction>, StoreError>;

    fn get_transaction(&self, id: &TransactionId) -> Result<Option<Transaction>, StoreError>;

    /// Returns every transaction, descending by occurrence time.
    fn list_transactions(&self) -> Result<Vec<Transaction>, StoreError>;
}

/// Transaction plus its insertion sequence, which breaks timestamp ties.
#[derive(Debug, Clone)]
struct StoredTransaction {
    sequence: u64,
    transaction: Transaction,
}

/// In-memory [`Store`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    gases: DashMap<GasCode, Gas>,
    bottles: DashMap<BottleSerial, Bottle>,
    transactions: DashMap<TransactionId, StoredTransaction>,
    sequence: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the gas registered under `code`, if any.
    pub fn gas(&self, code: &GasCode) -> Option<Gas> {
        self.gases.get(code).map(|gas| gas.value().clone())
    }
}

fn sorted_ascending(mut rows: Vec<StoredTransaction>) -> Vec<Transaction> {
    rows.sort_by_key(|row| (row.transaction.occurred_at, row.sequence));
    rows.into_iter().map(|row| row.transaction).collect()
}

impl Store for MemoryStore {
    fn find_bottle(&self, serial: &BottleSerial) -> Result<Option<BottleHistory>, StoreError> {
        let Some(bottle) = self.bottles.get(serial).map(|b| b.value().clone()) else {
            return Ok(None);
        };

        let rows: Vec<StoredTransaction> = self
            .transactions
            .iter()
            .filter(|entry| entry.transaction.serial == *serial)
            .map(|entry| entry.value().clone())
            .collect();

        Ok(Some(BottleHistory {
            bottle,
            transactions: sorted_ascending(rows),
        }))
    }

    fn list_bottles(&self) -> Result<Vec<Bottle>, StoreError> {
        let mut bottles: Vec<Bottle> = self.bottles.iter().map(|b| b.value().clone()).collect();
        bottles.sort_by(|a, b| a.serial.cmp(&b.serial));
        Ok(bottles)
    }

    fn upsert_gas(&self, code: &GasCode) -> Result<Gas, StoreError> {
        let gas = self
            .gases
            .entry(code.clone())
            .or_insert_with(|| Gas::from_code(code.clone()));
        Ok(gas.value().clone())
    }

    fn upsert_bottle(
        &self,
        serial: &BottleSerial,
        gas: Option<&GasCode>,
    ) -> Result<Bottle, StoreError> {
        let mut bottle = self
            .bottles
            .entry(serial.clone())
            .or_insert_with(|| Bottle::new(serial.clone()));
        if let Some(code) = gas {
            bottle.gas_code = Some(code.clone());
        }
        Ok(bottle.value().clone())
    }

    fn register_bottle(
        &self,
        serial: &BottleSerial,
        opening_balance: Option<Decimal>,
        gas: Option<&GasCode>,
    ) -> Result<Bottle, StoreError> {
        // The entry guard holds the shard lock across both field writes
        let mut bottle = self
            .bottles
            .entry(serial.clone())
            .or_insert_with(|| Bottle::new(serial.clone()));
        if let Some(code) = gas {
            bottle.gas_code = Some(code.clone());
        }
        if opening_balance.is_some() {
            bottle.opening_balance = opening_balance;
        }
        Ok(bottle.value().clone())
    }

    fn insert_transaction(&self, transaction: Transaction) -> Result<(), StoreError> {
        // Entry API keeps the duplicate check and the insert atomic
        match self.transactions.entry(transaction.id) {
            Entry::Occupied(_) => Err(StoreError::Conflict(format!(
                "transaction {} already exists",
                transaction.id
            ))),
            Entry::Vacant(entry) => {
                let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
                entry.insert(StoredTransaction {
                    sequence,
                    transaction,
                });
                Ok(())
            }
        }
    }

    fn update_transaction(&self, transaction: Transaction) -> Result<bool, StoreError> {
        match self.transactions.get_mut(&transaction.id) {
            Some(mut stored) => {
                stored.transaction = transaction;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_transaction(&self, id: &TransactionId) -> Result<Option<Transaction>, StoreError> {
        Ok(self
            .transactions
            .remove(id)
            .map(|(_, stored)| stored.transaction))
    }

    fn get_transaction(&self, id: &TransactionId) -> Result<Option<Transaction>, StoreError> {
        Ok(self
            .transactions
            .get(id)
            .map(|stored| stored.transaction.clone()))
    }

    fn list_transactions(&self) -> Result<Vec<Transaction>, StoreError> {
        let mut rows: Vec<StoredTransaction> =
            self.transactions.iter().map(|e| e.value().clone()).collect();
        rows.sort_by_key(|row| Reverse((row.transaction.occurred_at, row.sequence)));
        Ok(rows.into_iter().map(|row| row.transaction).collect())
    }
}
