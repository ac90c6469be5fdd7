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

//! Bottle balance calculation.
//!
//! [`compute_bottle_state`] folds a bottle's transactions into its current
//! quantity, infers the gas the bottle holds when none is assigned directly,
//! and produces the ledger rows shown for the bottle.
//!
//! # Example
//!
//! ```
//! use bottle_ledger_rs::{Bottle, BottleSerial, compute_bottle_state};
//! use rust_decimal_macros::dec;
//!
//! let mut bottle = Bottle::new(BottleSerial::from("B-001"));
//! bottle.opening_balance = Some(dec!(10));
//!
//! let state = compute_bottle_state(&bottle, &[]);
//! assert_eq!(state.current_quantity, dec!(10));
//! assert!(state.gas.is_none());
//! ```

use crate::base::{BottleSerial, GasCode, TransactionId};
use crate::bottle::Bottle;
use crate::transaction::{Transaction, TransactionKind};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::ser::{Serialize, SerializeStruct, Serializer};

/// Decimal places kept when quantities are serialized.
pub const DECIMAL_PRECISION: u32 = 4;

/// Status marker reported for every bottle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BottleStatus {
    Active,
}

impl BottleStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BottleStatus::Active => "active",
        }
    }
}

/// One row of a bottle's ledger, with its gas resolved for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRow {
    pub id: TransactionId,
    pub occurred_at: DateTime<Utc>,
    pub kind: TransactionKind,
    pub gas: Option<GasCode>,
    pub quantity: Decimal,
    pub notes: Option<String>,
}

/// Read model of a bottle: balance, gas and ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BottleState {
    pub serial: BottleSerial,
    pub status: BottleStatus,
    /// Directly assigned gas, or the gas inferred from the transactions.
    pub gas: Option<GasCode>,
    pub opening_balance: Decimal,
    pub current_quantity: Decimal,
    /// Rows in ascending occurrence order.
    pub ledger: Vec<LedgerRow>,
}

/// Computes the state of `bottle` from its transactions.
///
/// `transactions` must already be ordered ascending by occurrence time; the
/// ledger keeps that order. Missing quantities and a missing opening balance
/// count as zero.
///
/// The bottle's own gas always wins. Without one, the gas is taken from the
/// first inflow (`fill`, `recover`, `transfer_in`) with a positive quantity;
/// if there is no such inflow, or it carries no gas, the last transaction's
/// gas is used.
pub fn compute_bottle_state(bottle: &Bottle, transactions: &[Transaction]) -> BottleState {
    let opening_balance = bottle.opening_balance_or_zero();
    let current_quantity = transactions
        .iter()
        .fold(opening_balance, |acc, tx| acc + tx.quantity_or_zero());

    let gas = bottle
        .gas_code
        .clone()
        .or_else(|| infer_gas(transactions));

    let ledger = transactions
        .iter()
        .map(|tx| LedgerRow {
            id: tx.id,
            occurred_at: tx.occurred_at,
            kind: tx.kind,
            gas: tx.gas_code.clone().or_else(|| gas.clone()),
            quantity: tx.quantity_or_zero(),
            notes: tx.notes.clone(),
        })
        .collect();

    BottleState {
        serial: bottle.serial.clone(),
        status: BottleStatus::Active,
        gas,
        opening_balance,
        current_quantity,
        ledger,
    }
}

/// Infers a gas from transaction history alone.
fn infer_gas(transactions: &[Transaction]) -> Option<GasCode> {
    let first_inflow = transactions
        .iter()
        .find(|tx| tx.kind.is_inflow() && tx.quantity_or_zero() > Decimal::ZERO);

    match first_inflow.and_then(|tx| tx.gas_code.clone()) {
        Some(code) => Some(code),
        None => transactions.last().and_then(|tx| tx.gas_code.clone()),
    }
}

fn rounded(value: Decimal) -> Decimal {
    value.round_dp(DECIMAL_PRECISION)
}

impl Serialize for LedgerRow {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("LedgerRow", 6)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("occurredAt", &self.occurred_at)?;
        state.serialize_field("type", &self.kind)?;
        state.serialize_field("gas", &self.gas)?;
        state.serialize_field("quantityKg", &rounded(self.quantity))?;
        state.serialize_field("notes", &self.notes)?;
        state.end()
    }
}

impl Serialize for BottleState {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("BottleState", 6)?;
        state.serialize_field("serial", &self.serial)?;
        state.serialize_field("status", self.status.as_str())?;
        state.serialize_field("gas", &self.gas)?;
        state.serialize_field("openingBalanceKg", &rounded(self.opening_balance))?;
        state.serialize_field("currentQuantityKg", &rounded(self.current_quantity))?;
        state.serialize_field("ledger", &self.ledger)?;
        state.end()
    }
}
