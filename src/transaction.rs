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

//! Transaction types and the stored transaction record.
//!
//! Every [`TransactionKind`] belongs to exactly one [`Direction`]. The sign of a
//! stored quantity is fixed from that direction when the transaction is written
//! and is never re-derived when reading.

use crate::base::{BottleSerial, GasCode, TransactionId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Direction class of a transaction type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Gas enters the bottle; stored quantity is positive.
    Inflow,
    /// Gas leaves the bottle; stored quantity is negative.
    Outflow,
}

impl Direction {
    /// Applies this direction's sign to a magnitude.
    pub fn signed(self, magnitude: Decimal) -> Decimal {
        let magnitude = magnitude.abs();
        match self {
            Direction::Inflow => magnitude,
            Direction::Outflow => -magnitude,
        }
    }
}

/// Fixed enumeration of transaction types.
///
/// | Type | Direction |
/// |------|-----------|
/// | `fill`, `recover`, `transfer_in` | inflow |
/// | `charge`, `transfer_out`, `return`, `reversal` | outflow |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Fill,
    Recover,
    TransferIn,
    Charge,
    TransferOut,
    Return,
    Reversal,
}

impl TransactionKind {
    pub const ALL: [TransactionKind; 7] = [
        TransactionKind::Fill,
        TransactionKind::Recover,
        TransactionKind::TransferIn,
        TransactionKind::Charge,
        TransactionKind::TransferOut,
        TransactionKind::Return,
        TransactionKind::Reversal,
    ];

    pub fn direction(self) -> Direction {
        match self {
            Self::Fill | Self::Recover | Self::TransferIn => Direction::Inflow,
            Self::Charge | Self::TransferOut | Self::Return | Self::Reversal => {
                Direction::Outflow
            }
        }
    }

    pub fn is_inflow(self) -> bool {
        self.direction() == Direction::Inflow
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fill => "fill",
            Self::Recover => "recover",
            Self::TransferIn => "transfer_in",
            Self::Charge => "charge",
            Self::TransferOut => "transfer_out",
            Self::Return => "return",
            Self::Reversal => "reversal",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a type tag is not part of the fixed enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKind(pub String);

impl FromStr for TransactionKind {
    type Err = UnknownKind;

    /// Type tags are matched exactly, as stored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

/// A stored transaction against a bottle.
///
/// `quantity` is optional because stored rows may carry a null quantity; such
/// rows count as zero everywhere a balance is computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    pub serial: BottleSerial,
    #[serde(rename = "transactionType")]
    pub kind: TransactionKind,
    #[serde(rename = "quantityKg")]
    pub quantity: Option<Decimal>,
    pub occurred_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub gas_code: Option<GasCode>,
}

impl Transaction {
    /// Quantity with a missing value coerced to zero.
    pub fn quantity_or_zero(&self) -> Decimal {
        self.quantity.unwrap_or(Decimal::ZERO)
    }
}
