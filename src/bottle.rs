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

//! Bottle and gas records.

use crate::base::{BottleSerial, GasCode};
use crate::transaction::Transaction;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A refrigerant gas known to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gas {
    pub code: GasCode,
    pub name: String,
}

impl Gas {
    /// Gases created on demand are named after their code.
    pub fn from_code(code: GasCode) -> Self {
        let name = code.0.clone();
        Self { code, name }
    }
}

/// A tracked bottle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bottle {
    pub serial: BottleSerial,
    /// Balance before the first recorded transaction. Absent means zero.
    #[serde(rename = "openingBalanceKg")]
    pub opening_balance: Option<Decimal>,
    /// Gas assigned directly to the bottle, if any.
    pub gas_code: Option<GasCode>,
}

impl Bottle {
    pub fn new(serial: BottleSerial) -> Self {
        Self {
            serial,
            opening_balance: None,
            gas_code: None,
        }
    }

    pub fn opening_balance_or_zero(&self) -> Decimal {
        self.opening_balance.unwrap_or(Decimal::ZERO)
    }
}

/// A bottle together with its transactions, ascending by occurrence time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BottleHistory {
    pub bottle: Bottle,
    pub transactions: Vec<Transaction>,
}
