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

//! Request payloads for ledger writes.
//!
//! Payloads arrive loosely typed: every field is optional and the quantity may
//! be a JSON number or a numeric string. [`Ledger`](crate::Ledger) validates
//! them; the helpers at the bottom of this module do the field-level parsing.

use crate::LedgerError;
use crate::transaction::TransactionKind;
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// A quantity as supplied by a caller: a JSON number or a numeric string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuantityInput(pub Value);

/// Why a [`QuantityInput`] is not a decimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityError {
    /// Not a finite number: empty strings, booleans, `null`, `"NaN"`.
    NotANumber,
    /// A finite number too large, or too close to zero, for a `Decimal`.
    OutOfRange { negative: bool },
}

impl QuantityInput {
    /// Parses the input as a decimal.
    pub fn to_decimal(&self) -> Result<Decimal, QuantityError> {
        match &self.0 {
            Value::Number(number) => parse_decimal(&number.to_string()),
            Value::String(text) => parse_decimal(text.trim()),
            _ => Err(QuantityError::NotANumber),
        }
    }
}

impl From<Decimal> for QuantityInput {
    fn from(value: Decimal) -> Self {
        Self(Value::String(value.to_string()))
    }
}

impl From<&str> for QuantityInput {
    fn from(value: &str) -> Self {
        Self(Value::String(value.to_string()))
    }
}

impl From<i64> for QuantityInput {
    fn from(value: i64) -> Self {
        Self(Value::from(value))
    }
}

impl From<f64> for QuantityInput {
    fn from(value: f64) -> Self {
        Self(Value::from(value))
    }
}

fn parse_decimal(text: &str) -> Result<Decimal, QuantityError> {
    if text.is_empty() {
        return Err(QuantityError::NotANumber);
    }
    let approx = text.parse::<f64>().ok().filter(|value| value.is_finite());
    let out_of_range = |value: f64| QuantityError::OutOfRange {
        negative: value.is_sign_negative(),
    };

    match Decimal::from_str(text).or_else(|_| Decimal::from_scientific(text)) {
        // Underflow: a nonzero input that only survived as zero.
        Ok(value) if value.is_zero() => match approx {
            Some(approx) if approx != 0.0 => Err(out_of_range(approx)),
            _ => Ok(value),
        },
        Ok(value) => Ok(value),
        Err(_) => Err(approx.map_or(QuantityError::NotANumber, out_of_range)),
    }
}

/// Keeps an explicit `null` so it stays distinct from an absent field.
fn explicit_quantity<'de, D>(deserializer: D) -> Result<Option<QuantityInput>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(|value| Some(QuantityInput(value)))
}

/// Reads a note; anything other than a string counts as no note.
fn lenient_notes<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(notes) => Some(notes),
        _ => None,
    })
}

/// Submission of a new transaction.
///
/// `serial`, `gasCode`, `transactionType` and `quantityKg` are required. The
/// quantity is a magnitude; its sign comes from the transaction type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTransaction {
    pub serial: Option<String>,
    pub gas_code: Option<String>,
    pub transaction_type: Option<String>,
    #[serde(rename = "quantityKg")]
    pub quantity: Option<QuantityInput>,
    #[serde(default, deserialize_with = "lenient_notes")]
    pub notes: Option<String>,
    /// RFC 3339 timestamp; defaults to the submission time.
    pub occurred_at: Option<String>,
}

impl SubmitTransaction {
    pub fn new(
        serial: &str,
        gas_code: &str,
        transaction_type: &str,
        quantity: impl Into<QuantityInput>,
    ) -> Self {
        Self {
            serial: Some(serial.to_string()),
            gas_code: Some(gas_code.to_string()),
            transaction_type: Some(transaction_type.to_string()),
            quantity: Some(quantity.into()),
            notes: None,
            occurred_at: None,
        }
    }

    pub fn with_notes(mut self, notes: &str) -> Self {
        self.notes = Some(notes.to_string());
        self
    }

    pub fn at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(occurred_at.to_rfc3339_opts(SecondsFormat::AutoSi, true));
        self
    }
}

/// Partial update of a stored transaction. Absent fields keep their value.
///
/// An explicit `"quantityKg": null` is kept as `Some(QuantityInput(Value::Null))`
/// and fails validation instead of falling back to the stored quantity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditTransaction {
    pub transaction_type: Option<String>,
    #[serde(default, rename = "quantityKg", deserialize_with = "explicit_quantity")]
    pub quantity: Option<QuantityInput>,
    pub gas_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_notes")]
    pub notes: Option<String>,
    pub occurred_at: Option<String>,
}

impl EditTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transaction_type(mut self, transaction_type: &str) -> Self {
        self.transaction_type = Some(transaction_type.to_string());
        self
    }

    pub fn quantity(mut self, quantity: impl Into<QuantityInput>) -> Self {
        self.quantity = Some(quantity.into());
        self
    }

    pub fn gas_code(mut self, gas_code: &str) -> Self {
        self.gas_code = Some(gas_code.to_string());
        self
    }

    pub fn notes(mut self, notes: &str) -> Self {
        self.notes = Some(notes.to_string());
        self
    }

    pub fn at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(occurred_at.to_rfc3339_opts(SecondsFormat::AutoSi, true));
        self
    }
}

/// Registration of a bottle with an opening balance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterBottle {
    pub serial: Option<String>,
    #[serde(rename = "openingBalanceKg")]
    pub opening_balance: Option<QuantityInput>,
    pub gas_code: Option<String>,
}

impl RegisterBottle {
    pub fn new(serial: &str) -> Self {
        Self {
            serial: Some(serial.to_string()),
            ..Self::default()
        }
    }

    pub fn opening_balance(mut self, balance: impl Into<QuantityInput>) -> Self {
        self.opening_balance = Some(balance.into());
        self
    }

    pub fn gas_code(mut self, gas_code: &str) -> Self {
        self.gas_code = Some(gas_code.to_string());
        self
    }
}

/// Returns the trimmed field, or `None` when it is absent or blank.
pub(crate) fn non_blank(field: Option<&str>) -> Option<&str> {
    field.map(str::trim).filter(|value| !value.is_empty())
}

pub(crate) fn parse_kind(tag: &str) -> Result<TransactionKind, LedgerError> {
    tag.parse()
        .map_err(|_| LedgerError::InvalidTransactionType(tag.to_string()))
}

/// Validates a magnitude: it must be present and strictly positive.
pub(crate) fn positive_quantity(quantity: Option<Decimal>) -> Result<Decimal, LedgerError> {
    quantity
        .filter(|q| *q > Decimal::ZERO)
        .ok_or(LedgerError::InvalidQuantity)
}

/// Parses and validates a caller-supplied `quantityKg`.
pub(crate) fn quantity_magnitude(input: &QuantityInput) -> Result<Decimal, LedgerError> {
    match input.to_decimal() {
        Ok(quantity) => positive_quantity(Some(quantity)),
        Err(QuantityError::OutOfRange { negative: false }) => {
            Err(LedgerError::OutOfRange("quantityKg"))
        }
        Err(_) => Err(LedgerError::InvalidQuantity),
    }
}

/// Parses a caller-supplied `openingBalanceKg`; any finite decimal is allowed.
pub(crate) fn parse_opening_balance(input: &QuantityInput) -> Result<Decimal, LedgerError> {
    input.to_decimal().map_err(|err| match err {
        QuantityError::OutOfRange { .. } => LedgerError::OutOfRange("openingBalanceKg"),
        QuantityError::NotANumber => LedgerError::InvalidOpeningBalance,
    })
}

pub(crate) fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, LedgerError> {
    DateTime::parse_from_rfc3339(text.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| LedgerError::InvalidTimestamp(text.to_string()))
}
