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

//! Ledger public API integration tests.

use bottle_ledger_rs::{
    Bottle, BottleHistory, BottleSerial, EditTransaction, ErrorKind, Gas, GasCode, Ledger,
    LedgerError, MemoryStore, RegisterBottle, Store, StoreError, SubmitTransaction, Transaction,
    TransactionId, TransactionKind,
};
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, hour, 0, 0).unwrap()
}

fn submit_at(
    ledger: &Ledger,
    serial: &str,
    gas: &str,
    kind: &str,
    quantity: Decimal,
    hour: u32,
) -> Transaction {
    ledger
        .submit(SubmitTransaction::new(serial, gas, kind, quantity).at(at(hour)))
        .unwrap()
}

// === Submission ===

#[test]
fn submit_creates_bottle_and_gas() {
    let store = Arc::new(MemoryStore::new());
    let ledger = Ledger::new(store.clone());

    let tx = submit_at(&ledger, "B-1", "R410A", "fill", dec!(5), 9);

    assert_eq!(tx.kind, TransactionKind::Fill);
    assert_eq!(tx.quantity, Some(dec!(5)));
    assert_eq!(tx.gas_code, Some(GasCode::from("R410A")));
    assert_eq!(
        store.gas(&GasCode::from("R410A")),
        Some(Gas {
            code: GasCode::from("R410A"),
            name: "R410A".to_string()
        })
    );

    let state = ledger.bottle_state("B-1").unwrap();
    assert_eq!(state.current_quantity, dec!(5));
    assert_eq!(state.gas, Some(GasCode::from("R410A")));
}

#[test]
fn outflow_types_are_stored_negative() {
    let ledger = Ledger::in_memory();
    for kind in ["charge", "transfer_out", "return", "reversal"] {
        let tx = submit_at(&ledger, "B-1", "R32", kind, dec!(1.5), 9);
        assert_eq!(tx.quantity, Some(dec!(-1.5)), "{kind}");
    }
    for kind in ["fill", "recover", "transfer_in"] {
        let tx = submit_at(&ledger, "B-1", "R32", kind, dec!(1.5), 9);
        assert_eq!(tx.quantity, Some(dec!(1.5)), "{kind}");
    }
    assert_eq!(
        ledger.bottle_state("B-1").unwrap().current_quantity,
        dec!(-1.5)
    );
}

#[test]
fn submit_repoints_bottle_gas() {
    let ledger = Ledger::in_memory();
    submit_at(&ledger, "B-1", "R22", "fill", dec!(5), 9);
    submit_at(&ledger, "B-1", "R32", "charge", dec!(1), 10);

    let history = ledger
        .store()
        .find_bottle(&BottleSerial::from("B-1"))
        .unwrap()
        .unwrap();
    assert_eq!(history.bottle.gas_code, Some(GasCode::from("R32")));

    // the bottle's own gas wins over the first fill
    let state = ledger.bottle_state("B-1").unwrap();
    assert_eq!(state.gas, Some(GasCode::from("R32")));
    assert_eq!(state.ledger[0].gas, Some(GasCode::from("R22")));
}

#[test]
fn submit_missing_fields() {
    let ledger = Ledger::in_memory();
    let complete = SubmitTransaction::new("B-1", "R32", "fill", dec!(1));

    let cases = [
        SubmitTransaction {
            serial: None,
            ..complete.clone()
        },
        SubmitTransaction {
            gas_code: Some("  ".into()),
            ..complete.clone()
        },
        SubmitTransaction {
            transaction_type: None,
            ..complete.clone()
        },
        SubmitTransaction {
            quantity: None,
            ..complete.clone()
        },
    ];
    for request in cases {
        assert_eq!(ledger.submit(request), Err(LedgerError::MissingFields));
    }
    assert!(ledger.transactions().unwrap().is_empty());
}

#[test]
fn submit_unknown_type() {
    let ledger = Ledger::in_memory();
    let result = ledger.submit(SubmitTransaction::new("B-1", "R32", "deposit", dec!(1)));
    assert_eq!(
        result,
        Err(LedgerError::InvalidTransactionType("deposit".to_string()))
    );
    // nothing was written
    assert_eq!(ledger.bottle_state("B-1"), Err(LedgerError::BottleNotFound));
}

#[test]
fn submit_rejects_non_positive_quantities() {
    let ledger = Ledger::in_memory();
    for quantity in ["0", "-3", "abc", "NaN", "Infinity", ""] {
        for kind in ["fill", "charge"] {
            let result = ledger.submit(SubmitTransaction::new("B-1", "R32", kind, quantity));
            assert_eq!(result, Err(LedgerError::InvalidQuantity), "{kind} {quantity:?}");
        }
    }
}

#[test]
fn submit_reports_quantities_beyond_decimal_range() {
    let ledger = Ledger::in_memory();
    for quantity in ["1e30", "1e-40"] {
        let result = ledger.submit(SubmitTransaction::new("B-1", "R32", "fill", quantity));
        assert_eq!(result, Err(LedgerError::OutOfRange("quantityKg")), "{quantity}");
    }
    // a huge negative is still a non-positive quantity
    assert_eq!(
        ledger.submit(SubmitTransaction::new("B-1", "R32", "fill", "-1e30")),
        Err(LedgerError::InvalidQuantity)
    );
    assert!(ledger.transactions().unwrap().is_empty());
}

#[test]
fn submit_accepts_numeric_strings_and_numbers() {
    let ledger = Ledger::in_memory();
    let from_string = ledger
        .submit(SubmitTransaction::new("B-1", "R32", "fill", " 2.75 "))
        .unwrap();
    let from_number = ledger
        .submit(SubmitTransaction::new("B-1", "R32", "charge", 1i64))
        .unwrap();
    assert_eq!(from_string.quantity, Some(dec!(2.75)));
    assert_eq!(from_number.quantity, Some(dec!(-1)));
}

#[test]
fn submit_rejects_bad_timestamp() {
    let ledger = Ledger::in_memory();
    let mut request = SubmitTransaction::new("B-1", "R32", "fill", dec!(1));
    request.occurred_at = Some("last tuesday".into());
    assert_eq!(
        ledger.submit(request),
        Err(LedgerError::InvalidTimestamp("last tuesday".into()))
    );
}

#[test]
fn submit_keeps_notes() {
    let ledger = Ledger::in_memory();
    let tx = ledger
        .submit(SubmitTransaction::new("B-1", "R32", "recover", dec!(3)).with_notes("site 12"))
        .unwrap();
    assert_eq!(tx.notes.as_deref(), Some("site 12"));
    let state = ledger.bottle_state("B-1").unwrap();
    assert_eq!(state.ledger[0].notes.as_deref(), Some("site 12"));
}

// === Bottle state ===

#[test]
fn unknown_bottle_is_not_found() {
    let ledger = Ledger::in_memory();
    let err = ledger.bottle_state("missing").unwrap_err();
    assert_eq!(err, LedgerError::BottleNotFound);
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn blank_serial_is_rejected() {
    let ledger = Ledger::in_memory();
    let err = ledger.bottle_state("  ").unwrap_err();
    assert_eq!(err, LedgerError::MissingSerial);
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn ledger_is_ascending_even_when_submitted_out_of_order() {
    let ledger = Ledger::in_memory();
    let late = submit_at(&ledger, "B-1", "R32", "charge", dec!(1), 12);
    let early = submit_at(&ledger, "B-1", "R32", "fill", dec!(4), 8);

    let state = ledger.bottle_state("B-1").unwrap();
    let ids: Vec<_> = state.ledger.iter().map(|row| row.id).collect();
    assert_eq!(ids, vec![early.id, late.id]);
    assert_eq!(state.current_quantity, dec!(3));
}

#[test]
fn opening_balance_example() {
    let ledger = Ledger::in_memory();
    ledger
        .register_bottle(RegisterBottle::new("B-1").opening_balance(dec!(10)))
        .unwrap();

    // Store a charge with no gas directly to mirror a legacy row
    let store = ledger.store();
    store
        .insert_transaction(Transaction {
            id: TransactionId::generate(),
            serial: BottleSerial::from("B-1"),
            kind: TransactionKind::Charge,
            quantity: Some(dec!(-3)),
            occurred_at: at(11),
            notes: None,
            gas_code: None,
        })
        .unwrap();
    store
        .insert_transaction(Transaction {
            id: TransactionId::generate(),
            serial: BottleSerial::from("B-1"),
            kind: TransactionKind::Fill,
            quantity: Some(dec!(5)),
            occurred_at: at(10),
            notes: None,
            gas_code: Some(GasCode::from("R410A")),
        })
        .unwrap();

    let state = ledger.bottle_state("B-1").unwrap();
    assert_eq!(state.opening_balance, dec!(10));
    assert_eq!(state.current_quantity, dec!(12));
    assert_eq!(state.gas, Some(GasCode::from("R410A")));
    assert_eq!(state.ledger[1].gas, Some(GasCode::from("R410A")));
}

#[test]
fn null_quantity_rows_count_as_zero() {
    let ledger = Ledger::in_memory();
    ledger.register_bottle(RegisterBottle::new("B-1")).unwrap();
    ledger
        .store()
        .insert_transaction(Transaction {
            id: TransactionId::generate(),
            serial: BottleSerial::from("B-1"),
            kind: TransactionKind::Fill,
            quantity: None,
            occurred_at: at(9),
            notes: None,
            gas_code: Some(GasCode::from("R32")),
        })
        .unwrap();

    let state = ledger.bottle_state("B-1").unwrap();
    assert_eq!(state.current_quantity, Decimal::ZERO);
    // the zero-quantity fill does not qualify, so the last row's gas is used
    assert_eq!(state.gas, Some(GasCode::from("R32")));
}

// === Registration ===

#[test]
fn register_sets_opening_balance_and_gas() {
    let ledger = Ledger::in_memory();
    let bottle = ledger
        .register_bottle(
            RegisterBottle::new("B-1")
                .opening_balance("12.5")
                .gas_code("R134a"),
        )
        .unwrap();
    assert_eq!(
        bottle,
        Bottle {
            serial: BottleSerial::from("B-1"),
            opening_balance: Some(dec!(12.5)),
            gas_code: Some(GasCode::from("R134a")),
        }
    );

    submit_at(&ledger, "B-1", "R134a", "charge", dec!(2), 9);
    assert_eq!(
        ledger.bottle_state("B-1").unwrap().current_quantity,
        dec!(10.5)
    );
}

#[test]
fn register_keeps_history_and_unspecified_fields() {
    let ledger = Ledger::in_memory();
    submit_at(&ledger, "B-1", "R32", "fill", dec!(4), 9);

    let bottle = ledger
        .register_bottle(RegisterBottle::new("B-1").opening_balance(dec!(1)))
        .unwrap();
    assert_eq!(bottle.gas_code, Some(GasCode::from("R32")));

    let state = ledger.bottle_state("B-1").unwrap();
    assert_eq!(state.ledger.len(), 1);
    assert_eq!(state.current_quantity, dec!(5));
}

#[test]
fn register_validation() {
    let ledger = Ledger::in_memory();
    assert_eq!(
        ledger.register_bottle(RegisterBottle::default()),
        Err(LedgerError::MissingSerial)
    );
    assert_eq!(
        ledger.register_bottle(RegisterBottle::new("B-1").opening_balance("lots")),
        Err(LedgerError::InvalidOpeningBalance)
    );
    assert_eq!(
        ledger.register_bottle(RegisterBottle::new("B-1").opening_balance("1e30")),
        Err(LedgerError::OutOfRange("openingBalanceKg"))
    );
}

// === Edit ===

#[test]
fn edit_charge_to_fill_flips_sign() {
    let ledger = Ledger::in_memory();
    let tx = submit_at(&ledger, "B-1", "R32", "charge", dec!(2), 9);

    let edited = ledger
        .edit(
            &tx.id,
            EditTransaction::new().transaction_type("fill").quantity(dec!(4)),
        )
        .unwrap();

    assert_eq!(edited.kind, TransactionKind::Fill);
    assert_eq!(edited.quantity, Some(dec!(4)));
    assert_eq!(ledger.transaction(&tx.id).unwrap(), edited);
    assert_eq!(
        ledger.bottle_state("B-1").unwrap().current_quantity,
        dec!(4)
    );
}

#[test]
fn edit_type_only_reuses_magnitude() {
    let ledger = Ledger::in_memory();
    let tx = submit_at(&ledger, "B-1", "R32", "fill", dec!(3), 9);

    let edited = ledger
        .edit(&tx.id, EditTransaction::new().transaction_type("reversal"))
        .unwrap();
    assert_eq!(edited.quantity, Some(dec!(-3)));
}

#[test]
fn edit_keeps_unspecified_fields() {
    let ledger = Ledger::in_memory();
    let tx = ledger
        .submit(
            SubmitTransaction::new("B-1", "R32", "fill", dec!(3))
                .with_notes("original")
                .at(at(9)),
        )
        .unwrap();

    let edited = ledger
        .edit(&tx.id, EditTransaction::new().quantity("6"))
        .unwrap();
    assert_eq!(edited.kind, TransactionKind::Fill);
    assert_eq!(edited.notes.as_deref(), Some("original"));
    assert_eq!(edited.occurred_at, at(9));
    assert_eq!(edited.gas_code, Some(GasCode::from("R32")));
    assert_eq!(edited.serial, BottleSerial::from("B-1"));
}

#[test]
fn edit_notes_timestamp_and_gas() {
    let ledger = Ledger::in_memory();
    let first = submit_at(&ledger, "B-1", "R22", "fill", dec!(3), 9);
    let second = submit_at(&ledger, "B-1", "R22", "charge", dec!(1), 10);

    let edited = ledger
        .edit(
            &first.id,
            EditTransaction::new()
                .notes("moved")
                .at(at(11))
                .gas_code("R407C"),
        )
        .unwrap();
    assert_eq!(edited.notes.as_deref(), Some("moved"));
    assert_eq!(edited.occurred_at, at(11));
    assert_eq!(edited.gas_code, Some(GasCode::from("R407C")));

    let state = ledger.bottle_state("B-1").unwrap();
    // bottle follows the edited gas
    assert_eq!(state.gas, Some(GasCode::from("R407C")));
    let ids: Vec<_> = state.ledger.iter().map(|row| row.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);
}

#[test]
fn edit_blank_gas_is_ignored() {
    let ledger = Ledger::in_memory();
    let tx = submit_at(&ledger, "B-1", "R22", "fill", dec!(3), 9);
    let edited = ledger
        .edit(&tx.id, EditTransaction::new().gas_code("   "))
        .unwrap();
    assert_eq!(edited.gas_code, Some(GasCode::from("R22")));
}

#[test]
fn edit_validation() {
    let ledger = Ledger::in_memory();
    let tx = submit_at(&ledger, "B-1", "R32", "fill", dec!(3), 9);

    assert_eq!(
        ledger.edit(&tx.id, EditTransaction::new().transaction_type("deposit")),
        Err(LedgerError::InvalidTransactionType("deposit".into()))
    );
    assert_eq!(
        ledger.edit(&tx.id, EditTransaction::new().quantity(dec!(0))),
        Err(LedgerError::InvalidQuantity)
    );
    assert_eq!(
        ledger.edit(&tx.id, EditTransaction::new().quantity("-2")),
        Err(LedgerError::InvalidQuantity)
    );
    // failed edits leave the row untouched
    assert_eq!(ledger.transaction(&tx.id).unwrap(), tx);
}

#[test]
fn edit_with_explicit_null_quantity_is_rejected() {
    let ledger = Ledger::in_memory();
    let tx = submit_at(&ledger, "B-1", "R32", "charge", dec!(3), 9);

    let request: EditTransaction = serde_json::from_value(serde_json::json!({
        "quantityKg": null,
        "transactionType": "fill"
    }))
    .unwrap();
    assert_eq!(ledger.edit(&tx.id, request), Err(LedgerError::InvalidQuantity));
    assert_eq!(ledger.transaction(&tx.id).unwrap(), tx);

    // leaving the field out still reuses the stored magnitude
    let request: EditTransaction =
        serde_json::from_value(serde_json::json!({ "transactionType": "fill" })).unwrap();
    assert_eq!(ledger.edit(&tx.id, request).unwrap().quantity, Some(dec!(3)));
}

#[test]
fn edit_unknown_transaction() {
    let ledger = Ledger::in_memory();
    assert_eq!(
        ledger.edit(&TransactionId::generate(), EditTransaction::new()),
        Err(LedgerError::TransactionNotFound)
    );
}

#[test]
fn edit_without_quantity_fails_on_null_stored_quantity() {
    let ledger = Ledger::in_memory();
    let id = TransactionId::generate();
    ledger
        .store()
        .insert_transaction(Transaction {
            id,
            serial: BottleSerial::from("B-1"),
            kind: TransactionKind::Fill,
            quantity: None,
            occurred_at: at(9),
            notes: None,
            gas_code: None,
        })
        .unwrap();

    assert_eq!(
        ledger.edit(&id, EditTransaction::new().notes("fix")),
        Err(LedgerError::InvalidQuantity)
    );
}

// === Delete / list ===

#[test]
fn delete_removes_from_balance_without_compensation() {
    let ledger = Ledger::in_memory();
    submit_at(&ledger, "B-1", "R32", "fill", dec!(10), 9);
    let charge = submit_at(&ledger, "B-1", "R32", "charge", dec!(4), 10);
    assert_eq!(
        ledger.bottle_state("B-1").unwrap().current_quantity,
        dec!(6)
    );

    let removed = ledger.delete(&charge.id).unwrap();
    assert_eq!(removed, charge);

    let state = ledger.bottle_state("B-1").unwrap();
    assert_eq!(state.current_quantity, dec!(10));
    assert_eq!(state.ledger.len(), 1);
    assert_eq!(ledger.transactions().unwrap().len(), 1);
    assert_eq!(
        ledger.transaction(&charge.id),
        Err(LedgerError::TransactionNotFound)
    );
}

#[test]
fn delete_unknown_transaction() {
    let ledger = Ledger::in_memory();
    assert_eq!(
        ledger.delete(&TransactionId::generate()),
        Err(LedgerError::TransactionNotFound)
    );
}

#[test]
fn transactions_are_listed_newest_first() {
    let ledger = Ledger::in_memory();
    let a = submit_at(&ledger, "B-1", "R32", "fill", dec!(1), 9);
    let b = submit_at(&ledger, "B-2", "R22", "fill", dec!(1), 11);
    let c = submit_at(&ledger, "B-1", "R32", "charge", dec!(1), 10);

    let ids: Vec<_> = ledger
        .transactions()
        .unwrap()
        .into_iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(ids, vec![b.id, c.id, a.id]);
}

#[test]
fn bottle_states_cover_every_bottle() {
    let ledger = Ledger::in_memory();
    submit_at(&ledger, "B-2", "R22", "fill", dec!(2), 9);
    submit_at(&ledger, "B-1", "R32", "fill", dec!(1), 9);

    let states = ledger.bottle_states().unwrap();
    let serials: Vec<_> = states.iter().map(|s| s.serial.as_str()).collect();
    assert_eq!(serials, vec!["B-1", "B-2"]);
}

// === Store failures ===

/// Store whose every call fails.
struct UnavailableStore;

fn down() -> StoreError {
    StoreError::Unavailable("connection refused".into())
}

impl Store for UnavailableStore {
    fn find_bottle(&self, _: &BottleSerial) -> Result<Option<BottleHistory>, StoreError> {
        Err(down())
    }
    fn list_bottles(&self) -> Result<Vec<Bottle>, StoreError> {
        Err(down())
    }
    fn upsert_gas(&self, _: &GasCode) -> Result<Gas, StoreError> {
        Err(down())
    }
    fn upsert_bottle(&self, _: &BottleSerial, _: Option<&GasCode>) -> Result<Bottle, StoreError> {
        Err(down())
    }
    fn register_bottle(
        &self,
        _: &BottleSerial,
        _: Option<Decimal>,
        _: Option<&GasCode>,
    ) -> Result<Bottle, StoreError> {
        Err(down())
    }
    fn insert_transaction(&self, _: Transaction) -> Result<(), StoreError> {
        Err(down())
    }
    fn update_transaction(&self, _: Transaction) -> Result<bool, StoreError> {
        Err(down())
    }
    fn delete_transaction(&self, _: &TransactionId) -> Result<Option<Transaction>, StoreError> {
        Err(down())
    }
    fn get_transaction(&self, _: &TransactionId) -> Result<Option<Transaction>, StoreError> {
        Err(down())
    }
    fn list_transactions(&self) -> Result<Vec<Transaction>, StoreError> {
        Err(down())
    }
}

#[test]
fn store_failures_surface_as_server_errors() {
    let ledger = Ledger::new(Arc::new(UnavailableStore));

    let err = ledger.bottle_state("B-1").unwrap_err();
    assert_eq!(err, LedgerError::Store(down()));
    assert_eq!(err.kind(), ErrorKind::Server);

    let err = ledger
        .submit(SubmitTransaction::new("B-1", "R32", "fill", dec!(1)))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Server);

    let err = ledger
        .register_bottle(RegisterBottle::new("B-1").opening_balance(dec!(2)))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Server);

    assert_eq!(
        ledger.transactions().unwrap_err().kind(),
        ErrorKind::Server
    );
}

#[test]
fn validation_runs_before_store_access() {
    let ledger = Ledger::new(Arc::new(UnavailableStore));
    assert_eq!(
        ledger.submit(SubmitTransaction::new("B-1", "R32", "fill", dec!(-1))),
        Err(LedgerError::InvalidQuantity)
    );
}
