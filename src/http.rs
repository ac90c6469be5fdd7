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

//! JSON-over-HTTP surface for the ledger.
//!
//! ## Endpoints
//!
//! - `GET /healthz` - Liveness check
//! - `GET /api/bottles?serial=S` or `GET /api/bottles/{serial}` - Bottle state
//! - `POST /api/bottles` - Register a bottle with an opening balance
//! - `POST /api/transactions` - Submit a transaction
//! - `GET /api/transactions` - List transactions, newest first
//! - `GET /api/transactions/{id}` - Fetch a transaction
//! - `PATCH /api/transactions/{id}` - Edit a transaction
//! - `DELETE /api/transactions/{id}` - Delete a transaction
//!
//! ## Example Usage
//!
//! ```bash
//! curl -X POST http://localhost:3000/api/transactions \
//!   -H "Content-Type: application/json" \
//!   -d '{"serial": "B-001", "gasCode": "R410A", "transactionType": "fill", "quantityKg": 5}'
//!
//! curl "http://localhost:3000/api/bottles?serial=B-001"
//! ```

use crate::balance::BottleState;
use crate::base::TransactionId;
use crate::bottle::Bottle;
use crate::error::ErrorKind;
use crate::request::{EditTransaction, RegisterBottle, SubmitTransaction};
use crate::transaction::Transaction;
use crate::{Ledger, LedgerError};
use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

// === Request/Response DTOs ===

/// Query string of `GET /api/bottles`.
#[derive(Debug, Deserialize)]
pub struct BottleQuery {
    pub serial: Option<String>,
}

/// Response body for transaction writes.
#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub ok: bool,
    pub transaction: Transaction,
}

/// Response body for bottle registration.
#[derive(Debug, Serialize, Deserialize)]
pub struct BottleResponse {
    pub ok: bool,
    pub bottle: Bottle,
}

/// Response body for deletions.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub ok: bool,
    pub message: String,
}

/// Response body for errors.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

// === Error Handling ===

/// Wrapper for converting [`LedgerError`] into HTTP responses.
pub struct AppError(LedgerError);

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        AppError(err)
    }
}

/// Bodies axum cannot deserialize get the same JSON error shape as ledger
/// validation failures.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError(LedgerError::MalformedBody(rejection.body_text()))
    }
}

impl AppError {
    fn code(&self) -> &'static str {
        match &self.0 {
            LedgerError::MissingSerial => "MISSING_SERIAL",
            LedgerError::MissingFields => "MISSING_FIELDS",
            LedgerError::InvalidTransactionType(_) => "INVALID_TRANSACTION_TYPE",
            LedgerError::InvalidQuantity => "INVALID_QUANTITY",
            LedgerError::OutOfRange(_) => "OUT_OF_RANGE",
            LedgerError::InvalidOpeningBalance => "INVALID_OPENING_BALANCE",
            LedgerError::MalformedBody(_) => "MALFORMED_BODY",
            LedgerError::InvalidTimestamp(_) => "INVALID_TIMESTAMP",
            LedgerError::BottleNotFound => "BOTTLE_NOT_FOUND",
            LedgerError::TransactionNotFound => "TRANSACTION_NOT_FOUND",
            LedgerError::Store(_) => "SERVER_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self.0.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Server => {
                error!(error = %self.0, "store failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
                code: self.code().to_string(),
            }),
        )
            .into_response()
    }
}

/// Unparseable ids cannot name a stored transaction.
fn parse_id(raw: &str) -> Result<TransactionId, AppError> {
    raw.parse()
        .map_err(|_| AppError(LedgerError::TransactionNotFound))
}

// === Handlers ===

async fn healthz() -> &'static str {
    "ok"
}

/// GET /api/bottles?serial=S
async fn query_bottle(
    State(ledger): State<Ledger>,
    Query(query): Query<BottleQuery>,
) -> Result<Json<BottleState>, AppError> {
    let serial = query.serial.unwrap_or_default();
    Ok(Json(ledger.bottle_state(&serial)?))
}

/// GET /api/bottles/{serial}
async fn get_bottle(
    State(ledger): State<Ledger>,
    Path(serial): Path<String>,
) -> Result<Json<BottleState>, AppError> {
    Ok(Json(ledger.bottle_state(&serial)?))
}

/// POST /api/bottles
async fn register_bottle(
    State(ledger): State<Ledger>,
    payload: Result<Json<RegisterBottle>, JsonRejection>,
) -> Result<(StatusCode, Json<BottleResponse>), AppError> {
    let Json(request) = payload?;
    let bottle = ledger.register_bottle(request)?;
    Ok((StatusCode::CREATED, Json(BottleResponse { ok: true, bottle })))
}

/// POST /api/transactions
async fn create_transaction(
    State(ledger): State<Ledger>,
    payload: Result<Json<SubmitTransaction>, JsonRejection>,
) -> Result<(StatusCode, Json<TransactionResponse>), AppError> {
    let Json(request) = payload?;
    let transaction = ledger.submit(request)?;
    Ok((
        StatusCode::CREATED,
        Json(TransactionResponse {
            ok: true,
            transaction,
        }),
    ))
}

/// GET /api/transactions
async fn list_transactions(
    State(ledger): State<Ledger>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    Ok(Json(ledger.transactions()?))
}

/// GET /api/transactions/{id}
async fn get_transaction(
    State(ledger): State<Ledger>,
    Path(id): Path<String>,
) -> Result<Json<Transaction>, AppError> {
    let id = parse_id(&id)?;
    Ok(Json(ledger.transaction(&id)?))
}

/// PATCH /api/transactions/{id}
async fn edit_transaction(
    State(ledger): State<Ledger>,
    Path(id): Path<String>,
    payload: Result<Json<EditTransaction>, JsonRejection>,
) -> Result<Json<TransactionResponse>, AppError> {
    let id = parse_id(&id)?;
    let Json(request) = payload?;
    let transaction = ledger.edit(&id, request)?;
    Ok(Json(TransactionResponse {
        ok: true,
        transaction,
    }))
}

/// DELETE /api/transactions/{id}
async fn delete_transaction(
    State(ledger): State<Ledger>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    let id = parse_id(&id)?;
    let removed = ledger.delete(&id)?;
    Ok(Json(DeleteResponse {
        ok: true,
        message: format!("Transaction {} deleted", removed.id),
    }))
}

// === Router ===

/// Builds the router serving `ledger`.
pub fn router(ledger: Ledger) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/bottles", get(query_bottle).post(register_bottle))
        .route("/api/bottles/{serial}", get(get_bottle))
        .route(
            "/api/transactions",
            get(list_transactions).post(create_transaction),
        )
        .route(
            "/api/transactions/{id}",
            get(get_transaction)
                .patch(edit_transaction)
                .delete(delete_transaction),
        )
        .with_state(ledger)
}

/// Serves `ledger` on `listener` until Ctrl-C is received.
pub async fn serve(listener: TcpListener, ledger: Ledger) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "bottle ledger listening");
    }
    axum::serve(listener, router(ledger))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
