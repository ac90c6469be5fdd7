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

use bottle_ledger_rs::config::ServerConfig;
use bottle_ledger_rs::{BottleState, Ledger, SubmitTransaction, http, telemetry};
use clap::{Parser, Subcommand};
use csv::{ReaderBuilder, Trim, Writer};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process;
use tracing::{debug, error, warn};

/// Bottle Ledger - Track refrigerant bottles and their transactions
#[derive(Parser, Debug)]
#[command(name = "bottle-ledger")]
#[command(about = "Refrigerant bottle ledger", long_about = None)]
struct Args {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the JSON API over an in-memory store
    Serve {
        /// Address to bind, overrides BOTTLE_LEDGER_BIND
        #[arg(long, value_name = "ADDR")]
        bind: Option<SocketAddr>,
    },
    /// Replay a CSV of transactions and print bottle balances
    ///
    /// Expected format: serial,gas,type,quantity,notes,occurred_at
    /// Example: bottle-ledger report transactions.csv > bottles.csv
    Report {
        /// Path to CSV file with transactions
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Print this bottle's ledger instead of the summary
        #[arg(long)]
        serial: Option<String>,
    },
}

fn main() {
    let args = Args::parse();
    telemetry::init(args.verbose);

    let result = match args.command {
        Command::Serve { bind } => run_server(bind),
        Command::Report { input, serial } => run_report(&input, serial.as_deref()),
    };

    if let Err(message) = result {
        error!("{message}");
        process::exit(1);
    }
}

fn run_server(bind: Option<SocketAddr>) -> Result<(), String> {
    let config = ServerConfig::resolve(bind).map_err(|e| e.to_string())?;
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Error starting runtime: {}", e))?;

    runtime.block_on(async {
        let listener = tokio::net::TcpListener::bind(config.bind)
            .await
            .map_err(|e| format!("Error binding {}: {}", config.bind, e))?;
        http::serve(listener, Ledger::in_memory())
            .await
            .map_err(|e| format!("Server error: {}", e))
    })
}

fn run_report(input: &Path, serial: Option<&str>) -> Result<(), String> {
    let file = File::open(input)
        .map_err(|e| format!("Error opening file '{}': {}", input.display(), e))?;

    let ledger = replay_transactions(BufReader::new(file))
        .map_err(|e| format!("Error processing transactions: {}", e))?;

    let stdout = std::io::stdout();
    let written = match serial {
        Some(serial) => {
            let state = ledger.bottle_state(serial).map_err(|e| e.to_string())?;
            write_ledger(&state, stdout)
        }
        None => {
            let states = ledger.bottle_states().map_err(|e| e.to_string())?;
            write_bottles(&states, stdout)
        }
    };
    written.map_err(|e| format!("Error writing output: {}", e))
}

/// Raw CSV record matching the input format.
///
/// Fields: `serial, gas, type, quantity, notes, occurred_at`
#[derive(Debug, Deserialize)]
struct CsvRecord {
    serial: String,
    gas: String,
    #[serde(rename = "type")]
    tx_type: String,
    quantity: String,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    occurred_at: Option<String>,
}

impl CsvRecord {
    fn into_request(self) -> SubmitTransaction {
        let mut request =
            SubmitTransaction::new(&self.serial, &self.gas, &self.tx_type, self.quantity.as_str());
        request.notes = self.notes.filter(|n| !n.is_empty());
        request.occurred_at = self.occurred_at.filter(|t| !t.is_empty());
        request
    }
}

/// Replays transactions from a CSV reader into a fresh in-memory ledger.
///
/// Rows are submitted in file order. Malformed rows and rejected submissions
/// are logged and skipped.
///
/// # Example
///
/// ```csv
/// serial,gas,type,quantity,notes,occurred_at
/// B-001,R410A,fill,5,,2025-03-01T09:00:00Z
/// B-001,R410A,charge,1.5,unit 4,2025-03-01T10:00:00Z
/// ```
///
/// # Errors
///
/// Returns a CSV error if the reader fails or the header is unreadable.
fn replay_transactions<R: Read>(reader: R) -> Result<Ledger, csv::Error> {
    let ledger = Ledger::in_memory();

    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true) // notes and occurred_at may be omitted
        .has_headers(true)
        .from_reader(reader);

    for (line, result) in rdr.deserialize::<CsvRecord>().enumerate() {
        match result {
            Ok(record) => {
                if let Err(e) = ledger.submit(record.into_request()) {
                    warn!(row = line + 1, error = %e, "skipping rejected transaction");
                }
            }
            Err(e) => {
                warn!(row = line + 1, error = %e, "skipping malformed row");
            }
        }
    }

    debug!("replay finished");
    Ok(ledger)
}

/// One line of the bottle summary.
#[derive(Debug, Serialize)]
struct BottleSummary<'a> {
    serial: &'a str,
    status: &'static str,
    gas: Option<&'a str>,
    opening_balance: Decimal,
    current_quantity: Decimal,
}

/// One line of a bottle's ledger.
#[derive(Debug, Serialize)]
struct LedgerLine<'a> {
    occurred_at: String,
    #[serde(rename = "type")]
    tx_type: &'static str,
    gas: Option<&'a str>,
    quantity: Decimal,
    notes: Option<&'a str>,
}

const PRECISION: u32 = bottle_ledger_rs::balance::DECIMAL_PRECISION;

/// Writes one summary row per bottle.
///
/// Columns: `serial, status, gas, opening_balance, current_quantity`
fn write_bottles<W: Write>(states: &[BottleState], writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);
    for state in states {
        wtr.serialize(BottleSummary {
            serial: state.serial.as_str(),
            status: state.status.as_str(),
            gas: state.gas.as_ref().map(|g| g.as_str()),
            opening_balance: state.opening_balance.round_dp(PRECISION),
            current_quantity: state.current_quantity.round_dp(PRECISION),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes a bottle's ledger rows in ascending time order.
///
/// Columns: `occurred_at, type, gas, quantity, notes`
fn write_ledger<W: Write>(state: &BottleState, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);
    for row in &state.ledger {
        wtr.serialize(LedgerLine {
            occurred_at: row.occurred_at.to_rfc3339(),
            tx_type: row.kind.as_str(),
            gas: row.gas.as_ref().map(|g| g.as_str()),
            quantity: row.quantity.round_dp(PRECISION),
            notes: row.notes.as_deref(),
        })?;
    }
    wtr.flush()?;
    Ok(())
}
