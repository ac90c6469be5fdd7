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

//! Logging setup.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Maps `-v` repetitions to a default level.
pub fn level_from_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Primary filter variable; `RUST_LOG` is read when it is unset.
pub const LOG_ENV: &str = "LOG";

fn filter_env_var(log_is_set: bool) -> &'static str {
    if log_is_set {
        LOG_ENV
    } else {
        EnvFilter::DEFAULT_ENV
    }
}

/// Installs a stderr subscriber. `LOG` (or `RUST_LOG`) directives override
/// `verbosity`.
pub fn init(verbosity: u8) {
    let env_var = filter_env_var(std::env::var_os(LOG_ENV).is_some());
    let filter = EnvFilter::builder()
        .with_default_directive(level_from_verbosity(verbosity).into())
        .with_env_var(env_var)
        .from_env_lossy();

    // Ignore the error if a subscriber is already installed (e.g. in tests).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
