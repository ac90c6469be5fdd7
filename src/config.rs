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

//! Server configuration.
//!
//! The bind address comes from the command line, then the
//! `BOTTLE_LEDGER_BIND` environment variable, then [`DEFAULT_BIND`].

use std::env;
use std::net::SocketAddr;
use thiserror::Error;

pub const BIND_ENV: &str = "BOTTLE_LEDGER_BIND";
pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid bind address {value:?} in BOTTLE_LEDGER_BIND")]
    InvalidBind { value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: SocketAddr,
}

impl ServerConfig {
    /// Resolves the configuration, preferring an explicit `bind` argument.
    pub fn resolve(bind: Option<SocketAddr>) -> Result<Self, ConfigError> {
        Self::resolve_with(bind, env::var(BIND_ENV).ok())
    }

    fn resolve_with(
        bind: Option<SocketAddr>,
        env_bind: Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(bind) = bind {
            return Ok(Self { bind });
        }
        let value = env_bind
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = value
            .parse()
            .map_err(|_| ConfigError::InvalidBind { value })?;
        Ok(Self { bind })
    }
}
