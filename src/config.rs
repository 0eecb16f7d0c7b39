// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Interfaces for working with NetID allocation configuration

use crate::NetIdRange;
use crate::GLOBAL_NETID;
use crate::MAX_NETID;
use crate::MIN_NETID;
use camino::Utf8Path;
use camino::Utf8PathBuf;
use dropshot::ConfigLogging;
use serde::Deserialize;
use slog::Logger;

/// Configuration for the NetID allocation portion of the controller
///
/// This is read once at startup. The NetID range in particular must not
/// change for the lifetime of an allocator.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// Configuration for the controller debug log
    pub log: ConfigLogging,

    /// NetIDs available to tenant namespaces, either as a `{ min, max }`
    /// table or as a `"MIN-MAX"` string.
    ///
    /// Defaults to `[MIN_NETID, MAX_NETID]`.
    #[serde(default = "default_netid_range")]
    pub netid_range: NetIdRange,

    /// Namespaces that share the global NetID instead of being isolated.
    #[serde(default = "default_admin_namespaces")]
    pub admin_namespaces: Vec<String>,
}

fn default_netid_range() -> NetIdRange {
    NetIdRange::new(MIN_NETID, MAX_NETID)
        .unwrap_or_else(|_| unreachable!("MIN_NETID <= MAX_NETID"))
}

fn default_admin_namespaces() -> Vec<String> {
    vec![String::from("default")]
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config from {path}: {err}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("Failed to parse config from {path}: {err}")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        err: toml::de::Error,
    },
    #[error("NetID range {0} contains the global NetID {}", GLOBAL_NETID)]
    RangeContainsGlobal(NetIdRange),
    #[error("Failed to initialize logger: {0}")]
    Logger(#[source] std::io::Error),
}

impl Config {
    pub fn from_file<P: AsRef<Utf8Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|err| ConfigError::Io { path: path.into(), err })?;
        let config: Config = toml::from_str(&contents)
            .map_err(|err| ConfigError::Parse { path: path.into(), err })?;
        config.validate()?;
        Ok(config)
    }

    /// Check constraints that span more than one field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.netid_range.contains(GLOBAL_NETID) {
            return Err(ConfigError::RangeContainsGlobal(self.netid_range));
        }
        Ok(())
    }

    /// Build the root logger described by the `[log]` section.
    pub fn to_logger(&self, name: &str) -> Result<Logger, ConfigError> {
        self.log.to_logger(name).map_err(ConfigError::Logger)
    }
}
