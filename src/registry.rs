// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The durable record of which namespace owns which NetID
//!
//! The controller's registry is an external store. This module only defines
//! the boundary the allocator's callers use to talk to it, plus an in-memory
//! implementation for tests and development.

use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

/// A namespace's NetID assignment, as recorded in the registry
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct NetNamespace {
    pub name: String,
    pub netid: u32,
}

impl NetNamespace {
    pub fn new(name: impl Into<String>, netid: u32) -> Self {
        Self { name: name.into(), netid }
    }
}

/// Durable storage of [`NetNamespace`] records
///
/// Failures are opaque to the allocator's callers: they are logged and
/// propagated, never interpreted.
pub trait NetNamespaceRegistry: Send + Sync {
    /// Every recorded assignment.
    fn list(&self) -> Result<Vec<NetNamespace>, anyhow::Error>;

    /// Create or replace the record for `record.name`.
    fn put(&self, record: &NetNamespace) -> Result<(), anyhow::Error>;

    /// Remove the record for `name`. Removing a missing record succeeds.
    fn delete(&self, name: &str) -> Result<(), anyhow::Error>;
}

/// A [`NetNamespaceRegistry`] that only lives as long as the process
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    records: Mutex<BTreeMap<String, u32>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-populated with `records`, as a controller would
    /// find it after a restart.
    pub fn with_records(
        records: impl IntoIterator<Item = NetNamespace>,
    ) -> Self {
        let records = records.into_iter().map(|r| (r.name, r.netid)).collect();
        Self { records: Mutex::new(records) }
    }

    pub fn get(&self, name: &str) -> Option<u32> {
        self.records.lock().unwrap().get(name).copied()
    }
}

impl NetNamespaceRegistry for InMemoryRegistry {
    fn list(&self) -> Result<Vec<NetNamespace>, anyhow::Error> {
        let records = self.records.lock().unwrap();
        Ok(records
            .iter()
            .map(|(name, netid)| NetNamespace::new(name.clone(), *netid))
            .collect())
    }

    fn put(&self, record: &NetNamespace) -> Result<(), anyhow::Error> {
        self.records.lock().unwrap().insert(record.name.clone(), record.netid);
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<(), anyhow::Error> {
        self.records.lock().unwrap().remove(name);
        Ok(())
    }
}

impl<T> NetNamespaceRegistry for Arc<T>
where
    T: NetNamespaceRegistry + ?Sized,
{
    fn list(&self) -> Result<Vec<NetNamespace>, anyhow::Error> {
        (**self).list()
    }

    fn put(&self, record: &NetNamespace) -> Result<(), anyhow::Error> {
        (**self).put(record)
    }

    fn delete(&self, name: &str) -> Result<(), anyhow::Error> {
        (**self).delete(name)
    }
}
