// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Namespace to NetID assignments
//!
//! [`NetIdAssignments`] is the controller side of NetID allocation. At
//! startup it replays the assignments found in the registry into a fresh
//! [`NetIdAllocator`]. Afterwards it assigns a NetID whenever a namespace is
//! created and revokes it when the namespace is deleted. The allocator holds
//! a NetID for at least as long as the registry does:
//!
//! - assign: allocate, then persist. If persisting fails the NetID is
//!   released again, so no NetID exists only in memory.
//! - revoke: remove the record, then release. If removing fails nothing is
//!   released, so the NetID is never handed to another namespace while its
//!   record still names the old owner.
//!
//! A crash between the two steps loses nothing: allocator state is rebuilt
//! from the registry by the next startup replay.

use crate::Error;
use crate::NetIdAllocator;
use crate::NetIdRange;
use crate::NetNamespace;
use crate::NetNamespaceRegistry;
use crate::GLOBAL_NETID;
use slog::Logger;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum AssignmentError {
    #[error(transparent)]
    Allocator(#[from] Error),

    #[error("NetID range {0} contains the global NetID {}", GLOBAL_NETID)]
    RangeContainsGlobal(NetIdRange),

    #[error("failed to list namespaces in the registry")]
    List(#[source] anyhow::Error),

    #[error("failed to record NetID {netid} for namespace {namespace:?}")]
    Persist {
        namespace: String,
        netid: u32,
        #[source]
        err: anyhow::Error,
    },

    #[error("failed to remove the NetID record of namespace {namespace:?}")]
    Remove {
        namespace: String,
        #[source]
        err: anyhow::Error,
    },
}

/// Outcome of replaying the registry into the allocator
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Records whose NetID was reserved in the allocator.
    pub restored: usize,
    /// Records holding the global NetID.
    pub global: usize,
    /// Records whose NetID is outside the configured range.
    pub out_of_range: usize,
    /// Records whose NetID was already reserved for another namespace.
    pub duplicate: usize,
    /// Records of admin namespaces holding an isolated NetID, or of other
    /// namespaces holding the global NetID.
    pub misassigned: usize,
}

impl ReplaySummary {
    /// Number of records that could not be restored.
    pub fn rejected(&self) -> usize {
        self.out_of_range + self.duplicate + self.misassigned
    }
}

/// Tracks which namespace holds which NetID, on top of a shared allocator
pub struct NetIdAssignments<R> {
    log: Logger,
    allocator: NetIdAllocator,
    registry: R,
    admin_namespaces: BTreeSet<String>,

    // Held for the whole of every operation, so that the window between an
    // allocator change and the matching registry change is never visible to
    // another assignment.
    namespaces: Mutex<BTreeMap<String, u32>>,
}

impl<R: NetNamespaceRegistry> NetIdAssignments<R> {
    pub fn new<I, S>(
        log: &Logger,
        allocator: NetIdAllocator,
        registry: R,
        admin_namespaces: I,
    ) -> Result<Self, AssignmentError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let range = allocator.range();
        if range.contains(GLOBAL_NETID) {
            return Err(AssignmentError::RangeContainsGlobal(range));
        }
        let admin_namespaces =
            admin_namespaces.into_iter().map(Into::into).collect();
        let log = log.new(o!(
            "component" => "NetIdAssignments",
            "netid_range" => range.to_string(),
        ));
        Ok(Self {
            log,
            allocator,
            registry,
            admin_namespaces,
            namespaces: Mutex::new(BTreeMap::new()),
        })
    }

    pub fn allocator(&self) -> &NetIdAllocator {
        &self.allocator
    }

    /// Rebuild allocator state from the records in the registry.
    ///
    /// This must run before any call to [`Self::assign`]. Records that cannot
    /// be restored point at corrupt registry contents: they are logged and
    /// counted, and do not stop the replay. Their namespaces are left
    /// unassigned, so the next [`Self::assign`] gives them a fresh NetID.
    pub fn replay(&self) -> Result<ReplaySummary, AssignmentError> {
        let records = self.registry.list().map_err(AssignmentError::List)?;
        let mut namespaces = self.namespaces.lock().unwrap();
        let mut summary = ReplaySummary::default();

        for NetNamespace { name, netid } in records {
            // Assignments made since startup are authoritative.
            if namespaces.contains_key(&name) {
                continue;
            }
            let admin = self.admin_namespaces.contains(&name);
            if admin != (netid == GLOBAL_NETID) {
                warn!(
                    self.log,
                    "namespace's NetID does not match its admin status; \
                     a new NetID will be assigned";
                    "namespace" => &name,
                    "netid" => netid,
                    "admin" => admin,
                );
                summary.misassigned += 1;
                continue;
            }
            if admin {
                debug!(
                    self.log,
                    "restored global NetID";
                    "namespace" => &name,
                );
                namespaces.insert(name, netid);
                summary.global += 1;
                continue;
            }
            match self.allocator.allocate(netid) {
                Ok(()) => {
                    debug!(
                        self.log,
                        "restored NetID";
                        "namespace" => &name,
                        "netid" => netid,
                    );
                    namespaces.insert(name, netid);
                    summary.restored += 1;
                }
                Err(Error::NotInRange { .. }) => {
                    warn!(
                        self.log,
                        "namespace has a NetID outside the configured range; \
                         a new NetID will be assigned";
                        "namespace" => &name,
                        "netid" => netid,
                    );
                    summary.out_of_range += 1;
                }
                Err(Error::AlreadyAllocated(_)) => {
                    let owner = namespaces
                        .iter()
                        .find(|(_, id)| **id == netid)
                        .map(|(owner, _)| owner.clone());
                    warn!(
                        self.log,
                        "namespace has a NetID that is already in use; \
                         a new NetID will be assigned";
                        "namespace" => &name,
                        "netid" => netid,
                        "owner" => ?owner,
                    );
                    summary.duplicate += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }

        info!(
            self.log,
            "replayed NetID assignments from registry";
            "restored" => summary.restored,
            "global" => summary.global,
            "rejected" => summary.rejected(),
            "free" => self.allocator.free(),
        );
        Ok(summary)
    }

    /// Assign a NetID to `namespace` and record it in the registry.
    ///
    /// A namespace that already holds a NetID keeps it. Admin namespaces get
    /// [`GLOBAL_NETID`]. Fails with [`Error::Full`] when the range is
    /// exhausted.
    pub fn assign(&self, namespace: &str) -> Result<u32, AssignmentError> {
        let mut namespaces = self.namespaces.lock().unwrap();
        if let Some(netid) = namespaces.get(namespace) {
            debug!(
                self.log,
                "namespace already has a NetID";
                "namespace" => namespace,
                "netid" => *netid,
            );
            return Ok(*netid);
        }

        let global = self.admin_namespaces.contains(namespace);
        let netid = if global {
            GLOBAL_NETID
        } else {
            self.allocator.allocate_next().inspect_err(|err| {
                warn!(
                    self.log,
                    "failed to allocate NetID";
                    "namespace" => namespace,
                    "error" => %err,
                );
            })?
        };

        let record = NetNamespace::new(namespace, netid);
        if let Err(err) = self.registry.put(&record) {
            if !global {
                self.allocator.release(netid)?;
            }
            warn!(
                self.log,
                "failed to record NetID, released it";
                "namespace" => namespace,
                "netid" => netid,
                "error" => %err,
            );
            return Err(AssignmentError::Persist {
                namespace: namespace.to_string(),
                netid,
                err,
            });
        }

        namespaces.insert(record.name, netid);
        info!(
            self.log,
            "assigned NetID";
            "namespace" => namespace,
            "netid" => netid,
        );
        Ok(netid)
    }

    /// Remove the registry record of `namespace` and release its NetID.
    ///
    /// If the record cannot be removed, the NetID stays assigned and
    /// allocated. Returns the NetID the namespace held, or `None` if it held
    /// none, which happens when a deletion is delivered more than once.
    pub fn revoke(
        &self,
        namespace: &str,
    ) -> Result<Option<u32>, AssignmentError> {
        let mut namespaces = self.namespaces.lock().unwrap();
        let Some(netid) = namespaces.get(namespace).copied() else {
            debug!(
                self.log,
                "namespace has no NetID to revoke";
                "namespace" => namespace,
            );
            return Ok(None);
        };

        if let Err(err) = self.registry.delete(namespace) {
            warn!(
                self.log,
                "failed to remove NetID record, keeping NetID";
                "namespace" => namespace,
                "netid" => netid,
                "error" => %err,
            );
            return Err(AssignmentError::Remove {
                namespace: namespace.to_string(),
                err,
            });
        }
        if netid != GLOBAL_NETID {
            self.allocator.release(netid)?;
        }

        namespaces.remove(namespace);
        info!(
            self.log,
            "revoked NetID";
            "namespace" => namespace,
            "netid" => netid,
        );
        Ok(Some(netid))
    }

    /// The NetID currently assigned to `namespace`, if any.
    pub fn netid(&self, namespace: &str) -> Option<u32> {
        self.namespaces.lock().unwrap().get(namespace).copied()
    }

    /// All current assignments, ordered by namespace name.
    pub fn assignments(&self) -> Vec<NetNamespace> {
        self.namespaces
            .lock()
            .unwrap()
            .iter()
            .map(|(name, netid)| NetNamespace::new(name.clone(), *netid))
            .collect()
    }
}
