// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Allocation of network identifiers (NetIDs) for tenant namespaces
//!
//! Every tenant namespace of the SDN controller is given exactly one NetID,
//! which is used as the overlay segment identifier (the VNI) that keeps the
//! tenant's traffic isolated from every other tenant's. NetIDs are handed out
//! from a fixed, configured [`NetIdRange`] by a [`NetIdAllocator`].
//!
//! The allocator itself is a pure in-memory structure. The controller builds
//! one at startup, replays the assignments already recorded in its durable
//! registry into it, and from then on allocates and releases NetIDs as
//! namespaces come and go. [`NetIdAssignments`] implements that controller
//! side of the contract on top of a [`NetNamespaceRegistry`].

#[macro_use]
extern crate slog;

mod allocator;
pub mod assignments;
pub mod config;
mod error;
mod range;
pub mod registry;

pub use allocator::NetIdAllocator;
pub use assignments::NetIdAssignments;
pub use error::Error;
pub use range::NetIdRange;
pub use range::ParseNetIdRangeError;
pub use registry::NetNamespace;
pub use registry::NetNamespaceRegistry;

/// NetID shared by admin namespaces whose traffic is not isolated.
///
/// This NetID is never handed out by an allocator, and a configured range
/// must not contain it.
pub const GLOBAL_NETID: u32 = 0;

/// Lowest NetID of the default range; values below are reserved.
pub const MIN_NETID: u32 = 10;

/// Highest NetID of the default range, the largest 24-bit VNI.
pub const MAX_NETID: u32 = (1 << 24) - 1;
