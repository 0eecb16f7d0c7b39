// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::NetIdRange;

/// Errors returned by [`NetIdRange`] and [`crate::NetIdAllocator`]
///
/// None of these are transient: retrying the same call without some other
/// change in allocator state returns the same error.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("invalid NetID range: min ({min}) is greater than max ({max})")]
    InvalidRange { min: u32, max: u32 },

    #[error("NetID range {0} is too large to track on this target")]
    RangeTooLarge(NetIdRange),

    #[error("NetID {id} is not in the range {range}")]
    NotInRange { id: u32, range: NetIdRange },

    #[error("NetID {0} is already allocated")]
    AlreadyAllocated(u32),

    #[error("no NetIDs available in the range {0}")]
    Full(NetIdRange),
}
