// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::Error;
use serde::Deserialize;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// A non-decreasing range of NetIDs, inclusive of both ends.
///
/// The first NetID must be less than or equal to the last.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(try_from = "AnyNetIdRange")]
pub struct NetIdRange {
    min: u32,
    max: u32,
}

impl NetIdRange {
    pub fn new(min: u32, max: u32) -> Result<Self, Error> {
        if min <= max {
            Ok(Self { min, max })
        } else {
            Err(Error::InvalidRange { min, max })
        }
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn contains(&self, id: u32) -> bool {
        self.min <= id && id <= self.max
    }

    /// Number of NetIDs in the range.
    ///
    /// This is a `u64` because the full range `[0, u32::MAX]` holds 2^32
    /// NetIDs.
    pub fn size(&self) -> u64 {
        u64::from(self.max) - u64::from(self.min) + 1
    }

    // Position of `id` within the range. The caller must have checked
    // `contains(id)`.
    pub(crate) fn offset_of(&self, id: u32) -> usize {
        debug_assert!(self.contains(id));
        (id - self.min) as usize
    }

    pub(crate) fn id_at(&self, offset: usize) -> u32 {
        let id = self.min + offset as u32;
        debug_assert!(self.contains(id));
        id
    }
}

impl fmt::Display for NetIdRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParseNetIdRangeError {
    #[error("expected a range of the form \"MIN-MAX\", found {0:?}")]
    Format(String),

    #[error("invalid NetID {value:?}: {err}")]
    NetId {
        value: String,
        #[source]
        err: std::num::ParseIntError,
    },

    #[error(transparent)]
    Range(#[from] Error),
}

impl FromStr for NetIdRange {
    type Err = ParseNetIdRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (min, max) = s
            .split_once('-')
            .ok_or_else(|| ParseNetIdRangeError::Format(s.to_string()))?;
        let parse = |value: &str| {
            let value = value.trim();
            value.parse::<u32>().map_err(|err| ParseNetIdRangeError::NetId {
                value: value.to_string(),
                err,
            })
        };
        Ok(NetIdRange::new(parse(min)?, parse(max)?)?)
    }
}

// Configuration may spell a range either as `{ min = .., max = .. }` or as
// the string "MIN-MAX".
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum AnyNetIdRange {
    Bounds { min: u32, max: u32 },
    Text(String),
}

impl TryFrom<AnyNetIdRange> for NetIdRange {
    type Error = ParseNetIdRangeError;

    fn try_from(r: AnyNetIdRange) -> Result<Self, Self::Error> {
        match r {
            AnyNetIdRange::Bounds { min, max } => {
                Ok(NetIdRange::new(min, max)?)
            }
            AnyNetIdRange::Text(s) => s.parse(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_new_rejects_decreasing_range() {
        assert_eq!(
            NetIdRange::new(300, 201).unwrap_err(),
            Error::InvalidRange { min: 300, max: 201 }
        );
        let range = NetIdRange::new(7, 7).unwrap();
        assert_eq!(range.size(), 1);
    }

    #[test]
    fn test_contains() {
        let range = NetIdRange::new(201, 300).unwrap();
        assert!(!range.contains(200));
        assert!(range.contains(201));
        assert!(range.contains(250));
        assert!(range.contains(300));
        assert!(!range.contains(301));
        assert_eq!(range.size(), 100);
    }

    #[test]
    fn test_full_u32_range() {
        let range = NetIdRange::new(0, u32::MAX).unwrap();
        assert_eq!(range.size(), 1 << 32);
        assert!(range.contains(0));
        assert!(range.contains(u32::MAX));
    }

    #[test]
    fn test_parse() {
        let range: NetIdRange = "10-16777215".parse().unwrap();
        assert_eq!(range, NetIdRange::new(10, 16777215).unwrap());
        assert_eq!(range.to_string(), "10-16777215");

        assert!(matches!(
            "10".parse::<NetIdRange>(),
            Err(ParseNetIdRangeError::Format(_))
        ));
        assert!(matches!(
            "ten-20".parse::<NetIdRange>(),
            Err(ParseNetIdRangeError::NetId { .. })
        ));
        assert!(matches!(
            "20-10".parse::<NetIdRange>(),
            Err(ParseNetIdRangeError::Range(Error::InvalidRange {
                min: 20,
                max: 10
            }))
        ));
    }

    #[test]
    fn test_deserialize_validates() {
        #[derive(Debug, Deserialize)]
        struct Wrapper {
            range: NetIdRange,
        }

        let w: Wrapper =
            toml::from_str("range = { min = 201, max = 300 }").unwrap();
        assert_eq!(w.range, NetIdRange::new(201, 300).unwrap());

        let err = toml::from_str::<Wrapper>("range = { min = 5, max = 4 }")
            .unwrap_err();
        assert!(
            err.to_string().contains("min (5) is greater than max (4)"),
            "unexpected error: {err}"
        );

        let w: Wrapper = toml::from_str(r#"range = "201-300""#).unwrap();
        assert_eq!(w.range, NetIdRange::new(201, 300).unwrap());

        let err =
            toml::from_str::<Wrapper>(r#"range = "300-201""#).unwrap_err();
        assert!(
            err.to_string().contains("min (300) is greater than max (201)"),
            "unexpected error: {err}"
        );
        let err = toml::from_str::<Wrapper>(r#"range = "201""#).unwrap_err();
        assert!(
            err.to_string().contains("of the form \"MIN-MAX\""),
            "unexpected error: {err}"
        );
    }
}
