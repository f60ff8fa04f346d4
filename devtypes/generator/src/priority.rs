// Licensed under the Apache-2.0 license

//! Scan priority classification.
//!
//! Discovery scans addresses in three passes. Each descriptor with an
//! explicit priority places its addresses into one of the first buckets;
//! everything else in the valid bus window ends up in the last one.
//!
//! ```text
//! high   -> primary address in bucket 0, other addresses in bucket 1
//! medium -> all addresses in bucket 1
//! low    -> all addresses in bucket 2
//! none   -> nothing explicit
//!
//! bucket 2 = [MIN_VALID_ADDR, MAX_VALID_ADDR] \ (bucket 0 ∪ bucket 1)
//! ```

use crate::address::{MAX_VALID_ADDR, MIN_VALID_ADDR};
use crate::catalog::{DeviceDescriptor, ScanPriority};
use std::collections::BTreeSet;

/// Number of scan priority buckets.
pub const NUM_PRIORITY_LEVELS: usize = 3;

/// Bucket index for the most eager scanning.
pub const HIGH: usize = 0;

/// Bucket index for normal scanning.
pub const MEDIUM: usize = 1;

/// Bucket index for everything else.
pub const LOW: usize = NUM_PRIORITY_LEVELS - 1;

impl ScanPriority {
    /// Bucket index for this priority, clamped into range.
    pub fn level(&self) -> usize {
        let value = match self {
            ScanPriority::Level(n) => n.saturating_sub(1),
            ScanPriority::Named(name) => match name.as_str() {
                "high" => HIGH as i64,
                "medium" => MEDIUM as i64,
                _ => LOW as i64,
            },
            ScanPriority::Other(_) => LOW as i64,
        };
        value.clamp(HIGH as i64, LOW as i64) as usize
    }
}

/// The finalized, pairwise disjoint scan lists.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanPriorityLists {
    lists: [Vec<u8>; NUM_PRIORITY_LEVELS],
}

impl ScanPriorityLists {
    /// Classify the addresses of every descriptor, in catalog order.
    pub fn classify(descriptors: &[DeviceDescriptor]) -> Self {
        let mut buckets: [BTreeSet<u8>; NUM_PRIORITY_LEVELS] = Default::default();

        for desc in descriptors {
            let Some(priority) = &desc.scan_priority else {
                continue;
            };
            match priority.level() {
                HIGH => {
                    if let Some((primary, others)) = desc.addresses.split_first() {
                        buckets[HIGH].insert(*primary);
                        buckets[MEDIUM].extend(others.iter().copied());
                    }
                }
                level => buckets[level].extend(desc.addresses.iter().copied()),
            }
        }

        // The lowest bucket is everything in the window not scanned earlier
        buckets[LOW] = (MIN_VALID_ADDR..=MAX_VALID_ADDR).collect();
        for level in 1..NUM_PRIORITY_LEVELS {
            let (earlier, rest) = buckets.split_at_mut(level);
            for bucket in earlier.iter() {
                rest[0].retain(|addr| !bucket.contains(addr));
            }
        }

        Self {
            lists: buckets.map(|bucket| bucket.into_iter().collect()),
        }
    }

    /// Sorted addresses in the given bucket.
    pub fn list(&self, level: usize) -> &[u8] {
        &self.lists[level]
    }

    pub fn lists(&self) -> &[Vec<u8>; NUM_PRIORITY_LEVELS] {
        &self.lists
    }
}
