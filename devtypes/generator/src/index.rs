// Licensed under the Apache-2.0 license

//! Address to device type index.
//!
//! For every address in `[MIN_INDEX_ADDR, MAX_INDEX_ADDR]` the index lists
//! the positions of the descriptors that may appear there, in catalog order.
//! Addresses no descriptor claims have no list at all, which lets the
//! emitted table use a null pointer instead of an empty array.

use crate::address::{MAX_INDEX_ADDR, MIN_INDEX_ADDR};
use crate::catalog::DeviceDescriptor;
use crate::error::{GeneratorError, GeneratorResult};

/// Number of entries in the address index.
pub const NUM_INDEX_ADDRS: usize = (MAX_INDEX_ADDR - MIN_INDEX_ADDR) as usize + 1;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddressIndex {
    entries: Vec<Option<Vec<u16>>>,
    max_count: usize,
}

impl AddressIndex {
    /// Fails if a claiming descriptor's position does not fit in `u16`.
    pub fn build(descriptors: &[DeviceDescriptor]) -> GeneratorResult<Self> {
        let mut entries: Vec<Option<Vec<u16>>> = vec![None; NUM_INDEX_ADDRS];
        for (pos, desc) in descriptors.iter().enumerate() {
            if desc.addresses.is_empty() {
                continue;
            }
            let pos = u16::try_from(pos).map_err(|_| GeneratorError::TooManyDeviceTypes {
                count: descriptors.len(),
            })?;
            for &addr in &desc.addresses {
                if !(MIN_INDEX_ADDR..=MAX_INDEX_ADDR).contains(&addr) {
                    continue;
                }
                entries[(addr - MIN_INDEX_ADDR) as usize]
                    .get_or_insert_with(Vec::new)
                    .push(pos);
            }
        }
        let max_count = entries.iter().flatten().map(Vec::len).max().unwrap_or(0);
        Ok(Self { entries, max_count })
    }

    /// Descriptor positions for an address, or `None` if none claim it.
    pub fn get(&self, addr: u8) -> Option<&[u16]> {
        if !(MIN_INDEX_ADDR..=MAX_INDEX_ADDR).contains(&addr) {
            return None;
        }
        self.entries[(addr - MIN_INDEX_ADDR) as usize].as_deref()
    }

    /// Number of descriptors claiming an address.
    pub fn count(&self, addr: u8) -> usize {
        self.get(addr).map_or(0, <[u16]>::len)
    }

    /// Iterate over `(address, positions)` for the whole index range.
    pub fn iter(&self) -> impl Iterator<Item = (u8, Option<&[u16]>)> + '_ {
        (MIN_INDEX_ADDR..=MAX_INDEX_ADDR).zip(self.entries.iter().map(Option::as_deref))
    }

    /// Longest list for any single address.
    pub fn max_count(&self) -> usize {
        self.max_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::parse_catalog_str;

    fn build(json: &str) -> AddressIndex {
        AddressIndex::build(&parse_catalog_str(json).unwrap()).unwrap()
    }

    #[test]
    fn test_shared_address_in_catalog_order() {
        let index = build(
            r#"{"devTypes": {
                "A": {"addresses": "0x20"},
                "B": {"addresses": "0x10"},
                "C": {"addresses": "0x1f-0x21"}
            }}"#,
        );
        assert_eq!(index.get(0x20), Some(&[0, 2][..]));
        assert_eq!(index.get(0x10), Some(&[1][..]));
        assert_eq!(index.get(0x1f), Some(&[2][..]));
        assert_eq!(index.get(0x22), None);
        assert_eq!(index.count(0x20), 2);
        assert_eq!(index.count(0x22), 0);
        assert_eq!(index.max_count(), 2);
    }

    #[test]
    fn test_out_of_range_addresses_ignored() {
        let index = build(r#"{"devTypes": {"A": {"addresses": "0x7f-0x81"}}}"#);
        assert_eq!(index.get(0x7f), Some(&[0][..]));
        assert_eq!(index.get(0x80), None);
        assert_eq!(index.iter().count(), NUM_INDEX_ADDRS);
        assert_eq!(index.iter().filter(|(_, e)| e.is_some()).count(), 1);
    }

    #[test]
    fn test_duplicate_address_listed_twice() {
        let index = build(r#"{"devTypes": {"A": {"addresses": "0x30,0x30"}}}"#);
        assert_eq!(index.get(0x30), Some(&[0, 0][..]));
    }

    #[test]
    fn test_position_past_u16_rejected() {
        let parsed =
            parse_catalog_str(r#"{"devTypes": {"Bare": {}, "A": {"addresses": "0x30"}}}"#).unwrap();
        let mut descs = vec![parsed[0].clone(); usize::from(u16::MAX) + 1];
        let claiming = parsed[1].clone();
        // Unaddressed descriptors never need an index entry
        assert!(AddressIndex::build(&descs).is_ok());
        descs.push(claiming);
        assert!(matches!(
            AddressIndex::build(&descs),
            Err(GeneratorError::TooManyDeviceTypes { count: 65537 })
        ));
    }

    #[test]
    fn test_empty_catalog() {
        let index = build(r#"{"devTypes": {}}"#);
        assert_eq!(index.max_count(), 0);
        assert!(index.iter().all(|(_, e)| e.is_none()));
    }
}
