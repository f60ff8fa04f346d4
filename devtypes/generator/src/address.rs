// Licensed under the Apache-2.0 license

//! Bus address specification parsing.
//!
//! A device type lists the addresses it may appear at as a comma separated
//! list of single addresses (`0x1d`) and inclusive ranges (`0x20-0x27`):
//!
//! ```
//! use devtypes_generator::address::parse_address_spec;
//!
//! let addrs = parse_address_spec("0x29, 0x10-0x12").unwrap();
//! assert_eq!(addrs, vec![0x29, 0x10, 0x11, 0x12]);
//! ```

use crate::error::{GeneratorError, GeneratorResult};
use log::warn;

/// Lowest address of the bus window that is scanned during discovery.
pub const MIN_VALID_ADDR: u8 = 0x04;

/// Highest address of the bus window that is scanned during discovery.
pub const MAX_VALID_ADDR: u8 = 0x77;

/// Lowest address covered by the generated address index.
pub const MIN_INDEX_ADDR: u8 = 0x00;

/// Highest address covered by the generated address index.
pub const MAX_INDEX_ADDR: u8 = 0x7f;

/// Resolves an address specification into bus addresses.
///
/// Order is preserved and duplicates are kept; the first address is the
/// device's primary address. An empty (or all-whitespace) spec yields no
/// addresses.
pub fn parse_address_spec(spec: &str) -> GeneratorResult<Vec<u8>> {
    let spec_trimmed = spec.trim();
    let mut addrs = Vec::new();
    if spec_trimmed.is_empty() {
        return Ok(addrs);
    }

    for token in spec_trimmed.split(',') {
        let token = token.trim();
        let malformed = || GeneratorError::MalformedAddressSpec {
            spec: spec.to_string(),
            token: token.to_string(),
        };

        match token.split_once('-') {
            Some((start, end)) => {
                let start = parse_hex_addr(start).ok_or_else(malformed)?;
                let end = parse_hex_addr(end).ok_or_else(malformed)?;
                if start > end {
                    warn!("Address range {token} in {spec:?} is reversed and contains no addresses");
                }
                addrs.extend(start..=end);
            }
            None => addrs.push(parse_hex_addr(token).ok_or_else(malformed)?),
        }
    }

    Ok(addrs)
}

/// Parses exactly `0x` followed by two hex digits.
fn parse_hex_addr(text: &str) -> Option<u8> {
    let digits = text.strip_prefix("0x")?;
    if digits.len() != 2 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u8::from_str_radix(digits, 16).ok()
}
