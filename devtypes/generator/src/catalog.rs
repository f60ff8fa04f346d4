// Licensed under the Apache-2.0 license

//! Device type catalog loading and merging.
//!
//! A catalog is a JSON file whose top level `devTypes` object maps device
//! type keys to descriptors. Several catalogs may be merged; the merge keeps
//! the position of a key's first appearance while the last file to define it
//! supplies its contents.
//!
//! Raw JSON is decoded exactly once, here, into [`DeviceDescriptor`] and
//! [`AttributeDescriptor`]. Later phases never look at JSON shapes again
//! except for the pass-through `pollInfo` / `devInfoJson` blobs.

use crate::address::parse_address_spec;
use crate::error::{CatalogReadCause, GeneratorError, GeneratorResult};
use log::{debug, info, warn};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

//=============================================================================
// Typed descriptors
//=============================================================================

/// Scan priority hint as written in the catalog.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ScanPriority {
    /// 1-based level, 1 being the most eager.
    Level(i64),
    /// `"high"`, `"medium"` or `"low"`.
    Named(String),
    /// Anything else; treated as the lowest priority.
    Other(Value),
}

/// How a decoded field value is presented to consumers.
///
/// Only `"float"` selects float output; any other value falls back to int.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputKind {
    #[default]
    Int,
    Float,
}

impl<'de> Deserialize<'de> for OutputKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(match value.as_str() {
            Some("float") => OutputKind::Float,
            Some("int") => OutputKind::Int,
            _ => {
                warn!("Unknown output kind {value}, using int");
                OutputKind::Int
            }
        })
    }
}

impl OutputKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputKind::Int => "int",
            OutputKind::Float => "float",
        }
    }
}

/// One field of a binary poll response.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct AttributeDescriptor {
    #[serde(rename = "n", default)]
    pub name: String,
    /// Struct-style type code such as `<h` or `>I`.
    #[serde(rename = "t", default)]
    pub type_code: String,
    #[serde(rename = "d", default = "default_divisor")]
    pub divisor: f64,
    #[serde(rename = "a", default)]
    pub offset: f64,
    #[serde(rename = "o", default)]
    pub output_kind: OutputKind,
    #[serde(rename = "u", default)]
    pub unit: Option<String>,
    /// Declared value range `[min, max]`.
    #[serde(rename = "r", default, deserialize_with = "lenient_range")]
    pub range: Option<(f64, f64)>,
}

/// Accept `r` only as a two number array; anything else drops the range.
fn lenient_range<'de, D>(deserializer: D) -> Result<Option<(f64, f64)>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if let Some([min, max]) = value.as_array().map(Vec::as_slice) {
        if let (Some(min), Some(max)) = (min.as_f64(), max.as_f64()) {
            return Ok(Some((min, max)));
        }
    }
    if !value.is_null() {
        warn!("Ignoring range {value}, expected [min, max]");
    }
    Ok(None)
}

fn default_divisor() -> f64 {
    1.0
}

impl AttributeDescriptor {
    /// Whether divisor/offset scaling changes the raw value.
    pub fn is_scaled(&self) -> bool {
        self.divisor != 1.0 || self.offset != 0.0
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
struct RawResponse {
    #[serde(default)]
    a: Vec<AttributeDescriptor>,
    #[serde(default)]
    b: u64,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct RawDevInfo {
    #[serde(default)]
    resp: RawResponse,
}

/// A catalog entry as decoded from one file, before address resolution.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDevType {
    #[serde(default)]
    device_type: String,
    #[serde(default)]
    addresses: String,
    #[serde(default)]
    detection_values: String,
    #[serde(default)]
    init_values: String,
    #[serde(default = "empty_object")]
    poll_info: Value,
    #[serde(default)]
    scan_priority: Option<ScanPriority>,
    #[serde(default = "empty_object")]
    dev_info_json: Value,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// A fully decoded device type.
#[derive(Clone, Debug)]
pub struct DeviceDescriptor {
    /// Catalog key.
    pub key: String,
    /// Device type identifier used by the runtime; need not equal `key`.
    pub device_type: String,
    /// Address specification as written.
    pub address_spec: String,
    /// Resolved addresses; the first is the primary address.
    pub addresses: Vec<u8>,
    pub detection_values: String,
    pub init_values: String,
    /// Polling configuration, passed through verbatim.
    pub poll_info: Value,
    pub scan_priority: Option<ScanPriority>,
    /// Full device info object, passed through verbatim when requested.
    pub dev_info_json: Value,
    pub response_schema: Vec<AttributeDescriptor>,
    pub declared_response_bytes: u64,
}

impl DeviceDescriptor {
    fn resolve(key: String, raw: RawDevType, source: &Path) -> GeneratorResult<Self> {
        let addresses = parse_address_spec(&raw.addresses)?;
        let dev_info = RawDevInfo::deserialize(&raw.dev_info_json).map_err(|e| {
            catalog_error(
                source,
                CatalogReadCause::Schema(format!("devInfoJson of {key}: {e}")),
            )
        })?;
        Ok(Self {
            key,
            device_type: raw.device_type,
            address_spec: raw.addresses,
            addresses,
            detection_values: raw.detection_values,
            init_values: raw.init_values,
            poll_info: raw.poll_info,
            scan_priority: raw.scan_priority,
            dev_info_json: raw.dev_info_json,
            response_schema: dev_info.resp.a,
            declared_response_bytes: dev_info.resp.b,
        })
    }

    /// Primary bus address, if the device has fixed addresses.
    pub fn primary_address(&self) -> Option<u8> {
        self.addresses.first().copied()
    }

    /// Value of `devInfoJson.name`, if it is a string.
    pub fn display_name(&self) -> Option<&str> {
        self.dev_info_json.get("name").and_then(Value::as_str)
    }
}

//=============================================================================
// Ordered merge
//=============================================================================

/// Insertion-ordered device type map.
///
/// Re-inserting an existing key replaces its value in place.
#[derive(Clone, Debug, Default)]
struct OrderedDevTypes {
    keys: Vec<String>,
    entries: HashMap<String, (PathBuf, RawDevType)>,
}

impl OrderedDevTypes {
    fn insert(&mut self, key: String, source: PathBuf, value: RawDevType) {
        if self.entries.insert(key.clone(), (source, value)).is_none() {
            self.keys.push(key);
        }
    }

    fn into_ordered(mut self) -> impl Iterator<Item = (String, PathBuf, RawDevType)> {
        self.keys.into_iter().filter_map(move |key| {
            let (path, value) = self.entries.remove(&key)?;
            Some((key, path, value))
        })
    }
}

/// Splits the catalog path argument into individual paths.
///
/// The list may be wrapped in `[` `]` and is separated by commas; blank
/// entries are ignored.
pub fn split_catalog_paths(paths: &str) -> Vec<PathBuf> {
    let mut list = paths.trim();
    list = list.strip_prefix('[').unwrap_or(list);
    list = list.strip_suffix(']').unwrap_or(list);
    list.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .collect()
}

fn catalog_error(path: &Path, source: impl Into<CatalogReadCause>) -> GeneratorError {
    GeneratorError::CatalogRead {
        path: path.to_path_buf(),
        source: source.into(),
    }
}

/// Decodes the `devTypes` object of a parsed catalog, in source order.
fn decode_dev_types(path: &Path, root: &Value) -> GeneratorResult<Vec<(String, RawDevType)>> {
    let dev_types = match root.get("devTypes") {
        None => return Ok(Vec::new()),
        Some(Value::Object(map)) => map,
        Some(_) => {
            return Err(catalog_error(
                path,
                CatalogReadCause::Schema("devTypes is not an object".to_string()),
            ))
        }
    };

    dev_types
        .iter()
        .map(|(key, value)| {
            let raw = RawDevType::deserialize(value).map_err(|e| {
                catalog_error(path, CatalogReadCause::Schema(format!("{key}: {e}")))
            })?;
            Ok((key.clone(), raw))
        })
        .collect()
}

fn read_catalog_file(path: &Path) -> GeneratorResult<Vec<(String, RawDevType)>> {
    let text = std::fs::read_to_string(path).map_err(|e| catalog_error(path, e))?;
    let root: Value = serde_json::from_str(&text).map_err(|e| catalog_error(path, e))?;
    decode_dev_types(path, &root)
}

/// Loads and merges catalogs in the given order and resolves every descriptor.
pub fn load_catalogs<P: AsRef<Path>>(paths: &[P]) -> GeneratorResult<Vec<DeviceDescriptor>> {
    let mut merged = OrderedDevTypes::default();
    for path in paths {
        let path = path.as_ref();
        let dev_types = read_catalog_file(path)?;
        info!(
            "Read {} device types from {}",
            dev_types.len(),
            path.display()
        );
        for (key, raw) in dev_types {
            merged.insert(key, path.to_path_buf(), raw);
        }
    }

    merged
        .into_ordered()
        .enumerate()
        .map(|(index, (key, path, raw))| {
            let descriptor = DeviceDescriptor::resolve(key, raw, &path)?;
            debug!(
                "Record {index} {} addresses {:02x?}",
                descriptor.key, descriptor.addresses
            );
            Ok(descriptor)
        })
        .collect()
}

/// Parses a single catalog held in memory.
///
/// Behaves like [`load_catalogs`] given one file with this content.
pub fn parse_catalog_str(text: &str) -> GeneratorResult<Vec<DeviceDescriptor>> {
    let path = Path::new("<memory>");
    let root: Value = serde_json::from_str(text).map_err(|e| catalog_error(path, e))?;
    decode_dev_types(path, &root)?
        .into_iter()
        .map(|(key, raw)| DeviceDescriptor::resolve(key, raw, path))
        .collect()
}
