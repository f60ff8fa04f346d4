// Licensed under the Apache-2.0 license

//! Binary poll response layout.
//!
//! Each attribute of a device's response schema names a struct-style type
//! code. The layout walks the schema in order, assigning every supported
//! field a byte offset, and checks the total against the size the catalog
//! declares:
//!
//! ```text
//! resp.a = [{n: "x", t: "<h"}, {n: "y", t: "<h"}, {n: "t", t: "B"}]
//!
//!   offset 0  x  int16_t  le  2 bytes
//!   offset 2  y  int16_t  le  2 bytes
//!   offset 4  t  uint8_t      1 byte
//!   size 5 == resp.b ?
//! ```
//!
//! An unknown type code does not stop generation: the attribute is dropped
//! from the layout and reported as a [`LayoutDiagnostic`]. A size mismatch
//! does stop it, since generated decoders trust the declared size.

use crate::catalog::{AttributeDescriptor, DeviceDescriptor, OutputKind};
use crate::error::{GeneratorError, GeneratorResult};
use log::warn;

/// Byte order of a multi-byte field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endian {
    Big,
    Little,
}

/// Storage type of a poll response field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldType {
    I8,
    U8,
    I16(Endian),
    U16(Endian),
    I32(Endian),
    U32(Endian),
    F32(Endian),
}

impl FieldType {
    /// Look up a struct-style type code.
    ///
    /// Single byte codes carry no byte order; wider codes must be prefixed
    /// with `<` (little endian) or `>` (big endian). `l`/`L` are accepted
    /// as aliases of `i`/`I`.
    pub fn from_code(code: &str) -> Option<FieldType> {
        let endian = match code.as_bytes().first()? {
            b'<' => Some(Endian::Little),
            b'>' => Some(Endian::Big),
            _ => None,
        };
        let letter = if endian.is_some() { &code[1..] } else { code };
        match (endian, letter) {
            (None, "b") => Some(FieldType::I8),
            (None, "B") => Some(FieldType::U8),
            (Some(e), "h") => Some(FieldType::I16(e)),
            (Some(e), "H") => Some(FieldType::U16(e)),
            (Some(e), "i" | "l") => Some(FieldType::I32(e)),
            (Some(e), "I" | "L") => Some(FieldType::U32(e)),
            (Some(e), "f") => Some(FieldType::F32(e)),
            _ => None,
        }
    }

    /// Byte order, `None` for single byte types.
    pub fn endian(&self) -> Option<Endian> {
        match self {
            FieldType::I8 | FieldType::U8 => None,
            FieldType::I16(e)
            | FieldType::U16(e)
            | FieldType::I32(e)
            | FieldType::U32(e)
            | FieldType::F32(e) => Some(*e),
        }
    }

    /// Width in bytes.
    pub fn width(&self) -> u64 {
        match self {
            FieldType::I8 | FieldType::U8 => 1,
            FieldType::I16(_) | FieldType::U16(_) => 2,
            FieldType::I32(_) | FieldType::U32(_) | FieldType::F32(_) => 4,
        }
    }

    /// C storage type.
    pub fn c_type(&self) -> &'static str {
        match self {
            FieldType::I8 => "int8_t",
            FieldType::U8 => "uint8_t",
            FieldType::I16(_) => "int16_t",
            FieldType::U16(_) => "uint16_t",
            FieldType::I32(_) => "int32_t",
            FieldType::U32(_) => "uint32_t",
            FieldType::F32(_) => "float",
        }
    }

    /// Suffix naming the extraction helper, e.g. `be_int16`.
    ///
    /// Backends prefix this with their own helper namespace.
    pub fn extractor(&self) -> &'static str {
        use Endian::{Big, Little};
        match self {
            FieldType::I8 => "int8",
            FieldType::U8 => "uint8",
            FieldType::I16(Big) => "be_int16",
            FieldType::I16(Little) => "le_int16",
            FieldType::U16(Big) => "be_uint16",
            FieldType::U16(Little) => "le_uint16",
            FieldType::I32(Big) => "be_int32",
            FieldType::I32(Little) => "le_int32",
            FieldType::U32(Big) => "be_uint32",
            FieldType::U32(Little) => "le_uint32",
            FieldType::F32(Big) => "be_float32",
            FieldType::F32(Little) => "le_float32",
        }
    }

    /// Every supported field type, in helper emission order.
    pub const ALL: [FieldType; 12] = [
        FieldType::I8,
        FieldType::U8,
        FieldType::I16(Endian::Little),
        FieldType::U16(Endian::Little),
        FieldType::I16(Endian::Big),
        FieldType::U16(Endian::Big),
        FieldType::I32(Endian::Little),
        FieldType::U32(Endian::Little),
        FieldType::I32(Endian::Big),
        FieldType::U32(Endian::Big),
        FieldType::F32(Endian::Little),
        FieldType::F32(Endian::Big),
    ];
}

/// A field placed in the poll response.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldLayout {
    /// Attribute as declared in the catalog.
    pub attr: AttributeDescriptor,
    pub field_type: FieldType,
    /// Byte offset from the start of the response data.
    pub offset: u64,
}

impl FieldLayout {
    pub fn name(&self) -> &str {
        &self.attr.name
    }

    pub fn output_kind(&self) -> OutputKind {
        self.attr.output_kind
    }

    /// C type of the decoded value.
    pub fn value_c_type(&self) -> &'static str {
        match (self.attr.output_kind, self.attr.is_scaled()) {
            (OutputKind::Float, _) => "float",
            (OutputKind::Int, true) => "int32_t",
            (OutputKind::Int, false) => self.field_type.c_type(),
        }
    }
}

/// Why an attribute was left out of the layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayoutDiagnostic {
    pub device_key: String,
    pub attr_name: String,
    pub type_code: String,
}

impl std::fmt::Display for LayoutDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: skipping field {:?} with unsupported type {:?}",
            self.device_key, self.attr_name, self.type_code
        )
    }
}

/// The layout of one device's poll response.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PollLayout {
    pub fields: Vec<FieldLayout>,
    pub skipped: Vec<LayoutDiagnostic>,
    /// Total bytes covered by `fields`.
    pub size: u64,
}

impl PollLayout {
    /// Lay out a descriptor's response schema and check its declared size.
    pub fn compute(desc: &DeviceDescriptor) -> GeneratorResult<Self> {
        let mut layout = PollLayout::default();

        for attr in &desc.response_schema {
            let field_type = match FieldType::from_code(&attr.type_code) {
                Some(t) if !attr.name.is_empty() => t,
                _ => {
                    let diag = LayoutDiagnostic {
                        device_key: desc.key.clone(),
                        attr_name: attr.name.clone(),
                        type_code: attr.type_code.clone(),
                    };
                    warn!("{diag}");
                    layout.skipped.push(diag);
                    continue;
                }
            };
            layout.fields.push(FieldLayout {
                attr: attr.clone(),
                field_type,
                offset: layout.size,
            });
            layout.size += field_type.width();
        }

        if layout.size != desc.declared_response_bytes {
            return Err(GeneratorError::LayoutSizeMismatch {
                key: desc.key.clone(),
                declared: desc.declared_response_bytes,
                computed: layout.size,
            });
        }
        Ok(layout)
    }
}
