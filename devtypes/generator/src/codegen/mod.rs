// Licensed under the Apache-2.0 license

//! Main code generation logic for turning device type catalogs into sources.
//!
//! A run is a straight pipeline over one immutable [`DevTypesModel`]:
//!
//! ```text
//! catalog files -> Vec<DeviceDescriptor> -> DevTypesModel -> GeneratedFiles
//!                                           ├── AddressIndex
//!                                           ├── ScanPriorityLists
//!                                           └── PollLayout per descriptor
//! ```
//!
//! The implementation is split across submodules:
//! - `native`: device type table, poll record structs and decode routines
//! - `script`: symbol table, decoder declarations and decoder sources for
//!   the scripting runtime

mod native;
mod script;

use log::{debug, info};
use std::collections::HashMap;
use std::fmt::Write;
use std::path::Path;

use crate::catalog::{
    load_catalogs, split_catalog_paths, AttributeDescriptor, DeviceDescriptor, OutputKind,
};
use crate::config::{GenOptions, OutputPaths};
use crate::error::{GeneratorError, GeneratorResult};
use crate::index::AddressIndex;
use crate::layout::{Endian, FieldType, PollLayout};
use crate::output::{GeneratedFile, GeneratedFiles};
use crate::priority::ScanPriorityLists;
use crate::util::{c_float, c_ident, c_number, hex_addr};

/// Include name used when an output path has no file name.
const DEFAULT_POLL_RECORDS_NAME: &str = "DevicePollRecords_generated.h";
const DEFAULT_DECODER_HEADER_NAME: &str = "DeviceMPDecoders_generated.h";

/// Everything derived from the merged catalog.
///
/// Built once and only read afterwards; every backend renders from the same
/// value so the artifacts of one run agree with each other.
#[derive(Clone, Debug)]
pub struct DevTypesModel {
    pub descriptors: Vec<DeviceDescriptor>,
    /// Poll layout of each descriptor, same order as `descriptors`.
    pub layouts: Vec<PollLayout>,
    pub index: AddressIndex,
    pub priorities: ScanPriorityLists,
}

impl DevTypesModel {
    /// Derive the index, scan lists and layouts of merged descriptors.
    ///
    /// Fails on the first descriptor whose computed poll size differs from
    /// the declared one, and when two catalog keys map to one C identifier.
    pub fn build(descriptors: Vec<DeviceDescriptor>) -> GeneratorResult<Self> {
        let layouts = descriptors
            .iter()
            .map(PollLayout::compute)
            .collect::<GeneratorResult<Vec<_>>>()?;
        check_native_idents(&descriptors)?;
        let index = AddressIndex::build(&descriptors)?;
        let priorities = ScanPriorityLists::classify(&descriptors);

        for (addr, entries) in index.iter() {
            if let Some(entries) = entries {
                debug!("Address {} -> records {entries:?}", hex_addr(addr));
            }
        }
        debug!(
            "Scan lists: {} high, {} medium, {} low; at most {} records per address",
            priorities.lists()[0].len(),
            priorities.lists()[1].len(),
            priorities.lists()[2].len(),
            index.max_count()
        );

        Ok(Self {
            descriptors,
            layouts,
            index,
            priorities,
        })
    }

    /// Descriptors paired with their layouts, in catalog order.
    pub fn records(&self) -> impl Iterator<Item = (&DeviceDescriptor, &PollLayout)> + '_ {
        self.descriptors.iter().zip(&self.layouts)
    }
}

/// Native struct and decoder names derive from the catalog key, so two keys
/// that normalize to the same identifier would emit duplicate definitions.
fn check_native_idents(descriptors: &[DeviceDescriptor]) -> GeneratorResult<()> {
    let mut seen: HashMap<String, &str> = HashMap::new();
    for desc in descriptors {
        let ident = c_ident(&desc.key);
        if let Some(first) = seen.insert(ident.clone(), &desc.key) {
            return Err(GeneratorError::IdentifierCollision {
                ident,
                first: first.to_string(),
                second: desc.key.clone(),
            });
        }
    }
    Ok(())
}

/// Scale a raw field value expression by the attribute's divisor and offset.
///
/// Float outputs use float literals, int outputs integer arithmetic. Unscaled
/// values are only cast when the output kind asks for a float.
pub(crate) fn scaled_value(attr: &AttributeDescriptor, raw: &str) -> String {
    if !attr.is_scaled() {
        return match attr.output_kind {
            OutputKind::Float => format!("(float){raw}"),
            OutputKind::Int => raw.to_string(),
        };
    }
    let (divisor, offset) = match attr.output_kind {
        OutputKind::Float => (c_float(attr.divisor), c_float(attr.offset.abs())),
        OutputKind::Int => (c_number(attr.divisor), c_number(attr.offset.abs())),
    };
    let mut expr = format!("({raw} / {divisor})");
    if attr.offset > 0.0 {
        write!(expr, " + {offset}").unwrap();
    } else if attr.offset < 0.0 {
        write!(expr, " - {offset}").unwrap();
    }
    expr
}

/// Combine `width` bytes starting at `pBuf[base]` into one integer.
///
/// An empty `base` indexes from zero with literal subscripts.
fn compose_bytes(width: u64, base: &str, little_endian: bool) -> String {
    (0..width)
        .map(|i| {
            let shift = if little_endian { i * 8 } else { (width - 1 - i) * 8 };
            let byte = match (base, i) {
                ("", 0) => "pBuf[0]".to_string(),
                ("", i) => format!("pBuf[{i}]"),
                (base, 0) => format!("pBuf[{base}]"),
                (base, i) => format!("pBuf[{base} + {i}]"),
            };
            match shift {
                0 => byte,
                _ => format!("((uint32_t){byte} << {shift})"),
            }
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Emit a `static inline` extraction helper for every supported field type.
///
/// Helpers are plain C so both backends can share them; `prefix` keeps the
/// two sets apart when they end up in one image.
pub(crate) fn write_extraction_helpers(output: &mut String, prefix: &str) {
    for field_type in FieldType::ALL {
        let c_type = field_type.c_type();
        let name = field_type.extractor();
        writeln!(
            output,
            "static inline {c_type} {prefix}{name}(const uint8_t* pBuf, uint32_t offset)"
        )
        .unwrap();
        writeln!(output, "{{").unwrap();
        match field_type {
            FieldType::F32(endian) => {
                let bits = FieldType::U32(endian).extractor();
                writeln!(output, "    union {{ uint32_t u; float f; }} converter;").unwrap();
                writeln!(output, "    converter.u = {prefix}{bits}(pBuf, offset);").unwrap();
                writeln!(output, "    return converter.f;").unwrap();
            }
            _ => {
                let little = field_type.endian() != Some(Endian::Big);
                let bytes = compose_bytes(field_type.width(), "offset", little);
                writeln!(output, "    return ({c_type})({bytes});").unwrap();
            }
        }
        writeln!(output, "}}").unwrap();
        writeln!(output).unwrap();
    }
}

/// File name a generated file uses to include another one.
fn include_name<'a>(path: &'a Path, default: &'a str) -> &'a str {
    path.file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(default)
}

/// Render every artifact of a run from an already built model.
pub fn render(
    model: &DevTypesModel,
    options: &GenOptions,
    paths: &OutputPaths,
) -> GeneratorResult<GeneratedFiles> {
    options.validate()?;

    let poll_records_name = include_name(&paths.poll_records, DEFAULT_POLL_RECORDS_NAME);
    let mut files = vec![
        GeneratedFile::new(
            &paths.poll_records,
            native::poll_records_header(model, options),
        ),
        GeneratedFile::new(
            &paths.dev_type_table,
            native::dev_type_table(model, options, poll_records_name),
        ),
    ];

    if let Some(script_config) = &options.script {
        let bindings = script::ScriptBindings::new(model, script_config);
        if let Some(path) = &paths.symbol_table {
            files.push(GeneratedFile::new(path, bindings.symbol_table()));
        }
        if let Some(path) = &paths.decoder_header {
            files.push(GeneratedFile::new(path, bindings.decoder_header()));
        }
        if let Some(path) = &paths.decoder_source {
            let header_name = paths
                .decoder_header
                .as_deref()
                .map_or(DEFAULT_DECODER_HEADER_NAME, |p| {
                    include_name(p, DEFAULT_DECODER_HEADER_NAME)
                });
            files.push(GeneratedFile::new(
                path,
                bindings.decoder_source(header_name, poll_records_name),
            ));
        }
    }

    Ok(GeneratedFiles::new(files))
}

/// Generate every artifact from already decoded descriptors.
pub fn generate_devtypes_from_descriptors(
    descriptors: Vec<DeviceDescriptor>,
    options: &GenOptions,
    paths: &OutputPaths,
) -> GeneratorResult<GeneratedFiles> {
    let model = DevTypesModel::build(descriptors)?;
    render(&model, options, paths)
}

/// Generate every artifact from a list of catalog files.
///
/// `json_paths` uses the command line syntax: comma separated, optionally
/// wrapped in brackets. Nothing is written; see [`GeneratedFiles::write`].
pub fn generate_devtypes_from_files(
    json_paths: &str,
    options: &GenOptions,
    paths: &OutputPaths,
) -> GeneratorResult<GeneratedFiles> {
    options.validate()?;
    let catalog_paths = split_catalog_paths(json_paths);
    if catalog_paths.is_empty() {
        return Err(GeneratorError::InvalidOption(
            "no device type catalog given".to_string(),
        ));
    }
    let descriptors = load_catalogs(&catalog_paths)?;
    info!(
        "Merged {} device types from {} catalogs",
        descriptors.len(),
        catalog_paths.len()
    );
    generate_devtypes_from_descriptors(descriptors, options, paths)
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
