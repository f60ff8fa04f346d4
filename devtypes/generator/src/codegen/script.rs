// Licensed under the Apache-2.0 license

//! Scripting backend: bindings for the MicroPython runtime.
//!
//! Three artifacts come out of one [`ScriptBindings`] value:
//! - the symbol table, one `Q(name)` line per interned name
//! - the decoder declarations header
//! - the decoder sources: extraction helpers, dict utilities, one
//!   `mp_decode_<type>` per device type and the `mp_decode_device_data`
//!   dispatch chain

use log::warn;
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use std::fmt::Write;

use super::{scaled_value, write_extraction_helpers, DevTypesModel};
use crate::catalog::{DeviceDescriptor, ScanPriority};
use crate::config::ScriptBindingConfig;
use crate::layout::{FieldLayout, PollLayout};
use crate::util::{c_float, c_ident, c_string_literal};

const HELPER_PREFIX: &str = "mp_get_";
const GENERATED_NOTE: &str = "// Generated from device type catalogs, do not edit";

/// Names the module always interns.
const STANDARD_SYMBOLS: [&str; 9] = [
    "device",
    "on_data",
    "on_status",
    "get_data",
    "list",
    "timestamp",
    "type",
    "name",
    "online",
];

const DECODER_ARGS: &str = "const uint8_t* pBuf, uint32_t bufLen, uint64_t timestampUs";

pub(super) struct ScriptBindings<'a> {
    model: &'a DevTypesModel,
    config: &'a ScriptBindingConfig,
    /// One entry per distinct device type, in catalog order.
    decoders: Vec<(&'a DeviceDescriptor, &'a PollLayout)>,
}

impl<'a> ScriptBindings<'a> {
    pub(super) fn new(model: &'a DevTypesModel, config: &'a ScriptBindingConfig) -> Self {
        let mut seen = HashSet::new();
        let decoders = model
            .records()
            .filter(|(desc, _)| !desc.device_type.is_empty())
            .filter(|(desc, _)| {
                let ident = c_ident(&desc.device_type);
                if seen.insert(ident) {
                    return true;
                }
                warn!(
                    "{}: device type {} already has a script decoder, skipping",
                    desc.key, desc.device_type
                );
                false
            })
            .collect();
        Self {
            model,
            config,
            decoders,
        }
    }

    /// String-valued device info entries stored alongside decoded values.
    fn metadata(desc: &DeviceDescriptor) -> impl Iterator<Item = (&String, &str)> {
        desc.dev_info_json
            .as_object()
            .into_iter()
            .flatten()
            .filter(|(key, _)| key.as_str() != "resp" && key.as_str() != "name")
            .filter_map(|(key, value)| match value {
                Value::String(text) if !text.is_empty() => Some((key, text.as_str())),
                _ => None,
            })
    }

    /// Every name the decoders refer to, as C identifiers.
    pub(super) fn symbols(&self) -> BTreeSet<String> {
        let mut names: BTreeSet<String> = STANDARD_SYMBOLS.iter().map(|s| s.to_string()).collect();
        names.insert(self.config.module_name.clone());

        for (desc, layout) in self.model.records() {
            if !desc.device_type.is_empty() {
                names.insert(desc.device_type.clone());
            }
            if let Some(ScanPriority::Named(priority)) = &desc.scan_priority {
                names.insert(priority.clone());
            }
            if self.config.include_metadata {
                names.extend(Self::metadata(desc).map(|(key, _)| key.clone()));
            }
            for field in &layout.fields {
                names.insert(field.name().to_string());
                if self.config.include_metadata {
                    names.insert(field.output_kind().as_str().to_string());
                }
                if self.config.include_units && has_unit(field) {
                    names.insert(format!("{}_unit", field.name()));
                }
                if self.config.include_ranges && field.attr.range.is_some() {
                    names.insert(format!("{}_min", field.name()));
                    names.insert(format!("{}_max", field.name()));
                }
            }
        }

        names
            .iter()
            .map(|name| c_ident(name))
            .filter(|name| !name.is_empty())
            .collect()
    }

    /// Render the symbol table.
    pub(super) fn symbol_table(&self) -> String {
        let mut output = String::new();
        writeln!(
            output,
            "// Symbols of the {} module",
            self.config.module_name
        )
        .unwrap();
        writeln!(output, "{GENERATED_NOTE}").unwrap();
        writeln!(output).unwrap();
        for symbol in self.symbols() {
            writeln!(output, "Q({symbol})").unwrap();
        }
        output
    }

    /// Render the decoder declarations header.
    pub(super) fn decoder_header(&self) -> String {
        let mut output = String::new();
        writeln!(output, "#pragma once").unwrap();
        writeln!(output, "#include \"py/obj.h\"").unwrap();
        writeln!(output).unwrap();
        writeln!(output, "{GENERATED_NOTE}").unwrap();
        writeln!(output).unwrap();

        for (desc, _) in &self.decoders {
            writeln!(output, "// Decoder for {}", desc.device_type).unwrap();
            writeln!(output, "mp_obj_t {}({DECODER_ARGS});", decoder_name(desc)).unwrap();
            writeln!(output).unwrap();
        }

        writeln!(output, "// Device decoder lookup").unwrap();
        writeln!(
            output,
            "mp_obj_t mp_decode_device_data(const char* deviceType, {DECODER_ARGS});"
        )
        .unwrap();
        writeln!(output).unwrap();
        writeln!(output, "// Utility functions").unwrap();
        writeln!(
            output,
            "mp_obj_t mp_create_device_dict_with_timestamp(uint64_t timestampUs);"
        )
        .unwrap();
        for (kind, c_type) in STORE_KINDS {
            writeln!(
                output,
                "void mp_dict_store_{kind}(mp_obj_t dict, qstr key_qstr, {c_type} value);"
            )
            .unwrap();
        }
        output
    }

    /// Render the decoder sources.
    pub(super) fn decoder_source(&self, decoder_header_name: &str, poll_records_name: &str) -> String {
        let mut output = String::new();
        writeln!(output, "#include \"{decoder_header_name}\"").unwrap();
        writeln!(output, "#include \"{poll_records_name}\"").unwrap();
        writeln!(output, "#include \"py/runtime.h\"").unwrap();
        writeln!(output, "#include \"py/objstr.h\"").unwrap();
        writeln!(output, "#include <string.h>").unwrap();
        writeln!(output).unwrap();
        writeln!(output, "{GENERATED_NOTE}").unwrap();
        writeln!(output).unwrap();

        write_extraction_helpers(&mut output, HELPER_PREFIX);
        write_dict_utilities(&mut output, self.config);
        for (desc, layout) in &self.decoders {
            self.write_decoder(&mut output, desc, layout);
        }
        self.write_dispatch(&mut output);
        output
    }

    fn write_decoder(&self, output: &mut String, desc: &DeviceDescriptor, layout: &PollLayout) {
        let name = desc.display_name().unwrap_or(&desc.device_type);

        writeln!(output, "// Decoder for {}", desc.device_type).unwrap();
        writeln!(output, "mp_obj_t {}({DECODER_ARGS}) {{", decoder_name(desc)).unwrap();
        writeln!(output, "    if (bufLen < {}) {{", layout.size).unwrap();
        writeln!(output, "        return mp_const_none;").unwrap();
        writeln!(output, "    }}").unwrap();
        writeln!(output).unwrap();
        writeln!(
            output,
            "    mp_obj_t result = mp_create_device_dict_with_timestamp(timestampUs);"
        )
        .unwrap();
        writeln!(
            output,
            "    mp_dict_store_str(result, {}, {});",
            self.config.symbol("type"),
            c_string_literal(&desc.device_type)
        )
        .unwrap();
        writeln!(
            output,
            "    mp_dict_store_str(result, {}, {});",
            self.config.symbol("name"),
            c_string_literal(name)
        )
        .unwrap();
        if self.config.include_metadata {
            for (key, text) in Self::metadata(desc) {
                writeln!(
                    output,
                    "    mp_dict_store_str(result, {}, {});",
                    self.config.symbol(key),
                    c_string_literal(text)
                )
                .unwrap();
            }
        }
        writeln!(output).unwrap();

        for field in &layout.fields {
            self.write_field(output, field);
        }

        writeln!(output, "    return result;").unwrap();
        writeln!(output, "}}").unwrap();
        writeln!(output).unwrap();
    }

    fn write_field(&self, output: &mut String, field: &FieldLayout) {
        let ident = c_ident(field.name());
        let symbol = self.config.symbol(field.name());
        // Store helpers are named after the C type they take
        let kind = field.output_kind().as_str();

        writeln!(
            output,
            "    {} {ident}_raw = {HELPER_PREFIX}{}(pBuf, {});",
            field.field_type.c_type(),
            field.field_type.extractor(),
            field.offset
        )
        .unwrap();
        if field.attr.is_scaled() {
            let value = scaled_value(&field.attr, &format!("{ident}_raw"));
            writeln!(output, "    {kind} {ident}_value = {value};").unwrap();
            writeln!(
                output,
                "    mp_dict_store_{kind}(result, {symbol}, {ident}_value);"
            )
            .unwrap();
        } else {
            writeln!(
                output,
                "    mp_dict_store_{kind}(result, {symbol}, ({kind}){ident}_raw);"
            )
            .unwrap();
        }

        if self.config.include_units && has_unit(field) {
            let unit = field.attr.unit.as_deref().unwrap_or_default();
            writeln!(
                output,
                "    mp_dict_store_str(result, {}, {});",
                self.config.symbol(&format!("{}_unit", field.name())),
                c_string_literal(unit)
            )
            .unwrap();
        }
        if self.config.include_ranges {
            if let Some((min, max)) = field.attr.range {
                for (suffix, bound) in [("min", min), ("max", max)] {
                    writeln!(
                        output,
                        "    mp_dict_store_float(result, {}, {});",
                        self.config.symbol(&format!("{}_{suffix}", field.name())),
                        c_float(bound)
                    )
                    .unwrap();
                }
            }
        }
        writeln!(output).unwrap();
    }

    fn write_dispatch(&self, output: &mut String) {
        writeln!(output, "// Device decoder lookup").unwrap();
        writeln!(
            output,
            "mp_obj_t mp_decode_device_data(const char* deviceType, {DECODER_ARGS}) {{"
        )
        .unwrap();
        writeln!(output, "    if (!deviceType || !pBuf) {{").unwrap();
        writeln!(output, "        return mp_const_none;").unwrap();
        writeln!(output, "    }}").unwrap();
        writeln!(output).unwrap();

        for (i, (desc, _)) in self.decoders.iter().enumerate() {
            let keyword = if i == 0 { "if" } else { "else if" };
            writeln!(
                output,
                "    {keyword} (strcmp(deviceType, {}) == 0) {{",
                c_string_literal(&desc.device_type)
            )
            .unwrap();
            writeln!(
                output,
                "        return {}(pBuf, bufLen, timestampUs);",
                decoder_name(desc)
            )
            .unwrap();
            writeln!(output, "    }}").unwrap();
        }

        writeln!(output).unwrap();
        writeln!(output, "    return mp_const_none;").unwrap();
        writeln!(output, "}}").unwrap();
    }
}

const STORE_KINDS: [(&str, &str); 3] = [("float", "float"), ("int", "int"), ("str", "const char*")];

fn decoder_name(desc: &DeviceDescriptor) -> String {
    format!("mp_decode_{}", c_ident(&desc.device_type))
}

fn has_unit(field: &FieldLayout) -> bool {
    field.attr.unit.as_deref().is_some_and(|unit| !unit.is_empty())
}

fn write_dict_utilities(output: &mut String, config: &ScriptBindingConfig) {
    writeln!(
        output,
        "mp_obj_t mp_create_device_dict_with_timestamp(uint64_t timestampUs) {{"
    )
    .unwrap();
    writeln!(output, "    mp_obj_t dict = mp_obj_new_dict(8);").unwrap();
    writeln!(
        output,
        "    mp_obj_dict_store(dict, MP_OBJ_NEW_QSTR({}), mp_obj_new_int_from_ull(timestampUs));",
        config.symbol("timestamp")
    )
    .unwrap();
    writeln!(output, "    return dict;").unwrap();
    writeln!(output, "}}").unwrap();
    writeln!(output).unwrap();

    for (kind, c_type) in STORE_KINDS {
        let value = match kind {
            "float" => "mp_obj_new_float(value)",
            "int" => "mp_obj_new_int(value)",
            _ => "mp_obj_new_str(value, strlen(value))",
        };
        writeln!(
            output,
            "void mp_dict_store_{kind}(mp_obj_t dict, qstr key_qstr, {c_type} value) {{"
        )
        .unwrap();
        writeln!(
            output,
            "    mp_obj_dict_store(dict, MP_OBJ_NEW_QSTR(key_qstr), {value});"
        )
        .unwrap();
        writeln!(output, "}}").unwrap();
        writeln!(output).unwrap();
    }
}
