// Licensed under the Apache-2.0 license

//! Native backend: the device type table and poll record structs.
//!
//! ```text
//! poll records header            device type table
//! ├── timestamp constants        ├── helpers + decodePollResp_<key>  (decode on)
//! └── struct poll_<key>          ├── baseDevTypeRecords[]
//!     (decode on)                ├── baseDevTypeCountByAddr[]
//!                                ├── baseDevTypeIndexByAddr_0xNN[]
//!                                ├── baseDevTypeIndexByAddr[]
//!                                └── scanPriority0..2[] + list table
//! ```

use std::fmt::Write;

use super::{compose_bytes, scaled_value, write_extraction_helpers, DevTypesModel};
use crate::address::{MAX_VALID_ADDR, MIN_INDEX_ADDR};
use crate::catalog::DeviceDescriptor;
use crate::config::GenOptions;
use crate::layout::PollLayout;
use crate::priority::NUM_PRIORITY_LEVELS;
use crate::util::{c_ident, hex_addr, raw_string_literal};

const HELPER_PREFIX: &str = "devtypes_get_";
const TIMESTAMP_FN: &str = "devtypes_poll_timestamp_us";

fn struct_name(desc: &DeviceDescriptor) -> String {
    format!("poll_{}", c_ident(&desc.key))
}

fn decode_fn_name(desc: &DeviceDescriptor) -> String {
    format!("decodePollResp_{}", c_ident(&desc.key))
}

/// Render the poll records header.
pub(super) fn poll_records_header(model: &DevTypesModel, options: &GenOptions) -> String {
    let mut output = String::new();
    writeln!(output, "#pragma once").unwrap();
    writeln!(output, "#include <stdint.h>").unwrap();
    writeln!(output).unwrap();
    writeln!(output, "// Generated from device type catalogs, do not edit").unwrap();
    writeln!(output).unwrap();

    let wrap_us = (1u64 << (8 * options.poll_result_timestamp_bytes))
        * options.poll_result_resolution_us as u64;
    writeln!(
        output,
        "static const uint32_t POLL_RESULT_TIMESTAMP_SIZE = {};",
        options.poll_result_timestamp_bytes
    )
    .unwrap();
    writeln!(
        output,
        "static const uint32_t POLL_RESULT_RESOLUTION_US = {};",
        options.poll_result_resolution_us
    )
    .unwrap();
    writeln!(
        output,
        "static const uint64_t POLL_RESULT_WRAP_US = {wrap_us}ULL;"
    )
    .unwrap();
    writeln!(
        output,
        "static const uint32_t DECODE_STRUCT_TIMESTAMP_RESOLUTION_US = {};",
        options.decode_struct_timestamp_resolution_us
    )
    .unwrap();

    if options.gen_decode {
        let ts_type = &options.decode_struct_timestamp_c_type;
        let ts_var = options.struct_timestamp_var();
        for (desc, layout) in model.records() {
            writeln!(output).unwrap();
            writeln!(output, "struct {}", struct_name(desc)).unwrap();
            writeln!(output, "{{").unwrap();
            writeln!(output, "    {ts_type} {ts_var};").unwrap();
            for field in &layout.fields {
                writeln!(
                    output,
                    "    {} {};",
                    field.value_c_type(),
                    c_ident(field.name())
                )
                .unwrap();
            }
            writeln!(output, "}};").unwrap();
        }
    }

    output
}

/// Render the device type table, including decode routines when enabled.
pub(super) fn dev_type_table(
    model: &DevTypesModel,
    options: &GenOptions,
    poll_records_name: &str,
) -> String {
    let mut output = String::new();
    writeln!(output, "#pragma once").unwrap();
    writeln!(output, "#include <stdint.h>").unwrap();
    writeln!(output, "#include \"{poll_records_name}\"").unwrap();
    writeln!(output, "#include \"RaftUtils.h\"").unwrap();
    if options.gen_decode {
        writeln!(output, "#include \"RaftBus.h\"").unwrap();
    }
    writeln!(output, "using namespace Raft;").unwrap();
    writeln!(output).unwrap();

    if options.gen_decode {
        write_decoders(&mut output, model, options);
    }
    write_records(&mut output, model, options);
    write_address_index(&mut output, model);
    write_scan_lists(&mut output, model);

    output
}

fn write_records(output: &mut String, model: &DevTypesModel, options: &GenOptions) {
    writeln!(output, "static DeviceTypeRecord baseDevTypeRecords[] =").unwrap();
    writeln!(output, "{{").unwrap();
    for (desc, layout) in model.records() {
        let poll_info = desc.poll_info.to_string();
        writeln!(output, "    {{").unwrap();
        for text in [
            desc.device_type.as_str(),
            desc.address_spec.as_str(),
            desc.detection_values.as_str(),
            desc.init_values.as_str(),
            poll_info.as_str(),
        ] {
            writeln!(output, "        {},", raw_string_literal(text)).unwrap();
        }
        writeln!(output, "        {},", layout.size).unwrap();
        if options.include_dev_info_json {
            let dev_info = desc.dev_info_json.to_string();
            write!(output, "        {}", raw_string_literal(&dev_info)).unwrap();
        } else {
            write!(output, "        nullptr").unwrap();
        }
        if options.gen_decode {
            write!(output, ",\n        {}", decode_fn_name(desc)).unwrap();
        }
        writeln!(output).unwrap();
        writeln!(output, "    }},").unwrap();
    }
    writeln!(output, "}};").unwrap();
    writeln!(output).unwrap();
}

fn write_address_index(output: &mut String, model: &DevTypesModel) {
    writeln!(
        output,
        "static const uint32_t BASE_DEV_INDEX_BY_ARRAY_MIN_ADDR = {MIN_INDEX_ADDR};"
    )
    .unwrap();
    writeln!(
        output,
        "static const uint32_t BASE_DEV_INDEX_BY_ARRAY_MAX_ADDR = {};",
        hex_addr(MAX_VALID_ADDR)
    )
    .unwrap();
    writeln!(output).unwrap();

    writeln!(output, "static const uint8_t baseDevTypeCountByAddr[] =").unwrap();
    write!(output, "{{\n    ").unwrap();
    for (_, entries) in model.index.iter() {
        write!(output, "{},", entries.map_or(0, <[u16]>::len)).unwrap();
    }
    writeln!(output, "\n}};").unwrap();
    writeln!(output).unwrap();

    for (addr, entries) in model.index.iter() {
        if let Some(entries) = entries {
            let list = entries
                .iter()
                .map(u16::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(
                output,
                "static uint16_t baseDevTypeIndexByAddr_{}[] = {{{list}}};",
                hex_addr(addr)
            )
            .unwrap();
        }
    }

    writeln!(output).unwrap();
    writeln!(output, "static uint16_t* baseDevTypeIndexByAddr[] =").unwrap();
    writeln!(output, "{{").unwrap();
    for (addr, entries) in model.index.iter() {
        match entries {
            Some(_) => writeln!(output, "    baseDevTypeIndexByAddr_{},", hex_addr(addr)).unwrap(),
            None => writeln!(output, "    nullptr,").unwrap(),
        }
    }
    writeln!(output, "}};").unwrap();
}

fn write_scan_lists(output: &mut String, model: &DevTypesModel) {
    for (level, list) in model.priorities.lists().iter().enumerate() {
        writeln!(output).unwrap();
        writeln!(output).unwrap();
        writeln!(output, "static const uint8_t scanPriority{level}[] =").unwrap();
        write!(output, "{{\n    ").unwrap();
        for addr in list {
            write!(output, "{},", hex_addr(*addr)).unwrap();
        }
        writeln!(output, "\n}};").unwrap();
    }

    writeln!(output).unwrap();
    writeln!(output, "static const uint8_t* scanPriorityLists[] =").unwrap();
    writeln!(output, "{{").unwrap();
    for level in 0..NUM_PRIORITY_LEVELS {
        writeln!(output, "    scanPriority{level},").unwrap();
    }
    writeln!(output, "}};").unwrap();

    writeln!(output).unwrap();
    writeln!(output, "static const uint8_t scanPriorityListLengths[] =").unwrap();
    writeln!(output, "{{").unwrap();
    for list in model.priorities.lists() {
        writeln!(output, "    {},", list.len()).unwrap();
    }
    writeln!(output, "}};").unwrap();

    writeln!(output).unwrap();
    writeln!(
        output,
        "static const uint8_t numScanPriorityLists = {NUM_PRIORITY_LEVELS};"
    )
    .unwrap();
}

fn write_decoders(output: &mut String, model: &DevTypesModel, options: &GenOptions) {
    write_extraction_helpers(output, HELPER_PREFIX);

    // Poll timestamps are a big-endian counter that wraps; the decode state
    // carries the accumulated wrap offset between calls.
    let raw = compose_bytes(options.poll_result_timestamp_bytes as u64, "", false);
    writeln!(
        output,
        "static inline uint64_t {TIMESTAMP_FN}(const uint8_t* pBuf, RaftBusDeviceDecodeState& decodeState)"
    )
    .unwrap();
    writeln!(output, "{{").unwrap();
    writeln!(
        output,
        "    uint64_t timestampUs = (uint64_t)({raw}) * POLL_RESULT_RESOLUTION_US;"
    )
    .unwrap();
    writeln!(output, "    if (timestampUs < decodeState.lastReportTimestampUs)").unwrap();
    writeln!(
        output,
        "        decodeState.reportTimestampOffsetUs += POLL_RESULT_WRAP_US;"
    )
    .unwrap();
    writeln!(output, "    decodeState.lastReportTimestampUs = timestampUs;").unwrap();
    writeln!(
        output,
        "    return timestampUs + decodeState.reportTimestampOffsetUs;"
    )
    .unwrap();
    writeln!(output, "}}").unwrap();
    writeln!(output).unwrap();

    for (desc, layout) in model.records() {
        write_decode_fn(output, desc, layout, options);
    }
}

fn write_decode_fn(
    output: &mut String,
    desc: &DeviceDescriptor,
    layout: &PollLayout,
    options: &GenOptions,
) {
    let st = format!("struct {}", struct_name(desc));
    let ts_type = &options.decode_struct_timestamp_c_type;
    let ts_var = options.struct_timestamp_var();

    writeln!(
        output,
        "static uint32_t {}(const uint8_t* pPollBuf, uint32_t pollBufLen, void* pStructOut, uint32_t structOutSize,",
        decode_fn_name(desc)
    )
    .unwrap();
    writeln!(
        output,
        "            uint16_t maxRecCount, RaftBusDeviceDecodeState& decodeState)"
    )
    .unwrap();
    writeln!(output, "{{").unwrap();
    writeln!(output, "    {st}* pOut = ({st}*)pStructOut;").unwrap();
    writeln!(
        output,
        "    const uint32_t recLen = POLL_RESULT_TIMESTAMP_SIZE + {};",
        layout.size
    )
    .unwrap();
    writeln!(output, "    uint32_t numRecs = 0;").unwrap();
    writeln!(
        output,
        "    while ((numRecs < maxRecCount) && (pollBufLen >= recLen) && (structOutSize >= sizeof({st})))"
    )
    .unwrap();
    writeln!(output, "    {{").unwrap();
    writeln!(
        output,
        "        pOut->{ts_var} = ({ts_type})({TIMESTAMP_FN}(pPollBuf, decodeState) / DECODE_STRUCT_TIMESTAMP_RESOLUTION_US);"
    )
    .unwrap();
    if !layout.fields.is_empty() {
        writeln!(
            output,
            "        const uint8_t* pBuf = pPollBuf + POLL_RESULT_TIMESTAMP_SIZE;"
        )
        .unwrap();
    }
    for field in &layout.fields {
        let raw = format!(
            "{HELPER_PREFIX}{}(pBuf, {})",
            field.field_type.extractor(),
            field.offset
        );
        let value = scaled_value(&field.attr, &raw);
        let member = c_ident(field.name());
        if field.attr.is_scaled() {
            writeln!(
                output,
                "        pOut->{member} = ({})({value});",
                field.value_c_type()
            )
            .unwrap();
        } else {
            writeln!(output, "        pOut->{member} = {value};").unwrap();
        }
    }
    writeln!(output, "        pPollBuf += recLen;").unwrap();
    writeln!(output, "        pollBufLen -= recLen;").unwrap();
    writeln!(output, "        structOutSize -= sizeof({st});").unwrap();
    writeln!(output, "        pOut++;").unwrap();
    writeln!(output, "        numRecs++;").unwrap();
    writeln!(output, "    }}").unwrap();
    writeln!(output, "    return numRecs;").unwrap();
    writeln!(output, "}}").unwrap();
    writeln!(output).unwrap();
}
