// Licensed under the Apache-2.0 license

//! End-to-end generation from catalog files to written artifacts.

use devtypes_generator::{
    generate_devtypes_from_files, CatalogReadCause, GenOptions, GeneratorError, OutputPaths,
    ScriptBindingConfig, Staleness,
};
use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const BASE: &str = r#"{
    "devTypes": {
        "VCNL4040": {
            "deviceType": "VCNL4040",
            "addresses": "0x60",
            "detectionValues": "0x0c=0x8601",
            "initValues": "0x041007=&0x030e08=",
            "pollInfo": {"c": "0x08=r2&0x09=r2&0x0a=r2", "i": 100, "s": 10},
            "scanPriority": "high",
            "devInfoJson": {"name": "VCNL4040", "desc": "Prox&ALS", "manu": "Vishay",
                "resp": {"b": 6, "a": [
                    {"n": "prox", "t": "<H", "u": ""},
                    {"n": "als", "t": "<H", "d": 10, "o": "float", "u": "lux"},
                    {"n": "white", "t": "<H", "d": 10, "o": "float", "u": "lux"}
                ]}}
        },
        "MCP9808": {
            "deviceType": "MCP9808",
            "addresses": "0x18-0x1f",
            "devInfoJson": {"name": "MCP9808", "resp": {"b": 2, "a": [
                {"n": "temp", "t": ">h", "d": 16, "o": "float", "u": "degC", "r": [-40, 125]}
            ]}}
        },
        "SharedAddr": {
            "deviceType": "SharedAddr",
            "addresses": "0x1a",
            "scanPriority": 2
        }
    }
}"#;

const OVERRIDE: &str = r#"{
    "devTypes": {
        "Extra": {"deviceType": "Extra", "addresses": "0x70"},
        "MCP9808": {
            "deviceType": "MCP9808v2",
            "addresses": "0x18",
            "devInfoJson": {"name": "MCP9808", "resp": {"b": 2, "a": [
                {"n": "temp", "t": ">h", "d": 16, "o": "float"}
            ]}}
        }
    }
}"#;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let _ = SimpleLogger::new().with_level(LevelFilter::Debug).init();
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn catalog(&self, name: &str, contents: &str) -> String {
        let path = self.path(name);
        std::fs::write(&path, contents).unwrap();
        path.display().to_string()
    }

    fn outputs(&self) -> OutputPaths {
        OutputPaths::new(
            self.path("out/DeviceTypeRecords_generated.h"),
            self.path("out/DevicePollRecords_generated.h"),
        )
        .symbol_table(self.path("out/mp/qstrdefs_devices.h"))
        .decoder_header(self.path("out/mp/DeviceMPDecoders_generated.h"))
        .decoder_source(self.path("out/mp/DeviceMPDecoders_generated.c"))
    }

    fn read(&self, name: &str) -> String {
        std::fs::read_to_string(self.path(name)).unwrap()
    }
}

fn script_options() -> GenOptions {
    GenOptions::with_defaults().script_bindings(
        ScriptBindingConfig::with_defaults()
            .include_units(true)
            .include_ranges(true),
    )
}

fn exists(path: &Path) -> bool {
    path.try_exists().unwrap()
}

#[test]
fn test_generate_and_write_all_artifacts() {
    let ws = Workspace::new();
    let base = ws.catalog("base.json", BASE);
    let files = generate_devtypes_from_files(&base, &script_options(), &ws.outputs()).unwrap();
    let summary = files.write().unwrap();
    assert_eq!(summary.written.len(), 5);

    let table = ws.read("out/DeviceTypeRecords_generated.h");
    assert!(table.contains("#include \"DevicePollRecords_generated.h\"\n"));
    assert!(table.contains("        R\"(0x18-0x1f)\",\n"));
    // 0x1a is claimed by MCP9808 and SharedAddr, in catalog order
    assert!(table.contains("static uint16_t baseDevTypeIndexByAddr_0x1a[] = {1, 2};"));

    let qstrs = ws.read("out/mp/qstrdefs_devices.h");
    for symbol in ["Q(temp_min)", "Q(temp_max)", "Q(als_unit)", "Q(desc)", "Q(device)"] {
        assert!(qstrs.contains(symbol), "missing {symbol}");
    }

    let source = ws.read("out/mp/DeviceMPDecoders_generated.c");
    assert!(source.starts_with("#include \"DeviceMPDecoders_generated.h\"\n"));
    assert!(source.contains("    float temp_value = (temp_raw / 16.0f);"));
    assert!(source.contains("    mp_dict_store_float(result, MP_QSTR_temp_min, -40.0f);"));
}

#[test]
fn test_merge_later_catalog_wins_in_place() {
    let ws = Workspace::new();
    let base = ws.catalog("base.json", BASE);
    let extra = ws.catalog("extra.json", OVERRIDE);
    let paths = ws.outputs();
    let files = generate_devtypes_from_files(
        &format!("[{base}, {extra}]"),
        &GenOptions::with_defaults(),
        &paths,
    )
    .unwrap();

    let table = files.get(&paths.dev_type_table).unwrap();
    let order: Vec<_> = ["R\"(VCNL4040)\"", "R\"(MCP9808v2)\"", "R\"(SharedAddr)\"", "R\"(Extra)\""]
        .iter()
        .map(|name| table.find(name).unwrap())
        .collect();
    assert!(order.windows(2).all(|w| w[0] < w[1]));
    assert!(!table.contains("R\"(0x18-0x1f)\""));
    // The replaced MCP9808 body only claims 0x18
    assert!(table.contains("static uint16_t baseDevTypeIndexByAddr_0x1a[] = {2};"));
    assert!(table.contains("static uint16_t baseDevTypeIndexByAddr_0x70[] = {3};"));
}

#[test]
fn test_regeneration_is_byte_identical() {
    let ws = Workspace::new();
    let base = ws.catalog("base.json", BASE);
    let paths = ws.outputs();

    generate_devtypes_from_files(&base, &script_options(), &paths)
        .unwrap()
        .write()
        .unwrap();
    let first: Vec<_> = ["out/DeviceTypeRecords_generated.h", "out/mp/DeviceMPDecoders_generated.c"]
        .iter()
        .map(|name| ws.read(name))
        .collect();

    let files = generate_devtypes_from_files(&base, &script_options(), &paths).unwrap();
    assert!(files.check().is_empty());
    let summary = files.write().unwrap();
    assert!(summary.written.is_empty());
    assert_eq!(summary.unchanged.len(), 5);

    let second: Vec<_> = ["out/DeviceTypeRecords_generated.h", "out/mp/DeviceMPDecoders_generated.c"]
        .iter()
        .map(|name| ws.read(name))
        .collect();
    assert_eq!(first, second);
}

#[test]
fn test_malformed_address_writes_nothing() {
    let ws = Workspace::new();
    let base = ws.catalog("base.json", BASE);
    let bad = ws.catalog(
        "bad.json",
        r#"{"devTypes": {"Broken": {"addresses": "0x10,0xZZ"}}}"#,
    );
    let paths = ws.outputs();
    let err = generate_devtypes_from_files(&format!("{base},{bad}"), &script_options(), &paths)
        .unwrap_err();
    match err {
        GeneratorError::MalformedAddressSpec { token, .. } => assert_eq!(token, "0xZZ"),
        other => panic!("unexpected error {other:?}"),
    }
    assert!(!exists(&paths.dev_type_table));
    assert!(!exists(&paths.poll_records));
}

#[test]
fn test_size_mismatch_writes_nothing() {
    let ws = Workspace::new();
    let bad = ws.catalog(
        "bad.json",
        r#"{"devTypes": {"Short": {"addresses": "0x40",
            "devInfoJson": {"resp": {"b": 5, "a": [{"n": "v", "t": "<I"}]}}}}}"#,
    );
    let paths = ws.outputs();
    let err = generate_devtypes_from_files(&bad, &GenOptions::with_defaults(), &paths).unwrap_err();
    assert!(matches!(
        err,
        GeneratorError::LayoutSizeMismatch {
            declared: 5,
            computed: 4,
            ..
        }
    ));
    assert!(!exists(&paths.dev_type_table));
    assert!(!exists(&paths.poll_records));
}

#[test]
fn test_identifier_collision_writes_nothing() {
    let ws = Workspace::new();
    let base = ws.catalog("base.json", BASE);
    let clash = ws.catalog(
        "clash.json",
        r#"{"devTypes": {"MCP-9808": {"deviceType": "MCP9808b", "addresses": "0x19"},
            "MCP.9808": {"deviceType": "MCP9808c", "addresses": "0x1b"}}}"#,
    );
    let paths = ws.outputs();
    let err = generate_devtypes_from_files(&format!("{base},{clash}"), &script_options(), &paths)
        .unwrap_err();
    assert!(matches!(err, GeneratorError::IdentifierCollision { ref ident, .. } if ident == "MCP_9808"));
    assert!(!exists(&paths.dev_type_table));
    assert!(!exists(&paths.poll_records));
}

#[test]
fn test_unsupported_field_is_skipped() {
    let ws = Workspace::new();
    let catalog = ws.catalog(
        "odd.json",
        r#"{"devTypes": {"Odd": {"deviceType": "Odd", "addresses": "0x40",
            "devInfoJson": {"resp": {"b": 2, "a": [
                {"n": "big", "t": "<q"},
                {"n": "v", "t": "<H"}
            ]}}}}}"#,
    );
    let paths = ws.outputs();
    let files = generate_devtypes_from_files(&catalog, &script_options(), &paths).unwrap();
    let polls = files.get(&paths.poll_records).unwrap();
    assert!(polls.contains("struct poll_Odd\n{\n    uint32_t timeMs;\n    uint16_t v;\n};"));
    let source = files.get(paths.decoder_source.as_ref().unwrap()).unwrap();
    assert!(source.contains("    uint16_t v_raw = mp_get_le_uint16(pBuf, 0);"));
    assert!(!source.contains("big_raw"));
}

#[test]
fn test_missing_catalog() {
    let ws = Workspace::new();
    let missing = ws.path("missing.json").display().to_string();
    let err = generate_devtypes_from_files(&missing, &GenOptions::with_defaults(), &ws.outputs())
        .unwrap_err();
    assert!(matches!(
        err,
        GeneratorError::CatalogRead {
            source: CatalogReadCause::Io(_),
            ..
        }
    ));
}

#[test]
fn test_check_reports_stale_artifacts() {
    let ws = Workspace::new();
    let base = ws.catalog("base.json", BASE);
    let paths = ws.outputs();
    let files = generate_devtypes_from_files(&base, &GenOptions::with_defaults(), &paths).unwrap();
    assert_eq!(files.check().len(), 2);
    files.write().unwrap();

    let extra = ws.catalog("extra.json", OVERRIDE);
    let files = generate_devtypes_from_files(
        &format!("{base},{extra}"),
        &GenOptions::with_defaults(),
        &paths,
    )
    .unwrap();
    let stale = files.check();
    assert_eq!(
        stale,
        vec![
            (paths.poll_records.clone(), Staleness::Outdated),
            (paths.dev_type_table.clone(), Staleness::Outdated),
        ]
    );
}
