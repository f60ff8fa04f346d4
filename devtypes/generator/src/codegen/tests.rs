// Licensed under the Apache-2.0 license

//! Tests for the code generator.

mod test {
    use super::super::{
        generate_devtypes_from_descriptors, render, scaled_value, DevTypesModel,
    };
    use crate::address::{MAX_VALID_ADDR, MIN_VALID_ADDR};
    use crate::catalog::parse_catalog_str;
    use crate::config::{GenOptions, OutputPaths, ScriptBindingConfig};
    use crate::error::GeneratorError;
    use crate::priority::{HIGH, LOW, MEDIUM};

    const SENSORS: &str = r#"{"devTypes": {
        "VCNL4040": {
            "deviceType": "VCNL4040",
            "addresses": "0x60",
            "scanPriority": "high",
            "devInfoJson": {"name": "VCNL4040", "resp": {"b": 6, "a": [
                {"n": "prox", "t": "<H"},
                {"n": "als", "t": "<H", "d": 10, "o": "float"},
                {"n": "white", "t": "<H"}
            ]}}
        },
        "ADXL313": {
            "deviceType": "ADXL313",
            "addresses": "0x1d,0x53",
            "scanPriority": 1,
            "devInfoJson": {"resp": {"b": 6, "a": [
                {"n": "x", "t": "<h"},
                {"n": "y", "t": "<h"},
                {"n": "z", "t": "<h"}
            ]}}
        },
        "LPS25": {
            "deviceType": "LPS25",
            "addresses": "0x5c-0x5d",
            "scanPriority": "medium",
            "devInfoJson": {"resp": {"b": 5, "a": [
                {"n": "pressure", "t": "<I", "d": 4096, "o": "float"},
                {"n": "flags", "t": "B"}
            ]}}
        },
        "QMC5883": {
            "deviceType": "QMC5883",
            "addresses": "0x0d,0x1d"
        }
    }}"#;

    fn build(json: &str) -> DevTypesModel {
        DevTypesModel::build(parse_catalog_str(json).unwrap()).unwrap()
    }

    #[test]
    fn test_model_is_consistent() {
        let model = build(SENSORS);
        assert_eq!(model.descriptors.len(), model.layouts.len());
        let sizes: Vec<_> = model.records().map(|(d, l)| (d.key.as_str(), l.size)).collect();
        assert_eq!(
            sizes,
            [("VCNL4040", 6), ("ADXL313", 6), ("LPS25", 5), ("QMC5883", 0)]
        );
        // ADXL313 and QMC5883 share 0x1d, in catalog order
        assert_eq!(model.index.get(0x1d), Some(&[1, 3][..]));
        assert_eq!(model.index.max_count(), 2);
    }

    #[test]
    fn test_priorities_partition_window() {
        let model = build(SENSORS);
        let lists = &model.priorities;
        // ADXL313 is priority 1: primary 0x1d eager, 0x53 demoted
        assert_eq!(lists.list(HIGH), &[0x1d, 0x60]);
        assert_eq!(lists.list(MEDIUM), &[0x53, 0x5c, 0x5d]);
        for addr in MIN_VALID_ADDR..=MAX_VALID_ADDR {
            let hits = lists.lists().iter().filter(|l| l.contains(&addr)).count();
            assert_eq!(hits, 1, "address {addr:#04x}");
        }
        assert!(lists.list(LOW).contains(&0x0d));
    }

    #[test]
    fn test_size_mismatch_aborts_build() {
        let json = r#"{"devTypes": {
            "Good": {"devInfoJson": {"resp": {"b": 2, "a": [{"n": "v", "t": "<H"}]}}},
            "Bad": {"devInfoJson": {"resp": {"b": 5, "a": [{"n": "v", "t": "<I"}]}}}
        }}"#;
        let err = DevTypesModel::build(parse_catalog_str(json).unwrap()).unwrap_err();
        assert!(matches!(
            err,
            GeneratorError::LayoutSizeMismatch { ref key, declared: 5, computed: 4 } if key == "Bad"
        ));
    }

    #[test]
    fn test_colliding_native_identifiers_rejected() {
        let json = r#"{"devTypes": {
            "a-b": {"addresses": "0x20"},
            "ok": {},
            "a.b": {"addresses": "0x21"}
        }}"#;
        let err = DevTypesModel::build(parse_catalog_str(json).unwrap()).unwrap_err();
        match err {
            GeneratorError::IdentifierCollision {
                ident,
                first,
                second,
            } => {
                assert_eq!(ident, "a_b");
                assert_eq!(first, "a-b");
                assert_eq!(second, "a.b");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_scaled_value() {
        let model = build(SENSORS);
        let lps = &model.layouts[2].fields;
        assert_eq!(scaled_value(&lps[0].attr, "raw"), "(raw / 4096.0f)");
        assert_eq!(scaled_value(&lps[1].attr, "raw"), "raw");
        let vcnl = &model.layouts[0].fields;
        assert_eq!(scaled_value(&vcnl[0].attr, "raw"), "raw");
    }

    #[test]
    fn test_render_native_only() {
        let model = build(SENSORS);
        let paths = OutputPaths::new("out/DevTypes.h", "out/Polls.h")
            .symbol_table("out/qstr.h");
        let files = render(&model, &GenOptions::with_defaults(), &paths).unwrap();
        // Script paths without script options produce nothing
        assert_eq!(files.len(), 2);
        let table = files.get("out/DevTypes.h").unwrap();
        assert!(table.contains("#include \"Polls.h\"\n"));
        assert!(files.get("out/Polls.h").unwrap().contains("struct poll_LPS25"));
    }

    #[test]
    fn test_render_script_bindings() {
        let model = build(SENSORS);
        let options =
            GenOptions::with_defaults().script_bindings(ScriptBindingConfig::with_defaults());
        let paths = OutputPaths::new("DevTypes.h", "Polls.h")
            .symbol_table("qstr.h")
            .decoder_header("mp/decoders.h")
            .decoder_source("mp/decoders.c");
        let files = render(&model, &options, &paths).unwrap();
        assert_eq!(files.len(), 5);
        let source = files.get("mp/decoders.c").unwrap();
        assert!(source.starts_with("#include \"decoders.h\"\n#include \"Polls.h\"\n"));
        assert!(files.get("qstr.h").unwrap().contains("\nQ(pressure)\n"));
        // QMC5883 has no response fields but still gets a decoder
        assert!(files
            .get("mp/decoders.h")
            .unwrap()
            .contains("mp_obj_t mp_decode_QMC5883("));
    }

    #[test]
    fn test_render_is_deterministic() {
        let options =
            GenOptions::with_defaults().script_bindings(ScriptBindingConfig::with_defaults());
        let paths = OutputPaths::new("a.h", "b.h")
            .symbol_table("c.h")
            .decoder_header("d.h")
            .decoder_source("e.c");
        let first = generate_devtypes_from_descriptors(
            parse_catalog_str(SENSORS).unwrap(),
            &options,
            &paths,
        )
        .unwrap();
        let second = generate_devtypes_from_descriptors(
            parse_catalog_str(SENSORS).unwrap(),
            &options,
            &paths,
        )
        .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_options_rejected() {
        let model = build(SENSORS);
        let options = GenOptions::with_defaults().poll_timestamp(8, 1000);
        assert!(matches!(
            render(&model, &options, &OutputPaths::new("a.h", "b.h")),
            Err(GeneratorError::InvalidOption(_))
        ));
    }
}
