// Licensed under the Apache-2.0 license

//! Generate the device type sources consumed by the firmware build.
//!
//! `devtypes-gen` writes the device type table and poll records headers, and
//! with `--gen-micropython` the scripting bindings. `devtypes-check` renders
//! the same files and fails if any of them differs from what is on disk.

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args};
use devtypes_generator::{
    generate_devtypes_from_files, GenOptions, GeneratedFiles, OutputPaths, ScriptBindingConfig,
    Staleness,
};
use log::info;
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct DevtypesArgs {
    /// Device type catalogs, comma separated and optionally wrapped in [ ]
    pub json_paths: String,

    /// Device type table header to generate
    pub dev_type_header: PathBuf,

    /// Poll records header to generate
    pub dev_poll_header: PathBuf,

    /// Do not generate poll record structs and decode functions
    #[arg(long)]
    pub no_gen_decode: bool,

    /// Do not embed device info JSON in the device type table
    #[arg(long)]
    pub no_inc_dev_json: bool,

    /// Poll response timestamp size in bytes
    #[arg(long = "pollresptsbytes", env = "DEVTYPES_POLL_TS_BYTES", default_value_t = 2)]
    pub poll_ts_bytes: u32,

    /// Poll response timestamp resolution in microseconds
    #[arg(long = "pollresptsresus", env = "DEVTYPES_POLL_TS_RES_US", default_value_t = 1000)]
    pub poll_ts_res_us: u32,

    /// C type of the timestamp in decoded structs
    #[arg(long = "decodestructtsctype", default_value = "uint32_t")]
    pub struct_ts_c_type: String,

    /// Resolution of the timestamp in decoded structs, in microseconds
    #[arg(long = "decodestructtsresus", default_value_t = 1000)]
    pub struct_ts_res_us: u32,

    /// Name of the timestamp member in decoded structs
    #[arg(long = "decodestructtsvar", default_value = "")]
    pub struct_ts_var: String,

    /// Generate MicroPython bindings
    #[arg(long)]
    pub gen_micropython: bool,

    /// QSTR definitions file to generate
    #[arg(long)]
    pub mp_qstr_header: Option<PathBuf>,

    /// MicroPython decoder declarations header to generate
    #[arg(long)]
    pub mp_decoder_header: Option<PathBuf>,

    /// MicroPython decoder source to generate
    #[arg(long)]
    pub mp_decoder_source: Option<PathBuf>,

    /// MicroPython module name
    #[arg(long, default_value = "device")]
    pub mp_module_name: String,

    /// Store string device info entries in decoded dicts
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub mp_include_metadata: bool,

    /// Store field units in decoded dicts
    #[arg(long)]
    pub mp_include_units: bool,

    /// Store field ranges in decoded dicts
    #[arg(long)]
    pub mp_include_ranges: bool,
}

impl DevtypesArgs {
    pub fn options(&self) -> GenOptions {
        let mut options = GenOptions::with_defaults()
            .gen_decode(!self.no_gen_decode)
            .include_dev_info_json(!self.no_inc_dev_json)
            .poll_timestamp(self.poll_ts_bytes, self.poll_ts_res_us)
            .struct_timestamp(&self.struct_ts_c_type, self.struct_ts_res_us, &self.struct_ts_var);
        if self.gen_micropython {
            options = options.script_bindings(
                ScriptBindingConfig::with_defaults()
                    .module_name(&self.mp_module_name)
                    .include_metadata(self.mp_include_metadata)
                    .include_units(self.mp_include_units)
                    .include_ranges(self.mp_include_ranges),
            );
        }
        options
    }

    pub fn output_paths(&self) -> OutputPaths {
        OutputPaths {
            dev_type_table: self.dev_type_header.clone(),
            poll_records: self.dev_poll_header.clone(),
            symbol_table: self.mp_qstr_header.clone(),
            decoder_header: self.mp_decoder_header.clone(),
            decoder_source: self.mp_decoder_source.clone(),
        }
    }

    fn render(&self) -> Result<GeneratedFiles> {
        generate_devtypes_from_files(&self.json_paths, &self.options(), &self.output_paths())
            .with_context(|| format!("Failed to generate device types from {}", self.json_paths))
    }
}

/// Render and write every artifact.
pub fn generate(args: &DevtypesArgs) -> Result<()> {
    let files = args.render()?;
    let summary = files.write()?;
    info!(
        "Device types: {} files written, {} unchanged",
        summary.written.len(),
        summary.unchanged.len()
    );
    Ok(())
}

/// Render every artifact and compare with the disk.
pub fn check(args: &DevtypesArgs) -> Result<()> {
    let files = args.render()?;
    let stale = files.check();
    if stale.is_empty() {
        info!("Device type sources are up to date");
        return Ok(());
    }
    for (path, staleness) in &stale {
        let reason = match staleness {
            Staleness::Missing => "missing",
            Staleness::Outdated => "out of date",
        };
        eprintln!("  {} is {reason}", path.display());
    }
    bail!(
        "{} generated device type files need regenerating; run `cargo run -p xtask -- devtypes-gen`",
        stale.len()
    );
}
