// Licensed under the Apache-2.0 license

//! Configuration for a generation run.
//!
//! [`GenOptions`] controls what goes into the native artifacts (verbatim
//! device info, decode routines, poll timestamp format) and whether the
//! scripting bindings are produced at all, via [`ScriptBindingConfig`].
//! [`OutputPaths`] says where each artifact is written.

use crate::error::{GeneratorError, GeneratorResult};
use std::path::PathBuf;

/// Options for the native and scripting backends.
///
/// # Example
///
/// ```
/// use devtypes_generator::config::{GenOptions, ScriptBindingConfig};
///
/// let options = GenOptions::with_defaults()
///     .include_dev_info_json(false)
///     .poll_timestamp(2, 1000)
///     .script_bindings(ScriptBindingConfig::with_defaults().include_units(true));
/// assert!(options.validate().is_ok());
/// assert_eq!(options.struct_timestamp_var(), "timeMs");
/// ```
#[derive(Clone, Debug)]
pub struct GenOptions {
    /// Generate poll structs and decode routines.
    pub gen_decode: bool,

    /// Embed each device's `devInfoJson` in its table record.
    pub include_dev_info_json: bool,

    /// Size in bytes of the timestamp that prefixes every poll record.
    pub poll_result_timestamp_bytes: u32,

    /// Resolution of the poll record timestamp in microseconds.
    pub poll_result_resolution_us: u32,

    /// C type of the timestamp member of decoded structs.
    pub decode_struct_timestamp_c_type: String,

    /// Resolution of the decoded struct timestamp in microseconds.
    pub decode_struct_timestamp_resolution_us: u32,

    /// Name of the decoded struct timestamp member. Empty means derived
    /// from the resolution, see [`GenOptions::struct_timestamp_var`].
    pub decode_struct_timestamp_var: String,

    /// Scripting binding generation, if wanted.
    pub script: Option<ScriptBindingConfig>,
}

impl Default for GenOptions {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl GenOptions {
    pub fn with_defaults() -> Self {
        Self {
            gen_decode: true,
            include_dev_info_json: true,
            poll_result_timestamp_bytes: 2,
            poll_result_resolution_us: 1000,
            decode_struct_timestamp_c_type: "uint32_t".to_string(),
            decode_struct_timestamp_resolution_us: 1000,
            decode_struct_timestamp_var: String::new(),
            script: None,
        }
    }

    pub fn gen_decode(mut self, enable: bool) -> Self {
        self.gen_decode = enable;
        self
    }

    pub fn include_dev_info_json(mut self, enable: bool) -> Self {
        self.include_dev_info_json = enable;
        self
    }

    /// Set the poll record timestamp size and resolution.
    pub fn poll_timestamp(mut self, bytes: u32, resolution_us: u32) -> Self {
        self.poll_result_timestamp_bytes = bytes;
        self.poll_result_resolution_us = resolution_us;
        self
    }

    /// Set the decoded struct timestamp type, resolution and member name.
    pub fn struct_timestamp(mut self, c_type: &str, resolution_us: u32, var: &str) -> Self {
        self.decode_struct_timestamp_c_type = c_type.to_string();
        self.decode_struct_timestamp_resolution_us = resolution_us;
        self.decode_struct_timestamp_var = var.to_string();
        self
    }

    pub fn script_bindings(mut self, config: ScriptBindingConfig) -> Self {
        self.script = Some(config);
        self
    }

    /// Name of the timestamp member in decoded structs.
    pub fn struct_timestamp_var(&self) -> &str {
        if !self.decode_struct_timestamp_var.is_empty() {
            return &self.decode_struct_timestamp_var;
        }
        match self.decode_struct_timestamp_resolution_us {
            1 => "timeUs",
            1000 => "timeMs",
            _ => "timestamp",
        }
    }

    /// Check option values before anything is generated.
    pub fn validate(&self) -> GeneratorResult<()> {
        if !(1..=4).contains(&self.poll_result_timestamp_bytes) {
            return Err(GeneratorError::InvalidOption(format!(
                "poll result timestamp size must be 1 to 4 bytes, got {}",
                self.poll_result_timestamp_bytes
            )));
        }
        if self.poll_result_resolution_us == 0 {
            return Err(GeneratorError::InvalidOption(
                "poll result timestamp resolution must be non-zero".to_string(),
            ));
        }
        if self.decode_struct_timestamp_resolution_us == 0 {
            return Err(GeneratorError::InvalidOption(
                "decoded struct timestamp resolution must be non-zero".to_string(),
            ));
        }
        if self.decode_struct_timestamp_c_type.trim().is_empty() {
            return Err(GeneratorError::InvalidOption(
                "decoded struct timestamp type must not be empty".to_string(),
            ));
        }
        if let Some(script) = &self.script {
            if script.module_name.is_empty() {
                return Err(GeneratorError::InvalidOption(
                    "scripting module name must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Options for the scripting binding backend.
#[derive(Clone, Debug)]
pub struct ScriptBindingConfig {
    /// Module name exposed to scripts.
    pub module_name: String,

    /// Prefix that turns a symbol name into its C identifier.
    pub symbol_prefix: String,

    /// Store string-valued device info entries in decoded dicts.
    pub include_metadata: bool,

    /// Store field units in decoded dicts.
    pub include_units: bool,

    /// Store declared field ranges in decoded dicts.
    pub include_ranges: bool,
}

impl Default for ScriptBindingConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ScriptBindingConfig {
    pub fn with_defaults() -> Self {
        Self {
            module_name: "device".to_string(),
            symbol_prefix: "MP_QSTR_".to_string(),
            include_metadata: true,
            include_units: false,
            include_ranges: false,
        }
    }

    pub fn module_name(mut self, name: &str) -> Self {
        self.module_name = name.to_string();
        self
    }

    pub fn symbol_prefix(mut self, prefix: &str) -> Self {
        self.symbol_prefix = prefix.to_string();
        self
    }

    pub fn include_metadata(mut self, enable: bool) -> Self {
        self.include_metadata = enable;
        self
    }

    pub fn include_units(mut self, enable: bool) -> Self {
        self.include_units = enable;
        self
    }

    pub fn include_ranges(mut self, enable: bool) -> Self {
        self.include_ranges = enable;
        self
    }

    /// C identifier for a symbol, e.g. `MP_QSTR_temp`.
    pub fn symbol(&self, name: &str) -> String {
        format!("{}{}", self.symbol_prefix, crate::util::c_ident(name))
    }
}

/// Where each artifact goes.
///
/// The scripting artifacts are only written when both the run has
/// [`GenOptions::script`] set and the corresponding path is present.
#[derive(Clone, Debug, Default)]
pub struct OutputPaths {
    pub dev_type_table: PathBuf,
    pub poll_records: PathBuf,
    pub symbol_table: Option<PathBuf>,
    pub decoder_header: Option<PathBuf>,
    pub decoder_source: Option<PathBuf>,
}

impl OutputPaths {
    pub fn new(dev_type_table: impl Into<PathBuf>, poll_records: impl Into<PathBuf>) -> Self {
        Self {
            dev_type_table: dev_type_table.into(),
            poll_records: poll_records.into(),
            ..Default::default()
        }
    }

    pub fn symbol_table(mut self, path: impl Into<PathBuf>) -> Self {
        self.symbol_table = Some(path.into());
        self
    }

    pub fn decoder_header(mut self, path: impl Into<PathBuf>) -> Self {
        self.decoder_header = Some(path.into());
        self
    }

    pub fn decoder_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.decoder_source = Some(path.into());
        self
    }
}
