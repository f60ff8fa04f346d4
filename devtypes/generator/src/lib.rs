// Licensed under the Apache-2.0 license

//! Device type catalog to C/C++ source generator.
//!
//! This crate turns JSON catalogs of bus device types into the tables and
//! decoders an embedded runtime uses to discover and poll those devices,
//! plus optional MicroPython bindings for the decoded data.
//!
//! ## Usage
//!
//! ```no_run
//! use devtypes_generator::{generate_devtypes_from_files, GenOptions, OutputPaths};
//!
//! let paths = OutputPaths::new("DeviceTypeRecords_generated.h", "DevicePollRecords_generated.h");
//! let files = generate_devtypes_from_files(
//!     "[devtypes/base.json,devtypes/extra.json]",
//!     &GenOptions::with_defaults(),
//!     &paths,
//! )
//! .unwrap();
//! files.write().unwrap();
//! ```
//!
//! ## Module Organization
//!
//! - [`address`]: Address specification parsing
//! - [`catalog`]: Catalog loading, merging and typed descriptors
//! - [`priority`]: Scan priority buckets
//! - [`index`]: Address to device type index
//! - [`layout`]: Poll response field layout and size validation
//! - [`config`]: Generation options ([`GenOptions`], [`ScriptBindingConfig`])
//! - [`output`]: Rendered artifacts and writing them out
//! - [`util`]: Identifier and literal formatting

pub mod address;
pub mod catalog;
pub mod config;
pub mod error;
pub mod index;
pub mod layout;
pub mod output;
pub mod priority;
pub mod util;

mod codegen;

// Re-export main public API
pub use codegen::{
    generate_devtypes_from_descriptors, generate_devtypes_from_files, render, DevTypesModel,
};
pub use config::{GenOptions, OutputPaths, ScriptBindingConfig};
pub use error::{CatalogReadCause, GeneratorError, GeneratorResult};
pub use output::{GeneratedFile, GeneratedFiles, Staleness, WriteSummary};
