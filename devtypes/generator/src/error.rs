// Licensed under the Apache-2.0 license

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a generation run.
///
/// Any of these means no artifact was written. Unsupported field types are
/// not errors; they surface as [`crate::layout::LayoutDiagnostic`]s.
#[derive(Error, Debug)]
pub enum GeneratorError {
    /// An `addresses` token matched neither `0xNN` nor `0xNN-0xMM`.
    #[error("invalid address range {token:?} in {spec:?}")]
    MalformedAddressSpec { spec: String, token: String },

    /// A catalog file was missing, unreadable, not JSON, or not shaped like a catalog.
    #[error("failed to read device type catalog {}", path.display())]
    CatalogRead {
        path: PathBuf,
        #[source]
        source: CatalogReadCause,
    },

    /// Sum of decoded field widths differs from the declared poll response size.
    #[error(
        "poll data size mismatch for {key}: declared {declared} bytes, calculated {computed} bytes"
    )]
    LayoutSizeMismatch {
        key: String,
        declared: u64,
        computed: u64,
    },

    /// Two catalog keys produce the same C identifier.
    #[error("device types {first:?} and {second:?} both generate the identifier {ident}")]
    IdentifierCollision {
        ident: String,
        first: String,
        second: String,
    },

    /// More descriptors than a `uint16_t` record index can address.
    #[error("{count} device types do not fit a 16-bit record index")]
    TooManyDeviceTypes { count: usize },

    #[error("invalid generator option: {0}")]
    InvalidOption(String),

    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Underlying reason for a [`GeneratorError::CatalogRead`].
#[derive(Error, Debug)]
pub enum CatalogReadCause {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Schema(String),
}

/// Result type for generator operations
pub type GeneratorResult<T> = std::result::Result<T, GeneratorError>;
