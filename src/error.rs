//! Structured error kinds for the core engine.
//!
//! The core returns `Result<T, CoreError>`; `main.rs` folds these into
//! `anyhow::Result` at the CLI boundary.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unparseable size field in tar header")]
    BadSizeField,

    #[error("sam copy {0} not supported; only copy 1 is supported at this time")]
    UnsupportedSamCopy(i32),

    #[error("for the wrapped case (tar in tar), offset must be 1 or greater")]
    WrapOffsetNonPositive,

    #[error("number of threads ({0}) is out of range (1-20)")]
    ThreadCountOutOfRange(u32),

    #[error("name pool overflow: member name exceeds 512 bytes")]
    NamePoolOverflow,

    #[error("failed to open backing file {path}")]
    BackingOpenFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read backing file")]
    BackingReadFailed(#[source] std::io::Error),

    #[error("--get only makes sense with 'bag' mode")]
    UnsupportedModeGet,

    #[error("--fast only makes sense with 'bag' mode")]
    UnsupportedModeFast,

    #[error("bag is missing required metadata member: {0}")]
    MissingBagMember(&'static str),

    #[error("manifest file is {0} bytes, exceeding the 100 MiB cap")]
    ManifestTooLarge(u64),
}

pub type CoreResult<T> = Result<T, CoreError>;
