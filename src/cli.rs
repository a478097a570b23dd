//! Command-line surface.
//!
//! Flag names and validation rules are carried over from the source's
//! own `argparsing.c`: `--get`/`--fast` only make sense in bag mode,
//! thread counts are clamped to 1-20, a wrap offset must be positive,
//! and only copy 1 of a SAM-resolved archive is supported.
use clap::{Parser, ValueEnum};

use crate::digest::DigestAlgorithm;
use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    Tar,
    Bag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GetKind {
    Manifest,
    Tagmanifest,
    Algorithm,
    Baginfo,
    Bagit,
}

/// Inspects ustar tar archives and verifies BagIt bag fixity.
#[derive(Debug, Parser)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    /// Operating mode: list a tar archive, or verify a bag.
    #[clap(short, long, value_enum, default_value = "tar")]
    pub mode: Mode,

    /// Digest algorithm to use when computing member digests.
    #[clap(short, long, value_enum, default_value = "md5")]
    pub algo: DigestAlgorithm,

    /// Number of digest worker threads (1-20).
    #[clap(short, long, default_value_t = 1)]
    pub threads: u32,

    /// SAM copy number to resolve (only copy 1 is supported).
    #[clap(short, long)]
    pub sam: Option<i32>,

    /// Byte offset at which the inner tar stream begins, for tar-in-tar.
    #[clap(short, long)]
    pub wrapped: Option<u64>,

    /// Print one bag metadata member and exit (bag mode only).
    #[clap(short, long, value_enum)]
    pub get: Option<GetKind>,

    /// Fast verification: compare the Payload-Oxum only (bag mode only).
    #[clap(short, long)]
    pub fast: bool,

    /// Print a line for every GOOD file, not just BAD ones.
    #[clap(short, long)]
    pub verbose: bool,

    /// List zero-byte payload files (bag mode only).
    #[clap(short, long)]
    pub empties: bool,

    /// Path to the tar archive or backing file.
    #[clap(value_parser, required = true)]
    pub path: String,
}

impl Cli {
    pub fn validate(&self) -> CoreResult<()> {
        if self.mode == Mode::Tar && self.get.is_some() {
            return Err(CoreError::UnsupportedModeGet);
        }
        if self.mode == Mode::Tar && self.fast {
            return Err(CoreError::UnsupportedModeFast);
        }
        if !(1..=20).contains(&self.threads) {
            return Err(CoreError::ThreadCountOutOfRange(self.threads));
        }
        if let Some(w) = self.wrapped {
            if w == 0 {
                return Err(CoreError::WrapOffsetNonPositive);
            }
        }
        if let Some(copy) = self.sam {
            if copy != 1 {
                return Err(CoreError::UnsupportedSamCopy(copy));
            }
        }
        Ok(())
    }
}
