//! tapefsck — ustar tar archive inspector and BagIt fixity verifier.
//!
//! # Listing a tar archive
//! ```bash
//! $ tapefsck --mode tar --algo sha256 layer.tar
//! 0|512|5|2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824|hello.txt
//! ```
//!
//! # Verifying a bag
//! ```bash
//! $ tapefsck --mode bag --fast my-bag.tar
//! INFO - GOOD - my-bag.tar  1024.3
//! $ tapefsck --mode bag --verbose my-bag.tar
//! INFO  my-bag/data/a.txt: calculated(abc) manifest(abc) - GOOD!
//!
//! Fixity is good for 3 out of 3 files.
//! ```
use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use memmap2::Mmap;

mod bag;
mod cli;
mod digest;
mod error;
mod header;
mod manifest;
mod namepool;
mod prefetch;
mod record;
mod report;
mod resolver;
mod size;
mod walker;

use cli::{Cli, GetKind, Mode};
use resolver::{LocalPathResolver, Resolver, StubSamResolver};

/// Hard cap on manifest file size before it is read into memory whole.
const MANIFEST_SIZE_CAP: u64 = 100 * 1024 * 1024;

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.validate()?;

    let resolver: Box<dyn Resolver> = if cli.sam.is_some() {
        Box::new(StubSamResolver)
    } else {
        Box::new(LocalPathResolver)
    };
    let resolved = resolver.resolve(&cli.path, cli.sam)?;
    let start_offset_bytes = resolved.start_offset_bytes + cli.wrapped.unwrap_or(0);

    let file = std::fs::File::open(&resolved.backing_path)
        .with_context(|| format!("opening {}", resolved.backing_path.display()))?;
    let mmap = unsafe { Mmap::map(&file) }
        .with_context(|| format!("mapping {}", resolved.backing_path.display()))?;

    let mut walk = walker::walk(&mmap, start_offset_bytes, resolved.total_bytes)?;

    match cli.mode {
        Mode::Tar => run_tar(&cli, &mmap, &mut walk)?,
        Mode::Bag => run_bag(&cli, &mmap, start_offset_bytes, &mut walk)?,
    }
    Ok(())
}

fn run_tar(cli: &Cli, _mmap: &Mmap, walk: &mut walker::WalkResult) -> Result<()> {
    digest::run_pool(
        std::path::Path::new(&cli.path),
        walk.table.as_mut_slice(),
        cli.algo,
        cli.threads,
    )?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    report::print_tar_listing(&mut out, &walk.table, &walk.pool)?;
    Ok(())
}

fn run_bag(cli: &Cli, mmap: &Mmap, start_offset_bytes: u64, walk: &mut walker::WalkResult) -> Result<()> {
    let root = bag::find_bag_root(&walk.table, &walk.pool)
        .context("could not locate a /data/ directory to identify the bag root")?;
    let info = bag::resolve(&mut walk.table, &walk.pool, &root)?;

    if let Some(kind) = cli.get {
        return print_get(kind, mmap, start_offset_bytes, &walk.table, &info);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let stderr = io::stderr();
    let mut err = stderr.lock();

    if cli.fast {
        let baginfo_idx = info.baginfo_idx.ok_or(error::CoreError::MissingBagMember("bag-info.txt"))?;
        let baginfo_text = bag::read_member(mmap, start_offset_bytes, walk.table.get(baginfo_idx));
        let stored = bag::parse_payload_oxum(baginfo_text)
            .ok_or(error::CoreError::MissingBagMember("Payload-Oxum"))?;
        let actual = bag::actual_payload_oxum(&walk.table, &walk.pool, &info.root);
        let good = report::fast_verify(&mut out, &cli.path, stored, actual)?;
        if !good {
            std::process::exit(1);
        }
        return Ok(());
    }

    let manifest_rec = walk.table.get(info.manifest_idx);
    if manifest_rec.filesize > MANIFEST_SIZE_CAP {
        return Err(error::CoreError::ManifestTooLarge(manifest_rec.filesize).into());
    }
    let manifest_text = bag::read_member(mmap, start_offset_bytes, manifest_rec).to_vec();
    let entries = manifest::parse_manifest(&manifest_text);
    manifest::compute_fingerprints(&mut walk.table, &walk.pool);
    manifest::bind_manifest(&mut walk.table, &info.root, &entries);

    if let Some(tagmanifest_idx) = info.tagmanifest_idx {
        let tagmanifest_rec = walk.table.get(tagmanifest_idx);
        if tagmanifest_rec.filesize > MANIFEST_SIZE_CAP {
            return Err(error::CoreError::ManifestTooLarge(tagmanifest_rec.filesize).into());
        }
        let tagmanifest_text = bag::read_member(mmap, start_offset_bytes, tagmanifest_rec).to_vec();
        let tag_entries = manifest::parse_manifest(&tagmanifest_text);
        manifest::bind_tagmanifest(&mut walk.table, &walk.pool, &tag_entries);
    }

    digest::run_pool(
        std::path::Path::new(&cli.path),
        walk.table.as_mut_slice(),
        info.algorithm,
        cli.threads,
    )?;

    let summary = report::full_verify(&mut out, &mut err, &walk.table, &walk.pool, &info.root, cli.verbose)?;

    if cli.empties {
        report::print_empties(&mut out, &walk.table, &walk.pool, &info.root)?;
    }

    if summary.bad > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn print_get(
    kind: GetKind,
    mmap: &Mmap,
    start_offset_bytes: u64,
    table: &record::RecordTable,
    info: &bag::BagInfo,
) -> Result<()> {
    if kind == GetKind::Algorithm {
        println!("{}", info.algorithm.name());
        return Ok(());
    }
    let idx = match kind {
        GetKind::Manifest => Some(info.manifest_idx),
        GetKind::Tagmanifest => info.tagmanifest_idx,
        GetKind::Bagit => info.bagit_idx,
        GetKind::Baginfo => info.baginfo_idx,
        GetKind::Algorithm => unreachable!(),
    };
    let idx = idx.ok_or(error::CoreError::MissingBagMember("requested bag member"))?;
    let bytes = bag::read_member(mmap, start_offset_bytes, table.get(idx));
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut lines = bytes.split(|&b| b == b'\n').peekable();
    while let Some(line) = lines.next() {
        if line.is_empty() && lines.peek().is_none() {
            break;
        }
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        io::Write::write_all(&mut out, line)?;
        io::Write::write_all(&mut out, b"\n")?;
    }
    Ok(())
}
