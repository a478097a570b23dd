//! Digest algorithm abstraction, name fingerprinting, and the parallel
//! digest worker pool.
//!
//! The algorithm dispatch mirrors the `digest::Digest`-trait pattern the
//! corpus already uses (`fcoreutils` hash core's `HashAlgorithm`); the
//! worker pool is a bounded channel standing in for the source's
//! hand-rolled mutex/condvar queue, per the redesign note in \S9 of
//! SPEC_FULL.md.
use std::fs::File;
use std::os::unix::fs::FileExt;
use std::path::Path;
use std::sync::mpsc::sync_channel;
use std::sync::{Arc, Mutex};
use std::thread;

use ::digest::Digest as _;

use crate::error::{CoreError, CoreResult};
use crate::record::{Record, RecordKind};

const READ_BUF_SZ: usize = 4 * 1024 * 1024;
const FEED_STEP: usize = 8 * 1024;
const PREFETCH_CHUNK: u64 = 8 * 1024 * 1024;
const BLOCK_SIZE: u64 = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum)]
pub enum DigestAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

impl DigestAlgorithm {
    /// Parses the algorithm out of a `manifest-<algo>.txt` suffix, as
    /// found after the final `-` in the member name.
    pub fn from_manifest_suffix(suffix: &str) -> Option<DigestAlgorithm> {
        match suffix {
            "md5.txt" => Some(DigestAlgorithm::Md5),
            "sha1.txt" => Some(DigestAlgorithm::Sha1),
            "sha256.txt" => Some(DigestAlgorithm::Sha256),
            "sha512.txt" => Some(DigestAlgorithm::Sha512),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DigestAlgorithm::Md5 => "md5",
            DigestAlgorithm::Sha1 => "sha1",
            DigestAlgorithm::Sha256 => "sha256",
            DigestAlgorithm::Sha512 => "sha512",
        }
    }
}

enum DigestCtx {
    Md5(md5::Md5),
    Sha1(sha1::Sha1),
    Sha256(sha2::Sha256),
    Sha512(sha2::Sha512),
}

impl DigestCtx {
    fn new(algo: DigestAlgorithm) -> Self {
        match algo {
            DigestAlgorithm::Md5 => DigestCtx::Md5(md5::Md5::new()),
            DigestAlgorithm::Sha1 => DigestCtx::Sha1(sha1::Sha1::new()),
            DigestAlgorithm::Sha256 => DigestCtx::Sha256(sha2::Sha256::new()),
            DigestAlgorithm::Sha512 => DigestCtx::Sha512(sha2::Sha512::new()),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            DigestCtx::Md5(c) => c.update(data),
            DigestCtx::Sha1(c) => c.update(data),
            DigestCtx::Sha256(c) => c.update(data),
            DigestCtx::Sha512(c) => c.update(data),
        }
    }

    fn finalize_hex(self) -> String {
        let bytes: Vec<u8> = match self {
            DigestCtx::Md5(c) => c.finalize().to_vec(),
            DigestCtx::Sha1(c) => c.finalize().to_vec(),
            DigestCtx::Sha256(c) => c.finalize().to_vec(),
            DigestCtx::Sha512(c) => c.finalize().to_vec(),
        };
        let mut hex = vec![0u8; bytes.len() * 2];
        faster_hex::hex_encode(&bytes, &mut hex).expect("hex buffer sized exactly");
        String::from_utf8(hex).expect("hex encoding is always valid utf8")
    }
}

/// MD5 fingerprint of a fully-qualified member name; a fast
/// content-addressable key, not a security primitive.
pub fn name_fingerprint(name: &[u8]) -> [u8; 16] {
    let digest = md5::Md5::digest(name);
    let mut out = [0u8; 16];
    out.copy_from_slice(&digest);
    out
}

fn digest_one(file: &File, offset_blocks: u64, filesize: u64, algo: DigestAlgorithm) -> CoreResult<String> {
    let mut ctx = DigestCtx::new(algo);
    let mut pos = offset_blocks * BLOCK_SIZE;
    let mut remaining = filesize;
    let mut buf = vec![0u8; READ_BUF_SZ];

    while remaining > 0 {
        let chunk = remaining.min(READ_BUF_SZ as u64) as usize;
        read_exact_at(file, &mut buf[..chunk], pos)?;

        let mut off = 0;
        while off < chunk {
            let take = (chunk - off).min(FEED_STEP);
            ctx.update(&buf[off..off + take]);
            off += take;
        }

        pos += chunk as u64;
        remaining -= chunk as u64;

        if chunk == READ_BUF_SZ {
            crate::prefetch::advise_willneed_fd(file, pos, PREFETCH_CHUNK);
        }
    }

    Ok(ctx.finalize_hex())
}

fn read_exact_at(file: &File, mut buf: &mut [u8], mut pos: u64) -> CoreResult<()> {
    while !buf.is_empty() {
        let n = file.read_at(buf, pos).map_err(CoreError::BackingReadFailed)?;
        if n == 0 {
            return Err(CoreError::BackingReadFailed(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "short read from backing file",
            )));
        }
        buf = &mut buf[n..];
        pos += n as u64;
    }
    Ok(())
}

/// Runs the digest worker pool over every type-0 record, writing
/// `computed_digest` into the matching `Record`.
///
/// The pool itself (threads draining a mutex-guarded job queue) is
/// expressed with `std::sync::mpsc`; the shared `Mutex<Receiver<_>>` is
/// the direct translation of the source's single queue mutex, and the
/// channel's internal signalling stands in for the `not_empty`/`drained`
/// condition variables.
pub fn run_pool(
    backing_path: &Path,
    records: &mut [Record],
    algorithm: DigestAlgorithm,
    n_threads: u32,
) -> CoreResult<()> {
    if !(1..=20).contains(&n_threads) {
        return Err(CoreError::ThreadCountOutOfRange(n_threads));
    }

    let file = File::open(backing_path).map_err(|e| CoreError::BackingOpenFailed {
        path: backing_path.display().to_string(),
        source: e,
    })?;

    let jobs: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.kind == RecordKind::Regular && r.filesize > 0)
        .map(|(i, _)| i)
        .collect();

    if jobs.is_empty() {
        return Ok(());
    }

    let capacity = (n_threads as usize * 2).max(1);
    let results: CoreResult<Vec<(usize, String)>> = thread::scope(|scope| {
        let (job_tx, job_rx) = sync_channel::<usize>(capacity);
        let job_rx = Arc::new(Mutex::new(job_rx));
        let (res_tx, res_rx) = std::sync::mpsc::channel::<CoreResult<(usize, String)>>();

        let mut handles = Vec::with_capacity(n_threads as usize);
        for _ in 0..n_threads {
            let job_rx = Arc::clone(&job_rx);
            let res_tx = res_tx.clone();
            let file = &file;
            let records: &[Record] = records;
            handles.push(scope.spawn(move || loop {
                let next = job_rx.lock().unwrap().recv();
                let idx = match next {
                    Ok(idx) => idx,
                    Err(_) => break,
                };
                let rec = &records[idx];
                let outcome = digest_one(file, rec.offset, rec.filesize, algorithm)
                    .map(|d| (idx, d));
                if res_tx.send(outcome).is_err() {
                    break;
                }
            }));
        }
        drop(res_tx);

        for idx in jobs {
            // producer side of the bounded queue; blocks when full
            job_tx.send(idx).expect("consumer threads outlive the producer loop");
        }
        drop(job_tx);

        let mut collected = Vec::new();
        for outcome in res_rx {
            collected.push(outcome?);
        }
        for h in handles {
            h.join().expect("digest worker panicked");
        }
        Ok(collected)
    });

    for (idx, digest) in results? {
        records[idx].computed_digest = Some(digest);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector_md5() {
        let digest = md5::Md5::digest(b"hello");
        let mut hex = vec![0u8; 32];
        faster_hex::hex_encode(&digest, &mut hex).unwrap();
        assert_eq!(String::from_utf8(hex).unwrap(), "5d41402abc4b2a76b9719d911017c592");
    }

    #[test]
    fn name_fingerprint_is_stable() {
        let a = name_fingerprint(b"my-bag/data/a.txt");
        let b = name_fingerprint(b"my-bag/data/a.txt");
        let c = name_fingerprint(b"my-bag/data/b.txt");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn algorithm_total_order() {
        use DigestAlgorithm::*;
        assert!(Md5 < Sha1);
        assert!(Sha1 < Sha256);
        assert!(Sha256 < Sha512);
    }

    #[test]
    fn unknown_manifest_suffix_is_rejected() {
        assert!(DigestAlgorithm::from_manifest_suffix("crc32.txt").is_none());
    }
}
