//! BagIt bag resolution: locating the bag root inside the record table,
//! picking the strongest available manifest algorithm, and reading the
//! four well-known metadata members.
//!
//! Root detection and algorithm-strength selection mirror
//! `getbaginfo.c`'s `init_bag()`: the root is the longest path prefix
//! that precedes a `/data/` component, and of any manifest files present
//! the strongest algorithm wins.
use memmap2::Mmap;

use crate::digest::DigestAlgorithm;
use crate::error::{CoreError, CoreResult};
use crate::namepool::NamePool;
use crate::record::{Record, RecordKind, RecordTable};

pub const BAGIT_TXT: &str = "bagit.txt";
pub const BAG_INFO_TXT: &str = "bag-info.txt";

#[derive(Debug, Clone)]
pub struct BagInfo {
    pub root: String,
    pub algorithm: DigestAlgorithm,
    pub manifest_idx: usize,
    pub tagmanifest_idx: Option<usize>,
    pub bagit_idx: Option<usize>,
    pub baginfo_idx: Option<usize>,
}

/// Finds the longest name prefix, across every record, that is
/// immediately followed by `/data/`. That prefix is the bag root.
pub fn find_bag_root(table: &RecordTable, pool: &NamePool) -> Option<String> {
    let mut best: Option<String> = None;
    for rec in table.iter() {
        let name = pool.get_str(rec.filename);
        if let Some(pos) = name.find("/data/") {
            let candidate = &name[..pos];
            match &best {
                Some(b) if b.len() >= candidate.len() => {}
                _ => best = Some(candidate.to_string()),
            }
        }
    }
    best
}

/// Resolves the bag metadata members under `root`, preferring the
/// strongest digest algorithm for which a `manifest-<algo>.txt` exists.
/// Any `tagmanifest-<algo>.txt` member found is re-tagged
/// [`RecordKind::TagManifest`], since its own tar typeflag is
/// indistinguishable from an ordinary regular file.
pub fn resolve(table: &mut RecordTable, pool: &NamePool, root: &str) -> CoreResult<BagInfo> {
    let mut manifest: Option<(DigestAlgorithm, usize)> = None;
    let mut tagmanifest_idx = None;
    let mut bagit_idx = None;
    let mut baginfo_idx = None;

    for (idx, rec) in table.iter().enumerate() {
        let name = pool.get_str(rec.filename);
        let relative = match name.strip_prefix(root).and_then(|s| s.strip_prefix('/')) {
            Some(r) => r,
            None => continue,
        };

        if relative == BAGIT_TXT {
            bagit_idx = Some(idx);
        } else if relative == BAG_INFO_TXT {
            baginfo_idx = Some(idx);
        } else if let Some(suffix) = relative.strip_prefix("manifest-") {
            if let Some(algo) = DigestAlgorithm::from_manifest_suffix(suffix) {
                let better = match manifest {
                    Some((current, _)) => algo > current,
                    None => true,
                };
                if better {
                    manifest = Some((algo, idx));
                }
            }
        } else if relative.strip_prefix("tagmanifest-").is_some() {
            tagmanifest_idx = Some(idx);
        }
    }

    let (algorithm, manifest_idx) = manifest.ok_or(CoreError::MissingBagMember("manifest-<algo>.txt"))?;

    if let Some(idx) = tagmanifest_idx {
        table.get_mut(idx).kind = crate::record::RecordKind::TagManifest;
    }

    Ok(BagInfo {
        root: root.to_string(),
        algorithm,
        manifest_idx,
        tagmanifest_idx,
        bagit_idx,
        baginfo_idx,
    })
}

/// Reads a record's raw payload bytes straight out of the memory map.
pub fn read_member<'a>(mmap: &'a Mmap, start_offset_bytes: u64, rec: &Record) -> &'a [u8] {
    let start = (start_offset_bytes + rec.offset * 512) as usize;
    let end = start + rec.filesize as usize;
    &mmap[start..end]
}

/// Parses the `Payload-Oxum: <bytes>.<count>` line out of `bag-info.txt`.
pub fn parse_payload_oxum(bag_info_text: &[u8]) -> Option<(u64, u64)> {
    for line in bag_info_text.split(|&b| b == b'\n') {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if let Some(rest) = line.strip_prefix(b"Payload-Oxum:") {
            let text = std::str::from_utf8(rest).ok()?.trim();
            let (bytes, count) = text.split_once('.')?;
            return Some((bytes.trim().parse().ok()?, count.trim().parse().ok()?));
        }
    }
    None
}

/// Sums the actual size and count of every payload file under `data/`.
pub fn actual_payload_oxum(table: &RecordTable, pool: &NamePool, root: &str) -> (u64, u64) {
    let prefix = format!("{root}/data/");
    let mut bytes = 0u64;
    let mut count = 0u64;
    for rec in table.iter() {
        if rec.kind != RecordKind::Regular {
            continue;
        }
        let name = pool.get_str(rec.filename);
        if name.starts_with(&prefix) {
            bytes += rec.filesize;
            count += 1;
        }
    }
    (bytes, count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_root_before_data_dir() {
        let mut pool = NamePool::new();
        let mut table = RecordTable::new();
        let name = pool.intern(b"my-bag/data/a.txt", false).unwrap();
        table.append(Record::new(name, 0, 10, RecordKind::Regular));
        assert_eq!(find_bag_root(&table, &pool).as_deref(), Some("my-bag"));
    }

    #[test]
    fn no_data_dir_means_no_root() {
        let pool = NamePool::new();
        let table = RecordTable::new();
        assert_eq!(find_bag_root(&table, &pool), None);
    }

    #[test]
    fn oxum_line_parses() {
        let text = b"Bagging-Date: 2020-01-01\r\nPayload-Oxum: 1024.3\r\n";
        assert_eq!(parse_payload_oxum(text), Some((1024, 3)));
    }

    #[test]
    fn picks_strongest_manifest_algorithm() {
        let mut pool = NamePool::new();
        let mut table = RecordTable::new();
        let md5_name = pool.intern(b"b/manifest-md5.txt", false).unwrap();
        table.append(Record::new(md5_name, 0, 0, RecordKind::Regular));
        let sha_name = pool.intern(b"b/manifest-sha256.txt", false).unwrap();
        table.append(Record::new(sha_name, 1, 0, RecordKind::Regular));

        let info = resolve(&mut table, &pool, "b").unwrap();
        assert_eq!(info.algorithm, DigestAlgorithm::Sha256);
    }

    #[test]
    fn tagmanifest_member_is_retagged() {
        let mut pool = NamePool::new();
        let mut table = RecordTable::new();
        let manifest_name = pool.intern(b"b/manifest-sha256.txt", false).unwrap();
        table.append(Record::new(manifest_name, 0, 0, RecordKind::Regular));
        let tag_name = pool.intern(b"b/tagmanifest-sha256.txt", false).unwrap();
        table.append(Record::new(tag_name, 1, 0, RecordKind::Regular));

        let info = resolve(&mut table, &pool, "b").unwrap();
        assert_eq!(info.tagmanifest_idx, Some(1));
        assert_eq!(table.get(1).kind, RecordKind::TagManifest);
    }

    #[test]
    fn missing_manifest_is_an_error() {
        let pool = NamePool::new();
        let mut table = RecordTable::new();
        assert!(resolve(&mut table, &pool, "b").is_err());
    }
}
