//! Manifest parsing and binding: `manifest-<algo>.txt` lines are matched
//! against payload records by MD5 name fingerprint, while
//! `tagmanifest-<algo>.txt` lines are matched against the bag's own
//! metadata members by substring.
//!
//! Grounded on `getbaginfo.c`'s `parse_manifest()` /
//! `calc_fname_hash_from_manifest_bits()` pair: manifest entries are
//! fingerprinted the same way records are, and bound with a linear scan
//! rather than a sorted lookup (the source's own `get_sorted_recs()` was
//! never implemented). `parse_manifest()` binds the tagmanifest's
//! entries onto the metadata-file records by substring match rather
//! than fingerprint, since those records were never fingerprinted
//! against a bag-relative path the way payload files are.
use crate::digest::name_fingerprint;
use crate::namepool::NamePool;
use crate::record::RecordTable;

/// One parsed manifest line: the recorded digest and the path relative
/// to the bag root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub digest: String,
    pub relative_path: String,
}

/// Splits `<digest><whitespace><path>` lines, tolerating `\r\n` and
/// blank lines.
pub fn parse_manifest(text: &[u8]) -> Vec<ManifestEntry> {
    let mut entries = Vec::new();
    for line in text.split(|&b| b == b'\n') {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.is_empty() {
            continue;
        }
        let text = String::from_utf8_lossy(line);
        let mut parts = text.splitn(2, char::is_whitespace);
        let digest = match parts.next() {
            Some(d) if !d.is_empty() => d.to_string(),
            _ => continue,
        };
        let path = match parts.next() {
            Some(p) => p.trim_start().to_string(),
            None => continue,
        };
        if path.is_empty() {
            continue;
        }
        entries.push(ManifestEntry { digest, relative_path: path });
    }
    entries
}

/// Fills in every record's `name_fingerprint`, once, so binding is a
/// cheap 16-byte comparison instead of re-hashing names per manifest
/// line.
pub fn compute_fingerprints(table: &mut RecordTable, pool: &NamePool) {
    for rec in table.iter_mut() {
        let name = pool.get(rec.filename);
        rec.name_fingerprint = Some(name_fingerprint(name));
    }
}

/// Binds manifest entries to records under `root`, setting
/// `expected_digest` on every match. Returns the number of entries that
/// found a record.
pub fn bind_manifest(table: &mut RecordTable, root: &str, entries: &[ManifestEntry]) -> usize {
    let mut bound = 0;
    for entry in entries {
        let fqn = format!("{root}/{}", entry.relative_path);
        let fingerprint = name_fingerprint(fqn.as_bytes());
        for rec in table.iter_mut() {
            if rec.name_fingerprint == Some(fingerprint) {
                rec.expected_digest = Some(entry.digest.clone());
                bound += 1;
                break;
            }
        }
    }
    bound
}

/// Binds tagmanifest entries to the bag's metadata-file records
/// (`bagit.txt`, `bag-info.txt`, `manifest-<algo>.txt`), setting
/// `expected_digest` on every match. Unlike [`bind_manifest`], binding
/// is by substring match against the record's full name rather than by
/// name fingerprint: tagmanifest lines name metadata files relative to
/// the bag root (e.g. `bagit.txt`), and a fingerprint keyed on a single
/// fully-qualified name can't serve entries from both manifests at
/// once. Returns the number of entries that found a record.
pub fn bind_tagmanifest(table: &mut RecordTable, pool: &NamePool, entries: &[ManifestEntry]) -> usize {
    let mut bound = 0;
    for entry in entries {
        for rec in table.iter_mut() {
            let name = pool.get_str(rec.filename);
            if name.ends_with(entry.relative_path.as_str()) {
                rec.expected_digest = Some(entry.digest.clone());
                bound += 1;
                break;
            }
        }
    }
    bound
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namepool::NamePool;
    use crate::record::{Record, RecordKind};

    #[test]
    fn parses_digest_and_path() {
        let text = b"abc123  data/a.txt\ndef456  data/b.txt\r\n";
        let entries = parse_manifest(text);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].digest, "abc123");
        assert_eq!(entries[0].relative_path, "data/a.txt");
        assert_eq!(entries[1].relative_path, "data/b.txt");
    }

    #[test]
    fn skips_blank_lines() {
        let text = b"\nabc123  data/a.txt\n\n";
        assert_eq!(parse_manifest(text).len(), 1);
    }

    #[test]
    fn binds_by_fingerprint_not_string_match() {
        let mut pool = NamePool::new();
        let mut table = RecordTable::new();
        let name = pool.intern(b"my-bag/data/a.txt", false).unwrap();
        table.append(Record::new(name, 1, 5, RecordKind::Regular));
        compute_fingerprints(&mut table, &pool);

        let entries = vec![ManifestEntry {
            digest: "deadbeef".to_string(),
            relative_path: "data/a.txt".to_string(),
        }];
        let bound = bind_manifest(&mut table, "my-bag", &entries);
        assert_eq!(bound, 1);
        assert_eq!(table.get(0).expected_digest.as_deref(), Some("deadbeef"));
    }

    #[test]
    fn tagmanifest_binds_metadata_members_by_substring() {
        let mut pool = NamePool::new();
        let mut table = RecordTable::new();
        let name = pool.intern(b"my-bag/bag-info.txt", false).unwrap();
        table.append(Record::new(name, 1, 5, RecordKind::Regular));

        let entries = vec![ManifestEntry {
            digest: "cafef00d".to_string(),
            relative_path: "bag-info.txt".to_string(),
        }];
        let bound = bind_tagmanifest(&mut table, &pool, &entries);
        assert_eq!(bound, 1);
        assert_eq!(table.get(0).expected_digest.as_deref(), Some("cafef00d"));
    }

    #[test]
    fn unmatched_entry_binds_nothing() {
        let mut pool = NamePool::new();
        let mut table = RecordTable::new();
        let name = pool.intern(b"my-bag/data/a.txt", false).unwrap();
        table.append(Record::new(name, 1, 5, RecordKind::Regular));
        compute_fingerprints(&mut table, &pool);

        let entries = vec![ManifestEntry {
            digest: "deadbeef".to_string(),
            relative_path: "data/missing.txt".to_string(),
        }];
        assert_eq!(bind_manifest(&mut table, "my-bag", &entries), 0);
        assert!(table.get(0).expected_digest.is_none());
    }
}
