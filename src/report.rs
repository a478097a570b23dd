//! Output formatting: the tar-listing report and the two bag
//! verification reports. Every literal string here is part of the
//! program's observable contract, so it is written with plain
//! `println!`/`eprintln!` rather than routed through a logging crate.
use std::io::Write;

use crate::namepool::NamePool;
use crate::record::{RecordKind, RecordTable};

/// `type|offset|filesize|computed_digest|filename`, one line per record.
pub fn print_tar_listing<W: Write>(out: &mut W, table: &RecordTable, pool: &NamePool) -> std::io::Result<()> {
    for rec in table.iter() {
        let name = pool.get_str(rec.filename);
        let digest = rec.computed_digest.as_deref().unwrap_or("");
        writeln!(
            out,
            "{}|{}|{}|{}|{}",
            rec.kind.code(),
            rec.offset,
            rec.filesize,
            digest,
            name
        )?;
    }
    Ok(())
}

/// Compares the bag's declared `Payload-Oxum` against the actual
/// payload size/count; a pass/fail check that never opens a single
/// payload file.
pub fn fast_verify<W: Write>(
    out: &mut W,
    bag_name: &str,
    stored: (u64, u64),
    actual: (u64, u64),
) -> std::io::Result<bool> {
    if stored == actual {
        writeln!(out, "INFO - GOOD - {bag_name}  {}.{}", stored.0, stored.1)?;
        Ok(true)
    } else {
        writeln!(
            out,
            "ERROR - BAD - {bag_name}  Expected|Calculated   {}.{}|{}.{}",
            stored.0, stored.1, actual.0, actual.1
        )?;
        Ok(false)
    }
}

pub struct FullVerifySummary {
    pub good: u64,
    pub bad: u64,
    pub empty: u64,
}

impl FullVerifySummary {
    pub fn total(&self) -> u64 {
        self.good + self.bad + self.empty
    }
}

/// Walks every payload record under the bag root, comparing
/// `computed_digest` to `expected_digest`. Zero-byte files are counted
/// separately from good/bad, per the summary's own accounting.
pub fn full_verify<W: Write, E: Write>(
    out: &mut W,
    err: &mut E,
    table: &RecordTable,
    pool: &NamePool,
    root: &str,
    verbose: bool,
) -> std::io::Result<FullVerifySummary> {
    let prefix = format!("{root}/data/");
    let mut summary = FullVerifySummary { good: 0, bad: 0, empty: 0 };

    for rec in table.iter() {
        if rec.kind != RecordKind::Regular {
            continue;
        }
        let name = pool.get_str(rec.filename);
        if !name.starts_with(&prefix) {
            continue;
        }

        if rec.filesize == 0 {
            summary.empty += 1;
            if verbose {
                writeln!(out, "INFO  {name}: empty file - GOOD!")?;
            }
            continue;
        }

        let calculated = rec.computed_digest.as_deref().unwrap_or("");
        let manifest = rec.expected_digest.as_deref().unwrap_or("");
        if calculated == manifest && !manifest.is_empty() {
            summary.good += 1;
            if verbose {
                writeln!(out, "INFO  {name}: calculated({calculated}) manifest({manifest}) - GOOD!")?;
            }
        } else {
            summary.bad += 1;
            writeln!(err, "ERROR  {name}: calculated({calculated}) manifest({manifest}) - BAD!")?;
        }
    }

    writeln!(out, "\nFixity is good for {} out of {} files.", summary.good, summary.total())?;
    Ok(summary)
}

/// Lists payload records whose `filesize` is zero under the bag root,
/// for the `--empties` switch.
pub fn print_empties<W: Write>(out: &mut W, table: &RecordTable, pool: &NamePool, root: &str) -> std::io::Result<usize> {
    let prefix = format!("{root}/data/");
    let mut count = 0;
    for rec in table.iter() {
        if rec.kind != RecordKind::Regular || rec.filesize != 0 {
            continue;
        }
        let name = pool.get_str(rec.filename);
        if name.starts_with(&prefix) {
            writeln!(out, "{name}")?;
            count += 1;
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namepool::NamePool;
    use crate::record::{Record, RecordKind};

    fn sample_table() -> (RecordTable, NamePool) {
        let mut pool = NamePool::new();
        let mut table = RecordTable::new();
        let name = pool.intern(b"b/data/a.txt", false).unwrap();
        let mut rec = Record::new(name, 1, 5, RecordKind::Regular);
        rec.computed_digest = Some("deadbeef".to_string());
        rec.expected_digest = Some("deadbeef".to_string());
        table.append(rec);
        (table, pool)
    }

    #[test]
    fn tar_listing_has_five_pipe_fields() {
        let (table, pool) = sample_table();
        let mut buf = Vec::new();
        print_tar_listing(&mut buf, &table, &pool).unwrap();
        let line = String::from_utf8(buf).unwrap();
        assert_eq!(line.trim_end().split('|').count(), 5);
    }

    #[test]
    fn fast_verify_matches_prints_good() {
        let mut buf = Vec::new();
        let ok = fast_verify(&mut buf, "mybag", (100, 2), (100, 2)).unwrap();
        assert!(ok);
        assert!(String::from_utf8(buf).unwrap().starts_with("INFO - GOOD -"));
    }

    #[test]
    fn fast_verify_mismatch_prints_bad() {
        let mut buf = Vec::new();
        let ok = fast_verify(&mut buf, "mybag", (100, 2), (99, 2)).unwrap();
        assert!(!ok);
        assert!(String::from_utf8(buf).unwrap().starts_with("ERROR - BAD -"));
    }

    #[test]
    fn full_verify_counts_good_bad_empty() {
        let mut pool = NamePool::new();
        let mut table = RecordTable::new();

        let good = pool.intern(b"b/data/good.txt", false).unwrap();
        let mut good_rec = Record::new(good, 1, 5, RecordKind::Regular);
        good_rec.computed_digest = Some("abc".into());
        good_rec.expected_digest = Some("abc".into());
        table.append(good_rec);

        let bad = pool.intern(b"b/data/bad.txt", false).unwrap();
        let mut bad_rec = Record::new(bad, 2, 5, RecordKind::Regular);
        bad_rec.computed_digest = Some("abc".into());
        bad_rec.expected_digest = Some("xyz".into());
        table.append(bad_rec);

        let empty = pool.intern(b"b/data/empty.txt", false).unwrap();
        table.append(Record::new(empty, 3, 0, RecordKind::Regular));

        let mut out = Vec::new();
        let mut err = Vec::new();
        let summary = full_verify(&mut out, &mut err, &table, &pool, "b", false).unwrap();
        assert_eq!(summary.good, 1);
        assert_eq!(summary.bad, 1);
        assert_eq!(summary.empty, 1);
        assert_eq!(summary.total(), 3);
        assert!(String::from_utf8(err).unwrap().contains("BAD!"));
    }
}
