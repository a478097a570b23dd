//! Record table: one growable, append-only sequence of archive members.
//!
//! Re-expressed from the source's integer typeflag as a tagged
//! `RecordKind`, per the polymorphism redesign note.
use crate::namepool::NameRef;

const INITIAL_CAPACITY: usize = 10_000;
const GROWTH_CHUNK: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Regular,
    HardLink,
    SymLink,
    CharDevice,
    BlockDevice,
    Directory,
    Fifo,
    TagManifest,
}

impl RecordKind {
    /// The `type` code used in the tar-listing report, matching the
    /// source's `{0..6, 8}` integer typeflag space.
    pub fn code(self) -> u8 {
        match self {
            RecordKind::Regular => 0,
            RecordKind::HardLink => 1,
            RecordKind::SymLink => 2,
            RecordKind::CharDevice => 3,
            RecordKind::BlockDevice => 4,
            RecordKind::Directory => 5,
            RecordKind::Fifo => 6,
            RecordKind::TagManifest => 8,
        }
    }

    pub fn from_typeflag(tf: u8) -> RecordKind {
        match tf {
            b'1' => RecordKind::HardLink,
            b'2' => RecordKind::SymLink,
            b'3' => RecordKind::CharDevice,
            b'4' => RecordKind::BlockDevice,
            b'5' => RecordKind::Directory,
            b'6' => RecordKind::Fifo,
            _ => RecordKind::Regular,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Record {
    pub filename: NameRef,
    pub offset: u64,
    pub filesize: u64,
    pub kind: RecordKind,
    pub name_fingerprint: Option<[u8; 16]>,
    pub expected_digest: Option<String>,
    pub computed_digest: Option<String>,
}

impl Record {
    pub fn new(filename: NameRef, offset: u64, filesize: u64, kind: RecordKind) -> Self {
        Record {
            filename,
            offset,
            filesize,
            kind,
            name_fingerprint: None,
            expected_digest: None,
            computed_digest: None,
        }
    }
}

/// Growable sequence of records, preserving archive order.
#[derive(Debug, Default)]
pub struct RecordTable {
    records: Vec<Record>,
}

impl RecordTable {
    pub fn new() -> Self {
        RecordTable {
            records: Vec::with_capacity(INITIAL_CAPACITY),
        }
    }

    pub fn append(&mut self, record: Record) -> usize {
        if self.records.len() == self.records.capacity() {
            self.records.reserve(GROWTH_CHUNK);
        }
        self.records.push(record);
        self.records.len() - 1
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Record> {
        self.records.iter_mut()
    }

    pub fn get(&self, idx: usize) -> &Record {
        &self.records[idx]
    }

    pub fn get_mut(&mut self, idx: usize) -> &mut Record {
        &mut self.records[idx]
    }

    pub fn as_mut_slice(&mut self) -> &mut [Record] {
        &mut self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namepool::NamePool;

    #[test]
    fn append_preserves_order() {
        let mut pool = NamePool::new();
        let mut table = RecordTable::new();
        for i in 0..3 {
            let name = pool.intern(format!("f{i}").as_bytes(), false).unwrap();
            table.append(Record::new(name, i as u64, 0, RecordKind::Regular));
        }
        let names: Vec<_> = table
            .iter()
            .map(|r| pool.get_str(r.filename).into_owned())
            .collect();
        assert_eq!(names, vec!["f0", "f1", "f2"]);
    }

    #[test]
    fn grows_past_initial_capacity() {
        let mut pool = NamePool::new();
        let mut table = RecordTable::new();
        for i in 0..(INITIAL_CAPACITY + 1) {
            let name = pool.intern(b"x", false).unwrap();
            table.append(Record::new(name, i as u64, 0, RecordKind::Regular));
        }
        assert_eq!(table.len(), INITIAL_CAPACITY + 1);
    }
}
