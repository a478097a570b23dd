//! Streams 512-byte blocks from a memory-mapped backing file and
//! populates a [`RecordTable`], fusing GNU long-name ("L") pairs and
//! tolerating structural header errors by skipping one block at a time.
use memmap2::Mmap;

use crate::error::CoreResult;
use crate::header::{self, HeaderKind, BLOCK_SIZE, LINKNAME_LEN, LINKNAME_OFF, NAME_LEN, NAME_OFF, SIZE_OFF, TYPEFLAG_OFF};
use crate::namepool::NamePool;
use crate::record::{Record, RecordKind, RecordTable};

const PREFETCH_CHUNK: u64 = 8 * 1024 * 1024;

pub struct WalkResult {
    pub table: RecordTable,
    pub pool: NamePool,
}

/// Reads blocks starting at `start_offset_bytes` within `mmap`, up to
/// `total_bytes` of archive content.
pub fn walk(mmap: &Mmap, start_offset_bytes: u64, total_bytes: u64) -> CoreResult<WalkResult> {
    let mut pool = NamePool::new();
    let mut table = RecordTable::new();

    let mut pos: u64 = 0;
    let mut prefetch_owed: u64 = 0;
    let mut prev_was_empty = false;
    let mut pending_name: Option<crate::namepool::NameRef> = None;

    while pos + BLOCK_SIZE as u64 <= total_bytes {
        maybe_prefetch(mmap, start_offset_bytes, pos, total_bytes, &mut prefetch_owed);

        let block = read_block(mmap, start_offset_bytes, pos)?;
        let kind = header::classify(&block);

        match kind {
            HeaderKind::Empty => {
                pos += BLOCK_SIZE as u64;
                if prev_was_empty {
                    break;
                }
                prev_was_empty = true;
                continue;
            }
            HeaderKind::BadMagic => {
                eprintln!("Encountered bad magic in tar header.");
                pos += BLOCK_SIZE as u64;
                prev_was_empty = false;
                continue;
            }
            HeaderKind::BadChecksum => {
                eprintln!("Encountered bad tar header checksum.");
                pos += BLOCK_SIZE as u64;
                prev_was_empty = false;
                continue;
            }
            HeaderKind::Extended => {
                prev_was_empty = false;
                pos += BLOCK_SIZE as u64;
                if pos + BLOCK_SIZE as u64 > total_bytes {
                    break;
                }
                let name_block = read_block(mmap, start_offset_bytes, pos)?;
                let long_name = header::field_str(&name_block);
                pending_name = Some(pool.intern(long_name, true)?);
                pos += BLOCK_SIZE as u64;
                continue;
            }
            HeaderKind::Normal | HeaderKind::NonFile => {
                prev_was_empty = false;
                let size = crate::size::decode_size(&field12(&block, SIZE_OFF)).unwrap_or(0);
                let typeflag = block[TYPEFLAG_OFF];
                let record_kind = if kind == HeaderKind::Normal {
                    RecordKind::Regular
                } else {
                    RecordKind::from_typeflag(typeflag)
                };

                let name_ref = if let Some(long) = pending_name.take() {
                    long
                } else {
                    intern_header_name(&mut pool, &block)?
                };

                let name_ref = match record_kind {
                    RecordKind::HardLink | RecordKind::SymLink => {
                        let linkname =
                            header::field_str(&block[LINKNAME_OFF..LINKNAME_OFF + LINKNAME_LEN])
                                .to_vec();
                        let name = pool_snapshot(&pool, name_ref);
                        pool.intern_link(&linkname, &name)?
                    }
                    _ => name_ref,
                };

                pos += BLOCK_SIZE as u64;
                let payload_offset_blocks = (pos + start_offset_bytes) / BLOCK_SIZE as u64;

                let filesize = if record_kind == RecordKind::Regular { size } else { 0 };
                table.append(Record::new(name_ref, payload_offset_blocks, filesize, record_kind));

                if record_kind == RecordKind::Regular && filesize > 0 {
                    let advance = ceil_512(filesize);
                    pos += advance;
                    prefetch_owed += advance;
                }
            }
        }
    }

    Ok(WalkResult { table, pool })
}

fn pool_snapshot(pool: &NamePool, name_ref: crate::namepool::NameRef) -> Vec<u8> {
    pool.get(name_ref).to_vec()
}

fn intern_header_name(pool: &mut NamePool, block: &[u8; BLOCK_SIZE]) -> CoreResult<crate::namepool::NameRef> {
    let short = header::field_str(&block[NAME_OFF..NAME_OFF + NAME_LEN]);
    pool.intern(short, false)
}

fn field12(block: &[u8; BLOCK_SIZE], off: usize) -> [u8; 12] {
    let mut f = [0u8; 12];
    f.copy_from_slice(&block[off..off + 12]);
    f
}

fn ceil_512(n: u64) -> u64 {
    n.div_ceil(512) * 512
}

fn read_block(mmap: &Mmap, start_offset_bytes: u64, pos: u64) -> CoreResult<[u8; BLOCK_SIZE]> {
    let abs = (start_offset_bytes + pos) as usize;
    let mut buf = [0u8; BLOCK_SIZE];
    buf.copy_from_slice(&mmap[abs..abs + BLOCK_SIZE]);
    Ok(buf)
}

fn maybe_prefetch(mmap: &Mmap, start_offset_bytes: u64, pos: u64, total_bytes: u64, prefetch_owed: &mut u64) {
    if *prefetch_owed < PREFETCH_CHUNK {
        return;
    }
    let remaining = total_bytes.saturating_sub(pos);
    if remaining < PREFETCH_CHUNK {
        return;
    }
    let abs = (start_offset_bytes + pos) as usize;
    let len = PREFETCH_CHUNK.min(remaining) as usize;
    crate::prefetch::advise_willneed(mmap, abs, len);
    *prefetch_owed = 0;
}
