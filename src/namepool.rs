//! Append-only arena of pooled, NUL-terminated member names.
//!
//! Re-expressed from the source's chain of raw `char*` chunks as an
//! arena of owned `Vec<u8>` chunks, handed out as `NameRef` handles
//! (chunk index + byte offset + length) rather than raw pointers, so
//! existing handles are never invalidated by later growth.
use crate::error::{CoreError, CoreResult};

const CHUNK_SIZE: usize = 1024 * 1024;
const MAX_NAME_LEN: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameRef {
    chunk: u32,
    offset: u32,
    len: u32,
}

pub struct NamePool {
    chunks: Vec<Vec<u8>>,
}

impl NamePool {
    pub fn new() -> Self {
        NamePool {
            chunks: vec![Vec::with_capacity(CHUNK_SIZE)],
        }
    }

    /// Interns `name`, truncating to 100 bytes unless `is_extended`.
    /// Allocates a fresh 1 MiB chunk if the current one lacks room for
    /// `name.len() + 2` bytes (payload + NUL + one byte of slack).
    pub fn intern(&mut self, name: &[u8], is_extended: bool) -> CoreResult<NameRef> {
        let name = if !is_extended && name.len() > 100 {
            &name[..100]
        } else {
            name
        };
        if name.len() > MAX_NAME_LEN {
            return Err(CoreError::NamePoolOverflow);
        }
        self.store(name)
    }

    /// Stores `"<link_name> -> <target>"`.
    pub fn intern_link(&mut self, target: &[u8], link_name: &[u8]) -> CoreResult<NameRef> {
        let mut combined = Vec::with_capacity(link_name.len() + 4 + target.len());
        combined.extend_from_slice(link_name);
        combined.extend_from_slice(b" -> ");
        combined.extend_from_slice(target);
        if combined.len() > MAX_NAME_LEN {
            return Err(CoreError::NamePoolOverflow);
        }
        self.store(&combined)
    }

    fn store(&mut self, bytes: &[u8]) -> CoreResult<NameRef> {
        let needed = bytes.len() + 2;
        let current = self.chunks.last().unwrap();
        if current.capacity() - current.len() < needed {
            self.chunks.push(Vec::with_capacity(CHUNK_SIZE.max(needed)));
        }
        let chunk_idx = self.chunks.len() - 1;
        let chunk = self.chunks.last_mut().unwrap();
        let offset = chunk.len();
        chunk.extend_from_slice(bytes);
        chunk.push(0);
        Ok(NameRef {
            chunk: chunk_idx as u32,
            offset: offset as u32,
            len: bytes.len() as u32,
        })
    }

    pub fn get(&self, r: NameRef) -> &[u8] {
        let chunk = &self.chunks[r.chunk as usize];
        let start = r.offset as usize;
        let end = start + r.len as usize;
        &chunk[start..end]
    }

    pub fn get_str(&self, r: NameRef) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(self.get(r))
    }
}

impl Default for NamePool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interns_and_retrieves() {
        let mut pool = NamePool::new();
        let a = pool.intern(b"hello.txt", false).unwrap();
        let b = pool.intern(b"world.txt", false).unwrap();
        assert_eq!(pool.get(a), b"hello.txt");
        assert_eq!(pool.get(b), b"world.txt");
    }

    #[test]
    fn truncates_short_names_unless_extended() {
        let mut pool = NamePool::new();
        let long = vec![b'a'; 150];
        let short = pool.intern(&long, false).unwrap();
        assert_eq!(pool.get(short).len(), 100);
        let full = pool.intern(&long, true).unwrap();
        assert_eq!(pool.get(full).len(), 150);
    }

    #[test]
    fn link_form() {
        let mut pool = NamePool::new();
        let r = pool.intern_link(b"target", b"link").unwrap();
        assert_eq!(pool.get(r), b"link -> target");
    }

    #[test]
    fn handles_survive_chunk_growth() {
        let mut pool = NamePool::new();
        let first = pool.intern(b"first", false).unwrap();
        // force many chunk allocations
        for i in 0..20_000 {
            let name = format!("padding-name-{i:06}");
            pool.intern(name.as_bytes(), false).unwrap();
        }
        assert_eq!(pool.get(first), b"first");
    }

    #[test]
    fn overflow_is_fatal() {
        let mut pool = NamePool::new();
        let huge = vec![b'a'; 600];
        assert!(pool.intern(&huge, true).is_err());
    }
}
