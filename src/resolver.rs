//! External resolver collaborator: maps a user-supplied path (and, for
//! HSM-backed archives, a copy number) to a backing file and the byte
//! range the tar stream actually occupies within it.
//!
//! A real HSM catalog service is out of scope; [`LocalPathResolver`]
//! treats the CLI argument as already resolved, and [`StubSamResolver`]
//! exercises the `--sam` wiring end to end against the same local file
//! without depending on an external metadata service.
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone)]
pub struct Resolved {
    pub backing_path: PathBuf,
    pub start_offset_bytes: u64,
    pub total_bytes: u64,
}

pub trait Resolver {
    fn resolve(&self, logical_name: &str, copy: Option<i32>) -> CoreResult<Resolved>;
}

/// Default resolver: the archive is the file at the given path, with no
/// wrapping offset. `start_offset_bytes` is filled in separately by the
/// `--wrapped` flag, not by this resolver.
pub struct LocalPathResolver;

impl Resolver for LocalPathResolver {
    fn resolve(&self, logical_name: &str, _copy: Option<i32>) -> CoreResult<Resolved> {
        let path = Path::new(logical_name);
        let total_bytes = fs::metadata(path)
            .map_err(|e| CoreError::BackingOpenFailed {
                path: logical_name.to_string(),
                source: e,
            })?
            .len();
        Ok(Resolved {
            backing_path: path.to_path_buf(),
            start_offset_bytes: 0,
            total_bytes,
        })
    }
}

/// Stands in for the HSM metadata library: only copy 1 is supported, and
/// it resolves to the supplied path itself (there being no real on-media
/// catalog available here).
pub struct StubSamResolver;

impl Resolver for StubSamResolver {
    fn resolve(&self, logical_name: &str, copy: Option<i32>) -> CoreResult<Resolved> {
        let copy = copy.unwrap_or(1);
        if copy != 1 {
            return Err(CoreError::UnsupportedSamCopy(copy));
        }
        LocalPathResolver.resolve(logical_name, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn local_resolver_reports_file_size() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"hello").unwrap();
        tmp.flush().unwrap();
        let path = tmp.path().to_string_lossy().into_owned();
        let resolved = LocalPathResolver.resolve(&path, None).unwrap();
        assert_eq!(resolved.total_bytes, 5);
        assert_eq!(resolved.start_offset_bytes, 0);
    }

    #[test]
    fn sam_resolver_rejects_non_one_copy() {
        let err = StubSamResolver.resolve("/dev/null", Some(2)).unwrap_err();
        assert!(matches!(err, CoreError::UnsupportedSamCopy(2)));
    }
}
