//! Kernel readahead hints for the memory-mapped backing file.
//!
//! Grounded on the corpus's use of `libc::madvise`/`posix_fadvise` for
//! the same purpose (`fcoreutils` hash core). Linux-only; a no-op
//! elsewhere, since `MADV_WILLNEED` has no portable equivalent here.
#[cfg(target_os = "linux")]
pub fn advise_willneed(mmap: &memmap2::Mmap, offset: usize, len: usize) {
    if len == 0 {
        return;
    }
    unsafe {
        let ptr = mmap.as_ptr().add(offset) as *mut libc::c_void;
        libc::madvise(ptr, len, libc::MADV_WILLNEED);
    }
}

#[cfg(not(target_os = "linux"))]
pub fn advise_willneed(_mmap: &memmap2::Mmap, _offset: usize, _len: usize) {}

/// Same hint issued against a plain file descriptor, for the digest
/// worker pool's positional reads rather than the mmap'd walk.
#[cfg(target_os = "linux")]
pub fn advise_willneed_fd(file: &std::fs::File, offset: u64, len: u64) {
    use std::os::unix::io::AsRawFd;
    unsafe {
        libc::posix_fadvise(
            file.as_raw_fd(),
            offset as libc::off_t,
            len as libc::off_t,
            libc::POSIX_FADV_WILLNEED,
        );
    }
}

#[cfg(not(target_os = "linux"))]
pub fn advise_willneed_fd(_file: &std::fs::File, _offset: u64, _len: u64) {}
