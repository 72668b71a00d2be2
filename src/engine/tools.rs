//! Path and file helpers

use anyhow::{Context, Result};
use memmap2::Mmap;
use std::fs::File;
use std::io::Read;
use std::ops::Deref;
use std::path::{Path, PathBuf};

use crate::utils::config::INPUT_MMAP_THRESHOLD;

/// True if the file name ends with `suffix` (byte comparison, so non-UTF-8 names work too).
pub fn has_suffix(path: &Path, suffix: &str) -> bool {
    path.file_name()
        .is_some_and(|n| n.as_encoded_bytes().ends_with(suffix.as_bytes()))
}

/// Canonicalize the input root and make sure it is a directory.
pub fn check_root_and_canonicalize(path: &Path) -> Result<PathBuf> {
    let root = path
        .canonicalize()
        .with_context(|| format!("canonicalize input root {}", path.display()))?;
    if !root.is_dir() {
        anyhow::bail!("input root is not a directory: {}", root.display());
    }
    Ok(root)
}

/// True if the process is running with effective uid 0 (e.g. via sudo).
#[cfg(unix)]
pub fn running_as_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
pub fn running_as_root() -> bool {
    false
}

/// Whole content of an input file, either on the heap or memory-mapped.
pub enum InputBytes {
    Heap(Vec<u8>),
    Mapped(Mmap),
}

impl Deref for InputBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            InputBytes::Heap(v) => v.as_slice(),
            InputBytes::Mapped(m) => &m[..],
        }
    }
}

/// Read a whole file. Uses a read-only memory map above [`INPUT_MMAP_THRESHOLD`].
pub fn read_input_file(path: &Path) -> std::io::Result<InputBytes> {
    let mut file = File::open(path)?;
    let size = file.metadata()?.len();
    if size > INPUT_MMAP_THRESHOLD {
        // The mapping is only read; input files are not expected to change during a run.
        let mmap = unsafe { Mmap::map(&file)? };
        return Ok(InputBytes::Mapped(mmap));
    }
    let mut buf = Vec::with_capacity(size as usize);
    file.read_to_end(&mut buf)?;
    Ok(InputBytes::Heap(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_matches_file_name_only() {
        assert!(has_suffix(Path::new("/a/b/dump.txt"), ".txt"));
        assert!(!has_suffix(Path::new("/a/b.txt/dump.csv"), ".txt"));
        assert!(!has_suffix(Path::new("/a/b/dump.TXT"), ".txt"));
    }
}
