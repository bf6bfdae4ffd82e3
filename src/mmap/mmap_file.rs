use memmap2::{Mmap, MmapOptions};
use std::fs::File;
use std::path::Path;
use crate::core::error::Result;

/// Read-only memory-mapped store file for zero-copy reads
pub struct MmapFile {
    mmap: Mmap,
    len: usize,
}

impl MmapFile {
    /// Maps the whole file. The file must not be empty; callers fall back to
    /// an owned buffer for zero-length stores.
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        let len = file.metadata()?.len() as usize;

        // SAFETY: segment files are written once and never modified while mapped
        let mmap = unsafe { MmapOptions::new().len(len).map(&file)? };

        Ok(MmapFile { mmap, len })
    }

    pub fn data(&self) -> &[u8] {
        &self.mmap[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn maps_file_contents() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"\x03abc").unwrap();
        file.flush().unwrap();

        let mapped = MmapFile::open_read_only(file.path()).unwrap();
        assert_eq!(mapped.len(), 4);
        assert_eq!(mapped.data(), b"\x03abc");
    }
}
