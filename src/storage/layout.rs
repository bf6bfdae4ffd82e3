use std::path::PathBuf;
use std::fs;
use crate::core::error::Result;
use crate::core::types::SegmentId;

/// Directory structure for segment files
#[derive(Debug, Clone)]
pub struct StorageLayout {
    pub base_dir: PathBuf,      // Root directory
    pub segments_dir: PathBuf,  // One sub-directory per segment
}

impl StorageLayout {
    pub fn new(base_dir: PathBuf) -> Result<Self> {
        let segments_dir = base_dir.join("segments");
        fs::create_dir_all(&segments_dir)?;

        Ok(StorageLayout {
            base_dir,
            segments_dir,
        })
    }

    pub fn segment_dir(&self, id: SegmentId) -> PathBuf {
        self.segments_dir.join(format!("{:08}", id.0))
    }

    pub fn create_segment_dir(&self, id: SegmentId) -> Result<PathBuf> {
        let dir = self.segment_dir(id);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Token records of one field
    pub fn object_path(&self, id: SegmentId, field: &str) -> PathBuf {
        self.segment_dir(id).join(format!("{}.object", field))
    }

    /// Term strings referenced by the object store
    pub fn term_path(&self, id: SegmentId, field: &str) -> PathBuf {
        self.segment_dir(id).join(format!("{}.term", field))
    }

    /// Dictionary, postings and document table (bincode + crc32)
    pub fn postings_path(&self, id: SegmentId, field: &str) -> PathBuf {
        self.segment_dir(id).join(format!("{}.postings", field))
    }

    pub fn meta_path(&self, id: SegmentId) -> PathBuf {
        self.segment_dir(id).join("segment.meta")
    }

    /// Segment ids present on disk, ascending.
    pub fn list_segments(&self) -> Result<Vec<SegmentId>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.segments_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(id) = entry.file_name().to_str().and_then(|name| name.parse::<u32>().ok()) {
                ids.push(SegmentId(id));
            }
        }
        ids.sort();
        Ok(ids)
    }
}
