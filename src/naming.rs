//! Canonical name allocation.
//!
//! A file captured at 2023-05-01 10:15:30 is named `2023-05-01_101530_NN.ext`, where `NN`
//! is the smallest index (from `01`) whose path is free. A path is taken when a file
//! already sits there or when another worker of the same run has reserved it.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::RenameError;
use crate::timestamp::CaptureTime;

/// Default number of sequence indices tried per second before giving up.
pub const DEFAULT_MAX_SEQUENCE: u32 = 99;

/// Hands out collision-free target paths.
///
/// Checking whether a path exists and renaming onto it are two separate steps, so the
/// allocator remembers every path it hands out. Two workers racing on photos from the
/// same second therefore never pick the same name. Files created by other processes
/// during the run are not accounted for.
#[derive(Debug)]
pub struct NameAllocator {
    max_sequence: u32,
    reserved: Mutex<HashSet<PathBuf>>,
}

impl NameAllocator {
    pub fn new(max_sequence: u32) -> Self {
        Self {
            max_sequence: max_sequence.max(1),
            reserved: Mutex::new(HashSet::new()),
        }
    }

    pub fn max_sequence(&self) -> u32 {
        self.max_sequence
    }

    /// Find the target path for `original`.
    ///
    /// Returns `original` itself when the file already carries the first free
    /// canonical name. The returned path is reserved until [`release`](Self::release)
    /// is called for it.
    pub fn allocate(
        &self,
        directory: &Path,
        time: &CaptureTime,
        extension: &str,
        original: &Path,
    ) -> Result<PathBuf, RenameError> {
        let base = time.base_name();
        let mut reserved = self.reserved.lock().unwrap_or_else(|e| e.into_inner());

        for index in 1..=self.max_sequence {
            let candidate = directory.join(candidate_name(&base, index, extension));
            if candidate == original {
                reserved.insert(candidate.clone());
                return Ok(candidate);
            }
            if reserved.contains(&candidate) || candidate.exists() {
                continue;
            }
            reserved.insert(candidate.clone());
            return Ok(candidate);
        }

        Err(RenameError::AllocationExhausted {
            base,
            extension: extension.to_string(),
            limit: self.max_sequence,
        })
    }

    /// Drop the reservation for `path`, e.g. after the rename onto it failed.
    pub fn release(&self, path: &Path) {
        self.reserved
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(path);
    }
}

impl Default for NameAllocator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SEQUENCE)
    }
}

/// `base_NN.ext`, with the index zero-padded to two digits.
pub fn candidate_name(base: &str, index: u32, extension: &str) -> String {
    format!("{base}_{index:02}.{extension}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timestamp;
    use std::fs;
    use tempfile::TempDir;

    fn time() -> CaptureTime {
        timestamp::parse("2023:05:01 10:15:30").unwrap()
    }

    #[test]
    fn candidate_name_pads_index() {
        assert_eq!(candidate_name("2023-05-01_101530", 1, "jpg"), "2023-05-01_101530_01.jpg");
        assert_eq!(candidate_name("2023-05-01_101530", 42, "mov"), "2023-05-01_101530_42.mov");
        assert_eq!(candidate_name("2023-05-01_101530", 100, "mov"), "2023-05-01_101530_100.mov");
    }

    #[test]
    fn allocate_first_index_in_empty_dir() {
        let dir = TempDir::new().unwrap();
        let original = dir.path().join("IMG_0001.JPG");
        fs::write(&original, b"x").unwrap();

        let allocator = NameAllocator::default();
        let target = allocator.allocate(dir.path(), &time(), "jpg", &original).unwrap();
        assert_eq!(target, dir.path().join("2023-05-01_101530_01.jpg"));
    }

    #[test]
    fn allocate_skips_existing_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("2023-05-01_101530_01.jpg"), b"x").unwrap();
        let original = dir.path().join("IMG_0002.JPG");
        fs::write(&original, b"y").unwrap();

        let allocator = NameAllocator::default();
        let target = allocator.allocate(dir.path(), &time(), "jpg", &original).unwrap();
        assert_eq!(target, dir.path().join("2023-05-01_101530_02.jpg"));
    }

    #[test]
    fn allocate_fills_gaps() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("2023-05-01_101530_01.jpg"), b"x").unwrap();
        fs::write(dir.path().join("2023-05-01_101530_03.jpg"), b"x").unwrap();
        let original = dir.path().join("IMG_0004.JPG");

        let allocator = NameAllocator::default();
        let target = allocator.allocate(dir.path(), &time(), "jpg", &original).unwrap();
        assert_eq!(target, dir.path().join("2023-05-01_101530_02.jpg"));
    }

    #[test]
    fn allocate_other_extension_does_not_collide() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("2023-05-01_101530_01.jpg"), b"x").unwrap();
        let original = dir.path().join("IMG_0005.MOV");

        let allocator = NameAllocator::default();
        let target = allocator.allocate(dir.path(), &time(), "mov", &original).unwrap();
        assert_eq!(target, dir.path().join("2023-05-01_101530_01.mov"));
    }

    #[test]
    fn allocate_returns_self_when_already_canonical() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("2023-05-01_101530_01.jpg");
        let second = dir.path().join("2023-05-01_101530_02.jpg");
        fs::write(&first, b"x").unwrap();
        fs::write(&second, b"y").unwrap();

        let allocator = NameAllocator::default();
        assert_eq!(allocator.allocate(dir.path(), &time(), "jpg", &second).unwrap(), second);
        assert_eq!(allocator.allocate(dir.path(), &time(), "jpg", &first).unwrap(), first);
    }

    #[test]
    fn allocate_honours_reservations() {
        let dir = TempDir::new().unwrap();
        let allocator = NameAllocator::default();

        let a = allocator
            .allocate(dir.path(), &time(), "jpg", &dir.path().join("a.jpg"))
            .unwrap();
        let b = allocator
            .allocate(dir.path(), &time(), "jpg", &dir.path().join("b.jpg"))
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(b, dir.path().join("2023-05-01_101530_02.jpg"));

        allocator.release(&a);
        let c = allocator
            .allocate(dir.path(), &time(), "jpg", &dir.path().join("c.jpg"))
            .unwrap();
        assert_eq!(c, a);
    }

    #[test]
    fn allocate_exhausted() {
        let dir = TempDir::new().unwrap();
        for i in 1..=3 {
            fs::write(dir.path().join(candidate_name("2023-05-01_101530", i, "jpg")), b"x").unwrap();
        }

        let allocator = NameAllocator::new(3);
        let err = allocator
            .allocate(dir.path(), &time(), "jpg", &dir.path().join("IMG.JPG"))
            .unwrap_err();
        match err {
            RenameError::AllocationExhausted { base, limit, .. } => {
                assert_eq!(base, "2023-05-01_101530");
                assert_eq!(limit, 3);
            }
            other => panic!("expected AllocationExhausted, got {other:?}"),
        }
    }
}
