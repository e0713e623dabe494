// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Named byte-addressable shared regions.
//!
//! The process image is parameterized over [`SharedRegionFactory`] so the
//! cycle engine runs against real POSIX shared memory in production
//! ([`ShmFactory`], files under `/dev/shm` mapped with `memmap2`) and
//! against plain heap buffers in tests ([`MemFactory`]).
//!
//! Region objects survive the process: dropping a [`ShmRegion`] unmaps and
//! closes, but the backing object stays in place so an external reader keeps
//! its view and a restarted instance can adopt it.

use std::fs::OpenOptions;
use std::path::PathBuf;

use memmap2::MmapMut;

use crate::error::{ImageError, ImageResult};

// =============================================================================
// SharedRegion
// =============================================================================

/// How to treat a pre-existing object of the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateMode {
    /// Fail if the object already exists.
    Exclusive,
    /// Open the existing object, creating it if absent.
    Adopt,
}

/// A named, byte-addressable region shared with external readers.
pub trait SharedRegion: Send {
    /// The region's object name.
    fn name(&self) -> &str;

    /// Size in bytes.
    fn len(&self) -> usize;

    /// Returns `true` for zero-sized regions.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The region's bytes.
    fn as_slice(&self) -> &[u8];

    /// The region's bytes, writable.
    fn as_mut_slice(&mut self) -> &mut [u8];
}

/// Creates [`SharedRegion`] instances.
pub trait SharedRegionFactory {
    /// Creates (or adopts) a region of `len` bytes named `name`.
    fn create(&self, name: &str, len: usize, mode: CreateMode) -> ImageResult<Box<dyn SharedRegion>>;
}

// =============================================================================
// ShmRegion
// =============================================================================

/// A region backed by a file under a tmpfs directory, mapped read-write.
pub struct ShmRegion {
    name: String,
    // Held so the descriptor outlives the mapping.
    _file: std::fs::File,
    map: Option<MmapMut>,
    len: usize,
}

impl SharedRegion for ShmRegion {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> usize {
        self.len
    }

    fn as_slice(&self) -> &[u8] {
        self.map.as_ref().map(|m| &m[..]).unwrap_or(&[])
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        self.map.as_mut().map(|m| &mut m[..]).unwrap_or(&mut [])
    }
}

impl std::fmt::Debug for ShmRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShmRegion")
            .field("name", &self.name)
            .field("len", &self.len)
            .finish()
    }
}

/// Factory for [`ShmRegion`] objects under a base directory.
#[derive(Debug, Clone)]
pub struct ShmFactory {
    base: PathBuf,
}

impl ShmFactory {
    /// Factory rooted at `/dev/shm`, the POSIX shared-memory namespace.
    pub fn new() -> Self {
        Self {
            base: PathBuf::from("/dev/shm"),
        }
    }

    /// Factory rooted at an explicit directory.
    pub fn with_base(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }
}

impl Default for ShmFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedRegionFactory for ShmFactory {
    fn create(&self, name: &str, len: usize, mode: CreateMode) -> ImageResult<Box<dyn SharedRegion>> {
        let path = self.base.join(name);

        let mut options = OpenOptions::new();
        options.read(true).write(true);
        match mode {
            CreateMode::Exclusive => options.create_new(true),
            CreateMode::Adopt => options.create(true),
        };

        let file = options.open(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                ImageError::AlreadyExists {
                    name: name.to_string(),
                }
            } else {
                ImageError::os(name, e)
            }
        })?;

        file.set_len(len as u64).map_err(|e| ImageError::os(name, e))?;

        // A zero-length mapping is not representable; an empty region simply
        // has no mapping.
        let map = if len > 0 {
            // SAFETY: the file was just sized to `len` and the descriptor is
            // held for the mapping's whole lifetime.
            let map = unsafe { MmapMut::map_mut(&file) }.map_err(|e| ImageError::os(name, e))?;
            Some(map)
        } else {
            None
        };

        tracing::debug!(name, len, ?mode, "shared memory region mapped");

        Ok(Box::new(ShmRegion {
            name: name.to_string(),
            _file: file,
            map,
            len,
        }))
    }
}

// =============================================================================
// MemRegion
// =============================================================================

/// An in-process heap-backed region for tests.
#[derive(Debug)]
pub struct MemRegion {
    name: String,
    data: Vec<u8>,
}

impl SharedRegion for MemRegion {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn as_slice(&self) -> &[u8] {
        &self.data
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

/// Factory for [`MemRegion`] objects.
#[derive(Debug, Default, Clone)]
pub struct MemFactory;

impl SharedRegionFactory for MemFactory {
    fn create(&self, name: &str, len: usize, _mode: CreateMode) -> ImageResult<Box<dyn SharedRegion>> {
        Ok(Box::new(MemRegion {
            name: name.to_string(),
            data: vec![0; len],
        }))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_name(tag: &str) -> String {
        use std::sync::atomic::{AtomicU32, Ordering};
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        format!(
            "wisp_test_{}_{}_{}",
            std::process::id(),
            tag,
            COUNTER.fetch_add(1, Ordering::Relaxed)
        )
    }

    fn temp_factory() -> ShmFactory {
        ShmFactory::with_base(std::env::temp_dir())
    }

    #[test]
    fn mem_region_round_trip() {
        let factory = MemFactory;
        let mut region = factory.create("test", 8, CreateMode::Exclusive).unwrap();
        assert_eq!(region.len(), 8);
        assert!(region.as_slice().iter().all(|b| *b == 0));

        region.as_mut_slice()[3] = 0xAB;
        assert_eq!(region.as_slice()[3], 0xAB);
    }

    #[test]
    fn shm_region_round_trip() {
        let factory = temp_factory();
        let name = unique_name("rw");

        let mut region = factory.create(&name, 16, CreateMode::Exclusive).unwrap();
        region.as_mut_slice()[0] = 7;
        region.as_mut_slice()[15] = 9;
        assert_eq!(region.as_slice()[0], 7);
        assert_eq!(region.as_slice()[15], 9);

        drop(region);
        std::fs::remove_file(std::env::temp_dir().join(&name)).unwrap();
    }

    #[test]
    fn exclusive_create_rejects_existing() {
        let factory = temp_factory();
        let name = unique_name("excl");

        let first = factory.create(&name, 4, CreateMode::Exclusive).unwrap();
        let err = factory
            .create(&name, 4, CreateMode::Exclusive)
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(err, ImageError::AlreadyExists { .. }));

        drop(first);
        std::fs::remove_file(std::env::temp_dir().join(&name)).unwrap();
    }

    #[test]
    fn adopt_reuses_existing_object() {
        let factory = temp_factory();
        let name = unique_name("adopt");

        let mut first = factory.create(&name, 4, CreateMode::Exclusive).unwrap();
        first.as_mut_slice()[0] = 42;
        drop(first);

        // The object survived the drop; adoption sees the old contents.
        let adopted = factory.create(&name, 4, CreateMode::Adopt).unwrap();
        assert_eq!(adopted.as_slice()[0], 42);

        drop(adopted);
        std::fs::remove_file(std::env::temp_dir().join(&name)).unwrap();
    }

    #[test]
    fn zero_sized_region_is_empty() {
        let factory = temp_factory();
        let name = unique_name("zero");

        let region = factory.create(&name, 0, CreateMode::Exclusive).unwrap();
        assert!(region.is_empty());
        assert!(region.as_slice().is_empty());

        drop(region);
        std::fs::remove_file(std::env::temp_dir().join(&name)).unwrap();
    }
}
