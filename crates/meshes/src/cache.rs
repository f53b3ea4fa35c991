//! Reference-counted tile mesh cache.
//!
//! Maps mesh paths to device-resident meshes and deduplicates loads. The
//! cache is the only component that creates or destroys device buffers; every
//! other system holds a [`MeshId`] plus a counted reference.

use crate::loader::MeshSource;
use crate::mesh::MeshData;
use crate::MeshError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Stable integer handle for a cached mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub u32);

/// Opaque handle to device vertex/index buffers, minted by a [`MeshDevice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GpuMeshHandle(pub u64);

/// Device side of the cache: allocates and frees GPU buffers. A wgpu-backed
/// renderer implements this; tests and headless runs use [`NullDevice`].
pub trait MeshDevice: Send {
    fn upload(&mut self, data: &MeshData) -> Result<GpuMeshHandle, MeshError>;
    fn free(&mut self, handle: GpuMeshHandle);
}

/// Device that allocates nothing but tracks live handle count, for tests and
/// headless simulation.
#[derive(Default)]
pub struct NullDevice {
    next: u64,
    live: Arc<AtomicUsize>,
}

impl NullDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared live-allocation counter; stays valid after the device moves
    /// into the cache.
    pub fn live_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.live)
    }
}

impl MeshDevice for NullDevice {
    fn upload(&mut self, _data: &MeshData) -> Result<GpuMeshHandle, MeshError> {
        self.next += 1;
        self.live.fetch_add(1, Ordering::Relaxed);
        Ok(GpuMeshHandle(self.next))
    }

    fn free(&mut self, _handle: GpuMeshHandle) {
        self.live.fetch_sub(1, Ordering::Relaxed);
    }
}

struct MeshRecord {
    path: PathBuf,
    handle: GpuMeshHandle,
    vertex_count: usize,
    index_count: usize,
    ref_count: u32,
}

struct CacheState {
    device: Box<dyn MeshDevice>,
    source: Box<dyn MeshSource + Send>,
    records: HashMap<MeshId, MeshRecord>,
    path_to_id: HashMap<PathBuf, MeshId>,
    next_id: u32,
}

/// Shared mesh store. All operations serialize on a single mutex; reference
/// count mutations are atomic with the path map.
pub struct TileMeshCache {
    state: Mutex<CacheState>,
}

/// Read-only view of a cached record.
#[derive(Debug, Clone)]
pub struct MeshInfo {
    pub path: PathBuf,
    pub handle: GpuMeshHandle,
    pub vertex_count: usize,
    pub index_count: usize,
    pub ref_count: u32,
}

impl TileMeshCache {
    pub fn new(device: Box<dyn MeshDevice>, source: Box<dyn MeshSource + Send>) -> Self {
        Self {
            state: Mutex::new(CacheState {
                device,
                source,
                records: HashMap::new(),
                path_to_id: HashMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Return an existing mesh id for `path` (bumping its reference count) or
    /// load the mesh and create a new record.
    pub fn load(&self, path: &Path) -> Result<MeshId, MeshError> {
        let mut state = self.state.lock().expect("mesh cache poisoned");

        if let Some(&id) = state.path_to_id.get(path) {
            let record = state.records.get_mut(&id).expect("path map out of sync");
            record.ref_count += 1;
            return Ok(id);
        }

        let data = state.source.load(path)?;
        let handle = state.device.upload(&data)?;
        let id = MeshId(state.next_id);
        state.next_id += 1;
        state.records.insert(
            id,
            MeshRecord {
                path: path.to_path_buf(),
                handle,
                vertex_count: data.vertex_count(),
                index_count: data.indices.len(),
                ref_count: 1,
            },
        );
        state.path_to_id.insert(path.to_path_buf(), id);
        log::debug!("mesh cache: loaded {} as {:?}", path.display(), id);
        Ok(id)
    }

    /// Take an extra reference to an already-resident mesh (aliasing).
    pub fn add_reference(&self, id: MeshId) -> Result<(), MeshError> {
        let mut state = self.state.lock().expect("mesh cache poisoned");
        let record = state.records.get_mut(&id).ok_or(MeshError::UnknownId(id))?;
        record.ref_count += 1;
        Ok(())
    }

    /// Drop one reference. On the last release the device buffers are freed
    /// and the path mapping removed; returns true in that case.
    pub fn release(&self, id: MeshId) -> Result<bool, MeshError> {
        let mut state = self.state.lock().expect("mesh cache poisoned");
        let record = state.records.get_mut(&id).ok_or(MeshError::UnknownId(id))?;
        record.ref_count = record.ref_count.saturating_sub(1);
        if record.ref_count > 0 {
            return Ok(false);
        }
        let record = state.records.remove(&id).expect("record vanished");
        state.path_to_id.remove(&record.path);
        state.device.free(record.handle);
        log::debug!("mesh cache: freed {:?} ({})", id, record.path.display());
        Ok(true)
    }

    /// Unload regardless of outstanding references. Editor/tool use only;
    /// dangling ids will fail with `UnknownId` afterwards.
    pub fn force_unload(&self, id: MeshId) -> Result<(), MeshError> {
        let mut state = self.state.lock().expect("mesh cache poisoned");
        let record = state.records.remove(&id).ok_or(MeshError::UnknownId(id))?;
        log::warn!(
            "mesh cache: force unload of {:?} ({}) with {} live references",
            id,
            record.path.display(),
            record.ref_count
        );
        state.path_to_id.remove(&record.path);
        state.device.free(record.handle);
        Ok(())
    }

    /// Snapshot of a record, if resident.
    pub fn info(&self, id: MeshId) -> Option<MeshInfo> {
        let state = self.state.lock().expect("mesh cache poisoned");
        state.records.get(&id).map(|r| MeshInfo {
            path: r.path.clone(),
            handle: r.handle,
            vertex_count: r.vertex_count,
            index_count: r.index_count,
            ref_count: r.ref_count,
        })
    }

    pub fn resident_count(&self) -> usize {
        self.state.lock().expect("mesh cache poisoned").records.len()
    }

    /// Check the cache invariant: every record with a positive reference
    /// count is reachable through the path map under the same id.
    pub fn check_consistency(&self) -> bool {
        let state = self.state.lock().expect("mesh cache poisoned");
        state.records.iter().all(|(id, r)| {
            r.ref_count > 0 && state.path_to_id.get(&r.path) == Some(id)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSource;

    impl MeshSource for FixedSource {
        fn load(&self, path: &Path) -> Result<MeshData, MeshError> {
            if path.to_string_lossy().contains("missing") {
                return Err(MeshError::FileNotFound(path.to_path_buf()));
            }
            Ok(MeshData::cube())
        }
    }

    fn cache_with_counter() -> (TileMeshCache, Arc<AtomicUsize>) {
        let device = NullDevice::new();
        let counter = device.live_counter();
        (
            TileMeshCache::new(Box::new(device), Box::new(FixedSource)),
            counter,
        )
    }

    #[test]
    fn load_deduplicates_by_path() {
        let (cache, counter) = cache_with_counter();
        let a = cache.load(Path::new("tiles/wall.glb")).unwrap();
        let b = cache.load(Path::new("tiles/wall.glb")).unwrap();
        assert_eq!(a, b);
        assert_eq!(counter.load(Ordering::Relaxed), 1);
        assert_eq!(cache.info(a).unwrap().ref_count, 2);
    }

    /// load + release pairs leave no net GPU allocation.
    #[test]
    fn balanced_load_release_frees_all_buffers() {
        let (cache, counter) = cache_with_counter();
        let id = cache.load(Path::new("tiles/wall.glb")).unwrap();
        cache.add_reference(id).unwrap();
        assert!(!cache.release(id).unwrap());
        assert!(cache.release(id).unwrap());
        assert_eq!(counter.load(Ordering::Relaxed), 0);
        assert_eq!(cache.resident_count(), 0);
        // Re-loading after a full release mints a fresh record.
        let id2 = cache.load(Path::new("tiles/wall.glb")).unwrap();
        assert_ne!(id, id2);
    }

    #[test]
    fn missing_file_surfaces_and_leaves_cache_unchanged() {
        let (cache, counter) = cache_with_counter();
        let err = cache.load(Path::new("tiles/missing.glb")).unwrap_err();
        assert!(matches!(err, MeshError::FileNotFound(_)));
        assert_eq!(counter.load(Ordering::Relaxed), 0);
        assert!(cache.check_consistency());
    }

    #[test]
    fn force_unload_bypasses_reference_count() {
        let (cache, counter) = cache_with_counter();
        let id = cache.load(Path::new("tiles/crate.glb")).unwrap();
        cache.add_reference(id).unwrap();
        cache.force_unload(id).unwrap();
        assert_eq!(counter.load(Ordering::Relaxed), 0);
        assert!(matches!(cache.release(id), Err(MeshError::UnknownId(_))));
    }

    #[test]
    fn consistency_holds_across_mixed_operations() {
        let (cache, _) = cache_with_counter();
        let a = cache.load(Path::new("a.glb")).unwrap();
        let _b = cache.load(Path::new("b.glb")).unwrap();
        cache.load(Path::new("a.glb")).unwrap();
        cache.release(a).unwrap();
        assert!(cache.check_consistency());
    }
}
