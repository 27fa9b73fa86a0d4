//! Geometry buffers: memoized vertex array objects.
//!
//! A draw needs a VAO describing which buffers feed which attributes. The
//! recorder resolves the currently bound vertex/index buffers plus the
//! pipeline's vertex-input layout to a [`GeometryKey`] and asks the
//! [`GeometryCache`] for a matching [`GeometryBuffer`]. VAOs are created on
//! the context the first time a stream referencing the entry is replayed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::CoreError;
use crate::events::{DestructionLog, SubscriberId};
use crate::format::{attrib_format, AttribFormat};
use crate::handle::{Handle, HandleAllocator, ResourceKind};
use crate::pipeline::VertexInputState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexBufferBinding {
    pub slot: u32,
    pub buffer: Handle,
    pub gl_name: u32,
    pub offset: u64,
}

/// The element buffer only; index offset and type travel with each draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexBufferBinding {
    pub buffer: Handle,
    pub gl_name: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GeometryKey {
    /// Sorted by slot.
    pub vertex_buffers: Vec<VertexBufferBinding>,
    pub index_buffer: Option<IndexBufferBinding>,
    pub vertex_input_hash: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexBufferSlot {
    pub binding: u32,
    pub buffer: u32,
    pub offset: u64,
    pub stride: u32,
    pub divisor: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttrib {
    pub location: u32,
    pub binding: u32,
    pub format: AttribFormat,
    pub relative_offset: u32,
}

/// Everything needed to build the VAO.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeometryLayout {
    pub buffers: Vec<VertexBufferSlot>,
    pub attributes: Vec<VertexAttrib>,
    pub element_buffer: Option<u32>,
}

impl GeometryLayout {
    pub fn build(key: &GeometryKey, input: &VertexInputState) -> Result<Self, CoreError> {
        let mut buffers = Vec::with_capacity(input.bindings.len());
        for desc in &input.bindings {
            let bound = key
                .vertex_buffers
                .iter()
                .find(|b| b.slot == desc.binding)
                .ok_or_else(|| {
                    CoreError::InvalidPipeline(format!(
                        "vertex binding {} has no buffer bound",
                        desc.binding
                    ))
                })?;
            buffers.push(VertexBufferSlot {
                binding: desc.binding,
                buffer: bound.gl_name,
                offset: bound.offset,
                stride: desc.stride,
                divisor: u32::from(desc.per_instance),
            });
        }

        let attributes = input
            .attributes
            .iter()
            .map(|attr| {
                let format = attrib_format(attr.format)
                    .ok_or_else(|| CoreError::UnsupportedFormat(format!("{:?}", attr.format)))?;
                Ok(VertexAttrib {
                    location: attr.location,
                    binding: attr.binding,
                    format,
                    relative_offset: attr.offset,
                })
            })
            .collect::<Result<Vec<_>, CoreError>>()?;

        Ok(Self {
            buffers,
            attributes,
            element_buffer: key.index_buffer.map(|b| b.gl_name),
        })
    }
}

/// VAO names whose geometry buffer is gone; deleted on the next replay.
#[derive(Debug, Default)]
pub struct RetiredVaos {
    names: Mutex<Vec<u32>>,
}

impl RetiredVaos {
    pub fn push(&self, name: u32) {
        self.names.lock().push(name);
    }

    pub fn take(&self) -> Vec<u32> {
        std::mem::take(&mut *self.names.lock())
    }

    pub fn len(&self) -> usize {
        self.names.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.lock().is_empty()
    }
}

pub struct GeometryBuffer {
    id: u64,
    key: GeometryKey,
    layout: GeometryLayout,
    dependencies: Vec<Handle>,
    cached: bool,
    vao: Mutex<Option<u32>>,
    retired: Arc<RetiredVaos>,
}

impl GeometryBuffer {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn key(&self) -> &GeometryKey {
        &self.key
    }

    pub fn layout(&self) -> &GeometryLayout {
        &self.layout
    }

    /// False when the cache was full and this entry is owned only by its users.
    pub fn is_cached(&self) -> bool {
        self.cached
    }

    pub fn depends_on(&self, handle: Handle) -> bool {
        self.dependencies.contains(&handle)
    }

    /// The VAO, once materialised on the context.
    pub fn vao(&self) -> Option<u32> {
        *self.vao.lock()
    }

    pub fn set_vao(&self, name: u32) {
        if let Some(previous) = self.vao.lock().replace(name) {
            self.retired.push(previous);
        }
    }
}

impl std::fmt::Debug for GeometryBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeometryBuffer")
            .field("id", &self.id)
            .field("cached", &self.cached)
            .field("vao", &self.vao())
            .finish()
    }
}

impl Drop for GeometryBuffer {
    fn drop(&mut self) {
        if let Some(name) = self.vao.get_mut().take() {
            self.retired.push(name);
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GeometryCacheStats {
    pub created: u64,
    pub transient: u64,
    pub evicted: u64,
}

/// Device-wide geometry buffer cache.
pub struct GeometryCache {
    entries: DashMap<GeometryKey, Arc<GeometryBuffer>>,
    log: Arc<DestructionLog>,
    subscriber: SubscriberId,
    ids: Arc<HandleAllocator>,
    retired: Arc<RetiredVaos>,
    capacity: usize,
    created: AtomicU64,
    transient: AtomicU64,
    evicted: AtomicU64,
}

impl GeometryCache {
    pub fn new(log: Arc<DestructionLog>, ids: Arc<HandleAllocator>, capacity: usize) -> Self {
        let subscriber = log.subscribe();
        Self {
            entries: DashMap::new(),
            log,
            subscriber,
            ids,
            retired: Arc::new(RetiredVaos::default()),
            capacity,
            created: AtomicU64::new(0),
            transient: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
        }
    }

    /// Drop entries that depend on a resource destroyed since the last call.
    pub fn evict_destroyed(&self) {
        let destroyed = self.log.poll(self.subscriber);
        if destroyed.is_empty() {
            return;
        }
        let before = self.entries.len();
        self.entries
            .retain(|_, geometry| !destroyed.iter().any(|h| geometry.depends_on(*h)));
        let evicted = before.saturating_sub(self.entries.len());
        if evicted > 0 {
            debug!("evicted {} geometry buffers", evicted);
            self.evicted.fetch_add(evicted as u64, Ordering::Relaxed);
        }
    }

    pub fn find(&self, key: &GeometryKey) -> Option<Arc<GeometryBuffer>> {
        self.evict_destroyed();
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Register a new entry under `key`. Over capacity the entry is returned
    /// without being cached.
    pub fn create(
        &self,
        key: GeometryKey,
        layout: GeometryLayout,
        dependencies: Vec<Handle>,
    ) -> Arc<GeometryBuffer> {
        self.evict_destroyed();
        let cached = self.entries.len() < self.capacity;
        let geometry = Arc::new(GeometryBuffer {
            id: self.ids.alloc(ResourceKind::GeometryBuffer).id,
            key: key.clone(),
            layout,
            dependencies,
            cached,
            vao: Mutex::new(None),
            retired: self.retired.clone(),
        });
        self.created.fetch_add(1, Ordering::Relaxed);

        if !cached {
            self.transient.fetch_add(1, Ordering::Relaxed);
            debug!(id = geometry.id, "geometry cache full, entry is transient");
            return geometry;
        }
        debug!(id = geometry.id, "geometry buffer created");
        self.entries.entry(key).or_insert(geometry).value().clone()
    }

    /// Cache hit, or build the layout and create. The flag is true on creation.
    pub fn find_or_create(
        &self,
        key: GeometryKey,
        input: &VertexInputState,
        dependencies: Vec<Handle>,
    ) -> Result<(Arc<GeometryBuffer>, bool), CoreError> {
        if let Some(found) = self.find(&key) {
            return Ok((found, false));
        }
        let layout = GeometryLayout::build(&key, input)?;
        Ok((self.create(key, layout, dependencies), true))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> GeometryCacheStats {
        GeometryCacheStats {
            created: self.created.load(Ordering::Relaxed),
            transient: self.transient.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
        }
    }

    /// VAO names to delete on the context.
    pub fn take_retired(&self) -> Vec<u32> {
        self.retired.take()
    }

    pub fn retired(&self) -> &Arc<RetiredVaos> {
        &self.retired
    }
}

impl Drop for GeometryCache {
    fn drop(&mut self) {
        self.log.unsubscribe(self.subscriber);
    }
}
