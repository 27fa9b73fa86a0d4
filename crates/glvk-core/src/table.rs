use std::collections::HashMap;
use std::sync::Arc;

use crate::geometry::GeometryBuffer;
use crate::memory::DeviceMemory;
use crate::resource::Event;

/// Objects a finished stream refers to by id rather than by GL name.
///
/// Ids are device-unique, so splicing one table into another is a plain
/// union; no record needs rebasing.
#[derive(Debug, Clone, Default)]
pub struct ResourceTable {
    geometry: HashMap<u64, Arc<GeometryBuffer>>,
    events: HashMap<u64, Arc<Event>>,
    memories: HashMap<u64, Arc<DeviceMemory>>,
}

impl ResourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id to encode.
    pub fn add_geometry(&mut self, geometry: Arc<GeometryBuffer>) -> u64 {
        let id = geometry.id();
        self.geometry.entry(id).or_insert(geometry);
        id
    }

    pub fn geometry(&self, id: u64) -> Option<&Arc<GeometryBuffer>> {
        self.geometry.get(&id)
    }

    pub fn add_event(&mut self, event: Arc<Event>) -> u64 {
        let id = event.handle.id;
        self.events.entry(id).or_insert(event);
        id
    }

    pub fn event(&self, id: u64) -> Option<&Arc<Event>> {
        self.events.get(&id)
    }

    pub fn add_memory(&mut self, memory: Arc<DeviceMemory>) -> u64 {
        let id = memory.handle().id;
        self.memories.entry(id).or_insert(memory);
        id
    }

    pub fn memory(&self, id: u64) -> Option<&Arc<DeviceMemory>> {
        self.memories.get(&id)
    }

    pub fn union(&mut self, other: &ResourceTable) {
        for (id, geometry) in &other.geometry {
            self.geometry.entry(*id).or_insert_with(|| geometry.clone());
        }
        for (id, event) in &other.events {
            self.events.entry(*id).or_insert_with(|| event.clone());
        }
        for (id, memory) in &other.memories {
            self.memories.entry(*id).or_insert_with(|| memory.clone());
        }
    }

    pub fn geometry_count(&self) -> usize {
        self.geometry.len()
    }

    pub fn len(&self) -> usize {
        self.geometry.len() + self.events.len() + self.memories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.geometry.clear();
        self.events.clear();
        self.memories.clear();
    }
}
