//! # Buffer State Module
//!
//! A main-thread registry of vertex buffers for terrain meshes. The graphics backend
//! itself is external; this registry hands out opaque [`BufferHandle`]s that the
//! backend maps onto real GPU buffers, accepts write commands carrying the bytes to
//! upload, and keeps analytics so memory use can be reported.
//!
//! ## Architecture
//!
//! Chunks own the handles of their mesh buckets. When new mesh data arrives for a
//! (material, side) bucket that already exists, the chunk keeps its handles and only
//! issues new writes; buckets that vanished are destroyed. The registry is shared as
//! an `StSystem<BufferState>` and must never reach the terrain worker thread.

use std::collections::HashMap;

use bytemuck::NoUninit;

/// Opaque identifier of a buffer owned by the registry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(u64);

impl BufferHandle {
    /// The raw id, for backends that key their own tables by it.
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Analytics data for a buffer
///
/// Tracks memory allocation, usage, and write operations for a buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferAnalytics {
    /// Total memory allocated for the buffer in bytes
    pub allocated_memory: u64,
    /// Memory written by the most recent upload in bytes
    pub used_memory: u64,
    /// Number of times the buffer has been written to
    pub times_written: u64,
}

/// A buffer together with the bytes it currently holds.
#[derive(Debug)]
struct BufferEntry {
    label: String,
    contents: Vec<u8>,
    analytics: BufferAnalytics,
}

/// A request to replace the contents of a buffer starting at `offset`.
#[derive(Debug, Clone)]
pub struct BufferWriteCommand {
    /// Target buffer
    pub handle: BufferHandle,
    /// Byte offset of the write
    pub offset: u64,
    /// Bytes to upload
    pub data: Vec<u8>,
}

impl BufferWriteCommand {
    /// Builds a write command that uploads `data` from the start of the buffer.
    pub fn whole<T: NoUninit>(handle: BufferHandle, data: &[T]) -> Self {
        BufferWriteCommand {
            handle,
            offset: 0,
            data: bytemuck::cast_slice(data).to_vec(),
        }
    }
}

/// Central registry of terrain mesh buffers.
///
/// # Examples
///
/// ```
/// use voxel_world::engine_state::buffer_state::{BufferState, BufferWriteCommand};
///
/// let mut buffer_state = BufferState::new();
/// let handle = buffer_state.create_buffer("positions");
/// buffer_state.write(BufferWriteCommand::whole(handle, &[1.0f32, 2.0, 3.0]));
/// assert_eq!(buffer_state.get_total_used_memory(), 12);
/// ```
#[derive(Debug, Default)]
pub struct BufferState {
    buffers: HashMap<BufferHandle, BufferEntry>,
    next_id: u64,
}

impl BufferState {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty buffer and returns its handle.
    pub fn create_buffer(&mut self, label: &str) -> BufferHandle {
        let handle = BufferHandle(self.next_id);
        self.next_id += 1;
        self.buffers.insert(
            handle,
            BufferEntry {
                label: label.to_string(),
                contents: Vec::new(),
                analytics: BufferAnalytics::default(),
            },
        );
        handle
    }

    /// Writes data into a buffer, growing its allocation when needed.
    ///
    /// Writes to destroyed handles are logged and ignored.
    pub fn write(&mut self, command: BufferWriteCommand) {
        let Some(entry) = self.buffers.get_mut(&command.handle) else {
            log::warn!("Write to unknown buffer {:?} ignored", command.handle);
            return;
        };

        let offset = command.offset as usize;
        let end = offset + command.data.len();
        if entry.contents.len() < end {
            entry.contents.resize(end, 0);
        }
        entry.contents[offset..end].copy_from_slice(&command.data);
        entry.contents.truncate(end);

        entry.analytics.allocated_memory = entry.analytics.allocated_memory.max(end as u64);
        entry.analytics.used_memory = end as u64;
        entry.analytics.times_written += 1;
    }

    /// Releases a buffer. Returns `false` if the handle was unknown.
    pub fn destroy_buffer(&mut self, handle: BufferHandle) -> bool {
        self.buffers.remove(&handle).is_some()
    }

    /// `true` while the handle refers to a live buffer.
    pub fn contains(&self, handle: BufferHandle) -> bool {
        self.buffers.contains_key(&handle)
    }

    /// Current contents of a buffer.
    pub fn contents(&self, handle: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&handle).map(|entry| entry.contents.as_slice())
    }

    /// Debug label given at creation.
    pub fn label(&self, handle: BufferHandle) -> Option<&str> {
        self.buffers.get(&handle).map(|entry| entry.label.as_str())
    }

    /// Analytics of a single buffer.
    pub fn analytics(&self, handle: BufferHandle) -> Option<&BufferAnalytics> {
        self.buffers.get(&handle).map(|entry| &entry.analytics)
    }

    /// Number of live buffers.
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Sum of allocated bytes over all live buffers.
    pub fn get_total_allocated_memory(&self) -> u64 {
        self.buffers
            .values()
            .map(|entry| entry.analytics.allocated_memory)
            .sum()
    }

    /// Sum of used bytes over all live buffers.
    pub fn get_total_used_memory(&self) -> u64 {
        self.buffers
            .values()
            .map(|entry| entry.analytics.used_memory)
            .sum()
    }
}
