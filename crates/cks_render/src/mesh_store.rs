//! GPU-resident meshes addressed by a small integer id.
//!
//! The scene core only ever sees the id and index count; the buffers stay here.

use wgpu::util::DeviceExt;

use crate::vertex::{InstanceRaw, MeshVertex};

pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
    byte_size: u64,
}

#[derive(Default)]
pub struct MeshStore {
    meshes: Vec<GpuMesh>,
}

impl MeshStore {
    pub fn new() -> Self {
        Self { meshes: Vec::new() }
    }

    /// Upload a mesh and return its id.
    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        label: &str,
        vertices: &[MeshVertex],
        indices: &[u32],
    ) -> u32 {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Vertex Buffer")),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Index Buffer")),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let byte_size = std::mem::size_of_val(vertices) as u64 + std::mem::size_of_val(indices) as u64;

        let id = self.meshes.len() as u32;
        self.meshes.push(GpuMesh {
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
            byte_size,
        });
        log::debug!(
            "Uploaded mesh '{}' as #{} ({} vertices, {} indices)",
            label,
            id,
            vertices.len(),
            indices.len()
        );
        id
    }

    pub fn get(&self, id: u32) -> Option<&GpuMesh> {
        self.meshes.get(id as usize)
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn clear(&mut self) {
        self.meshes.clear();
    }

    pub fn estimate_memory_mb(&self) -> f32 {
        let bytes: u64 = self.meshes.iter().map(|m| m.byte_size).sum();
        bytes as f32 / (1024.0 * 1024.0)
    }
}

/// Per-frame instance stream. Grows (power-of-two) but never shrinks.
pub struct InstanceBuffer {
    pub buffer: wgpu::Buffer,
    capacity: usize,
}

impl InstanceBuffer {
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            buffer: create_instance_buffer(device, 1),
            capacity: 1,
        }
    }

    pub fn write(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, instances: &[InstanceRaw]) {
        if instances.len() > self.capacity {
            self.capacity = instances.len().next_power_of_two();
            self.buffer = create_instance_buffer(device, self.capacity);
        }
        if !instances.is_empty() {
            queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(instances));
        }
    }
}

fn create_instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    let byte_len = (capacity * std::mem::size_of::<InstanceRaw>()).max(1) as u64;
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Scene Instance Buffer"),
        size: byte_len,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}
