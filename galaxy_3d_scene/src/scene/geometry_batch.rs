/// GeometryBatch: fixed-capacity quad staging buffer.
///
/// Accumulates many quads per frame on the CPU and draws them with a
/// single indexed draw call. Capacity is fixed at construction; asking
/// for more quads than fit is an error, never a silent wrap or grow.
///
/// Frame cycle (single writer):
///
/// ```text
/// begin() -> reserve_quads(n) ... -> end() -> submit(cmd)
/// ```
///
/// The quad index pattern (two triangles per quad) is generated once at
/// construction. `end()` uploads only the vertex range written this
/// frame; static indices are uploaded up to the highest quad count seen
/// since the buffers were created.

use std::sync::Arc;
use bytemuck::{Pod, Zeroable};
use crate::device::{
    Buffer, BufferDesc, BufferUsage, CommandList, GraphicsDevice, IndexType,
    VertexAttribute, VertexFormat,
};
use crate::error::{Error, Result};

const VERTICES_PER_QUAD: usize = 4;
const INDICES_PER_QUAD: usize = 6;

/// Vertex used by sprite batches: position, RGBA8 colour, texel coordinate
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct VertexPositionColorTexture {
    pub position: [f32; 3],
    pub color: [u8; 4],
    pub tex_coord: [u16; 2],
}

impl VertexPositionColorTexture {
    pub fn new(position: [f32; 3], color: [u8; 4], tex_coord: [u16; 2]) -> Self {
        Self { position, color, tex_coord }
    }

    /// Vertex layout matching the struct
    pub fn attributes() -> Vec<VertexAttribute> {
        vec![
            VertexAttribute { name: "Position", format: VertexFormat::Float3, offset: 0 },
            VertexAttribute { name: "Color", format: VertexFormat::Byte4Norm, offset: 12 },
            VertexAttribute { name: "TexCoord", format: VertexFormat::UShort2, offset: 16 },
        ]
    }
}

/// Writable view over quads reserved by `GeometryBatch::reserve_quads`.
///
/// Borrows the batch mutably: no other reservation, `begin` or `end` can
/// happen while it is alive.
pub struct QuadReservation<'a, V> {
    vertices: &'a mut [V],
    indices: &'a [u32],
    first_quad: usize,
}

impl<'a, V> QuadReservation<'a, V> {
    /// Number of reserved quads
    pub fn quad_count(&self) -> usize {
        self.vertices.len() / VERTICES_PER_QUAD
    }

    /// Index of the first reserved quad in the batch
    pub fn first_quad(&self) -> usize {
        self.first_quad
    }

    /// All reserved vertices (4 per quad)
    pub fn vertices_mut(&mut self) -> &mut [V] {
        self.vertices
    }

    /// Reserved vertices, one 4-vertex chunk per quad
    pub fn quads_mut(&mut self) -> std::slice::ChunksExactMut<'_, V> {
        self.vertices.chunks_exact_mut(VERTICES_PER_QUAD)
    }

    /// Indices covering the reserved quads (6 per quad, read-only)
    pub fn indices(&self) -> &[u32] {
        self.indices
    }
}

pub struct GeometryBatch<V: Pod> {
    name: String,
    quad_capacity: usize,
    vertices: Vec<V>,
    /// Static quad index pattern, generated once
    indices: Vec<u32>,
    /// Quads written since the last `begin`
    cursor: usize,
    recording: bool,
    /// Written range not yet uploaded (buffers missing at `end`)
    dirty: bool,
    /// Quads whose indices are already in the index buffer
    uploaded_index_quads: usize,
    vertex_buffer: Option<Arc<dyn Buffer>>,
    index_buffer: Option<Arc<dyn Buffer>>,
}

impl<V: Pod> GeometryBatch<V> {
    /// Create a batch holding at most `quad_capacity` quads.
    pub fn new(name: &str, quad_capacity: usize) -> Self {
        let indices = (0..quad_capacity as u32)
            .flat_map(|quad| {
                let base = quad * VERTICES_PER_QUAD as u32;
                [base, base + 1, base + 2, base, base + 2, base + 3]
            })
            .collect();

        Self {
            name: name.to_string(),
            quad_capacity,
            vertices: vec![V::zeroed(); quad_capacity * VERTICES_PER_QUAD],
            indices,
            cursor: 0,
            recording: false,
            dirty: false,
            uploaded_index_quads: 0,
            vertex_buffer: None,
            index_buffer: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn quad_capacity(&self) -> usize {
        self.quad_capacity
    }

    /// Quads written since the last `begin`
    pub fn quad_count(&self) -> usize {
        self.cursor
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn has_device_objects(&self) -> bool {
        self.vertex_buffer.is_some()
    }

    /// Vertices written since the last `begin`
    pub fn written_vertices(&self) -> &[V] {
        &self.vertices[..self.cursor * VERTICES_PER_QUAD]
    }

    /// Indices covering the quads written since the last `begin`
    pub fn written_indices(&self) -> &[u32] {
        &self.indices[..self.cursor * INDICES_PER_QUAD]
    }

    // ===== DEVICE OBJECTS =====

    /// Create the GPU vertex and index buffers (no-op if they exist).
    pub fn create_device_objects(&mut self, device: &mut dyn GraphicsDevice) -> Result<()> {
        if self.vertex_buffer.is_some() {
            return Ok(());
        }

        let vertex_size = (self.vertices.len() * std::mem::size_of::<V>()) as u64;
        let index_size = (self.indices.len() * std::mem::size_of::<u32>()) as u64;

        self.vertex_buffer = Some(device.create_buffer(BufferDesc {
            name: format!("{} vertices", self.name),
            size: vertex_size,
            usage: BufferUsage::Vertex,
        })?);
        self.index_buffer = Some(device.create_buffer(BufferDesc {
            name: format!("{} indices", self.name),
            size: index_size,
            usage: BufferUsage::Index,
        })?);
        self.uploaded_index_quads = 0;

        if self.dirty {
            self.flush()?;
        }

        crate::engine_debug!(
            "galaxy3d::GeometryBatch",
            "'{}' buffers created ({} quads, {} + {} bytes)",
            self.name, self.quad_capacity, vertex_size, index_size
        );
        Ok(())
    }

    /// Release the GPU buffers (no-op if they do not exist).
    pub fn destroy_device_objects(&mut self) {
        self.vertex_buffer = None;
        self.index_buffer = None;
        self.uploaded_index_quads = 0;
        // Staged content must be uploaded again into the next buffers
        self.dirty = self.cursor > 0;
    }

    // ===== FRAME CYCLE =====

    /// Start a new frame: reset the write cursor.
    pub fn begin(&mut self) {
        self.cursor = 0;
        self.recording = true;
        self.dirty = false;
    }

    /// Reserve `count` quads (4 vertices, 6 indices each) for writing.
    ///
    /// Fails with `CapacityExceeded` when the batch cannot hold them and
    /// with `InvalidState` outside `begin`/`end`.
    pub fn reserve_quads(&mut self, count: usize) -> Result<QuadReservation<'_, V>> {
        if !self.recording {
            return Err(Error::InvalidState(format!(
                "reserve_quads on '{}' outside begin/end", self.name
            )));
        }

        let Some(requested) = self.cursor.checked_add(count).filter(|&r| r <= self.quad_capacity) else {
            let requested = self.cursor.saturating_add(count);
            crate::engine_error!(
                "galaxy3d::GeometryBatch",
                "'{}' overflow: {} quads requested, capacity {}",
                self.name, requested, self.quad_capacity
            );
            return Err(Error::CapacityExceeded {
                resource: self.name.clone(),
                requested,
                capacity: self.quad_capacity,
            });
        };

        let first_quad = self.cursor;
        self.cursor = requested;

        Ok(QuadReservation {
            vertices: &mut self.vertices[first_quad * VERTICES_PER_QUAD..requested * VERTICES_PER_QUAD],
            indices: &self.indices[first_quad * INDICES_PER_QUAD..requested * INDICES_PER_QUAD],
            first_quad,
        })
    }

    /// Finish the frame and upload the written range.
    ///
    /// Without device objects, the upload is deferred until they are
    /// created.
    pub fn end(&mut self) -> Result<()> {
        if !self.recording {
            return Err(Error::InvalidState(format!("end on '{}' without begin", self.name)));
        }
        self.recording = false;
        self.dirty = true;
        if self.vertex_buffer.is_some() {
            self.flush()?;
        }
        Ok(())
    }

    /// Draw every quad written since the last `begin` with one indexed draw.
    pub fn submit(&self, cmd: &mut dyn CommandList) -> Result<()> {
        if self.recording {
            return Err(Error::InvalidState(format!("submit on '{}' before end", self.name)));
        }
        if self.cursor == 0 {
            return Ok(());
        }

        let (Some(vertex_buffer), Some(index_buffer)) = (&self.vertex_buffer, &self.index_buffer) else {
            return Err(Error::InvalidState(format!(
                "submit on '{}' without device objects", self.name
            )));
        };

        cmd.bind_vertex_buffer(vertex_buffer, 0)?;
        cmd.bind_index_buffer(index_buffer, 0, IndexType::U32)?;
        cmd.draw_indexed((self.cursor * INDICES_PER_QUAD) as u32, 0, 0)
    }

    fn flush(&mut self) -> Result<()> {
        let (Some(vertex_buffer), Some(index_buffer)) = (&self.vertex_buffer, &self.index_buffer) else {
            return Ok(());
        };

        let written = &self.vertices[..self.cursor * VERTICES_PER_QUAD];
        if !written.is_empty() {
            vertex_buffer.update(0, bytemuck::cast_slice(written))?;
        }

        if self.cursor > self.uploaded_index_quads {
            let start = self.uploaded_index_quads * INDICES_PER_QUAD;
            let end = self.cursor * INDICES_PER_QUAD;
            let offset = (start * std::mem::size_of::<u32>()) as u64;
            index_buffer.update(offset, bytemuck::cast_slice(&self.indices[start..end]))?;
            self.uploaded_index_quads = self.cursor;
        }

        self.dirty = false;
        Ok(())
    }
}

#[cfg(test)]
#[path = "geometry_batch_tests.rs"]
mod tests;
