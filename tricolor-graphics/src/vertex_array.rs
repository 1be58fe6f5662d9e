// Copyright (c) 2019-present Dmitry Stepanov and Fyrox Engine contributors.
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

use crate::{
    buffer::{BufferKind, GpuBuffer},
    error::FrameworkError,
    server::GraphicsServer,
    DrawCallStatistics, PrimitiveMode,
};
use serde::{Deserialize, Serialize};
use std::{
    mem::size_of,
    rc::{Rc, Weak},
};

/// Type of a single component of a vertex attribute.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AttributeType {
    Byte,
    UnsignedByte,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    HalfFloat,
    #[default]
    Float,
}

impl AttributeType {
    pub fn size_bytes(self) -> usize {
        match self {
            AttributeType::Byte | AttributeType::UnsignedByte => size_of::<u8>(),
            AttributeType::Short | AttributeType::UnsignedShort | AttributeType::HalfFloat => {
                size_of::<u16>()
            }
            AttributeType::Int | AttributeType::UnsignedInt => size_of::<u32>(),
            AttributeType::Float => size_of::<f32>(),
        }
    }
}

/// Layout of one attribute inside a vertex buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AttributeDefinition {
    /// Attribute slot, usually obtained from [`crate::program::GpuProgram::attribute_location`].
    pub index: u32,
    /// Component count, 1 to 4.
    pub size: i32,
    pub data_type: AttributeType,
    pub normalized: bool,
    /// Distance in bytes between consecutive vertices, 0 means tightly packed.
    pub stride: i32,
    /// Byte offset of the first component.
    pub offset: i32,
    /// 0 advances the attribute per vertex, N advances it once per N instances.
    pub divisor: u32,
}

impl AttributeDefinition {
    pub fn new(index: u32, size: i32) -> Self {
        Self {
            index,
            size,
            data_type: AttributeType::Float,
            normalized: false,
            stride: 0,
            offset: 0,
            divisor: 0,
        }
    }

    pub fn with_type(mut self, data_type: AttributeType) -> Self {
        self.data_type = data_type;
        self
    }

    pub fn with_normalized(mut self, normalized: bool) -> Self {
        self.normalized = normalized;
        self
    }

    pub fn with_stride(mut self, stride: i32) -> Self {
        self.stride = stride;
        self
    }

    pub fn with_offset(mut self, offset: i32) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_divisor(mut self, divisor: u32) -> Self {
        self.divisor = divisor;
        self
    }
}

/// An attribute definition together with the buffer it was bound to.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AttributeBinding<B> {
    pub definition: AttributeDefinition,
    pub buffer: B,
}

/// A vertex array object: attribute-to-buffer bindings plus an optional index buffer.
///
/// All state changes are scoped: each method binds the vertex array (and buffers) it needs and
/// unbinds them before returning.
pub struct VertexArray<S: GraphicsServer> {
    server: Weak<S>,
    id: Option<S::VertexArray>,
    bindings: Vec<AttributeBinding<S::Buffer>>,
    index_buffer: Option<S::Buffer>,
}

impl<S: GraphicsServer> VertexArray<S> {
    pub fn new(server: &Rc<S>) -> Result<Self, FrameworkError> {
        let id = server.create_vertex_array()?;
        Ok(Self {
            server: Rc::downgrade(server),
            id: Some(id),
            bindings: Default::default(),
            index_buffer: None,
        })
    }

    fn acquire(&self) -> Result<(Rc<S>, S::VertexArray), FrameworkError> {
        let id = self.id.ok_or(FrameworkError::ObjectReleased("vertex array"))?;
        let server = self
            .server
            .upgrade()
            .ok_or(FrameworkError::ObjectReleased("graphics server"))?;
        Ok((server, id))
    }

    /// Binds `buffer` to the attribute slot described by `definition` and records the binding.
    /// Binding the same slot twice records both; the last one is in effect at draw time.
    pub fn add_attribute(
        &mut self,
        buffer: &GpuBuffer<S>,
        definition: AttributeDefinition,
    ) -> Result<(), FrameworkError> {
        let (server, id) = self.acquire()?;
        let buffer = buffer
            .native()
            .ok_or(FrameworkError::ObjectReleased("buffer"))?;

        server.bind_vertex_array(Some(id));
        server.bind_buffer(BufferKind::Vertex, Some(buffer));

        server.enable_vertex_attrib_array(definition.index);
        server.vertex_attrib_pointer(
            definition.index,
            definition.size,
            definition.data_type,
            definition.normalized,
            definition.stride,
            definition.offset,
        );
        if definition.divisor != 0 {
            server.vertex_attrib_divisor(definition.index, definition.divisor);
        }

        self.bindings.push(AttributeBinding { definition, buffer });

        server.bind_buffer(BufferKind::Vertex, None);
        server.bind_vertex_array(None);

        Ok(())
    }

    /// Attaches an index buffer with 16-bit indices. Every subsequent draw is indexed.
    pub fn set_index_buffer(&mut self, buffer: &GpuBuffer<S>) -> Result<(), FrameworkError> {
        if buffer.kind() != BufferKind::Index {
            return Err(FrameworkError::Custom(format!(
                "A {:?} buffer cannot be used as an index buffer",
                buffer.kind()
            )));
        }

        let (server, id) = self.acquire()?;
        let buffer = buffer
            .native()
            .ok_or(FrameworkError::ObjectReleased("buffer"))?;

        server.bind_vertex_array(Some(id));
        server.bind_buffer(BufferKind::Index, Some(buffer));
        self.index_buffer = Some(buffer);
        // The element binding is part of the vertex array state, so only the array is unbound.
        server.bind_vertex_array(None);

        Ok(())
    }

    /// Draws `count` vertices, or `count` indices when an index buffer is set. `offset` is the
    /// first vertex of a non-indexed draw and a byte offset into the index buffer of an indexed
    /// one. No bounds checking is performed.
    pub fn draw(
        &self,
        mode: PrimitiveMode,
        count: usize,
        offset: usize,
    ) -> Result<DrawCallStatistics, FrameworkError> {
        let (server, id) = self.acquire()?;

        server.bind_vertex_array(Some(id));
        if self.index_buffer.is_some() {
            server.draw_elements(mode, count as i32, offset as i32);
        } else {
            server.draw_arrays(mode, offset as i32, count as i32);
        }
        server.bind_vertex_array(None);

        Ok(DrawCallStatistics {
            primitives: mode.primitive_count(count),
            instances: 1,
        })
    }

    /// Same as [`Self::draw`], but draws `instances` instances.
    pub fn draw_instanced(
        &self,
        mode: PrimitiveMode,
        count: usize,
        instances: usize,
        offset: usize,
    ) -> Result<DrawCallStatistics, FrameworkError> {
        let (server, id) = self.acquire()?;

        server.bind_vertex_array(Some(id));
        if self.index_buffer.is_some() {
            server.draw_elements_instanced(
                mode,
                count as i32,
                offset as i32,
                instances as i32,
            );
        } else {
            server.draw_arrays_instanced(mode, offset as i32, count as i32, instances as i32);
        }
        server.bind_vertex_array(None);

        Ok(DrawCallStatistics {
            primitives: mode.primitive_count(count) * instances,
            instances,
        })
    }

    pub fn bindings(&self) -> &[AttributeBinding<S::Buffer>] {
        &self.bindings
    }

    pub fn index_buffer(&self) -> Option<S::Buffer> {
        self.index_buffer
    }

    /// Native handle, `None` once released.
    pub fn native(&self) -> Option<S::VertexArray> {
        self.id
    }

    /// Deletes the native vertex array. Calling it again does nothing.
    pub fn release(&mut self) {
        if let Some(id) = self.id.take() {
            if let Some(server) = self.server.upgrade() {
                server.delete_vertex_array(id);
            }
        }
    }
}

impl<S: GraphicsServer> Drop for VertexArray<S> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod test {
    use crate::{
        buffer::{BufferKind, BufferUsage, GpuBuffer},
        error::FrameworkError,
        recording::{Call, RecordingServer},
        vertex_array::{AttributeDefinition, AttributeType, VertexArray},
        DrawCallStatistics, PrimitiveMode,
    };

    const POSITIONS: [f32; 6] = [0.0, 0.5, -0.5, -0.5, 0.5, -0.5];

    #[test]
    fn add_attribute_is_scoped() {
        let server = RecordingServer::new().into_shared();
        let buffer =
            GpuBuffer::from_slice(&server, BufferKind::Vertex, BufferUsage::StaticDraw, &POSITIONS)
                .unwrap();
        let mut vao = VertexArray::new(&server).unwrap();
        server.clear_calls();

        vao.add_attribute(&buffer, AttributeDefinition::new(0, 2))
            .unwrap();

        let (vao_id, buffer_id) = (vao.native().unwrap(), buffer.native().unwrap());
        assert_eq!(
            server.calls(),
            vec![
                Call::BindVertexArray(Some(vao_id)),
                Call::BindBuffer(BufferKind::Vertex, Some(buffer_id)),
                Call::EnableVertexAttribArray(0),
                Call::VertexAttribPointer {
                    index: 0,
                    size: 2,
                    data_type: AttributeType::Float,
                    normalized: false,
                    stride: 0,
                    offset: 0
                },
                Call::BindBuffer(BufferKind::Vertex, None),
                Call::BindVertexArray(None),
            ]
        );
        assert_eq!(vao.bindings().len(), 1);
        assert_eq!(vao.bindings()[0].buffer, buffer_id);
    }

    #[test]
    fn duplicate_bindings_are_kept() {
        let server = RecordingServer::new().into_shared();
        let buffer =
            GpuBuffer::from_slice(&server, BufferKind::Vertex, BufferUsage::StaticDraw, &POSITIONS)
                .unwrap();
        let mut vao = VertexArray::new(&server).unwrap();

        vao.add_attribute(&buffer, AttributeDefinition::new(0, 2))
            .unwrap();
        vao.add_attribute(&buffer, AttributeDefinition::new(0, 2).with_stride(8))
            .unwrap();

        assert_eq!(vao.bindings().len(), 2);
        assert_eq!(vao.bindings()[1].definition.stride, 8);
    }

    #[test]
    fn non_indexed_draw() {
        let server = RecordingServer::new().into_shared();
        let buffer =
            GpuBuffer::from_slice(&server, BufferKind::Vertex, BufferUsage::StaticDraw, &POSITIONS)
                .unwrap();
        let mut vao = VertexArray::new(&server).unwrap();
        vao.add_attribute(&buffer, AttributeDefinition::new(0, 2))
            .unwrap();
        server.clear_calls();

        let stats = vao.draw(PrimitiveMode::Triangles, 3, 0).unwrap();

        assert_eq!(
            stats,
            DrawCallStatistics {
                primitives: 1,
                instances: 1
            }
        );
        assert_eq!(
            server.calls(),
            vec![
                Call::BindVertexArray(vao.native()),
                Call::DrawArrays {
                    mode: PrimitiveMode::Triangles,
                    first: 0,
                    count: 3
                },
                Call::BindVertexArray(None),
            ]
        );
    }

    #[test]
    fn instanced_draw_without_indices() {
        let server = RecordingServer::new().into_shared();
        let positions =
            GpuBuffer::from_slice(&server, BufferKind::Vertex, BufferUsage::StaticDraw, &POSITIONS)
                .unwrap();
        let offsets = GpuBuffer::from_slice(
            &server,
            BufferKind::Vertex,
            BufferUsage::StaticDraw,
            &[[0.0f32, 0.0], [0.25, 0.25]],
        )
        .unwrap();
        let mut vao = VertexArray::new(&server).unwrap();
        vao.add_attribute(&positions, AttributeDefinition::new(0, 2))
            .unwrap();
        server.clear_calls();
        vao.add_attribute(&offsets, AttributeDefinition::new(1, 2).with_divisor(1))
            .unwrap();

        assert!(server.calls().contains(&Call::VertexAttribDivisor {
            index: 1,
            divisor: 1
        }));
        assert_eq!(vao.bindings()[1].definition.divisor, 1);

        server.clear_calls();
        let stats = vao
            .draw_instanced(PrimitiveMode::Triangles, 3, 2, 0)
            .unwrap();

        assert_eq!(
            stats,
            DrawCallStatistics {
                primitives: 2,
                instances: 2
            }
        );
        assert_eq!(
            server.calls(),
            vec![
                Call::BindVertexArray(vao.native()),
                Call::DrawArraysInstanced {
                    mode: PrimitiveMode::Triangles,
                    first: 0,
                    count: 3,
                    instances: 2
                },
                Call::BindVertexArray(None),
            ]
        );
    }

    #[test]
    fn zero_divisor_is_not_issued() {
        let server = RecordingServer::new().into_shared();
        let buffer =
            GpuBuffer::from_slice(&server, BufferKind::Vertex, BufferUsage::StaticDraw, &POSITIONS)
                .unwrap();
        let mut vao = VertexArray::new(&server).unwrap();

        vao.add_attribute(&buffer, AttributeDefinition::new(0, 2))
            .unwrap();

        assert_eq!(
            server.count(|c| matches!(c, Call::VertexAttribDivisor { .. })),
            0
        );
    }

    #[test]
    fn index_buffer_forces_indexed_path_regardless_of_order() {
        let server = RecordingServer::new().into_shared();
        let vertices =
            GpuBuffer::from_slice(&server, BufferKind::Vertex, BufferUsage::StaticDraw, &POSITIONS)
                .unwrap();
        let indices = GpuBuffer::from_slice(
            &server,
            BufferKind::Index,
            BufferUsage::StaticDraw,
            &[0u16, 1, 2],
        )
        .unwrap();

        let mut vao = VertexArray::new(&server).unwrap();
        vao.set_index_buffer(&indices).unwrap();
        vao.add_attribute(&vertices, AttributeDefinition::new(0, 2))
            .unwrap();
        server.clear_calls();

        vao.draw(PrimitiveMode::Triangles, 3, 6).unwrap();
        vao.draw_instanced(PrimitiveMode::Triangles, 3, 4, 0)
            .unwrap();

        assert_eq!(server.count(|c| matches!(c, Call::DrawArrays { .. })), 0);
        assert!(server.calls().contains(&Call::DrawElements {
            mode: PrimitiveMode::Triangles,
            count: 3,
            offset: 6
        }));
        assert!(server.calls().contains(&Call::DrawElementsInstanced {
            mode: PrimitiveMode::Triangles,
            count: 3,
            offset: 0,
            instances: 4
        }));
    }

    #[test]
    fn vertex_buffer_is_not_an_index_buffer() {
        let server = RecordingServer::new().into_shared();
        let vertices =
            GpuBuffer::from_slice(&server, BufferKind::Vertex, BufferUsage::StaticDraw, &POSITIONS)
                .unwrap();
        let mut vao = VertexArray::new(&server).unwrap();

        assert!(vao.set_index_buffer(&vertices).is_err());
        assert_eq!(vao.index_buffer(), None);
    }

    #[test]
    fn release_is_idempotent() {
        let server = RecordingServer::new().into_shared();
        let mut vao = VertexArray::new(&server).unwrap();

        vao.release();
        vao.release();

        assert!(matches!(
            vao.draw(PrimitiveMode::Triangles, 3, 0),
            Err(FrameworkError::ObjectReleased("vertex array"))
        ));
        drop(vao);
        assert_eq!(server.count(|c| matches!(c, Call::DeleteVertexArray(_))), 1);
    }
}
