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

use crate::{error::FrameworkError, server::GraphicsServer};
use bytemuck::Pod;
use serde::{Deserialize, Serialize};
use std::rc::{Rc, Weak};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BufferKind {
    /// Per-vertex data, bound as the array buffer.
    Vertex,
    /// 16-bit indices, bound as the element array buffer.
    Index,
}

/// Hint of how often the contents of a buffer change.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum BufferUsage {
    #[default]
    StaticDraw,
    DynamicDraw,
    StreamDraw,
}

/// A GPU-side buffer object.
pub struct GpuBuffer<S: GraphicsServer> {
    server: Weak<S>,
    id: Option<S::Buffer>,
    kind: BufferKind,
    usage: BufferUsage,
    size_bytes: usize,
}

impl<S: GraphicsServer> GpuBuffer<S> {
    /// Creates an empty buffer.
    pub fn new(
        server: &Rc<S>,
        kind: BufferKind,
        usage: BufferUsage,
    ) -> Result<Self, FrameworkError> {
        let id = server.create_buffer()?;
        Ok(Self {
            server: Rc::downgrade(server),
            id: Some(id),
            kind,
            usage,
            size_bytes: 0,
        })
    }

    /// Creates a buffer and fills it with `data`.
    pub fn from_slice<T: Pod>(
        server: &Rc<S>,
        kind: BufferKind,
        usage: BufferUsage,
        data: &[T],
    ) -> Result<Self, FrameworkError> {
        let mut buffer = Self::new(server, kind, usage)?;
        buffer.write_data(data)?;
        Ok(buffer)
    }

    /// Replaces the whole contents of the buffer. The buffer is bound only for the duration of
    /// the upload. Index buffers are uploaded with no vertex array bound, so the upload cannot
    /// leak into the element binding of some vertex array.
    pub fn write_data<T: Pod>(&mut self, data: &[T]) -> Result<(), FrameworkError> {
        let id = self.id.ok_or(FrameworkError::ObjectReleased("buffer"))?;
        let server = self
            .server
            .upgrade()
            .ok_or(FrameworkError::ObjectReleased("graphics server"))?;

        let bytes: &[u8] = bytemuck::cast_slice(data);

        if self.kind == BufferKind::Index {
            server.bind_vertex_array(None);
        }
        server.bind_buffer(self.kind, Some(id));
        server.buffer_data(self.kind, bytes, self.usage);
        server.bind_buffer(self.kind, None);

        self.size_bytes = bytes.len();

        Ok(())
    }

    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    /// Native handle, `None` once released.
    pub fn native(&self) -> Option<S::Buffer> {
        self.id
    }

    /// Deletes the native buffer. Calling it again does nothing.
    pub fn release(&mut self) {
        if let Some(id) = self.id.take() {
            if let Some(server) = self.server.upgrade() {
                server.delete_buffer(id);
            }
        }
    }
}

impl<S: GraphicsServer> Drop for GpuBuffer<S> {
    fn drop(&mut self) {
        self.release();
    }
}
