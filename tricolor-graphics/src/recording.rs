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

//! A headless [`GraphicsServer`] that records every call instead of issuing it. Objects are
//! plain integers, active uniforms and attributes are whatever the builder declares.

use crate::{
    buffer::{BufferKind, BufferUsage},
    core::color::Color,
    error::FrameworkError,
    server::{ActiveVariable, Capability, GraphicsServer},
    shader::ShaderKind,
    uniform::{MatrixSize, VectorSize},
    vertex_array::AttributeType,
    BlendFactor, ClearFlags, CompareFunc, PrimitiveMode,
};
use fxhash::FxHashMap;
use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    CreateShader(ShaderKind, u32),
    CompileShader(u32),
    DeleteShader(u32),
    CreateProgram(u32),
    AttachShader {
        program: u32,
        shader: u32,
    },
    TransformFeedbackVaryings {
        program: u32,
        varyings: Vec<String>,
    },
    LinkProgram(u32),
    DeleteProgram(u32),
    UseProgram(Option<u32>),
    UploadUniformF32 {
        location: i32,
        size: VectorSize,
        data: Vec<f32>,
    },
    UploadUniformI32 {
        location: i32,
        size: VectorSize,
        data: Vec<i32>,
    },
    UploadUniformMatrix {
        location: i32,
        size: MatrixSize,
        data: Vec<f32>,
    },
    CreateBuffer(u32),
    BindBuffer(BufferKind, Option<u32>),
    BufferData {
        kind: BufferKind,
        len: usize,
        usage: BufferUsage,
    },
    DeleteBuffer(u32),
    CreateVertexArray(u32),
    BindVertexArray(Option<u32>),
    DeleteVertexArray(u32),
    EnableVertexAttribArray(u32),
    VertexAttribPointer {
        index: u32,
        size: i32,
        data_type: AttributeType,
        normalized: bool,
        stride: i32,
        offset: i32,
    },
    VertexAttribDivisor {
        index: u32,
        divisor: u32,
    },
    DrawArrays {
        mode: PrimitiveMode,
        first: i32,
        count: i32,
    },
    DrawElements {
        mode: PrimitiveMode,
        count: i32,
        offset: i32,
    },
    DrawArraysInstanced {
        mode: PrimitiveMode,
        first: i32,
        count: i32,
        instances: i32,
    },
    DrawElementsInstanced {
        mode: PrimitiveMode,
        count: i32,
        offset: i32,
        instances: i32,
    },
    SetCapability(Capability, bool),
    DepthFunc(CompareFunc),
    BlendFunc(BlendFactor, BlendFactor),
    ClearColor(Color),
    Clear(ClearFlags),
    Viewport {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    },
    ResizeSurface {
        width: u32,
        height: u32,
    },
    SwapBuffers,
}

struct CompileError {
    marker: String,
    log: String,
}

#[derive(Default)]
pub struct RecordingServer {
    calls: RefCell<Vec<Call>>,
    next_id: Cell<u32>,
    shader_logs: RefCell<FxHashMap<u32, String>>,
    compile_errors: Vec<CompileError>,
    link_error: Option<String>,
    uniforms: Vec<ActiveVariable>,
    attributes: Vec<(ActiveVariable, Option<u32>)>,
    surface_size: Cell<(u32, u32)>,
    min_surface_size: (u32, u32),
}

impl RecordingServer {
    pub fn new() -> Self {
        Self {
            surface_size: Cell::new((1, 1)),
            ..Default::default()
        }
    }

    /// Every linked program reports this uniform as active.
    pub fn with_uniform(mut self, name: &str, gl_type: u32, size: i32) -> Self {
        self.uniforms.push(ActiveVariable {
            name: name.to_owned(),
            gl_type,
            size,
        });
        self
    }

    /// Every linked program reports this attribute as active, at `location`.
    pub fn with_attribute(
        mut self,
        name: &str,
        gl_type: u32,
        size: i32,
        location: Option<u32>,
    ) -> Self {
        self.attributes.push((
            ActiveVariable {
                name: name.to_owned(),
                gl_type,
                size,
            },
            location,
        ));
        self
    }

    /// Compilation of any source containing `marker` fails with `log`.
    pub fn with_compile_error(mut self, marker: &str, log: &str) -> Self {
        self.compile_errors.push(CompileError {
            marker: marker.to_owned(),
            log: log.to_owned(),
        });
        self
    }

    /// Every link attempt fails with `log`.
    pub fn with_link_error(mut self, log: &str) -> Self {
        self.link_error = Some(log.to_owned());
        self
    }

    /// Surface resizes are clamped to at least this size, like a window back buffer.
    pub fn with_min_surface_size(mut self, width: u32, height: u32) -> Self {
        self.min_surface_size = (width, height);
        self
    }

    pub fn into_shared(self) -> Rc<Self> {
        Rc::new(self)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn count<F>(&self, filter: F) -> usize
    where
        F: Fn(&Call) -> bool,
    {
        self.calls.borrow().iter().filter(|c| filter(c)).count()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn allocate(&self) -> u32 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }
}

impl GraphicsServer for RecordingServer {
    type Shader = u32;
    type Program = u32;
    type Buffer = u32;
    type VertexArray = u32;
    type UniformLocation = i32;

    fn create_shader(&self, kind: ShaderKind) -> Result<u32, FrameworkError> {
        let id = self.allocate();
        self.record(Call::CreateShader(kind, id));
        Ok(id)
    }

    fn compile_shader(&self, shader: u32, source: &str) -> bool {
        self.record(Call::CompileShader(shader));
        match self
            .compile_errors
            .iter()
            .find(|e| source.contains(&e.marker))
        {
            Some(error) => {
                self.shader_logs.borrow_mut().insert(shader, error.log.clone());
                false
            }
            None => true,
        }
    }

    fn shader_info_log(&self, shader: u32) -> String {
        self.shader_logs
            .borrow()
            .get(&shader)
            .cloned()
            .unwrap_or_default()
    }

    fn delete_shader(&self, shader: u32) {
        self.record(Call::DeleteShader(shader));
    }

    fn create_program(&self) -> Result<u32, FrameworkError> {
        let id = self.allocate();
        self.record(Call::CreateProgram(id));
        Ok(id)
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        self.record(Call::AttachShader { program, shader });
    }

    fn transform_feedback_varyings(&self, program: u32, varyings: &[&str]) {
        self.record(Call::TransformFeedbackVaryings {
            program,
            varyings: varyings.iter().map(|v| v.to_string()).collect(),
        });
    }

    fn link_program(&self, program: u32) -> bool {
        self.record(Call::LinkProgram(program));
        self.link_error.is_none()
    }

    fn program_info_log(&self, _program: u32) -> String {
        self.link_error.clone().unwrap_or_default()
    }

    fn delete_program(&self, program: u32) {
        self.record(Call::DeleteProgram(program));
    }

    fn use_program(&self, program: Option<u32>) {
        self.record(Call::UseProgram(program));
    }

    fn active_uniforms(&self, _program: u32) -> Vec<ActiveVariable> {
        self.uniforms.clone()
    }

    fn uniform_location(&self, _program: u32, name: &str) -> Option<i32> {
        self.uniforms
            .iter()
            .position(|u| u.name == name)
            .map(|i| i as i32)
    }

    fn active_attributes(&self, _program: u32) -> Vec<ActiveVariable> {
        self.attributes.iter().map(|(a, _)| a.clone()).collect()
    }

    fn attribute_location(&self, _program: u32, name: &str) -> Option<u32> {
        self.attributes
            .iter()
            .find(|(a, _)| a.name == name)
            .and_then(|(_, location)| *location)
    }

    fn upload_uniform_f32(&self, location: &i32, size: VectorSize, data: &[f32]) {
        self.record(Call::UploadUniformF32 {
            location: *location,
            size,
            data: data.to_vec(),
        });
    }

    fn upload_uniform_i32(&self, location: &i32, size: VectorSize, data: &[i32]) {
        self.record(Call::UploadUniformI32 {
            location: *location,
            size,
            data: data.to_vec(),
        });
    }

    fn upload_uniform_matrix(&self, location: &i32, size: MatrixSize, data: &[f32]) {
        self.record(Call::UploadUniformMatrix {
            location: *location,
            size,
            data: data.to_vec(),
        });
    }

    fn create_buffer(&self) -> Result<u32, FrameworkError> {
        let id = self.allocate();
        self.record(Call::CreateBuffer(id));
        Ok(id)
    }

    fn bind_buffer(&self, kind: BufferKind, buffer: Option<u32>) {
        self.record(Call::BindBuffer(kind, buffer));
    }

    fn buffer_data(&self, kind: BufferKind, data: &[u8], usage: BufferUsage) {
        self.record(Call::BufferData {
            kind,
            len: data.len(),
            usage,
        });
    }

    fn delete_buffer(&self, buffer: u32) {
        self.record(Call::DeleteBuffer(buffer));
    }

    fn create_vertex_array(&self) -> Result<u32, FrameworkError> {
        let id = self.allocate();
        self.record(Call::CreateVertexArray(id));
        Ok(id)
    }

    fn bind_vertex_array(&self, vertex_array: Option<u32>) {
        self.record(Call::BindVertexArray(vertex_array));
    }

    fn delete_vertex_array(&self, vertex_array: u32) {
        self.record(Call::DeleteVertexArray(vertex_array));
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        self.record(Call::EnableVertexAttribArray(index));
    }

    fn vertex_attrib_pointer(
        &self,
        index: u32,
        size: i32,
        data_type: AttributeType,
        normalized: bool,
        stride: i32,
        offset: i32,
    ) {
        self.record(Call::VertexAttribPointer {
            index,
            size,
            data_type,
            normalized,
            stride,
            offset,
        });
    }

    fn vertex_attrib_divisor(&self, index: u32, divisor: u32) {
        self.record(Call::VertexAttribDivisor { index, divisor });
    }

    fn draw_arrays(&self, mode: PrimitiveMode, first: i32, count: i32) {
        self.record(Call::DrawArrays { mode, first, count });
    }

    fn draw_elements(&self, mode: PrimitiveMode, count: i32, offset: i32) {
        self.record(Call::DrawElements {
            mode,
            count,
            offset,
        });
    }

    fn draw_arrays_instanced(&self, mode: PrimitiveMode, first: i32, count: i32, instances: i32) {
        self.record(Call::DrawArraysInstanced {
            mode,
            first,
            count,
            instances,
        });
    }

    fn draw_elements_instanced(
        &self,
        mode: PrimitiveMode,
        count: i32,
        offset: i32,
        instances: i32,
    ) {
        self.record(Call::DrawElementsInstanced {
            mode,
            count,
            offset,
            instances,
        });
    }

    fn set_capability(&self, capability: Capability, enabled: bool) {
        self.record(Call::SetCapability(capability, enabled));
    }

    fn depth_func(&self, func: CompareFunc) {
        self.record(Call::DepthFunc(func));
    }

    fn blend_func(&self, src: BlendFactor, dst: BlendFactor) {
        self.record(Call::BlendFunc(src, dst));
    }

    fn clear_color(&self, color: Color) {
        self.record(Call::ClearColor(color));
    }

    fn clear(&self, flags: ClearFlags) {
        self.record(Call::Clear(flags));
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        self.record(Call::Viewport {
            x,
            y,
            width,
            height,
        });
    }

    fn resize_surface(&self, width: u32, height: u32) {
        let (min_width, min_height) = self.min_surface_size;
        self.surface_size
            .set((width.max(min_width), height.max(min_height)));
        self.record(Call::ResizeSurface { width, height });
    }

    fn surface_size(&self) -> (u32, u32) {
        self.surface_size.get()
    }

    fn swap_buffers(&self) -> Result<(), FrameworkError> {
        self.record(Call::SwapBuffers);
        Ok(())
    }
}
