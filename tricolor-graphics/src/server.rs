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

//! The seam between the wrappers and a concrete graphics API.
//!
//! Every method maps onto one or a few calls of the underlying API and performs no caching.
//! Wrappers never touch the API directly, which lets the same code drive a real GL context and
//! the headless recording backend.

use crate::{
    buffer::{BufferKind, BufferUsage},
    core::color::Color,
    error::FrameworkError,
    shader::ShaderKind,
    uniform::{MatrixSize, VectorSize},
    vertex_array::AttributeType,
    BlendFactor, ClearFlags, CompareFunc, PrimitiveMode,
};
use std::fmt::Debug;

/// Global capabilities that can be toggled on the context.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    DepthTest,
    Blend,
}

/// An active uniform or attribute as reported by the program after linking.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveVariable {
    pub name: String,
    /// Raw GL type enum, e.g. `FLOAT_VEC3`.
    pub gl_type: u32,
    /// Array size, 1 for non-array variables.
    pub size: i32,
}

pub trait GraphicsServer: 'static {
    type Shader: Copy + Debug + PartialEq;
    type Program: Copy + Debug + PartialEq;
    type Buffer: Copy + Debug + PartialEq;
    type VertexArray: Copy + Debug + PartialEq;
    type UniformLocation: Clone + Debug;

    fn create_shader(&self, kind: ShaderKind) -> Result<Self::Shader, FrameworkError>;
    /// Sets the source and compiles the shader. Returns the compile status.
    fn compile_shader(&self, shader: Self::Shader, source: &str) -> bool;
    fn shader_info_log(&self, shader: Self::Shader) -> String;
    fn delete_shader(&self, shader: Self::Shader);

    fn create_program(&self) -> Result<Self::Program, FrameworkError>;
    fn attach_shader(&self, program: Self::Program, shader: Self::Shader);
    /// Declares transform feedback outputs with interleaved layout. Must precede linking.
    fn transform_feedback_varyings(&self, program: Self::Program, varyings: &[&str]);
    /// Links the program. Returns the link status.
    fn link_program(&self, program: Self::Program) -> bool;
    fn program_info_log(&self, program: Self::Program) -> String;
    fn delete_program(&self, program: Self::Program);
    fn use_program(&self, program: Option<Self::Program>);

    fn active_uniforms(&self, program: Self::Program) -> Vec<ActiveVariable>;
    fn uniform_location(&self, program: Self::Program, name: &str)
        -> Option<Self::UniformLocation>;
    fn active_attributes(&self, program: Self::Program) -> Vec<ActiveVariable>;
    /// `None` for attributes the program does not use.
    fn attribute_location(&self, program: Self::Program, name: &str) -> Option<u32>;

    fn upload_uniform_f32(
        &self,
        location: &Self::UniformLocation,
        size: VectorSize,
        data: &[f32],
    );
    fn upload_uniform_i32(
        &self,
        location: &Self::UniformLocation,
        size: VectorSize,
        data: &[i32],
    );
    fn upload_uniform_matrix(
        &self,
        location: &Self::UniformLocation,
        size: MatrixSize,
        data: &[f32],
    );

    fn create_buffer(&self) -> Result<Self::Buffer, FrameworkError>;
    fn bind_buffer(&self, kind: BufferKind, buffer: Option<Self::Buffer>);
    /// Uploads data into the buffer currently bound to `kind`.
    fn buffer_data(&self, kind: BufferKind, data: &[u8], usage: BufferUsage);
    fn delete_buffer(&self, buffer: Self::Buffer);

    fn create_vertex_array(&self) -> Result<Self::VertexArray, FrameworkError>;
    fn bind_vertex_array(&self, vertex_array: Option<Self::VertexArray>);
    fn delete_vertex_array(&self, vertex_array: Self::VertexArray);
    fn enable_vertex_attrib_array(&self, index: u32);
    fn vertex_attrib_pointer(
        &self,
        index: u32,
        size: i32,
        data_type: AttributeType,
        normalized: bool,
        stride: i32,
        offset: i32,
    );
    fn vertex_attrib_divisor(&self, index: u32, divisor: u32);

    fn draw_arrays(&self, mode: PrimitiveMode, first: i32, count: i32);
    /// Indexed draw with 16-bit unsigned indices, `offset` is in bytes.
    fn draw_elements(&self, mode: PrimitiveMode, count: i32, offset: i32);
    fn draw_arrays_instanced(&self, mode: PrimitiveMode, first: i32, count: i32, instances: i32);
    fn draw_elements_instanced(
        &self,
        mode: PrimitiveMode,
        count: i32,
        offset: i32,
        instances: i32,
    );

    fn set_capability(&self, capability: Capability, enabled: bool);
    fn depth_func(&self, func: CompareFunc);
    fn blend_func(&self, src: BlendFactor, dst: BlendFactor);
    fn clear_color(&self, color: Color);
    fn clear(&self, flags: ClearFlags);
    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);

    /// Resizes the drawing surface (window back buffer or canvas) in pixels.
    fn resize_surface(&self, width: u32, height: u32);
    fn surface_size(&self) -> (u32, u32);
    fn swap_buffers(&self) -> Result<(), FrameworkError>;
}
