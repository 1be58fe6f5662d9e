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

//! Thin wrappers over an OpenGL-family API: shaders, programs, buffers, vertex arrays and the
//! global context state. Every wrapper is generic over a [`server::GraphicsServer`], the glow
//! backend lives in [`gl`].

#![allow(clippy::too_many_arguments)]

pub use tricolor_core as core;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString, VariantNames};

pub mod buffer;
pub mod context;
pub mod error;
pub mod gl;
pub mod program;
#[cfg(any(test, feature = "recording"))]
pub mod recording;
pub mod server;
pub mod shader;
pub mod uniform;
pub mod vertex_array;

#[derive(
    Copy,
    Clone,
    PartialOrd,
    PartialEq,
    Eq,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Debug,
    AsRefStr,
    EnumString,
    VariantNames,
)]
pub enum CompareFunc {
    /// Never passes.
    Never,

    /// Passes if the incoming value is less than the stored value.
    Less,

    /// Passes if the incoming value is equal to the stored value.
    Equal,

    /// Passes if the incoming value is less than or equal to the stored value.
    LessOrEqual,

    /// Passes if the incoming value is greater than the stored value.
    Greater,

    /// Passes if the incoming value is not equal to the stored value.
    NotEqual,

    /// Passes if the incoming value is greater than or equal to the stored value.
    GreaterOrEqual,

    /// Always passes.
    Always,
}

impl Default for CompareFunc {
    fn default() -> Self {
        Self::LessOrEqual
    }
}

#[derive(
    Copy,
    Clone,
    Hash,
    PartialOrd,
    PartialEq,
    Eq,
    Ord,
    Serialize,
    Deserialize,
    Debug,
    AsRefStr,
    EnumString,
    VariantNames,
)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
    ConstantColor,
    OneMinusConstantColor,
    ConstantAlpha,
    OneMinusConstantAlpha,
    SrcAlphaSaturate,
}

/// Source and destination factors of the blending equation.
#[derive(Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct BlendFunc {
    pub src: BlendFactor,
    pub dst: BlendFactor,
}

impl BlendFunc {
    pub fn new(src: BlendFactor, dst: BlendFactor) -> Self {
        Self { src, dst }
    }
}

impl Default for BlendFunc {
    /// Standard "over" alpha blending.
    fn default() -> Self {
        Self {
            src: BlendFactor::SrcAlpha,
            dst: BlendFactor::OneMinusSrcAlpha,
        }
    }
}

/// How vertices are assembled into primitives by a draw call.
#[derive(
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Debug,
    Serialize,
    Deserialize,
    AsRefStr,
    EnumString,
    VariantNames,
)]
pub enum PrimitiveMode {
    Points,
    Lines,
    LineStrip,
    LineLoop,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

impl PrimitiveMode {
    /// Amount of primitives produced by `count` vertices.
    pub fn primitive_count(self, count: usize) -> usize {
        match self {
            PrimitiveMode::Points => count,
            PrimitiveMode::Lines => count / 2,
            PrimitiveMode::LineStrip => count.saturating_sub(1),
            PrimitiveMode::LineLoop => {
                if count > 1 {
                    count
                } else {
                    0
                }
            }
            PrimitiveMode::Triangles => count / 3,
            PrimitiveMode::TriangleStrip | PrimitiveMode::TriangleFan => count.saturating_sub(2),
        }
    }
}

bitflags! {
    /// Buffers of the current framebuffer to clear.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct ClearFlags: u32 {
        const COLOR = 0b0001;
        const DEPTH = 0b0010;
        const STENCIL = 0b0100;
    }
}

impl Default for ClearFlags {
    fn default() -> Self {
        Self::COLOR | Self::DEPTH
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct DrawCallStatistics {
    pub primitives: usize,
    pub instances: usize,
}
