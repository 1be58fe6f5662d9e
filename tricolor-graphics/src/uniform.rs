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

//! Uniform types, values and the per-type upload dispatch.
//!
//! The declared type of every active uniform is resolved into a [`UniformKind`] and an upload
//! function once, when the program is introspected. Setting a uniform afterwards is a table
//! lookup followed by a call through the stored function.

use crate::{
    core::algebra::{Matrix2, Matrix3, Matrix4, Vector2, Vector3, Vector4},
    server::GraphicsServer,
};
use std::{borrow::Cow, slice};

/// Number of components of a vector uniform.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum VectorSize {
    One,
    Two,
    Three,
    Four,
}

/// Dimension of a square matrix uniform.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MatrixSize {
    Two,
    Three,
    Four,
}

/// Uniform types this layer knows how to upload.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum UniformKind {
    Float,
    FloatVec2,
    FloatVec3,
    FloatVec4,
    Int,
    IntVec2,
    IntVec3,
    IntVec4,
    Bool,
    BoolVec2,
    BoolVec3,
    BoolVec4,
    FloatMat2,
    FloatMat3,
    FloatMat4,
    Sampler2D,
    SamplerCube,
}

/// Uploads `value` to `location`. Returns `false` if the value does not fit the declared type.
pub type UniformUploader<S> =
    fn(&S, &<S as GraphicsServer>::UniformLocation, &UniformValue<'_>) -> bool;

impl UniformKind {
    /// Maps a GL type enum (as reported by `getActiveUniform`) onto a kind.
    pub fn from_gl_type(gl_type: u32) -> Option<Self> {
        Some(match gl_type {
            glow::FLOAT => Self::Float,
            glow::FLOAT_VEC2 => Self::FloatVec2,
            glow::FLOAT_VEC3 => Self::FloatVec3,
            glow::FLOAT_VEC4 => Self::FloatVec4,
            glow::INT => Self::Int,
            glow::INT_VEC2 => Self::IntVec2,
            glow::INT_VEC3 => Self::IntVec3,
            glow::INT_VEC4 => Self::IntVec4,
            glow::BOOL => Self::Bool,
            glow::BOOL_VEC2 => Self::BoolVec2,
            glow::BOOL_VEC3 => Self::BoolVec3,
            glow::BOOL_VEC4 => Self::BoolVec4,
            glow::FLOAT_MAT2 => Self::FloatMat2,
            glow::FLOAT_MAT3 => Self::FloatMat3,
            glow::FLOAT_MAT4 => Self::FloatMat4,
            glow::SAMPLER_2D => Self::Sampler2D,
            glow::SAMPLER_CUBE => Self::SamplerCube,
            _ => return None,
        })
    }

    pub fn glsl_name(self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::FloatVec2 => "vec2",
            Self::FloatVec3 => "vec3",
            Self::FloatVec4 => "vec4",
            Self::Int => "int",
            Self::IntVec2 => "ivec2",
            Self::IntVec3 => "ivec3",
            Self::IntVec4 => "ivec4",
            Self::Bool => "bool",
            Self::BoolVec2 => "bvec2",
            Self::BoolVec3 => "bvec3",
            Self::BoolVec4 => "bvec4",
            Self::FloatMat2 => "mat2",
            Self::FloatMat3 => "mat3",
            Self::FloatMat4 => "mat4",
            Self::Sampler2D => "sampler2D",
            Self::SamplerCube => "samplerCube",
        }
    }

    /// Upload function for this kind. Booleans and samplers go through the integer path.
    pub fn uploader<S: GraphicsServer>(self) -> UniformUploader<S> {
        match self {
            Self::Float => |s, l, v| upload_f32(s, l, VectorSize::One, v),
            Self::FloatVec2 => |s, l, v| upload_f32(s, l, VectorSize::Two, v),
            Self::FloatVec3 => |s, l, v| upload_f32(s, l, VectorSize::Three, v),
            Self::FloatVec4 => |s, l, v| upload_f32(s, l, VectorSize::Four, v),
            Self::Int | Self::Bool | Self::Sampler2D | Self::SamplerCube => {
                |s, l, v| upload_i32(s, l, VectorSize::One, v)
            }
            Self::IntVec2 | Self::BoolVec2 => |s, l, v| upload_i32(s, l, VectorSize::Two, v),
            Self::IntVec3 | Self::BoolVec3 => |s, l, v| upload_i32(s, l, VectorSize::Three, v),
            Self::IntVec4 | Self::BoolVec4 => |s, l, v| upload_i32(s, l, VectorSize::Four, v),
            Self::FloatMat2 => |s, l, v| upload_matrix(s, l, MatrixSize::Two, v),
            Self::FloatMat3 => |s, l, v| upload_matrix(s, l, MatrixSize::Three, v),
            Self::FloatMat4 => |s, l, v| upload_matrix(s, l, MatrixSize::Four, v),
        }
    }
}

fn upload_f32<S: GraphicsServer>(
    server: &S,
    location: &S::UniformLocation,
    size: VectorSize,
    value: &UniformValue<'_>,
) -> bool {
    match value.as_f32() {
        Some(data) => {
            server.upload_uniform_f32(location, size, data);
            true
        }
        None => false,
    }
}

fn upload_i32<S: GraphicsServer>(
    server: &S,
    location: &S::UniformLocation,
    size: VectorSize,
    value: &UniformValue<'_>,
) -> bool {
    match value.as_i32() {
        Some(data) => {
            server.upload_uniform_i32(location, size, &data);
            true
        }
        None => false,
    }
}

fn upload_matrix<S: GraphicsServer>(
    server: &S,
    location: &S::UniformLocation,
    size: MatrixSize,
    value: &UniformValue<'_>,
) -> bool {
    match value {
        UniformValue::Floats(data) => {
            server.upload_uniform_matrix(location, size, data);
            true
        }
        _ => false,
    }
}

/// A value to upload into a uniform. Vectors, matrices and arrays are passed as flat buffers,
/// matrices in column-major order.
#[derive(Clone, Debug, PartialEq)]
pub enum UniformValue<'a> {
    Float(f32),
    Int(i32),
    Bool(bool),
    Floats(&'a [f32]),
    Ints(&'a [i32]),
}

impl UniformValue<'_> {
    pub fn as_f32(&self) -> Option<&[f32]> {
        match self {
            UniformValue::Float(v) => Some(slice::from_ref(v)),
            UniformValue::Floats(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<Cow<'_, [i32]>> {
        match self {
            UniformValue::Int(v) => Some(Cow::Borrowed(slice::from_ref(v))),
            UniformValue::Bool(v) => Some(Cow::Owned(vec![*v as i32])),
            UniformValue::Ints(v) => Some(Cow::Borrowed(v)),
            _ => None,
        }
    }
}

impl From<f32> for UniformValue<'_> {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<i32> for UniformValue<'_> {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for UniformValue<'_> {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl<'a> From<&'a [f32]> for UniformValue<'a> {
    fn from(v: &'a [f32]) -> Self {
        Self::Floats(v)
    }
}

impl<'a> From<&'a [i32]> for UniformValue<'a> {
    fn from(v: &'a [i32]) -> Self {
        Self::Ints(v)
    }
}

impl<'a, const N: usize> From<&'a [f32; N]> for UniformValue<'a> {
    fn from(v: &'a [f32; N]) -> Self {
        Self::Floats(v)
    }
}

impl<'a, const N: usize> From<&'a [i32; N]> for UniformValue<'a> {
    fn from(v: &'a [i32; N]) -> Self {
        Self::Ints(v)
    }
}

macro_rules! define_algebra_conversion {
    ($($ty:ty),*) => {
        $(
            impl<'a> From<&'a $ty> for UniformValue<'a> {
                fn from(v: &'a $ty) -> Self {
                    Self::Floats(v.as_slice())
                }
            }
        )*
    };
}

define_algebra_conversion!(
    Vector2<f32>,
    Vector3<f32>,
    Vector4<f32>,
    Matrix2<f32>,
    Matrix3<f32>,
    Matrix4<f32>
);

/// Introspected description of an active uniform.
pub struct UniformInfo<S: GraphicsServer> {
    /// `None` when the driver reports the uniform but gives no location for it.
    pub location: Option<S::UniformLocation>,
    pub gl_type: u32,
    /// `None` if the declared type cannot be uploaded by this layer.
    pub kind: Option<UniformKind>,
    /// Array size, 1 for non-array uniforms.
    pub size: i32,
    pub(crate) uploader: Option<UniformUploader<S>>,
}

impl<S: GraphicsServer> UniformInfo<S> {
    pub(crate) fn new(location: Option<S::UniformLocation>, gl_type: u32, size: i32) -> Self {
        let kind = UniformKind::from_gl_type(gl_type);
        Self {
            location,
            gl_type,
            kind,
            size,
            uploader: kind.map(UniformKind::uploader::<S>),
        }
    }
}

/// Introspected description of an active vertex attribute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeInfo {
    /// `None` when the attribute is declared but has no location (optimized out).
    pub location: Option<u32>,
    pub gl_type: u32,
    pub size: i32,
}

#[cfg(test)]
mod test {
    use crate::{
        core::algebra::Matrix4,
        recording::{Call, RecordingServer},
        uniform::{MatrixSize, UniformKind, UniformValue, VectorSize},
    };

    #[test]
    fn gl_types_resolve_to_kinds() {
        assert_eq!(UniformKind::from_gl_type(glow::FLOAT_VEC3), Some(UniformKind::FloatVec3));
        assert_eq!(UniformKind::from_gl_type(glow::SAMPLER_CUBE), Some(UniformKind::SamplerCube));
        assert_eq!(UniformKind::from_gl_type(glow::SAMPLER_3D), None);
    }

    #[test]
    fn samplers_and_bools_upload_as_ints() {
        let server = RecordingServer::new();

        assert!(UniformKind::Sampler2D.uploader::<RecordingServer>()(
            &server,
            &0,
            &UniformValue::Int(3)
        ));
        assert!(UniformKind::Bool.uploader::<RecordingServer>()(
            &server,
            &1,
            &UniformValue::Bool(true)
        ));

        assert_eq!(
            server.calls(),
            vec![
                Call::UploadUniformI32 {
                    location: 0,
                    size: VectorSize::One,
                    data: vec![3]
                },
                Call::UploadUniformI32 {
                    location: 1,
                    size: VectorSize::One,
                    data: vec![1]
                },
            ]
        );
    }

    #[test]
    fn matrix_requires_flat_buffer() {
        let server = RecordingServer::new();
        let upload = UniformKind::FloatMat4.uploader::<RecordingServer>();

        assert!(!upload(&server, &0, &UniformValue::Float(1.0)));
        assert!(upload(&server, &0, &UniformValue::from(&Matrix4::<f32>::identity())));

        assert_eq!(
            server.calls(),
            vec![Call::UploadUniformMatrix {
                location: 0,
                size: MatrixSize::Four,
                data: Matrix4::<f32>::identity().as_slice().to_vec()
            }]
        );
    }
}
