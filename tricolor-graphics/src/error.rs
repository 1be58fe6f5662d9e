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

use crate::shader::ShaderKind;

#[derive(Debug, thiserror::Error)]
pub enum FrameworkError {
    /// The surface could not produce a graphics context of the required version.
    #[error("Unable to create a graphics context: {0}")]
    ContextCreationFailed(String),
    /// The API refused to allocate a native object (shader, program, buffer, etc.).
    #[error("Failed to create {object}: {reason}")]
    ObjectCreationFailed {
        /// Kind of the object, e.g. "shader".
        object: &'static str,
        /// Message reported by the API.
        reason: String,
    },
    /// Compilation of a shader has failed, exact reason is inside `error_message`.
    #[error("Compilation of {kind:?} shader has failed: {error_message}")]
    ShaderCompilationFailed {
        /// Stage of the shader.
        kind: ShaderKind,
        /// Compiler log, verbatim.
        error_message: String,
    },
    /// Means that program link stage failed, exact reason is inside `error_message`.
    #[error("Program linking failed: {error_message}")]
    ShaderLinkingFailed {
        /// Linker log, verbatim.
        error_message: String,
    },
    /// A program must be linked from exactly one vertex and one fragment shader.
    #[error("Expected a {expected:?} shader, got a {actual:?} shader")]
    ShaderKindMismatch {
        expected: ShaderKind,
        actual: ShaderKind,
    },
    /// There is no such shader uniform (could be optimized out).
    #[error("There is no such shader uniform: {0}")]
    UnableToFindShaderUniform(String),
    /// The uniform is declared with a type this layer cannot upload.
    #[error("Uniform {name} has unsupported type 0x{gl_type:X}")]
    UnsupportedUniformType { name: String, gl_type: u32 },
    /// The value passed for a uniform does not fit its declared type.
    #[error("Value of uniform {name} does not match its declared type {expected}")]
    UniformValueMismatch {
        name: String,
        expected: &'static str,
    },
    /// The object was used after an explicit release.
    #[error("Attempt to use a released {0}")]
    ObjectReleased(&'static str),
    /// Custom error. Usually used for internal errors.
    #[error("Custom error: {0}")]
    Custom(String),
}

impl From<String> for FrameworkError {
    fn from(v: String) -> Self {
        Self::Custom(v)
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl From<glutin::error::Error> for FrameworkError {
    fn from(err: glutin::error::Error) -> Self {
        Self::ContextCreationFailed(format!("{err:?}"))
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl From<Box<dyn std::error::Error>> for FrameworkError {
    fn from(err: Box<dyn std::error::Error>) -> Self {
        Self::ContextCreationFailed(format!("{err:?}"))
    }
}

impl From<winit::error::OsError> for FrameworkError {
    fn from(err: winit::error::OsError) -> Self {
        Self::ContextCreationFailed(format!("{err:?}"))
    }
}
