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
    core::log::{Log, MessageKind},
    error::FrameworkError,
    server::GraphicsServer,
};
use serde::{Deserialize, Serialize};
use std::rc::{Rc, Weak};

/// Pipeline stage a shader runs in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShaderKind {
    Vertex,
    Fragment,
}

/// A single compiled shader object.
///
/// The native handle is created and compiled eagerly in [`Shader::compile`]. It is destroyed by
/// [`Shader::release`] or when the shader is dropped, whichever happens first.
pub struct Shader<S: GraphicsServer> {
    server: Weak<S>,
    kind: ShaderKind,
    id: Option<S::Shader>,
}

impl<S: GraphicsServer> Shader<S> {
    /// Creates a native shader of the given kind and compiles `source` into it. On failure the
    /// native object is deleted and the compiler log is returned verbatim.
    pub fn compile(server: &Rc<S>, kind: ShaderKind, source: &str) -> Result<Self, FrameworkError> {
        let id = server.create_shader(kind)?;

        let status = server.compile_shader(id, source);
        let compilation_message = server.shader_info_log(id);

        if !status {
            Log::writeln(
                MessageKind::Error,
                format!("Failed to compile {kind:?} shader: {compilation_message}"),
            );
            server.delete_shader(id);
            return Err(FrameworkError::ShaderCompilationFailed {
                kind,
                error_message: compilation_message,
            });
        }

        if compilation_message.trim().is_empty() {
            Log::info(format!("{kind:?} shader compiled successfully!"));
        } else {
            Log::info(format!(
                "{kind:?} shader compiled successfully!\nAdditional info: {compilation_message}"
            ));
        }

        Ok(Self {
            server: Rc::downgrade(server),
            kind,
            id: Some(id),
        })
    }

    pub fn vertex(server: &Rc<S>, source: &str) -> Result<Self, FrameworkError> {
        Self::compile(server, ShaderKind::Vertex, source)
    }

    pub fn fragment(server: &Rc<S>, source: &str) -> Result<Self, FrameworkError> {
        Self::compile(server, ShaderKind::Fragment, source)
    }

    pub fn kind(&self) -> ShaderKind {
        self.kind
    }

    /// Native handle, `None` once released.
    pub fn native(&self) -> Option<S::Shader> {
        self.id
    }

    pub fn is_released(&self) -> bool {
        self.id.is_none()
    }

    /// Deletes the native shader. Calling it again does nothing.
    pub fn release(&mut self) {
        if let Some(id) = self.id.take() {
            if let Some(server) = self.server.upgrade() {
                server.delete_shader(id);
            }
        }
    }
}

impl<S: GraphicsServer> Drop for Shader<S> {
    fn drop(&mut self) {
        self.release();
    }
}
