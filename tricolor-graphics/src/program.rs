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
    shader::{Shader, ShaderKind},
    uniform::{AttributeInfo, UniformInfo, UniformValue},
};
use fxhash::FxHashMap;
use std::rc::{Rc, Weak};

/// Additional parameters of program linking.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProgramOptions {
    /// Names of the vertex shader outputs captured by transform feedback. They are declared with
    /// interleaved layout. Empty means no transform feedback.
    pub transform_feedback_varyings: Vec<String>,
}

impl ProgramOptions {
    pub fn with_transform_feedback_varyings<I, N>(mut self, varyings: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        self.transform_feedback_varyings = varyings.into_iter().map(Into::into).collect();
        self
    }
}

/// A linked pair of vertex and fragment shaders with the tables of its active uniforms and
/// attributes.
pub struct GpuProgram<S: GraphicsServer> {
    server: Weak<S>,
    id: Option<S::Program>,
    uniforms: FxHashMap<String, UniformInfo<S>>,
    attributes: FxHashMap<String, AttributeInfo>,
}

fn check_kind<S: GraphicsServer>(
    shader: &Shader<S>,
    expected: ShaderKind,
) -> Result<S::Shader, FrameworkError> {
    if shader.kind() != expected {
        return Err(FrameworkError::ShaderKindMismatch {
            expected,
            actual: shader.kind(),
        });
    }
    shader
        .native()
        .ok_or(FrameworkError::ObjectReleased("shader"))
}

impl<S: GraphicsServer> GpuProgram<S> {
    /// Compiles both stages and links them. A compile error of either stage is returned as is;
    /// whatever was compiled before the error is released.
    pub fn from_source(
        server: &Rc<S>,
        vertex_source: &str,
        fragment_source: &str,
        options: &ProgramOptions,
    ) -> Result<Self, FrameworkError> {
        let vertex_shader = Shader::vertex(server, vertex_source)?;
        let fragment_shader = Shader::fragment(server, fragment_source)?;
        Self::link(server, vertex_shader, fragment_shader, options)
    }

    /// Links the shaders into a program and introspects it.
    ///
    /// The shaders are consumed: both are released once the link attempt is over, whether it
    /// succeeded or not, so the program never refers to them afterwards. On link failure the
    /// program object is deleted before the error is returned.
    pub fn link(
        server: &Rc<S>,
        mut vertex_shader: Shader<S>,
        mut fragment_shader: Shader<S>,
        options: &ProgramOptions,
    ) -> Result<Self, FrameworkError> {
        let result = Self::link_internal(server, &vertex_shader, &fragment_shader, options);
        vertex_shader.release();
        fragment_shader.release();
        result
    }

    fn link_internal(
        server: &Rc<S>,
        vertex_shader: &Shader<S>,
        fragment_shader: &Shader<S>,
        options: &ProgramOptions,
    ) -> Result<Self, FrameworkError> {
        let vertex = check_kind(vertex_shader, ShaderKind::Vertex)?;
        let fragment = check_kind(fragment_shader, ShaderKind::Fragment)?;

        let program = server.create_program()?;
        server.attach_shader(program, vertex);
        server.attach_shader(program, fragment);

        if !options.transform_feedback_varyings.is_empty() {
            let varyings = options
                .transform_feedback_varyings
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>();
            server.transform_feedback_varyings(program, &varyings);
        }

        let status = server.link_program(program);
        let link_message = server.program_info_log(program);

        if !status {
            Log::writeln(
                MessageKind::Error,
                format!("Failed to link program: {link_message}"),
            );
            server.delete_program(program);
            return Err(FrameworkError::ShaderLinkingFailed {
                error_message: link_message,
            });
        }

        if link_message.trim().is_empty() {
            Log::info("Program linked successfully!");
        } else {
            Log::info(format!(
                "Program linked successfully!\nAdditional info: {link_message}"
            ));
        }

        let (uniforms, attributes) = introspect(&**server, program);

        Ok(Self {
            server: Rc::downgrade(server),
            id: Some(program),
            uniforms,
            attributes,
        })
    }

    /// Location of an active uniform. `None` if the program has no such uniform.
    pub fn uniform_location(&self, name: &str) -> Option<&S::UniformLocation> {
        self.uniforms.get(name)?.location.as_ref()
    }

    /// Location of an active attribute. `None` if the program has no such attribute or it was
    /// optimized out; such attributes must not be bound.
    pub fn attribute_location(&self, name: &str) -> Option<u32> {
        self.attributes.get(name)?.location
    }

    pub fn uniforms(&self) -> &FxHashMap<String, UniformInfo<S>> {
        &self.uniforms
    }

    pub fn attributes(&self) -> &FxHashMap<String, AttributeInfo> {
        &self.attributes
    }

    /// Makes this program current.
    pub fn use_program(&self) -> Result<(), FrameworkError> {
        let id = self.id.ok_or(FrameworkError::ObjectReleased("program"))?;
        let server = self
            .server
            .upgrade()
            .ok_or(FrameworkError::ObjectReleased("graphics server"))?;
        server.use_program(Some(id));
        Ok(())
    }

    /// Uploads a uniform value through the function chosen for its declared type. Makes the
    /// program current, uniform uploads always target the current program.
    pub fn try_set_uniform<'a>(
        &self,
        name: &str,
        value: impl Into<UniformValue<'a>>,
    ) -> Result<(), FrameworkError> {
        let uniform = self
            .uniforms
            .get(name)
            .ok_or_else(|| FrameworkError::UnableToFindShaderUniform(name.to_owned()))?;

        let (Some(uploader), Some(kind)) = (uniform.uploader, uniform.kind) else {
            return Err(FrameworkError::UnsupportedUniformType {
                name: name.to_owned(),
                gl_type: uniform.gl_type,
            });
        };

        let location = uniform
            .location
            .as_ref()
            .ok_or_else(|| FrameworkError::UnableToFindShaderUniform(name.to_owned()))?;

        self.use_program()?;

        let server = self
            .server
            .upgrade()
            .ok_or(FrameworkError::ObjectReleased("graphics server"))?;

        if uploader(&*server, location, &value.into()) {
            Ok(())
        } else {
            Err(FrameworkError::UniformValueMismatch {
                name: name.to_owned(),
                expected: kind.glsl_name(),
            })
        }
    }

    /// Same as [`Self::try_set_uniform`], but any error is logged as a warning and ignored.
    /// Uniforms can be optimized away by the driver, which must not break rendering.
    pub fn set_uniform<'a>(&self, name: &str, value: impl Into<UniformValue<'a>>) {
        if let Err(err) = self.try_set_uniform(name, value) {
            Log::writeln(MessageKind::Warning, err.to_string());
        }
    }

    pub fn set_uniforms<'a, I, N, V>(&self, uniforms: I)
    where
        I: IntoIterator<Item = (N, V)>,
        N: AsRef<str>,
        V: Into<UniformValue<'a>>,
    {
        for (name, value) in uniforms {
            self.set_uniform(name.as_ref(), value);
        }
    }

    /// Native handle, `None` once released.
    pub fn native(&self) -> Option<S::Program> {
        self.id
    }

    /// Deletes the native program. Calling it again does nothing. The shaders the program was
    /// linked from were already released by [`Self::link`].
    pub fn release(&mut self) {
        if let Some(id) = self.id.take() {
            if let Some(server) = self.server.upgrade() {
                server.delete_program(id);
            }
        }
    }
}

impl<S: GraphicsServer> Drop for GpuProgram<S> {
    fn drop(&mut self) {
        self.release();
    }
}

type Tables<S> = (FxHashMap<String, UniformInfo<S>>, FxHashMap<String, AttributeInfo>);

fn introspect<S: GraphicsServer>(server: &S, program: S::Program) -> Tables<S> {
    let uniforms = server
        .active_uniforms(program)
        .into_iter()
        .map(|active| {
            let location = server.uniform_location(program, &active.name);
            let info = UniformInfo::new(location, active.gl_type, active.size);
            (active.name, info)
        })
        .collect();

    let attributes = server
        .active_attributes(program)
        .into_iter()
        .map(|active| {
            let info = AttributeInfo {
                location: server.attribute_location(program, &active.name),
                gl_type: active.gl_type,
                size: active.size,
            };
            (active.name, info)
        })
        .collect();

    (uniforms, attributes)
}

#[cfg(test)]
mod test {
    use crate::{
        core::algebra::{Matrix4, Vector3},
        error::FrameworkError,
        program::{GpuProgram, ProgramOptions},
        recording::{Call, RecordingServer},
        shader::{Shader, ShaderKind},
        uniform::{MatrixSize, UniformKind, UniformValue, VectorSize},
    };
    use std::{collections::HashSet, sync::mpsc::channel};

    const VS: &str = "in vec2 a_position; in vec3 a_color; void main() {}";
    const FS: &str = "uniform float u_time; void main() {}";

    fn triangle_server() -> RecordingServer {
        RecordingServer::new()
            .with_attribute("a_position", glow::FLOAT_VEC2, 1, Some(0))
            .with_attribute("a_color", glow::FLOAT_VEC3, 1, Some(1))
            .with_uniform("u_time", glow::FLOAT, 1)
            .with_uniform("u_tint", glow::FLOAT_VEC3, 1)
            .with_uniform("u_volume", glow::SAMPLER_3D, 1)
    }

    #[test]
    fn introspection_matches_active_variables() {
        let server = triangle_server().into_shared();
        let program = GpuProgram::from_source(&server, VS, FS, &Default::default()).unwrap();

        let uniforms = program.uniforms().keys().cloned().collect::<HashSet<_>>();
        let attributes = program.attributes().keys().cloned().collect::<HashSet<_>>();

        assert_eq!(
            uniforms,
            HashSet::from(["u_time".to_owned(), "u_tint".to_owned(), "u_volume".to_owned()])
        );
        assert_eq!(
            attributes,
            HashSet::from(["a_position".to_owned(), "a_color".to_owned()])
        );
        assert_eq!(program.uniforms()["u_tint"].kind, Some(UniformKind::FloatVec3));
        assert_eq!(program.uniforms()["u_volume"].kind, None);
        assert_eq!(program.attribute_location("a_color"), Some(1));
    }

    #[test]
    fn unknown_names_yield_none() {
        let server = triangle_server().into_shared();
        let program = GpuProgram::from_source(&server, VS, FS, &Default::default()).unwrap();

        assert_eq!(program.attribute_location("a_normal"), None);
        assert!(program.uniform_location("u_missing").is_none());
    }

    #[test]
    fn optimized_out_attribute_has_no_location() {
        let server = RecordingServer::new()
            .with_attribute("a_unused", glow::FLOAT, 1, None)
            .into_shared();
        let program = GpuProgram::from_source(&server, VS, FS, &Default::default()).unwrap();

        assert!(program.attributes().contains_key("a_unused"));
        assert_eq!(program.attribute_location("a_unused"), None);
    }

    #[test]
    fn shaders_are_released_after_successful_link() {
        let server = triangle_server().into_shared();
        let vs = Shader::vertex(&server, VS).unwrap();
        let fs = Shader::fragment(&server, FS).unwrap();
        let (vs_id, fs_id) = (vs.native().unwrap(), fs.native().unwrap());

        let _program = GpuProgram::link(&server, vs, fs, &Default::default()).unwrap();

        assert!(server.calls().contains(&Call::DeleteShader(vs_id)));
        assert!(server.calls().contains(&Call::DeleteShader(fs_id)));
        assert_eq!(server.count(|c| matches!(c, Call::DeleteShader(_))), 2);
    }

    #[test]
    fn link_failure_releases_everything() {
        let server = RecordingServer::new()
            .with_link_error("error: varying v_color not written")
            .into_shared();

        let result = GpuProgram::from_source(&server, VS, FS, &Default::default());

        match result {
            Err(FrameworkError::ShaderLinkingFailed { error_message }) => {
                assert_eq!(error_message, "error: varying v_color not written")
            }
            _ => panic!("link must fail"),
        }
        assert_eq!(server.count(|c| matches!(c, Call::DeleteProgram(_))), 1);
        assert_eq!(server.count(|c| matches!(c, Call::DeleteShader(_))), 2);
    }

    #[test]
    fn swapped_stages_are_rejected() {
        let server = RecordingServer::new().into_shared();
        let vs = Shader::vertex(&server, VS).unwrap();
        let fs = Shader::fragment(&server, FS).unwrap();

        let result = GpuProgram::link(&server, fs, vs, &Default::default());

        assert!(matches!(
            result,
            Err(FrameworkError::ShaderKindMismatch {
                expected: ShaderKind::Vertex,
                actual: ShaderKind::Fragment
            })
        ));
        assert_eq!(server.count(|c| matches!(c, Call::CreateProgram(_))), 0);
        assert_eq!(server.count(|c| matches!(c, Call::DeleteShader(_))), 2);
    }

    #[test]
    fn transform_feedback_varyings_precede_linking() {
        let server = RecordingServer::new().into_shared();
        let options = ProgramOptions::default().with_transform_feedback_varyings(["v_position"]);

        let program = GpuProgram::from_source(&server, VS, FS, &options).unwrap();
        let id = program.native().unwrap();

        let calls = server.calls();
        let varyings = calls
            .iter()
            .position(|c| {
                *c == Call::TransformFeedbackVaryings {
                    program: id,
                    varyings: vec!["v_position".to_owned()],
                }
            })
            .unwrap();
        let link = calls.iter().position(|c| *c == Call::LinkProgram(id)).unwrap();
        assert!(varyings < link);
    }

    #[test]
    fn set_uniform_dispatches_by_declared_type() {
        let server = triangle_server().into_shared();
        let program = GpuProgram::from_source(&server, VS, FS, &Default::default()).unwrap();
        let location = *program.uniform_location("u_tint").unwrap();
        server.clear_calls();

        program.set_uniform("u_tint", &[1.0f32, 0.5, 0.25]);

        assert_eq!(
            server.calls(),
            vec![
                Call::UseProgram(program.native()),
                Call::UploadUniformF32 {
                    location,
                    size: VectorSize::Three,
                    data: vec![1.0, 0.5, 0.25]
                }
            ]
        );
    }

    #[test]
    fn matrix_uniform_goes_through_matrix_upload() {
        let server = triangle_server()
            .with_uniform("u_mvp", glow::FLOAT_MAT4, 1)
            .into_shared();
        let program = GpuProgram::from_source(&server, VS, FS, &Default::default()).unwrap();
        let location = *program.uniform_location("u_mvp").unwrap();
        let mvp = Matrix4::<f32>::new_translation(&Vector3::new(1.0, 2.0, 3.0));
        server.clear_calls();

        program.set_uniform("u_mvp", &mvp);

        assert_eq!(
            server.calls(),
            vec![
                Call::UseProgram(program.native()),
                Call::UploadUniformMatrix {
                    location,
                    size: MatrixSize::Four,
                    data: mvp.as_slice().to_vec()
                }
            ]
        );
        assert!(matches!(
            program.try_set_uniform("u_mvp", 1.0f32),
            Err(FrameworkError::UniformValueMismatch { expected: "mat4", .. })
        ));
    }

    #[test]
    fn set_uniforms_uploads_each_value() {
        let server = triangle_server().into_shared();
        let program = GpuProgram::from_source(&server, VS, FS, &Default::default()).unwrap();
        let time = *program.uniform_location("u_time").unwrap();
        let tint = *program.uniform_location("u_tint").unwrap();
        server.clear_calls();

        program.set_uniforms([
            ("u_time", UniformValue::Float(2.5)),
            ("u_missing", UniformValue::Int(1)),
            ("u_tint", UniformValue::Floats(&[0.0, 1.0, 0.0])),
        ]);

        assert_eq!(
            server.count(|c| matches!(c, Call::UploadUniformF32 { .. })),
            2
        );
        assert!(server.calls().contains(&Call::UploadUniformF32 {
            location: time,
            size: VectorSize::One,
            data: vec![2.5]
        }));
        assert!(server.calls().contains(&Call::UploadUniformF32 {
            location: tint,
            size: VectorSize::Three,
            data: vec![0.0, 1.0, 0.0]
        }));
    }

    #[test]
    fn bad_uniforms_are_warnings_not_errors() {
        let server = triangle_server().into_shared();
        let program = GpuProgram::from_source(&server, VS, FS, &Default::default()).unwrap();
        server.clear_calls();

        let (sender, receiver) = channel();
        crate::core::log::Log::add_listener(sender);

        program.set_uniform("u_bad_uniform_missing", 1.0f32);
        program.set_uniform("u_volume", 0);
        program.set_uniform("u_time", true);

        assert!(matches!(
            program.try_set_uniform("u_volume", 0),
            Err(FrameworkError::UnsupportedUniformType { .. })
        ));
        assert!(matches!(
            program.try_set_uniform("u_time", true),
            Err(FrameworkError::UniformValueMismatch { expected: "float", .. })
        ));
        assert_eq!(
            server.count(|c| matches!(
                c,
                Call::UploadUniformF32 { .. } | Call::UploadUniformI32 { .. }
            )),
            0
        );
        assert!(receiver
            .try_iter()
            .any(|m| m.content.contains("u_bad_uniform_missing")));
    }

    #[test]
    fn release_is_idempotent() {
        let server = triangle_server().into_shared();
        let mut program = GpuProgram::from_source(&server, VS, FS, &Default::default()).unwrap();

        program.release();
        program.release();
        drop(program);

        assert_eq!(server.count(|c| matches!(c, Call::DeleteProgram(_))), 1);
    }
}
