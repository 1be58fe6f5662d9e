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
    buffer::{BufferKind, BufferUsage},
    context::{ContextOptions, GraphicsContext, PowerPreference},
    core::{color::Color, log::Log},
    error::FrameworkError,
    gl::ToGlConstant,
    server::{ActiveVariable, Capability, GraphicsServer},
    shader::ShaderKind,
    uniform::{MatrixSize, VectorSize},
    vertex_array::AttributeType,
    BlendFactor, ClearFlags, CompareFunc, PrimitiveMode,
};
use glow::HasContext;
#[cfg(not(target_arch = "wasm32"))]
use glutin::{
    config::{ConfigTemplateBuilder, GlConfig},
    context::{
        ContextApi, ContextAttributesBuilder, GlProfile, NotCurrentGlContext,
        PossiblyCurrentContext, Version,
    },
    display::{GetGlDisplay, GlDisplay},
    surface::{GlSurface, Surface, WindowSurface},
};
#[cfg(not(target_arch = "wasm32"))]
use glutin_winit::{DisplayBuilder, GlWindow};
#[cfg(not(target_arch = "wasm32"))]
use raw_window_handle::HasRawWindowHandle;
use std::{
    cell::{Cell, RefCell},
    marker::PhantomData,
    rc::Rc,
};
#[cfg(not(target_arch = "wasm32"))]
use std::{ffi::CString, num::NonZeroU32};
use winit::{
    event_loop::EventLoopWindowTarget,
    window::{Window, WindowBuilder},
};

#[derive(Debug, Copy, Clone, Ord, PartialOrd, Eq, PartialEq)]
pub enum GlKind {
    OpenGL,
    OpenGLES,
}

/// Shader sources are written against GLSL ES 3.00, desktop core profiles get the matching
/// desktop version line instead.
fn prepare_source_code(code: &str, gl_kind: GlKind) -> String {
    if gl_kind == GlKind::OpenGL {
        code.replacen("#version 300 es", "#version 330 core", 1)
    } else {
        code.to_owned()
    }
}

pub(crate) struct InnerState {
    gl_kind: GlKind,
    surface_size: Cell<(u32, u32)>,
    #[cfg(not(target_arch = "wasm32"))]
    gl_context: PossiblyCurrentContext,
    #[cfg(not(target_arch = "wasm32"))]
    gl_surface: Surface<WindowSurface>,
    #[cfg(target_arch = "wasm32")]
    canvas: crate::core::web_sys::HtmlCanvasElement,
}

pub struct GlGraphicsServer {
    pub gl: glow::Context,
    pub(crate) state: RefCell<InnerState>,
    // Force compiler to not implement Send and Sync, because OpenGL is not thread-safe.
    thread_mark: PhantomData<*const u8>,
}

impl GlGraphicsServer {
    #[allow(unused_mut)]
    pub fn new(
        options: &ContextOptions,
        window_target: &EventLoopWindowTarget<()>,
        window_builder: WindowBuilder,
    ) -> Result<(Window, Rc<Self>), FrameworkError> {
        #[cfg(not(target_arch = "wasm32"))]
        let (window, gl_context, gl_surface, mut context, gl_kind) = {
            let mut template = ConfigTemplateBuilder::new()
                .with_alpha_size(if options.alpha { 8 } else { 0 })
                .with_depth_size(if options.depth { 24 } else { 0 });

            template = match options.power_preference {
                PowerPreference::Default => template,
                PowerPreference::LowPower => template.prefer_hardware_accelerated(Some(false)),
                PowerPreference::HighPerformance => {
                    template.prefer_hardware_accelerated(Some(true))
                }
            };

            if options.antialias {
                template = template.with_multisampling(4);
            }

            if options.preserve_drawing_buffer {
                Log::warn("preserve_drawing_buffer has no effect on desktop surfaces");
            }

            let (opt_window, gl_config) = DisplayBuilder::new()
                .with_window_builder(Some(window_builder))
                .build(window_target, template, |configs| {
                    configs
                        .reduce(|best, config| {
                            if config.num_samples() > best.num_samples() {
                                config
                            } else {
                                best
                            }
                        })
                        .expect("display offers at least one matching config")
                })?;

            let window = opt_window.ok_or_else(|| {
                FrameworkError::ContextCreationFailed("Unable to create a window".to_owned())
            })?;

            let raw_window_handle = window.raw_window_handle();

            let gl_display = gl_config.display();

            let gl3_3_core_context_attributes = ContextAttributesBuilder::new()
                .with_debug(cfg!(debug_assertions))
                .with_profile(GlProfile::Core)
                .with_context_api(ContextApi::OpenGl(Some(Version::new(3, 3))))
                .build(Some(raw_window_handle));

            let gles3_context_attributes = ContextAttributesBuilder::new()
                .with_debug(cfg!(debug_assertions))
                .with_profile(GlProfile::Core)
                .with_context_api(ContextApi::Gles(Some(Version::new(3, 0))))
                .build(Some(raw_window_handle));

            unsafe {
                let attrs = window.build_surface_attributes(Default::default());

                let gl_surface = gl_display.create_window_surface(&gl_config, &attrs)?;

                let (non_current_gl_context, gl_kind) = if let Ok(gl3_3_core_context) =
                    gl_display.create_context(&gl_config, &gl3_3_core_context_attributes)
                {
                    (gl3_3_core_context, GlKind::OpenGL)
                } else {
                    (
                        gl_display.create_context(&gl_config, &gles3_context_attributes)?,
                        GlKind::OpenGLES,
                    )
                };

                let gl_context = non_current_gl_context.make_current(&gl_surface)?;

                (
                    window,
                    gl_context,
                    gl_surface,
                    glow::Context::from_loader_function(|s| {
                        CString::new(s)
                            .map(|s| gl_display.get_proc_address(&s))
                            .unwrap_or(std::ptr::null())
                    }),
                    gl_kind,
                )
            }
        };

        #[cfg(target_arch = "wasm32")]
        let (window, canvas, mut context, gl_kind) = {
            use crate::core::{wasm_bindgen::JsCast, web_sys::WebGl2RenderingContext};
            use serde::Serialize;
            use winit::{
                dpi::{LogicalSize, PhysicalSize},
                platform::web::WindowExtWebSys,
            };

            let inner_size = window_builder.window_attributes().inner_size;
            let window = window_builder.build(window_target)?;

            let web_window = crate::core::web_sys::window().ok_or_else(|| {
                FrameworkError::ContextCreationFailed("No browser window".to_owned())
            })?;
            let scale_factor = web_window.device_pixel_ratio();

            let canvas = window.canvas().ok_or_else(|| {
                FrameworkError::ContextCreationFailed("Window has no canvas".to_owned())
            })?;

            if let Some(inner_size) = inner_size {
                let physical_inner_size: PhysicalSize<u32> = inner_size.to_physical(scale_factor);

                canvas.set_width(physical_inner_size.width);
                canvas.set_height(physical_inner_size.height);

                let logical_inner_size: LogicalSize<f64> = inner_size.to_logical(scale_factor);
                Log::verify(
                    canvas
                        .style()
                        .set_property("width", &format!("{}px", logical_inner_size.width)),
                );
                Log::verify(
                    canvas
                        .style()
                        .set_property("height", &format!("{}px", logical_inner_size.height)),
                );
            }

            let body = web_window
                .document()
                .and_then(|document| document.body())
                .ok_or_else(|| {
                    FrameworkError::ContextCreationFailed("Document has no body".to_owned())
                })?;

            body.append_child(&canvas).map_err(|e| {
                FrameworkError::ContextCreationFailed(format!("Unable to attach canvas: {e:?}"))
            })?;

            #[derive(Serialize)]
            #[allow(non_snake_case)]
            struct ContextAttributes {
                alpha: bool,
                antialias: bool,
                depth: bool,
                preserveDrawingBuffer: bool,
                powerPreference: String,
            }

            let context_attributes = ContextAttributes {
                alpha: options.alpha,
                antialias: options.antialias,
                depth: options.depth,
                preserveDrawingBuffer: options.preserve_drawing_buffer,
                powerPreference: options.power_preference.as_ref().to_owned(),
            };

            let context_attributes = serde_wasm_bindgen::to_value(&context_attributes)
                .map_err(|e| FrameworkError::ContextCreationFailed(e.to_string()))?;

            let webgl2_context = canvas
                .get_context_with_context_options("webgl2", &context_attributes)
                .ok()
                .flatten()
                .ok_or_else(|| {
                    FrameworkError::ContextCreationFailed("WebGL2 is not supported".to_owned())
                })?
                .dyn_into::<WebGl2RenderingContext>()
                .map_err(|_| {
                    FrameworkError::ContextCreationFailed(
                        "webgl2 context has unexpected type".to_owned(),
                    )
                })?;

            (
                window,
                canvas,
                glow::Context::from_webgl2_context(webgl2_context),
                GlKind::OpenGLES,
            )
        };

        let inner_size = window.inner_size();
        let surface_size = (inner_size.width.max(1), inner_size.height.max(1));

        #[cfg(not(target_arch = "wasm32"))]
        gl_surface.resize(
            &gl_context,
            NonZeroU32::new(surface_size.0).unwrap_or(NonZeroU32::MIN),
            NonZeroU32::new(surface_size.1).unwrap_or(NonZeroU32::MIN),
        );

        Log::info(format!(
            "Graphics context created: {:?} {:?}",
            gl_kind,
            context.version()
        ));

        #[cfg(all(debug_assertions, not(target_arch = "wasm32")))]
        unsafe {
            use crate::core::log::MessageKind;

            if context.supported_extensions().contains("GL_KHR_debug") {
                context.debug_message_callback(|source, msg_type, id, severity, message| {
                    let message_kind = if severity == glow::DEBUG_SEVERITY_HIGH {
                        MessageKind::Error
                    } else if severity == glow::DEBUG_SEVERITY_MEDIUM
                        || severity == glow::DEBUG_SEVERITY_LOW
                    {
                        MessageKind::Warning
                    } else {
                        // Notifications are spam.
                        return;
                    };

                    let source = match source {
                        glow::DEBUG_SOURCE_API => "OpenGL API",
                        glow::DEBUG_SOURCE_WINDOW_SYSTEM => "Window system",
                        glow::DEBUG_SOURCE_SHADER_COMPILER => "Shader compiler",
                        glow::DEBUG_SOURCE_THIRD_PARTY => "Third party",
                        glow::DEBUG_SOURCE_APPLICATION => "Application",
                        _ => "Other",
                    };

                    let msg_type = match msg_type {
                        glow::DEBUG_TYPE_ERROR => "Error",
                        glow::DEBUG_TYPE_DEPRECATED_BEHAVIOR => "Deprecated behavior",
                        glow::DEBUG_TYPE_UNDEFINED_BEHAVIOR => "Undefined behavior",
                        glow::DEBUG_TYPE_PORTABILITY => "Portability",
                        glow::DEBUG_TYPE_PERFORMANCE => "Performance",
                        _ => "Other",
                    };

                    Log::writeln(
                        message_kind,
                        format!(
                            "OpenGL Message\n\
                            \tSource: {source}\n\
                            \tType: {msg_type}\n\
                            \tId: {id}\n\
                            \tMessage: {message}"
                        ),
                    );
                })
            }
        }

        let state = InnerState {
            gl_kind,
            surface_size: Cell::new(surface_size),
            #[cfg(not(target_arch = "wasm32"))]
            gl_context,
            #[cfg(not(target_arch = "wasm32"))]
            gl_surface,
            #[cfg(target_arch = "wasm32")]
            canvas,
        };

        let server = Rc::new(Self {
            gl: context,
            state: RefCell::new(state),
            thread_mark: PhantomData,
        });

        Ok((window, server))
    }

    pub fn gl_kind(&self) -> GlKind {
        self.state.borrow().gl_kind
    }
}

impl GraphicsContext<GlGraphicsServer> {
    /// Creates a window (a canvas in the browser) together with a GL context bound to it.
    pub fn create(
        options: &ContextOptions,
        window_target: &EventLoopWindowTarget<()>,
        window_builder: WindowBuilder,
    ) -> Result<(Window, Self), FrameworkError> {
        let (window, server) = GlGraphicsServer::new(options, window_target, window_builder)?;
        Ok((window, GraphicsContext::new(server)))
    }
}

impl GraphicsServer for GlGraphicsServer {
    type Shader = glow::Shader;
    type Program = glow::Program;
    type Buffer = glow::Buffer;
    type VertexArray = glow::VertexArray;
    type UniformLocation = glow::UniformLocation;

    fn create_shader(&self, kind: ShaderKind) -> Result<Self::Shader, FrameworkError> {
        unsafe { self.gl.create_shader(kind.into_gl()) }.map_err(|reason| {
            FrameworkError::ObjectCreationFailed {
                object: "shader",
                reason,
            }
        })
    }

    fn compile_shader(&self, shader: Self::Shader, source: &str) -> bool {
        let source = prepare_source_code(source, self.gl_kind());
        unsafe {
            self.gl.shader_source(shader, &source);
            self.gl.compile_shader(shader);
            self.gl.get_shader_compile_status(shader)
        }
    }

    fn shader_info_log(&self, shader: Self::Shader) -> String {
        unsafe { self.gl.get_shader_info_log(shader) }
    }

    fn delete_shader(&self, shader: Self::Shader) {
        unsafe { self.gl.delete_shader(shader) }
    }

    fn create_program(&self) -> Result<Self::Program, FrameworkError> {
        unsafe { self.gl.create_program() }.map_err(|reason| {
            FrameworkError::ObjectCreationFailed {
                object: "program",
                reason,
            }
        })
    }

    fn attach_shader(&self, program: Self::Program, shader: Self::Shader) {
        unsafe { self.gl.attach_shader(program, shader) }
    }

    fn transform_feedback_varyings(&self, program: Self::Program, varyings: &[&str]) {
        unsafe {
            self.gl
                .transform_feedback_varyings(program, varyings, glow::INTERLEAVED_ATTRIBS)
        }
    }

    fn link_program(&self, program: Self::Program) -> bool {
        unsafe {
            self.gl.link_program(program);
            self.gl.get_program_link_status(program)
        }
    }

    fn program_info_log(&self, program: Self::Program) -> String {
        unsafe { self.gl.get_program_info_log(program) }
    }

    fn delete_program(&self, program: Self::Program) {
        unsafe { self.gl.delete_program(program) }
    }

    fn use_program(&self, program: Option<Self::Program>) {
        unsafe { self.gl.use_program(program) }
    }

    fn active_uniforms(&self, program: Self::Program) -> Vec<ActiveVariable> {
        unsafe {
            (0..self.gl.get_active_uniforms(program))
                .filter_map(|index| self.gl.get_active_uniform(program, index))
                .map(|uniform| ActiveVariable {
                    name: uniform.name,
                    gl_type: uniform.utype,
                    size: uniform.size,
                })
                .collect()
        }
    }

    fn uniform_location(
        &self,
        program: Self::Program,
        name: &str,
    ) -> Option<Self::UniformLocation> {
        unsafe { self.gl.get_uniform_location(program, name) }
    }

    fn active_attributes(&self, program: Self::Program) -> Vec<ActiveVariable> {
        unsafe {
            (0..self.gl.get_active_attributes(program))
                .filter_map(|index| self.gl.get_active_attribute(program, index))
                .map(|attribute| ActiveVariable {
                    name: attribute.name,
                    gl_type: attribute.atype,
                    size: attribute.size,
                })
                .collect()
        }
    }

    fn attribute_location(&self, program: Self::Program, name: &str) -> Option<u32> {
        unsafe { self.gl.get_attrib_location(program, name) }
    }

    fn upload_uniform_f32(
        &self,
        location: &Self::UniformLocation,
        size: VectorSize,
        data: &[f32],
    ) {
        let location = Some(location);
        unsafe {
            match size {
                VectorSize::One => self.gl.uniform_1_f32_slice(location, data),
                VectorSize::Two => self.gl.uniform_2_f32_slice(location, data),
                VectorSize::Three => self.gl.uniform_3_f32_slice(location, data),
                VectorSize::Four => self.gl.uniform_4_f32_slice(location, data),
            }
        }
    }

    fn upload_uniform_i32(
        &self,
        location: &Self::UniformLocation,
        size: VectorSize,
        data: &[i32],
    ) {
        let location = Some(location);
        unsafe {
            match size {
                VectorSize::One => self.gl.uniform_1_i32_slice(location, data),
                VectorSize::Two => self.gl.uniform_2_i32_slice(location, data),
                VectorSize::Three => self.gl.uniform_3_i32_slice(location, data),
                VectorSize::Four => self.gl.uniform_4_i32_slice(location, data),
            }
        }
    }

    fn upload_uniform_matrix(
        &self,
        location: &Self::UniformLocation,
        size: MatrixSize,
        data: &[f32],
    ) {
        let location = Some(location);
        unsafe {
            match size {
                MatrixSize::Two => self.gl.uniform_matrix_2_f32_slice(location, false, data),
                MatrixSize::Three => self.gl.uniform_matrix_3_f32_slice(location, false, data),
                MatrixSize::Four => self.gl.uniform_matrix_4_f32_slice(location, false, data),
            }
        }
    }

    fn create_buffer(&self) -> Result<Self::Buffer, FrameworkError> {
        unsafe { self.gl.create_buffer() }.map_err(|reason| {
            FrameworkError::ObjectCreationFailed {
                object: "buffer",
                reason,
            }
        })
    }

    fn bind_buffer(&self, kind: BufferKind, buffer: Option<Self::Buffer>) {
        unsafe { self.gl.bind_buffer(kind.into_gl(), buffer) }
    }

    fn buffer_data(&self, kind: BufferKind, data: &[u8], usage: BufferUsage) {
        unsafe {
            self.gl
                .buffer_data_u8_slice(kind.into_gl(), data, usage.into_gl())
        }
    }

    fn delete_buffer(&self, buffer: Self::Buffer) {
        unsafe { self.gl.delete_buffer(buffer) }
    }

    fn create_vertex_array(&self) -> Result<Self::VertexArray, FrameworkError> {
        unsafe { self.gl.create_vertex_array() }.map_err(|reason| {
            FrameworkError::ObjectCreationFailed {
                object: "vertex array",
                reason,
            }
        })
    }

    fn bind_vertex_array(&self, vertex_array: Option<Self::VertexArray>) {
        unsafe { self.gl.bind_vertex_array(vertex_array) }
    }

    fn delete_vertex_array(&self, vertex_array: Self::VertexArray) {
        unsafe { self.gl.delete_vertex_array(vertex_array) }
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        unsafe { self.gl.enable_vertex_attrib_array(index) }
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
        unsafe {
            self.gl.vertex_attrib_pointer_f32(
                index,
                size,
                data_type.into_gl(),
                normalized,
                stride,
                offset,
            )
        }
    }

    fn vertex_attrib_divisor(&self, index: u32, divisor: u32) {
        unsafe { self.gl.vertex_attrib_divisor(index, divisor) }
    }

    fn draw_arrays(&self, mode: PrimitiveMode, first: i32, count: i32) {
        unsafe { self.gl.draw_arrays(mode.into_gl(), first, count) }
    }

    fn draw_elements(&self, mode: PrimitiveMode, count: i32, offset: i32) {
        unsafe {
            self.gl
                .draw_elements(mode.into_gl(), count, glow::UNSIGNED_SHORT, offset)
        }
    }

    fn draw_arrays_instanced(&self, mode: PrimitiveMode, first: i32, count: i32, instances: i32) {
        unsafe {
            self.gl
                .draw_arrays_instanced(mode.into_gl(), first, count, instances)
        }
    }

    fn draw_elements_instanced(
        &self,
        mode: PrimitiveMode,
        count: i32,
        offset: i32,
        instances: i32,
    ) {
        unsafe {
            self.gl.draw_elements_instanced(
                mode.into_gl(),
                count,
                glow::UNSIGNED_SHORT,
                offset,
                instances,
            )
        }
    }

    fn set_capability(&self, capability: Capability, enabled: bool) {
        unsafe {
            if enabled {
                self.gl.enable(capability.into_gl());
            } else {
                self.gl.disable(capability.into_gl());
            }
        }
    }

    fn depth_func(&self, func: CompareFunc) {
        unsafe { self.gl.depth_func(func.into_gl()) }
    }

    fn blend_func(&self, src: BlendFactor, dst: BlendFactor) {
        unsafe { self.gl.blend_func(src.into_gl(), dst.into_gl()) }
    }

    fn clear_color(&self, color: Color) {
        unsafe { self.gl.clear_color(color.r, color.g, color.b, color.a) }
    }

    fn clear(&self, flags: ClearFlags) {
        unsafe { self.gl.clear(flags.into_gl()) }
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.viewport(x, y, width, height) }
    }

    fn resize_surface(&self, width: u32, height: u32) {
        let state = self.state.borrow();

        // Window surfaces cannot be empty, a canvas can.
        #[cfg(not(target_arch = "wasm32"))]
        let (width, height) = {
            let width = NonZeroU32::new(width).unwrap_or(NonZeroU32::MIN);
            let height = NonZeroU32::new(height).unwrap_or(NonZeroU32::MIN);
            state.gl_surface.resize(&state.gl_context, width, height);
            (width.get(), height.get())
        };

        #[cfg(target_arch = "wasm32")]
        {
            state.canvas.set_width(width);
            state.canvas.set_height(height);
        }

        state.surface_size.set((width, height));
    }

    fn surface_size(&self) -> (u32, u32) {
        self.state.borrow().surface_size.get()
    }

    fn swap_buffers(&self) -> Result<(), FrameworkError> {
        #[cfg(not(target_arch = "wasm32"))]
        {
            let state = self.state.borrow();
            Ok(state.gl_surface.swap_buffers(&state.gl_context)?)
        }

        #[cfg(target_arch = "wasm32")]
        {
            Ok(())
        }
    }
}

#[cfg(test)]
mod test {
    use super::{prepare_source_code, GlKind};

    const SOURCE: &str = "#version 300 es\nprecision highp float;\nvoid main() {}\n";

    #[test]
    fn desktop_gets_core_version() {
        let prepared = prepare_source_code(SOURCE, GlKind::OpenGL);
        assert!(prepared.starts_with("#version 330 core\n"));
        assert!(prepared.ends_with("void main() {}\n"));
    }

    #[test]
    fn es_source_is_untouched() {
        assert_eq!(prepare_source_code(SOURCE, GlKind::OpenGLES), SOURCE);
    }
}
