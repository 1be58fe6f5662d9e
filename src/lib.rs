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

//! A single colored triangle drawn through OpenGL on desktop and WebGL2 in the browser.
//!
//! [`SimpleTriangle`] owns everything needed to draw the triangle, [`run`] drives it from a
//! `winit` event loop.

pub mod loader;
pub mod settings;

pub use tricolor_core as core;
pub use tricolor_graphics as graphics;

use crate::{
    core::log::Log,
    graphics::{
        buffer::{BufferKind, BufferUsage, GpuBuffer},
        context::GraphicsContext,
        error::FrameworkError,
        gl::server::GlGraphicsServer,
        program::{GpuProgram, ProgramOptions},
        server::GraphicsServer,
        vertex_array::{AttributeDefinition, VertexArray},
        ClearFlags, DrawCallStatistics, PrimitiveMode,
    },
    loader::{ShaderLoadError, ShaderLoader, ShaderLocators, ShaderSources},
    settings::{SettingsError, TriangleSettings},
};
use std::{cell::RefCell, rc::Rc};
use winit::{
    dpi::LogicalSize,
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    window::WindowBuilder,
};

pub const POSITIONS: [[f32; 2]; 3] = [[0.0, 0.5], [-0.5, -0.5], [0.5, -0.5]];
pub const COLORS: [[f32; 3]; 3] = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

pub const POSITION_ATTRIBUTE: &str = "a_position";
pub const COLOR_ATTRIBUTE: &str = "a_color";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Framework(#[from] FrameworkError),
    #[error(transparent)]
    ShaderLoad(#[from] ShaderLoadError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
}

pub struct SimpleTriangle<S: GraphicsServer> {
    context: GraphicsContext<S>,
    program: GpuProgram<S>,
    position_buffer: GpuBuffer<S>,
    color_buffer: GpuBuffer<S>,
    vertex_array: VertexArray<S>,
}

impl<S: GraphicsServer> SimpleTriangle<S> {
    /// Builds the program from already loaded sources and uploads the geometry. Attributes the
    /// program does not use are left unbound.
    pub fn new(
        context: GraphicsContext<S>,
        sources: &ShaderSources,
    ) -> Result<Self, FrameworkError> {
        context.set_clear_color(crate::core::color::Color::TRANSPARENT);

        let server = context.server();

        let program = GpuProgram::from_source(
            server,
            &sources.vertex,
            &sources.fragment,
            &ProgramOptions::default(),
        )?;

        let position_buffer =
            GpuBuffer::from_slice(server, BufferKind::Vertex, BufferUsage::StaticDraw, &POSITIONS)?;
        let color_buffer =
            GpuBuffer::from_slice(server, BufferKind::Vertex, BufferUsage::StaticDraw, &COLORS)?;

        let mut vertex_array = VertexArray::new(server)?;

        for (name, buffer, size) in [
            (POSITION_ATTRIBUTE, &position_buffer, 2),
            (COLOR_ATTRIBUTE, &color_buffer, 3),
        ] {
            match program.attribute_location(name) {
                Some(location) => {
                    vertex_array.add_attribute(buffer, AttributeDefinition::new(location, size))?
                }
                None => Log::warn(format!("Attribute {name} is not used by the program")),
            }
        }

        Ok(Self {
            context,
            program,
            position_buffer,
            color_buffer,
            vertex_array,
        })
    }

    /// Loads the shader sources and builds the triangle. Nothing is created on the GPU if any
    /// source fails to load.
    pub async fn load(
        context: GraphicsContext<S>,
        loader: &ShaderLoader,
        locators: &ShaderLocators,
    ) -> Result<Self, AppError> {
        let sources = loader.load_all(locators).await?;
        Ok(Self::new(context, &sources)?)
    }

    pub fn context(&self) -> &GraphicsContext<S> {
        &self.context
    }

    pub fn program(&self) -> &GpuProgram<S> {
        &self.program
    }

    pub fn vertex_array(&self) -> &VertexArray<S> {
        &self.vertex_array
    }

    pub fn render(&self) -> Result<DrawCallStatistics, FrameworkError> {
        self.context.clear(ClearFlags::default());
        self.program.use_program()?;
        self.vertex_array.draw(PrimitiveMode::Triangles, 3, 0)
    }

    pub fn resize(&self, width: u32, height: u32) -> Result<DrawCallStatistics, FrameworkError> {
        self.context.resize(width, height);
        self.render()
    }

    /// Releases every GPU object. Safe to call more than once.
    pub fn release(&mut self) {
        self.program.release();
        self.position_buffer.release();
        self.color_buffer.release();
        self.vertex_array.release();
    }
}

fn present(triangle: &SimpleTriangle<GlGraphicsServer>, size: Option<(u32, u32)>) {
    let result = match size {
        Some((width, height)) => triangle.resize(width, height),
        None => triangle.render(),
    };
    Log::verify(result);
    Log::verify(triangle.context().swap_buffers());
}

fn make_loader(settings: &TriangleSettings) -> ShaderLoader {
    match settings.shader_root {
        #[cfg(not(feature = "embedded-shaders"))]
        Some(ref root) => ShaderLoader::new(loader::FetchResolver::with_root(root)),
        _ => ShaderLoader::default(),
    }
}

/// Creates the window and the context, loads the shaders and runs the event loop until the
/// window is closed. Initialization errors are logged; nothing is rendered in that case.
pub fn run(settings: TriangleSettings) -> Result<(), AppError> {
    let event_loop = EventLoop::new()?;

    let window_builder = WindowBuilder::new()
        .with_title(settings.title.clone())
        .with_inner_size(LogicalSize::new(settings.width, settings.height));

    let (window, context) =
        GraphicsContext::<GlGraphicsServer>::create(&settings.context, &event_loop, window_builder)
            .inspect_err(|e| Log::err(format!("Unable to create graphics context: {e}")))?;
    let window = Rc::new(window);

    let triangle: Rc<RefCell<Option<SimpleTriangle<GlGraphicsServer>>>> = Default::default();
    let loader = make_loader(&settings);

    #[cfg(not(target_arch = "wasm32"))]
    {
        let loaded = crate::core::futures::executor::block_on(SimpleTriangle::load(
            context,
            &loader,
            &settings.shaders,
        ))
        .inspect_err(|e| Log::err(format!("Failed to initialize triangle: {e}")))?;
        *triangle.borrow_mut() = Some(loaded);
        window.request_redraw();
    }

    #[cfg(target_arch = "wasm32")]
    {
        let triangle = triangle.clone();
        let window = window.clone();
        let locators = settings.shaders.clone();
        crate::core::wasm_bindgen_futures::spawn_local(async move {
            match SimpleTriangle::load(context, &loader, &locators).await {
                Ok(loaded) => {
                    *triangle.borrow_mut() = Some(loaded);
                    window.request_redraw();
                }
                Err(e) => Log::err(format!("Failed to initialize triangle: {e}")),
            }
        });
    }

    event_loop.run(move |event, window_target| {
        window_target.set_control_flow(ControlFlow::Wait);

        match event {
            Event::WindowEvent { event, window_id } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => window_target.exit(),
                WindowEvent::Resized(size) => {
                    if let Some(triangle) = triangle.borrow().as_ref() {
                        present(triangle, Some((size.width, size.height)));
                    }
                }
                WindowEvent::RedrawRequested => {
                    if let Some(triangle) = triangle.borrow().as_ref() {
                        present(triangle, None);
                    }
                }
                _ => (),
            },
            Event::LoopExiting => {
                if let Some(mut triangle) = triangle.borrow_mut().take() {
                    triangle.release();
                }
            }
            _ => (),
        }
    })?;

    Ok(())
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn start() {
    if let Err(e) = run(TriangleSettings::default()) {
        Log::err(format!("{e}"));
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        core::futures::executor::block_on,
        graphics::recording::{Call, RecordingServer},
        loader::{EmbeddedResolver, LoadFailure},
    };

    const FLOAT_VEC2: u32 = 0x8B50;
    const FLOAT_VEC3: u32 = 0x8B51;

    fn server() -> Rc<RecordingServer> {
        RecordingServer::new()
            .with_attribute(POSITION_ATTRIBUTE, FLOAT_VEC2, 1, Some(0))
            .with_attribute(COLOR_ATTRIBUTE, FLOAT_VEC3, 1, Some(1))
            .into_shared()
    }

    fn sources() -> ShaderSources {
        ShaderSources {
            vertex: "#version 300 es\nvoid main() {}".to_owned(),
            fragment: "#version 300 es\nvoid main() {}".to_owned(),
        }
    }

    fn is_draw(call: &Call) -> bool {
        matches!(
            call,
            Call::DrawArrays { .. }
                | Call::DrawElements { .. }
                | Call::DrawArraysInstanced { .. }
                | Call::DrawElementsInstanced { .. }
        )
    }

    #[test]
    fn render_issues_single_triangle_draw() {
        let server = server();
        let triangle =
            SimpleTriangle::new(GraphicsContext::new(server.clone()), &sources()).unwrap();
        server.clear_calls();

        let statistics = triangle.render().unwrap();

        assert_eq!(statistics.primitives, 1);
        assert_eq!(server.count(is_draw), 1);
        assert_eq!(
            server.count(|c| *c
                == Call::DrawArrays {
                    mode: PrimitiveMode::Triangles,
                    first: 0,
                    count: 3,
                }),
            1
        );
        let calls = server.calls();
        assert_eq!(calls[0], Call::Clear(ClearFlags::default()));
        assert!(calls.contains(&Call::UseProgram(triangle.program().native())));
    }

    #[test]
    fn geometry_and_clear_color_are_set_up() {
        let server = server();
        let triangle =
            SimpleTriangle::new(GraphicsContext::new(server.clone()), &sources()).unwrap();

        assert_eq!(
            server.calls().last(),
            Some(&Call::BindVertexArray(None))
        );
        assert!(server
            .calls()
            .contains(&Call::ClearColor(crate::core::color::Color::TRANSPARENT)));
        assert_eq!(
            server.count(|c| matches!(
                c,
                Call::BufferData {
                    kind: BufferKind::Vertex,
                    usage: BufferUsage::StaticDraw,
                    ..
                }
            )),
            2
        );
        assert!(server.calls().contains(&Call::BufferData {
            kind: BufferKind::Vertex,
            len: 24,
            usage: BufferUsage::StaticDraw,
        }));
        assert!(server.calls().contains(&Call::BufferData {
            kind: BufferKind::Vertex,
            len: 36,
            usage: BufferUsage::StaticDraw,
        }));

        let bindings = triangle.vertex_array().bindings();
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].definition.index, 0);
        assert_eq!(bindings[0].definition.size, 2);
        assert_eq!(bindings[1].definition.index, 1);
        assert_eq!(bindings[1].definition.size, 3);
    }

    #[test]
    fn unused_attribute_is_skipped() {
        let server = RecordingServer::new()
            .with_attribute(POSITION_ATTRIBUTE, FLOAT_VEC2, 1, Some(0))
            .into_shared();
        let triangle =
            SimpleTriangle::new(GraphicsContext::new(server.clone()), &sources()).unwrap();

        assert_eq!(triangle.program().attribute_location(COLOR_ATTRIBUTE), None);
        assert_eq!(triangle.vertex_array().bindings().len(), 1);
        assert_eq!(
            server.count(|c| matches!(c, Call::VertexAttribPointer { .. })),
            1
        );

        server.clear_calls();
        triangle.render().unwrap();
        assert_eq!(server.count(is_draw), 1);
    }

    #[test]
    fn resize_updates_surface_and_viewport_then_renders() {
        let server = server();
        let triangle =
            SimpleTriangle::new(GraphicsContext::new(server.clone()), &sources()).unwrap();
        server.clear_calls();

        triangle.resize(640, 480).unwrap();

        let calls = server.calls();
        assert_eq!(
            calls[0],
            Call::ResizeSurface {
                width: 640,
                height: 480
            }
        );
        assert_eq!(
            calls[1],
            Call::Viewport {
                x: 0,
                y: 0,
                width: 640,
                height: 480
            }
        );
        assert_eq!(server.count(is_draw), 1);
        assert_eq!(triangle.context().surface_size(), (640, 480));
    }

    #[test]
    fn release_deletes_everything_once() {
        let server = server();
        let mut triangle =
            SimpleTriangle::new(GraphicsContext::new(server.clone()), &sources()).unwrap();

        triangle.release();
        triangle.release();
        drop(triangle);

        assert_eq!(server.count(|c| matches!(c, Call::DeleteProgram(_))), 1);
        assert_eq!(server.count(|c| matches!(c, Call::DeleteBuffer(_))), 2);
        assert_eq!(server.count(|c| matches!(c, Call::DeleteVertexArray(_))), 1);
    }

    #[test]
    fn compile_error_stops_initialization() {
        let server = RecordingServer::new()
            .with_compile_error("broken", "0:1: syntax error")
            .into_shared();
        let sources = ShaderSources {
            vertex: "#version 300 es\nvoid main() {}".to_owned(),
            fragment: "broken".to_owned(),
        };

        let result = SimpleTriangle::new(GraphicsContext::new(server.clone()), &sources);

        match result {
            Err(FrameworkError::ShaderCompilationFailed { error_message, .. }) => {
                assert_eq!(error_message, "0:1: syntax error")
            }
            _ => panic!("expected compilation failure"),
        }
        assert_eq!(server.count(is_draw), 0);
        assert_eq!(server.count(|c| matches!(c, Call::CreateBuffer(_))), 0);
    }

    #[test]
    fn loads_embedded_sources() {
        let server = server();
        let loader = ShaderLoader::new(EmbeddedResolver::default());

        let triangle = block_on(SimpleTriangle::load(
            GraphicsContext::new(server.clone()),
            &loader,
            &ShaderLocators::default(),
        ))
        .unwrap();

        assert_eq!(triangle.vertex_array().bindings().len(), 2);
    }

    #[test]
    fn shader_root_from_settings_is_used() {
        let settings = TriangleSettings {
            shader_root: Some(env!("CARGO_MANIFEST_DIR").to_owned()),
            ..Default::default()
        };

        let sources = block_on(make_loader(&settings).load_all(&settings.shaders)).unwrap();

        assert!(sources.vertex.contains(POSITION_ATTRIBUTE));
        assert!(sources.fragment.starts_with("#version 300 es"));
    }

    #[test]
    fn missing_source_creates_no_program() {
        let server = server();
        let loader = ShaderLoader::new(EmbeddedResolver::empty().with_source(
            "triangle.vert",
            "#version 300 es\nvoid main() {}",
        ));

        let result = block_on(SimpleTriangle::load(
            GraphicsContext::new(server.clone()),
            &loader,
            &ShaderLocators::default(),
        ));

        match result {
            Err(AppError::ShaderLoad(error)) => {
                assert_eq!(error.locator, "data/shaders/triangle.frag");
                assert!(matches!(error.reason, LoadFailure::NotEmbedded(_)));
            }
            _ => panic!("expected a load failure"),
        }
        assert_eq!(server.count(|c| matches!(c, Call::CreateShader(..))), 0);
        assert_eq!(server.count(|c| matches!(c, Call::CreateProgram(_))), 0);
    }
}
