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
    core::color::Color,
    error::FrameworkError,
    server::{Capability, GraphicsServer},
    BlendFactor, BlendFunc, ClearFlags, CompareFunc,
};
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use strum_macros::{AsRefStr, EnumString, VariantNames};

/// GPU selection hint passed to the context creation.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    AsRefStr,
    EnumString,
    VariantNames,
)]
pub enum PowerPreference {
    #[default]
    #[strum(serialize = "default")]
    Default,
    #[strum(serialize = "low-power")]
    LowPower,
    #[strum(serialize = "high-performance")]
    HighPerformance,
}

/// Parameters of the drawing surface and its context.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextOptions {
    pub antialias: bool,
    /// Whether the surface has an alpha channel that is composited with the page.
    pub alpha: bool,
    pub depth: bool,
    pub preserve_drawing_buffer: bool,
    pub power_preference: PowerPreference,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            antialias: true,
            alpha: true,
            depth: true,
            preserve_drawing_buffer: false,
            power_preference: PowerPreference::Default,
        }
    }
}

/// The drawing surface and its graphics context.
///
/// Depth test, blending and clear color live in the context itself and are not mirrored here;
/// every setter is a direct state change of the shared context.
pub struct GraphicsContext<S: GraphicsServer> {
    server: Rc<S>,
}

impl<S: GraphicsServer> GraphicsContext<S> {
    /// Wraps a freshly created server and applies the default state: depth test with
    /// less-or-equal comparison, opaque black clear color, standard alpha blending.
    pub fn new(server: Rc<S>) -> Self {
        let context = Self { server };
        context.set_depth_test(true);
        context.set_depth_func(CompareFunc::LessOrEqual);
        context.set_clear_color(Color::BLACK);
        context.set_blending(true);
        context.set_blend_func(BlendFunc::default());
        context
    }

    pub fn server(&self) -> &Rc<S> {
        &self.server
    }

    pub fn clear(&self, flags: ClearFlags) {
        self.server.clear(flags);
    }

    pub fn set_viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        self.server.viewport(x, y, width, height);
    }

    /// Resizes the surface, then sets the viewport to cover all of it. The viewport follows the
    /// size the surface actually got, which may differ from the requested one.
    pub fn resize(&self, width: u32, height: u32) {
        self.server.resize_surface(width, height);
        let (width, height) = self.server.surface_size();
        self.set_viewport(
            0,
            0,
            i32::try_from(width).unwrap_or(i32::MAX),
            i32::try_from(height).unwrap_or(i32::MAX),
        );
    }

    pub fn surface_size(&self) -> (u32, u32) {
        self.server.surface_size()
    }

    pub fn set_clear_color(&self, color: Color) {
        self.server.clear_color(color);
    }

    pub fn set_depth_test(&self, enabled: bool) {
        self.server.set_capability(Capability::DepthTest, enabled);
    }

    pub fn set_depth_func(&self, func: CompareFunc) {
        self.server.depth_func(func);
    }

    pub fn set_blending(&self, enabled: bool) {
        self.server.set_capability(Capability::Blend, enabled);
    }

    pub fn set_blend_func(&self, func: BlendFunc) {
        self.set_blend_factors(func.src, func.dst);
    }

    pub fn set_blend_factors(&self, src: BlendFactor, dst: BlendFactor) {
        self.server.blend_func(src, dst);
    }

    /// Presents the back buffer. Does nothing in the browser, where presentation is implicit.
    pub fn swap_buffers(&self) -> Result<(), FrameworkError> {
        self.server.swap_buffers()
    }
}

#[cfg(test)]
mod test {
    use crate::{
        context::{ContextOptions, GraphicsContext, PowerPreference},
        core::color::Color,
        recording::{Call, RecordingServer},
        server::Capability,
        BlendFactor, ClearFlags, CompareFunc,
    };

    #[test]
    fn defaults_are_applied_on_creation() {
        let server = RecordingServer::new().into_shared();
        let _context = GraphicsContext::new(server.clone());

        assert_eq!(
            server.calls(),
            vec![
                Call::SetCapability(Capability::DepthTest, true),
                Call::DepthFunc(CompareFunc::LessOrEqual),
                Call::ClearColor(Color::BLACK),
                Call::SetCapability(Capability::Blend, true),
                Call::BlendFunc(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha),
            ]
        );
    }

    #[test]
    fn resize_sets_surface_then_viewport() {
        let server = RecordingServer::new().into_shared();
        let context = GraphicsContext::new(server.clone());
        server.clear_calls();

        context.resize(640, 480);

        assert_eq!(context.surface_size(), (640, 480));
        assert_eq!(
            server.calls(),
            vec![
                Call::ResizeSurface {
                    width: 640,
                    height: 480
                },
                Call::Viewport {
                    x: 0,
                    y: 0,
                    width: 640,
                    height: 480
                },
            ]
        );
    }

    #[test]
    fn viewport_follows_clamped_surface() {
        let server = RecordingServer::new()
            .with_min_surface_size(1, 1)
            .into_shared();
        let context = GraphicsContext::new(server.clone());
        server.clear_calls();

        context.resize(0, 0);

        assert_eq!(context.surface_size(), (1, 1));
        assert_eq!(
            server.calls().last(),
            Some(&Call::Viewport {
                x: 0,
                y: 0,
                width: 1,
                height: 1
            })
        );
    }

    #[test]
    fn oversized_viewport_saturates() {
        let server = RecordingServer::new().into_shared();
        let context = GraphicsContext::new(server.clone());
        server.clear_calls();

        context.resize(u32::MAX, 480);

        assert_eq!(
            server.calls().last(),
            Some(&Call::Viewport {
                x: 0,
                y: 0,
                width: i32::MAX,
                height: 480
            })
        );
    }

    #[test]
    fn clear_uses_given_flags() {
        let server = RecordingServer::new().into_shared();
        let context = GraphicsContext::new(server.clone());
        server.clear_calls();

        context.clear(ClearFlags::default());
        context.set_depth_test(false);

        assert_eq!(
            server.calls(),
            vec![
                Call::Clear(ClearFlags::COLOR | ClearFlags::DEPTH),
                Call::SetCapability(Capability::DepthTest, false),
            ]
        );
    }

    #[test]
    fn options_deserialize_with_defaults() {
        assert_eq!(PowerPreference::HighPerformance.as_ref(), "high-performance");
        let defaults = ContextOptions::default();
        assert!(defaults.antialias && defaults.alpha && defaults.depth);
        assert!(!defaults.preserve_drawing_buffer);
    }
}
