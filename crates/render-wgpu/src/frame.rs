use tinyscene_render::Renderer;
use tinyscene_scene::{OrbitCamera, SceneGraph};

use crate::gpu::WgpuRenderer;

/// One acquired surface texture, ready to receive a single frame.
///
/// Built by the window loop each redraw and handed to the frame loop as its
/// [`Renderer`].
pub struct SurfaceFrame<'a> {
    renderer: &'a mut WgpuRenderer,
    device: &'a wgpu::Device,
    queue: &'a wgpu::Queue,
    view: &'a wgpu::TextureView,
}

impl<'a> SurfaceFrame<'a> {
    pub fn new(
        renderer: &'a mut WgpuRenderer,
        device: &'a wgpu::Device,
        queue: &'a wgpu::Queue,
        view: &'a wgpu::TextureView,
    ) -> Self {
        Self {
            renderer,
            device,
            queue,
            view,
        }
    }
}

impl Renderer for SurfaceFrame<'_> {
    type Output = ();

    fn render(&mut self, scene: &SceneGraph, camera: &OrbitCamera) {
        self.renderer
            .draw(self.device, self.queue, self.view, scene, camera);
    }
}
