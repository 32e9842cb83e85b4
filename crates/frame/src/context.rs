use glam::Vec3;
use std::collections::BTreeMap;
use std::fmt;
use tinyscene_assets::{AssetLoader, LoadOutcome, LoadRequest, LoadTicket, LoadedAsset};
use tinyscene_common::Color;
use tinyscene_input::{Action, PointerPosition};
use tinyscene_scene::{Background, OrbitCamera, SceneGraph};

use crate::builder::TrackedObjects;
use crate::config::AssetPaths;
use crate::params::SceneParams;

/// What a background load is for, so its outcome can be attached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadPurpose {
    BoxTexture,
    Skybox,
    Model { offset: Vec3 },
}

/// One entry on the diagnostic channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// Tick during which the failure was joined.
    pub tick: u64,
    pub source: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[tick {}] {}: {}", self.tick, self.source, self.message)
    }
}

/// Everything the frame loop reads and writes between ticks.
///
/// The GUI writes `params` directly; pointer and camera input arrives
/// through [`FrameContext::apply`].
pub struct FrameContext {
    pub params: SceneParams,
    pointer: PointerPosition,
    phase: f32,
    rotation: f32,
    ticks: u64,
    rng: u64,
    tracked: TrackedObjects,
    applied_sphere_color: Color,
    loader: AssetLoader,
    pending: BTreeMap<LoadTicket, LoadPurpose>,
    ready: Vec<LoadOutcome>,
    diagnostics: Vec<Diagnostic>,
}

impl FrameContext {
    pub fn new(tracked: TrackedObjects, params: SceneParams, seed: u64) -> Self {
        Self {
            params,
            pointer: PointerPosition::new(),
            phase: 0.0,
            rotation: 0.0,
            ticks: 0,
            rng: seed,
            tracked,
            applied_sphere_color: params.sphere_color,
            loader: AssetLoader::new(),
            pending: BTreeMap::new(),
            ready: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Number of completed ticks.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Accumulated rotation angle in radians. Never wraps.
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn pointer(&self) -> Option<glam::Vec2> {
        self.pointer.get()
    }

    pub fn tracked(&self) -> &TrackedObjects {
        &self.tracked
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Loads requested but not yet attached.
    pub fn pending_loads(&self) -> usize {
        self.pending.len()
    }

    /// Route a host action into the session.
    pub fn apply(&mut self, action: Action, camera: &mut OrbitCamera) {
        match action {
            Action::PointerMoved(ndc) => self.pointer.set(ndc),
            Action::Orbit { dx, dy } => camera.orbit(dx, dy),
            Action::Zoom(delta) => camera.zoom(delta),
            Action::Pan { dx, dy } => camera.pan(dx, dy),
            Action::Resize { width, height } => {
                camera.set_viewport(width, height);
                tracing::debug!(width, height, aspect = camera.aspect, "viewport resized");
            }
        }
    }

    /// Start a background load; the result is attached at the start of a later tick.
    pub fn request_load(&mut self, purpose: LoadPurpose, request: LoadRequest) -> LoadTicket {
        let ticket = self.loader.request(request);
        self.pending.insert(ticket, purpose);
        ticket
    }

    /// Request every configured asset.
    pub fn request_assets(&mut self, paths: &AssetPaths) {
        if let Some(path) = &paths.box_texture {
            self.request_load(LoadPurpose::BoxTexture, LoadRequest::Texture(path.clone()));
        }
        if !paths.skybox.is_empty() {
            self.request_load(LoadPurpose::Skybox, LoadRequest::Cubemap(paths.skybox.clone()));
        }
        if let Some(path) = &paths.model {
            self.request_load(
                LoadPurpose::Model {
                    offset: paths.model_offset,
                },
                LoadRequest::Model(path.clone()),
            );
        }
    }

    /// Block until every in-flight load has finished. Outcomes are still
    /// attached by the next tick, not here.
    pub fn wait_for_loads(&mut self) {
        let done = self.loader.wait_all();
        self.ready.extend(done);
    }

    pub(crate) fn advance(&mut self) {
        self.phase += self.params.bounce_speed;
        self.rotation += self.params.rotation_speed;
    }

    pub(crate) fn finish_tick(&mut self) {
        self.ticks += 1;
    }

    /// Sphere color if it changed since it was last applied.
    pub(crate) fn take_sphere_color_change(&mut self) -> Option<Color> {
        let current = self.params.sphere_color;
        (current != self.applied_sphere_color).then(|| {
            self.applied_sphere_color = current;
            current
        })
    }

    /// Next value of the jitter stream in [0, 1).
    pub(crate) fn next_random(&mut self) -> f32 {
        self.rng = self.rng.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.rng;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^= z >> 31;
        (z >> 40) as f32 / (1u64 << 24) as f32
    }

    /// Attach every finished load. Failures become exactly one diagnostic
    /// each and leave the scene untouched.
    pub(crate) fn join_loads(&mut self, scene: &mut SceneGraph) {
        let mut done = std::mem::take(&mut self.ready);
        done.extend(self.loader.poll());
        for outcome in done {
            self.join_one(scene, outcome);
        }
    }

    fn join_one(&mut self, scene: &mut SceneGraph, outcome: LoadOutcome) {
        let Some(purpose) = self.pending.remove(&outcome.ticket) else {
            tracing::warn!(ticket = outcome.ticket.0, "load outcome without a pending request");
            return;
        };
        let what = outcome.request.describe();
        let asset = match outcome.result {
            Ok(asset) => asset,
            Err(e) => {
                self.report(&what, e.to_string());
                return;
            }
        };

        match (purpose, asset) {
            (LoadPurpose::BoxTexture, LoadedAsset::Texture(texture)) => {
                let id = scene.assets_mut().register_texture(texture);
                if let Some(node) = scene.get_mut(self.tracked.textured_box) {
                    node.material = node.material.with_texture(id);
                }
                tracing::info!(%what, "texture attached");
            }
            (LoadPurpose::Skybox, LoadedAsset::Cubemap(cubemap)) => {
                let id = scene.assets_mut().register_cubemap(cubemap);
                scene.set_background(Background::Cubemap(id));
                tracing::info!(%what, "skybox attached");
            }
            (LoadPurpose::Model { offset }, LoadedAsset::Model(model)) => {
                match scene.attach_model(&model, offset) {
                    Ok(root) => self.tracked.model = Some(root),
                    Err(e) => self.report(&what, e.to_string()),
                }
            }
            (purpose, _) => self.report(&what, format!("unexpected asset kind for {purpose:?}")),
        }
    }

    fn report(&mut self, source: &str, message: String) {
        tracing::error!(source, error = %message, "asset load failed");
        self.diagnostics.push(Diagnostic {
            tick: self.ticks,
            source: source.to_string(),
            message,
        });
    }

    pub fn summary(&self) -> FrameSummary {
        FrameSummary {
            ticks: self.ticks,
            phase: self.phase,
            rotation: self.rotation,
            pending_loads: self.pending.len(),
            diagnostics: self.diagnostics.len(),
        }
    }
}

/// Counters shown by the inspector panel and the CLI.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSummary {
    pub ticks: u64,
    pub phase: f32,
    pub rotation: f32,
    pub pending_loads: usize,
    pub diagnostics: usize,
}

impl fmt::Display for FrameSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Frame: ticks={} phase={:.3} rotation={:.3} pending_loads={} diagnostics={}",
            self.ticks, self.phase, self.rotation, self.pending_loads, self.diagnostics
        )
    }
}
