use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use tinyscene_assets::{AssetId, CubemapData, MeshData, TextureData};
use tinyscene_common::{Color, ObjectId};
use tinyscene_scene::{Background, MaterialKind, NodeKind, OrbitCamera, SceneGraph};
use wgpu::util::DeviceExt;

use crate::geometry::{self, LineVertex, Vertex};
use crate::shaders;
use crate::uniforms::{Globals, ObjectUniform, SkyUniform};

/// Edge length of the spot light shadow map in texels.
pub const SHADOW_MAP_SIZE: u32 = 2048;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const MESH_ATTRIBUTES: [wgpu::VertexAttribute; 3] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];
const LINE_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x4];

fn mesh_buffer_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &MESH_ATTRIBUTES,
    }
}

fn line_buffer_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<LineVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &LINE_ATTRIBUTES,
    }
}

/// How one node is drawn in the main pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DrawKind {
    Lit,
    Wire,
    Procedural,
    Lines,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Draw {
    pub object: ObjectId,
    pub mesh: Option<AssetId>,
    pub kind: DrawKind,
    pub cast_shadow: bool,
}

/// Decide what to draw for every visible node. Groups draw nothing.
pub(crate) fn plan_draws(scene: &SceneGraph) -> Vec<Draw> {
    scene
        .nodes()
        .iter()
        .filter(|(id, _)| scene.is_visible(**id))
        .filter_map(|(id, node)| {
            let (mesh, kind) = match node.kind {
                NodeKind::Mesh(mesh) => {
                    let kind = match node.material.kind {
                        MaterialKind::Procedural => DrawKind::Procedural,
                        _ if node.material.wireframe => DrawKind::Wire,
                        _ => DrawKind::Lit,
                    };
                    (Some(mesh), kind)
                }
                NodeKind::Axes(_) | NodeKind::Grid { .. } => (None, DrawKind::Lines),
                NodeKind::Group => return None,
            };
            Some(Draw {
                object: *id,
                mesh,
                kind,
                cast_shadow: node.cast_shadow && mesh.is_some(),
            })
        })
        .collect()
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    vertex_count: usize,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    edge_buffer: wgpu::Buffer,
    edge_count: u32,
    revision: u64,
}

struct GpuLines {
    vertex_buffer: wgpu::Buffer,
    vertex_count: u32,
}

struct GpuObject {
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    texture: Option<AssetId>,
}

/// wgpu scene renderer.
///
/// GPU copies of meshes, textures and per-node uniforms are created lazily
/// on first use and dropped when their scene counterpart disappears.
pub struct WgpuRenderer {
    lit_pipeline: wgpu::RenderPipeline,
    wire_pipeline: wgpu::RenderPipeline,
    procedural_pipeline: wgpu::RenderPipeline,
    shadow_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,
    sky_pipeline: wgpu::RenderPipeline,
    globals_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,
    shadow_globals_bind_group: wgpu::BindGroup,
    object_layout: wgpu::BindGroupLayout,
    sky_layout: wgpu::BindGroupLayout,
    sky_buffer: wgpu::Buffer,
    sky_bind_group: Option<(AssetId, wgpu::BindGroup)>,
    shadow_view: wgpu::TextureView,
    texture_sampler: wgpu::Sampler,
    white_texture: wgpu::TextureView,
    meshes: BTreeMap<AssetId, GpuMesh>,
    textures: BTreeMap<AssetId, wgpu::TextureView>,
    cubemaps: BTreeMap<AssetId, wgpu::TextureView>,
    objects: BTreeMap<ObjectId, GpuObject>,
    lines: BTreeMap<ObjectId, GpuLines>,
    depth_texture: wgpu::TextureView,
    surface_format: wgpu::TextureFormat,
    started: Instant,
}

struct PipelineDesc<'a> {
    label: &'a str,
    layout: &'a wgpu::PipelineLayout,
    module: &'a wgpu::ShaderModule,
    vertex_entry: &'a str,
    fragment_entry: Option<&'a str>,
    buffers: &'a [wgpu::VertexBufferLayout<'a>],
    color_format: Option<wgpu::TextureFormat>,
    topology: wgpu::PrimitiveTopology,
    cull_mode: Option<wgpu::Face>,
    depth_write: bool,
    depth_compare: wgpu::CompareFunction,
    bias: wgpu::DepthBiasState,
}

fn create_pipeline(device: &wgpu::Device, desc: &PipelineDesc<'_>) -> wgpu::RenderPipeline {
    let targets: Vec<Option<wgpu::ColorTargetState>> = desc
        .color_format
        .map(|format| wgpu::ColorTargetState {
            format,
            blend: Some(wgpu::BlendState::REPLACE),
            write_mask: wgpu::ColorWrites::ALL,
        })
        .into_iter()
        .map(Some)
        .collect();

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(desc.label),
        layout: Some(desc.layout),
        vertex: wgpu::VertexState {
            module: desc.module,
            entry_point: Some(desc.vertex_entry),
            compilation_options: Default::default(),
            buffers: desc.buffers,
        },
        fragment: desc.fragment_entry.map(|entry| wgpu::FragmentState {
            module: desc.module,
            entry_point: Some(entry),
            compilation_options: Default::default(),
            targets: &targets,
        }),
        primitive: wgpu::PrimitiveState {
            topology: desc.topology,
            cull_mode: desc.cull_mode,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: desc.depth_write,
            depth_compare: desc.depth_compare,
            stencil: Default::default(),
            bias: desc.bias,
        }),
        multisample: Default::default(),
        multiview: None,
        cache: None,
    })
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

impl WgpuRenderer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let globals_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("globals_buffer"),
            contents: bytemuck::bytes_of(&Globals::new(
                &SceneGraph::new(),
                &OrbitCamera::default(),
                0.0,
            )),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("globals_layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
        });

        let shadow_globals_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("shadow_globals_layout"),
                entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX)],
            });

        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("object_layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let sky_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("sky_layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::FRAGMENT),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::Cube,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        // Shadow map
        let shadow_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("shadow_map"),
            size: wgpu::Extent3d {
                width: SHADOW_MAP_SIZE,
                height: SHADOW_MAP_SIZE,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let shadow_view = shadow_texture.create_view(&Default::default());
        let shadow_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("shadow_sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });
        let texture_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("texture_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("globals_bind_group"),
            layout: &globals_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: globals_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&shadow_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&shadow_sampler),
                },
            ],
        });
        let shadow_globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("shadow_globals_bind_group"),
            layout: &shadow_globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
        });

        let scene_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene_pipeline_layout"),
            bind_group_layouts: &[&globals_layout, &object_layout],
            push_constant_ranges: &[],
        });
        let shadow_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("shadow_pipeline_layout"),
            bind_group_layouts: &[&shadow_globals_layout, &object_layout],
            push_constant_ranges: &[],
        });
        let sky_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("sky_pipeline_layout"),
            bind_group_layouts: &[&sky_layout],
            push_constant_ranges: &[],
        });

        let scene_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("scene_shader"),
            source: wgpu::ShaderSource::Wgsl(
                format!("{}{}", shaders::COMMON, shaders::SCENE_SHADER).into(),
            ),
        });
        let shadow_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("shadow_shader"),
            source: wgpu::ShaderSource::Wgsl(
                format!("{}{}", shaders::COMMON, shaders::SHADOW_SHADER).into(),
            ),
        });
        let line_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("line_shader"),
            source: wgpu::ShaderSource::Wgsl(
                format!("{}{}", shaders::COMMON, shaders::LINE_SHADER).into(),
            ),
        });
        let sky_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("sky_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::SKYBOX_SHADER.into()),
        });

        let mesh_buffers = [mesh_buffer_layout()];
        let line_buffers = [line_buffer_layout()];
        let scene_desc = |label, fragment_entry, topology, cull_mode| PipelineDesc {
            label,
            layout: &scene_layout,
            module: &scene_shader,
            vertex_entry: "vs_main",
            fragment_entry: Some(fragment_entry),
            buffers: &mesh_buffers,
            color_format: Some(surface_format),
            topology,
            cull_mode,
            depth_write: true,
            depth_compare: wgpu::CompareFunction::Less,
            bias: Default::default(),
        };

        let lit_pipeline = create_pipeline(
            device,
            &scene_desc(
                "lit_pipeline",
                "fs_main",
                wgpu::PrimitiveTopology::TriangleList,
                Some(wgpu::Face::Back),
            ),
        );
        let wire_pipeline = create_pipeline(
            device,
            &scene_desc(
                "wire_pipeline",
                "fs_main",
                wgpu::PrimitiveTopology::LineList,
                None,
            ),
        );
        let procedural_pipeline = create_pipeline(
            device,
            &scene_desc(
                "procedural_pipeline",
                "fs_procedural",
                wgpu::PrimitiveTopology::TriangleList,
                Some(wgpu::Face::Back),
            ),
        );

        let shadow_pipeline = create_pipeline(
            device,
            &PipelineDesc {
                label: "shadow_pipeline",
                layout: &shadow_layout,
                module: &shadow_shader,
                vertex_entry: "vs_shadow",
                fragment_entry: None,
                buffers: &mesh_buffers,
                color_format: None,
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                depth_write: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                bias: wgpu::DepthBiasState {
                    constant: 2,
                    slope_scale: 2.0,
                    clamp: 0.0,
                },
            },
        );

        let line_pipeline = create_pipeline(
            device,
            &PipelineDesc {
                label: "line_pipeline",
                layout: &scene_layout,
                module: &line_shader,
                vertex_entry: "vs_line",
                fragment_entry: Some("fs_line"),
                buffers: &line_buffers,
                color_format: Some(surface_format),
                topology: wgpu::PrimitiveTopology::LineList,
                cull_mode: None,
                depth_write: true,
                depth_compare: wgpu::CompareFunction::Less,
                bias: Default::default(),
            },
        );

        // Drawn first, behind everything, without touching depth.
        let sky_pipeline = create_pipeline(
            device,
            &PipelineDesc {
                label: "sky_pipeline",
                layout: &sky_pipeline_layout,
                module: &sky_shader,
                vertex_entry: "vs_sky",
                fragment_entry: Some("fs_sky"),
                buffers: &[],
                color_format: Some(surface_format),
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                depth_write: false,
                depth_compare: wgpu::CompareFunction::Always,
                bias: Default::default(),
            },
        );

        let sky_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("sky_buffer"),
            contents: bytemuck::bytes_of(&SkyUniform::new(&OrbitCamera::default())),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let white_texture =
            upload_texture(device, queue, &TextureData::solid([255, 255, 255, 255]), "white");
        let depth_texture = Self::create_depth_texture(device, width, height);

        Self {
            lit_pipeline,
            wire_pipeline,
            procedural_pipeline,
            shadow_pipeline,
            line_pipeline,
            sky_pipeline,
            globals_buffer,
            globals_bind_group,
            shadow_globals_bind_group,
            object_layout,
            sky_layout,
            sky_buffer,
            sky_bind_group: None,
            shadow_view,
            texture_sampler,
            white_texture,
            meshes: BTreeMap::new(),
            textures: BTreeMap::new(),
            cubemaps: BTreeMap::new(),
            objects: BTreeMap::new(),
            lines: BTreeMap::new(),
            depth_texture,
            surface_format,
            started: Instant::now(),
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth_texture = Self::create_depth_texture(device, width, height);
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    /// Render one frame: shadow pass from the spot light, then sky, meshes
    /// and helpers.
    pub fn draw(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        view: &wgpu::TextureView,
        scene: &SceneGraph,
        camera: &OrbitCamera,
    ) {
        let _span = tracing::trace_span!("wgpu_draw").entered();
        let time = self.started.elapsed().as_secs_f32();
        queue.write_buffer(
            &self.globals_buffer,
            0,
            bytemuck::bytes_of(&Globals::new(scene, camera, time)),
        );

        let draws = plan_draws(scene);
        self.prepare(device, queue, scene, &draws);
        let sky = self.prepare_sky(device, queue, scene, camera);

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("render_encoder"),
        });

        let spot_shadows = scene.lights().spot.is_some_and(|s| s.cast_shadow);
        if spot_shadows {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("shadow_pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.shadow_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });
            pass.set_pipeline(&self.shadow_pipeline);
            pass.set_bind_group(0, &self.shadow_globals_bind_group, &[]);
            for draw in draws.iter().filter(|d| d.cast_shadow) {
                let (Some(object), Some(mesh)) = (
                    self.objects.get(&draw.object),
                    draw.mesh.and_then(|m| self.meshes.get(&m)),
                ) else {
                    continue;
                };
                pass.set_bind_group(1, &object.bind_group, &[]);
                pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
        }

        let clear = match scene.background() {
            Background::Color(color) => geometry::clear_color(*color),
            Background::Cubemap(_) => geometry::clear_color(Color::BLACK),
        };

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("main_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            if sky {
                if let Some((_, bind_group)) = &self.sky_bind_group {
                    pass.set_pipeline(&self.sky_pipeline);
                    pass.set_bind_group(0, bind_group, &[]);
                    pass.draw(0..3, 0..1);
                }
            }

            pass.set_bind_group(0, &self.globals_bind_group, &[]);
            for draw in &draws {
                let Some(object) = self.objects.get(&draw.object) else {
                    continue;
                };
                pass.set_bind_group(1, &object.bind_group, &[]);

                if draw.kind == DrawKind::Lines {
                    if let Some(lines) = self.lines.get(&draw.object) {
                        pass.set_pipeline(&self.line_pipeline);
                        pass.set_vertex_buffer(0, lines.vertex_buffer.slice(..));
                        pass.draw(0..lines.vertex_count, 0..1);
                    }
                    continue;
                }

                let Some(mesh) = draw.mesh.and_then(|m| self.meshes.get(&m)) else {
                    continue;
                };
                pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                match draw.kind {
                    DrawKind::Wire => {
                        pass.set_pipeline(&self.wire_pipeline);
                        pass.set_index_buffer(mesh.edge_buffer.slice(..), wgpu::IndexFormat::Uint32);
                        pass.draw_indexed(0..mesh.edge_count, 0, 0..1);
                    }
                    DrawKind::Lit | DrawKind::Procedural => {
                        let pipeline = if draw.kind == DrawKind::Procedural {
                            &self.procedural_pipeline
                        } else {
                            &self.lit_pipeline
                        };
                        pass.set_pipeline(pipeline);
                        pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                        pass.draw_indexed(0..mesh.index_count, 0, 0..1);
                    }
                    DrawKind::Lines => {}
                }
            }
        }

        queue.submit(std::iter::once(encoder.finish()));
    }

    /// Upload whatever the draws need and refresh per-node uniforms.
    fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        scene: &SceneGraph,
        draws: &[Draw],
    ) {
        let assets = scene.assets();
        for draw in draws {
            let Some(node) = scene.get(draw.object) else {
                continue;
            };

            if let Some(mesh_id) = draw.mesh {
                if let Some(mesh) = assets.get_mesh(mesh_id) {
                    self.sync_mesh(device, queue, mesh_id, mesh);
                }
            }

            if draw.kind == DrawKind::Lines && !self.lines.contains_key(&draw.object) {
                let verts = match node.kind {
                    NodeKind::Axes(size) => geometry::axes_lines(size),
                    NodeKind::Grid { size, divisions } => {
                        geometry::grid_lines(size, divisions, node.material.color)
                    }
                    _ => Vec::new(),
                };
                let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("helper_vertex_buffer"),
                    contents: bytemuck::cast_slice(&verts),
                    usage: wgpu::BufferUsages::VERTEX,
                });
                self.lines.insert(
                    draw.object,
                    GpuLines {
                        vertex_buffer,
                        vertex_count: verts.len() as u32,
                    },
                );
            }

            let texture = node
                .material
                .texture
                .filter(|_| matches!(draw.kind, DrawKind::Lit | DrawKind::Wire));
            if let Some(id) = texture {
                if !self.textures.contains_key(&id) {
                    if let Some(data) = assets.get_texture(id) {
                        let view = upload_texture(device, queue, data, "material_texture");
                        self.textures.insert(id, view);
                        tracing::debug!(texture = id.0, width = data.width, height = data.height, "texture uploaded");
                    }
                }
            }

            let stale = self
                .objects
                .get(&draw.object)
                .is_none_or(|o| o.texture != texture);
            if stale {
                let object = self.create_object(device, texture);
                self.objects.insert(draw.object, object);
            }
            let Some(world) = scene.world_matrix(draw.object) else {
                continue;
            };
            if let Some(object) = self.objects.get(&draw.object) {
                queue.write_buffer(
                    &object.uniform_buffer,
                    0,
                    bytemuck::bytes_of(&ObjectUniform::new(node, world)),
                );
            }
        }

        let live: BTreeSet<ObjectId> = draws.iter().map(|d| d.object).collect();
        self.objects.retain(|id, _| live.contains(id));
        self.lines.retain(|id, _| live.contains(id));
        self.meshes.retain(|id, _| assets.get_mesh(*id).is_some());
    }

    fn sync_mesh(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, id: AssetId, mesh: &MeshData) {
        match self.meshes.get_mut(&id) {
            Some(gpu) if gpu.revision == mesh.revision() => {}
            Some(gpu) if gpu.vertex_count == mesh.vertex_count() => {
                let verts = geometry::mesh_vertices(mesh);
                queue.write_buffer(&gpu.vertex_buffer, 0, bytemuck::cast_slice(&verts));
                gpu.revision = mesh.revision();
            }
            _ => {
                self.meshes.insert(id, upload_mesh(device, mesh));
                tracing::debug!(mesh = %mesh.name, vertices = mesh.vertex_count(), "mesh uploaded");
            }
        }
    }

    fn create_object(&self, device: &wgpu::Device, texture: Option<AssetId>) -> GpuObject {
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("object_uniform_buffer"),
            size: std::mem::size_of::<ObjectUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let view = texture
            .and_then(|id| self.textures.get(&id))
            .unwrap_or(&self.white_texture);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("object_bind_group"),
            layout: &self.object_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.texture_sampler),
                },
            ],
        });
        GpuObject {
            uniform_buffer,
            bind_group,
            texture,
        }
    }

    /// Returns true when a skybox should be drawn this frame.
    fn prepare_sky(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        scene: &SceneGraph,
        camera: &OrbitCamera,
    ) -> bool {
        let Background::Cubemap(id) = *scene.background() else {
            return false;
        };
        let Some(cubemap) = scene.assets().get_cubemap(id) else {
            return false;
        };
        if !self.cubemaps.contains_key(&id) {
            self.cubemaps.insert(id, upload_cubemap(device, queue, cubemap));
            tracing::debug!(cubemap = id.0, size = cubemap.size, "cubemap uploaded");
        }
        if self.sky_bind_group.as_ref().is_none_or(|(current, _)| *current != id) {
            let Some(view) = self.cubemaps.get(&id) else {
                return false;
            };
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("sky_bind_group"),
                layout: &self.sky_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: self.sky_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(&self.texture_sampler),
                    },
                ],
            });
            self.sky_bind_group = Some((id, bind_group));
        }
        queue.write_buffer(&self.sky_buffer, 0, bytemuck::bytes_of(&SkyUniform::new(camera)));
        true
    }

    fn create_depth_texture(
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth_texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&Default::default())
    }
}

fn upload_mesh(device: &wgpu::Device, mesh: &MeshData) -> GpuMesh {
    let verts = geometry::mesh_vertices(mesh);
    let edges = mesh.edge_indices();
    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("mesh_vertex_buffer"),
        contents: bytemuck::cast_slice(&verts),
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
    });
    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("mesh_index_buffer"),
        contents: bytemuck::cast_slice(&mesh.indices),
        usage: wgpu::BufferUsages::INDEX,
    });
    let edge_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("mesh_edge_buffer"),
        contents: bytemuck::cast_slice(&edges),
        usage: wgpu::BufferUsages::INDEX,
    });
    GpuMesh {
        vertex_buffer,
        vertex_count: mesh.vertex_count(),
        index_buffer,
        index_count: mesh.indices.len() as u32,
        edge_buffer,
        edge_count: edges.len() as u32,
        revision: mesh.revision(),
    }
}

fn texture_layout(width: u32, height: u32) -> wgpu::TexelCopyBufferLayout {
    wgpu::TexelCopyBufferLayout {
        offset: 0,
        bytes_per_row: Some(4 * width),
        rows_per_image: Some(height),
    }
}

fn upload_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    data: &TextureData,
    label: &str,
) -> wgpu::TextureView {
    let size = wgpu::Extent3d {
        width: data.width.max(1),
        height: data.height.max(1),
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &data.rgba,
        texture_layout(size.width, size.height),
        size,
    );
    texture.create_view(&Default::default())
}

fn upload_cubemap(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    cubemap: &CubemapData,
) -> wgpu::TextureView {
    let edge = cubemap.size.max(1);
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("skybox"),
        size: wgpu::Extent3d {
            width: edge,
            height: edge,
            depth_or_array_layers: 6,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    for (layer, face) in cubemap.faces.iter().enumerate() {
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: 0,
                    y: 0,
                    z: layer as u32,
                },
                aspect: wgpu::TextureAspect::All,
            },
            &face.rgba,
            texture_layout(edge, edge),
            wgpu::Extent3d {
                width: edge,
                height: edge,
                depth_or_array_layers: 1,
            },
        );
    }
    texture.create_view(&wgpu::TextureViewDescriptor {
        label: Some("skybox_view"),
        dimension: Some(wgpu::TextureViewDimension::Cube),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use tinyscene_assets::{box_mesh, sphere_mesh};
    use tinyscene_common::Transform;
    use tinyscene_scene::{Material, Node};

    #[test]
    fn draws_follow_materials() {
        let mut scene = SceneGraph::new();
        let lit = scene
            .add_mesh("lit", box_mesh(1.0, 1.0, 1.0), Material::default(), Transform::default())
            .unwrap();
        let wire = scene
            .add_mesh(
                "wire",
                box_mesh(1.0, 1.0, 1.0),
                Material::basic(Color::WHITE).with_wireframe(true),
                Transform::default(),
            )
            .unwrap();
        let shader = scene
            .add_mesh(
                "shader",
                sphere_mesh(1.0, 8, 6),
                Material::procedural().with_wireframe(true),
                Transform::default(),
            )
            .unwrap();
        let grid = scene.add(Node::grid(10.0, 10));
        scene.add(Node::group("empty"));

        let draws = plan_draws(&scene);
        assert_eq!(draws.len(), 4);
        let kind = |id| draws.iter().find(|d| d.object == id).map(|d| d.kind);
        assert_eq!(kind(lit), Some(DrawKind::Lit));
        assert_eq!(kind(wire), Some(DrawKind::Wire));
        assert_eq!(kind(shader), Some(DrawKind::Procedural));
        assert_eq!(kind(grid), Some(DrawKind::Lines));
    }

    #[test]
    fn hidden_nodes_are_not_drawn() {
        let mut scene = SceneGraph::new();
        let id = scene
            .add_mesh(
                "cube",
                box_mesh(1.0, 1.0, 1.0),
                Material::default(),
                Transform::from_position(Vec3::ONE),
            )
            .unwrap();
        scene.get_mut(id).unwrap().visible = false;
        assert!(plan_draws(&scene).is_empty());
    }

    #[test]
    fn only_meshes_cast_shadows() {
        let mut scene = SceneGraph::new();
        let mut axes = Node::axes(5.0);
        axes.cast_shadow = true;
        scene.add(axes);
        let id = scene
            .add_mesh("cube", box_mesh(1.0, 1.0, 1.0), Material::default(), Transform::default())
            .unwrap();
        scene.get_mut(id).unwrap().cast_shadow = true;

        let casters: Vec<ObjectId> = plan_draws(&scene)
            .into_iter()
            .filter(|d| d.cast_shadow)
            .map(|d| d.object)
            .collect();
        assert_eq!(casters, vec![id]);
    }
}
