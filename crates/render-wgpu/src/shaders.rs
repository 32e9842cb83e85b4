/// Uniform structs shared by every mesh shader. Prepended to the sources below.
pub const COMMON: &str = r#"
struct Globals {
    view_proj: mat4x4<f32>,
    light_view_proj: mat4x4<f32>,
    camera_pos: vec4<f32>,
    ambient: vec4<f32>,
    dir_color: vec4<f32>,
    dir_direction: vec4<f32>,
    spot_color: vec4<f32>,
    spot_position: vec4<f32>,
    spot_direction: vec4<f32>,
    spot_cone: vec4<f32>,
    fog_color: vec4<f32>,
    fog_params: vec4<f32>,
};

struct Node {
    model: mat4x4<f32>,
    color: vec4<f32>,
    flags: vec4<f32>,
};
"#;

/// Lit/unlit meshes (`fs_main`) and the animated procedural material
/// (`fs_procedural`). Wireframe reuses `fs_main` with a line topology.
pub const SCENE_SHADER: &str = r#"
@group(0) @binding(0)
var<uniform> globals: Globals;
@group(0) @binding(1)
var shadow_map: texture_depth_2d;
@group(0) @binding(2)
var shadow_sampler: sampler_comparison;

@group(1) @binding(0)
var<uniform> node: Node;
@group(1) @binding(1)
var base_texture: texture_2d<f32>;
@group(1) @binding(2)
var base_sampler: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_pos: vec3<f32>,
    @location(1) world_normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

@vertex
fn vs_main(vertex: VertexInput) -> VertexOutput {
    let world_pos = node.model * vec4<f32>(vertex.position, 1.0);
    var out: VertexOutput;
    out.clip_position = globals.view_proj * world_pos;
    out.world_pos = world_pos.xyz;
    out.world_normal = normalize((node.model * vec4<f32>(vertex.normal, 0.0)).xyz);
    out.uv = vertex.uv;
    return out;
}

// 3x3 PCF over the spot light shadow map. 1.0 = fully lit.
fn shadow_factor(world_pos: vec3<f32>) -> f32 {
    let clip = globals.light_view_proj * vec4<f32>(world_pos, 1.0);
    if (clip.w <= 0.0) {
        return 1.0;
    }
    let ndc = clip.xyz / clip.w;
    let uv = vec2<f32>(ndc.x * 0.5 + 0.5, -ndc.y * 0.5 + 0.5);
    if (uv.x < 0.0 || uv.x > 1.0 || uv.y < 0.0 || uv.y > 1.0 || ndc.z > 1.0) {
        return 1.0;
    }
    let texel = 1.0 / vec2<f32>(textureDimensions(shadow_map));
    var lit = 0.0;
    for (var x = -1; x <= 1; x++) {
        for (var y = -1; y <= 1; y++) {
            let offset = vec2<f32>(f32(x), f32(y)) * texel;
            lit += textureSampleCompareLevel(shadow_map, shadow_sampler, uv + offset, ndc.z - 0.0005);
        }
    }
    return lit / 9.0;
}

fn apply_fog(color: vec3<f32>, world_pos: vec3<f32>) -> vec3<f32> {
    let mode = globals.fog_color.w;
    if (mode < 0.5) {
        return color;
    }
    let d = distance(world_pos, globals.camera_pos.xyz);
    var f = 0.0;
    if (mode < 1.5) {
        let span = max(globals.fog_params.z - globals.fog_params.y, 0.0001);
        f = clamp((d - globals.fog_params.y) / span, 0.0, 1.0);
    } else {
        let k = globals.fog_params.x * d;
        f = clamp(1.0 - exp(-k * k), 0.0, 1.0);
    }
    return mix(color, globals.fog_color.rgb, f);
}

fn spot_cone(cos_angle: f32) -> f32 {
    let outer = globals.spot_direction.w;
    let inner = globals.spot_cone.x;
    if (inner - outer <= 0.00001) {
        return step(outer, cos_angle);
    }
    return smoothstep(outer, inner, cos_angle);
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let tex = textureSample(base_texture, base_sampler, in.uv);
    let base = node.color.rgb * tex.rgb;
    var color = base;

    if (node.flags.x > 0.5) {
        let n = normalize(in.world_normal);
        var light = globals.ambient.rgb;
        if (globals.dir_color.w > 0.5) {
            light += globals.dir_color.rgb * max(dot(n, -globals.dir_direction.xyz), 0.0);
        }
        if (globals.spot_color.w > 0.5) {
            let to_frag = in.world_pos - globals.spot_position.xyz;
            let dist = max(length(to_frag), 0.0001);
            let l = to_frag / dist;
            let atten = spot_cone(dot(l, globals.spot_direction.xyz)) / pow(dist, globals.spot_position.w);
            var shadow = 1.0;
            if (node.flags.y > 0.5 && globals.spot_cone.y > 0.5) {
                shadow = shadow_factor(in.world_pos);
            }
            light += globals.spot_color.rgb * atten * max(dot(n, -l), 0.0) * shadow;
        }
        color = base * light;
    }

    return vec4<f32>(apply_fog(color, in.world_pos), 1.0);
}

@fragment
fn fs_procedural(in: VertexOutput) -> @location(0) vec4<f32> {
    let t = globals.camera_pos.w;
    let p = in.world_pos * 0.3;
    let color = vec3<f32>(
        0.5 + 0.5 * sin(t + p.x * 2.0),
        0.5 + 0.5 * sin(t * 1.3 + p.y * 3.0),
        0.5 + 0.5 * sin(t * 0.7 + p.z * 2.5 + in.uv.x * 6.2831),
    );
    return vec4<f32>(apply_fog(color, in.world_pos), 1.0);
}
"#;

/// Depth-only pass from the spot light.
pub const SHADOW_SHADER: &str = r#"
@group(0) @binding(0)
var<uniform> globals: Globals;
@group(1) @binding(0)
var<uniform> node: Node;

@vertex
fn vs_shadow(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return globals.light_view_proj * node.model * vec4<f32>(position, 1.0);
}
"#;

/// Axes and grid helpers.
pub const LINE_SHADER: &str = r#"
@group(0) @binding(0)
var<uniform> globals: Globals;
@group(1) @binding(0)
var<uniform> node: Node;

struct LineVertex {
    @location(0) position: vec3<f32>,
    @location(1) color: vec4<f32>,
};

struct LineOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
};

@vertex
fn vs_line(vertex: LineVertex) -> LineOutput {
    var out: LineOutput;
    out.clip_position = globals.view_proj * node.model * vec4<f32>(vertex.position, 1.0);
    out.color = vertex.color;
    return out;
}

@fragment
fn fs_line(in: LineOutput) -> @location(0) vec4<f32> {
    return in.color;
}
"#;

/// Full-screen triangle sampling the background cubemap.
pub const SKYBOX_SHADER: &str = r#"
struct Sky {
    inv_view_proj: mat4x4<f32>,
};

@group(0) @binding(0)
var<uniform> sky: Sky;
@group(0) @binding(1)
var sky_texture: texture_cube<f32>;
@group(0) @binding(2)
var sky_sampler: sampler;

struct SkyOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) ndc: vec2<f32>,
};

@vertex
fn vs_sky(@builtin(vertex_index) index: u32) -> SkyOutput {
    let uv = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    let ndc = uv * 2.0 - 1.0;
    var out: SkyOutput;
    out.clip_position = vec4<f32>(ndc, 1.0, 1.0);
    out.ndc = ndc;
    return out;
}

@fragment
fn fs_sky(in: SkyOutput) -> @location(0) vec4<f32> {
    let p = sky.inv_view_proj * vec4<f32>(in.ndc, 1.0, 1.0);
    let dir = normalize(p.xyz / p.w);
    return textureSample(sky_texture, sky_sampler, dir);
}
"#;
