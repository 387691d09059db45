//! WGSL sources for the built-in mesh pipelines.
//!
//! Binding layout shared by every shader:
//! - group 0, binding 0: vertex constants slot 0 ([`crate::MeshTransform`])
//! - group 0, binding 1: vertex constants slot 1
//! - group 0, binding 2: pixel constants slot 0 ([`crate::LightConstants`])
//! - group 0, binding 3: pixel constants slot 1 ([`crate::Material`])
//! - group 1, binding 0/1: texture and sampler slot 0
//!
//! Lighting happens in view space.

/// Entry point of the vertex stage in every built-in shader.
pub const VERTEX_ENTRY: &str = "vs_main";
/// Entry point of the pixel stage in every built-in shader.
pub const PIXEL_ENTRY: &str = "fs_main";

macro_rules! shader_prelude {
    () => {
        r#"
struct MeshTransform {
    model_view: mat4x4<f32>,
    model_view_proj: mat4x4<f32>,
    normal: mat4x4<f32>,
};

struct PointLight {
    view_position: vec3<f32>,
    intensity: f32,
    ambient: vec3<f32>,
    att_const: f32,
    diffuse: vec3<f32>,
    att_lin: f32,
    att_quad: f32,
};

struct Material {
    color: vec4<f32>,
    specular_intensity: f32,
    specular_power: f32,
};

@group(0) @binding(0)
var<uniform> transform: MeshTransform;

@group(0) @binding(2)
var<uniform> light: PointLight;

@group(0) @binding(3)
var<uniform> material: Material;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) view_position: vec3<f32>,
    @location(1) view_normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

@vertex
fn vs_main(vertex: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = transform.model_view_proj * vec4<f32>(vertex.position, 1.0);
    out.view_position = (transform.model_view * vec4<f32>(vertex.position, 1.0)).xyz;
    out.view_normal = (transform.normal * vec4<f32>(vertex.normal, 0.0)).xyz;
    out.uv = vertex.uv;
    return out;
}

fn phong(view_position: vec3<f32>, view_normal: vec3<f32>, base: vec3<f32>) -> vec3<f32> {
    let to_light = light.view_position - view_position;
    let dist = length(to_light);
    let direction = to_light / max(dist, 0.0001);
    let attenuation = 1.0 / (light.att_const + light.att_lin * dist + light.att_quad * dist * dist);
    let n = normalize(view_normal);

    let diffuse = light.diffuse * light.intensity * attenuation * max(0.0, dot(direction, n));

    let reflected = reflect(-direction, n);
    let to_eye = normalize(-view_position);
    let specular = light.diffuse * light.intensity * attenuation * material.specular_intensity
        * pow(max(0.0, dot(reflected, to_eye)), material.specular_power);

    return clamp((diffuse + light.ambient) * base + specular, vec3<f32>(0.0), vec3<f32>(1.0));
}
"#
    };
}

/// Flat-coloured Phong shader driven by the material colour.
pub const SOLID_SHADER: &str = concat!(
    shader_prelude!(),
    r#"
@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let lit = phong(in.view_position, in.view_normal, material.color.rgb);
    return vec4<f32>(lit, material.color.a);
}
"#
);

/// Textured Phong shader. The material colour tints the sampled texel.
pub const TEXTURED_SHADER: &str = concat!(
    shader_prelude!(),
    r#"
@group(1) @binding(0)
var diffuse_texture: texture_2d<f32>;

@group(1) @binding(1)
var diffuse_sampler: sampler;

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let texel = textureSample(diffuse_texture, diffuse_sampler, in.uv);
    let lit = phong(in.view_position, in.view_normal, texel.rgb * material.color.rgb);
    return vec4<f32>(lit, texel.a * material.color.a);
}
"#
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shaders_share_entry_points() {
        for source in [SOLID_SHADER, TEXTURED_SHADER] {
            assert!(source.contains(&format!("fn {VERTEX_ENTRY}(")));
            assert!(source.contains(&format!("fn {PIXEL_ENTRY}(")));
            assert!(source.contains("@group(0) @binding(0)"));
        }
    }

    #[test]
    fn only_textured_shader_samples() {
        assert!(!SOLID_SHADER.contains("@group(1)"));
        assert!(TEXTURED_SHADER.contains("textureSample"));
    }

    #[test]
    fn normals_use_the_normal_matrix() {
        for source in [SOLID_SHADER, TEXTURED_SHADER] {
            assert!(source.contains("transform.normal * vec4<f32>(vertex.normal, 0.0)"));
        }
    }
}
