use std::borrow::Cow;

use wgpu::naga::ShaderStage;

/// Which pipeline shape a program is compiled into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramKind {
    /// Indexed mesh draw with depth testing and a vertex buffer.
    Mesh,
    /// Full-screen triangle that samples the previous pass.
    Fullscreen,
}

/// A GLSL 450 vertex/fragment pair plus the size of its uniform block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderProgram {
    pub label: &'static str,
    pub kind: ProgramKind,
    pub vertex: &'static str,
    pub fragment: &'static str,
    /// Byte size of the std140 block bound at set 0, binding 0.
    pub uniform_size: u64,
}

impl ShaderProgram {
    /// Displaced, fresnel-lit torus surface.
    pub fn torus() -> Self {
        Self {
            label: "torus surface",
            kind: ProgramKind::Mesh,
            vertex: TORUS_VERTEX_GLSL,
            fragment: TORUS_FRAGMENT_GLSL,
            uniform_size: std::mem::size_of::<crate::gpu::MeshUniforms>() as u64,
        }
    }

    /// Film-grain and UV distortion applied to the rendered scene.
    pub fn noise() -> Self {
        Self {
            label: "noise pass",
            kind: ProgramKind::Fullscreen,
            vertex: FULLSCREEN_VERTEX_GLSL,
            fragment: NOISE_FRAGMENT_GLSL,
            uniform_size: std::mem::size_of::<crate::gpu::NoiseUniforms>() as u64,
        }
    }
}

pub(crate) fn compile_stage(
    device: &wgpu::Device,
    label: &str,
    source: &'static str,
    stage: ShaderStage,
) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(source),
            stage,
            defines: &[],
        },
    })
}

/// Compiles both stages of `program`, vertex first.
pub(crate) fn compile_program(
    device: &wgpu::Device,
    program: &ShaderProgram,
) -> (wgpu::ShaderModule, wgpu::ShaderModule) {
    let vertex = compile_stage(
        device,
        &format!("{} vertex", program.label),
        program.vertex,
        ShaderStage::Vertex,
    );
    let fragment = compile_stage(
        device,
        &format!("{} fragment", program.label),
        program.fragment,
        ShaderStage::Fragment,
    );
    (vertex, fragment)
}

/// Uniform block shared by both torus stages.
///
/// The layout must match [`MeshUniforms`](crate::gpu::MeshUniforms). Material
/// names are mapped onto the block through macros.
macro_rules! mesh_params_block {
    () => {
        r"layout(std140, set = 0, binding = 0) uniform MeshParams {
    mat4 _modelMatrix;
    mat4 _viewProjection;
    vec4 _cameraPosition;
    vec4 _diffuse;
    float _uTime;
    float _opacity;
    float _uNoiseFrequency;
    float _uNoiseIntensity;
    float _uFresnelPower;
    float _uGlowIntensity;
    float _uGlowSpeed;
    float _padding0;
} ubo;

#define modelMatrix ubo._modelMatrix
#define viewProjection ubo._viewProjection
#define cameraPosition ubo._cameraPosition.xyz
#define diffuse ubo._diffuse.rgb
#define uTime ubo._uTime
#define opacity ubo._opacity
#define uNoiseFrequency ubo._uNoiseFrequency
#define uNoiseIntensity ubo._uNoiseIntensity
#define uFresnelPower ubo._uFresnelPower
#define uGlowIntensity ubo._uGlowIntensity
#define uGlowSpeed ubo._uGlowSpeed
"
    };
}

const TORUS_VERTEX_GLSL: &str = concat!(
    r"#version 450
layout(location = 0) in vec3 position;
layout(location = 1) in vec3 normal;
layout(location = 2) in vec2 uv;

layout(location = 0) out vec3 vWorldPosition;
layout(location = 1) out vec3 vNormal;
layout(location = 2) out vec2 vUv;

",
    mesh_params_block!(),
    r"
void main() {
    float wave = sin(position.x * uNoiseFrequency + uTime)
        * cos(position.y * uNoiseFrequency + uTime * 0.7)
        * sin(position.z * uNoiseFrequency - uTime * 0.5);
    vec3 displaced = position + normal * wave * uNoiseIntensity;
    vec4 world = modelMatrix * vec4(displaced, 1.0);
    vWorldPosition = world.xyz;
    vNormal = normalize(mat3(modelMatrix) * normal);
    vUv = uv;
    gl_Position = viewProjection * world;
}
"
);

const TORUS_FRAGMENT_GLSL: &str = concat!(
    r"#version 450
layout(location = 0) in vec3 vWorldPosition;
layout(location = 1) in vec3 vNormal;
layout(location = 2) in vec2 vUv;

layout(location = 0) out vec4 outColor;

",
    mesh_params_block!(),
    r"
void main() {
    vec3 viewDirection = normalize(cameraPosition - vWorldPosition);
    float facing = max(dot(normalize(vNormal), viewDirection), 0.0);
    float fresnel = pow(1.0 - facing, uFresnelPower);
    float pulse = 0.5 + 0.5 * sin(uTime * uGlowSpeed + vUv.x * 6.2831853);
    vec3 base = diffuse * (0.25 + 0.75 * facing);
    vec3 glow = diffuse * fresnel * uGlowIntensity * (0.6 + 0.4 * pulse);
    outColor = vec4(base + glow, opacity);
}
"
);

/// Full-screen triangle; `v_uv` has its origin at the top-left texel.
const FULLSCREEN_VERTEX_GLSL: &str = r"#version 450
layout(location = 0) out vec2 v_uv;

const vec2 positions[3] = vec2[3](
    vec2(-1.0, -3.0),
    vec2(3.0, 1.0),
    vec2(-1.0, 1.0)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    vec2 pos = positions[vertex_index];
    v_uv = vec2(pos.x * 0.5 + 0.5, 0.5 - pos.y * 0.5);
    gl_Position = vec4(pos, 0.0, 1.0);
}
";

/// The layout must match [`NoiseUniforms`](crate::gpu::NoiseUniforms).
const NOISE_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

layout(std140, set = 0, binding = 0) uniform NoiseParams {
    float _uTime;
    float _uNoiseIntensity;
    float _uNoiseScale;
    float _uNoiseSpeed;
    float _uDistortionAmount;
    float _padding0;
    float _padding1;
    float _padding2;
} ubo;

#define uTime ubo._uTime
#define uNoiseIntensity ubo._uNoiseIntensity
#define uNoiseScale ubo._uNoiseScale
#define uNoiseSpeed ubo._uNoiseSpeed
#define uDistortionAmount ubo._uDistortionAmount

layout(set = 1, binding = 0) uniform texture2D tDiffuse_texture;
layout(set = 1, binding = 1) uniform sampler tDiffuse_sampler;

#define tDiffuse sampler2D(tDiffuse_texture, tDiffuse_sampler)

float hash(vec2 p) {
    return fract(sin(dot(p, vec2(12.9898, 78.233))) * 43758.5453);
}

void main() {
    float t = uTime * uNoiseSpeed;
    vec2 offset = vec2(
        sin(v_uv.y * uNoiseScale + t),
        cos(v_uv.x * uNoiseScale + t)
    ) * uDistortionAmount * 0.01;
    vec4 scene = texture(tDiffuse, v_uv + offset);
    float grain = hash(floor(v_uv * uNoiseScale * 10.0) + vec2(t)) - 0.5;
    outColor = vec4(scene.rgb + vec3(grain * uNoiseIntensity), scene.a);
}
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn torus_program_declares_material_uniforms() {
        let program = ShaderProgram::torus();
        for name in [
            "uTime",
            "diffuse",
            "opacity",
            "cameraPosition",
            "uNoiseFrequency",
            "uNoiseIntensity",
            "uFresnelPower",
            "uGlowIntensity",
            "uGlowSpeed",
        ] {
            assert!(
                program.fragment.contains(&format!("#define {name} ")),
                "fragment stage is missing {name}"
            );
            assert!(
                program.vertex.contains(&format!("#define {name} ")),
                "vertex stage is missing {name}"
            );
        }
        assert_eq!(program.kind, ProgramKind::Mesh);
    }

    #[test]
    fn noise_program_declares_pass_uniforms() {
        let program = ShaderProgram::noise();
        for name in [
            "tDiffuse",
            "uTime",
            "uNoiseIntensity",
            "uNoiseScale",
            "uNoiseSpeed",
            "uDistortionAmount",
        ] {
            assert!(
                program.fragment.contains(&format!("#define {name} ")),
                "noise stage is missing {name}"
            );
        }
        assert_eq!(program.kind, ProgramKind::Fullscreen);
        assert_eq!(program.uniform_size, 32);
    }

    #[test]
    fn sources_start_with_version_directive() {
        for program in [ShaderProgram::torus(), ShaderProgram::noise()] {
            assert!(program.vertex.starts_with("#version 450"));
            assert!(program.fragment.starts_with("#version 450"));
        }
    }
}
