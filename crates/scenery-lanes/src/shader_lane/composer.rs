// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Generates vertex and fragment source text from a [`StateSignature`].
//!
//! Composition is a pure function of the signature: identical signatures
//! always produce byte-identical sources. Uniform and attribute names are the
//! contract with the command player, which writes them by name.

use super::signature::StateSignature;
use scenery_core::renderer::Primitive;
use scenery_data::state::{
    FragmentHook, LightMode, LightSpace, ShaderCode, TextureApplyTo, TextureBlendMode, VertexHook,
};
use std::fmt::Write;

/// Source text of both stages of one program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    /// Vertex stage.
    pub vertex: String,
    /// Fragment stage.
    pub fragment: String,
}

/// Composes the shading program for `sig`.
pub fn compose_draw(sig: &StateSignature) -> ShaderSource {
    ShaderSource {
        vertex: draw_vertex(sig),
        fragment: draw_fragment(sig),
    }
}

/// Composes the reduced program used by the pick passes.
///
/// It keeps only what moves or discards fragments: positions, morphing,
/// clipping and the user's position hooks.
pub fn compose_pick(sig: &StateSignature) -> ShaderSource {
    ShaderSource {
        vertex: pick_vertex(sig),
        fragment: pick_fragment(sig),
    }
}

fn vertex_hook<'a>(code: Option<&'a ShaderCode>, hook: VertexHook) -> Option<&'a str> {
    code.and_then(|c| c.vertex_hooks.get(&hook)).map(String::as_str)
}

fn fragment_hook<'a>(code: Option<&'a ShaderCode>, hook: FragmentHook) -> Option<&'a str> {
    code.and_then(|c| c.fragment_hooks.get(&hook)).map(String::as_str)
}

fn user_code(sig: &StateSignature) -> Option<&ShaderCode> {
    sig.shader.as_ref().map(|(_, code)| code.as_ref())
}

/// Attribute and transform preamble shared by both programs.
fn position_declarations(src: &mut String, sig: &StateSignature) {
    src.push_str("attribute vec3 aVertex;\n");
    if sig.morph.is_some_and(|m| m.positions) {
        src.push_str("attribute vec3 aMorphVertex;\n");
    }
    src.push_str("uniform mat4 uMMatrix;\n");
    src.push_str("uniform mat4 uVMatrix;\n");
    src.push_str("uniform mat4 uPMatrix;\n");
    if sig.morph.is_some() {
        src.push_str("uniform float uMorphFactor;\n");
    }
    if sig.point_size {
        src.push_str("uniform float uPointSize;\n");
    }
    src.push_str("varying vec4 vWorldVertex;\n");
    src.push_str("varying vec4 vViewVertex;\n");
}

/// Position pipeline of `main`, leaving `worldVertex`, `viewVertex` and
/// `viewMatrix` in scope.
fn position_body(src: &mut String, sig: &StateSignature) {
    let code = user_code(sig);
    if sig.morph.is_some_and(|m| m.positions) {
        src.push_str("    vec4 modelVertex = vec4(mix(aVertex, aMorphVertex, uMorphFactor), 1.0);\n");
    } else {
        src.push_str("    vec4 modelVertex = vec4(aVertex, 1.0);\n");
    }
    if let Some(f) = vertex_hook(code, VertexHook::ModelPos) {
        let _ = writeln!(src, "    modelVertex = {f}(modelVertex);");
    }
    src.push_str("    vec4 worldVertex = uMMatrix * modelVertex;\n");
    if let Some(f) = vertex_hook(code, VertexHook::WorldPos) {
        let _ = writeln!(src, "    worldVertex = {f}(worldVertex);");
    }
    src.push_str("    mat4 viewMatrix = uVMatrix;\n");
    if let Some(f) = vertex_hook(code, VertexHook::ViewMatrix) {
        let _ = writeln!(src, "    viewMatrix = {f}(viewMatrix);");
    }
    src.push_str("    mat4 projMatrix = uPMatrix;\n");
    if let Some(f) = vertex_hook(code, VertexHook::ProjMatrix) {
        let _ = writeln!(src, "    projMatrix = {f}(projMatrix);");
    }
    src.push_str("    vec4 viewVertex = viewMatrix * worldVertex;\n");
    if let Some(f) = vertex_hook(code, VertexHook::ViewPos) {
        let _ = writeln!(src, "    viewVertex = {f}(viewVertex);");
    }
    src.push_str("    vWorldVertex = worldVertex;\n");
    src.push_str("    vViewVertex = viewVertex;\n");
}

fn position_tail(src: &mut String, sig: &StateSignature) {
    if sig.point_size && sig.geometry.primitive == Primitive::Points {
        src.push_str("    gl_PointSize = uPointSize;\n");
    }
    src.push_str("    gl_Position = projMatrix * viewVertex;\n");
    src.push_str("}\n");
}

fn clip_declarations(src: &mut String, sig: &StateSignature) {
    if sig.clip_planes == 0 {
        return;
    }
    src.push_str("uniform bool uClipping;\n");
    for i in 0..sig.clip_planes {
        let _ = writeln!(src, "uniform int uClipMode{i};");
        let _ = writeln!(src, "uniform vec4 uClipNormalAndDist{i};");
    }
}

fn clip_body(src: &mut String, sig: &StateSignature) {
    if sig.clip_planes == 0 {
        return;
    }
    src.push_str("    if (uClipping) {\n");
    src.push_str("        float dist = 0.0;\n");
    for i in 0..sig.clip_planes {
        let _ = writeln!(src, "        if (uClipMode{i} != 0) {{");
        let _ = writeln!(
            src,
            "            dist = dot(vWorldVertex.xyz, uClipNormalAndDist{i}.xyz) - uClipNormalAndDist{i}.w;"
        );
        let _ = writeln!(src, "            if (uClipMode{i} == 1 && dist > 0.0) {{ discard; }}");
        let _ = writeln!(src, "            if (uClipMode{i} == 2 && dist < 0.0) {{ discard; }}");
        src.push_str("        }\n");
    }
    src.push_str("    }\n");
}

fn uv_name(uv_set: u32) -> &'static str {
    if uv_set == 1 {
        "vUVCoord2"
    } else {
        "vUVCoord"
    }
}

fn draw_vertex(sig: &StateSignature) -> String {
    let mut src = String::with_capacity(2048);
    let morph = sig.morph;
    let lit = sig.lit();
    let textured = sig.textured();

    src.push_str("precision highp float;\n");
    position_declarations(&mut src, sig);

    if sig.has_normals() {
        src.push_str("attribute vec3 aNormal;\n");
        if morph.is_some_and(|m| m.normals) {
            src.push_str("attribute vec3 aMorphNormal;\n");
        }
    }
    if textured && sig.has_uvs() {
        src.push_str("attribute vec2 aUVCoord;\n");
        if morph.is_some_and(|m| m.uvs) {
            src.push_str("attribute vec2 aMorphUVCoord;\n");
        }
        src.push_str("varying vec2 vUVCoord;\n");
    }
    if textured && sig.geometry.uvs2 {
        src.push_str("attribute vec2 aUVCoord2;\n");
        src.push_str("varying vec2 vUVCoord2;\n");
    }
    if sig.geometry.colors {
        src.push_str("attribute vec4 aVertexColor;\n");
        src.push_str("varying vec4 vColor;\n");
    }
    if lit {
        src.push_str("uniform mat4 uMNMatrix;\n");
        src.push_str("uniform mat4 uVNMatrix;\n");
        src.push_str("varying vec3 vViewNormal;\n");
        src.push_str("varying vec3 vViewEyeVec;\n");
        for (i, light) in sig.lights.iter().enumerate() {
            match light.mode {
                LightMode::Dir => {
                    let _ = writeln!(src, "uniform vec3 uLightDir{i};");
                }
                LightMode::Point | LightMode::Spot => {
                    let _ = writeln!(src, "uniform vec3 uLightPos{i};");
                }
            }
            let _ = writeln!(src, "varying vec4 vViewLightVecAndDist{i};");
        }
    }
    if let Some(code) = user_code(sig) {
        src.push_str(&code.vertex_code);
        src.push('\n');
    }

    src.push_str("void main() {\n");
    position_body(&mut src, sig);

    if lit {
        if morph.is_some_and(|m| m.normals) {
            src.push_str("    vec3 modelNormal = mix(aNormal, aMorphNormal, uMorphFactor);\n");
        } else {
            src.push_str("    vec3 modelNormal = aNormal;\n");
        }
        src.push_str("    vec4 worldNormal = uMNMatrix * vec4(modelNormal, 0.0);\n");
        src.push_str("    vViewNormal = normalize((uVNMatrix * worldNormal).xyz);\n");
        src.push_str("    vec3 lightVec;\n");
        for (i, light) in sig.lights.iter().enumerate() {
            match (light.mode, light.space) {
                (LightMode::Dir, LightSpace::World) => {
                    let _ = writeln!(
                        src,
                        "    vViewLightVecAndDist{i} = vec4(-normalize((viewMatrix * vec4(uLightDir{i}, 0.0)).xyz), 0.0);"
                    );
                }
                (LightMode::Dir, LightSpace::View) => {
                    let _ = writeln!(
                        src,
                        "    vViewLightVecAndDist{i} = vec4(-normalize(uLightDir{i}), 0.0);"
                    );
                }
                (_, LightSpace::World) => {
                    let _ = writeln!(
                        src,
                        "    lightVec = (viewMatrix * vec4(uLightPos{i}, 1.0)).xyz - viewVertex.xyz;"
                    );
                    let _ = writeln!(
                        src,
                        "    vViewLightVecAndDist{i} = vec4(normalize(lightVec), length(lightVec));"
                    );
                }
                (_, LightSpace::View) => {
                    let _ = writeln!(src, "    lightVec = uLightPos{i} - viewVertex.xyz;");
                    let _ = writeln!(
                        src,
                        "    vViewLightVecAndDist{i} = vec4(normalize(lightVec), length(lightVec));"
                    );
                }
            }
        }
        src.push_str("    vViewEyeVec = normalize(-viewVertex.xyz);\n");
    }
    if textured && sig.has_uvs() {
        if morph.is_some_and(|m| m.uvs) {
            src.push_str("    vUVCoord = mix(aUVCoord, aMorphUVCoord, uMorphFactor);\n");
        } else {
            src.push_str("    vUVCoord = aUVCoord;\n");
        }
    }
    if textured && sig.geometry.uvs2 {
        src.push_str("    vUVCoord2 = aUVCoord2;\n");
    }
    if sig.geometry.colors {
        src.push_str("    vColor = aVertexColor;\n");
    }
    position_tail(&mut src, sig);
    src
}

fn draw_fragment(sig: &StateSignature) -> String {
    let mut src = String::with_capacity(2048);
    let code = user_code(sig);
    let lit = sig.lit();
    let textured = sig.textured();

    src.push_str("precision highp float;\n");
    src.push_str("varying vec4 vWorldVertex;\n");
    src.push_str("varying vec4 vViewVertex;\n");
    src.push_str("uniform vec3 uMaterialBaseColor;\n");
    src.push_str("uniform vec3 uMaterialSpecularColor;\n");
    src.push_str("uniform float uMaterialSpecular;\n");
    src.push_str("uniform float uMaterialShine;\n");
    src.push_str("uniform float uMaterialEmit;\n");
    src.push_str("uniform float uMaterialAlpha;\n");
    src.push_str("uniform bool uBackfaceLighting;\n");
    src.push_str("uniform bool uBackfaceTexturing;\n");
    src.push_str("uniform bool uSpecularLighting;\n");
    clip_declarations(&mut src, sig);

    if sig.geometry.colors {
        src.push_str("varying vec4 vColor;\n");
    }
    if textured && sig.has_uvs() {
        src.push_str("varying vec2 vUVCoord;\n");
    }
    if textured && sig.geometry.uvs2 {
        src.push_str("varying vec2 vUVCoord2;\n");
    }
    if textured {
        for (i, layer) in sig.texture.iter().enumerate() {
            if !sig.uv_available(layer.uv_set) {
                continue;
            }
            let _ = writeln!(src, "uniform sampler2D uSampler{i};");
            let _ = writeln!(src, "uniform mat4 uLayer{i}Matrix;");
            let _ = writeln!(src, "uniform float uLayer{i}BlendFactor;");
        }
    }
    if lit {
        src.push_str("uniform vec3 uAmbientColor;\n");
        src.push_str("varying vec3 vViewNormal;\n");
        src.push_str("varying vec3 vViewEyeVec;\n");
        for (i, light) in sig.lights.iter().enumerate() {
            let _ = writeln!(src, "uniform vec3 uLightColor{i};");
            if light.mode != LightMode::Dir {
                let _ = writeln!(src, "uniform vec3 uLightAttenuation{i};");
            }
            if light.mode == LightMode::Spot {
                let _ = writeln!(src, "uniform vec3 uLightDir{i};");
                let _ = writeln!(src, "uniform float uLightCutoff{i};");
            }
            let _ = writeln!(src, "varying vec4 vViewLightVecAndDist{i};");
        }
    }
    if sig.color_transform {
        src.push_str("uniform vec4 uColorTransformScale;\n");
        src.push_str("uniform vec4 uColorTransformAdd;\n");
        src.push_str("uniform float uColorTransformSaturation;\n");
    }
    if let Some(code) = code {
        src.push_str(&code.fragment_code);
        src.push('\n');
    }

    src.push_str("void main() {\n");
    clip_body(&mut src, sig);
    src.push_str("    vec4 worldVertex = vWorldVertex;\n");
    if let Some(f) = fragment_hook(code, FragmentHook::WorldPos) {
        let _ = writeln!(src, "    worldVertex = {f}(worldVertex);");
    }
    src.push_str("    vec4 viewVertex = vViewVertex;\n");
    if let Some(f) = fragment_hook(code, FragmentHook::ViewPos) {
        let _ = writeln!(src, "    viewVertex = {f}(viewVertex);");
    }

    for (name, uniform, ty, hook) in [
        ("color", "uMaterialBaseColor", "vec3", FragmentHook::MaterialBaseColor),
        ("alpha", "uMaterialAlpha", "float", FragmentHook::MaterialAlpha),
        ("emit", "uMaterialEmit", "float", FragmentHook::MaterialEmit),
        ("specular", "uMaterialSpecular", "float", FragmentHook::MaterialSpecular),
        ("specularColor", "uMaterialSpecularColor", "vec3", FragmentHook::MaterialSpecularColor),
        ("shine", "uMaterialShine", "float", FragmentHook::MaterialShine),
    ] {
        let _ = writeln!(src, "    {ty} {name} = {uniform};");
        if let Some(f) = fragment_hook(code, hook) {
            let _ = writeln!(src, "    {name} = {f}({name});");
        }
    }
    if sig.geometry.colors {
        src.push_str("    color *= vColor.rgb;\n");
        src.push_str("    alpha *= vColor.a;\n");
    }
    if lit {
        src.push_str("    vec3 viewNormal = normalize(vViewNormal);\n");
        src.push_str("    if (!gl_FrontFacing) { viewNormal = -viewNormal; }\n");
    }

    if textured {
        src.push_str("    vec4 texturePos;\n");
        src.push_str("    vec4 texel;\n");
        src.push_str("    if (gl_FrontFacing || uBackfaceTexturing) {\n");
        for (i, layer) in sig.texture.iter().enumerate() {
            if !sig.uv_available(layer.uv_set) {
                continue;
            }
            let uv = uv_name(layer.uv_set);
            let _ = writeln!(src, "        texturePos = uLayer{i}Matrix * vec4({uv}, 1.0, 1.0);");
            let _ = writeln!(
                src,
                "        texel = texture2D(uSampler{i}, vec2(texturePos.s, texturePos.t));"
            );
            let f = format!("uLayer{i}BlendFactor");
            let line = match (layer.apply_to, layer.blend_mode) {
                (TextureApplyTo::BaseColor, TextureBlendMode::Multiply) => {
                    format!("color = color * mix(vec3(1.0), texel.rgb, {f});")
                }
                (TextureApplyTo::BaseColor, TextureBlendMode::Add) => {
                    format!("color = mix(color, texel.rgb, {f});")
                }
                (TextureApplyTo::Alpha, TextureBlendMode::Multiply) => {
                    format!("alpha = alpha * mix(1.0, texel.r, {f});")
                }
                (TextureApplyTo::Alpha, TextureBlendMode::Add) => {
                    format!("alpha = mix(alpha, texel.r, {f});")
                }
                (TextureApplyTo::Emit, TextureBlendMode::Multiply) => {
                    format!("emit = emit * mix(1.0, texel.r, {f});")
                }
                (TextureApplyTo::Emit, TextureBlendMode::Add) => {
                    format!("emit = mix(emit, texel.r, {f});")
                }
                (TextureApplyTo::Specular, TextureBlendMode::Multiply) => {
                    format!("specular = specular * mix(1.0, texel.r, {f});")
                }
                (TextureApplyTo::Specular, TextureBlendMode::Add) => {
                    format!("specular = mix(specular, texel.r, {f});")
                }
                (TextureApplyTo::Normals, _) if lit => {
                    format!("viewNormal = normalize(mix(viewNormal, texel.xyz * 2.0 - 1.0, {f}));")
                }
                (TextureApplyTo::Normals, _) => String::new(),
            };
            if !line.is_empty() {
                let _ = writeln!(src, "        {line}");
            }
        }
        src.push_str("    }\n");
    }

    if lit {
        src.push_str("    vec3 lightValue = uAmbientColor;\n");
        src.push_str("    vec3 specularValue = vec3(0.0);\n");
        src.push_str("    float lightFacing = (gl_FrontFacing || uBackfaceLighting) ? 1.0 : 0.0;\n");
        src.push_str("    vec3 lightVec;\n");
        src.push_str("    float dotN;\n");
        src.push_str("    float attenuation;\n");
        src.push_str("    float lightDist;\n");
        for (i, light) in sig.lights.iter().enumerate() {
            let _ = writeln!(src, "    lightVec = vViewLightVecAndDist{i}.xyz;");
            let _ = writeln!(src, "    dotN = max(dot(viewNormal, lightVec), 0.0) * lightFacing;");
            if light.mode == LightMode::Dir {
                src.push_str("    attenuation = 1.0;\n");
            } else {
                let _ = writeln!(src, "    lightDist = vViewLightVecAndDist{i}.w;");
                let _ = writeln!(
                    src,
                    "    attenuation = 1.0 / (uLightAttenuation{i}.x + uLightAttenuation{i}.y * lightDist + uLightAttenuation{i}.z * lightDist * lightDist);"
                );
            }
            if light.mode == LightMode::Spot {
                let _ = writeln!(
                    src,
                    "    attenuation *= step(cos(radians(uLightCutoff{i})), dot(-lightVec, normalize(uLightDir{i})));"
                );
            }
            if light.diffuse {
                let _ = writeln!(src, "    lightValue += dotN * uLightColor{i} * attenuation;");
            }
            if light.specular {
                let _ = writeln!(
                    src,
                    "    if (uSpecularLighting) {{ specularValue += attenuation * specular * specularColor * uLightColor{i} * pow(max(dot(reflect(-lightVec, viewNormal), vViewEyeVec), 0.0), shine); }}"
                );
            }
        }
        src.push_str(
            "    vec4 fragColor = vec4(emit * color + lightValue * color + specularValue, alpha);\n",
        );
    } else {
        src.push_str("    vec4 fragColor = vec4(emit * color + color, alpha);\n");
    }

    if sig.color_transform {
        src.push_str("    float intensity = dot(fragColor.rgb, vec3(0.3, 0.59, 0.11));\n");
        src.push_str(
            "    fragColor.rgb = mix(vec3(intensity), fragColor.rgb, 1.0 + uColorTransformSaturation);\n",
        );
        src.push_str("    fragColor = fragColor * uColorTransformScale + uColorTransformAdd;\n");
    }
    if let Some(f) = fragment_hook(code, FragmentHook::PixelColor) {
        let _ = writeln!(src, "    fragColor = {f}(fragColor);");
    }
    src.push_str("    gl_FragColor = fragColor;\n");
    src.push_str("}\n");
    src
}

fn pick_vertex(sig: &StateSignature) -> String {
    let mut src = String::with_capacity(1024);
    src.push_str("precision highp float;\n");
    position_declarations(&mut src, sig);
    if let Some(code) = user_code(sig) {
        src.push_str(&code.vertex_code);
        src.push('\n');
    }
    src.push_str("void main() {\n");
    position_body(&mut src, sig);
    position_tail(&mut src, sig);
    src
}

fn pick_fragment(sig: &StateSignature) -> String {
    let mut src = String::with_capacity(1024);
    let code = user_code(sig);
    src.push_str("precision highp float;\n");
    src.push_str("varying vec4 vWorldVertex;\n");
    src.push_str("varying vec4 vViewVertex;\n");
    src.push_str("uniform vec4 uPickColor;\n");
    src.push_str("uniform int uRayPickMode;\n");
    clip_declarations(&mut src, sig);
    if let Some(code) = code {
        src.push_str(&code.fragment_code);
        src.push('\n');
    }
    src.push_str("vec4 packDepth(const in float depth) {\n");
    src.push_str("    const vec4 bitShift = vec4(256.0 * 256.0 * 256.0, 256.0 * 256.0, 256.0, 1.0);\n");
    src.push_str("    const vec4 bitMask = vec4(0.0, 1.0 / 256.0, 1.0 / 256.0, 1.0 / 256.0);\n");
    src.push_str("    vec4 res = fract(depth * bitShift);\n");
    src.push_str("    res -= res.xxyz * bitMask;\n");
    src.push_str("    return res;\n");
    src.push_str("}\n");
    src.push_str("void main() {\n");
    clip_body(&mut src, sig);
    if let Some(f) = fragment_hook(code, FragmentHook::WorldPos) {
        let _ = writeln!(src, "    vec4 worldVertex = {f}(vWorldVertex);");
    }
    src.push_str("    if (uRayPickMode == 1) {\n");
    src.push_str("        gl_FragColor = packDepth(gl_FragCoord.z);\n");
    src.push_str("    } else {\n");
    src.push_str("        gl_FragColor = uPickColor;\n");
    src.push_str("    }\n");
    src.push_str("}\n");
    src
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader_lane::signature::{
        GeometrySignature, LightSignature, MorphSignature, TextureLayerSignature,
    };
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn lit_textured() -> StateSignature {
        let mut sig = StateSignature::new("canvas");
        sig.geometry = GeometrySignature {
            normals: true,
            uvs: true,
            ..Default::default()
        };
        sig.lights = vec![
            LightSignature {
                mode: LightMode::Dir,
                space: LightSpace::World,
                diffuse: true,
                specular: true,
            },
            LightSignature {
                mode: LightMode::Spot,
                space: LightSpace::View,
                diffuse: true,
                specular: false,
            },
        ];
        sig.texture = vec![TextureLayerSignature {
            apply_to: TextureApplyTo::BaseColor,
            blend_mode: TextureBlendMode::Multiply,
            uv_set: 0,
        }];
        sig
    }

    #[test]
    fn test_composition_is_deterministic() {
        let sig = lit_textured();
        assert_eq!(compose_draw(&sig), compose_draw(&sig.clone()));
        assert_eq!(compose_pick(&sig), compose_pick(&sig.clone()));
    }

    #[test]
    fn test_lit_program_declares_per_light_uniforms() {
        let src = compose_draw(&lit_textured());
        assert!(src.vertex.contains("uniform vec3 uLightDir0;"));
        assert!(src.vertex.contains("uniform vec3 uLightPos1;"));
        assert!(src.fragment.contains("uniform float uLightCutoff1;"));
        assert!(src.fragment.contains("uniform sampler2D uSampler0;"));
        assert!(src.vertex.contains("varying vec2 vUVCoord;"));
    }

    #[test]
    fn test_uv_varyings_need_texturing() {
        let mut sig = lit_textured();
        sig.texture.clear();
        let src = compose_draw(&sig);
        assert!(!src.vertex.contains("vUVCoord"));
        assert!(!src.fragment.contains("vUVCoord"));
    }

    #[test]
    fn test_lights_without_normals_emit_no_lighting() {
        let mut sig = lit_textured();
        sig.geometry.normals = false;
        let src = compose_draw(&sig);
        assert!(!src.fragment.contains("uAmbientColor"));
        assert!(!src.vertex.contains("aNormal"));
    }

    #[test]
    fn test_morph_blends_positions_in_both_programs() {
        let mut sig = StateSignature::new("canvas");
        sig.morph = Some(MorphSignature {
            positions: true,
            normals: false,
            uvs: false,
        });
        let draw = compose_draw(&sig);
        let pick = compose_pick(&sig);
        assert!(draw.vertex.contains("mix(aVertex, aMorphVertex, uMorphFactor)"));
        assert!(pick.vertex.contains("mix(aVertex, aMorphVertex, uMorphFactor)"));
    }

    #[test]
    fn test_hooks_replace_default_expressions() {
        let mut hooks = BTreeMap::new();
        hooks.insert(VertexHook::WorldPos, "wobble".to_string());
        let mut frag_hooks = BTreeMap::new();
        frag_hooks.insert(FragmentHook::PixelColor, "tint".to_string());
        let code = ShaderCode {
            vertex_code: "vec4 wobble(vec4 p) { return p; }".into(),
            fragment_code: "vec4 tint(vec4 c) { return c; }".into(),
            vertex_hooks: hooks,
            fragment_hooks: frag_hooks,
        };
        let mut sig = StateSignature::new("canvas");
        sig.shader = Some((code.digest(), Arc::new(code)));
        let draw = compose_draw(&sig);
        assert!(draw.vertex.contains("worldVertex = wobble(worldVertex);"));
        assert!(draw.fragment.contains("fragColor = tint(fragColor);"));
        assert!(compose_pick(&sig).vertex.contains("wobble(worldVertex)"));
    }

    #[test]
    fn test_clip_planes_appear_in_pick_program() {
        let mut sig = StateSignature::new("canvas");
        sig.clip_planes = 2;
        let pick = compose_pick(&sig);
        assert!(pick.fragment.contains("uClipNormalAndDist1"));
        assert!(pick.fragment.contains("uniform int uRayPickMode;"));
    }
}
